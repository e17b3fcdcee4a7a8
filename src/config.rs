//! Acquisition settings for the MAX30105.
//!
//! Every code here is already shifted into its bit position inside the
//! register it belongs to, so it can be handed straight to
//! [`Max30105::masked_update`](crate::Max30105::masked_update) together with
//! the matching `*_MASK` constant.

use crate::Register;

/// Keeps every MODE_CONFIG bit except RESET (bit 6).
pub const RESET_MASK: u8 = 0b1011_1111;
/// RESET bit of MODE_CONFIG.
pub const RESET: u8 = 0b0100_0000;
/// Keeps every MODE_CONFIG bit except MODE (bits 2:0).
pub const MODE_MASK: u8 = 0b1111_1000;
/// Keeps every SPO2_CONFIG bit except LED_PW (bits 1:0).
pub const PULSE_WIDTH_MASK: u8 = 0b1111_1100;
/// Keeps every SPO2_CONFIG bit except SR (bits 4:2).
pub const SAMPLE_RATE_MASK: u8 = 0b1110_0011;
/// Keeps every SPO2_CONFIG bit except ADC_RGE (bits 6:5).
pub const ADC_RANGE_MASK: u8 = 0b1001_1111;
/// Keeps every FIFO_CONFIG bit except SMP_AVE (bits 7:5).
pub const SAMPLE_AVERAGING_MASK: u8 = !0b1110_0000;
/// Keeps every FIFO_CONFIG bit except FIFO_ROLLOVER_EN (bit 4).
pub const ROLLOVER_MASK: u8 = 0b1110_1111;
/// FIFO_ROLLOVER_EN bit of FIFO_CONFIG.
pub const ROLLOVER_ENABLE: u8 = 0b0001_0000;

/// Slot 1 = red, slot 2 = IR.
pub(crate) const MULTI_LED_SLOTS_1_2: u8 = 0b0010_0001;
/// Slot 3 = green, slot 4 disabled.
pub(crate) const MULTI_LED_SLOTS_3_4: u8 = 0b0000_0011;

/// Number of active optical channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LedMode {
    /// Red only (heart rate).
    RedOnly,
    /// Red and IR (SpO2).
    RedIr,
    /// Red, IR and green through the multi-LED slots.
    MultiLed,
}

impl LedMode {
    /// Mode for a channel count of 1, 2 or 3.
    #[must_use]
    pub fn from_channels(channels: u8) -> Option<Self> {
        match channels {
            1 => Some(LedMode::RedOnly),
            2 => Some(LedMode::RedIr),
            3 => Some(LedMode::MultiLed),
            _ => None,
        }
    }

    /// Number of channels, and so the number of 3-byte groups per FIFO sample.
    #[must_use]
    pub fn channels(self) -> usize {
        match self {
            LedMode::RedOnly => 1,
            LedMode::RedIr => 2,
            LedMode::MultiLed => 3,
        }
    }

    /// MODE bits of MODE_CONFIG selecting this mode.
    #[must_use]
    pub fn bits(self) -> u8 {
        match self {
            LedMode::RedOnly => 0x02,
            LedMode::RedIr => 0x03,
            LedMode::MultiLed => 0x07,
        }
    }
}

impl From<LedMode> for u8 {
    fn from(mode: LedMode) -> Self {
        match mode {
            LedMode::RedOnly => 1,
            LedMode::RedIr => 2,
            LedMode::MultiLed => 3,
        }
    }
}

/// A single LED channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Led {
    /// LED1, red.
    Red,
    /// LED2, infrared.
    Ir,
    /// LED3, green.
    Green,
}

impl Led {
    /// MODE bits written when this channel's power is set on its own.
    #[must_use]
    pub fn mode_bits(self) -> u8 {
        match self {
            Led::Red => LedMode::RedOnly.bits(),
            Led::Ir => LedMode::RedIr.bits(),
            Led::Green => LedMode::MultiLed.bits(),
        }
    }
    /// Pulse amplitude register driving this LED.
    #[must_use]
    pub fn power_register(self) -> Register {
        match self {
            Led::Red => Register::Led1PulseAmplitude,
            Led::Ir => Register::Led2PulseAmplitude,
            Led::Green => Register::Led3PulseAmplitude,
        }
    }
}

/// LED pulse width, which also fixes the ADC resolution.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PulseWidth {
    /// 69 µs, 15-bit
    Us69 = 0x00,
    /// 118 µs, 16-bit
    Us118 = 0x01,
    /// 215 µs, 17-bit
    Us215 = 0x02,
    /// 411 µs, 18-bit
    Us411 = 0x03,
}

impl PulseWidth {
    /// ADC resolution in bits.
    #[must_use]
    pub fn resolution_bits(self) -> u8 {
        15 + self as u8
    }
}

impl From<u8> for PulseWidth {
    /// Only the two LED_PW bits are meaningful; higher bits are dropped.
    fn from(code: u8) -> Self {
        if code & !0b11 != 0 {
            warn!("Pulse width code {} has bits outside LED_PW", code);
        }
        match code & 0b11 {
            0 => PulseWidth::Us69,
            1 => PulseWidth::Us118,
            2 => PulseWidth::Us215,
            _ => PulseWidth::Us411,
        }
    }
}

impl From<PulseWidth> for u8 {
    fn from(width: PulseWidth) -> Self {
        width as u8
    }
}

/// Samples per second.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SampleRate {
    /// 50 Hz
    Hz50 = 0x00,
    /// 100 Hz
    Hz100 = 0x04,
    /// 200 Hz
    Hz200 = 0x08,
    /// 400 Hz
    Hz400 = 0x0C,
    /// 800 Hz
    Hz800 = 0x10,
    /// 1000 Hz
    Hz1000 = 0x14,
    /// 1600 Hz
    Hz1600 = 0x18,
    /// 3200 Hz
    Hz3200 = 0x1C,
}

impl From<SampleRate> for u8 {
    fn from(rate: SampleRate) -> Self {
        rate as u8
    }
}

/// ADC full scale, in nA.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AdcRange {
    /// 2048 nA
    Na2048 = 0x00,
    /// 4096 nA
    Na4096 = 0x20,
    /// 8192 nA
    Na8192 = 0x40,
    /// 16384 nA
    Na16384 = 0x60,
}

impl From<AdcRange> for u8 {
    fn from(range: AdcRange) -> Self {
        range as u8
    }
}

/// Number of samples the chip averages into one FIFO entry.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SampleAveraging {
    /// No averaging
    None = 0x00,
    /// 2 samples
    Avg2 = 0x20,
    /// 4 samples
    Avg4 = 0x40,
    /// 8 samples
    Avg8 = 0x60,
    /// 16 samples
    Avg16 = 0x80,
    /// 32 samples
    Avg32 = 0xA0,
}

impl From<SampleAveraging> for u8 {
    fn from(averaging: SampleAveraging) -> Self {
        averaging as u8
    }
}

/// Full set of parameters applied by
/// [`Max30105::configure_with`](crate::Max30105::configure_with).
///
/// `led_mode` is kept as the raw channel count (1, 2 or 3) and validated when
/// the configuration is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Number of active channels, 1 to 3
    pub led_mode: u8,
    /// Pulse amplitude written to each active LED
    pub led_power: u8,
    /// LED pulse width
    pub pulse_width: PulseWidth,
    /// Sample rate
    pub sample_rate: SampleRate,
    /// ADC full scale
    pub adc_range: AdcRange,
    /// On-chip sample averaging
    pub sample_averaging: SampleAveraging,
    /// Overwrite the oldest samples once the FIFO is full
    pub fifo_rollover: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            led_mode: 2,
            led_power: 0x1F,
            pulse_width: PulseWidth::Us118,
            sample_rate: SampleRate::Hz50,
            adc_range: AdcRange::Na2048,
            sample_averaging: SampleAveraging::None,
            fifo_rollover: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn led_mode_from_channel_count() {
        assert_eq!(LedMode::from_channels(1), Some(LedMode::RedOnly));
        assert_eq!(LedMode::from_channels(2), Some(LedMode::RedIr));
        assert_eq!(LedMode::from_channels(3), Some(LedMode::MultiLed));
        for value in [0u8, 4, 0xFF] {
            assert_eq!(LedMode::from_channels(value), None);
        }
    }

    #[test]
    fn led_mode_bits_and_channels() {
        assert_eq!(LedMode::RedOnly.bits(), 0x02);
        assert_eq!(LedMode::RedIr.bits(), 0x03);
        assert_eq!(LedMode::MultiLed.bits(), 0x07);
        assert_eq!(LedMode::MultiLed.channels(), 3);
        assert_eq!(u8::from(LedMode::RedIr), 2);
    }

    #[test]
    fn pulse_width_keeps_only_led_pw_bits() {
        assert_eq!(PulseWidth::from(0x01), PulseWidth::Us118);
        assert_eq!(PulseWidth::from(0xFF), PulseWidth::Us411);
        assert_eq!(PulseWidth::Us411.resolution_bits(), 18);
        assert_eq!(PulseWidth::Us69.resolution_bits(), 15);
    }

    #[test]
    fn sample_averaging_mask_is_unsigned() {
        assert_eq!(SAMPLE_AVERAGING_MASK, 0x1F);
    }

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.led_mode, 2);
        assert_eq!(config.led_power, 0x1F);
        assert_eq!(u8::from(config.pulse_width), 0x01);
        assert_eq!(u8::from(config.sample_rate), 0x00);
        assert_eq!(u8::from(config.adc_range), 0x00);
        assert_eq!(u8::from(config.sample_averaging), 0x00);
        assert!(config.fifo_rollover);
    }
}
