//! # MAX30105 Particle / Pulse-Oximetry Sensor Driver
//!
//! This crate provides a `no_std` register-level driver for Maxim's MAX30105
//! optical sensor (and the MAX30102/MAX30101 parts that share its register
//! map). It discovers the chip, configures the acquisition parameters and
//! reads raw red/IR/green samples out of the on-chip FIFO. No signal
//! processing is done here.
//!
//! The driver is blocking by default; enable the `async` feature to get the
//! same API on top of `embedded-hal-async`.
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use max30105::{Max30105, PulseWidth, DEFAULT_ADDRESS};
//!
//! let i2c = embedded_hal_mock::eh1::i2c::Mock::new(&[]);
//! let delay = embedded_hal_mock::eh1::delay::NoopDelay;
//! let mut sensor = Max30105::new(i2c, delay, DEFAULT_ADDRESS).unwrap();
//!
//! // Red + IR, power 0x1F, 118 µs pulses
//! sensor.configure(2, 0x1F, PulseWidth::Us118).unwrap();
//!
//! let pointers = sensor.fifo_pointers().unwrap();
//! let sample = sensor.read_sample(pointers.read).unwrap();
//! println!("red: {} ir: {}", sample.red, sample.ir);
//! ```
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod fmt; // <-- must be first module!

mod config;

pub use config::{
    AdcRange, Config, Led, LedMode, PulseWidth, SampleAveraging, SampleRate, ADC_RANGE_MASK,
    MODE_MASK, PULSE_WIDTH_MASK, RESET, RESET_MASK, ROLLOVER_ENABLE, ROLLOVER_MASK,
    SAMPLE_AVERAGING_MASK, SAMPLE_RATE_MASK,
};

use config::{MULTI_LED_SLOTS_1_2, MULTI_LED_SLOTS_3_4};

#[cfg(not(feature = "async"))]
use embedded_hal::{delay::DelayNs, i2c::I2c};
#[cfg(feature = "async")]
use embedded_hal_async::{delay::DelayNs, i2c::I2c};

/// Fixed 7-bit I2C address of the MAX30105.
pub const DEFAULT_ADDRESS: u8 = 0x57;

/// Value of the PART_ID register on a MAX30105.
pub const EXPECTED_PART_ID: u8 = 0x15;

/// Time the chip needs to come back after a soft reset.
const RESET_SETTLE_MS: u32 = 1000;

/// Register addresses for the MAX30105 sensor.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Register {
    /// FIFO write pointer (0x04)
    FifoWritePtr = 0x04,
    /// FIFO overflow counter (0x05)
    FifoOverflowCounter = 0x05,
    /// FIFO read pointer (0x06)
    FifoReadPtr = 0x06,
    /// FIFO data, auto-incrementing (0x07)
    FifoData = 0x07,
    /// FIFO configuration: averaging and rollover (0x08)
    FifoConfig = 0x08,
    /// Mode configuration: reset and LED mode (0x09)
    ModeConfig = 0x09,
    /// SpO2 configuration: pulse width, sample rate and ADC range (0x0A)
    Spo2Config = 0x0A,
    /// LED1 (red) pulse amplitude (0x0C)
    Led1PulseAmplitude = 0x0C,
    /// LED2 (IR) pulse amplitude (0x0D)
    Led2PulseAmplitude = 0x0D,
    /// LED3 (green) pulse amplitude (0x0E)
    Led3PulseAmplitude = 0x0E,
    /// Multi-LED mode control, slots 1 and 2 (0x11)
    MultiLedCtrl1 = 0x11,
    /// Multi-LED mode control, slots 3 and 4 (0x12)
    MultiLedCtrl2 = 0x12,
    /// Part identification (0xFF)
    PartId = 0xFF,
}

impl From<Register> for u8 {
    fn from(r: Register) -> Self {
        r as u8
    }
}

/// One FIFO entry.
///
/// Channels that are not active in the current [`LedMode`] read as 0. The
/// chip fills at most the low 18 bits of each channel, depending on the
/// configured [`PulseWidth`]; the raw 3-byte value is kept without masking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Sample {
    /// Red channel
    pub red: u32,
    /// IR channel
    pub ir: u32,
    /// Green channel
    pub green: u32,
}

impl Sample {
    /// Decodes consecutive big-endian 3-byte groups as red, IR, then green.
    /// A trailing partial group is ignored.
    #[must_use]
    pub fn from_fifo_bytes(bytes: &[u8]) -> Self {
        let mut channels = bytes
            .chunks_exact(3)
            .map(|group| {
                (u32::from(group[0]) << 16) | (u32::from(group[1]) << 8) | u32::from(group[2])
            });

        Self {
            red: channels.next().unwrap_or(0),
            ir: channels.next().unwrap_or(0),
            green: channels.next().unwrap_or(0),
        }
    }
}

/// Snapshot of the FIFO pointer registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FifoPointers {
    /// Where the chip will write the next sample
    pub write: u8,
    /// Samples lost since the FIFO filled up
    pub overflow: u8,
    /// Where the next sample will be read from
    pub read: u8,
}

/// MAX30105 particle / pulse-oximetry sensor driver.
///
/// Owns the I2C bus and a delay provider. The active LED mode and pulse width
/// are cached after [`configure`](Self::configure) so that sample reads know
/// how many bytes each FIFO entry takes.
pub struct Max30105<I2C, D> {
    i2c: I2C,
    address: u8,
    delay: D,
    led_mode: Option<LedMode>,
    pulse_width: Option<PulseWidth>,
}

#[maybe_async_cfg::maybe(
    sync(cfg(not(feature = "async")), keep_self),
    async(feature = "async", keep_self)
)]
impl<I2C, E, D> Max30105<I2C, D>
where
    I2C: I2c<Error = E>,
    E: core::fmt::Debug,
    D: DelayNs,
{
    /// Creates a driver for the sensor at `address` after checking that
    /// something answers there.
    ///
    /// A single byte is read from the device as a probe. The sensor is not
    /// configured yet; call [`configure`](Self::configure) before reading
    /// samples.
    ///
    /// # Errors
    ///
    /// * `Err(Error::DeviceNotFound(E))` - If the probe read failed. Nothing
    ///   else is sent on the bus in that case.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use max30105::{Max30105, DEFAULT_ADDRESS};
    ///
    /// let i2c = embedded_hal_mock::eh1::i2c::Mock::new(&[]);
    /// let delay = embedded_hal_mock::eh1::delay::NoopDelay;
    ///
    /// let sensor = Max30105::new(i2c, delay, DEFAULT_ADDRESS);
    /// assert!(sensor.is_ok());
    /// ```
    pub async fn new(mut i2c: I2C, delay: D, address: u8) -> Result<Self, Error<E>> {
        let mut probe = [0u8; 1];
        if let Err(e) = i2c.read(address, &mut probe).await {
            warn!("No device answered at address {}", address);
            return Err(Error::DeviceNotFound(e));
        }
        info!("Found MAX30105 at address {}", address);

        Ok(Self {
            i2c,
            address,
            delay,
            led_mode: None,
            pulse_width: None,
        })
    }

    /// Resets the chip and applies a complete acquisition setup.
    ///
    /// Sample rate, ADC range, averaging and rollover are set to their
    /// defaults (50 Hz, 2048 nA, no averaging, rollover on). Use
    /// [`configure_with`](Self::configure_with) to choose them.
    ///
    /// # Arguments
    ///
    /// * `led_mode` - Number of active channels: 1 (red), 2 (red + IR) or
    ///   3 (red + IR + green)
    /// * `led_power` - Pulse amplitude written to every active LED
    /// * `pulse_width` - Pulse width, either a [`PulseWidth`] or its raw code
    ///
    /// # Errors
    ///
    /// * `Err(Error::InvalidMode(u8))` - If `led_mode` is not 1, 2 or 3. The
    ///   chip has already been reset and its pulse width written.
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error.
    ///   The chip is left partially configured.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use max30105::{Max30105, PulseWidth, DEFAULT_ADDRESS};
    ///
    /// let i2c = embedded_hal_mock::eh1::i2c::Mock::new(&[]);
    /// let delay = embedded_hal_mock::eh1::delay::NoopDelay;
    /// let mut sensor = Max30105::new(i2c, delay, DEFAULT_ADDRESS).unwrap();
    ///
    /// // All three LEDs at 0x1F, 18-bit resolution
    /// sensor.configure(3, 0x1F, PulseWidth::Us411).unwrap();
    ///
    /// // The raw code works as well
    /// sensor.configure(2, 0x3F, 0x01u8).unwrap();
    /// ```
    pub async fn configure<P>(
        &mut self,
        led_mode: u8,
        led_power: u8,
        pulse_width: P,
    ) -> Result<(), Error<E>>
    where
        P: Into<PulseWidth>,
    {
        let config = Config {
            led_mode,
            led_power,
            pulse_width: pulse_width.into(),
            ..Config::default()
        };
        self.configure_with(&config).await
    }

    /// Resets the chip and applies every field of `config`.
    ///
    /// The sequence is: soft reset and settle for one second, pulse width,
    /// LED mode and amplitudes, sample rate, ADC range, averaging, rollover,
    /// and finally the FIFO pointers are cleared.
    ///
    /// # Errors
    ///
    /// Same as [`configure`](Self::configure).
    pub async fn configure_with(&mut self, config: &Config) -> Result<(), Error<E>> {
        debug!("Resetting sensor");
        self.masked_update(Register::ModeConfig, RESET_MASK, RESET)
            .await?;
        self.delay.delay_ms(RESET_SETTLE_MS).await;

        self.set_pulse_width(config.pulse_width).await?;

        let mode = match LedMode::from_channels(config.led_mode) {
            Some(mode) => mode,
            None => {
                warn!("Rejecting LED mode {}", config.led_mode);
                return Err(Error::InvalidMode(config.led_mode));
            }
        };

        debug!("Setting LED mode {:?}", mode);
        self.masked_update(Register::ModeConfig, MODE_MASK, mode.bits())
            .await?;
        self.write_byte(Register::Led1PulseAmplitude, config.led_power)
            .await?;
        if mode.channels() >= 2 {
            self.write_byte(Register::Led2PulseAmplitude, config.led_power)
                .await?;
        }
        if mode == LedMode::MultiLed {
            self.write_byte(Register::Led3PulseAmplitude, config.led_power)
                .await?;
            self.write_byte(Register::MultiLedCtrl1, MULTI_LED_SLOTS_1_2)
                .await?;
            self.write_byte(Register::MultiLedCtrl2, MULTI_LED_SLOTS_3_4)
                .await?;
        }
        self.led_mode = Some(mode);

        self.set_sample_rate(config.sample_rate).await?;
        self.set_adc_range(config.adc_range).await?;
        self.set_sample_averaging(config.sample_averaging).await?;
        self.set_fifo_rollover(config.fifo_rollover).await?;

        self.clear_fifo().await
    }

    /// Sets the LED pulse width (and with it the ADC resolution).
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn set_pulse_width(&mut self, pulse_width: PulseWidth) -> Result<(), Error<E>> {
        debug!("Setting pulse width {:?}", pulse_width);
        self.masked_update(Register::Spo2Config, PULSE_WIDTH_MASK, pulse_width.into())
            .await?;
        self.pulse_width = Some(pulse_width);
        Ok(())
    }

    /// Sets the sample rate.
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn set_sample_rate(&mut self, sample_rate: SampleRate) -> Result<(), Error<E>> {
        debug!("Setting sample rate {:?}", sample_rate);
        self.masked_update(Register::Spo2Config, SAMPLE_RATE_MASK, sample_rate.into())
            .await
    }

    /// Sets the ADC full scale.
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn set_adc_range(&mut self, adc_range: AdcRange) -> Result<(), Error<E>> {
        debug!("Setting ADC range {:?}", adc_range);
        self.masked_update(Register::Spo2Config, ADC_RANGE_MASK, adc_range.into())
            .await
    }

    /// Sets how many samples are averaged into one FIFO entry.
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn set_sample_averaging(
        &mut self,
        sample_averaging: SampleAveraging,
    ) -> Result<(), Error<E>> {
        debug!("Setting sample averaging {:?}", sample_averaging);
        self.masked_update(
            Register::FifoConfig,
            SAMPLE_AVERAGING_MASK,
            sample_averaging.into(),
        )
        .await
    }

    /// Enables or disables overwriting old samples once the FIFO is full.
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn set_fifo_rollover(&mut self, enable: bool) -> Result<(), Error<E>> {
        debug!("Setting FIFO rollover {}", enable);
        let bits = if enable { ROLLOVER_ENABLE } else { 0 };
        self.masked_update(Register::FifoConfig, ROLLOVER_MASK, bits)
            .await
    }

    /// Enables `led` in MODE_CONFIG and writes its pulse amplitude.
    ///
    /// **Note**: the cached LED mode is not touched, so
    /// [`read_sample`](Self::read_sample) keeps decoding with the channel count
    /// set by the last [`configure`](Self::configure).
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use max30105::{Led, Max30105, DEFAULT_ADDRESS};
    ///
    /// let i2c = embedded_hal_mock::eh1::i2c::Mock::new(&[]);
    /// let delay = embedded_hal_mock::eh1::delay::NoopDelay;
    /// let mut sensor = Max30105::new(i2c, delay, DEFAULT_ADDRESS).unwrap();
    ///
    /// sensor.configure(2, 0x1F, 0x01u8).unwrap();
    /// // Brighter IR
    /// sensor.set_led_power(Led::Ir, 0x7F).unwrap();
    /// ```
    pub async fn set_led_power(&mut self, led: Led, power: u8) -> Result<(), Error<E>> {
        debug!("Setting {:?} LED power {}", led, power);
        self.masked_update(Register::ModeConfig, MODE_MASK, led.mode_bits())
            .await?;
        self.write_byte(led.power_register(), power).await
    }

    /// Shorthand for [`set_led_power`](Self::set_led_power) with [`Led::Red`].
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn set_red_led_power(&mut self, power: u8) -> Result<(), Error<E>> {
        self.set_led_power(Led::Red, power).await
    }

    /// Shorthand for [`set_led_power`](Self::set_led_power) with [`Led::Ir`].
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn set_ir_led_power(&mut self, power: u8) -> Result<(), Error<E>> {
        self.set_led_power(Led::Ir, power).await
    }

    /// Shorthand for [`set_led_power`](Self::set_led_power) with [`Led::Green`].
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn set_green_led_power(&mut self, power: u8) -> Result<(), Error<E>> {
        self.set_led_power(Led::Green, power).await
    }

    /// Reads the FIFO entry at `pointer_position`.
    ///
    /// The read pointer is moved to `pointer_position`, then one entry of
    /// `3 × channels` bytes is read from FIFO_DATA. Each channel is decoded as
    /// a big-endian 3-byte value.
    ///
    /// # Errors
    ///
    /// * `Err(Error::NotConfigured)` - If [`configure`](Self::configure) has not
    ///   succeeded yet. Nothing is sent on the bus.
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use max30105::{Max30105, DEFAULT_ADDRESS};
    ///
    /// let i2c = embedded_hal_mock::eh1::i2c::Mock::new(&[]);
    /// let delay = embedded_hal_mock::eh1::delay::NoopDelay;
    /// let mut sensor = Max30105::new(i2c, delay, DEFAULT_ADDRESS).unwrap();
    ///
    /// sensor.configure(3, 0x1F, 0x03u8).unwrap();
    /// let sample = sensor.read_sample(0).unwrap();
    /// println!("red {} ir {} green {}", sample.red, sample.ir, sample.green);
    /// ```
    pub async fn read_sample(&mut self, pointer_position: u8) -> Result<Sample, Error<E>> {
        let mode = self.led_mode.ok_or(Error::NotConfigured)?;

        self.write_byte(Register::FifoReadPtr, pointer_position)
            .await?;

        let mut buffer = [0u8; 9];
        let len = mode.channels() * 3;
        self.read_register(Register::FifoData, &mut buffer[..len])
            .await?;

        Ok(Sample::from_fifo_bytes(&buffer[..len]))
    }

    /// Reads the write, overflow and read pointers in one transaction.
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn fifo_pointers(&mut self) -> Result<FifoPointers, Error<E>> {
        let mut buffer = [0u8; 3];
        self.read_register(Register::FifoWritePtr, &mut buffer)
            .await?;
        Ok(FifoPointers {
            write: buffer[0],
            overflow: buffer[1],
            read: buffer[2],
        })
    }

    /// Resets the FIFO write pointer, overflow counter and read pointer to 0.
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn clear_fifo(&mut self) -> Result<(), Error<E>> {
        self.write_byte(Register::FifoWritePtr, 0).await?;
        self.write_byte(Register::FifoOverflowCounter, 0).await?;
        self.write_byte(Register::FifoReadPtr, 0).await
    }

    /// Reads the PART_ID register. A MAX30105 answers [`EXPECTED_PART_ID`].
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn part_id(&mut self) -> Result<u8, Error<E>> {
        let id = self.read_byte(Register::PartId).await?;
        if id != EXPECTED_PART_ID {
            warn!("Unexpected part id {}", id);
        }
        Ok(id)
    }

    /// Reads `register_address`, keeps the bits selected by `mask` and ORs in
    /// `bits`, then writes the result back.
    ///
    /// `bits` must already be shifted into position.
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use max30105::{Max30105, Register, DEFAULT_ADDRESS};
    ///
    /// let i2c = embedded_hal_mock::eh1::i2c::Mock::new(&[]);
    /// let delay = embedded_hal_mock::eh1::delay::NoopDelay;
    /// let mut sensor = Max30105::new(i2c, delay, DEFAULT_ADDRESS).unwrap();
    ///
    /// // Shutdown bit (7) of MODE_CONFIG
    /// sensor.masked_update(Register::ModeConfig, 0x7F, 0x80).unwrap();
    /// ```
    pub async fn masked_update<R>(
        &mut self,
        register_address: R,
        mask: u8,
        bits: u8,
    ) -> Result<(), Error<E>>
    where
        R: Into<u8>,
    {
        let reg: u8 = register_address.into();
        let current = self.read_byte(reg).await?;
        self.write_byte(reg, (current & mask) | bits).await
    }

    /// Writes a single byte to a sensor register.
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn write_byte<R>(&mut self, register_address: R, value: u8) -> Result<(), Error<E>>
    where
        R: Into<u8>,
    {
        let reg: u8 = register_address.into();
        trace!("write {} <- {}", reg, value);
        self.i2c.write(self.address, &[reg, value]).await?;
        Ok(())
    }

    /// Reads a single byte from a sensor register.
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn read_byte<R>(&mut self, register_address: R) -> Result<u8, Error<E>>
    where
        R: Into<u8>,
    {
        let mut read_buffer = [0u8; 1];
        self.read_register(register_address, &mut read_buffer)
            .await?;
        Ok(read_buffer[0])
    }

    /// Reads `buffer.len()` bytes starting at `register_address`.
    ///
    /// The register pointer is written and the data read back in a single
    /// transaction. Registers auto-increment, except FIFO_DATA which keeps
    /// returning the next FIFO bytes.
    ///
    /// # Errors
    ///
    /// * `Err(Error::I2cError(E))` - If there was an I2C communication error
    pub async fn read_register<R>(
        &mut self,
        register_address: R,
        buffer: &mut [u8],
    ) -> Result<(), Error<E>>
    where
        R: Into<u8>,
    {
        let reg: u8 = register_address.into();
        self.i2c.write_read(self.address, &[reg], buffer).await?;
        trace!("read {} -> {} bytes", reg, buffer.len());
        Ok(())
    }

    /// LED mode set by the last successful [`configure`](Self::configure).
    #[must_use]
    pub fn led_mode(&self) -> Option<LedMode> {
        self.led_mode
    }

    /// Pulse width last written to the sensor.
    #[must_use]
    pub fn pulse_width(&self) -> Option<PulseWidth> {
        self.pulse_width
    }

    /// I2C address the driver talks to.
    #[must_use]
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Consumes the driver and hands back the bus and the delay.
    #[must_use]
    pub fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }
}

/// Error type for MAX30105 sensor operations.
///
/// # Examples
///
/// ```rust,no_run
/// use max30105::{Error, Max30105, DEFAULT_ADDRESS};
///
/// let i2c = embedded_hal_mock::eh1::i2c::Mock::new(&[]);
/// let delay = embedded_hal_mock::eh1::delay::NoopDelay;
///
/// match Max30105::new(i2c, delay, DEFAULT_ADDRESS) {
///     Ok(_) => println!("Sensor found"),
///     Err(Error::DeviceNotFound(e)) => println!("Sensor not found, check wiring: {:?}", e),
///     Err(e) => println!("Unexpected error: {}", e),
/// }
/// ```
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E: core::fmt::Debug> {
    /// Nothing answered the probe read at construction
    DeviceNotFound(E),
    /// I2C communication error from the underlying hardware
    I2cError(E),
    /// LED mode outside 1..=3
    InvalidMode(u8),
    /// Sample read before the LED mode was configured
    NotConfigured,
}

impl<E: core::fmt::Debug> core::fmt::Display for Error<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl<E: core::fmt::Debug> From<E> for Error<E> {
    fn from(error: E) -> Self {
        Error::I2cError(error)
    }
}
