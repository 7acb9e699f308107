//! Platform port built from embedded-hal blocking traits.

use core::convert::Infallible;

use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::blocking::spi;
use embedded_hal::digital::v2::{InputPin, OutputPin};

use crate::error::{Error, Result};

use super::{BusPrimitives, HostPrimitives};

/// SPI peripheral plus chip-select pin
pub struct HalSpi<SPI, CS> {
    spi: SPI,
    cs: CS,
    clock_hz: u32,
    set_clock: Option<fn(&mut SPI, u32)>,
}

impl<SPI, CS, E, OE> HalSpi<SPI, CS>
where
    SPI: spi::Transfer<u8, Error = E> + spi::Write<u8, Error = E>,
    CS: OutputPin<Error = OE>,
{
    pub fn new(spi: SPI, cs: CS) -> Self {
        Self { spi, cs, clock_hz: 0, set_clock: None }
    }

    /// embedded-hal has no clock control, the port hands in its own
    pub fn with_clock_control(mut self, set_clock: fn(&mut SPI, u32)) -> Self {
        self.set_clock = Some(set_clock);
        self
    }

    /// Last clock rate requested by the driver
    pub fn clock_hz(&self) -> u32 {
        self.clock_hz
    }

    pub fn free(self) -> (SPI, CS) {
        (self.spi, self.cs)
    }
}

impl<SPI, CS, E, OE> BusPrimitives for HalSpi<SPI, CS>
where
    SPI: spi::Transfer<u8, Error = E> + spi::Write<u8, Error = E>,
    CS: OutputPin<Error = OE>,
{
    fn select(&mut self, selected: bool) -> Result<()> {
        let result = if selected { self.cs.set_low() } else { self.cs.set_high() };
        result.map_err(|_| Error::Io)
    }

    fn exchange(&mut self, byte: u8) -> Result<u8> {
        let mut value = byte;
        self.spi.transfer(core::slice::from_mut(&mut value)).map_err(|_| Error::Io)?;
        Ok(value)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.spi.write(bytes).map_err(|_| Error::Io)
    }

    fn read_filled(&mut self, buffer: &mut [u8]) -> Result<()> {
        for byte in buffer.iter_mut() {
            *byte = 0xFF;
        }
        self.spi.transfer(buffer).map_err(|_| Error::Io)?;
        Ok(())
    }

    fn set_clock(&mut self, hz: u32) -> Result<()> {
        self.clock_hz = hz;
        if let Some(set_clock) = self.set_clock {
            set_clock(&mut self.spi, hz);
        }
        Ok(())
    }
}

/// Stand-in for a missing card detect pin
pub struct DummyInputPin;

impl InputPin for DummyInputPin {
    type Error = Infallible;

    fn is_high(&self) -> core::result::Result<bool, Self::Error> {
        Ok(true)
    }

    fn is_low(&self) -> core::result::Result<bool, Self::Error> {
        Ok(false)
    }
}

/// Delay provider plus an optional card detect pin
pub struct HalHost<D, DETECT = DummyInputPin> {
    delay: D,
    detect: Option<DETECT>,
    /// Whether a pulled high detect pin means a card is inserted
    detect_high_activated: bool,
}

impl<D: DelayMs<u32>> HalHost<D, DummyInputPin> {
    pub fn new(delay: D) -> Self {
        Self { delay, detect: None, detect_high_activated: false }
    }
}

impl<D: DelayMs<u32>, DETECT: InputPin> HalHost<D, DETECT> {
    pub fn with_detect(delay: D, detect: DETECT, detect_high_activated: bool) -> Self {
        Self { delay, detect: Some(detect), detect_high_activated }
    }
}

impl<D: DelayMs<u32>, DETECT: InputPin> HostPrimitives for HalHost<D, DETECT> {
    fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms)
    }

    fn card_present(&mut self) -> Option<bool> {
        let detect = self.detect.as_ref()?;
        // A pin that cannot be read is treated as if there were none
        let level = detect.is_high().ok()?;
        Some(level == self.detect_high_activated)
    }
}
