//! Capabilities a platform port provides to the driver.

#[cfg(feature = "hal")]
pub mod hal;

use crate::error::Result;

/// Raw access to a byte-oriented SPI peripheral and its chip-select line.
pub trait BusPrimitives {
    /// Assert (`true`) or release (`false`) chip-select
    fn select(&mut self, selected: bool) -> Result<()>;

    /// Full duplex exchange of a single byte
    fn exchange(&mut self, byte: u8) -> Result<u8>;

    /// Transmit a buffer, discarding whatever is received
    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        for &byte in bytes {
            self.exchange(byte)?;
        }
        Ok(())
    }

    /// Receive into `buffer` while clocking out 0xFF
    fn read_filled(&mut self, buffer: &mut [u8]) -> Result<()> {
        for slot in buffer.iter_mut() {
            *slot = self.exchange(0xFF)?;
        }
        Ok(())
    }

    fn set_clock(&mut self, hz: u32) -> Result<()>;
}

/// Timing, power and locking services of the host.
pub trait HostPrimitives {
    fn delay_ms(&mut self, ms: u32);

    /// Switch card power, a no-op for hosts without power control
    fn set_power(&mut self, _on: bool) -> Result<()> {
        Ok(())
    }

    /// Card detect line, `None` when the slot has none
    fn card_present(&mut self) -> Option<bool> {
        None
    }

    /// Taken around every card operation when the bus is shared
    fn lock(&mut self) {}

    fn unlock(&mut self) {}
}

impl<B: BusPrimitives + ?Sized> BusPrimitives for &mut B {
    fn select(&mut self, selected: bool) -> Result<()> {
        (**self).select(selected)
    }

    fn exchange(&mut self, byte: u8) -> Result<u8> {
        (**self).exchange(byte)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).write(bytes)
    }

    fn read_filled(&mut self, buffer: &mut [u8]) -> Result<()> {
        (**self).read_filled(buffer)
    }

    fn set_clock(&mut self, hz: u32) -> Result<()> {
        (**self).set_clock(hz)
    }
}

impl<H: HostPrimitives + ?Sized> HostPrimitives for &mut H {
    fn delay_ms(&mut self, ms: u32) {
        (**self).delay_ms(ms)
    }

    fn set_power(&mut self, on: bool) -> Result<()> {
        (**self).set_power(on)
    }

    fn card_present(&mut self) -> Option<bool> {
        (**self).card_present()
    }

    fn lock(&mut self) {
        (**self).lock()
    }

    fn unlock(&mut self) {
        (**self).unlock()
    }
}
