use log::trace;

use crate::bus::{BusKind, Capabilities, Transport};
use crate::command::{CommandRequest, Data};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::platform::{BusPrimitives, HostPrimitives};
use crate::response::CommandResponse;

/// SPI mode transport. Owns the bus primitives of exactly one card slot.
pub struct SpiTransport<B> {
    bus: B,
    pub(crate) crc: bool,
    pub(crate) default_timeout_ms: u32,
    pub(crate) busy_timeout_ms: u32,
}

impl<B: BusPrimitives> SpiTransport<B> {
    pub fn new(bus: B) -> Self {
        let config = Config::default();
        Self {
            bus,
            crc: config.crc,
            default_timeout_ms: config.default_timeout_ms,
            busy_timeout_ms: config.busy_timeout_ms,
        }
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    pub fn free(self) -> B {
        self.bus
    }

    pub(crate) fn write_byte(&mut self, value: u8) -> Result<()> {
        self.bus.exchange(value).map(|_| ())
    }

    pub(crate) fn read_byte(&mut self) -> Result<u8> {
        self.bus.exchange(0xFF)
    }

    pub(crate) fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.bus.write(bytes)
    }

    pub(crate) fn read_bytes(&mut self, bytes: &mut [u8]) -> Result<()> {
        self.bus.read_filled(bytes)
    }

    fn select(&mut self) -> Result<()> {
        self.bus.select(true)
    }

    fn deselect(&mut self) -> Result<()> {
        self.bus.select(false)
    }

    /// Poll until the card releases the busy signal (DO held low).
    /// Every poll that still sees busy costs one millisecond.
    pub(crate) fn wait_busy<H: HostPrimitives>(&mut self, host: &mut H, timeout_ms: u32) -> Result<()> {
        for _ in 0..timeout_ms.max(1) {
            if self.read_byte()? == 0xFF {
                return Ok(());
            }
            host.delay_ms(1);
        }
        Err(Error::Timeout)
    }

    fn check_data(request: &CommandRequest, data: &Data<'_>) -> Result<()> {
        match (request.data, data) {
            (None, Data::None) => Ok(()),
            (Some(phase), data) if !data.is_none() => {
                if phase.block_count == 0 || phase.block_size == 0 || Some(data.len()) != phase.byte_len() {
                    return Err(Error::InvalidParameter);
                }
                if phase.auto_stop {
                    return Err(Error::Unsupported);
                }
                Ok(())
            }
            _ => Err(Error::InvalidParameter),
        }
    }
}

impl<B: BusPrimitives> Transport for SpiTransport<B> {
    fn kind(&self) -> BusKind {
        BusKind::Spi
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities { supports_4bit: false, supports_1v8: false, auto_stop: false }
    }

    fn configure(&mut self, config: &Config) {
        self.crc = config.crc;
        self.default_timeout_ms = config.default_timeout_ms;
        self.busy_timeout_ms = config.busy_timeout_ms;
    }

    fn send_clock(&mut self) -> Result<()> {
        self.deselect()?;
        // Supply minimum of 74 clock cycles without CS asserted.
        for _ in 0..10 {
            self.write_byte(0xFF)?;
        }
        Ok(())
    }

    fn set_clock(&mut self, hz: u32) -> Result<()> {
        self.bus.set_clock(hz)
    }

    fn set_bus_width(&mut self, bits: u8) -> Result<()> {
        match bits {
            1 => Ok(()),
            _ => Err(Error::Unsupported),
        }
    }

    fn submit<H: HostPrimitives>(
        &mut self,
        host: &mut H,
        request: &CommandRequest,
        data: Data<'_>,
    ) -> Result<CommandResponse> {
        if request.index > 63 {
            return Err(Error::InvalidParameter);
        }
        Self::check_data(request, &data)?;

        // Release any pending busy and respect Ncs before selecting
        self.write_byte(0xFF)?;
        self.select()?;
        let result = self.transaction(host, request, data);
        let deselected = self.deselect();
        // 8 more cycles so the card releases DO
        let released = self.write_byte(0xFF);
        let response = result?;
        deselected?;
        released?;
        trace!("CMD{} -> R1 {:#04x} {:#010x}", request.index, response.r1, response.words[0]);
        Ok(response)
    }
}
