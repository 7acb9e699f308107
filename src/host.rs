use log::debug;

use crate::bus::{BusKind, Transport};
use crate::command::{CommandRequest, Data, ResponseKind, CMD55_APP_CMD};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::platform::HostPrimitives;
use crate::response::CommandResponse;

#[cfg(feature = "spi")]
use crate::bus::spi::SpiTransport;
#[cfg(feature = "spi")]
use crate::platform::BusPrimitives;

/// One card slot: a bound transport plus the host services it runs on.
pub struct HostContext<T, H> {
    transport: T,
    host: H,
    config: Config,
    /// Controller clock ceiling
    pub max_clock_hz: u32,
    pub supports_4bit: bool,
    pub supports_1v8: bool,
    last_cmd: Option<u8>,
}

#[cfg(feature = "spi")]
impl<B: BusPrimitives, H: HostPrimitives> HostContext<SpiTransport<B>, H> {
    /// Host driving the card in SPI mode over `bus`
    pub fn spi(bus: B, host: H) -> Self {
        Self::new(SpiTransport::new(bus), host)
    }

    pub fn spi_with_config(bus: B, host: H, config: Config) -> Self {
        Self::with_config(SpiTransport::new(bus), host, config)
    }
}

impl<T: Transport, H: HostPrimitives> HostContext<T, H> {
    pub fn new(transport: T, host: H) -> Self {
        Self::with_config(transport, host, Config::default())
    }

    pub fn with_config(mut transport: T, host: H, config: Config) -> Self {
        transport.configure(&config);
        let capabilities = transport.capabilities();
        Self {
            transport,
            host,
            config,
            max_clock_hz: config.max_clock_hz,
            supports_4bit: capabilities.supports_4bit,
            supports_1v8: capabilities.supports_1v8,
            last_cmd: None,
        }
    }

    /// Swap in another transport of the same kind, returning the old one
    pub fn replace_transport(&mut self, mut transport: T) -> T {
        transport.configure(&self.config);
        let capabilities = transport.capabilities();
        self.supports_4bit = capabilities.supports_4bit;
        self.supports_1v8 = capabilities.supports_1v8;
        self.last_cmd = None;
        core::mem::replace(&mut self.transport, transport)
    }

    /// Move the host services onto a transport of another type
    pub fn rebind<U: Transport>(self, transport: U) -> (HostContext<U, H>, T) {
        let mut host = HostContext::with_config(transport, self.host, self.config);
        host.max_clock_hz = self.max_clock_hz;
        (host, self.transport)
    }

    pub fn release(self) -> (T, H) {
        (self.transport, self.host)
    }

    pub fn bus_kind(&self) -> BusKind {
        self.transport.kind()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn last_cmd(&self) -> Option<u8> {
        self.last_cmd
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn submit(&mut self, request: &CommandRequest, data: Data<'_>) -> Result<CommandResponse> {
        self.last_cmd = Some(request.index);
        self.transport.submit(&mut self.host, request, data)
    }

    /// CMD55 followed by the application command `request`
    pub fn submit_app(&mut self, request: &CommandRequest, data: Data<'_>) -> Result<CommandResponse> {
        let app_cmd = CommandRequest::new(CMD55_APP_CMD, 0, ResponseKind::R1)
            .with_timeout(self.config.app_cmd_timeout_ms);
        let response = self.submit(&app_cmd, Data::None)?;
        if response.r1().is_error() {
            return Err(Error::Io);
        }
        self.submit(request, data)
    }

    /// Clamped to `max_clock_hz`, returns the rate actually requested
    pub fn set_clock(&mut self, hz: u32) -> Result<u32> {
        let hz = hz.min(self.max_clock_hz);
        debug!("clock {} Hz", hz);
        self.transport.set_clock(hz)?;
        Ok(hz)
    }

    pub fn set_bus_width(&mut self, bits: u8) -> Result<()> {
        if bits == 4 && !self.supports_4bit {
            return Err(Error::Unsupported);
        }
        self.transport.set_bus_width(bits)
    }

    pub fn send_clock(&mut self) -> Result<()> {
        self.transport.send_clock()
    }

    pub fn delay_ms(&mut self, ms: u32) {
        self.host.delay_ms(ms)
    }

    pub fn set_power(&mut self, on: bool) -> Result<()> {
        self.host.set_power(on)
    }

    pub fn card_present(&mut self) -> Option<bool> {
        self.host.card_present()
    }

    pub(crate) fn lock(&mut self) {
        self.host.lock()
    }

    pub(crate) fn unlock(&mut self) {
        self.host.unlock()
    }
}
