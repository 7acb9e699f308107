#[cfg(feature = "spi")]
pub mod spi;

use crate::command::{CommandRequest, Data};
use crate::config::Config;
use crate::error::Result;
use crate::platform::HostPrimitives;
use crate::response::CommandResponse;

pub const SD_BLOCK_SIZE: usize = 512;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BusKind {
    Spi,
    /// Native SD bus, reserved for a future transport
    SdBus,
}

/// What the controller behind a transport can do
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub supports_4bit: bool,
    pub supports_1v8: bool,
    /// Controller issues the stop command after a multi block transfer
    pub auto_stop: bool,
}

/// Turns abstract command requests into bus traffic.
pub trait Transport {
    fn kind(&self) -> BusKind;

    fn capabilities(&self) -> Capabilities;

    /// Pick up the driver settings relevant for framing
    fn configure(&mut self, config: &Config);

    /// Wake-up clocks a freshly powered card needs before its first command
    fn send_clock(&mut self) -> Result<()>;

    fn set_clock(&mut self, hz: u32) -> Result<()>;

    /// Data lines, 1 or 4
    fn set_bus_width(&mut self, bits: u8) -> Result<()>;

    /// Issue one command, perform its data phase if any and decode the
    /// response. R1 error bits are not an `Err`, the caller interprets
    /// them; the data phase is skipped when R1 reports an error.
    fn submit<H: HostPrimitives>(
        &mut self,
        host: &mut H,
        request: &CommandRequest,
        data: Data<'_>,
    ) -> Result<CommandResponse>;
}
