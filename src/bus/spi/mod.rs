//! SPI mode framing: the only place that knows the wire format.

mod bus;
mod command;
mod read;
mod response;
mod write;

pub use bus::SpiTransport;
pub use response::{WriteToken, BLOCK_START_TOKEN};
