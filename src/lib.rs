#![cfg_attr(not(test), no_std)]

pub mod bus;
pub mod card;
pub mod command;
pub mod config;
pub mod crc;
pub mod error;
pub mod host;
pub mod platform;
pub mod registers;
pub mod response;

#[cfg(feature = "spi")]
pub use bus::spi::SpiTransport;
pub use bus::{BusKind, Capabilities, Transport, SD_BLOCK_SIZE};
pub use card::{BringUp, BringUpState, Card, CardState, Speed};
pub use config::Config;
pub use error::{status_code, Error, Result};
pub use host::HostContext;
pub use platform::{BusPrimitives, HostPrimitives};
