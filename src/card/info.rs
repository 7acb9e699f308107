use core::fmt;

use crate::bus::Transport;
use crate::platform::HostPrimitives;

use super::card::{Card, CardState};

const SDSC_MAX_BYTES: u64 = 2 << 30;
const SDHC_MAX_BYTES: u64 = 32 << 30;

impl CardState {
    /// Marketing name of the capacity class
    pub fn kind(&self) -> &'static str {
        match (self.high_capacity, self.capacity_bytes) {
            (false, _) => "SDSC",
            (true, bytes) if bytes > SDHC_MAX_BYTES => "SDXC",
            (true, _) => "SDHC",
        }
    }
}

impl fmt::Display for CardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "type: {}{}", self.kind(), if self.locked { " (locked)" } else { "" })?;
        writeln!(f, "capacity: {} MiB", self.capacity_bytes >> 20)?;
        if !self.high_capacity && self.capacity_bytes > SDSC_MAX_BYTES {
            writeln!(f, "warning: standard capacity card reports more than 2 GiB")?;
        }
        writeln!(f, "ocr: {:#010x}", self.ocr)?;
        writeln!(f, "speed: {:?}", self.curr_speed)?;
        writeln!(f, "bus width: {}", if self.bus_4bit { 4 } else { 1 })?;
        if self.cid != [0; 16] {
            let cid = self.cid();
            let name = cid.product_name();
            let (major, minor) = cid.product_revision();
            let (year, month) = cid.manufacturing_date();
            writeln!(f, "manufacturer: {:#04x}", cid.manufacturer_id())?;
            match core::str::from_utf8(&name) {
                Ok(name) => writeln!(f, "product: {} rev {}.{}", name, major, minor)?,
                Err(_) => writeln!(f, "product: {:02x?} rev {}.{}", name, major, minor)?,
            }
            writeln!(f, "serial: {:#010x}", cid.serial_number())?;
            writeln!(f, "date: {}-{:02}", year, month)?;
        }
        Ok(())
    }
}

impl<'h, T: Transport, H: HostPrimitives> Card<'h, T, H> {
    pub fn info(&self) -> &CardState {
        &self.state
    }

    pub fn dump_info<W: fmt::Write>(&self, out: &mut W) -> fmt::Result {
        write!(out, "{}", self.state)
    }
}
