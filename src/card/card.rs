use crate::bus::Transport;
use crate::error::{Error, Result};
use crate::host::HostContext;
use crate::platform::HostPrimitives;
use crate::registers::{Cid, Csd, Ocr, Scr};
use crate::response::R1;

use super::init::BringUp;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Speed {
    /// 12.5 MB/s
    Default,
    /// 25 MB/s
    High,
    /// 50 MB/s
    UhsSdr50,
    /// 104 MB/s
    UhsSdr104,
    /// 156 MB/s
    UhsII,
    /// 312 MB/s
    UhsIII,
}

impl Default for Speed {
    fn default() -> Self {
        Speed::Default
    }
}

/// Everything learnt about a card during bring-up.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CardState {
    pub(crate) v2: bool,
    pub(crate) high_capacity: bool,
    pub(crate) capacity_bytes: u64,
    pub(crate) rca: u32,
    pub(crate) block_len: u32,
    pub(crate) curr_speed: Speed,
    pub(crate) bus_4bit: bool,
    pub(crate) locked: bool,
    pub(crate) ocr: u32,
    pub(crate) cid: [u8; 16],
    pub(crate) csd: [u8; 16],
    pub(crate) scr: [u8; 8],
}

impl CardState {
    /// Answered the interface condition command
    pub fn v2(&self) -> bool {
        self.v2
    }

    /// Block addressed (SDHC/SDXC)
    pub fn high_capacity(&self) -> bool {
        self.high_capacity
    }

    /// Zero when the CSD was not read
    pub fn capacity_bytes(&self) -> u64 {
        self.capacity_bytes
    }

    /// Relative card address, always 0 in SPI mode
    pub fn rca(&self) -> u32 {
        self.rca
    }

    pub fn block_len(&self) -> u32 {
        self.block_len
    }

    pub fn curr_speed(&self) -> Speed {
        self.curr_speed
    }

    pub fn bus_4bit(&self) -> bool {
        self.bus_4bit
    }

    pub fn locked(&self) -> bool {
        self.locked
    }

    pub fn ocr(&self) -> Ocr {
        Ocr(self.ocr)
    }

    pub fn cid(&self) -> Cid {
        Cid(self.cid)
    }

    pub fn csd(&self) -> Csd {
        Csd(self.csd)
    }

    pub fn scr(&self) -> Scr {
        Scr(self.scr)
    }

    /// Number of addressable blocks, zero when unknown
    pub fn block_count(&self) -> u64 {
        match self.block_len {
            0 => 0,
            block_len => self.capacity_bytes / block_len as u64,
        }
    }
}

/// An initialized card, bound to the host that brought it up.
pub struct Card<'h, T: Transport, H: HostPrimitives> {
    pub(crate) host: &'h mut HostContext<T, H>,
    pub(crate) state: CardState,
}

impl<'h, T: Transport, H: HostPrimitives> Card<'h, T, H> {
    /// Run the identification sequence. On failure nothing about the card
    /// is kept and the whole sequence has to be started over.
    pub fn init(host: &'h mut HostContext<T, H>) -> Result<Self> {
        host.lock();
        let state = match BringUp::new(host).run() {
            Ok(state) => state,
            Err(e) => {
                host.unlock();
                return Err(e);
            }
        };
        let mut card = Card { host, state };
        let result = card.identify();
        card.host.unlock();
        result.map(|_| card)
    }

    pub fn state(&self) -> &CardState {
        &self.state
    }

    pub fn host(&self) -> &HostContext<T, H> {
        self.host
    }

    /// Give the host back, keeping what was learnt about the card
    pub fn release(self) -> CardState {
        self.state
    }

    /// Run `f` with the host lock held
    pub(crate) fn exclusive<R, F>(&mut self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Self) -> Result<R>,
    {
        self.host.lock();
        let result = f(self);
        self.host.unlock();
        result
    }

    /// SDSC cards (CCS=0) use byte addresses,
    /// SDHC and SDXC cards (CCS=1) use block addresses.
    pub(crate) fn address(&self, lba: u32) -> Result<u32> {
        if self.state.high_capacity {
            Ok(lba)
        } else {
            lba.checked_mul(self.state.block_len).ok_or(Error::InvalidParameter)
        }
    }
}

pub(crate) fn expect_ok(r1: R1) -> Result<()> {
    if r1.is_error() {
        Err(Error::Io)
    } else {
        Ok(())
    }
}
