use log::{debug, warn};

use crate::bus::Transport;
use crate::command::{
    CommandRequest, Data, DataPhase, ResponseKind, CMD12_STOP_TRANSMISSION,
    CMD17_READ_SINGLE_BLOCK, CMD18_READ_MULTIPLE_BLOCK, CMD24_WRITE_BLOCK,
    CMD25_WRITE_MULTIPLE_BLOCK, CMD32_ERASE_WR_BLK_START, CMD33_ERASE_WR_BLK_END, CMD38_ERASE,
};
use crate::error::{Error, Result};
use crate::platform::HostPrimitives;

use super::card::{expect_ok, Card};

impl<'h, T: Transport, H: HostPrimitives> Card<'h, T, H> {
    /// Number of whole blocks in a buffer of `len` bytes
    fn block_count(&self, len: usize) -> Result<u32> {
        let block_len = self.state.block_len as usize;
        if block_len == 0 || len == 0 || len % block_len != 0 {
            return Err(Error::InvalidParameter);
        }
        let count = len / block_len;
        if count > u32::MAX as usize {
            return Err(Error::InvalidParameter);
        }
        Ok(count as u32)
    }

    /// Card address of `first`, after making sure `first..=last` is addressable
    fn range_address(&self, first: u32, last: u32) -> Result<u32> {
        if first > last {
            return Err(Error::InvalidParameter);
        }
        let blocks = self.state.block_count();
        if blocks > 0 && last as u64 >= blocks {
            return Err(Error::InvalidParameter);
        }
        self.address(last)?;
        self.address(first)
    }

    fn track_lock<R>(&mut self, result: Result<R>) -> Result<R> {
        if let Err(Error::Locked) = result {
            self.state.locked = true;
        }
        result
    }

    fn stop_transmission(&mut self) -> Result<()> {
        let timeout_ms = self.host.config().read_timeout_ms;
        let request = CommandRequest::new(CMD12_STOP_TRANSMISSION, 0, ResponseKind::R1b)
            .with_timeout(timeout_ms);
        let result = self.host.submit(&request, Data::None).and_then(|r| expect_ok(r.r1()));
        if result.is_err() {
            // Some cards need a second try when the stop lands on a block boundary
            warn!("CMD12 failed, retrying");
            return self.host.submit(&request, Data::None).and_then(|r| expect_ok(r.r1()));
        }
        result
    }

    fn read(&mut self, lba: u32, count: u32, blocks: &mut [u8]) -> Result<()> {
        let argument = self.range_address(lba, lba.checked_add(count - 1).ok_or(Error::InvalidParameter)?)?;
        let timeout_ms = self.host.config().read_timeout_ms;
        let block_len = self.state.block_len as usize;
        debug!("read {} block(s) at {}", count, lba);

        if count == 1 {
            let request = CommandRequest::new(CMD17_READ_SINGLE_BLOCK, argument, ResponseKind::R1)
                .with_data(DataPhase::single(block_len))
                .with_timeout(timeout_ms);
            let response = self.host.submit(&request, Data::Read(blocks))?;
            return expect_ok(response.r1());
        }

        let mut phase = DataPhase::multiple(count, block_len);
        phase.auto_stop = self.host.transport().capabilities().auto_stop;
        let request = CommandRequest::new(CMD18_READ_MULTIPLE_BLOCK, argument, ResponseKind::R1)
            .with_data(phase)
            .with_timeout(timeout_ms);
        let result = self.host.submit(&request, Data::Read(blocks)).and_then(|r| expect_ok(r.r1()));
        if phase.auto_stop {
            return result;
        }
        let stopped = self.stop_transmission();
        result?;
        stopped
    }

    fn write(&mut self, lba: u32, count: u32, blocks: &[u8]) -> Result<()> {
        let argument = self.range_address(lba, lba.checked_add(count - 1).ok_or(Error::InvalidParameter)?)?;
        let timeout_ms = self.host.config().write_timeout_ms;
        let block_len = self.state.block_len as usize;
        debug!("write {} block(s) at {}", count, lba);

        let (index, phase) = match count {
            1 => (CMD24_WRITE_BLOCK, DataPhase::single(block_len)),
            _ => (CMD25_WRITE_MULTIPLE_BLOCK, DataPhase::multiple(count, block_len)),
        };
        let request =
            CommandRequest::new(index, argument, ResponseKind::R1).with_data(phase).with_timeout(timeout_ms);
        let response = self.host.submit(&request, Data::Write(blocks))?;
        expect_ok(response.r1())
    }

    fn erase(&mut self, first: u32, last: u32) -> Result<()> {
        let start = self.range_address(first, last)?;
        let end = self.address(last)?;
        let config = *self.host.config();
        debug!("erase blocks {}..={}", first, last);

        let request = CommandRequest::new(CMD32_ERASE_WR_BLK_START, start, ResponseKind::R1);
        expect_ok(self.host.submit(&request, Data::None)?.r1())?;
        let request = CommandRequest::new(CMD33_ERASE_WR_BLK_END, end, ResponseKind::R1);
        expect_ok(self.host.submit(&request, Data::None)?.r1())?;
        let request =
            CommandRequest::new(CMD38_ERASE, 0, ResponseKind::R1b).with_timeout(config.erase_timeout_ms);
        expect_ok(self.host.submit(&request, Data::None)?.r1())
    }

    /// Read `blocks.len() / 512` consecutive blocks starting at `lba`
    pub fn read_blocks(&mut self, lba: u32, blocks: &mut [u8]) -> Result<()> {
        let count = self.block_count(blocks.len())?;
        let result = self.exclusive(|card| card.read(lba, count, blocks));
        self.track_lock(result)
    }

    /// Write `blocks.len() / 512` consecutive blocks starting at `lba`
    pub fn write_blocks(&mut self, lba: u32, blocks: &[u8]) -> Result<()> {
        let count = self.block_count(blocks.len())?;
        let result = self.exclusive(|card| card.write(lba, count, blocks));
        self.track_lock(result)
    }

    /// Erase the inclusive block range `first..=last`
    pub fn erase_range(&mut self, first: u32, last: u32) -> Result<()> {
        self.exclusive(|card| card.erase(first, last))
    }
}
