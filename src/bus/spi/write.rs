use log::warn;

use crate::command::DataPhase;
use crate::crc::crc16;
use crate::error::{Error, Result};
use crate::platform::{BusPrimitives, HostPrimitives};

use super::bus::SpiTransport;
use super::response::{DataResponse, WriteToken};

impl<B: BusPrimitives> SpiTransport<B> {
    fn start_write_block(&mut self, multi_block: bool) -> Result<()> {
        // Nwr
        self.write_byte(0xFF)?;
        let token = if multi_block { WriteToken::MultiWrite } else { WriteToken::SingleWrite };
        self.write_byte(token as u8)
    }

    fn stop_write_block(&mut self, block: &[u8]) -> Result<()> {
        // Ignored by the card unless CRC checking is on
        let crc = if self.crc { crc16(block) } else { 0xFFFF };
        self.write_bytes(&crc.to_be_bytes())?;
        let token = DataResponse::try_from(self.read_byte()?).ok_or(Error::Protocol)?;
        token.check()
    }

    fn stop_write_multi_block<H: HostPrimitives>(&mut self, host: &mut H) -> Result<()> {
        self.write_byte(WriteToken::StopTransmit as u8)?;
        // Nbr, busy starts one byte after the stop token
        self.read_byte()?;
        let timeout_ms = self.busy_timeout_ms;
        self.wait_busy(host, timeout_ms)
    }

    fn write_stream<H: HostPrimitives>(
        &mut self,
        host: &mut H,
        phase: &DataPhase,
        blocks: &[u8],
    ) -> Result<()> {
        let timeout_ms = self.busy_timeout_ms;
        for block in blocks.chunks(phase.block_size) {
            self.start_write_block(phase.multi_block)?;
            self.write_bytes(block)?;
            self.stop_write_block(block)?;
            self.wait_busy(host, timeout_ms)?;
        }
        Ok(())
    }

    pub(crate) fn write_blocks<H: HostPrimitives>(
        &mut self,
        host: &mut H,
        phase: &DataPhase,
        blocks: &[u8],
    ) -> Result<()> {
        let result = self.write_stream(host, phase, blocks);
        if !phase.multi_block {
            return result;
        }
        match result {
            Ok(()) => self.stop_write_multi_block(host),
            Err(error) => {
                // Leave the receive-data state so the next command is understood
                if self.stop_write_multi_block(host).is_err() {
                    warn!("stop-tran after failed write not acknowledged");
                }
                Err(error)
            }
        }
    }
}
