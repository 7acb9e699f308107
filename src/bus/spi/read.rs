use crate::command::DataPhase;
use crate::crc::crc16;
use crate::error::{Error, Result};
use crate::platform::{BusPrimitives, HostPrimitives};

use super::bus::SpiTransport;
use super::response::{ErrorToken, BLOCK_START_TOKEN};

impl<B: BusPrimitives> SpiTransport<B> {
    /// Wait for the start data token. The card may answer with an error
    /// token instead; anything else but idle 0xFF is a framing error.
    fn start_read_block<H: HostPrimitives>(&mut self, host: &mut H, timeout_ms: u32) -> Result<()> {
        for _ in 0..timeout_ms.max(1) {
            let token = self.read_byte()?;
            if token == BLOCK_START_TOKEN {
                return Ok(());
            }
            if let Some(token) = ErrorToken::try_from(token) {
                return Err(token.error());
            }
            if token != 0xFF {
                return Err(Error::Protocol);
            }
            host.delay_ms(1);
        }
        Err(Error::Timeout)
    }

    fn stop_read_block(&mut self, block: &[u8]) -> Result<()> {
        let mut crc = [0xFF; 2];
        self.read_bytes(&mut crc)?;
        if self.crc && u16::from_be_bytes(crc) != crc16(block) {
            return Err(Error::Crc);
        }
        Ok(())
    }

    pub(crate) fn read_blocks<H: HostPrimitives>(
        &mut self,
        host: &mut H,
        phase: &DataPhase,
        blocks: &mut [u8],
        timeout_ms: u32,
    ) -> Result<()> {
        for block in blocks.chunks_mut(phase.block_size) {
            self.start_read_block(host, timeout_ms)?;
            self.read_bytes(block)?;
            self.stop_read_block(block)?;
        }
        Ok(())
    }
}
