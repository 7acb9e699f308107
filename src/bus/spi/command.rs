use log::trace;

use crate::command::{
    CommandRequest, Data, ResponseKind, CMD0_GO_IDLE_STATE, CMD12_STOP_TRANSMISSION,
    CMD8_SEND_IF_COND,
};
use crate::crc::crc7;
use crate::error::{Error, Result};
use crate::platform::{BusPrimitives, HostPrimitives};
use crate::response::{CommandResponse, R1};

use super::bus::SpiTransport;

impl<B: BusPrimitives> SpiTransport<B> {
    /// Build the 6 byte command frame. CMD0 and CMD8 always carry a valid
    /// CRC since the card checks them before CRC can be switched off.
    pub(crate) fn frame(&self, index: u8, argument: u32) -> [u8; 6] {
        let mut frame = [0u8; 6];
        frame[0] = 0x40 | (index & 0x3F);
        frame[1..5].copy_from_slice(&argument.to_be_bytes());
        frame[5] = match index {
            CMD0_GO_IDLE_STATE | CMD8_SEND_IF_COND => crc7(&frame[..5]),
            _ if self.crc => crc7(&frame[..5]),
            _ => 0x01,
        };
        frame
    }

    /// Clock 0xFF until a byte with bit 7 clear shows up. Each miss costs
    /// one millisecond, so `timeout_ms` is also the number of polls.
    pub(crate) fn wait_r1<H: HostPrimitives>(&mut self, host: &mut H, timeout_ms: u32) -> Result<u8> {
        for _ in 0..timeout_ms {
            let value = self.read_byte()?;
            if value & 0x80 == 0 {
                return Ok(value);
            }
            host.delay_ms(1);
        }
        Err(Error::Timeout)
    }

    fn read_response(&mut self, kind: ResponseKind, r1: u8) -> Result<CommandResponse> {
        let mut response = CommandResponse { r1, words: [0; 4] };
        match kind {
            ResponseKind::None | ResponseKind::R1 | ResponseKind::R1b | ResponseKind::R6 => {
                response.words[0] = r1 as u32;
            }
            ResponseKind::R3 | ResponseKind::R7 => {
                let mut bytes = [0xFF; 4];
                self.read_bytes(&mut bytes)?;
                response.words[0] = u32::from_be_bytes(bytes);
            }
            ResponseKind::R2 => {
                let mut bytes = [0xFF; 16];
                self.read_bytes(&mut bytes)?;
                for (word, chunk) in response.words.iter_mut().zip(bytes.chunks_exact(4)) {
                    *word = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                }
            }
        }
        Ok(response)
    }

    /// Everything between chip-select assert and release
    pub(crate) fn transaction<H: HostPrimitives>(
        &mut self,
        host: &mut H,
        request: &CommandRequest,
        data: Data<'_>,
    ) -> Result<CommandResponse> {
        let frame = self.frame(request.index, request.argument);
        trace!("frame {:02x?}", frame);
        self.write_bytes(&frame)?;
        if request.index == CMD12_STOP_TRANSMISSION {
            // Stuff byte, the card may still be shifting out data
            self.read_byte()?;
        }

        let timeout_ms = match request.timeout_ms {
            0 => self.default_timeout_ms,
            timeout_ms => timeout_ms,
        };
        let r1 = self.wait_r1(host, timeout_ms)?;
        let response = self.read_response(request.response, r1)?;
        if request.response == ResponseKind::R1b {
            self.wait_busy(host, timeout_ms)?;
        }

        if let Some(phase) = request.data {
            if R1(r1).is_error() {
                return Ok(response);
            }
            match data {
                Data::Read(buffer) => self.read_blocks(host, &phase, buffer, timeout_ms)?,
                Data::Write(buffer) => self.write_blocks(host, &phase, buffer)?,
                Data::None => return Err(Error::InvalidParameter),
            }
        }
        Ok(response)
    }
}
