//! Card identification in SPI mode.

use log::{debug, warn};

use crate::bus::{Transport, SD_BLOCK_SIZE};
use crate::command::{
    CommandRequest, Data, ResponseKind, ACMD41_SD_SEND_OP_COND, CMD0_GO_IDLE_STATE,
    CMD16_SET_BLOCKLEN, CMD55_APP_CMD, CMD58_READ_OCR, CMD59_CRC_ON_OFF, CMD8_SEND_IF_COND,
};
use crate::error::{Error, Result};
use crate::host::HostContext;
use crate::platform::HostPrimitives;
use crate::registers::{Ocr, OCR_HCS, OCR_VOLTAGE_WINDOW};
use crate::response::{R1Field, BitField, R1};

use super::card::{expect_ok, CardState};

/// Voltage supplied (VHS) field of CMD8: 2.7-3.6V
pub const IF_COND_VOLTAGE: u32 = 0x1;
/// Echoed back by the card in the low byte of R7
pub const IF_COND_CHECK_PATTERN: u32 = 0xAA;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BringUpState {
    Start,
    Idle,
    VoltageChecked,
    OpCondReady,
    PowerReady,
    BlockLenSet,
    Failed(Error),
}

impl BringUpState {
    pub fn is_terminal(self) -> bool {
        match self {
            BringUpState::BlockLenSet | BringUpState::Failed(_) => true,
            _ => false,
        }
    }
}

/// Drives a host through CMD0, CMD8, ACMD41, CMD58 and CMD16. Every loop
/// is bounded, so the machine always ends in `BlockLenSet` or `Failed`.
pub struct BringUp<'a, T, H> {
    host: &'a mut HostContext<T, H>,
    state: BringUpState,
    card: CardState,
}

impl<'a, T: Transport, H: HostPrimitives> BringUp<'a, T, H> {
    pub fn new(host: &'a mut HostContext<T, H>) -> Self {
        Self { host, state: BringUpState::Start, card: CardState::default() }
    }

    pub fn state(&self) -> BringUpState {
        self.state
    }

    pub fn card(&self) -> &CardState {
        &self.card
    }

    /// Advance by one state. Terminal states stay where they are.
    pub fn step(&mut self) -> BringUpState {
        let next = match self.state {
            BringUpState::Start => self.go_idle().map(|_| BringUpState::Idle),
            BringUpState::Idle => self.check_voltage().map(|_| BringUpState::VoltageChecked),
            BringUpState::VoltageChecked => self.wait_op_cond().map(|_| BringUpState::OpCondReady),
            BringUpState::OpCondReady => self.wait_power_up().map(|_| BringUpState::PowerReady),
            BringUpState::PowerReady => self.set_block_len().map(|_| BringUpState::BlockLenSet),
            terminal => return terminal,
        };
        self.state = next.unwrap_or_else(BringUpState::Failed);
        debug!("bring-up: {:?}", self.state);
        self.state
    }

    pub fn run(mut self) -> Result<CardState> {
        loop {
            match self.step() {
                BringUpState::BlockLenSet => return Ok(self.card),
                BringUpState::Failed(e) => return Err(e),
                _ => {}
            }
        }
    }

    fn go_idle(&mut self) -> Result<()> {
        if self.host.card_present() == Some(false) {
            return Err(Error::NoCard);
        }
        let config = *self.host.config();
        self.host.set_clock(config.init_clock_hz)?;
        self.host.set_power(true)?;
        self.host.delay_ms(1);
        self.host.send_clock()?;

        let request = CommandRequest::new(CMD0_GO_IDLE_STATE, 0, ResponseKind::R1)
            .with_timeout(config.go_idle_timeout_ms);
        let r1 = self.host.submit(&request, Data::None)?.r1();
        if r1.is_error() || !r1.idle() {
            return Err(Error::Io);
        }

        if config.crc {
            let request = CommandRequest::new(CMD59_CRC_ON_OFF, 1, ResponseKind::R1);
            if self.host.submit(&request, Data::None)?.r1().is_error() {
                return Err(Error::Unsupported);
            }
        }
        Ok(())
    }

    fn check_voltage(&mut self) -> Result<()> {
        let config = *self.host.config();
        let argument = (IF_COND_VOLTAGE << 8) | IF_COND_CHECK_PATTERN;
        let request = CommandRequest::new(CMD8_SEND_IF_COND, argument, ResponseKind::R7)
            .with_timeout(config.if_cond_timeout_ms);
        let response = self.host.submit(&request, Data::None)?;

        let r1 = response.r1();
        if r1.has(R1Field::IllegalCommand) {
            // Version 1.x card, not handled
            warn!("CMD8 rejected, first generation card");
            return Err(Error::Unsupported);
        }
        expect_ok(r1)?;
        self.card.v2 = true;

        let echo = response.word();
        if echo & 0xFF != IF_COND_CHECK_PATTERN {
            return Err(Error::Io);
        }
        if (echo >> 8) & 0xF != IF_COND_VOLTAGE {
            return Err(Error::Unsupported);
        }
        Ok(())
    }

    /// One CMD55 + ACMD41 round, yields the last R1 seen
    fn send_op_cond(&mut self, argument: u32) -> Result<R1> {
        let config = *self.host.config();
        let request = CommandRequest::new(CMD55_APP_CMD, 0, ResponseKind::R1)
            .with_timeout(config.app_cmd_timeout_ms);
        let r1 = self.host.submit(&request, Data::None)?.r1();
        if r1.is_error() {
            return Ok(r1);
        }
        let request = CommandRequest::new(ACMD41_SD_SEND_OP_COND, argument, ResponseKind::R1)
            .with_timeout(config.op_cond_timeout_ms);
        Ok(self.host.submit(&request, Data::None)?.r1())
    }

    fn wait_op_cond(&mut self) -> Result<()> {
        let attempts = self.host.config().op_cond_attempts;
        let hcs = if self.card.v2 { OCR_HCS } else { 0 };
        let argument = OCR_VOLTAGE_WINDOW | hcs;

        // A round without answer counts as still idle
        let mut r1 = R1(0xFF);
        for attempt in 0..attempts {
            r1 = match self.send_op_cond(argument) {
                Ok(r1) => r1,
                Err(Error::Timeout) => {
                    warn!("ACMD41 attempt {} timed out", attempt);
                    R1(0xFF)
                }
                Err(e) => return Err(e),
            };
            if !r1.idle() {
                break;
            }
            self.host.delay_ms(1);
        }
        if r1.idle() {
            return Err(Error::Timeout);
        }
        expect_ok(r1)
    }

    fn wait_power_up(&mut self) -> Result<()> {
        let config = *self.host.config();
        let request = CommandRequest::new(CMD58_READ_OCR, 0, ResponseKind::R3)
            .with_timeout(config.read_ocr_timeout_ms);

        let mut ocr = Ocr(0);
        for _ in 0..config.read_ocr_attempts {
            let response = self.host.submit(&request, Data::None)?;
            expect_ok(response.r1())?;
            ocr = Ocr(response.word());
            self.card.ocr = ocr.0;
            self.card.high_capacity = ocr.card_capacity_status();
            if ocr.card_powered_up_status() {
                break;
            }
        }
        if !ocr.card_powered_up_status() {
            return Err(Error::Timeout);
        }
        Ok(())
    }

    fn set_block_len(&mut self) -> Result<()> {
        let config = *self.host.config();
        let request = CommandRequest::new(CMD16_SET_BLOCKLEN, SD_BLOCK_SIZE as u32, ResponseKind::R1)
            .with_timeout(config.set_block_len_timeout_ms);
        expect_ok(self.host.submit(&request, Data::None)?.r1())?;
        self.card.block_len = SD_BLOCK_SIZE as u32;
        Ok(())
    }
}
