use log::{debug, info};

use crate::bus::Transport;
use crate::command::{
    CommandRequest, Data, DataPhase, ResponseKind, ACMD51_SEND_SCR, ACMD6_SET_BUS_WIDTH,
    CMD10_SEND_CID, CMD6_SWITCH_FUNC, CMD9_SEND_CSD,
};
use crate::error::{Error, Result};
use crate::platform::HostPrimitives;
use crate::registers::{SwitchStatus, SWITCH_FUNCTION_ERROR};

use super::card::{expect_ok, Card, Speed};

/// Mode 1 (set), group 1 access mode to high speed, other groups unchanged
const SWITCH_HIGH_SPEED: u32 = 0x80FF_FFF1;
const HIGH_SPEED_FUNCTION: u8 = 0x1;

impl<'h, T: Transport, H: HostPrimitives> Card<'h, T, H> {
    /// Registers travel as a data block in SPI mode
    fn read_register(&mut self, index: u8, bytes: &mut [u8]) -> Result<()> {
        let timeout_ms = self.host.config().read_timeout_ms;
        let request = CommandRequest::new(index, 0, ResponseKind::R1)
            .with_data(DataPhase::single(bytes.len()))
            .with_timeout(timeout_ms);
        expect_ok(self.host.submit(&request, Data::Read(bytes))?.r1())
    }

    fn load_csd(&mut self) -> Result<()> {
        let mut csd = [0u8; 16];
        self.read_register(CMD9_SEND_CSD, &mut csd)?;
        self.state.csd = csd;
        self.state.capacity_bytes = self.state.csd().capacity_bytes().ok_or(Error::Protocol)?;
        debug!("CSD {:02x?}", csd);
        Ok(())
    }

    fn load_cid(&mut self) -> Result<()> {
        let mut cid = [0u8; 16];
        self.read_register(CMD10_SEND_CID, &mut cid)?;
        self.state.cid = cid;
        debug!("CID {:02x?}", cid);
        Ok(())
    }

    /// Post bring-up part of the identification
    pub(crate) fn identify(&mut self) -> Result<()> {
        let config = *self.host.config();
        if config.read_registers {
            self.load_csd()?;
            self.load_cid()?;
            info!("card capacity {} bytes", self.state.capacity_bytes);
        }
        if config.raise_clock {
            self.apply_speed(Speed::Default)?;
        }
        Ok(())
    }

    fn switch_high_speed(&mut self) -> Result<()> {
        let timeout_ms = self.host.config().read_timeout_ms;
        let mut status = [0u8; 64];
        let request = CommandRequest::new(CMD6_SWITCH_FUNC, SWITCH_HIGH_SPEED, ResponseKind::R1)
            .with_data(DataPhase::single(status.len()))
            .with_timeout(timeout_ms);
        let response = self.host.submit(&request, Data::Read(&mut status))?;
        if response.r1().is_error() {
            // Switch function class not implemented, version 1.0 card
            return Err(Error::Unsupported);
        }
        let switch = SwitchStatus(&status);
        if !switch.supports_group1(HIGH_SPEED_FUNCTION) {
            return Err(Error::Unsupported);
        }
        match switch.group1_selection() {
            HIGH_SPEED_FUNCTION => Ok(()),
            SWITCH_FUNCTION_ERROR => Err(Error::Unsupported),
            _ => Err(Error::Protocol),
        }
    }

    fn apply_speed(&mut self, speed: Speed) -> Result<()> {
        let config = *self.host.config();
        let hz = match speed {
            Speed::Default => match self.state.csd().max_transfer_rate() {
                0 => config.default_speed_hz,
                rate => rate.min(config.default_speed_hz),
            },
            Speed::High => {
                self.switch_high_speed()?;
                config.high_speed_hz
            }
            // UHS modes need 1.8V signalling, not available in SPI mode
            _ => return Err(Error::Unsupported),
        };
        let hz = self.host.set_clock(hz)?;
        self.state.curr_speed = speed;
        info!("{:?} speed, clock {} Hz", speed, hz);
        Ok(())
    }

    /// Switch the card to `speed` and retune the bus clock
    pub fn set_speed(&mut self, speed: Speed) -> Result<()> {
        self.exclusive(|card| card.apply_speed(speed))
    }

    /// Read the SD configuration register
    pub fn read_scr(&mut self) -> Result<()> {
        self.exclusive(|card| {
            let timeout_ms = card.host.config().read_timeout_ms;
            let mut scr = [0u8; 8];
            let request = CommandRequest::new(ACMD51_SEND_SCR, 0, ResponseKind::R1)
                .with_data(DataPhase::single(scr.len()))
                .with_timeout(timeout_ms);
            expect_ok(card.host.submit_app(&request, Data::Read(&mut scr))?.r1())?;
            card.state.scr = scr;
            Ok(())
        })
    }

    /// Data bus width, 1 or 4 bits
    pub fn set_bus_width(&mut self, bits: u8) -> Result<()> {
        self.exclusive(|card| match bits {
            1 => {
                if card.state.bus_4bit {
                    let request = CommandRequest::new(ACMD6_SET_BUS_WIDTH, 0, ResponseKind::R1);
                    expect_ok(card.host.submit_app(&request, Data::None)?.r1())?;
                }
                card.host.set_bus_width(1)?;
                card.state.bus_4bit = false;
                Ok(())
            }
            4 => {
                if !card.host.supports_4bit {
                    return Err(Error::Unsupported);
                }
                let request = CommandRequest::new(ACMD6_SET_BUS_WIDTH, 2, ResponseKind::R1);
                expect_ok(card.host.submit_app(&request, Data::None)?.r1())?;
                card.host.set_bus_width(4)?;
                card.state.bus_4bit = true;
                Ok(())
            }
            _ => Err(Error::InvalidParameter),
        })
    }
}
