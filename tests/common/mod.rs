#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};

use sdspi::crc::{crc16, crc7};
use sdspi::{BusPrimitives, HostPrimitives, Result};

pub const BLOCK: usize = 512;

/// 1 GB standard capacity card, byte addressed
pub const CSD_V1: [u8; 16] = [
    0x00, 0x26, 0x00, 0x32, 0x5F, 0x59, 0x83, 0xC8, 0xAD, 0xDB, 0xCF, 0xFF, 0xD2, 0x40, 0x40, 0xA5,
];
/// 4 GB high capacity card, block addressed
pub const CSD_V2: [u8; 16] = [
    0x40, 0x0E, 0x00, 0x32, 0x5B, 0x59, 0x00, 0x00, 0x1D, 0x69, 0x7F, 0x80, 0x0A, 0x40, 0x00, 0x8B,
];
pub const CID: [u8; 16] = [
    0x03, 0x53, 0x44, 0x53, 0x55, 0x30, 0x34, 0x47, 0x80, 0x12, 0x34, 0x56, 0x78, 0x01, 0x4A, 0x01,
];
pub const SCR: [u8; 8] = [0x02, 0x35, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00];

/// How the card answers the interface condition command
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IfCond {
    Echo,
    Illegal,
    BadPattern,
    BadVoltage,
    Silent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Mode {
    Command,
    ReadStream { next: u32 },
    WriteToken { next: u32, multi: bool },
    WriteData { next: u32, multi: bool, buffer: Vec<u8> },
}

/// Byte level model of an SD card in SPI mode
pub struct MockCard {
    pub high_capacity: bool,
    pub cmd0_r1: u8,
    pub if_cond: IfCond,
    /// ACMD41 rounds answered with the idle bit still set
    pub op_cond_rounds: u32,
    /// CMD58 reads reporting power up still in progress
    pub ocr_busy_reads: u32,
    pub unresponsive: bool,
    pub locked: bool,
    pub corrupt_read_crc: bool,
    pub switch_supported: bool,
    /// Group 1 of the switch status lists the high speed function
    pub high_speed_function: bool,
    /// Block whose write gets a write error data response
    pub reject_write: Option<u32>,
    /// Raw replies (R1 included) for commands the model does not know
    pub replies: BTreeMap<u8, Vec<u8>>,
    pub csd: [u8; 16],
    pub cid: [u8; 16],
    pub blocks: BTreeMap<u32, Vec<u8>>,

    pub crc_mode: bool,
    pub idle: bool,
    pub commands: Vec<(u8, u32)>,
    pub selected: bool,
    pub select_events: Vec<bool>,
    /// 0xFF bytes clocked in while selected
    pub polls: usize,
    pub clock_hz: u32,
    pub erased: Vec<(u32, u32)>,
    pub stop_tokens: u32,

    app_cmd: bool,
    erase_start: u32,
    erase_end: u32,
    frame: Vec<u8>,
    tx: VecDeque<u8>,
    mode: Mode,
}

impl MockCard {
    pub fn sdhc() -> Self {
        Self {
            high_capacity: true,
            cmd0_r1: 0x01,
            if_cond: IfCond::Echo,
            op_cond_rounds: 3,
            ocr_busy_reads: 0,
            unresponsive: false,
            locked: false,
            corrupt_read_crc: false,
            switch_supported: true,
            high_speed_function: true,
            reject_write: None,
            replies: BTreeMap::new(),
            csd: CSD_V2,
            cid: CID,
            blocks: BTreeMap::new(),
            crc_mode: false,
            idle: false,
            commands: Vec::new(),
            selected: false,
            select_events: Vec::new(),
            polls: 0,
            clock_hz: 0,
            erased: Vec::new(),
            stop_tokens: 0,
            app_cmd: false,
            erase_start: 0,
            erase_end: 0,
            frame: Vec::new(),
            tx: VecDeque::new(),
            mode: Mode::Command,
        }
    }

    /// Version 2 standard capacity card
    pub fn sdsc() -> Self {
        Self { high_capacity: false, csd: CSD_V1, ..Self::sdhc() }
    }

    pub fn block_count(&self) -> u32 {
        if self.high_capacity { 7_710_720 } else { 1_984_000 }
    }

    pub fn block(&self, index: u32) -> Vec<u8> {
        self.blocks.get(&index).cloned().unwrap_or_else(|| vec![0u8; BLOCK])
    }

    pub fn indices(&self) -> Vec<u8> {
        self.commands.iter().map(|&(index, _)| index).collect()
    }

    pub fn arguments_of(&self, index: u8) -> Vec<u32> {
        self.commands.iter().filter(|&&(i, _)| i == index).map(|&(_, arg)| arg).collect()
    }

    fn r1(&self) -> u8 {
        if self.idle { 0x01 } else { 0x00 }
    }

    fn respond(&mut self, bytes: &[u8]) {
        // Ncr
        self.tx.push_back(0xFF);
        self.tx.extend(bytes.iter().copied());
    }

    fn push_block(&mut self, data: &[u8]) {
        let mut crc = crc16(data);
        if self.corrupt_read_crc {
            crc ^= 0x0001;
        }
        // Nac
        self.tx.push_back(0xFF);
        self.tx.push_back(0xFE);
        self.tx.extend(data.iter().copied());
        self.tx.extend(crc.to_be_bytes().iter().copied());
    }

    fn block_index(&self, argument: u32) -> Option<u32> {
        let index = if self.high_capacity {
            argument
        } else {
            if argument % BLOCK as u32 != 0 {
                return None;
            }
            argument / BLOCK as u32
        };
        if index < self.block_count() { Some(index) } else { None }
    }

    fn handle(&mut self, frame: [u8; 6]) {
        let index = frame[0] & 0x3F;
        let argument = u32::from_be_bytes([frame[1], frame[2], frame[3], frame[4]]);
        self.commands.push((index, argument));
        if self.unresponsive {
            return;
        }
        let app_cmd = core::mem::replace(&mut self.app_cmd, false);
        let crc_checked = self.crc_mode || index == 0 || index == 8;
        if crc_checked && frame[5] != crc7(&frame[..5]) {
            let r1 = self.r1() | 0x08;
            self.respond(&[r1]);
            return;
        }

        if let Some(reply) = self.replies.get(&index).cloned() {
            self.respond(&reply);
            return;
        }

        let r1 = self.r1();
        match (app_cmd, index) {
            (_, 0) => {
                self.idle = true;
                self.crc_mode = false;
                self.mode = Mode::Command;
                let r1 = self.cmd0_r1;
                self.respond(&[r1]);
            }
            (_, 8) => match self.if_cond {
                IfCond::Echo => self.respond(&[r1, 0, 0, frame[3] & 0xF, frame[4]]),
                IfCond::Illegal => self.respond(&[r1 | 0x04]),
                IfCond::BadPattern => self.respond(&[r1, 0, 0, frame[3] & 0xF, 0x55]),
                IfCond::BadVoltage => self.respond(&[r1, 0, 0, 0x2, frame[4]]),
                IfCond::Silent => {}
            },
            (_, 55) => {
                self.app_cmd = true;
                self.respond(&[r1]);
            }
            (true, 41) => {
                if self.op_cond_rounds > 0 {
                    self.op_cond_rounds -= 1;
                } else {
                    self.idle = false;
                }
                let r1 = self.r1();
                self.respond(&[r1]);
            }
            (true, 51) => {
                self.respond(&[r1]);
                self.push_block(&SCR);
            }
            (true, 6) => self.respond(&[r1]),
            (_, 58) => {
                let mut ocr: u32 = 0x00FF_8000;
                if self.ocr_busy_reads > 0 {
                    self.ocr_busy_reads -= 1;
                } else {
                    ocr |= 0x8000_0000;
                    if self.high_capacity {
                        ocr |= 0x4000_0000;
                    }
                }
                let bytes = u32::to_be_bytes(ocr);
                self.respond(&[r1, bytes[0], bytes[1], bytes[2], bytes[3]]);
            }
            (_, 59) => {
                self.crc_mode = argument & 1 == 1;
                self.respond(&[r1]);
            }
            (_, 16) => self.respond(&[if argument == BLOCK as u32 { r1 } else { r1 | 0x40 }]),
            (_, 9) => {
                let csd = self.csd;
                self.respond(&[r1]);
                self.push_block(&csd);
            }
            (_, 10) => {
                let cid = self.cid;
                self.respond(&[r1]);
                self.push_block(&cid);
            }
            (_, 6) => {
                if !self.switch_supported {
                    self.respond(&[r1 | 0x04]);
                    return;
                }
                let mut status = [0u8; 64];
                status[13] = if self.high_speed_function { 0x03 } else { 0x01 };
                status[16] = 0x01;
                self.respond(&[r1]);
                self.push_block(&status);
            }
            (_, 17) => match self.block_index(argument) {
                Some(_) if self.locked => {
                    self.respond(&[r1]);
                    self.tx.push_back(0xFF);
                    self.tx.push_back(0x10);
                }
                Some(block) => {
                    let data = self.block(block);
                    self.respond(&[r1]);
                    self.push_block(&data);
                }
                None => self.respond(&[r1 | 0x20]),
            },
            (_, 18) => match self.block_index(argument) {
                Some(next) => {
                    self.respond(&[r1]);
                    self.mode = Mode::ReadStream { next };
                }
                None => self.respond(&[r1 | 0x20]),
            },
            (_, 12) => {
                self.mode = Mode::Command;
                // Stuff byte, deliberately looks like an R1
                self.tx.push_back(0x3C);
                self.respond(&[r1, 0x00, 0x00]);
            }
            (_, 24) | (_, 25) => match self.block_index(argument) {
                Some(next) => {
                    self.respond(&[r1]);
                    self.mode = Mode::WriteToken { next, multi: index == 25 };
                }
                None => self.respond(&[r1 | 0x20]),
            },
            (_, 32) => {
                self.erase_start = argument;
                self.respond(&[r1]);
            }
            (_, 33) => {
                self.erase_end = argument;
                self.respond(&[r1]);
            }
            (_, 38) => {
                let (start, end) = (self.erase_start, self.erase_end);
                self.erased.push((start, end));
                if let (Some(first), Some(last)) = (self.block_index(start), self.block_index(end)) {
                    for block in first..=last {
                        self.blocks.remove(&block);
                    }
                }
                self.respond(&[r1, 0x00, 0x00, 0x00]);
            }
            _ => self.respond(&[r1 | 0x04]),
        }
    }

    fn receive(&mut self, byte: u8) {
        match core::mem::replace(&mut self.mode, Mode::Command) {
            Mode::WriteToken { next, multi } => {
                self.mode = match byte {
                    0xFE | 0xFC => Mode::WriteData { next, multi, buffer: Vec::new() },
                    0xFD if multi => {
                        self.stop_tokens += 1;
                        // Nbr then busy
                        self.tx.extend([0xFF, 0x00, 0x00].iter().copied());
                        Mode::Command
                    }
                    _ => Mode::WriteToken { next, multi },
                };
            }
            Mode::WriteData { next, multi, mut buffer } => {
                buffer.push(byte);
                if buffer.len() < BLOCK + 2 {
                    self.mode = Mode::WriteData { next, multi, buffer };
                    return;
                }
                let crc = u16::from_be_bytes([buffer[BLOCK], buffer[BLOCK + 1]]);
                buffer.truncate(BLOCK);
                if self.reject_write == Some(next) {
                    self.tx.extend([0x0D, 0x00].iter().copied());
                    if multi {
                        self.mode = Mode::WriteToken { next, multi };
                    }
                    return;
                }
                if self.crc_mode && crc != crc16(&buffer) {
                    self.tx.extend([0x0B, 0x00].iter().copied());
                    return;
                }
                self.blocks.insert(next, buffer);
                self.tx.extend([0x05, 0x00, 0x00].iter().copied());
                if multi {
                    self.mode = Mode::WriteToken { next: next + 1, multi };
                }
            }
            mode => {
                self.mode = mode;
                if self.frame.is_empty() && byte & 0xC0 != 0x40 {
                    return;
                }
                self.frame.push(byte);
                if self.frame.len() == 6 {
                    let mut frame = [0u8; 6];
                    frame.copy_from_slice(&self.frame);
                    self.frame.clear();
                    self.handle(frame);
                }
            }
        }
    }
}

impl BusPrimitives for MockCard {
    fn select(&mut self, selected: bool) -> Result<()> {
        self.selected = selected;
        self.select_events.push(selected);
        if !selected {
            self.tx.clear();
            self.frame.clear();
        }
        Ok(())
    }

    fn exchange(&mut self, byte: u8) -> Result<u8> {
        if !self.selected {
            return Ok(0xFF);
        }
        if byte == 0xFF {
            self.polls += 1;
        }
        if let Mode::ReadStream { next } = self.mode {
            if byte == 0xFF && self.tx.is_empty() && self.frame.is_empty() {
                if next < self.block_count() {
                    let data = self.block(next);
                    self.push_block(&data);
                    self.mode = Mode::ReadStream { next: next + 1 };
                } else {
                    // Out of range error token
                    self.tx.push_back(0x08);
                }
            }
        }
        let out = self.tx.pop_front().unwrap_or(0xFF);
        self.receive(byte);
        Ok(out)
    }

    fn set_clock(&mut self, hz: u32) -> Result<()> {
        self.clock_hz = hz;
        Ok(())
    }
}

#[derive(Default)]
pub struct MockHost {
    pub delays: u32,
    pub delayed_ms: u64,
    pub locks: u32,
    pub unlocks: u32,
    pub powered: bool,
    pub present: Option<bool>,
}

impl HostPrimitives for MockHost {
    fn delay_ms(&mut self, ms: u32) {
        self.delays += 1;
        self.delayed_ms += ms as u64;
    }

    fn set_power(&mut self, on: bool) -> Result<()> {
        self.powered = on;
        Ok(())
    }

    fn card_present(&mut self) -> Option<bool> {
        self.present
    }

    fn lock(&mut self) {
        self.locks += 1;
    }

    fn unlock(&mut self) {
        self.unlocks += 1;
    }
}

/// Deterministic block content
pub fn pattern(blocks: usize, seed: u8) -> Vec<u8> {
    (0..blocks * BLOCK).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
}
