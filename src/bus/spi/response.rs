use crate::error::Error;
use crate::response::{BitField, Field};

/// Start token of a block sent by the card, also used for single block writes
pub const BLOCK_START_TOKEN: u8 = 0xFE;

#[derive(Copy, Clone, Debug)]
#[allow(dead_code)]
pub enum ErrorTokenField {
    Error = 0,
    CCError,
    CardECCFailed,
    OutOfRange,
    CardIsLocked,
}

impl Into<u8> for ErrorTokenField {
    fn into(self) -> u8 {
        self as u8
    }
}

impl Field for ErrorTokenField {}

/// Sent by the card instead of a start token when a read fails
#[derive(Copy, Clone, Debug)]
pub(crate) struct ErrorToken(pub u8);

impl ErrorToken {
    pub fn try_from(value: u8) -> Option<Self> {
        if value & 0xE0 == 0 {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn error(self) -> Error {
        if self.has(ErrorTokenField::CardIsLocked) {
            Error::Locked
        } else if self.has(ErrorTokenField::OutOfRange) {
            Error::InvalidParameter
        } else if self.has(ErrorTokenField::Error)
            || self.has(ErrorTokenField::CCError)
            || self.has(ErrorTokenField::CardECCFailed)
        {
            Error::Io
        } else {
            Error::Protocol
        }
    }
}

impl Into<u8> for ErrorToken {
    fn into(self) -> u8 {
        self.0
    }
}

impl BitField<ErrorTokenField> for ErrorToken {}

pub enum WriteToken {
    SingleWrite = 0xFE,
    MultiWrite = 0xFC,
    StopTransmit = 0xFD,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ResponseCode {
    Accepted,
    CRCError,
    WriteError,
}

/// Data response token following every written block
#[derive(Copy, Clone, Debug)]
pub struct DataResponse(u8);

impl DataResponse {
    pub fn try_from(value: u8) -> Option<Self> {
        // 0bxxx0xxx1
        if value & 0b10001 == 0b00001 {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn response_code(self) -> Option<ResponseCode> {
        match self.0 >> 1 & 0b111 {
            0x2 => Some(ResponseCode::Accepted),
            0x5 => Some(ResponseCode::CRCError),
            0x6 => Some(ResponseCode::WriteError),
            _ => None,
        }
    }

    pub fn check(self) -> Result<(), Error> {
        match self.response_code().ok_or(Error::Protocol)? {
            ResponseCode::Accepted => Ok(()),
            ResponseCode::CRCError => Err(Error::Crc),
            ResponseCode::WriteError => Err(Error::Io),
        }
    }
}
