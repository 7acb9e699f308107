use core::fmt;

/// Failure outcomes shared by every layer of the driver.
///
/// Success is the `Ok` arm of [`Result`]; the numeric codes returned by
/// [`Error::code`] keep `0` free for it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// A bounded poll or retry loop ran out of budget
    Timeout,
    /// CRC mismatch on a command or data block
    Crc,
    /// The card or the bus reported a failure
    Io,
    /// The card answered with something the protocol does not allow here
    Protocol,
    /// Card generation, bus width or speed not handled by this driver
    Unsupported,
    /// Bad argument or a request the bound transport cannot express
    InvalidParameter,
    /// Card detect reports an empty slot
    NoCard,
    /// The card is password locked
    Locked,
}

pub type Result<T> = core::result::Result<T, Error>;

impl Error {
    pub fn code(self) -> u8 {
        match self {
            Error::Timeout => 1,
            Error::Crc => 2,
            Error::Io => 3,
            Error::Protocol => 4,
            Error::Unsupported => 5,
            Error::InvalidParameter => 6,
            Error::NoCard => 7,
            Error::Locked => 8,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Error::Timeout => "timeout",
            Error::Crc => "crc error",
            Error::Io => "i/o error",
            Error::Protocol => "protocol error",
            Error::Unsupported => "unsupported",
            Error::InvalidParameter => "invalid parameter",
            Error::NoCard => "no card",
            Error::Locked => "card locked",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status code of an outcome, `0` for success.
pub fn status_code<T>(result: &Result<T>) -> u8 {
    match result {
        Ok(_) => 0,
        Err(e) => e.code(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(status_code(&Ok(())), 0);
        assert_eq!(Error::Timeout.code(), 1);
        assert_eq!(Error::Locked.code(), 8);
        assert_eq!(status_code::<()>(&Err(Error::Unsupported)), 5);
    }
}
