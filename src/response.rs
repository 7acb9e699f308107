pub trait Field: Into<u8> {}

pub trait BitField<F: Field>: Copy + Into<u8> {
    fn has(&self, field: F) -> bool {
        let value: u8 = (*self).into();
        value & (1 << field.into()) > 0
    }

    fn no(&self, field: F) -> Option<()> {
        if !self.has(field) {
            Some(())
        } else {
            None
        }
    }
}

#[derive(Copy, Clone, Debug)]
#[allow(dead_code)]
pub enum R1Field {
    Idle = 0,
    EraseReset,
    IllegalCommand,
    CommandCRC,
    EraseSequence,
    Address,
    Parameter,
    Start,
}

impl Into<u8> for R1Field {
    fn into(self) -> u8 {
        self as u8
    }
}

impl Field for R1Field {}

/// R1 status byte
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct R1(pub u8);

/// Bits of R1 reporting a failed command
pub const R1_ERROR_MASK: u8 = 0b0111_1110;

impl R1 {
    pub fn idle(self) -> bool {
        self.has(R1Field::Idle)
    }

    /// Any error bit is set. The idle bit alone is not an error.
    pub fn is_error(self) -> bool {
        self.0 & R1_ERROR_MASK != 0 || self.has(R1Field::Start)
    }

    /// Card has left the idle state without reporting an error
    pub fn ready(self) -> bool {
        self.0 == 0
    }
}

impl From<u8> for R1 {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl Into<u8> for R1 {
    fn into(self) -> u8 {
        self.0
    }
}

impl BitField<R1Field> for R1 {}

/// Response of one submitted command: the R1 byte plus up to four words.
/// R1, R3, R6 and R7 fill word 0 only, R2 fills all four with the most
/// significant register word first.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CommandResponse {
    pub r1: u8,
    pub words: [u32; 4],
}

impl CommandResponse {
    pub fn r1(&self) -> R1 {
        R1(self.r1)
    }

    pub fn word(&self) -> u32 {
        self.words[0]
    }

    /// R2 payload back in register byte order
    pub fn register_bytes(&self) -> [u8; 16] {
        let mut bytes = [0u8; 16];
        for (i, word) in self.words.iter().enumerate() {
            bytes[i * 4..i * 4 + 4].copy_from_slice(&word.to_be_bytes());
        }
        bytes
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_r1_flags() {
        assert!(R1(0x01).idle());
        assert!(!R1(0x01).is_error());
        assert!(R1(0x05).is_error());
        assert!(R1(0x05).has(R1Field::IllegalCommand));
        assert!(R1(0x00).ready());
        assert!(!R1(0x01).ready());
        assert!(R1(0xFF).is_error());
        assert_eq!(R1(0x08).no(R1Field::IllegalCommand), Some(()));
    }

    #[test]
    fn test_register_bytes() {
        let response = CommandResponse {
            r1: 0,
            words: [0x0011_2233, 0x4455_6677, 0x8899_AABB, 0xCCDD_EEFF],
        };
        let bytes = response.register_bytes();
        assert_eq!(bytes[0], 0x00);
        assert_eq!(bytes[5], 0x55);
        assert_eq!(bytes[15], 0xFF);
    }
}
