//! Command indices and the transport-neutral request model.

pub const CMD0_GO_IDLE_STATE: u8 = 0;
pub const CMD6_SWITCH_FUNC: u8 = 6;
pub const CMD8_SEND_IF_COND: u8 = 8;
pub const CMD9_SEND_CSD: u8 = 9;
pub const CMD10_SEND_CID: u8 = 10;
pub const CMD12_STOP_TRANSMISSION: u8 = 12;
pub const CMD16_SET_BLOCKLEN: u8 = 16;
pub const CMD17_READ_SINGLE_BLOCK: u8 = 17;
pub const CMD18_READ_MULTIPLE_BLOCK: u8 = 18;
pub const CMD24_WRITE_BLOCK: u8 = 24;
pub const CMD25_WRITE_MULTIPLE_BLOCK: u8 = 25;
pub const CMD32_ERASE_WR_BLK_START: u8 = 32;
pub const CMD33_ERASE_WR_BLK_END: u8 = 33;
pub const CMD38_ERASE: u8 = 38;
pub const CMD55_APP_CMD: u8 = 55;
pub const CMD58_READ_OCR: u8 = 58;
pub const CMD59_CRC_ON_OFF: u8 = 59;

pub const ACMD6_SET_BUS_WIDTH: u8 = 6;
pub const ACMD41_SD_SEND_OP_COND: u8 = 41;
pub const ACMD51_SEND_SCR: u8 = 51;

/// Response format the card answers a command with. The transport consumes
/// exactly as many response bytes as the kind implies.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ResponseKind {
    None,
    R1,
    /// R1 followed by a busy tail
    R1b,
    /// 128 bit register
    R2,
    /// R1 followed by the OCR
    R3,
    /// Published RCA, native bus only
    R6,
    /// R1 followed by the interface condition echo
    R7,
}

/// Data transfer attached to a command.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DataPhase {
    pub block_count: u32,
    pub block_size: usize,
    pub multi_block: bool,
    /// Controller sends the stop command by itself. SPI has no such thing.
    pub auto_stop: bool,
}

impl DataPhase {
    pub fn single(block_size: usize) -> Self {
        Self { block_count: 1, block_size, multi_block: false, auto_stop: false }
    }

    pub fn multiple(block_count: u32, block_size: usize) -> Self {
        Self { block_count, block_size, multi_block: true, auto_stop: false }
    }

    /// Total bytes moved, `None` when it does not fit in `usize`
    pub fn byte_len(&self) -> Option<usize> {
        (self.block_count as usize).checked_mul(self.block_size)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CommandRequest {
    /// Command index, 0 to 63
    pub index: u8,
    pub argument: u32,
    pub response: ResponseKind,
    pub data: Option<DataPhase>,
    /// R1 poll budget in milliseconds, 0 selects the transport default
    pub timeout_ms: u32,
}

impl CommandRequest {
    pub fn new(index: u8, argument: u32, response: ResponseKind) -> Self {
        Self { index, argument, response, data: None, timeout_ms: 0 }
    }

    pub fn with_data(mut self, data: DataPhase) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_timeout(mut self, timeout_ms: u32) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

/// Buffer of the data phase, its length must match the request's [`DataPhase`]
pub enum Data<'a> {
    None,
    Read(&'a mut [u8]),
    Write(&'a [u8]),
}

impl<'a> Data<'a> {
    pub fn len(&self) -> usize {
        match self {
            Data::None => 0,
            Data::Read(buf) => buf.len(),
            Data::Write(buf) => buf.len(),
        }
    }

    pub fn is_none(&self) -> bool {
        match self {
            Data::None => true,
            _ => false,
        }
    }
}
