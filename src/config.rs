/// Driver tunables. Defaults follow the timing windows of the SD physical
/// layer specification for SPI mode.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Compute CRC7/CRC16 for every frame and ask the card to enforce them
    pub crc: bool,
    /// Controller ceiling, requested clocks are clamped to it
    pub max_clock_hz: u32,
    /// Identification clock, must not exceed 400kHz
    pub init_clock_hz: u32,
    pub default_speed_hz: u32,
    pub high_speed_hz: u32,

    /// R1 poll budget used when a request carries a zero timeout
    pub default_timeout_ms: u32,
    pub go_idle_timeout_ms: u32,
    pub if_cond_timeout_ms: u32,
    pub app_cmd_timeout_ms: u32,
    pub op_cond_timeout_ms: u32,
    pub read_ocr_timeout_ms: u32,
    pub set_block_len_timeout_ms: u32,
    /// Budget for the start token of each block read
    pub read_timeout_ms: u32,
    pub write_timeout_ms: u32,
    /// Busy-clear budget after each written block
    pub busy_timeout_ms: u32,
    pub erase_timeout_ms: u32,

    /// Iteration bound of the ACMD41 loop
    pub op_cond_attempts: u32,
    /// Iteration bound of the CMD58 loop
    pub read_ocr_attempts: u32,

    /// Load CSD and CID right after bring-up
    pub read_registers: bool,
    /// Leave the identification clock for the default-speed clock after bring-up
    pub raise_clock: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            crc: false,
            max_clock_hz: 50_000_000,
            init_clock_hz: 400_000,
            default_speed_hz: 25_000_000,
            high_speed_hz: 50_000_000,
            default_timeout_ms: 200,
            go_idle_timeout_ms: 100,
            if_cond_timeout_ms: 200,
            app_cmd_timeout_ms: 10,
            op_cond_timeout_ms: 20,
            read_ocr_timeout_ms: 200,
            set_block_len_timeout_ms: 200,
            read_timeout_ms: 100,
            write_timeout_ms: 250,
            busy_timeout_ms: 500,
            erase_timeout_ms: 30_000,
            op_cond_attempts: 1000,
            read_ocr_attempts: 10,
            read_registers: true,
            raise_clock: true,
        }
    }
}

impl Config {
    pub fn with_crc(mut self, crc: bool) -> Self {
        self.crc = crc;
        self
    }

    pub fn with_max_clock(mut self, hz: u32) -> Self {
        self.max_clock_hz = hz;
        self
    }
}
