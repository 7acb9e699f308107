//! Views over the card registers read during bring-up.

use bit_field::BitField;

// SD/MMC transfer rate unit codes (10K) list, codes 4 to 7 are reserved
pub const SD_MMC_TRANS_UNITS: [u32; 8] = [10, 100, 1_000, 10_000, 0, 0, 0, 0];
// SD transfer multiplier factor codes (1/10) list
pub const SD_TRANS_MULTIPLIERS: [u32; 16] =
    [0, 10, 12, 13, 15, 20, 25, 30, 35, 40, 45, 50, 55, 60, 70, 80];

/// Operating conditions register
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Ocr(pub u32);

impl Ocr {
    /// Set once the card finished its power up routine
    pub fn card_powered_up_status(&self) -> bool {
        self.0.get_bit(31)
    }

    /// Card capacity status, only valid after power up
    pub fn card_capacity_status(&self) -> bool {
        self.0.get_bit(30)
    }

    pub fn vdd_window(&self) -> u32 {
        self.0.get_bits(15..24)
    }

    pub fn supports_1v8(&self) -> bool {
        self.0.get_bit(24)
    }
}

/// Host voltage window advertised with ACMD41, 3.2V to 3.4V
pub const OCR_VOLTAGE_WINDOW: u32 = 0x0030_0000;
/// Host capacity support bit of ACMD41
pub const OCR_HCS: u32 = 1 << 30;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CsdStructure {
    /// Standard capacity
    V1,
    /// High and extended capacity
    V2,
    Reserved,
}

/// Card specific data, bits numbered as in the physical layer specification
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Csd(pub [u8; 16]);

impl Csd {
    fn bits(&self) -> u128 {
        u128::from_be_bytes(self.0)
    }

    pub fn structure(&self) -> CsdStructure {
        match self.bits().get_bits(126..128) {
            0 => CsdStructure::V1,
            1 => CsdStructure::V2,
            _ => CsdStructure::Reserved,
        }
    }

    pub fn transmission_speed(&self) -> u8 {
        self.bits().get_bits(96..104) as u8
    }

    pub fn read_bl_length(&self) -> u8 {
        self.bits().get_bits(80..84) as u8
    }

    pub fn card_size(&self) -> u32 {
        match self.structure() {
            CsdStructure::V2 => self.bits().get_bits(48..70) as u32,
            _ => self.bits().get_bits(62..74) as u32,
        }
    }

    pub fn card_size_multiplier(&self) -> u8 {
        self.bits().get_bits(47..50) as u8
    }

    pub fn erase_single_block_enabled(&self) -> bool {
        self.bits().get_bit(46)
    }

    /// Maximum transfer rate in Hz, 0 for a reserved rate unit
    pub fn max_transfer_rate(&self) -> u32 {
        let trans_speed = self.transmission_speed();
        let unit = SD_MMC_TRANS_UNITS[(trans_speed & 0x7) as usize];
        let mult = SD_TRANS_MULTIPLIERS[((trans_speed >> 3) & 0xF) as usize];
        unit * mult * 1000
    }

    /// Card capacity in bytes, `None` for a reserved structure
    ///
    /// For standard capacity cards:
    /// capacity = (C_SIZE + 1) * 2 ^ (C_SIZE_MULT + 2) * 2 ^ READ_BL_LEN
    ///
    /// For high capacity cards:
    /// capacity = (C_SIZE + 1) * 512KiB
    pub fn capacity_bytes(&self) -> Option<u64> {
        match self.structure() {
            CsdStructure::V1 => {
                let shift = self.card_size_multiplier() as u32 + 2 + self.read_bl_length() as u32;
                Some((self.card_size() as u64 + 1) << shift)
            }
            CsdStructure::V2 => Some((self.card_size() as u64 + 1) * 512 * 1024),
            CsdStructure::Reserved => None,
        }
    }
}

/// Card identification register
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Cid(pub [u8; 16]);

impl Cid {
    fn bits(&self) -> u128 {
        u128::from_be_bytes(self.0)
    }

    pub fn manufacturer_id(&self) -> u8 {
        self.0[0]
    }

    pub fn oem_id(&self) -> [u8; 2] {
        [self.0[1], self.0[2]]
    }

    pub fn product_name(&self) -> [u8; 5] {
        let mut name = [0u8; 5];
        name.copy_from_slice(&self.0[3..8]);
        name
    }

    /// (major, minor)
    pub fn product_revision(&self) -> (u8, u8) {
        (self.0[8] >> 4, self.0[8] & 0xF)
    }

    pub fn serial_number(&self) -> u32 {
        self.bits().get_bits(24..56) as u32
    }

    /// (year, month)
    pub fn manufacturing_date(&self) -> (u16, u8) {
        let bits = self.bits();
        (2000 + bits.get_bits(12..20) as u16, bits.get_bits(8..12) as u8)
    }
}

/// SD configuration register
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Scr(pub [u8; 8]);

impl Scr {
    fn bits(&self) -> u64 {
        u64::from_be_bytes(self.0)
    }

    pub fn structure(&self) -> u8 {
        self.bits().get_bits(60..64) as u8
    }

    pub fn sd_spec(&self) -> u8 {
        self.bits().get_bits(56..60) as u8
    }

    pub fn sd_spec3(&self) -> bool {
        self.bits().get_bit(47)
    }

    pub fn supports_4bit(&self) -> bool {
        self.bits().get_bits(48..52).get_bit(2)
    }
}

/// Decoded CMD6 switch status, 64 bytes
pub struct SwitchStatus<'a>(pub &'a [u8; 64]);

pub const SWITCH_FUNCTION_ERROR: u8 = 0xF;

impl<'a> SwitchStatus<'a> {
    /// Function selected in group 1 (access mode), 0xF when the switch failed
    pub fn group1_selection(&self) -> u8 {
        self.0[16] & 0xF
    }

    /// Bitmap of the group 1 functions the card implements
    pub fn group1_supported(&self) -> u16 {
        u16::from_be_bytes([self.0[12], self.0[13]])
    }

    pub fn supports_group1(&self, function: u8) -> bool {
        function < 16 && self.group1_supported().get_bit(function as usize)
    }
}
