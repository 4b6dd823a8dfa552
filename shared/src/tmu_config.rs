use crc::{Crc, CRC_32_ISO_HDLC};
use serde::{Deserialize, Serialize};

use crate::standard_atmosphere::PSI_TO_KPA;
use crate::tmu_hal::ThermocoupleType;
use crate::{PRESSURE_INPUT_COUNT, TEMP_INPUT_COUNT};

pub const CONFIG_MAGIC: u32 = 0x4F53534D;
pub const CONFIG_VERSION: u8 = 3;
pub const DEFAULT_SOURCE_ADDRESS: u8 = 149;
pub const CONFIG_STORE_OFFSET: usize = 0;
pub const CONFIG_RECORD_SIZE: usize = 224;

const RESERVED_OFFSET: usize = 6;
const TEMP_INPUTS_OFFSET: usize = 8;
const TEMP_INPUT_STRIDE: usize = 20;
const PRESSURE_INPUTS_OFFSET: usize = 168;
const PRESSURE_INPUT_STRIDE: usize = 6;
const EGT_ENABLED_OFFSET: usize = 210;
const THERMOCOUPLE_TYPE_OFFSET: usize = 211;
const THERMOCOUPLE_RESERVED_OFFSET: usize = 212;
const AMBIENT_ENABLED_OFFSET: usize = 214;
const AMBIENT_RESERVED_OFFSET: usize = 215;
const CHECKSUM_OFFSET: usize = 220;

const CHECKSUM: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// I2C addresses of the four multiplexed analog converters.
pub const ADS_I2C_ADDRESSES: [u8; 4] = [0x48, 0x49, 0x4A, 0x4B];

/// Single-ended mux selectors, indexed by converter channel.
pub const MUX_SINGLE: [u16; 4] = [0x4000, 0x5000, 0x6000, 0x7000];

pub const AMBIENT_I2C_ADDRESS: u8 = 0x76;

/// (device, channel) wiring of each temperature input.
pub const TEMP_HARDWARE_MAP: [(usize, usize); TEMP_INPUT_COUNT] = [
    (0, 0),
    (0, 1),
    (1, 0),
    (1, 1),
    (2, 1),
    (2, 2),
    (3, 1),
    (3, 2),
];

/// (device, channel) wiring of each pressure input.
pub const PRESSURE_HARDWARE_MAP: [(usize, usize); PRESSURE_INPUT_COUNT] = [
    (0, 2),
    (0, 3),
    (2, 0),
    (2, 3),
    (1, 2),
    (1, 3),
    (3, 0),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum PressureType {
    Absolute = 0,
    Gauge = 1,
}

impl TryFrom<u8> for PressureType {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Absolute),
            1 => Ok(Self::Gauge),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempInputConfig {
    pub assigned_spn: u16,
    pub coeff_a: f32,
    pub coeff_b: f32,
    pub coeff_c: f32,
    pub resistor_value: f32,
}

impl TempInputConfig {
    pub const fn from_preset(preset: &NtcPreset) -> Self {
        Self {
            assigned_spn: 0,
            coeff_a: preset.coeff_a,
            coeff_b: preset.coeff_b,
            coeff_c: preset.coeff_c,
            resistor_value: preset.resistor_value,
        }
    }

    pub fn apply_preset(&mut self, preset: &NtcPreset) {
        self.coeff_a = preset.coeff_a;
        self.coeff_b = preset.coeff_b;
        self.coeff_c = preset.coeff_c;
        self.resistor_value = preset.resistor_value;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PressureInputConfig {
    pub assigned_spn: u16,
    /// Centibar for absolute sensors (above 20000 means `value - 20000` bar),
    /// PSI for gauge sensors.
    pub max_range: u16,
    pub pressure_type: PressureType,
}

impl PressureInputConfig {
    /// Full scale of the sensor in kPa.
    pub fn max_range_kpa(&self) -> f32 {
        match self.pressure_type {
            PressureType::Absolute if self.max_range > BAR_RANGE_FLAG => {
                (self.max_range - BAR_RANGE_FLAG) as f32 * 100.0
            }
            PressureType::Absolute => self.max_range as f32,
            PressureType::Gauge => self.max_range as f32 * PSI_TO_KPA,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModuleConfig {
    pub magic: u32,
    pub version: u8,
    pub source_address: u8,
    pub temp_inputs: [TempInputConfig; TEMP_INPUT_COUNT],
    pub pressure_inputs: [PressureInputConfig; PRESSURE_INPUT_COUNT],
    pub egt_enabled: bool,
    pub thermocouple_type: ThermocoupleType,
    pub ambient_enabled: bool,
    pub checksum: u32,
    /// Bytes with no meaning of their own, carried so a decoded record
    /// encodes back to exactly what was read.
    pub reserved: [u8; 2],
    pub temp_input_padding: [[u8; 2]; TEMP_INPUT_COUNT],
    pub pressure_input_padding: [u8; PRESSURE_INPUT_COUNT],
    pub thermocouple_reserved: [u8; 2],
    pub ambient_reserved: [u8; 5],
}

impl ModuleConfig {
    /// Factory configuration: nothing assigned, every temperature input on the
    /// AEM curve, every pressure input a 100 PSI gauge sensor.
    pub const fn default() -> Self {
        Self {
            magic: CONFIG_MAGIC,
            version: CONFIG_VERSION,
            source_address: DEFAULT_SOURCE_ADDRESS,
            temp_inputs: [TempInputConfig::from_preset(&NTC_PRESETS[DEFAULT_NTC_PRESET]);
                TEMP_INPUT_COUNT],
            pressure_inputs: [PressureInputConfig {
                assigned_spn: 0,
                max_range: DEFAULT_GAUGE_RANGE_PSI,
                pressure_type: PressureType::Gauge,
            }; PRESSURE_INPUT_COUNT],
            egt_enabled: false,
            thermocouple_type: ThermocoupleType::K,
            ambient_enabled: false,
            checksum: 0,
            reserved: [0; 2],
            temp_input_padding: [[0; 2]; TEMP_INPUT_COUNT],
            pressure_input_padding: [0; PRESSURE_INPUT_COUNT],
            thermocouple_reserved: [0; 2],
            ambient_reserved: [0; 5],
        }
    }

    pub fn to_bytes(&self) -> [u8; CONFIG_RECORD_SIZE] {
        let mut bytes = [0u8; CONFIG_RECORD_SIZE];

        bytes[0..4].copy_from_slice(&self.magic.to_le_bytes());
        bytes[4] = self.version;
        bytes[5] = self.source_address;
        bytes[RESERVED_OFFSET..TEMP_INPUTS_OFFSET].copy_from_slice(&self.reserved);

        for (i, input) in self.temp_inputs.iter().enumerate() {
            let base = TEMP_INPUTS_OFFSET + i * TEMP_INPUT_STRIDE;
            bytes[base..base + 2].copy_from_slice(&input.assigned_spn.to_le_bytes());
            bytes[base + 2..base + 4].copy_from_slice(&self.temp_input_padding[i]);
            bytes[base + 4..base + 8].copy_from_slice(&input.coeff_a.to_le_bytes());
            bytes[base + 8..base + 12].copy_from_slice(&input.coeff_b.to_le_bytes());
            bytes[base + 12..base + 16].copy_from_slice(&input.coeff_c.to_le_bytes());
            bytes[base + 16..base + 20].copy_from_slice(&input.resistor_value.to_le_bytes());
        }

        for (i, input) in self.pressure_inputs.iter().enumerate() {
            let base = PRESSURE_INPUTS_OFFSET + i * PRESSURE_INPUT_STRIDE;
            bytes[base..base + 2].copy_from_slice(&input.assigned_spn.to_le_bytes());
            bytes[base + 2..base + 4].copy_from_slice(&input.max_range.to_le_bytes());
            bytes[base + 4] = input.pressure_type as u8;
            bytes[base + 5] = self.pressure_input_padding[i];
        }

        bytes[EGT_ENABLED_OFFSET] = self.egt_enabled as u8;
        bytes[THERMOCOUPLE_TYPE_OFFSET] = self.thermocouple_type as u8;
        bytes[THERMOCOUPLE_RESERVED_OFFSET..AMBIENT_ENABLED_OFFSET]
            .copy_from_slice(&self.thermocouple_reserved);
        bytes[AMBIENT_ENABLED_OFFSET] = self.ambient_enabled as u8;
        bytes[AMBIENT_RESERVED_OFFSET..CHECKSUM_OFFSET].copy_from_slice(&self.ambient_reserved);
        bytes[CHECKSUM_OFFSET..].copy_from_slice(&self.checksum.to_le_bytes());

        bytes
    }

    /// Decodes a persisted record. Returns `None` if an enum tag or flag byte
    /// is out of range; magic, version and checksum are not checked here.
    /// Every byte is kept, so `to_bytes` gives back the same record.
    pub fn from_bytes(bytes: &[u8; CONFIG_RECORD_SIZE]) -> Option<Self> {
        let mut config = Self::default();

        config.magic = read_u32(bytes, 0);
        config.version = bytes[4];
        config.source_address = bytes[5];
        config.reserved = [bytes[RESERVED_OFFSET], bytes[RESERVED_OFFSET + 1]];

        for (i, input) in config.temp_inputs.iter_mut().enumerate() {
            let base = TEMP_INPUTS_OFFSET + i * TEMP_INPUT_STRIDE;
            input.assigned_spn = read_u16(bytes, base);
            config.temp_input_padding[i] = [bytes[base + 2], bytes[base + 3]];
            input.coeff_a = read_f32(bytes, base + 4);
            input.coeff_b = read_f32(bytes, base + 8);
            input.coeff_c = read_f32(bytes, base + 12);
            input.resistor_value = read_f32(bytes, base + 16);
        }

        for (i, input) in config.pressure_inputs.iter_mut().enumerate() {
            let base = PRESSURE_INPUTS_OFFSET + i * PRESSURE_INPUT_STRIDE;
            input.assigned_spn = read_u16(bytes, base);
            input.max_range = read_u16(bytes, base + 2);
            input.pressure_type = PressureType::try_from(bytes[base + 4]).ok()?;
            config.pressure_input_padding[i] = bytes[base + 5];
        }

        config.egt_enabled = read_flag(bytes[EGT_ENABLED_OFFSET])?;
        config.thermocouple_type =
            ThermocoupleType::try_from(bytes[THERMOCOUPLE_TYPE_OFFSET]).ok()?;
        config.thermocouple_reserved.copy_from_slice(
            &bytes[THERMOCOUPLE_RESERVED_OFFSET..AMBIENT_ENABLED_OFFSET],
        );
        config.ambient_enabled = read_flag(bytes[AMBIENT_ENABLED_OFFSET])?;
        config
            .ambient_reserved
            .copy_from_slice(&bytes[AMBIENT_RESERVED_OFFSET..CHECKSUM_OFFSET]);
        config.checksum = read_u32(bytes, CHECKSUM_OFFSET);

        Some(config)
    }

    /// CRC32 of every byte of the encoded record except the checksum field.
    pub fn compute_checksum(&self) -> u32 {
        checksum_of(&self.to_bytes())
    }

    pub fn stamp_checksum(&mut self) {
        self.checksum = self.compute_checksum();
    }

    pub fn is_valid(&self) -> bool {
        self.magic == CONFIG_MAGIC
            && self.version == CONFIG_VERSION
            && self.checksum == self.compute_checksum()
    }

    pub fn assigned_temp_inputs(&self) -> usize {
        self.temp_inputs.iter().filter(|input| input.assigned_spn != 0).count()
    }

    pub fn assigned_pressure_inputs(&self) -> usize {
        self.pressure_inputs.iter().filter(|input| input.assigned_spn != 0).count()
    }
}

/// Checks magic, version and checksum of a raw record without decoding it.
pub fn validate_bytes(bytes: &[u8; CONFIG_RECORD_SIZE]) -> bool {
    read_u32(bytes, 0) == CONFIG_MAGIC
        && bytes[4] == CONFIG_VERSION
        && read_u32(bytes, CHECKSUM_OFFSET) == checksum_of(bytes)
}

fn checksum_of(bytes: &[u8; CONFIG_RECORD_SIZE]) -> u32 {
    CHECKSUM.checksum(&bytes[..CHECKSUM_OFFSET])
}

fn read_flag(byte: u8) -> Option<bool> {
    match byte {
        0 => Some(false),
        1 => Some(true),
        _ => None,
    }
}

fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

fn read_f32(bytes: &[u8], offset: usize) -> f32 {
    f32::from_bits(read_u32(bytes, offset))
}

// Presets

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NtcPreset {
    pub name: &'static str,
    pub coeff_a: f32,
    pub coeff_b: f32,
    pub coeff_c: f32,
    pub resistor_value: f32,
}

pub const DEFAULT_NTC_PRESET: usize = 0;

pub const NTC_PRESETS: [NtcPreset; 3] = [
    NtcPreset {
        name: "AEM",
        coeff_a: 1.485995686e-3,
        coeff_b: 2.279654266e-4,
        coeff_c: 1.197578033e-7,
        resistor_value: 10050.0,
    },
    NtcPreset {
        name: "Bosch",
        coeff_a: 1.40e-3,
        coeff_b: 2.37e-4,
        coeff_c: 9.90e-8,
        resistor_value: 2490.0,
    },
    NtcPreset {
        name: "GM",
        coeff_a: 1.29e-3,
        coeff_b: 2.35e-4,
        coeff_c: 9.00e-8,
        resistor_value: 3000.0,
    },
];

const BAR_RANGE_FLAG: u16 = 20000;
pub const DEFAULT_GAUGE_RANGE_PSI: u16 = 100;

/// Absolute ranges, ids 0..=15.
pub const ABSOLUTE_RANGE_PRESETS: [u16; 16] = [
    100, 150, 200, 250, 300, 400, 500, 700, 1000, 5000, 10000, 15000, 20000, 21000, 22000, 23000,
];

pub const GAUGE_PRESET_BASE: u8 = 20;

/// Gauge ranges in PSI, ids 20..=30.
pub const GAUGE_RANGE_PRESETS: [u16; 11] = [15, 30, 50, 100, 150, 200, 250, 300, 350, 400, 500];

/// Looks up a pressure range preset id.
pub fn pressure_range_preset(preset: u8) -> Option<(u16, PressureType)> {
    let preset = preset as usize;
    let gauge_base = GAUGE_PRESET_BASE as usize;

    if preset < ABSOLUTE_RANGE_PRESETS.len() {
        Some((ABSOLUTE_RANGE_PRESETS[preset], PressureType::Absolute))
    } else if preset >= gauge_base && preset < gauge_base + GAUGE_RANGE_PRESETS.len() {
        Some((GAUGE_RANGE_PRESETS[preset - gauge_base], PressureType::Gauge))
    } else {
        None
    }
}

pub fn ntc_preset(preset: u8) -> Option<&'static NtcPreset> {
    NTC_PRESETS.get(preset as usize)
}
