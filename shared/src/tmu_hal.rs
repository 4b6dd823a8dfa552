use core::any::Any;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::EnumIter;

/// Logic level of a converter's ready line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PinLevel {
    Low,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreError {
    ReadFailed,
    WriteFailed,
    OutOfBounds,
}

/// One conversion result from a multi-channel converter slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdcReading {
    pub raw_value: i16,
    pub timestamp_ms: u32,
    pub valid: bool,
}

impl AdcReading {
    pub const INVALID: Self = Self {
        raw_value: 0,
        timestamp_ms: 0,
        valid: false,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThermocoupleReading {
    pub temperature_c: f32,
    pub cold_junction_c: f32,
    pub timestamp_ms: u32,
    pub valid: bool,
}

impl ThermocoupleReading {
    pub const INVALID: Self = Self {
        temperature_c: 0.0,
        cold_junction_c: 0.0,
        timestamp_ms: 0,
        valid: false,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmbientReading {
    pub temperature_c: f32,
    pub humidity_pct: f32,
    pub pressure_kpa: f32,
    pub timestamp_ms: u32,
    pub valid: bool,
}

impl AmbientReading {
    pub const INVALID: Self = Self {
        temperature_c: 0.0,
        humidity_pct: 0.0,
        pressure_kpa: 0.0,
        timestamp_ms: 0,
        valid: false,
    };
}

/// Fault register of the thermocouple converter. Zero means no fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ThermocoupleFault(pub u8);

impl ThermocoupleFault {
    pub const COLD_JUNCTION_RANGE: u8 = 0x80;
    pub const THERMOCOUPLE_RANGE: u8 = 0x40;
    pub const COLD_JUNCTION_HIGH: u8 = 0x20;
    pub const COLD_JUNCTION_LOW: u8 = 0x10;
    pub const THERMOCOUPLE_HIGH: u8 = 0x08;
    pub const THERMOCOUPLE_LOW: u8 = 0x04;
    pub const OVER_UNDER_VOLTAGE: u8 = 0x02;
    pub const OPEN_CIRCUIT: u8 = 0x01;

    pub fn is_fault(&self) -> bool {
        self.0 != 0
    }

    pub fn contains(&self, bit: u8) -> bool {
        self.0 & bit != 0
    }

    /// Human readable names of every active fault bit, most significant first.
    pub fn active(&self) -> impl Iterator<Item = &'static str> + '_ {
        FAULT_DESCRIPTIONS
            .iter()
            .filter(move |(bit, _)| self.contains(*bit))
            .map(|(_, description)| *description)
    }
}

static FAULT_DESCRIPTIONS: [(u8, &str); 8] = [
    (ThermocoupleFault::COLD_JUNCTION_RANGE, "Cold Junction Range Fault"),
    (ThermocoupleFault::THERMOCOUPLE_RANGE, "Thermocouple Range Fault"),
    (ThermocoupleFault::COLD_JUNCTION_HIGH, "Cold Junction High Fault"),
    (ThermocoupleFault::COLD_JUNCTION_LOW, "Cold Junction Low Fault"),
    (ThermocoupleFault::THERMOCOUPLE_HIGH, "Thermocouple High Fault"),
    (ThermocoupleFault::THERMOCOUPLE_LOW, "Thermocouple Low Fault"),
    (ThermocoupleFault::OVER_UNDER_VOLTAGE, "Over/Under Voltage Fault"),
    (ThermocoupleFault::OPEN_CIRCUIT, "Thermocouple Open Fault"),
];

/// Thermocouple wire types the converter can linearize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter)]
#[repr(u8)]
pub enum ThermocoupleType {
    B = 0,
    E = 1,
    J = 2,
    K = 3,
    N = 4,
    R = 5,
    S = 6,
    T = 7,
}

impl TryFrom<u8> for ThermocoupleType {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::iter()
            .find(|thermocouple_type| *thermocouple_type as u8 == value)
            .ok_or(())
    }
}

/// Monotonic millisecond clock. Wraps at `u32::MAX`.
pub trait Clock {
    fn now_ms(&self) -> u32;
}

/// A 4-channel multiplexed analog converter on the I2C bus.
pub trait AdcDevice {
    fn begin(&mut self, address: u8) -> bool;
    fn start_conversion(&mut self, mux: u16);
    fn conversion_complete(&mut self) -> bool;
    fn read_last_result(&mut self) -> i16;
    fn compute_voltage(&self, raw_value: i16) -> f32;
    fn ready_line(&self) -> PinLevel;

    fn as_mut_any(&mut self) -> &mut dyn Any;
}

/// Single-channel thermocouple converter on the SPI bus.
pub trait ThermocoupleDevice {
    fn begin(&mut self) -> bool;
    fn set_thermocouple_type(&mut self, thermocouple_type: ThermocoupleType);
    fn trigger_conversion(&mut self);
    fn conversion_complete(&mut self) -> bool;
    fn ready_line(&self) -> PinLevel;
    fn read_fault(&mut self) -> u8;
    fn read_thermocouple_temperature(&mut self) -> f32;
    fn read_cold_junction_temperature(&mut self) -> f32;

    fn as_mut_any(&mut self) -> &mut dyn Any;
}

/// Combined temperature / humidity / pressure sensor. Reads are synchronous.
pub trait AmbientDevice {
    fn begin(&mut self, address: u8) -> bool;
    fn read_temperature(&mut self) -> f32;
    fn read_humidity(&mut self) -> f32;
    /// Pascals
    fn read_pressure(&mut self) -> f32;

    fn as_mut_any(&mut self) -> &mut dyn Any;
}

/// Byte-addressable non-volatile storage.
pub trait PersistentStore {
    fn get(&mut self, offset: usize, buffer: &mut [u8]) -> Result<(), StoreError>;
    fn put(&mut self, offset: usize, data: &[u8]) -> Result<(), StoreError>;

    fn as_mut_any(&mut self) -> &mut dyn Any;
}
