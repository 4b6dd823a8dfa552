use serde::{Deserialize, Serialize};
use strum::EnumCount;
use strum_macros::{EnumCount as EnumCountMacro, EnumIter};

/// Which acquisition family produces an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumCountMacro, EnumIter)]
pub enum SpnCategory {
    Temperature,
    Pressure,
    Thermocouple,
    Ambient,
}

/// One field of the output table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumCountMacro, EnumIter)]
pub enum OutputField {
    AmbientTemperature,
    Humidity,
    BarometricPressure,
    OilTemperature,
    OilPressure,
    CoolantTemperature,
    CoolantPressure,
    FuelTemperature,
    FuelPressure,
    BoostTemperature,
    BoostPressure,
    CacInletTemperature,
    CacInletPressure,
    TransferPipeTemperature,
    TransferPipePressure,
    AirInletTemperature,
    AirInletPressure,
    EngineBayTemperature,
    ExhaustGasTemperature,
}

impl OutputField {
    pub fn index(&self) -> usize {
        *self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpnInfo {
    pub spn: u16,
    pub category: SpnCategory,
    pub field: OutputField,
    /// Higher resolution identifier carrying the same measurement.
    pub hi_res_spn: Option<u16>,
}

const fn info(spn: u16, category: SpnCategory, field: OutputField) -> SpnInfo {
    SpnInfo {
        spn,
        category,
        field,
        hi_res_spn: None,
    }
}

const fn info_hi_res(
    spn: u16,
    hi_res_spn: u16,
    category: SpnCategory,
    field: OutputField,
) -> SpnInfo {
    SpnInfo {
        spn,
        category,
        field,
        hi_res_spn: Some(hi_res_spn),
    }
}

pub const KNOWN_SPNS: [SpnInfo; 20] = [
    info(175, SpnCategory::Temperature, OutputField::OilTemperature),
    info_hi_res(110, 1637, SpnCategory::Temperature, OutputField::CoolantTemperature),
    info(174, SpnCategory::Temperature, OutputField::FuelTemperature),
    info_hi_res(105, 1363, SpnCategory::Temperature, OutputField::BoostTemperature),
    info(1131, SpnCategory::Temperature, OutputField::CacInletTemperature),
    info(1132, SpnCategory::Temperature, OutputField::TransferPipeTemperature),
    info(1133, SpnCategory::Temperature, OutputField::AirInletTemperature),
    info(172, SpnCategory::Temperature, OutputField::AirInletTemperature),
    info(441, SpnCategory::Temperature, OutputField::EngineBayTemperature),
    info(100, SpnCategory::Pressure, OutputField::OilPressure),
    info(109, SpnCategory::Pressure, OutputField::CoolantPressure),
    info(94, SpnCategory::Pressure, OutputField::FuelPressure),
    info(102, SpnCategory::Pressure, OutputField::BoostPressure),
    info(106, SpnCategory::Pressure, OutputField::AirInletPressure),
    info(1127, SpnCategory::Pressure, OutputField::CacInletPressure),
    info(1128, SpnCategory::Pressure, OutputField::TransferPipePressure),
    info(173, SpnCategory::Thermocouple, OutputField::ExhaustGasTemperature),
    info(171, SpnCategory::Ambient, OutputField::AmbientTemperature),
    info(108, SpnCategory::Ambient, OutputField::BarometricPressure),
    info(354, SpnCategory::Ambient, OutputField::Humidity),
];

const fn table_has_duplicates() -> bool {
    let mut i = 0;
    while i < KNOWN_SPNS.len() {
        let mut j = 0;
        while j < KNOWN_SPNS.len() {
            let a = KNOWN_SPNS[i];
            let b = KNOWN_SPNS[j];

            if i != j && a.spn == b.spn {
                return true;
            }

            if let Some(hi_res) = a.hi_res_spn {
                if hi_res == b.spn {
                    return true;
                }
                if i != j {
                    if let Some(other) = b.hi_res_spn {
                        if hi_res == other {
                            return true;
                        }
                    }
                }
            }

            j += 1;
        }
        i += 1;
    }

    false
}

const _: () = assert!(!table_has_duplicates(), "duplicate identifier in KNOWN_SPNS");

/// Assignable identifier lookup. Hi-res companions are not included.
pub fn lookup(spn: u16) -> Option<&'static SpnInfo> {
    KNOWN_SPNS.iter().find(|info| info.spn == spn)
}

pub fn category(spn: u16) -> Option<SpnCategory> {
    lookup(spn).map(|info| info.category)
}

/// Output field an identifier (or its hi-res companion) is routed to.
pub fn output_field(spn: u16) -> Option<OutputField> {
    KNOWN_SPNS
        .iter()
        .find(|info| info.spn == spn || info.hi_res_spn == Some(spn))
        .map(|info| info.field)
}

/// Flat table of engineering-unit measurements. Temperatures in °C,
/// pressures in kPa, humidity in %RH.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutputTable {
    values: [f32; OutputField::COUNT],
}

impl OutputTable {
    pub const fn new() -> Self {
        Self {
            values: [0.0; OutputField::COUNT],
        }
    }

    pub fn get(&self, field: OutputField) -> f32 {
        self.values[field.index()]
    }

    pub fn set(&mut self, field: OutputField, value: f32) {
        self.values[field.index()] = value;
    }

    /// Looks up the field for `spn` and reads it.
    pub fn get_spn(&self, spn: u16) -> Option<f32> {
        output_field(spn).map(|field| self.get(field))
    }
}
