/// Sea level standard atmosphere, kPa.
pub const STANDARD_ATMOSPHERE_KPA: f32 = 101.325;

pub const PSI_TO_KPA: f32 = 6.894757;

pub fn pa_to_kpa(pressure_pa: f32) -> f32 {
    pressure_pa / 1000.0
}
