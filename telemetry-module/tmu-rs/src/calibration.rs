use libm::logf;
use shared::tmu_config::{PressureInputConfig, PressureType, TempInputConfig};

/// Divider supply voltage.
pub const VREF: f32 = 5.0;

/// Linear output band of the pressure transducers.
pub const PRESSURE_VOLTAGE_MIN: f32 = 0.5;
pub const PRESSURE_VOLTAGE_MAX: f32 = 4.5;

/// Written to temperature fields that have no valid reading.
pub const INVALID_TEMPERATURE_C: f32 = -273.15;

const KELVIN_OFFSET: f32 = 273.15;

/// Thermistor temperature from a divider voltage using the Steinhart-Hart
/// model. `None` when the voltage or the fitted curve is out of range.
pub fn ntc_temperature(voltage: f32, vref: f32, input: &TempInputConfig) -> Option<f32> {
    if !voltage.is_finite() || voltage <= 0.0 || voltage >= vref {
        return None;
    }

    let resistance = input.resistor_value * voltage / (vref - voltage);
    if !(resistance > 0.0) {
        return None;
    }

    let ln_r = logf(resistance);
    let inverse_kelvin = input.coeff_a + input.coeff_b * ln_r + input.coeff_c * ln_r * ln_r * ln_r;
    if !(inverse_kelvin > 0.0) {
        return None;
    }

    Some(1.0 / inverse_kelvin - KELVIN_OFFSET)
}

/// Pressure in kPa from a transducer voltage. Gauge sensors are offset by
/// `atmospheric_kpa`. Never negative.
pub fn pressure_kpa(voltage: f32, input: &PressureInputConfig, atmospheric_kpa: f32) -> f32 {
    let voltage = voltage.clamp(PRESSURE_VOLTAGE_MIN, PRESSURE_VOLTAGE_MAX);
    let ratio = (voltage - PRESSURE_VOLTAGE_MIN) / (PRESSURE_VOLTAGE_MAX - PRESSURE_VOLTAGE_MIN);

    let pressure = match input.pressure_type {
        PressureType::Absolute => ratio * input.max_range_kpa(),
        PressureType::Gauge => ratio * input.max_range_kpa() + atmospheric_kpa,
    };

    pressure.max(0.0)
}
