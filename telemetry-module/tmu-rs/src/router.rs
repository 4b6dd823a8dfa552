use shared::spn::{self, OutputField, OutputTable, SpnCategory};
use shared::standard_atmosphere::STANDARD_ATMOSPHERE_KPA;
use shared::tmu_config::{ModuleConfig, PRESSURE_HARDWARE_MAP, TEMP_HARDWARE_MAP};
use shared::tmu_hal::{Clock, ThermocoupleFault};

use crate::acquisition::{AdcScheduler, AmbientScheduler, ThermocoupleScheduler};
use crate::calibration::{self, INVALID_TEMPERATURE_C, VREF};

/// Drives every acquisition family once per tick and writes calibrated
/// values into the output table.
pub struct SensorRouter<'a> {
    clock: &'a dyn Clock,
    adc: AdcScheduler<'a>,
    thermocouple: ThermocoupleScheduler<'a>,
    ambient: AmbientScheduler<'a>,
    output: OutputTable,
}

impl<'a> SensorRouter<'a> {
    pub fn new(
        clock: &'a dyn Clock,
        adc: AdcScheduler<'a>,
        thermocouple: ThermocoupleScheduler<'a>,
        ambient: AmbientScheduler<'a>,
    ) -> Self {
        Self {
            clock,
            adc,
            thermocouple,
            ambient,
            output: OutputTable::new(),
        }
    }

    pub fn initialize(&mut self, config: &ModuleConfig) {
        self.adc.initialize(config);
        self.thermocouple.initialize(config);
        self.ambient.initialize(config);
    }

    pub fn tick(&mut self, config: &ModuleConfig) {
        let now_ms = self.clock.now_ms();

        self.adc.tick(now_ms);
        self.thermocouple.tick(now_ms);
        self.ambient.tick(now_ms);

        self.process_temp_inputs(config);
        self.process_pressure_inputs(config);

        if config.egt_enabled {
            self.process_egt();
        }

        if config.ambient_enabled {
            self.process_ambient();
        }
    }

    fn process_temp_inputs(&mut self, config: &ModuleConfig) {
        for (input, (device, channel)) in config.temp_inputs.iter().zip(TEMP_HARDWARE_MAP.iter()) {
            let Some(field) = routed_field(input.assigned_spn, SpnCategory::Temperature) else {
                continue;
            };

            let temperature_c = self
                .adc
                .voltage(*device, *channel)
                .and_then(|voltage| calibration::ntc_temperature(voltage, VREF, input))
                .unwrap_or(INVALID_TEMPERATURE_C);

            self.output.set(field, temperature_c);
        }
    }

    fn process_pressure_inputs(&mut self, config: &ModuleConfig) {
        let atmospheric_kpa = self.atmospheric_pressure_kpa();

        for (input, (device, channel)) in config
            .pressure_inputs
            .iter()
            .zip(PRESSURE_HARDWARE_MAP.iter())
        {
            let Some(field) = routed_field(input.assigned_spn, SpnCategory::Pressure) else {
                continue;
            };

            // No valid sample, keep the previous value
            let Some(voltage) = self.adc.voltage(*device, *channel) else {
                continue;
            };

            self.output
                .set(field, calibration::pressure_kpa(voltage, input, atmospheric_kpa));
        }
    }

    fn process_egt(&mut self) {
        let reading = self.thermocouple.reading();
        let temperature_c = if reading.valid {
            reading.temperature_c
        } else {
            INVALID_TEMPERATURE_C
        };

        self.output.set(OutputField::ExhaustGasTemperature, temperature_c);
    }

    fn process_ambient(&mut self) {
        let reading = self.ambient.reading();

        if reading.valid {
            self.output.set(OutputField::AmbientTemperature, reading.temperature_c);
            self.output.set(OutputField::Humidity, reading.humidity_pct);
            self.output.set(OutputField::BarometricPressure, reading.pressure_kpa);
        } else {
            self.output.set(OutputField::AmbientTemperature, INVALID_TEMPERATURE_C);
        }
    }

    /// Last valid barometric reading, or standard atmosphere before the
    /// ambient sensor has produced one.
    pub fn atmospheric_pressure_kpa(&self) -> f32 {
        self.ambient
            .atmospheric_pressure_kpa()
            .unwrap_or(STANDARD_ATMOSPHERE_KPA)
    }

    pub fn output_table(&self) -> &OutputTable {
        &self.output
    }

    pub fn thermocouple_fault(&self) -> ThermocoupleFault {
        self.thermocouple.fault()
    }

    pub fn adc(&self) -> &AdcScheduler<'a> {
        &self.adc
    }

    pub fn adc_mut(&mut self) -> &mut AdcScheduler<'a> {
        &mut self.adc
    }

    pub fn thermocouple(&self) -> &ThermocoupleScheduler<'a> {
        &self.thermocouple
    }

    pub fn thermocouple_mut(&mut self) -> &mut ThermocoupleScheduler<'a> {
        &mut self.thermocouple
    }

    pub fn ambient(&self) -> &AmbientScheduler<'a> {
        &self.ambient
    }

    pub fn ambient_mut(&mut self) -> &mut AmbientScheduler<'a> {
        &mut self.ambient
    }
}

/// Output field for an assigned identifier, if it belongs to `category`.
/// Unassigned (0) and unknown identifiers are not routed.
fn routed_field(spn: u16, category: SpnCategory) -> Option<OutputField> {
    spn::lookup(spn)
        .filter(|info| info.category == category)
        .map(|info| info.field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::tmu_mock::{AdcDeviceMock, AmbientMock, ClockMock, ThermocoupleMock};
    use strum::IntoEnumIterator;

    struct Bench {
        clock: ClockMock,
        adc: [AdcDeviceMock; 4],
        thermocouple: ThermocoupleMock,
        ambient: AmbientMock,
    }

    impl Bench {
        fn new() -> Self {
            Self {
                clock: ClockMock::new(0),
                adc: [
                    AdcDeviceMock::new(),
                    AdcDeviceMock::new(),
                    AdcDeviceMock::new(),
                    AdcDeviceMock::new(),
                ],
                thermocouple: ThermocoupleMock::new(),
                ambient: AmbientMock::new(),
            }
        }

        fn router(&mut self) -> SensorRouter<'_> {
            let [d0, d1, d2, d3] = &mut self.adc;

            SensorRouter::new(
                &self.clock,
                AdcScheduler::new([d0, d1, d2, d3]),
                ThermocoupleScheduler::new(&mut self.thermocouple),
                AmbientScheduler::new(&mut self.ambient),
            )
        }
    }

    fn raw_for_voltage(voltage: f32) -> i16 {
        (voltage * 32768.0 / AdcDeviceMock::FULL_SCALE_V) as i16
    }

    #[test]
    fn unassigned_inputs_are_never_written() {
        let mut bench = Bench::new();
        bench.adc[0].raw_values = [raw_for_voltage(2.0); 4];

        let mut router = bench.router();
        let config = ModuleConfig::default();
        router.initialize(&config);

        for _ in 0..10 {
            router.tick(&config);
        }

        for field in OutputField::iter() {
            assert_eq!(router.output_table().get(field), 0.0);
        }
    }

    #[test]
    fn temperature_without_sample_is_sentinel() {
        let mut bench = Bench::new();
        let mut router = bench.router();

        let mut config = ModuleConfig::default();
        config.temp_inputs[0].assigned_spn = 175;
        router.initialize(&config);
        router.tick(&config);

        assert_eq!(
            router.output_table().get(OutputField::OilTemperature),
            INVALID_TEMPERATURE_C
        );
    }

    #[test]
    fn pressure_without_sample_is_not_updated() {
        let mut bench = Bench::new();
        let mut router = bench.router();

        let mut config = ModuleConfig::default();
        config.pressure_inputs[0].assigned_spn = 100;
        router.initialize(&config);
        router.tick(&config);

        assert_eq!(router.output_table().get(OutputField::OilPressure), 0.0);
    }

    #[test]
    fn gauge_pressure_uses_ambient_once_valid() {
        let mut bench = Bench::new();
        // Pressure input 1 is device 0 channel 2
        bench.adc[0].raw_values[2] = raw_for_voltage(0.5);
        bench.ambient.pressure_pa = 95_000.0;
        let mut router = bench.router();

        let mut config = ModuleConfig::default();
        config.pressure_inputs[0].assigned_spn = 100;
        config.ambient_enabled = true;
        router.initialize(&config);

        assert_eq!(router.atmospheric_pressure_kpa(), STANDARD_ATMOSPHERE_KPA);

        for _ in 0..4 {
            router.tick(&config);
        }

        assert!((router.atmospheric_pressure_kpa() - 95.0).abs() < 1e-3);
        let oil = router.output_table().get(OutputField::OilPressure);
        assert!((oil - 95.0).abs() < 0.1, "got {}", oil);
        assert!((router.output_table().get(OutputField::BarometricPressure) - 95.0).abs() < 1e-3);
        assert_eq!(router.output_table().get(OutputField::Humidity), 40.0);
    }

    #[test]
    fn gauge_baseline_survives_rejected_ambient_poll() {
        let clock = ClockMock::new(0);
        let mut bench = Bench::new();
        bench.adc[0].raw_values[2] = raw_for_voltage(0.5);
        bench.ambient.pressure_pa = 85_000.0;

        let [d0, d1, d2, d3] = &mut bench.adc;
        let mut router = SensorRouter::new(
            &clock,
            AdcScheduler::new([d0, d1, d2, d3]),
            ThermocoupleScheduler::new(&mut bench.thermocouple),
            AmbientScheduler::new(&mut bench.ambient),
        );

        let mut config = ModuleConfig::default();
        config.pressure_inputs[0].assigned_spn = 100;
        config.ambient_enabled = true;
        router.initialize(&config);

        for _ in 0..4 {
            router.tick(&config);
        }
        assert!((router.output_table().get(OutputField::OilPressure) - 85.0).abs() < 0.1);

        router
            .ambient_mut()
            .device_mut()
            .as_mut_any()
            .downcast_mut::<AmbientMock>()
            .unwrap()
            .humidity_pct = f32::NAN;
        clock.set(1000);
        router.tick(&config);

        assert!(!router.ambient().reading().valid);
        assert!((router.atmospheric_pressure_kpa() - 85.0).abs() < 1e-3);
        let oil = router.output_table().get(OutputField::OilPressure);
        assert!((oil - 85.0).abs() < 0.1, "got {}", oil);
        assert_eq!(
            router.output_table().get(OutputField::BarometricPressure),
            router.atmospheric_pressure_kpa()
        );
    }

    #[test]
    fn egt_fault_writes_sentinel() {
        let mut bench = Bench::new();
        bench.thermocouple.temperature_c = 700.0;
        bench.thermocouple.fault = ThermocoupleFault::THERMOCOUPLE_HIGH;
        let mut router = bench.router();

        let mut config = ModuleConfig::default();
        config.egt_enabled = true;
        router.initialize(&config);
        router.tick(&config);
        router.tick(&config);

        assert_eq!(
            router.output_table().get(OutputField::ExhaustGasTemperature),
            INVALID_TEMPERATURE_C
        );
        assert!(router.thermocouple_fault().contains(ThermocoupleFault::THERMOCOUPLE_HIGH));
    }

    #[test]
    fn egt_reading_is_routed() {
        let mut bench = Bench::new();
        bench.thermocouple.temperature_c = 455.25;
        let mut router = bench.router();

        let mut config = ModuleConfig::default();
        config.egt_enabled = true;
        router.initialize(&config);
        router.tick(&config);
        router.tick(&config);

        assert_eq!(
            router.output_table().get(OutputField::ExhaustGasTemperature),
            455.25
        );
    }

    #[test]
    fn invalid_ambient_only_touches_temperature() {
        let mut bench = Bench::new();
        bench.ambient.temperature_c = 200.0;
        let mut router = bench.router();

        let mut config = ModuleConfig::default();
        config.ambient_enabled = true;
        router.initialize(&config);
        router.tick(&config);

        assert_eq!(
            router.output_table().get(OutputField::AmbientTemperature),
            INVALID_TEMPERATURE_C
        );
        assert_eq!(router.output_table().get(OutputField::Humidity), 0.0);
        assert_eq!(router.output_table().get(OutputField::BarometricPressure), 0.0);
    }

    #[test]
    fn mismatched_category_is_not_routed() {
        let mut bench = Bench::new();
        bench.adc[0].raw_values = [raw_for_voltage(2.0); 4];
        let mut router = bench.router();

        let mut config = ModuleConfig::default();
        // A pressure identifier on a temperature input
        config.temp_inputs[0].assigned_spn = 100;
        router.initialize(&config);

        for _ in 0..8 {
            router.tick(&config);
        }

        for field in OutputField::iter() {
            assert_eq!(router.output_table().get(field), 0.0);
        }
    }
}
