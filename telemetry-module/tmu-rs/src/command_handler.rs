use shared::command_hal::{
    CommandError, CommandRequest, CommandResponse, CommandResult, InputKind,
};
use shared::spn::{self, SpnCategory};
use shared::tmu_config::{ntc_preset, pressure_range_preset, ModuleConfig};
use shared::tmu_hal::ThermocoupleType;
use shared::{PRESSURE_INPUT_COUNT, TEMP_INPUT_COUNT};

use crate::config_store::ConfigStore;
use crate::router::SensorRouter;
use crate::silprintln;

pub const QUERY_COUNTS: u8 = 0;
pub const QUERY_TEMPERATURE_SPNS: u8 = 1;
pub const QUERY_PRESSURE_SPNS: u8 = 2;
pub const QUERY_FULL_CONFIG: u8 = 4;

const SPNS_PER_PAGE: usize = 3;
const QUERY_PAGE_COUNT: u8 = 3;

/// Validates and applies configuration changes. Affected acquisition
/// families are re-initialized so changes are live without a restart.
pub struct CommandHandler<'h, 'a> {
    config: &'h mut ModuleConfig,
    store: &'h mut ConfigStore<'a>,
    router: &'h mut SensorRouter<'a>,
}

impl<'h, 'a> CommandHandler<'h, 'a> {
    pub fn new(
        config: &'h mut ModuleConfig,
        store: &'h mut ConfigStore<'a>,
        router: &'h mut SensorRouter<'a>,
    ) -> Self {
        Self {
            config,
            store,
            router,
        }
    }

    /// Decodes a postcard encoded [`CommandRequest`] and runs it.
    pub fn execute_bytes(&mut self, bytes: &[u8]) -> CommandResult {
        let request = CommandRequest::from_postcard(bytes)?;

        self.execute(request)
    }

    pub fn execute(&mut self, request: CommandRequest) -> CommandResult {
        let result = match request {
            CommandRequest::EnableOutputParameter { spn, enable, input } => {
                self.enable_output_parameter(spn, enable, input)
            }
            CommandRequest::SetCalibrationPreset { input, preset } => {
                self.set_calibration_preset(input, preset)
            }
            CommandRequest::SetRangePreset { input, preset } => {
                self.set_range_preset(input, preset)
            }
            CommandRequest::SetPressureRange { input, max_range } => {
                self.set_pressure_range(input, max_range)
            }
            CommandRequest::SetNtcParam {
                input,
                param,
                value,
            } => self.set_ntc_param(input, param, value),
            CommandRequest::SetThermocoupleType(thermocouple_type) => {
                self.set_thermocouple_type(thermocouple_type)
            }
            CommandRequest::Save => self.save(),
            CommandRequest::Reset => self.reset(),
            CommandRequest::Query { query_type, page } => self.query(query_type, page),
        };

        silprintln!("Command {:?} -> {:?}", request, result);

        result
    }

    /// Assigns (or clears) an identifier. Temperature and pressure identifiers
    /// move to `input` rather than being duplicated; thermocouple and ambient
    /// identifiers toggle their family.
    pub fn enable_output_parameter(&mut self, spn: u16, enable: bool, input: u8) -> CommandResult {
        let info = spn::lookup(spn).ok_or(CommandError::UnknownParameter)?;

        match info.category {
            SpnCategory::Temperature => {
                let index = if enable {
                    Some(input_index(input, TEMP_INPUT_COUNT, InputKind::Temperature)?)
                } else {
                    None
                };

                for holder in self.config.temp_inputs.iter_mut() {
                    if holder.assigned_spn == spn {
                        holder.assigned_spn = 0;
                    }
                }

                if let Some(index) = index {
                    self.config.temp_inputs[index].assigned_spn = spn;
                }

                self.router.adc_mut().initialize(self.config);
            }
            SpnCategory::Pressure => {
                let index = if enable {
                    Some(input_index(input, PRESSURE_INPUT_COUNT, InputKind::Pressure)?)
                } else {
                    None
                };

                for holder in self.config.pressure_inputs.iter_mut() {
                    if holder.assigned_spn == spn {
                        holder.assigned_spn = 0;
                    }
                }

                if let Some(index) = index {
                    self.config.pressure_inputs[index].assigned_spn = spn;
                }

                self.router.adc_mut().initialize(self.config);
            }
            SpnCategory::Thermocouple => {
                self.config.egt_enabled = enable;
                self.router.thermocouple_mut().initialize(self.config);
            }
            SpnCategory::Ambient => {
                self.config.ambient_enabled = enable;
                self.router.ambient_mut().initialize(self.config);
            }
        }

        Ok(CommandResponse::empty())
    }

    pub fn set_calibration_preset(&mut self, input: u8, preset: u8) -> CommandResult {
        let index = input_index(input, TEMP_INPUT_COUNT, InputKind::Temperature)?;
        let preset = ntc_preset(preset).ok_or(CommandError::InvalidPreset)?;

        self.config.temp_inputs[index].apply_preset(preset);

        Ok(CommandResponse::empty())
    }

    pub fn set_range_preset(&mut self, input: u8, preset: u8) -> CommandResult {
        let index = input_index(input, PRESSURE_INPUT_COUNT, InputKind::Pressure)?;
        let (max_range, pressure_type) =
            pressure_range_preset(preset).ok_or(CommandError::InvalidPreset)?;

        let input = &mut self.config.pressure_inputs[index];
        input.max_range = max_range;
        input.pressure_type = pressure_type;

        Ok(CommandResponse::empty())
    }

    /// Sets the raw range value, keeping the pressure type.
    pub fn set_pressure_range(&mut self, input: u8, max_range: u16) -> CommandResult {
        let index = input_index(input, PRESSURE_INPUT_COUNT, InputKind::Pressure)?;

        self.config.pressure_inputs[index].max_range = max_range;

        Ok(CommandResponse::empty())
    }

    /// `param`: 0 = A, 1 = B, 2 = C, 3 = reference resistor.
    pub fn set_ntc_param(&mut self, input: u8, param: u8, value: f32) -> CommandResult {
        let index = input_index(input, TEMP_INPUT_COUNT, InputKind::Temperature)?;
        let input = &mut self.config.temp_inputs[index];

        match param {
            0 => input.coeff_a = value,
            1 => input.coeff_b = value,
            2 => input.coeff_c = value,
            3 => input.resistor_value = value,
            _ => return Err(CommandError::InvalidNtcParam),
        }

        Ok(CommandResponse::empty())
    }

    pub fn set_thermocouple_type(&mut self, thermocouple_type: u8) -> CommandResult {
        let thermocouple_type = ThermocoupleType::try_from(thermocouple_type)
            .map_err(|_| CommandError::InvalidThermocoupleType)?;

        self.config.thermocouple_type = thermocouple_type;

        if self.config.egt_enabled {
            self.router.thermocouple_mut().initialize(self.config);
        }

        Ok(CommandResponse::empty())
    }

    pub fn save(&mut self) -> CommandResult {
        self.store
            .save(self.config)
            .map_err(|_| CommandError::SaveFailed)?;

        Ok(CommandResponse::empty())
    }

    /// Restores defaults in memory only; `save` persists them.
    pub fn reset(&mut self) -> CommandResult {
        ConfigStore::load_defaults(self.config);
        self.router.initialize(self.config);

        Ok(CommandResponse::empty())
    }

    pub fn query(&mut self, query_type: u8, page: u8) -> CommandResult {
        match query_type {
            QUERY_COUNTS => Ok(self.query_counts()),
            QUERY_TEMPERATURE_SPNS => self.query_temperature_spns(page),
            QUERY_PRESSURE_SPNS => self.query_pressure_spns(page),
            QUERY_FULL_CONFIG => Ok(self.query_full_config()),
            _ => Err(CommandError::InvalidQueryType),
        }
    }

    /// [assigned temperature inputs, assigned pressure inputs, EGT enabled, ambient enabled]
    pub fn query_counts(&self) -> CommandResponse {
        CommandResponse::with_payload(&[
            self.config.assigned_temp_inputs() as u8,
            self.config.assigned_pressure_inputs() as u8,
            self.config.egt_enabled as u8,
            self.config.ambient_enabled as u8,
        ])
    }

    /// [source address, thermocouple type, version, EGT enabled, ambient enabled]
    pub fn query_full_config(&self) -> CommandResponse {
        CommandResponse::with_payload(&[
            self.config.source_address,
            self.config.thermocouple_type as u8,
            self.config.version,
            self.config.egt_enabled as u8,
            self.config.ambient_enabled as u8,
        ])
    }

    pub fn query_temperature_spns(&self, page: u8) -> CommandResult {
        let spns = self.config.temp_inputs.map(|input| input.assigned_spn);
        spn_page(&spns, page)
    }

    pub fn query_pressure_spns(&self, page: u8) -> CommandResult {
        let spns = self.config.pressure_inputs.map(|input| input.assigned_spn);
        spn_page(&spns, page)
    }
}

/// Maps a 1-based input number to an array index.
fn input_index(input: u8, count: usize, kind: InputKind) -> Result<usize, CommandError> {
    let input = input as usize;

    if input >= 1 && input <= count {
        Ok(input - 1)
    } else {
        Err(CommandError::InvalidChannel(kind))
    }
}

/// Three identifiers per page as little-endian u16. Past the last input the
/// page is padded with zeros.
fn spn_page(spns: &[u16], page: u8) -> CommandResult {
    if page >= QUERY_PAGE_COUNT {
        return Err(CommandError::InvalidQueryType);
    }

    let mut payload = [0u8; SPNS_PER_PAGE * 2];
    let first = page as usize * SPNS_PER_PAGE;

    for (slot, spn) in spns.iter().skip(first).take(SPNS_PER_PAGE).enumerate() {
        payload[slot * 2..slot * 2 + 2].copy_from_slice(&spn.to_le_bytes());
    }

    Ok(CommandResponse::with_payload(&payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::{AdcScheduler, AmbientScheduler, ThermocoupleScheduler};
    use shared::serdes::serialize_postcard;
    use shared::tmu_config::PressureType;
    use shared::tmu_mock::{
        AdcDeviceMock, AmbientMock, ClockMock, PersistentStoreMock, ThermocoupleMock,
    };

    struct Bench {
        clock: ClockMock,
        adc: [AdcDeviceMock; 4],
        thermocouple: ThermocoupleMock,
        ambient: AmbientMock,
        store: PersistentStoreMock,
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
                store: PersistentStoreMock::new(),
            }
        }

        fn parts(&mut self) -> (ConfigStore<'_>, SensorRouter<'_>) {
            let [d0, d1, d2, d3] = &mut self.adc;

            let router = SensorRouter::new(
                &self.clock,
                AdcScheduler::new([d0, d1, d2, d3]),
                ThermocoupleScheduler::new(&mut self.thermocouple),
                AmbientScheduler::new(&mut self.ambient),
            );

            (ConfigStore::new(&mut self.store), router)
        }
    }

    macro_rules! handler {
        ($config:ident, $store:ident, $router:ident) => {
            CommandHandler::new(&mut $config, &mut $store, &mut $router)
        };
    }

    #[test]
    fn unknown_identifier_is_rejected() {
        let mut bench = Bench::new();
        let (mut store, mut router) = bench.parts();
        let mut config = ModuleConfig::default();
        let mut handler = handler!(config, store, router);

        assert_eq!(
            handler.enable_output_parameter(9999, true, 1),
            Err(CommandError::UnknownParameter)
        );
        // Hi-res companions are not assignable
        assert_eq!(
            handler.enable_output_parameter(1637, true, 1),
            Err(CommandError::UnknownParameter)
        );
    }

    #[test]
    fn input_numbers_are_one_based() {
        let mut bench = Bench::new();
        let (mut store, mut router) = bench.parts();
        let mut config = ModuleConfig::default();
        let mut handler = handler!(config, store, router);

        assert_eq!(
            handler.enable_output_parameter(175, true, 0),
            Err(CommandError::InvalidChannel(InputKind::Temperature))
        );
        assert_eq!(
            handler.enable_output_parameter(175, true, 9),
            Err(CommandError::InvalidChannel(InputKind::Temperature))
        );
        assert_eq!(
            handler.enable_output_parameter(100, true, 8),
            Err(CommandError::InvalidChannel(InputKind::Pressure))
        );
        assert!(handler.enable_output_parameter(175, true, 8).is_ok());
        assert!(handler.enable_output_parameter(100, true, 7).is_ok());

        assert_eq!(config.temp_inputs[7].assigned_spn, 175);
        assert_eq!(config.pressure_inputs[6].assigned_spn, 100);
    }

    #[test]
    fn assignment_moves_instead_of_duplicating() {
        let mut bench = Bench::new();
        let (mut store, mut router) = bench.parts();
        let mut config = ModuleConfig::default();
        let mut handler = handler!(config, store, router);

        handler.enable_output_parameter(102, true, 1).unwrap();
        handler.enable_output_parameter(102, true, 4).unwrap();

        let holders: Vec<usize> = config
            .pressure_inputs
            .iter()
            .enumerate()
            .filter(|(_, input)| input.assigned_spn == 102)
            .map(|(index, _)| index)
            .collect();
        assert_eq!(holders, vec![3]);
    }

    #[test]
    fn enabling_brings_up_hardware() {
        let mut bench = Bench::new();
        let (mut store, mut router) = bench.parts();
        let mut config = ModuleConfig::default();

        {
            let mut handler = handler!(config, store, router);
            // Temperature input 3 sits on device 1
            handler.enable_output_parameter(110, true, 3).unwrap();
            handler.enable_output_parameter(173, true, 0).unwrap();
            handler.enable_output_parameter(108, true, 0).unwrap();
        }

        assert!(router.adc().is_initialized(1));
        assert!(!router.adc().is_initialized(0));
        assert!(router.thermocouple().is_initialized());
        assert!(router.ambient().is_initialized());
        assert!(config.egt_enabled);
        assert!(config.ambient_enabled);
    }

    #[test]
    fn disabling_clears_holder_and_releases_device() {
        let mut bench = Bench::new();
        let (mut store, mut router) = bench.parts();
        let mut config = ModuleConfig::default();

        {
            let mut handler = handler!(config, store, router);
            handler.enable_output_parameter(175, true, 1).unwrap();
            handler.enable_output_parameter(175, false, 0).unwrap();
            handler.enable_output_parameter(173, true, 0).unwrap();
            handler.enable_output_parameter(173, false, 0).unwrap();
        }

        assert_eq!(config.assigned_temp_inputs(), 0);
        assert!(!config.egt_enabled);
        assert!(!router.adc().is_enabled(0));
        assert!(!router.thermocouple().is_initialized());
    }

    #[test]
    fn presets() {
        let mut bench = Bench::new();
        let (mut store, mut router) = bench.parts();
        let mut config = ModuleConfig::default();
        let mut handler = handler!(config, store, router);

        handler.set_calibration_preset(2, 1).unwrap();
        assert_eq!(handler.set_calibration_preset(2, 3), Err(CommandError::InvalidPreset));
        assert_eq!(
            handler.set_calibration_preset(9, 0),
            Err(CommandError::InvalidChannel(InputKind::Temperature))
        );

        handler.set_range_preset(1, 12).unwrap();
        handler.set_range_preset(2, 24).unwrap();
        assert_eq!(handler.set_range_preset(3, 17), Err(CommandError::InvalidPreset));

        assert_eq!(config.temp_inputs[1].resistor_value, 2490.0);
        assert_eq!(config.pressure_inputs[0].max_range, 20000);
        assert_eq!(config.pressure_inputs[0].pressure_type, PressureType::Absolute);
        assert_eq!(config.pressure_inputs[1].max_range, 150);
        assert_eq!(config.pressure_inputs[1].pressure_type, PressureType::Gauge);
        assert_eq!(config.pressure_inputs[2].max_range, 100);
    }

    #[test]
    fn raw_calibration_parameters() {
        let mut bench = Bench::new();
        let (mut store, mut router) = bench.parts();
        let mut config = ModuleConfig::default();
        let mut handler = handler!(config, store, router);

        handler.set_ntc_param(1, 0, 1.1e-3).unwrap();
        handler.set_ntc_param(1, 3, 4700.0).unwrap();
        assert_eq!(handler.set_ntc_param(1, 4, 1.0), Err(CommandError::InvalidNtcParam));
        handler.set_pressure_range(5, 345).unwrap();

        assert_eq!(config.temp_inputs[0].coeff_a, 1.1e-3);
        assert_eq!(config.temp_inputs[0].resistor_value, 4700.0);
        assert_eq!(config.pressure_inputs[4].max_range, 345);
        assert_eq!(config.pressure_inputs[4].pressure_type, PressureType::Gauge);
    }

    #[test]
    fn thermocouple_type_is_applied_live() {
        let mut bench = Bench::new();
        let (mut store, mut router) = bench.parts();
        let mut config = ModuleConfig::default();

        {
            let mut handler = handler!(config, store, router);
            handler.enable_output_parameter(173, true, 0).unwrap();
            handler.set_thermocouple_type(ThermocoupleType::T as u8).unwrap();
            assert_eq!(
                handler.set_thermocouple_type(8),
                Err(CommandError::InvalidThermocoupleType)
            );
        }

        assert_eq!(config.thermocouple_type, ThermocoupleType::T);
        let device = router
            .thermocouple_mut()
            .device_mut()
            .as_mut_any()
            .downcast_mut::<ThermocoupleMock>()
            .unwrap();
        assert_eq!(device.thermocouple_type, Some(ThermocoupleType::T));
    }

    #[test]
    fn save_and_reset() {
        let mut bench = Bench::new();
        let (mut store, mut router) = bench.parts();
        let mut config = ModuleConfig::default();

        {
            let mut handler = handler!(config, store, router);
            handler.enable_output_parameter(175, true, 1).unwrap();
            handler.save().unwrap();
            handler.reset().unwrap();
        }

        assert_eq!(config.assigned_temp_inputs(), 0);
        assert!(router.adc().cursor().is_none());

        let persisted = store.load();
        assert!(persisted.was_valid);
        assert_eq!(persisted.config.temp_inputs[0].assigned_spn, 175);
    }

    #[test]
    fn save_failure_is_reported() {
        let mut bench = Bench::new();
        bench.store.fail_writes = true;
        let (mut store, mut router) = bench.parts();
        let mut config = ModuleConfig::default();
        let mut handler = handler!(config, store, router);

        assert_eq!(handler.save(), Err(CommandError::SaveFailed));
    }

    #[test]
    fn queries() {
        let mut bench = Bench::new();
        let (mut store, mut router) = bench.parts();
        let mut config = ModuleConfig::default();
        let mut handler = handler!(config, store, router);

        handler.enable_output_parameter(175, true, 1).unwrap();
        handler.enable_output_parameter(441, true, 8).unwrap();
        handler.enable_output_parameter(94, true, 7).unwrap();
        handler.enable_output_parameter(171, true, 0).unwrap();

        let counts = handler.query(QUERY_COUNTS, 0).unwrap();
        assert_eq!(counts.payload(), &[2, 1, 0, 1]);

        let page = handler.query(QUERY_TEMPERATURE_SPNS, 0).unwrap();
        assert_eq!(page.payload(), &[175, 0, 0, 0, 0, 0]);

        let page = handler.query(QUERY_TEMPERATURE_SPNS, 2).unwrap();
        assert_eq!(page.payload(), &[0, 0, 0xB9, 0x01, 0, 0]);

        let page = handler.query(QUERY_PRESSURE_SPNS, 2).unwrap();
        assert_eq!(page.payload(), &[94, 0, 0, 0, 0, 0]);

        let full = handler.query(QUERY_FULL_CONFIG, 0).unwrap();
        assert_eq!(full.payload(), &[149, ThermocoupleType::K as u8, 3, 0, 1]);

        assert_eq!(handler.query(3, 0), Err(CommandError::InvalidQueryType));
        assert_eq!(
            handler.query(QUERY_PRESSURE_SPNS, 3),
            Err(CommandError::InvalidQueryType)
        );
    }

    #[test]
    fn execute_dispatches_decoded_requests() {
        let mut bench = Bench::new();
        let (mut store, mut router) = bench.parts();
        let mut config = ModuleConfig::default();
        let mut handler = handler!(config, store, router);

        let mut buffer = [0u8; 32];
        let request = CommandRequest::EnableOutputParameter {
            spn: 100,
            enable: true,
            input: 2,
        };
        let len = serialize_postcard(&request, &mut buffer).unwrap();

        assert!(handler.execute_bytes(&buffer[..len]).is_ok());
        assert_eq!(handler.execute_bytes(&[0xFF]), Err(CommandError::ParseFailed));
        assert_eq!(handler.execute_bytes(&[]), Err(CommandError::ParseFailed));
        assert_eq!(handler.execute_bytes(&[9]), Err(CommandError::UnknownCommand));
        assert_eq!(
            handler.execute(CommandRequest::SetRangePreset { input: 2, preset: 99 }),
            Err(CommandError::InvalidPreset)
        );

        assert_eq!(config.pressure_inputs[1].assigned_spn, 100);
    }
}
