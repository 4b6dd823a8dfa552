use shared::spn::OutputTable;
use shared::tmu_config::ModuleConfig;
use shared::tmu_hal::{
    AdcDevice, AmbientDevice, Clock, PersistentStore, ThermocoupleDevice, ThermocoupleFault,
};
use shared::ADS_DEVICE_COUNT;

use crate::acquisition::{AdcScheduler, AmbientScheduler, ThermocoupleScheduler};
use crate::command_handler::CommandHandler;
use crate::config_store::ConfigStore;
use crate::router::SensorRouter;
use crate::silprintln;

pub struct TmuPeripherals<'a> {
    pub clock: &'a dyn Clock,
    pub adc_devices: [&'a mut dyn AdcDevice; ADS_DEVICE_COUNT],
    pub thermocouple: &'a mut dyn ThermocoupleDevice,
    pub ambient: &'a mut dyn AmbientDevice,
}

/// Telemetry module controller. Owns the live configuration, its persistent
/// store and the acquisition pipeline.
pub struct Tmu<'a> {
    config: ModuleConfig,
    store: ConfigStore<'a>,
    router: SensorRouter<'a>,
    config_was_valid: bool,
}

impl<'a> Tmu<'a> {
    pub fn new(store: &'a mut dyn PersistentStore, peripherals: TmuPeripherals<'a>) -> Self {
        let mut store = ConfigStore::new(store);
        let loaded = store.load();

        if let Some(err) = loaded.persist_error {
            silprintln!("Failed to persist default config: {:?}", err);
        }

        let mut router = SensorRouter::new(
            peripherals.clock,
            AdcScheduler::new(peripherals.adc_devices),
            ThermocoupleScheduler::new(peripherals.thermocouple),
            AmbientScheduler::new(peripherals.ambient),
        );
        router.initialize(&loaded.config);

        Self {
            config: loaded.config,
            store,
            router,
            config_was_valid: loaded.was_valid,
        }
    }

    /// One pass of acquisition and calibration. Never blocks.
    pub fn tick(&mut self) {
        self.router.tick(&self.config);
    }

    pub fn commands(&mut self) -> CommandHandler<'_, 'a> {
        CommandHandler::new(&mut self.config, &mut self.store, &mut self.router)
    }

    pub fn config(&self) -> &ModuleConfig {
        &self.config
    }

    pub fn output_table(&self) -> &OutputTable {
        self.router.output_table()
    }

    pub fn thermocouple_fault(&self) -> ThermocoupleFault {
        self.router.thermocouple_fault()
    }

    /// False if defaults replaced the stored record at startup.
    pub fn config_was_valid(&self) -> bool {
        self.config_was_valid
    }

    pub fn router(&self) -> &SensorRouter<'a> {
        &self.router
    }

    pub fn router_mut(&mut self) -> &mut SensorRouter<'a> {
        &mut self.router
    }

    pub fn store_mut(&mut self) -> &mut (dyn PersistentStore + 'a) {
        self.store.store_mut()
    }
}
