use shared::tmu_config::ModuleConfig;
use shared::tmu_hal::{PinLevel, ThermocoupleDevice, ThermocoupleFault, ThermocoupleReading};

use super::{elapsed_ms, AcquisitionStats, ConversionState};
use crate::reading_buffer::ReadingBuffer;
use crate::silprintln;

pub const THERMOCOUPLE_TIMEOUT_MS: u32 = 200;

/// Drives the single exhaust gas thermocouple converter. Same state machine
/// as the multiplexed converters with one device and one channel.
pub struct ThermocoupleScheduler<'a> {
    device: &'a mut dyn ThermocoupleDevice,
    enabled: bool,
    initialized: bool,
    reading: ReadingBuffer<ThermocoupleReading, 1, 1>,
    fault: ThermocoupleFault,
    state: ConversionState,
    stats: AcquisitionStats,
}

impl<'a> ThermocoupleScheduler<'a> {
    pub fn new(device: &'a mut dyn ThermocoupleDevice) -> Self {
        Self {
            device,
            enabled: false,
            initialized: false,
            reading: ReadingBuffer::new(ThermocoupleReading::INVALID),
            fault: ThermocoupleFault::default(),
            state: ConversionState::Idle,
            stats: AcquisitionStats::default(),
        }
    }

    pub fn initialize(&mut self, config: &ModuleConfig) {
        self.enabled = config.egt_enabled;
        self.initialized = false;

        if self.enabled {
            if self.device.begin() {
                self.device.set_thermocouple_type(config.thermocouple_type);
                self.initialized = true;
                silprintln!("Thermocouple online, type {:?}", config.thermocouple_type);
            } else {
                silprintln!("Thermocouple converter failed to start");
            }
        }

        if !self.initialized {
            self.reading.store(0, 0, ThermocoupleReading::INVALID);
            self.fault = ThermocoupleFault::default();
        }

        self.state = ConversionState::Idle;
    }

    /// Returns true if a conversion completed during this tick.
    pub fn tick(&mut self, now_ms: u32) -> bool {
        if !self.initialized {
            return false;
        }

        let started_at_ms = match self.state {
            ConversionState::Idle => {
                self.start_conversion(now_ms);
                return false;
            }
            ConversionState::AwaitingReady { started_at_ms } => started_at_ms,
        };

        let ready =
            self.device.ready_line() == PinLevel::Low || self.device.conversion_complete();

        if ready {
            self.fault = ThermocoupleFault(self.device.read_fault());
            let temperature_c = self.device.read_thermocouple_temperature();
            let cold_junction_c = self.device.read_cold_junction_temperature();

            for description in self.fault.active() {
                silprintln!("Thermocouple fault: {}", description);
            }

            self.reading.store(
                0,
                0,
                ThermocoupleReading {
                    temperature_c,
                    cold_junction_c,
                    timestamp_ms: now_ms,
                    valid: !self.fault.is_fault(),
                },
            );
            self.stats.completed = self.stats.completed.wrapping_add(1);
        } else if elapsed_ms(now_ms, started_at_ms) > THERMOCOUPLE_TIMEOUT_MS {
            silprintln!("Thermocouple conversion timed out");
            self.reading.update(0, 0, |reading| ThermocoupleReading {
                valid: false,
                ..reading
            });
            self.stats.timeouts = self.stats.timeouts.wrapping_add(1);
        } else {
            return false;
        }

        self.start_conversion(now_ms);

        ready
    }

    fn start_conversion(&mut self, now_ms: u32) {
        self.device.trigger_conversion();
        self.state = ConversionState::AwaitingReady {
            started_at_ms: now_ms,
        };
    }

    pub fn reading(&self) -> ThermocoupleReading {
        self.reading.get(0, 0).unwrap_or(ThermocoupleReading::INVALID)
    }

    /// Fault register from the most recent completed conversion.
    pub fn fault(&self) -> ThermocoupleFault {
        self.fault
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn state(&self) -> ConversionState {
        self.state
    }

    pub fn stats(&self) -> AcquisitionStats {
        self.stats
    }

    pub fn device_mut(&mut self) -> &mut (dyn ThermocoupleDevice + 'a) {
        &mut *self.device
    }
}
