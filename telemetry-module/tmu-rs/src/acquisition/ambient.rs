use core::ops::RangeInclusive;

use shared::standard_atmosphere::pa_to_kpa;
use shared::tmu_config::{ModuleConfig, AMBIENT_I2C_ADDRESS};
use shared::tmu_hal::{AmbientDevice, AmbientReading};

use super::{elapsed_ms, AcquisitionStats};
use crate::reading_buffer::ReadingBuffer;
use crate::silprintln;

pub const AMBIENT_READ_INTERVAL_MS: u32 = 1000;

const TEMPERATURE_RANGE_C: RangeInclusive<f32> = -40.0..=85.0;
const HUMIDITY_RANGE_PCT: RangeInclusive<f32> = 0.0..=100.0;
const PRESSURE_RANGE_KPA: RangeInclusive<f32> = 30.0..=110.0;

/// Rate-limited poll of the ambient temperature / humidity / pressure sensor.
pub struct AmbientScheduler<'a> {
    device: &'a mut dyn AmbientDevice,
    enabled: bool,
    initialized: bool,
    reading: ReadingBuffer<AmbientReading, 1, 1>,
    last_read_ms: Option<u32>,
    last_valid_pressure_kpa: Option<f32>,
    stats: AcquisitionStats,
}

impl<'a> AmbientScheduler<'a> {
    pub fn new(device: &'a mut dyn AmbientDevice) -> Self {
        Self {
            device,
            enabled: false,
            initialized: false,
            reading: ReadingBuffer::new(AmbientReading::INVALID),
            last_read_ms: None,
            last_valid_pressure_kpa: None,
            stats: AcquisitionStats::default(),
        }
    }

    pub fn initialize(&mut self, config: &ModuleConfig) {
        self.enabled = config.ambient_enabled;
        self.initialized = self.enabled && self.device.begin(AMBIENT_I2C_ADDRESS);

        if self.enabled && !self.initialized {
            silprintln!("Ambient sensor failed to start at {:#04x}", AMBIENT_I2C_ADDRESS);
        }

        if !self.initialized {
            self.reading.store(0, 0, AmbientReading::INVALID);
            self.last_valid_pressure_kpa = None;
        }

        self.last_read_ms = None;
    }

    /// Reads the sensor if the interval has passed since the last good read.
    /// Returns true if a valid reading was taken.
    pub fn tick(&mut self, now_ms: u32) -> bool {
        if !self.initialized {
            return false;
        }

        if let Some(last_read_ms) = self.last_read_ms {
            if elapsed_ms(now_ms, last_read_ms) < AMBIENT_READ_INTERVAL_MS {
                return false;
            }
        }

        let temperature_c = self.device.read_temperature();
        let humidity_pct = self.device.read_humidity();
        let pressure_kpa = pa_to_kpa(self.device.read_pressure());

        let valid = TEMPERATURE_RANGE_C.contains(&temperature_c)
            && HUMIDITY_RANGE_PCT.contains(&humidity_pct)
            && PRESSURE_RANGE_KPA.contains(&pressure_kpa);

        if valid {
            self.reading.store(
                0,
                0,
                AmbientReading {
                    temperature_c,
                    humidity_pct,
                    pressure_kpa,
                    timestamp_ms: now_ms,
                    valid: true,
                },
            );
            self.last_read_ms = Some(now_ms);
            self.last_valid_pressure_kpa = Some(pressure_kpa);
            self.stats.completed = self.stats.completed.wrapping_add(1);
        } else {
            silprintln!(
                "Ambient reading rejected: {} C, {} %, {} kPa",
                temperature_c,
                humidity_pct,
                pressure_kpa
            );
            self.reading.update(0, 0, |reading| AmbientReading {
                valid: false,
                ..reading
            });
        }

        valid
    }

    pub fn reading(&self) -> AmbientReading {
        self.reading.get(0, 0).unwrap_or(AmbientReading::INVALID)
    }

    /// Barometric pressure from the last valid reading. A rejected poll does
    /// not clear it; only losing the sensor on `initialize` does.
    pub fn atmospheric_pressure_kpa(&self) -> Option<f32> {
        self.last_valid_pressure_kpa
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn stats(&self) -> AcquisitionStats {
        self.stats
    }

    pub fn device_mut(&mut self) -> &mut (dyn AmbientDevice + 'a) {
        &mut *self.device
    }
}
