use shared::tmu_config::{
    ModuleConfig, ADS_I2C_ADDRESSES, MUX_SINGLE, PRESSURE_HARDWARE_MAP, TEMP_HARDWARE_MAP,
};
use shared::tmu_hal::{AdcDevice, AdcReading, PinLevel};
use shared::{ADS_CHANNEL_COUNT, ADS_DEVICE_COUNT};

use super::{elapsed_ms, AcquisitionStats, ConversionState};
use crate::reading_buffer::ReadingBuffer;
use crate::silprintln;

/// Longest a single-shot conversion may take before it is abandoned.
pub const ADC_TIMEOUT_MS: u32 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub device: usize,
    pub channel: usize,
}

/// Round-robin driver for the four multiplexed converters. Every channel of
/// every initialized device is sampled in turn, one step per tick.
pub struct AdcScheduler<'a> {
    devices: [&'a mut dyn AdcDevice; ADS_DEVICE_COUNT],
    enabled: [bool; ADS_DEVICE_COUNT],
    initialized: [bool; ADS_DEVICE_COUNT],
    readings: ReadingBuffer<AdcReading, ADS_DEVICE_COUNT, ADS_CHANNEL_COUNT>,
    cursor: Option<Cursor>,
    state: ConversionState,
    stats: AcquisitionStats,
}

impl<'a> AdcScheduler<'a> {
    pub fn new(devices: [&'a mut dyn AdcDevice; ADS_DEVICE_COUNT]) -> Self {
        Self {
            devices,
            enabled: [false; ADS_DEVICE_COUNT],
            initialized: [false; ADS_DEVICE_COUNT],
            readings: ReadingBuffer::new(AdcReading::INVALID),
            cursor: None,
            state: ConversionState::Idle,
            stats: AcquisitionStats::default(),
        }
    }

    /// Brings up every device that has an assigned input and rewinds the
    /// round-robin. Safe to call at any time.
    pub fn initialize(&mut self, config: &ModuleConfig) {
        self.enabled = [false; ADS_DEVICE_COUNT];

        for (input, (device, _)) in config.temp_inputs.iter().zip(TEMP_HARDWARE_MAP.iter()) {
            if input.assigned_spn != 0 {
                self.enabled[*device] = true;
            }
        }

        for (input, (device, _)) in config
            .pressure_inputs
            .iter()
            .zip(PRESSURE_HARDWARE_MAP.iter())
        {
            if input.assigned_spn != 0 {
                self.enabled[*device] = true;
            }
        }

        for device in 0..ADS_DEVICE_COUNT {
            self.initialized[device] = if self.enabled[device] {
                let address = ADS_I2C_ADDRESSES[device];
                let ok = self.devices[device].begin(address);

                if ok {
                    silprintln!("ADC {} online at {:#04x}", device, address);
                } else {
                    silprintln!("ADC {} failed to start at {:#04x}", device, address);
                }

                ok
            } else {
                false
            };

            if !self.initialized[device] {
                self.readings.fill_device(device, AdcReading::INVALID);
            }
        }

        self.state = ConversionState::Idle;
        self.cursor = self.next_initialized_device(0).map(|device| Cursor { device, channel: 0 });
    }

    /// Advances the conversion state machine. Never blocks. Returns true if a
    /// conversion completed during this tick.
    pub fn tick(&mut self, now_ms: u32) -> bool {
        let Some(cursor) = self.cursor else {
            return false;
        };

        let started_at_ms = match self.state {
            ConversionState::Idle => {
                self.start_conversion(now_ms);
                return false;
            }
            ConversionState::AwaitingReady { started_at_ms } => started_at_ms,
        };

        let device = &mut self.devices[cursor.device];
        let ready = device.ready_line() == PinLevel::Low || device.conversion_complete();

        if ready {
            let raw_value = device.read_last_result();
            self.readings.store(
                cursor.device,
                cursor.channel,
                AdcReading {
                    raw_value,
                    timestamp_ms: now_ms,
                    valid: true,
                },
            );
            self.stats.completed = self.stats.completed.wrapping_add(1);
        } else if elapsed_ms(now_ms, started_at_ms) > ADC_TIMEOUT_MS {
            silprintln!(
                "ADC {} channel {} timed out",
                cursor.device,
                cursor.channel
            );
            self.readings.update(cursor.device, cursor.channel, |reading| AdcReading {
                valid: false,
                ..reading
            });
            self.stats.timeouts = self.stats.timeouts.wrapping_add(1);
        } else {
            return false;
        }

        self.state = ConversionState::Idle;
        self.advance();
        self.start_conversion(now_ms);

        ready
    }

    fn start_conversion(&mut self, now_ms: u32) {
        if let Some(cursor) = self.cursor {
            self.devices[cursor.device].start_conversion(MUX_SINGLE[cursor.channel]);
            self.state = ConversionState::AwaitingReady {
                started_at_ms: now_ms,
            };
        }
    }

    fn advance(&mut self) {
        let Some(cursor) = self.cursor else {
            return;
        };

        if cursor.channel + 1 < ADS_CHANNEL_COUNT {
            self.cursor = Some(Cursor {
                device: cursor.device,
                channel: cursor.channel + 1,
            });
        } else {
            self.cursor = self
                .next_initialized_device(cursor.device + 1)
                .map(|device| Cursor { device, channel: 0 });
        }
    }

    fn next_initialized_device(&self, from: usize) -> Option<usize> {
        (0..ADS_DEVICE_COUNT)
            .map(|offset| (from + offset) % ADS_DEVICE_COUNT)
            .find(|device| self.initialized[*device])
    }

    pub fn reading(&self, device: usize, channel: usize) -> Option<AdcReading> {
        self.readings.get(device, channel)
    }

    /// Voltage of the latest valid reading on a slot.
    pub fn voltage(&self, device: usize, channel: usize) -> Option<f32> {
        let reading = self.reading(device, channel)?;

        if reading.valid {
            Some(self.devices[device].compute_voltage(reading.raw_value))
        } else {
            None
        }
    }

    pub fn cursor(&self) -> Option<Cursor> {
        self.cursor
    }

    pub fn state(&self) -> ConversionState {
        self.state
    }

    pub fn stats(&self) -> AcquisitionStats {
        self.stats
    }

    pub fn is_enabled(&self, device: usize) -> bool {
        self.enabled.get(device).copied().unwrap_or(false)
    }

    pub fn is_initialized(&self, device: usize) -> bool {
        self.initialized.get(device).copied().unwrap_or(false)
    }

    pub fn device_mut(&mut self, device: usize) -> Option<&mut (dyn AdcDevice + 'a)> {
        self.devices.get_mut(device).map(|device| &mut **device)
    }
}
