use core::any::Any;
use core::cell::Cell;

use crate::tmu_hal::{
    AdcDevice, AmbientDevice, Clock, PersistentStore, PinLevel, StoreError, ThermocoupleDevice,
    ThermocoupleType,
};
use crate::ADS_CHANNEL_COUNT;

pub const STORE_MOCK_SIZE: usize = 512;

/// Millisecond counter advanced by hand.
pub struct ClockMock {
    now_ms: Cell<u32>,
}

impl ClockMock {
    pub fn new(start_ms: u32) -> Self {
        Self {
            now_ms: Cell::new(start_ms),
        }
    }

    pub fn advance(&self, ms: u32) {
        self.now_ms.set(self.now_ms.get().wrapping_add(ms));
    }

    pub fn set(&self, ms: u32) {
        self.now_ms.set(ms);
    }
}

impl Clock for ClockMock {
    fn now_ms(&self) -> u32 {
        self.now_ms.get()
    }
}

pub struct AdcDeviceMock {
    pub present: bool,
    /// When false, started conversions never finish.
    pub responsive: bool,
    /// When true, the ready line reports completion and the status query never does.
    pub use_ready_line: bool,
    pub raw_values: [i16; ADS_CHANNEL_COUNT],
    pub reads: [u32; ADS_CHANNEL_COUNT],
    pub begin_calls: u32,
    pub conversions_started: u32,
    address: Option<u8>,
    active_channel: Option<usize>,
}

impl AdcDeviceMock {
    /// Full-scale voltage of the converter's programmable gain stage.
    pub const FULL_SCALE_V: f32 = 4.096;

    pub fn new() -> Self {
        Self {
            present: true,
            responsive: true,
            use_ready_line: false,
            raw_values: [0; ADS_CHANNEL_COUNT],
            reads: [0; ADS_CHANNEL_COUNT],
            begin_calls: 0,
            conversions_started: 0,
            address: None,
            active_channel: None,
        }
    }

    pub fn address(&self) -> Option<u8> {
        self.address
    }

    pub fn active_channel(&self) -> Option<usize> {
        self.active_channel
    }

    pub fn total_reads(&self) -> u32 {
        self.reads.iter().sum()
    }

    fn conversion_finished(&self) -> bool {
        self.responsive && self.active_channel.is_some()
    }
}

impl AdcDevice for AdcDeviceMock {
    fn begin(&mut self, address: u8) -> bool {
        self.begin_calls += 1;
        self.address = Some(address);
        self.present
    }

    fn start_conversion(&mut self, mux: u16) {
        self.conversions_started += 1;
        self.active_channel = Some(((mux >> 12) & 0x3) as usize);
    }

    fn conversion_complete(&mut self) -> bool {
        !self.use_ready_line && self.conversion_finished()
    }

    fn read_last_result(&mut self) -> i16 {
        match self.active_channel.take() {
            Some(channel) => {
                self.reads[channel] += 1;
                self.raw_values[channel]
            }
            None => 0,
        }
    }

    fn compute_voltage(&self, raw_value: i16) -> f32 {
        raw_value as f32 * Self::FULL_SCALE_V / 32768.0
    }

    fn ready_line(&self) -> PinLevel {
        if self.use_ready_line && self.conversion_finished() {
            PinLevel::Low
        } else {
            PinLevel::High
        }
    }

    fn as_mut_any(&mut self) -> &mut dyn Any {
        self
    }
}

pub struct ThermocoupleMock {
    pub present: bool,
    pub responsive: bool,
    pub temperature_c: f32,
    pub cold_junction_c: f32,
    pub fault: u8,
    pub thermocouple_type: Option<ThermocoupleType>,
    pub begin_calls: u32,
    pub conversions_started: u32,
    in_flight: bool,
}

impl ThermocoupleMock {
    pub fn new() -> Self {
        Self {
            present: true,
            responsive: true,
            temperature_c: 0.0,
            cold_junction_c: 0.0,
            fault: 0,
            thermocouple_type: None,
            begin_calls: 0,
            conversions_started: 0,
            in_flight: false,
        }
    }
}

impl ThermocoupleDevice for ThermocoupleMock {
    fn begin(&mut self) -> bool {
        self.begin_calls += 1;
        self.present
    }

    fn set_thermocouple_type(&mut self, thermocouple_type: ThermocoupleType) {
        self.thermocouple_type = Some(thermocouple_type);
    }

    fn trigger_conversion(&mut self) {
        self.conversions_started += 1;
        self.in_flight = true;
    }

    fn conversion_complete(&mut self) -> bool {
        self.responsive && self.in_flight
    }

    fn ready_line(&self) -> PinLevel {
        PinLevel::High
    }

    fn read_fault(&mut self) -> u8 {
        self.fault
    }

    fn read_thermocouple_temperature(&mut self) -> f32 {
        self.in_flight = false;
        self.temperature_c
    }

    fn read_cold_junction_temperature(&mut self) -> f32 {
        self.cold_junction_c
    }

    fn as_mut_any(&mut self) -> &mut dyn Any {
        self
    }
}

pub struct AmbientMock {
    pub present: bool,
    pub temperature_c: f32,
    pub humidity_pct: f32,
    pub pressure_pa: f32,
    pub reads: u32,
}

impl AmbientMock {
    pub fn new() -> Self {
        Self {
            present: true,
            temperature_c: 21.0,
            humidity_pct: 40.0,
            pressure_pa: 101_325.0,
            reads: 0,
        }
    }
}

impl AmbientDevice for AmbientMock {
    fn begin(&mut self, _address: u8) -> bool {
        self.present
    }

    fn read_temperature(&mut self) -> f32 {
        self.reads += 1;
        self.temperature_c
    }

    fn read_humidity(&mut self) -> f32 {
        self.humidity_pct
    }

    fn read_pressure(&mut self) -> f32 {
        self.pressure_pa
    }

    fn as_mut_any(&mut self) -> &mut dyn Any {
        self
    }
}

pub struct PersistentStoreMock {
    pub data: [u8; STORE_MOCK_SIZE],
    pub fail_reads: bool,
    pub fail_writes: bool,
    pub writes: u32,
}

impl PersistentStoreMock {
    /// Blank store, erased to 0xFF like fresh flash.
    pub fn new() -> Self {
        Self {
            data: [0xFF; STORE_MOCK_SIZE],
            fail_reads: false,
            fail_writes: false,
            writes: 0,
        }
    }
}

impl PersistentStore for PersistentStoreMock {
    fn get(&mut self, offset: usize, buffer: &mut [u8]) -> Result<(), StoreError> {
        if self.fail_reads {
            return Err(StoreError::ReadFailed);
        }

        let source = self
            .data
            .get(offset..offset + buffer.len())
            .ok_or(StoreError::OutOfBounds)?;
        buffer.copy_from_slice(source);

        Ok(())
    }

    fn put(&mut self, offset: usize, data: &[u8]) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::WriteFailed);
        }

        let target = self
            .data
            .get_mut(offset..offset + data.len())
            .ok_or(StoreError::OutOfBounds)?;
        target.copy_from_slice(data);
        self.writes += 1;

        Ok(())
    }

    fn as_mut_any(&mut self) -> &mut dyn Any {
        self
    }
}
