#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_code)]

pub mod command_hal;
pub mod serdes;
pub mod spn;
pub mod standard_atmosphere;
pub mod tmu_config;
pub mod tmu_hal;
pub mod tmu_mock;

pub const TEMP_INPUT_COUNT: usize = 8;
pub const PRESSURE_INPUT_COUNT: usize = 7;

pub const ADS_DEVICE_COUNT: usize = 4;
pub const ADS_CHANNEL_COUNT: usize = 4;
