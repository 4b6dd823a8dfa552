#![cfg_attr(not(any(test, feature = "sil")), no_std)]
#![deny(unsafe_code)]

pub mod acquisition;
pub mod calibration;
pub mod command_handler;
pub mod config_store;
pub mod reading_buffer;
pub mod router;
pub mod tmu;

pub use tmu::{Tmu, TmuPeripherals};

#[cfg(any(test, feature = "sil"))]
macro_rules! silprintln {
    () => { println!() };
    ($($arg:tt)*) => { println!($($arg)*) };
}

#[cfg(not(any(test, feature = "sil")))]
macro_rules! silprintln {
    () => {};
    ($($arg:tt)*) => {};
}

pub(crate) use silprintln;
