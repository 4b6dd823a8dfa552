pub mod adc;
pub mod ambient;
pub mod thermocouple;

use serde::{Deserialize, Serialize};

pub use adc::AdcScheduler;
pub use ambient::AmbientScheduler;
pub use thermocouple::ThermocoupleScheduler;

/// Per-family conversion state. Starting and completing a conversion both
/// happen inside a single tick, so only the waiting state persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversionState {
    Idle,
    AwaitingReady { started_at_ms: u32 },
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquisitionStats {
    pub completed: u32,
    pub timeouts: u32,
}

/// Milliseconds between two clock readings, tolerant of counter wrap.
pub(crate) fn elapsed_ms(now_ms: u32, since_ms: u32) -> u32 {
    now_ms.wrapping_sub(since_ms)
}
