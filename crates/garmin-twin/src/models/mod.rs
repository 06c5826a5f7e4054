//! Normalized records written to the sink

pub mod activity;
pub mod biometric;
pub mod daily;
pub mod kpi;

pub use activity::ActivityRecord;
pub use biometric::{BiometricEntry, BiometricMeasures};
pub use daily::DailyKpiRecord;
pub use kpi::{Kpi, NOT_AVAILABLE};
