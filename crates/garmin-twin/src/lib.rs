//! Personal fitness "digital twin" pipeline
//!
//! Garmin Connect -> staged JSON -> daily KPIs -> Google Sheets -> coaching
//! message -> Telegram. See [`pipeline`] for the stages and the batch
//! orchestrator.

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod insight;
pub mod models;
pub mod notify;
pub mod pipeline;
pub mod sink;
pub mod source;
pub mod staging;
pub mod transform;

pub use error::{Result, TwinError};
