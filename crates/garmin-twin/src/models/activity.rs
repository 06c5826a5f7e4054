//! Normalized activity records
//!
//! Numeric fields stay numeric: missing heart rate or calories are zero, not
//! the `N/D` marker, because the dashboard aggregates them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::kpi::NOT_AVAILABLE;
use crate::error::{Result, TwinError};

/// One row of the `Attivita` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub activity_id: u64,
    /// Local start time as reported by the device (`YYYY-MM-DD HH:MM:SS`)
    pub timestamp: String,
    /// Activity type key, e.g. `running`
    #[serde(rename = "type")]
    pub activity_type: String,
    pub distance_km: f64,
    pub duration_min: f64,
    pub avg_heart_rate: i64,
    pub calories: i64,
}

impl ActivityRecord {
    pub fn to_row(&self) -> Vec<Value> {
        vec![
            Value::from(self.activity_id),
            Value::String(self.timestamp.clone()),
            Value::String(self.activity_type.clone()),
            Value::from(self.distance_km),
            Value::from(self.duration_min),
            Value::from(self.avg_heart_rate),
            Value::from(self.calories),
        ]
    }

    pub fn from_row(row: &[Value]) -> Result<Self> {
        let activity_id = row
            .first()
            .and_then(cell_as_f64)
            .filter(|id| *id >= 0.0)
            .map(|id| id as u64)
            .ok_or_else(|| {
                TwinError::invalid_response(format!("Activity row has no valid id: {:?}", row.first()))
            })?;

        Ok(Self {
            activity_id,
            timestamp: cell_as_string(row.get(1)).unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            activity_type: cell_as_string(row.get(2)).unwrap_or_else(|| "unknown".to_string()),
            distance_km: row.get(3).and_then(cell_as_f64).unwrap_or(0.0),
            duration_min: row.get(4).and_then(cell_as_f64).unwrap_or(0.0),
            avg_heart_rate: row.get(5).and_then(cell_as_f64).map(|v| v.round() as i64).unwrap_or(0),
            calories: row.get(6).and_then(cell_as_f64).map(|v| v.round() as i64).unwrap_or(0),
        })
    }

    pub fn is_running(&self) -> bool {
        self.activity_type.contains("running")
    }
}

fn cell_as_f64(cell: &Value) -> Option<f64> {
    match cell {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse().ok(),
        _ => None,
    }
}

fn cell_as_string(cell: Option<&Value>) -> Option<String> {
    match cell? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
