//! Daily sleep and recovery KPIs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::kpi::Kpi;
use crate::error::{Result, TwinError};

/// One row of the `Sonno` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyKpiRecord {
    pub date: NaiveDate,
    pub sleep_score: Kpi<i64>,
    pub sleep_quality_label: Kpi<String>,
    pub total_sleep_hours: Kpi<f64>,
    pub body_battery_level: Kpi<i64>,
}

impl DailyKpiRecord {
    /// Sheet row in column order `Date, SleepScore, SleepQualityLabel, TotalHours, BodyBattery`
    pub fn to_row(&self) -> Vec<Value> {
        vec![
            Value::String(self.date.format("%Y-%m-%d").to_string()),
            self.sleep_score.to_cell(),
            self.sleep_quality_label.to_cell(),
            self.total_sleep_hours.to_cell(),
            self.body_battery_level.to_cell(),
        ]
    }

    /// Parse a row read back from the sheet. Trailing blank cells may be absent.
    pub fn from_row(row: &[Value]) -> Result<Self> {
        let date = row
            .first()
            .and_then(|v| v.as_str())
            .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
            .ok_or_else(|| {
                TwinError::invalid_response(format!("Sleep row has no valid date: {:?}", row.first()))
            })?;

        Ok(Self {
            date,
            sleep_score: Kpi::from_cell(row.get(1)),
            sleep_quality_label: Kpi::from_cell(row.get(2)),
            total_sleep_hours: Kpi::from_cell(row.get(3)),
            body_battery_level: Kpi::from_cell(row.get(4)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> DailyKpiRecord {
        DailyKpiRecord {
            date: NaiveDate::from_ymd_opt(2025, 12, 4).unwrap(),
            sleep_score: Kpi::Value(78),
            sleep_quality_label: Kpi::Value("GOOD".to_string()),
            total_sleep_hours: Kpi::Value(7.5),
            body_battery_level: Kpi::NotAvailable,
        }
    }

    #[test]
    fn test_to_row_column_order() {
        assert_eq!(
            record().to_row(),
            vec![json!("2025-12-04"), json!(78), json!("GOOD"), json!(7.5), json!("N/D")]
        );
    }

    #[test]
    fn test_from_row_with_truncated_cells() {
        let parsed = DailyKpiRecord::from_row(&[json!("2025-12-04"), json!(78), json!("GOOD")]).unwrap();
        assert_eq!(parsed.sleep_score, Kpi::Value(78));
        assert_eq!(parsed.total_sleep_hours, Kpi::NotAvailable);
        assert_eq!(parsed.body_battery_level, Kpi::NotAvailable);
    }

    #[test]
    fn test_from_row_rejects_header() {
        assert!(DailyKpiRecord::from_row(&[json!("Date"), json!("SleepScore")]).is_err());
    }

    #[test]
    fn test_json_shape_uses_sentinel() {
        let value = serde_json::to_value(record()).unwrap();
        assert_eq!(value["body_battery_level"], "N/D");
        assert_eq!(value["date"], "2025-12-04");
        let back: DailyKpiRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record());
    }
}
