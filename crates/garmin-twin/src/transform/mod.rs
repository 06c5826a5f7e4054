//! Raw payload -> KPI record mapping
//!
//! Everything here is pure: no I/O, no clock. The payloads are whatever the
//! Connect API returned, so every lookup goes through `Value::get` and a
//! missing or oddly typed field only affects that one field.

use chrono::NaiveDate;
use serde_json::Value;

use crate::models::{ActivityRecord, DailyKpiRecord, Kpi, NOT_AVAILABLE};

/// Sleep fields of one night, before body battery is merged in
#[derive(Debug, Clone, PartialEq)]
pub struct SleepKpis {
    pub date: NaiveDate,
    pub sleep_score: Kpi<i64>,
    pub sleep_quality_label: Kpi<String>,
    pub total_sleep_hours: Kpi<f64>,
}

/// Round to two decimals
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Integer from a JSON integer or float; anything else is unusable
fn value_to_i64(value: &Value) -> Option<i64> {
    if let Some(int) = value.as_i64() {
        return Some(int);
    }
    value.as_f64().map(|float| float.round() as i64)
}

fn non_empty_str(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Map the daily sleep payload. The interesting object is usually wrapped
/// in `dailySleepDTO` but older responses have it at the top level.
pub fn transform_sleep(doc: &Value, date: NaiveDate) -> SleepKpis {
    let dto = doc.get("dailySleepDTO").unwrap_or(doc);

    let sleep_score = dto
        .get("sleepScores")
        .and_then(|v| v.get("overall"))
        .and_then(|v| v.get("value"))
        .and_then(value_to_i64);

    let sleep_quality_label = dto.get("sleepScoreFeedback").and_then(non_empty_str);

    let total_sleep_hours = dto
        .get("sleepTimeSeconds")
        .and_then(|v| v.as_f64())
        .map(|seconds| round2(seconds / 3600.0));

    SleepKpis {
        date,
        sleep_score: sleep_score.into(),
        sleep_quality_label: sleep_quality_label.into(),
        total_sleep_hours: total_sleep_hours.into(),
    }
}

/// Current body battery: the last non-null sample of the first report.
///
/// Samples look like `[timestamp, level]`; extra trailing elements (some
/// firmware adds a status column) are ignored.
pub fn transform_body_battery(doc: &Value) -> Kpi<i64> {
    let first = match doc {
        Value::Array(reports) => reports.first(),
        Value::Object(_) => Some(doc),
        _ => None,
    };

    first
        .and_then(|report| report.get("bodyBatteryValuesArray"))
        .and_then(|v| v.as_array())
        .and_then(|samples| {
            samples
                .iter()
                .filter_map(|sample| sample.get(1).and_then(value_to_i64))
                .last()
        })
        .into()
}

/// Map the activity list, preserving source order (newest first)
pub fn transform_activities(doc: &Value) -> Vec<ActivityRecord> {
    doc.as_array()
        .map(|list| list.iter().filter(|a| a.is_object()).map(transform_activity).collect())
        .unwrap_or_default()
}

fn transform_activity(raw: &Value) -> ActivityRecord {
    let number = |key: &str| raw.get(key).and_then(|v| v.as_f64());

    ActivityRecord {
        activity_id: raw.get("activityId").and_then(|v| v.as_u64()).unwrap_or(0),
        timestamp: raw
            .get("startTimeLocal")
            .and_then(non_empty_str)
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        activity_type: raw
            .get("activityType")
            .and_then(|t| t.get("typeKey"))
            .and_then(non_empty_str)
            .unwrap_or_else(|| "unknown".to_string()),
        distance_km: number("distance").map(|m| round2(m / 1000.0)).unwrap_or(0.0),
        duration_min: number("duration").map(|s| round2(s / 60.0)).unwrap_or(0.0),
        avg_heart_rate: raw.get("averageHR").and_then(value_to_i64).unwrap_or(0),
        calories: raw.get("calories").and_then(value_to_i64).unwrap_or(0),
    }
}

/// Merge the sleep fields and the body battery level into the day's record
pub fn build_daily_record(sleep: SleepKpis, body_battery_level: Kpi<i64>) -> DailyKpiRecord {
    DailyKpiRecord {
        date: sleep.date,
        sleep_score: sleep.sleep_score,
        sleep_quality_label: sleep.sleep_quality_label,
        total_sleep_hours: sleep.total_sleep_hours,
        body_battery_level,
    }
}
