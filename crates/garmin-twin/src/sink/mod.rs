//! Spreadsheet sink
//!
//! Three worksheets in one spreadsheet make up the system of record:
//!
//! | Table      | Written by        | Policy           |
//! |------------|-------------------|------------------|
//! | `Sonno`    | load stage        | append-only      |
//! | `Attivita` | load stage        | replaced on load |
//! | `Bilancia` | `weigh-in`        | append-only      |
//!
//! The [`Workbook`] trait is the only thing the pipeline knows about the
//! store; [`sheets::GoogleSheetsClient`] is the production implementation.

pub mod service_account;
pub mod sheets;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::error::{Result, TwinError};
use crate::models::{ActivityRecord, BiometricEntry, DailyKpiRecord};

pub use sheets::GoogleSheetsClient;

pub const SLEEP_TABLE: &str = "Sonno";
pub const ACTIVITY_TABLE: &str = "Attivita";
pub const BIOMETRIC_TABLE: &str = "Bilancia";

pub const SLEEP_HEADER: [&str; 5] = [
    "Date",
    "SleepScore",
    "SleepQualityLabel",
    "TotalHours",
    "BodyBattery",
];

pub const ACTIVITY_HEADER: [&str; 7] = [
    "ActivityId",
    "Timestamp",
    "Type",
    "DistanceKm",
    "DurationMin",
    "AvgHeartRate",
    "Calories",
];

pub const BIOMETRIC_HEADER: [&str; 13] = [
    "Date",
    "WeightKg",
    "Bmi",
    "BodyFatPct",
    "MuscleMassKg",
    "BodyWaterPct",
    "VisceralFat",
    "BoneMassKg",
    "BasalMetabolismKcal",
    "ProteinPct",
    "MetabolicAge",
    "SubcutaneousFatPct",
    "LeanMassKg",
];

/// Named-worksheet store
#[async_trait]
pub trait Workbook: Send + Sync {
    /// Worksheet titles in workbook order
    async fn worksheet_titles(&self) -> Result<Vec<String>>;
    async fn add_worksheet(&self, title: &str, columns: usize) -> Result<()>;
    async fn rename_worksheet(&self, from: &str, to: &str) -> Result<()>;
    /// All non-empty rows, header included
    async fn read_rows(&self, title: &str) -> Result<Vec<Vec<Value>>>;
    /// Append rows after the last non-empty row, in one request
    async fn append_rows(&self, title: &str, rows: &[Vec<Value>]) -> Result<()>;
    /// Remove every value, keeping the worksheet
    async fn clear(&self, title: &str) -> Result<()>;
}

pub fn header_row(columns: &[&str]) -> Vec<Value> {
    columns.iter().map(|c| Value::String(c.to_string())).collect()
}

/// Outcome of the `Sonno` schema migration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaMigration {
    AlreadyCorrect,
    /// The first worksheet was renamed to `Sonno`
    Migrated { from: String },
}

/// Make sure `Sonno` exists, renaming the workbook's first unclaimed
/// worksheet if not. `Attivita` and `Bilancia` are never taken over.
///
/// Idempotent: once renamed, later runs report `AlreadyCorrect`.
pub async fn migrate_sleep_table(workbook: &dyn Workbook) -> Result<SchemaMigration> {
    let titles = workbook.worksheet_titles().await?;
    if titles.iter().any(|t| t == SLEEP_TABLE) {
        return Ok(SchemaMigration::AlreadyCorrect);
    }

    let first = titles
        .into_iter()
        .find(|t| t != ACTIVITY_TABLE && t != BIOMETRIC_TABLE)
        .ok_or_else(|| {
            TwinError::Schema(format!(
                "Spreadsheet has no free worksheet to use as '{}'",
                SLEEP_TABLE
            ))
        })?;

    warn!("Worksheet '{}' not found, renaming '{}'", SLEEP_TABLE, first);
    workbook.rename_worksheet(&first, SLEEP_TABLE).await?;
    Ok(SchemaMigration::Migrated { from: first })
}

/// Result of one load; the two table writes succeed or fail independently
#[derive(Debug)]
pub struct LoadReport {
    /// `None` when the migration itself failed (the error is in `sleep`)
    pub migration: Option<SchemaMigration>,
    pub sleep: Result<()>,
    /// Number of activity rows written
    pub activities: Result<usize>,
}

impl LoadReport {
    pub fn is_success(&self) -> bool {
        self.sleep.is_ok() && self.activities.is_ok()
    }

    /// First failure, sleep table before activities
    pub fn first_error(&self) -> Option<&TwinError> {
        self.sleep
            .as_ref()
            .err()
            .or_else(|| self.activities.as_ref().err())
    }

    /// Collapse into the first failure, if any
    pub fn into_result(self) -> Result<()> {
        self.sleep?;
        self.activities.map(|_| ())
    }
}

/// Writes transformed records to the workbook
pub struct Loader<'a> {
    workbook: &'a dyn Workbook,
}

impl<'a> Loader<'a> {
    pub fn new(workbook: &'a dyn Workbook) -> Self {
        Self { workbook }
    }

    pub async fn load(&self, kpi: &DailyKpiRecord, activities: &[ActivityRecord]) -> LoadReport {
        let (migration, sleep) = match migrate_sleep_table(self.workbook).await {
            Ok(migration) => {
                if let SchemaMigration::Migrated { from } = &migration {
                    info!("Renamed worksheet '{}' to '{}'", from, SLEEP_TABLE);
                }
                (Some(migration), self.append_sleep(kpi).await)
            }
            Err(e) => (None, Err(e)),
        };

        match &sleep {
            Ok(()) => info!("Appended {} row for {}", SLEEP_TABLE, kpi.date),
            Err(e) => error!("Failed to write {}: {}", SLEEP_TABLE, e),
        }

        let activities = self.replace_activities(activities).await;
        match &activities {
            Ok(count) => info!("Rewrote {} with {} activities", ACTIVITY_TABLE, count),
            Err(e @ TwinError::TableMissing(_)) => {
                error!("{}; activities not loaded for this run", e)
            }
            Err(e) => error!("Failed to write {}: {}", ACTIVITY_TABLE, e),
        }

        LoadReport {
            migration,
            sleep,
            activities,
        }
    }

    async fn append_sleep(&self, kpi: &DailyKpiRecord) -> Result<()> {
        let mut rows = Vec::with_capacity(2);
        if self.workbook.read_rows(SLEEP_TABLE).await?.is_empty() {
            debug!("{} is empty, writing header", SLEEP_TABLE);
            rows.push(header_row(&SLEEP_HEADER));
        }
        rows.push(kpi.to_row());
        self.workbook.append_rows(SLEEP_TABLE, &rows).await
    }

    /// Clear `Attivita` and write header plus all rows in a single append
    async fn replace_activities(&self, activities: &[ActivityRecord]) -> Result<usize> {
        let titles = self.workbook.worksheet_titles().await?;
        if !titles.iter().any(|t| t == ACTIVITY_TABLE) {
            return Err(TwinError::TableMissing(ACTIVITY_TABLE.to_string()));
        }

        self.workbook.clear(ACTIVITY_TABLE).await?;

        let rows: Vec<Vec<Value>> = std::iter::once(header_row(&ACTIVITY_HEADER))
            .chain(activities.iter().map(ActivityRecord::to_row))
            .collect();
        self.workbook.append_rows(ACTIVITY_TABLE, &rows).await?;
        Ok(activities.len())
    }

    /// Append a scale reading to `Bilancia`, creating the table on first use
    pub async fn append_biometric(&self, entry: &BiometricEntry) -> Result<()> {
        let titles = self.workbook.worksheet_titles().await?;
        let mut rows = Vec::with_capacity(2);
        if !titles.iter().any(|t| t == BIOMETRIC_TABLE) {
            info!("Creating worksheet '{}'", BIOMETRIC_TABLE);
            self.workbook
                .add_worksheet(BIOMETRIC_TABLE, BIOMETRIC_HEADER.len())
                .await?;
            rows.push(header_row(&BIOMETRIC_HEADER));
        }
        rows.push(entry.to_row());
        self.workbook.append_rows(BIOMETRIC_TABLE, &rows).await
    }
}

/// Data rows of a table (header dropped); missing table is `TableMissing`
async fn data_rows(workbook: &dyn Workbook, table: &str) -> Result<Vec<Vec<Value>>> {
    let titles = workbook.worksheet_titles().await?;
    if !titles.iter().any(|t| t == table) {
        return Err(TwinError::TableMissing(table.to_string()));
    }
    let mut rows = workbook.read_rows(table).await?;
    if !rows.is_empty() {
        rows.remove(0);
    }
    Ok(rows)
}

/// All parseable `Sonno` rows in insertion (chronological) order
pub async fn read_daily_records(workbook: &dyn Workbook) -> Result<Vec<DailyKpiRecord>> {
    let rows = data_rows(workbook, SLEEP_TABLE).await?;
    Ok(rows
        .iter()
        .filter_map(|row| match DailyKpiRecord::from_row(row) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!("Skipping {} row: {}", SLEEP_TABLE, e);
                None
            }
        })
        .collect())
}

/// All parseable `Attivita` rows in table order
pub async fn read_activities(workbook: &dyn Workbook) -> Result<Vec<ActivityRecord>> {
    let rows = data_rows(workbook, ACTIVITY_TABLE).await?;
    Ok(rows
        .iter()
        .filter_map(|row| match ActivityRecord::from_row(row) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!("Skipping {} row: {}", ACTIVITY_TABLE, e);
                None
            }
        })
        .collect())
}

/// Activity with the latest timestamp; unknown timestamps sort first
pub fn most_recent_activity(activities: &[ActivityRecord]) -> Option<&ActivityRecord> {
    activities
        .iter()
        .filter(|a| a.timestamp != crate::models::NOT_AVAILABLE)
        .max_by(|a, b| a.timestamp.cmp(&b.timestamp))
        .or_else(|| activities.first())
}
