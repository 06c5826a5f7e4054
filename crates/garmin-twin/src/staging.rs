//! Dated JSON artifacts on local disk
//!
//! Each stage hands its output to the next one through a file named
//! `{category}_{YYYY-MM-DD}.json`, so stages can run at different times and
//! the transform can be replayed without calling the source again.
//!
//! ```text
//! dati_grezzi/
//! ├── sleep_2025-12-04.json          # raw extracts
//! ├── body_battery_2025-12-04.json
//! ├── activities_2025-12-04.json
//! ├── daily_kpi_2025-12-04.json      # transform output
//! └── activity_kpi_2025-12-04.json
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Result, TwinError};

/// Kinds of staged documents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Sleep,
    BodyBattery,
    Activities,
    /// Normalized daily record
    DailyKpi,
    /// Normalized activity list
    ActivityKpi,
}

impl Category {
    pub fn name(&self) -> &'static str {
        match self {
            Category::Sleep => "sleep",
            Category::BodyBattery => "body_battery",
            Category::Activities => "activities",
            Category::DailyKpi => "daily_kpi",
            Category::ActivityKpi => "activity_kpi",
        }
    }

    pub fn file_name(&self, date: NaiveDate) -> String {
        format!("{}_{}.json", self.name(), date.format("%Y-%m-%d"))
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Owner of the staging directory
#[derive(Debug, Clone)]
pub struct StagingArea {
    dir: PathBuf,
}

impl StagingArea {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, category: Category, date: NaiveDate) -> PathBuf {
        self.dir.join(category.file_name(date))
    }

    pub fn exists(&self, category: Category, date: NaiveDate) -> bool {
        self.path_for(category, date).is_file()
    }

    /// Write (or overwrite) the artifact for `(category, date)`
    pub fn write<T: Serialize + ?Sized>(
        &self,
        category: Category,
        date: NaiveDate,
        document: &T,
    ) -> Result<PathBuf> {
        if crate::config::ensure_dir(&self.dir)? {
            info!("Created staging directory {}", self.dir.display());
        }

        let path = self.path_for(category, date);
        let json = serde_json::to_string_pretty(document)?;

        // write-then-rename so a reader never sees half a document
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)?;

        info!("Staged {} -> {}", category, path.display());
        Ok(path)
    }

    /// Read the artifact back; `Ok(None)` means it was never written
    pub fn read<T: DeserializeOwned>(&self, category: Category, date: NaiveDate) -> Result<Option<T>> {
        let path = self.path_for(category, date);
        if !path.is_file() {
            debug!("No staged {} at {}", category, path.display());
            return Ok(None);
        }

        let json = fs::read_to_string(&path)?;
        serde_json::from_str(&json).map(Some).map_err(|e| {
            TwinError::invalid_response(format!("Corrupt staged file {}: {}", path.display(), e))
        })
    }

    /// Like [`read`](Self::read), but absence is a missing-input error
    pub fn require<T: DeserializeOwned>(&self, category: Category, date: NaiveDate) -> Result<T> {
        self.read(category, date)?
            .ok_or_else(|| TwinError::missing_input(category.name(), date))
    }
}
