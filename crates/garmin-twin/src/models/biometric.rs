//! Manually entered body-composition measurements (smart scale readout)

use chrono::NaiveDate;
use clap::Args;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, TwinError};

/// The twelve measures read off the scale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Args)]
pub struct BiometricMeasures {
    /// Body weight (kg)
    #[arg(long)]
    pub weight_kg: f64,
    #[arg(long)]
    pub bmi: f64,
    /// Body fat (%)
    #[arg(long)]
    pub body_fat_pct: f64,
    /// Muscle mass (kg)
    #[arg(long)]
    pub muscle_mass_kg: f64,
    /// Body water (%)
    #[arg(long)]
    pub body_water_pct: f64,
    /// Visceral fat index
    #[arg(long)]
    pub visceral_fat: f64,
    /// Bone mass (kg)
    #[arg(long)]
    pub bone_mass_kg: f64,
    /// Basal metabolism (kcal)
    #[arg(long)]
    pub basal_metabolism_kcal: f64,
    /// Protein (%)
    #[arg(long)]
    pub protein_pct: f64,
    /// Metabolic age (years)
    #[arg(long)]
    pub metabolic_age: f64,
    /// Subcutaneous fat (%)
    #[arg(long)]
    pub subcutaneous_fat_pct: f64,
    /// Lean body mass (kg)
    #[arg(long)]
    pub lean_mass_kg: f64,
}

impl BiometricMeasures {
    fn values(&self) -> [f64; 12] {
        [
            self.weight_kg,
            self.bmi,
            self.body_fat_pct,
            self.muscle_mass_kg,
            self.body_water_pct,
            self.visceral_fat,
            self.bone_mass_kg,
            self.basal_metabolism_kcal,
            self.protein_pct,
            self.metabolic_age,
            self.subcutaneous_fat_pct,
            self.lean_mass_kg,
        ]
    }

    /// Reject readings a scale cannot produce
    pub fn validate(&self) -> Result<()> {
        if let Some(bad) = self.values().iter().find(|v| !v.is_finite() || **v < 0.0) {
            return Err(TwinError::invalid_param(format!(
                "Measurements must be non-negative numbers, got {}",
                bad
            )));
        }
        if self.weight_kg == 0.0 {
            return Err(TwinError::invalid_param("Weight cannot be zero"));
        }
        Ok(())
    }
}

/// One row of the `Bilancia` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiometricEntry {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub measures: BiometricMeasures,
}

impl BiometricEntry {
    pub fn new(date: NaiveDate, measures: BiometricMeasures) -> Self {
        Self { date, measures }
    }

    pub fn to_row(&self) -> Vec<Value> {
        std::iter::once(Value::String(self.date.format("%Y-%m-%d").to_string()))
            .chain(self.measures.values().into_iter().map(Value::from))
            .collect()
    }
}
