//! A metric that may be unavailable
//!
//! Missing, null or malformed source fields never drop out of a record;
//! they become [`Kpi::NotAvailable`], written everywhere as `"N/D"`.

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Marker written in place of a missing value
pub const NOT_AVAILABLE: &str = "N/D";

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Kpi<T> {
    Value(T),
    #[default]
    NotAvailable,
}

impl<T> Kpi<T> {
    pub fn as_option(&self) -> Option<&T> {
        match self {
            Kpi::Value(v) => Some(v),
            Kpi::NotAvailable => None,
        }
    }
}

impl<T> From<Option<T>> for Kpi<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Kpi::NotAvailable, Kpi::Value)
    }
}

impl<T: Serialize> Kpi<T> {
    /// Spreadsheet cell for this metric
    pub fn to_cell(&self) -> Value {
        match self {
            Kpi::Value(v) => serde_json::to_value(v)
                .unwrap_or_else(|_| Value::String(NOT_AVAILABLE.to_string())),
            Kpi::NotAvailable => Value::String(NOT_AVAILABLE.to_string()),
        }
    }
}

impl<T: DeserializeOwned + FromStr> Kpi<T> {
    /// Parse a spreadsheet cell; blanks and the marker read as not available
    pub fn from_cell(cell: Option<&Value>) -> Self {
        match cell {
            None | Some(Value::Null) => Kpi::NotAvailable,
            Some(Value::String(s)) => {
                let s = s.trim();
                if s.is_empty() || s == NOT_AVAILABLE {
                    Kpi::NotAvailable
                } else {
                    s.parse().ok().into()
                }
            }
            Some(other) => serde_json::from_value(other.clone()).ok().into(),
        }
    }
}

impl<T: fmt::Display> fmt::Display for Kpi<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kpi::Value(v) => v.fmt(f),
            Kpi::NotAvailable => f.pad(NOT_AVAILABLE),
        }
    }
}

impl<T: Serialize> Serialize for Kpi<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Kpi::Value(v) => v.serialize(serializer),
            Kpi::NotAvailable => serializer.serialize_str(NOT_AVAILABLE),
        }
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Kpi<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        match raw {
            Value::Null => Ok(Kpi::NotAvailable),
            Value::String(ref s) if s == NOT_AVAILABLE => Ok(Kpi::NotAvailable),
            other => serde_json::from_value(other)
                .map(Kpi::Value)
                .map_err(D::Error::custom),
        }
    }
}
