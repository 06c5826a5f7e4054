//! Wearable data source
//!
//! The extract stage only needs three raw documents per day; everything
//! about how they are obtained stays behind [`WellnessSource`].

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use tokio::sync::OnceCell;

use crate::client::Session;
use crate::config::SourceConfig;
use crate::error::{Result, TwinError};

/// Raw daily telemetry, returned verbatim as the source produced it
#[async_trait]
pub trait WellnessSource: Send + Sync {
    async fn get_sleep(&self, date: NaiveDate) -> Result<Value>;
    async fn get_body_battery(&self, date: NaiveDate) -> Result<Value>;
    async fn get_activities(&self, date: NaiveDate) -> Result<Value>;
}

/// Garmin Connect implementation of [`WellnessSource`]
pub struct GarminSource {
    session: Session,
    activity_window: u32,
    display_name: OnceCell<String>,
}

impl GarminSource {
    /// Authenticate and build a source for the configured account
    pub async fn login(config: &SourceConfig) -> Result<Self> {
        let session = Session::login(config).await?;
        Ok(Self::with_session(session, config.activity_window))
    }

    pub fn with_session(session: Session, activity_window: u32) -> Self {
        Self {
            session,
            activity_window,
            display_name: OnceCell::new(),
        }
    }

    /// The sleep endpoint is keyed by display name, fetched once per run
    async fn display_name(&self) -> Result<&str> {
        let name = self
            .display_name
            .get_or_try_init(|| async {
                let profile: Value = self
                    .session
                    .client
                    .get_json(&self.session.token, "/userprofile-service/socialProfile")
                    .await?;
                profile
                    .get("displayName")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string())
                    .ok_or_else(|| TwinError::invalid_response("Could not get display name"))
            })
            .await?;
        Ok(name.as_str())
    }

    async fn get(&self, path: &str) -> Result<Value> {
        self.session.client.get_json(&self.session.token, path).await
    }
}

#[async_trait]
impl WellnessSource for GarminSource {
    async fn get_sleep(&self, date: NaiveDate) -> Result<Value> {
        let display_name = self.display_name().await?;
        self.get(&format!(
            "/wellness-service/wellness/dailySleepData/{}?date={}&nonSleepBufferMinutes=60",
            display_name, date
        ))
        .await
    }

    async fn get_body_battery(&self, date: NaiveDate) -> Result<Value> {
        self.get(&format!(
            "/wellness-service/wellness/bodyBattery/reports/daily?startDate={}&endDate={}",
            date, date
        ))
        .await
    }

    /// Most recent activities, newest first. The window is count-based so a
    /// rest day still refreshes the table with the latest workouts.
    async fn get_activities(&self, _date: NaiveDate) -> Result<Value> {
        self.get(&format!(
            "/activitylist-service/activities/search/activities?start=0&limit={}",
            self.activity_window
        ))
        .await
    }
}
