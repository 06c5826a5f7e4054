pub mod batch;
pub mod biometrics;
pub mod coach;
pub mod etl;

pub use batch::run;
pub use biometrics::{snapshot, weigh_in};
pub use coach::{coach, debrief};
pub use etl::{extract, load, transform};

use chrono::{Local, NaiveDate};

use crate::config::{AppConfig, Secrets};
use crate::error::Result;
use crate::sink::service_account::ServiceAccountKey;
use crate::sink::GoogleSheetsClient;
use crate::staging::StagingArea;

/// Stages always work on the local calendar day
fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn staging_area(config: &AppConfig) -> StagingArea {
    StagingArea::new(&config.staging.dir)
}

/// Authenticate against the configured spreadsheet
async fn connect_workbook(config: &AppConfig, secrets: &Secrets) -> Result<GoogleSheetsClient> {
    let spreadsheet_id = config.spreadsheet_id()?;
    let key_json = secrets.google_service_account(&config.sink.credentials_path)?;
    let key = ServiceAccountKey::from_json(&key_json)?;
    GoogleSheetsClient::connect(&config.sink.api_base, spreadsheet_id, &key).await
}
