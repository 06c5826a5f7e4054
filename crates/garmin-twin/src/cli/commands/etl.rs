//! Extract, transform and load commands

use tracing::info;

use super::{connect_workbook, staging_area, today};
use crate::config::{AppConfig, Secrets};
use crate::error::Result;
use crate::models::{ActivityRecord, DailyKpiRecord};
use crate::pipeline;
use crate::sink::SchemaMigration;
use crate::source::GarminSource;

/// Pull today's raw documents from Garmin Connect into the staging area
pub async fn extract(config: &AppConfig) -> Result<()> {
    let date = today();
    println!("--- Extract for {} ---", date);

    let source = GarminSource::login(&config.source).await?;
    info!("Garmin Connect session ready");

    let staging = staging_area(config);
    pipeline::extract(&source, &staging, date).await?;

    println!("Staged raw data in {}", staging.dir().display());
    Ok(())
}

/// Normalize today's staged documents and print the resulting KPIs
pub fn transform(config: &AppConfig) -> Result<()> {
    let date = today();
    println!("--- Transform for {} ---", date);

    let output = pipeline::transform(&staging_area(config), date)?;
    print_daily(&output.daily);
    print_activities(&output.activities);
    Ok(())
}

/// Write today's KPIs to the spreadsheet
pub async fn load(config: &AppConfig) -> Result<()> {
    let date = today();
    println!("--- Load for {} ---", date);

    let workbook = connect_workbook(config, &Secrets::from_env()).await?;
    let report = pipeline::load(&staging_area(config), &workbook, date).await?;

    if let Some(SchemaMigration::Migrated { from }) = &report.migration {
        println!("Renamed worksheet '{}' to 'Sonno'", from);
    }
    match &report.sleep {
        Ok(()) => println!("Sonno:    1 row appended"),
        Err(e) => println!("Sonno:    FAILED ({})", e),
    }
    match &report.activities {
        Ok(count) => println!("Attivita: {} rows written", count),
        Err(e) => println!("Attivita: FAILED ({})", e),
    }

    report.into_result()
}

fn print_daily(record: &DailyKpiRecord) {
    println!("{}", "-".repeat(40));
    println!("{:<18} {}", "Date", record.date);
    println!("{:<18} {}", "Sleep score", record.sleep_score);
    println!("{:<18} {}", "Sleep quality", record.sleep_quality_label);
    println!("{:<18} {}", "Total hours", record.total_sleep_hours);
    println!("{:<18} {}", "Body battery", record.body_battery_level);
    println!("{}", "-".repeat(40));
}

fn print_activities(activities: &[ActivityRecord]) {
    if activities.is_empty() {
        println!("No activities.");
        return;
    }

    println!(
        "{:<12} {:<20} {:<18} {:>9} {:>9} {:>5} {:>6}",
        "ID", "Start", "Type", "Km", "Min", "HR", "Kcal"
    );
    for a in activities {
        println!(
            "{:<12} {:<20} {:<18} {:>9.2} {:>9.2} {:>5} {:>6}",
            a.activity_id,
            a.timestamp,
            a.activity_type,
            a.distance_km,
            a.duration_min,
            a.avg_heart_rate,
            a.calories
        );
    }
}
