//! Manual scale entry and the read-only snapshot

use super::{connect_workbook, today};
use crate::config::{AppConfig, Secrets};
use crate::error::Result;
use crate::models::{BiometricEntry, BiometricMeasures};
use crate::pipeline::{self, Snapshot};

/// Append today's scale reading to `Bilancia`
pub async fn weigh_in(config: &AppConfig, measures: BiometricMeasures) -> Result<()> {
    let entry = BiometricEntry::new(today(), measures);
    entry.measures.validate()?;

    let workbook = connect_workbook(config, &Secrets::from_env()).await?;
    pipeline::weigh_in(&workbook, &entry).await?;

    println!("Weigh-in saved for {} ({} kg)", entry.date, entry.measures.weight_kg);
    Ok(())
}

/// Print the latest state of the sink
pub async fn snapshot(config: &AppConfig) -> Result<()> {
    let workbook = connect_workbook(config, &Secrets::from_env()).await?;
    let snap = pipeline::snapshot(&workbook).await?;
    print_snapshot(&snap);
    Ok(())
}

fn print_snapshot(snap: &Snapshot) {
    if snap.latest_day.is_none() && snap.latest_activity.is_none() {
        println!("Waiting for data: Sonno and Attivita are empty.");
        return;
    }

    if let Some(day) = &snap.latest_day {
        println!("Telemetry for {}", day.date);
        println!("{}", "-".repeat(40));
        println!("Sleep score:     {:>8}", day.sleep_score);
        println!("Total hours:     {:>8}", day.total_sleep_hours);
        println!("Body battery:    {:>8}", day.body_battery_level);
        println!("Sleep quality:   {:>8}", day.sleep_quality_label);
        println!();
    }

    if let Some(activity) = &snap.latest_activity {
        println!("Latest activity: {}", activity.activity_type.to_uppercase().replace('_', " "));
        println!("{}", "-".repeat(40));
        println!("Start:           {}", activity.timestamp);
        println!("Distance:        {:>8.2} km", activity.distance_km);
        println!("Duration:        {:>8.2} min", activity.duration_min);
        println!("Avg HR:          {:>8} bpm", activity.avg_heart_rate);
        println!("Calories:        {:>8} kcal", activity.calories);
        println!();
    }

    println!("Balance (0-100)");
    println!("{}", "-".repeat(40));
    println!("Sleep recovery:  {:>8.0}", snap.balance.recovery);
    println!("Energy:          {:>8.0}", snap.balance.energy);
    println!("Physical load:   {:>8.0}", snap.balance.load);

    if !snap.running_trend.is_empty() {
        println!();
        println!("Running distance trend");
        println!("{}", "-".repeat(40));
        for (timestamp, km) in &snap.running_trend {
            println!("{:<20} {:>6.2} km", timestamp, km);
        }
    }
}
