//! Pipeline stages
//!
//! Each stage is a plain async function that receives its collaborators as
//! arguments. Stages talk to each other only through the staging area and
//! the workbook, so each one can run in its own process.

pub mod orchestrator;

use chrono::NaiveDate;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::config::InsightConfig;
use crate::error::{Result, TwinError};
use crate::insight::{debrief_prompt, morning_readiness_prompt, TextGenerator};
use crate::models::{ActivityRecord, BiometricEntry, DailyKpiRecord, Kpi};
use crate::notify::{compose_message, DeliveryStatus, PushChannel};
use crate::sink::{self, LoadReport, Loader, Workbook};
use crate::source::WellnessSource;
use crate::staging::{Category, StagingArea};
use crate::transform;

pub use orchestrator::{Orchestrator, ProcessRunner, RunOutcome, StageRunner, DEFAULT_STAGES};

/// Fetch the three raw documents for `date` and stage them verbatim
pub async fn extract(source: &dyn WellnessSource, staging: &StagingArea, date: NaiveDate) -> Result<()> {
    info!("Extracting sleep for {}", date);
    let sleep = source.get_sleep(date).await?;
    if sleep.is_null() {
        warn!("Source returned no sleep data for {}", date);
    }
    staging.write(Category::Sleep, date, &sleep)?;

    info!("Extracting body battery for {}", date);
    let body_battery = source.get_body_battery(date).await?;
    staging.write(Category::BodyBattery, date, &body_battery)?;

    info!("Extracting recent activities");
    let activities = source.get_activities(date).await?;
    staging.write(Category::Activities, date, &activities)?;

    Ok(())
}

/// Normalized output of the transform stage
#[derive(Debug, Clone, PartialEq)]
pub struct TransformOutput {
    pub daily: DailyKpiRecord,
    pub activities: Vec<ActivityRecord>,
}

/// Map the staged raw documents to KPI records and stage those too
pub fn transform(staging: &StagingArea, date: NaiveDate) -> Result<TransformOutput> {
    let sleep: Value = staging.require(Category::Sleep, date)?;

    let body_battery = match staging.read::<Value>(Category::BodyBattery, date)? {
        Some(doc) => transform::transform_body_battery(&doc),
        None => {
            warn!("No staged body battery for {}, level set to N/D", date);
            Kpi::NotAvailable
        }
    };

    let activities = match staging.read::<Value>(Category::Activities, date)? {
        Some(doc) => transform::transform_activities(&doc),
        None => {
            warn!("No staged activities for {}", date);
            Vec::new()
        }
    };

    let daily = transform::build_daily_record(transform::transform_sleep(&sleep, date), body_battery);

    staging.write(Category::DailyKpi, date, &daily)?;
    staging.write(Category::ActivityKpi, date, &activities)?;

    Ok(TransformOutput { daily, activities })
}

/// Write the staged KPI records to the workbook
pub async fn load(staging: &StagingArea, workbook: &dyn Workbook, date: NaiveDate) -> Result<LoadReport> {
    let daily: DailyKpiRecord = staging.require(Category::DailyKpi, date)?;
    let activities: Vec<ActivityRecord> = staging.require(Category::ActivityKpi, date)?;
    Ok(Loader::new(workbook).load(&daily, &activities).await)
}

/// Collaborators of the coaching stages
pub struct InsightDeps<'a> {
    pub workbook: &'a dyn Workbook,
    pub generator: &'a dyn TextGenerator,
    pub channel: &'a dyn PushChannel,
    pub chat_id: &'a str,
    pub insight: &'a InsightConfig,
    pub dashboard_url: &'a str,
}

/// What a coaching stage produced
#[derive(Debug)]
pub struct CoachOutcome {
    pub message: String,
    /// Delivery problems are reported here, never as a stage failure
    pub delivery: Result<DeliveryStatus>,
}

/// Morning readiness message from the latest `Sonno` row
pub async fn coach(deps: &InsightDeps<'_>) -> Result<CoachOutcome> {
    let latest = sink::read_daily_records(deps.workbook)
        .await?
        .pop()
        .ok_or_else(|| TwinError::missing_input(sink::SLEEP_TABLE, "any day"))?;

    info!("Generating readiness message for {}", latest.date);
    let prompt = morning_readiness_prompt(&latest, deps.insight);
    deliver(deps, &prompt).await
}

/// Post-workout debrief for the most recent activity
pub async fn debrief(deps: &InsightDeps<'_>) -> Result<CoachOutcome> {
    let activities = sink::read_activities(deps.workbook).await?;
    let latest = sink::most_recent_activity(&activities)
        .ok_or_else(|| TwinError::missing_input(sink::ACTIVITY_TABLE, "any day"))?;

    info!("Generating debrief for activity {}", latest.activity_id);
    let prompt = debrief_prompt(latest, deps.insight);
    deliver(deps, &prompt).await
}

async fn deliver(deps: &InsightDeps<'_>, prompt: &str) -> Result<CoachOutcome> {
    let text = deps.generator.generate(prompt).await?;
    let message = compose_message(&text, deps.dashboard_url);

    let delivery = deps.channel.send(deps.chat_id, &message).await;
    match &delivery {
        Ok(DeliveryStatus::Delivered) => info!("Push notification delivered"),
        Ok(DeliveryStatus::Rejected { status, body }) => {
            error!("Push notification rejected ({}): {}", status, body)
        }
        Err(e) => error!("Push notification failed: {}", e),
    }

    Ok(CoachOutcome { message, delivery })
}

/// Append a manual scale reading to `Bilancia`
pub async fn weigh_in(workbook: &dyn Workbook, entry: &BiometricEntry) -> Result<()> {
    entry.measures.validate()?;
    Loader::new(workbook).append_biometric(entry).await?;
    info!("Recorded weigh-in for {}", entry.date);
    Ok(())
}

/// Balance indicators on a 0-100 scale
#[derive(Debug, Clone, PartialEq)]
pub struct Balance {
    /// Sleep score, 0 when unknown
    pub recovery: f64,
    /// Body battery, 50 when unknown
    pub energy: f64,
    /// Average heart rate of the last workout as a share of 180 bpm
    pub load: f64,
}

impl Balance {
    pub fn compute(day: Option<&DailyKpiRecord>, activity: Option<&ActivityRecord>) -> Self {
        let recovery = day
            .and_then(|d| d.sleep_score.as_option().copied())
            .filter(|s| *s >= 0)
            .unwrap_or(0) as f64;
        let energy = day
            .and_then(|d| d.body_battery_level.as_option().copied())
            .filter(|b| *b > 0)
            .unwrap_or(50) as f64;
        let hr = activity.map(|a| a.avg_heart_rate.max(0)).unwrap_or(0) as f64;
        Self {
            recovery,
            energy,
            load: (hr * 100.0 / 180.0).min(100.0),
        }
    }
}

/// Read-only view of the latest state of the sink
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub latest_day: Option<DailyKpiRecord>,
    pub latest_activity: Option<ActivityRecord>,
    pub balance: Balance,
    /// `(timestamp, distance_km)` of running activities, oldest first
    pub running_trend: Vec<(String, f64)>,
}

pub async fn snapshot(workbook: &dyn Workbook) -> Result<Snapshot> {
    let latest_day = sink::read_daily_records(workbook).await?.pop();
    let activities = sink::read_activities(workbook).await?;
    let latest_activity = sink::most_recent_activity(&activities).cloned();

    let mut running: Vec<&ActivityRecord> = activities.iter().filter(|a| a.is_running()).collect();
    running.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

    Ok(Snapshot {
        balance: Balance::compute(latest_day.as_ref(), latest_activity.as_ref()),
        running_trend: running
            .into_iter()
            .map(|a| (a.timestamp.clone(), a.distance_km))
            .collect(),
        latest_day,
        latest_activity,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use crate::insight::testing::ScriptedGenerator;
    use crate::models::biometric::tests::sample_measures;
    use crate::notify::testing::RecordingChannel;
    use crate::sink::testing::MemoryWorkbook;
    use crate::sink::{ACTIVITY_TABLE, BIOMETRIC_TABLE, SLEEP_TABLE};
    use async_trait::async_trait;
    use serde_json::json;
    use tempfile::TempDir;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 12, 4).unwrap()
    }

    struct FixedSource {
        sleep: Value,
        fail_activities: bool,
    }

    #[async_trait]
    impl WellnessSource for FixedSource {
        async fn get_sleep(&self, _date: NaiveDate) -> Result<Value> {
            Ok(self.sleep.clone())
        }

        async fn get_body_battery(&self, _date: NaiveDate) -> Result<Value> {
            Ok(json!([{"bodyBatteryValuesArray": [[1, 70], [2, 66], [3, null]]}]))
        }

        async fn get_activities(&self, _date: NaiveDate) -> Result<Value> {
            if self.fail_activities {
                return Err(TwinError::RateLimited);
            }
            Ok(json!([{
                "activityId": 11,
                "startTimeLocal": "2025-12-03 18:00:00",
                "activityType": {"typeKey": "running"},
                "distance": 8000.0,
                "duration": 2700.0,
                "averageHR": 152.0,
                "calories": 560.0
            }]))
        }
    }

    fn scenario_a_sleep() -> Value {
        json!({
            "dailySleepDTO": {
                "sleepTimeSeconds": 27000,
                "sleepScores": {"overall": {"value": 78}},
                "sleepScoreFeedback": "GOOD"
            }
        })
    }

    #[tokio::test]
    async fn test_extract_transform_load_chain() {
        let temp = TempDir::new().unwrap();
        let staging = StagingArea::new(temp.path().join("dati_grezzi"));
        let source = FixedSource {
            sleep: scenario_a_sleep(),
            fail_activities: false,
        };

        extract(&source, &staging, date()).await.unwrap();
        assert!(staging.exists(Category::Sleep, date()));
        assert!(staging.exists(Category::BodyBattery, date()));
        assert!(staging.exists(Category::Activities, date()));

        let output = transform(&staging, date()).unwrap();
        assert_eq!(output.daily.sleep_score, Kpi::Value(78));
        assert_eq!(output.daily.sleep_quality_label, Kpi::Value("GOOD".to_string()));
        assert_eq!(output.daily.total_sleep_hours, Kpi::Value(7.5));
        assert_eq!(output.daily.body_battery_level, Kpi::Value(66));
        assert_eq!(output.activities[0].distance_km, 8.0);

        let workbook = MemoryWorkbook::with_sheets(&[SLEEP_TABLE, ACTIVITY_TABLE]);
        let report = load(&staging, &workbook, date()).await.unwrap();
        assert!(report.is_success());
        assert_eq!(workbook.rows(SLEEP_TABLE).len(), 2);
        assert_eq!(workbook.rows(ACTIVITY_TABLE).len(), 2);
    }

    #[tokio::test]
    async fn test_extract_fails_on_source_error() {
        let temp = TempDir::new().unwrap();
        let staging = StagingArea::new(temp.path());
        let source = FixedSource {
            sleep: scenario_a_sleep(),
            fail_activities: true,
        };
        let err = extract(&source, &staging, date()).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Transport);
    }

    #[test]
    fn test_transform_without_sleep_is_missing_input() {
        let temp = TempDir::new().unwrap();
        let staging = StagingArea::new(temp.path());
        let err = transform(&staging, date()).unwrap_err();
        assert_eq!(err.kind(), FailureKind::MissingInput);
        assert!(!staging.exists(Category::DailyKpi, date()));
    }

    #[test]
    fn test_transform_tolerates_missing_optional_extracts() {
        let temp = TempDir::new().unwrap();
        let staging = StagingArea::new(temp.path());
        staging.write(Category::Sleep, date(), &scenario_a_sleep()).unwrap();

        let output = transform(&staging, date()).unwrap();
        assert_eq!(output.daily.body_battery_level, Kpi::NotAvailable);
        assert!(output.activities.is_empty());

        let staged: DailyKpiRecord = staging.require(Category::DailyKpi, date()).unwrap();
        assert_eq!(staged, output.daily);
    }

    #[test]
    fn test_transform_replay_is_identical() {
        let temp = TempDir::new().unwrap();
        let staging = StagingArea::new(temp.path());
        staging.write(Category::Sleep, date(), &scenario_a_sleep()).unwrap();

        let first = transform(&staging, date()).unwrap();
        let first_file = std::fs::read(staging.path_for(Category::DailyKpi, date())).unwrap();
        let second = transform(&staging, date()).unwrap();
        let second_file = std::fs::read(staging.path_for(Category::DailyKpi, date())).unwrap();

        assert_eq!(first, second);
        assert_eq!(first_file, second_file);
    }

    #[tokio::test]
    async fn test_load_without_transform_is_missing_input() {
        let temp = TempDir::new().unwrap();
        let staging = StagingArea::new(temp.path());
        let workbook = MemoryWorkbook::with_sheets(&[SLEEP_TABLE, ACTIVITY_TABLE]);
        let err = load(&staging, &workbook, date()).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::MissingInput);
        assert!(workbook.rows(SLEEP_TABLE).is_empty());
    }

    async fn loaded_workbook() -> MemoryWorkbook {
        let workbook = MemoryWorkbook::with_sheets(&[SLEEP_TABLE, ACTIVITY_TABLE]);
        let daily = transform::build_daily_record(
            transform::transform_sleep(&scenario_a_sleep(), date()),
            Kpi::Value(64),
        );
        let activities = vec![
            ActivityRecord {
                activity_id: 2,
                timestamp: "2025-12-04 07:00:00".to_string(),
                activity_type: "running".to_string(),
                distance_km: 12.0,
                duration_min: 60.0,
                avg_heart_rate: 162,
                calories: 800,
            },
            ActivityRecord {
                activity_id: 1,
                timestamp: "2025-12-02 07:00:00".to_string(),
                activity_type: "running".to_string(),
                distance_km: 8.0,
                duration_min: 45.0,
                avg_heart_rate: 140,
                calories: 500,
            },
            ActivityRecord {
                activity_id: 3,
                timestamp: "2025-12-03 12:00:00".to_string(),
                activity_type: "strength_training".to_string(),
                distance_km: 0.0,
                duration_min: 40.0,
                avg_heart_rate: 110,
                calories: 250,
            },
        ];
        Loader::new(&workbook).load(&daily, &activities).await;
        workbook
    }

    #[tokio::test]
    async fn test_coach_generates_and_delivers() {
        let workbook = loaded_workbook().await;
        let generator = ScriptedGenerator::answering("Recovery is solid 💪 go for intervals.");
        let channel = RecordingChannel::delivering();
        let insight = InsightConfig::default();
        let deps = InsightDeps {
            workbook: &workbook,
            generator: &generator,
            channel: &channel,
            chat_id: "42",
            insight: &insight,
            dashboard_url: "http://localhost:8501/",
        };

        let outcome = coach(&deps).await.unwrap();
        assert!(outcome.message.starts_with("Recovery is solid"));
        assert!(outcome.message.ends_with("http://localhost:8501/"));
        assert_eq!(outcome.delivery.unwrap(), DeliveryStatus::Delivered);

        let prompts = generator.prompts.lock().unwrap();
        assert!(prompts[0].contains("Sleep score: 78 / 100"));
        assert!(prompts[0].contains("Body Battery: 64 / 100"));

        let sent = channel.sent.lock().unwrap();
        assert_eq!(sent[0].0, "42");
    }

    #[tokio::test]
    async fn test_coach_rejected_delivery_is_not_a_failure() {
        let workbook = loaded_workbook().await;
        let generator = ScriptedGenerator::answering("Rest day.");
        let channel = RecordingChannel::answering(Ok(DeliveryStatus::Rejected {
            status: 400,
            body: "chat not found".to_string(),
        }));
        let insight = InsightConfig::default();
        let deps = InsightDeps {
            workbook: &workbook,
            generator: &generator,
            channel: &channel,
            chat_id: "0",
            insight: &insight,
            dashboard_url: "http://localhost:8501/",
        };

        let outcome = coach(&deps).await.unwrap();
        assert!(matches!(outcome.delivery, Ok(DeliveryStatus::Rejected { status: 400, .. })));

        let channel = RecordingChannel::answering(Err("connection reset".to_string()));
        let deps = InsightDeps { channel: &channel, ..deps };
        let outcome = coach(&deps).await.unwrap();
        assert!(outcome.delivery.is_err());
    }

    #[tokio::test]
    async fn test_coach_on_empty_table_is_missing_input() {
        let workbook = MemoryWorkbook::with_sheets(&[SLEEP_TABLE, ACTIVITY_TABLE]);
        let generator = ScriptedGenerator::answering("unused");
        let channel = RecordingChannel::delivering();
        let insight = InsightConfig::default();
        let deps = InsightDeps {
            workbook: &workbook,
            generator: &generator,
            channel: &channel,
            chat_id: "42",
            insight: &insight,
            dashboard_url: "http://localhost:8501/",
        };

        let err = coach(&deps).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::MissingInput);
        assert!(generator.prompts.lock().unwrap().is_empty());
        assert!(channel.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_generation_failure_fails_the_stage() {
        let workbook = loaded_workbook().await;
        let generator = ScriptedGenerator::default();
        let channel = RecordingChannel::delivering();
        let insight = InsightConfig::default();
        let deps = InsightDeps {
            workbook: &workbook,
            generator: &generator,
            channel: &channel,
            chat_id: "42",
            insight: &insight,
            dashboard_url: "http://localhost:8501/",
        };

        let err = coach(&deps).await.unwrap_err();
        assert!(matches!(err, TwinError::Generation(_)));
        assert!(channel.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_debrief_uses_most_recent_activity() {
        let workbook = loaded_workbook().await;
        let generator = ScriptedGenerator::answering("Strong tempo run.");
        let channel = RecordingChannel::delivering();
        let insight = InsightConfig::default();
        let deps = InsightDeps {
            workbook: &workbook,
            generator: &generator,
            channel: &channel,
            chat_id: "42",
            insight: &insight,
            dashboard_url: "http://localhost:8501/",
        };

        debrief(&deps).await.unwrap();
        let prompts = generator.prompts.lock().unwrap();
        assert!(prompts[0].contains("Distance: 12 km"));
        assert!(prompts[0].contains("Average heart rate: 162 bpm"));
    }

    #[tokio::test]
    async fn test_weigh_in() {
        let workbook = MemoryWorkbook::with_sheets(&[SLEEP_TABLE]);
        let entry = BiometricEntry::new(date(), sample_measures());
        weigh_in(&workbook, &entry).await.unwrap();
        assert_eq!(workbook.rows(BIOMETRIC_TABLE).len(), 2);

        let mut bad = sample_measures();
        bad.weight_kg = -70.0;
        let err = weigh_in(&workbook, &BiometricEntry::new(date(), bad)).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Config);
        assert_eq!(workbook.rows(BIOMETRIC_TABLE).len(), 2);
    }

    #[tokio::test]
    async fn test_snapshot() {
        let workbook = loaded_workbook().await;
        let snap = snapshot(&workbook).await.unwrap();

        assert_eq!(snap.latest_day.as_ref().unwrap().sleep_score, Kpi::Value(78));
        assert_eq!(snap.latest_activity.as_ref().unwrap().activity_id, 2);
        assert_eq!(snap.balance.recovery, 78.0);
        assert_eq!(snap.balance.energy, 64.0);
        assert_eq!(snap.balance.load, 90.0);
        assert_eq!(
            snap.running_trend,
            vec![
                ("2025-12-02 07:00:00".to_string(), 8.0),
                ("2025-12-04 07:00:00".to_string(), 12.0),
            ]
        );
    }

    #[test]
    fn test_balance_defaults() {
        let balance = Balance::compute(None, None);
        assert_eq!(balance, Balance { recovery: 0.0, energy: 50.0, load: 0.0 });

        let intense = ActivityRecord {
            activity_id: 1,
            timestamp: "2025-12-04 07:00:00".to_string(),
            activity_type: "running".to_string(),
            distance_km: 5.0,
            duration_min: 20.0,
            avg_heart_rate: 195,
            calories: 300,
        };
        assert_eq!(Balance::compute(None, Some(&intense)).load, 100.0);
    }
}
