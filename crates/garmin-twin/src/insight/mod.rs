//! Coaching copy from a language model
//!
//! Two fixed prompt templates: the morning readiness check built from the
//! latest `Sonno` row, and the post-workout debrief built from the most
//! recent activity. The model's answer is forwarded verbatim.

pub mod gemini;

use async_trait::async_trait;

use crate::config::InsightConfig;
use crate::error::Result;
use crate::models::{ActivityRecord, DailyKpiRecord};

pub use gemini::GeminiClient;

/// Free-text generation capability
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Constraints shared by both templates
fn style_rules(config: &InsightConfig) -> String {
    format!(
        "- Answer in {}.\n\
         - Tone of an elite coach: technical, motivating, straight to the point.\n\
         - Use emoji where they help.\n\
         - NO asterisks (**) or underscores (_). Plain text only.",
        config.language
    )
}

fn athlete_line(config: &InsightConfig) -> String {
    let profile = config.athlete_profile.trim();
    if profile.is_empty() {
        "You are the personal coach of an amateur endurance athlete.".to_string()
    } else {
        format!("You are the personal coach of this athlete: {}", profile)
    }
}

/// Morning readiness prompt from last night's KPIs
pub fn morning_readiness_prompt(record: &DailyKpiRecord, config: &InsightConfig) -> String {
    format!(
        "{athlete}\n\n\
         Today's physiological data ({date}) from the watch:\n\
         - Sleep score: {score} / 100\n\
         - Sleep quality: {label}\n\
         - Total sleep: {hours} h\n\
         - Body Battery: {battery} / 100\n\n\
         RULES:\n\
         1. Assess recovery. If it is high, prescribe a quality session. If it is low, prescribe an easy day or rest.\n\
         2. Keep it short: a few sentences.\n\
         {rules}",
        athlete = athlete_line(config),
        date = record.date.format("%Y-%m-%d"),
        score = record.sleep_score,
        label = record.sleep_quality_label,
        hours = record.total_sleep_hours,
        battery = record.body_battery_level,
        rules = style_rules(config),
    )
}

/// Post-workout debrief prompt for one activity
pub fn debrief_prompt(activity: &ActivityRecord, config: &InsightConfig) -> String {
    format!(
        "{athlete}\n\n\
         Analyse the workout just completed:\n\
         - Activity type: {kind}\n\
         - Start: {start}\n\
         - Distance: {distance} km\n\
         - Duration: {duration} min\n\
         - Average heart rate: {hr} bpm\n\
         - Calories: {calories}\n\n\
         DEBRIEF GOALS:\n\
         1. Quick load assessment: was the session efficient given heart rate and distance?\n\
         2. Estimate the impact on recovery.\n\
         3. Close with a concise, punchy verdict (max 3 sentences).\n\
         {rules}",
        athlete = athlete_line(config),
        kind = activity.activity_type,
        start = activity.timestamp,
        distance = activity.distance_km,
        duration = activity.duration_min,
        hr = activity.avg_heart_rate,
        calories = activity.calories,
        rules = style_rules(config),
    )
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::error::TwinError;
    use std::sync::Mutex;

    /// Returns a canned answer and records the prompts it was given
    #[derive(Default)]
    pub struct ScriptedGenerator {
        pub answer: Option<String>,
        pub prompts: Mutex<Vec<String>>,
    }

    impl ScriptedGenerator {
        pub fn answering(answer: &str) -> Self {
            Self {
                answer: Some(answer.to_string()),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn generate(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.answer
                .clone()
                .ok_or_else(|| TwinError::Generation("model unavailable".to_string()))
        }
    }
}
