//! Coaching commands: morning readiness and post-workout debrief

use super::connect_workbook;
use crate::config::{AppConfig, Secrets};
use crate::error::Result;
use crate::insight::GeminiClient;
use crate::notify::{DeliveryStatus, TelegramNotifier};
use crate::pipeline::{self, CoachOutcome, InsightDeps};

#[derive(Clone, Copy)]
enum Kind {
    Readiness,
    Debrief,
}

/// Generate and push the morning readiness message
pub async fn coach(config: &AppConfig) -> Result<()> {
    execute(config, Kind::Readiness).await
}

/// Generate and push the debrief of the latest workout
pub async fn debrief(config: &AppConfig) -> Result<()> {
    execute(config, Kind::Debrief).await
}

async fn execute(config: &AppConfig, kind: Kind) -> Result<()> {
    let secrets = Secrets::from_env();

    let api_key = secrets.gemini_api_key()?;
    let bot_token = secrets.telegram_token()?;
    let chat_id = secrets.telegram_chat_id()?;

    let generator = GeminiClient::new(&config.insight.api_base, &config.insight.model, api_key)?;
    let channel = TelegramNotifier::new(&config.notify.api_base, bot_token)?;
    let workbook = connect_workbook(config, &secrets).await?;

    let deps = InsightDeps {
        workbook: &workbook,
        generator: &generator,
        channel: &channel,
        chat_id,
        insight: &config.insight,
        dashboard_url: &config.notify.dashboard_url,
    };

    let outcome = match kind {
        Kind::Readiness => pipeline::coach(&deps).await?,
        Kind::Debrief => pipeline::debrief(&deps).await?,
    };
    print_outcome(&outcome);
    Ok(())
}

fn print_outcome(outcome: &CoachOutcome) {
    println!("=== MESSAGE PAYLOAD ===");
    println!("{}", outcome.message);
    println!("=======================");
    match &outcome.delivery {
        Ok(DeliveryStatus::Delivered) => println!("Delivered."),
        Ok(DeliveryStatus::Rejected { status, body }) => {
            println!("Not delivered: push endpoint answered {} {}", status, body)
        }
        Err(e) => println!("Not delivered: {}", e),
    }
}
