use anyhow::Result;
use tourism_translations::{config::Config, scheduler, server};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    tourism_translations::init_tracing()?;
    info!("Starting tourism translation service");

    let config = Config::from_env()?;
    info!(
        "Source language {}; targets: {}",
        config.source_language,
        config
            .target_languages
            .iter()
            .map(|l| l.code())
            .collect::<Vec<_>>()
            .join(", ")
    );

    let state = server::AppState::connect(config).await?;

    // Held for the lifetime of the server; dropping it stops scheduled jobs
    let _scheduler = match state.config.backfill_schedule.as_deref() {
        Some(schedule) => Some(scheduler::start_scheduler(state.backfill.clone(), schedule).await?),
        None => {
            info!("Scheduled backfill disabled");
            None
        }
    };

    server::serve(state).await
}
