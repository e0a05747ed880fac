//! One-off translation backfill.
//!
//! Translates every source entity into every target language that does not
//! yet have a stored translation, then prints the report as JSON.
//!
//! Usage:
//!   cargo run --bin backfill
//!   cargo run --bin backfill -- destination event

use anyhow::{Context, Result};
use tourism_translations::config::Config;
use tourism_translations::entities::EntityKind;
use tourism_translations::server::AppState;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tourism_translations::init_tracing()?;

    let kinds = std::env::args()
        .skip(1)
        .map(|arg| arg.parse::<EntityKind>())
        .collect::<Result<Vec<_>>>()?;

    let state = AppState::connect(Config::from_env()?).await?;

    let report = if kinds.is_empty() {
        state.backfill.run().await
    } else {
        state.backfill.run_kinds(&kinds).await
    };

    let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
    println!("{}", json);

    if report.errors > 0 {
        info!("{} pair(s) failed; rerun to retry them", report.errors);
    }
    Ok(())
}
