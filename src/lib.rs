//! Lazy, provider-chained translation of tourism platform content.

pub mod backfill;
pub mod config;
pub mod entities;
pub mod error;
pub mod i18n;
pub mod repository;
pub mod retry;
pub mod scheduler;
pub mod security;
pub mod server;
pub mod store;
pub mod translation;

/// Install the global tracing subscriber. `RUST_LOG` directives are added
/// on top of the crate's default `info` level.
pub fn init_tracing() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tourism_translations=info".parse()?),
        )
        .init();
    Ok(())
}
