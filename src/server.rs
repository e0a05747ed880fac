//! HTTP surface: on-demand translation, lazy entity translations and a
//! protected backfill trigger.

use crate::backfill::{BackfillJob, BackfillReport};
use crate::config::Config;
use crate::entities::{Content, Destination, EntityKind, Event, Region, Route, Translatable};
use crate::i18n::Language;
use crate::repository::TranslationRepository;
use crate::security::{is_authorized, API_KEY_HEADER};
use crate::store::{PgStore, SourceCatalog, TranslationStore};
use crate::translation::{TranslateOptions, TranslationManager, TranslationResult};
use anyhow::{Context, Result};
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Shared state for handlers, the scheduler and the backfill binary
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub manager: Arc<TranslationManager>,
    pub store: Arc<dyn TranslationStore>,
    pub catalog: Arc<dyn SourceCatalog>,
    pub backfill: Arc<BackfillJob>,
}

impl AppState {
    pub fn new(
        config: Config,
        manager: Arc<TranslationManager>,
        store: Arc<dyn TranslationStore>,
        catalog: Arc<dyn SourceCatalog>,
    ) -> Self {
        let backfill = BackfillJob::new(
            Arc::clone(&manager),
            Arc::clone(&store),
            Arc::clone(&catalog),
            config.source_language,
            config.target_languages.clone(),
        )
        .with_delay(Duration::from_millis(config.backfill_delay_ms));

        Self {
            config: Arc::new(config),
            manager,
            store,
            catalog,
            backfill: Arc::new(backfill),
        }
    }

    /// Connect to PostgreSQL, prepare tables and build every provider.
    pub async fn connect(config: Config) -> Result<Self> {
        let store = Arc::new(PgStore::connect(&config.database_url).await?);
        store.migrate().await?;

        let client = reqwest::Client::builder()
            .build()
            .context("Failed to build HTTP client")?;
        let manager = Arc::new(TranslationManager::from_config(&config, &client));

        let configured = manager.configured_providers();
        if configured.is_empty() {
            warn!("No translation provider configured; translations will be unavailable");
        } else {
            info!("Translation providers: {}", configured.join(", "));
        }

        Ok(Self::new(
            config,
            manager,
            Arc::clone(&store) as Arc<dyn TranslationStore>,
            store as Arc<dyn SourceCatalog>,
        ))
    }

    fn repository<E: Translatable>(&self) -> TranslationRepository<E> {
        TranslationRepository::new(
            Arc::clone(&self.manager),
            Arc::clone(&self.store),
            self.config.source_language,
        )
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/translate", post(translate))
        .route("/translations/:kind/:id/:language", get(entity_translation))
        .route("/backfill", post(backfill))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub async fn serve(state: AppState) -> Result<()> {
    let addr = format!("0.0.0.0:{}", state.config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Server listening on http://{}", addr);
    info!("  GET  /health");
    info!("  GET  /metrics");
    info!("  POST /translate");
    info!("  GET  /translations/:kind/:id/:language");
    info!("  POST /backfill");

    axum::serve(listener, router(state)).await?;
    Ok(())
}

type HandlerError = (StatusCode, String);

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "source_language": state.config.source_language,
        "target_languages": state.config.target_languages,
        "providers": state.manager.configured_providers(),
    }))
}

async fn metrics(State(state): State<AppState>) -> Json<Value> {
    Json(serde_json::json!({
        "translation": state.manager.metrics(),
    }))
}

#[derive(Debug, Deserialize)]
struct TranslateBody {
    text: String,
    target_language: String,
    #[serde(default)]
    source_language: Option<String>,
    #[serde(default)]
    context: Option<String>,
}

fn parse_language(code: &str) -> Result<Language, HandlerError> {
    Language::from_code(code).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))
}

async fn translate(
    State(state): State<AppState>,
    Json(body): Json<TranslateBody>,
) -> Result<Json<TranslationResult>, HandlerError> {
    let target = parse_language(&body.target_language)?;
    let source = match body.source_language.as_deref() {
        Some(code) => parse_language(code)?,
        None => state.config.source_language,
    };

    let mut options = TranslateOptions::new(target.code()).with_source(source.code());
    if let Some(context) = body.context {
        options = options.with_context(context);
    }

    Ok(Json(state.manager.translate_text(&body.text, &options).await))
}

async fn entity_translation(
    State(state): State<AppState>,
    Path((kind, id, language)): Path<(String, String, String)>,
) -> Result<Response, HandlerError> {
    let kind: EntityKind = kind
        .parse()
        .map_err(|e: anyhow::Error| (StatusCode::BAD_REQUEST, e.to_string()))?;
    let language = parse_language(&language)?;

    if language == state.config.source_language {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let row = state
        .catalog
        .find_entity(kind, &id)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e)))?
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("{} {} not found", kind, id)))?;

    let record = match kind {
        EntityKind::Content => translated_record::<Content>(&state, row, language).await?,
        EntityKind::Destination => translated_record::<Destination>(&state, row, language).await?,
        EntityKind::Event => translated_record::<Event>(&state, row, language).await?,
        EntityKind::Region => translated_record::<Region>(&state, row, language).await?,
        EntityKind::Route => translated_record::<Route>(&state, row, language).await?,
    };

    Ok(Json(record).into_response())
}

async fn translated_record<E: Translatable>(
    state: &AppState,
    row: Value,
    language: Language,
) -> Result<Value, HandlerError> {
    let entity: E = serde_json::from_value(row).map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Unreadable {} row: {}", E::KIND, e),
        )
    })?;

    let record = state
        .repository::<E>()
        .get_or_create_translation(&entity, language)
        .await
        .ok_or_else(|| {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                format!("Translation of {} {} to {} unavailable", E::KIND, entity.id(), language),
            )
        })?;

    serde_json::to_value(record).map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

async fn backfill(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<BackfillReport>, HandlerError> {
    let provided = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok());
    if !is_authorized(state.config.api_key.as_deref(), provided) {
        warn!("Rejected backfill request with missing or invalid API key");
        return Err((StatusCode::UNAUTHORIZED, "Invalid API key".to_string()));
    }

    info!("Backfill triggered over HTTP");
    Ok(Json(state.backfill.run().await))
}
