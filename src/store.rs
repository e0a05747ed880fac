//! Durable storage for translation records and read access to source entities.
//!
//! Records are stored as a JSON field bag keyed by (entity_id, language_code);
//! typed decoding happens in the repository layer.

use crate::entities::EntityKind;
use crate::retry::{with_retry, RetryConfig};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredTranslation {
    pub entity_kind: EntityKind,
    pub entity_id: String,
    pub language_code: String,
    pub fields: Value,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl StoredTranslation {
    pub fn new(
        entity_kind: EntityKind,
        entity_id: impl Into<String>,
        language_code: impl Into<String>,
        fields: Value,
    ) -> Self {
        Self {
            entity_kind,
            entity_id: entity_id.into(),
            language_code: language_code.into(),
            fields,
            created_at: None,
            updated_at: None,
        }
    }
}

/// Persistence for translation records. At most one record exists per
/// (kind, entity_id, language_code); `upsert` replaces an existing one.
#[async_trait]
pub trait TranslationStore: Send + Sync {
    async fn find(
        &self,
        kind: EntityKind,
        entity_id: &str,
        language_code: &str,
    ) -> Result<Option<StoredTranslation>>;

    async fn find_many(
        &self,
        kind: EntityKind,
        entity_ids: &[String],
        language_code: &str,
    ) -> Result<Vec<StoredTranslation>>;

    async fn upsert(&self, translation: StoredTranslation) -> Result<StoredTranslation>;
}

/// Read access to source-language entities as raw JSON rows.
#[async_trait]
pub trait SourceCatalog: Send + Sync {
    async fn list_entities(&self, kind: EntityKind) -> Result<Vec<Value>>;

    async fn find_entity(&self, kind: EntityKind, entity_id: &str) -> Result<Option<Value>>;
}

// ==================== PostgreSQL ====================

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect with retry; the database may still be starting up.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = with_retry(&RetryConfig::database_connect(), "Database connect", || async {
            PgPoolOptions::new()
                .max_connections(5)
                .connect(database_url)
                .await
                .context("Failed to connect to PostgreSQL")
        })
        .await?;

        info!("✓ Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Create translation tables if missing.
    pub async fn migrate(&self) -> Result<()> {
        for kind in EntityKind::ALL {
            let table = kind.translation_table();
            let statement = format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    id BIGSERIAL PRIMARY KEY,
                    entity_id TEXT NOT NULL,
                    language_code TEXT NOT NULL,
                    fields JSONB NOT NULL,
                    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                    UNIQUE (entity_id, language_code)
                )"
            );
            sqlx::query(&statement)
                .execute(&self.pool)
                .await
                .with_context(|| format!("Failed to create {} table", table))?;
        }

        info!("✓ Translation tables ready");
        Ok(())
    }

    fn decode(kind: EntityKind, row: &PgRow) -> Result<StoredTranslation> {
        Ok(StoredTranslation {
            entity_kind: kind,
            entity_id: row.try_get("entity_id")?,
            language_code: row.try_get("language_code")?,
            fields: row.try_get("fields")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl TranslationStore for PgStore {
    async fn find(
        &self,
        kind: EntityKind,
        entity_id: &str,
        language_code: &str,
    ) -> Result<Option<StoredTranslation>> {
        let statement = format!(
            "SELECT entity_id, language_code, fields, created_at, updated_at
             FROM {}
             WHERE entity_id = $1 AND language_code = $2",
            kind.translation_table()
        );

        let row = sqlx::query(&statement)
            .bind(entity_id)
            .bind(language_code)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to load {} translation {}", kind, entity_id))?;

        row.map(|row| Self::decode(kind, &row)).transpose()
    }

    async fn find_many(
        &self,
        kind: EntityKind,
        entity_ids: &[String],
        language_code: &str,
    ) -> Result<Vec<StoredTranslation>> {
        if entity_ids.is_empty() {
            return Ok(Vec::new());
        }

        let statement = format!(
            "SELECT entity_id, language_code, fields, created_at, updated_at
             FROM {}
             WHERE language_code = $1 AND entity_id = ANY($2)",
            kind.translation_table()
        );

        let rows = sqlx::query(&statement)
            .bind(language_code)
            .bind(entity_ids)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to load {} translations", kind))?;

        rows.iter().map(|row| Self::decode(kind, row)).collect()
    }

    async fn upsert(&self, translation: StoredTranslation) -> Result<StoredTranslation> {
        let kind = translation.entity_kind;
        let statement = format!(
            "INSERT INTO {} (entity_id, language_code, fields)
             VALUES ($1, $2, $3)
             ON CONFLICT (entity_id, language_code)
             DO UPDATE SET fields = EXCLUDED.fields, updated_at = NOW()
             RETURNING entity_id, language_code, fields, created_at, updated_at",
            kind.translation_table()
        );

        let row = sqlx::query(&statement)
            .bind(&translation.entity_id)
            .bind(&translation.language_code)
            .bind(&translation.fields)
            .fetch_one(&self.pool)
            .await
            .with_context(|| {
                format!(
                    "Failed to save {} translation {} ({})",
                    kind, translation.entity_id, translation.language_code
                )
            })?;

        debug!(
            "Saved {} translation {} ({})",
            kind, translation.entity_id, translation.language_code
        );
        Self::decode(kind, &row)
    }
}

#[async_trait]
impl SourceCatalog for PgStore {
    async fn list_entities(&self, kind: EntityKind) -> Result<Vec<Value>> {
        let statement = format!("SELECT to_jsonb(t) AS entity FROM {} t", kind.source_table());

        let rows = sqlx::query(&statement)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to list {} entities", kind))?;

        rows.iter()
            .map(|row| row.try_get::<Value, _>("entity").map_err(anyhow::Error::from))
            .collect()
    }

    async fn find_entity(&self, kind: EntityKind, entity_id: &str) -> Result<Option<Value>> {
        let statement = format!(
            "SELECT to_jsonb(t) AS entity FROM {} t WHERE t.id::text = $1",
            kind.source_table()
        );

        let row = sqlx::query(&statement)
            .bind(entity_id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to load {} {}", kind, entity_id))?;

        row.map(|row| row.try_get::<Value, _>("entity").map_err(anyhow::Error::from))
            .transpose()
    }
}

// ==================== In-memory ====================

type RecordKey = (EntityKind, String, String);

/// Process-local store used by tests and offline runs.
#[derive(Default)]
pub struct MemoryStore {
    translations: RwLock<HashMap<RecordKey, StoredTranslation>>,
    sources: RwLock<HashMap<EntityKind, Vec<Value>>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source entity for `SourceCatalog` lookups.
    pub fn add_source<E: Serialize>(&self, kind: EntityKind, entity: &E) -> Result<()> {
        let value = serde_json::to_value(entity).context("Failed to serialize source entity")?;
        self.sources
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(kind)
            .or_default()
            .push(value);
        Ok(())
    }

    /// Make subsequent upserts fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.translations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn entity_id_of(value: &Value) -> Option<String> {
    match value.get("id")? {
        Value::String(id) => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

#[async_trait]
impl TranslationStore for MemoryStore {
    async fn find(
        &self,
        kind: EntityKind,
        entity_id: &str,
        language_code: &str,
    ) -> Result<Option<StoredTranslation>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let key = (kind, entity_id.to_string(), language_code.to_string());
        Ok(self
            .translations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned())
    }

    async fn find_many(
        &self,
        kind: EntityKind,
        entity_ids: &[String],
        language_code: &str,
    ) -> Result<Vec<StoredTranslation>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let translations = self.translations.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entity_ids
            .iter()
            .filter_map(|id| {
                translations
                    .get(&(kind, id.clone(), language_code.to_string()))
                    .cloned()
            })
            .collect())
    }

    async fn upsert(&self, mut translation: StoredTranslation) -> Result<StoredTranslation> {
        if self.fail_writes.load(Ordering::SeqCst) {
            bail!(
                "Failed to save {} translation {} ({}): store unavailable",
                translation.entity_kind,
                translation.entity_id,
                translation.language_code
            );
        }
        self.writes.fetch_add(1, Ordering::SeqCst);

        let now = Utc::now();
        let key = (
            translation.entity_kind,
            translation.entity_id.clone(),
            translation.language_code.clone(),
        );
        let mut translations = self.translations.write().unwrap_or_else(PoisonError::into_inner);
        translation.created_at = translations
            .get(&key)
            .and_then(|existing| existing.created_at)
            .or(Some(now));
        translation.updated_at = Some(now);
        translations.insert(key, translation.clone());
        Ok(translation)
    }
}

#[async_trait]
impl SourceCatalog for MemoryStore {
    async fn list_entities(&self, kind: EntityKind) -> Result<Vec<Value>> {
        Ok(self
            .sources
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .cloned()
            .unwrap_or_default())
    }

    async fn find_entity(&self, kind: EntityKind, entity_id: &str) -> Result<Option<Value>> {
        Ok(self
            .sources
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .and_then(|rows| {
                rows.iter()
                    .find(|row| entity_id_of(row).as_deref() == Some(entity_id))
                    .cloned()
            }))
    }
}
