//! Lazy per-entity translation repository.
//!
//! A translation is looked up first and only generated on a miss. Nothing is
//! persisted when no field could be translated, so the next access retries.

use crate::entities::{Content, Destination, Event, FieldTranslator, Region, Route, Translatable};
use crate::i18n::Language;
use crate::store::{StoredTranslation, TranslationStore};
use crate::translation::{TranslateOptions, TranslationManager};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// A persisted translation decoded into the entity's field type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranslationRecord<F> {
    pub entity_id: String,
    pub language_code: String,
    pub fields: F,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

pub struct TranslationRepository<E> {
    manager: Arc<TranslationManager>,
    store: Arc<dyn TranslationStore>,
    source_language: Language,
    _entity: PhantomData<fn() -> E>,
}

pub type ContentTranslations = TranslationRepository<Content>;
pub type DestinationTranslations = TranslationRepository<Destination>;
pub type EventTranslations = TranslationRepository<Event>;
pub type RegionTranslations = TranslationRepository<Region>;
pub type RouteTranslations = TranslationRepository<Route>;

impl<E> Clone for TranslationRepository<E> {
    fn clone(&self) -> Self {
        Self {
            manager: Arc::clone(&self.manager),
            store: Arc::clone(&self.store),
            source_language: self.source_language,
            _entity: PhantomData,
        }
    }
}

impl<E: Translatable> TranslationRepository<E> {
    pub fn new(
        manager: Arc<TranslationManager>,
        store: Arc<dyn TranslationStore>,
        source_language: Language,
    ) -> Self {
        Self {
            manager,
            store,
            source_language,
            _entity: PhantomData,
        }
    }

    fn decode(stored: StoredTranslation) -> Result<TranslationRecord<E::Fields>> {
        let fields = serde_json::from_value(stored.fields).with_context(|| {
            format!(
                "Corrupt {} translation {} ({})",
                E::KIND,
                stored.entity_id,
                stored.language_code
            )
        })?;

        Ok(TranslationRecord {
            entity_id: stored.entity_id,
            language_code: stored.language_code,
            fields,
            created_at: stored.created_at,
            updated_at: stored.updated_at,
        })
    }

    pub async fn try_get_translation(
        &self,
        entity_id: &str,
        language: Language,
    ) -> Result<Option<TranslationRecord<E::Fields>>> {
        self.store
            .find(E::KIND, entity_id, language.code())
            .await?
            .map(Self::decode)
            .transpose()
    }

    /// Stored translation, if any. Lookup failures are logged and read as absent.
    pub async fn get_translation(
        &self,
        entity_id: &str,
        language: Language,
    ) -> Option<TranslationRecord<E::Fields>> {
        match self.try_get_translation(entity_id, language).await {
            Ok(record) => record,
            Err(e) => {
                error!("Failed to read {} translation {}: {:#}", E::KIND, entity_id, e);
                None
            }
        }
    }

    /// Translate every field and persist the result.
    ///
    /// Returns `Ok(None)` when no field could be translated; nothing is written.
    pub async fn try_create_translation(
        &self,
        entity: &E,
        language: Language,
    ) -> Result<Option<TranslationRecord<E::Fields>>> {
        let options = TranslateOptions::new(language.code())
            .with_source(self.source_language.code())
            .with_context(E::KIND.context_hint());
        let translator = FieldTranslator::new(&self.manager, options);

        let fields = entity.translate_fields(&translator).await;
        let translated = translator.translated_count();
        let untranslated = translator.untranslated_count();

        if translated == 0 {
            warn!(
                "No fields of {} {} could be translated to {}; nothing saved",
                E::KIND,
                entity.id(),
                language
            );
            return Ok(None);
        }
        if untranslated > 0 {
            warn!(
                "{} {} ({}): {} of {} fields kept in {}",
                E::KIND,
                entity.id(),
                language,
                untranslated,
                translated + untranslated,
                self.source_language
            );
        }

        let payload = serde_json::to_value(&fields).context("Failed to encode translated fields")?;
        let saved = self
            .store
            .upsert(StoredTranslation::new(E::KIND, entity.id(), language.code(), payload))
            .await?;

        info!("✓ Translated {} {} to {}", E::KIND, entity.id(), language);
        Ok(Some(TranslationRecord {
            entity_id: saved.entity_id,
            language_code: saved.language_code,
            fields,
            created_at: saved.created_at,
            updated_at: saved.updated_at,
        }))
    }

    /// Like [`try_create_translation`](Self::try_create_translation), with
    /// persistence failures logged and reported as `None`.
    pub async fn create_translation(
        &self,
        entity: &E,
        language: Language,
    ) -> Option<TranslationRecord<E::Fields>> {
        match self.try_create_translation(entity, language).await {
            Ok(record) => record,
            Err(e) => {
                error!("✗ Failed to create {} translation {}: {:#}", E::KIND, entity.id(), e);
                None
            }
        }
    }

    /// Stored translation, generated on a miss. `None` for the source language.
    pub async fn get_or_create_translation(
        &self,
        entity: &E,
        language: Language,
    ) -> Option<TranslationRecord<E::Fields>> {
        if language == self.source_language {
            return None;
        }

        if let Some(existing) = self.get_translation(entity.id(), language).await {
            debug!("Using stored {} translation {} ({})", E::KIND, entity.id(), language);
            return Some(existing);
        }

        self.create_translation(entity, language).await
    }

    /// Stored translations for many entities; missing ids are absent from the map.
    /// Never generates.
    pub async fn get_translations(
        &self,
        entity_ids: &[String],
        language: Language,
    ) -> HashMap<String, TranslationRecord<E::Fields>> {
        let stored = match self.store.find_many(E::KIND, entity_ids, language.code()).await {
            Ok(stored) => stored,
            Err(e) => {
                error!("Failed to read {} translations: {:#}", E::KIND, e);
                return HashMap::new();
            }
        };

        stored
            .into_iter()
            .filter_map(|s| match Self::decode(s) {
                Ok(record) => Some((record.entity_id.clone(), record)),
                Err(e) => {
                    warn!("{:#}", e);
                    None
                }
            })
            .collect()
    }
}
