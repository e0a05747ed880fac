//! Batch job that fills in missing translations for every entity and target language.

use crate::entities::{Content, Destination, EntityKind, Event, Region, Route, Translatable};
use crate::i18n::Language;
use crate::repository::TranslationRepository;
use crate::store::{SourceCatalog, TranslationStore};
use crate::translation::TranslationManager;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

pub const DEFAULT_BACKFILL_DELAY: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PairStatus {
    Translated,
    Skipped,
    Error { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairOutcome {
    pub entity_kind: EntityKind,
    pub entity_id: String,
    pub language: String,
    #[serde(flatten)]
    pub status: PairStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BackfillReport {
    /// Pairs for which a translation was attempted
    pub processed: usize,
    pub translated: usize,
    /// Pairs that already had a stored translation
    pub skipped: usize,
    pub errors: usize,
    pub details: Vec<PairOutcome>,
    /// Entity kinds whose source rows could not be listed
    pub catalog_errors: Vec<String>,
}

impl BackfillReport {
    fn record(
        &mut self,
        kind: EntityKind,
        entity_id: &str,
        language: Language,
        status: PairStatus,
    ) {
        match status {
            PairStatus::Translated => {
                self.processed += 1;
                self.translated += 1;
            }
            PairStatus::Skipped => self.skipped += 1,
            PairStatus::Error { .. } => {
                self.processed += 1;
                self.errors += 1;
            }
        }
        self.details.push(PairOutcome {
            entity_kind: kind,
            entity_id: entity_id.to_string(),
            language: language.code().to_string(),
            status,
        });
    }
}

/// Spaces translation attempts across one whole job run.
struct Pacer {
    delay: Duration,
    attempted: bool,
}

impl Pacer {
    fn new(delay: Duration) -> Self {
        Self {
            delay,
            attempted: false,
        }
    }

    /// Sleep before every attempt except the first.
    async fn before_attempt(&mut self) {
        if self.attempted && !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.attempted = true;
    }
}

pub struct BackfillJob {
    manager: Arc<TranslationManager>,
    store: Arc<dyn TranslationStore>,
    catalog: Arc<dyn SourceCatalog>,
    source_language: Language,
    languages: Vec<Language>,
    delay: Duration,
}

impl BackfillJob {
    /// The source language is dropped from `languages` if present.
    pub fn new(
        manager: Arc<TranslationManager>,
        store: Arc<dyn TranslationStore>,
        catalog: Arc<dyn SourceCatalog>,
        source_language: Language,
        languages: Vec<Language>,
    ) -> Self {
        let languages = languages
            .into_iter()
            .filter(|language| *language != source_language)
            .collect();

        Self {
            manager,
            store,
            catalog,
            source_language,
            languages,
            delay: DEFAULT_BACKFILL_DELAY,
        }
    }

    /// Pause between consecutive translation attempts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn languages(&self) -> &[Language] {
        &self.languages
    }

    fn repository<E: Translatable>(&self) -> TranslationRepository<E> {
        TranslationRepository::new(
            Arc::clone(&self.manager),
            Arc::clone(&self.store),
            self.source_language,
        )
    }

    /// Backfill every entity kind.
    pub async fn run(&self) -> BackfillReport {
        self.run_kinds(&EntityKind::ALL).await
    }

    /// Backfill the given kinds in order, pacing attempts across all of them.
    pub async fn run_kinds(&self, kinds: &[EntityKind]) -> BackfillReport {
        info!(
            "Starting translation backfill of {} kind(s) for {} language(s)",
            kinds.len(),
            self.languages.len()
        );

        let mut report = BackfillReport::default();
        let mut pacer = Pacer::new(self.delay);
        for &kind in kinds {
            self.backfill_kind(kind, &mut report, &mut pacer).await;
        }

        info!(
            "✓ Backfill finished: {} processed, {} translated, {} skipped, {} errors",
            report.processed, report.translated, report.skipped, report.errors
        );
        report
    }

    async fn backfill_kind(
        &self,
        kind: EntityKind,
        report: &mut BackfillReport,
        pacer: &mut Pacer,
    ) {
        match kind {
            EntityKind::Content => self.backfill_catalog::<Content>(report, pacer).await,
            EntityKind::Destination => self.backfill_catalog::<Destination>(report, pacer).await,
            EntityKind::Event => self.backfill_catalog::<Event>(report, pacer).await,
            EntityKind::Region => self.backfill_catalog::<Region>(report, pacer).await,
            EntityKind::Route => self.backfill_catalog::<Route>(report, pacer).await,
        }
    }

    async fn backfill_catalog<E: Translatable>(
        &self,
        report: &mut BackfillReport,
        pacer: &mut Pacer,
    ) {
        let rows = match self.catalog.list_entities(E::KIND).await {
            Ok(rows) => rows,
            Err(e) => {
                error!("✗ Could not list {} entities: {:#}", E::KIND, e);
                report.catalog_errors.push(format!("{}: {:#}", E::KIND, e));
                return;
            }
        };

        let entities: Vec<E> = rows
            .into_iter()
            .filter_map(|row| match serde_json::from_value::<E>(row) {
                Ok(entity) => Some(entity),
                Err(e) => {
                    warn!("Skipping unreadable {} row: {}", E::KIND, e);
                    None
                }
            })
            .filter(|entity| entity.has_translatable_content())
            .collect();

        self.backfill_paced(&entities, report, pacer).await;
    }

    /// Translate every (entity, language) pair lacking a stored translation.
    pub async fn backfill_entities<E: Translatable>(&self, entities: &[E]) -> BackfillReport {
        let mut report = BackfillReport::default();
        let mut pacer = Pacer::new(self.delay);
        self.backfill_paced(entities, &mut report, &mut pacer).await;
        report
    }

    async fn backfill_paced<E: Translatable>(
        &self,
        entities: &[E],
        report: &mut BackfillReport,
        pacer: &mut Pacer,
    ) {
        let repository = self.repository::<E>();
        let total = entities.len() * self.languages.len();
        let mut index = 0;

        if total > 0 {
            info!(
                "Backfilling {} {} entities x {} languages",
                entities.len(),
                E::KIND,
                self.languages.len()
            );
        }

        for entity in entities {
            for &language in &self.languages {
                index += 1;

                match self.store.find(E::KIND, entity.id(), language.code()).await {
                    Ok(Some(_)) => {
                        info!(
                            "[{}/{}] {} {} ({}) already translated",
                            index,
                            total,
                            E::KIND,
                            entity.id(),
                            language
                        );
                        report.record(E::KIND, entity.id(), language, PairStatus::Skipped);
                        continue;
                    }
                    Ok(None) => {}
                    Err(e) => {
                        warn!(
                            "[{}/{}] ✗ {} {} ({}): {:#}",
                            index,
                            total,
                            E::KIND,
                            entity.id(),
                            language,
                            e
                        );
                        report.record(
                            E::KIND,
                            entity.id(),
                            language,
                            PairStatus::Error {
                                message: format!("{:#}", e),
                            },
                        );
                        continue;
                    }
                }

                // Pause only between attempts, never after a skip
                pacer.before_attempt().await;

                let status = match repository.try_create_translation(entity, language).await {
                    Ok(Some(_)) => {
                        info!("[{}/{}] ✓ {} {} ({})", index, total, E::KIND, entity.id(), language);
                        PairStatus::Translated
                    }
                    Ok(None) => {
                        warn!(
                            "[{}/{}] ✗ {} {} ({}): no field translated",
                            index,
                            total,
                            E::KIND,
                            entity.id(),
                            language
                        );
                        PairStatus::Error {
                            message: "no field could be translated".to_string(),
                        }
                    }
                    Err(e) => {
                        warn!(
                            "[{}/{}] ✗ {} {} ({}): {:#}",
                            index,
                            total,
                            E::KIND,
                            entity.id(),
                            language,
                            e
                        );
                        PairStatus::Error {
                            message: format!("{:#}", e),
                        }
                    }
                };
                report.record(E::KIND, entity.id(), language, status);
            }
        }
    }
}
