//! Translatable entity types.
//!
//! Each entity declares the shape of its translated fields and how to
//! produce them through a [`FieldTranslator`]. A field whose translation
//! fails keeps its original value; list fields keep their length and order.

use crate::translation::{TranslateOptions, TranslationManager};
use anyhow::bail;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::Debug;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Content,
    Destination,
    Event,
    Region,
    Route,
}

impl EntityKind {
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Content,
        EntityKind::Destination,
        EntityKind::Event,
        EntityKind::Region,
        EntityKind::Route,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Content => "content",
            EntityKind::Destination => "destination",
            EntityKind::Event => "event",
            EntityKind::Region => "region",
            EntityKind::Route => "route",
        }
    }

    /// Table holding source-language originals.
    pub fn source_table(self) -> &'static str {
        match self {
            EntityKind::Content => "institutional_content",
            EntityKind::Destination => "destinations",
            EntityKind::Event => "events",
            EntityKind::Region => "tourist_regions",
            EntityKind::Route => "routes",
        }
    }

    /// Table holding one translation record per (entity, language).
    pub fn translation_table(self) -> &'static str {
        match self {
            EntityKind::Content => "content_translations",
            EntityKind::Destination => "destination_translations",
            EntityKind::Event => "event_translations",
            EntityKind::Region => "region_translations",
            EntityKind::Route => "route_translations",
        }
    }

    /// Domain hint handed to prompt-based providers.
    pub fn context_hint(self) -> &'static str {
        match self {
            EntityKind::Content => "text published on a tourism website for Mato Grosso do Sul, Brazil",
            EntityKind::Destination => "tourist destination in Mato Grosso do Sul, Brazil",
            EntityKind::Event => "tourism event listing in Mato Grosso do Sul, Brazil",
            EntityKind::Region => "tourism region of Mato Grosso do Sul, Brazil",
            EntityKind::Route => "tourist route or itinerary in Mato Grosso do Sul, Brazil",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        match EntityKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized || kind.source_table() == normalized)
        {
            Some(kind) => Ok(kind),
            None => bail!("Unknown entity kind: '{}'", value),
        }
    }
}

/// Translates individual fields through the manager and keeps count of
/// how many succeeded.
pub struct FieldTranslator<'a> {
    manager: &'a TranslationManager,
    options: TranslateOptions,
    translated: AtomicUsize,
    untranslated: AtomicUsize,
}

impl<'a> FieldTranslator<'a> {
    pub fn new(manager: &'a TranslationManager, options: TranslateOptions) -> Self {
        Self {
            manager,
            options,
            translated: AtomicUsize::new(0),
            untranslated: AtomicUsize::new(0),
        }
    }

    /// Blank values are returned as-is and not counted.
    pub async fn text(&self, value: &str) -> String {
        if value.trim().is_empty() {
            return value.to_string();
        }

        let result = self.manager.translate_text(value, &self.options).await;
        if result.success {
            self.translated.fetch_add(1, Ordering::Relaxed);
            result.translated_text
        } else {
            self.untranslated.fetch_add(1, Ordering::Relaxed);
            value.to_string()
        }
    }

    pub async fn optional(&self, value: Option<&str>) -> Option<String> {
        match value {
            Some(value) => Some(self.text(value).await),
            None => None,
        }
    }

    /// Element-wise; the output always has the input's length.
    pub async fn list(&self, values: &[String]) -> Vec<String> {
        let mut translated = Vec::with_capacity(values.len());
        for value in values {
            translated.push(self.text(value).await);
        }
        translated
    }

    pub fn translated_count(&self) -> usize {
        self.translated.load(Ordering::Relaxed)
    }

    pub fn untranslated_count(&self) -> usize {
        self.untranslated.load(Ordering::Relaxed)
    }
}

/// An entity with source-language fields that can be translated.
pub trait Translatable: DeserializeOwned + Send + Sync {
    /// Translated counterpart of the entity's translatable fields.
    type Fields: Serialize + DeserializeOwned + Clone + Debug + PartialEq + Send + Sync;

    const KIND: EntityKind;

    fn id(&self) -> &str;

    /// Whether at least one translatable field is non-blank.
    fn has_translatable_content(&self) -> bool;

    fn translate_fields<'a>(
        &'a self,
        translator: &'a FieldTranslator<'_>,
    ) -> BoxFuture<'a, Self::Fields>;
}

fn is_present(value: &str) -> bool {
    !value.trim().is_empty()
}

fn is_present_opt(value: &Option<String>) -> bool {
    value.as_deref().map(is_present).unwrap_or(false)
}

fn any_present(values: &[String]) -> bool {
    values.iter().any(|v| is_present(v))
}

/// Accept string or numeric primary keys.
fn deserialize_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(id) => id,
        RawId::Number(id) => id.to_string(),
    })
}

/// Treat a JSON `null` as the type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ==================== Content ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default, alias = "content_key")]
    pub key: Option<String>,
    #[serde(default, alias = "content_value", deserialize_with = "null_as_default")]
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentFields {
    pub value: String,
}

impl Translatable for Content {
    type Fields = ContentFields;
    const KIND: EntityKind = EntityKind::Content;

    fn id(&self) -> &str {
        &self.id
    }

    fn has_translatable_content(&self) -> bool {
        is_present(&self.value)
    }

    fn translate_fields<'a>(
        &'a self,
        translator: &'a FieldTranslator<'_>,
    ) -> BoxFuture<'a, ContentFields> {
        async move {
            ContentFields {
                value: translator.text(&self.value).await,
            }
        }
        .boxed()
    }
}

// ==================== Destination ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub promotional_text: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub highlights: Vec<String>,
    #[serde(default)]
    pub how_to_get_there: Option<String>,
    #[serde(default)]
    pub best_time_to_visit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestinationFields {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub promotional_text: Option<String>,
    #[serde(default)]
    pub highlights: Vec<String>,
    #[serde(default)]
    pub how_to_get_there: Option<String>,
    #[serde(default)]
    pub best_time_to_visit: Option<String>,
}

impl Translatable for Destination {
    type Fields = DestinationFields;
    const KIND: EntityKind = EntityKind::Destination;

    fn id(&self) -> &str {
        &self.id
    }

    fn has_translatable_content(&self) -> bool {
        is_present(&self.name)
            || is_present_opt(&self.description)
            || is_present_opt(&self.promotional_text)
            || any_present(&self.highlights)
            || is_present_opt(&self.how_to_get_there)
            || is_present_opt(&self.best_time_to_visit)
    }

    fn translate_fields<'a>(
        &'a self,
        translator: &'a FieldTranslator<'_>,
    ) -> BoxFuture<'a, DestinationFields> {
        async move {
            DestinationFields {
                name: translator.text(&self.name).await,
                description: translator.optional(self.description.as_deref()).await,
                promotional_text: translator.optional(self.promotional_text.as_deref()).await,
                highlights: translator.list(&self.highlights).await,
                how_to_get_there: translator.optional(self.how_to_get_there.as_deref()).await,
                best_time_to_visit: translator
                    .optional(self.best_time_to_visit.as_deref())
                    .await,
            }
        }
        .boxed()
    }
}

// ==================== Event ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventFields {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

impl Translatable for Event {
    type Fields = EventFields;
    const KIND: EntityKind = EntityKind::Event;

    fn id(&self) -> &str {
        &self.id
    }

    fn has_translatable_content(&self) -> bool {
        is_present(&self.name)
            || is_present_opt(&self.description)
            || is_present_opt(&self.location)
            || is_present_opt(&self.category)
    }

    fn translate_fields<'a>(
        &'a self,
        translator: &'a FieldTranslator<'_>,
    ) -> BoxFuture<'a, EventFields> {
        async move {
            EventFields {
                name: translator.text(&self.name).await,
                description: translator.optional(self.description.as_deref()).await,
                location: translator.optional(self.location.as_deref()).await,
                category: translator.optional(self.category.as_deref()).await,
            }
        }
        .boxed()
    }
}

// ==================== Region ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub highlights: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionFields {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub highlights: Vec<String>,
}

impl Translatable for Region {
    type Fields = RegionFields;
    const KIND: EntityKind = EntityKind::Region;

    fn id(&self) -> &str {
        &self.id
    }

    fn has_translatable_content(&self) -> bool {
        is_present(&self.name) || is_present_opt(&self.description) || any_present(&self.highlights)
    }

    fn translate_fields<'a>(
        &'a self,
        translator: &'a FieldTranslator<'_>,
    ) -> BoxFuture<'a, RegionFields> {
        async move {
            RegionFields {
                name: translator.text(&self.name).await,
                description: translator.optional(self.description.as_deref()).await,
                highlights: translator.list(&self.highlights).await,
            }
        }
        .boxed()
    }
}

// ==================== Route ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteFields {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl Translatable for Route {
    type Fields = RouteFields;
    const KIND: EntityKind = EntityKind::Route;

    fn id(&self) -> &str {
        &self.id
    }

    fn has_translatable_content(&self) -> bool {
        is_present(&self.title) || is_present_opt(&self.description)
    }

    fn translate_fields<'a>(
        &'a self,
        translator: &'a FieldTranslator<'_>,
    ) -> BoxFuture<'a, RouteFields> {
        async move {
            RouteFields {
                title: translator.text(&self.title).await,
                description: translator.optional(self.description.as_deref()).await,
            }
        }
        .boxed()
    }
}
