//! Event pool sources: a `$sample` of the persistent collection or a local
//! JSON dump.

use anyhow::{Context, Result, bail};
use futures_util::TryStreamExt;
use mongodb::Collection;
use mongodb::bson::{Document, doc, from_document};
use rand::Rng;
use rand::seq::SliceRandom;
use serde_json::Value;
use std::path::Path;
use tracing::{info, warn};

use crate::score::EventTraits;

pub const DEFAULT_MONGO_URI: &str = "mongodb://localhost:27017";

/// Legacy, misspelled name still found in deployed `.env` files
pub const LEGACY_MONGO_URI_VAR: &str = "MONGO_CONECTION";

/// Explicit URI (flag or `MONGO_CONNECTION`), then the legacy variable, then
/// the local default. Blank values count as unset.
pub fn resolve_mongo_uri(explicit: Option<String>, legacy: Option<String>) -> String {
    explicit
        .filter(|uri| !uri.trim().is_empty())
        .or_else(|| legacy.filter(|uri| !uri.trim().is_empty()))
        .unwrap_or_else(|| DEFAULT_MONGO_URI.to_string())
}

/// Draw up to `size` random events straight from MongoDB
pub async fn sample_from_collection(
    collection: &Collection<Document>,
    id_field: &str,
    size: usize,
) -> Result<Vec<EventTraits>> {
    let sample_size = i64::try_from(size).unwrap_or(i64::MAX);
    let projected_id = format!("${}", id_field);
    let pipeline = vec![
        doc! { "$sample": { "size": sample_size } },
        doc! {
            "$project": {
                "_id": 0,
                "uuid": projected_id,
                "type": 1,
                "subtype": 1,
                "reliability": 1,
                "nThumbsUp": 1,
            }
        },
    ];

    let mut cursor = collection
        .aggregate(pipeline)
        .await
        .context("$sample aggregation failed")?;

    let mut events = Vec::with_capacity(size);
    while let Some(document) = cursor.try_next().await? {
        match from_document::<EventTraits>(document) {
            Ok(traits) if traits.uuid.is_some() => events.push(traits),
            Ok(_) => {}
            Err(e) => warn!("Skipping undecodable sampled event: {}", e),
        }
    }

    info!("Sampled {} events from MongoDB", events.len());
    Ok(events)
}

/// Read a JSON array of events and keep a random subset of at most `size`
pub fn sample_from_file<R: Rng + ?Sized>(
    path: &Path,
    id_field: &str,
    size: usize,
    rng: &mut R,
) -> Result<Vec<EventTraits>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {:?}", path))?;
    let mut events = parse_events(&content, id_field)?;

    events.shuffle(rng);
    events.truncate(size);

    info!("Sampled {} events from {:?}", events.len(), path);
    Ok(events)
}

/// Events whose `id_field` holds a non-empty string; the rest are dropped
pub fn parse_events(content: &str, id_field: &str) -> Result<Vec<EventTraits>> {
    let value: Value = serde_json::from_str(content)?;
    let Value::Array(items) = value else {
        bail!("expected a JSON array of events");
    };

    let events = items
        .into_iter()
        .filter_map(|item| {
            let id = item
                .get(id_field)
                .and_then(Value::as_str)
                .filter(|id| !id.is_empty())?
                .to_string();
            let mut traits: EventTraits = serde_json::from_value(item).ok()?;
            traits.uuid = Some(id);
            Some(traits)
        })
        .collect();
    Ok(events)
}
