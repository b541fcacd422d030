//! Index definitions for the event collection

use anyhow::Result;
use mongodb::bson::{Document, doc};
use mongodb::options::IndexOptions;
use mongodb::{Collection, IndexModel};
use tracing::info;

/// Unique id index, geospatial index on `location`, time index on `pubMillis`
pub fn event_indexes(id_field: &str) -> Vec<IndexModel> {
    let mut id_keys = Document::new();
    id_keys.insert(id_field, 1);

    vec![
        IndexModel::builder()
            .keys(id_keys)
            .options(IndexOptions::builder().unique(true).build())
            .build(),
        IndexModel::builder()
            .keys(doc! { "location": "2dsphere" })
            .build(),
        IndexModel::builder().keys(doc! { "pubMillis": 1 }).build(),
    ]
}

pub async fn create_indexes(collection: &Collection<Document>, id_field: &str) -> Result<()> {
    info!("Creating indexes...");
    let result = collection.create_indexes(event_indexes(id_field)).await?;
    info!("Indexes ready: {}", result.index_names.join(", "));
    Ok(())
}
