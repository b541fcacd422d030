use async_trait::async_trait;
use mongodb::bson::{Bson, Document, doc};
use mongodb::error::{Error as MongoError, ErrorKind};
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection, Database};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

use super::{ConnectionState, DocumentStore};
use crate::config::DocumentStoreConfig;
use crate::core::{EventCacheError, Payload, Result};

const STORE_NAME: &str = "mongodb";

/// MongoDB-backed persistent event store
pub struct MongoDocumentStore {
    database: Database,
    collection: Collection<Document>,
    id_field: String,
    state: ConnectionState,
    op_timeout: Duration,
}

impl MongoDocumentStore {
    /// Connect, select the collection and verify the deployment answers `ping`
    pub async fn connect(config: &DocumentStoreConfig) -> Result<Self> {
        info!(
            "Connecting to MongoDB (db={}, collection={})",
            config.database, config.collection
        );
        let op_timeout = Duration::from_millis(config.op_timeout_ms);

        let mut options = ClientOptions::parse(&config.uri)
            .await
            .map_err(startup_error)?;
        options.app_name = Some("eventcache-server".to_string());
        options.server_selection_timeout = Some(op_timeout);
        options.connect_timeout = Some(op_timeout);

        let client = Client::with_options(options).map_err(startup_error)?;
        let database = client.database(&config.database);
        let collection = database.collection::<Document>(&config.collection);

        let store = Self {
            database,
            collection,
            id_field: config.id_field.clone(),
            state: ConnectionState::new(STORE_NAME, true),
            op_timeout,
        };

        store
            .ping()
            .await
            .map_err(|e| EventCacheError::StartupConnect {
                store: STORE_NAME,
                reason: e.to_string(),
            })?;

        info!("Connected to MongoDB and selected collection");
        Ok(store)
    }

    async fn run<T, F>(&self, op: &'static str, fut: F) -> Result<T>
    where
        F: Future<Output = mongodb::error::Result<T>>,
    {
        match tokio::time::timeout(self.op_timeout, fut).await {
            Ok(Ok(value)) => {
                self.state.mark_up();
                Ok(value)
            }
            Ok(Err(e)) => {
                if is_connection_error(&e) {
                    self.state.mark_down(&e.to_string());
                }
                Err(EventCacheError::PersistentStore(format!("{}: {}", op, e)))
            }
            Err(_) => {
                self.state.mark_down("operation timed out");
                Err(EventCacheError::PersistentStore(format!(
                    "{}: timed out after {:?}",
                    op, self.op_timeout
                )))
            }
        }
    }
}

#[async_trait]
impl DocumentStore for MongoDocumentStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<Payload>> {
        let mut filter = Document::new();
        filter.insert(self.id_field.as_str(), id);

        let found = self
            .run("find_one", async { self.collection.find_one(filter).await })
            .await?;

        match &found {
            Some(_) => debug!("MongoDB found {}={}", self.id_field, id),
            None => debug!("MongoDB has no {}={}", self.id_field, id),
        }
        Ok(found.map(document_to_json))
    }

    async fn ping(&self) -> Result<()> {
        self.run("ping", async {
            self.database.run_command(doc! { "ping": 1 }).await
        })
        .await
        .map(|_| ())
    }

    fn is_up(&self) -> bool {
        self.state.is_up()
    }
}

/// Render a BSON document as relaxed extended JSON with `_id` as a plain
/// hex string.
pub fn document_to_json(mut document: Document) -> Payload {
    let object_id = match document.get("_id") {
        Some(Bson::ObjectId(oid)) => Some(oid.to_hex()),
        _ => None,
    };
    if let Some(hex) = object_id {
        document.insert("_id", hex);
    }
    Bson::Document(document).into_relaxed_extjson()
}

fn is_connection_error(err: &MongoError) -> bool {
    matches!(
        *err.kind,
        ErrorKind::ServerSelection { .. }
            | ErrorKind::Io(_)
            | ErrorKind::ConnectionPoolCleared { .. }
    )
}

fn startup_error(err: MongoError) -> EventCacheError {
    EventCacheError::StartupConnect {
        store: STORE_NAME,
        reason: err.to_string(),
    }
}
