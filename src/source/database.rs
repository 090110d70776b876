//! Direct MongoDB status source.

use super::StatusFetcher;
use crate::config::MongoConfig;
use crate::error::{Result, SyncError};
use crate::status::Status;
use async_trait::async_trait;
use log::{debug, info};
use mongodb::bson::{Bson, doc};
use mongodb::{Client, Collection};
use serde::Deserialize;

/// One status document as written by the remote side.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusRecord {
    pub device_id: String,
    #[serde(default)]
    pub status: Option<Bson>,
    #[serde(default)]
    pub timestamp: Option<Bson>,
}

impl StatusRecord {
    /// Interpret the stored status field. A missing field reads as OFF.
    pub fn status(&self) -> Result<Status> {
        match &self.status {
            None | Some(Bson::Null) => Ok(Status::OFF),
            Some(Bson::Int32(v)) => Ok(Status(i64::from(*v))),
            Some(Bson::Int64(v)) => Ok(Status(*v)),
            Some(Bson::Double(v)) if v.fract() == 0.0 && v.is_finite() => Ok(Status(*v as i64)),
            Some(Bson::Boolean(v)) => Ok(Status(i64::from(*v))),
            Some(other) => Err(SyncError::MalformedStatus(other.to_string())),
        }
    }
}

/// Query capability over the status collection.
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Most recent record for `device_id` by timestamp, if any.
    async fn find_latest(&self, device_id: &str) -> Result<Option<StatusRecord>>;
}

pub struct MongoStatusStore {
    collection: Collection<StatusRecord>,
}

impl MongoStatusStore {
    /// Create a client for the configured collection.
    ///
    /// Parsing the URI happens here, and for `mongodb+srv://` so does the
    /// SRV/TXT lookup, so a bad URI or DNS failure ends startup. Server
    /// connections are opened on the first query.
    pub async fn connect(config: &MongoConfig) -> Result<Self> {
        let uri = config
            .uri
            .as_deref()
            .ok_or(SyncError::MissingConfig("MONGO_URI"))?;
        let client = Client::with_uri_str(uri).await?;
        info!(
            "Using MongoDB collection {}.{}",
            config.database, config.collection
        );
        let collection = client
            .database(&config.database)
            .collection::<StatusRecord>(&config.collection);
        Ok(Self { collection })
    }
}

#[async_trait]
impl StatusStore for MongoStatusStore {
    async fn find_latest(&self, device_id: &str) -> Result<Option<StatusRecord>> {
        let record = self
            .collection
            .find_one(doc! { "device_id": device_id })
            .sort(doc! { "timestamp": -1 })
            .await?;
        Ok(record)
    }
}

/// Status source reading the newest record for a fixed device.
pub struct DatabaseSource {
    store: Box<dyn StatusStore>,
    device_id: String,
}

impl DatabaseSource {
    pub fn new(store: impl StatusStore + 'static, device_id: impl Into<String>) -> Self {
        Self {
            store: Box::new(store),
            device_id: device_id.into(),
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Fetch without the fail-safe collapse.
    pub async fn try_fetch(&self) -> Result<Status> {
        match self.store.find_latest(&self.device_id).await? {
            Some(record) => record.status(),
            None => {
                debug!("No status record found for device {}", self.device_id);
                Ok(Status::OFF)
            }
        }
    }
}

#[async_trait]
impl StatusFetcher for DatabaseSource {
    async fn fetch_status(&self) -> Status {
        Status::or_fail_safe(self.try_fetch().await, "MongoDB")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// In-memory collection that mimics the latest-by-timestamp query.
    struct MemoryStore {
        records: Vec<StatusRecord>,
        fail: bool,
        queried: Mutex<Vec<String>>,
    }

    impl MemoryStore {
        fn new(records: Vec<StatusRecord>) -> Self {
            Self {
                records,
                fail: false,
                queried: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new(Vec::new())
            }
        }
    }

    #[async_trait]
    impl StatusStore for MemoryStore {
        async fn find_latest(&self, device_id: &str) -> Result<Option<StatusRecord>> {
            self.queried.lock().unwrap().push(device_id.to_string());
            if self.fail {
                return Err(SyncError::Database(
                    std::io::Error::new(
                        std::io::ErrorKind::ConnectionRefused,
                        "server selection timeout",
                    )
                    .into(),
                ));
            }
            let latest = self
                .records
                .iter()
                .filter(|r| r.device_id == device_id)
                .max_by_key(|r| match r.timestamp {
                    Some(Bson::Int64(ts)) => ts,
                    _ => i64::MIN,
                })
                .cloned();
            Ok(latest)
        }
    }

    fn record(device_id: &str, status: Option<Bson>, timestamp: i64) -> StatusRecord {
        StatusRecord {
            device_id: device_id.to_string(),
            status,
            timestamp: Some(Bson::Int64(timestamp)),
        }
    }

    #[tokio::test]
    async fn test_latest_record_for_device_wins() {
        let store = MemoryStore::new(vec![
            record("raspberry_pi_1", Some(Bson::Int32(0)), 100),
            record("raspberry_pi_1", Some(Bson::Int32(1)), 300),
            record("raspberry_pi_1", Some(Bson::Int32(0)), 200),
            record("raspberry_pi_2", Some(Bson::Int32(0)), 400),
        ]);
        let source = DatabaseSource::new(store, "raspberry_pi_1");
        assert_eq!(source.fetch_status().await, Status::ON);
    }

    #[tokio::test]
    async fn test_no_record_is_off() {
        let store = MemoryStore::new(vec![record("other", Some(Bson::Int32(1)), 1)]);
        let source = DatabaseSource::new(store, "raspberry_pi_1");
        assert_eq!(source.fetch_status().await, Status::OFF);
    }

    #[tokio::test]
    async fn test_missing_status_field_is_off() {
        let store = MemoryStore::new(vec![record("raspberry_pi_1", None, 1)]);
        let source = DatabaseSource::new(store, "raspberry_pi_1");
        assert_eq!(source.fetch_status().await, Status::OFF);
    }

    #[tokio::test]
    async fn test_query_failure_is_off() {
        let source = DatabaseSource::new(MemoryStore::failing(), "raspberry_pi_1");
        assert!(matches!(
            source.try_fetch().await,
            Err(SyncError::Database(_))
        ));
        assert_eq!(source.fetch_status().await, Status::OFF);
    }

    #[async_trait]
    impl StatusStore for Arc<MemoryStore> {
        async fn find_latest(&self, device_id: &str) -> Result<Option<StatusRecord>> {
            self.as_ref().find_latest(device_id).await
        }
    }

    #[tokio::test]
    async fn test_queries_configured_device() {
        let store = Arc::new(MemoryStore::new(Vec::new()));
        let source = DatabaseSource::new(store.clone(), "garage_pi");
        assert_eq!(source.device_id(), "garage_pi");
        source.fetch_status().await;
        assert_eq!(*store.queried.lock().unwrap(), vec!["garage_pi".to_string()]);
    }

    #[test]
    fn test_record_status_types() {
        let status = |value| record("d", Some(value), 0).status();
        assert_eq!(status(Bson::Int64(1)).unwrap(), Status::ON);
        assert_eq!(status(Bson::Double(1.0)).unwrap(), Status::ON);
        assert_eq!(status(Bson::Boolean(true)).unwrap(), Status::ON);
        assert_eq!(status(Bson::Boolean(false)).unwrap(), Status::OFF);
        assert_eq!(status(Bson::Int32(7)).unwrap(), Status(7));
        assert_eq!(status(Bson::Null).unwrap(), Status::OFF);
        assert!(status(Bson::Double(0.5)).is_err());
        assert!(status(Bson::String("1".into())).is_err());
    }

    #[tokio::test]
    async fn test_missing_uri_is_a_startup_error() {
        let config = crate::config::Config::default().mongo;
        let result = MongoStatusStore::connect(&config).await;
        assert!(matches!(result, Err(SyncError::MissingConfig("MONGO_URI"))));
    }
}
