//! Status sources.
//!
//! A status source answers one question each tick: what level should the
//! output be at right now. Two interchangeable variants exist and exactly one
//! is selected at startup:
//! - `database`: latest status record for this device from MongoDB
//! - `api`: `status` field of a JSON document served over HTTP

pub mod api;
pub mod database;

pub use api::ApiSource;
pub use database::{DatabaseSource, MongoStatusStore, StatusRecord, StatusStore};

use crate::config::{Config, SourceKind};
use crate::error::Result;
use crate::status::Status;
use async_trait::async_trait;

/// Anything the control loop can poll for the desired status.
///
/// Implementations never fail: errors are logged and reported as
/// [`Status::OFF`].
#[async_trait]
pub trait StatusFetcher: Send + Sync {
    async fn fetch_status(&self) -> Status;
}

/// The status source selected for this process run.
pub enum StatusSource {
    Database(DatabaseSource),
    Api(ApiSource),
}

impl StatusSource {
    /// Build the source chosen by `config.source`.
    pub async fn from_config(config: &Config) -> Result<Self> {
        match config.source {
            SourceKind::Database => {
                let store = MongoStatusStore::connect(&config.mongo).await?;
                Ok(Self::Database(DatabaseSource::new(
                    store,
                    config.device_id.clone(),
                )))
            }
            SourceKind::Api => Ok(Self::Api(ApiSource::new(config.api.url.clone())?)),
        }
    }

    pub fn kind(&self) -> SourceKind {
        match self {
            Self::Database(_) => SourceKind::Database,
            Self::Api(_) => SourceKind::Api,
        }
    }
}

#[async_trait]
impl StatusFetcher for StatusSource {
    async fn fetch_status(&self) -> Status {
        match self {
            Self::Database(source) => source.fetch_status().await,
            Self::Api(source) => source.fetch_status().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_api_source_selected_from_config() {
        let mut config = Config::default();
        config.source = SourceKind::Api;
        let source = StatusSource::from_config(&config).await.unwrap();
        assert_eq!(source.kind(), SourceKind::Api);
    }

    #[tokio::test]
    async fn test_database_source_requires_uri() {
        let config = Config::default();
        assert!(StatusSource::from_config(&config).await.is_err());
    }
}
