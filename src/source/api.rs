//! HTTP API status source.

use super::StatusFetcher;
use crate::error::{Result, SyncError};
use crate::status::Status;
use async_trait::async_trait;
use log::debug;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;

/// Response body of the status endpoint. Only `status` is read.
#[derive(Debug, Deserialize)]
struct StatusBody {
    #[serde(default)]
    status: Option<Value>,
}

/// Parse a status endpoint body.
///
/// An absent or `null` `status` reads as OFF. Booleans map to 1/0, and an
/// integral number such as `1.0` reads the same as `1`.
pub fn parse_status_body(body: &str) -> Result<Status> {
    let body: StatusBody = serde_json::from_str(body)?;
    match body.status {
        None | Some(Value::Null) => Ok(Status::OFF),
        Some(Value::Bool(on)) => Ok(Status(i64::from(on))),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| {
                n.as_f64()
                    .filter(|v| v.fract() == 0.0 && v.is_finite())
                    .map(|v| v as i64)
            })
            .map(Status)
            .ok_or_else(|| SyncError::MalformedStatus(n.to_string())),
        Some(other) => Err(SyncError::MalformedStatus(other.to_string())),
    }
}

/// Status source polling a JSON endpoint with GET.
pub struct ApiSource {
    client: Client,
    url: String,
}

impl ApiSource {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch without the fail-safe collapse.
    pub async fn try_fetch(&self) -> Result<Status> {
        let response = self.client.get(&self.url).send().await?;
        let code = response.status();
        if code != StatusCode::OK {
            return Err(SyncError::UnexpectedStatusCode(code.as_u16()));
        }

        let body = response.text().await?;
        debug!("API response body: {}", body);
        parse_status_body(&body)
    }
}

#[async_trait]
impl StatusFetcher for ApiSource {
    async fn fetch_status(&self) -> Status {
        Status::or_fail_safe(self.try_fetch().await, "API")
    }
}
