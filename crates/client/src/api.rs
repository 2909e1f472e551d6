//! HTTP transport for the tracker API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::cache::RegionKey;

#[derive(Debug, Clone, Error)]
pub enum ApiClientError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("timeout")]
    Timeout,
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("json error: {0}")]
    Serde(String),
    #[error("invalid base url: {0}")]
    BaseUrl(String),
}

/// Seam between the mutation runner and the network.
///
/// All three mutating calls return only after the server has settled the
/// request; there is deliberately no retry or backoff anywhere behind this
/// trait, so a failure reaches the caller on the first non-success
/// response and rollback timing stays predictable.
#[async_trait]
pub trait RegionTransport: Send + Sync {
    /// Fetch the authoritative rows of a region.
    async fn list(&self, region: &RegionKey) -> Result<Vec<Value>, ApiClientError>;

    /// Create a record, returning the canonical row.
    async fn create(&self, region: &RegionKey, body: &Value) -> Result<Value, ApiClientError>;

    /// Patch a record, returning the canonical row.
    async fn update(
        &self,
        region: &RegionKey,
        id: &str,
        body: &Value,
    ) -> Result<Value, ApiClientError>;

    /// Delete a record.
    async fn delete(&self, region: &RegionKey, id: &str) -> Result<(), ApiClientError>;
}

/// Response envelope mirroring the server's `ApiResponse`.
#[derive(Debug, Deserialize)]
struct Envelope {
    success: bool,
    data: Option<Value>,
    message: Option<String>,
}

/// reqwest-backed transport for the tracker API.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: Client,
    base_url: Url,
}

impl HttpTransport {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(base_url: &str) -> Result<Self, ApiClientError> {
        let base_url = Url::parse(base_url).map_err(|e| ApiClientError::BaseUrl(e.to_string()))?;
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .user_agent(concat!("tracker-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiClientError::Transport(e.to_string()))?;

        Ok(Self { http, base_url })
    }

    fn region_url(&self, region: &RegionKey, id: Option<&str>) -> Result<Url, ApiClientError> {
        let mut path = format!(
            "api/organizations/{}/{}",
            region.org_id, region.resource
        );
        if let Some(id) = id {
            path.push('/');
            path.push_str(id);
        }
        self.base_url
            .join(&path)
            .map_err(|e| ApiClientError::BaseUrl(e.to_string()))
    }

    async fn settle(res: reqwest::Response) -> Result<Option<Value>, ApiClientError> {
        match res.status() {
            s if s.is_success() => {
                let envelope = res
                    .json::<Envelope>()
                    .await
                    .map_err(|e| ApiClientError::Serde(e.to_string()))?;
                if !envelope.success {
                    return Err(ApiClientError::Serde(
                        envelope
                            .message
                            .unwrap_or_else(|| "server reported failure".to_string()),
                    ));
                }
                Ok(envelope.data)
            }
            StatusCode::REQUEST_TIMEOUT => Err(ApiClientError::Timeout),
            s => {
                let status = s.as_u16();
                let body = res.text().await.unwrap_or_default();
                Err(ApiClientError::Http { status, body })
            }
        }
    }
}

fn map_reqwest_error(e: reqwest::Error) -> ApiClientError {
    if e.is_timeout() {
        ApiClientError::Timeout
    } else {
        ApiClientError::Transport(e.to_string())
    }
}

#[async_trait]
impl RegionTransport for HttpTransport {
    async fn list(&self, region: &RegionKey) -> Result<Vec<Value>, ApiClientError> {
        let res = self
            .http
            .get(self.region_url(region, None)?)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        match Self::settle(res).await? {
            Some(Value::Array(rows)) => Ok(rows),
            other => Err(ApiClientError::Serde(format!(
                "expected a row array, got {other:?}"
            ))),
        }
    }

    async fn create(&self, region: &RegionKey, body: &Value) -> Result<Value, ApiClientError> {
        let res = self
            .http
            .post(self.region_url(region, None)?)
            .json(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        Self::settle(res)
            .await?
            .ok_or_else(|| ApiClientError::Serde("response carried no record".to_string()))
    }

    async fn update(
        &self,
        region: &RegionKey,
        id: &str,
        body: &Value,
    ) -> Result<Value, ApiClientError> {
        let res = self
            .http
            .patch(self.region_url(region, Some(id))?)
            .json(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        Self::settle(res)
            .await?
            .ok_or_else(|| ApiClientError::Serde("response carried no record".to_string()))
    }

    async fn delete(&self, region: &RegionKey, id: &str) -> Result<(), ApiClientError> {
        let res = self
            .http
            .delete(self.region_url(region, Some(id))?)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        Self::settle(res).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::cache::Resource;

    #[test]
    fn test_region_url_shape() {
        let transport = HttpTransport::new("http://localhost:8085/").unwrap();
        let org_id = Uuid::parse_str("67e55044-10b1-426f-9247-bb680e5fe0c8").unwrap();
        let region = RegionKey::new(org_id, Resource::BehaviorLogs);

        let url = transport.region_url(&region, None).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8085/api/organizations/67e55044-10b1-426f-9247-bb680e5fe0c8/behavior-logs"
        );

        let url = transport.region_url(&region, Some("abc")).unwrap();
        assert!(url.as_str().ends_with("/behavior-logs/abc"));
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        assert!(matches!(
            HttpTransport::new("not a url"),
            Err(ApiClientError::BaseUrl(_))
        ));
    }
}
