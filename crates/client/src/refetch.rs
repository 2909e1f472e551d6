//! Background service that refreshes stale cache regions.

use std::{sync::Arc, time::Duration};

use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::{api::RegionTransport, cache::QueryCache};

/// Periodically scans for stale regions and rewrites each from the
/// transport's list endpoint. A failed fetch leaves the region stale so
/// the next tick retries it.
pub struct RefetchService {
    cache: Arc<QueryCache>,
    transport: Arc<dyn RegionTransport>,
    poll_interval: Duration,
}

impl RefetchService {
    const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

    /// Spawn the background refetch loop.
    pub fn spawn(
        cache: Arc<QueryCache>,
        transport: Arc<dyn RegionTransport>,
    ) -> tokio::task::JoinHandle<()> {
        let service = Self {
            cache,
            transport,
            poll_interval: Self::DEFAULT_POLL_INTERVAL,
        };
        tokio::spawn(async move {
            service.start().await;
        })
    }

    async fn start(&self) {
        info!(interval = ?self.poll_interval, "starting background refetch service");

        let mut interval = interval(self.poll_interval);

        loop {
            interval.tick().await;
            self.refresh_stale_regions().await;
        }
    }

    async fn refresh_stale_regions(&self) {
        for key in self.cache.stale_regions() {
            match self.transport.list(&key).await {
                Ok(rows) => {
                    debug!(org_id = %key.org_id, resource = %key.resource, rows = rows.len(), "refreshed stale region");
                    self.cache.write(key, rows);
                }
                Err(e) => {
                    warn!(org_id = %key.org_id, resource = %key.resource, error = %e, "refetch failed, region stays stale");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::{Value, json};
    use uuid::Uuid;

    use super::*;
    use crate::{
        api::ApiClientError,
        cache::{RegionKey, Resource},
    };

    struct ListTransport {
        rows: Vec<Value>,
        fail: Mutex<bool>,
    }

    #[async_trait]
    impl RegionTransport for ListTransport {
        async fn list(&self, _region: &RegionKey) -> Result<Vec<Value>, ApiClientError> {
            if *self.fail.lock().unwrap() {
                Err(ApiClientError::Timeout)
            } else {
                Ok(self.rows.clone())
            }
        }

        async fn create(&self, _: &RegionKey, _: &Value) -> Result<Value, ApiClientError> {
            unimplemented!("list-only fake")
        }

        async fn update(&self, _: &RegionKey, _: &str, _: &Value) -> Result<Value, ApiClientError> {
            unimplemented!("list-only fake")
        }

        async fn delete(&self, _: &RegionKey, _: &str) -> Result<(), ApiClientError> {
            unimplemented!("list-only fake")
        }
    }

    #[tokio::test]
    async fn test_refresh_writes_rows_and_clears_staleness() {
        let cache = Arc::new(QueryCache::new());
        let key = RegionKey::new(Uuid::new_v4(), Resource::Categories);
        cache.write(key, vec![json!({"id": "old"})]);
        cache.invalidate(&key);

        let service = RefetchService {
            cache: cache.clone(),
            transport: Arc::new(ListTransport {
                rows: vec![json!({"id": "fresh"})],
                fail: Mutex::new(false),
            }),
            poll_interval: Duration::from_millis(10),
        };

        service.refresh_stale_regions().await;

        assert!(!cache.is_stale(&key));
        assert_eq!(cache.read(&key).unwrap(), vec![json!({"id": "fresh"})]);
    }

    #[tokio::test]
    async fn test_failed_refresh_leaves_region_stale() {
        let cache = Arc::new(QueryCache::new());
        let key = RegionKey::new(Uuid::new_v4(), Resource::Students);
        cache.invalidate(&key);

        let service = RefetchService {
            cache: cache.clone(),
            transport: Arc::new(ListTransport {
                rows: vec![],
                fail: Mutex::new(true),
            }),
            poll_interval: Duration::from_millis(10),
        };

        service.refresh_stale_regions().await;
        assert!(cache.is_stale(&key));
    }
}
