//! Client-side data layer for the tracker API: a keyed query cache with
//! optimistic create/update/delete and background refresh of stale regions.

pub mod api;
pub mod cache;
pub mod detail;
pub mod mutation;
pub mod notify;
pub mod refetch;

use std::sync::Arc;

use serde_json::Value;

use crate::{
    api::{ApiClientError, HttpTransport, RegionTransport},
    cache::{QueryCache, RegionKey},
    detail::DetailViewState,
    mutation::{MutationKind, MutationOutcome, MutationRunner},
    notify::NotificationCenter,
    refetch::RefetchService,
};

/// Wires the cache, transport, notifications, and detail-view state
/// together. Everything is injected explicitly; nothing here lives in a
/// global.
pub struct ClientSession {
    pub cache: Arc<QueryCache>,
    pub notifications: Arc<NotificationCenter>,
    pub detail: Arc<DetailViewState>,
    transport: Arc<dyn RegionTransport>,
    runner: MutationRunner,
}

impl ClientSession {
    /// Session backed by the real HTTP transport.
    pub fn connect(base_url: &str) -> Result<Self, ApiClientError> {
        Ok(Self::with_transport(Arc::new(HttpTransport::new(base_url)?)))
    }

    /// Session over any transport (fakes in tests).
    pub fn with_transport(transport: Arc<dyn RegionTransport>) -> Self {
        let cache = Arc::new(QueryCache::new());
        let notifications = Arc::new(NotificationCenter::new());
        let detail = Arc::new(DetailViewState::new());
        let runner = MutationRunner::new(
            cache.clone(),
            transport.clone(),
            notifications.clone(),
            Arc::downgrade(&detail),
        );
        Self {
            cache,
            notifications,
            detail,
            transport,
            runner,
        }
    }

    /// Start the background refresh of stale regions.
    pub fn spawn_refetch(&self) -> tokio::task::JoinHandle<()> {
        RefetchService::spawn(self.cache.clone(), self.transport.clone())
    }

    /// Fetch a region from the server and cache it.
    pub async fn load(&self, region: RegionKey) -> Result<Vec<Value>, ApiClientError> {
        let rows = self.transport.list(&region).await?;
        self.cache.write(region, rows.clone());
        Ok(rows)
    }

    /// Optimistically create a record in a region.
    pub async fn create(&self, region: RegionKey, draft: Value) -> MutationOutcome {
        self.runner.run(region, MutationKind::Create { draft }).await
    }

    /// Optimistically patch a record.
    pub async fn update(&self, region: RegionKey, id: &str, patch: Value) -> MutationOutcome {
        self.runner
            .run(
                region,
                MutationKind::Update {
                    id: id.to_string(),
                    patch,
                },
            )
            .await
    }

    /// Optimistically delete a record.
    pub async fn delete(&self, region: RegionKey, id: &str) -> MutationOutcome {
        self.runner
            .run(region, MutationKind::Delete { id: id.to_string() })
            .await
    }
}
