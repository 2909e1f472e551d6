//! Optimistic mutation protocol.
//!
//! A mutation speculatively patches the cache, suspends once for the
//! network round-trip, then settles: on success the speculative rows are
//! reconciled with the server's canonical record, on failure the region is
//! restored from the pre-mutation snapshot and a failure notification is
//! recorded. Either way the region is invalidated at settle time so the
//! background refetch picks up any out-of-band change.
//!
//! Restoring the snapshot (rather than replaying an inverse operation) is
//! correct regardless of how complex the speculative patch was.

use std::sync::{Arc, Weak};

use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::{
    api::{ApiClientError, RegionTransport},
    cache::{QueryCache, RegionKey, entry_id},
    detail::DetailViewState,
    notify::NotificationCenter,
};

#[derive(Debug, Clone)]
pub enum MutationKind {
    Create { draft: Value },
    Update { id: String, patch: Value },
    Delete { id: String },
}

#[derive(Debug)]
pub enum MutationOutcome {
    /// Server confirmed; carries the canonical record (absent for delete).
    Reconciled(Option<Value>),
    /// Server or transport failed; the region was restored.
    RolledBack(ApiClientError),
}

impl MutationOutcome {
    pub fn is_reconciled(&self) -> bool {
        matches!(self, MutationOutcome::Reconciled(_))
    }
}

/// Runs mutations against one cache/transport pair.
///
/// Holds the detail-view state only weakly: when the owning UI is gone
/// before a mutation settles, UI-side effects are skipped while cache
/// updates still proceed.
pub struct MutationRunner {
    cache: Arc<QueryCache>,
    transport: Arc<dyn RegionTransport>,
    notifications: Arc<NotificationCenter>,
    detail: Weak<DetailViewState>,
}

impl MutationRunner {
    pub fn new(
        cache: Arc<QueryCache>,
        transport: Arc<dyn RegionTransport>,
        notifications: Arc<NotificationCenter>,
        detail: Weak<DetailViewState>,
    ) -> Self {
        Self {
            cache,
            transport,
            notifications,
            detail,
        }
    }

    /// Run one mutation to settlement.
    pub async fn run(&self, region: RegionKey, kind: MutationKind) -> MutationOutcome {
        let snapshot = self.cache.snapshot(&region);

        // Pending: apply the speculative change. One synchronous block, no
        // awaits until the transport call below.
        let temp_id = match &kind {
            MutationKind::Create { draft } => {
                let temp_id = format!("temp-{}", Uuid::new_v4());
                let mut entry = draft.clone();
                if let Value::Object(map) = &mut entry {
                    map.insert("id".to_string(), Value::String(temp_id.clone()));
                }
                self.cache.insert_first(&region, entry);
                Some(temp_id)
            }
            MutationKind::Update { id, patch } => {
                self.cache.merge_entry(&region, id, patch);
                None
            }
            MutationKind::Delete { id } => {
                self.cache.remove_entry(&region, id);
                if let Some(detail) = self.detail.upgrade() {
                    detail.close_if(&region, id);
                }
                None
            }
        };

        // The single suspension point of this mutation.
        let result = match &kind {
            MutationKind::Create { draft } => {
                self.transport.create(&region, draft).await.map(Some)
            }
            MutationKind::Update { id, patch } => {
                self.transport.update(&region, id, patch).await.map(Some)
            }
            MutationKind::Delete { id } => {
                self.transport.delete(&region, id).await.map(|_| None)
            }
        };

        let outcome = match result {
            Ok(canonical) => {
                self.reconcile(&region, &kind, temp_id.as_deref(), canonical.as_ref());
                debug!(org_id = %region.org_id, resource = %region.resource, "mutation reconciled");
                MutationOutcome::Reconciled(canonical)
            }
            Err(e) => {
                self.cache.restore(snapshot);
                self.notifications.notify(failure_title(&kind), &e.to_string());
                debug!(org_id = %region.org_id, resource = %region.resource, error = %e, "mutation rolled back");
                MutationOutcome::RolledBack(e)
            }
        };

        // Settle: invalidate regardless of outcome so a background refetch
        // reconverges the region with true server state.
        self.cache.invalidate(&region);
        outcome
    }

    fn reconcile(
        &self,
        region: &RegionKey,
        kind: &MutationKind,
        temp_id: Option<&str>,
        canonical: Option<&Value>,
    ) {
        match (kind, canonical) {
            (MutationKind::Create { .. }, Some(record)) => {
                let Some(temp_id) = temp_id else { return };
                if !self.cache.replace_entry(region, temp_id, record.clone()) {
                    // Speculative row vanished (e.g. a refetch wrote over
                    // it); the canonical record still belongs in the list.
                    self.cache.insert_first(region, record.clone());
                }
                if let (Some(detail), Some(new_id)) = (self.detail.upgrade(), entry_id(record)) {
                    detail.remap_id(region, temp_id, new_id);
                }
            }
            (MutationKind::Update { id, .. }, Some(record)) => {
                self.cache.replace_entry(region, id, record.clone());
            }
            _ => {}
        }
    }
}

fn failure_title(kind: &MutationKind) -> &'static str {
    match kind {
        MutationKind::Create { .. } => "Create failed",
        MutationKind::Update { .. } => "Update failed",
        MutationKind::Delete { .. } => "Delete failed",
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;
    use uuid::Uuid;

    use super::*;
    use crate::cache::Resource;

    /// Test transport that records the cache's rows at call time (the
    /// mid-flight speculative state) and optionally opens the detail view
    /// on the in-flight temporary row, like a user clicking into it.
    struct FakeTransport {
        cache: Arc<QueryCache>,
        detail: Arc<DetailViewState>,
        observed: Mutex<Option<Vec<Value>>>,
        fail: bool,
        respond_with: Option<Value>,
        open_detail_on_create: bool,
    }

    impl FakeTransport {
        fn observe(&self, region: &RegionKey) {
            let rows = self.cache.read(region);
            if self.open_detail_on_create {
                if let Some(first) = rows.as_deref().and_then(|r| r.first()) {
                    if let Some(id) = entry_id(first) {
                        self.detail.open(*region, id);
                    }
                }
            }
            if let Ok(mut observed) = self.observed.lock() {
                *observed = rows;
            }
        }

        fn observed(&self) -> Vec<Value> {
            self.observed.lock().unwrap().clone().unwrap_or_default()
        }

        fn failure() -> ApiClientError {
            ApiClientError::Http {
                status: 500,
                body: "boom".to_string(),
            }
        }
    }

    #[async_trait]
    impl RegionTransport for FakeTransport {
        async fn list(&self, _region: &RegionKey) -> Result<Vec<Value>, ApiClientError> {
            Ok(vec![])
        }

        async fn create(
            &self,
            region: &RegionKey,
            _body: &Value,
        ) -> Result<Value, ApiClientError> {
            self.observe(region);
            if self.fail {
                Err(Self::failure())
            } else {
                Ok(self.respond_with.clone().unwrap())
            }
        }

        async fn update(
            &self,
            region: &RegionKey,
            _id: &str,
            _body: &Value,
        ) -> Result<Value, ApiClientError> {
            self.observe(region);
            if self.fail {
                Err(Self::failure())
            } else {
                Ok(self.respond_with.clone().unwrap())
            }
        }

        async fn delete(&self, region: &RegionKey, _id: &str) -> Result<(), ApiClientError> {
            self.observe(region);
            if self.fail { Err(Self::failure()) } else { Ok(()) }
        }
    }

    struct Harness {
        cache: Arc<QueryCache>,
        notifications: Arc<NotificationCenter>,
        detail: Arc<DetailViewState>,
        transport: Arc<FakeTransport>,
        runner: MutationRunner,
        region: RegionKey,
    }

    fn harness(fail: bool, respond_with: Option<Value>) -> Harness {
        let cache = Arc::new(QueryCache::new());
        let notifications = Arc::new(NotificationCenter::new());
        let detail = Arc::new(DetailViewState::new());
        let transport = Arc::new(FakeTransport {
            cache: cache.clone(),
            detail: detail.clone(),
            observed: Mutex::new(None),
            fail,
            respond_with,
            open_detail_on_create: false,
        });
        let runner = MutationRunner::new(
            cache.clone(),
            transport.clone(),
            notifications.clone(),
            Arc::downgrade(&detail),
        );
        let region = RegionKey::new(Uuid::new_v4(), Resource::Students);
        Harness {
            cache,
            notifications,
            detail,
            transport,
            runner,
            region,
        }
    }

    fn seed(h: &Harness) -> Vec<Value> {
        let rows = vec![json!({"id": "a", "name": "Ada"}), json!({"id": "b", "name": "Bo"})];
        h.cache.write(h.region, rows.clone());
        rows
    }

    #[tokio::test]
    async fn test_create_failure_rolls_back_exactly_and_notifies() {
        let h = harness(true, None);
        let before = seed(&h);

        let outcome = h
            .runner
            .run(
                h.region,
                MutationKind::Create {
                    draft: json!({"name": "Cal"}),
                },
            )
            .await;

        // Mid-flight the optimistic row sat at the front.
        let observed = h.transport.observed();
        assert_eq!(observed.len(), 3);
        assert!(entry_id(&observed[0]).unwrap().starts_with("temp-"));
        assert_eq!(observed[0]["name"], "Cal");
        assert_eq!(&observed[1..], &before[..]);

        // Rolled back to exactly the pre-mutation state.
        assert!(matches!(outcome, MutationOutcome::RolledBack(_)));
        assert_eq!(h.cache.read(&h.region).unwrap(), before);
        assert!(h.cache.is_stale(&h.region));

        let notifications = h.notifications.recent();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].title, "Create failed");
    }

    #[tokio::test]
    async fn test_create_success_reconciles_temp_id_away() {
        let canonical = json!({"id": "srv-42", "name": "Cal"});
        let h = harness(false, Some(canonical.clone()));
        seed(&h);

        let outcome = h
            .runner
            .run(
                h.region,
                MutationKind::Create {
                    draft: json!({"name": "Cal"}),
                },
            )
            .await;

        assert!(outcome.is_reconciled());
        let rows = h.cache.read(&h.region).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], canonical);
        // The temporary id must not remain anywhere.
        assert!(
            rows.iter()
                .all(|r| !entry_id(r).unwrap_or_default().starts_with("temp-"))
        );
        assert!(h.cache.is_stale(&h.region));
        assert!(h.notifications.recent().is_empty());
    }

    #[tokio::test]
    async fn test_create_reconciliation_remaps_open_detail_view() {
        let h = harness(false, Some(json!({"id": "srv-42", "name": "Cal"})));
        seed(&h);
        // The fake opens the detail view on the in-flight temporary row.
        let transport = Arc::new(FakeTransport {
            cache: h.cache.clone(),
            detail: h.detail.clone(),
            observed: Mutex::new(None),
            fail: false,
            respond_with: Some(json!({"id": "srv-42", "name": "Cal"})),
            open_detail_on_create: true,
        });
        let runner = MutationRunner::new(
            h.cache.clone(),
            transport,
            h.notifications.clone(),
            Arc::downgrade(&h.detail),
        );

        runner
            .run(
                h.region,
                MutationKind::Create {
                    draft: json!({"name": "Cal"}),
                },
            )
            .await;

        assert_eq!(h.detail.current().unwrap().id, "srv-42");
    }

    #[tokio::test]
    async fn test_update_failure_restores_field_values_and_order() {
        let h = harness(true, None);
        let before = seed(&h);

        let outcome = h
            .runner
            .run(
                h.region,
                MutationKind::Update {
                    id: "a".to_string(),
                    patch: json!({"name": "Changed"}),
                },
            )
            .await;

        // The speculative merge was visible mid-flight.
        assert_eq!(h.transport.observed()[0]["name"], "Changed");

        assert!(matches!(outcome, MutationOutcome::RolledBack(_)));
        assert_eq!(h.cache.read(&h.region).unwrap(), before);
        assert_eq!(h.notifications.recent()[0].title, "Update failed");
    }

    #[tokio::test]
    async fn test_update_success_replaces_row_with_canonical_record() {
        let canonical = json!({"id": "a", "name": "Ada Lovelace", "notes": "server says"});
        let h = harness(false, Some(canonical.clone()));
        seed(&h);

        h.runner
            .run(
                h.region,
                MutationKind::Update {
                    id: "a".to_string(),
                    patch: json!({"name": "Ada Lovelace"}),
                },
            )
            .await;

        let rows = h.cache.read(&h.region).unwrap();
        assert_eq!(rows[0], canonical);
        assert_eq!(entry_id(&rows[1]), Some("b"));
    }

    #[tokio::test]
    async fn test_delete_success_closes_detail_view_and_marks_stale() {
        let h = harness(false, None);
        seed(&h);
        h.detail.open(h.region, "b");

        let outcome = h
            .runner
            .run(h.region, MutationKind::Delete { id: "b".to_string() })
            .await;

        // Removal and view close happened speculatively, before settle.
        assert_eq!(h.transport.observed().len(), 1);

        assert!(outcome.is_reconciled());
        let rows = h.cache.read(&h.region).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(entry_id(&rows[0]), Some("a"));
        assert!(h.detail.current().is_none());
        assert!(h.cache.is_stale(&h.region));
        assert!(h.notifications.recent().is_empty());
    }

    #[tokio::test]
    async fn test_delete_failure_restores_row_without_reopening_view() {
        let h = harness(true, None);
        let before = seed(&h);
        h.detail.open(h.region, "b");

        let outcome = h
            .runner
            .run(h.region, MutationKind::Delete { id: "b".to_string() })
            .await;

        assert!(matches!(outcome, MutationOutcome::RolledBack(_)));
        assert_eq!(h.cache.read(&h.region).unwrap(), before);
        // The speculatively-closed view stays closed.
        assert!(h.detail.current().is_none());
        assert_eq!(h.notifications.recent()[0].title, "Delete failed");
    }

    #[tokio::test]
    async fn test_unmounted_detail_view_skips_ui_effects_but_cache_proceeds() {
        let h = harness(false, None);
        seed(&h);

        let runner = MutationRunner::new(
            h.cache.clone(),
            h.transport.clone(),
            h.notifications.clone(),
            Weak::new(),
        );

        let outcome = runner
            .run(h.region, MutationKind::Delete { id: "b".to_string() })
            .await;

        assert!(outcome.is_reconciled());
        assert_eq!(h.cache.read(&h.region).unwrap().len(), 1);
    }
}
