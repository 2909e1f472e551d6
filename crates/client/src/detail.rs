//! Tracks the currently open detail view.
//!
//! Mutations hold this state only through a `Weak` handle: when the owning
//! UI has been dropped before a mutation settles, the mutation's UI-side
//! effects are skipped while its cache updates still go through.

use std::sync::Mutex;

use crate::cache::RegionKey;

#[derive(Debug, Clone, PartialEq)]
pub struct OpenDetail {
    pub region: RegionKey,
    pub id: String,
}

/// At most one detail view is open at a time.
#[derive(Debug, Default)]
pub struct DetailViewState {
    current: Mutex<Option<OpenDetail>>,
}

impl DetailViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self, region: RegionKey, id: impl Into<String>) {
        if let Ok(mut current) = self.current.lock() {
            *current = Some(OpenDetail {
                region,
                id: id.into(),
            });
        }
    }

    pub fn current(&self) -> Option<OpenDetail> {
        self.current.lock().ok().and_then(|c| c.clone())
    }

    /// Close the view if it is showing the given record.
    pub fn close_if(&self, region: &RegionKey, id: &str) {
        if let Ok(mut current) = self.current.lock() {
            if current
                .as_ref()
                .is_some_and(|open| open.region == *region && open.id == id)
            {
                *current = None;
            }
        }
    }

    /// Re-point the view at a record's new id, used when a temporary id is
    /// reconciled to the server-assigned one.
    pub fn remap_id(&self, region: &RegionKey, old_id: &str, new_id: &str) {
        if let Ok(mut current) = self.current.lock() {
            if let Some(open) = current.as_mut() {
                if open.region == *region && open.id == old_id {
                    open.id = new_id.to_string();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::cache::Resource;

    #[test]
    fn test_close_if_only_matches_target() {
        let state = DetailViewState::new();
        let region = RegionKey::new(Uuid::new_v4(), Resource::Students);
        state.open(region, "a");

        state.close_if(&region, "b");
        assert!(state.current().is_some());

        state.close_if(&region, "a");
        assert!(state.current().is_none());
    }

    #[test]
    fn test_remap_id_updates_open_view() {
        let state = DetailViewState::new();
        let region = RegionKey::new(Uuid::new_v4(), Resource::Categories);
        state.open(region, "temp-1");

        state.remap_id(&region, "temp-1", "srv-42");
        assert_eq!(state.current().unwrap().id, "srv-42");
    }
}
