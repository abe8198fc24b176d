//! The most recently computed trace of each event, kept for auditing.
//!
//! A caller computing standings is always handed its own trace; this cache
//! only serves later requests asking how the last ranking was decided. When
//! two computations race, whichever stores last wins.

use std::{collections::HashMap, sync::Arc};

use chrono::{NaiveDateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::tournaments::standings::compute::trace::TraceEntry;

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct CachedTrace {
    pub event_id: String,
    pub computed_at: NaiveDateTime,
    pub trace: Vec<TraceEntry>,
}

#[derive(Clone, Default)]
pub struct TraceCache {
    inner: Arc<RwLock<HashMap<String, CachedTrace>>>,
}

impl TraceCache {
    pub async fn store(&self, event_id: &str, trace: Vec<TraceEntry>) {
        let entry = CachedTrace {
            event_id: event_id.to_string(),
            computed_at: Utc::now().naive_utc(),
            trace,
        };
        self.inner.write().await.insert(event_id.to_string(), entry);
    }

    pub async fn latest(&self, event_id: &str) -> Option<CachedTrace> {
        self.inner.read().await.get(event_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn last_writer_wins() {
        let cache = TraceCache::default();
        assert_eq!(cache.latest("e1").await, None);

        cache
            .store(
                "e1",
                vec![TraceEntry::FinalRanking {
                    team_ids: vec!["A".to_string()],
                }],
            )
            .await;
        cache.store("e1", Vec::new()).await;

        let cached = cache.latest("e1").await.unwrap();
        assert_eq!(cached.event_id, "e1");
        assert!(cached.trace.is_empty());
        assert_eq!(cache.latest("e2").await, None);
    }
}
