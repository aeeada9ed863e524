use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use parking_lot::Mutex;

use super::Utterance;

/// Upper bound on the number of calls kept in memory.
const MAX_TRACKED_CALLS: u64 = 10_000;

type CallLog = Arc<Mutex<Vec<Utterance>>>;

/// Per-call transcript lists keyed `transcript:{call_id}`.
///
/// Entries expire `ttl` after the call's first utterance.
#[derive(Clone)]
pub struct TranscriptStore {
    cache: Cache<String, CallLog>,
}

impl TranscriptStore {
    pub fn new(ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(MAX_TRACKED_CALLS)
            .time_to_live(ttl)
            .build();
        Self { cache }
    }

    fn key(call_id: &str) -> String {
        format!("transcript:{call_id}")
    }

    /// Append to the end of the call's list.
    pub async fn append(&self, utterance: Utterance) {
        let log = self
            .cache
            .get_with(Self::key(&utterance.call_id), async {
                Arc::new(Mutex::new(Vec::new()))
            })
            .await;
        log.lock().push(utterance);
    }

    /// Every utterance recorded for the call, oldest first.
    pub async fn range(&self, call_id: &str) -> Vec<Utterance> {
        match self.cache.get(&Self::key(call_id)).await {
            Some(log) => log.lock().clone(),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transcript::Role;

    #[tokio::test]
    async fn test_append_and_range_preserve_order() {
        let store = TranscriptStore::new(Duration::from_secs(60));
        store.append(Utterance::new(Role::User, "hi", "c1")).await;
        store.append(Utterance::new(Role::Agent, "hello", "c1")).await;
        store.append(Utterance::new(Role::User, "other call", "c2")).await;

        let c1 = store.range("c1").await;
        assert_eq!(c1.len(), 2);
        assert_eq!(c1[0].content, "hi");
        assert_eq!(c1[1].role, Role::Agent);
        assert_eq!(store.range("c2").await.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_call_is_empty() {
        let store = TranscriptStore::new(Duration::from_secs(60));
        assert!(store.range("nope").await.is_empty());
    }
}
