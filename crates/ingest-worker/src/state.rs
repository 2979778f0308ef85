//! Shared worker state: DB handle, embedder, config, and the bounded-concurrency
//! admission set (§4.7, §6).

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use ingest_config::IngestConfig;
use ingest_db::IngestDb;
use ingest_embed::{Embedder, HttpEmbedder, LocalEmbedder};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<IngestDb>,
    pub embedder: Arc<dyn Embedder>,
    pub config: Arc<IngestConfig>,
    active_runs: Arc<Mutex<HashSet<String>>>,
}

impl AppState {
    #[must_use]
    pub fn new(db: Arc<IngestDb>, config: Arc<IngestConfig>) -> Self {
        let embedder: Arc<dyn Embedder> = match &config.embedder_endpoint {
            Some(url) => Arc::new(HttpEmbedder::new(url.clone())),
            None => Arc::new(LocalEmbedder::new()),
        };
        Self { db, embedder, config, active_runs: Arc::new(Mutex::new(HashSet::new())) }
    }

    /// Count of currently processing runs.
    pub fn active_count(&self) -> usize {
        self.active_runs.lock().expect("active run set mutex poisoned").len()
    }

    /// Admit `run_id` into the active set if a slot is free. Returns `false`
    /// (and admits nothing) if the pool is already at `worker_max_concurrent`.
    pub fn try_admit(&self, run_id: &str) -> bool {
        let mut guard = self.active_runs.lock().expect("active run set mutex poisoned");
        if guard.len() >= self.config.worker_max_concurrent {
            return false;
        }
        guard.insert(run_id.to_string());
        true
    }

    /// Release `run_id` from the active set once its job has reached a terminal state.
    pub fn release(&self, run_id: &str) {
        self.active_runs.lock().expect("active run set mutex poisoned").remove(run_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_state(max_concurrent: usize) -> AppState {
        let db = Arc::new(IngestDb::open_local(":memory:").await.unwrap());
        let mut config = IngestConfig::default();
        config.worker_max_concurrent = max_concurrent;
        AppState::new(db, Arc::new(config))
    }

    #[tokio::test]
    async fn admits_up_to_the_configured_limit_then_rejects() {
        let state = test_state(2).await;
        assert!(state.try_admit("run-1"));
        assert!(state.try_admit("run-2"));
        assert!(!state.try_admit("run-3"));
        assert_eq!(state.active_count(), 2);
    }

    #[tokio::test]
    async fn releasing_a_run_frees_its_slot() {
        let state = test_state(1).await;
        assert!(state.try_admit("run-1"));
        assert!(!state.try_admit("run-2"));
        state.release("run-1");
        assert!(state.try_admit("run-2"));
    }
}
