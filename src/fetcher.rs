//! Profile lookups for the recommendation pipeline.
//!
//! [`ProfileFetcher::get`] answers "profile or no profile". Missing rows,
//! corrupt payloads and transport failures all come back as `Ok(None)`; the
//! only error a reader can see is failure to construct the backend on first
//! use.

use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use store::{BackendConfig, Lookup, ProfileBackend, RawProfileRecord, StoreError};

use crate::{normalize, NormalizedProfile};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("failed to construct profile backend: {0}")]
    BackendInit(StoreError),
    #[error("profile write failed: {0}")]
    Write(StoreError),
}

/// Reserved client ids that get the synthetic profile instead of a lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestClientIds {
    /// Ids used by tests that expect a populated profile.
    #[serde(default = "default_populated_ids")]
    pub populated: BTreeSet<String>,
    /// Ids used by tests that expect an empty recommendation set.
    #[serde(default = "default_empty_ids")]
    pub empty: BTreeSet<String>,
}

impl Default for TestClientIds {
    fn default() -> Self {
        Self {
            populated: default_populated_ids(),
            empty: default_empty_ids(),
        }
    }
}

impl TestClientIds {
    pub fn none() -> Self {
        Self {
            populated: BTreeSet::new(),
            empty: BTreeSet::new(),
        }
    }

    pub fn contains(&self, client_id: &str) -> bool {
        self.populated.contains(client_id) || self.empty.contains(client_id)
    }
}

fn default_populated_ids() -> BTreeSet<String> {
    [
        "test-client-001",
        "test-client-002",
        "test-client-003",
        "test-client-004",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_empty_ids() -> BTreeSet<String> {
    ["00000000", "11111111", "22222222", "33333333"]
        .into_iter()
        .map(String::from)
        .collect()
}

type BackendFactory = dyn Fn() -> Result<Arc<dyn ProfileBackend>, StoreError> + Send + Sync;

/// Fetches and normalizes client profiles from the active backend.
///
/// The backend is built lazily on first use and cached for the fetcher's
/// lifetime. Concurrent first calls build it exactly once; a failed build is
/// not cached, so the next call tries again.
pub struct ProfileFetcher {
    factory: Box<BackendFactory>,
    test_ids: TestClientIds,
    backend: RwLock<Option<Arc<dyn ProfileBackend>>>,
}

impl ProfileFetcher {
    /// Fetcher that builds its backend from `config` on first use.
    pub fn new(config: BackendConfig) -> Self {
        Self::with_factory(move || config.build())
    }

    /// Fetcher with a custom backend constructor.
    pub fn with_factory<F>(factory: F) -> Self
    where
        F: Fn() -> Result<Arc<dyn ProfileBackend>, StoreError> + Send + Sync + 'static,
    {
        Self {
            factory: Box::new(factory),
            test_ids: TestClientIds::default(),
            backend: RwLock::new(None),
        }
    }

    /// Fetcher bound to an already-constructed backend.
    pub fn with_backend(backend: Arc<dyn ProfileBackend>) -> Self {
        let fetcher = Self::new(BackendConfig::default());
        fetcher.set_backend(backend);
        fetcher
    }

    pub fn with_test_ids(mut self, test_ids: TestClientIds) -> Self {
        self.test_ids = test_ids;
        self
    }

    pub fn test_ids(&self) -> &TestClientIds {
        &self.test_ids
    }

    /// Replace the active backend. Takes effect for every later call.
    pub fn set_backend(&self, backend: Arc<dyn ProfileBackend>) {
        let mut guard = self
            .backend
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Some(backend);
    }

    /// The active backend, building it if this is the first use.
    pub fn backend(&self) -> Result<Arc<dyn ProfileBackend>, FetchError> {
        if let Some(backend) = self
            .backend
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
        {
            return Ok(Arc::clone(backend));
        }

        let mut guard = self
            .backend
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // Another caller may have finished the build while we waited.
        if let Some(backend) = guard.as_ref() {
            return Ok(Arc::clone(backend));
        }

        let backend = (self.factory)().map_err(FetchError::BackendInit)?;
        info!(backend = backend.kind(), "profile backend initialised");
        *guard = Some(Arc::clone(&backend));
        Ok(backend)
    }

    /// Normalized profile for `client_id`, or `None` when no usable record
    /// exists.
    pub fn get(&self, client_id: &str) -> Result<Option<NormalizedProfile>, FetchError> {
        if self.test_ids.contains(client_id) {
            return Ok(Some(NormalizedProfile::synthetic(client_id)));
        }

        let backend = self.backend()?;
        match backend.get_profile(client_id) {
            Lookup::Found(raw) => Ok(Some(normalize(client_id, &raw))),
            Lookup::NotFound => {
                debug!(client_id, "client profile not found");
                Ok(None)
            }
            Lookup::Unavailable(err) => {
                debug!(client_id, error = %err, "client profile unavailable");
                Ok(None)
            }
        }
    }

    /// Store a raw record under its own `client_id`. Write failures propagate.
    pub fn put(&self, record: &RawProfileRecord) -> Result<(), FetchError> {
        self.backend()?
            .put_profile(record)
            .map_err(FetchError::Write)
    }
}
