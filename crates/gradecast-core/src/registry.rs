//! # Model Registry
//!
//! Lazily loaded, process-lifetime cache of trained artifacts.
//!
//! The registry owns the [`ModelProvider`] it was built with. Each
//! [`ModelVariantKey`] gets its own slot: the first request for a key loads
//! while holding only that slot's lock, so concurrent requests for the same
//! key wait for one load and unrelated keys load in parallel. Failed loads
//! leave the slot empty.

use crate::error::{PredictError, PredictResult};
use crate::features::FeatureVector;
use crate::selector::ModelVariantKey;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

// =============================================================================
// MODEL
// =============================================================================

/// What a trained artifact declares about its inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Identifying name of the artifact.
    pub name: String,
    /// Features the builder must produce, in order.
    pub expected_features: Vec<String>,
    /// Full input layout when the model consumes a superset.
    #[serde(default)]
    pub all_features: Option<Vec<String>>,
    /// Whether the artifact imputes the missing sentinel itself.
    #[serde(default)]
    pub tolerates_missing: bool,
}

impl ModelMetadata {
    /// Check the declared layout is usable.
    pub fn validate(&self) -> PredictResult<()> {
        let invalid = |reason: String| PredictError::InvalidArtifact {
            artifact: self.name.clone(),
            reason,
        };

        if self.expected_features.is_empty() {
            return Err(invalid("no expected features".into()));
        }

        let mut seen = BTreeSet::new();
        for name in &self.expected_features {
            if !seen.insert(name.as_str()) {
                return Err(invalid(format!("feature '{}' listed twice", name)));
            }
        }

        if let Some(all) = &self.all_features {
            let superset: BTreeSet<&str> = all.iter().map(String::as_str).collect();
            if superset.len() != all.len() {
                return Err(invalid("superset lists a feature twice".into()));
            }
            if let Some(outside) = self
                .expected_features
                .iter()
                .find(|f| !superset.contains(f.as_str()))
            {
                return Err(invalid(format!(
                    "expected feature '{}' is not in the superset",
                    outside
                )));
            }
        }
        Ok(())
    }
}

/// An opaque trained function from feature vector to grade.
pub trait Model: Send + Sync {
    /// Declared input layout.
    fn metadata(&self) -> &ModelMetadata;

    /// Predict a grade. The vector follows `all_features` when declared,
    /// `expected_features` otherwise.
    fn predict(&self, features: &FeatureVector) -> PredictResult<f64>;
}

/// Shared handle to a loaded model.
pub type SharedModel = Arc<dyn Model>;

/// Loads artifacts by key. Loading may be slow; the registry caches results.
pub trait ModelProvider: Send + Sync {
    /// Load the artifact for a key.
    ///
    /// Fails with `UnknownSubject` or `ArtifactNotFound`.
    fn load(&self, key: &ModelVariantKey) -> PredictResult<SharedModel>;
}

// =============================================================================
// STATIC PROVIDER
// =============================================================================

/// Provider over models registered in memory.
#[derive(Default, Clone)]
pub struct StaticModelProvider {
    models: BTreeMap<ModelVariantKey, SharedModel>,
}

impl StaticModelProvider {
    /// Create an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model under a key.
    #[must_use]
    pub fn with_model(mut self, key: ModelVariantKey, model: SharedModel) -> Self {
        self.models.insert(key, model);
        self
    }
}

impl ModelProvider for StaticModelProvider {
    fn load(&self, key: &ModelVariantKey) -> PredictResult<SharedModel> {
        if let Some(model) = self.models.get(key) {
            return Ok(Arc::clone(model));
        }
        if self.models.keys().any(|k| k.subject == key.subject) {
            Err(PredictError::ArtifactNotFound {
                artifact: key.to_string(),
            })
        } else {
            let known: BTreeSet<&str> = self.models.keys().map(|k| k.subject.as_str()).collect();
            Err(PredictError::UnknownSubject {
                subject: key.subject.clone(),
                expected: known.into_iter().collect::<Vec<_>>().join(", "),
            })
        }
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

type Slot = Arc<Mutex<Option<SharedModel>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // Slots only ever hold fully constructed values, so a poisoned lock
    // still guards consistent data.
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Statistics about registry usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    /// Keys currently holding a loaded model.
    pub loaded: usize,
    /// Requests served from cache.
    pub hits: u64,
    /// Successful provider loads.
    pub loads: u64,
    /// Failed provider loads.
    pub failures: u64,
    /// Hit rate as integer percentage (0-100).
    pub hit_rate_percent: u8,
}

/// Per-key synchronized cache in front of a [`ModelProvider`].
pub struct ModelRegistry {
    provider: Box<dyn ModelProvider>,
    slots: Mutex<BTreeMap<ModelVariantKey, Slot>>,
    hits: AtomicU64,
    loads: AtomicU64,
    failures: AtomicU64,
}

impl ModelRegistry {
    /// Create a registry over a provider.
    #[must_use]
    pub fn new(provider: impl ModelProvider + 'static) -> Self {
        Self {
            provider: Box::new(provider),
            slots: Mutex::new(BTreeMap::new()),
            hits: AtomicU64::new(0),
            loads: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        }
    }

    fn slot(&self, key: &ModelVariantKey) -> Slot {
        let mut slots = lock(&self.slots);
        Arc::clone(slots.entry(key.clone()).or_default())
    }

    /// Get the model for a key, loading it on first use.
    pub fn get(&self, key: &ModelVariantKey) -> PredictResult<SharedModel> {
        let slot = self.slot(key);
        let mut guard = lock(&slot);

        if let Some(model) = guard.as_ref() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(key = %key, "model cache hit");
            return Ok(Arc::clone(model));
        }

        let loaded = self
            .provider
            .load(key)
            .and_then(|model| model.metadata().validate().map(|()| model));

        match loaded {
            Ok(model) => {
                self.loads.fetch_add(1, Ordering::Relaxed);
                info!(
                    key = %key,
                    artifact = %model.metadata().name,
                    features = model.metadata().expected_features.len(),
                    "model loaded"
                );
                *guard = Some(Arc::clone(&model));
                Ok(model)
            }
            Err(err) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                warn!(key = %key, error = %err, "model load failed");
                Err(err)
            }
        }
    }

    /// Load a set of keys up front, stopping at the first failure.
    pub fn preload<'a>(&self, keys: impl IntoIterator<Item = &'a ModelVariantKey>) -> PredictResult<usize> {
        let mut count = 0;
        for key in keys {
            self.get(key)?;
            count += 1;
        }
        Ok(count)
    }

    /// Check whether a key is loaded, without loading it.
    #[must_use]
    pub fn is_loaded(&self, key: &ModelVariantKey) -> bool {
        let slot = lock(&self.slots).get(key).cloned();
        slot.is_some_and(|s| lock(&s).is_some())
    }

    /// Keys with a loaded model (deterministic order).
    #[must_use]
    pub fn loaded_keys(&self) -> Vec<ModelVariantKey> {
        let slots: Vec<(ModelVariantKey, Slot)> = lock(&self.slots)
            .iter()
            .map(|(k, s)| (k.clone(), Arc::clone(s)))
            .collect();
        slots
            .into_iter()
            .filter(|(_, s)| lock(s).is_some())
            .map(|(k, _)| k)
            .collect()
    }

    /// Drop one cached model so the next request reloads it.
    pub fn evict(&self, key: &ModelVariantKey) -> bool {
        lock(&self.slots).remove(key).is_some()
    }

    /// Drop every cached model. Statistics are kept.
    pub fn clear(&self) {
        lock(&self.slots).clear();
    }

    /// Usage statistics.
    #[must_use]
    pub fn stats(&self) -> RegistryStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let loads = self.loads.load(Ordering::Relaxed);
        let failures = self.failures.load(Ordering::Relaxed);
        let total = hits.saturating_add(loads).saturating_add(failures);
        let hit_rate_percent = if total == 0 {
            0
        } else {
            (hits.saturating_mul(100) / total) as u8
        };
        RegistryStats {
            loaded: self.loaded_keys().len(),
            hits,
            loads,
            failures,
            hit_rate_percent,
        }
    }
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("stats", &self.stats())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================
