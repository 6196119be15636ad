//! # Application State
//!
//! Shared handles every handler sees: configuration, the compliance
//! pipeline (when a backend is configured), and the per-seller hash chains.
//!
//! Chain updates are serialized per seller: building an invoice reads the
//! chain head and recording its hash advances it, and another request for
//! the same seller must not interleave between the two. Different sellers
//! proceed in parallel.
//!
//! Every handler keys chains and locks by [`seller_key`], so `"s1 "` and
//! `"s1"` name the same chain on every route.

use std::collections::HashMap;
use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use parking_lot::Mutex;
use tokio::sync::OwnedMutexGuard;
use zatca_core::HashChainTracker;
use zatca_pipeline::Pipeline;

use crate::config::AppConfig;
use crate::error::AppError;

/// Canonical chain key for a seller identifier: surrounding whitespace removed.
///
/// # Errors
///
/// [`AppError::Validation`] when nothing is left after trimming.
pub fn seller_key(raw: &str) -> Result<String, AppError> {
    let key = raw.trim();
    if key.is_empty() {
        return Err(AppError::Validation("sellerId must not be empty".to_string()));
    }
    Ok(key.to_string())
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Resolved configuration.
    pub config: Arc<AppConfig>,
    /// Per-seller invoice chains.
    pub chains: Arc<HashChainTracker>,
    pipeline: Option<Arc<Pipeline>>,
    seller_locks: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
    metrics: Option<PrometheusHandle>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("pipeline", &self.pipeline.as_ref().map(|p| p.backend_name().to_string()))
            .field("sellers_locked", &self.seller_locks.lock().len())
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}

impl AppState {
    /// State with default configuration and no backend.
    pub fn new() -> Self {
        Self::from_config(AppConfig::default())
    }

    /// State for `config`; the pipeline is built from its backend settings.
    pub fn from_config(config: AppConfig) -> Self {
        let chains = HashChainTracker::with_genesis_hash(config.genesis_hash.clone());
        let pipeline = config
            .backend
            .clone()
            .map(|backend| Arc::new(Pipeline::from_config(backend)));
        Self {
            config: Arc::new(config),
            chains: Arc::new(chains),
            pipeline,
            seller_locks: Arc::new(Mutex::new(HashMap::new())),
            metrics: None,
        }
    }

    /// Replace the pipeline.
    pub fn with_pipeline(mut self, pipeline: Pipeline) -> Self {
        self.pipeline = Some(Arc::new(pipeline));
        self
    }

    /// Attach the Prometheus handle served at `/metrics`.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// The compliance pipeline.
    ///
    /// # Errors
    ///
    /// [`AppError::ServiceUnavailable`] when no backend is configured.
    pub fn pipeline(&self) -> Result<&Pipeline, AppError> {
        self.pipeline.as_deref().ok_or_else(|| {
            AppError::ServiceUnavailable("compliance backend is not configured".to_string())
        })
    }

    /// The Prometheus handle, if metrics are installed.
    pub fn metrics(&self) -> Option<&PrometheusHandle> {
        self.metrics.as_ref()
    }

    /// Take the chain lock for `seller_id`, waiting for any holder.
    ///
    /// `seller_id` must come from [`seller_key`].
    pub async fn lock_seller(&self, seller_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.seller_locks.lock();
            locks
                .entry(seller_id.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
