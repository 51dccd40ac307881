//! Batch validation
//!
//! `BatchOrchestrator` fans a list of URLs out over the shared
//! `ValidationEngine`, consulting the cache first and honouring exclusion
//! patterns. Results always come back in input order.

pub mod summary;

use async_trait::async_trait;
use futures::{StreamExt, stream};
use log::{debug, warn};
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::cache::{CacheStore, open_cache};
use crate::config::{Config, ProbeOptions, RequestOverrides};
use crate::core::constants::error_messages;
use crate::core::error::{Result, UrlProbeError};
use crate::core::types::ValidationResult;
use crate::reporting::logging;
use crate::ui::progress::ProgressReporter;
use crate::validation::engine::ValidationEngine;

pub use summary::SummaryResult;

/// Inbound batch: ordered URLs plus optional probe overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    pub urls: Vec<String>,
    #[serde(flatten)]
    pub overrides: RequestOverrides,
}

impl BatchRequest {
    pub fn new(urls: Vec<String>) -> Self {
        Self {
            urls,
            overrides: RequestOverrides::default(),
        }
    }

    pub fn from_json(body: &str) -> Result<Self> {
        Ok(serde_json::from_str(body)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }
}

#[async_trait]
pub trait ValidateUrls {
    async fn validate_urls(
        &self,
        urls: &[String],
        options: &ProbeOptions,
        progress: Option<&ProgressReporter>,
    ) -> Result<Vec<ValidationResult>>;
}

/// Handle to a validation started by `BatchOrchestrator::validate_async`.
///
/// Dropping a `Spawned` handle detaches the probe; it still runs to
/// completion and writes its result to the cache.
#[derive(Debug)]
pub enum PendingValidation {
    Ready(ValidationResult),
    Spawned {
        url: String,
        handle: JoinHandle<ValidationResult>,
    },
}

impl PendingValidation {
    pub fn is_ready(&self) -> bool {
        match self {
            Self::Ready(_) => true,
            Self::Spawned { handle, .. } => handle.is_finished(),
        }
    }

    /// Stop the in-flight probe, if any. `wait` then yields `Cancelled`.
    pub fn abort(&self) {
        if let Self::Spawned { handle, .. } = self {
            handle.abort();
        }
    }

    pub async fn wait(self) -> ValidationResult {
        match self {
            Self::Ready(result) => result,
            Self::Spawned { url, handle } => match handle.await {
                Ok(result) => result,
                Err(err) => {
                    warn!("Validation of {url} did not complete: {err}");
                    ValidationResult::cancelled(url)
                }
            },
        }
    }
}

pub struct BatchOrchestrator {
    engine: Arc<ValidationEngine>,
    cache: Arc<dyn CacheStore>,
    default_options: ProbeOptions,
    max_batch_size: usize,
    exclude_patterns: Vec<Regex>,
}

impl BatchOrchestrator {
    pub fn new(
        engine: ValidationEngine,
        default_options: ProbeOptions,
        max_batch_size: usize,
    ) -> Self {
        let cache = Arc::clone(engine.cache());
        Self {
            engine: Arc::new(engine),
            cache,
            default_options,
            max_batch_size,
            exclude_patterns: Vec::new(),
        }
    }

    /// Wire the cache, engine and limits described by `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        let cache = open_cache(config)?;
        let engine = ValidationEngine::from_config(config, cache)?;
        Ok(
            Self::new(engine, config.probe_options(), config.max_batch_size())
                .with_exclude_patterns(config.compile_exclude_patterns()?),
        )
    }

    pub fn with_exclude_patterns(mut self, patterns: Vec<Regex>) -> Self {
        self.exclude_patterns = patterns;
        self
    }

    pub fn engine(&self) -> &ValidationEngine {
        &self.engine
    }

    pub fn cache(&self) -> &Arc<dyn CacheStore> {
        &self.cache
    }

    pub fn default_options(&self) -> &ProbeOptions {
        &self.default_options
    }

    /// Default options with `overrides` applied and bounds-checked
    pub fn options_for(&self, overrides: &RequestOverrides) -> Result<ProbeOptions> {
        self.default_options.with_overrides(overrides)
    }

    /// Validate every URL of `urls`, in input order.
    ///
    /// Empty and oversized batches are rejected before any I/O.
    pub async fn validate_batch(
        &self,
        urls: &[String],
        options: &ProbeOptions,
    ) -> Result<Vec<ValidationResult>> {
        self.validate_urls(urls, options, None).await
    }

    pub async fn validate_request(&self, request: &BatchRequest) -> Result<Vec<ValidationResult>> {
        let options = self.options_for(&request.overrides)?;
        self.validate_batch(&request.urls, &options).await
    }

    pub async fn validate_summary(
        &self,
        urls: &[String],
        options: &ProbeOptions,
    ) -> Result<SummaryResult> {
        let results = self.validate_batch(urls, options).await?;
        Ok(SummaryResult::aggregate(&results, self.engine.policy()))
    }

    /// Awaited single-URL validation through the cache.
    pub async fn validate_url(&self, url: &str, options: &ProbeOptions) -> Result<ValidationResult> {
        let client = self.engine.build_client(options)?;
        Ok(self.resolve(&client, url, options).await.0)
    }

    /// Start validating `url` without waiting for the probe.
    ///
    /// A live cache hit (or an excluded URL) resolves immediately; otherwise
    /// the probe runs on a spawned tokio task. Must be called from within a
    /// tokio runtime.
    pub fn validate_async(&self, url: &str, options: &ProbeOptions) -> PendingValidation {
        if let Some(result) = self.excluded(url).or_else(|| self.cached(url)) {
            return PendingValidation::Ready(result);
        }

        let engine = Arc::clone(&self.engine);
        let task_url = url.to_string();
        let options = options.clone();
        let handle = tokio::spawn(async move { engine.validate(&task_url, &options).await });
        PendingValidation::Spawned {
            url: url.to_string(),
            handle,
        }
    }

    fn check_batch_size(&self, count: usize) -> Result<()> {
        if count == 0 {
            return Err(UrlProbeError::EmptyBatch);
        }
        if count > self.max_batch_size {
            return Err(UrlProbeError::BatchTooLarge {
                size: count,
                max: self.max_batch_size,
            });
        }
        Ok(())
    }

    fn excluded(&self, url: &str) -> Option<ValidationResult> {
        self.exclude_patterns
            .iter()
            .any(|pattern| pattern.is_match(url))
            .then(|| ValidationResult::skipped(url, error_messages::EXCLUDED))
    }

    fn cached(&self, url: &str) -> Option<ValidationResult> {
        match self.cache.lookup(url) {
            Ok(hit) => hit,
            Err(err) => {
                warn!("Cache lookup for {url} failed, probing instead: {err}");
                None
            }
        }
    }

    /// Result for one URL and whether it came from the cache
    async fn resolve(
        &self,
        client: &Client,
        url: &str,
        options: &ProbeOptions,
    ) -> (ValidationResult, bool) {
        if let Some(skipped) = self.excluded(url) {
            debug!("Skipping excluded URL {url}");
            return (skipped, false);
        }
        if let Some(hit) = self.cached(url) {
            debug!("Cache hit for {url}");
            return (hit, true);
        }
        (self.engine.validate_with_client(client, url, options).await, false)
    }
}

#[async_trait]
impl ValidateUrls for BatchOrchestrator {
    async fn validate_urls(
        &self,
        urls: &[String],
        options: &ProbeOptions,
        progress: Option<&ProgressReporter>,
    ) -> Result<Vec<ValidationResult>> {
        self.check_batch_size(urls.len())?;

        let client = self.engine.build_client(options)?;
        let started = Instant::now();
        logging::log_batch_start(urls.len(), options.parallel);
        if let Some(progress) = progress {
            progress.start_validation(urls.len());
        }

        let mut cache_hits = 0;
        let results = if options.parallel {
            let mut slots: Vec<Option<ValidationResult>> = vec![None; urls.len()];
            let client = &client;
            let pending: Vec<_> = urls
                .iter()
                .enumerate()
                .map(|(index, url)| async move {
                    (index, self.resolve(client, url, options).await)
                })
                .collect();
            let mut resolved = stream::iter(pending).buffer_unordered(urls.len());

            let mut done = 0;
            while let Some((index, (result, from_cache))) = resolved.next().await {
                cache_hits += usize::from(from_cache);
                slots[index] = Some(result);
                done += 1;
                if let Some(progress) = progress {
                    progress.update(done);
                }
            }

            slots
                .into_iter()
                .zip(urls)
                .map(|(slot, url)| slot.unwrap_or_else(|| ValidationResult::cancelled(url.as_str())))
                .collect()
        } else {
            let mut results = Vec::with_capacity(urls.len());
            for url in urls {
                let (result, from_cache) = self.resolve(&client, url, options).await;
                cache_hits += usize::from(from_cache);
                results.push(result);
                if let Some(progress) = progress {
                    progress.update(results.len());
                }
            }
            results
        };

        let valid = results.iter().filter(|result| result.is_ok()).count();
        if let Some(progress) = progress {
            progress.finish_validation(valid, results.len());
        }
        logging::log_batch_complete(
            results.len(),
            valid,
            cache_hits,
            started.elapsed().as_millis(),
        );

        Ok(results)
    }
}
