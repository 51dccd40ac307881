//! Asset URL validation with result caching.
//!
//! A URL is checked for syntax, probed over HTTP (HEAD first), and
//! classified by status, content type and size. Every outcome is cached so
//! repeat checks are served without network traffic.

pub mod batch;
pub mod cache;
pub mod config;
pub mod core;
pub mod repair;
pub mod reporting;
pub mod ui;
pub mod validation;

// Re-export commonly used items
pub use batch::{BatchOrchestrator, BatchRequest, PendingValidation, SummaryResult, ValidateUrls};
pub use cache::{CacheStats, CacheStore, DurableCache, MemoryCache};
pub use config::{Config, ProbeOptions, RequestOverrides};
pub use crate::core::{Result, UrlProbeError, ValidationResult, ValidationStatus};
pub use repair::{DuplicateReport, Reconciler, RepairOutcome};
pub use validation::{ContentPolicy, ValidationEngine, has_valid_syntax};
