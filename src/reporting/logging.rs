use crate::cache::CacheStats;
use crate::config::{Config, ProbeOptions};
use crate::core::types::{ValidationResult, ValidationStatus};
use crate::repair::{DuplicateReport, RepairOutcome};
use log::{debug, error, info, warn};

/// Initialize the logger with appropriate level based on verbosity
pub fn init_logger(verbose: bool, quiet: bool) {
    let level = if quiet {
        log::LevelFilter::Off
    } else if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };

    // A second initialization (tests, embedding) keeps the first logger
    let _ = env_logger::Builder::from_default_env()
        .filter_level(level)
        .format_module_path(false)
        .format_target(false)
        .try_init();

    debug!("Logger initialized with level: {level:?}");
}

/// Log configuration information
pub fn log_config_info(config: &Config, options: &ProbeOptions, backend: &str) {
    info!(
        "Probe: connect_timeout={}ms, socket_timeout={}ms, follow_redirects={}, max_redirects={}",
        options.connect_timeout.as_millis(),
        options.socket_timeout.as_millis(),
        options.follow_redirects,
        options.max_redirects
    );
    info!(
        "Batch: max_size={}, parallel={}, validate_content_type={}",
        config.max_batch_size(),
        options.parallel,
        options.validate_content_type
    );
    info!(
        "Cache: backend={backend}, ttl={}s",
        config.cache_ttl().as_secs()
    );
}

/// Log the outcome of one probe
pub fn log_probe_result(result: &ValidationResult) {
    match (result.status, &result.error) {
        (ValidationStatus::Success, _) => debug!(
            "✓ {} -> {} {} ({}ms)",
            result.url,
            result.status_code,
            result.content_type.as_deref().unwrap_or("-"),
            result.response_time_ms
        ),
        (status, Some(reason)) => debug!("✗ {} -> {status}: {reason}", result.url),
        (status, None) => debug!("? {} -> {status}", result.url),
    }
}

/// Log batch start
pub fn log_batch_start(url_count: usize, parallel: bool) {
    let mode = if parallel { "parallel" } else { "sequential" };
    info!("Starting {mode} validation of {url_count} URL(s)");
}

/// Log batch completion
pub fn log_batch_complete(total: usize, valid: usize, cache_hits: usize, duration_ms: u128) {
    if valid == total {
        info!("✅ Batch complete: {valid}/{total} URLs valid, {cache_hits} from cache ({duration_ms}ms)");
    } else {
        warn!(
            "❌ Batch complete: {valid}/{total} URLs valid, {} issues, {cache_hits} from cache ({duration_ms}ms)",
            total - valid
        );
    }
}

/// Log cache counters
pub fn log_cache_stats(backend: &str, stats: &CacheStats) {
    info!(
        "Cache ({backend}): {} entries, {} expired",
        stats.size, stats.expired_count
    );
}

/// Log a duplicate analysis
pub fn log_duplicate_report(project: &str, report: &DuplicateReport) {
    info!(
        "Project '{project}': {} rows, {} unique URLs, {} duplicates",
        report.total_urls, report.unique_urls, report.total_duplicates
    );
}

/// Log the outcome of a dataset repair
pub fn log_repair_outcome(project: &str, outcome: &RepairOutcome) {
    if outcome.success {
        info!(
            "Repaired '{project}': {} -> {} rows ({} removed)",
            outcome.before, outcome.after, outcome.removed
        );
    } else {
        warn!("Repair of '{project}' did not complete");
    }
}

/// Log error information
pub fn log_error(message: &str, source: Option<&dyn std::error::Error>) {
    match source {
        Some(err) => error!("{message}: {err}"),
        None => error!("{message}"),
    }
}
