//! Configuration management
//!
//! This module handles loading and managing configuration from
//! TOML files and CLI arguments.

pub mod options;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use crate::core::constants::{defaults, output_formats, redirects, timeouts};
use crate::core::error::{Result, UrlProbeError};
use crate::validation::classifier::ContentPolicy;

pub use options::{ProbeOptions, RequestOverrides};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Connect timeout in milliseconds for probes
    pub connect_timeout_ms: Option<u64>,

    /// Socket (read) timeout in milliseconds for probes
    pub socket_timeout_ms: Option<u64>,

    /// Let the HTTP client follow redirects
    pub follow_redirects: Option<bool>,

    /// Redirect hop limit
    pub max_redirects: Option<u8>,

    /// Check the response content type against the allow-list
    pub validate_content_type: Option<bool>,

    /// Validate batches concurrently
    pub parallel: Option<bool>,

    /// Largest batch accepted in one request
    pub max_batch_size: Option<usize>,

    /// Content length ceiling in bytes
    pub max_content_length: Option<i64>,

    /// Replacement for the built-in content type allow-list
    pub allowed_content_types: Option<Vec<String>>,

    /// Custom User-Agent header
    pub user_agent: Option<String>,

    /// Static host overrides in `host=ip:port` form
    pub resolve: Option<Vec<String>>,

    /// Time-to-live for cached results in minutes
    pub cache_ttl_minutes: Option<u64>,

    /// Directory of the durable cache; in-memory cache when unset
    pub cache_dir: Option<String>,

    /// Durable cache partition (project) name
    pub partition: Option<String>,

    /// URL patterns to skip (regex)
    pub exclude_patterns: Option<Vec<String>>,

    /// Output format (text, json)
    pub output_format: Option<String>,

    /// Enable verbose logging
    pub verbose: Option<bool>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            connect_timeout_ms: Some(timeouts::DEFAULT_CONNECT_TIMEOUT_MS),
            socket_timeout_ms: Some(timeouts::DEFAULT_SOCKET_TIMEOUT_MS),
            follow_redirects: Some(redirects::DEFAULT_FOLLOW),
            max_redirects: Some(redirects::DEFAULT_MAX_REDIRECTS),
            validate_content_type: Some(true),
            parallel: Some(false),
            max_batch_size: Some(defaults::MAX_BATCH_SIZE),
            max_content_length: Some(defaults::MAX_CONTENT_LENGTH_BYTES),
            allowed_content_types: None, // Built-in allow-list
            user_agent: None,
            resolve: None,
            cache_ttl_minutes: Some(defaults::CACHE_TTL_MINUTES),
            cache_dir: None, // In-memory cache by default
            partition: None,
            exclude_patterns: None,
            output_format: Some(output_formats::DEFAULT.to_string()),
            verbose: Some(false),
        }
    }
}

impl Config {
    /// Load configuration from file, falling back to defaults
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            UrlProbeError::Config(format!(
                "Could not read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| {
            UrlProbeError::Config(format!(
                "Invalid TOML in config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Try to find and load a config file in standard locations
    pub fn load_from_standard_locations() -> Self {
        if let Ok(config) = Self::load_from_file(defaults::CONFIG_FILE_NAME) {
            return config;
        }

        // Parent directories, up to 3 levels
        for i in 1..=3 {
            let path = format!("{}{}", "../".repeat(i), defaults::CONFIG_FILE_NAME);
            if let Ok(config) = Self::load_from_file(&path) {
                return config;
            }
        }

        Self::default()
    }

    /// Merge this config with CLI arguments (CLI takes precedence)
    pub fn merge_with_cli(&mut self, cli_config: &CliConfig) {
        // Probe options
        if let Some(ms) = cli_config.connect_timeout_ms {
            self.connect_timeout_ms = Some(ms);
        }
        if let Some(ms) = cli_config.socket_timeout_ms {
            self.socket_timeout_ms = Some(ms);
        }
        if cli_config.no_follow_redirects {
            self.follow_redirects = Some(false);
        }
        if let Some(max) = cli_config.max_redirects {
            self.max_redirects = Some(max);
        }
        if cli_config.skip_content_type {
            self.validate_content_type = Some(false);
        }
        if cli_config.parallel {
            self.parallel = Some(true);
        }
        if let Some(ref user_agent) = cli_config.user_agent {
            self.user_agent = Some(user_agent.clone());
        }
        if let Some(ref resolve) = cli_config.resolve {
            self.resolve = Some(resolve.clone());
        }

        // Filtering & limits
        if let Some(size) = cli_config.max_batch_size {
            self.max_batch_size = Some(size);
        }
        if let Some(ref exclude_patterns) = cli_config.exclude_patterns {
            self.exclude_patterns = Some(exclude_patterns.clone());
        }

        // Cache
        if let Some(ref cache_dir) = cli_config.cache_dir {
            self.cache_dir = Some(cache_dir.clone());
        }
        if let Some(ref partition) = cli_config.partition {
            self.partition = Some(partition.clone());
        }
        if let Some(ttl) = cli_config.cache_ttl_minutes {
            self.cache_ttl_minutes = Some(ttl);
        }

        // Output & format
        if cli_config.verbose {
            self.verbose = Some(true);
        }
        if let Some(ref output_format) = cli_config.output_format {
            self.output_format = Some(output_format.clone());
        }
    }

    /// Compile exclude patterns into regex objects
    pub fn compile_exclude_patterns(&self) -> Result<Vec<Regex>> {
        let mut compiled = Vec::new();
        if let Some(ref patterns) = self.exclude_patterns {
            for pattern in patterns {
                compiled.push(Regex::new(pattern)?);
            }
        }
        Ok(compiled)
    }

    /// Parse the `resolve` entries into host/address pairs
    pub fn resolve_overrides(&self) -> Result<Vec<(String, SocketAddr)>> {
        self.resolve
            .iter()
            .flatten()
            .map(|entry| parse_resolve_entry(entry))
            .collect()
    }

    /// Default probe options for requests that carry no overrides
    pub fn probe_options(&self) -> ProbeOptions {
        let defaults = ProbeOptions::default();
        ProbeOptions {
            connect_timeout: self
                .connect_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.connect_timeout),
            socket_timeout: self
                .socket_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.socket_timeout),
            follow_redirects: self.follow_redirects.unwrap_or(defaults.follow_redirects),
            max_redirects: self.max_redirects.unwrap_or(defaults.max_redirects),
            validate_content_type: self
                .validate_content_type
                .unwrap_or(defaults.validate_content_type),
            parallel: self.parallel.unwrap_or(defaults.parallel),
        }
    }

    /// Classifier policy built from the allow-list and size ceiling
    pub fn content_policy(&self) -> ContentPolicy {
        let max_length = self
            .max_content_length
            .unwrap_or(defaults::MAX_CONTENT_LENGTH_BYTES);
        match self.allowed_content_types {
            Some(ref types) => ContentPolicy::new(types.iter().map(String::as_str), max_length),
            None => ContentPolicy::with_max_content_length(max_length),
        }
    }

    /// Get the cache time-to-live as Duration
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(
            self.cache_ttl_minutes
                .unwrap_or(defaults::CACHE_TTL_MINUTES)
                * 60,
        )
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size.unwrap_or(defaults::MAX_BATCH_SIZE)
    }

    pub fn partition(&self) -> &str {
        self.partition.as_deref().unwrap_or(defaults::PARTITION)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.probe_options()
            .validate()
            .map_err(|e| UrlProbeError::Config(e.to_string()))?;

        if let Some(size) = self.max_batch_size
            && size == 0
        {
            return Err(UrlProbeError::Config(
                "Max batch size cannot be 0. Expected a positive integer.".to_string(),
            ));
        }

        if let Some(length) = self.max_content_length
            && length <= 0
        {
            return Err(UrlProbeError::Config(format!(
                "Max content length of {length} bytes is invalid. Expected a positive integer."
            )));
        }

        if let Some(ref types) = self.allowed_content_types
            && types.iter().all(|t| t.trim().is_empty())
        {
            return Err(UrlProbeError::Config(
                "Allowed content types cannot be empty.".to_string(),
            ));
        }

        if let Some(ttl) = self.cache_ttl_minutes
            && ttl == 0
        {
            return Err(UrlProbeError::Config(
                "Cache TTL cannot be 0. Expected a positive number of minutes.".to_string(),
            ));
        }

        if let Some(ref partition) = self.partition
            && !is_valid_partition_name(partition)
        {
            return Err(UrlProbeError::Config(format!(
                "Partition '{partition}' is invalid. Use letters, digits, '-', '_' or '.'."
            )));
        }

        if let Some(ref format) = self.output_format {
            match format.as_str() {
                f if output_formats::ALL.contains(&f) => {}
                _ => {
                    return Err(UrlProbeError::Config(format!(
                        "Invalid output format '{format}'. Expected one of: {}.",
                        output_formats::ALL.join(", ")
                    )));
                }
            }
        }

        self.resolve_overrides()
            .map_err(|e| UrlProbeError::Config(e.to_string()))?;

        // Validate exclude patterns by trying to compile them
        self.compile_exclude_patterns()?;

        Ok(())
    }
}

/// Parse one `host=ip:port` override
pub fn parse_resolve_entry(entry: &str) -> Result<(String, SocketAddr)> {
    let invalid = || {
        UrlProbeError::InvalidArgument(format!(
            "Resolve override '{entry}' is invalid. Expected host=ip:port."
        ))
    };
    let (host, addr) = entry.split_once('=').ok_or_else(invalid)?;
    let host = host.trim();
    if host.is_empty() {
        return Err(invalid());
    }
    let addr = addr.trim().parse::<SocketAddr>().map_err(|_| invalid())?;
    Ok((host.to_ascii_lowercase(), addr))
}

/// Partition names become file names in the durable store
pub fn is_valid_partition_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// Configuration options that can come from CLI
#[derive(Debug, Default)]
pub struct CliConfig {
    // Probe options
    pub connect_timeout_ms: Option<u64>, // --connect-timeout
    pub socket_timeout_ms: Option<u64>,  // --socket-timeout
    pub no_follow_redirects: bool,       // --no-follow-redirects
    pub max_redirects: Option<u8>,       // --max-redirects
    pub skip_content_type: bool,         // --skip-content-type
    pub parallel: bool,                  // --parallel
    pub user_agent: Option<String>,      // --user-agent
    pub resolve: Option<Vec<String>>,    // --resolve

    // Filtering & limits
    pub max_batch_size: Option<usize>,         // --max-batch-size
    pub exclude_patterns: Option<Vec<String>>, // --exclude-pattern

    // Cache
    pub cache_dir: Option<String>,       // --cache-dir
    pub partition: Option<String>,       // --partition
    pub cache_ttl_minutes: Option<u64>,  // --cache-ttl

    // Output & format
    pub quiet: bool,                   // --quiet
    pub verbose: bool,                 // --verbose
    pub output_format: Option<String>, // --format
    pub no_progress: bool,             // --no-progress

    // Configuration
    pub config_file: Option<String>, // --config
    pub no_config: bool,             // --no-config
}
