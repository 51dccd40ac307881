// Command-line interface definitions and parsing for urlprobe

use crate::config::CliConfig;
use crate::core::constants::{defaults, output_formats};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    // Probe Options
    /// Connect timeout in ms (default: 5000)
    #[arg(long, value_name = "MS", global = true, help_heading = "Probe Options")]
    pub connect_timeout: Option<u64>,

    /// Socket read timeout in ms (default: 10000)
    #[arg(long, value_name = "MS", global = true, help_heading = "Probe Options")]
    pub socket_timeout: Option<u64>,

    /// Report redirects instead of following them
    #[arg(long, global = true, help_heading = "Probe Options")]
    pub no_follow_redirects: bool,

    /// Redirect hop limit (default: 5)
    #[arg(long, value_name = "COUNT", global = true, help_heading = "Probe Options")]
    pub max_redirects: Option<u8>,

    /// Accept any content type
    #[arg(long, global = true, help_heading = "Probe Options")]
    pub skip_content_type: bool,

    /// Custom User-Agent header
    #[arg(long, value_name = "AGENT", global = true, help_heading = "Probe Options")]
    pub user_agent: Option<String>,

    /// Resolve HOST to ADDR instead of using DNS (host=ip:port, repeatable)
    #[arg(long, value_name = "HOST=ADDR", global = true, help_heading = "Probe Options")]
    pub resolve: Vec<String>,

    // Filtering & Limits
    /// URL patterns to skip (regex, repeatable)
    #[arg(long, value_name = "REGEX", global = true, help_heading = "Filtering & Limits")]
    pub exclude_pattern: Vec<String>,

    /// Largest accepted batch (default: 100)
    #[arg(long, value_name = "COUNT", global = true, help_heading = "Filtering & Limits")]
    pub max_batch_size: Option<usize>,

    // Cache
    /// Directory of the durable cache (in-memory when unset)
    #[arg(long, value_name = "DIR", global = true, help_heading = "Cache")]
    pub cache_dir: Option<String>,

    /// Durable cache partition (default: default)
    #[arg(long, value_name = "NAME", global = true, help_heading = "Cache")]
    pub partition: Option<String>,

    /// Cached result lifetime in minutes (default: 60)
    #[arg(long, value_name = "MINUTES", global = true, help_heading = "Cache")]
    pub cache_ttl: Option<u64>,

    // Output & Verbosity
    /// Suppress progress and log output
    #[arg(short = 'q', long, global = true, help_heading = "Output & Verbosity")]
    pub quiet: bool,

    /// Enable verbose logging
    #[arg(short = 'v', long, global = true, help_heading = "Output & Verbosity")]
    pub verbose: bool,

    /// Output format
    #[arg(long, value_name = "FORMAT", value_parser = output_formats::ALL, default_value = output_formats::DEFAULT, global = true, help_heading = "Output & Verbosity")]
    pub format: String,

    /// Disable progress bars
    #[arg(long, global = true, help_heading = "Output & Verbosity")]
    pub no_progress: bool,

    // Configuration
    /// Use specific config file
    #[arg(long, value_name = "FILE", global = true, help_heading = "Configuration")]
    pub config: Option<String>,

    /// Ignore config files
    #[arg(long, global = true, help_heading = "Configuration")]
    pub no_config: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate one or more URLs
    #[command(arg_required_else_help = true)]
    Check {
        /// URLs to validate
        #[arg(required = true)]
        urls: Vec<String>,

        /// Print aggregate counters instead of per-URL results
        #[arg(long)]
        summary: bool,

        /// Validate the URLs concurrently
        #[arg(long)]
        parallel: bool,
    },
    /// Validate a JSON batch request ({"urls": [...], overrides...})
    #[command(arg_required_else_help = true)]
    Batch {
        /// Path to the request document, or - for stdin
        request: String,

        /// Print aggregate counters instead of per-URL results
        #[arg(long)]
        summary: bool,
    },
    /// Inspect or maintain the result cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Find and remove duplicate rows in durable cache partitions
    Repair {
        #[command(subcommand)]
        action: RepairAction,
    },
}

#[derive(Subcommand)]
pub enum CacheAction {
    /// Show entry counts
    Stats,
    /// Remove expired entries and entries older than --max-age
    Sweep {
        /// Maximum entry age in minutes
        #[arg(long, value_name = "MINUTES", default_value_t = defaults::CACHE_TTL_MINUTES)]
        max_age: u64,
    },
    /// Remove every entry
    Clear,
}

#[derive(Subcommand)]
pub enum RepairAction {
    /// List partitions in the cache directory
    List,
    /// Report duplicate rows of a partition
    Analyze {
        project: String,

        /// Number of most-duplicated URLs to show
        #[arg(long, value_name = "N", default_value_t = defaults::TOP_DUPLICATES)]
        top: usize,
    },
    /// Keep the first row per URL and rewrite the partition
    Fix { project: String },
}

/// Convert parsed CLI arguments into CliConfig
pub fn cli_to_config(cli: &Cli) -> CliConfig {
    let mut cli_config = CliConfig {
        connect_timeout_ms: cli.connect_timeout,
        socket_timeout_ms: cli.socket_timeout,
        no_follow_redirects: cli.no_follow_redirects,
        max_redirects: cli.max_redirects,
        skip_content_type: cli.skip_content_type,
        user_agent: cli.user_agent.clone(),
        max_batch_size: cli.max_batch_size,
        cache_dir: cli.cache_dir.clone(),
        partition: cli.partition.clone(),
        cache_ttl_minutes: cli.cache_ttl,
        quiet: cli.quiet,
        verbose: cli.verbose,
        output_format: Some(cli.format.clone()),
        no_progress: cli.no_progress,
        config_file: cli.config.clone(),
        no_config: cli.no_config,
        ..Default::default()
    };

    if let Commands::Check { parallel: true, .. } = cli.command {
        cli_config.parallel = true;
    }

    if !cli.resolve.is_empty() {
        cli_config.resolve = Some(cli.resolve.clone());
    }

    if !cli.exclude_pattern.is_empty() {
        cli_config.exclude_patterns = Some(cli.exclude_pattern.clone());
    }

    cli_config
}
