use clap::Parser;
use urlprobe::batch::{BatchOrchestrator, BatchRequest, SummaryResult, ValidateUrls};
use urlprobe::cache::open_cache;
use urlprobe::config::{CliConfig, Config, ProbeOptions};
use urlprobe::core::constants::output_formats;
use urlprobe::core::{UrlProbeError, ValidationResult};
use urlprobe::repair::Reconciler;
use urlprobe::reporting::logging;
use urlprobe::ui::output;
use urlprobe::ui::{CacheAction, Cli, Commands, ProgressReporter, RepairAction, cli_to_config};

use std::io::Read;

type AppResult<T> = Result<T, Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match run_urlprobe(&cli).await {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

/// Dispatch the parsed command and return the process exit code
pub async fn run_urlprobe(cli: &Cli) -> AppResult<i32> {
    let cli_config = cli_to_config(cli);
    let config = load_and_merge_config(&cli_config)?;

    let settings = setup_output_settings(&cli_config, &config);
    logging::init_logger(settings.verbose, settings.quiet);

    match cli.command {
        Commands::Check {
            ref urls, summary, ..
        } => {
            let orchestrator = BatchOrchestrator::from_config(&config)?;
            let options = config.probe_options();
            run_validation(&orchestrator, &config, urls, &options, summary, &settings).await
        }
        Commands::Batch {
            ref request,
            summary,
        } => {
            let request = read_batch_request(request)?;
            let orchestrator = BatchOrchestrator::from_config(&config)?;
            let options = orchestrator.options_for(&request.overrides)?;
            run_validation(
                &orchestrator,
                &config,
                &request.urls,
                &options,
                summary,
                &settings,
            )
            .await
        }
        Commands::Cache { ref action } => run_cache_command(action, &config, &settings),
        Commands::Repair { ref action } => run_repair_command(action, &config, &settings),
    }
}

/// Load configuration from file or standard locations and merge with CLI config
pub fn load_and_merge_config(cli_config: &CliConfig) -> AppResult<Config> {
    let mut config = if cli_config.no_config {
        Config::default()
    } else if let Some(ref config_file) = cli_config.config_file {
        Config::load_from_file(config_file).inspect_err(|e| {
            logging::log_error(
                &format!("Could not load config file '{config_file}'"),
                Some(e),
            );
        })?
    } else {
        Config::load_from_standard_locations()
    };

    // CLI takes precedence; re-check the merged values
    config.merge_with_cli(cli_config);
    config.validate()?;
    Ok(config)
}

/// Settings for output formatting and display
pub struct OutputSettings {
    pub quiet: bool,
    pub verbose: bool,
    pub output_format: String,
    pub show_progress: bool,
}

pub fn setup_output_settings(cli_config: &CliConfig, config: &Config) -> OutputSettings {
    let quiet = cli_config.quiet;
    let output_format = config
        .output_format
        .as_deref()
        .unwrap_or(output_formats::DEFAULT)
        .to_string();
    let show_progress =
        !quiet && !cli_config.no_progress && output_format == output_formats::TEXT;

    OutputSettings {
        quiet,
        verbose: config.verbose.unwrap_or(false),
        output_format,
        show_progress,
    }
}

fn read_batch_request(source: &str) -> AppResult<BatchRequest> {
    let request = if source == "-" {
        let mut body = String::new();
        std::io::stdin().read_to_string(&mut body)?;
        BatchRequest::from_json(&body)
    } else {
        BatchRequest::from_file(source)
    };

    request.map_err(|e| match e {
        UrlProbeError::Serialization(inner) => {
            UrlProbeError::InvalidArgument(format!("Could not parse batch request: {inner}"))
                .into()
        }
        other => other.into(),
    })
}

async fn run_validation(
    orchestrator: &BatchOrchestrator,
    config: &Config,
    urls: &[String],
    options: &ProbeOptions,
    summary: bool,
    settings: &OutputSettings,
) -> AppResult<i32> {
    logging::log_config_info(config, options, orchestrator.cache().backend());

    let progress = ProgressReporter::new(settings.show_progress).with_bar();
    let results = orchestrator
        .validate_urls(urls, options, Some(&progress))
        .await;
    progress.finish_and_clear();
    let results = results?;

    let rendered = if summary {
        let summary = SummaryResult::aggregate(&results, orchestrator.engine().policy());
        output::format_summary(&summary, &settings.output_format)?
    } else {
        output::format_results(&results, &settings.output_format)?
    };
    println!("{rendered}");

    Ok(determine_exit_code(&results))
}

fn run_cache_command(
    action: &CacheAction,
    config: &Config,
    settings: &OutputSettings,
) -> AppResult<i32> {
    let cache = open_cache(config)?;
    let format = settings.output_format.as_str();

    let rendered = match *action {
        CacheAction::Stats => {
            let stats = cache.stats()?;
            logging::log_cache_stats(cache.backend(), &stats);
            output::format_cache_stats(cache.backend(), &stats, format)?
        }
        CacheAction::Sweep { max_age } => output::format_sweep(cache.sweep(max_age)?, format)?,
        CacheAction::Clear => {
            cache.clear()?;
            output::format_cleared(format)?
        }
    };
    println!("{rendered}");
    Ok(0)
}

fn run_repair_command(
    action: &RepairAction,
    config: &Config,
    settings: &OutputSettings,
) -> AppResult<i32> {
    let dir = config.cache_dir.as_deref().ok_or_else(|| {
        UrlProbeError::Config(
            "Repair works on the durable cache. Set --cache-dir or cache_dir in the config file."
                .to_string(),
        )
    })?;
    let reconciler = Reconciler::new(dir);
    let format = settings.output_format.as_str();

    let (rendered, exit_code) = match *action {
        RepairAction::List => (
            output::format_projects(&reconciler.list_projects()?, format)?,
            0,
        ),
        RepairAction::Analyze { ref project, top } => {
            let report = reconciler.analyze_duplicates(project, top)?;
            (output::format_duplicate_report(project, &report, format)?, 0)
        }
        RepairAction::Fix { ref project } => {
            let outcome = reconciler.repair_dataset(project)?;
            let exit_code = if outcome.success { 0 } else { 1 };
            (output::format_repair_outcome(project, &outcome, format)?, exit_code)
        }
    };
    println!("{rendered}");
    Ok(exit_code)
}

/// 0 when every URL is valid, 1 otherwise
pub fn determine_exit_code(results: &[ValidationResult]) -> i32 {
    if results.iter().all(ValidationResult::is_ok) {
        0
    } else {
        1
    }
}
