//! casematch CLI - Compare test cases and analyze requirement coverage
//!
//! Reads JSON files of test cases and requirements, runs the engine and
//! prints the report as text or JSON. Exit codes: 0 success, 1 error,
//! 2 usage error.

use casematch::core::snapshot::{JsonFileSource, RecordSource, Snapshot};
use casematch::core::{
    Analyzer, Comparator, EngineConfig, GapProfile, Requirement, TestCase, TestType,
};
use casematch::events::observers::{LoggingObserver, MetricsObserver};
use casematch::events::{EngineEvent, EventBus};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio::sync::broadcast;

/// casematch CLI - Test case comparison and coverage engine
#[derive(Parser)]
#[command(name = "casematch-cli")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Output format
    #[arg(short, long, value_enum, default_value = "text", global = true)]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Engine configuration file (JSON); flags override its values
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Validate configuration and exit
    #[arg(long)]
    validate_config: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Output format for CLI responses
#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output for programmatic use
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify candidate test cases against a repository
    Compare {
        /// JSON array of candidate test cases
        #[arg(long)]
        candidates: PathBuf,

        /// JSON array of repository test cases
        #[arg(short, long)]
        repository: PathBuf,

        /// Lower bound of partial_match (0.0-1.0)
        #[arg(long)]
        match_threshold: Option<f64>,

        /// Lower bound of exact_match (0.0-1.0)
        #[arg(long)]
        exact_threshold: Option<f64>,

        /// Enable the token-overlap prefilter with this shortlist size
        #[arg(long)]
        prefilter: Option<usize>,

        /// Keep at most this many repository matches per candidate
        #[arg(long)]
        top_k: Option<usize>,

        /// Compute differences for every retained match, not just the best
        #[arg(long)]
        diff_all: bool,

        /// Number of candidates compared concurrently
        #[arg(short, long, default_value = "1")]
        jobs: usize,

        /// Overall deadline, e.g. "500ms" or "2s"
        #[arg(long)]
        deadline: Option<humantime::Duration>,

        /// Print Prometheus metrics for the run to stderr
        #[arg(long)]
        metrics: bool,
    },

    /// Compute requirement coverage and test distribution gaps
    Analyze {
        /// JSON array of requirements
        #[arg(long)]
        requirements: PathBuf,

        /// JSON array of repository test cases
        #[arg(short, long)]
        repository: PathBuf,

        /// Test type that must be represented (repeatable)
        #[arg(long = "require-type")]
        require_type: Vec<TestType>,

        /// Coverage area that must be represented (repeatable)
        #[arg(long = "require-area")]
        require_area: Vec<String>,

        /// Minimum best score for a requirement to count as covered
        #[arg(long)]
        coverage_threshold: Option<f64>,

        /// Minimum test cases expected per required type
        #[arg(long)]
        min_scenarios: Option<usize>,
    },

    /// Show the effective configuration
    Config {
        /// Print every field, not just the validation result
        #[arg(long)]
        show: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Clone, Copy, ValueEnum)]
#[allow(clippy::enum_variant_names)]
enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

// ============================================================================
// Response Types
// ============================================================================

/// Response from the config command.
#[derive(Serialize)]
struct ConfigResponse {
    /// Whether the effective configuration passed validation
    valid: bool,
    /// One entry per validation problem
    errors: Vec<String>,
    /// Effective configuration, present with --show
    #[serde(skip_serializing_if = "Option::is_none")]
    config: Option<EngineConfig>,
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(io::stderr)
        .init();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if cli.validate_config {
        return execute_validate_config(&config);
    }

    let command = match cli.command {
        Some(cmd) => cmd,
        None => {
            eprintln!("Error: A subcommand is required. Use --help for usage.");
            return ExitCode::from(2);
        }
    };

    let result = match command {
        Commands::Compare {
            candidates,
            repository,
            match_threshold,
            exact_threshold,
            prefilter,
            top_k,
            diff_all,
            jobs,
            deadline,
            metrics,
        } => {
            let mut config = config;
            if let Some(t) = match_threshold {
                config = config.with_match_threshold(t);
            }
            if let Some(t) = exact_threshold {
                config = config.with_exact_threshold(t);
            }
            if let Some(n) = prefilter {
                config = config.with_prefilter(n);
            }
            if let Some(k) = top_k {
                config = config.with_top_k(k);
            }
            if let Some(d) = deadline {
                config = config.with_deadline(d.into());
            }
            config.diff_all_matches |= diff_all;
            if jobs > 1 {
                config = config.with_max_concurrency(jobs);
            }
            execute_compare(cli.format, config, &candidates, &repository, jobs, metrics)
        }

        Commands::Analyze {
            requirements,
            repository,
            require_type,
            require_area,
            coverage_threshold,
            min_scenarios,
        } => {
            let mut config = config;
            if let Some(t) = coverage_threshold {
                config = config.with_coverage_threshold(t);
            }
            if let Some(n) = min_scenarios {
                config = config.with_min_scenarios_per_type(n);
            }
            let profile = require_area.into_iter().fold(
                require_type
                    .into_iter()
                    .fold(GapProfile::new(), GapProfile::with_type),
                GapProfile::with_area,
            );
            execute_analyze(cli.format, config, &requirements, &repository, &profile)
        }

        Commands::Config { show } => execute_config(cli.format, config, show),

        Commands::Completions { shell } => {
            generate_completions(shell);
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

fn execute_compare(
    format: OutputFormat,
    config: EngineConfig,
    candidates_path: &Path,
    repository_path: &Path,
    jobs: usize,
    metrics: bool,
) -> Result<(), String> {
    let candidates = JsonFileSource::<TestCase>::new(candidates_path)
        .list()
        .map_err(|e| e.to_string())?;
    let repository = Snapshot::capture(&JsonFileSource::<TestCase>::new(repository_path))
        .map_err(|e| e.to_string())?;

    let bus = EventBus::for_run(candidates.len() + repository.len());
    let mut receiver = bus.subscribe();
    let mut metrics_observer = MetricsObserver::new(&bus);
    let comparator = Comparator::new(config).with_event_bus(bus);

    let result = if jobs > 1 {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| format!("Failed to start runtime: {}", e))?;
        let result = runtime.block_on(comparator.compare_concurrent(&candidates, &repository));
        // Workers still running past the deadline must not hold up the report
        runtime.shutdown_background();
        result
    } else {
        comparator.compare(&candidates, &repository)
    };
    let report = result.map_err(|e| e.to_string())?;

    drain_logs(&mut receiver);
    if metrics {
        metrics_observer.drain();
        let snapshot = metrics_observer.metrics();
        let text = snapshot
            .lock()
            .map(|m| m.to_prometheus())
            .map_err(|_| "Metrics lock poisoned".to_string())?;
        eprint!("{}", text);
    }

    output_response(format, &report)
}

fn execute_analyze(
    format: OutputFormat,
    config: EngineConfig,
    requirements_path: &Path,
    repository_path: &Path,
    profile: &GapProfile,
) -> Result<(), String> {
    let requirements = JsonFileSource::<Requirement>::new(requirements_path)
        .list()
        .map_err(|e| e.to_string())?;
    let repository = Snapshot::capture(&JsonFileSource::<TestCase>::new(repository_path))
        .map_err(|e| e.to_string())?;

    let bus = EventBus::for_run(requirements.len() + repository.len());
    let mut receiver = bus.subscribe();
    let report = Analyzer::new(config)
        .with_event_bus(bus)
        .analyze(&requirements, &repository, profile)
        .map_err(|e| e.to_string())?;

    drain_logs(&mut receiver);
    output_response(format, &report)
}

fn execute_config(format: OutputFormat, config: EngineConfig, show: bool) -> Result<(), String> {
    let errors = match config.validate() {
        Ok(()) => Vec::new(),
        Err(errors) => errors.iter().map(|e| e.to_string()).collect(),
    };
    let response = ConfigResponse {
        valid: errors.is_empty(),
        errors,
        config: show.then_some(config),
    };
    output_response(format, &response)
}

fn generate_completions(shell: Shell) {
    use clap::CommandFactory;
    use clap_complete::{generate, Shell as ClapShell};

    let mut cmd = Cli::command();
    let shell = match shell {
        Shell::Bash => ClapShell::Bash,
        Shell::Zsh => ClapShell::Zsh,
        Shell::Fish => ClapShell::Fish,
        Shell::PowerShell => ClapShell::PowerShell,
    };
    generate(shell, &mut cmd, "casematch-cli", &mut io::stdout());
}

fn execute_validate_config(config: &EngineConfig) -> ExitCode {
    match config.validate() {
        Ok(()) => {
            println!("Configuration is valid.");
            ExitCode::SUCCESS
        }
        Err(errors) => {
            eprintln!("Configuration errors:");
            for error in errors {
                eprintln!("  - {}", error);
            }
            ExitCode::FAILURE
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Load the engine configuration, falling back to defaults without a file.
fn load_config(path: Option<&Path>) -> Result<EngineConfig, String> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config {}: {}", path.display(), e))?;
    serde_json::from_str(&content)
        .map_err(|e| format!("Failed to parse config {}: {}", path.display(), e))
}

/// Log every event queued during a synchronous run.
fn drain_logs(receiver: &mut broadcast::Receiver<EngineEvent>) {
    loop {
        match receiver.try_recv() {
            Ok(event) => LoggingObserver::log_event(&event),
            Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
}

/// Output a response in the specified format.
///
/// JSON is pretty-printed; text walks the same JSON value with indentation.
fn output_response<T: Serialize>(format: OutputFormat, response: &T) -> Result<(), String> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(response)
                .map_err(|e| format!("Failed to serialize response: {}", e))?;
            println!("{}", json);
        }
        OutputFormat::Text => {
            let value = serde_json::to_value(response)
                .map_err(|e| format!("Failed to serialize response: {}", e))?;
            print_value(&value, 0);
        }
    }
    Ok(())
}

/// Recursively print a JSON value, two spaces per nesting level.
fn print_value(value: &serde_json::Value, indent: usize) {
    let prefix = "  ".repeat(indent);
    match value {
        serde_json::Value::Object(map) => {
            for (key, val) in map {
                match val {
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        println!("{}{}:", prefix, key);
                        print_value(val, indent + 1);
                    }
                    _ => {
                        println!("{}{}: {}", prefix, key, format_simple_value(val));
                    }
                }
            }
        }
        serde_json::Value::Array(arr) => {
            for (i, val) in arr.iter().enumerate() {
                match val {
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        println!("{}[{}]:", prefix, i);
                        print_value(val, indent + 1);
                    }
                    _ => {
                        println!("{}- {}", prefix, format_simple_value(val));
                    }
                }
            }
        }
        _ => {
            println!("{}{}", prefix, format_simple_value(value));
        }
    }
}

/// Format a scalar JSON value for display. Scores print with 4 decimals.
fn format_simple_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) if n.is_f64() => {
            format!("{:.4}", n.as_f64().unwrap_or_default())
        }
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        serde_json::Value::Null => "null".to_string(),
        _ => value.to_string(),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_simple_value() {
        assert_eq!(
            format_simple_value(&serde_json::Value::String("partial_match".to_string())),
            "partial_match"
        );
        assert_eq!(format_simple_value(&serde_json::json!(42)), "42");
        assert_eq!(format_simple_value(&serde_json::json!(0.925)), "0.9250");
        assert_eq!(format_simple_value(&serde_json::Value::Bool(true)), "true");
        assert_eq!(format_simple_value(&serde_json::Value::Null), "null");
    }

    #[test]
    fn test_load_config_defaults_without_file() {
        assert_eq!(load_config(None).unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config(Some(Path::new("/nonexistent/casematch.json"))).unwrap_err();
        assert!(err.contains("Failed to read config"));
    }

    #[test]
    fn test_cli_parses_repeated_requirements() {
        let cli = Cli::try_parse_from([
            "casematch-cli",
            "analyze",
            "--requirements",
            "r.json",
            "--repository",
            "t.json",
            "--require-type",
            "security",
            "--require-type",
            "negative",
            "--require-area",
            "auth",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Analyze {
                require_type,
                require_area,
                ..
            }) => {
                assert_eq!(require_type, vec![TestType::Security, TestType::Negative]);
                assert_eq!(require_area, vec!["auth".to_string()]);
            }
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn test_cli_parses_deadline() {
        let cli = Cli::try_parse_from([
            "casematch-cli",
            "compare",
            "--candidates",
            "c.json",
            "--repository",
            "r.json",
            "--deadline",
            "250ms",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Compare { deadline, jobs, .. }) => {
                let d: std::time::Duration = deadline.unwrap().into();
                assert_eq!(d, std::time::Duration::from_millis(250));
                assert_eq!(jobs, 1);
            }
            _ => panic!("expected compare"),
        }
    }
}
