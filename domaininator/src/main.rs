mod config;
mod progress;

use clap::{CommandFactory, Parser};
use config::FileConfig;
use libdns_storm::{Controller, Pattern, ProbeConfig, Prober};
use progress::ProgressBar;
use std::{path::PathBuf, process, sync::Arc};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "domaininator", version)]
#[command(about = "Find registered domain names matching a pattern by probing DNS", long_about = None)]
struct Args {
    /// Pattern to expand into domain names (e.g. "go+gle\.(com|net)")
    pattern: Option<String>,

    /// Config file to use instead of the default locations
    #[arg(long)]
    config: Option<PathBuf>,

    /// Comma-separated list of lookups to do (NS, A, CNAME, MX or ALL)
    #[arg(long, value_delimiter = ',')]
    lookups: Option<Vec<String>>,

    /// Show IPs and host names on resolving domains
    #[arg(long = "ip", num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    show_ips: Option<bool>,

    /// Show all domain names, even if they are not registered
    #[arg(long, num_args = 0..=1, require_equals = true, default_missing_value = "true")]
    verbose: Option<bool>,

    /// Number of parallel workers to run
    #[arg(long)]
    workers: Option<usize>,

    /// Per-query DNS timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Print the default config to stdout and exit
    #[arg(long)]
    print_default_config: bool,
}

/// Flags given on the command line win over values from the config file.
fn apply_args(mut cfg: FileConfig, args: &Args) -> FileConfig {
    if let Some(pattern) = &args.pattern {
        cfg.pattern = Some(pattern.clone());
    }
    if let Some(lookups) = &args.lookups {
        cfg.lookups = lookups.clone();
    }
    if let Some(show_ips) = args.show_ips {
        cfg.showips = show_ips;
    }
    if let Some(verbose) = args.verbose {
        cfg.verbose = verbose;
    }
    if let Some(workers) = args.workers {
        cfg.workers = workers;
    }
    if let Some(timeout) = args.timeout {
        cfg.timeout = timeout;
    }
    cfg
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if args.print_default_config {
        println!("{}", config::default_config_toml());
        return Ok(());
    }

    init_tracing();

    let config_path = args.config.clone().or_else(config::find_config);
    let file_config = match &config_path {
        Some(path) => match config::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                process::exit(2);
            }
        },
        None => FileConfig::default(),
    };

    let mut settings = apply_args(file_config, &args);
    let Some(pattern) = settings.pattern.take() else {
        Args::command().print_help()?;
        process::exit(1);
    };

    println!("Pattern: {}", pattern);
    if let Some(path) = &config_path {
        println!("Config: {}", path.display());
    }

    let pattern = match Pattern::with_defaults(&pattern) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error while parsing pattern: {}", e);
            process::exit(2);
        }
    };

    let rt = tokio::runtime::Runtime::new()?;
    let code = rt.block_on(run(pattern, settings.into_probe_config()))?;
    process::exit(code);
}

async fn run(pattern: Pattern, config: ProbeConfig) -> Result<i32, Box<dyn std::error::Error>> {
    let prober = match Prober::new(config) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {}", e);
            return Ok(2);
        }
    };

    let total = pattern.count();
    tracing::debug!(total, "Expanded pattern");

    let controller = Controller::new();
    let signals = controller.watch_signals();
    let progress = Arc::new(ProgressBar::new(total));

    let report = prober.run(pattern.candidates(), &controller, progress).await?;
    signals.abort();

    println!();
    println!("{}", report.output());

    Ok(report.exit_code())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("domaininator").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn test_unset_flags_keep_file_values() {
        let file = FileConfig {
            pattern: Some("from[0-9]file".to_string()),
            workers: 4,
            verbose: true,
            lookups: vec!["MX".to_string()],
            ..FileConfig::default()
        };

        let merged = apply_args(file.clone(), &parse(&[]));

        assert_eq!(merged, file);
    }

    #[test]
    fn test_flags_override_file_values() {
        let file = FileConfig {
            pattern: Some("file".to_string()),
            verbose: true,
            ..FileConfig::default()
        };

        let merged = apply_args(
            file,
            &parse(&[
                "--workers", "2", "--lookups", "ns,a", "--ip", "--verbose=false", "cli[0-1]",
            ]),
        );

        assert_eq!(merged.pattern.as_deref(), Some("cli[0-1]"));
        assert_eq!(merged.workers, 2);
        assert_eq!(merged.lookups, vec!["ns", "a"]);
        assert!(merged.showips);
        assert!(!merged.verbose);
    }

    #[test]
    fn test_zero_workers_fails_validation() {
        let merged = apply_args(FileConfig::default(), &parse(&["--workers", "0", "x"]));
        assert!(merged.into_probe_config().validate().is_err());
    }

    #[test]
    fn test_zero_timeout_fails_validation() {
        let merged = apply_args(FileConfig::default(), &parse(&["--timeout", "0", "x"]));
        assert!(matches!(
            merged.into_probe_config().validate(),
            Err(libdns_storm::ConfigError::ZeroTimeout)
        ));
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }
}
