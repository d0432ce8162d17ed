//! benchmarkish - repeated CPU and memory benchmarking of a command

use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;

use chrono::Local;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use benchmarkish::bench::{BenchmarkRunner, CommandLauncher, CommandSpec, RunAggregator, RunPolicy};
use benchmarkish::platform::{SystemSpecs, STARTUP_CPU_INTERVAL};
use benchmarkish::report::{self, OutputLayout};
use benchmarkish::{BenchConfig, BenchError, BenchResult, CancelToken, RunSampler};

#[derive(Parser)]
#[command(name = "benchmarkish")]
#[command(version, about = "Benchmark the CPU and memory usage of a command over several runs", long_about = None)]
struct Cli {
    /// Command line to benchmark (quote it to pass arguments)
    #[arg(required_unless_present = "print_config")]
    command: Option<String>,

    /// Number of runs
    #[arg(short = 'n', long = "runs")]
    runs: Option<usize>,

    /// Name of the benchmarked process, used for the output folder and files
    #[arg(short, long, required_unless_present = "print_config")]
    pname: Option<String>,

    /// Name of the test inside the reports
    #[arg(short, long)]
    testname: Option<String>,

    /// Name of the environment, appended to the OS folder
    #[arg(short, long)]
    envname: Option<String>,

    /// Append to the spreadsheet of the day; the time is appended to the test name
    #[arg(short, long)]
    append: bool,

    /// Generate a spreadsheet report (CSV)
    #[arg(long)]
    sheet: bool,

    /// Generate a JSON report
    #[arg(long)]
    json: bool,

    /// Command to run after every run
    #[arg(long)]
    postcmd: Option<String>,

    /// Stop the benchmark when the post command fails
    #[arg(long = "postfailfast")]
    post_fail_fast: bool,

    /// Stop the benchmark at the first run that cannot be sampled
    #[arg(long = "failfast")]
    fail_fast: bool,

    /// Dump the environment of the watched process in the report
    #[arg(long)]
    environ: bool,

    /// Percentage of the samples to trim for the trimmed statistics
    #[arg(long, allow_negative_numbers = true)]
    trim: Option<f64>,

    /// Dump the statistics of every single run in the report
    #[arg(long)]
    details: bool,

    /// Root of the output tree
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

impl Cli {
    /// Apply the command line on top of the file configuration
    fn merge(&self, mut config: BenchConfig) -> BenchConfig {
        if let Some(runs) = self.runs {
            config.runs = runs;
        }
        if let Some(trim) = self.trim {
            config.trim_percent = trim;
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        config.fail_fast |= self.fail_fast;
        config.post_fail_fast |= self.post_fail_fast;
        config.capture_environ |= self.environ;
        config.details |= self.details;
        config.json |= self.json;
        config.sheet |= self.sheet;
        config.append |= self.append;
        config
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let console = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let log_name = format!("benchmarkish.{}.log", Local::now().format("%d%m%yT%H%M%S"));
    let (file_layer, file_error) = match File::create(&log_name) {
        Ok(file) => (
            Some(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            ),
            None,
        ),
        Err(e) => (None, Some(e)),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .init();

    if let Some(e) = file_error {
        warn!("Cannot create log file {}: {}", log_name, e);
    }
}

fn run(cli: Cli) -> BenchResult<()> {
    let config = cli.merge(BenchConfig::load_or_default(cli.config.as_deref())?);
    config.validate()?;

    if cli.print_config {
        println!("{}", config.to_toml()?);
        return Ok(());
    }

    let (Some(command_line), Some(pname)) = (cli.command.as_deref(), cli.pname.as_deref()) else {
        return Err(BenchError::InvalidCommand("a command and --pname are required".into()));
    };
    let command = CommandSpec::parse(command_line)?;
    let post_command = cli.postcmd.as_deref().map(CommandSpec::parse).transpose()?;
    let cancel = CancelToken::with_signal_handlers()?;

    let specs = SystemSpecs::collect(STARTUP_CPU_INTERVAL);
    specs.log();

    let start = Local::now();
    let layout = OutputLayout::new(&config.output_dir, &specs.os, cli.envname.as_deref(), pname, start);
    layout.create()?;
    let test_name = report::test_name(cli.testname.as_deref(), config.append, start);
    info!("Test {}: {} runs of `{}` in {}", test_name, config.runs, command_line, layout.folder().display());

    let sampler = RunSampler::new(config.tick())
        .capture_environ(config.capture_environ)
        .max_consecutive_errors(config.max_consecutive_errors);
    let policy = RunPolicy {
        runs: config.runs,
        fail_fast: config.fail_fast,
        post_fail_fast: config.post_fail_fast,
    };
    let launcher = CommandLauncher::new(command, post_command, layout.clone());
    let mut runner = BenchmarkRunner::new(launcher, sampler, policy, cancel);

    let aggregator = RunAggregator::new(specs.raw_total_memory, config.trim_fraction())
        .with_details(config.details)
        .with_environ(config.capture_environ);
    let report = runner.execute(aggregator)?;

    report::log_report(&report);
    if config.json {
        report::write_json(&layout.json_report(), &report, &specs, &test_name)?;
    }
    if config.sheet {
        report::write_sheet(&layout.sheet(config.append), &report, &specs, &test_name, config.append)?;
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(BenchError::Cancelled) => {
            warn!("Benchmark cancelled, no report written");
            ExitCode::from(BenchError::Cancelled.exit_code())
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_print_config_alone() {
        let cli = Cli::try_parse_from(["benchmarkish", "--print-config"]).unwrap();
        assert!(cli.print_config);
        assert!(cli.command.is_none());
        assert!(cli.pname.is_none());
    }

    #[test]
    fn test_command_and_pname_required() {
        assert!(Cli::try_parse_from(["benchmarkish"]).is_err());
        assert!(Cli::try_parse_from(["benchmarkish", "sleep 1"]).is_err());
        assert!(Cli::try_parse_from(["benchmarkish", "-p", "sleepy"]).is_err());

        let cli = Cli::try_parse_from(["benchmarkish", "sleep 1", "-p", "sleepy", "-n", "3", "--trim", "-20"]).unwrap();
        assert_eq!(cli.command.as_deref(), Some("sleep 1"));
        assert_eq!(cli.pname.as_deref(), Some("sleepy"));
        assert_eq!(cli.runs, Some(3));
        assert_eq!(cli.trim, Some(-20.0));
    }

    #[test]
    fn test_merge_overrides_file() {
        let cli = Cli::try_parse_from(["benchmarkish", "true", "-p", "t", "-n", "4", "--json", "--details"]).unwrap();
        let file = BenchConfig {
            runs: 2,
            sheet: true,
            ..BenchConfig::default()
        };
        let config = cli.merge(file);
        assert_eq!(config.runs, 4);
        assert!(config.json && config.details && config.sheet);
        assert!(!config.append);
    }

    #[test]
    fn test_print_config_does_not_run() {
        let cli = Cli::try_parse_from(["benchmarkish", "--print-config", "--config", "/nonexistent/benchmarkish.toml"])
            .unwrap();
        assert!(matches!(run(cli), Err(BenchError::ConfigRead { .. })));

        let cli = Cli::try_parse_from(["benchmarkish", "--print-config", "-n", "0"]).unwrap();
        assert!(matches!(run(cli), Err(BenchError::InvalidConfig(_))));
    }
}
