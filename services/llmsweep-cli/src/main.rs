use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use llmsweep_core::config::LoggingConfig;
use llmsweep_core::{
    compare, Aggregator, BaselineLogger, ClaimsSource, ExternalTool, Suite, SuiteRunner,
    SweepConfig, Target, TestId, TestRunner,
};

#[derive(Parser, Debug)]
#[command(name = "llmsweep")]
#[command(about = "Concurrency sweep driver for LLM serving benchmarks", long_about = None)]
#[command(version, args_conflicts_with_subcommands = true)]
struct Cli {
    /// Suite (basic, standard, extended, full, high-load), alias 1-5, or a
    /// .json config file. Runs the full suite when omitted.
    target: Option<String>,

    /// TOML configuration file (defaults to ./llmsweep.toml if present)
    #[arg(long, global = true, env = "LLMSWEEP_CONFIG")]
    config: Option<PathBuf>,

    /// Results directory
    #[arg(long, global = true)]
    results_dir: Option<PathBuf>,

    /// Directory holding the concurrency-*.json configs
    #[arg(long)]
    configs_dir: Option<PathBuf>,

    /// Seconds to pause after each test
    #[arg(long)]
    cooldown: Option<u64>,

    /// Record run timestamps and create baseline placeholder files
    #[arg(long)]
    baseline: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyse every result file in a directory into metrics JSON and a summary
    Analyze {
        /// Directory to scan (defaults to the configured results directory)
        dir: Option<PathBuf>,
    },

    /// Compare a metrics JSON against claimed/reference figures
    Compare {
        /// metrics-data.json written by `analyze`
        metrics_file: PathBuf,

        /// Claims JSON file: {"metric": [[concurrency, value], ...]}
        claims_file: Option<PathBuf>,

        /// Claims as an inline JSON string
        #[arg(long)]
        inline_claims: Option<String>,

        /// Output directory (defaults to <metrics_dir>/comparison)
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// List suites and test profiles
    List,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = SweepConfig::load(cli.config.as_deref())?;
    if let Some(dir) = &cli.results_dir {
        config.paths.results_dir = dir.clone();
    }
    if let Some(dir) = &cli.configs_dir {
        config.paths.configs_dir = dir.clone();
    }
    if let Some(secs) = cli.cooldown {
        config.run.cooldown_secs = secs;
    }
    if cli.baseline {
        config.baseline.enabled = true;
    }
    config.validate()?;

    init_logging(&config.logging);

    let tool = Arc::new(ExternalTool::new(&config.tool));

    match cli.command {
        Some(Commands::Analyze { dir }) => {
            let dir = dir.unwrap_or_else(|| config.paths.results_dir.clone());
            let aggregation = Aggregator::new(tool).aggregate(&dir).await?;

            println!("\n✅ Analysis complete!");
            println!("  Files analysed: {}", aggregation.files.len());
            println!("  Samples in series: {}", aggregation.samples.len());
            println!("  Metrics: {}", aggregation.metrics_path.display());
            println!("  Summary: {}", aggregation.summary_path.display());
            Ok(())
        }

        Some(Commands::Compare {
            metrics_file,
            claims_file,
            inline_claims,
            output_dir,
        }) => {
            let claims = ClaimsSource::from_args(claims_file, inline_claims)?;
            let outcome = compare(&metrics_file, &claims, output_dir.as_deref())?;

            match outcome.report_path {
                Some(path) => {
                    println!("\n✅ Comparison complete!");
                    println!("  Metrics compared: {}", outcome.metrics_compared);
                    println!("  Plots: {}", outcome.plots.len());
                    if let Some(summary) = &outcome.summary_plot {
                        println!("  Summary plot: {}", summary.display());
                    }
                    println!("  Report: {}", path.display());
                    Ok(())
                }
                None => {
                    eprintln!("\n❌ No metrics found in {}", metrics_file.display());
                    std::process::exit(1);
                }
            }
        }

        Some(Commands::List) => {
            print_catalog();
            Ok(())
        }

        None => {
            let target = match Target::parse(cli.target.as_deref()) {
                Ok(target) => target,
                Err(e) => Cli::command().error(ErrorKind::InvalidValue, e).exit(),
            };
            run_target(target, &config, tool).await
        }
    }
}

async fn run_target(
    target: Target,
    config: &SweepConfig,
    tool: Arc<ExternalTool>,
) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(&config.paths.results_dir)?;

    let mut runner = TestRunner::new(tool, config.run.cooldown());
    if config.baseline.enabled {
        let logger = BaselineLogger::new(&config.baseline, &config.paths.results_dir);
        logger.ensure_placeholders()?;
        info!("Baseline timestamps: {}", logger.log_file().display());
        runner = runner.with_baseline(logger);
    }

    let suites = SuiteRunner::new(&runner, &config.paths.configs_dir);

    match target {
        Target::Suite(suite) => {
            let pb = ProgressBar::new(suite.members().len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:30}] {pos}/{len} {msg}")?,
            );

            let report = suites.run_suite(suite, &pb).await;

            println!("\n🏁 {} suite finished", report.suite);
            for outcome in &report.outcomes {
                println!(
                    "  {} {} ({})",
                    if outcome.succeeded() { "✅" } else { "❌" },
                    outcome.definition.display_name,
                    outcome.config_path.display()
                );
            }
            println!("  Passed: {}, Failed: {}", report.passed(), report.failed());
        }
        Target::Config(path) => {
            let outcome = runner.run(&suites.resolve_config(&path)).await;
            println!(
                "\n{} {}",
                if outcome.succeeded() { "✅" } else { "❌" },
                outcome.definition.display_name
            );
        }
    }

    if config.baseline.enabled {
        println!(
            "\n📋 Baseline placeholders in {} await manual population \
             (monitoring API token: ${}).",
            config
                .baseline
                .placeholder_dir_in(&config.paths.results_dir)
                .display(),
            config.baseline.token_env_var
        );
    }

    Ok(())
}

fn print_catalog() {
    println!("Suites:");
    for suite in Suite::ALL {
        println!("  {} ({}): {}", suite, suite.alias(), suite.description());
    }

    println!("\nTests:");
    for id in TestId::ALL {
        let def = id.definition();
        println!(
            "  {:<24} {:<22} concurrency {:>4}, {:>4} RPS{}",
            def.identifier,
            def.display_name,
            def.concurrency_limit,
            def.rps_target,
            def.warning
                .map(|w| format!("  ⚠️  {w}"))
                .unwrap_or_default()
        );
    }
}

/// Initialize logging
fn init_logging(logging: &LoggingConfig) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let subscriber = fmt().with_env_filter(env_filter).with_target(false);

    if logging.format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}
