//! Survey harness CLI

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use decision_benchmark::{
    config::Config,
    providers::{create_all_providers, create_provider},
    reporting::write_csv,
    runner::{Executor, ExecutorConfig},
    survey::Survey,
};

#[derive(Parser)]
#[command(name = "decision-benchmark")]
#[command(about = "Financial decision-making survey harness for LLM providers")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output (per-question parse decisions)
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the survey across N trials against one provider
    Run {
        /// Provider to query (openai, deepseek, gemini)
        #[arg(short, long)]
        provider: Option<String>,

        /// Number of trials
        #[arg(short, long)]
        trials: Option<u32>,

        /// Maximum trials in flight at once
        #[arg(long)]
        parallel: Option<usize>,

        /// Path to the survey prompt file
        #[arg(long)]
        prompt: Option<PathBuf>,

        /// Output CSV path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Use canned responses instead of network calls
        #[arg(long)]
        dry_run: bool,
    },

    /// Probe provider availability
    Check {
        /// Provider to probe (default: all with API keys set)
        #[arg(short, long)]
        provider: Option<String>,
    },

    /// Generate sample configuration
    InitConfig {
        /// Output path for configuration file
        #[arg(short, long, default_value = "config/survey.toml")]
        output: PathBuf,
    },
}

fn log_filter(verbose: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new("decision_benchmark=debug,info")
    } else {
        EnvFilter::new("decision_benchmark=info,warn")
    }
}

/// Console-only logging for short-lived subcommands.
fn init_console_logging(verbose: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(verbose))
        .init();
}

/// Console plus a persistent log file for survey runs.
fn init_run_logging(log_path: &Path, verbose: bool) -> Result<(), Box<dyn Error>> {
    let file = fs::File::create(log_path)?;

    let console_layer = tracing_subscriber::fmt::layer();
    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(Arc::new(file));

    tracing_subscriber::registry()
        .with(log_filter(verbose))
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load_or_default(),
    };

    match cli.command {
        Commands::Run {
            provider,
            trials,
            parallel,
            prompt,
            output,
            dry_run,
        } => {
            run_survey(
                config, provider, trials, parallel, prompt, output, dry_run, cli.verbose,
            )
            .await?;
        }

        Commands::Check { provider } => {
            init_console_logging(cli.verbose);
            check_providers(&config, provider).await?;
        }

        Commands::InitConfig { output } => {
            init_console_logging(cli.verbose);
            config.save_toml(&output)?;
            println!("Wrote sample configuration to {}", output.display());
        }
    }

    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn run_survey(
    config: Config,
    provider_arg: Option<String>,
    trials_arg: Option<u32>,
    parallel_arg: Option<usize>,
    prompt_arg: Option<PathBuf>,
    output_arg: Option<PathBuf>,
    dry_run: bool,
    verbose: bool,
) -> Result<(), Box<dyn Error>> {
    let started_at = Utc::now();
    let run_id = started_at.format("%Y%m%d_%H%M%S").to_string();

    let name = if dry_run {
        "dry-run".to_string()
    } else {
        provider_arg.ok_or("--provider is required (openai, deepseek, gemini) unless --dry-run")?
    };

    let trials = trials_arg.unwrap_or(config.survey.trials);
    let parallel = parallel_arg.unwrap_or(config.survey.parallel_requests);

    let log_dir = Path::new(&config.output.log_dir);
    fs::create_dir_all(log_dir)?;
    let log_path = log_dir.join(format!(
        "{}_run_{}_{}.log",
        name.replace('-', "_"),
        trials,
        run_id
    ));
    init_run_logging(&log_path, verbose)?;

    println!("=== Financial Decision Survey ===");
    println!("Run ID:   {}", run_id);
    println!("Provider: {}", name);
    println!("Trials:   {} ({} parallel)", trials, parallel);
    println!();

    let provider = create_provider(&name, &config)?;

    let prompt_path = prompt_arg.unwrap_or_else(|| PathBuf::from(&config.survey.prompt_file));
    let survey = Survey::from_file(&prompt_path, config.survey.question_count)?;

    let executor_config = ExecutorConfig {
        parallel_requests: parallel,
        max_attempts: config.survey.max_attempts,
        retry_delay_ms: config.survey.retry_delay_ms,
        rate_limit_delay_ms: config.survey.rate_limit_delay_ms,
        timeout_ms: config.survey.timeout_ms,
        max_tokens: config.survey.max_tokens,
        temperature: config.survey.temperature,
        parser_mode: config.parser_mode(&name),
    };
    let executor = Executor::new(provider.clone(), survey, executor_config);

    tracing::info!(
        "running {} trials on {} (model {})",
        trials,
        provider.name(),
        provider.default_model()
    );
    let rows = executor.run(trials).await;
    let failed = trials as usize - rows.len();

    let output_path = output_arg.unwrap_or_else(|| {
        PathBuf::from(&config.output.output_dir).join(format!("{}_{}.csv", name, run_id))
    });
    write_csv(&output_path, &rows, config.survey.question_count)?;

    tracing::info!("completed {}/{} trials ({} failed)", rows.len(), trials, failed);
    tracing::info!("results saved to {}", output_path.display());
    tracing::info!("log saved to {}", log_path.display());

    if rows.is_empty() && trials > 0 {
        // The (header-only) table was still written above.
        eprintln!(
            "error: all {} trials failed; see {}",
            trials,
            log_path.display()
        );
        std::process::exit(1);
    }

    Ok(())
}

async fn check_providers(config: &Config, name: Option<String>) -> Result<(), Box<dyn Error>> {
    let providers = match name {
        Some(n) => vec![create_provider(&n, config)?],
        None => create_all_providers(config),
    };

    if providers.is_empty() {
        eprintln!("Error: no providers available. Set API keys in environment.");
        eprintln!("  OPENAI_API_KEY for OpenAI");
        eprintln!("  DEEPSEEK_API_KEY for DeepSeek");
        eprintln!("  GEMINI_API_KEY for Gemini");
        std::process::exit(1);
    }

    let mut any_failed = false;
    for provider in providers {
        match provider.health_check().await {
            Ok(true) => println!("{}: OK ({})", provider.name(), provider.default_model()),
            Ok(false) => {
                println!("{}: FAILED", provider.name());
                any_failed = true;
            }
            Err(e) => {
                println!("{}: ERROR - {}", provider.name(), e);
                any_failed = true;
            }
        }
    }

    if any_failed {
        std::process::exit(1);
    }

    Ok(())
}
