use clap::{Parser, Subcommand, ValueEnum};
use educrew_agent::{CrewConfig, Orchestrator};
use educrew_core::{
    ConfigError, CrewError, InMemoryProfileStore, Priority, Task, TaskKind, TaskPayload,
};
use educrew_responder::{
    AzureOpenAiResponder, OfflineResponder, RateLimitedClient, Responder, RetryPolicy,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

mod demo;

#[derive(Parser, Debug)]
#[command(name = "educrew", version)]
#[command(about = "Educrew - a crew of tutoring agents for young learners")]
struct Cli {
    /// TOML file with crew configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Per-task timeout, e.g. `5s` or `750ms`
    #[arg(long, global = true, value_parser = humantime::parse_duration)]
    timeout: Option<Duration>,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Json)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the crew's agents and what they handle
    Agents,
    /// Execute a single task
    Run {
        /// Task kind, e.g. `generate_hint`
        #[arg(long)]
        kind: TaskKind,
        #[arg(long, default_value = "medium")]
        priority: Priority,
        /// Kind-specific parameters as a JSON object
        #[arg(long, default_value = "{}")]
        payload: String,
    },
    /// Run a sample session and print outcomes and stats
    Demo {
        /// Run the sample tasks as a concurrent batch
        #[arg(long)]
        parallel: bool,
    },
    /// Check that the upstream responder answers
    Check,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Crew(#[from] CrewError),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid payload: {0}")]
    Payload(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct DemoReport {
    mode: &'static str,
    outcomes: Vec<educrew_agent::ExecutionOutcome>,
    stats: educrew_agent::CrewStats,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    if let Err(e) = run(cli).await {
        tracing::error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(format: LogFormat) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);
    let _ = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    };
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let mut policy = RetryPolicy::from_env()?;
    let responder = match AzureOpenAiResponder::from_env() {
        Ok(responder) => {
            tracing::info!("Using Azure OpenAI responder");
            Arc::new(responder) as Arc<dyn Responder>
        }
        Err(e) => {
            // offline calls never succeed, one attempt each
            tracing::warn!(reason = %e, "Azure OpenAI not configured, running offline");
            policy.max_attempts = 1;
            Arc::new(OfflineResponder)
        }
    };
    let client = Arc::new(RateLimitedClient::new(responder, policy));

    if matches!(cli.command, Commands::Check) {
        let reachable = client.test_connection().await;
        print_json(&serde_json::json!({ "reachable": reachable }))?;
        return Ok(());
    }

    let config = load_config(cli.config.as_deref(), cli.timeout)?;
    let crew = Orchestrator::standard(client, Arc::new(InMemoryProfileStore::new()), config)?;

    match cli.command {
        Commands::Agents => print_json(&crew.available_agents()),
        Commands::Run {
            kind,
            priority,
            payload,
        } => {
            let params: serde_json::Value = serde_json::from_str(&payload)?;
            let task = Task::new(TaskPayload::from_params(kind, params)?).with_priority(priority);
            let outcome = crew.execute(task).await?;
            print_json(&outcome)
        }
        Commands::Demo { parallel } => {
            let tasks = demo::session_tasks();
            let (mode, outcomes) = if parallel {
                ("parallel", crew.execute_parallel(tasks).await)
            } else {
                ("workflow", crew.orchestrate_workflow(tasks).await?)
            };
            print_json(&DemoReport {
                mode,
                outcomes,
                stats: crew.stats(),
            })
        }
        Commands::Check => Ok(()),
    }
}

fn load_config(
    path: Option<&std::path::Path>,
    timeout: Option<Duration>,
) -> Result<CrewConfig, CliError> {
    let config = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path).map_err(|source| CliError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            CrewConfig::from_toml_str(&raw)?
        }
        None => CrewConfig::from_env()?,
    };
    Ok(match timeout {
        Some(timeout) => config.with_task_timeout(timeout),
        None => config,
    })
}

fn print_json(value: &impl Serialize) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
