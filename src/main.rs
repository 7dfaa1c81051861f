use std::path::PathBuf;
use std::sync::atomic::Ordering;

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;

use conductor::config::{RunConfig, DEFAULT_MAX_ITERATIONS, DEFAULT_MAX_TOOL_ITERATIONS, DEFAULT_OUTPUT_DIR};
use conductor::llm::ProviderKind;
use conductor::orchestrator::Engine;
use conductor::prompts::DEFAULT_REQUIREMENT;
use conductor::state::StateStore;

#[derive(Parser)]
#[command(
    name = "conductor",
    version,
    about = "Plan, generate, and evaluate project files with LLM workers"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pipeline: plan, generate files, evaluate
    Run {
        /// Project requirement; a built-in demo requirement when omitted
        #[arg(long)]
        requirement: Option<String>,

        /// Directory generated files are written to
        #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
        output_dir: PathBuf,

        /// Ceiling on scheduling iterations for the whole run
        #[arg(long, default_value_t = DEFAULT_MAX_ITERATIONS)]
        max_iterations: u32,

        /// Ceiling on reasoning calls per task
        #[arg(long, default_value_t = DEFAULT_MAX_TOOL_ITERATIONS)]
        max_tool_iterations: u32,

        /// LLM backend: deepseek, openai, or mock
        #[arg(long, default_value = "mock")]
        provider: ProviderKind,

        /// Model override for the chosen provider
        #[arg(long)]
        model: Option<String>,

        /// API key; falls back to the provider's environment variable
        #[arg(long)]
        api_key: Option<String>,

        /// Discard persisted state instead of resuming
        #[arg(long)]
        fresh: bool,
    },

    /// Show the persisted state of the last run
    Status {
        #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
        output_dir: PathBuf,
    },

    /// Delete the persisted run state
    Reset {
        #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
        output_dir: PathBuf,
    },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("conductor=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing();

    let code = match dispatch(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {e:#}", style("error:").red().bold());
            1
        }
    };
    std::process::exit(code);
}

async fn dispatch(cli: Cli) -> Result<i32> {
    match cli.command {
        Command::Run {
            requirement,
            output_dir,
            max_iterations,
            max_tool_iterations,
            provider,
            model,
            api_key,
            fresh,
        } => {
            let mut config = RunConfig::new(
                requirement.unwrap_or_else(|| DEFAULT_REQUIREMENT.to_string()),
                output_dir,
            );
            config.max_iterations = max_iterations;
            config.max_tool_iterations = max_tool_iterations;
            config.provider = provider;
            config.model = model;
            config.api_key = api_key;
            config.fresh = fresh;

            let mut engine = Engine::new(config)?;

            let flag = engine.interrupt_handle();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    flag.store(true, Ordering::SeqCst);
                }
            });

            let report = engine.run().await?;
            println!("{}", report.render());
            Ok(if report.succeeded() { 0 } else { 1 })
        }

        Command::Status { output_dir } => {
            let config = RunConfig::new("", output_dir);
            let store = StateStore::load(config.state_path())?;
            print_status(&store);
            Ok(0)
        }

        Command::Reset { output_dir } => {
            let config = RunConfig::new("", output_dir);
            let mut store = StateStore::load(config.state_path())?;
            store.reset()?;
            println!("Run state cleared.");
            Ok(0)
        }
    }
}

fn print_status(store: &StateStore) {
    let state = store.state();
    let Some(plan) = &state.plan else {
        println!("No run state at {}.", store.path().display());
        return;
    };

    println!("{}", style("run state").bold().underlined());
    println!("  project:   {}", plan.project_name);
    println!(
        "  tasks:     {}/{} completed",
        state.completed_tasks.len(),
        plan.tasks.len()
    );
    println!("  files:     {}", state.created_files.len());
    if let Some(eval) = &state.evaluation {
        println!("  score:     {}/100", eval.overall_score);
    }
    if let Some(updated) = &state.last_updated {
        println!("  updated:   {updated}");
    }
}
