//! CodePulse CLI — the Workflow Engine's command-line front end (component
//! C11): `analyze`, `resume` and `show`, kept as a single binary with
//! subcommands rather than the teacher's one-binary-per-mode layout, since
//! there is only one engine to front here.

use clap::{Parser, Subcommand};
use codepulse_engine::{CheckpointStore, WorkflowEngine};
use codepulse_llm::{LlmClient, LlmConfig};
use codepulse_utils::EngineConfig;

#[derive(Parser)]
#[command(name = "codepulse")]
#[command(about = "Code Analysis Pipeline Engine")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start analyzing a repository, printing its assigned thread id
    Analyze {
        /// Remote git URL or local path to the repository
        repo: String,
    },
    /// Resume an in-progress or previously-timed-out analysis thread
    Resume {
        /// The thread id returned by `analyze`
        thread_id: String,
    },
    /// Print the latest state, consolidated report, or PRD for a thread
    Show {
        thread_id: String,
        #[arg(long)]
        consolidated: bool,
        #[arg(long)]
        prd: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _logging_guard = codepulse_utils::init_from_env()?;
    let config = EngineConfig::load()?;
    let cli = Cli::parse();

    let llm = LlmClient::new(LlmConfig::from_engine_config(&config));
    let store = CheckpointStore::open(&config.store_uri, &config.store_database)?;
    let timeout = std::time::Duration::from_secs(config.workflow_timeout_secs);
    let engine = WorkflowEngine::new(llm, store, timeout);

    match cli.command {
        Commands::Analyze { repo } => {
            let thread_id = uuid::Uuid::new_v4().to_string();
            let state = engine.run(&thread_id, &repo).await?;
            println!("thread_id: {thread_id}");
            println!("languages_used: {:?}", state.languages_used);
        }
        Commands::Resume { thread_id } => {
            let state = engine.resume(&thread_id).await?;
            println!("thread_id: {thread_id}");
            println!("product_requirements populated: {}", !state.product_requirements.is_empty());
        }
        Commands::Show { thread_id, consolidated, prd } => {
            let checkpoint = engine
                .checkpoints()
                .latest(&thread_id)?
                .ok_or_else(|| anyhow::anyhow!("no thread found with id {thread_id}"))?;
            if prd {
                println!("{}", checkpoint.state.product_requirements);
            } else if consolidated {
                println!("{}", checkpoint.state.consolidated_report);
            } else {
                println!("{}", serde_json::to_string_pretty(&checkpoint.state)?);
            }
        }
    }

    Ok(())
}
