use std::panic;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use coderunner_judge::config::JudgeConfig;
use coderunner_judge::core::domain::{CodingQuestion, ExecutionRequest, Language, RunRequest};
use coderunner_judge::core::errors::RequestError;
use coderunner_judge::core::pipeline::judging::Judge;
use coderunner_judge::core::traits::runner::Runner;
use coderunner_judge::native::executor::NativeExecutor;
use coderunner_judge::native::registry::AdapterRegistry;
use coderunner_judge::native::runner::NativeRunner;
use coderunner_judge::native::workspace::Workspace;

#[derive(Parser)]
#[command(name = "coderunner-judge")]
#[command(about = "Run and judge submissions against coding questions", long_about = None)]
struct Cli {
    /// JSON config file; JUDGE_* environment variables override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program once and print its ExecutionResult
    Run {
        /// Language tag (python, javascript, cpp, java)
        #[arg(short, long)]
        language: String,

        /// Source file
        #[arg(short, long)]
        file: PathBuf,

        /// Wall-clock limit in milliseconds
        #[arg(long)]
        time_limit: Option<u64>,

        /// Memory limit in MB (advisory)
        #[arg(long)]
        memory_limit: Option<u64>,

        /// Question JSON whose sample input is injected
        #[arg(short, long)]
        question: Option<PathBuf>,
    },

    /// Judge a program against a question and print the validation and grade
    Validate {
        #[arg(short, long)]
        language: String,

        #[arg(short, long)]
        file: PathBuf,

        /// Question JSON with sample and stored test cases
        #[arg(short, long)]
        question: PathBuf,
    },
}

#[tokio::main]
#[tracing::instrument]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    set_panic_hook();

    let cli = Cli::parse();
    let config = JudgeConfig::load(cli.config.as_deref())?;

    let workspace = Arc::new(Workspace::init(&config.workspace_dir)?);
    let sweeper = workspace.spawn_sweeper(config.sweep_interval(), config.max_file_age());

    let runner: Arc<dyn Runner> =
        Arc::new(NativeRunner::new(workspace.root(), config.output_limit));
    let registry = AdapterRegistry::from_config(&config, workspace.clone(), runner);
    let judge = Judge::new(Arc::new(NativeExecutor::new(registry)));

    let outcome = handle_command(&judge, cli.command).await;
    sweeper.shutdown().await;

    println!("{}", outcome?);
    Ok(())
}

async fn handle_command(
    judge: &Judge,
    command: Commands,
) -> Result<String, Box<dyn std::error::Error>> {
    match command {
        Commands::Run {
            language,
            file,
            time_limit,
            memory_limit,
            question,
        } => {
            let code = tokio::fs::read_to_string(&file).await?;
            let question = question.as_deref().map(read_question).transpose()?;
            let request = ExecutionRequest::try_from(RunRequest {
                code,
                language,
                time_limit_ms: time_limit,
                memory_limit_mb: memory_limit,
                question_id: question.as_ref().map(|q| q.id.clone()),
            })?;

            let result = judge.run_once(&request, question.as_ref()).await;
            Ok(serde_json::to_string_pretty(&result)?)
        }
        Commands::Validate {
            language,
            file,
            question,
        } => {
            let code = tokio::fs::read_to_string(&file).await?;
            if code.trim().is_empty() {
                return Err(RequestError::EmptyCode.into());
            }
            let language: Language = language.parse()?;
            let question = read_question(&question)?;

            let (validation, grade) = judge.grade(&code, language, &question).await;
            Ok(serde_json::to_string_pretty(&serde_json::json!({
                "validation": validation,
                "grade": grade,
            }))?)
        }
    }
}

fn read_question(path: &Path) -> Result<CodingQuestion, Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn set_panic_hook() {
    panic::set_hook(Box::new(|panic_info| {
        tracing::error!(
            message = "panic occurred",
            panic = %panic_info
        );
    }));
}
