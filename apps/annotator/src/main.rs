mod annotation;
mod config;
mod errors;
mod llm_client;
mod models;
mod output;
mod records;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::annotation::prompts::DEFAULT_JOB_DESCRIPTION;
use crate::annotation::{AnnotationTask, ModelTarget, Orchestrator, TaskKind};
use crate::config::Config;
use crate::errors::AppError;
use crate::llm_client::{
    Backend, GroqClient, LlmClient, OllamaClient, DEFAULT_LOCAL_MODEL, DEFAULT_REMOTE_MODEL,
};
use crate::output::CsvResultWriter;

/// Scores résumé records with an LLM and writes one joined table per model.
#[derive(Parser, Debug)]
#[command(name = "annotator")]
#[command(version)]
struct Cli {
    /// Records file: a JSON array, or JSON Lines when the extension is .jsonl
    #[arg(short, long, default_value = "data/cleaned_resumes.json")]
    input: PathBuf,

    /// Directory for per-task and final CSV files
    #[arg(short, long, default_value = "output")]
    output_dir: PathBuf,

    #[arg(short, long, value_enum, default_value_t = Backend::Local)]
    backend: Backend,

    /// Models to run, comma separated. Defaults to one model per backend
    #[arg(short, long, value_delimiter = ',')]
    models: Vec<String>,

    /// Run every model installed on the local backend
    #[arg(long, conflicts_with = "models")]
    all_local_models: bool,

    /// Tasks to run, comma separated. Defaults to all of them
    #[arg(short, long, value_enum, value_delimiter = ',')]
    tasks: Vec<TaskKind>,

    /// Overrides every task's in-flight request limit
    #[arg(short, long)]
    concurrency: Option<usize>,

    /// Print the local backend's installed models and exit
    #[arg(long)]
    list_models: bool,

    /// Keep records whose personal_info is empty
    #[arg(long)]
    keep_empty: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting annotator v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = cli.check(&config) {
        error!(code = e.code(), "{}", e);
        return Err(e.into());
    }

    let remote = config
        .groq_api_key
        .clone()
        .map(|key| GroqClient::new(key, config.groq_api_url.clone()));
    let llm = Arc::new(LlmClient::new(
        remote,
        OllamaClient::new(config.ollama_url.clone()),
        config.retry_policy(),
    ));
    info!("LLM client initialized (backend: {})", cli.backend);

    if cli.list_models {
        for model in llm.local().list_models().await? {
            println!("{model}");
        }
        return Ok(());
    }

    let models = resolve_models(&cli, &llm).await?;
    let tasks = build_tasks(&cli, &config)?;

    let records: Vec<_> = records::load_records(&cli.input, cli.keep_empty)?
        .into_iter()
        .map(Arc::new)
        .collect();
    if records.is_empty() {
        bail!("no usable records in {}", cli.input.display());
    }
    let years = records::years_experience_table(records.iter().map(|r| r.as_ref()))?;

    let mut writer = CsvResultWriter::new(&cli.output_dir)?;
    let orchestrator = Orchestrator::new(llm);
    let mut aborted = Vec::new();

    for model in models {
        let target = ModelTarget::new(model, cli.backend);
        info!("Annotating {} records with {}", records.len(), target.model);

        let mut report = orchestrator
            .run(&tasks, &records, &target, &mut writer)
            .await
            .map_err(|e| {
                error!(code = e.code(), "Pipeline stopped for {}: {}", target.model, e);
                e
            })?;
        report.table.left_join(&years);
        writer.write_final(&target.model, &report.table)?;

        aborted.extend(
            report
                .failures
                .into_iter()
                .map(|f| format!("{}/{} ({})", target.model, f.task, f.error.code())),
        );
    }

    if !aborted.is_empty() {
        error!("{} task run(s) aborted: {}", aborted.len(), aborted.join(", "));
        bail!("aborted task runs: {}", aborted.join(", "));
    }

    info!("Done");
    Ok(())
}

impl Cli {
    /// Rejects flag combinations the configured backends cannot serve.
    fn check(&self, config: &Config) -> Result<(), AppError> {
        if self.backend == Backend::Remote && config.groq_api_key.is_none() {
            return Err(AppError::Config(
                "--backend remote needs GROQ_API_KEY to be set".to_string(),
            ));
        }
        if self.backend == Backend::Remote && self.all_local_models {
            return Err(AppError::Config(
                "--all-local-models lists the local backend's models and needs --backend local"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

async fn resolve_models(cli: &Cli, llm: &LlmClient) -> Result<Vec<String>> {
    if cli.all_local_models {
        let models = llm
            .local()
            .list_models()
            .await
            .context("Failed to list local models")?;
        if models.is_empty() {
            bail!("the local backend has no installed models");
        }
        return Ok(models);
    }
    if !cli.models.is_empty() {
        return Ok(cli.models.clone());
    }
    Ok(vec![match cli.backend {
        Backend::Remote => DEFAULT_REMOTE_MODEL.to_string(),
        Backend::Local => DEFAULT_LOCAL_MODEL.to_string(),
    }])
}

fn build_tasks(cli: &Cli, config: &Config) -> Result<Vec<Arc<AnnotationTask>>> {
    let job_description: Arc<str> = match &config.job_description_path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read job description {}", path.display()))?
            .into(),
        None => DEFAULT_JOB_DESCRIPTION.into(),
    };

    let kinds = if cli.tasks.is_empty() {
        TaskKind::all()
    } else {
        cli.tasks.clone()
    };

    Ok(kinds
        .into_iter()
        .map(|kind| {
            let task = kind.build(&job_description);
            let task = match cli.concurrency {
                Some(limit) => task.with_concurrency(limit),
                None => task,
            };
            Arc::new(task)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("annotator").chain(args.iter().copied())).unwrap()
    }

    fn config(api_key: Option<&str>) -> Config {
        let api_key = api_key.map(str::to_string);
        Config::from_lookup(|key| match key {
            "GROQ_API_KEY" => api_key.clone(),
            _ => None,
        })
        .unwrap()
    }

    #[test]
    fn test_all_local_models_needs_local_backend() {
        let err = cli(&["--backend", "remote", "--all-local-models"])
            .check(&config(Some("gsk_test")))
            .unwrap_err();
        assert_eq!(err.code(), "CONFIG_ERROR");
        assert!(err.to_string().contains("--all-local-models"));

        assert!(cli(&["--all-local-models"]).check(&config(None)).is_ok());
    }

    #[test]
    fn test_remote_backend_needs_api_key() {
        let err = cli(&["--backend", "remote"]).check(&config(None)).unwrap_err();
        assert_eq!(err.code(), "CONFIG_ERROR");
        assert!(cli(&["--backend", "remote"]).check(&config(Some("gsk_test"))).is_ok());
    }

    #[test]
    fn test_task_and_model_lists_split_on_commas() {
        let cli = cli(&["--tasks", "fit_score,prestige", "-m", "llama3,qwen:7b"]);
        assert_eq!(cli.tasks, vec![TaskKind::FitScore, TaskKind::Prestige]);
        assert_eq!(cli.models, vec!["llama3", "qwen:7b"]);
    }
}
