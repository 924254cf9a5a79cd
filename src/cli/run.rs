//! Run command - executes one workflow

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use clap::Args;
use tracing::info;

use crate::config::AppConfig;
use crate::domain::store::{ConfigurationRepository, ExecutionLogRepository};
use crate::domain::workflow::{ExecutionContext, OutputFormat, SourceDocument, Workflow, WorkflowExecutor};
use crate::infrastructure::email::ConfiguredEmailSender;
use crate::infrastructure::http::{HttpClient, HttpClientTrait};
use crate::infrastructure::logging::init_logging;
use crate::infrastructure::store::{InMemoryStore, RestStore};
use crate::infrastructure::workflow::WorkflowExecutorImpl;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Workflow definition file (JSON), or a workflow id to load from the store
    #[arg(long)]
    pub workflow: String,

    /// Extracted data (JSON) used as the initial context
    #[arg(long)]
    pub context: PathBuf,

    /// Source PDF the data was extracted from
    #[arg(long)]
    pub document: Option<PathBuf>,

    /// Extraction type id; selects notification settings
    #[arg(long)]
    pub extraction_type: Option<String>,

    /// Id of the user who submitted the document
    #[arg(long)]
    pub user: Option<String>,

    /// Output format configured for the extraction type
    #[arg(long, value_parser = parse_format)]
    pub format: Option<OutputFormat>,

    /// Store seed file (JSON) for offline runs instead of the remote store
    #[arg(long)]
    pub store: Option<PathBuf>,
}

fn parse_format(value: &str) -> Result<OutputFormat, String> {
    serde_json::from_value(serde_json::Value::String(value.to_ascii_lowercase()))
        .map_err(|_| format!("unknown format '{}', expected pdf, csv, json or xml", value))
}

type Stores = (Arc<dyn ConfigurationRepository>, Arc<dyn ExecutionLogRepository>);

async fn open_store(
    args: &RunArgs,
    config: &AppConfig,
    http: Arc<dyn HttpClientTrait>,
) -> anyhow::Result<Stores> {
    if let Some(path) = &args.store {
        let seed = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read store seed {}", path.display()))?;
        let store = Arc::new(InMemoryStore::from_json(&seed)?);
        info!(path = %path.display(), "Using in-memory store");
        let configuration: Arc<dyn ConfigurationRepository> = store.clone();
        let logs: Arc<dyn ExecutionLogRepository> = store;
        return Ok((configuration, logs));
    }

    let (base_url, api_key) = config
        .store
        .credentials()
        .context("No store configured: pass --store or set APP__STORE__BASE_URL and APP__STORE__API_KEY")?;

    info!(base_url = %base_url, "Using remote store");
    let store = Arc::new(RestStore::new(base_url, api_key, http));
    let configuration: Arc<dyn ConfigurationRepository> = store.clone();
    let logs: Arc<dyn ExecutionLogRepository> = store;
    Ok((configuration, logs))
}

async fn load_workflow(reference: &str, config: &dyn ConfigurationRepository) -> anyhow::Result<Workflow> {
    let path = Path::new(reference);
    if path.is_file() {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read workflow {}", path.display()))?;
        return serde_json::from_str(&text)
            .with_context(|| format!("Invalid workflow definition in {}", path.display()));
    }

    config
        .get_workflow(reference)
        .await?
        .with_context(|| format!("Workflow '{}' not found", reference))
}

async fn load_context(args: &RunArgs) -> anyhow::Result<ExecutionContext> {
    let text = tokio::fs::read_to_string(&args.context)
        .await
        .with_context(|| format!("Failed to read context {}", args.context.display()))?;
    let values: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("Invalid JSON in {}", args.context.display()))?;

    let mut document = match &args.document {
        Some(path) => {
            let bytes = tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read document {}", path.display()))?;
            let filename = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "document.pdf".to_string());
            SourceDocument::new(filename).with_pdf(STANDARD.encode(bytes))
        }
        None => SourceDocument::new(
            args.context
                .file_stem()
                .map(|stem| format!("{}.pdf", stem.to_string_lossy()))
                .unwrap_or_else(|| "document.pdf".to_string()),
        ),
    };

    if let Some(id) = &args.extraction_type {
        document = document.with_extraction_type(id.clone());
    }
    if let Some(user) = &args.user {
        document = document.with_user(user.clone());
    }
    if let Some(format) = args.format {
        document = document.with_format_type(format);
    }

    Ok(ExecutionContext::from_value(values).with_document(document))
}

pub async fn run(args: RunArgs) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().unwrap_or_default();
    init_logging(&config.logging);

    let http: Arc<dyn HttpClientTrait> = Arc::new(HttpClient::new());
    let (configuration, logs) = open_store(&args, &config, http.clone()).await?;

    let workflow = load_workflow(&args.workflow, configuration.as_ref()).await?;
    let mut context = load_context(&args).await?;
    if context.document().extraction_type_id.is_none() {
        if let Some(id) = workflow.extraction_type_id() {
            let document = context.document().clone().with_extraction_type(id);
            context = context.with_document(document);
        }
    }

    let sender = Arc::new(ConfiguredEmailSender::new(configuration.clone(), http.clone()));
    let executor = WorkflowExecutorImpl::new(configuration, logs, http, sender);

    let result = executor.execute(&workflow, context).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    if !result.success {
        anyhow::bail!(
            "Workflow '{}' failed: {}",
            workflow.id(),
            result.error.as_deref().unwrap_or("unknown error")
        );
    }

    Ok(())
}
