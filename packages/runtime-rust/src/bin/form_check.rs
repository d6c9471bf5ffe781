//! `form-check`: run a form definition outside a UI.
//!
//! ```bash
//! form-check submit --config form.json --values values.json
//! form-check options --config form.json --field city --parent mh --query pu
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use formwork_core::{FormController, FormDefinition, FormValues, SubmitOutcome, Value};
use formwork_runtime::{init_tracing, DependentOptionResolver, HttpOptionSource, LogFormat, RuntimeConfig};
use serde_json::json;
use tracing::info;

#[derive(Parser)]
#[command(name = "form-check")]
#[command(version)]
#[command(about = "Validate and resolve config-driven forms", long_about = None)]
struct Cli {
    /// Log output format
    #[arg(long, value_enum, default_value = "text", env = "FORMWORK_LOG_FORMAT")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run smart submit over a set of values
    Submit {
        /// JSON array of field configs
        #[arg(long)]
        config: PathBuf,
        /// JSON object of field values
        #[arg(long)]
        values: PathBuf,
    },
    /// Resolve the option list of one field
    Options {
        /// JSON array of field configs
        #[arg(long)]
        config: PathBuf,
        /// Field to resolve
        #[arg(long)]
        field: String,
        /// Parent field value (JSON, or a plain string)
        #[arg(long)]
        parent: Option<String>,
        /// Search query
        #[arg(long, default_value = "")]
        query: String,
        /// Base URL for relative option endpoints
        #[arg(long, env = "FORMWORK_API_URL")]
        base_url: Option<String>,
        /// Request timeout in seconds
        #[arg(long, env = "FORMWORK_REQUEST_TIMEOUT", default_value_t = 15)]
        timeout_secs: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Command::Submit { config, values } => submit(&config, &values),
        Command::Options {
            config,
            field,
            parent,
            query,
            base_url,
            timeout_secs,
        } => {
            let runtime = RuntimeConfig {
                request_timeout: Duration::from_secs(timeout_secs),
                ..RuntimeConfig::default()
            };
            options(&config, &field, parent.as_deref(), &query, base_url, &runtime).await
        }
    }
}

fn load_definition(path: &Path) -> anyhow::Result<FormDefinition> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    FormDefinition::from_json(&json).with_context(|| format!("invalid form definition in {}", path.display()))
}

fn submit(config: &Path, values: &Path) -> anyhow::Result<ExitCode> {
    let definition = load_definition(config)?;
    let raw = std::fs::read_to_string(values)
        .with_context(|| format!("failed to read {}", values.display()))?;
    let values: FormValues = serde_json::from_str(&raw).context("values must be a JSON object")?;

    let mut controller = FormController::new(definition);
    controller.reset(values);
    let outcome = controller.smart_submit(
        |clean| info!(fields = clean.len(), "form submitted"),
        |errors| info!(errors = errors.len(), "form rejected"),
    );

    let (report, code) = match outcome {
        SubmitOutcome::Submitted(clean) => (json!({"status": "submitted", "values": clean}), ExitCode::SUCCESS),
        SubmitOutcome::Rejected(errors) => (json!({"status": "rejected", "errors": errors}), ExitCode::from(2)),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(code)
}

async fn options(
    config: &Path,
    field: &str,
    parent: Option<&str>,
    query: &str,
    base_url: Option<String>,
    runtime: &RuntimeConfig,
) -> anyhow::Result<ExitCode> {
    let definition = load_definition(config)?;
    let field = definition
        .field(field)
        .ok_or_else(|| anyhow!("field {field} is not declared in {}", config.display()))?;

    let mut source = HttpOptionSource::new(runtime)?;
    if let Some(base_url) = base_url {
        source = source.with_base_url(base_url);
    }
    let resolver = DependentOptionResolver::for_field(field, Arc::new(source), runtime);

    let parent = parent.map(|raw| serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::from(raw)));
    resolver.prime(parent.as_ref());
    resolver.search_now(query).await;

    let options = resolver.display_options();
    println!("{}", serde_json::to_string_pretty(&options)?);
    Ok(ExitCode::SUCCESS)
}
