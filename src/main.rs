mod cli;

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command, StateQuery};
use loan_review::config::LoanReviewConfig;
use loan_review::mailer::LogMailer;
use loan_review::notifier::StepFunctionsNotifier;
use loan_review::parameters::{ParameterCache, StaticParameters};
use loan_review::steps::WorkflowSteps;
use loan_review::store::{FileStore, StateStore};
use loan_review::telemetry;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = LoanReviewConfig::load(cli.config.as_deref())?;
    telemetry::init(&config, cli.verbose);

    let store = Arc::new(
        FileStore::open(&config.data_dir, &config.state_table, &config.audit_table_name())
            .await
            .context("failed to open workflow store")?,
    );

    match cli.command {
        Command::Invoke { file } => invoke(&config, store, file.as_deref()).await,
        Command::State(query) => show_state(store.as_ref(), &query).await,
    }
}

async fn invoke(
    config: &LoanReviewConfig,
    store: Arc<FileStore>,
    file: Option<&Path>,
) -> Result<()> {
    let raw = match file {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read step input from stdin")?;
            buf
        }
    };
    let input: serde_json::Value =
        serde_json::from_str(&raw).context("step input is not valid JSON")?;

    let notifier = StepFunctionsNotifier::new(
        config.control_endpoint(),
        config.connect_timeout(),
        config.request_timeout(),
    )
    .context("failed to build orchestration notifier")?;
    let parameters = ParameterCache::new(
        Arc::new(StaticParameters::new(config.parameters.clone())),
        config.parameter_prefix.clone(),
    );
    let steps =
        WorkflowSteps::with_store(store, Arc::new(notifier), Arc::new(LogMailer), parameters);

    info!(endpoint = %config.control_endpoint(), "Dispatching step input");
    let output = steps.dispatch(input).await;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn show_state(store: &FileStore, query: &StateQuery) -> Result<()> {
    let found = match (&query.request, &query.execution, &query.loan) {
        (Some(request), Some(execution), _) => store.find_by_key(request, execution).await?,
        (_, _, Some(loan)) => store.find_most_recent_by_loan_number(loan).await?,
        _ => anyhow::bail!("either --request with --execution or --loan is required"),
    };

    match found {
        Some(state) => println!("{}", serde_json::to_string_pretty(&state)?),
        None => println!("Workflow state not found"),
    }
    Ok(())
}
