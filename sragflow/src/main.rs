//! `srag-report`: set up the database, load surveillance records and
//! generate the SRAG report.

use anyhow::{Context, Result};
use clap::Parser;
use sragflow::analysis::LlmAuthor;
use sragflow::collaborators::{GnuplotPlotter, LatexRenderer, OpenAiModel, TavilySearch};
use sragflow::config::AppConfig;
use sragflow::observability::{init_tracing, LogFormat};
use sragflow::report::{ReportDeps, ReportPaths};
use sragflow::runner::{self, Cli, ExitStatus, Pipelines, RunPlan};
use sragflow::store::PostgresStore;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::error;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitStatus::Failure.into()
            } else {
                ExitStatus::Success.into()
            };
        }
    };

    let _ = dotenvy::dotenv();
    init_tracing(cli.verbose, LogFormat::from_env());

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            error!(error = %err, "Failed to start the async runtime");
            return ExitStatus::Failure.into();
        }
    };

    runtime.block_on(supervise(cli)).into()
}

/// Runs the CLI on its own task so a panic or Ctrl-C still yields an exit code.
async fn supervise(cli: Cli) -> ExitStatus {
    let today = chrono::Local::now().date_naive();
    let task = tokio::spawn(async move { runner::run(&cli, today, build_pipelines).await });
    runner::supervise(task, tokio::signal::ctrl_c()).await
}

fn build_pipelines(plan: &RunPlan) -> Result<Pipelines> {
    let config = AppConfig::from_env().context("Invalid configuration")?;
    let store = Arc::new(
        PostgresStore::from_config(&config.database).context("Database is not configured")?,
    );

    let report = match plan.report {
        Some(_) => Some(report_deps(&config, store.clone())?),
        None => None,
    };

    Ok(Pipelines {
        warehouse: store,
        input_file: config.input_file.clone(),
        report,
    })
}

fn report_deps(config: &AppConfig, store: Arc<PostgresStore>) -> Result<ReportDeps> {
    let timeout = config.http_timeout();
    let news = TavilySearch::from_config(&config.news, timeout).context("News search is not configured")?;
    let model = OpenAiModel::from_config(&config.model, timeout).context("Language model is not configured")?;

    Ok(ReportDeps {
        source: store,
        news: Arc::new(news),
        author: Arc::new(LlmAuthor::new(Arc::new(model))),
        plotter: Arc::new(GnuplotPlotter::default()),
        renderer: Arc::new(LatexRenderer::default()),
        paths: ReportPaths::new(&config.data_dir),
    })
}
