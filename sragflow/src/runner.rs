//! Command-line surface: argument parsing, date validation and the
//! setup → load → report run plan.

use crate::analysis::{SectionId, DEFAULT_SECTIONS};
use crate::core::{keys, PipelineState};
use crate::errors::{DateError, SragflowError};
use crate::load::{build_load_pipeline, build_setup_pipeline};
use crate::pipeline::{PipelineRun, Sequencer};
use crate::report::{build_report_pipeline, initial_report_state, ReportDeps};
use crate::store::Warehouse;
use chrono::NaiveDate;
use clap::Parser;
use std::fmt::Display;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Generate SRAG epidemiological reports.
#[derive(Debug, Clone, Parser)]
#[command(name = "srag-report", version, about = "Generate SRAG epidemiological reports")]
pub struct Cli {
    /// Generate the report for DATE (YYYY-MM-DD or "today")
    #[arg(long = "generate-report", value_name = "DATE")]
    pub generate_report: Option<String>,

    /// Report sections to generate, in order
    #[arg(long, num_args = 1.., value_name = "SECTION", default_values_t = DEFAULT_SECTIONS)]
    pub sections: Vec<SectionId>,

    /// Create the database and the influd_data table
    #[arg(long)]
    pub setup: bool,

    /// Load the input file into influd_data (recreates the table)
    #[arg(long)]
    pub load: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Process exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    /// Every requested pipeline succeeded.
    Success,
    /// Bad arguments, no action, or a failed pipeline.
    Failure,
    /// Interrupted by the user.
    Interrupted,
}

impl ExitStatus {
    /// Numeric process exit code.
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
            Self::Interrupted => 130,
        }
    }
}

impl From<ExitStatus> for std::process::ExitCode {
    fn from(status: ExitStatus) -> Self {
        Self::from(status.code())
    }
}

/// Parses a report date: `today` or a strict `YYYY-MM-DD`.
///
/// # Errors
///
/// Returns `DateError` for anything else.
pub fn validate_date(input: &str, today: NaiveDate) -> Result<NaiveDate, DateError> {
    let trimmed = input.trim();
    if trimmed.eq_ignore_ascii_case("today") {
        return Ok(today);
    }
    let well_formed = trimmed.len() == 10
        && trimmed
            .char_indices()
            .all(|(idx, c)| if idx == 4 || idx == 7 { c == '-' } else { c.is_ascii_digit() });
    if !well_formed {
        return Err(DateError {
            input: input.to_string(),
        });
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map_err(|_| DateError {
        input: input.to_string(),
    })
}

/// A validated report request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    /// Requested report date.
    pub date: NaiveDate,
    /// Sections in generation order.
    pub sections: Vec<SectionId>,
}

/// What a single invocation will run, in execution order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunPlan {
    /// Run the setup pipeline.
    pub setup: bool,
    /// Run the load pipeline.
    pub load: bool,
    /// Run the report pipeline.
    pub report: Option<ReportRequest>,
}

impl RunPlan {
    /// Returns true when nothing was requested.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.setup && !self.load && self.report.is_none()
    }
}

impl Cli {
    /// Validates the arguments into a plan.
    ///
    /// # Errors
    ///
    /// Returns `DateError` if `--generate-report` is not a valid date.
    pub fn plan(&self, today: NaiveDate) -> Result<RunPlan, DateError> {
        let report = self
            .generate_report
            .as_deref()
            .map(|input| {
                validate_date(input, today).map(|date| ReportRequest {
                    date,
                    sections: self.sections.clone(),
                })
            })
            .transpose()?;

        Ok(RunPlan {
            setup: self.setup,
            load: self.load,
            report,
        })
    }
}

/// Collaborators backing the pipelines of a plan.
#[derive(Debug, Clone)]
pub struct Pipelines {
    /// Target of the setup and load pipelines.
    pub warehouse: Arc<dyn Warehouse>,
    /// File consumed by the load pipeline.
    pub input_file: PathBuf,
    /// Report collaborators; required only when a report is requested.
    pub report: Option<ReportDeps>,
}

/// Validates the arguments, builds the collaborators and runs the plan.
///
/// `build` is only called once the plan is known to be runnable, so a bad
/// date or an empty invocation never touches the database.
pub async fn run<F, E>(cli: &Cli, today: NaiveDate, build: F) -> ExitStatus
where
    F: FnOnce(&RunPlan) -> Result<Pipelines, E>,
    E: Display,
{
    let plan = match cli.plan(today) {
        Ok(plan) => plan,
        Err(err) => {
            error!("{err}");
            return ExitStatus::Failure;
        }
    };

    if plan.is_empty() {
        error!("No action specified. Use --setup, --load or --generate-report DATE");
        return ExitStatus::Failure;
    }

    let pipelines = match build(&plan) {
        Ok(pipelines) => pipelines,
        Err(err) => {
            error!(error = %err, "Could not initialize collaborators");
            return ExitStatus::Failure;
        }
    };

    match execute(&plan, &pipelines).await {
        Ok(()) => ExitStatus::Success,
        Err(err) => {
            error!(error = %err, "Run failed");
            ExitStatus::Failure
        }
    }
}

/// Runs the requested pipelines in order, stopping at the first failure.
///
/// # Errors
///
/// Returns the failing pipeline's error message, or a validation error
/// when a pipeline cannot be built.
pub async fn execute(plan: &RunPlan, pipelines: &Pipelines) -> Result<(), SragflowError> {
    if plan.setup {
        let pipeline = build_setup_pipeline(&pipelines.warehouse)?;
        check(run_pipeline(&pipeline, PipelineState::new()).await)?;
        info!("Database setup completed");
    }

    if plan.load {
        let pipeline = build_load_pipeline(&pipelines.warehouse, pipelines.input_file.clone())?;
        let run = check(run_pipeline(&pipeline, PipelineState::new()).await)?;
        let rows: Option<u64> = run.state.get(keys::ROWS_LOADED)?;
        info!(rows = rows.unwrap_or_default(), "Data load completed");
    }

    if let Some(request) = &plan.report {
        let deps = pipelines
            .report
            .as_ref()
            .ok_or_else(|| SragflowError::Step("report collaborators are not configured".to_string()))?;
        let pipeline = build_report_pipeline(deps)?;
        let initial = initial_report_state(request.date, &request.sections)?;
        let run = check(run_pipeline(&pipeline, initial).await)?;
        let path: Option<PathBuf> = run.state.get(keys::REPORT_PATH)?;
        match path {
            Some(path) => info!(path = %path.display(), "Report generated"),
            None => info!("Report pipeline finished"),
        }
    }

    Ok(())
}

/// Waits for a spawned run, or for `interrupt` to fire first.
///
/// A panicked or cancelled task maps to `Failure`, a fired interrupt to
/// `Interrupted`. If the interrupt listener itself fails, the run goes on
/// without it.
pub async fn supervise<I>(mut task: JoinHandle<ExitStatus>, interrupt: I) -> ExitStatus
where
    I: Future<Output = std::io::Result<()>>,
{
    let interrupted = async {
        if let Err(err) = interrupt.await {
            warn!(error = %err, "Could not listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        joined = &mut task => match joined {
            Ok(status) => status,
            Err(err) => {
                error!(error = %err, "Pipeline task aborted");
                ExitStatus::Failure
            }
        },
        () = interrupted => {
            warn!("Interrupted");
            task.abort();
            ExitStatus::Interrupted
        }
    }
}

async fn run_pipeline(pipeline: &Sequencer, initial: PipelineState) -> PipelineRun {
    info!(pipeline = pipeline.name(), "Running pipeline");
    pipeline.run(initial).await
}

fn check(run: PipelineRun) -> Result<PipelineRun, SragflowError> {
    if run.failed() {
        let message = run.state.error_message().unwrap_or("unknown error").to_string();
        return Err(SragflowError::Step(message));
    }
    Ok(run)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::NewsItem;
    use crate::report::ReportPaths;
    use crate::testing::{
        surveillance_records, write_load_file, MemoryStore, RecordingPlotter, RecordingRenderer,
        ScriptedAuthor, StaticNews,
    };
    use pretty_assertions::assert_eq;
    use std::cell::Cell;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["srag-report"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    fn report_deps(store: Arc<MemoryStore>, news: StaticNews, renderer: Arc<RecordingRenderer>) -> ReportDeps {
        ReportDeps {
            source: store,
            news: Arc::new(news),
            author: Arc::new(ScriptedAuthor::default()),
            plotter: Arc::new(RecordingPlotter::default()),
            renderer,
            paths: ReportPaths::new("data"),
        }
    }

    #[test]
    fn test_validate_date() {
        let today = date(2024, 8, 28);
        assert_eq!(validate_date("today", today).unwrap(), today);
        assert_eq!(validate_date("2024-02-29", today).unwrap(), date(2024, 2, 29));
        for bad in ["2024-13-01", "2023-02-29", "28/08/2024", "2024-8-1", "yesterday", ""] {
            let err = validate_date(bad, today).unwrap_err();
            assert_eq!(
                err.to_string(),
                format!("Invalid date format: {bad}. Use YYYY-MM-DD or 'today'")
            );
        }
    }

    #[test]
    fn test_cli_defaults_to_all_sections() {
        let cli = parse(&["--generate-report", "2024-08-28"]);
        assert_eq!(cli.sections, DEFAULT_SECTIONS.to_vec());
        assert!(!cli.setup && !cli.load && !cli.verbose);
    }

    #[test]
    fn test_cli_section_subset_keeps_order() {
        let cli = parse(&["--generate-report", "today", "--sections", "p-taxa-de-ocupacao-uti", "p-aumento-dos-casos"]);
        assert_eq!(cli.sections, vec![SectionId::TaxaDeOcupacaoUti, SectionId::AumentoDosCasos]);
    }

    #[test]
    fn test_cli_rejects_unknown_section() {
        let result = Cli::try_parse_from(["srag-report", "--generate-report", "today", "--sections", "weather"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_plan() {
        let today = date(2024, 8, 28);
        let plan = parse(&["--setup", "--load", "--generate-report", "today"]).plan(today).unwrap();
        assert!(plan.setup && plan.load);
        assert_eq!(plan.report.unwrap().date, today);

        assert!(parse(&[]).plan(today).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bad_date_exits_without_building() {
        let built = Cell::new(false);
        let cli = parse(&["--generate-report", "2024-13-40"]);

        let status = run(&cli, date(2024, 8, 28), |_| {
            built.set(true);
            Err::<Pipelines, _>("unreachable")
        })
        .await;

        assert_eq!(status, ExitStatus::Failure);
        assert_eq!(status.code(), 1);
        assert!(!built.get());
    }

    #[tokio::test]
    async fn test_no_action_exits_with_failure() {
        let built = Cell::new(false);
        let status = run(&parse(&[]), date(2024, 8, 28), |_| {
            built.set(true);
            Err::<Pipelines, _>("unreachable")
        })
        .await;

        assert_eq!(status, ExitStatus::Failure);
        assert!(!built.get());
    }

    #[tokio::test]
    async fn test_build_failure_exits_with_failure() {
        let status = run(&parse(&["--setup"]), date(2024, 8, 28), |_| {
            Err::<Pipelines, _>("DATABASE_URL is not set")
        })
        .await;
        assert_eq!(status, ExitStatus::Failure);
    }

    #[tokio::test]
    async fn test_setup_load_and_report_run_in_order() {
        let today = date(2024, 8, 28);
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("influd.csv");
        write_load_file(&input, &surveillance_records(today, 120)).unwrap();

        let store = Arc::new(MemoryStore::default());
        let renderer = Arc::new(RecordingRenderer::default());
        let news = StaticNews::new(vec![NewsItem {
            title: "Boletim".to_string(),
            url: "https://agencia.fiocruz.br/boletim".to_string(),
            content: String::new(),
            published_date: None,
        }]);

        let cli = parse(&["--setup", "--load", "--generate-report", "today"]);
        let status = run(&cli, today, |plan| {
            assert!(plan.report.is_some());
            Ok::<_, String>(Pipelines {
                warehouse: store.clone(),
                input_file: input.clone(),
                report: Some(report_deps(store.clone(), news, renderer.clone())),
            })
        })
        .await;

        assert_eq!(status, ExitStatus::Success);
        assert_eq!(store.records().len(), 120);
        assert_eq!(renderer.documents().len(), 1);
        assert_eq!(renderer.documents()[0].report_date, today);
    }

    #[tokio::test]
    async fn test_failed_report_exits_with_failure() {
        let store = Arc::new(MemoryStore::with_records(surveillance_records(date(2024, 8, 28), 60)));
        let renderer = Arc::new(RecordingRenderer::default());
        let plan = RunPlan {
            report: Some(ReportRequest {
                date: date(2024, 8, 28),
                sections: DEFAULT_SECTIONS.to_vec(),
            }),
            ..RunPlan::default()
        };
        let pipelines = Pipelines {
            warehouse: store.clone(),
            input_file: PathBuf::from("unused.csv"),
            report: Some(report_deps(store, StaticNews::failing("search offline"), renderer.clone())),
        };

        let err = execute(&plan, &pipelines).await.unwrap_err();

        assert!(err.to_string().contains("search offline"));
        assert!(renderer.documents().is_empty());
    }

    #[tokio::test]
    async fn test_report_without_collaborators_fails() {
        let plan = RunPlan {
            report: Some(ReportRequest {
                date: date(2024, 8, 28),
                sections: DEFAULT_SECTIONS.to_vec(),
            }),
            ..RunPlan::default()
        };
        let pipelines = Pipelines {
            warehouse: Arc::new(MemoryStore::default()),
            input_file: PathBuf::from("unused.csv"),
            report: None,
        };

        assert!(execute(&plan, &pipelines).await.is_err());
    }

    #[tokio::test]
    async fn test_supervise_returns_task_status() {
        let task = tokio::spawn(async { ExitStatus::Success });
        let status = supervise(task, std::future::pending()).await;
        assert_eq!(status, ExitStatus::Success);
    }

    #[tokio::test]
    async fn test_supervise_interrupt_wins_over_pending_run() {
        let task = tokio::spawn(std::future::pending::<ExitStatus>());
        let status = supervise(task, async { Ok(()) }).await;
        assert_eq!(status, ExitStatus::Interrupted);
    }

    #[tokio::test]
    async fn test_supervise_ignores_failed_signal_listener() {
        let task = tokio::spawn(async {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            ExitStatus::Success
        });
        let listener_failed = async { Err(std::io::Error::other("no signal driver")) };

        let status = supervise(task, listener_failed).await;

        assert_eq!(status, ExitStatus::Success);
    }

    #[tokio::test]
    async fn test_supervise_maps_panicked_run_to_failure() {
        async fn exploding_run() -> ExitStatus {
            panic!("step exploded")
        }
        let task = tokio::spawn(exploding_run());
        let status = supervise(task, std::future::pending()).await;
        assert_eq!(status, ExitStatus::Failure);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(ExitStatus::Success.code(), 0);
        assert_eq!(ExitStatus::Failure.code(), 1);
        assert_eq!(ExitStatus::Interrupted.code(), 130);
    }
}
