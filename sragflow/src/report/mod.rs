//! The report-generation pipeline.
//!
//! `insert_data → insert_news → main_agent → create_graphics → build_report`,
//! halting on the first `error`.

mod dates;
#[cfg(test)]
mod scenario_tests;
mod steps;

pub use dates::{verify_report_date, DateResolution};
pub use steps::{BuildReport, CreateGraphics, InsertData, InsertNews, MainAgent};

use crate::analysis::{ReportAuthor, SectionId};
use crate::collaborators::{ChartPlotter, NewsSearch, ReportRenderer};
use crate::core::{keys, PipelineState};
use crate::errors::{PipelineValidationError, StateError};
use crate::pipeline::{BranchPolicy, Sequencer, SequencerBuilder};
use crate::store::RecordSource;
use chrono::NaiveDate;
use std::path::PathBuf;
use std::sync::Arc;

/// Name of the report pipeline.
pub const PIPELINE_NAME: &str = "report";

/// Where report artifacts are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    data_dir: PathBuf,
}

impl ReportPaths {
    /// Artifacts go under `<data_dir>/graphics` and `<data_dir>/reports`.
    #[must_use]
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Chart of daily cases over the last 30 days.
    #[must_use]
    pub fn monthly_chart(&self) -> PathBuf {
        self.chart("monthly-analysis")
    }

    /// Chart of monthly cases over the last 12 months.
    #[must_use]
    pub fn yearly_chart(&self) -> PathBuf {
        self.chart("yearly-analysis")
    }

    /// The rendered report.
    #[must_use]
    pub fn report_file(&self) -> PathBuf {
        self.data_dir.join("reports").join("relatorio_influenza.pdf")
    }

    /// Path of a chart as seen from the report directory.
    #[must_use]
    pub fn relative_to_report(chart: &std::path::Path) -> String {
        let name = chart
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        format!("../graphics/{name}")
    }

    fn chart(&self, name: &str) -> PathBuf {
        self.data_dir.join("graphics").join(format!("{name}.png"))
    }
}

/// Collaborators of the report pipeline.
#[derive(Debug, Clone)]
pub struct ReportDeps {
    /// Aggregation source.
    pub source: Arc<dyn RecordSource>,
    /// News search.
    pub news: Arc<dyn NewsSearch>,
    /// Section author.
    pub author: Arc<dyn ReportAuthor>,
    /// Chart plotter.
    pub plotter: Arc<dyn ChartPlotter>,
    /// Document renderer.
    pub renderer: Arc<dyn ReportRenderer>,
    /// Artifact locations.
    pub paths: ReportPaths,
}

/// Registers the report steps on a builder.
///
/// # Errors
///
/// Returns an error if step registration fails.
pub fn report_pipeline(deps: &ReportDeps) -> Result<SequencerBuilder, PipelineValidationError> {
    SequencerBuilder::new(PIPELINE_NAME)
        .with_policy(BranchPolicy::HaltOnError)
        .add_step("insert_data", Arc::new(InsertData::new(deps.source.clone())))?
        .add_step("insert_news", Arc::new(InsertNews::new(deps.news.clone())))?
        .add_step("main_agent", Arc::new(MainAgent::new(deps.author.clone())))?
        .add_step(
            "create_graphics",
            Arc::new(CreateGraphics::new(deps.plotter.clone(), deps.paths.clone())),
        )?
        .add_step(
            "build_report",
            Arc::new(BuildReport::new(deps.renderer.clone(), deps.paths.clone())),
        )
}

/// Builds and compiles the report pipeline.
///
/// # Errors
///
/// Returns an error if the pipeline cannot be compiled.
pub fn build_report_pipeline(deps: &ReportDeps) -> Result<Sequencer, PipelineValidationError> {
    report_pipeline(deps)?.compile()
}

/// The initial state of a report run.
///
/// # Errors
///
/// Returns an error if a value cannot be encoded.
pub fn initial_report_state(
    report_date: NaiveDate,
    sections: &[SectionId],
) -> Result<PipelineState, StateError> {
    let mut state = PipelineState::new();
    state.set(keys::REPORT_DATE, &report_date)?;
    state.set(keys::SECTIONS, sections)?;
    Ok(state)
}
