//! Steps of the report pipeline.

use super::{verify_report_date, ReportPaths};
use crate::analysis::{run_analysis, FinalReport, ReportAuthor, ReportData, SectionId};
use crate::collaborators::{
    ChartPlotter, ChartRequest, Figure, NewsItem, NewsSearch, NewsWindow, ReportDocument,
    ReportRenderer,
};
use crate::core::{keys, PipelineState, StageTag};
use crate::errors::SragflowError;
use crate::query::{AggregationQuery, AggregationService, DateRange, GroupBy, Metric};
use crate::steps::{settle, Step};
use crate::store::RecordSource;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// Days of news searched from the report date on.
pub const NEWS_WINDOW_DAYS: i64 = 15;

const ALL_YEARS_SPAN: u32 = 4;
const DAILY_SPAN_DAYS: i64 = 30;
const MONTHLY_SPAN_MONTHS: u32 = 12;

/// The date queries end at: the resolved date if verification ran,
/// the requested one otherwise.
fn effective_date(state: &PipelineState) -> Result<NaiveDate, SragflowError> {
    match state.get::<NaiveDate>(keys::RESOLVED_DATE)? {
        Some(date) => Ok(date),
        None => Ok(state.require(keys::REPORT_DATE)?),
    }
}

/// Verifies the report date and fetches the three aggregations.
#[derive(Debug)]
pub struct InsertData {
    source: Arc<dyn RecordSource>,
}

impl InsertData {
    /// Creates the step.
    #[must_use]
    pub fn new(source: Arc<dyn RecordSource>) -> Self {
        Self { source }
    }

    async fn execute(&self, state: &mut PipelineState) -> Result<StageTag, SragflowError> {
        let requested: NaiveDate = state.require(keys::REPORT_DATE)?;
        let resolution = verify_report_date(self.source.as_ref(), requested).await?;
        state.set(keys::RESOLVED_DATE, &resolution.resolved)?;
        if resolution.substituted() {
            state.set(
                keys::DATE_SUBSTITUTION,
                &json!({
                    "requested": resolution.requested,
                    "resolved": resolution.resolved,
                }),
            )?;
        }

        let end = resolution.resolved;
        let service = AggregationService::new(self.source.clone());
        let years = DateRange::trailing_years(end, ALL_YEARS_SPAN);
        let days = DateRange::trailing_days(end, DAILY_SPAN_DAYS);
        let months = DateRange::trailing_months(end, MONTHLY_SPAN_MONTHS);

        let all_years = service
            .fetch_all(GroupBy::Year, Some(years.start), Some(years.end))
            .await;
        let monthly = service
            .fetch(
                AggregationQuery::new(Metric::TotalCases, GroupBy::Day)
                    .with_range(Some(days.start), Some(days.end)),
            )
            .await;
        let one_year_interval = service
            .fetch(
                AggregationQuery::new(Metric::TotalCases, GroupBy::Month)
                    .with_range(Some(months.start), Some(months.end)),
            )
            .await;

        if !all_years.is_success() && !monthly.is_success() && !one_year_interval.is_success() {
            return Err(SragflowError::Step("Error getting SRAG data".to_string()));
        }
        for (name, ok) in [
            ("all_years", all_years.is_success()),
            ("monthly", monthly.is_success()),
            ("one_year_interval", one_year_interval.is_success()),
        ] {
            if !ok {
                warn!(aggregation = name, "Aggregation failed, using an empty result");
            }
        }

        let data = ReportData {
            all_years: all_years.into_success().unwrap_or_default(),
            monthly: monthly.into_success().unwrap_or_default(),
            one_year_interval: one_year_interval.into_success().unwrap_or_default(),
        };
        state.set(keys::DATA, &data)?;
        info!(report_date = %end, "SRAG data inserted");
        Ok(StageTag::milestone("data_inserted"))
    }
}

#[async_trait]
impl Step for InsertData {
    async fn run(&self, mut state: PipelineState) -> PipelineState {
        let outcome = self.execute(&mut state).await;
        settle(state, outcome)
    }
}

/// Fetches news published in the window starting at the report date.
#[derive(Debug)]
pub struct InsertNews {
    news: Arc<dyn NewsSearch>,
}

impl InsertNews {
    /// Creates the step.
    #[must_use]
    pub fn new(news: Arc<dyn NewsSearch>) -> Self {
        Self { news }
    }

    async fn execute(&self, state: &mut PipelineState) -> Result<StageTag, SragflowError> {
        let start: NaiveDate = state.require(keys::REPORT_DATE)?;
        let window = NewsWindow::starting_at(start, NEWS_WINDOW_DAYS);
        let items = self.news.search(window).await?;
        info!(count = items.len(), start = %window.start, end = %window.end, "News fetched");
        state.set(keys::NEWS, &items)?;
        Ok(StageTag::milestone("news_inserted"))
    }
}

#[async_trait]
impl Step for InsertNews {
    async fn run(&self, mut state: PipelineState) -> PipelineState {
        let outcome = self.execute(&mut state).await;
        settle(state, outcome)
    }
}

/// Writes each requested section, then the final report.
#[derive(Debug)]
pub struct MainAgent {
    author: Arc<dyn ReportAuthor>,
}

impl MainAgent {
    /// Creates the step.
    #[must_use]
    pub fn new(author: Arc<dyn ReportAuthor>) -> Self {
        Self { author }
    }

    async fn execute(&self, state: &mut PipelineState) -> Result<StageTag, SragflowError> {
        let sections: Vec<SectionId> = state.require(keys::SECTIONS)?;
        let news: Vec<NewsItem> = state.get(keys::NEWS)?.unwrap_or_default();
        let data: ReportData = state.require(keys::DATA)?;
        let report_date = effective_date(state)?;

        let outcome =
            run_analysis(self.author.as_ref(), &sections, report_date, &news, &data).await?;
        state.set(keys::DRAFTS, &outcome.drafts)?;
        state.set(keys::REPORT, &outcome.report)?;
        Ok(StageTag::End)
    }
}

#[async_trait]
impl Step for MainAgent {
    async fn run(&self, mut state: PipelineState) -> PipelineState {
        let outcome = self.execute(&mut state).await;
        settle(state, outcome)
    }
}

/// Draws the 30-day and 12-month charts.
#[derive(Debug)]
pub struct CreateGraphics {
    plotter: Arc<dyn ChartPlotter>,
    paths: ReportPaths,
}

impl CreateGraphics {
    /// Creates the step.
    #[must_use]
    pub fn new(plotter: Arc<dyn ChartPlotter>, paths: ReportPaths) -> Self {
        Self { plotter, paths }
    }

    async fn execute(&self, state: &mut PipelineState) -> Result<StageTag, SragflowError> {
        let data: ReportData = state.get(keys::DATA)?.unwrap_or_default();
        let charts = [
            (&data.monthly, self.paths.monthly_chart(), "Análise Diária - Últimos 30 dias"),
            (
                &data.one_year_interval,
                self.paths.yearly_chart(),
                "Análise Mensal - Últimos 12 meses",
            ),
        ];

        let mut written: Vec<PathBuf> = Vec::new();
        for (table, output, title) in charts {
            if table.is_empty() {
                info!(chart = %output.display(), "No data, skipping chart");
                continue;
            }
            let request = ChartRequest {
                title: title.to_string(),
                series: table.series(),
                output,
            };
            written.push(self.plotter.plot(&request).await?);
        }

        state.set(keys::GRAPHICS, &written)?;
        Ok(StageTag::Success)
    }
}

#[async_trait]
impl Step for CreateGraphics {
    async fn run(&self, mut state: PipelineState) -> PipelineState {
        let outcome = self.execute(&mut state).await;
        settle(state, outcome)
    }
}

/// Renders the final document.
#[derive(Debug)]
pub struct BuildReport {
    renderer: Arc<dyn ReportRenderer>,
    paths: ReportPaths,
}

impl BuildReport {
    /// Creates the step.
    #[must_use]
    pub fn new(renderer: Arc<dyn ReportRenderer>, paths: ReportPaths) -> Self {
        Self { renderer, paths }
    }

    fn figures(&self, graphics: &[PathBuf]) -> Vec<Figure> {
        [
            (self.paths.monthly_chart(), "Análise Mensal", "fig:casos-30-dias"),
            (self.paths.yearly_chart(), "Análise Anual", "fig:casos-12-meses"),
        ]
        .into_iter()
        .filter(|(chart, _, _)| graphics.contains(chart))
        .map(|(chart, caption, label)| Figure {
            caption: caption.to_string(),
            label: label.to_string(),
            path: ReportPaths::relative_to_report(&chart),
        })
        .collect()
    }

    async fn execute(&self, state: &mut PipelineState) -> Result<StageTag, SragflowError> {
        let report: FinalReport = state.require(keys::REPORT)?;
        let report_date: NaiveDate = state.require(keys::REPORT_DATE)?;
        let graphics: Vec<PathBuf> = state.get(keys::GRAPHICS)?.unwrap_or_default();

        let document = ReportDocument {
            report_date,
            report,
            figures: self.figures(&graphics),
            output: self.paths.report_file(),
        };
        let written = self.renderer.render(&document).await?;
        state.set(keys::REPORT_PATH, &written)?;
        info!(report = %written.display(), "Report built");
        Ok(StageTag::Success)
    }
}

#[async_trait]
impl Step for BuildReport {
    async fn run(&self, mut state: PipelineState) -> PipelineState {
        let outcome = self.execute(&mut state).await;
        settle(state, outcome)
    }
}

