//! In-memory fakes of the external collaborators.

use async_trait::async_trait;
use chrono::NaiveDate;
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

use crate::analysis::{DataSlice, FinalReport, ReportAuthor, SectionId, SectionRequest};
use crate::collaborators::{
    ChartPlotter, ChartRequest, LanguageModel, NewsItem, NewsSearch, NewsWindow, OutputSchema,
    Prompt, ReportDocument, ReportRenderer,
};
use crate::errors::{CollaboratorError, StoreError};
use crate::query::{AggregationQuery, BucketRow, Metric};
use crate::records::{read_delimited, InfludRecord};
use crate::store::{DatabaseCreation, RecordSource, Warehouse};

/// A record store held in memory.
///
/// Implements both storage ports. Failures can be injected per metric or
/// for date verification.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Vec<InfludRecord>>,
    database_created: Mutex<bool>,
    failing_metrics: HashSet<Metric>,
    failing_verification: bool,
    queries: Mutex<Vec<AggregationQuery>>,
}

impl MemoryStore {
    /// Creates a store holding `records`.
    #[must_use]
    pub fn with_records(records: Vec<InfludRecord>) -> Self {
        Self {
            records: RwLock::new(records),
            ..Self::default()
        }
    }

    /// Makes every aggregation of `metric` fail.
    #[must_use]
    pub fn failing_metric(mut self, metric: Metric) -> Self {
        self.failing_metrics.insert(metric);
        self
    }

    /// Makes date verification fail.
    #[must_use]
    pub fn failing_verification(mut self) -> Self {
        self.failing_verification = true;
        self
    }

    /// Returns the stored records.
    #[must_use]
    pub fn records(&self) -> Vec<InfludRecord> {
        self.records.read().clone()
    }

    /// Returns the aggregations received, in order.
    #[must_use]
    pub fn queries(&self) -> Vec<AggregationQuery> {
        self.queries.lock().clone()
    }

    fn check_verification(&self) -> Result<(), StoreError> {
        if self.failing_verification {
            return Err(StoreError::Database("injected verification failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordSource for MemoryStore {
    async fn aggregate(&self, query: &AggregationQuery) -> Result<Vec<BucketRow>, StoreError> {
        self.queries.lock().push(*query);
        if self.failing_metrics.contains(&query.metric) {
            return Err(StoreError::Database(format!(
                "injected failure for {}",
                query.metric
            )));
        }

        let width = query.metric.value_columns().len();
        let mut buckets: BTreeMap<NaiveDate, Vec<i64>> = BTreeMap::new();
        for record in self.records.read().iter() {
            let Some(date) = query.metric.event_date(record) else {
                continue;
            };
            if query.range.is_some_and(|range| !range.contains(date)) {
                continue;
            }
            let counts = buckets
                .entry(query.group_by.truncate(date))
                .or_insert_with(|| vec![0; width]);
            for (total, add) in counts.iter_mut().zip(query.metric.contribution(record)) {
                *total += add;
            }
        }

        Ok(buckets
            .into_iter()
            .map(|(bucket, counts)| BucketRow {
                bucket,
                label: query.group_by.format(bucket),
                counts,
            })
            .collect())
    }

    async fn has_records_on(&self, date: NaiveDate) -> Result<bool, StoreError> {
        self.check_verification()?;
        Ok(self
            .records
            .read()
            .iter()
            .any(|record| record.data_preenchimento == Some(date)))
    }

    async fn latest_record_date(&self) -> Result<Option<NaiveDate>, StoreError> {
        self.check_verification()?;
        Ok(self
            .records
            .read()
            .iter()
            .filter_map(|record| record.data_preenchimento)
            .max())
    }
}

#[async_trait]
impl Warehouse for MemoryStore {
    async fn create_database(&self) -> Result<DatabaseCreation, StoreError> {
        let mut created = self.database_created.lock();
        if *created {
            return Ok(DatabaseCreation::AlreadyExists);
        }
        *created = true;
        Ok(DatabaseCreation::Created)
    }

    async fn recreate_table(&self) -> Result<(), StoreError> {
        self.records.write().clear();
        Ok(())
    }

    async fn bulk_load(&self, path: &Path) -> Result<u64, StoreError> {
        // Parse everything first so a bad row leaves the table untouched.
        let loaded = read_delimited(path)?;
        let count = loaded.len() as u64;
        self.records.write().extend(loaded);
        Ok(count)
    }
}

/// News search returning a fixed answer.
#[derive(Debug)]
pub struct StaticNews {
    result: Result<Vec<NewsItem>, String>,
    windows: Mutex<Vec<NewsWindow>>,
}

impl StaticNews {
    /// Always returns `items`.
    #[must_use]
    pub fn new(items: Vec<NewsItem>) -> Self {
        Self {
            result: Ok(items),
            windows: Mutex::new(Vec::new()),
        }
    }

    /// Always fails with `message`.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            result: Err(message.into()),
            windows: Mutex::new(Vec::new()),
        }
    }

    /// Returns the windows searched, in order.
    #[must_use]
    pub fn windows(&self) -> Vec<NewsWindow> {
        self.windows.lock().clone()
    }
}

#[async_trait]
impl NewsSearch for StaticNews {
    async fn search(&self, window: NewsWindow) -> Result<Vec<NewsItem>, CollaboratorError> {
        self.windows.lock().push(window);
        self.result
            .clone()
            .map_err(|message| CollaboratorError::request("news", message))
    }
}

/// One recorded [`ScriptedAuthor::analyze_section`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorCall {
    /// Section requested.
    pub section: SectionId,
    /// Data slice received.
    pub slice: DataSlice,
    /// Completed sections visible to the call.
    pub completed: IndexMap<SectionId, String>,
    /// Number of news items received.
    pub news: usize,
}

/// Report author writing deterministic text and recording its context.
#[derive(Debug, Default)]
pub struct ScriptedAuthor {
    fail_on: Option<SectionId>,
    fail_synthesis: bool,
    calls: Mutex<Vec<AuthorCall>>,
}

impl ScriptedAuthor {
    /// Fails when asked for `section`.
    #[must_use]
    pub fn failing_on(mut self, section: SectionId) -> Self {
        self.fail_on = Some(section);
        self
    }

    /// Fails the synthesis call.
    #[must_use]
    pub fn failing_synthesis(mut self) -> Self {
        self.fail_synthesis = true;
        self
    }

    /// Returns the section calls, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<AuthorCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl ReportAuthor for ScriptedAuthor {
    async fn analyze_section(&self, request: SectionRequest<'_>) -> Result<String, CollaboratorError> {
        self.calls.lock().push(AuthorCall {
            section: request.section,
            slice: request.data.slice(),
            completed: request.completed.clone(),
            news: request.news.len(),
        });
        if self.fail_on == Some(request.section) {
            return Err(CollaboratorError::request("author", format!("cannot write {}", request.section)));
        }
        Ok(format!("analysis of {}", request.section))
    }

    async fn synthesize(
        &self,
        drafts: &IndexMap<SectionId, String>,
        _schema: &OutputSchema,
    ) -> Result<FinalReport, CollaboratorError> {
        if self.fail_synthesis {
            return Err(CollaboratorError::request("author", "synthesis failed"));
        }
        let text = |section: SectionId| {
            drafts
                .get(&section)
                .cloned()
                .unwrap_or_else(|| format!("no analysis for {section}"))
        };
        Ok(FinalReport {
            p_aumento_dos_casos: text(SectionId::AumentoDosCasos),
            p_taxa_de_mortalidade: text(SectionId::TaxaDeMortalidade),
            p_taxa_de_ocupacao_uti: text(SectionId::TaxaDeOcupacaoUti),
            p_taxa_de_vacinacao: text(SectionId::TaxaDeVacinacao),
            p_last_30_days_analysis: text(SectionId::Last30DaysAnalysis),
            p_last_12_months_analysis: text(SectionId::Last12MonthsAnalysis),
        })
    }
}

/// Language model replaying queued responses.
#[derive(Debug, Default)]
pub struct ScriptedModel {
    responses: Mutex<VecDeque<Value>>,
    prompts: Mutex<Vec<Prompt>>,
}

impl ScriptedModel {
    /// Queues `responses`, returned one per call.
    #[must_use]
    pub fn new(responses: Vec<Value>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Returns the prompts received, in order.
    #[must_use]
    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, prompt: &Prompt, _schema: &OutputSchema) -> Result<Value, CollaboratorError> {
        self.prompts.lock().push(prompt.clone());
        self.responses
            .lock()
            .pop_front()
            .ok_or_else(|| CollaboratorError::invalid("language model", "no scripted response left"))
    }
}

/// Plotter recording requests without drawing.
#[derive(Debug, Default)]
pub struct RecordingPlotter {
    fail: bool,
    requests: Mutex<Vec<ChartRequest>>,
}

impl RecordingPlotter {
    /// A plotter that always fails.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Returns the chart requests, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<ChartRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl ChartPlotter for RecordingPlotter {
    async fn plot(&self, request: &ChartRequest) -> Result<PathBuf, CollaboratorError> {
        self.requests.lock().push(request.clone());
        if self.fail {
            return Err(CollaboratorError::request("plotter", "plotting failed"));
        }
        Ok(request.output.clone())
    }
}

/// Renderer recording documents without typesetting.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    fail: bool,
    documents: Mutex<Vec<ReportDocument>>,
}

impl RecordingRenderer {
    /// A renderer that always fails.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Returns the rendered documents, in order.
    #[must_use]
    pub fn documents(&self) -> Vec<ReportDocument> {
        self.documents.lock().clone()
    }
}

#[async_trait]
impl ReportRenderer for RecordingRenderer {
    async fn render(&self, document: &ReportDocument) -> Result<PathBuf, CollaboratorError> {
        self.documents.lock().push(document.clone());
        if self.fail {
            return Err(CollaboratorError::request("renderer", "rendering failed"));
        }
        Ok(document.output.clone())
    }
}
