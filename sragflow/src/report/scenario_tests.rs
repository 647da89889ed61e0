//! End-to-end runs of the report pipeline against in-memory collaborators.

#[cfg(test)]
mod tests {
    use crate::analysis::{ReportData, SectionId, DEFAULT_SECTIONS};
    use crate::collaborators::NewsItem;
    use crate::core::{keys, StageTag};
    use crate::events::{self, CollectingEventSink};
    use crate::pipeline::{BranchPolicy, PipelineRun};
    use crate::query::{GroupBy, Metric};
    use crate::report::{build_report_pipeline, initial_report_state, report_pipeline, ReportDeps, ReportPaths};
    use crate::testing::{
        surveillance_records, MemoryStore, RecordingPlotter, RecordingRenderer, ScriptedAuthor,
        StaticNews,
    };
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;
    use std::sync::Arc;

    struct Harness {
        store: Arc<MemoryStore>,
        news: Arc<StaticNews>,
        author: Arc<ScriptedAuthor>,
        plotter: Arc<RecordingPlotter>,
        renderer: Arc<RecordingRenderer>,
    }

    impl Harness {
        fn new(store: MemoryStore) -> Self {
            Self {
                store: Arc::new(store),
                news: Arc::new(StaticNews::new(vec![NewsItem {
                    title: "Fiocruz alerta para aumento de SRAG".to_string(),
                    url: "https://agencia.fiocruz.br/srag".to_string(),
                    content: "Boletim InfoGripe".to_string(),
                    published_date: None,
                }])),
                author: Arc::new(ScriptedAuthor::default()),
                plotter: Arc::new(RecordingPlotter::default()),
                renderer: Arc::new(RecordingRenderer::default()),
            }
        }

        fn deps(&self) -> ReportDeps {
            ReportDeps {
                source: self.store.clone(),
                news: self.news.clone(),
                author: self.author.clone(),
                plotter: self.plotter.clone(),
                renderer: self.renderer.clone(),
                paths: ReportPaths::new("data"),
            }
        }

        async fn run(&self, date: NaiveDate, sections: &[SectionId]) -> PipelineRun {
            let pipeline = build_report_pipeline(&self.deps()).unwrap();
            pipeline.run(initial_report_state(date, sections).unwrap()).await
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn populated() -> MemoryStore {
        MemoryStore::with_records(surveillance_records(date(2024, 8, 28), 500))
    }

    #[tokio::test]
    async fn test_full_report_reaches_build_report() {
        let harness = Harness::new(populated());

        let run = harness.run(date(2024, 8, 28), &DEFAULT_SECTIONS).await;

        assert_eq!(run.state.stage, StageTag::Success);
        assert!(!run.failed());
        assert_eq!(
            run.executed,
            vec!["insert_data", "insert_news", "main_agent", "create_graphics", "build_report"]
        );
        assert!(!run.state.contains_key(keys::DATE_SUBSTITUTION));
        assert_eq!(
            run.state.require::<PathBuf>(keys::REPORT_PATH).unwrap(),
            PathBuf::from("data/reports/relatorio_influenza.pdf")
        );

        let documents = harness.renderer.documents();
        assert_eq!(documents.len(), 1);
        let paths: Vec<_> = documents[0].figures.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["../graphics/monthly-analysis.png", "../graphics/yearly-analysis.png"]
        );
        assert_eq!(harness.plotter.requests().len(), 2);
        assert_eq!(harness.author.calls().len(), 6);
        assert_eq!(harness.author.calls()[0].news, 1);
    }

    #[tokio::test]
    async fn test_report_data_shape() {
        let harness = Harness::new(populated());
        let run = harness.run(date(2024, 8, 28), &DEFAULT_SECTIONS).await;

        let data: ReportData = run.state.require(keys::DATA).unwrap();
        assert_eq!(data.all_years.len(), 4);
        assert!(data.all_years.values().all(|table| table.is_success()));
        // 30 trailing days plus the report date itself.
        assert_eq!(data.monthly.rows.len(), 31);
        assert_eq!(data.monthly.rows.last().unwrap().label, "2024-08-28");
        assert_eq!(data.one_year_interval.rows.first().unwrap().label, "2023-08");
        assert_eq!(data.one_year_interval.rows.last().unwrap().label, "2024-08");
    }

    #[tokio::test]
    async fn test_absent_date_is_substituted() {
        let harness = Harness::new(populated());

        let run = harness.run(date(2024, 9, 10), &DEFAULT_SECTIONS).await;

        assert_eq!(run.state.stage, StageTag::Success);
        assert_eq!(
            run.state.require::<NaiveDate>(keys::RESOLVED_DATE).unwrap(),
            date(2024, 8, 28)
        );
        assert_eq!(
            run.state.value(keys::DATE_SUBSTITUTION),
            Some(&serde_json::json!({"requested": "2024-09-10", "resolved": "2024-08-28"}))
        );
        let queries = harness.store.queries();
        assert_eq!(queries.len(), 6);
        assert!(queries
            .iter()
            .all(|query| query.range.unwrap().end == date(2024, 8, 28)));
    }

    #[tokio::test]
    async fn test_store_is_only_queried_by_insert_data() {
        let harness = Harness::new(populated());

        let run = harness.run(date(2024, 8, 28), &DEFAULT_SECTIONS).await;
        assert_eq!(run.state.stage, StageTag::Success);

        let queries = harness.store.queries();
        let yearly: Vec<Metric> = queries
            .iter()
            .filter(|query| query.group_by == GroupBy::Year)
            .map(|query| query.metric)
            .collect();
        assert_eq!(yearly.len(), 4);
        for metric in Metric::ALL {
            assert!(yearly.contains(&metric));
        }
        let intervals: Vec<(Metric, GroupBy)> = queries
            .iter()
            .filter(|query| query.group_by != GroupBy::Year)
            .map(|query| (query.metric, query.group_by))
            .collect();
        assert_eq!(
            intervals,
            vec![(Metric::TotalCases, GroupBy::Day), (Metric::TotalCases, GroupBy::Month)]
        );
    }

    #[tokio::test]
    async fn test_news_failure_halts_after_two_steps() {
        let mut harness = Harness::new(populated());
        harness.news = Arc::new(StaticNews::failing("tavily offline"));

        let run = harness.run(date(2024, 8, 28), &DEFAULT_SECTIONS).await;

        assert!(run.failed());
        assert_eq!(run.executed, vec!["insert_data", "insert_news"]);
        assert_eq!(run.halted_at.as_deref(), Some("insert_news"));
        assert!(run.state.error_message().unwrap().contains("tavily offline"));
        assert!(run.state.contains_key(keys::DATA));
        assert!(harness.author.calls().is_empty());
        assert!(harness.renderer.documents().is_empty());
    }

    #[tokio::test]
    async fn test_empty_store_fails_first_step() {
        let harness = Harness::new(MemoryStore::default());

        let run = harness.run(date(2024, 8, 28), &DEFAULT_SECTIONS).await;

        assert!(run.failed());
        assert_eq!(run.executed, vec!["insert_data"]);
        assert!(harness.news.windows().is_empty());
    }

    #[tokio::test]
    async fn test_all_queries_failing_is_an_error() {
        let mut store = populated();
        for metric in Metric::ALL {
            store = store.failing_metric(metric);
        }
        let harness = Harness::new(store);

        let run = harness.run(date(2024, 8, 28), &DEFAULT_SECTIONS).await;

        assert_eq!(run.state.stage, StageTag::Error);
        assert_eq!(run.executed.len(), 1);
    }

    #[tokio::test]
    async fn test_partial_data_degrades() {
        // Total cases feed both interval charts; the yearly table keeps the other metrics.
        let harness = Harness::new(populated().failing_metric(Metric::TotalCases));

        let run = harness.run(date(2024, 8, 28), &DEFAULT_SECTIONS).await;

        assert_eq!(run.state.stage, StageTag::Success);
        let data: ReportData = run.state.require(keys::DATA).unwrap();
        assert!(!data.all_years[&Metric::TotalCases].is_success());
        assert!(data.all_years[&Metric::Deaths].is_success());
        assert!(data.monthly.is_empty());
        assert!(harness.plotter.requests().is_empty());
        assert!(harness.renderer.documents()[0].figures.is_empty());
    }

    #[tokio::test]
    async fn test_author_failure_stops_before_graphics() {
        let mut harness = Harness::new(populated());
        harness.author = Arc::new(ScriptedAuthor::default().failing_synthesis());

        let run = harness.run(date(2024, 8, 28), &DEFAULT_SECTIONS).await;

        assert!(run.failed());
        assert_eq!(run.executed.last().map(String::as_str), Some("main_agent"));
        assert!(harness.plotter.requests().is_empty());
    }

    #[tokio::test]
    async fn test_plotter_failure_stops_before_render() {
        let mut harness = Harness::new(populated());
        harness.plotter = Arc::new(RecordingPlotter::failing());

        let run = harness.run(date(2024, 8, 28), &DEFAULT_SECTIONS).await;

        assert!(run.failed());
        assert_eq!(run.executed.len(), 4);
        assert!(harness.renderer.documents().is_empty());
    }

    #[tokio::test]
    async fn test_renderer_failure_fails_last_step() {
        let mut harness = Harness::new(populated());
        harness.renderer = Arc::new(RecordingRenderer::failing());

        let run = harness.run(date(2024, 8, 28), &DEFAULT_SECTIONS).await;

        assert_eq!(run.state.stage, StageTag::Error);
        assert_eq!(
            run.executed,
            vec!["insert_data", "insert_news", "main_agent", "create_graphics", "build_report"]
        );
        assert!(run
            .state
            .error_message()
            .is_some_and(|message| message.contains("rendering failed")));
        assert!(!run.state.contains_key(keys::REPORT_PATH));
        assert_eq!(harness.renderer.documents().len(), 1);
    }

    #[tokio::test]
    async fn test_section_order_reaches_author() {
        let harness = Harness::new(populated());
        let sections = [SectionId::Last12MonthsAnalysis, SectionId::AumentoDosCasos];

        let run = harness.run(date(2024, 8, 28), &sections).await;

        let calls = harness.author.calls();
        assert!(calls[0].completed.is_empty());
        assert_eq!(
            calls[1].completed.keys().copied().collect::<Vec<_>>(),
            vec![SectionId::Last12MonthsAnalysis]
        );
        let drafts = run.state.value(keys::DRAFTS).unwrap().as_object().unwrap();
        assert_eq!(
            drafts.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["p-last-12-months-analysis", "p-aumento-dos-casos"]
        );
    }

    #[tokio::test]
    async fn test_terminal_policy_stops_at_main_agent() {
        let harness = Harness::new(populated());
        let pipeline = report_pipeline(&harness.deps())
            .unwrap()
            .with_policy(BranchPolicy::HaltOnTerminal)
            .compile()
            .unwrap();

        let run = pipeline
            .run(initial_report_state(date(2024, 8, 28), &DEFAULT_SECTIONS).unwrap())
            .await;

        assert_eq!(run.state.stage, StageTag::End);
        assert!(!run.failed());
        assert_eq!(run.halted_at.as_deref(), Some("main_agent"));
        assert!(run.state.contains_key(keys::REPORT));
        assert!(harness.renderer.documents().is_empty());
    }

    #[tokio::test]
    async fn test_lifecycle_events() {
        let harness = Harness::new(populated());
        let sink = Arc::new(CollectingEventSink::new());
        let pipeline = report_pipeline(&harness.deps())
            .unwrap()
            .with_event_sink(sink.clone())
            .compile()
            .unwrap();

        pipeline
            .invoke(initial_report_state(date(2024, 8, 28), &DEFAULT_SECTIONS).unwrap())
            .await;

        assert_eq!(sink.events_of_type(events::STEP_STARTED).len(), 5);
        assert_eq!(sink.events_of_type(events::STEP_COMPLETED).len(), 5);
        assert_eq!(sink.events_of_type(events::PIPELINE_COMPLETED).len(), 1);
        assert!(sink.events_of_type(events::PIPELINE_HALTED).is_empty());
    }
}
