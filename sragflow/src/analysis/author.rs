//! Report authoring: per-section analysis and final synthesis.

use super::{DataView, FinalReport, ReportData, SectionId, PARAGRAPH_WORD_LIMIT};
use crate::collaborators::{LanguageModel, NewsItem, OutputSchema, Prompt};
use crate::errors::CollaboratorError;
use async_trait::async_trait;
use chrono::NaiveDate;
use indexmap::IndexMap;
use serde_json::json;
use std::fmt::{Debug, Write};
use std::sync::Arc;
use tracing::{info, warn};

/// Input of one section analysis.
#[derive(Debug, Clone, Copy)]
pub struct SectionRequest<'a> {
    /// Section to write.
    pub section: SectionId,
    /// Date the report refers to.
    pub report_date: NaiveDate,
    /// News gathered for the report window.
    pub news: &'a [NewsItem],
    /// The data slice this section is written from.
    pub data: DataView<'a>,
    /// Sections already written, in generation order.
    pub completed: &'a IndexMap<SectionId, String>,
}

/// Writes the report text.
#[async_trait]
pub trait ReportAuthor: Send + Sync + Debug {
    /// Writes one section.
    async fn analyze_section(&self, request: SectionRequest<'_>) -> Result<String, CollaboratorError>;

    /// Turns the drafts into the final six paragraphs.
    async fn synthesize(
        &self,
        drafts: &IndexMap<SectionId, String>,
        schema: &OutputSchema,
    ) -> Result<FinalReport, CollaboratorError>;
}

/// Drafts and final report of one analysis run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisOutcome {
    /// Section analyses in generation order.
    pub drafts: IndexMap<SectionId, String>,
    /// Synthesized report.
    pub report: FinalReport,
}

/// Analyzes `sections` in order, then synthesizes the final report.
///
/// Every call sees the sections completed before it. The first failure
/// aborts the run.
///
/// # Errors
///
/// Returns the author's error.
pub async fn run_analysis(
    author: &dyn ReportAuthor,
    sections: &[SectionId],
    report_date: NaiveDate,
    news: &[NewsItem],
    data: &ReportData,
) -> Result<AnalysisOutcome, CollaboratorError> {
    let mut drafts = IndexMap::with_capacity(sections.len());

    for &section in sections {
        let request = SectionRequest {
            section,
            report_date,
            news,
            data: data.view(section.slice()),
            completed: &drafts,
        };
        let text = author.analyze_section(request).await?;
        info!(section = %section, words = text.split_whitespace().count(), "Section analyzed");
        drafts.insert(section, text);
    }

    let report = author.synthesize(&drafts, &FinalReport::schema()).await?;
    for (section, words) in report.over_limit() {
        warn!(section = %section, words, limit = PARAGRAPH_WORD_LIMIT, "Paragraph exceeds word limit");
    }

    Ok(AnalysisOutcome { drafts, report })
}

const SYSTEM_PROMPT: &str = "Você é um especialista técnico de doenças virais brasileiras. \
Seu papel é gerar um relatório técnico sobre a SRAG Brasil.";

/// [`ReportAuthor`] backed by a [`LanguageModel`].
#[derive(Debug, Clone)]
pub struct LlmAuthor {
    model: Arc<dyn LanguageModel>,
}

impl LlmAuthor {
    /// Wraps a model.
    #[must_use]
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }
}

fn section_schema() -> OutputSchema {
    OutputSchema {
        name: "section_analysis".to_string(),
        schema: json!({
            "type": "object",
            "properties": {
                "analysis": {
                    "type": "string",
                    "description": format!("Analysis paragraph. Must be {PARAGRAPH_WORD_LIMIT} words or less."),
                }
            },
            "required": ["analysis"],
            "additionalProperties": false,
        }),
    }
}

fn section_prompt(request: &SectionRequest<'_>) -> String {
    let mut text = String::new();
    let _ = writeln!(text, "Data do relatório: {}", request.report_date);
    let _ = writeln!(text, "Seção: {} ({})", request.section, request.section.topic());

    text.push_str("\nSeções já concluídas:\n");
    if request.completed.is_empty() {
        text.push_str("(nenhuma)\n");
    }
    for (section, analysis) in request.completed {
        let _ = writeln!(text, "- {section}: {analysis}");
    }

    text.push_str("\nNotícias:\n");
    for item in request.news {
        let _ = writeln!(text, "- {} ({}): {}", item.title, item.url, item.content);
    }

    text.push_str("\nDados:\n");
    text.push_str(&request.data.to_prompt_text());
    text
}

#[async_trait]
impl ReportAuthor for LlmAuthor {
    async fn analyze_section(&self, request: SectionRequest<'_>) -> Result<String, CollaboratorError> {
        let prompt = Prompt {
            system: SYSTEM_PROMPT.to_string(),
            user: section_prompt(&request),
        };
        let value = self.model.generate(&prompt, &section_schema()).await?;
        value
            .get("analysis")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| CollaboratorError::invalid("language model", "missing 'analysis' field"))
    }

    async fn synthesize(
        &self,
        drafts: &IndexMap<SectionId, String>,
        schema: &OutputSchema,
    ) -> Result<FinalReport, CollaboratorError> {
        let mut user = String::from("Consolide as análises abaixo no relatório final.\n\n");
        for (section, analysis) in drafts {
            let _ = writeln!(user, "## {section}\n{analysis}\n");
        }
        let prompt = Prompt {
            system: SYSTEM_PROMPT.to_string(),
            user,
        };
        let value = self.model.generate(&prompt, schema).await?;
        serde_json::from_value(value)
            .map_err(|err| CollaboratorError::invalid("language model", err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedAuthor, ScriptedModel};
    use pretty_assertions::assert_eq;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 8, 28).unwrap()
    }

    #[tokio::test]
    async fn test_sections_see_previous_results_in_order() {
        let author = ScriptedAuthor::default();
        let sections = [SectionId::TaxaDeMortalidade, SectionId::AumentoDosCasos];

        let outcome = run_analysis(&author, &sections, date(), &[], &ReportData::default())
            .await
            .unwrap();

        let calls = author.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].completed.is_empty());
        assert_eq!(
            calls[1].completed.keys().copied().collect::<Vec<_>>(),
            vec![SectionId::TaxaDeMortalidade]
        );
        assert_eq!(
            outcome.drafts.keys().copied().collect::<Vec<_>>(),
            sections.to_vec()
        );
    }

    #[tokio::test]
    async fn test_reordering_changes_context() {
        let forward = ScriptedAuthor::default();
        let backward = ScriptedAuthor::default();
        let a = SectionId::AumentoDosCasos;
        let b = SectionId::TaxaDeVacinacao;

        run_analysis(&forward, &[a, b], date(), &[], &ReportData::default()).await.unwrap();
        run_analysis(&backward, &[b, a], date(), &[], &ReportData::default()).await.unwrap();

        assert_eq!(forward.calls()[1].completed.keys().next(), Some(&a));
        assert_eq!(backward.calls()[1].completed.keys().next(), Some(&b));
    }

    #[tokio::test]
    async fn test_interval_sections_get_their_slice() {
        let author = ScriptedAuthor::default();
        run_analysis(&author, &SectionId::ALL, date(), &[], &ReportData::default())
            .await
            .unwrap();

        let slices: Vec<_> = author.calls().iter().map(|call| call.slice).collect();
        assert_eq!(
            slices,
            SectionId::ALL.iter().map(|section| section.slice()).collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn test_failure_aborts_remaining_sections() {
        let author = ScriptedAuthor::default().failing_on(SectionId::TaxaDeMortalidade);
        let result = run_analysis(&author, &SectionId::ALL, date(), &[], &ReportData::default()).await;

        assert!(result.is_err());
        assert_eq!(author.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_llm_author_round_trip() {
        let model = Arc::new(ScriptedModel::new(vec![
            json!({"analysis": "primeira"}),
            json!({
                "p_aumento_dos_casos": "a",
                "p_taxa_de_mortalidade": "b",
                "p_taxa_de_ocupacao_uti": "c",
                "p_taxa_de_vacinacao": "d",
                "p_last_30_days_analysis": "e",
                "p_last_12_months_analysis": "f",
            }),
        ]));
        let author = LlmAuthor::new(model.clone());

        let outcome = run_analysis(
            &author,
            &[SectionId::AumentoDosCasos],
            date(),
            &[],
            &ReportData::default(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.drafts[&SectionId::AumentoDosCasos], "primeira");
        assert_eq!(outcome.report.p_last_12_months_analysis, "f");
        let prompts = model.prompts();
        assert!(prompts[0].user.contains("(nenhuma)"));
        assert!(prompts[1].user.contains("## p-aumento-dos-casos\nprimeira"));
    }

    #[tokio::test]
    async fn test_llm_author_rejects_malformed_output() {
        let model = Arc::new(ScriptedModel::new(vec![json!({"text": "wrong"})]));
        let author = LlmAuthor::new(model);
        let drafts = IndexMap::new();
        let data = ReportData::default();
        let request = SectionRequest {
            section: SectionId::AumentoDosCasos,
            report_date: date(),
            news: &[],
            data: data.view(SectionId::AumentoDosCasos.slice()),
            completed: &drafts,
        };
        let err = author.analyze_section(request).await;
        assert!(err.is_err());
    }

    #[test]
    fn test_section_prompt_lists_completed_sections() {
        let mut drafts = IndexMap::new();
        drafts.insert(SectionId::AumentoDosCasos, "casos subiram".to_string());
        let data = ReportData::default();
        let news = [NewsItem {
            title: "Alerta".to_string(),
            url: "https://agencia.fiocruz.br/x".to_string(),
            content: "SRAG".to_string(),
            published_date: None,
        }];
        let request = SectionRequest {
            section: SectionId::TaxaDeMortalidade,
            report_date: date(),
            news: &news,
            data: data.view(SectionId::TaxaDeMortalidade.slice()),
            completed: &drafts,
        };

        let prompt = section_prompt(&request);
        assert!(prompt.contains("- p-aumento-dos-casos: casos subiram"));
        assert!(prompt.contains("- Alerta (https://agencia.fiocruz.br/x): SRAG"));
    }
}
