//! Section-by-section report analysis.
//!
//! Each requested [`SectionId`] is analyzed in order, with the analyses
//! completed so far passed along as context; the drafts are then
//! synthesized into a [`FinalReport`].

mod author;
mod data;
mod section;

pub use author::{run_analysis, AnalysisOutcome, LlmAuthor, ReportAuthor, SectionRequest};
pub use data::{DataView, ReportData};
pub use section::{DataSlice, SectionId, DEFAULT_SECTIONS};

use crate::collaborators::OutputSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Upper bound on the words of each generated paragraph.
pub const PARAGRAPH_WORD_LIMIT: usize = 200;

/// The six paragraphs of the final report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalReport {
    /// Case growth.
    pub p_aumento_dos_casos: String,
    /// Mortality rate.
    pub p_taxa_de_mortalidade: String,
    /// ICU occupancy.
    pub p_taxa_de_ocupacao_uti: String,
    /// Vaccination rate.
    pub p_taxa_de_vacinacao: String,
    /// Last 30 days.
    pub p_last_30_days_analysis: String,
    /// Last 12 months.
    pub p_last_12_months_analysis: String,
}

impl FinalReport {
    /// Returns the paragraph of a section.
    #[must_use]
    pub fn paragraph(&self, section: SectionId) -> &str {
        match section {
            SectionId::AumentoDosCasos => &self.p_aumento_dos_casos,
            SectionId::TaxaDeMortalidade => &self.p_taxa_de_mortalidade,
            SectionId::TaxaDeOcupacaoUti => &self.p_taxa_de_ocupacao_uti,
            SectionId::TaxaDeVacinacao => &self.p_taxa_de_vacinacao,
            SectionId::Last30DaysAnalysis => &self.p_last_30_days_analysis,
            SectionId::Last12MonthsAnalysis => &self.p_last_12_months_analysis,
        }
    }

    /// Sections whose paragraph exceeds [`PARAGRAPH_WORD_LIMIT`], with their word counts.
    #[must_use]
    pub fn over_limit(&self) -> Vec<(SectionId, usize)> {
        SectionId::ALL
            .into_iter()
            .map(|section| (section, self.paragraph(section).split_whitespace().count()))
            .filter(|(_, words)| *words > PARAGRAPH_WORD_LIMIT)
            .collect()
    }

    /// Structured-output schema handed to the generator.
    #[must_use]
    pub fn schema() -> OutputSchema {
        let mut properties = Map::new();
        for section in SectionId::ALL {
            properties.insert(
                section.field_name().to_string(),
                json!({
                    "type": "string",
                    "description": format!(
                        "{} analysis text paragraph. Must be {PARAGRAPH_WORD_LIMIT} words or less.",
                        section.topic()
                    ),
                }),
            );
        }
        let required: Vec<Value> = SectionId::ALL
            .iter()
            .map(|section| Value::String(section.field_name().to_string()))
            .collect();

        OutputSchema {
            name: "final_report".to_string(),
            schema: json!({
                "type": "object",
                "properties": properties,
                "required": required,
                "additionalProperties": false,
            }),
        }
    }
}
