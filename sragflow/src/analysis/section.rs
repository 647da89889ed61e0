//! Report section identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One subsection of the final report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SectionId {
    /// Case growth.
    #[serde(rename = "p-aumento-dos-casos")]
    AumentoDosCasos,
    /// Mortality rate.
    #[serde(rename = "p-taxa-de-mortalidade")]
    TaxaDeMortalidade,
    /// ICU occupancy.
    #[serde(rename = "p-taxa-de-ocupacao-uti")]
    TaxaDeOcupacaoUti,
    /// Vaccination rate.
    #[serde(rename = "p-taxa-de-vacinacao")]
    TaxaDeVacinacao,
    /// Daily view of the last 30 days.
    #[serde(rename = "p-last-30-days-analysis")]
    Last30DaysAnalysis,
    /// Monthly view of the last 12 months.
    #[serde(rename = "p-last-12-months-analysis")]
    Last12MonthsAnalysis,
}

/// The sections generated when none are requested explicitly.
pub const DEFAULT_SECTIONS: [SectionId; 6] = SectionId::ALL;

/// Which part of the report data a section is written from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSlice {
    /// Every metric over the trailing years.
    Full,
    /// Daily cases over the last 30 days.
    Daily,
    /// Monthly cases over the last 12 months.
    Monthly,
}

impl SectionId {
    /// All sections in report order.
    pub const ALL: [Self; 6] = [
        Self::AumentoDosCasos,
        Self::TaxaDeMortalidade,
        Self::TaxaDeOcupacaoUti,
        Self::TaxaDeVacinacao,
        Self::Last30DaysAnalysis,
        Self::Last12MonthsAnalysis,
    ];

    /// Kebab-case identifier used on the command line.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AumentoDosCasos => "p-aumento-dos-casos",
            Self::TaxaDeMortalidade => "p-taxa-de-mortalidade",
            Self::TaxaDeOcupacaoUti => "p-taxa-de-ocupacao-uti",
            Self::TaxaDeVacinacao => "p-taxa-de-vacinacao",
            Self::Last30DaysAnalysis => "p-last-30-days-analysis",
            Self::Last12MonthsAnalysis => "p-last-12-months-analysis",
        }
    }

    /// Name of the matching [`FinalReport`](super::FinalReport) field.
    #[must_use]
    pub fn field_name(self) -> &'static str {
        match self {
            Self::AumentoDosCasos => "p_aumento_dos_casos",
            Self::TaxaDeMortalidade => "p_taxa_de_mortalidade",
            Self::TaxaDeOcupacaoUti => "p_taxa_de_ocupacao_uti",
            Self::TaxaDeVacinacao => "p_taxa_de_vacinacao",
            Self::Last30DaysAnalysis => "p_last_30_days_analysis",
            Self::Last12MonthsAnalysis => "p_last_12_months_analysis",
        }
    }

    /// Short description used in prompts and schema text.
    #[must_use]
    pub fn topic(self) -> &'static str {
        match self {
            Self::AumentoDosCasos => "Cases increase",
            Self::TaxaDeMortalidade => "Mortality rate",
            Self::TaxaDeOcupacaoUti => "ICU occupancy rate",
            Self::TaxaDeVacinacao => "Vaccination rate",
            Self::Last30DaysAnalysis => "Last 30 days",
            Self::Last12MonthsAnalysis => "Last 12 months",
        }
    }

    /// The data the section is written from.
    #[must_use]
    pub fn slice(self) -> DataSlice {
        match self {
            Self::Last30DaysAnalysis => DataSlice::Daily,
            Self::Last12MonthsAnalysis => DataSlice::Monthly,
            _ => DataSlice::Full,
        }
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SectionId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|section| section.as_str() == s)
            .ok_or_else(|| {
                let valid: Vec<&str> = Self::ALL.iter().map(|section| section.as_str()).collect();
                format!("unknown section '{s}' (expected one of: {})", valid.join(", "))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trip() {
        for section in SectionId::ALL {
            assert_eq!(section.as_str().parse::<SectionId>().unwrap(), section);
            assert_eq!(section.field_name(), section.as_str().replace('-', "_"));
        }
        let err = "p-unknown".parse::<SectionId>().unwrap_err();
        assert!(err.contains("p-aumento-dos-casos"));
    }

    #[test]
    fn test_slices() {
        assert_eq!(SectionId::TaxaDeVacinacao.slice(), DataSlice::Full);
        assert_eq!(SectionId::Last30DaysAnalysis.slice(), DataSlice::Daily);
        assert_eq!(SectionId::Last12MonthsAnalysis.slice(), DataSlice::Monthly);
    }

    #[test]
    fn test_serializes_as_kebab_id() {
        assert_eq!(
            serde_json::to_value(SectionId::TaxaDeOcupacaoUti).unwrap(),
            serde_json::json!("p-taxa-de-ocupacao-uti")
        );
    }
}
