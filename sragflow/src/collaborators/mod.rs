//! Ports for the external services the report pipeline relies on.
//!
//! The pipeline only sees the traits below. Shipped adapters:
//! - [`TavilySearch`] and [`OpenAiModel`] over HTTP (`adapters` feature)
//! - [`GnuplotPlotter`] and [`LatexRenderer`] as subprocesses

mod gnuplot;
mod latex;
#[cfg(feature = "adapters")]
mod openai;
mod process;
#[cfg(feature = "adapters")]
mod tavily;

pub use gnuplot::GnuplotPlotter;
pub use latex::{escape_latex, latex_source, portuguese_date, LatexRenderer};
#[cfg(feature = "adapters")]
pub use openai::OpenAiModel;
#[cfg(feature = "adapters")]
pub use tavily::{TavilySearch, NEWS_SOURCES};

use crate::analysis::FinalReport;
use crate::errors::CollaboratorError;
use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Debug;
use std::path::PathBuf;

/// A news article returned by a search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    /// Headline.
    pub title: String,
    /// Article URL.
    pub url: String,
    /// Snippet or summary.
    #[serde(default)]
    pub content: String,
    /// Publication date as reported by the source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
}

/// Inclusive publication window of a news search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsWindow {
    /// First day.
    pub start: NaiveDate,
    /// Last day.
    pub end: NaiveDate,
}

impl NewsWindow {
    /// A window of `days` days starting at `start`.
    #[must_use]
    pub fn starting_at(start: NaiveDate, days: i64) -> Self {
        Self {
            start,
            end: start + Duration::days(days),
        }
    }
}

/// News search service.
#[async_trait]
pub trait NewsSearch: Send + Sync + Debug {
    /// Returns SRAG-related news published inside the window.
    async fn search(&self, window: NewsWindow) -> Result<Vec<NewsItem>, CollaboratorError>;
}

/// A prompt for a language model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    /// System instructions.
    pub system: String,
    /// User message.
    pub user: String,
}

/// JSON schema the generated output must follow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSchema {
    /// Schema name.
    pub name: String,
    /// JSON schema document.
    pub schema: Value,
}

/// Structured text generation.
#[async_trait]
pub trait LanguageModel: Send + Sync + Debug {
    /// Generates a JSON value conforming to `schema`.
    async fn generate(&self, prompt: &Prompt, schema: &OutputSchema) -> Result<Value, CollaboratorError>;
}

/// A chart to draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartRequest {
    /// Chart title.
    pub title: String,
    /// `(label, value)` points in order.
    pub series: Vec<(String, i64)>,
    /// Where to write the PNG.
    pub output: PathBuf,
}

/// Chart rendering.
#[async_trait]
pub trait ChartPlotter: Send + Sync + Debug {
    /// Draws the chart and returns the written image path.
    async fn plot(&self, request: &ChartRequest) -> Result<PathBuf, CollaboratorError>;
}

/// A figure embedded in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Figure {
    /// Caption text.
    pub caption: String,
    /// Cross-reference label.
    pub label: String,
    /// Image path relative to the report directory.
    pub path: String,
}

/// Everything the renderer needs to produce the final document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDocument {
    /// Report date shown under the title.
    pub report_date: NaiveDate,
    /// Generated paragraphs.
    pub report: FinalReport,
    /// Figures of the monthly/yearly subsection.
    pub figures: Vec<Figure>,
    /// Output file path.
    pub output: PathBuf,
}

/// Document typesetting.
#[async_trait]
pub trait ReportRenderer: Send + Sync + Debug {
    /// Renders the document and returns the written file path.
    async fn render(&self, document: &ReportDocument) -> Result<PathBuf, CollaboratorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_news_window_spans_fifteen_days() {
        let start = NaiveDate::from_ymd_opt(2024, 8, 28).unwrap();
        let window = NewsWindow::starting_at(start, 15);
        assert_eq!(window.end, NaiveDate::from_ymd_opt(2024, 9, 12).unwrap());
    }

    #[test]
    fn test_news_item_tolerates_missing_fields() {
        let item: NewsItem =
            serde_json::from_str(r#"{"title": "Casos sobem", "url": "https://x"}"#).unwrap();
        assert!(item.content.is_empty());
        assert!(item.published_date.is_none());
    }
}
