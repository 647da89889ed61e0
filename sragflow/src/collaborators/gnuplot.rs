//! Chart rendering through gnuplot.

use super::process::run_program;
use super::{ChartPlotter, ChartRequest};
use crate::errors::CollaboratorError;
use async_trait::async_trait;
use std::fmt::Write;
use std::path::PathBuf;
use tracing::info;

/// Draws bar charts by piping a script into `gnuplot`.
#[derive(Debug, Clone)]
pub struct GnuplotPlotter {
    program: String,
}

impl Default for GnuplotPlotter {
    fn default() -> Self {
        Self::new("gnuplot")
    }
}

impl GnuplotPlotter {
    /// Uses the given executable.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

/// Quotes a value as a gnuplot single-quoted string.
fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn script(request: &ChartRequest) -> String {
    let mut script = String::new();
    let _ = writeln!(script, "set terminal pngcairo size 1200,720");
    let _ = writeln!(script, "set output {}", quote(&request.output.to_string_lossy()));
    let _ = writeln!(script, "set title {}", quote(&request.title));
    script.push_str("set style data histograms\n");
    script.push_str("set style fill solid 0.8\n");
    script.push_str("set boxwidth 0.8\n");
    script.push_str("set xtics rotate by 45 right\n");
    script.push_str("set yrange [0:*]\n");
    script.push_str("plot '-' using 2:xtic(1) notitle\n");
    for (label, value) in &request.series {
        let _ = writeln!(script, "{} {value}", quote(label));
    }
    script.push_str("e\n");
    script
}

#[async_trait]
impl ChartPlotter for GnuplotPlotter {
    async fn plot(&self, request: &ChartRequest) -> Result<PathBuf, CollaboratorError> {
        if let Some(dir) = request.output.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        run_program(&self.program, &[], Some(script(request).as_bytes()), None).await?;
        info!(chart = %request.output.display(), points = request.series.len(), "Chart written");
        Ok(request.output.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_embeds_data_and_quotes() {
        let request = ChartRequest {
            title: "Análise d'SRAG".to_string(),
            series: vec![("2024-07".to_string(), 12), ("2024-08".to_string(), 30)],
            output: PathBuf::from("data/graphics/yearly-analysis.png"),
        };
        let script = script(&request);

        assert!(script.contains("set output 'data/graphics/yearly-analysis.png'"));
        assert!(script.contains("set title 'Análise d''SRAG'"));
        assert!(script.contains("'2024-07' 12\n'2024-08' 30\ne\n"));
    }
}
