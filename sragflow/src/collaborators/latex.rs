//! LaTeX typesetting through `pdflatex`.

use super::process::run_program;
use super::{ReportDocument, ReportRenderer};
use crate::errors::CollaboratorError;
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use std::fmt::Write;
use std::path::PathBuf;
use tracing::info;

const TITLE: &str = "RELATÓRIO TÉCNICO DE SAÚDE PÚBLICA - SRAG BRASIL";

const MONTHS: [&str; 12] = [
    "janeiro", "fevereiro", "março", "abril", "maio", "junho", "julho", "agosto", "setembro",
    "outubro", "novembro", "dezembro",
];

/// Formats a date as `28 de agosto de 2024`.
#[must_use]
pub fn portuguese_date(date: NaiveDate) -> String {
    let month = MONTHS[date.month0() as usize];
    format!("{:02} de {month} de {}", date.day(), date.year())
}

/// Escapes LaTeX special characters in running text.
#[must_use]
pub fn escape_latex(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str(r"\textbackslash{}"),
            '&' | '%' | '$' | '#' | '_' | '{' | '}' => {
                escaped.push('\\');
                escaped.push(c);
            }
            '~' => escaped.push_str(r"\textasciitilde{}"),
            '^' => escaped.push_str(r"\textasciicircum{}"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Builds the LaTeX source of the report.
#[must_use]
pub fn latex_source(document: &ReportDocument) -> String {
    let report = &document.report;
    let mut tex = String::new();

    tex.push_str("\\documentclass{article}\n");
    tex.push_str("\\usepackage[margin=1in]{geometry}\n");
    tex.push_str("\\usepackage[utf8]{inputenc}\n");
    tex.push_str("\\usepackage[T1]{fontenc}\n");
    tex.push_str("\\usepackage{graphicx,float}\n");
    let _ = writeln!(tex, "\\title{{\\textbf{{{TITLE}}}}}");
    let _ = writeln!(tex, "\\date{{{}}}", portuguese_date(document.report_date));
    tex.push_str("\\begin{document}\n\\maketitle\n");

    tex.push_str("\\section{Análise}\n\\subsection{Geral}\n");
    for paragraph in [
        &report.p_aumento_dos_casos,
        &report.p_taxa_de_mortalidade,
        &report.p_taxa_de_ocupacao_uti,
        &report.p_taxa_de_vacinacao,
    ] {
        let _ = writeln!(tex, "{}\n", escape_latex(paragraph));
    }

    tex.push_str("\\subsection{Relação Mensal e Anual}\n");
    for paragraph in [&report.p_last_30_days_analysis, &report.p_last_12_months_analysis] {
        let _ = writeln!(tex, "{}\n", escape_latex(paragraph));
    }

    if !document.figures.is_empty() {
        tex.push_str("\\begin{figure}[H]\n");
        for figure in &document.figures {
            tex.push_str("\\begin{minipage}{0.45\\textwidth}\n\\centering\n");
            let _ = writeln!(tex, "\\includegraphics[width=\\textwidth]{{{}}}", figure.path);
            let _ = writeln!(tex, "\\caption{{{}}}", escape_latex(&figure.caption));
            let _ = writeln!(tex, "\\label{{{}}}", figure.label);
            tex.push_str("\\end{minipage}\n");
        }
        tex.push_str("\\end{figure}\n");
    }

    tex.push_str("\\end{document}\n");
    tex
}

/// Renders the report with `pdflatex`.
///
/// The `.tex` source is kept next to the PDF. `pdflatex` runs inside the
/// output directory so figure paths resolve relative to it.
#[derive(Debug, Clone)]
pub struct LatexRenderer {
    program: String,
}

impl Default for LatexRenderer {
    fn default() -> Self {
        Self::new("pdflatex")
    }
}

impl LatexRenderer {
    /// Uses the given executable.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

#[async_trait]
impl ReportRenderer for LatexRenderer {
    async fn render(&self, document: &ReportDocument) -> Result<PathBuf, CollaboratorError> {
        let dir = document
            .output
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        let stem = document
            .output
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| CollaboratorError::invalid("renderer", "output path has no file name"))?;

        tokio::fs::create_dir_all(&dir).await?;
        let tex_name = format!("{stem}.tex");
        tokio::fs::write(dir.join(&tex_name), latex_source(document)).await?;

        run_program(
            &self.program,
            &["-interaction=nonstopmode", "-halt-on-error", &tex_name],
            None,
            Some(&dir),
        )
        .await?;

        let pdf = dir.join(format!("{stem}.pdf"));
        info!(report = %pdf.display(), "Report rendered");
        Ok(pdf)
    }
}
