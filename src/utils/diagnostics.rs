//! Diagnostics for LaTeX documents
//!
//! Collects the parser's recovered errors and the label checks into one list
//! of [`Diagnostic`]s with line/column positions, and formats them for the
//! terminal.

use std::fmt;

use serde::Serialize;

use crate::core::latex::parser::{parse, Parse};
use crate::core::latex::token::Span;
use crate::utils::latex_analysis::duplicate_labels;

/// Severity level of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum DiagnosticLevel {
    Error,
    Warning,
    Info,
}

impl DiagnosticLevel {
    /// ANSI color code for this level.
    pub fn color_code(self) -> &'static str {
        match self {
            DiagnosticLevel::Error => "\x1b[31m",   // red
            DiagnosticLevel::Warning => "\x1b[33m", // yellow
            DiagnosticLevel::Info => "\x1b[36m",    // cyan
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DiagnosticLevel::Error => "error",
            DiagnosticLevel::Warning => "warning",
            DiagnosticLevel::Info => "info",
        }
    }
}

/// A located diagnostic. Lines and columns are 1-based; columns count chars.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub message: String,
    pub span: Span,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {}: {}",
            self.line,
            self.column,
            self.level.label(),
            self.message
        )
    }
}

/// Byte offset to line/column mapping.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Byte offset of the start of each line
    starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut starts = vec![0];
        let bytes = text.as_bytes();
        for (i, b) in bytes.iter().enumerate() {
            match b {
                b'\n' => starts.push(i + 1),
                b'\r' if bytes.get(i + 1) != Some(&b'\n') => starts.push(i + 1),
                _ => {}
            }
        }
        LineIndex { starts }
    }

    /// 1-based line and column of `offset` in `text`.
    pub fn line_col(&self, text: &str, offset: usize) -> (usize, usize) {
        let offset = offset.min(text.len());
        let line = self.starts.partition_point(|&start| start <= offset) - 1;
        let start = self.starts[line];
        let column = text
            .get(start..offset)
            .map(|s| s.chars().count())
            .unwrap_or(offset - start);
        (line + 1, column + 1)
    }
}

/// Result of checking a document.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CheckResult {
    pub diagnostics: Vec<Diagnostic>,
    pub errors: usize,
    pub warnings: usize,
}

impl CheckResult {
    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }

    fn push(
        &mut self,
        index: &LineIndex,
        source: &str,
        level: DiagnosticLevel,
        message: String,
        span: Span,
    ) {
        let (line, column) = index.line_col(source, span.start);
        match level {
            DiagnosticLevel::Error => self.errors += 1,
            DiagnosticLevel::Warning => self.warnings += 1,
            DiagnosticLevel::Info => {}
        }
        self.diagnostics.push(Diagnostic {
            level,
            message,
            span,
            line,
            column,
        });
    }
}

/// Diagnostics for an already parsed document.
pub fn check_parse(source: &str, parse: &Parse) -> CheckResult {
    let index = LineIndex::new(source);
    let mut result = CheckResult::default();
    for error in parse.errors() {
        result.push(
            &index,
            source,
            DiagnosticLevel::Error,
            error.message.clone(),
            error.span,
        );
    }
    for duplicate in duplicate_labels(&parse.syntax()) {
        for span in duplicate.spans.iter().skip(1) {
            result.push(
                &index,
                source,
                DiagnosticLevel::Warning,
                format!("duplicate label `{}`", duplicate.name),
                *span,
            );
        }
    }
    result.diagnostics.sort_by_key(|d| (d.span.start, d.level));
    result
}

/// Parse and check a LaTeX document.
pub fn check_latex(source: &str) -> CheckResult {
    match parse(source) {
        Ok(parse) => check_parse(source, &parse),
        Err(err) => {
            let mut result = CheckResult::default();
            result.push(
                &LineIndex::new(source),
                source,
                DiagnosticLevel::Error,
                err.to_string(),
                Span::new(0, 0),
            );
            result
        }
    }
}

/// Render diagnostics one per line, optionally colored, with a summary.
pub fn format_diagnostics(result: &CheckResult, color: bool) -> String {
    const RESET: &str = "\x1b[0m";
    let mut output = String::new();
    for diagnostic in &result.diagnostics {
        if color {
            output.push_str(&format!(
                "{}:{}: {}{}{}: {}\n",
                diagnostic.line,
                diagnostic.column,
                diagnostic.level.color_code(),
                diagnostic.level.label(),
                RESET,
                diagnostic.message
            ));
        } else {
            output.push_str(&format!("{}\n", diagnostic));
        }
    }
    output.push_str(&format!(
        "{} error(s), {} warning(s)",
        result.errors, result.warnings
    ));
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_index() {
        let text = "ab\ncd\r\nef\rgh";
        let index = LineIndex::new(text);
        assert_eq!(index.line_col(text, 0), (1, 1));
        assert_eq!(index.line_col(text, 4), (2, 2));
        assert_eq!(index.line_col(text, 7), (3, 1));
        assert_eq!(index.line_col(text, 10), (4, 1));
    }

    #[test]
    fn test_line_index_counts_chars() {
        let text = "äö}";
        let index = LineIndex::new(text);
        assert_eq!(index.line_col(text, 4), (1, 3));
    }

    #[test]
    fn test_check_latex() {
        let result = check_latex("ok\n}\n\\label{a}\\label{a}");
        assert!(result.has_errors());
        assert_eq!(result.errors, 1);
        assert_eq!(result.warnings, 1);
        assert_eq!(result.diagnostics[0].line, 2);
        assert_eq!(result.diagnostics[0].message, "unmatched `}`");
        assert_eq!(result.diagnostics[1].message, "duplicate label `a`");
    }

    #[test]
    fn test_clean_document() {
        let result = check_latex("\\section{A}\\label{sec:a} See \\ref{sec:a}.");
        assert!(!result.has_errors());
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn test_format_diagnostics() {
        let result = check_latex("}");
        let plain = format_diagnostics(&result, false);
        assert!(plain.starts_with("1:1: error: unmatched `}`"));
        assert!(plain.ends_with("1 error(s), 0 warning(s)"));
        let colored = format_diagnostics(&result, true);
        assert!(colored.contains("\x1b[31m"));
    }
}
