//! Utility modules
//!
//! This module contains utilities and helpers:
//! - Diagnostics and error reporting
//! - Error types and result types
//! - Tree metrics and label checks

pub mod diagnostics;
pub mod error;
pub mod latex_analysis;

// Re-export commonly used items
pub use diagnostics::{
    check_latex, check_parse, format_diagnostics, CheckResult, Diagnostic, DiagnosticLevel,
    LineIndex,
};
pub use error::{ConfigError, ParseError, ParseResult};
pub use latex_analysis::{
    collect_labels, duplicate_labels, lint_source as lint_latex_source, metrics, metrics_source,
    DuplicateLabel, LabelDefinition, LatexMetrics,
};
