//! latexkit - error-tolerant LaTeX and BibTeX front end
//!
//! This crate lexes and parses LaTeX sources into lossless rowan syntax trees
//! that survive malformed input, and indexes macro documentation from
//! documented sources (`.dtx`).
//!
//! # Example
//!
//! ```
//! use latexkit::{parse, tokenize, detokenize};
//!
//! let input = r"\section{Intro} Some $x^2$ math.";
//! assert_eq!(detokenize(&tokenize(input)), input);
//!
//! let parse = parse(input).unwrap();
//! assert!(!parse.has_errors());
//! assert_eq!(parse.syntax().text().to_string(), input);
//! ```

pub mod config;
pub mod core;
pub mod utils;

use std::fmt;
use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

pub use config::ParseOptions;
pub use crate::core::bibtex::{parse_bibtex, tokenize_bibtex, BibEntry, BibField};
pub use crate::core::latex::{
    detokenize, parse, parse_with, parse_with_discovery, tokenize, tokenize_with, CommandArity,
    CommandArityProvider, CommandTable, Parse, ParseContext, ParseDiagnostic, Span, SyntaxKind,
    SyntaxNode, Token, TokenList,
};
pub use utils::diagnostics;
pub use utils::error::{ConfigError, ParseError, ParseResult};

pub use latexkit_dtx::{index_macro_docs, MacroDocIndexer, MacroDocs};

/// Which top-level grammar applies to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Latex,
    Bibtex,
    /// Documented LaTeX source (`.dtx`): LaTeX plus macro documentation
    DocumentedSource,
}

impl Dialect {
    /// Dialect implied by the file extension; anything unknown is LaTeX.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let extension = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("bib") => Dialect::Bibtex,
            Some("dtx") => Dialect::DocumentedSource,
            _ => Dialect::Latex,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Dialect::Latex => "latex",
            Dialect::Bibtex => "bibtex",
            Dialect::DocumentedSource => "dtx",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

lazy_static! {
    static ref BIB_ENTRY: Regex = Regex::new(r"(?m)^\s*@[A-Za-z]+\s*[{(]").unwrap();
    static ref MACRO_DOC: Regex =
        Regex::new(r"(?m)^%\s*\\begin\{macro\}|\\begin\{macrocode\}").unwrap();
}

/// Guess the dialect from content.
pub fn detect_dialect(text: &str) -> Dialect {
    if MACRO_DOC.is_match(text) {
        Dialect::DocumentedSource
    } else if BIB_ENTRY.is_match(text) && !text.contains("\\documentclass") {
        Dialect::Bibtex
    } else {
        Dialect::Latex
    }
}

/// Parse `input` with the grammar of `dialect`.
///
/// Documented sources are parsed as LaTeX; their macro documentation lives
/// in comments and is read by [`index_macro_docs`].
pub fn parse_dialect(input: &str, dialect: Dialect) -> ParseResult<Parse> {
    match dialect {
        Dialect::Bibtex => parse_bibtex(input),
        Dialect::Latex | Dialect::DocumentedSource => parse(input),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_from_path() {
        assert_eq!(Dialect::from_path("refs.bib"), Dialect::Bibtex);
        assert_eq!(Dialect::from_path("pkg.DTX"), Dialect::DocumentedSource);
        assert_eq!(Dialect::from_path("paper.tex"), Dialect::Latex);
        assert_eq!(Dialect::from_path("README"), Dialect::Latex);
    }

    #[test]
    fn test_detect_dialect() {
        assert_eq!(detect_dialect("@article{key,\n title={T}}"), Dialect::Bibtex);
        assert_eq!(
            detect_dialect("% \\begin{macro}{\\foo}\n%    \\begin{macrocode}"),
            Dialect::DocumentedSource
        );
        assert_eq!(
            detect_dialect("\\documentclass{article}\n@misc{x}"),
            Dialect::Latex
        );
        assert_eq!(detect_dialect("plain text"), Dialect::Latex);
    }

    #[test]
    fn test_parse_dialect() {
        let parse = parse_dialect("@misc{a, title = {T}}", Dialect::Bibtex).unwrap();
        assert!(parse
            .syntax()
            .children()
            .any(|n| n.kind() == SyntaxKind::ItemBibEntry));
        assert_eq!(Dialect::DocumentedSource.to_string(), "dtx");
    }
}
