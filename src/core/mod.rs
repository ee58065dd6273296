//! Core front end
//!
//! - `latex`: LaTeX lexer, parser and tree views
//! - `bibtex`: BibTeX lexer and parser over the same syntax kinds

pub mod bibtex;
pub mod latex;
