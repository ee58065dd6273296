//! Token definitions shared by the LaTeX and BibTeX lexers.
//!
//! A token is a kind plus the exact slice of source it covers, so the token
//! stream of any input concatenates back to that input.

use std::fmt;

use serde::Serialize;

use super::syntax::SyntaxKind;

/// A byte span in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Span {
    pub start: usize,
    pub len: usize,
}

impl Span {
    pub fn new(start: usize, len: usize) -> Self {
        Span { start, len }
    }

    pub fn end(&self) -> usize {
        self.start + self.len
    }
}

impl From<rowan::TextRange> for Span {
    fn from(range: rowan::TextRange) -> Self {
        Span::new(range.start().into(), range.len().into())
    }
}

/// A lexed token: its kind, source text and byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Token<'a> {
    pub kind: SyntaxKind,
    pub text: &'a str,
    pub offset: usize,
}

impl<'a> Token<'a> {
    pub fn new(kind: SyntaxKind, text: &'a str, offset: usize) -> Self {
        Token { kind, text, offset }
    }

    pub fn span(&self) -> Span {
        Span::new(self.offset, self.text.len())
    }

    /// Returns true for whitespace, line breaks and comments.
    pub fn is_trivia(&self) -> bool {
        self.kind.is_trivia()
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text)
    }
}

/// An owned sequence of tokens.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TokenList<'a>(pub Vec<Token<'a>>);

impl<'a> TokenList<'a> {
    pub fn from_vec(tokens: Vec<Token<'a>>) -> Self {
        TokenList(tokens)
    }

    pub fn as_slice(&self) -> &[Token<'a>] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Kinds only, handy for assertions.
    pub fn kinds(&self) -> Vec<SyntaxKind> {
        self.0.iter().map(|t| t.kind).collect()
    }
}

impl fmt::Display for TokenList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.0 {
            write!(f, "{}", token)?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for TokenList<'a> {
    type Item = Token<'a>;
    type IntoIter = std::vec::IntoIter<Token<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a, 'b> IntoIterator for &'b TokenList<'a> {
    type Item = &'b Token<'a>;
    type IntoIter = std::slice::Iter<'b, Token<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
