//! BibTeX support
//!
//! The lexer and parser share [`SyntaxKind`] and the rowan tree types with
//! the LaTeX side, so label collection and diagnostics work on both.

pub mod lexer;
pub mod parser;

use rowan::ast::AstNode;
use rowan::NodeOrToken;

use crate::core::latex::syntax::{LatexLanguage, SyntaxKind, SyntaxNode};

pub use lexer::{tokenize_bibtex, BibLexer};
pub use parser::parse_bibtex;

/// A typed view over an `@type{key, ...}` entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BibEntry {
    syntax: SyntaxNode,
}

impl AstNode for BibEntry {
    type Language = LatexLanguage;

    fn can_cast(kind: SyntaxKind) -> bool {
        kind == SyntaxKind::ItemBibEntry
    }

    fn cast(node: SyntaxNode) -> Option<Self> {
        Self::can_cast(node.kind()).then(|| BibEntry { syntax: node })
    }

    fn syntax(&self) -> &SyntaxNode {
        &self.syntax
    }
}

impl BibEntry {
    /// Lowercased entry type without the `@`.
    pub fn entry_type(&self) -> Option<String> {
        self.syntax
            .children_with_tokens()
            .filter_map(NodeOrToken::into_token)
            .find(|t| t.kind() == SyntaxKind::TokenWord)
            .map(|t| t.text().to_ascii_lowercase())
    }

    pub fn key(&self) -> Option<String> {
        self.syntax
            .children()
            .find(|n| n.kind() == SyntaxKind::ItemBibKey)
            .map(|n| n.text().to_string())
    }

    pub fn fields(&self) -> impl Iterator<Item = BibField> {
        self.syntax.children().filter_map(BibField::cast)
    }

    /// Value text of the first field called `name` (case-insensitive).
    pub fn field(&self, name: &str) -> Option<String> {
        self.fields()
            .find(|f| f.name().is_some_and(|n| n.eq_ignore_ascii_case(name)))
            .and_then(|f| f.value_text())
    }
}

/// A `name = value` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BibField {
    syntax: SyntaxNode,
}

impl AstNode for BibField {
    type Language = LatexLanguage;

    fn can_cast(kind: SyntaxKind) -> bool {
        kind == SyntaxKind::ItemBibField
    }

    fn cast(node: SyntaxNode) -> Option<Self> {
        Self::can_cast(node.kind()).then(|| BibField { syntax: node })
    }

    fn syntax(&self) -> &SyntaxNode {
        &self.syntax
    }
}

impl BibField {
    pub fn name(&self) -> Option<String> {
        self.syntax
            .first_token()
            .filter(|t| t.kind() == SyntaxKind::TokenWord)
            .map(|t| t.text().to_string())
    }

    pub fn value(&self) -> Option<SyntaxNode> {
        self.syntax
            .children()
            .find(|n| n.kind() == SyntaxKind::ItemBibValue)
    }

    /// Value source text; a single braced or quoted part loses its delimiters.
    pub fn value_text(&self) -> Option<String> {
        let text = self.value()?.text().to_string();
        Some(
            single_part(&text)
                .map(str::to_string)
                .unwrap_or_else(|| text.clone()),
        )
    }
}

/// Content of `{...}` or `"..."` when the delimiters enclose the whole text.
fn single_part(text: &str) -> Option<&str> {
    let quoted = text.starts_with('"');
    let inner = if quoted {
        text.strip_prefix('"')?.strip_suffix('"')?
    } else {
        text.strip_prefix('{')?.strip_suffix('}')?
    };
    let mut depth = 0usize;
    for c in inner.chars() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.checked_sub(1)?,
            '"' if quoted && depth == 0 => return None,
            _ => {}
        }
    }
    (depth == 0).then_some(inner)
}

/// Entries of a parsed `.bib` file in order.
pub fn entries(root: &SyntaxNode) -> impl Iterator<Item = BibEntry> {
    root.children().filter_map(BibEntry::cast)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_entry_view() {
        let input = "@ARTICLE{lamport94,\n  Title = {{LaTeX}: A Document Preparation System},\n  year = \"1994\",\n  pages = 1 # \"--\" # 2\n}";
        let root = parse_bibtex(input).unwrap().syntax();
        let entry = entries(&root).next().unwrap();
        assert_eq!(entry.entry_type().as_deref(), Some("article"));
        assert_eq!(entry.key().as_deref(), Some("lamport94"));
        assert_eq!(entry.fields().count(), 3);
        assert_eq!(entry.field("year").as_deref(), Some("1994"));
        assert_eq!(
            entry.field("title").as_deref(),
            Some("{LaTeX}: A Document Preparation System")
        );
        assert_eq!(entry.field("pages").as_deref(), Some("1 # \"--\" # 2"));
        assert_eq!(single_part("{a} # {b}"), None);
    }

    #[test]
    fn test_string_entry_has_no_key() {
        let root = parse_bibtex("@string{me = {Me}}").unwrap().syntax();
        let entry = entries(&root).next().unwrap();
        assert_eq!(entry.entry_type().as_deref(), Some("string"));
        assert_eq!(entry.key(), None);
        assert_eq!(entry.field("me").as_deref(), Some("Me"));
    }
}
