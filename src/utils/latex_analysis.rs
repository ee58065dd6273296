//! LaTeX analysis utilities: tree metrics and labels.

use indexmap::IndexMap;
use rowan::ast::AstNode;
use serde::Serialize;

use crate::core::latex::ast::{CmdItem, EnvItem};
use crate::core::latex::parser::{parse, Parse};
use crate::core::latex::syntax::{SyntaxKind, SyntaxNode};
use crate::core::latex::token::Span;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LatexMetrics {
    pub headings: usize,
    pub environments: usize,
    pub math_regions: usize,
    pub equations: usize,
    pub figures: usize,
    pub tables: usize,
    pub commands: usize,
    pub cites: usize,
    pub refs: usize,
    pub labels: usize,
    pub list_items: usize,
    pub parse_errors: usize,
    pub duplicate_labels: usize,
}

const HEADINGS: &[&str] = &[
    "\\part",
    "\\chapter",
    "\\section",
    "\\subsection",
    "\\subsubsection",
    "\\paragraph",
    "\\subparagraph",
];

const REFS: &[&str] = &[
    "\\ref",
    "\\eqref",
    "\\pageref",
    "\\autoref",
    "\\nameref",
    "\\cref",
    "\\Cref",
];

fn is_cite(name: &str) -> bool {
    name.starts_with("\\cite") || name.ends_with("cite")
}

/// Count structural elements of a parsed document.
pub fn metrics(parse: &Parse) -> LatexMetrics {
    let root = parse.syntax();
    let mut metrics = LatexMetrics {
        parse_errors: parse.errors().len(),
        duplicate_labels: duplicate_labels(&root).len(),
        ..LatexMetrics::default()
    };

    for node in root.descendants() {
        match node.kind() {
            SyntaxKind::ItemCmd => {
                metrics.commands += 1;
                let Some(name) = CmdItem::cast(node).and_then(|c| c.name_text()) else {
                    continue;
                };
                let name = name.as_str();
                if HEADINGS.contains(&name) {
                    metrics.headings += 1;
                } else if REFS.contains(&name) {
                    metrics.refs += 1;
                } else if is_cite(name) {
                    metrics.cites += 1;
                } else if name == "\\label" {
                    metrics.labels += 1;
                } else if name == "\\item" {
                    metrics.list_items += 1;
                }
            }
            SyntaxKind::ItemEnv | SyntaxKind::ItemMathEnv => {
                metrics.environments += 1;
                if node.kind() == SyntaxKind::ItemMathEnv {
                    metrics.math_regions += 1;
                    metrics.equations += 1;
                }
                match EnvItem::cast(node).and_then(|e| e.name()).as_deref() {
                    Some("figure" | "figure*") => metrics.figures += 1,
                    Some("table" | "table*") => metrics.tables += 1,
                    _ => {}
                }
            }
            SyntaxKind::ItemInlineMath => metrics.math_regions += 1,
            SyntaxKind::ItemDisplayMath => {
                metrics.math_regions += 1;
                metrics.equations += 1;
            }
            _ => {}
        }
    }
    metrics
}

/// Parse `source` and count its elements.
pub fn metrics_source(source: &str) -> LatexMetrics {
    match parse(source) {
        Ok(parse) => metrics(&parse),
        Err(_) => LatexMetrics::default(),
    }
}

/// Error and warning counts of a document.
pub fn lint_source(source: &str) -> (usize, usize) {
    let result = crate::utils::diagnostics::check_latex(source);
    (result.errors, result.warnings)
}

/// A label definition: `\label{x}`, `\bibitem{x}` or a BibTeX entry key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelDefinition {
    pub name: String,
    /// Defining command or entry type, e.g. `\label` or `@article`
    pub command: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateLabel {
    pub name: String,
    /// Every definition site, in document order
    pub spans: Vec<Span>,
}

fn bib_entry_label(entry: &SyntaxNode) -> Option<LabelDefinition> {
    let key = entry
        .children()
        .find(|n| n.kind() == SyntaxKind::ItemBibKey)?;
    let name = key.text().to_string().trim().to_string();
    if name.is_empty() {
        return None;
    }
    let kind = entry
        .children_with_tokens()
        .filter_map(|e| e.into_token())
        .find(|t| t.kind() == SyntaxKind::TokenWord)?;
    Some(LabelDefinition {
        name,
        command: format!("@{}", kind.text().to_lowercase()),
        span: key.text_range().into(),
    })
}

/// Label definitions in document order.
///
/// Labels inside macro definitions (`\label{#1}`) are skipped.
pub fn collect_labels(root: &SyntaxNode) -> Vec<LabelDefinition> {
    let mut labels = Vec::new();
    for node in root.descendants() {
        match node.kind() {
            SyntaxKind::ItemCmd => {
                let Some(cmd) = CmdItem::cast(node) else {
                    continue;
                };
                let Some(command) = cmd.name_text() else {
                    continue;
                };
                if command != "\\label" && command != "\\bibitem" {
                    continue;
                }
                let Some(arg) = cmd.required_args().next() else {
                    continue;
                };
                let name = arg.content_text().trim().to_string();
                if name.is_empty() || name.contains('#') {
                    continue;
                }
                labels.push(LabelDefinition {
                    name,
                    command,
                    span: arg.syntax().text_range().into(),
                });
            }
            SyntaxKind::ItemBibEntry => labels.extend(bib_entry_label(&node)),
            _ => {}
        }
    }
    labels
}

/// Labels defined more than once.
pub fn duplicate_labels(root: &SyntaxNode) -> Vec<DuplicateLabel> {
    let mut by_name: IndexMap<String, Vec<Span>> = IndexMap::new();
    for label in collect_labels(root) {
        by_name.entry(label.name).or_default().push(label.span);
    }
    by_name
        .into_iter()
        .filter(|(_, spans)| spans.len() > 1)
        .map(|(name, spans)| DuplicateLabel { name, spans })
        .collect()
}
