//! Integration tests for BibTeX parsing and label collection

use latexkit::core::bibtex::entries;
use latexkit::diagnostics::check_parse;
use latexkit::utils::latex_analysis::{collect_labels, duplicate_labels};
use latexkit::{detect_dialect, parse_bibtex, Dialect};
use pretty_assertions::assert_eq;

const LIBRARY: &str = r#"This file was exported by hand.

@string{tug = "TeX Users Group"}

@book{knuth1984,
  author    = {Donald E. Knuth},
  title     = {The {\TeX}book},
  publisher = {Addison-Wesley},
  year      = 1984,
}

@article(lamport1986,
  author  = "Leslie Lamport",
  journal = tug # " Newsletter",
  note    = {see @misc{x}}
)

@comment{ @book{ignored, title = {no}} }

@misc{knuth1984, title = {Duplicate key}}
"#;

#[test]
fn test_library_entries() {
    let parse = parse_bibtex(LIBRARY).unwrap();
    assert!(!parse.has_errors(), "{:?}", parse.errors());
    let root = parse.syntax();
    assert_eq!(root.text().to_string(), LIBRARY);

    let summary: Vec<_> = entries(&root)
        .map(|e| (e.entry_type().unwrap_or_default(), e.key()))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("string".to_string(), None),
            ("book".to_string(), Some("knuth1984".to_string())),
            ("article".to_string(), Some("lamport1986".to_string())),
            ("comment".to_string(), None),
            ("misc".to_string(), Some("knuth1984".to_string())),
        ]
    );
}

#[test]
fn test_field_values() {
    let root = parse_bibtex(LIBRARY).unwrap().syntax();
    let book = entries(&root).nth(1).unwrap();
    assert_eq!(book.field("author").as_deref(), Some("Donald E. Knuth"));
    assert_eq!(book.field("title").as_deref(), Some("The {\\TeX}book"));
    assert_eq!(book.field("YEAR").as_deref(), Some("1984"));

    let article = entries(&root).nth(2).unwrap();
    assert_eq!(article.field("author").as_deref(), Some("Leslie Lamport"));
    assert_eq!(
        article.field("journal").as_deref(),
        Some("tug # \" Newsletter\"")
    );
    assert_eq!(article.field("note").as_deref(), Some("see @misc{x}"));
}

#[test]
fn test_bibtex_labels_and_duplicates() {
    let root = parse_bibtex(LIBRARY).unwrap().syntax();
    let labels: Vec<_> = collect_labels(&root)
        .into_iter()
        .map(|l| (l.command, l.name))
        .collect();
    assert_eq!(
        labels,
        vec![
            ("@book".to_string(), "knuth1984".to_string()),
            ("@article".to_string(), "lamport1986".to_string()),
            ("@misc".to_string(), "knuth1984".to_string()),
        ]
    );
    let duplicates = duplicate_labels(&root);
    assert_eq!(duplicates.len(), 1);
    assert_eq!(duplicates[0].name, "knuth1984");
}

#[test]
fn test_check_reports_bibtex_errors() {
    let source = "@book{a, title = {T}\n@book{b, title = {U}}\n";
    let parse = parse_bibtex(source).unwrap();
    let result = check_parse(source, &parse);
    assert_eq!(result.errors, 1);
    assert_eq!(result.diagnostics[0].line, 1);
    assert_eq!(result.diagnostics[0].message, "unterminated entry `@book`");
}

#[test]
fn test_detects_library() {
    assert_eq!(detect_dialect(LIBRARY), Dialect::Bibtex);
}
