//! Integration tests for definition discovery, command tables and options

use latexkit::core::latex::ast::{CmdItem, EnvItem};
use latexkit::core::latex::definitions::{discover_definitions, DefinitionKind};
use latexkit::{
    parse, parse_with, parse_with_discovery, CommandTable, ParseContext, ParseOptions, SyntaxNode,
};
use pretty_assertions::assert_eq;
use rowan::ast::AstNode;

fn command(root: &SyntaxNode, name: &str) -> Option<CmdItem> {
    root.descendants()
        .filter_map(CmdItem::cast)
        .find(|c| c.name_text().as_deref() == Some(name))
}

const PREAMBLE: &str = r"\documentclass{article}
\newcommand*{\norm}[1]{\left\lVert#1\right\rVert}
\newcommand\pair[3][x]{(#1,#2,#3)}
\def\swap#1#2{#2#1}
\DeclareMathOperator{\tr}{tr}
\NewDocumentCommand{\abs}{s o m}{|#3|}
\newenvironment{note}[1]{\textbf{#1}:}{}
\begin{document}
$\norm{v} + \pair[y]{a}{b} + \abs*{z}$ \swap{a}{b}
\begin{note}{Title}Body\end{note}
\end{document}
";

#[test]
fn test_discovers_every_definition() {
    let root = parse(PREAMBLE).unwrap().syntax();
    let definitions: Vec<_> = discover_definitions(&root)
        .into_iter()
        .map(|d| (d.kind, d.name.clone(), d.required(), d.optional()))
        .collect();
    assert_eq!(
        definitions,
        vec![
            (DefinitionKind::Command, "\\norm".to_string(), 1, 0),
            (DefinitionKind::Command, "\\pair".to_string(), 2, 1),
            (DefinitionKind::Command, "\\swap".to_string(), 2, 0),
            (DefinitionKind::Command, "\\tr".to_string(), 0, 0),
            (DefinitionKind::Command, "\\abs".to_string(), 1, 1),
            (DefinitionKind::Environment, "note".to_string(), 1, 0),
        ]
    );
}

#[test]
fn test_unknown_commands_bind_nothing_before_discovery() {
    let root = parse(PREAMBLE).unwrap().syntax();
    let norm = root
        .descendants()
        .filter_map(CmdItem::cast)
        .filter(|c| c.name_text().as_deref() == Some("\\norm"))
        .last()
        .unwrap();
    assert_eq!(norm.arguments().count(), 0);
}

#[test]
fn test_second_pass_binds_discovered_arities() {
    let options = ParseOptions::default();
    let mut table = CommandTable::new();
    let parse = parse_with_discovery(PREAMBLE, &mut table, &options).unwrap();
    assert!(!parse.has_errors(), "{:?}", parse.errors());
    let root = parse.syntax();
    assert_eq!(root.text().to_string(), PREAMBLE);

    let uses: Vec<_> = root
        .descendants()
        .filter_map(CmdItem::cast)
        .filter(|c| {
            matches!(
                c.name_text().as_deref(),
                Some("\\pair" | "\\abs" | "\\swap")
            )
        })
        // Uses only; the names inside definitions bind nothing.
        .filter(|c| c.required_args().count() > 0)
        .map(|c| {
            (
                c.name_text().unwrap_or_default(),
                c.optional_args().count(),
                c.required_args().count(),
            )
        })
        .collect();
    assert_eq!(
        uses,
        vec![
            ("\\pair".to_string(), 1, 2),
            ("\\abs".to_string(), 0, 1),
            ("\\swap".to_string(), 0, 2),
        ]
    );

    let note = root
        .descendants()
        .filter_map(EnvItem::cast)
        .find(|e| e.name().as_deref() == Some("note"))
        .unwrap();
    let args: Vec<_> = note.arguments().map(|a| a.content_text()).collect();
    assert_eq!(args, vec!["Title"]);
}

#[test]
fn test_starred_command_absorbs_star() {
    let options = ParseOptions::default();
    let mut table = CommandTable::new();
    let parse = parse_with_discovery(PREAMBLE, &mut table, &options).unwrap();
    let root = parse.syntax();
    let abs = root
        .descendants()
        .filter_map(CmdItem::cast)
        .filter(|c| c.name_text().as_deref() == Some("\\abs"))
        .last()
        .unwrap();
    assert!(abs.is_starred());
    assert_eq!(abs.required_arg_text(0).as_deref(), Some("z"));
}

#[test]
fn test_registered_command_in_context() {
    let mut table = CommandTable::new();
    table.register("\\foo", 2, 0);
    let options = ParseOptions::default();
    let parse = parse_with("\\foo{a}\n{b} c", &ParseContext::new(&table, &options)).unwrap();
    let foo = command(&parse.syntax(), "\\foo").unwrap();
    assert_eq!(foo.required_arg_text(1).as_deref(), Some("b"));
}

#[cfg(feature = "config")]
mod config {
    use super::*;
    use pretty_assertions::assert_eq;
    use latexkit::ConfigError;

    const OPTIONS: &str = r#"
verbatim_environments = ["code"]
math_environments = ["dmath"]
text_commands = ["\\mytext"]

[preamble_environments]
mytab = 1

[commands."\\vect"]
required = 1

[environments.card]
required = 1
optional = 1
"#;

    #[test]
    fn test_options_drive_lexer_and_parser() {
        let options = ParseOptions::from_toml_str(OPTIONS).unwrap();
        let table = options.command_table();
        let ctx = ParseContext::new(&table, &options);
        let input = "\\begin{code}$ {\\end{code}\\begin{dmath}\\mytext{a $b$}\\end{dmath}\\vect{v}";
        let parse = parse_with(input, &ctx).unwrap();
        assert!(!parse.has_errors(), "{:?}", parse.errors());

        let root = parse.syntax();
        let envs: Vec<_> = root
            .children()
            .filter_map(EnvItem::cast)
            .map(|e| (e.name().unwrap_or_default(), e.is_math()))
            .collect();
        assert_eq!(
            envs,
            vec![("code".to_string(), false), ("dmath".to_string(), true)]
        );
        let vect = command(&root, "\\vect").unwrap();
        assert_eq!(vect.required_arg_text(0).as_deref(), Some("v"));
    }

    #[test]
    fn test_configured_environment_arguments() {
        let options = ParseOptions::from_toml_str(OPTIONS).unwrap();
        let table = options.command_table();
        let ctx = ParseContext::new(&table, &options);
        let parse = parse_with("\\begin{card}[t]{Title}x\\end{card}", &ctx).unwrap();
        let card = parse.syntax().children().find_map(EnvItem::cast).unwrap();
        let args: Vec<_> = card.arguments().map(|a| a.content_text()).collect();
        assert_eq!(args, vec!["t", "Title"]);
    }

    #[test]
    fn test_invalid_options() {
        assert!(matches!(
            ParseOptions::from_toml_str("cancel_check_interval = 0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ParseOptions::from_toml_str("verbatim_environments = 3"),
            Err(ConfigError::Toml(_))
        ));
    }
}
