//! Discovery of user command and environment definitions
//!
//! This module recognises the definition commands of a parsed document:
//! - `\newcommand`, `\renewcommand`, `\providecommand`, `\DeclareRobustCommand`
//! - `\def` and friends (parameter text `#1#2`)
//! - `\DeclareMathOperator`
//! - `\NewDocumentCommand` and friends (xparse argument specs)
//! - `\newenvironment`, `\renewenvironment`, `\NewDocumentEnvironment`
//!
//! Discovered signatures are registered into a [`CommandTable`], so that a
//! second parse binds the right number of arguments.

use rowan::ast::AstNode;
use serde::Serialize;

use super::ast::CmdItem;
use super::commands::{Arg, CommandArity, CommandArityProvider, CommandTable};
use super::parser::{parse_with, Parse, ParseContext};
use super::syntax::{SyntaxKind, SyntaxNode};
use super::token::Span;
use crate::config::ParseOptions;
use crate::utils::error::ParseResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DefinitionKind {
    Command,
    Environment,
}

/// A definition found in a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Definition {
    pub kind: DefinitionKind,
    /// Defined name: `\foo` for commands, `foo` for environments
    pub name: String,
    /// The defining command, e.g. `\newcommand`
    pub command: String,
    #[serde(skip)]
    pub arity: CommandArity,
    pub span: Span,
}

impl Definition {
    pub fn required(&self) -> usize {
        self.arity.required()
    }

    pub fn optional(&self) -> usize {
        self.arity.optional()
    }
}

/// `[n][default]` of `\newcommand`: `n` arguments, the first optional when a
/// default is given.
fn newcommand_arity(cmd: &CmdItem) -> CommandArity {
    let mut optionals = cmd.optional_args();
    let count = optionals
        .next()
        .and_then(|arg| arg.content_text().trim().parse::<u8>().ok())
        .unwrap_or(0);
    let has_default = optionals.next().is_some();
    if has_default && count > 0 {
        CommandArity::new(count - 1, 1)
    } else {
        CommandArity::new(count, 0)
    }
}

/// Highest `#n` in TeX parameter text.
fn def_arity(cmd: &CmdItem) -> CommandArity {
    let text = cmd
        .syntax()
        .children()
        .find(|n| n.kind() == SyntaxKind::ItemParamText)
        .map(|n| n.text().to_string())
        .unwrap_or_default();
    let count = text
        .as_bytes()
        .windows(2)
        .filter(|w| w[0] == b'#')
        .filter_map(|w| (w[1] as char).to_digit(10))
        .max()
        .unwrap_or(0);
    CommandArity::new(count as u8, 0)
}

/// Translate an xparse argument specification (`m o O{x} d() s`) into
/// argument slots.
pub fn parse_xparse_spec(spec: &str) -> Vec<Arg> {
    let chars: Vec<char> = spec.chars().collect();
    let mut args = Vec::new();
    let mut i = 0;

    // Skip a `{...}` group at `i`, if present.
    let skip_group = |mut i: usize| -> usize {
        while chars.get(i).is_some_and(|c| c.is_whitespace()) {
            i += 1;
        }
        if chars.get(i) != Some(&'{') {
            return i;
        }
        let mut depth = 0;
        while let Some(&c) = chars.get(i) {
            i += 1;
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                _ => {}
            }
        }
        i
    };

    while let Some(&c) = chars.get(i) {
        i += 1;
        match c {
            'm' | 'r' | 'v' => {
                args.push(Arg::Required);
                if c == 'r' {
                    i += 2;
                }
            }
            'R' => {
                args.push(Arg::Required);
                i = skip_group(i + 2);
            }
            'o' => args.push(Arg::Optional),
            'O' => {
                args.push(Arg::Optional);
                i = skip_group(i);
            }
            'd' => {
                args.push(Arg::Optional);
                i += 2;
            }
            'D' => {
                args.push(Arg::Optional);
                i = skip_group(i + 2);
            }
            // Star, token and embellishment flags bind no group.
            't' => i += 1,
            'e' => i = skip_group(i),
            'E' => i = skip_group(skip_group(i)),
            // Argument processors: `>{\SplitList{;}}`
            '>' => i = skip_group(i),
            _ => {}
        }
    }
    args
}

fn xparse_arity(cmd: &CmdItem, spec_index: usize) -> CommandArity {
    let spec = cmd.required_arg_text(spec_index).unwrap_or_default();
    CommandArity::from_args(parse_xparse_spec(&spec))
}

fn definition_of(cmd: &CmdItem) -> Option<Definition> {
    let command = cmd.name_text()?;
    let (kind, arity) = match command.as_str() {
        "\\newcommand" | "\\renewcommand" | "\\providecommand" | "\\DeclareRobustCommand" => {
            (DefinitionKind::Command, newcommand_arity(cmd))
        }
        "\\def" | "\\gdef" | "\\edef" | "\\xdef" => (DefinitionKind::Command, def_arity(cmd)),
        "\\DeclareMathOperator" => (DefinitionKind::Command, CommandArity::new(0, 0)),
        "\\NewDocumentCommand"
        | "\\RenewDocumentCommand"
        | "\\ProvideDocumentCommand"
        | "\\DeclareDocumentCommand" => (DefinitionKind::Command, xparse_arity(cmd, 1)),
        "\\newenvironment" | "\\renewenvironment" => {
            (DefinitionKind::Environment, newcommand_arity(cmd))
        }
        "\\NewDocumentEnvironment" | "\\RenewDocumentEnvironment" => {
            (DefinitionKind::Environment, xparse_arity(cmd, 1))
        }
        _ => return None,
    };

    let name = cmd.required_arg_text(0)?;
    let valid = match kind {
        DefinitionKind::Command => name.starts_with('\\') && name.len() > 1,
        DefinitionKind::Environment => !name.is_empty() && !name.contains('\\'),
    };
    if !valid {
        return None;
    }
    Some(Definition {
        kind,
        name,
        command,
        arity,
        span: cmd.syntax().text_range().into(),
    })
}

/// All definitions in document order.
pub fn discover_definitions(root: &SyntaxNode) -> Vec<Definition> {
    root.descendants()
        .filter_map(CmdItem::cast)
        .filter_map(|cmd| definition_of(&cmd))
        .collect()
}

/// Register definitions; returns how many entries changed the table.
pub fn register_definitions(definitions: &[Definition], table: &mut CommandTable) -> usize {
    definitions
        .iter()
        .filter(|def| match def.kind {
            DefinitionKind::Command => table.register_arity(def.name.clone(), def.arity.clone()),
            DefinitionKind::Environment => {
                table.register_environment_arity(def.name.clone(), def.arity.clone())
            }
        })
        .count()
}

/// Parse, learn the document's own definitions, and parse again if they
/// changed how arguments bind.
pub fn parse_with_discovery(
    input: &str,
    table: &mut CommandTable,
    options: &ParseOptions,
) -> ParseResult<Parse> {
    let first = parse_with(input, &ParseContext::new(&*table, options))?;
    let definitions = discover_definitions(&first.syntax());
    let changed = register_definitions(&definitions, table);
    tracing::debug!(
        definitions = definitions.len(),
        changed,
        "discovered definitions"
    );
    if changed == 0 {
        return Ok(first);
    }
    parse_with(input, &ParseContext::new(&*table, options))
}

/// Command names the table knows only through registration.
pub fn is_user_defined(table: &CommandTable, name: &str) -> bool {
    table.user_defined().lookup(name).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::latex::parser::parse;
    use pretty_assertions::assert_eq;

    fn definitions(input: &str) -> Vec<(String, usize, usize)> {
        discover_definitions(&parse(input).unwrap().syntax())
            .into_iter()
            .map(|d| (d.name.clone(), d.required(), d.optional()))
            .collect()
    }

    #[test]
    fn test_newcommand() {
        assert_eq!(
            definitions("\\newcommand{\\foo}[2]{#1 and #2}"),
            vec![("\\foo".to_string(), 2, 0)]
        );
        assert_eq!(
            definitions("\\newcommand*\\bar[3][x]{#1#2#3}"),
            vec![("\\bar".to_string(), 2, 1)]
        );
        assert_eq!(
            definitions("\\renewcommand{\\baz}{x}"),
            vec![("\\baz".to_string(), 0, 0)]
        );
    }

    #[test]
    fn test_def() {
        assert_eq!(
            definitions("\\def\\pair#1#2{(#1,#2)}"),
            vec![("\\pair".to_string(), 2, 0)]
        );
    }

    #[test]
    fn test_math_operator() {
        assert_eq!(
            definitions("\\DeclareMathOperator{\\tr}{tr}"),
            vec![("\\tr".to_string(), 0, 0)]
        );
    }

    #[test]
    fn test_xparse_spec() {
        assert_eq!(
            parse_xparse_spec("m o O{default} d() D<>{x} s t+ m"),
            vec![
                Arg::Required,
                Arg::Optional,
                Arg::Optional,
                Arg::Optional,
                Arg::Optional,
                Arg::Required,
            ]
        );
        assert_eq!(parse_xparse_spec(">{\\SplitList{;}}m"), vec![Arg::Required]);
    }

    #[test]
    fn test_new_document_command() {
        assert_eq!(
            definitions("\\NewDocumentCommand{\\vec}{o m}{#2}"),
            vec![("\\vec".to_string(), 1, 1)]
        );
    }

    #[test]
    fn test_environments() {
        let defs = discover_definitions(
            &parse("\\newenvironment{boxed}[1]{\\begin{center}#1}{\\end{center}}")
                .unwrap()
                .syntax(),
        );
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].kind, DefinitionKind::Environment);
        assert_eq!(defs[0].name, "boxed");
        assert_eq!(defs[0].required(), 1);
    }

    #[test]
    fn test_parse_with_discovery() {
        let input = "\\newcommand{\\pair}[2]{(#1,#2)}\n\\pair{a}{b}";
        let options = ParseOptions::default();
        let mut table = CommandTable::new();
        let parse = parse_with_discovery(input, &mut table, &options).unwrap();
        assert!(is_user_defined(&table, "\\pair"));
        let pair = parse
            .syntax()
            .children()
            .filter_map(CmdItem::cast)
            .find(|c| c.name_text().as_deref() == Some("\\pair"))
            .unwrap();
        assert_eq!(pair.required_args().count(), 2);
    }

    #[test]
    fn test_discovered_environment_binds_arguments() {
        let input = "\\newenvironment{boxed}[1]{}{}\n\\begin{boxed}{title}x\\end{boxed}";
        let options = ParseOptions::default();
        let mut table = CommandTable::new();
        let parse = parse_with_discovery(input, &mut table, &options).unwrap();
        let env = parse
            .syntax()
            .children()
            .find_map(crate::core::latex::ast::EnvItem::cast)
            .unwrap();
        assert_eq!(env.arguments().count(), 1);
    }
}
