//! LaTeX lexer and parser
//!
//! This module implements the LaTeX side of the front end:
//! - A mode-tracking lexer (text, math, verbatim, disabled regions)
//! - A command arity table layered over builtin signatures
//! - A recovering parser producing a lossless rowan tree
//! - Typed views and definition discovery over that tree

pub mod ast;
pub mod commands;
pub mod definitions;
pub mod lexer;
pub mod mode;
pub mod parser;
pub mod syntax;
pub mod token;

pub use ast::{ArgItem, CmdItem, EnvItem, MathItem};
pub use commands::{
    Arg, CommandArity, CommandArityProvider, CommandTable, StaticBuiltin, UserDefined,
};
pub use definitions::{
    discover_definitions, parse_with_discovery, register_definitions, Definition, DefinitionKind,
};
pub use lexer::{detokenize, tokenize, tokenize_with, Lexer};
pub use mode::{LexerMode, MathDelimiter, ModeStack};
pub use parser::{parse, parse_with, Parse, ParseContext, ParseDiagnostic};
pub use syntax::{LatexLanguage, SyntaxElement, SyntaxKind, SyntaxNode, SyntaxToken};
pub use token::{Span, Token, TokenList};
