//! LaTeX parser
//!
//! A recursive descent parser over the token stream that builds a lossless
//! rowan tree. The parser never gives up on malformed input: unmatched
//! braces, stray `\end`s and unterminated math become [`SyntaxKind::ItemError`]
//! nodes (or unclosed nodes) plus a [`ParseDiagnostic`], and parsing carries on.
//!
//! Argument binding is driven by a [`CommandArityProvider`]. Unknown commands
//! take no arguments; braces after them are plain groups.

use std::sync::atomic::{AtomicBool, Ordering};

use rowan::{GreenNode, GreenNodeBuilder, NodeOrToken};
use serde::Serialize;
use serde_json::json;

use super::commands::{
    is_definition_command, pseudocode_block_end, Arg, CommandArityProvider, StaticBuiltin,
};
use super::lexer::Lexer;
use super::syntax::{SyntaxElement, SyntaxKind, SyntaxNode};
use super::token::{Span, Token};
use crate::config::ParseOptions;
use crate::utils::error::{ParseError, ParseResult};

/// A recoverable problem found while parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseDiagnostic {
    pub message: String,
    pub span: Span,
}

/// Result of parsing: the green tree and the recovered errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parse {
    green: GreenNode,
    errors: Vec<ParseDiagnostic>,
}

impl Parse {
    pub(crate) fn new(green: GreenNode, errors: Vec<ParseDiagnostic>) -> Self {
        Parse { green, errors }
    }

    pub fn green(&self) -> &GreenNode {
        &self.green
    }

    pub fn syntax(&self) -> SyntaxNode {
        SyntaxNode::new_root(self.green.clone())
    }

    pub fn errors(&self) -> &[ParseDiagnostic] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Indented dump of the tree, one element per line.
    pub fn debug_tree(&self) -> String {
        format!("{:#?}", self.syntax())
    }

    /// The tree as JSON: nodes carry `kind`, `span` and `children`, tokens
    /// carry `kind`, `span` and `text`.
    pub fn to_json(&self) -> serde_json::Value {
        element_json(NodeOrToken::Node(self.syntax()))
    }
}

fn element_json(element: SyntaxElement) -> serde_json::Value {
    let span = Span::from(element.text_range());
    match element {
        NodeOrToken::Node(node) => json!({
            "kind": node.kind(),
            "span": span,
            "children": node.children_with_tokens().map(element_json).collect::<Vec<_>>(),
        }),
        NodeOrToken::Token(token) => json!({
            "kind": token.kind(),
            "span": span,
            "text": token.text(),
        }),
    }
}

/// Everything a parse needs besides the text.
#[derive(Clone, Copy)]
pub struct ParseContext<'a> {
    pub commands: &'a dyn CommandArityProvider,
    pub options: &'a ParseOptions,
    /// Polled periodically; once set the parse returns [`ParseError::Cancelled`]
    pub cancel: Option<&'a AtomicBool>,
}

impl<'a> ParseContext<'a> {
    pub fn new(commands: &'a dyn CommandArityProvider, options: &'a ParseOptions) -> Self {
        ParseContext {
            commands,
            options,
            cancel: None,
        }
    }

    pub fn with_cancel(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }
}

impl Default for ParseContext<'static> {
    fn default() -> Self {
        ParseContext::new(&StaticBuiltin, ParseOptions::shared_default())
    }
}

/// Parse with the builtin command table and default options.
pub fn parse(input: &str) -> ParseResult<Parse> {
    parse_with(input, &ParseContext::default())
}

pub fn parse_with(input: &str, ctx: &ParseContext<'_>) -> ParseResult<Parse> {
    if input.len() > u32::MAX as usize {
        return Err(ParseError::InputTooLarge { len: input.len() });
    }
    let tokens: Vec<Token<'_>> = Lexer::with_options(input, ctx.options).collect();
    let token_count = tokens.len();
    let parse = Parser::new(tokens, ctx).parse()?;
    tracing::debug!(
        tokens = token_count,
        errors = parse.errors.len(),
        "parsed latex document"
    );
    Ok(parse)
}

/// Deepest nesting of open constructs the parser descends into. Openers
/// past it become error leaves and their content stays at the current level.
pub const MAX_NESTING_DEPTH: usize = 256;

/// Open constructs that a token may close.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Scope {
    Group,
    Optional,
    InlineMath,
    DisplayMath,
    Environment(String),
    /// Pseudocode block waiting for its end keyword
    Pseudocode(&'static str),
}

struct Parser<'t, 'c> {
    tokens: Vec<Token<'t>>,
    pos: usize,
    builder: GreenNodeBuilder<'static>,
    errors: Vec<ParseDiagnostic>,
    scopes: Vec<Scope>,
    commands: &'c dyn CommandArityProvider,
    options: &'c ParseOptions,
    cancel: Option<&'c AtomicBool>,
    steps: usize,
    cancelled: bool,
    /// Nesting of definition command arguments (`\newcommand{..}{..}`)
    definition_depth: usize,
}

impl<'t, 'c> Parser<'t, 'c> {
    fn new(tokens: Vec<Token<'t>>, ctx: &ParseContext<'c>) -> Self {
        Parser {
            tokens,
            pos: 0,
            builder: GreenNodeBuilder::new(),
            errors: Vec::new(),
            scopes: Vec::new(),
            commands: ctx.commands,
            options: ctx.options,
            cancel: ctx.cancel,
            steps: 0,
            cancelled: false,
            definition_depth: 0,
        }
    }

    fn parse(mut self) -> ParseResult<Parse> {
        self.check_cancelled();
        self.builder.start_node(SyntaxKind::ScopeRoot.into());
        self.parse_content();
        self.builder.finish_node();
        if self.cancelled {
            tracing::debug!(position = self.pos, "parse cancelled");
            return Err(ParseError::Cancelled);
        }
        Ok(Parse::new(self.builder.finish(), self.errors))
    }

    // ---------------------------------------------------------------------
    // Token access
    // ---------------------------------------------------------------------

    fn current(&self) -> Option<Token<'t>> {
        if self.cancelled {
            return None;
        }
        self.tokens.get(self.pos).copied()
    }

    fn at(&self, kind: SyntaxKind) -> bool {
        self.current().is_some_and(|t| t.kind == kind)
    }

    fn check_cancelled(&mut self) {
        if let Some(flag) = self.cancel {
            if flag.load(Ordering::Relaxed) {
                self.cancelled = true;
            }
        }
    }

    fn bump(&mut self) {
        let Some(token) = self.current() else {
            return;
        };
        self.builder.token(token.kind.into(), token.text);
        self.pos += 1;
        self.steps += 1;
        if self.steps % self.options.cancel_check_interval.max(1) == 0 {
            self.check_cancelled();
        }
    }

    fn bump_to(&mut self, index: usize) {
        while self.pos < index && !self.cancelled {
            self.bump();
        }
    }

    fn in_definition(&self) -> bool {
        self.definition_depth > 0
    }

    fn error(&mut self, message: impl Into<String>, span: Span) {
        self.errors.push(ParseDiagnostic {
            message: message.into(),
            span,
        });
    }

    /// Wrap the current token in an error node, unless inside a definition.
    fn bump_stray(&mut self, message: &str) {
        let Some(token) = self.current() else {
            return;
        };
        if self.in_definition() {
            self.bump();
            return;
        }
        self.error(message, token.span());
        self.builder.start_node(SyntaxKind::ItemError.into());
        self.bump();
        self.builder.finish_node();
    }

    /// The environment name in `{name}` following the `\begin`/`\end` at `index`.
    fn environment_name(&self, index: usize) -> Option<String> {
        let mut at = index + 1;
        while self
            .tokens
            .get(at)
            .is_some_and(|t| t.kind == SyntaxKind::TokenWhiteSpace)
        {
            at += 1;
        }
        if self.tokens.get(at)?.kind != SyntaxKind::TokenLBrace {
            return None;
        }
        let mut name = String::new();
        for token in &self.tokens[at + 1..] {
            match token.kind {
                SyntaxKind::TokenRBrace => return Some(name.trim().to_string()),
                SyntaxKind::TokenLBrace | SyntaxKind::TokenLineBreak => return None,
                _ => name.push_str(token.text),
            }
        }
        None
    }

    // ---------------------------------------------------------------------
    // Scopes
    // ---------------------------------------------------------------------

    /// Returns true if `token` closes one of the open scopes.
    fn ends_scope(&self, token: Token<'t>) -> bool {
        match token.kind {
            SyntaxKind::TokenRBrace => self.scopes.contains(&Scope::Group),
            SyntaxKind::TokenRBracket => self.scopes.last() == Some(&Scope::Optional),
            SyntaxKind::TokenInlineMathEnd => self.scopes.contains(&Scope::InlineMath),
            SyntaxKind::TokenDisplayMathEnd => self.scopes.contains(&Scope::DisplayMath),
            SyntaxKind::TokenEndEnv => match self.environment_name(self.pos) {
                Some(name) => self
                    .scopes
                    .iter()
                    .any(|s| matches!(s, Scope::Environment(open) if *open == name)),
                None => false,
            },
            SyntaxKind::TokenCommandSym => {
                for scope in self.scopes.iter().rev() {
                    match scope {
                        Scope::Pseudocode(end) if *end == token.text => return true,
                        Scope::Pseudocode(_) => continue,
                        _ => return false,
                    }
                }
                false
            }
            _ => false,
        }
    }

    fn nesting_exhausted(&self) -> bool {
        self.scopes.len() >= MAX_NESTING_DEPTH
    }

    /// Keep an opener found past the nesting limit as a flat error leaf.
    fn bump_too_deep(&mut self) {
        let Some(token) = self.current() else {
            return;
        };
        self.error("nesting too deep", token.span());
        self.builder.start_node(SyntaxKind::ItemError.into());
        self.bump();
        if token.kind == SyntaxKind::TokenBeginEnv {
            // The `{name}` goes with the `\begin`.
            while let Some(next) = self.current() {
                self.bump();
                if next.kind == SyntaxKind::TokenRBrace {
                    break;
                }
            }
        }
        self.builder.finish_node();
    }

    fn with_scope(&mut self, scope: Scope, f: impl FnOnce(&mut Self)) {
        self.scopes.push(scope);
        f(self);
        self.scopes.pop();
    }

    // ---------------------------------------------------------------------
    // Grammar
    // ---------------------------------------------------------------------

    /// Items until end of input or a token that closes an open scope.
    fn parse_content(&mut self) {
        while let Some(token) = self.current() {
            if self.ends_scope(token) {
                break;
            }
            self.parse_item(token);
        }
    }

    fn parse_item(&mut self, token: Token<'t>) {
        match token.kind {
            SyntaxKind::TokenCommandSym => self.parse_command(token),
            SyntaxKind::TokenBeginEnv => self.parse_environment(token),
            SyntaxKind::TokenEndEnv => self.parse_stray_end(token),
            SyntaxKind::TokenLBrace => self.parse_group(SyntaxKind::ItemCurly),
            SyntaxKind::TokenRBrace => self.bump_stray("unmatched `}`"),
            SyntaxKind::TokenInlineMathStart => self.parse_math(
                SyntaxKind::ItemInlineMath,
                Scope::InlineMath,
                SyntaxKind::TokenInlineMathEnd,
            ),
            SyntaxKind::TokenDisplayMathStart => self.parse_math(
                SyntaxKind::ItemDisplayMath,
                Scope::DisplayMath,
                SyntaxKind::TokenDisplayMathEnd,
            ),
            SyntaxKind::TokenInlineMathEnd | SyntaxKind::TokenDisplayMathEnd => {
                self.bump_stray("unmatched math delimiter")
            }
            _ => self.bump(),
        }
    }

    /// `{ ... }` as a plain group or a required argument.
    fn parse_group(&mut self, kind: SyntaxKind) {
        if self.nesting_exhausted() {
            self.bump_too_deep();
            return;
        }
        let Some(open) = self.current() else {
            return;
        };
        self.builder.start_node(kind.into());
        self.bump();
        self.with_scope(Scope::Group, Self::parse_content);
        if self.at(SyntaxKind::TokenRBrace) {
            self.bump();
        } else if !self.cancelled {
            self.error("unclosed `{`", open.span());
        }
        self.builder.finish_node();
    }

    fn parse_optional_arg(&mut self) {
        if self.nesting_exhausted() {
            self.bump_too_deep();
            return;
        }
        let Some(open) = self.current() else {
            return;
        };
        self.builder.start_node(SyntaxKind::ItemOptionalArg.into());
        self.bump();
        self.with_scope(Scope::Optional, Self::parse_content);
        if self.at(SyntaxKind::TokenRBracket) {
            self.bump();
        } else if !self.cancelled {
            self.error("unclosed `[`", open.span());
        }
        self.builder.finish_node();
    }

    fn parse_math(&mut self, kind: SyntaxKind, scope: Scope, end: SyntaxKind) {
        if self.nesting_exhausted() {
            self.bump_too_deep();
            return;
        }
        let Some(open) = self.current() else {
            return;
        };
        self.builder.start_node(kind.into());
        self.bump();
        self.with_scope(scope, Self::parse_content);
        if self.at(end) {
            self.bump();
        } else if !self.cancelled && !self.in_definition() {
            self.error("unclosed math", open.span());
        }
        self.builder.finish_node();
    }

    fn parse_command(&mut self, token: Token<'t>) {
        let end = match pseudocode_block_end(token.text) {
            Some(end) if !self.nesting_exhausted() => end,
            _ => {
                self.parse_command_node(token);
                return;
            }
        };
        let checkpoint = self.builder.checkpoint();
        self.parse_command_node(token);
        self.with_scope(Scope::Pseudocode(end), Self::parse_content);
        match self.current() {
            Some(closing) if closing.kind == SyntaxKind::TokenCommandSym && closing.text == end => {
                self.parse_command_node(closing);
                self.builder
                    .start_node_at(checkpoint, SyntaxKind::ItemPseudocodeBlock.into());
                self.builder.finish_node();
            }
            // Unmatched block keywords are left as plain commands.
            _ => {}
        }
    }

    fn parse_command_node(&mut self, token: Token<'t>) {
        let commands = self.commands;
        let definition = is_definition_command(token.text);
        self.builder.start_node(SyntaxKind::ItemCmd.into());
        self.bump();
        if definition {
            self.definition_depth += 1;
        }
        if let Some(arity) = commands.lookup(token.text) {
            if self.at(SyntaxKind::TokenAsterisk) {
                self.bump();
            }
            self.bind_args(arity.args());
        }
        if self.at(SyntaxKind::TokenVerbatim) {
            self.bump();
        }
        if definition {
            self.definition_depth -= 1;
        }
        self.builder.finish_node();
    }

    /// Index of the token where a required argument could start: after
    /// whitespace and at most one line break.
    fn required_arg_start(&self) -> usize {
        let mut at = self.pos;
        let mut line_breaks = 0;
        while let Some(token) = self.tokens.get(at) {
            match token.kind {
                SyntaxKind::TokenWhiteSpace => at += 1,
                SyntaxKind::TokenLineBreak if line_breaks == 0 => {
                    line_breaks += 1;
                    at += 1;
                }
                _ => break,
            }
        }
        at
    }

    fn bind_args(&mut self, args: &[Arg]) {
        for arg in args {
            match arg {
                Arg::Optional => {
                    if self.at(SyntaxKind::TokenLBracket) {
                        self.parse_optional_arg();
                    }
                }
                Arg::Required => {
                    let start = self.required_arg_start();
                    let Some(next) = self.tokens.get(start).copied() else {
                        return;
                    };
                    match next.kind {
                        SyntaxKind::TokenLBrace => {
                            self.bump_to(start);
                            self.parse_group(SyntaxKind::ItemRequiredArg);
                        }
                        SyntaxKind::TokenCommandSym => {
                            self.bump_to(start);
                            self.builder.start_node(SyntaxKind::ItemRequiredArg.into());
                            self.bump();
                            self.builder.finish_node();
                        }
                        _ => return,
                    }
                }
                Arg::ParameterText => {
                    self.builder.start_node(SyntaxKind::ItemParamText.into());
                    while let Some(token) = self.current() {
                        if matches!(
                            token.kind,
                            SyntaxKind::TokenLBrace | SyntaxKind::TokenRBrace
                        ) {
                            break;
                        }
                        self.bump();
                    }
                    self.builder.finish_node();
                }
            }
            if self.cancelled {
                return;
            }
        }
    }

    fn parse_environment(&mut self, begin: Token<'t>) {
        let Some(name) = self.environment_name(self.pos) else {
            self.bump_stray("missing environment name");
            return;
        };
        if self.nesting_exhausted() {
            self.bump_too_deep();
            return;
        }
        let kind = if self.options.is_math_environment(&name) {
            SyntaxKind::ItemMathEnv
        } else {
            SyntaxKind::ItemEnv
        };
        tracing::trace!(%name, "environment");

        self.builder.start_node(kind.into());
        self.builder.start_node(SyntaxKind::ItemBegin.into());
        self.bump();
        self.bind_args(&[Arg::Required]);
        let commands = self.commands;
        if let Some(arity) = commands.lookup_environment(&name) {
            self.bind_args(arity.args());
        }
        self.builder.finish_node();

        self.with_scope(Scope::Environment(name.clone()), Self::parse_content);

        match self.current() {
            Some(token)
                if token.kind == SyntaxKind::TokenEndEnv
                    && self.environment_name(self.pos).as_deref() == Some(name.as_str()) =>
            {
                self.parse_end();
            }
            _ => {
                if !self.cancelled && !self.in_definition() {
                    self.error(format!("unterminated environment `{}`", name), begin.span());
                }
            }
        }
        self.builder.finish_node();
    }

    fn parse_end(&mut self) {
        self.builder.start_node(SyntaxKind::ItemEnd.into());
        self.bump();
        self.bind_args(&[Arg::Required]);
        self.builder.finish_node();
    }

    fn parse_stray_end(&mut self, token: Token<'t>) {
        if self.in_definition() {
            self.parse_end();
            return;
        }
        let message = match self.environment_name(self.pos) {
            Some(name) => format!("unmatched `\\end{{{}}}`", name),
            None => "unmatched `\\end`".to_string(),
        };
        self.error(message, token.span());
        self.builder.start_node(SyntaxKind::ItemError.into());
        self.parse_end();
        self.builder.finish_node();
    }
}
