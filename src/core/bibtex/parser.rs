//! BibTeX parser
//!
//! Builds the same kind of lossless rowan tree as the LaTeX parser. Every
//! `@` starts an [`SyntaxKind::ItemBibEntry`]; anything between entries stays
//! at the root as comment tokens. Malformed entries are closed early with a
//! diagnostic and the next `@` starts over.

use rowan::GreenNodeBuilder;

use super::lexer::BibLexer;
use crate::core::latex::parser::{Parse, ParseDiagnostic};
use crate::core::latex::syntax::SyntaxKind;
use crate::core::latex::token::{Span, Token};
use crate::utils::error::{ParseError, ParseResult};

/// Parse a `.bib` file.
pub fn parse_bibtex(input: &str) -> ParseResult<Parse> {
    if input.len() > u32::MAX as usize {
        return Err(ParseError::InputTooLarge { len: input.len() });
    }
    let tokens: Vec<Token<'_>> = BibLexer::new(input).collect();
    let token_count = tokens.len();
    let parse = BibParser::new(tokens).parse();
    tracing::debug!(
        tokens = token_count,
        errors = parse.errors().len(),
        "parsed bibtex file"
    );
    Ok(parse)
}

struct BibParser<'t> {
    tokens: Vec<Token<'t>>,
    pos: usize,
    builder: GreenNodeBuilder<'static>,
    errors: Vec<ParseDiagnostic>,
}

impl<'t> BibParser<'t> {
    fn new(tokens: Vec<Token<'t>>) -> Self {
        BibParser {
            tokens,
            pos: 0,
            builder: GreenNodeBuilder::new(),
            errors: Vec::new(),
        }
    }

    fn parse(mut self) -> Parse {
        self.builder.start_node(SyntaxKind::ScopeRoot.into());
        while let Some(token) = self.current() {
            if token.kind == SyntaxKind::TokenAt {
                self.parse_entry();
            } else {
                self.bump();
            }
        }
        self.builder.finish_node();
        Parse::new(self.builder.finish(), self.errors)
    }

    fn current(&self) -> Option<Token<'t>> {
        self.tokens.get(self.pos).copied()
    }

    fn at(&self, kind: SyntaxKind) -> bool {
        self.current().is_some_and(|t| t.kind == kind)
    }

    fn bump(&mut self) {
        if let Some(token) = self.current() {
            self.builder.token(token.kind.into(), token.text);
            self.pos += 1;
        }
    }

    fn skip_trivia(&mut self) {
        while self.current().is_some_and(|t| t.is_trivia()) {
            self.bump();
        }
    }

    /// Kind of the next non-trivia token.
    fn peek_significant(&self) -> Option<SyntaxKind> {
        self.tokens[self.pos..]
            .iter()
            .find(|t| !t.is_trivia())
            .map(|t| t.kind)
    }

    fn error(&mut self, message: impl Into<String>, span: Span) {
        self.errors.push(ParseDiagnostic {
            message: message.into(),
            span,
        });
    }

    fn error_here(&mut self, message: &str) {
        let span = match self.current() {
            Some(token) => token.span(),
            None => {
                let end = self.tokens.last().map_or(0, |t| t.span().end());
                Span::new(end, 0)
            }
        };
        self.error(message, span);
    }

    fn parse_entry(&mut self) {
        let Some(at) = self.current() else {
            return;
        };
        self.builder.start_node(SyntaxKind::ItemBibEntry.into());
        self.bump();
        self.skip_trivia();

        let entry_type = match self.current() {
            Some(token) if token.kind == SyntaxKind::TokenWord => {
                self.bump();
                token.text.to_ascii_lowercase()
            }
            _ => {
                self.error("missing entry type", at.span());
                self.builder.finish_node();
                return;
            }
        };
        self.skip_trivia();

        let close = match self.current().map(|t| t.kind) {
            Some(SyntaxKind::TokenLBrace) => SyntaxKind::TokenRBrace,
            Some(SyntaxKind::TokenLParen) => SyntaxKind::TokenRParen,
            _ => {
                self.error_here("expected `{` or `(` after entry type");
                self.builder.finish_node();
                return;
            }
        };
        self.bump();

        match entry_type.as_str() {
            "comment" => self.parse_raw_body(close),
            "preamble" => {
                self.skip_trivia();
                self.parse_value();
                self.skip_trivia();
            }
            "string" => self.parse_fields(close),
            _ => {
                self.skip_trivia();
                self.parse_key(close);
                self.parse_fields(close);
            }
        }

        if self.at(close) {
            self.bump();
        } else {
            self.error(format!("unterminated entry `@{}`", entry_type), at.span());
        }
        self.builder.finish_node();
    }

    /// `@comment` bodies: balanced braces up to the closing delimiter.
    fn parse_raw_body(&mut self, close: SyntaxKind) {
        let mut depth = 0usize;
        while let Some(token) = self.current() {
            match token.kind {
                kind if kind == close && depth == 0 => return,
                SyntaxKind::TokenLBrace => depth += 1,
                SyntaxKind::TokenRBrace => depth = depth.saturating_sub(1),
                _ => {}
            }
            self.bump();
        }
    }

    fn parse_key(&mut self, close: SyntaxKind) {
        let Some(start) = self.current() else {
            return;
        };
        let is_key_token = |t: &Token<'_>| {
            !t.is_trivia()
                && t.kind != close
                && !matches!(
                    t.kind,
                    SyntaxKind::TokenComma | SyntaxKind::TokenAt | SyntaxKind::TokenEquals
                )
        };
        if !is_key_token(&start) {
            if start.kind == SyntaxKind::TokenComma {
                self.error("missing entry key", start.span());
            }
            return;
        }
        self.builder.start_node(SyntaxKind::ItemBibKey.into());
        while self.current().is_some_and(|t| is_key_token(&t)) {
            self.bump();
        }
        self.builder.finish_node();
    }

    /// `name = value` pairs separated by commas, up to the closing delimiter
    /// or the next `@`.
    fn parse_fields(&mut self, close: SyntaxKind) {
        loop {
            self.skip_trivia();
            let Some(token) = self.current() else {
                return;
            };
            match token.kind {
                kind if kind == close => return,
                SyntaxKind::TokenAt => return,
                SyntaxKind::TokenComma => self.bump(),
                SyntaxKind::TokenWord => self.parse_field(close),
                _ => {
                    if let Some(span) = self.bump_junk(close) {
                        self.error("unexpected token in entry", span);
                    }
                }
            }
        }
    }

    fn parse_field(&mut self, close: SyntaxKind) {
        self.builder.start_node(SyntaxKind::ItemBibField.into());
        self.bump();
        self.skip_trivia();
        if self.at(SyntaxKind::TokenEquals) {
            self.bump();
            self.skip_trivia();
            self.parse_value();
        } else {
            self.error_here("expected `=` after field name");
            let stop = [SyntaxKind::TokenComma, SyntaxKind::TokenAt, close];
            if self.current().is_some_and(|t| !stop.contains(&t.kind)) {
                self.bump_junk(close);
            }
        }
        self.builder.finish_node();
    }

    /// Wrap tokens up to the next comma, `@` or closing delimiter outside
    /// braces in an error node.
    fn bump_junk(&mut self, close: SyntaxKind) -> Option<Span> {
        let start = self.current()?;
        self.builder.start_node(SyntaxKind::ItemError.into());
        let mut end = start.span().end();
        let mut depth = 0usize;
        while let Some(token) = self.current() {
            match token.kind {
                SyntaxKind::TokenLBrace => depth += 1,
                SyntaxKind::TokenRBrace if depth > 0 => depth -= 1,
                kind if depth == 0
                    && (kind == close
                        || matches!(kind, SyntaxKind::TokenComma | SyntaxKind::TokenAt)) =>
                {
                    break
                }
                _ => {}
            }
            end = token.span().end();
            self.bump();
        }
        self.builder.finish_node();
        Some(Span::new(start.offset, end - start.offset))
    }

    /// Parts joined by `#`.
    fn parse_value(&mut self) {
        self.builder.start_node(SyntaxKind::ItemBibValue.into());
        loop {
            if !self.parse_value_part() {
                break;
            }
            if self.peek_significant() != Some(SyntaxKind::TokenHash) {
                break;
            }
            self.skip_trivia();
            self.bump();
            self.skip_trivia();
        }
        self.builder.finish_node();
    }

    /// A braced or quoted string, or a bare word (number or `@string` name).
    fn parse_value_part(&mut self) -> bool {
        let Some(start) = self.current() else {
            self.error_here("missing field value");
            return false;
        };
        match start.kind {
            SyntaxKind::TokenLBrace => {
                self.bump();
                if !self.bump_balanced(None) {
                    self.error("unclosed `{` in field value", start.span());
                }
                true
            }
            SyntaxKind::TokenQuote => {
                self.bump();
                if !self.bump_balanced(Some(SyntaxKind::TokenQuote)) {
                    self.error("unclosed `\"` in field value", start.span());
                }
                true
            }
            SyntaxKind::TokenWord => {
                self.bump();
                true
            }
            _ => {
                self.error_here("missing field value");
                false
            }
        }
    }

    /// Bump up to and including the closer: `terminator` at brace depth zero,
    /// or the unmatched `}` when `terminator` is `None`. False at end of input.
    fn bump_balanced(&mut self, terminator: Option<SyntaxKind>) -> bool {
        let mut depth = 0usize;
        while let Some(token) = self.current() {
            match token.kind {
                SyntaxKind::TokenLBrace => depth += 1,
                SyntaxKind::TokenRBrace if depth == 0 => {
                    if terminator.is_none() {
                        self.bump();
                        return true;
                    }
                    // A quoted value cannot close the entry's brace.
                    return false;
                }
                SyntaxKind::TokenRBrace => depth -= 1,
                kind if Some(kind) == terminator && depth == 0 => {
                    self.bump();
                    return true;
                }
                _ => {}
            }
            self.bump();
        }
        false
    }
}
