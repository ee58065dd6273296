//! LaTeX lexer
//!
//! Converts LaTeX source into a lazy stream of [`Token`]s whose spans
//! partition the input exactly. Context is tracked with a [`ModeStack`]:
//! - `$`, `$$`, `\(`, `\[` and math environments enter math mode
//! - `\text{...}`-like arguments inside math open a text frame
//! - verbatim environments and `\verb`/`\lstinline` produce opaque tokens
//! - `%! parser = off` / `on` comments suspend and resume tokenization
//!
//! Nothing here is fatal: unknown characters become words and stray
//! delimiters are emitted as tokens without changing the mode.

use std::ops::Range;

use lazy_static::lazy_static;
use regex::Regex;

use super::commands::{Arg, CommandArity, CommandArityProvider, StaticBuiltin};
use super::mode::{LexerMode, MathDelimiter, ModeStack};
use super::syntax::SyntaxKind;
use super::token::{Token, TokenList};
use crate::config::ParseOptions;

lazy_static! {
    /// `%! parser = off`, `% !TeX parser = on`, ...
    static ref DIRECTIVE: Regex =
        Regex::new(r"^%\s*!\s*(?i:TeX\s+)?parser\s*=\s*(on|off)\b").unwrap();
}

/// Returns `Some(true)` for a `parser = on` comment, `Some(false)` for `off`.
pub fn parse_directive(comment: &str) -> Option<bool> {
    DIRECTIVE
        .captures(comment)
        .map(|caps| caps[1].eq_ignore_ascii_case("on"))
}

/// Mode changes that take effect once the lexer reaches a given offset.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Pending {
    /// Verbatim environment body, ending at the given terminator
    Verbatim { terminator: String },
    /// `\verb` or `\lstinline` delimited argument
    InlineVerbatim,
    /// Math environment body
    MathEnvironment(String),
}

/// The LaTeX lexer
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    modes: ModeStack,
    /// Current brace depth
    depth: usize,
    pending: Option<(usize, Pending)>,
    /// Column preamble of the current tabular-like environment
    preamble: Option<Range<usize>>,
    /// A text command was seen in math; its next `{` opens a text frame
    text_group_armed: bool,
    options: &'a ParseOptions,
}

fn is_special(c: char) -> bool {
    matches!(
        c,
        '\\' | '{' | '}' | '[' | ']' | '$' | '%' | '&' | '#' | '^' | '_' | '*' | '~'
    )
}

fn is_command_letter(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '@'
}

fn is_blank(c: char) -> bool {
    c.is_whitespace() && c != '\n' && c != '\r'
}

impl<'a> Lexer<'a> {
    /// Create a new lexer with the default options
    pub fn new(input: &'a str) -> Self {
        Self::with_options(input, ParseOptions::shared_default())
    }

    pub fn with_options(input: &'a str, options: &'a ParseOptions) -> Self {
        Lexer {
            input,
            pos: 0,
            modes: ModeStack::new(),
            depth: 0,
            pending: None,
            preamble: None,
            text_group_armed: false,
            options,
        }
    }

    /// Start lexing in `mode` instead of normal text.
    ///
    /// The starting mode is an ordinary frame: a math start is closed by its
    /// delimiter, a verbatim start by its terminator.
    pub fn with_mode(input: &'a str, options: &'a ParseOptions, mode: LexerMode) -> Self {
        let mut lexer = Self::with_options(input, options);
        if mode != LexerMode::Normal {
            lexer.modes.push(mode, 0);
        }
        lexer
    }

    pub fn mode(&self) -> &LexerMode {
        self.modes.current()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    fn rest(&self) -> &'a str {
        let input = self.input;
        &input[self.pos..]
    }

    fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn emit(&mut self, kind: SyntaxKind, len: usize) -> Token<'a> {
        let input = self.input;
        let start = self.pos;
        self.pos += len;
        let token = Token::new(kind, &input[start..self.pos], start);
        self.after_token(&token);
        token
    }

    fn after_token(&mut self, token: &Token<'a>) {
        if token.is_trivia() {
            return;
        }
        self.text_group_armed = token.kind == SyntaxKind::TokenCommandSym
            && self.modes.is_math()
            && self.options.is_text_command(token.text);
    }

    /// Length of the rest of the current line, excluding the line break.
    fn line_len(&self) -> usize {
        self.rest()
            .find(|c: char| c == '\n' || c == '\r')
            .unwrap_or(self.rest().len())
    }

    fn skip_blanks(&self, from: usize) -> usize {
        let bytes = self.input.as_bytes();
        let mut at = from;
        while matches!(bytes.get(at), Some(b' ' | b'\t')) {
            at += 1;
        }
        at
    }

    /// Where an argument of an environment header may start. Optional
    /// arguments must follow immediately; required ones may come after
    /// blanks and one line break, as the parser binds them.
    fn arg_start(&self, from: usize, arg: Arg) -> usize {
        if arg == Arg::Optional {
            return from;
        }
        let bytes = self.input.as_bytes();
        let mut at = self.skip_blanks(from);
        match (bytes.get(at), bytes.get(at + 1)) {
            (Some(b'\r'), Some(b'\n')) => at += 2,
            (Some(b'\n' | b'\r'), _) => at += 1,
            _ => return at,
        }
        self.skip_blanks(at)
    }

    /// Offset just past the delimiter matching the `open` byte at `open_at`.
    fn balanced_end(&self, open_at: usize, open: u8, close: u8) -> Option<usize> {
        let bytes = self.input.as_bytes();
        let mut nesting = 0usize;
        let mut at = open_at;
        while at < bytes.len() {
            match bytes[at] {
                b'\\' => at += 1,
                b if b == open => nesting += 1,
                b if b == close => {
                    nesting -= 1;
                    if nesting == 0 {
                        return Some(at + 1);
                    }
                }
                _ => {}
            }
            at += 1;
        }
        None
    }

    /// Scan `{name}` starting at `from`; returns the name and the end offset.
    fn scan_group_name(&self, from: usize) -> Option<(&'a str, usize)> {
        let at = self.skip_blanks(from);
        if self.input.as_bytes().get(at) != Some(&b'{') {
            return None;
        }
        let end = self.balanced_end(at, b'{', b'}')?;
        let input = self.input;
        Some((input[at + 1..end - 1].trim(), end))
    }

    fn environment_args(&self, name: &str) -> Vec<Arg> {
        if let Some(arity) = self.options.environments.get(name) {
            return CommandArity::new(arity.required, arity.optional).args().to_vec();
        }
        StaticBuiltin
            .lookup_environment(name)
            .map(|arity| arity.args().to_vec())
            .unwrap_or_default()
    }

    /// Skip the environment arguments of a verbatim environment.
    fn skip_environment_args(&self, name: &str, from: usize) -> usize {
        let bytes = self.input.as_bytes();
        let mut pos = from;
        for arg in self.environment_args(name) {
            let at = self.arg_start(pos, arg);
            let end = match (arg, bytes.get(at)) {
                (Arg::Optional, Some(b'[')) => self.balanced_end(at, b'[', b']'),
                (Arg::Required, Some(b'{')) => self.balanced_end(at, b'{', b'}'),
                (Arg::Optional, _) => continue,
                _ => break,
            };
            match end {
                Some(end) => pos = end,
                None => break,
            }
        }
        pos
    }

    /// Locate the column preamble group after `\begin{name}`.
    fn scan_preamble(&self, widths: usize, from: usize) -> Option<Range<usize>> {
        let bytes = self.input.as_bytes();
        let mut at = from;
        let mut widths = widths;
        loop {
            if bytes.get(at) == Some(&b'[') {
                at = self.balanced_end(at, b'[', b']')?;
                continue;
            }
            at = self.arg_start(at, Arg::Required);
            match bytes.get(at) {
                Some(b'{') if widths > 0 => {
                    at = self.balanced_end(at, b'{', b'}')?;
                    widths -= 1;
                }
                Some(b'{') => return Some(at..self.balanced_end(at, b'{', b'}')?),
                _ => return None,
            }
        }
    }

    /// Inspect `\begin{name}` and schedule the mode change it implies.
    fn begin_environment(&mut self, header_from: usize) {
        let Some((name, header_end)) = self.scan_group_name(header_from) else {
            return;
        };
        if self.options.is_verbatim_environment(name) {
            let body = self.skip_environment_args(name, header_end);
            self.pending = Some((
                body,
                Pending::Verbatim {
                    terminator: format!("\\end{{{}}}", name),
                },
            ));
        } else if self.options.is_math_environment(name) {
            self.pending = Some((header_end, Pending::MathEnvironment(name.to_string())));
        } else if let Some(widths) = self.options.preamble_position(name) {
            self.preamble = self.scan_preamble(widths, header_end);
        }
    }

    fn apply_pending(&mut self) -> Option<Token<'a>> {
        match &self.pending {
            Some((at, _)) if *at <= self.pos => {}
            _ => return None,
        }
        let (_, pending) = self.pending.take()?;
        match pending {
            Pending::Verbatim { terminator } => {
                tracing::debug!(offset = self.pos, %terminator, "entering verbatim environment");
                self.modes.push(LexerMode::Verbatim(terminator), self.depth);
                None
            }
            Pending::MathEnvironment(name) => {
                self.modes
                    .push(LexerMode::Math(MathDelimiter::Environment(name)), self.depth);
                None
            }
            Pending::InlineVerbatim => self.lex_inline_verbatim(),
        }
    }

    /// The delimited argument of `\verb`: `|text|`, or `{text}` for
    /// `\lstinline`. An unterminated argument runs to the end of the line.
    fn lex_inline_verbatim(&mut self) -> Option<Token<'a>> {
        let delimiter = self.peek_char().filter(|c| !c.is_whitespace())?;
        let close = if delimiter == '{' { '}' } else { delimiter };
        let line = &self.rest()[..self.line_len()];
        let body = &line[delimiter.len_utf8()..];
        let len = match body.find(close) {
            Some(index) => delimiter.len_utf8() + index + close.len_utf8(),
            None => line.len(),
        };
        Some(self.emit(SyntaxKind::TokenVerbatim, len))
    }

    fn lex_verbatim_environment(&mut self) -> Option<Token<'a>> {
        let terminator = match self.modes.current() {
            LexerMode::Verbatim(terminator) => terminator.clone(),
            _ => return None,
        };
        match self.rest().find(terminator.as_str()) {
            Some(0) => {
                self.modes.pop();
                None
            }
            Some(len) => Some(self.emit(SyntaxKind::TokenRawText, len)),
            None => {
                self.modes.pop();
                let len = self.rest().len();
                Some(self.emit(SyntaxKind::TokenRawText, len))
            }
        }
    }

    fn lex_line_break(&mut self) -> Token<'a> {
        let len = if self.rest().starts_with("\r\n") { 2 } else { 1 };
        self.emit(SyntaxKind::TokenLineBreak, len)
    }

    fn lex_blanks(&mut self) -> Token<'a> {
        let len = self
            .rest()
            .find(|c: char| !is_blank(c))
            .unwrap_or(self.rest().len());
        self.emit(SyntaxKind::TokenWhiteSpace, len)
    }

    /// Tokens between `%! parser = off` and `%! parser = on`.
    fn lex_disabled(&mut self) -> Token<'a> {
        match self.peek_char() {
            Some('\n' | '\r') => self.lex_line_break(),
            Some(c) if is_blank(c) => self.lex_blanks(),
            Some('%') => {
                let len = self.line_len();
                let text = &self.rest()[..len];
                match parse_directive(text) {
                    Some(on) => {
                        if on {
                            tracing::debug!(offset = self.pos, "parser re-enabled");
                            self.modes.pop();
                        }
                        self.emit(SyntaxKind::TokenDirective, len)
                    }
                    None => self.emit(SyntaxKind::TokenComment, len),
                }
            }
            _ => {
                let line = &self.rest()[..self.line_len()];
                let bytes = line.as_bytes();
                // Stop before an unescaped `%` so trailing directives are seen.
                let len = (1..bytes.len())
                    .find(|&i| bytes[i] == b'%' && bytes[i - 1] != b'\\')
                    .unwrap_or(line.len());
                self.emit(SyntaxKind::TokenRawText, len)
            }
        }
    }

    fn lex_comment(&mut self) -> Token<'a> {
        let len = self.line_len();
        let text = &self.rest()[..len];
        match parse_directive(text) {
            Some(on) => {
                if !on {
                    tracing::debug!(offset = self.pos, "parser disabled");
                    self.modes.push(LexerMode::Disabled, self.depth);
                }
                self.emit(SyntaxKind::TokenDirective, len)
            }
            None => self.emit(SyntaxKind::TokenComment, len),
        }
    }

    fn lex_command(&mut self) -> Token<'a> {
        let after = &self.rest()[1..];
        let Some(first) = after.chars().next() else {
            // Lone backslash at end of input
            return self.emit(SyntaxKind::TokenWord, 1);
        };

        if !is_command_letter(first) {
            let len = 1 + first.len_utf8();
            let kind = match first {
                '[' => {
                    if !self.modes.is_math() {
                        self.modes
                            .push(LexerMode::Math(MathDelimiter::Bracket), self.depth);
                    }
                    SyntaxKind::TokenDisplayMathStart
                }
                '(' => {
                    if !self.modes.is_math() {
                        self.modes.push(LexerMode::Math(MathDelimiter::Paren), self.depth);
                    }
                    SyntaxKind::TokenInlineMathStart
                }
                ']' => {
                    self.modes.close_math(&MathDelimiter::Bracket);
                    SyntaxKind::TokenDisplayMathEnd
                }
                ')' => {
                    self.modes.close_math(&MathDelimiter::Paren);
                    SyntaxKind::TokenInlineMathEnd
                }
                _ => SyntaxKind::TokenCommandSym,
            };
            return self.emit(kind, len);
        }

        let name_len = after
            .find(|c: char| !is_command_letter(c))
            .unwrap_or(after.len());
        let name = &self.rest()[..1 + name_len];
        let end = self.pos + 1 + name_len;

        match name {
            "\\begin" => {
                self.begin_environment(end);
                self.emit(SyntaxKind::TokenBeginEnv, 1 + name_len)
            }
            "\\end" => {
                if let Some((env, _)) = self.scan_group_name(end) {
                    self.modes.close_environment(env);
                }
                self.emit(SyntaxKind::TokenEndEnv, 1 + name_len)
            }
            "\\verb" => {
                let star = usize::from(self.input[end..].starts_with('*'));
                self.pending = Some((end + star, Pending::InlineVerbatim));
                self.emit(SyntaxKind::TokenCommandSym, 1 + name_len + star)
            }
            "\\lstinline" => {
                let at = if self.input[end..].starts_with('[') {
                    self.balanced_end(end, b'[', b']').unwrap_or(end)
                } else {
                    end
                };
                self.pending = Some((at, Pending::InlineVerbatim));
                self.emit(SyntaxKind::TokenCommandSym, 1 + name_len)
            }
            _ => self.emit(SyntaxKind::TokenCommandSym, 1 + name_len),
        }
    }

    fn lex_dollar(&mut self) -> Token<'a> {
        if self
            .preamble
            .as_ref()
            .is_some_and(|range| range.contains(&self.pos))
        {
            return self.emit(SyntaxKind::TokenWord, 1);
        }
        let double = self.rest().starts_with("$$");
        match self.modes.current() {
            LexerMode::Math(MathDelimiter::Dollar) => {
                self.modes.pop();
                self.emit(SyntaxKind::TokenInlineMathEnd, 1)
            }
            LexerMode::Math(MathDelimiter::DoubleDollar) if double => {
                self.modes.pop();
                self.emit(SyntaxKind::TokenDisplayMathEnd, 2)
            }
            LexerMode::Math(_) if double => self.emit(SyntaxKind::TokenDisplayMathEnd, 2),
            LexerMode::Math(_) => self.emit(SyntaxKind::TokenInlineMathEnd, 1),
            _ if double => {
                self.modes
                    .push(LexerMode::Math(MathDelimiter::DoubleDollar), self.depth);
                self.emit(SyntaxKind::TokenDisplayMathStart, 2)
            }
            _ => {
                self.modes.push(LexerMode::Math(MathDelimiter::Dollar), self.depth);
                self.emit(SyntaxKind::TokenInlineMathStart, 1)
            }
        }
    }

    /// Read the next token
    fn next_token(&mut self) -> Option<Token<'a>> {
        loop {
            if self.pos >= self.input.len() {
                return None;
            }
            if let Some(token) = self.apply_pending() {
                return Some(token);
            }
            if self
                .preamble
                .as_ref()
                .is_some_and(|range| range.end <= self.pos)
            {
                self.preamble = None;
            }

            match self.modes.current() {
                LexerMode::Verbatim(_) => match self.lex_verbatim_environment() {
                    Some(token) => return Some(token),
                    None => continue,
                },
                LexerMode::Disabled => return Some(self.lex_disabled()),
                LexerMode::Normal | LexerMode::Math(_) => {}
            }

            let c = self.peek_char()?;
            let token = match c {
                '\\' => self.lex_command(),
                '%' => self.lex_comment(),
                '$' => self.lex_dollar(),
                '{' => {
                    self.depth += 1;
                    if self.text_group_armed {
                        self.modes.push(LexerMode::Normal, self.depth);
                    }
                    self.emit(SyntaxKind::TokenLBrace, 1)
                }
                '}' => {
                    if self.depth > 0 {
                        self.modes.close_group(self.depth);
                        self.depth -= 1;
                    }
                    self.emit(SyntaxKind::TokenRBrace, 1)
                }
                '[' => self.emit(SyntaxKind::TokenLBracket, 1),
                ']' => self.emit(SyntaxKind::TokenRBracket, 1),
                '&' => self.emit(SyntaxKind::TokenAmpersand, 1),
                '#' => self.emit(SyntaxKind::TokenHash, 1),
                '^' => self.emit(SyntaxKind::TokenCaret, 1),
                '_' => self.emit(SyntaxKind::TokenUnderscore, 1),
                '*' => self.emit(SyntaxKind::TokenAsterisk, 1),
                '~' => self.emit(SyntaxKind::TokenTilde, 1),
                '\n' | '\r' => self.lex_line_break(),
                c if is_blank(c) => self.lex_blanks(),
                _ => {
                    let len = self
                        .rest()
                        .find(|c: char| is_special(c) || c.is_whitespace())
                        .unwrap_or(self.rest().len());
                    self.emit(SyntaxKind::TokenWord, len)
                }
            };
            return Some(token);
        }
    }

    /// Tokenize the entire input
    pub fn tokenize(self) -> TokenList<'a> {
        TokenList::from_vec(self.collect())
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}

/// Convenience function to tokenize a string with default options
pub fn tokenize(input: &str) -> TokenList<'_> {
    Lexer::new(input).tokenize()
}

pub fn tokenize_with<'a>(input: &'a str, options: &'a ParseOptions) -> TokenList<'a> {
    Lexer::with_options(input, options).tokenize()
}

/// Convert a token list back to source text
pub fn detokenize(tokens: &TokenList<'_>) -> String {
    tokens.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use SyntaxKind::*;

    fn kinds(input: &str) -> Vec<SyntaxKind> {
        tokenize(input).kinds()
    }

    fn texts(input: &str) -> Vec<(SyntaxKind, &str)> {
        tokenize(input).into_iter().map(|t| (t.kind, t.text)).collect()
    }

    #[test]
    fn test_command_and_groups() {
        assert_eq!(
            texts("\\frac{a}{b}"),
            vec![
                (TokenCommandSym, "\\frac"),
                (TokenLBrace, "{"),
                (TokenWord, "a"),
                (TokenRBrace, "}"),
                (TokenLBrace, "{"),
                (TokenWord, "b"),
                (TokenRBrace, "}"),
            ]
        );
    }

    #[test]
    fn test_control_symbols() {
        assert_eq!(
            texts("\\\\[2pt]\\%"),
            vec![
                (TokenCommandSym, "\\\\"),
                (TokenLBracket, "["),
                (TokenWord, "2pt"),
                (TokenRBracket, "]"),
                (TokenCommandSym, "\\%"),
            ]
        );
    }

    #[test]
    fn test_at_letters() {
        assert_eq!(texts("\\if@tempswa")[0], (TokenCommandSym, "\\if@tempswa"));
    }

    #[test]
    fn test_lone_backslash() {
        assert_eq!(texts("a\\"), vec![(TokenWord, "a"), (TokenWord, "\\")]);
    }

    #[test]
    fn test_whitespace_and_line_breaks() {
        assert_eq!(
            texts("a  b\r\nc"),
            vec![
                (TokenWord, "a"),
                (TokenWhiteSpace, "  "),
                (TokenWord, "b"),
                (TokenLineBreak, "\r\n"),
                (TokenWord, "c"),
            ]
        );
    }

    #[test]
    fn test_comment_excludes_line_break() {
        assert_eq!(
            texts("a%note\nb"),
            vec![
                (TokenWord, "a"),
                (TokenComment, "%note"),
                (TokenLineBreak, "\n"),
                (TokenWord, "b"),
            ]
        );
    }

    #[test]
    fn test_inline_math() {
        assert_eq!(
            kinds("$x$"),
            vec![TokenInlineMathStart, TokenWord, TokenInlineMathEnd]
        );
        assert_eq!(
            kinds("$$x$$"),
            vec![TokenDisplayMathStart, TokenWord, TokenDisplayMathEnd]
        );
        assert_eq!(
            kinds("\\(x\\)\\[y\\]"),
            vec![
                TokenInlineMathStart,
                TokenWord,
                TokenInlineMathEnd,
                TokenDisplayMathStart,
                TokenWord,
                TokenDisplayMathEnd,
            ]
        );
    }

    #[test]
    fn test_adjacent_inline_math() {
        assert_eq!(
            kinds("$a$$b$"),
            vec![
                TokenInlineMathStart,
                TokenWord,
                TokenInlineMathEnd,
                TokenInlineMathStart,
                TokenWord,
                TokenInlineMathEnd,
            ]
        );
    }

    #[test]
    fn test_text_inside_math() {
        let mut lexer = Lexer::new("$ a \\text{ $b$ } c$ d");
        let kinds: Vec<_> = lexer.by_ref().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenInlineMathStart,
                TokenWhiteSpace,
                TokenWord,
                TokenWhiteSpace,
                TokenCommandSym,
                TokenLBrace,
                TokenWhiteSpace,
                TokenInlineMathStart,
                TokenWord,
                TokenInlineMathEnd,
                TokenWhiteSpace,
                TokenRBrace,
                TokenWhiteSpace,
                TokenWord,
                TokenInlineMathEnd,
                TokenWhiteSpace,
                TokenWord,
            ]
        );
        assert_eq!(lexer.mode(), &LexerMode::Normal);
    }

    #[test]
    fn test_math_environment_mode() {
        let tokens = tokenize("\\begin{equation}\\text{$x$}\\end{equation}$y$");
        let math_starts = tokens
            .as_slice()
            .iter()
            .filter(|t| t.kind == TokenInlineMathStart)
            .count();
        assert_eq!(math_starts, 2);
    }

    #[test]
    fn test_stray_math_closers() {
        assert_eq!(kinds("a\\]b"), vec![TokenWord, TokenDisplayMathEnd, TokenWord]);
        let mut lexer = Lexer::new("\\[ x \\) y");
        let _ = lexer.by_ref().count();
        assert!(lexer.mode().is_math());
    }

    #[test]
    fn test_unclosed_math_does_not_leak_out_of_group() {
        let mut lexer = Lexer::new("{$x}");
        let _ = lexer.by_ref().count();
        assert_eq!(lexer.mode(), &LexerMode::Normal);
    }

    #[test]
    fn test_inline_verbatim() {
        assert_eq!(
            texts("\\verb|aaa $ { bbb| c"),
            vec![
                (TokenCommandSym, "\\verb"),
                (TokenVerbatim, "|aaa $ { bbb|"),
                (TokenWhiteSpace, " "),
                (TokenWord, "c"),
            ]
        );
        assert_eq!(
            &texts("\\verb*+x+")[..2],
            &[(TokenCommandSym, "\\verb*"), (TokenVerbatim, "+x+")]
        );
    }

    #[test]
    fn test_lstinline() {
        assert_eq!(
            texts("\\lstinline[language=C]{int $x;}"),
            vec![
                (TokenCommandSym, "\\lstinline"),
                (TokenLBracket, "["),
                (TokenWord, "language=C"),
                (TokenRBracket, "]"),
                (TokenVerbatim, "{int $x;}"),
            ]
        );
    }

    #[test]
    fn test_unterminated_inline_verbatim_stops_at_line_end() {
        assert_eq!(
            texts("\\verb|abc\nd"),
            vec![
                (TokenCommandSym, "\\verb"),
                (TokenVerbatim, "|abc"),
                (TokenLineBreak, "\n"),
                (TokenWord, "d"),
            ]
        );
    }

    #[test]
    fn test_verbatim_environment() {
        let input = "\\begin{verbatim}\n$ \\begin{verbatim} { \n\\end{verbatim}x";
        let tokens = tokenize(input);
        let raw: Vec<_> = tokens
            .as_slice()
            .iter()
            .filter(|t| t.kind == TokenRawText)
            .map(|t| t.text)
            .collect();
        assert_eq!(raw, vec!["\n$ \\begin{verbatim} { \n"]);
        assert_eq!(
            &tokens.kinds()[tokens.len() - 5..],
            &[TokenEndEnv, TokenLBrace, TokenWord, TokenRBrace, TokenWord]
        );
        assert_eq!(detokenize(&tokens), input);
    }

    #[test]
    fn test_verbatim_environment_skips_options() {
        let tokens = tokenize("\\begin{lstlisting}[language=TeX]\n\\foo{\n\\end{lstlisting}");
        let raw: Vec<_> = tokens
            .as_slice()
            .iter()
            .filter(|t| t.kind == TokenRawText)
            .map(|t| t.text)
            .collect();
        assert_eq!(raw, vec!["\n\\foo{\n"]);
    }

    #[test]
    fn test_unterminated_verbatim_environment() {
        let tokens = tokenize("\\begin{verbatim}\n$x");
        assert_eq!(tokens.as_slice().last().map(|t| t.kind), Some(TokenRawText));
    }

    #[test]
    fn test_configured_verbatim_environment() {
        let mut options = ParseOptions::default();
        options.verbatim_environments.push("myverb".into());
        let tokens = tokenize_with("\\begin{myverb}$\\end{myverb}", &options);
        assert!(tokens.kinds().contains(&TokenRawText));
        assert!(!tokens.kinds().contains(&TokenInlineMathStart));
    }

    #[test]
    fn test_parser_directives() {
        let input = "%! parser = off\n\\begin{$\n% !TeX parser = on\n$x$";
        assert_eq!(
            texts(input),
            vec![
                (TokenDirective, "%! parser = off"),
                (TokenLineBreak, "\n"),
                (TokenRawText, "\\begin{$"),
                (TokenLineBreak, "\n"),
                (TokenDirective, "% !TeX parser = on"),
                (TokenLineBreak, "\n"),
                (TokenInlineMathStart, "$"),
                (TokenWord, "x"),
                (TokenInlineMathEnd, "$"),
            ]
        );
    }

    #[test]
    fn test_parse_directive() {
        assert_eq!(parse_directive("%! parser = off"), Some(false));
        assert_eq!(parse_directive("%!parser=on trailing"), Some(true));
        assert_eq!(parse_directive("% parser = off"), None);
        assert_eq!(parse_directive("%! parser = offline"), None);
    }

    #[test]
    fn test_tabular_preamble_math() {
        let tokens = tokenize("\\begin{tabular}{l>{$}l<{$}} a & b \\end{tabular} c");
        assert!(!tokens.kinds().contains(&TokenInlineMathStart));
        assert!(!tokens.kinds().contains(&TokenInlineMathEnd));

        let starred = tokenize("\\begin{tabular*}{\\linewidth}[t]{>{$}c<{$}}x\\end{tabular*}");
        assert!(!starred.kinds().contains(&TokenInlineMathStart));
    }

    #[test]
    fn test_preamble_on_next_line() {
        let tokens = tokenize("\\begin{tabular}\n  {l>{$}l<{$}} a & b \\end{tabular}");
        assert!(!tokens.kinds().contains(&TokenInlineMathStart));

        let crlf = tokenize("\\begin{tabular}[t]\r\n{>{$}c<{$}}x\\end{tabular}");
        assert!(!crlf.kinds().contains(&TokenInlineMathStart));

        // A blank line ends the header, so the braces are content.
        let paragraph = tokenize("\\begin{tabular}\n\n{$x$}\\end{tabular}");
        assert!(paragraph.kinds().contains(&TokenInlineMathStart));
    }

    #[test]
    fn test_dollar_after_preamble_is_math() {
        let tokens = tokenize("\\begin{array}{c}$x$\\end{array}");
        assert!(tokens.kinds().contains(&TokenInlineMathStart));
    }

    #[test]
    fn test_with_mode() {
        let options = ParseOptions::default();
        let tokens: Vec<_> = Lexer::with_mode(
            "a$b",
            &options,
            LexerMode::Math(MathDelimiter::Dollar),
        )
        .map(|t| t.kind)
        .collect();
        assert_eq!(tokens, vec![TokenWord, TokenInlineMathEnd, TokenWord]);

        let tokens: Vec<_> = Lexer::with_mode(
            "$x\\end{verbatim}$",
            &options,
            LexerMode::Verbatim("\\end{verbatim}".into()),
        )
        .map(|t| t.kind)
        .collect();
        assert_eq!(tokens[0], TokenRawText);
        assert_eq!(tokens[1], TokenEndEnv);
    }

    #[test]
    fn test_unicode_roundtrip() {
        let input = "Grüße \\emph{naïve} « $α+β$ » 漢字";
        assert_eq!(detokenize(&tokenize(input)), input);
    }
}
