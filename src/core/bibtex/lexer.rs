//! BibTeX lexer
//!
//! Text outside entries is junk and is emitted as comment tokens. Inside an
//! entry, the punctuation `{ } ( ) , = # " @` gets its own tokens, control
//! sequences become command tokens and everything else is split into words.

use crate::core::latex::syntax::SyntaxKind;
use crate::core::latex::token::{Token, TokenList};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Between entries
    Outside,
    /// After `@`, before the opening delimiter
    Header,
    /// Inside an entry opened with `close`'s counterpart
    Entry { depth: usize, close: char },
}

/// The BibTeX lexer
pub struct BibLexer<'a> {
    input: &'a str,
    pos: usize,
    state: State,
}

fn is_entry_special(c: char) -> bool {
    matches!(
        c,
        '{' | '}' | '(' | ')' | ',' | '=' | '#' | '"' | '@' | '\\'
    )
}

impl<'a> BibLexer<'a> {
    pub fn new(input: &'a str) -> Self {
        BibLexer {
            input,
            pos: 0,
            state: State::Outside,
        }
    }

    fn rest(&self) -> &'a str {
        let input = self.input;
        &input[self.pos..]
    }

    fn emit(&mut self, kind: SyntaxKind, len: usize) -> Token<'a> {
        let input = self.input;
        let start = self.pos;
        self.pos += len;
        Token::new(kind, &input[start..self.pos], start)
    }

    fn run_len(&self, stop: impl Fn(char) -> bool) -> usize {
        self.rest().find(stop).unwrap_or(self.rest().len())
    }

    fn lex_trivia(&mut self, c: char) -> Option<Token<'a>> {
        match c {
            '\n' => Some(self.emit(SyntaxKind::TokenLineBreak, 1)),
            '\r' => {
                let len = if self.rest().starts_with("\r\n") { 2 } else { 1 };
                Some(self.emit(SyntaxKind::TokenLineBreak, len))
            }
            c if c.is_whitespace() => {
                let len = self.run_len(|c| !c.is_whitespace() || c == '\n' || c == '\r');
                Some(self.emit(SyntaxKind::TokenWhiteSpace, len))
            }
            _ => None,
        }
    }

    fn lex_outside(&mut self, c: char) -> Token<'a> {
        match c {
            '@' => {
                self.state = State::Header;
                self.emit(SyntaxKind::TokenAt, 1)
            }
            '%' => {
                let len = self.run_len(|c| c == '\n' || c == '\r');
                self.emit(SyntaxKind::TokenComment, len)
            }
            _ => {
                let len = self.run_len(|c| c == '@' || c == '\n' || c == '\r');
                self.emit(SyntaxKind::TokenComment, len)
            }
        }
    }

    fn lex_header(&mut self, c: char) -> Token<'a> {
        match c {
            '{' => {
                self.state = State::Entry { depth: 1, close: '}' };
                self.emit(SyntaxKind::TokenLBrace, 1)
            }
            '(' => {
                self.state = State::Entry { depth: 1, close: ')' };
                self.emit(SyntaxKind::TokenLParen, 1)
            }
            '@' => self.emit(SyntaxKind::TokenAt, 1),
            '%' => {
                let len = self.run_len(|c| c == '\n' || c == '\r');
                self.emit(SyntaxKind::TokenComment, len)
            }
            c if is_entry_special(c) => {
                self.state = State::Outside;
                self.lex_punctuation(c)
            }
            _ => {
                let len = self.run_len(|c| c.is_whitespace() || c == '%' || is_entry_special(c));
                self.emit(SyntaxKind::TokenWord, len)
            }
        }
    }

    fn lex_punctuation(&mut self, c: char) -> Token<'a> {
        let kind = match c {
            '{' => SyntaxKind::TokenLBrace,
            '}' => SyntaxKind::TokenRBrace,
            '(' => SyntaxKind::TokenLParen,
            ')' => SyntaxKind::TokenRParen,
            ',' => SyntaxKind::TokenComma,
            '=' => SyntaxKind::TokenEquals,
            '#' => SyntaxKind::TokenHash,
            '"' => SyntaxKind::TokenQuote,
            '@' => SyntaxKind::TokenAt,
            _ => SyntaxKind::TokenWord,
        };
        self.emit(kind, c.len_utf8())
    }

    fn lex_command(&mut self) -> Token<'a> {
        let after = &self.rest()[1..];
        match after.chars().next() {
            None => self.emit(SyntaxKind::TokenWord, 1),
            Some(c) if c.is_ascii_alphabetic() => {
                let len = after
                    .find(|c: char| !c.is_ascii_alphabetic())
                    .unwrap_or(after.len());
                self.emit(SyntaxKind::TokenCommandSym, 1 + len)
            }
            Some(c) => self.emit(SyntaxKind::TokenCommandSym, 1 + c.len_utf8()),
        }
    }

    fn lex_entry(&mut self, c: char, depth: usize, close: char) -> Token<'a> {
        match c {
            '{' => {
                self.state = State::Entry {
                    depth: depth + 1,
                    close,
                };
                self.emit(SyntaxKind::TokenLBrace, 1)
            }
            '}' | ')' => {
                if depth == 1 && c == close {
                    self.state = State::Outside;
                } else if c == '}' {
                    self.state = State::Entry {
                        depth: depth.saturating_sub(1).max(1),
                        close,
                    };
                }
                self.lex_punctuation(c)
            }
            '\\' => self.lex_command(),
            c if is_entry_special(c) => self.lex_punctuation(c),
            _ => {
                let len = self.run_len(|c| c.is_whitespace() || is_entry_special(c));
                self.emit(SyntaxKind::TokenWord, len)
            }
        }
    }

    fn next_token(&mut self) -> Option<Token<'a>> {
        let c = self.rest().chars().next()?;
        if let Some(token) = self.lex_trivia(c) {
            return Some(token);
        }
        let token = match self.state {
            State::Outside => self.lex_outside(c),
            State::Header => self.lex_header(c),
            State::Entry { depth, close } => self.lex_entry(c, depth, close),
        };
        Some(token)
    }

    pub fn tokenize(self) -> TokenList<'a> {
        TokenList::from_vec(self.collect())
    }
}

impl<'a> Iterator for BibLexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}

pub fn tokenize_bibtex(input: &str) -> TokenList<'_> {
    BibLexer::new(input).tokenize()
}
