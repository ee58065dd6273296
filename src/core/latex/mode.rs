//! Lexer modes.
//!
//! Modes are kept as an explicit stack of frames. Each frame remembers the
//! brace depth it was opened at, so closing a group drops every frame opened
//! inside it. That is what lets `\text{ $b$ }` inside `$...$` return to the
//! outer math mode, and what keeps a stray `$` inside a group from leaking
//! math mode past the closing brace.

use serde::Serialize;

/// What closes a math frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum MathDelimiter {
    /// `$ ... $`
    Dollar,
    /// `$$ ... $$`
    DoubleDollar,
    /// `\( ... \)`
    Paren,
    /// `\[ ... \]`
    Bracket,
    /// `\begin{name} ... \end{name}`
    Environment(String),
}

impl MathDelimiter {
    pub fn is_display(&self) -> bool {
        !matches!(self, MathDelimiter::Dollar | MathDelimiter::Paren)
    }
}

/// The active lexer mode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize)]
pub enum LexerMode {
    #[default]
    Normal,
    Math(MathDelimiter),
    /// Raw text until the given terminator (e.g. `\end{verbatim}`)
    Verbatim(String),
    /// Between `%! parser = off` and `%! parser = on`
    Disabled,
}

impl LexerMode {
    pub fn is_math(&self) -> bool {
        matches!(self, LexerMode::Math(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ModeFrame {
    mode: LexerMode,
    depth: usize,
}

static NORMAL: LexerMode = LexerMode::Normal;

/// Stack of mode frames; an empty stack means [`LexerMode::Normal`].
#[derive(Debug, Clone, Default)]
pub struct ModeStack {
    frames: Vec<ModeFrame>,
}

impl ModeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> &LexerMode {
        self.frames.last().map(|f| &f.mode).unwrap_or(&NORMAL)
    }

    pub fn is_math(&self) -> bool {
        self.current().is_math()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn push(&mut self, mode: LexerMode, depth: usize) {
        self.frames.push(ModeFrame { mode, depth });
    }

    pub fn pop(&mut self) -> Option<LexerMode> {
        self.frames.pop().map(|f| f.mode)
    }

    /// Pop the top frame if it is math closed by `delimiter`.
    pub fn close_math(&mut self, delimiter: &MathDelimiter) -> bool {
        match self.current() {
            LexerMode::Math(open) if open == delimiter => {
                self.frames.pop();
                true
            }
            _ => false,
        }
    }

    /// Pop frames down to and including the math environment `name`.
    ///
    /// Nothing is popped if no such environment is open.
    pub fn close_environment(&mut self, name: &str) -> bool {
        let Some(index) = self.frames.iter().rposition(|f| {
            matches!(&f.mode, LexerMode::Math(MathDelimiter::Environment(n)) if n == name)
        }) else {
            return false;
        };
        self.frames.truncate(index);
        true
    }

    /// A group at `depth` was closed: drop every frame opened inside it.
    pub fn close_group(&mut self, depth: usize) {
        while self.frames.last().is_some_and(|f| f.depth >= depth) {
            self.frames.pop();
        }
    }
}
