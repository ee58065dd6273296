//! Syntax kinds and rowan integration.
//!
//! One enum covers both lexer tokens and parser nodes so that every element
//! of the rowan tree can be matched uniformly. Token kinds come first and end
//! at [`SyntaxKind::TokenError`]; everything after it is a composite node.

use serde::Serialize;

/// All token and node kinds of the LaTeX/BibTeX syntax tree.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum SyntaxKind {
    // === Tokens ===
    /// Spaces and tabs
    TokenWhiteSpace,
    /// A single line break (`\n`, `\r\n` or `\r`)
    TokenLineBreak,
    /// `%` up to (excluding) the end of the line
    TokenComment,
    /// A `%! parser = on|off` comment
    TokenDirective,
    /// A run of ordinary text characters
    TokenWord,
    /// `\name` or a control symbol like `\\`, `\%`
    TokenCommandSym,
    /// `\begin`
    TokenBeginEnv,
    /// `\end`
    TokenEndEnv,
    /// `{`
    TokenLBrace,
    /// `}`
    TokenRBrace,
    /// `[`
    TokenLBracket,
    /// `]`
    TokenRBracket,
    /// `$` or `\(` opening inline math
    TokenInlineMathStart,
    /// `$` or `\)` closing inline math
    TokenInlineMathEnd,
    /// `$$` or `\[` opening display math
    TokenDisplayMathStart,
    /// `$$` or `\]` closing display math
    TokenDisplayMathEnd,
    /// `&`
    TokenAmpersand,
    /// `#`
    TokenHash,
    /// `^`
    TokenCaret,
    /// `_`
    TokenUnderscore,
    /// `*`
    TokenAsterisk,
    /// `~`
    TokenTilde,
    /// Inline verbatim argument including its delimiters (`|x|` of `\verb|x|`)
    TokenVerbatim,
    /// Opaque text: verbatim environment bodies and parser-off regions
    TokenRawText,
    /// `@` (BibTeX)
    TokenAt,
    /// `,` (BibTeX)
    TokenComma,
    /// `=` (BibTeX)
    TokenEquals,
    /// `"` (BibTeX)
    TokenQuote,
    /// `(` (BibTeX)
    TokenLParen,
    /// `)` (BibTeX)
    TokenRParen,
    /// Reserved; the lexers never produce it
    TokenError,

    // === Nodes ===
    /// Document root
    ScopeRoot,
    /// Command invocation with its bound arguments
    ItemCmd,
    /// `{...}` bound as a required argument (or a single bare token)
    ItemRequiredArg,
    /// `[...]` bound as an optional argument
    ItemOptionalArg,
    /// Parameter text of a `\def`
    ItemParamText,
    /// A plain brace group
    ItemCurly,
    /// A text environment
    ItemEnv,
    /// A math environment (`equation`, `align`, ...)
    ItemMathEnv,
    /// `\begin{name}` with its environment arguments
    ItemBegin,
    /// `\end{name}`
    ItemEnd,
    /// `$...$` or `\(...\)`
    ItemInlineMath,
    /// `$$...$$` or `\[...\]`
    ItemDisplayMath,
    /// A matched pseudocode keyword block (`\If ... \EndIf`)
    ItemPseudocodeBlock,
    /// BibTeX entry (`@type{...}`)
    ItemBibEntry,
    /// BibTeX entry key
    ItemBibKey,
    /// BibTeX `name = value` field
    ItemBibField,
    /// BibTeX value (quoted, braced or bare, joined by `#`)
    ItemBibValue,
    /// Error recovery node
    ItemError,
}

impl SyntaxKind {
    /// Returns true if this kind is produced by a lexer.
    pub fn is_token(self) -> bool {
        (self as u16) <= (Self::TokenError as u16)
    }

    /// Returns true if this kind is a composite node.
    pub fn is_node(self) -> bool {
        !self.is_token()
    }

    /// Whitespace, line breaks and comments.
    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            Self::TokenWhiteSpace | Self::TokenLineBreak | Self::TokenComment | Self::TokenDirective
        )
    }

    /// Kinds that toggle math mode.
    pub fn is_math_delimiter(self) -> bool {
        matches!(
            self,
            Self::TokenInlineMathStart
                | Self::TokenInlineMathEnd
                | Self::TokenDisplayMathStart
                | Self::TokenDisplayMathEnd
        )
    }
}

impl From<SyntaxKind> for rowan::SyntaxKind {
    fn from(kind: SyntaxKind) -> Self {
        Self(kind as u16)
    }
}

/// Language marker for rowan trees produced by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LatexLanguage {}

impl rowan::Language for LatexLanguage {
    type Kind = SyntaxKind;

    fn kind_from_raw(raw: rowan::SyntaxKind) -> Self::Kind {
        assert!(raw.0 <= SyntaxKind::ItemError as u16);
        // SAFETY: bounds checked above; SyntaxKind is repr(u16) with contiguous variants.
        unsafe { std::mem::transmute::<u16, SyntaxKind>(raw.0) }
    }

    fn kind_to_raw(kind: Self::Kind) -> rowan::SyntaxKind {
        kind.into()
    }
}

pub type SyntaxNode = rowan::SyntaxNode<LatexLanguage>;
pub type SyntaxToken = rowan::SyntaxToken<LatexLanguage>;
pub type SyntaxElement = rowan::SyntaxElement<LatexLanguage>;

#[cfg(test)]
mod tests {
    use super::*;
    use rowan::Language;

    #[test]
    fn test_token_and_node_partition() {
        assert!(SyntaxKind::TokenWord.is_token());
        assert!(SyntaxKind::TokenError.is_token());
        assert!(SyntaxKind::ScopeRoot.is_node());
        assert!(SyntaxKind::ItemError.is_node());
    }

    #[test]
    fn test_trivia() {
        assert!(SyntaxKind::TokenComment.is_trivia());
        assert!(SyntaxKind::TokenLineBreak.is_trivia());
        assert!(!SyntaxKind::TokenWord.is_trivia());
    }

    #[test]
    fn test_raw_roundtrip() {
        for kind in [
            SyntaxKind::TokenWhiteSpace,
            SyntaxKind::TokenVerbatim,
            SyntaxKind::ItemCmd,
            SyntaxKind::ItemError,
        ] {
            let raw = LatexLanguage::kind_to_raw(kind);
            assert_eq!(LatexLanguage::kind_from_raw(raw), kind);
        }
    }
}
