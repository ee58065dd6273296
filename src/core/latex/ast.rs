//! Typed views over the syntax tree.

use rowan::ast::AstNode;
use rowan::NodeOrToken;

use super::syntax::{LatexLanguage, SyntaxElement, SyntaxKind, SyntaxNode, SyntaxToken};

macro_rules! ast_node {
    ($(#[$meta:meta])* $name:ident, $($kind:ident)|+) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name {
            syntax: SyntaxNode,
        }

        impl AstNode for $name {
            type Language = LatexLanguage;

            fn can_cast(kind: SyntaxKind) -> bool {
                matches!(kind, $(SyntaxKind::$kind)|+)
            }

            fn cast(node: SyntaxNode) -> Option<Self> {
                Self::can_cast(node.kind()).then(|| $name { syntax: node })
            }

            fn syntax(&self) -> &SyntaxNode {
                &self.syntax
            }
        }
    };
}

ast_node!(
    /// A command with its bound arguments.
    CmdItem,
    ItemCmd
);
ast_node!(
    /// A required or optional argument.
    ArgItem,
    ItemRequiredArg | ItemOptionalArg
);
ast_node!(
    /// A text or math environment.
    EnvItem,
    ItemEnv | ItemMathEnv
);
ast_node!(
    /// Inline or display math delimited by `$`, `$$`, `\(` or `\[`.
    MathItem,
    ItemInlineMath | ItemDisplayMath
);

fn element_text(element: &SyntaxElement) -> String {
    match element {
        NodeOrToken::Node(node) => node.text().to_string(),
        NodeOrToken::Token(token) => token.text().to_string(),
    }
}

impl CmdItem {
    /// The command token, e.g. `\section`.
    pub fn name(&self) -> Option<SyntaxToken> {
        self.syntax.first_token().filter(|t| {
            matches!(
                t.kind(),
                SyntaxKind::TokenCommandSym | SyntaxKind::TokenBeginEnv | SyntaxKind::TokenEndEnv
            )
        })
    }

    pub fn name_text(&self) -> Option<String> {
        self.name().map(|t| t.text().to_string())
    }

    pub fn is_starred(&self) -> bool {
        self.syntax
            .children_with_tokens()
            .nth(1)
            .is_some_and(|e| e.kind() == SyntaxKind::TokenAsterisk)
    }

    pub fn arguments(&self) -> impl Iterator<Item = ArgItem> {
        self.syntax.children().filter_map(ArgItem::cast)
    }

    pub fn required_args(&self) -> impl Iterator<Item = ArgItem> {
        self.arguments().filter(|a| !a.is_optional())
    }

    pub fn optional_args(&self) -> impl Iterator<Item = ArgItem> {
        self.arguments().filter(ArgItem::is_optional)
    }

    /// Trimmed text of the `n`th required argument.
    pub fn required_arg_text(&self, n: usize) -> Option<String> {
        self.required_args()
            .nth(n)
            .map(|arg| arg.content_text().trim().to_string())
    }

    /// The `\verb`-style delimited argument, if any.
    pub fn verbatim(&self) -> Option<SyntaxToken> {
        self.syntax
            .children_with_tokens()
            .filter_map(NodeOrToken::into_token)
            .find(|t| t.kind() == SyntaxKind::TokenVerbatim)
    }
}

impl ArgItem {
    pub fn is_optional(&self) -> bool {
        self.syntax.kind() == SyntaxKind::ItemOptionalArg
    }

    /// Source text without the enclosing brackets or braces.
    pub fn content_text(&self) -> String {
        let elements: Vec<SyntaxElement> = self.syntax.children_with_tokens().collect();
        let mut slice = elements.as_slice();
        if let Some((first, rest)) = slice.split_first() {
            if matches!(
                first.kind(),
                SyntaxKind::TokenLBrace | SyntaxKind::TokenLBracket
            ) {
                slice = rest;
                if let Some((last, rest)) = slice.split_last() {
                    if matches!(
                        last.kind(),
                        SyntaxKind::TokenRBrace | SyntaxKind::TokenRBracket
                    ) {
                        slice = rest;
                    }
                }
            }
        }
        slice.iter().map(element_text).collect()
    }
}

impl EnvItem {
    pub fn begin(&self) -> Option<SyntaxNode> {
        self.syntax
            .children()
            .find(|n| n.kind() == SyntaxKind::ItemBegin)
    }

    pub fn end(&self) -> Option<SyntaxNode> {
        self.syntax
            .children()
            .find(|n| n.kind() == SyntaxKind::ItemEnd)
    }

    /// Environment name from `\begin{name}`.
    pub fn name(&self) -> Option<String> {
        self.begin()?
            .children()
            .find_map(ArgItem::cast)
            .map(|arg| arg.content_text().trim().to_string())
    }

    pub fn is_math(&self) -> bool {
        self.syntax.kind() == SyntaxKind::ItemMathEnv
    }

    /// Arguments after the environment name, e.g. the column spec of `tabular`.
    pub fn arguments(&self) -> impl Iterator<Item = ArgItem> {
        self.begin()
            .into_iter()
            .flat_map(|begin| begin.children().filter_map(ArgItem::cast).skip(1))
    }

    pub fn is_terminated(&self) -> bool {
        self.end().is_some()
    }
}

impl MathItem {
    pub fn is_display(&self) -> bool {
        self.syntax.kind() == SyntaxKind::ItemDisplayMath
    }

    /// True when both delimiters are present.
    pub fn is_closed(&self) -> bool {
        let closing = if self.is_display() {
            SyntaxKind::TokenDisplayMathEnd
        } else {
            SyntaxKind::TokenInlineMathEnd
        };
        self.syntax
            .last_token()
            .is_some_and(|t| t.kind() == closing && t.parent().as_ref() == Some(&self.syntax))
    }
}
