//! Description text normalisation.
//!
//! Comment lines are collected verbatim (minus the comment marker) and
//! normalised once when a description is finalised.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    /// Font switching commands whose argument is kept as plain text.
    static ref FORMATTING: Regex = Regex::new(
        r"\\(?:textsf|texttt|textit|textbf|textrm|textsc|textmd|textup|textsl|emph)\{([^{}]*)\}"
    )
    .expect("valid formatting regex");

    /// Citations carry no descriptive value; the preceding space goes with them.
    static ref CITE: Regex = Regex::new(r"\s*\\cite\*?(?:\[[^\]]*\])*\{[^{}]*\}")
        .expect("valid cite regex");

    /// `doc` package markup: `\cs{name}`, `\meta{x}`, `\marg{x}`, `\oarg{x}`, `\parg{x}`.
    static ref DOC_MARKUP: Regex = Regex::new(r"\\(cs|meta|marg|oarg|parg)\{([^{}]*)\}")
        .expect("valid doc markup regex");
}

/// Join collected description lines into one normalised string.
///
/// Each line is trimmed and the lines are joined by a single space, so line
/// breaks and indentation collapse while spacing inside a line is kept.
pub fn normalize_description<S: AsRef<str>>(lines: &[S]) -> String {
    let joined = lines
        .iter()
        .map(|line| line.as_ref().trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    let text = strip_verbatim_bars(&joined);
    let text = CITE.replace_all(&text, "");
    let text = FORMATTING.replace_all(&text, "$1");
    let text = DOC_MARKUP.replace_all(&text, |caps: &Captures| {
        let arg = &caps[2];
        match &caps[1] {
            "cs" => format!("\\{}", arg),
            "meta" => format!("<{}>", arg),
            "marg" => format!("{{{}}}", arg),
            "oarg" => format!("[{}]", arg),
            _ => format!("({})", arg),
        }
    });

    text.trim().to_string()
}

/// Remove the `|...|` short-verbatim markers used by the `doc` package.
///
/// The content between the bars is kept. Bars that delimit a `\verb`
/// argument are left alone, as is a bar without a closing partner.
pub fn strip_verbatim_bars(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(c) = rest.chars().next() {
        if let Some(after) = rest.strip_prefix("\\verb") {
            let (star, after) = match after.strip_prefix('*') {
                Some(after) => ("*", after),
                None => ("", after),
            };
            if let Some(delim) = after.chars().next().filter(|d| !d.is_alphabetic()) {
                let body = &after[delim.len_utf8()..];
                let end = body
                    .find(delim)
                    .map(|i| i + delim.len_utf8())
                    .unwrap_or(body.len());
                out.push_str("\\verb");
                out.push_str(star);
                out.push(delim);
                out.push_str(&body[..end]);
                rest = &body[end..];
                continue;
            }
            out.push_str("\\verb");
            out.push_str(star);
            rest = after;
            continue;
        }

        if c == '|' {
            if let Some(close) = rest[1..].find('|') {
                out.push_str(&rest[1..1 + close]);
                rest = &rest[close + 2..];
                continue;
            }
        }

        out.push(c);
        rest = &rest[c.len_utf8()..];
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_joined_with_single_space() {
        let lines = ["Here is the default value", "   used above.  "];
        assert_eq!(
            normalize_description(&lines),
            "Here is the default value used above."
        );
    }

    #[test]
    fn test_inner_spacing_preserved() {
        let lines = ["special index entry.  For example"];
        assert_eq!(
            normalize_description(&lines),
            "special index entry.  For example"
        );
    }

    #[test]
    fn test_bars_stripped() {
        assert_eq!(
            strip_verbatim_bars(r"the |\MacroTopsep| parameter"),
            r"the \MacroTopsep parameter"
        );
    }

    #[test]
    fn test_bars_inside_verb_kept() {
        assert_eq!(
            strip_verbatim_bars(r"use \verb|x| and |y|"),
            r"use \verb|x| and y"
        );
        assert_eq!(strip_verbatim_bars(r"\verb*+|a|+ |b|"), r"\verb*+|a|+ b");
    }

    #[test]
    fn test_unpaired_bar_kept() {
        assert_eq!(strip_verbatim_bars("a | b"), "a | b");
    }

    #[test]
    fn test_formatting_unwrapped() {
        let lines = [r"if \textsf{macro} and", r"\textsf{environment} environments"];
        assert_eq!(
            normalize_description(&lines),
            "if macro and environment environments"
        );
    }

    #[test]
    fn test_cite_removed_with_space() {
        let lines = [r"the \textsf{docstrip} system \cite{art:docstrip} are"];
        assert_eq!(normalize_description(&lines), "the docstrip system are");
    }

    #[test]
    fn test_doc_markup() {
        let lines = [r"\cs{foo} takes \marg{text} and \oarg{opt} or \meta{x}"];
        assert_eq!(
            normalize_description(&lines),
            r"\foo takes {text} and [opt] or <x>"
        );
    }

    #[test]
    fn test_latex_logo_untouched() {
        let lines = [r"that a \LaTeX{} environment"];
        assert_eq!(normalize_description(&lines), r"that a \LaTeX{} environment");
    }
}
