//! Line-oriented scanner for `\begin{macro}` / `\DescribeMacro` documentation.

use std::sync::Arc;

use indexmap::IndexMap;
use lazy_static::lazy_static;
use regex::Regex;

use crate::normalize::normalize_description;

/// Macro name (including the leading backslash) to description.
///
/// Macros documented together share the same `Arc<str>` value.
pub type MacroDocs = IndexMap<String, Arc<str>>;

lazy_static! {
    static ref BEGIN_MACRO: Regex =
        Regex::new(r"^\\begin\{macro\}\s*\{\s*([^{}\s]+)\s*\}").expect("valid regex");
    static ref END_MACRO: Regex = Regex::new(r"^\\end\{macro\}").expect("valid regex");
    static ref BEGIN_MACROCODE: Regex =
        Regex::new(r"^\\begin\{macrocode\*?\}").expect("valid regex");
    static ref END_MACROCODE: Regex = Regex::new(r"^\\end\{macrocode\*?\}").expect("valid regex");
    static ref DESCRIBE_MACRO: Regex = Regex::new(
        r"^\\DescribeMacro\s*(?:\{\s*([^{}\s]+)\s*\}|(\\[A-Za-z@]+|\\[^A-Za-z@\s]))"
    )
    .expect("valid regex");
    static ref CHANGES: Regex = Regex::new(r"^\\changes\b").expect("valid regex");
    static ref STRUCTURAL: Regex = Regex::new(
        r"^\\(?:part|chapter|section|subsection|subsubsection|paragraph|subparagraph|DescribeEnv|begin|end)\b"
    )
    .expect("valid regex");
}

/// Names documented together, plus the description lines collected for them.
#[derive(Debug, Default)]
struct Group {
    names: Vec<String>,
    lines: Vec<String>,
}

impl Group {
    fn with_name(name: String) -> Self {
        Group {
            names: vec![name],
            lines: Vec::new(),
        }
    }

    fn has_text(&self) -> bool {
        !self.lines.is_empty()
    }
}

/// Single-pass macro documentation indexer.
///
/// The indexer keeps a stack of currently open `\begin{macro}` names and one
/// pending group of names waiting for their description. A `\DescribeMacro`
/// outside any macro scope opens its own group that ends at the next blank
/// comment line or structural marker.
#[derive(Debug, Default)]
pub struct MacroDocIndexer {
    stack: Vec<String>,
    group: Option<Group>,
    describe: Option<Group>,
    in_macrocode: bool,
    docs: MacroDocs,
}

impl MacroDocIndexer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan the whole text and return the collected descriptions.
    pub fn index(mut self, text: &str) -> MacroDocs {
        for line in text.lines() {
            self.scan_line(line);
        }
        self.finish()
    }

    /// Feed a single source line.
    pub fn scan_line(&mut self, line: &str) {
        let trimmed = line.trim_start();

        if self.in_macrocode {
            if let Some(body) = comment_body(trimmed) {
                if END_MACROCODE.is_match(body) {
                    self.in_macrocode = false;
                }
            }
            return;
        }

        let Some(mut body) = comment_body(trimmed) else {
            // Code outside macrocode does not end a macro scope; an empty
            // line still ends a \DescribeMacro paragraph.
            if trimmed.is_empty() {
                self.close_describe();
            }
            return;
        };

        if body.is_empty() {
            self.close_describe();
            return;
        }

        loop {
            if let Some(caps) = BEGIN_MACRO.captures(body) {
                self.open_macro(command_name(&caps[1]));
                body = body[caps[0].len()..].trim_start();
            } else if let Some(m) = END_MACRO.find(body) {
                self.close_macro();
                body = body[m.end()..].trim_start();
            } else if BEGIN_MACROCODE.is_match(body) {
                self.close_describe();
                self.close_group();
                self.in_macrocode = true;
                return;
            } else if END_MACROCODE.is_match(body) || CHANGES.is_match(body) {
                return;
            } else if let Some(caps) = DESCRIBE_MACRO.captures(body) {
                let name = caps
                    .get(1)
                    .or_else(|| caps.get(2))
                    .map(|m| command_name(m.as_str()))
                    .unwrap_or_default();
                self.describe_macro(name);
                body = body[caps[0].len()..].trim_start();
            } else if STRUCTURAL.is_match(body) && self.stack.is_empty() {
                self.close_describe();
                return;
            } else {
                break;
            }

            if body.is_empty() {
                return;
            }
        }

        self.push_text(body);
    }

    /// Finalise any open groups and return the mapping.
    pub fn finish(mut self) -> MacroDocs {
        self.close_group();
        self.close_describe();
        tracing::debug!(macros = self.docs.len(), "indexed macro documentation");
        self.docs
    }

    fn open_macro(&mut self, name: String) {
        self.close_describe();
        match self.group.as_mut() {
            Some(group) if !group.has_text() => group.names.push(name.clone()),
            _ => {
                self.close_group();
                self.group = Some(Group::with_name(name.clone()));
            }
        }
        tracing::trace!(%name, depth = self.stack.len() + 1, "open macro scope");
        self.stack.push(name);
    }

    fn close_macro(&mut self) {
        // Unmatched \end{macro} is tolerated.
        if self.stack.pop().is_some() {
            self.close_group();
        }
    }

    fn describe_macro(&mut self, name: String) {
        if name.is_empty() || !self.stack.is_empty() {
            return;
        }
        match self.describe.as_mut() {
            Some(group) if !group.has_text() => group.names.push(name),
            _ => {
                self.close_describe();
                self.describe = Some(Group::with_name(name));
            }
        }
    }

    fn push_text(&mut self, text: &str) {
        if !self.stack.is_empty() {
            if let Some(group) = self.group.as_mut() {
                group.lines.push(text.to_string());
            }
        } else if let Some(group) = self.describe.as_mut() {
            group.lines.push(text.to_string());
        }
    }

    fn close_group(&mut self) {
        if let Some(group) = self.group.take() {
            self.record(group);
        }
    }

    fn close_describe(&mut self) {
        if let Some(group) = self.describe.take() {
            self.record(group);
        }
    }

    fn record(&mut self, group: Group) {
        let description = normalize_description(&group.lines);
        if description.is_empty() {
            return;
        }
        let shared: Arc<str> = Arc::from(description);
        for name in group.names {
            // Internal macros (containing `@`) are not part of a package's interface.
            if name.contains('@') {
                continue;
            }
            self.docs.insert(name, Arc::clone(&shared));
        }
    }
}

/// Strip the leading comment markers and indentation from a comment line.
fn comment_body(line: &str) -> Option<&str> {
    line.strip_prefix('%')
        .map(|rest| rest.trim_start_matches('%').trim())
}

fn command_name(raw: &str) -> String {
    if raw.starts_with('\\') {
        raw.to_string()
    } else {
        format!("\\{}", raw)
    }
}
