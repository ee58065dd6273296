//! Parse options.
//!
//! Everything the lexer and parser can be told about a document beyond the
//! builtin tables: extra verbatim and math environments, tabular-like
//! environments, text commands, and extra command signatures. Options can be
//! built in code or loaded from TOML (feature `config`):
//!
//! ```toml
//! verbatim_environments = ["myverb"]
//! math_environments = ["mymath"]
//! text_commands = ["\\mytext"]
//!
//! [preamble_environments]
//! mytab = 0
//!
//! [commands."\\foo"]
//! required = 2
//! optional = 1
//! ```

use indexmap::IndexMap;
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::core::latex::commands::{
    builtin_preamble_position, is_builtin_math_environment, is_builtin_text_command,
    is_builtin_verbatim_environment, CommandTable,
};

lazy_static! {
    static ref DEFAULT_OPTIONS: ParseOptions = ParseOptions::default();
}

/// Argument counts of a configured command or environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ArityConfig {
    pub required: u8,
    pub optional: u8,
}

/// Options shared by the lexer and the parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Environments whose body is raw text, in addition to the builtin ones.
    pub verbatim_environments: Vec<String>,
    /// Environments whose body is math, in addition to the builtin ones.
    pub math_environments: Vec<String>,
    /// Tabular-like environments and the number of required arguments that
    /// precede the column preamble.
    pub preamble_environments: IndexMap<String, usize>,
    /// Commands (with backslash) whose argument is text even inside math.
    pub text_commands: Vec<String>,
    /// Extra command signatures, keyed by name with backslash.
    pub commands: IndexMap<String, ArityConfig>,
    /// Extra environment signatures, keyed by name.
    pub environments: IndexMap<String, ArityConfig>,
    /// How many tokens the parser consumes between cancellation checks.
    pub cancel_check_interval: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            verbatim_environments: Vec::new(),
            math_environments: Vec::new(),
            preamble_environments: IndexMap::new(),
            text_commands: Vec::new(),
            commands: IndexMap::new(),
            environments: IndexMap::new(),
            cancel_check_interval: 256,
        }
    }
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// A shared instance of the default options.
    pub fn shared_default() -> &'static ParseOptions {
        &DEFAULT_OPTIONS
    }

    pub fn is_verbatim_environment(&self, name: &str) -> bool {
        is_builtin_verbatim_environment(name) || self.verbatim_environments.iter().any(|e| e == name)
    }

    pub fn is_math_environment(&self, name: &str) -> bool {
        is_builtin_math_environment(name) || self.math_environments.iter().any(|e| e == name)
    }

    pub fn is_text_command(&self, name: &str) -> bool {
        is_builtin_text_command(name) || self.text_commands.iter().any(|c| c == name)
    }

    /// Number of width arguments before the column preamble, if `name` is a
    /// tabular-like environment.
    pub fn preamble_position(&self, name: &str) -> Option<usize> {
        self.preamble_environments
            .get(name)
            .copied()
            .or_else(|| builtin_preamble_position(name))
    }

    /// A command table seeded with the configured signatures.
    pub fn command_table(&self) -> CommandTable {
        let mut table = CommandTable::new();
        for (name, arity) in &self.commands {
            table.register(name.clone(), arity.required, arity.optional);
        }
        for (name, arity) in &self.environments {
            table.register_environment(name.clone(), arity.required, arity.optional);
        }
        table
    }

    /// Load options from a TOML document.
    #[cfg(feature = "config")]
    pub fn from_toml_str(source: &str) -> Result<Self, crate::utils::error::ConfigError> {
        let options: ParseOptions = toml::from_str(source)?;
        if options.cancel_check_interval == 0 {
            return Err(crate::utils::error::ConfigError::Invalid(
                "cancel_check_interval must be positive".into(),
            ));
        }
        tracing::debug!(
            commands = options.commands.len(),
            environments = options.environments.len(),
            "loaded parse options"
        );
        Ok(options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::latex::commands::CommandArityProvider;

    #[test]
    fn test_builtin_fallbacks() {
        let options = ParseOptions::default();
        assert!(options.is_verbatim_environment("verbatim"));
        assert!(!options.is_verbatim_environment("myverb"));
        assert!(options.is_math_environment("align"));
        assert!(options.is_text_command("\\text"));
        assert_eq!(options.preamble_position("tabular"), Some(0));
        assert_eq!(options.preamble_position("itemize"), None);
    }

    #[test]
    fn test_extra_entries() {
        let mut options = ParseOptions::default();
        options.verbatim_environments.push("myverb".into());
        options.preamble_environments.insert("mytab".into(), 1);
        options.commands.insert(
            "\\foo".into(),
            ArityConfig {
                required: 2,
                optional: 1,
            },
        );
        assert!(options.is_verbatim_environment("myverb"));
        assert_eq!(options.preamble_position("mytab"), Some(1));
        let table = options.command_table();
        assert_eq!(table.lookup("\\foo").map(|a| a.args().len()), Some(3));
    }

    #[cfg(feature = "config")]
    #[test]
    fn test_from_toml() {
        let options = ParseOptions::from_toml_str(
            r#"
verbatim_environments = ["myverb"]
text_commands = ["\\mytext"]

[preamble_environments]
mytab = 0

[commands."\\foo"]
required = 2
"#,
        )
        .unwrap();
        assert!(options.is_verbatim_environment("myverb"));
        assert!(options.is_text_command("\\mytext"));
        assert_eq!(options.commands["\\foo"].required, 2);
        assert_eq!(options.commands["\\foo"].optional, 0);
        assert_eq!(options.cancel_check_interval, 256);
    }

    #[cfg(feature = "config")]
    #[test]
    fn test_from_toml_rejects_zero_interval() {
        assert!(ParseOptions::from_toml_str("cancel_check_interval = 0").is_err());
    }
}
