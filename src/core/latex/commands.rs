//! Command and environment argument signatures.
//!
//! The parser asks a [`CommandArityProvider`] how many arguments a command
//! takes and in which order. Two providers exist: the [`StaticBuiltin`] table
//! of well-known LaTeX commands, and the [`UserDefined`] table that grows as
//! `\newcommand`-like definitions are discovered. [`CommandTable`] layers the
//! latter over the former.

use std::borrow::Cow;

use fxhash::FxHashMap;
use phf::{phf_map, phf_set};
use serde::{Deserialize, Serialize};

/// One argument slot of a command signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Arg {
    /// `{...}` (or a single control sequence)
    Required,
    /// `[...]`, only bound when it immediately follows
    Optional,
    /// TeX parameter text, everything up to the next `{` (as in `\def\x#1#2{`)
    ParameterText,
}

/// The ordered argument signature of a command or environment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommandArity {
    args: Cow<'static, [Arg]>,
}

impl CommandArity {
    pub const fn from_static(args: &'static [Arg]) -> Self {
        CommandArity {
            args: Cow::Borrowed(args),
        }
    }

    /// `\newcommand` shape: `optional` optional arguments followed by
    /// `required` required ones.
    pub fn new(required: u8, optional: u8) -> Self {
        let args = std::iter::repeat(Arg::Optional)
            .take(optional as usize)
            .chain(std::iter::repeat(Arg::Required).take(required as usize))
            .collect::<Vec<_>>();
        CommandArity {
            args: Cow::Owned(args),
        }
    }

    pub fn from_args(args: Vec<Arg>) -> Self {
        CommandArity {
            args: Cow::Owned(args),
        }
    }

    pub fn args(&self) -> &[Arg] {
        &self.args
    }

    pub fn required(&self) -> usize {
        self.args.iter().filter(|a| **a == Arg::Required).count()
    }

    pub fn optional(&self) -> usize {
        self.args.iter().filter(|a| **a == Arg::Optional).count()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }
}

/// Source of argument signatures, queried by exact name.
///
/// Command names include the leading backslash; environment names do not.
pub trait CommandArityProvider {
    fn lookup(&self, name: &str) -> Option<&CommandArity>;

    fn lookup_environment(&self, _name: &str) -> Option<&CommandArity> {
        None
    }
}

const R: Arg = Arg::Required;
const O: Arg = Arg::Optional;
const P: Arg = Arg::ParameterText;

const NONE: CommandArity = CommandArity::from_static(&[]);
const REQ1: CommandArity = CommandArity::from_static(&[R]);
const REQ2: CommandArity = CommandArity::from_static(&[R, R]);
const REQ3: CommandArity = CommandArity::from_static(&[R, R, R]);
const REQ4: CommandArity = CommandArity::from_static(&[R, R, R, R]);
const OPT1: CommandArity = CommandArity::from_static(&[O]);
const OPT_REQ: CommandArity = CommandArity::from_static(&[O, R]);
const OPT_REQ2: CommandArity = CommandArity::from_static(&[O, R, R]);
const OPT2_REQ: CommandArity = CommandArity::from_static(&[O, O, R]);
const REQ_OPT: CommandArity = CommandArity::from_static(&[R, O]);
const REQ_OPT_REQ: CommandArity = CommandArity::from_static(&[R, O, R]);
const NEWCOMMAND: CommandArity = CommandArity::from_static(&[R, O, O, R]);
const NEWENVIRONMENT: CommandArity = CommandArity::from_static(&[R, O, O, R, R]);
const DEF: CommandArity = CommandArity::from_static(&[R, P, R]);

static BUILTIN_COMMANDS: phf::Map<&'static str, CommandArity> = phf_map! {
    // Document structure
    "\\documentclass" => OPT_REQ,
    "\\usepackage" => OPT_REQ,
    "\\RequirePackage" => OPT_REQ,
    "\\input" => REQ1,
    "\\include" => REQ1,
    "\\includeonly" => REQ1,
    "\\subfile" => REQ1,
    "\\title" => OPT_REQ,
    "\\author" => OPT_REQ,
    "\\date" => REQ1,
    "\\thanks" => REQ1,
    "\\part" => OPT_REQ,
    "\\chapter" => OPT_REQ,
    "\\section" => OPT_REQ,
    "\\subsection" => OPT_REQ,
    "\\subsubsection" => OPT_REQ,
    "\\paragraph" => OPT_REQ,
    "\\subparagraph" => OPT_REQ,
    "\\caption" => OPT_REQ,
    "\\footnote" => OPT_REQ,
    "\\item" => OPT1,

    // References and citations
    "\\label" => REQ1,
    "\\ref" => REQ1,
    "\\eqref" => REQ1,
    "\\pageref" => REQ1,
    "\\autoref" => REQ1,
    "\\nameref" => REQ1,
    "\\cref" => REQ1,
    "\\Cref" => REQ1,
    "\\url" => REQ1,
    "\\href" => OPT_REQ2,
    "\\cite" => OPT2_REQ,
    "\\citep" => OPT2_REQ,
    "\\citet" => OPT2_REQ,
    "\\parencite" => OPT2_REQ,
    "\\textcite" => OPT2_REQ,
    "\\nocite" => REQ1,
    "\\bibitem" => OPT_REQ,
    "\\bibliography" => REQ1,
    "\\bibliographystyle" => REQ1,
    "\\addbibresource" => OPT_REQ,

    // Text formatting
    "\\text" => REQ1,
    "\\textbf" => REQ1,
    "\\textit" => REQ1,
    "\\texttt" => REQ1,
    "\\textsf" => REQ1,
    "\\textrm" => REQ1,
    "\\textsc" => REQ1,
    "\\textsl" => REQ1,
    "\\textup" => REQ1,
    "\\textmd" => REQ1,
    "\\textnormal" => REQ1,
    "\\emph" => REQ1,
    "\\underline" => REQ1,
    "\\mbox" => REQ1,
    "\\fbox" => REQ1,
    "\\makebox" => OPT2_REQ,
    "\\framebox" => OPT2_REQ,
    "\\parbox" => CommandArity::from_static(&[O, O, O, R, R]),
    "\\raisebox" => CommandArity::from_static(&[R, O, O, R]),
    "\\textcolor" => OPT_REQ2,
    "\\color" => OPT_REQ,
    "\\colorbox" => OPT_REQ2,
    "\\hspace" => REQ1,
    "\\vspace" => REQ1,
    "\\includegraphics" => OPT_REQ,
    "\\intertext" => REQ1,
    "\\c" => REQ1,
    "\\v" => REQ1,
    "\\u" => REQ1,
    "\\H" => REQ1,

    // Math
    "\\frac" => REQ2,
    "\\dfrac" => REQ2,
    "\\tfrac" => REQ2,
    "\\binom" => REQ2,
    "\\dbinom" => REQ2,
    "\\tbinom" => REQ2,
    "\\sqrt" => OPT_REQ,
    "\\overline" => REQ1,
    "\\overbrace" => REQ1,
    "\\underbrace" => REQ1,
    "\\hat" => REQ1,
    "\\widehat" => REQ1,
    "\\bar" => REQ1,
    "\\vec" => REQ1,
    "\\tilde" => REQ1,
    "\\widetilde" => REQ1,
    "\\dot" => REQ1,
    "\\ddot" => REQ1,
    "\\mathbf" => REQ1,
    "\\mathrm" => REQ1,
    "\\mathit" => REQ1,
    "\\mathsf" => REQ1,
    "\\mathtt" => REQ1,
    "\\mathcal" => REQ1,
    "\\mathbb" => REQ1,
    "\\mathfrak" => REQ1,
    "\\boldsymbol" => REQ1,
    "\\operatorname" => REQ1,
    "\\overset" => REQ2,
    "\\underset" => REQ2,
    "\\stackrel" => REQ2,

    // Counters and lengths
    "\\setlength" => REQ2,
    "\\addtolength" => REQ2,
    "\\setcounter" => REQ2,
    "\\addtocounter" => REQ2,
    "\\newcounter" => REQ_OPT,
    "\\newlength" => REQ1,

    // Definitions
    "\\newcommand" => NEWCOMMAND,
    "\\renewcommand" => NEWCOMMAND,
    "\\providecommand" => NEWCOMMAND,
    "\\DeclareRobustCommand" => NEWCOMMAND,
    "\\newenvironment" => NEWENVIRONMENT,
    "\\renewenvironment" => NEWENVIRONMENT,
    "\\def" => DEF,
    "\\gdef" => DEF,
    "\\edef" => DEF,
    "\\xdef" => DEF,
    "\\let" => REQ2,
    "\\newif" => REQ1,
    "\\DeclareMathOperator" => REQ2,
    "\\NewDocumentCommand" => REQ3,
    "\\RenewDocumentCommand" => REQ3,
    "\\ProvideDocumentCommand" => REQ3,
    "\\DeclareDocumentCommand" => REQ3,
    "\\NewDocumentEnvironment" => REQ4,
    "\\RenewDocumentEnvironment" => REQ4,
    "\\newcolumntype" => REQ_OPT_REQ,
    "\\newtheorem" => CommandArity::from_static(&[R, O, R, O]),

    // Verbatim
    "\\verb" => NONE,
    "\\verb*" => NONE,
    "\\lstinline" => OPT1,

    // Pseudocode (algpseudocode)
    "\\State" => NONE,
    "\\Statex" => NONE,
    "\\Require" => NONE,
    "\\Ensure" => NONE,
    "\\Return" => NONE,
    "\\If" => REQ1,
    "\\ElsIf" => REQ1,
    "\\Else" => NONE,
    "\\EndIf" => NONE,
    "\\For" => REQ1,
    "\\ForAll" => REQ1,
    "\\EndFor" => NONE,
    "\\While" => REQ1,
    "\\EndWhile" => NONE,
    "\\Repeat" => NONE,
    "\\Until" => REQ1,
    "\\Loop" => NONE,
    "\\EndLoop" => NONE,
    "\\Procedure" => REQ2,
    "\\EndProcedure" => NONE,
    "\\Function" => REQ2,
    "\\EndFunction" => NONE,
};

static BUILTIN_ENVIRONMENTS: phf::Map<&'static str, CommandArity> = phf_map! {
    "document" => NONE,
    "itemize" => OPT1,
    "enumerate" => OPT1,
    "description" => OPT1,
    "figure" => OPT1,
    "figure*" => OPT1,
    "table" => OPT1,
    "table*" => OPT1,
    "tabular" => OPT_REQ,
    "tabular*" => REQ_OPT_REQ,
    "tabularx" => REQ_OPT_REQ,
    "tabulary" => REQ_OPT_REQ,
    "array" => OPT_REQ,
    "longtable" => OPT_REQ,
    "minipage" => CommandArity::from_static(&[O, O, O, R]),
    "multicols" => REQ_OPT,
    "thebibliography" => REQ1,
    "alignat" => REQ1,
    "alignat*" => REQ1,
    "lstlisting" => OPT1,
    "minted" => OPT_REQ,
    "algorithm" => OPT1,
    "algorithmic" => OPT1,
    "tikzpicture" => OPT1,
};

/// Commands whose arguments hold definition bodies.
static DEFINITION_COMMANDS: phf::Set<&'static str> = phf_set! {
    "\\newcommand",
    "\\renewcommand",
    "\\providecommand",
    "\\DeclareRobustCommand",
    "\\newenvironment",
    "\\renewenvironment",
    "\\def",
    "\\gdef",
    "\\edef",
    "\\xdef",
    "\\NewDocumentCommand",
    "\\RenewDocumentCommand",
    "\\ProvideDocumentCommand",
    "\\DeclareDocumentCommand",
    "\\NewDocumentEnvironment",
    "\\RenewDocumentEnvironment",
    "\\newcolumntype",
};

/// Pseudocode block openers and the keyword that closes each.
static PSEUDOCODE_BLOCKS: phf::Map<&'static str, &'static str> = phf_map! {
    "\\If" => "\\EndIf",
    "\\For" => "\\EndFor",
    "\\ForAll" => "\\EndFor",
    "\\While" => "\\EndWhile",
    "\\Repeat" => "\\Until",
    "\\Loop" => "\\EndLoop",
    "\\Procedure" => "\\EndProcedure",
    "\\Function" => "\\EndFunction",
};

/// Commands whose argument is typeset in text mode even inside math.
static TEXT_COMMANDS: phf::Set<&'static str> = phf_set! {
    "\\text",
    "\\textrm",
    "\\textbf",
    "\\textit",
    "\\textsf",
    "\\texttt",
    "\\textsl",
    "\\textsc",
    "\\textup",
    "\\textmd",
    "\\textnormal",
    "\\emph",
    "\\mbox",
    "\\hbox",
    "\\fbox",
    "\\intertext",
    "\\shortintertext",
    "\\tag",
};

static MATH_ENVIRONMENTS: phf::Set<&'static str> = phf_set! {
    "equation", "equation*",
    "align", "align*",
    "alignat", "alignat*",
    "flalign", "flalign*",
    "gather", "gather*",
    "multline", "multline*",
    "eqnarray", "eqnarray*",
    "displaymath",
    "math",
    "dmath", "dmath*",
};

static VERBATIM_ENVIRONMENTS: phf::Set<&'static str> = phf_set! {
    "verbatim", "verbatim*",
    "Verbatim", "Verbatim*",
    "BVerbatim", "LVerbatim",
    "lstlisting",
    "minted",
    "comment",
    "luacode", "luacode*",
    "pycode",
    "filecontents", "filecontents*",
};

/// Tabular-like environments, with the number of required arguments that
/// precede the column preamble.
static PREAMBLE_ENVIRONMENTS: phf::Map<&'static str, usize> = phf_map! {
    "tabular" => 0usize,
    "array" => 0usize,
    "longtable" => 0usize,
    "supertabular" => 0usize,
    "xtabular" => 0usize,
    "NiceTabular" => 0usize,
    "NiceArray" => 0usize,
    "tabular*" => 1usize,
    "tabularx" => 1usize,
    "tabulary" => 1usize,
};

pub fn is_definition_command(name: &str) -> bool {
    DEFINITION_COMMANDS.contains(name)
}

/// The keyword closing the pseudocode block opened by `name`, if any.
pub fn pseudocode_block_end(name: &str) -> Option<&'static str> {
    PSEUDOCODE_BLOCKS.get(name).copied()
}

pub fn is_builtin_text_command(name: &str) -> bool {
    TEXT_COMMANDS.contains(name)
}

pub fn is_builtin_math_environment(name: &str) -> bool {
    MATH_ENVIRONMENTS.contains(name)
}

pub fn is_builtin_verbatim_environment(name: &str) -> bool {
    VERBATIM_ENVIRONMENTS.contains(name)
}

pub fn builtin_preamble_position(name: &str) -> Option<usize> {
    PREAMBLE_ENVIRONMENTS.get(name).copied()
}

/// The static table of well-known LaTeX commands and environments.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticBuiltin;

impl CommandArityProvider for StaticBuiltin {
    fn lookup(&self, name: &str) -> Option<&CommandArity> {
        BUILTIN_COMMANDS.get(name)
    }

    fn lookup_environment(&self, name: &str) -> Option<&CommandArity> {
        BUILTIN_ENVIRONMENTS.get(name)
    }
}

/// Commands and environments registered at runtime.
#[derive(Debug, Clone, Default)]
pub struct UserDefined {
    commands: FxHashMap<String, CommandArity>,
    environments: FxHashMap<String, CommandArity>,
}

impl UserDefined {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command. Returns true if this changed the table.
    pub fn register(&mut self, name: impl Into<String>, required: u8, optional: u8) -> bool {
        self.register_arity(name, CommandArity::new(required, optional))
    }

    pub fn register_arity(&mut self, name: impl Into<String>, arity: CommandArity) -> bool {
        let name = name.into();
        if self.commands.get(&name) == Some(&arity) {
            return false;
        }
        tracing::trace!(%name, args = arity.args().len(), "register command");
        self.commands.insert(name, arity);
        true
    }

    pub fn register_environment(
        &mut self,
        name: impl Into<String>,
        required: u8,
        optional: u8,
    ) -> bool {
        self.register_environment_arity(name, CommandArity::new(required, optional))
    }

    pub fn register_environment_arity(
        &mut self,
        name: impl Into<String>,
        arity: CommandArity,
    ) -> bool {
        let name = name.into();
        if self.environments.get(&name) == Some(&arity) {
            return false;
        }
        tracing::trace!(%name, args = arity.args().len(), "register environment");
        self.environments.insert(name, arity);
        true
    }

    pub fn len(&self) -> usize {
        self.commands.len() + self.environments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty() && self.environments.is_empty()
    }
}

impl CommandArityProvider for UserDefined {
    fn lookup(&self, name: &str) -> Option<&CommandArity> {
        self.commands.get(name)
    }

    fn lookup_environment(&self, name: &str) -> Option<&CommandArity> {
        self.environments.get(name)
    }
}

/// User-defined signatures layered over the builtin table.
///
/// A table is owned by one parse (or by the host, which then synchronises
/// access); it holds no global state.
#[derive(Debug, Clone, Default)]
pub struct CommandTable {
    builtin: StaticBuiltin,
    user: UserDefined,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// `register(name, requiredArgCount, optionalArgCount)`.
    pub fn register(&mut self, name: impl Into<String>, required: u8, optional: u8) -> bool {
        self.user.register(name, required, optional)
    }

    pub fn register_arity(&mut self, name: impl Into<String>, arity: CommandArity) -> bool {
        self.user.register_arity(name, arity)
    }

    pub fn register_environment(
        &mut self,
        name: impl Into<String>,
        required: u8,
        optional: u8,
    ) -> bool {
        self.user.register_environment(name, required, optional)
    }

    pub fn register_environment_arity(
        &mut self,
        name: impl Into<String>,
        arity: CommandArity,
    ) -> bool {
        self.user.register_environment_arity(name, arity)
    }

    pub fn user_defined(&self) -> &UserDefined {
        &self.user
    }
}

impl CommandArityProvider for CommandTable {
    fn lookup(&self, name: &str) -> Option<&CommandArity> {
        self.user.lookup(name).or_else(|| self.builtin.lookup(name))
    }

    fn lookup_environment(&self, name: &str) -> Option<&CommandArity> {
        self.user
            .lookup_environment(name)
            .or_else(|| self.builtin.lookup_environment(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        let frac = StaticBuiltin.lookup("\\frac").unwrap();
        assert_eq!(frac.required(), 2);
        assert_eq!(frac.optional(), 0);
        assert_eq!(StaticBuiltin.lookup("\\sqrt").unwrap().args(), &[Arg::Optional, Arg::Required]);
        assert!(StaticBuiltin.lookup("\\mycommand").is_none());
    }

    #[test]
    fn test_newcommand_order() {
        let arity = CommandArity::new(2, 1);
        assert_eq!(arity.args(), &[Arg::Optional, Arg::Required, Arg::Required]);
    }

    #[test]
    fn test_user_defined_overrides_builtin() {
        let mut table = CommandTable::new();
        assert!(table.lookup("\\mycommand").is_none());
        assert!(table.register("\\mycommand", 1, 0));
        assert!(!table.register("\\mycommand", 1, 0));
        assert_eq!(table.lookup("\\mycommand").unwrap().required(), 1);

        table.register("\\frac", 3, 0);
        assert_eq!(table.lookup("\\frac").unwrap().required(), 3);
    }

    #[test]
    fn test_environment_lookup() {
        let mut table = CommandTable::new();
        assert_eq!(
            table.lookup_environment("tabular").unwrap().args(),
            &[Arg::Optional, Arg::Required]
        );
        table.register_environment("myenv", 2, 0);
        assert_eq!(table.lookup_environment("myenv").unwrap().required(), 2);
    }

    #[test]
    fn test_static_sets() {
        assert!(is_definition_command("\\newcommand"));
        assert!(!is_definition_command("\\frac"));
        assert_eq!(pseudocode_block_end("\\Repeat"), Some("\\Until"));
        assert!(is_builtin_verbatim_environment("lstlisting"));
        assert!(is_builtin_math_environment("align*"));
        assert_eq!(builtin_preamble_position("tabularx"), Some(1));
    }
}
