//! Macro documentation extraction for documented LaTeX sources (`.dtx`).
//!
//! Documented sources interleave package code with comment lines that
//! describe the macros being defined:
//!
//! ```text
//! % \begin{macro}{\gram}
//! % The gram is an odd unit as it is needed for the base unit kilogram.
//! %    \begin{macrocode}
//! \DeclareSIUnit \gram { g }
//! %    \end{macrocode}
//! % \end{macro}
//! ```
//!
//! [`index_macro_docs`] scans such a file line by line and returns a mapping
//! from macro name (with its leading backslash) to a single normalised
//! description. Macros opened back to back before any description text share
//! one description value.

mod indexer;
mod normalize;

pub use indexer::{MacroDocIndexer, MacroDocs};
pub use normalize::{normalize_description, strip_verbatim_bars};

/// Index all macro descriptions found in the given documented source text.
pub fn index_macro_docs(text: &str) -> MacroDocs {
    MacroDocIndexer::new().index(text)
}
