//! latexkit CLI - inspect LaTeX, BibTeX and documented sources

#[cfg(feature = "cli")]
use anyhow::{Context, Result};
#[cfg(feature = "cli")]
use clap::{Parser, Subcommand, ValueEnum};
#[cfg(feature = "cli")]
use latexkit::{
    core::latex::{parse_with_discovery, tokenize_with},
    detect_dialect, index_macro_docs, parse_bibtex, tokenize_bibtex,
    utils::diagnostics::{check_parse, format_diagnostics, LineIndex},
    utils::latex_analysis::{collect_labels, duplicate_labels},
    Dialect, Parse, ParseOptions, TokenList,
};
#[cfg(feature = "cli")]
use std::fs;
#[cfg(feature = "cli")]
use std::io::{self, Read};
#[cfg(feature = "cli")]
use std::path::{Path, PathBuf};
#[cfg(feature = "cli")]
use tracing_subscriber::EnvFilter;

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "latexkit")]
#[command(version)]
#[command(about = "latexkit - error-tolerant LaTeX/BibTeX lexer, parser and macro indexer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML file with parse options (extra environments and command arities)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override dialect detection
    #[arg(long, value_enum, global = true)]
    dialect: Option<DialectArg>,

    /// More logging (-v debug, -vv trace); LATEXKIT_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum Commands {
    /// Print the token stream
    Tokens {
        /// Input file (reads from stdin if not provided)
        input: Option<PathBuf>,

        /// Emit JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the syntax tree
    Tree {
        /// Input file (reads from stdin if not provided)
        input: Option<PathBuf>,

        /// Emit JSON
        #[arg(long)]
        json: bool,
    },

    /// Report parse errors and duplicate labels; exits with 1 on errors
    Check {
        /// Input file (reads from stdin if not provided)
        input: Option<PathBuf>,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },

    /// Print documented macros of a .dtx file as JSON
    Macros {
        /// Input file (reads from stdin if not provided)
        input: Option<PathBuf>,
    },

    /// List label definitions and duplicates
    Labels {
        /// Input file (reads from stdin if not provided)
        input: Option<PathBuf>,

        /// Emit JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the detected dialect
    Detect {
        /// Input file (reads from stdin if not provided)
        input: Option<PathBuf>,
    },
}

#[cfg(feature = "cli")]
#[derive(Clone, Copy, ValueEnum)]
enum DialectArg {
    Latex,
    Bibtex,
    Dtx,
}

#[cfg(feature = "cli")]
impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Latex => Dialect::Latex,
            DialectArg::Bibtex => Dialect::Bibtex,
            DialectArg::Dtx => Dialect::DocumentedSource,
        }
    }
}

#[cfg(feature = "cli")]
struct Input {
    path: Option<PathBuf>,
    content: String,
}

#[cfg(feature = "cli")]
impl Input {
    fn read(path: Option<PathBuf>) -> Result<Self> {
        let content = match &path {
            Some(path) => fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?,
            None => {
                let mut buffer = String::new();
                io::stdin()
                    .read_to_string(&mut buffer)
                    .context("failed to read stdin")?;
                buffer
            }
        };
        Ok(Input { path, content })
    }

    /// Explicit flag, then a known extension, then content sniffing.
    fn dialect(&self, explicit: Option<DialectArg>) -> Dialect {
        if let Some(arg) = explicit {
            return arg.into();
        }
        let known = self
            .path
            .as_deref()
            .and_then(Path::extension)
            .and_then(|e| e.to_str())
            .is_some_and(|e| {
                matches!(
                    e.to_ascii_lowercase().as_str(),
                    "tex" | "sty" | "cls" | "ltx" | "bib" | "dtx" | "ins"
                )
            });
        match &self.path {
            Some(path) if known => Dialect::from_path(path),
            _ => detect_dialect(&self.content),
        }
    }
}

#[cfg(feature = "cli")]
fn init_logging(verbose: u8) {
    let fallback = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_env("LATEXKIT_LOG").unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

#[cfg(feature = "cli")]
fn load_options(path: Option<&Path>) -> Result<ParseOptions> {
    let Some(path) = path else {
        return Ok(ParseOptions::default());
    };
    let source = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    ParseOptions::from_toml_str(&source)
        .with_context(|| format!("invalid config {}", path.display()))
}

#[cfg(feature = "cli")]
fn parse_input(input: &Input, dialect: Dialect, options: &ParseOptions) -> Result<Parse> {
    let parse = match dialect {
        Dialect::Bibtex => parse_bibtex(&input.content)?,
        Dialect::Latex | Dialect::DocumentedSource => {
            let mut table = options.command_table();
            parse_with_discovery(&input.content, &mut table, options)?
        }
    };
    Ok(parse)
}

#[cfg(feature = "cli")]
fn print_tokens(tokens: &TokenList<'_>, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(tokens.as_slice())?);
        return Ok(());
    }
    for token in tokens {
        let span = token.span();
        println!(
            "{:?}\t{}..{}\t{:?}",
            token.kind,
            span.start,
            span.end(),
            token.text
        );
    }
    Ok(())
}

#[cfg(feature = "cli")]
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let options = load_options(cli.config.as_deref())?;

    match cli.command {
        Commands::Tokens { input, json } => {
            let input = Input::read(input)?;
            let tokens = match input.dialect(cli.dialect) {
                Dialect::Bibtex => tokenize_bibtex(&input.content),
                Dialect::Latex | Dialect::DocumentedSource => {
                    tokenize_with(&input.content, &options)
                }
            };
            print_tokens(&tokens, json)?;
        }

        Commands::Tree { input, json } => {
            let input = Input::read(input)?;
            let parse = parse_input(&input, input.dialect(cli.dialect), &options)?;
            if json {
                let output = serde_json::json!({
                    "tree": parse.to_json(),
                    "errors": parse.errors(),
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                print!("{}", parse.debug_tree());
                for error in parse.errors() {
                    eprintln!("error at {}: {}", error.span.start, error.message);
                }
            }
        }

        Commands::Check { input, no_color } => {
            let input = Input::read(input)?;
            let parse = parse_input(&input, input.dialect(cli.dialect), &options)?;
            let result = check_parse(&input.content, &parse);
            println!("{}", format_diagnostics(&result, !no_color));

            if result.has_errors() {
                std::process::exit(1);
            }
        }

        Commands::Macros { input } => {
            let input = Input::read(input)?;
            let docs = index_macro_docs(&input.content);
            println!("{}", serde_json::to_string_pretty(&docs)?);
        }

        Commands::Labels { input, json } => {
            let input = Input::read(input)?;
            let parse = parse_input(&input, input.dialect(cli.dialect), &options)?;
            let root = parse.syntax();
            let labels = collect_labels(&root);
            let duplicates = duplicate_labels(&root);
            if json {
                let output = serde_json::json!({
                    "labels": labels,
                    "duplicates": duplicates,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                let index = LineIndex::new(&input.content);
                for label in &labels {
                    let (line, column) = index.line_col(&input.content, label.span.start);
                    println!("{}:{}\t{}\t{}", line, column, label.command, label.name);
                }
                for duplicate in &duplicates {
                    println!(
                        "duplicate label `{}` ({} definitions)",
                        duplicate.name,
                        duplicate.spans.len()
                    );
                }
            }
        }

        Commands::Detect { input } => {
            let input = Input::read(input)?;
            println!("{}", input.dialect(cli.dialect));
        }
    }

    Ok(())
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Build with --features cli");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  cargo install latexkit --features cli");
    eprintln!("  latexkit <COMMAND> [INPUT_FILE]");
}
