//! Prism command line
//!
//! Runs the analysis stages over a source file and prints the transcript.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process;

use prism::{AnalysisReport, Options, Session, Stage, Token, TokenCategory};

/// Prism analyzer
#[derive(Parser, Debug)]
#[command(name = "prismc")]
#[command(author = "Z1529")]
#[command(version)]
#[command(about = "Prism - staged validation for a small instructional language")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Raise the log level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run all three stages
    Check {
        /// Input source file, or '-' for stdin
        input: PathBuf,

        /// Disable implicit int to float widening
        #[arg(long)]
        strict: bool,

        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Print the token stream
    Tokens {
        /// Input source file, or '-' for stdin
        input: PathBuf,

        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Run the lexical stage only
    Lex {
        /// Input source file, or '-' for stdin
        input: PathBuf,

        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Run the lexical and syntax stages
    Syntax {
        /// Input source file, or '-' for stdin
        input: PathBuf,

        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Print version information
    Version,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() {
    let cli = Cli::parse();
    init_logger(cli.verbose);
    process::exit(execute(&cli));
}

/// Run the command line, mapping failures to exit code 2
fn execute(cli: &Cli) -> i32 {
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            2
        }
    }
}

fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

/// Dispatch a subcommand, returning the process exit code
fn run(cli: &Cli) -> Result<i32> {
    match &cli.command {
        Commands::Check { input, strict, format } => {
            analyze(input, Stage::Semantic, Options { strict: *strict }, *format)
        }
        Commands::Lex { input, format } => {
            analyze(input, Stage::Lexical, Options::default(), *format)
        }
        Commands::Syntax { input, format } => {
            analyze(input, Stage::Syntax, Options::default(), *format)
        }
        Commands::Tokens { input, format } => dump_tokens(input, *format),
        Commands::Version => {
            println!("prismc {}", env!("CARGO_PKG_VERSION"));
            println!("Prism staged analyzer");
            println!("License: Apache-2.0");
            Ok(0)
        }
    }
}

fn read_source(input: &Path) -> Result<String> {
    if input == Path::new("-") {
        let mut source = String::new();
        io::stdin()
            .read_to_string(&mut source)
            .context("failed to read source from stdin")?;
        return Ok(source);
    }
    fs::read_to_string(input).with_context(|| format!("failed to read {}", input.display()))
}

/// Run the stages up to `target` and print the report
fn analyze(input: &Path, target: Stage, options: Options, format: Format) -> Result<i32> {
    let source = read_source(input)?;
    log::info!("analyzing {} ({} bytes)", input.display(), source.len());

    let mut session = Session::new(source).with_options(options);
    let report = session.run_until(target)?;

    print!("{}", render(&report, format));
    Ok(if report.success { 0 } else { 1 })
}

fn render(report: &AnalysisReport, format: Format) -> String {
    match format {
        Format::Text => report.to_text(),
        Format::Json => format!("{}\n", report.to_json()),
    }
}

#[derive(Serialize)]
struct TokenRow<'a> {
    category: TokenCategory,
    lexeme: &'a str,
    line: u32,
    column: u32,
}

impl<'a> From<&'a Token> for TokenRow<'a> {
    fn from(token: &'a Token) -> Self {
        Self {
            category: token.category(),
            lexeme: &token.lexeme,
            line: token.span.line,
            column: token.span.column,
        }
    }
}

/// Print every token with its category and position
fn dump_tokens(input: &Path, format: Format) -> Result<i32> {
    let source = read_source(input)?;
    let tokens = prism::tokenize(&source);
    let rows: Vec<TokenRow> = tokens.iter().map(TokenRow::from).collect();

    match format {
        Format::Text => {
            for row in &rows {
                let category = row.category.to_string();
                println!("{:>4}:{:<4} {:<16} {}", row.line, row.column, category, row.lexeme);
            }
        }
        Format::Json => {
            let json = serde_json::to_string_pretty(&rows).context("failed to serialize tokens")?;
            println!("{}", json);
        }
    }

    Ok(if prism::is_valid_lexically(&tokens) { 0 } else { 1 })
}
