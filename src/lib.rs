//! Prism
//!
//! Staged analysis of a small instructional language: lexical, syntax and
//! semantic validation with positioned diagnostics.

pub mod feedback;
pub mod frontend;
pub mod pipeline;
pub mod types;
pub mod utils;

pub use feedback::{AnalysisReport, Diagnostic, Severity};
pub use frontend::token::{Token, TokenCategory, TokenKind};
pub use pipeline::{
    analyze_semantics, analyze_syntax, check_semantics, check_syntax, is_valid_lexically,
    lex_diagnostics, tokenize, Options, Session, StageOutcome,
};
pub use types::Type;
pub use utils::{Error, Result, Span, Stage};
