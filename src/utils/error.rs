//! Error handling for Prism

use crate::utils::Span;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// One of the three analysis stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Lexical,
    Syntax,
    Semantic,
}

impl Stage {
    /// The stage that must have passed before this one may run
    pub fn previous(self) -> Option<Stage> {
        match self {
            Stage::Lexical => None,
            Stage::Syntax => Some(Stage::Lexical),
            Stage::Semantic => Some(Stage::Syntax),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Lexical => write!(f, "lexical"),
            Stage::Syntax => write!(f, "syntax"),
            Stage::Semantic => write!(f, "semantic"),
        }
    }
}

/// Analysis error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    // ==================== Lexical Errors ====================

    #[error("Unknown character '{ch}'")]
    UnknownCharacter { ch: char, span: Span },

    #[error("Unterminated string literal {lexeme}")]
    UnterminatedString { lexeme: String, span: Span },

    #[error("Malformed number literal '{lexeme}'")]
    MalformedNumber { lexeme: String, span: Span },

    #[error("Unterminated block comment")]
    UnterminatedComment { span: Span },

    // ==================== Syntax Errors ====================

    #[error("Unexpected token: expected {expected}, got {got}")]
    UnexpectedToken {
        expected: String,
        got: String,
        span: Span,
    },

    #[error("Expected expression, got {got}")]
    ExpectedExpr { got: String, span: Span },

    #[error("Expected identifier, got {got}")]
    ExpectedIdent { got: String, span: Span },

    #[error("Trailing input: unexpected {got} after end of program")]
    TrailingInput { got: String, span: Span },

    #[error("Nesting deeper than {limit} levels")]
    NestingTooDeep { limit: usize, span: Span },

    #[error("Expression has more than {limit} operators")]
    ExpressionTooLong { limit: usize, span: Span },

    // ==================== Semantic Errors ====================

    #[error("Duplicate declaration: '{name}' is already declared in this scope (at {previous})")]
    DuplicateDeclaration {
        name: String,
        previous: Span,
        span: Span,
    },

    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch {
        expected: String,
        got: String,
        span: Span,
    },

    #[error("Use of undeclared variable '{name}'")]
    UndefinedVariable { name: String, span: Span },

    // ==================== Pipeline Errors ====================

    #[error("{stage} analysis requires {requires} analysis to pass first")]
    StageOrder { stage: Stage, requires: Stage },

    #[error("Source text is empty")]
    EmptySource,
}

impl Error {
    /// Get the span associated with this error
    pub fn span(&self) -> Option<Span> {
        match self {
            Self::UnknownCharacter { span, .. } => Some(*span),
            Self::UnterminatedString { span, .. } => Some(*span),
            Self::MalformedNumber { span, .. } => Some(*span),
            Self::UnterminatedComment { span } => Some(*span),
            Self::UnexpectedToken { span, .. } => Some(*span),
            Self::ExpectedExpr { span, .. } => Some(*span),
            Self::ExpectedIdent { span, .. } => Some(*span),
            Self::TrailingInput { span, .. } => Some(*span),
            Self::NestingTooDeep { span, .. } => Some(*span),
            Self::ExpressionTooLong { span, .. } => Some(*span),
            Self::DuplicateDeclaration { span, .. } => Some(*span),
            Self::TypeMismatch { span, .. } => Some(*span),
            Self::UndefinedVariable { span, .. } => Some(*span),
            Self::StageOrder { .. } | Self::EmptySource => None,
        }
    }

    /// The analysis stage that produced this error, if any
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::UnknownCharacter { .. }
            | Self::UnterminatedString { .. }
            | Self::MalformedNumber { .. }
            | Self::UnterminatedComment { .. } => Some(Stage::Lexical),
            Self::UnexpectedToken { .. }
            | Self::ExpectedExpr { .. }
            | Self::ExpectedIdent { .. }
            | Self::TrailingInput { .. }
            | Self::NestingTooDeep { .. }
            | Self::ExpressionTooLong { .. } => Some(Stage::Syntax),
            Self::DuplicateDeclaration { .. }
            | Self::TypeMismatch { .. }
            | Self::UndefinedVariable { .. } => Some(Stage::Semantic),
            Self::StageOrder { .. } | Self::EmptySource => None,
        }
    }

    /// Stable diagnostic code
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownCharacter { .. } => "L001",
            Self::UnterminatedString { .. } => "L002",
            Self::MalformedNumber { .. } => "L003",
            Self::UnterminatedComment { .. } => "L004",
            Self::UnexpectedToken { .. } => "S001",
            Self::ExpectedExpr { .. } => "S002",
            Self::ExpectedIdent { .. } => "S003",
            Self::TrailingInput { .. } => "S004",
            Self::NestingTooDeep { .. } => "S005",
            Self::ExpressionTooLong { .. } => "S006",
            Self::DuplicateDeclaration { .. } => "M001",
            Self::TypeMismatch { .. } => "M002",
            Self::UndefinedVariable { .. } => "M003",
            Self::StageOrder { .. } => "P001",
            Self::EmptySource => "P002",
        }
    }

    /// Warnings are reported but never fail a stage
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::UnterminatedComment { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_mapping() {
        let span = Span::dummy();
        let dup = Error::DuplicateDeclaration {
            name: "x".to_string(),
            previous: span,
            span,
        };
        assert_eq!(dup.stage(), Some(Stage::Semantic));
        assert_eq!(dup.code(), "M001");
        assert_eq!(Error::UnknownCharacter { ch: '#', span }.stage(), Some(Stage::Lexical));
        assert_eq!(Error::EmptySource.stage(), None);
        assert!(Error::UnterminatedComment { span }.is_warning());
        let long = Error::ExpressionTooLong { limit: 1024, span };
        assert_eq!((long.stage(), long.code()), (Some(Stage::Syntax), "S006"));
    }

    #[test]
    fn test_stage_order_message() {
        let err = Error::StageOrder {
            stage: Stage::Semantic,
            requires: Stage::Syntax,
        };
        assert_eq!(
            err.to_string(),
            "semantic analysis requires syntax analysis to pass first"
        );
        assert_eq!(Stage::Semantic.previous(), Some(Stage::Syntax));
        assert_eq!(Stage::Lexical.previous(), None);
    }
}
