//! Structured Feedback Module
//!
//! Machine-readable output for callers of the pipeline:
//! - diagnostics with stage, severity, code and position
//! - an analysis report that serializes to JSON

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::{Error, Stage};

// ==================== Diagnostics ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single problem found by one of the stages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Stage that produced the diagnostic
    pub kind: Stage,
    pub severity: Severity,
    /// Stable code, e.g. "M001"
    pub code: String,
    /// Human-readable message
    pub message: String,
    /// 1-based position, 0 when the error has no location
    pub line: u32,
    pub column: u32,
    /// Suggested fix, if one is obvious
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl Diagnostic {
    /// Create a diagnostic from an analysis error.
    ///
    /// `stage` is used for errors that do not belong to a stage themselves.
    pub fn from_error(error: &Error, stage: Stage) -> Self {
        let (line, column) = error.span().map_or((0, 0), |s| (s.line, s.column));
        let severity = if error.is_warning() {
            Severity::Warning
        } else {
            Severity::Error
        };

        Self {
            kind: error.stage().unwrap_or(stage),
            severity,
            code: error.code().to_string(),
            message: error.to_string(),
            line,
            column,
            suggestion: suggest(error),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}[{}]", severity, self.code)?;
        if self.line > 0 {
            write!(f, " {}:{}", self.line, self.column)?;
        }
        write!(f, ": {}", self.message)?;
        if let Some(hint) = &self.suggestion {
            write!(f, " (hint: {})", hint)?;
        }
        Ok(())
    }
}

/// Suggested fix for the common mistakes
fn suggest(error: &Error) -> Option<String> {
    let hint = match error {
        Error::UnterminatedString { .. } => "add the closing '\"' on the same line".to_string(),
        Error::UnterminatedComment { .. } => "close the comment with '*/'".to_string(),
        Error::UnknownCharacter { ch: '&', .. } => "use '&&' for logical and".to_string(),
        Error::UnknownCharacter { ch: '|', .. } => "use '||' for logical or".to_string(),
        Error::MalformedNumber { .. } => "identifiers cannot start with a digit".to_string(),
        Error::ExpectedExpr { .. } => "insert a value or variable here".to_string(),
        Error::ExpressionTooLong { .. } => {
            "split the expression using intermediate variables".to_string()
        }
        Error::DuplicateDeclaration { name, .. } => {
            format!("rename the second '{}' or assign to it instead", name)
        }
        Error::UndefinedVariable { name, .. } => {
            format!("declare '{}' before using it", name)
        }
        Error::TypeMismatch { expected, got, .. } if expected == "int" && got == "float" => {
            "a float value cannot be stored in an int variable".to_string()
        }
        _ => return None,
    };
    Some(hint)
}

// ==================== Analysis Report ====================

/// Result of running the pipeline over one source text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// True when every stage that was requested passed
    pub success: bool,
    /// Last stage that ran
    pub stage: Option<Stage>,
    /// Stages that passed, in order
    pub passed: Vec<Stage>,
    /// Number of tokens, including the end-of-input token
    pub token_count: usize,
    /// All errors and warnings
    pub diagnostics: Vec<Diagnostic>,
    /// User-facing transcript, one entry per stage
    pub summary: Vec<String>,
}

impl AnalysisReport {
    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics.len() - self.error_count()
    }

    /// Render as plain text: transcript followed by diagnostics
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for entry in &self.summary {
            out.push_str(entry);
            out.push_str("\n\n");
        }
        for diag in &self.diagnostics {
            out.push_str(&diag.to_string());
            out.push('\n');
        }
        out
    }

    /// Output as JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Output as compact JSON (for programmatic use)
    pub fn to_json_compact(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::Span;

    #[test]
    fn test_from_error() {
        let error = Error::UndefinedVariable {
            name: "y".to_string(),
            span: Span::new(0, 1, 3, 4),
        };
        let diag = Diagnostic::from_error(&error, Stage::Semantic);

        assert_eq!(diag.kind, Stage::Semantic);
        assert_eq!(diag.code, "M003");
        assert_eq!((diag.line, diag.column), (3, 4));
        assert_eq!(
            diag.to_string(),
            "error[M003] 3:4: Use of undeclared variable 'y' (hint: declare 'y' before using it)"
        );
    }

    #[test]
    fn test_warning_severity() {
        let error = Error::UnterminatedComment { span: Span::dummy() };
        let diag = Diagnostic::from_error(&error, Stage::Lexical);
        assert_eq!(diag.severity, Severity::Warning);
        assert!(!diag.is_error());
    }

    #[test]
    fn test_report_json() {
        let report = AnalysisReport {
            success: false,
            stage: Some(Stage::Syntax),
            passed: vec![Stage::Lexical],
            token_count: 5,
            diagnostics: vec![Diagnostic::from_error(
                &Error::ExpectedExpr {
                    got: "punctuation ';'".to_string(),
                    span: Span::new(8, 9, 1, 9),
                },
                Stage::Syntax,
            )],
            summary: vec!["Syntax analysis FAILED!\nInvalid syntax.".to_string()],
        };

        let value: serde_json::Value = serde_json::from_str(&report.to_json_compact()).unwrap();
        assert_eq!(value["stage"], "syntax");
        assert_eq!(value["passed"][0], "lexical");
        assert_eq!(value["diagnostics"][0]["kind"], "syntax");
        assert_eq!(value["diagnostics"][0]["code"], "S002");
        assert_eq!(value["diagnostics"][0]["column"], 9);
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.warning_count(), 0);
    }
}
