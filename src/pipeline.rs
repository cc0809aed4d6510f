//! Analysis pipeline
//!
//! The stateless stage functions (`tokenize`, `is_valid_lexically`,
//! `analyze_syntax`, `analyze_semantics`) and `Session`, which owns one
//! source text and threads its tokens and AST through the stages in order.

use log::{debug, info};

use crate::feedback::{AnalysisReport, Diagnostic};
use crate::frontend::ast::Program;
use crate::frontend::lexer::Lexer;
use crate::frontend::semantic::check_program;
use crate::frontend::token::Token;
use crate::utils::{Error, Result, Stage};

pub use crate::frontend::lexer::is_valid_lexically;
pub use crate::frontend::parser::{analyze_syntax, check_syntax};

const LEXICAL_OK: &str = "Lexical Analysis Completed.";
const LEXICAL_FAILED: &str = "Lexical analysis FAILED!\nUnknown tokens found.";
const SYNTAX_OK: &str = "Syntax Analysis Completed.";
const SYNTAX_FAILED: &str = "Syntax analysis FAILED!\nInvalid syntax.";
const SEMANTIC_OK: &str =
    "Semantic Analysis Completed.\n\nALL ANALYSES PASSED! COMPILATION SUCCESSFUL!";
const SEMANTIC_FAILED: &str = "Semantic analysis FAILED!\nType mismatch or duplicate var.";

// ==================== Stage functions ====================

/// Split source text into tokens. Never fails.
pub fn tokenize(source: &str) -> Vec<Token> {
    Lexer::new(source).tokenize()
}

/// Tokenize and return the lexical diagnostics alongside the tokens
pub fn lex_diagnostics(source: &str) -> (Vec<Token>, Vec<Diagnostic>) {
    let mut lexer = Lexer::new(source);
    let tokens = lexer.tokenize();
    let diagnostics = lexer
        .into_diagnostics()
        .iter()
        .map(|e| Diagnostic::from_error(e, Stage::Lexical))
        .collect();
    (tokens, diagnostics)
}

/// True iff the token sequence is a semantically sound program
pub fn analyze_semantics(tokens: &[Token]) -> bool {
    match check_syntax(tokens) {
        Ok(program) => check_program(&program, false).is_empty(),
        Err(_) => false,
    }
}

/// Semantic diagnostics for a token sequence.
///
/// A sequence that does not parse yields its single syntax diagnostic.
pub fn check_semantics(tokens: &[Token], strict: bool) -> Vec<Diagnostic> {
    match check_syntax(tokens) {
        Ok(program) => check_program(&program, strict)
            .iter()
            .map(|e| Diagnostic::from_error(e, Stage::Semantic))
            .collect(),
        Err(err) => vec![Diagnostic::from_error(&err, Stage::Syntax)],
    }
}

// ==================== Session ====================

/// Analysis options chosen by the caller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Options {
    /// Disable implicit int -> float widening
    pub strict: bool,
}

/// Result of running one stage
#[derive(Debug, Clone)]
pub struct StageOutcome {
    pub stage: Stage,
    pub passed: bool,
    pub diagnostics: Vec<Diagnostic>,
    pub summary: String,
}

/// One source text and its progress through the pipeline.
///
/// A stage may only run once the previous stage has passed. Re-running a
/// stage discards the results of every later stage.
#[derive(Debug, Default)]
pub struct Session {
    source: String,
    options: Options,
    tokens: Option<Vec<Token>>,
    program: Option<Program>,
    passed: Vec<Stage>,
    diagnostics: Vec<Diagnostic>,
    summary: Vec<(Stage, String)>,
    last: Option<(Stage, bool)>,
}

impl Session {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Self::default()
        }
    }

    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// Replace the source text and reset all progress
    pub fn load(&mut self, source: impl Into<String>) {
        self.source = source.into();
        self.reset();
    }

    /// Drop the source text and all progress
    pub fn clear(&mut self) {
        self.source.clear();
        self.reset();
    }

    fn reset(&mut self) {
        self.tokens = None;
        self.program = None;
        self.passed.clear();
        self.diagnostics.clear();
        self.summary.clear();
        self.last = None;
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Tokens from the last lexical run (empty before it)
    pub fn tokens(&self) -> &[Token] {
        self.tokens.as_deref().unwrap_or(&[])
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn has_passed(&self, stage: Stage) -> bool {
        self.passed.contains(&stage)
    }

    /// Whether `stage` may run now
    pub fn can_run(&self, stage: Stage) -> bool {
        match stage.previous() {
            None => !self.source.trim().is_empty(),
            Some(previous) => self.has_passed(previous),
        }
    }

    fn begin(&mut self, stage: Stage) -> Result<()> {
        if !self.can_run(stage) {
            return Err(match stage.previous() {
                None => Error::EmptySource,
                Some(requires) => Error::StageOrder { stage, requires },
            });
        }

        info!("running {} analysis", stage);
        self.passed.retain(|s| *s < stage);
        self.diagnostics.retain(|d| d.kind < stage);
        self.summary.retain(|(s, _)| *s < stage);
        Ok(())
    }

    fn finish(
        &mut self,
        stage: Stage,
        diagnostics: Vec<Diagnostic>,
        summary: String,
    ) -> StageOutcome {
        let passed = !diagnostics.iter().any(Diagnostic::is_error);
        debug!(
            "{} analysis {} with {} diagnostics",
            stage,
            if passed { "passed" } else { "failed" },
            diagnostics.len()
        );

        if passed {
            self.passed.push(stage);
        }
        self.diagnostics.extend(diagnostics.iter().cloned());
        self.summary.push((stage, summary.clone()));
        self.last = Some((stage, passed));

        StageOutcome {
            stage,
            passed,
            diagnostics,
            summary,
        }
    }

    /// Tokenize the source
    pub fn run_lexical(&mut self) -> Result<StageOutcome> {
        self.begin(Stage::Lexical)?;
        self.program = None;

        let (tokens, diagnostics) = lex_diagnostics(&self.source);
        let summary = if is_valid_lexically(&tokens) {
            format!("{}\nTokens: {}", LEXICAL_OK, tokens.len())
        } else {
            LEXICAL_FAILED.to_string()
        };
        self.tokens = Some(tokens);

        Ok(self.finish(Stage::Lexical, diagnostics, summary))
    }

    /// Parse the tokens from the lexical stage
    pub fn run_syntax(&mut self) -> Result<StageOutcome> {
        self.begin(Stage::Syntax)?;

        let (program, diagnostics) = match check_syntax(self.tokens()) {
            Ok(program) => (Some(program), Vec::new()),
            Err(err) => (None, vec![Diagnostic::from_error(&err, Stage::Syntax)]),
        };
        let summary = if program.is_some() { SYNTAX_OK } else { SYNTAX_FAILED };
        self.program = program;

        Ok(self.finish(Stage::Syntax, diagnostics, summary.to_string()))
    }

    /// Check the program built by the syntax stage
    pub fn run_semantic(&mut self) -> Result<StageOutcome> {
        self.begin(Stage::Semantic)?;

        let errors = match &self.program {
            Some(program) => check_program(program, self.options.strict),
            None => Vec::new(),
        };
        let summary = if errors.is_empty() { SEMANTIC_OK } else { SEMANTIC_FAILED };
        let diagnostics = errors
            .iter()
            .map(|e| Diagnostic::from_error(e, Stage::Semantic))
            .collect();

        Ok(self.finish(Stage::Semantic, diagnostics, summary.to_string()))
    }

    pub fn run(&mut self, stage: Stage) -> Result<StageOutcome> {
        match stage {
            Stage::Lexical => self.run_lexical(),
            Stage::Syntax => self.run_syntax(),
            Stage::Semantic => self.run_semantic(),
        }
    }

    /// Run every stage up to and including `target`, stopping at the first
    /// stage that fails
    pub fn run_until(&mut self, target: Stage) -> Result<AnalysisReport> {
        for stage in [Stage::Lexical, Stage::Syntax, Stage::Semantic] {
            if stage > target {
                break;
            }
            if !self.run(stage)?.passed {
                break;
            }
        }
        Ok(self.report())
    }

    /// Run all three stages
    pub fn run_all(&mut self) -> Result<AnalysisReport> {
        self.run_until(Stage::Semantic)
    }

    /// Snapshot of the current progress
    pub fn report(&self) -> AnalysisReport {
        AnalysisReport {
            success: self.last.map_or(false, |(_, passed)| passed),
            stage: self.last.map(|(stage, _)| stage),
            passed: self.passed.clone(),
            token_count: self.tokens().len(),
            diagnostics: self.diagnostics.clone(),
            summary: self.summary.iter().map(|(_, s)| s.clone()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::parser::MAX_OPERATORS;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_valid_declaration() {
        let tokens = tokenize("int x = 5;");
        assert_eq!(tokens.len(), 6);
        assert!(is_valid_lexically(&tokens));
        assert!(analyze_syntax(&tokens));
        assert!(analyze_semantics(&tokens));
    }

    #[test]
    fn test_duplicate_declaration() {
        let tokens = tokenize("int x = 5; int x = 6;");
        assert!(is_valid_lexically(&tokens));
        assert!(analyze_syntax(&tokens));
        assert!(!analyze_semantics(&tokens));

        let diags = check_semantics(&tokens, false);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, "M001");
        assert_eq!((diags[0].line, diags[0].column), (1, 16));
    }

    #[test]
    fn test_type_mismatch() {
        let tokens = tokenize("int x = \"hello\";");
        assert!(is_valid_lexically(&tokens));
        assert!(analyze_syntax(&tokens));
        assert!(!analyze_semantics(&tokens));
        assert_eq!(check_semantics(&tokens, false)[0].code, "M002");
    }

    #[test]
    fn test_missing_expression() {
        let tokens = tokenize("int x = ;");
        assert!(is_valid_lexically(&tokens));
        assert!(!analyze_syntax(&tokens));
        assert!(!analyze_semantics(&tokens));
        assert_eq!(check_semantics(&tokens, false)[0].kind, Stage::Syntax);
    }

    #[test]
    fn test_empty_source() {
        let tokens = tokenize("");
        assert_eq!(tokens.len(), 1);
        assert!(is_valid_lexically(&tokens));
        assert!(analyze_syntax(&tokens));
        assert!(analyze_semantics(&tokens));
    }

    #[test]
    fn test_long_operator_chain() {
        let tokens = tokenize(&format!("int x = 1{};", " + 1".repeat(250)));
        assert!(analyze_syntax(&tokens));
        assert!(analyze_semantics(&tokens));

        let nested = format!(
            "int y = 0; {}y = y{};{}",
            "while (true) {".repeat(60),
            " * 2 - 1".repeat(200),
            "}".repeat(60)
        );
        assert!(analyze_semantics(&tokenize(&nested)));

        let limit = format!("float f = 1.5{};", " / 2".repeat(MAX_OPERATORS));
        assert!(analyze_semantics(&tokenize(&limit)));
    }

    #[test]
    fn test_scopes_do_not_clash() {
        assert!(analyze_semantics(&tokenize("{ int x = 1; } int x = 2;")));
    }

    #[test]
    fn test_unknown_lexeme() {
        let (tokens, diags) = lex_diagnostics("x # y");
        assert!(!is_valid_lexically(&tokens));
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, "L001");
        assert_eq!((diags[0].line, diags[0].column), (1, 3));
    }

    #[test]
    fn test_session_runs_all_stages() {
        let mut session = Session::new("int x = 5;\nfloat y = x * 2.5;\nprint(y);");
        let report = session.run_all().unwrap();

        assert!(report.success);
        assert_eq!(report.stage, Some(Stage::Semantic));
        assert_eq!(report.passed, vec![Stage::Lexical, Stage::Syntax, Stage::Semantic]);
        assert_eq!(report.token_count, 18);
        assert!(report.diagnostics.is_empty());
        assert_eq!(
            report.summary,
            vec![
                "Lexical Analysis Completed.\nTokens: 18".to_string(),
                SYNTAX_OK.to_string(),
                SEMANTIC_OK.to_string(),
            ]
        );
    }

    #[test]
    fn test_session_stops_at_first_failure() {
        let mut session = Session::new("int x = 5 $;");
        let report = session.run_all().unwrap();

        assert!(!report.success);
        assert_eq!(report.stage, Some(Stage::Lexical));
        assert!(report.passed.is_empty());
        assert_eq!(report.summary, vec![LEXICAL_FAILED.to_string()]);
        assert!(!session.can_run(Stage::Syntax));
    }

    #[test]
    fn test_session_enforces_order() {
        let mut session = Session::new("int x = 5;");

        let err = session.run_semantic().unwrap_err();
        assert_eq!(
            err,
            Error::StageOrder {
                stage: Stage::Semantic,
                requires: Stage::Syntax,
            }
        );
        assert!(session.run_syntax().is_err());

        assert!(session.run_lexical().unwrap().passed);
        assert!(session.run_semantic().is_err());
        assert!(session.run_syntax().unwrap().passed);
        assert!(session.run_semantic().unwrap().passed);
    }

    #[test]
    fn test_session_refuses_blank_source() {
        let mut session = Session::new("   \n\t");
        assert_eq!(session.run_lexical().unwrap_err(), Error::EmptySource);
        assert!(!session.can_run(Stage::Lexical));
    }

    #[test]
    fn test_rerunning_lexical_resets_later_stages() {
        let mut session = Session::new("int x = 1;");
        session.run_all().unwrap();
        assert!(session.has_passed(Stage::Semantic));

        session.run_lexical().unwrap();
        assert!(session.has_passed(Stage::Lexical));
        assert!(!session.has_passed(Stage::Syntax));
        assert!(!session.has_passed(Stage::Semantic));
        assert_eq!(session.report().summary.len(), 1);
    }

    #[test]
    fn test_load_and_clear() {
        let mut session = Session::new("int x = 1;");
        session.run_all().unwrap();

        session.load("int y = true;");
        assert!(session.tokens().is_empty());
        assert!(session.report().stage.is_none());

        let report = session.run_all().unwrap();
        assert!(!report.success);
        assert_eq!(report.stage, Some(Stage::Semantic));
        assert_eq!(report.summary.last().map(String::as_str), Some(SEMANTIC_FAILED));
        assert_eq!(report.error_count(), 1);

        session.clear();
        assert_eq!(session.source(), "");
        assert!(session.diagnostics().is_empty());
    }

    #[test]
    fn test_strict_option() {
        let source = "float f = 1;";
        assert!(Session::new(source).run_all().unwrap().success);

        let strict = Options { strict: true };
        let report = Session::new(source).with_options(strict).run_all().unwrap();
        assert!(!report.success);
        assert_eq!(report.diagnostics[0].code, "M002");
    }

    #[test]
    fn test_warnings_do_not_fail_lexical_stage() {
        let mut session = Session::new("int x = 1; /* unfinished");
        let outcome = session.run_lexical().unwrap();
        assert!(outcome.passed);
        assert_eq!(outcome.diagnostics.len(), 1);
        assert!(session.run_all().unwrap().success);
        assert_eq!(session.report().warning_count(), 1);
    }

    #[test]
    fn test_run_until_syntax() {
        let mut session = Session::new("int x = \"no\";");
        let report = session.run_until(Stage::Syntax).unwrap();
        assert!(report.success);
        assert_eq!(report.stage, Some(Stage::Syntax));
        assert!(!session.has_passed(Stage::Semantic));
    }
}
