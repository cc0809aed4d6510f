//! Token definitions for Prism

use serde::Serialize;
use std::fmt;

use crate::utils::Span;

/// A token produced by the lexer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    /// Exact source text of the token (empty for EOF)
    pub lexeme: String,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, span: Span) -> Self {
        Self { kind, lexeme: lexeme.into(), span }
    }

    pub fn eof(span: Span) -> Self {
        Self { kind: TokenKind::Eof, lexeme: String::new(), span }
    }

    pub fn category(&self) -> TokenCategory {
        self.kind.category()
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self.kind, TokenKind::Unknown)
    }

    /// Short description used in diagnostics, e.g. `identifier 'x'`
    pub fn describe(&self) -> String {
        match self.category() {
            TokenCategory::Eof => "end of input".to_string(),
            category => format!("{} '{}'", category, self.lexeme),
        }
    }
}

/// Coarse token classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenCategory {
    Identifier,
    IntegerLiteral,
    FloatLiteral,
    StringLiteral,
    Keyword,
    Operator,
    Punctuation,
    Eof,
    Unknown,
}

impl fmt::Display for TokenCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenCategory::Identifier => "identifier",
            TokenCategory::IntegerLiteral => "integer literal",
            TokenCategory::FloatLiteral => "float literal",
            TokenCategory::StringLiteral => "string literal",
            TokenCategory::Keyword => "keyword",
            TokenCategory::Operator => "operator",
            TokenCategory::Punctuation => "punctuation",
            TokenCategory::Eof => "end of input",
            TokenCategory::Unknown => "unknown token",
        };
        f.write_str(name)
    }
}

/// Token kinds
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TokenKind {
    // ============ Keywords ============
    /// int
    IntType,
    /// float
    FloatType,
    /// bool
    BoolType,
    /// string
    StringType,
    /// if
    If,
    /// else
    Else,
    /// while
    While,
    /// for
    For,
    /// print
    Print,
    /// true
    True,
    /// false
    False,

    // ============ Identifiers and Literals ============
    /// Identifier (variable name)
    Ident(String),
    /// Integer literal
    IntLit(i64),
    /// Floating-point literal
    FloatLit(f64),
    /// String literal (unescaped contents)
    StringLit(String),

    // ============ Operators ============
    /// +
    Plus,
    /// -
    Minus,
    /// *
    Star,
    /// /
    Slash,
    /// %
    Percent,
    /// =
    Eq,
    /// ==
    EqEq,
    /// !=
    Ne,
    /// <
    Lt,
    /// <=
    Le,
    /// >
    Gt,
    /// >=
    Ge,
    /// &&
    AndAnd,
    /// ||
    OrOr,
    /// !
    Not,
    /// +=
    PlusEq,
    /// -=
    MinusEq,
    /// *=
    StarEq,
    /// /=
    SlashEq,

    // ============ Delimiters ============
    /// (
    LParen,
    /// )
    RParen,
    /// {
    LBrace,
    /// }
    RBrace,
    /// ;
    Semicolon,

    // ============ Special ============
    /// End of file
    Eof,
    /// Unrecognized lexeme
    Unknown,
}

impl TokenKind {
    /// Check if this token is a keyword
    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            TokenKind::IntType
                | TokenKind::FloatType
                | TokenKind::BoolType
                | TokenKind::StringType
                | TokenKind::If
                | TokenKind::Else
                | TokenKind::While
                | TokenKind::For
                | TokenKind::Print
                | TokenKind::True
                | TokenKind::False
        )
    }

    /// Check if this token names a declarable type
    pub fn is_type_keyword(&self) -> bool {
        matches!(
            self,
            TokenKind::IntType | TokenKind::FloatType | TokenKind::BoolType | TokenKind::StringType
        )
    }

    /// Check if a statement can begin with this token
    pub fn starts_statement(&self) -> bool {
        self.is_type_keyword()
            || matches!(
                self,
                TokenKind::Ident(_)
                    | TokenKind::If
                    | TokenKind::While
                    | TokenKind::For
                    | TokenKind::Print
                    | TokenKind::LBrace
                    | TokenKind::Semicolon
            )
    }

    /// Try to convert an identifier to a keyword
    pub fn keyword_from_str(s: &str) -> Option<TokenKind> {
        match s {
            "int" => Some(TokenKind::IntType),
            "float" => Some(TokenKind::FloatType),
            "bool" => Some(TokenKind::BoolType),
            "string" => Some(TokenKind::StringType),
            "if" => Some(TokenKind::If),
            "else" => Some(TokenKind::Else),
            "while" => Some(TokenKind::While),
            "for" => Some(TokenKind::For),
            "print" => Some(TokenKind::Print),
            "true" => Some(TokenKind::True),
            "false" => Some(TokenKind::False),
            _ => None,
        }
    }

    pub fn category(&self) -> TokenCategory {
        match self {
            TokenKind::Ident(_) => TokenCategory::Identifier,
            TokenKind::IntLit(_) => TokenCategory::IntegerLiteral,
            TokenKind::FloatLit(_) => TokenCategory::FloatLiteral,
            TokenKind::StringLit(_) => TokenCategory::StringLiteral,
            TokenKind::LParen
            | TokenKind::RParen
            | TokenKind::LBrace
            | TokenKind::RBrace
            | TokenKind::Semicolon => TokenCategory::Punctuation,
            TokenKind::Eof => TokenCategory::Eof,
            TokenKind::Unknown => TokenCategory::Unknown,
            kind if kind.is_keyword() => TokenCategory::Keyword,
            _ => TokenCategory::Operator,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_lookup() {
        assert_eq!(TokenKind::keyword_from_str("while"), Some(TokenKind::While));
        assert_eq!(TokenKind::keyword_from_str("string"), Some(TokenKind::StringType));
        assert_eq!(TokenKind::keyword_from_str("whilst"), None);
    }

    #[test]
    fn test_categories() {
        assert_eq!(TokenKind::Ident("x".into()).category(), TokenCategory::Identifier);
        assert_eq!(TokenKind::True.category(), TokenCategory::Keyword);
        assert_eq!(TokenKind::PlusEq.category(), TokenCategory::Operator);
        assert_eq!(TokenKind::Semicolon.category(), TokenCategory::Punctuation);
        assert_eq!(TokenKind::Unknown.category(), TokenCategory::Unknown);
    }

    #[test]
    fn test_statement_starters() {
        assert!(TokenKind::FloatType.starts_statement());
        assert!(TokenKind::Ident("x".into()).starts_statement());
        assert!(TokenKind::Semicolon.starts_statement());
        assert!(!TokenKind::RBrace.starts_statement());
        assert!(!TokenKind::RParen.starts_statement());
        assert!(!TokenKind::IntLit(5).starts_statement());
        assert!(!TokenKind::Else.starts_statement());
    }

    #[test]
    fn test_describe() {
        let tok = Token::new(TokenKind::Ident("x".into()), "x", Span::dummy());
        assert_eq!(tok.describe(), "identifier 'x'");
        assert_eq!(Token::eof(Span::dummy()).describe(), "end of input");
    }
}
