//! Lexer for Prism
//!
//! Converts source code into a stream of tokens. The scan always runs to the
//! end of input; unrecognized lexemes become `TokenKind::Unknown` tokens and
//! are recorded as diagnostics instead of aborting.

use log::trace;

use crate::frontend::token::{Token, TokenKind};
use crate::utils::{Error, Span};

/// The lexer state
pub struct Lexer {
    /// Source code as characters
    source: Vec<char>,
    /// Current position in `source`
    pos: usize,
    /// Current byte offset
    offset: usize,
    /// Current 1-based line
    line: u32,
    /// Current 1-based column
    column: u32,
    /// Start of the current token: (char index, byte offset, line, column)
    start: (usize, usize, u32, u32),
    /// Lexical errors and warnings found so far
    diagnostics: Vec<Error>,
}

impl Lexer {
    /// Create a new lexer for the given source code
    pub fn new(source: &str) -> Self {
        Self {
            source: source.chars().collect(),
            pos: 0,
            offset: 0,
            line: 1,
            column: 1,
            start: (0, 0, 1, 1),
            diagnostics: Vec::new(),
        }
    }

    /// Get the current character without advancing
    fn peek(&self) -> Option<char> {
        self.source.get(self.pos).copied()
    }

    /// Look `n` characters ahead without advancing
    fn peek_at(&self, n: usize) -> Option<char> {
        self.source.get(self.pos + n).copied()
    }

    /// Advance to the next character, tracking line and column
    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        self.offset += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    /// Advance while `pred` holds for the current character
    fn advance_while(&mut self, pred: impl Fn(char) -> bool) {
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            self.advance();
        }
    }

    /// Check if we've reached the end of input
    fn is_at_end(&self) -> bool {
        self.pos >= self.source.len()
    }

    fn mark_start(&mut self) {
        self.start = (self.pos, self.offset, self.line, self.column);
    }

    /// Create a span from start to current position
    fn make_span(&self) -> Span {
        let (_, offset, line, column) = self.start;
        Span::new(offset, self.offset, line, column)
    }

    fn lexeme(&self) -> String {
        self.source[self.start.0..self.pos].iter().collect()
    }

    /// Create a token with the current span and lexeme
    fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(kind, self.lexeme(), self.make_span())
    }

    /// Create an unknown token and record why it was rejected
    fn make_unknown(&mut self, error: Error) -> Token {
        trace!("lexical error: {}", error);
        self.diagnostics.push(error);
        self.make_token(TokenKind::Unknown)
    }

    /// Skip whitespace and comments
    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            match c {
                // Whitespace
                ' ' | '\t' | '\r' | '\n' => {
                    self.advance();
                }
                // Line comment
                '/' if self.peek_at(1) == Some('/') => {
                    self.advance_while(|c| c != '\n');
                }
                // Block comment (not nested)
                '/' if self.peek_at(1) == Some('*') => {
                    self.mark_start();
                    self.advance(); // skip /
                    self.advance(); // skip *
                    let mut closed = false;
                    while !self.is_at_end() {
                        if self.peek() == Some('*') && self.peek_at(1) == Some('/') {
                            self.advance();
                            self.advance();
                            closed = true;
                            break;
                        }
                        self.advance();
                    }
                    if !closed {
                        // Consumes to end of input without producing a token
                        self.diagnostics.push(Error::UnterminatedComment {
                            span: self.make_span(),
                        });
                    }
                }
                _ => break,
            }
        }
    }

    /// Read an identifier or keyword
    fn read_identifier(&mut self) -> Token {
        self.advance_while(|c| c.is_ascii_alphanumeric() || c == '_');

        let text = self.lexeme();
        let kind = TokenKind::keyword_from_str(&text).unwrap_or(TokenKind::Ident(text));

        self.make_token(kind)
    }

    /// Read a number literal (integer or float)
    fn read_number(&mut self) -> Token {
        let mut is_float = false;

        self.advance_while(|c| c.is_ascii_digit());

        // Check for decimal point
        if self.peek() == Some('.') && self.peek_at(1).map_or(false, |c| c.is_ascii_digit()) {
            is_float = true;
            self.advance(); // consume '.'
            self.advance_while(|c| c.is_ascii_digit());
        }

        // Check for exponent
        if matches!(self.peek(), Some('e') | Some('E')) {
            let digit_at = if matches!(self.peek_at(1), Some('+') | Some('-')) { 2 } else { 1 };
            if self.peek_at(digit_at).map_or(false, |c| c.is_ascii_digit()) {
                is_float = true;
                for _ in 0..digit_at {
                    self.advance();
                }
                self.advance_while(|c| c.is_ascii_digit());
            }
        }

        // A number running straight into identifier characters is one bad lexeme
        if self.peek().map_or(false, |c| c.is_ascii_alphanumeric() || c == '_') {
            self.advance_while(|c| c.is_ascii_alphanumeric() || c == '_');
            let lexeme = self.lexeme();
            let span = self.make_span();
            return self.make_unknown(Error::MalformedNumber { lexeme, span });
        }

        let text = self.lexeme();
        if is_float {
            match text.parse::<f64>() {
                Ok(value) => self.make_token(TokenKind::FloatLit(value)),
                Err(_) => {
                    let span = self.make_span();
                    self.make_unknown(Error::MalformedNumber { lexeme: text, span })
                }
            }
        } else {
            match text.parse::<i64>() {
                Ok(value) => self.make_token(TokenKind::IntLit(value)),
                Err(_) => {
                    let span = self.make_span();
                    self.make_unknown(Error::MalformedNumber { lexeme: text, span })
                }
            }
        }
    }

    /// Read a string literal
    fn read_string(&mut self) -> Token {
        self.advance(); // consume opening quote

        let mut value = String::new();

        loop {
            match self.peek() {
                Some('"') => {
                    self.advance(); // consume closing quote
                    return self.make_token(TokenKind::StringLit(value));
                }
                Some('\\') if !matches!(self.peek_at(1), None | Some('\n')) => {
                    self.advance();
                    match self.advance() {
                        Some('n') => value.push('\n'),
                        Some('r') => value.push('\r'),
                        Some('t') => value.push('\t'),
                        Some('0') => value.push('\0'),
                        Some(c) => value.push(c),
                        None => break,
                    }
                }
                // Unterminated: the token stops at the end of the line
                None | Some('\n') => break,
                Some(c) => {
                    value.push(c);
                    self.advance();
                }
            }
        }

        let lexeme = self.lexeme();
        let span = self.make_span();
        self.make_unknown(Error::UnterminatedString { lexeme, span })
    }

    /// Consume `second` if it is next, choosing between two token kinds
    fn pick(&mut self, second: char, double: TokenKind, single: TokenKind) -> TokenKind {
        if self.peek() == Some(second) {
            self.advance();
            double
        } else {
            single
        }
    }

    /// Get the next token
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();
        self.mark_start();

        let Some(c) = self.peek() else {
            return Token::eof(self.make_span());
        };

        // Identifiers and keywords
        if c.is_ascii_alphabetic() || c == '_' {
            return self.read_identifier();
        }

        // Numbers
        if c.is_ascii_digit() {
            return self.read_number();
        }

        // String literals
        if c == '"' {
            return self.read_string();
        }

        self.advance();

        // Operators and punctuation
        let kind = match c {
            '+' => self.pick('=', TokenKind::PlusEq, TokenKind::Plus),
            '-' => self.pick('=', TokenKind::MinusEq, TokenKind::Minus),
            '*' => self.pick('=', TokenKind::StarEq, TokenKind::Star),
            '/' => self.pick('=', TokenKind::SlashEq, TokenKind::Slash),
            '%' => TokenKind::Percent,
            '=' => self.pick('=', TokenKind::EqEq, TokenKind::Eq),
            '!' => self.pick('=', TokenKind::Ne, TokenKind::Not),
            '<' => self.pick('=', TokenKind::Le, TokenKind::Lt),
            '>' => self.pick('=', TokenKind::Ge, TokenKind::Gt),
            '&' => self.pick('&', TokenKind::AndAnd, TokenKind::Unknown),
            '|' => self.pick('|', TokenKind::OrOr, TokenKind::Unknown),
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            ';' => TokenKind::Semicolon,
            _ => TokenKind::Unknown,
        };

        if kind == TokenKind::Unknown {
            let span = self.make_span();
            return self.make_unknown(Error::UnknownCharacter { ch: c, span });
        }

        self.make_token(kind)
    }

    /// Tokenize the entire source and return all tokens
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }

    /// Lexical errors and warnings recorded while scanning
    pub fn diagnostics(&self) -> &[Error] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Error> {
        self.diagnostics
    }
}

/// True iff no token in the sequence is of the unknown kind
pub fn is_valid_lexically(tokens: &[Token]) -> bool {
    !tokens.iter().any(Token::is_unknown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source).tokenize().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_simple_declaration() {
        let tokens = Lexer::new("int x = 5;").tokenize();

        assert_eq!(tokens.len(), 6);
        assert!(matches!(tokens[0].kind, TokenKind::IntType));
        assert!(matches!(tokens[1].kind, TokenKind::Ident(ref s) if s == "x"));
        assert!(matches!(tokens[2].kind, TokenKind::Eq));
        assert!(matches!(tokens[3].kind, TokenKind::IntLit(5)));
        assert!(matches!(tokens[4].kind, TokenKind::Semicolon));
        assert!(matches!(tokens[5].kind, TokenKind::Eof));
        assert!(is_valid_lexically(&tokens));
    }

    #[test]
    fn test_empty_input() {
        let tokens = Lexer::new("").tokenize();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Eof);
        assert!(is_valid_lexically(&tokens));
    }

    #[test]
    fn test_maximal_munch() {
        assert_eq!(
            kinds("a==b<=c!=d>=e&&f||g+=1"),
            vec![
                TokenKind::Ident("a".into()),
                TokenKind::EqEq,
                TokenKind::Ident("b".into()),
                TokenKind::Le,
                TokenKind::Ident("c".into()),
                TokenKind::Ne,
                TokenKind::Ident("d".into()),
                TokenKind::Ge,
                TokenKind::Ident("e".into()),
                TokenKind::AndAnd,
                TokenKind::Ident("f".into()),
                TokenKind::OrOr,
                TokenKind::Ident("g".into()),
                TokenKind::PlusEq,
                TokenKind::IntLit(1),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_keywords_and_identifiers() {
        assert_eq!(
            kinds("while whilex print _tmp1 true"),
            vec![
                TokenKind::While,
                TokenKind::Ident("whilex".into()),
                TokenKind::Print,
                TokenKind::Ident("_tmp1".into()),
                TokenKind::True,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        let tokens = Lexer::new("42 3.14 1e3 2.5E-2 7.").tokenize();

        assert!(matches!(tokens[0].kind, TokenKind::IntLit(42)));
        assert!(matches!(tokens[1].kind, TokenKind::FloatLit(f) if (f - 3.14).abs() < 1e-9));
        assert!(matches!(tokens[2].kind, TokenKind::FloatLit(f) if (f - 1000.0).abs() < 1e-9));
        assert!(matches!(tokens[3].kind, TokenKind::FloatLit(f) if (f - 0.025).abs() < 1e-9));
        // `7.` is an integer followed by a stray dot
        assert!(matches!(tokens[4].kind, TokenKind::IntLit(7)));
        assert!(tokens[5].is_unknown());
    }

    #[test]
    fn test_malformed_numbers() {
        let mut lexer = Lexer::new("9abc 99999999999999999999");
        let tokens = lexer.tokenize();

        assert!(tokens[0].is_unknown());
        assert_eq!(tokens[0].lexeme, "9abc");
        assert!(tokens[1].is_unknown());
        assert_eq!(lexer.diagnostics().len(), 2);
        assert!(lexer
            .diagnostics()
            .iter()
            .all(|e| matches!(e, Error::MalformedNumber { .. })));
    }

    #[test]
    fn test_strings() {
        let tokens = Lexer::new(r#""hello\n\"world\"""#).tokenize();

        assert!(matches!(tokens[0].kind, TokenKind::StringLit(ref s) if s == "hello\n\"world\""));
        assert_eq!(tokens[0].lexeme, r#""hello\n\"world\"""#);
    }

    #[test]
    fn test_unterminated_string_spans_to_end_of_line() {
        let mut lexer = Lexer::new("string s = \"abc;\nint y = 1;");
        let tokens = lexer.tokenize();

        let bad = &tokens[3];
        assert!(bad.is_unknown());
        assert_eq!(bad.lexeme, "\"abc;");
        assert!(matches!(tokens[4].kind, TokenKind::IntType));
        assert_eq!(tokens[4].span.line, 2);
        assert!(!is_valid_lexically(&tokens));
        assert!(matches!(lexer.diagnostics()[0], Error::UnterminatedString { .. }));
    }

    #[test]
    fn test_unknown_character() {
        let mut lexer = Lexer::new("x # y");
        let tokens = lexer.tokenize();

        assert_eq!(tokens.len(), 4);
        assert!(tokens[1].is_unknown());
        assert_eq!(tokens[1].lexeme, "#");
        assert!(!is_valid_lexically(&tokens));
        assert!(matches!(lexer.diagnostics()[0], Error::UnknownCharacter { ch: '#', .. }));
    }

    #[test]
    fn test_all_unknowns_reported() {
        let mut lexer = Lexer::new("a & b @ c | d");
        lexer.tokenize();
        assert_eq!(lexer.diagnostics().len(), 3);
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            kinds("int /* block\ncomment */ x; // trailing\n"),
            vec![
                TokenKind::IntType,
                TokenKind::Ident("x".into()),
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_unterminated_block_comment() {
        let mut lexer = Lexer::new("int x; /* never closed\nint y;");
        let tokens = lexer.tokenize();

        assert_eq!(tokens.len(), 4);
        assert!(is_valid_lexically(&tokens));
        assert_eq!(lexer.diagnostics().len(), 1);
        assert!(lexer.diagnostics()[0].is_warning());
    }

    #[test]
    fn test_positions() {
        let tokens = Lexer::new("int a;\n  a = 2;").tokenize();

        assert_eq!((tokens[0].span.line, tokens[0].span.column), (1, 1));
        assert_eq!((tokens[1].span.line, tokens[1].span.column), (1, 5));
        assert_eq!((tokens[3].span.line, tokens[3].span.column), (2, 3));
        assert_eq!((tokens[5].span.line, tokens[5].span.column), (2, 7));
        assert_eq!(tokens[3].span.start, 9);
    }

    #[test]
    fn test_lexemes_reconstruct_content() {
        for source in [
            "int x = 5;",
            "if (a <= b) { print(a); } else b = a * 2 % 3;",
            "x # y $ z",
            "float  f\t=\n1.5e2 ;",
        ] {
            let joined: String = Lexer::new(source)
                .tokenize()
                .iter()
                .map(|t| t.lexeme.as_str())
                .collect();
            let expected: String = source.chars().filter(|c| !c.is_whitespace()).collect();
            assert_eq!(joined, expected, "source: {source}");
        }
    }
}
