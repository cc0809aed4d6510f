//! Parser for Prism
//!
//! Recursive descent over an immutable token slice. Each non-terminal of the
//! grammar has one method; expression precedence is encoded by the call
//! chain `or -> and -> equality -> relational -> additive -> multiplicative
//! -> unary -> primary`. The first mismatch aborts with an error, there is no
//! recovery.

use std::mem::discriminant;

use crate::frontend::ast::*;
use crate::frontend::token::{Token, TokenKind};
use crate::types::Type;
use crate::utils::{Error, Result, Span};

/// Maximum nesting of statements, parentheses and unary prefixes
pub const MAX_DEPTH: usize = 128;

/// Maximum binary operators in one expression, parenthesized parts included
pub const MAX_OPERATORS: usize = 1024;

/// The parser
pub struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
    /// Binary operators seen in the current expression
    operators: usize,
    /// Returned once the cursor runs past the slice, so a sequence without
    /// an explicit EOF token still terminates cleanly
    eof: Token,
}

impl<'a> Parser<'a> {
    /// Create a parser over a token sequence
    pub fn new(tokens: &'a [Token]) -> Self {
        let end = tokens
            .last()
            .map(|t| {
                let column = t.span.column + t.lexeme.chars().count() as u32;
                Span::new(t.span.end, t.span.end, t.span.line, column)
            })
            .unwrap_or_default();
        Self {
            tokens,
            pos: 0,
            depth: 0,
            operators: 0,
            eof: Token::eof(end),
        }
    }

    // ==================== Helper Methods ====================

    fn current(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&self.eof)
    }

    fn current_kind(&self) -> &TokenKind {
        &self.current().kind
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() && !self.is_at_end() {
            self.pos += 1;
        }
        token
    }

    /// Span of the most recently consumed token
    fn prev_span(&self) -> Span {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map(|t| t.span)
            .unwrap_or_default()
    }

    fn check(&self, kind: &TokenKind) -> bool {
        discriminant(self.current_kind()) == discriminant(kind)
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current_kind(), TokenKind::Eof)
    }

    fn unexpected(&self, expected: &str) -> Error {
        Error::UnexpectedToken {
            expected: expected.to_string(),
            got: self.current().describe(),
            span: self.current().span,
        }
    }

    fn expect(&mut self, expected: TokenKind, what: &str) -> Result<Token> {
        if self.check(&expected) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(what))
        }
    }

    fn consume(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(Error::NestingTooDeep {
                limit: MAX_DEPTH,
                span: self.current().span,
            });
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    // ==================== Statements ====================

    /// Parse a complete program
    pub fn parse_program(&mut self) -> Result<Program> {
        let mut stmts = Vec::new();

        while !self.is_at_end() {
            if !self.current_kind().starts_statement() {
                return Err(Error::TrailingInput {
                    got: self.current().describe(),
                    span: self.current().span,
                });
            }
            stmts.push(self.parse_stmt()?);
        }

        Ok(Program { stmts })
    }

    fn parse_stmt(&mut self) -> Result<Stmt> {
        self.enter()?;
        let result = self.parse_stmt_inner();
        self.leave();
        result
    }

    fn parse_stmt_inner(&mut self) -> Result<Stmt> {
        match self.current_kind() {
            kind if kind.is_type_keyword() => self.parse_decl(),
            TokenKind::Ident(_) => {
                let stmt = self.parse_assign()?;
                self.expect(TokenKind::Semicolon, "';'")?;
                Ok(stmt)
            }
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Print => self.parse_print(),
            TokenKind::LBrace => Ok(Stmt::Block(self.parse_block()?)),
            TokenKind::Semicolon => {
                let span = self.advance().span;
                Ok(Stmt::Empty { span })
            }
            _ => Err(self.unexpected("statement")),
        }
    }

    /// `type name (= value)? ;`
    fn parse_decl(&mut self) -> Result<Stmt> {
        let type_token = self.advance();
        let ty = Type::from_keyword(&type_token.kind).unwrap_or(Type::Error);

        let name = self.parse_ident()?;

        let value = if self.consume(&TokenKind::Eq) {
            Some(self.parse_expr()?)
        } else {
            None
        };

        let expected = if value.is_some() { "';'" } else { "'=' or ';'" };
        self.expect(TokenKind::Semicolon, expected)?;

        Ok(Stmt::Decl {
            ty,
            name,
            value,
            span: type_token.span.merge(&self.prev_span()),
        })
    }

    /// `name op value`, without the terminating `;`
    fn parse_assign(&mut self) -> Result<Stmt> {
        let target = self.parse_ident()?;

        let op = match self.current_kind() {
            TokenKind::Eq => AssignOp::Assign,
            TokenKind::PlusEq => AssignOp::AddAssign,
            TokenKind::MinusEq => AssignOp::SubAssign,
            TokenKind::StarEq => AssignOp::MulAssign,
            TokenKind::SlashEq => AssignOp::DivAssign,
            _ => return Err(self.unexpected("assignment operator")),
        };
        self.advance();

        let value = self.parse_expr()?;

        Ok(Stmt::Assign {
            span: target.span.merge(&value.span()),
            target,
            op,
            value,
        })
    }

    /// `( expr )` as used by `if`, `while` and `print`
    fn parse_paren_expr(&mut self) -> Result<Expr> {
        self.expect(TokenKind::LParen, "'('")?;
        let expr = self.parse_expr()?;
        self.expect(TokenKind::RParen, "')'")?;
        Ok(expr)
    }

    fn parse_if(&mut self) -> Result<Stmt> {
        let start = self.advance().span;

        let cond = self.parse_paren_expr()?;
        let then_branch = Box::new(self.parse_stmt()?);

        // `else` binds to the nearest `if`
        let else_branch = if self.consume(&TokenKind::Else) {
            Some(Box::new(self.parse_stmt()?))
        } else {
            None
        };

        Ok(Stmt::If {
            cond,
            then_branch,
            else_branch,
            span: start.merge(&self.prev_span()),
        })
    }

    fn parse_while(&mut self) -> Result<Stmt> {
        let start = self.advance().span;

        let cond = self.parse_paren_expr()?;
        let body = Box::new(self.parse_stmt()?);

        Ok(Stmt::While {
            cond,
            body,
            span: start.merge(&self.prev_span()),
        })
    }

    fn parse_for(&mut self) -> Result<Stmt> {
        let start = self.advance().span;
        self.expect(TokenKind::LParen, "'('")?;

        let init = match self.current_kind() {
            TokenKind::Semicolon => {
                self.advance();
                None
            }
            kind if kind.is_type_keyword() => Some(Box::new(self.parse_decl()?)),
            TokenKind::Ident(_) => {
                let stmt = self.parse_assign()?;
                self.expect(TokenKind::Semicolon, "';'")?;
                Some(Box::new(stmt))
            }
            _ => return Err(self.unexpected("declaration, assignment or ';'")),
        };

        let cond = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(TokenKind::Semicolon, "';'")?;

        let update = if self.check(&TokenKind::RParen) {
            None
        } else {
            Some(Box::new(self.parse_assign()?))
        };
        self.expect(TokenKind::RParen, "')'")?;

        let body = Box::new(self.parse_stmt()?);

        Ok(Stmt::For {
            init,
            cond,
            update,
            body,
            span: start.merge(&self.prev_span()),
        })
    }

    fn parse_print(&mut self) -> Result<Stmt> {
        let start = self.advance().span;
        let value = self.parse_paren_expr()?;
        self.expect(TokenKind::Semicolon, "';'")?;

        Ok(Stmt::Print {
            value,
            span: start.merge(&self.prev_span()),
        })
    }

    fn parse_block(&mut self) -> Result<Block> {
        let start = self.expect(TokenKind::LBrace, "'{'")?.span;

        let mut stmts = Vec::new();
        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            stmts.push(self.parse_stmt()?);
        }

        self.expect(TokenKind::RBrace, "'}'")?;

        Ok(Block {
            stmts,
            span: start.merge(&self.prev_span()),
        })
    }

    fn parse_ident(&mut self) -> Result<Ident> {
        let token = self.current().clone();
        match &token.kind {
            TokenKind::Ident(name) => {
                self.advance();
                Ok(Ident {
                    name: name.clone(),
                    span: token.span,
                })
            }
            _ => Err(Error::ExpectedIdent {
                got: token.describe(),
                span: token.span,
            }),
        }
    }

    // ==================== Expressions ====================

    /// A complete expression as used by a statement
    fn parse_expr(&mut self) -> Result<Expr> {
        self.operators = 0;
        self.parse_nested_expr()
    }

    fn parse_nested_expr(&mut self) -> Result<Expr> {
        self.enter()?;
        let result = self.parse_or();
        self.leave();
        result
    }

    /// One left-associative precedence level.
    ///
    /// Operators in a chain do not nest, but each one deepens the left spine
    /// of the tree, so the whole expression is capped at `MAX_OPERATORS`.
    fn parse_binary_level(
        &mut self,
        operand: fn(&mut Self) -> Result<Expr>,
        operator: fn(&TokenKind) -> Option<BinOp>,
    ) -> Result<Expr> {
        let mut left = operand(self)?;

        while let Some(op) = operator(self.current_kind()) {
            self.operators += 1;
            if self.operators > MAX_OPERATORS {
                return Err(Error::ExpressionTooLong {
                    limit: MAX_OPERATORS,
                    span: self.current().span,
                });
            }
            self.advance();
            let right = operand(self)?;
            let span = left.span().merge(&right.span());
            left = Expr::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
                span,
            };
        }

        Ok(left)
    }

    fn parse_or(&mut self) -> Result<Expr> {
        self.parse_binary_level(Self::parse_and, |kind| match kind {
            TokenKind::OrOr => Some(BinOp::Or),
            _ => None,
        })
    }

    fn parse_and(&mut self) -> Result<Expr> {
        self.parse_binary_level(Self::parse_equality, |kind| match kind {
            TokenKind::AndAnd => Some(BinOp::And),
            _ => None,
        })
    }

    fn parse_equality(&mut self) -> Result<Expr> {
        self.parse_binary_level(Self::parse_relational, |kind| match kind {
            TokenKind::EqEq => Some(BinOp::Eq),
            TokenKind::Ne => Some(BinOp::Ne),
            _ => None,
        })
    }

    fn parse_relational(&mut self) -> Result<Expr> {
        self.parse_binary_level(Self::parse_additive, |kind| match kind {
            TokenKind::Lt => Some(BinOp::Lt),
            TokenKind::Le => Some(BinOp::Le),
            TokenKind::Gt => Some(BinOp::Gt),
            TokenKind::Ge => Some(BinOp::Ge),
            _ => None,
        })
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        self.parse_binary_level(Self::parse_multiplicative, |kind| match kind {
            TokenKind::Plus => Some(BinOp::Add),
            TokenKind::Minus => Some(BinOp::Sub),
            _ => None,
        })
    }

    fn parse_multiplicative(&mut self) -> Result<Expr> {
        self.parse_binary_level(Self::parse_unary, |kind| match kind {
            TokenKind::Star => Some(BinOp::Mul),
            TokenKind::Slash => Some(BinOp::Div),
            TokenKind::Percent => Some(BinOp::Mod),
            _ => None,
        })
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        // Prefix operators are collected iteratively, so `!!!!x` does not recurse
        let mut ops = Vec::new();
        loop {
            let op = match self.current_kind() {
                TokenKind::Minus => UnOp::Neg,
                TokenKind::Not => UnOp::Not,
                _ => break,
            };
            self.enter()?;
            ops.push((op, self.advance().span));
        }
        self.depth -= ops.len();

        let mut expr = self.parse_primary()?;
        for (op, start) in ops.into_iter().rev() {
            let span = start.merge(&expr.span());
            expr = Expr::Unary {
                op,
                expr: Box::new(expr),
                span,
            };
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let token = self.current().clone();

        let expr = match &token.kind {
            TokenKind::IntLit(n) => Expr::Literal(Literal::Int(*n, token.span)),
            TokenKind::FloatLit(n) => Expr::Literal(Literal::Float(*n, token.span)),
            TokenKind::StringLit(s) => Expr::Literal(Literal::String(s.clone(), token.span)),
            TokenKind::True => Expr::Literal(Literal::Bool(true, token.span)),
            TokenKind::False => Expr::Literal(Literal::Bool(false, token.span)),
            TokenKind::Ident(name) => Expr::Ident(Ident {
                name: name.clone(),
                span: token.span,
            }),
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_nested_expr()?;
                self.expect(TokenKind::RParen, "')'")?;
                return Ok(inner);
            }
            _ => {
                return Err(Error::ExpectedExpr {
                    got: token.describe(),
                    span: token.span,
                })
            }
        };

        self.advance();
        Ok(expr)
    }
}

/// Parse a token sequence into a program
pub fn check_syntax(tokens: &[Token]) -> Result<Program> {
    Parser::new(tokens).parse_program()
}

/// True iff the token sequence is a valid program
pub fn analyze_syntax(tokens: &[Token]) -> bool {
    check_syntax(tokens).is_ok()
}
