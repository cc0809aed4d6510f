//! Semantic Analysis for Prism
//!
//! Performs, in a single left-to-right traversal:
//! - Symbol table management (nested scopes, duplicate declarations)
//! - Use-before-declaration checks
//! - Bottom-up type inference and type checking
//!
//! Errors are accumulated. An expression that fails to check gets the
//! `Type::Error` poison type so the same mistake is not reported twice.

use std::collections::HashMap;

use log::debug;

use crate::frontend::ast::*;
use crate::types::Type;
use crate::utils::{Error, Result, Span};

// ==================== Symbol Table ====================

/// Unique identifier for a scope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(usize);

/// Symbol information
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub ty: Type,
    /// Where the symbol was declared
    pub span: Span,
}

/// A scope containing symbols
#[derive(Debug)]
struct Scope {
    parent: Option<ScopeId>,
    symbols: HashMap<String, Symbol>,
}

/// Symbol table with nested scopes
pub struct SymbolTable {
    scopes: Vec<Scope>,
    current: ScopeId,
}

impl SymbolTable {
    pub fn new() -> Self {
        // Create global scope
        let global = Scope {
            parent: None,
            symbols: HashMap::new(),
        };
        Self {
            scopes: vec![global],
            current: ScopeId(0),
        }
    }

    /// Enter a new scope
    pub fn enter_scope(&mut self) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope {
            parent: Some(self.current),
            symbols: HashMap::new(),
        });
        self.current = id;
        id
    }

    /// Exit the current scope
    pub fn exit_scope(&mut self) {
        if let Some(parent) = self.scopes[self.current.0].parent {
            self.current = parent;
        }
    }

    /// Define a symbol in the current scope
    pub fn define(&mut self, symbol: Symbol) -> Result<()> {
        let scope = &mut self.scopes[self.current.0];
        if let Some(existing) = scope.symbols.get(&symbol.name) {
            return Err(Error::DuplicateDeclaration {
                name: symbol.name.clone(),
                previous: existing.span,
                span: symbol.span,
            });
        }
        scope.symbols.insert(symbol.name.clone(), symbol);
        Ok(())
    }

    /// Look up a symbol, searching from current scope upward
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        let mut scope_id = Some(self.current);
        while let Some(id) = scope_id {
            if let Some(symbol) = self.scopes[id.0].symbols.get(name) {
                return Some(symbol);
            }
            scope_id = self.scopes[id.0].parent;
        }
        None
    }

    /// Look up a symbol only in the current scope
    pub fn lookup_local(&self, name: &str) -> Option<&Symbol> {
        self.scopes[self.current.0].symbols.get(name)
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

// ==================== Semantic Analyzer ====================

/// Semantic analyzer
pub struct SemanticAnalyzer {
    pub symbols: SymbolTable,
    pub errors: Vec<Error>,
    /// Strict mode disables implicit int -> float widening
    strict_mode: bool,
}

impl SemanticAnalyzer {
    pub fn new() -> Self {
        Self {
            symbols: SymbolTable::new(),
            errors: Vec::new(),
            strict_mode: false,
        }
    }

    /// Set strict numeric mode
    pub fn set_strict_mode(&mut self, strict: bool) {
        self.strict_mode = strict;
    }

    fn widening(&self) -> bool {
        !self.strict_mode
    }

    fn report(&mut self, error: Error) {
        debug!("semantic error: {}", error);
        self.errors.push(error);
    }

    /// Analyze a program, returning the first error in traversal order
    pub fn analyze(&mut self, program: &Program) -> Result<()> {
        for stmt in &program.stmts {
            self.check_stmt(stmt);
        }

        debug!(
            "semantic analysis finished: {} statements, {} errors",
            program.stmts.len(),
            self.errors.len()
        );

        match self.errors.first() {
            None => Ok(()),
            Some(first) => Err(first.clone()),
        }
    }

    /// Check a statement in a scope of its own
    fn check_scoped(&mut self, stmt: &Stmt) {
        self.symbols.enter_scope();
        self.check_stmt(stmt);
        self.symbols.exit_scope();
    }

    /// Type check a statement
    fn check_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Decl { ty, name, value, .. } => {
                // The initializer is checked before the name is bound
                if let Some(expr) = value {
                    let value_ty = self.check_expr(expr);
                    if !ty.accepts(value_ty, self.widening()) {
                        self.report(Error::TypeMismatch {
                            expected: ty.to_string(),
                            got: value_ty.to_string(),
                            span: expr.span(),
                        });
                    }
                }

                let symbol = Symbol {
                    name: name.name.clone(),
                    ty: *ty,
                    span: name.span,
                };
                if let Err(err) = self.symbols.define(symbol) {
                    self.report(err);
                }
            }
            Stmt::Assign { target, op, value, .. } => {
                let target_ty = self.check_ident(target);
                let value_ty = self.check_expr(value);

                let stored_ty = match op.binary_op() {
                    Some(bin) => self.check_binary_op(bin, target_ty, value_ty, value.span()),
                    None => value_ty,
                };

                if !target_ty.accepts(stored_ty, self.widening()) {
                    self.report(Error::TypeMismatch {
                        expected: target_ty.to_string(),
                        got: stored_ty.to_string(),
                        span: value.span(),
                    });
                }
            }
            Stmt::If { cond, then_branch, else_branch, .. } => {
                self.check_condition(cond);
                self.check_scoped(then_branch);
                if let Some(else_branch) = else_branch {
                    self.check_scoped(else_branch);
                }
            }
            Stmt::While { cond, body, .. } => {
                self.check_condition(cond);
                self.check_scoped(body);
            }
            Stmt::For { init, cond, update, body, .. } => {
                // The header declaration is visible in the condition, update and body
                self.symbols.enter_scope();
                if let Some(init) = init {
                    self.check_stmt(init);
                }
                if let Some(cond) = cond {
                    self.check_condition(cond);
                }
                if let Some(update) = update {
                    self.check_stmt(update);
                }
                self.check_scoped(body);
                self.symbols.exit_scope();
            }
            Stmt::Print { value, .. } => {
                self.check_expr(value);
            }
            Stmt::Block(block) => {
                self.symbols.enter_scope();
                for stmt in &block.stmts {
                    self.check_stmt(stmt);
                }
                self.symbols.exit_scope();
            }
            Stmt::Empty { .. } => {}
        }
    }

    fn check_condition(&mut self, cond: &Expr) {
        let ty = self.check_expr(cond);
        if ty != Type::Bool && !ty.is_error() {
            self.report(Error::TypeMismatch {
                expected: Type::Bool.to_string(),
                got: ty.to_string(),
                span: cond.span(),
            });
        }
    }

    fn check_ident(&mut self, ident: &Ident) -> Type {
        match self.symbols.lookup(&ident.name) {
            Some(symbol) => symbol.ty,
            None => {
                self.report(Error::UndefinedVariable {
                    name: ident.name.clone(),
                    span: ident.span,
                });
                Type::Error
            }
        }
    }

    /// Infer the type of an expression
    fn check_expr(&mut self, expr: &Expr) -> Type {
        match expr {
            Expr::Literal(lit) => Self::literal_type(lit),
            Expr::Ident(ident) => self.check_ident(ident),
            Expr::Binary { left, op, right, span } => {
                let left_ty = self.check_expr(left);
                let right_ty = self.check_expr(right);
                self.check_binary_op(*op, left_ty, right_ty, *span)
            }
            Expr::Unary { op, expr, span } => {
                let ty = self.check_expr(expr);
                self.check_unary_op(*op, ty, *span)
            }
        }
    }

    fn literal_type(lit: &Literal) -> Type {
        match lit {
            Literal::Int(..) => Type::Int,
            Literal::Float(..) => Type::Float,
            Literal::String(..) => Type::String,
            Literal::Bool(..) => Type::Bool,
        }
    }

    /// Check binary operation and return result type
    fn check_binary_op(&mut self, op: BinOp, left: Type, right: Type, span: Span) -> Type {
        if left.is_error() || right.is_error() {
            return Type::Error;
        }

        let widening = self.widening();
        let (result, wanted) = match op {
            BinOp::Add if left == Type::String && right == Type::String => {
                (Some(Type::String), "numeric or string")
            }
            BinOp::Add => (left.numeric_join(right, widening), "numeric or string"),
            BinOp::Sub | BinOp::Mul | BinOp::Div => (left.numeric_join(right, widening), "numeric"),
            BinOp::Mod => {
                let ok = left == Type::Int && right == Type::Int;
                (ok.then_some(Type::Int), "int")
            }
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => (
                left.numeric_join(right, widening).map(|_| Type::Bool),
                "numeric",
            ),
            BinOp::Eq | BinOp::Ne => {
                let ok = left == right || left.numeric_join(right, widening).is_some();
                (ok.then_some(Type::Bool), "comparable")
            }
            BinOp::And | BinOp::Or => {
                let ok = left == Type::Bool && right == Type::Bool;
                (ok.then_some(Type::Bool), "bool")
            }
        };

        result.unwrap_or_else(|| {
            self.report(Error::TypeMismatch {
                expected: format!("{} operands for '{}'", wanted, op),
                got: format!("{} and {}", left, right),
                span,
            });
            Type::Error
        })
    }

    /// Check unary operation
    fn check_unary_op(&mut self, op: UnOp, ty: Type, span: Span) -> Type {
        let ok = match op {
            UnOp::Neg => ty.is_numeric() || ty.is_error(),
            UnOp::Not => ty == Type::Bool || ty.is_error(),
        };
        if ok {
            return ty;
        }

        let wanted = match op {
            UnOp::Neg => "numeric",
            UnOp::Not => "bool",
        };
        self.report(Error::TypeMismatch {
            expected: format!("{} operand for '{}'", wanted, op),
            got: ty.to_string(),
            span,
        });
        Type::Error
    }
}

impl Default for SemanticAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

/// Check a program, returning every semantic error in traversal order
pub fn check_program(program: &Program, strict: bool) -> Vec<Error> {
    let mut analyzer = SemanticAnalyzer::new();
    analyzer.set_strict_mode(strict);
    let _ = analyzer.analyze(program);
    analyzer.errors
}
