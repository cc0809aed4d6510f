//! Type System for Prism

use serde::Serialize;
use std::fmt;

use crate::frontend::token::TokenKind;

/// The closed set of value types.
///
/// `Error` is the type of an expression that already failed to check; it is
/// compatible with everything so one mistake is reported only once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Type {
    Int,
    Float,
    Bool,
    String,
    Error,
}

impl Type {
    /// Map a type keyword token to its type
    pub fn from_keyword(kind: &TokenKind) -> Option<Type> {
        match kind {
            TokenKind::IntType => Some(Type::Int),
            TokenKind::FloatType => Some(Type::Float),
            TokenKind::BoolType => Some(Type::Bool),
            TokenKind::StringType => Some(Type::String),
            _ => None,
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, Type::Int | Type::Float)
    }

    pub fn is_error(self) -> bool {
        self == Type::Error
    }

    /// Can a value of type `value` be stored in a location of this type?
    ///
    /// With `widening`, an `int` value may flow into `float` context.
    /// `float` never narrows to `int`.
    pub fn accepts(self, value: Type, widening: bool) -> bool {
        match (self, value) {
            (Type::Error, _) | (_, Type::Error) => true,
            (Type::Float, Type::Int) => widening,
            (a, b) => a == b,
        }
    }

    /// The common numeric type of two operands, if they have one
    pub fn numeric_join(self, other: Type, widening: bool) -> Option<Type> {
        match (self, other) {
            (Type::Int, Type::Int) => Some(Type::Int),
            (Type::Float, Type::Float) => Some(Type::Float),
            (Type::Int, Type::Float) | (Type::Float, Type::Int) if widening => Some(Type::Float),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Type::Int => "int",
            Type::Float => "float",
            Type::Bool => "bool",
            Type::String => "string",
            Type::Error => "<error>",
        };
        f.write_str(name)
    }
}
