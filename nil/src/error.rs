//! Error taxonomy for IR construction, grounded in `seen_ir/src/error.rs`'s
//! `thiserror`-derived enum shape.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum IrError {
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("`{ty}` is not a valid element type")]
    InvalidElementType { ty: String },

    #[error("`{ty}` is not a valid return type")]
    InvalidReturnType { ty: String },

    #[error("`{ty}` is not a valid argument type")]
    InvalidArgumentType { ty: String },

    #[error("operand types do not match: {lhs} vs {rhs}")]
    OperandTypeMismatch { lhs: String, rhs: String },

    #[error("wrong argument count for call: expected {expected}, got {got}")]
    ArgumentCountMismatch { expected: usize, got: usize },

    #[error("condition must be i1, found {found}")]
    NonBooleanCondition { found: String },

    #[error("pointer operand of store must be a pointer type, found {found}")]
    StoreTargetNotPointer { found: String },

    #[error("invalid cast from {from} to {to}")]
    InvalidCast { from: String, to: String },

    #[error("function `{name}` already has a different type; existing type kept")]
    FunctionTypeMismatch { name: String },

    #[error("duplicate value name `{0}` in function")]
    DuplicateName(String),

    #[error("{0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, IrError>;
