//! Error types shared across the compilation pipeline.
//!
//! Every semantic failure is fatal: the error value propagates with `?`
//! straight to the driver, which reports it and aborts the compilation.
//! There is no recovery and no continuation after the first error.

use snafu::Snafu;

pub type SemaResult<T> = Result<T, SemaError>;
pub type CompileResult<T> = Result<T, CompileError>;

/// A semantic error raised by the symbol table, the constant folder, or the
/// code generator. One variant per failure category so callers (and tests)
/// can tell them apart without parsing messages.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum SemaError {
    #[snafu(display("{name} already defined"))]
    AlreadyDefined { name: String },

    #[snafu(display("function already defined: {name}"))]
    FunctionAlreadyDefined { name: String },

    #[snafu(display("redeclaring symbol: {name}"))]
    RedeclaringSymbol { name: String },

    #[snafu(display("invalid array bounds: {lower}..{upper}"))]
    InvalidArrayBounds { lower: i32, upper: i32 },

    #[snafu(display("array bound not an int value"))]
    ArrayBoundNotInt,

    #[snafu(display("symbol not found: {name}"))]
    SymbolNotFound { name: String },

    #[snafu(display("type is undefined: {name}"))]
    TypeUndefined { name: String },

    #[snafu(display("expected a variable: {name}"))]
    NotAVariable { name: String },

    #[snafu(display("expected a constant: {name}"))]
    NotAConstant { name: String },

    #[snafu(display("invalid operator on const expression"))]
    InvalidConstOp,

    #[snafu(display("operands not of same type"))]
    OperandTypeMismatch,

    #[snafu(display("division by zero in constant expression"))]
    ConstDivisionByZero,

    #[snafu(display("out of registers"))]
    OutOfRegisters,

    #[snafu(display("invalid lvalue expression"))]
    InvalidLvalue,

    #[snafu(display("internal error: {detail}"))]
    Internal { detail: String },
}

/// Top-level error surfaced by [`crate::compile`]: either the source failed
/// to parse or the semantic pass aborted.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
pub enum CompileError {
    #[snafu(display("parse error: {message}"))]
    Parse { message: String },

    #[snafu(display("{source}"))]
    #[snafu(context(false))]
    Sema { source: SemaError },
}
