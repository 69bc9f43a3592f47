//! Crate root: wires together the compilation pipeline.
//!
//! The stages are small and composable:
//! - `parser` owns all syntactic knowledge and produces the AST.
//! - `symtab` holds the per-compilation state: scopes, entities, the type
//!   arena, the register pool, and the string-constant pool.
//! - `fold` evaluates constant expressions at compile time.
//! - `codegen` lowers declarations and statements into MIPS assembly text.
//! - `error` centralises the error types shared by the other modules.

pub mod ast;
pub mod codegen;
pub mod error;
pub mod fold;
pub mod parser;
pub mod symtab;

pub use error::{CompileError, CompileResult, SemaError, SemaResult};

/// Compile a source string into MIPS assembly.
pub fn compile(source: &str) -> CompileResult<String> {
    let program = parser::parse(source)?;
    Ok(codegen::Compiler::new(false).compile(&program)?)
}
