//! lyra-error - Compilation errors of the Lyra code generator
//!
//! Lowering never reports failure through null-like sentinels: every
//! operation that can fail returns a [`CodegenError`] and the enclosing
//! compilation aborts before partial IR can reach an execution backend.
//!
//! The crate also hosts the [`Reporter`], the ordered diagnostics channel
//! used to narrate code generation when verbose mode is enabled.

pub mod report;

pub use report::Reporter;

use thiserror::Error;

/// Default Result type for lowering operations
pub type Result<T> = std::result::Result<T, CodegenError>;

/// Everything that can go wrong while lowering an AST into IR
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodegenError {
    /// Identifier not present in the current scope frame
    #[error("variable `{0}` is undeclared")]
    UndeclaredVariable(String),

    /// Call target not present in the module's function table
    #[error("function `{0}` is undefined")]
    UndefinedFunction(String),

    /// The grammar accepts the declaration but the IR has no storage for it
    #[error("cannot declare variable `{name}`: stack storage for `{ty}` values is not supported")]
    UnsupportedDeclaration { name: String, ty: String },

    /// A construct the grammar recognizes but this generator does not lower
    #[error("{0} is not supported")]
    UnsupportedConstruct(&'static str),

    /// Function body finished without ever executing a return statement
    #[error("function `{0}` never returns a value")]
    MissingReturn(String),

    /// String literal without its surrounding quote delimiters
    #[error("malformed string literal: {0}")]
    MalformedLiteral(String),

    /// A finished basic block violates the single-trailing-terminator rule
    #[error("block `{block}` in function `{function}` is not properly terminated")]
    MalformedBlock { function: String, block: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CodegenError::UndeclaredVariable("x".to_string());
        assert_eq!(err.to_string(), "variable `x` is undeclared");

        let err = CodegenError::UnsupportedDeclaration {
            name: "s".to_string(),
            ty: "String".to_string(),
        };
        assert!(err.to_string().contains("stack storage for `String`"));
    }
}
