//! Runtime errors of the IR interpreter

use thiserror::Error;

/// Everything that can go wrong while executing a module
#[derive(Debug, Error)]
pub enum VmError {
    /// Module has no entry function to start from
    #[error("module has no `main` function")]
    MissingEntry,

    /// Call target absent from both the module and the builtins
    #[error("call to unknown function `{0}`")]
    UnknownFunction(String),

    /// Branch to a label with no matching block
    #[error("branch to unknown block `{0}`")]
    UnknownBlock(String),

    /// Load from a slot that was never allocated or stored to
    #[error("load from uninitialized slot `{0}`")]
    UninitializedSlot(String),

    /// Reference to a temporary no instruction produced
    #[error("unknown temporary %t{0}")]
    UnknownTemp(u32),

    /// Operand types the operation has no semantics for
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// Integer division or remainder by zero
    #[error("division by zero")]
    DivisionByZero,

    /// Call with the wrong number of arguments
    #[error("function `{func}` expects {expected} arguments, got {got}")]
    ArityMismatch {
        func: String,
        expected: usize,
        got: usize,
    },

    /// Malformed `print` format string
    #[error("invalid format directive: {0}")]
    InvalidFormat(String),

    /// Execution fell off the end of a block without a terminator
    #[error("block `{0}` has no terminator")]
    MissingTerminator(String),

    /// Failure on the output stream
    #[error("output error: {0}")]
    Io(#[from] std::io::Error),
}
