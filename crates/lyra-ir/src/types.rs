//! IR Type System
//!
//! The handful of primitive representations a Lyra value can have.

use std::fmt;

/// Low-level type of an IR value or storage slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IrType {
    /// Void / no value
    Void,
    /// 64-bit signed integer
    I64,
    /// 64-bit float
    F64,
    /// Opaque byte pointer (i8*), used for string constants
    BytePtr,
}

impl IrType {
    /// Resolves a surface type name to its IR representation.
    ///
    /// Total: unrecognized names degrade to `Void` instead of erroring.
    /// Callers must treat void-typed declarations as a latent defect in
    /// the input and say so on the diagnostics channel.
    pub fn resolve(name: &str) -> Self {
        match name {
            "Int" => IrType::I64,
            "Double" => IrType::F64,
            "String" => IrType::BytePtr,
            _ => IrType::Void,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, IrType::Void)
    }
}

impl fmt::Display for IrType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrType::Void => write!(f, "void"),
            IrType::I64 => write!(f, "i64"),
            IrType::F64 => write!(f, "f64"),
            IrType::BytePtr => write!(f, "i8*"),
        }
    }
}
