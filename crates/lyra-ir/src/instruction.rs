//! IR Instructions
//!
//! Low-level instructions emitted by lowering, one basic block at a time.

use crate::types::IrType;
use std::fmt;

/// The result of lowering an expression: an immutable, typed handle.
///
/// A value is created once and may be consumed by any number of later
/// instructions in the same function; it is never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    /// Integer constant
    ConstInt(i64),
    /// Float constant (f64 bits)
    ConstFloat(u64),
    /// Pointer to an interned string constant, by global label
    Global(String),
    /// Address of a stack-allocated slot, by variable name
    Local(String),
    /// Incoming function argument
    Param(usize),
    /// Result of a previous instruction
    Temp(u32),
    /// Void / no value
    Void,
}

impl Value {
    pub fn const_float(v: f64) -> Self {
        Value::ConstFloat(v.to_bits())
    }

    pub fn local(name: impl Into<String>) -> Self {
        Value::Local(name.into())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::ConstInt(v) => write!(f, "{}", v),
            Value::ConstFloat(bits) => write!(f, "{}", f64::from_bits(*bits)),
            Value::Global(label) => write!(f, "@{}", label),
            Value::Local(name) => write!(f, "%{}", name),
            Value::Param(idx) => write!(f, "%arg{}", idx),
            Value::Temp(id) => write!(f, "%t{}", id),
            Value::Void => write!(f, "void"),
        }
    }
}

/// Arithmetic operation, signed semantics for `div` and `mod`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BinaryOp::Add => write!(f, "add"),
            BinaryOp::Sub => write!(f, "sub"),
            BinaryOp::Mul => write!(f, "mul"),
            BinaryOp::Div => write!(f, "div"),
            BinaryOp::Mod => write!(f, "mod"),
        }
    }
}

/// Signed comparison producing a boolean-typed result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompareOp::Eq => write!(f, "eq"),
            CompareOp::Ne => write!(f, "ne"),
            CompareOp::Lt => write!(f, "lt"),
            CompareOp::Le => write!(f, "le"),
            CompareOp::Gt => write!(f, "gt"),
            CompareOp::Ge => write!(f, "ge"),
        }
    }
}

/// IR Instruction
#[derive(Debug, Clone)]
pub enum Instruction {
    /// Allocates a stack slot for a local variable
    /// %name = alloca type
    Alloca { dest: String, ty: IrType },

    /// Stores value through a slot pointer
    /// store value, ptr
    Store { value: Value, ptr: Value },

    /// Loads the value held by a slot
    /// %dest = load type ptr
    Load { dest: u32, ptr: Value, ty: IrType },

    /// Arithmetic operation
    /// %dest = op left, right
    Binary {
        dest: u32,
        op: BinaryOp,
        left: Value,
        right: Value,
    },

    /// Comparison
    /// %dest = cmp op left, right
    Compare {
        dest: u32,
        op: CompareOp,
        left: Value,
        right: Value,
    },

    /// Function call
    /// %dest = call @func(args...)
    Call {
        dest: Option<u32>,
        func: String,
        args: Vec<Value>,
    },

    /// Return
    /// ret value
    Return(Value),

    /// Unconditional branch
    /// br label
    Branch { target: String },

    /// Conditional branch
    /// br cond, then_label, else_label
    CondBranch {
        cond: Value,
        then_label: String,
        else_label: String,
    },
}

impl Instruction {
    /// Returns the instruction's destination temporary (if any)
    pub fn dest(&self) -> Option<u32> {
        match self {
            Instruction::Load { dest, .. } => Some(*dest),
            Instruction::Binary { dest, .. } => Some(*dest),
            Instruction::Compare { dest, .. } => Some(*dest),
            Instruction::Call { dest, .. } => *dest,
            _ => None,
        }
    }

    /// Checks if it is a block terminator instruction
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Instruction::Return(_) | Instruction::Branch { .. } | Instruction::CondBranch { .. }
        )
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Alloca { dest, ty } => {
                write!(f, "%{} = alloca {}", dest, ty)
            }
            Instruction::Store { value, ptr } => {
                write!(f, "store {}, {}", value, ptr)
            }
            Instruction::Load { dest, ptr, ty } => {
                write!(f, "%t{} = load {} {}", dest, ty, ptr)
            }
            Instruction::Binary {
                dest,
                op,
                left,
                right,
            } => {
                write!(f, "%t{} = {} {}, {}", dest, op, left, right)
            }
            Instruction::Compare {
                dest,
                op,
                left,
                right,
            } => {
                write!(f, "%t{} = cmp {} {}, {}", dest, op, left, right)
            }
            Instruction::Call { dest, func, args } => {
                if let Some(d) = dest {
                    write!(f, "%t{} = ", d)?;
                }
                write!(f, "call @{}(", func)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Instruction::Return(value) => {
                write!(f, "ret {}", value)
            }
            Instruction::Branch { target } => {
                write!(f, "br {}", target)
            }
            Instruction::CondBranch {
                cond,
                then_label,
                else_label,
            } => {
                write!(f, "br {}, {}, {}", cond, then_label, else_label)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instruction_display() {
        let inst = Instruction::Binary {
            dest: 0,
            op: BinaryOp::Add,
            left: Value::local("x"),
            right: Value::ConstInt(10),
        };
        assert_eq!(inst.to_string(), "%t0 = add %x, 10");
    }

    #[test]
    fn test_call_display() {
        let inst = Instruction::Call {
            dest: Some(1),
            func: "add".to_string(),
            args: vec![Value::ConstInt(2), Value::ConstInt(3)],
        };
        assert_eq!(inst.to_string(), "%t1 = call @add(2, 3)");
    }

    #[test]
    fn test_dest_reports_written_temp() {
        let inst = Instruction::Load {
            dest: 3,
            ptr: Value::local("x"),
            ty: IrType::I64,
        };
        assert_eq!(inst.dest(), Some(3));

        let inst = Instruction::Store {
            value: Value::ConstInt(1),
            ptr: Value::local("x"),
        };
        assert_eq!(inst.dest(), None);
    }

    #[test]
    fn test_terminators() {
        assert!(Instruction::Return(Value::Void).is_terminator());
        assert!(Instruction::Branch {
            target: "merge_0".to_string()
        }
        .is_terminator());
        assert!(!Instruction::Store {
            value: Value::ConstInt(1),
            ptr: Value::local("x"),
        }
        .is_terminator());
    }
}
