//! lyra-ir - Intermediate Representation of the Lyra language
//!
//! Modules contain functions, functions contain basic blocks, and basic
//! blocks contain instructions.
//!
//! # Architecture
//!
//! ```text
//! AST (lyra-ast)
//!         ↓
//!    [Lowering]
//!         ↓
//!   IR Module
//!   ├── Functions
//!   │   └── Basic Blocks
//!   │       └── Instructions
//!   └── String constants
//!         ↓
//!   [Execution backend] (lyra-vm)
//! ```
//!
//! Lowering is a single recursive walk over the AST. The module is mutated
//! only during that walk and is frozen once `lower_program` returns, so
//! any number of backends may read it afterwards.

pub mod instruction;
pub mod lower;
pub mod module;
pub mod scope;
pub mod types;

pub use instruction::{BinaryOp, CompareOp, Instruction, Value};
pub use lower::{lower_program, lower_program_verbose, Lowerer};
pub use module::{BasicBlock, Function, Module, StringConst};
pub use scope::{Frame, ScopeStack};
pub use types::IrType;
