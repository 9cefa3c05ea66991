//! lyra-vm - Execution backend for Lyra IR modules
//!
//! A small interpreter that walks a frozen [`Module`](lyra_ir::Module)
//! instruction by instruction. It exists so generated IR can be run and
//! asserted against without a native toolchain; the IR itself stays
//! backend-agnostic.
//!
//! Integer arithmetic wraps at 64 bits, `div` and `mod` truncate toward
//! zero, and mixed int/float operands promote the integer side to f64.

pub mod error;
pub mod interp;

pub use error::VmError;
pub use interp::{RtValue, Vm};

use lyra_ir::Module;

/// Runs the module's entry function to completion, writing `print` output
/// to stdout
pub fn execute(module: &Module) -> Result<RtValue, VmError> {
    Vm::new(module).run()
}
