//! IR interpreter
//!
//! Executes one function frame at a time: slots and temporaries live in a
//! per-call [`ExecFrame`], control moves between basic blocks by label, and
//! every block must end in the terminator that decides where execution goes
//! next.

use crate::error::VmError;
use lyra_ir::{BinaryOp, CompareOp, Function, Instruction, IrType, Module, Value};
use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};

/// Name of the function execution starts from
const ENTRY_NAME: &str = "main";

/// A runtime value produced while interpreting
#[derive(Debug, Clone, PartialEq)]
pub enum RtValue {
    /// No value
    Unit,
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit float
    Float(f64),
    /// Comparison result
    Bool(bool),
    /// String constant payload, NUL terminator stripped
    Str(String),
}

impl fmt::Display for RtValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RtValue::Unit => write!(f, "()"),
            RtValue::Int(v) => write!(f, "{}", v),
            RtValue::Float(v) => write!(f, "{}", v),
            RtValue::Bool(v) => write!(f, "{}", v),
            RtValue::Str(s) => write!(f, "{}", s),
        }
    }
}

/// Per-call state: arguments, named slots and instruction results
struct ExecFrame {
    args: Vec<RtValue>,
    locals: HashMap<String, RtValue>,
    temps: HashMap<u32, RtValue>,
}

/// The interpreter. Borrows a frozen module and owns the output stream the
/// `print` builtin writes to.
pub struct Vm<'m, W: Write> {
    module: &'m Module,
    out: W,
}

impl<'m> Vm<'m, io::Stdout> {
    pub fn new(module: &'m Module) -> Self {
        Self {
            module,
            out: io::stdout(),
        }
    }
}

impl<'m, W: Write> Vm<'m, W> {
    /// Builds a VM writing `print` output to the given stream
    pub fn with_writer(module: &'m Module, out: W) -> Self {
        Self { module, out }
    }

    /// Runs the entry function to completion
    pub fn run(&mut self) -> Result<RtValue, VmError> {
        self.call_function(ENTRY_NAME, Vec::new())
            .map_err(|e| match e {
                VmError::UnknownFunction(name) if name == ENTRY_NAME => VmError::MissingEntry,
                other => other,
            })
    }

    /// Calls a module function by name
    pub fn call_function(&mut self, name: &str, args: Vec<RtValue>) -> Result<RtValue, VmError> {
        let func = self
            .module
            .get_function(name)
            .ok_or_else(|| VmError::UnknownFunction(name.to_string()))?;
        self.exec_function(func, args)
    }

    fn exec_function(&mut self, func: &Function, args: Vec<RtValue>) -> Result<RtValue, VmError> {
        if args.len() != func.params.len() {
            return Err(VmError::ArityMismatch {
                func: func.name.clone(),
                expected: func.params.len(),
                got: args.len(),
            });
        }

        tracing::trace!(target: "lyra::vm", function = %func.name, "entering");

        let mut frame = ExecFrame {
            args,
            locals: HashMap::new(),
            temps: HashMap::new(),
        };
        let mut block = func
            .blocks
            .first()
            .ok_or_else(|| VmError::UnknownBlock("entry".to_string()))?;

        'blocks: loop {
            for inst in &block.instructions {
                match inst {
                    Instruction::Alloca { dest, ty } => {
                        frame.locals.insert(dest.clone(), default_value(*ty));
                    }

                    Instruction::Store { value, ptr } => {
                        let value = self.eval(&frame, value)?;
                        match ptr {
                            Value::Local(name) => {
                                frame.locals.insert(name.clone(), value);
                            }
                            other => {
                                return Err(VmError::TypeMismatch(format!(
                                    "store target `{}` is not a slot",
                                    other
                                )))
                            }
                        }
                    }

                    Instruction::Load { dest, ptr, .. } => {
                        let value = match ptr {
                            Value::Local(name) => frame
                                .locals
                                .get(name)
                                .cloned()
                                .ok_or_else(|| VmError::UninitializedSlot(name.clone()))?,
                            other => {
                                return Err(VmError::TypeMismatch(format!(
                                    "load source `{}` is not a slot",
                                    other
                                )))
                            }
                        };
                        frame.temps.insert(*dest, value);
                    }

                    Instruction::Binary {
                        dest,
                        op,
                        left,
                        right,
                    } => {
                        let left = self.eval(&frame, left)?;
                        let right = self.eval(&frame, right)?;
                        frame.temps.insert(*dest, arith(*op, left, right)?);
                    }

                    Instruction::Compare {
                        dest,
                        op,
                        left,
                        right,
                    } => {
                        let left = self.eval(&frame, left)?;
                        let right = self.eval(&frame, right)?;
                        frame.temps.insert(*dest, compare(*op, left, right)?);
                    }

                    Instruction::Call {
                        dest,
                        func: callee,
                        args,
                    } => {
                        let mut vals = Vec::with_capacity(args.len());
                        for arg in args {
                            vals.push(self.eval(&frame, arg)?);
                        }
                        let result = if let Some(target) = self.module.get_function(callee) {
                            self.exec_function(target, vals)?
                        } else if callee == "print" {
                            self.print(&vals)?
                        } else {
                            return Err(VmError::UnknownFunction(callee.clone()));
                        };
                        if let Some(dest) = dest {
                            frame.temps.insert(*dest, result);
                        }
                    }

                    Instruction::Return(value) => {
                        return self.eval(&frame, value);
                    }

                    Instruction::Branch { target } => {
                        block = func
                            .get_block(target)
                            .ok_or_else(|| VmError::UnknownBlock(target.clone()))?;
                        continue 'blocks;
                    }

                    Instruction::CondBranch {
                        cond,
                        then_label,
                        else_label,
                    } => {
                        let cond = self.eval(&frame, cond)?;
                        let label = if truthy(&cond)? { then_label } else { else_label };
                        block = func
                            .get_block(label)
                            .ok_or_else(|| VmError::UnknownBlock(label.clone()))?;
                        continue 'blocks;
                    }
                }
            }
            return Err(VmError::MissingTerminator(block.label.clone()));
        }
    }

    /// Resolves an operand to a runtime value
    fn eval(&self, frame: &ExecFrame, value: &Value) -> Result<RtValue, VmError> {
        match value {
            Value::ConstInt(v) => Ok(RtValue::Int(*v)),
            Value::ConstFloat(bits) => Ok(RtValue::Float(f64::from_bits(*bits))),
            Value::Global(label) => {
                let s = self
                    .module
                    .get_string(label)
                    .ok_or_else(|| VmError::UninitializedSlot(label.clone()))?;
                let bytes = s.bytes.strip_suffix(&[0]).unwrap_or(&s.bytes);
                Ok(RtValue::Str(String::from_utf8_lossy(bytes).into_owned()))
            }
            Value::Local(name) => frame
                .locals
                .get(name)
                .cloned()
                .ok_or_else(|| VmError::UninitializedSlot(name.clone())),
            Value::Param(idx) => frame
                .args
                .get(*idx)
                .cloned()
                .ok_or_else(|| VmError::TypeMismatch(format!("argument %arg{} out of range", idx))),
            Value::Temp(id) => frame
                .temps
                .get(id)
                .cloned()
                .ok_or(VmError::UnknownTemp(*id)),
            Value::Void => Ok(RtValue::Unit),
        }
    }

    /// The `print` builtin: printf-style formatting of its first argument.
    ///
    /// Supports `%d`/`%i`, `%f`, `%s` and `%%`; `l` length prefixes are
    /// accepted and ignored. Returns the number of bytes written.
    fn print(&mut self, args: &[RtValue]) -> Result<RtValue, VmError> {
        let format = match args.first() {
            Some(RtValue::Str(s)) => s,
            Some(other) => {
                return Err(VmError::TypeMismatch(format!(
                    "print expects a format string, got `{}`",
                    other
                )))
            }
            None => {
                return Err(VmError::ArityMismatch {
                    func: "print".to_string(),
                    expected: 1,
                    got: 0,
                })
            }
        };

        let mut rendered = String::new();
        let mut next_arg = 1;
        let mut chars = format.chars().peekable();
        while let Some(c) = chars.next() {
            if c != '%' {
                rendered.push(c);
                continue;
            }
            while chars.peek() == Some(&'l') {
                chars.next();
            }
            let directive = chars
                .next()
                .ok_or_else(|| VmError::InvalidFormat("dangling `%`".to_string()))?;
            if directive == '%' {
                rendered.push('%');
                continue;
            }

            let arg = args.get(next_arg).ok_or_else(|| VmError::ArityMismatch {
                func: "print".to_string(),
                expected: next_arg + 1,
                got: args.len(),
            })?;
            next_arg += 1;

            match (directive, arg) {
                ('d' | 'i', RtValue::Int(v)) => rendered.push_str(&v.to_string()),
                ('d' | 'i', RtValue::Bool(v)) => rendered.push_str(if *v { "1" } else { "0" }),
                ('f', RtValue::Float(v)) => rendered.push_str(&format!("{:.6}", v)),
                ('f', RtValue::Int(v)) => rendered.push_str(&format!("{:.6}", *v as f64)),
                ('s', RtValue::Str(s)) => rendered.push_str(s),
                ('d' | 'i' | 'f' | 's', other) => {
                    return Err(VmError::TypeMismatch(format!(
                        "`%{}` cannot format `{}`",
                        directive, other
                    )))
                }
                (other, _) => {
                    return Err(VmError::InvalidFormat(format!("unknown directive `%{}`", other)))
                }
            }
        }

        self.out.write_all(rendered.as_bytes())?;
        self.out.flush()?;
        Ok(RtValue::Int(rendered.len() as i64))
    }
}

/// Zero value a freshly allocated slot starts out holding
fn default_value(ty: IrType) -> RtValue {
    match ty {
        IrType::Void => RtValue::Unit,
        IrType::I64 => RtValue::Int(0),
        IrType::F64 => RtValue::Float(0.0),
        IrType::BytePtr => RtValue::Str(String::new()),
    }
}

/// Arithmetic: wrapping at 64 bits for integers, promotion to f64 for
/// mixed operands, truncation toward zero for `div` and `mod`
fn arith(op: BinaryOp, left: RtValue, right: RtValue) -> Result<RtValue, VmError> {
    match (left, right) {
        (RtValue::Int(l), RtValue::Int(r)) => {
            let v = match op {
                BinaryOp::Add => l.wrapping_add(r),
                BinaryOp::Sub => l.wrapping_sub(r),
                BinaryOp::Mul => l.wrapping_mul(r),
                BinaryOp::Div => {
                    if r == 0 {
                        return Err(VmError::DivisionByZero);
                    }
                    l.wrapping_div(r)
                }
                BinaryOp::Mod => {
                    if r == 0 {
                        return Err(VmError::DivisionByZero);
                    }
                    l.wrapping_rem(r)
                }
            };
            Ok(RtValue::Int(v))
        }
        (left, right) => {
            let (l, r) = (as_float(&left)?, as_float(&right)?);
            let v = match op {
                BinaryOp::Add => l + r,
                BinaryOp::Sub => l - r,
                BinaryOp::Mul => l * r,
                BinaryOp::Div => l / r,
                BinaryOp::Mod => l % r,
            };
            Ok(RtValue::Float(v))
        }
    }
}

fn compare(op: CompareOp, left: RtValue, right: RtValue) -> Result<RtValue, VmError> {
    let v = match (&left, &right) {
        (RtValue::Int(l), RtValue::Int(r)) => match op {
            CompareOp::Eq => l == r,
            CompareOp::Ne => l != r,
            CompareOp::Lt => l < r,
            CompareOp::Le => l <= r,
            CompareOp::Gt => l > r,
            CompareOp::Ge => l >= r,
        },
        (RtValue::Str(l), RtValue::Str(r)) => match op {
            CompareOp::Eq => l == r,
            CompareOp::Ne => l != r,
            _ => {
                return Err(VmError::TypeMismatch(format!(
                    "cannot order `{}` against `{}`",
                    left, right
                )))
            }
        },
        _ => {
            let (l, r) = (as_float(&left)?, as_float(&right)?);
            match op {
                CompareOp::Eq => l == r,
                CompareOp::Ne => l != r,
                CompareOp::Lt => l < r,
                CompareOp::Le => l <= r,
                CompareOp::Gt => l > r,
                CompareOp::Ge => l >= r,
            }
        }
    };
    Ok(RtValue::Bool(v))
}

fn as_float(value: &RtValue) -> Result<f64, VmError> {
    match value {
        RtValue::Int(v) => Ok(*v as f64),
        RtValue::Float(v) => Ok(*v),
        other => Err(VmError::TypeMismatch(format!(
            "`{}` is not numeric",
            other
        ))),
    }
}

/// Branch condition truthiness: booleans as-is, integers nonzero
fn truthy(value: &RtValue) -> Result<bool, VmError> {
    match value {
        RtValue::Bool(v) => Ok(*v),
        RtValue::Int(v) => Ok(*v != 0),
        other => Err(VmError::TypeMismatch(format!(
            "`{}` is not a branch condition",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lyra_ir::Function;

    fn run(module: &Module) -> (Result<RtValue, VmError>, String) {
        let mut out = Vec::new();
        let result = Vm::with_writer(module, &mut out).run();
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_return_constant() {
        let mut module = Module::new("t");
        let mut main = Function::new("main", IrType::I64);
        main.emit(Instruction::Return(Value::ConstInt(7)));
        module.add_function(main);

        let (result, _) = run(&module);
        assert_eq!(result.unwrap(), RtValue::Int(7));
    }

    #[test]
    fn test_slot_round_trip() {
        let mut module = Module::new("t");
        let mut main = Function::new("main", IrType::I64);
        main.emit(Instruction::Alloca {
            dest: "x".to_string(),
            ty: IrType::I64,
        });
        main.emit(Instruction::Store {
            value: Value::ConstInt(10),
            ptr: Value::local("x"),
        });
        let t0 = main.new_temp();
        main.emit(Instruction::Load {
            dest: t0,
            ptr: Value::local("x"),
            ty: IrType::I64,
        });
        let t1 = main.new_temp();
        main.emit(Instruction::Binary {
            dest: t1,
            op: BinaryOp::Add,
            left: Value::Temp(t0),
            right: Value::ConstInt(1),
        });
        main.emit(Instruction::Return(Value::Temp(t1)));
        module.add_function(main);

        let (result, _) = run(&module);
        assert_eq!(result.unwrap(), RtValue::Int(11));
    }

    #[test]
    fn test_division_truncates_toward_zero() {
        assert_eq!(
            arith(BinaryOp::Div, RtValue::Int(-7), RtValue::Int(2)).unwrap(),
            RtValue::Int(-3)
        );
        assert_eq!(
            arith(BinaryOp::Mod, RtValue::Int(-7), RtValue::Int(2)).unwrap(),
            RtValue::Int(-1)
        );
    }

    #[test]
    fn test_division_by_zero() {
        assert!(matches!(
            arith(BinaryOp::Div, RtValue::Int(1), RtValue::Int(0)),
            Err(VmError::DivisionByZero)
        ));
    }

    #[test]
    fn test_mixed_operands_promote() {
        assert_eq!(
            arith(BinaryOp::Mul, RtValue::Int(2), RtValue::Float(1.5)).unwrap(),
            RtValue::Float(3.0)
        );
    }

    #[test]
    fn test_print_formats_and_returns_byte_count() {
        let mut module = Module::new("t");
        let label = module.intern_string(b"x=%d\n\0".to_vec());
        let mut main = Function::new("main", IrType::Void);
        let t0 = main.new_temp();
        main.emit(Instruction::Call {
            dest: Some(t0),
            func: "print".to_string(),
            args: vec![Value::Global(label), Value::ConstInt(42)],
        });
        main.emit(Instruction::Return(Value::Temp(t0)));
        module.add_function(main);

        let (result, output) = run(&module);
        assert_eq!(output, "x=42\n");
        assert_eq!(result.unwrap(), RtValue::Int(5));
    }

    #[test]
    fn test_missing_entry() {
        let module = Module::new("t");
        let (result, _) = run(&module);
        assert!(matches!(result, Err(VmError::MissingEntry)));
    }

    #[test]
    fn test_branching() {
        let mut module = Module::new("t");
        let mut main = Function::new("main", IrType::I64);
        let t0 = main.new_temp();
        main.emit(Instruction::Compare {
            dest: t0,
            op: CompareOp::Lt,
            left: Value::ConstInt(1),
            right: Value::ConstInt(2),
        });
        main.emit(Instruction::CondBranch {
            cond: Value::Temp(t0),
            then_label: "then_0".to_string(),
            else_label: "else_1".to_string(),
        });
        main.new_block("then_0");
        main.emit(Instruction::Return(Value::ConstInt(1)));
        main.new_block("else_1");
        main.emit(Instruction::Return(Value::ConstInt(2)));
        module.add_function(main);

        let (result, _) = run(&module);
        assert_eq!(result.unwrap(), RtValue::Int(1));
    }
}
