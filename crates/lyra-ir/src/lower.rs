//! Lowering AST → IR
//!
//! One recursive, depth-first walk over the AST. Statement lowering emits
//! into the block that is current for the function on top of the scope
//! stack; expression lowering returns the [`Value`] its parent consumes.
//! Emission order is exactly the source's left-to-right, top-to-bottom
//! evaluation order.
//!
//! Every failure is a typed [`CodegenError`] propagated with `?`; a failed
//! statement aborts the whole compilation so partial IR never reaches a
//! backend.

use crate::instruction::{BinaryOp, CompareOp, Instruction, Value};
use crate::module::{Function, Module};
use crate::scope::{Frame, ScopeStack};
use crate::types::IrType;
use lyra_ast::{BinOp, Block, Expr, FnDecl, Program, Stmt, UnaryOp};
use lyra_error::{CodegenError, Reporter, Result};

/// Name of the implicit entry function wrapping the top-level block
const ENTRY_NAME: &str = "main";

/// Converts an AST program to a finalized IR module
pub fn lower_program(program: &Program) -> Result<Module> {
    Lowerer::new(false).lower(program)
}

/// Same as [`lower_program`], with numbered progress messages enabled
pub fn lower_program_verbose(program: &Program) -> Result<Module> {
    Lowerer::new(true).lower(program)
}

/// Lowering context: the module being built, the scope stack, and the
/// diagnostics channel. Owned by the driver; there is no process-wide
/// state.
pub struct Lowerer {
    module: Module,
    scopes: ScopeStack,
    reporter: Reporter,
    /// Label counter for conditional blocks
    label_counter: u32,
}

impl Lowerer {
    pub fn new(verbose: bool) -> Self {
        Self {
            module: Module::new(ENTRY_NAME),
            scopes: ScopeStack::new(),
            reporter: Reporter::new(verbose),
            label_counter: 0,
        }
    }

    /// Builds the implicit parameterless entry function around the
    /// program's top-level block, lowers everything, appends the final
    /// return and freezes the module.
    pub fn lower(mut self, program: &Program) -> Result<Module> {
        self.reporter.note("running code generation");

        let entry = Function::new(ENTRY_NAME, IrType::Void);
        let entry_idx = self.module.functions.len();
        self.module.add_function(entry);

        self.with_frame(entry_idx, |l| {
            l.lower_block(&program.body)?;
            // The entry function gets its return appended even when the
            // top-level block never executed a return statement.
            if !l.func().current_block().is_terminated() {
                let value = l
                    .scopes
                    .current()
                    .return_value
                    .clone()
                    .unwrap_or(Value::Void);
                l.emit(Instruction::Return(value));
            }
            Ok(())
        })?;

        self.reporter.note("module assembled");
        self.module.verify()?;
        Ok(self.module)
    }

    /// Runs `body` with a frame for `func` on top of the stack. The frame
    /// is popped on every exit path, early error returns included.
    fn with_frame<T>(
        &mut self,
        func: usize,
        body: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        self.scopes.push(Frame::new(func));
        let result = body(self);
        self.scopes.pop();
        result
    }

    /// The function currently being built
    fn func(&self) -> &Function {
        &self.module.functions[self.scopes.current().func]
    }

    fn func_mut(&mut self) -> &mut Function {
        let idx = self.scopes.current().func;
        &mut self.module.functions[idx]
    }

    /// Adds an instruction to the current block of the current function
    fn emit(&mut self, inst: Instruction) {
        self.func_mut().emit(inst);
    }

    fn new_temp(&mut self) -> u32 {
        self.func_mut().new_temp()
    }

    /// Generates a unique block label
    fn new_label(&mut self, prefix: &str) -> String {
        let label = format!("{}_{}", prefix, self.label_counter);
        self.label_counter += 1;
        label
    }

    /// Lowers a statement block in source order.
    ///
    /// The block's value is the value of its last statement. Statements
    /// after a terminator in the current basic block are unreachable and
    /// skipped, keeping the single-trailing-terminator invariant intact.
    fn lower_block(&mut self, block: &Block) -> Result<Value> {
        let mut last = Value::Void;
        for stmt in &block.statements {
            if self.func().current_block().is_terminated() {
                self.reporter.note("skipping unreachable statements after terminator");
                break;
            }
            last = self.lower_stmt(stmt)?;
        }
        self.reporter.note("block lowered");
        Ok(last)
    }

    /// Converts one statement to IR
    fn lower_stmt(&mut self, stmt: &Stmt) -> Result<Value> {
        match stmt {
            Stmt::Expr(expr) => {
                self.reporter.note("generating code for expression statement");
                self.lower_expr(expr)
            }

            Stmt::VarDecl { name, ty, init } => self.lower_var_decl(name, ty, init.as_ref()),

            Stmt::Assign { target, value } => self.lower_assign(target, value),

            Stmt::Return(expr) => {
                self.reporter.note("generating code for return statement");
                let value = self.lower_expr(expr)?;
                self.scopes.current_mut().return_value = Some(value.clone());
                self.emit(Instruction::Return(value.clone()));
                Ok(value)
            }

            Stmt::Fn(decl) => self.lower_fn_decl(decl),

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => self.lower_conditional(condition, then_branch, else_branch.as_ref()),
        }
    }

    /// Allocates a slot for a declaration and lowers any initializer as an
    /// ordinary assignment to the freshly declared variable.
    fn lower_var_decl(&mut self, name: &str, ty: &str, init: Option<&Expr>) -> Result<Value> {
        // The IR has no stack storage for string values.
        if ty == "String" {
            return Err(CodegenError::UnsupportedDeclaration {
                name: name.to_string(),
                ty: ty.to_string(),
            });
        }

        let ir_ty = IrType::resolve(ty);
        if ir_ty.is_void() {
            tracing::warn!(
                target: "lyra::codegen",
                "variable `{}` declared with unknown type `{}`, storing as void",
                name,
                ty
            );
        }

        self.reporter
            .note(format!("declaring variable [{}] of type [{}]", name, ty));
        self.emit(Instruction::Alloca {
            dest: name.to_string(),
            ty: ir_ty,
        });
        self.scopes
            .current_mut()
            .locals
            .insert(name.to_string(), ir_ty);

        if let Some(expr) = init {
            self.lower_assign(name, expr)?;
        }
        Ok(Value::Void)
    }

    /// Stores the lowered right-hand side into an already declared slot
    fn lower_assign(&mut self, target: &str, value: &Expr) -> Result<Value> {
        if !self.scopes.current().locals.contains_key(target) {
            return Err(CodegenError::UndeclaredVariable(target.to_string()));
        }

        let value = self.lower_expr(value)?;
        self.emit(Instruction::Store {
            value,
            ptr: Value::local(target),
        });
        Ok(Value::Void)
    }

    /// Builds a function's signature, registers it in the module (so calls
    /// to it - recursive ones included - resolve), then lowers the body in
    /// a fresh frame with every parameter materialized as a local slot.
    fn lower_fn_decl(&mut self, decl: &FnDecl) -> Result<Value> {
        let mut func = Function::new(&decl.name, IrType::resolve(&decl.return_type));
        for param in &decl.params {
            func.add_param(&param.name, IrType::resolve(&param.ty));
        }

        let func_idx = self.module.functions.len();
        self.module.add_function(func);

        self.with_frame(func_idx, |l| {
            for (i, param) in decl.params.iter().enumerate() {
                let ty = IrType::resolve(&param.ty);
                l.emit(Instruction::Alloca {
                    dest: param.name.clone(),
                    ty,
                });
                l.scopes
                    .current_mut()
                    .locals
                    .insert(param.name.clone(), ty);
                l.emit(Instruction::Store {
                    value: Value::Param(i),
                    ptr: Value::local(&param.name),
                });
            }

            l.lower_block(&decl.body)?;

            // The final return is built from whatever the body recorded; a
            // body that never executed a return statement is a hard error.
            let recorded = l.scopes.current().return_value.clone();
            match recorded {
                None => Err(CodegenError::MissingReturn(decl.name.clone())),
                Some(value) => {
                    if !l.func().current_block().is_terminated() {
                        l.emit(Instruction::Return(value));
                    }
                    Ok(())
                }
            }
        })?;

        self.reporter
            .note(format!("created function {}", decl.name));
        Ok(Value::Void)
    }

    /// Lowers `if`/`else`: the condition in the block active on entry,
    /// each arm lazily in its own block, and a merge block that subsequent
    /// lowering resumes in. Arms that already returned do not branch to
    /// merge.
    fn lower_conditional(
        &mut self,
        condition: &Expr,
        then_branch: &Block,
        else_branch: Option<&Block>,
    ) -> Result<Value> {
        let cond = self.lower_expr(condition)?;

        let then_label = self.new_label("then");
        let else_label = self.new_label("else");
        let merge_label = self.new_label("ifcont");

        self.emit(Instruction::CondBranch {
            cond,
            then_label: then_label.clone(),
            else_label: else_label.clone(),
        });

        // Then arm
        self.func_mut().new_block(&then_label);
        self.lower_block(then_branch)?;
        if !self.func().current_block().is_terminated() {
            self.emit(Instruction::Branch {
                target: merge_label.clone(),
            });
        }

        // Else arm
        self.func_mut().new_block(&else_label);
        if let Some(branch) = else_branch {
            self.lower_block(branch)?;
        }
        if !self.func().current_block().is_terminated() {
            self.emit(Instruction::Branch {
                target: merge_label.clone(),
            });
        }

        // Subsequent lowering resumes here
        self.func_mut().new_block(&merge_label);
        Ok(Value::Void)
    }

    /// Converts an expression and returns the resulting Value
    fn lower_expr(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Int(v) => Ok(Value::ConstInt(*v)),

            Expr::Float(v) => Ok(Value::const_float(*v)),

            Expr::Str(raw) => {
                let bytes = decode_string_literal(raw)?;
                let label = self.module.intern_string(bytes);
                Ok(Value::Global(label))
            }

            Expr::Ident(name) => {
                let ty = self
                    .scopes
                    .current()
                    .locals
                    .get(name)
                    .copied()
                    .ok_or_else(|| CodegenError::UndeclaredVariable(name.clone()))?;

                let dest = self.new_temp();
                self.emit(Instruction::Load {
                    dest,
                    ptr: Value::local(name),
                    ty,
                });
                Ok(Value::Temp(dest))
            }

            Expr::Call { callee, args } => self.lower_call(callee, args),

            Expr::Binary { op, left, right } => {
                // Strict left-to-right, both operands always evaluated.
                let left = self.lower_expr(left)?;
                let right = self.lower_expr(right)?;
                let dest = self.new_temp();

                match binary_op(*op) {
                    OpKind::Arith(op) => self.emit(Instruction::Binary {
                        dest,
                        op,
                        left,
                        right,
                    }),
                    OpKind::Cmp(op) => self.emit(Instruction::Compare {
                        dest,
                        op,
                        left,
                        right,
                    }),
                }
                Ok(Value::Temp(dest))
            }

            Expr::Unary { op, operand } => {
                // A new value at the operand's width; the operand's storage
                // is never written back.
                let value = self.lower_expr(operand)?;
                let dest = self.new_temp();
                let op = match op {
                    UnaryOp::Inc => BinaryOp::Add,
                    UnaryOp::Dec => BinaryOp::Sub,
                };
                self.emit(Instruction::Binary {
                    dest,
                    op,
                    left: value,
                    right: Value::ConstInt(1),
                });
                Ok(Value::Temp(dest))
            }

            Expr::Not(_) => Err(CodegenError::UnsupportedConstruct("logical inversion")),
        }
    }

    /// Lowers a call: module functions first, then the `print` builtin;
    /// anything else is undefined. Arguments lower strictly left to right.
    fn lower_call(&mut self, callee: &str, args: &[Expr]) -> Result<Value> {
        if self.module.get_function(callee).is_none() && callee != "print" {
            return Err(CodegenError::UndefinedFunction(callee.to_string()));
        }

        let mut lowered = Vec::with_capacity(args.len());
        for arg in args {
            lowered.push(self.lower_expr(arg)?);
        }

        let dest = self.new_temp();
        self.emit(Instruction::Call {
            dest: Some(dest),
            func: callee.to_string(),
            args: lowered,
        });
        self.reporter.note(format!("created call to {}", callee));
        Ok(Value::Temp(dest))
    }
}

enum OpKind {
    Arith(BinaryOp),
    Cmp(CompareOp),
}

fn binary_op(op: BinOp) -> OpKind {
    match op {
        BinOp::Add => OpKind::Arith(BinaryOp::Add),
        BinOp::Sub => OpKind::Arith(BinaryOp::Sub),
        BinOp::Mul => OpKind::Arith(BinaryOp::Mul),
        BinOp::Div => OpKind::Arith(BinaryOp::Div),
        BinOp::Mod => OpKind::Arith(BinaryOp::Mod),
        BinOp::Eq => OpKind::Cmp(CompareOp::Eq),
        BinOp::Ne => OpKind::Cmp(CompareOp::Ne),
        BinOp::Lt => OpKind::Cmp(CompareOp::Lt),
        BinOp::Le => OpKind::Cmp(CompareOp::Le),
        BinOp::Gt => OpKind::Cmp(CompareOp::Gt),
        BinOp::Ge => OpKind::Cmp(CompareOp::Ge),
    }
}

/// Strips the quote delimiters, decodes `\n` escapes and appends the NUL
/// terminator. A literal without both delimiters is malformed.
fn decode_string_literal(raw: &str) -> Result<Vec<u8>> {
    let inner = raw
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .ok_or_else(|| CodegenError::MalformedLiteral(raw.to_string()))?;

    let mut bytes = inner.replace("\\n", "\n").into_bytes();
    bytes.push(0);
    Ok(bytes)
}
