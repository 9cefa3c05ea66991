//! Integration tests for the Lyra code generator
//!
//! This crate provides end-to-end testing of the complete pipeline:
//! AST → Lowering → IR Module → VM execution
//!
//! There is no front end here: programs are built directly as ASTs with the
//! `lyra-ast` constructors, exactly the shape the (external) parser hands
//! the generator.

use lyra_ast::{Block, Expr, Program, Stmt};
use lyra_error::Result;
use lyra_ir::{lower_program, Module};
use lyra_vm::{RtValue, Vm};

/// Lowers a top-level statement list into an IR module
pub fn compile(statements: Vec<Stmt>) -> Result<Module> {
    lower_program(&Program::new(Block::new(statements)))
}

/// Lowers and executes a program, capturing everything `print` writes.
///
/// Panics on compilation or runtime failure so tests read as straight-line
/// assertions.
pub fn run(statements: Vec<Stmt>) -> (RtValue, String) {
    let module = compile(statements).unwrap_or_else(|e| panic!("compilation failed: {}", e));
    let mut out = Vec::new();
    let result = Vm::with_writer(&module, &mut out)
        .run()
        .unwrap_or_else(|e| panic!("execution failed: {}", e));
    (result, String::from_utf8(out).expect("print output is UTF-8"))
}

/// Asserts that a program fails to lower
pub fn assert_lowering_fails(statements: Vec<Stmt>) {
    if let Ok(module) = compile(statements) {
        panic!(
            "Expected lowering to fail, but it produced:\n{}",
            module
        );
    }
}

/// Asserts that a program lowers and its printed IR contains a string
pub fn assert_ir_contains(statements: Vec<Stmt>, expected: &str) {
    let module = compile(statements).unwrap_or_else(|e| panic!("compilation failed: {}", e));
    let ir = module.to_string();
    if !ir.contains(expected) {
        panic!(
            "Expected IR to contain '{}', but it didn't.\n\nGenerated IR:\n{}",
            expected, ir
        );
    }
}

/// Shorthand for an `Int` variable declaration
pub fn decl_int(name: &str, init: Expr) -> Stmt {
    Stmt::VarDecl {
        name: name.to_string(),
        ty: "Int".to_string(),
        init: Some(init),
    }
}

/// Shorthand for an assignment statement
pub fn assign(target: &str, value: Expr) -> Stmt {
    Stmt::Assign {
        target: target.to_string(),
        value,
    }
}

#[cfg(test)]
mod lowering_tests {
    use super::*;
    use lyra_ast::{BinOp, FnDecl, Param, UnaryOp};
    use pretty_assertions::assert_eq;

    // =========================================
    // IR structure tests
    // =========================================

    #[test]
    fn test_empty_program_lowers_to_void_entry() {
        assert_ir_contains(vec![], "define void@main()");
        assert_ir_contains(vec![], "ret void");
    }

    #[test]
    fn test_function_signature() {
        assert_ir_contains(
            vec![Stmt::Fn(FnDecl {
                name: "double".to_string(),
                params: vec![Param::new("x", "Int")],
                return_type: "Int".to_string(),
                body: Block::new(vec![Stmt::Return(Expr::binary(
                    BinOp::Mul,
                    Expr::ident("x"),
                    Expr::Int(2),
                ))]),
            })],
            "define i64@double(i64 %x)",
        );
    }

    #[test]
    fn test_declaration_allocates_and_stores() {
        let statements = vec![decl_int("x", Expr::Int(10))];
        assert_ir_contains(statements.clone(), "%x = alloca i64");
        assert_ir_contains(statements, "store 10, %x");
    }

    #[test]
    fn test_unknown_type_degrades_to_void_slot() {
        // Unrecognized surface types warn but still get a slot.
        assert_ir_contains(
            vec![Stmt::VarDecl {
                name: "v".to_string(),
                ty: "Vector".to_string(),
                init: None,
            }],
            "%v = alloca void",
        );
    }

    #[test]
    fn test_comparison_lowered_as_cmp() {
        assert_ir_contains(
            vec![Stmt::Return(Expr::binary(
                BinOp::Le,
                Expr::Int(1),
                Expr::Int(2),
            ))],
            "cmp le 1, 2",
        );
    }

    #[test]
    fn test_conditional_produces_labeled_blocks() {
        let statements = vec![
            decl_int("x", Expr::Int(0)),
            Stmt::If {
                condition: Expr::binary(BinOp::Gt, Expr::ident("x"), Expr::Int(0)),
                then_branch: Block::new(vec![assign("x", Expr::Int(1))]),
                else_branch: None,
            },
            Stmt::Return(Expr::ident("x")),
        ];
        assert_ir_contains(statements.clone(), "then_0:");
        assert_ir_contains(statements.clone(), "else_1:");
        assert_ir_contains(statements, "ifcont_2:");
    }

    #[test]
    fn test_every_block_is_terminated() {
        let module = compile(vec![
            decl_int("x", Expr::Int(0)),
            Stmt::If {
                condition: Expr::ident("x"),
                then_branch: Block::new(vec![assign("x", Expr::Int(1))]),
                else_branch: Some(Block::new(vec![assign("x", Expr::Int(2))])),
            },
            Stmt::Return(Expr::ident("x")),
        ])
        .unwrap();

        for func in &module.functions {
            for block in &func.blocks {
                assert!(
                    block.is_terminated(),
                    "block {} in {} is open",
                    block.label,
                    func.name
                );
            }
        }
    }

    #[test]
    fn test_string_literal_becomes_global() {
        let module = compile(vec![Stmt::Expr(Expr::call(
            "print",
            vec![Expr::string("\"Hello, World!\\n\"")],
        ))])
        .unwrap();

        assert_eq!(module.strings.len(), 1);
        assert_eq!(module.strings[0].bytes, b"Hello, World!\n\0");
        assert!(module.to_string().contains("@.str0 = private constant"));
    }

    #[test]
    fn test_repeated_literal_gets_fresh_globals() {
        let module = compile(vec![
            Stmt::Expr(Expr::call("print", vec![Expr::string("\"x\"")])),
            Stmt::Expr(Expr::call("print", vec![Expr::string("\"x\"")])),
        ])
        .unwrap();
        assert_eq!(module.strings.len(), 2);
    }

    #[test]
    fn test_verbose_lowering_succeeds() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        let module = lyra_ir::lower_program_verbose(&Program::new(Block::new(vec![
            Stmt::Return(Expr::Int(1)),
        ])))
        .unwrap();
        assert!(module.get_function("main").is_some());
    }

    // =========================================
    // Error tests
    // =========================================

    #[test]
    fn test_undeclared_identifier_fails() {
        assert_lowering_fails(vec![Stmt::Return(Expr::ident("ghost"))]);
    }

    #[test]
    fn test_assignment_to_undeclared_fails() {
        assert_lowering_fails(vec![assign("ghost", Expr::Int(1))]);
    }

    #[test]
    fn test_undefined_function_fails() {
        assert_lowering_fails(vec![Stmt::Expr(Expr::call("ghost", vec![Expr::Int(1)]))]);
    }

    #[test]
    fn test_string_variable_fails() {
        assert_lowering_fails(vec![Stmt::VarDecl {
            name: "s".to_string(),
            ty: "String".to_string(),
            init: Some(Expr::string("\"hi\"")),
        }]);
    }

    #[test]
    fn test_function_without_return_fails() {
        assert_lowering_fails(vec![Stmt::Fn(FnDecl {
            name: "noop".to_string(),
            params: vec![],
            return_type: "Int".to_string(),
            body: Block::new(vec![decl_int("x", Expr::Int(1))]),
        })]);
    }

    #[test]
    fn test_parameters_do_not_leak_to_top_level() {
        // `a` exists only inside `id`; the top level cannot read it.
        assert_lowering_fails(vec![
            Stmt::Fn(FnDecl {
                name: "id".to_string(),
                params: vec![Param::new("a", "Int")],
                return_type: "Int".to_string(),
                body: Block::new(vec![Stmt::Return(Expr::ident("a"))]),
            }),
            Stmt::Return(Expr::ident("a")),
        ]);
    }

    #[test]
    fn test_increment_reads_but_never_writes() {
        let module = compile(vec![
            decl_int("x", Expr::Int(5)),
            Stmt::Expr(Expr::unary(UnaryOp::Inc, Expr::ident("x"))),
            Stmt::Return(Expr::ident("x")),
        ])
        .unwrap();

        // The only store to %x is the initializer.
        let main = module.get_function("main").unwrap();
        let stores = main
            .to_string()
            .lines()
            .filter(|l| l.contains("store") && l.contains("%x"))
            .count();
        assert_eq!(stores, 1);
    }
}
