//! lyra-ast - Abstract syntax tree of the Lyra language
//!
//! The AST is the hand-off contract from the (external) front end: a closed
//! set of node kinds that the code generator pattern-matches exhaustively.
//! The tree carries surface type names verbatim; resolving them to IR types
//! is the generator's job, not the parser's.

/// A complete program: one top-level statement block
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub body: Block,
}

impl Program {
    pub fn new(body: Block) -> Self {
        Self { body }
    }
}

/// An ordered sequence of statements
///
/// Blocks do not open a scope of their own - scoping is per function.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub statements: Vec<Stmt>,
}

impl Block {
    pub fn new(statements: Vec<Stmt>) -> Self {
        Self { statements }
    }
}

/// A typed function parameter
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    /// Surface type name (`Int`, `Double`, `String`, ...)
    pub ty: String,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
        }
    }
}

/// A named function declaration
#[derive(Debug, Clone, PartialEq)]
pub struct FnDecl {
    pub name: String,
    pub params: Vec<Param>,
    /// Surface name of the declared return type
    pub return_type: String,
    pub body: Block,
}

/// Statement node kinds
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// Expression evaluated for its side effects
    Expr(Expr),
    /// Variable declaration with optional initializer
    VarDecl {
        name: String,
        /// Surface type name
        ty: String,
        init: Option<Expr>,
    },
    /// Assignment to an already declared variable
    Assign { target: String, value: Expr },
    /// Return from the enclosing function
    Return(Expr),
    /// Nested function declaration
    Fn(FnDecl),
    /// Two-way conditional
    If {
        condition: Expr,
        then_branch: Block,
        else_branch: Option<Block>,
    },
}

/// Binary operators: arithmetic and signed comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Unary increment / decrement (non-mutating expressions)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Inc,
    Dec,
}

/// Expression node kinds
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Integer literal
    Int(i64),
    /// Floating-point literal
    Float(f64),
    /// String literal as lexed, quote delimiters included
    Str(String),
    /// Variable reference
    Ident(String),
    /// Call by function name
    Call { callee: String, args: Vec<Expr> },
    /// Binary operation, strict left-to-right evaluation
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Increment / decrement of an operand expression
    Unary { op: UnaryOp, operand: Box<Expr> },
    /// Logical inversion
    Not(Box<Expr>),
}

impl Expr {
    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Ident(name.into())
    }

    pub fn string(raw: impl Into<String>) -> Self {
        Expr::Str(raw.into())
    }

    pub fn call(callee: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Call {
            callee: callee.into(),
            args,
        }
    }

    pub fn binary(op: BinOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expr_builders() {
        let e = Expr::binary(BinOp::Add, Expr::Int(1), Expr::ident("x"));
        match e {
            Expr::Binary { op, left, right } => {
                assert_eq!(op, BinOp::Add);
                assert_eq!(*left, Expr::Int(1));
                assert_eq!(*right, Expr::Ident("x".to_string()));
            }
            other => panic!("unexpected node: {:?}", other),
        }
    }
}
