//! Typed, resolved expression and statement trees.
//!
//! Trees are produced by an upstream phase (parsing, type checking and name
//! resolution all happen before code generation) and are read-only here.
//! Nodes live in a `bumpalo` arena and refer to their children by reference,
//! so very deep trees are freed in one shot instead of through a recursive
//! drop.

mod builder;
mod stmt;


use core::fmt;

use serde::{Deserialize, Serialize};

pub use builder::AstBuilder;
pub use stmt::{Label, MethodDecl, MethodKind, MethodSignature, Stmt, TypeDecl};

/// Index of a local variable / parameter slot.
pub type Slot = u16;

/// Identifier of a resolved static call target.
pub type TargetId = u16;

/// Identifier of a bootstrap method used by `CombineDynamic`.
pub type BootstrapId = u16;

/// Static type of a value on the operand stack.
///
/// `Long` is a two-slot value, everything else occupies one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    Int,
    Long,
    Str,
}

impl ValueType {
    /// Number of operand-stack slots a value of this type occupies.
    pub fn slots(self) -> u32 {
        match self {
            ValueType::Long => 2,
            ValueType::Int | ValueType::Str => 1,
        }
    }

    /// Source-level type name, as shown in method signatures.
    pub fn name(self) -> &'static str {
        match self {
            ValueType::Int => "int",
            ValueType::Long => "long",
            ValueType::Str => "String",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A literal constant as it appears in the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Literal<'a> {
    Int(i32),
    Long(i64),
    Str(&'a str),
}

impl Literal<'_> {
    pub fn ty(&self) -> ValueType {
        match self {
            Literal::Int(_) => ValueType::Int,
            Literal::Long(_) => ValueType::Long,
            Literal::Str(_) => ValueType::Str,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leaf<'a> {
    Const(Literal<'a>),
    /// A read of a local variable or parameter slot.
    Operand { slot: Slot, ty: ValueType },
}

impl Leaf<'_> {
    pub fn ty(&self) -> ValueType {
        match self {
            Leaf::Const(literal) => literal.ty(),
            Leaf::Operand { ty, .. } => *ty,
        }
    }
}

/// Binary arithmetic and bitwise operators.
///
/// Both operands and the result share the node's `ValueType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Associative operators that take any number of operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NAryOp {
    /// String concatenation; operands of any type are converted to strings.
    Concat,
}

/// A typed expression node.
///
/// Deliberately not `PartialEq`: comparing two deep trees structurally would
/// recurse once per level.
#[derive(Debug)]
pub enum Expr<'a> {
    Leaf(Leaf<'a>),
    Binary {
        op: BinaryOp,
        ty: ValueType,
        left: &'a Expr<'a>,
        right: &'a Expr<'a>,
    },
    NAry {
        op: NAryOp,
        operands: &'a [&'a Expr<'a>],
    },
    /// A resolved static call; arguments are evaluated left to right.
    Call {
        target: TargetId,
        result: ValueType,
        args: &'a [&'a Expr<'a>],
    },
}

impl<'a> Expr<'a> {
    /// Static type of the value this expression leaves on the stack.
    ///
    /// A one-operand concatenation passes its operand through unchanged, so
    /// it has the operand's type.
    pub fn ty(&self) -> ValueType {
        let mut node = self;
        loop {
            match node {
                Expr::Leaf(leaf) => return leaf.ty(),
                Expr::Binary { ty, .. } => return *ty,
                Expr::NAry { operands, .. } => match operands {
                    [single] => node = single,
                    _ => return ValueType::Str,
                },
                Expr::Call { result, .. } => return *result,
            }
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Expr::Leaf(_))
    }
}
