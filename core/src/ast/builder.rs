//! Arena-backed construction of expression trees.

use bumpalo::Bump;

use super::{BinaryOp, Expr, Leaf, Literal, NAryOp, Slot, Stmt, TargetId, ValueType};

/// Allocates expression nodes in a `bumpalo` arena.
///
/// ```
/// use bumpalo::Bump;
/// use sizeguard_core::ast::{AstBuilder, BinaryOp, ValueType};
///
/// let arena = Bump::new();
/// let ast = AstBuilder::new(&arena);
/// let sum = ast.binary(BinaryOp::Add, ast.int(1), ast.operand(0, ValueType::Int));
/// assert_eq!(sum.ty(), ValueType::Int);
/// ```
#[derive(Clone, Copy)]
pub struct AstBuilder<'a> {
    arena: &'a Bump,
}

impl<'a> AstBuilder<'a> {
    pub fn new(arena: &'a Bump) -> Self {
        Self { arena }
    }

    pub fn arena(&self) -> &'a Bump {
        self.arena
    }

    pub fn alloc(&self, expr: Expr<'a>) -> &'a Expr<'a> {
        self.arena.alloc(expr)
    }

    pub fn int(&self, value: i32) -> &'a Expr<'a> {
        self.alloc(Expr::Leaf(Leaf::Const(Literal::Int(value))))
    }

    pub fn long(&self, value: i64) -> &'a Expr<'a> {
        self.alloc(Expr::Leaf(Leaf::Const(Literal::Long(value))))
    }

    pub fn str(&self, value: &str) -> &'a Expr<'a> {
        let value = self.arena.alloc_str(value);
        self.alloc(Expr::Leaf(Leaf::Const(Literal::Str(value))))
    }

    pub fn operand(&self, slot: Slot, ty: ValueType) -> &'a Expr<'a> {
        self.alloc(Expr::Leaf(Leaf::Operand { slot, ty }))
    }

    /// Binary node typed after its left operand.
    pub fn binary(&self, op: BinaryOp, left: &'a Expr<'a>, right: &'a Expr<'a>) -> &'a Expr<'a> {
        self.alloc(Expr::Binary {
            op,
            ty: left.ty(),
            left,
            right,
        })
    }

    pub fn concat(&self, operands: &[&'a Expr<'a>]) -> &'a Expr<'a> {
        self.alloc(Expr::NAry {
            op: NAryOp::Concat,
            operands: self.arena.alloc_slice_copy(operands),
        })
    }

    pub fn call(&self, target: TargetId, result: ValueType, args: &[&'a Expr<'a>]) -> &'a Expr<'a> {
        self.alloc(Expr::Call {
            target,
            result,
            args: self.arena.alloc_slice_copy(args),
        })
    }

    /// `((x0 op x1) op x2) op ...`, built bottom-up without recursion.
    ///
    /// Returns `None` when `operands` is empty.
    pub fn left_chain<I>(&self, op: BinaryOp, operands: I) -> Option<&'a Expr<'a>>
    where
        I: IntoIterator<Item = &'a Expr<'a>>,
    {
        let mut operands = operands.into_iter();
        let first = operands.next()?;
        Some(operands.fold(first, |acc, next| self.binary(op, acc, next)))
    }

    /// `x0 op (x1 op (x2 op ...))`, built bottom-up without recursion.
    pub fn right_chain<I>(&self, op: BinaryOp, operands: I) -> Option<&'a Expr<'a>>
    where
        I: IntoIterator<Item = &'a Expr<'a>>,
        I::IntoIter: DoubleEndedIterator,
    {
        let mut operands = operands.into_iter().rev();
        let last = operands.next()?;
        Some(operands.fold(last, |acc, prev| self.binary(op, prev, acc)))
    }

    /// Copies statements into the arena so they can back a `MethodDecl`.
    pub fn body(&self, statements: &[Stmt<'a>]) -> &'a [Stmt<'a>] {
        self.arena.alloc_slice_copy(statements)
    }
}
