//! Statements, method declarations and type declarations.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::{BinaryOp, Expr, Slot};
use crate::api::Span;

/// A branch target inside one method body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Label(pub u32);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

/// A top-level statement of a method body.
///
/// Every statement leaves the operand stack as it found it.
#[derive(Debug, Clone, Copy)]
pub enum Stmt<'a> {
    /// No code at all.
    Empty,
    /// Evaluate and discard.
    Eval(&'a Expr<'a>),
    /// `slot = value`
    Store { slot: Slot, value: &'a Expr<'a> },
    /// `slot op= value`; the slot has the value's type.
    CompoundAssign {
        slot: Slot,
        op: BinaryOp,
        value: &'a Expr<'a>,
    },
    Label(Label),
    Goto(Label),
    Return(Option<&'a Expr<'a>>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MethodKind {
    Method,
    Constructor,
    StaticInitializer,
}

/// Identity of a method, used to label its diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodSignature {
    pub declaring_type: String,
    pub name: String,
    pub kind: MethodKind,
    /// Source-level parameter type names, e.g. `["String", "int"]`.
    pub parameters: Vec<String>,
    /// Location of the declaration, when the producer knows it.
    pub span: Option<Span>,
}

impl MethodSignature {
    pub fn method(declaring_type: &str, name: &str, parameters: &[&str]) -> Self {
        Self {
            declaring_type: declaring_type.to_string(),
            name: name.to_string(),
            kind: MethodKind::Method,
            parameters: parameters.iter().map(|p| p.to_string()).collect(),
            span: None,
        }
    }

    pub fn constructor(declaring_type: &str, parameters: &[&str]) -> Self {
        Self {
            kind: MethodKind::Constructor,
            ..Self::method(declaring_type, declaring_type, parameters)
        }
    }

    pub fn static_initializer(declaring_type: &str) -> Self {
        Self {
            kind: MethodKind::StaticInitializer,
            ..Self::method(declaring_type, "<clinit>", &[])
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }
}

/// Renders as `name(Type, Type)`.
impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.parameters.join(", "))
    }
}

#[derive(Debug, Clone)]
pub struct MethodDecl<'a> {
    pub signature: MethodSignature,
    pub body: &'a [Stmt<'a>],
}

/// A class-like declaration: the unit within which one oversized method must
/// not prevent its siblings from compiling.
#[derive(Debug, Clone)]
pub struct TypeDecl<'a> {
    pub name: String,
    pub methods: Vec<MethodDecl<'a>>,
}
