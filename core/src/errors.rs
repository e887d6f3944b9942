//! Failures that are not the user's fault.
//!
//! `InternalError` is a defect in the code generator itself: it aborts the
//! compilation run and is never downgraded to a `SizeDiagnostic` or retried.
//! Size-limit violations caused by user code are `SizeDiagnostic`s instead
//! (see `crate::diagnostics`).

use thiserror::Error;

use crate::ast::Label;

/// A broken invariant inside the code generator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InternalError {
    #[error("operand stack underflow at instruction {index} ({mnemonic}): depth {depth}, pops {pops}")]
    StackUnderflow {
        index: usize,
        mnemonic: &'static str,
        depth: u32,
        pops: u32,
    },

    #[error("batch plan for {operands} operands with ceiling {ceiling} is malformed: {reason}")]
    MalformedBatchPlan {
        operands: usize,
        ceiling: usize,
        reason: String,
    },

    #[error("n-ary expression has no operands")]
    EmptyOperands,

    #[error("batch ceiling must be at least 1")]
    ZeroCeiling,

    #[error("label {0} bound twice")]
    DuplicateLabel(Label),

    #[error("branch to unbound label {0}")]
    UnboundLabel(Label),

    #[error("{0} arguments do not fit in one call instruction")]
    TooManyArguments(usize),

    #[error("statement left {depth} slots on the operand stack")]
    UnbalancedStatement { depth: u32 },
}

/// Everything that aborts code generation for a whole compilation run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("internal code generator error: {0}")]
    Internal(#[from] InternalError),

    #[error("code generation cancelled")]
    Cancelled,
}
