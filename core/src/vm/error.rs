//! Errors raised while executing a frozen stream.

use thiserror::Error;

use crate::ast::{BootstrapId, Label, Slot, TargetId, ValueType};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecError {
    #[error("division by zero")]
    DivisionByZero,

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: ValueType,
        found: ValueType,
    },

    #[error("unknown call target #{0}")]
    UnknownTarget(TargetId),

    #[error("unknown bootstrap method #{0}")]
    UnknownBootstrap(BootstrapId),

    #[error("slot {0} read before it was assigned")]
    UnboundSlot(Slot),

    #[error("branch to unknown label {0}")]
    UnknownLabel(Label),

    #[error("operand stack underflow at instruction {index}")]
    StackUnderflow { index: usize },

    #[error("operand stack needs {depth} slots, code declares {max_stack}")]
    StackOverflow { depth: u32, max_stack: u32 },

    #[error("execution exceeded {0} steps")]
    StepLimit(u64),
}
