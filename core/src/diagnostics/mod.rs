//! User-facing size-limit diagnostics.
//!
//! A `SizeDiagnostic` means one method could not be emitted because it would
//! exceed a VM limit. It is recoverable: the method is dropped and the rest
//! of the compilation unit carries on.

mod reporter;

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::api::{Diagnostic, RelatedInfo, Severity, Span};
use crate::ast::{MethodKind, MethodSignature};

pub use reporter::{CollectingReporter, DiagnosticReporter};

/// Which ceiling a method crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LimitKind {
    CodeLength,
    OperandStack,
    ConstantPoolBudget,
}

impl LimitKind {
    /// Stable error code for documentation lookup.
    pub fn code(self) -> &'static str {
        match self {
            LimitKind::CodeLength => "S0001",
            LimitKind::OperandStack => "S0002",
            LimitKind::ConstantPoolBudget => "S0003",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeDiagnostic {
    pub signature: MethodSignature,
    pub limit: LimitKind,
    pub observed: u64,
    pub limit_value: u64,
}

impl fmt::Display for SizeDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let limit = self.limit_value;
        match self.limit {
            LimitKind::CodeLength => match self.signature.kind {
                MethodKind::Method => write!(
                    f,
                    "The code of method {} is exceeding the {} bytes limit",
                    self.signature, limit
                ),
                MethodKind::Constructor => write!(
                    f,
                    "The code of constructor {} is exceeding the {} bytes limit",
                    self.signature, limit
                ),
                MethodKind::StaticInitializer => write!(
                    f,
                    "The code for the static initializer is exceeding the {} bytes limit",
                    limit
                ),
            },
            LimitKind::OperandStack => {
                write!(f, "The operand stack is exceeding the {} bytes limit", limit)
            }
            LimitKind::ConstantPoolBudget => write!(
                f,
                "Too many constants, the constant pool for {} would exceed {} entries",
                self.signature.declaring_type, limit
            ),
        }
    }
}

impl std::error::Error for SizeDiagnostic {}

impl SizeDiagnostic {
    /// Convert to a `Diagnostic` for the API boundary.
    ///
    /// Methods without a known declaration span are reported at offset 0.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let span = self.signature.span.clone().unwrap_or(Span::new(0, 0));
        let help = match self.limit {
            LimitKind::CodeLength => format!(
                "method body needs {} bytes; split it into smaller methods",
                self.observed
            ),
            LimitKind::OperandStack => format!(
                "expression needs {} operand-stack slots; move sub-expressions into locals",
                self.observed
            ),
            LimitKind::ConstantPoolBudget => format!(
                "method needs {} constant-pool entries",
                self.observed
            ),
        };
        let related = match self.signature.kind {
            MethodKind::StaticInitializer => Vec::new(),
            _ => vec![RelatedInfo {
                span: span.clone(),
                message: format!("in {}", self.signature),
            }],
        };

        Diagnostic {
            severity: Severity::Error,
            message: self.to_string(),
            span,
            related,
            help: vec![help],
            code: Some(self.limit.code().to_string()),
        }
    }
}
