//! Size-guarded code generation for stack-machine method bodies.
//!
//! Typed expression trees are lowered into instruction streams without
//! recursion, so tree depth is bounded by memory rather than by the native
//! stack. Each method body is generated under a guard that enforces the VM's
//! code-length, operand-stack and constant-pool ceilings and reports an
//! oversized method as a diagnostic instead of failing the whole compilation.

pub mod api;
pub mod ast;
pub mod compiler;
pub mod diagnostics;
pub mod errors;
pub mod stream;
pub mod unit;
pub mod vm;

pub use api::{CodegenOptions, ConcatLowering, ConfigError, Limits};
pub use compiler::{Linearizer, MethodResult, MethodSizeGuard};
pub use diagnostics::{CollectingReporter, DiagnosticReporter, LimitKind, SizeDiagnostic};
pub use errors::{GenerationError, InternalError};
pub use stream::{FrozenStream, InstructionStream};
pub use unit::{CompiledMethod, CompiledType, TypeCompiler};
