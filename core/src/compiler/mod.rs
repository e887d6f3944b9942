//! Code generation for method bodies.
//!
//! ## Design
//!
//! - `Linearizer` lowers one expression tree using an explicit work list, so
//!   native stack use does not depend on tree depth
//! - `batch` splits oversized concatenations into calls the VM can link
//! - `MethodSizeGuard` drives generation statement by statement and turns
//!   limit crossings into `SizeDiagnostic`s for that method only

pub mod batch;
mod guard;
mod linearizer;

#[cfg(test)]
mod guard_test;

pub use batch::{BatchPlan, CombineStep};
pub use guard::{Abort, BodyEmitter, MethodResult, MethodSizeGuard};
pub use linearizer::Linearizer;
