//! An abstract stack machine that executes frozen streams.
//!
//! Used to check that emitted code computes the same values as the tree it
//! came from. It models values, not bytes: there is no class file, no
//! verifier and no real linkage, only registered native targets.

mod error;
mod machine;
mod stack;
mod value;

#[cfg(test)]
mod machine_test;

pub use error::ExecError;
pub use machine::{Locals, Machine, NativeFn};
pub use value::Value;

pub(crate) use stack::Stack;
