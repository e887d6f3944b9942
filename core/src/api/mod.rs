//! Public API surface shared with the embedding compiler.
//!
//! The embedding compiler supplies `CodegenOptions` once per compilation and
//! receives `Diagnostic`s for methods that could not be emitted.
//!
//! # Example
//!
//! ```
//! use sizeguard_core::api::{CodegenOptions, Limits};
//!
//! let options = CodegenOptions {
//!     max_arguments_per_dynamic_call: 100,
//!     ..CodegenOptions::default()
//! };
//! assert!(options.validate().is_ok());
//! assert_eq!(options.limits, Limits::default());
//! ```

pub mod error;
pub mod options;

pub use error::{Diagnostic, RelatedInfo, Severity, Span};
pub use options::{CodegenOptions, ConcatLowering, ConfigError, Limits, MAX_DESCRIPTOR_SLOTS};
