//! Sizeguard - size-guarded code generation for stack-machine methods
//!
//! # Overview
//!
//! Sizeguard sits at the end of a compiler pipeline. It takes typed,
//! resolved method bodies and produces instruction streams for a JVM-like
//! stack machine, making sure that:
//!
//! - arbitrarily deep expression trees are lowered without native recursion
//! - string concatenations never pass more arguments to one call than the VM
//!   can link
//! - a method that would exceed the code-length, operand-stack or
//!   constant-pool ceilings is reported as a diagnostic while the rest of the
//!   compilation carries on
//!
//! # Quick Start
//!
//! ```
//! use sizeguard::{Bump, CodegenOptions, compile_types};
//! use sizeguard::ast::{AstBuilder, BinaryOp, MethodDecl, MethodSignature, Stmt, TypeDecl, ValueType};
//!
//! let arena = Bump::new();
//! let ast = AstBuilder::new(&arena);
//! let sum = ast.binary(BinaryOp::Add, ast.operand(0, ValueType::Int), ast.int(1));
//! let decl = TypeDecl {
//!     name: "X".to_string(),
//!     methods: vec![MethodDecl {
//!         signature: MethodSignature::method("X", "inc", &["int"]),
//!         body: ast.body(&[Stmt::Return(Some(sum))]),
//!     }],
//! };
//!
//! let (types, diagnostics) = compile_types(&CodegenOptions::default(), &[decl], 1).unwrap();
//! assert!(diagnostics.is_empty());
//! assert_eq!(types[0].methods[0].code.as_ref().unwrap().byte_length(), 4);
//! ```

mod error_renderer;

use thiserror::Error;

pub use bumpalo::Bump;

// Re-export public API from sizeguard_core
pub use sizeguard_core::api::{
    CodegenOptions, ConcatLowering, ConfigError, Diagnostic, Limits, RelatedInfo, Severity, Span,
};
pub use sizeguard_core::{ast, compiler, stream, vm};
pub use sizeguard_core::{
    CollectingReporter, CompiledMethod, CompiledType, DiagnosticReporter, FrozenStream,
    GenerationError, InternalError, LimitKind, MethodSizeGuard, SizeDiagnostic, TypeCompiler,
};

pub use error_renderer::{
    render_diagnostics, render_diagnostics_to, render_diagnostics_to_string,
    render_diagnostics_to_string_no_color,
};

/// Everything that stops a compilation run outright.
///
/// Methods rejected by a size limit are not errors; they come back as
/// `SizeDiagnostic`s alongside the compiled types.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid code generation options: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// Compile every type on up to `workers` threads.
///
/// Returns the compiled types in declaration order together with the size
/// diagnostics of all rejected methods, sorted by type, position and name.
pub fn compile_types(
    options: &CodegenOptions,
    decls: &[ast::TypeDecl<'_>],
    workers: usize,
) -> Result<(Vec<CompiledType>, Vec<SizeDiagnostic>), Error> {
    let compiler = TypeCompiler::new(options)?;
    let reporter = CollectingReporter::new();
    let types = compiler.compile_all(decls, &reporter, workers)?;
    Ok((types, reporter.into_sorted()))
}
