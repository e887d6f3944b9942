//! Generation of every method of one type declaration.

use core::sync::atomic::AtomicBool;

use tracing::debug;

use crate::{
    api::{CodegenOptions, ConfigError},
    ast::{MethodSignature, TypeDecl},
    compiler::MethodSizeGuard,
    diagnostics::DiagnosticReporter,
    errors::GenerationError,
    stream::FrozenStream,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledMethod {
    pub signature: MethodSignature,
    /// `None` when the method was rejected by a size limit.
    pub code: Option<FrozenStream>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledType {
    pub name: String,
    pub methods: Vec<CompiledMethod>,
}

impl CompiledType {
    pub fn method(&self, name: &str) -> Option<&CompiledMethod> {
        self.methods.iter().find(|m| m.signature.name == name)
    }

    pub fn rejected(&self) -> impl Iterator<Item = &MethodSignature> {
        self.methods
            .iter()
            .filter(|m| m.code.is_none())
            .map(|m| &m.signature)
    }
}

/// Compiles type declarations method by method.
///
/// A method that crosses a size limit is reported and skipped; its siblings
/// are still generated. The compiler holds no mutable state, so one instance
/// can be shared by threads compiling different types.
pub struct TypeCompiler<'o> {
    guard: MethodSizeGuard<'o>,
}

impl<'o> TypeCompiler<'o> {
    pub fn new(options: &'o CodegenOptions) -> Result<Self, ConfigError> {
        Ok(Self {
            guard: MethodSizeGuard::new(options)?,
        })
    }

    pub fn with_cancellation(self, flag: &'o AtomicBool) -> Self {
        Self {
            guard: self.guard.with_cancellation(flag),
        }
    }

    pub fn compile(
        &self,
        decl: &TypeDecl<'_>,
        reporter: &dyn DiagnosticReporter,
    ) -> Result<CompiledType, GenerationError> {
        let mut methods = Vec::with_capacity(decl.methods.len());

        for method in &decl.methods {
            let code = match self.guard.generate(method)? {
                Ok(code) => Some(code),
                Err(diagnostic) => {
                    reporter.report(diagnostic);
                    None
                }
            };
            methods.push(CompiledMethod {
                signature: method.signature.clone(),
                code,
            });
        }

        debug!(
            type_name = %decl.name,
            methods = methods.len(),
            rejected = methods.iter().filter(|m| m.code.is_none()).count(),
            "Type compiled"
        );

        Ok(CompiledType {
            name: decl.name.clone(),
            methods,
        })
    }

    /// Compile `decls` on up to `workers` threads sharing one reporter.
    ///
    /// Results come back in declaration order. The first internal error or
    /// cancellation is returned once every worker has finished.
    pub fn compile_all(
        &self,
        decls: &[TypeDecl<'_>],
        reporter: &dyn DiagnosticReporter,
        workers: usize,
    ) -> Result<Vec<CompiledType>, GenerationError> {
        let workers = workers.clamp(1, decls.len().max(1));
        let chunk_size = decls.len().div_ceil(workers).max(1);

        std::thread::scope(|scope| {
            let handles: Vec<_> = decls
                .chunks(chunk_size)
                .map(|chunk| {
                    scope.spawn(move || {
                        chunk
                            .iter()
                            .map(|decl| self.compile(decl, reporter))
                            .collect::<Result<Vec<_>, _>>()
                    })
                })
                .collect();

            let mut compiled = Vec::with_capacity(decls.len());
            let mut first_error = None;
            for handle in handles {
                match handle.join() {
                    Ok(Ok(types)) => compiled.extend(types),
                    Ok(Err(error)) => {
                        first_error.get_or_insert(error);
                    }
                    Err(panic) => std::panic::resume_unwind(panic),
                }
            }
            match first_error {
                Some(error) => Err(error),
                None => Ok(compiled),
            }
        })
    }
}
