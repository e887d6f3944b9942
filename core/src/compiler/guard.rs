//! Per-method enforcement of the VM size ceilings.
//!
//! Every method body is generated inside `MethodSizeGuard::guard`. After each
//! top-level statement the guard compares the stream's counters with the
//! configured limits; the first crossing abandons the method and produces a
//! `SizeDiagnostic`. Nothing emitted for a rejected method survives, and the
//! sibling methods of the same type are unaffected.

use core::sync::atomic::AtomicBool;

use tracing::{debug, trace, warn};

use crate::{
    api::{CodegenOptions, ConfigError, Limits},
    ast::{MethodDecl, MethodSignature, Stmt},
    compiler::Linearizer,
    diagnostics::{LimitKind, SizeDiagnostic},
    errors::{GenerationError, InternalError},
    stream::{FrozenStream, Instruction, InstructionStream},
};

/// Outcome of generating one method: its code, or why it has none.
pub type MethodResult = Result<FrozenStream, SizeDiagnostic>;

/// Why a guarded action stopped early.
#[derive(Debug)]
pub enum Abort {
    /// A size limit was crossed. Only the current method is affected.
    Limit(SizeDiagnostic),
    /// The whole compilation run must stop.
    Fatal(GenerationError),
}

impl From<SizeDiagnostic> for Abort {
    fn from(diagnostic: SizeDiagnostic) -> Self {
        Abort::Limit(diagnostic)
    }
}

impl From<GenerationError> for Abort {
    fn from(error: GenerationError) -> Self {
        Abort::Fatal(error)
    }
}

impl From<InternalError> for Abort {
    fn from(error: InternalError) -> Self {
        Abort::Fatal(error.into())
    }
}

pub struct MethodSizeGuard<'o> {
    options: &'o CodegenOptions,
    cancel: Option<&'o AtomicBool>,
}

impl<'o> MethodSizeGuard<'o> {
    pub fn new(options: &'o CodegenOptions) -> Result<Self, ConfigError> {
        options.validate()?;
        Ok(Self {
            options,
            cancel: None,
        })
    }

    pub fn with_cancellation(mut self, flag: &'o AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Run `action` against a fresh stream for `signature`.
    ///
    /// Returns `Ok(Ok(code))` when the finished body fits every limit,
    /// `Ok(Err(diagnostic))` when a limit was crossed, and `Err` for internal
    /// errors and cancellation.
    pub fn guard<F>(
        &self,
        signature: &MethodSignature,
        action: F,
    ) -> Result<MethodResult, GenerationError>
    where
        F: FnOnce(&mut BodyEmitter<'_>) -> Result<(), Abort>,
    {
        let mut linearizer = Linearizer::from_validated(self.options);
        if let Some(flag) = self.cancel {
            linearizer = linearizer.with_cancellation(flag);
        }
        let mut body = BodyEmitter {
            stream: InstructionStream::new(),
            linearizer,
            signature,
            limits: &self.options.limits,
        };

        let outcome = action(&mut body).and_then(|()| body.checkpoint().map_err(Abort::from));
        match outcome {
            Ok(()) => {
                let code = body.stream.freeze()?;
                debug!(
                    method = %signature,
                    bytes = code.byte_length(),
                    max_stack = code.max_stack(),
                    constants = code.constant_pool_entries(),
                    "Method emitted"
                );
                Ok(Ok(code))
            }
            Err(Abort::Limit(diagnostic)) => {
                warn!(
                    method = %signature,
                    limit = ?diagnostic.limit,
                    observed = diagnostic.observed,
                    "Method rejected"
                );
                Ok(Err(diagnostic))
            }
            Err(Abort::Fatal(error)) => Err(error),
        }
    }

    /// Generate a whole method body, statement by statement.
    ///
    /// A body that does not end in `Return` gets an implicit `return`.
    pub fn generate(&self, method: &MethodDecl<'_>) -> Result<MethodResult, GenerationError> {
        self.guard(&method.signature, |body| {
            for statement in method.body {
                body.statement(statement)?;
            }
            if !matches!(method.body.last(), Some(Stmt::Return(_))) {
                body.statement(&Stmt::Return(None))?;
            }
            Ok(())
        })
    }
}

/// Emits the statements of one method body under the guard's watch.
pub struct BodyEmitter<'g> {
    stream: InstructionStream,
    linearizer: Linearizer<'g>,
    signature: &'g MethodSignature,
    limits: &'g Limits,
}

impl BodyEmitter<'_> {
    /// Emit one top-level statement, then check the limits.
    pub fn statement(&mut self, statement: &Stmt<'_>) -> Result<(), Abort> {
        self.linearizer.check_cancelled()?;
        self.emit(statement)?;

        let depth = self.stream.current_depth();
        if depth != 0 {
            return Err(InternalError::UnbalancedStatement { depth }.into());
        }
        trace!(
            bytes = self.stream.current_byte_length(),
            max_stack = self.stream.current_stack_high_water_mark(),
            "Statement emitted"
        );
        self.checkpoint().map_err(Abort::from)
    }

    /// Compare the stream's counters with the limits, in the order code
    /// length, operand stack, constant pool.
    pub fn checkpoint(&self) -> Result<(), SizeDiagnostic> {
        let checks = [
            (
                LimitKind::CodeLength,
                self.stream.current_byte_length(),
                self.limits.max_code_length,
            ),
            (
                LimitKind::OperandStack,
                u64::from(self.stream.current_stack_high_water_mark()),
                u64::from(self.limits.max_operand_stack),
            ),
            (
                LimitKind::ConstantPoolBudget,
                u64::from(self.stream.constant_pool_entries()),
                u64::from(self.limits.max_constant_pool_entries),
            ),
        ];

        match checks
            .into_iter()
            .find(|(_, observed, limit)| observed > limit)
        {
            Some((limit, observed, limit_value)) => Err(SizeDiagnostic {
                signature: self.signature.clone(),
                limit,
                observed,
                limit_value,
            }),
            None => Ok(()),
        }
    }

    pub fn stream(&self) -> &InstructionStream {
        &self.stream
    }

    /// Direct access for callers emitting hand-built instruction sequences.
    /// The next `statement` or `checkpoint` still sees everything appended.
    pub fn stream_mut(&mut self) -> &mut InstructionStream {
        &mut self.stream
    }

    fn emit(&mut self, statement: &Stmt<'_>) -> Result<(), GenerationError> {
        match *statement {
            Stmt::Empty => {}
            Stmt::Eval(expr) => {
                self.linearizer.linearize(expr, &mut self.stream)?;
                self.stream.append(Instruction::pop(expr.ty()))?;
            }
            Stmt::Store { slot, value } => {
                self.linearizer.linearize(value, &mut self.stream)?;
                self.stream.append(Instruction::store(slot, value.ty()))?;
            }
            Stmt::CompoundAssign { slot, op, value } => {
                let ty = value.ty();
                self.stream.append(Instruction::load(slot, ty))?;
                self.linearizer.linearize(value, &mut self.stream)?;
                self.stream.append(Instruction::binary(op, ty))?;
                self.stream.append(Instruction::store(slot, ty))?;
            }
            Stmt::Label(label) => self.stream.bind_label(label)?,
            Stmt::Goto(label) => self.stream.append(Instruction::branch(label))?,
            Stmt::Return(None) => self.stream.append(Instruction::ret(None))?,
            Stmt::Return(Some(expr)) => {
                self.linearizer.linearize(expr, &mut self.stream)?;
                self.stream.append(Instruction::ret(Some(expr.ty())))?;
            }
        }
        Ok(())
    }
}
