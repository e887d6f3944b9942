//! Iterative lowering of expression trees into stack instructions.
//!
//! Trees coming out of generated or machine-written sources can be hundreds
//! of thousands of levels deep (`a + b + c + ...` parses as a left-leaning
//! spine). Walking them recursively would overflow the native stack, so the
//! linearizer keeps its own explicit work list on the heap. Memory use is
//! proportional to the tree depth; native stack use is constant.
//!
//! Evaluation order is always left to right: the instruction order produced
//! here is exactly a post-order traversal of the tree.

use core::sync::atomic::{AtomicBool, Ordering};

use smallvec::SmallVec;

use crate::{
    api::{CodegenOptions, ConcatLowering, ConfigError, MAX_DESCRIPTOR_SLOTS},
    ast::{BinaryOp, Expr, Leaf, NAryOp, TargetId, ValueType},
    compiler::batch,
    errors::{GenerationError, InternalError},
    stream::{Constant, Instruction, InstructionStream},
};

type ArgTypes = SmallVec<[ValueType; 8]>;

/// Pending work. Items are popped from the back of the work list.
enum WorkItem<'a> {
    /// Emit the code for a whole subtree.
    Descend(&'a Expr<'a>),
    /// Both operands are on the stack; apply the operator.
    Binary { op: BinaryOp, ty: ValueType },
    /// Continue a same-operator left spine: the accumulated value is on the
    /// stack, `rights[next..]` are still to be folded in.
    Fold {
        op: BinaryOp,
        ty: ValueType,
        rights: Vec<&'a Expr<'a>>,
        next: usize,
    },
    /// All arguments are on the stack; call the target.
    Call {
        target: TargetId,
        result: ValueType,
        args: ArgTypes,
    },
    /// Combine the values on top of the stack into one string.
    Combine { args: ArgTypes },
}

/// Turns one expression into instructions appended to a stream.
///
/// The linearizer does no size checking of its own; the method size guard
/// inspects the stream after each statement.
pub struct Linearizer<'o> {
    options: &'o CodegenOptions,
    cancel: Option<&'o AtomicBool>,
}

impl<'o> Linearizer<'o> {
    pub fn new(options: &'o CodegenOptions) -> Result<Self, ConfigError> {
        options.validate()?;
        Ok(Self::from_validated(options))
    }

    /// For callers that already ran `CodegenOptions::validate`.
    pub(crate) fn from_validated(options: &'o CodegenOptions) -> Self {
        Self {
            options,
            cancel: None,
        }
    }

    /// Poll `flag` between work items and stop with
    /// `GenerationError::Cancelled` once it is set.
    pub fn with_cancellation(mut self, flag: &'o AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Append the instructions computing `expr`, leaving its value on top of
    /// the operand stack.
    pub fn linearize<'a>(
        &self,
        expr: &'a Expr<'a>,
        stream: &mut InstructionStream,
    ) -> Result<(), GenerationError> {
        let mut work = vec![WorkItem::Descend(expr)];

        while let Some(item) = work.pop() {
            self.check_cancelled()?;

            match item {
                WorkItem::Descend(node) => self.descend(node, &mut work, stream)?,
                WorkItem::Binary { op, ty } => {
                    stream.append(Instruction::binary(op, ty))?;
                }
                WorkItem::Fold {
                    op,
                    ty,
                    rights,
                    next,
                } => {
                    let right = rights[next];
                    if next + 1 < rights.len() {
                        work.push(WorkItem::Fold {
                            op,
                            ty,
                            rights,
                            next: next + 1,
                        });
                    }
                    work.push(WorkItem::Binary { op, ty });
                    work.push(WorkItem::Descend(right));
                }
                WorkItem::Call {
                    target,
                    result,
                    args,
                } => {
                    stream.append(Instruction::call(target, &args, result)?)?;
                }
                WorkItem::Combine { args } => {
                    let instruction = match self.options.concat {
                        ConcatLowering::Dynamic { bootstrap } => {
                            Instruction::combine_dynamic(bootstrap, &args)?
                        }
                        ConcatLowering::Call { target } => {
                            Instruction::call(target, &args, ValueType::Str)?
                        }
                    };
                    stream.append(instruction)?;
                }
            }
        }

        Ok(())
    }

    pub(crate) fn check_cancelled(&self) -> Result<(), GenerationError> {
        match self.cancel {
            Some(flag) if flag.load(Ordering::Relaxed) => Err(GenerationError::Cancelled),
            _ => Ok(()),
        }
    }

    fn descend<'a>(
        &self,
        node: &'a Expr<'a>,
        work: &mut Vec<WorkItem<'a>>,
        stream: &mut InstructionStream,
    ) -> Result<(), GenerationError> {
        match node {
            Expr::Leaf(Leaf::Const(literal)) => {
                stream.push_constant(Constant::from(*literal))?;
            }
            Expr::Leaf(Leaf::Operand { slot, ty }) => {
                stream.append(Instruction::load(*slot, *ty))?;
            }
            Expr::Binary {
                op,
                ty,
                left,
                right,
            } => {
                // Peel the left spine of identical operators so a long chain
                // costs one work item instead of one per level.
                let mut rights = vec![*right];
                let mut leftmost = *left;
                while let Expr::Binary {
                    op: inner_op,
                    ty: inner_ty,
                    left: inner_left,
                    right: inner_right,
                } = leftmost
                {
                    if inner_op != op || inner_ty != ty {
                        break;
                    }
                    rights.push(*inner_right);
                    leftmost = *inner_left;
                }
                rights.reverse();

                if let [right] = rights.as_slice() {
                    work.push(WorkItem::Binary { op: *op, ty: *ty });
                    work.push(WorkItem::Descend(*right));
                } else {
                    work.push(WorkItem::Fold {
                        op: *op,
                        ty: *ty,
                        rights,
                        next: 0,
                    });
                }
                work.push(WorkItem::Descend(leftmost));
            }
            Expr::NAry {
                op: NAryOp::Concat,
                operands,
            } => self.plan_concat(*operands, work)?,
            Expr::Call {
                target,
                result,
                args,
            } => {
                work.push(WorkItem::Call {
                    target: *target,
                    result: *result,
                    args: args.iter().map(|arg| arg.ty()).collect(),
                });
                work.extend(args.iter().rev().map(|arg| WorkItem::Descend(*arg)));
            }
        }
        Ok(())
    }

    /// Operands per combine for this concatenation. Two-slot operands halve
    /// the ceiling so a full batch still fits in a method descriptor.
    fn concat_ceiling(&self, operands: &[&Expr<'_>]) -> usize {
        let ceiling = self.options.max_arguments_per_dynamic_call;
        if operands.iter().any(|operand| operand.ty().slots() > 1) {
            ceiling.min((MAX_DESCRIPTOR_SLOTS - 1) / 2)
        } else {
            ceiling
        }
    }

    /// Queue a concatenation: each batch's operands followed by its combine,
    /// then a two-argument combine folding the batch into the running result.
    fn plan_concat<'a>(
        &self,
        operands: &'a [&'a Expr<'a>],
        work: &mut Vec<WorkItem<'a>>,
    ) -> Result<(), InternalError> {
        let ceiling = self.concat_ceiling(operands);
        let plan = batch::plan(operands.len(), ceiling)?;
        plan.validate(operands.len(), ceiling)?;

        tracing::trace!(
            operands = operands.len(),
            ceiling,
            batches = plan.batches().len(),
            "Planned concatenation"
        );

        if plan.is_passthrough() {
            work.push(WorkItem::Descend(operands[0]));
            return Ok(());
        }

        let mut items = Vec::with_capacity(operands.len() + 2 * plan.batches().len());
        let mut accumulated: Option<ValueType> = None;
        for range in plan.batches() {
            let batch = &operands[range.clone()];
            items.extend(batch.iter().map(|operand| WorkItem::Descend(*operand)));

            let batch_ty = match batch {
                [single] => single.ty(),
                _ => {
                    items.push(WorkItem::Combine {
                        args: batch.iter().map(|operand| operand.ty()).collect(),
                    });
                    ValueType::Str
                }
            };

            if let Some(acc_ty) = accumulated {
                items.push(WorkItem::Combine {
                    args: SmallVec::from_slice(&[acc_ty, batch_ty]),
                });
                accumulated = Some(ValueType::Str);
            } else {
                accumulated = Some(batch_ty);
            }
        }

        work.extend(items.into_iter().rev());
        Ok(())
    }
}
