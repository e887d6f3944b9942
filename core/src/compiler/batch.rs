//! Batch planning for n-ary concatenation.
//!
//! A dynamic concatenation call can only take a bounded number of
//! arguments. When an expression has more operands than that, the operands
//! are split into contiguous batches, each batch is combined by one call,
//! and the batch results are folded pairwise from left to right:
//!
//! ```text
//! operands:  a0 .. a199 | a200 .. a299
//! batches:   call(200)  | call(100)
//! steps:     call(batch0, batch1)
//! ```
//!
//! Operand order is never changed, which matters because concatenation is
//! not commutative. The plan depends only on `(operand_count, ceiling)` so
//! generated code is reproducible.

use core::ops::Range;

use crate::errors::InternalError;

/// One fold of the accumulated result with the result of `batch`.
///
/// Step `i` consumes the result of step `i - 1` (or of batch 0 for the
/// first step) and the result of batch `i + 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CombineStep {
    pub batch: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPlan {
    batches: Vec<Range<usize>>,
    steps: Vec<CombineStep>,
}

impl BatchPlan {
    pub fn batches(&self) -> &[Range<usize>] {
        &self.batches
    }

    pub fn combine_steps(&self) -> &[CombineStep] {
        &self.steps
    }

    /// A lone operand needs no call at all.
    pub fn is_passthrough(&self) -> bool {
        matches!(self.batches.as_slice(), [only] if only.len() == 1)
    }

    /// Check that the batches partition `0..operand_count` in order, that no
    /// batch is empty or larger than `ceiling`, and that there is exactly one
    /// step per batch after the first.
    pub fn validate(&self, operand_count: usize, ceiling: usize) -> Result<(), InternalError> {
        let malformed = |reason: String| InternalError::MalformedBatchPlan {
            operands: operand_count,
            ceiling,
            reason,
        };

        let mut next = 0;
        for (index, batch) in self.batches.iter().enumerate() {
            if batch.start != next {
                return Err(malformed(format!(
                    "batch {} starts at {}, expected {}",
                    index, batch.start, next
                )));
            }
            if batch.is_empty() || batch.len() > ceiling {
                return Err(malformed(format!(
                    "batch {} has {} operands",
                    index,
                    batch.len()
                )));
            }
            next = batch.end;
        }
        if next != operand_count {
            return Err(malformed(format!("batches cover 0..{}", next)));
        }

        let expected_steps = self.batches.len().saturating_sub(1);
        if self.steps.len() != expected_steps {
            return Err(malformed(format!(
                "{} combine steps for {} batches",
                self.steps.len(),
                self.batches.len()
            )));
        }
        for (index, step) in self.steps.iter().enumerate() {
            if step.batch != index + 1 {
                return Err(malformed(format!(
                    "step {} folds batch {}",
                    index, step.batch
                )));
            }
        }
        Ok(())
    }
}

/// Partition `operand_count` operands into batches of at most `ceiling`.
///
/// Full batches come first and the remainder, if any, goes last.
pub fn plan(operand_count: usize, ceiling: usize) -> Result<BatchPlan, InternalError> {
    if operand_count == 0 {
        return Err(InternalError::EmptyOperands);
    }
    if ceiling == 0 {
        return Err(InternalError::ZeroCeiling);
    }

    let batches: Vec<Range<usize>> = (0..operand_count)
        .step_by(ceiling)
        .map(|start| start..(start + ceiling).min(operand_count))
        .collect();
    let steps = (1..batches.len()).map(|batch| CombineStep { batch }).collect();

    Ok(BatchPlan { batches, steps })
}
