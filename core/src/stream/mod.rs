//! The instruction stream of a single method body.
//!
//! An `InstructionStream` is created when generation of a method starts, is
//! only ever appended to, and is either frozen into a `FrozenStream` or
//! dropped when the method is rejected. It is owned by exactly one
//! generation task; nothing in here is shared.

mod instruction;
mod pool;


use core::fmt;

use serde::{Deserialize, Serialize};

use crate::ast::Label;
use crate::errors::InternalError;

pub use instruction::{Constant, Instruction, Op, StackEffect};
pub use pool::ConstantPool;

/// Append-only instruction sequence with O(1) size bookkeeping.
///
/// Invariants, maintained by every append:
/// - `byte_length` is the sum of the instructions' encoded lengths;
/// - `high_water_mark` is the largest depth reached after any prefix;
/// - the running depth never goes below zero.
#[derive(Debug, Default)]
pub struct InstructionStream {
    instructions: Vec<Instruction>,
    pool: ConstantPool,
    /// Label -> index of the instruction that follows it.
    labels: hashbrown::HashMap<Label, usize>,
    byte_length: u64,
    depth: u32,
    high_water_mark: u32,
}

impl InstructionStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an instruction, updating the byte length and stack counters.
    ///
    /// Fails if the instruction would pop more slots than the stack holds,
    /// which can only happen through a generator bug.
    pub fn append(&mut self, instruction: Instruction) -> Result<(), InternalError> {
        let effect = instruction.effect();
        if effect.pops > self.depth {
            return Err(InternalError::StackUnderflow {
                index: self.instructions.len(),
                mnemonic: instruction.op().mnemonic(),
                depth: self.depth,
                pops: effect.pops,
            });
        }
        self.depth = self.depth - effect.pops + effect.pushes;
        self.high_water_mark = self.high_water_mark.max(self.depth);
        self.byte_length += instruction.byte_len() as u64;
        self.instructions.push(instruction);
        Ok(())
    }

    /// Append the cheapest push for `value`, interning it in the constant
    /// pool when the encoding requires it.
    pub fn push_constant(&mut self, value: Constant) -> Result<(), InternalError> {
        let pool_index = value.is_pooled().then(|| self.pool.intern(&value));
        self.append(Instruction::push(value, pool_index))
    }

    /// Mark the position of `label` as the next instruction to be appended.
    pub fn bind_label(&mut self, label: Label) -> Result<(), InternalError> {
        if self.labels.contains_key(&label) {
            return Err(InternalError::DuplicateLabel(label));
        }
        self.labels.insert(label, self.instructions.len());
        Ok(())
    }

    pub fn current_byte_length(&self) -> u64 {
        self.byte_length
    }

    pub fn current_stack_high_water_mark(&self) -> u32 {
        self.high_water_mark
    }

    pub fn current_depth(&self) -> u32 {
        self.depth
    }

    pub fn constant_pool_entries(&self) -> u32 {
        self.pool.entries()
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Finish generation. The stream is consumed, so nothing can be
    /// appended to it afterwards.
    pub fn freeze(self) -> Result<FrozenStream, InternalError> {
        for instruction in &self.instructions {
            if let Op::Branch(label) = instruction.op() {
                if !self.labels.contains_key(label) {
                    return Err(InternalError::UnboundLabel(*label));
                }
            }
        }
        debug_assert_eq!(
            self.byte_length,
            self.instructions
                .iter()
                .map(|i| i.byte_len() as u64)
                .sum::<u64>(),
            "byte length out of sync with instructions"
        );

        // Sorted for deterministic output and binary search.
        let mut labels: Vec<(Label, usize)> = self.labels.into_iter().collect();
        labels.sort_unstable();

        Ok(FrozenStream {
            instructions: self.instructions,
            labels,
            byte_length: self.byte_length,
            max_stack: self.high_water_mark,
            constant_pool_entries: self.pool.entries(),
        })
    }
}

/// The immutable result of generating one method body, ready for the
/// class-file writer.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrozenStream {
    instructions: Vec<Instruction>,
    labels: Vec<(Label, usize)>,
    byte_length: u64,
    max_stack: u32,
    constant_pool_entries: u32,
}

impl FrozenStream {
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn byte_length(&self) -> u64 {
        self.byte_length
    }

    pub fn max_stack(&self) -> u32 {
        self.max_stack
    }

    pub fn constant_pool_entries(&self) -> u32 {
        self.constant_pool_entries
    }

    /// Index of the instruction a label points at.
    pub fn label_target(&self, label: Label) -> Option<usize> {
        self.labels
            .binary_search_by_key(&label, |(l, _)| *l)
            .ok()
            .map(|idx| self.labels[idx].1)
    }

    /// Serialize for hand-off to an out-of-process writer.
    pub fn to_bytes(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }
}

impl fmt::Debug for FrozenStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "FrozenStream {{")?;
        writeln!(f, "  byte_length: {}", self.byte_length)?;
        writeln!(f, "  max_stack: {}", self.max_stack)?;
        writeln!(f, "  constant_pool_entries: {}", self.constant_pool_entries)?;
        writeln!(f, "  instructions: [")?;

        let mut offset = 0u64;
        let mut labels = self.labels.iter().peekable();
        for (index, instruction) in self.instructions.iter().enumerate() {
            while let Some((label, _)) = labels.next_if(|(_, at)| *at == index) {
                writeln!(f, "  {}:", label)?;
            }
            writeln!(f, "    {:5}: {}", offset, instruction)?;
            offset += instruction.byte_len() as u64;
        }
        for (label, _) in labels {
            writeln!(f, "  {}:", label)?;
        }
        writeln!(f, "  ]")?;
        write!(f, "}}")
    }
}
