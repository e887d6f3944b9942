//! Abstract instructions with a JVM-shaped encoding size.
//!
//! Each instruction records how many bytes its encoding takes and what it
//! does to the operand stack. Both are fixed when the instruction is built
//! so the stream can keep its counters in O(1) per append.
//!
//! # Encoding
//!
//! ```text
//! Push Int -1..=5           iconst_<n>       1 byte
//! Push Int -128..=127       bipush           2 bytes
//! Push Int i16 range        sipush           3 bytes
//! Push Long 0 | 1           lconst_<n>       1 byte
//! Push Long (pooled)        ldc2_w           3 bytes
//! Push Int / Str (pooled)   ldc | ldc_w      2 | 3 bytes
//! Load / Store slot 0..=3   xload_<n>        1 byte
//! Load / Store slot ..=255  xload            2 bytes
//! Load / Store wide slot    wide xload       4 bytes
//! BinaryOp                  iadd, lmul, ...  1 byte
//! Call                      invokestatic     3 bytes
//! CombineDynamic            invokedynamic    5 bytes
//! Pop                       pop | pop2       1 byte
//! Branch                    goto             3 bytes
//! Return                    xreturn          1 byte
//! ```

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::ast::{BinaryOp, BootstrapId, Label, Literal, Slot, TargetId, ValueType};
use crate::errors::InternalError;

/// An owned constant operand.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Constant {
    Int(i32),
    Long(i64),
    Str(String),
}

impl Constant {
    pub fn ty(&self) -> ValueType {
        match self {
            Constant::Int(_) => ValueType::Int,
            Constant::Long(_) => ValueType::Long,
            Constant::Str(_) => ValueType::Str,
        }
    }

    /// Whether pushing this constant needs a constant-pool entry.
    pub fn is_pooled(&self) -> bool {
        match self {
            Constant::Int(n) => i16::try_from(*n).is_err(),
            Constant::Long(n) => !matches!(n, 0 | 1),
            Constant::Str(_) => true,
        }
    }

    /// Number of pool entries the constant occupies once interned.
    pub fn pool_entries(&self) -> u32 {
        match self {
            Constant::Long(_) => 2,
            Constant::Int(_) | Constant::Str(_) => 1,
        }
    }
}

impl From<Literal<'_>> for Constant {
    fn from(literal: Literal<'_>) -> Self {
        match literal {
            Literal::Int(n) => Constant::Int(n),
            Literal::Long(n) => Constant::Long(n),
            Literal::Str(s) => Constant::Str(s.to_string()),
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Int(n) => write!(f, "{}", n),
            Constant::Long(n) => write!(f, "{}L", n),
            Constant::Str(s) => write!(f, "{:?}", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    /// `pool_index` is set for constants that live in the constant pool.
    Push {
        value: Constant,
        pool_index: Option<u32>,
    },
    LoadOperand {
        slot: Slot,
        ty: ValueType,
    },
    StoreOperand {
        slot: Slot,
        ty: ValueType,
    },
    BinaryOp {
        op: BinaryOp,
        ty: ValueType,
    },
    Call {
        target: TargetId,
        argc: u16,
        result: ValueType,
    },
    /// Always produces a string reference.
    CombineDynamic {
        bootstrap: BootstrapId,
        argc: u16,
    },
    Pop {
        ty: ValueType,
    },
    Branch(Label),
    Return(Option<ValueType>),
}

impl Op {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Op::Push { value, pool_index } => match (value, pool_index) {
                (Constant::Int(n), None) if (-1..=5).contains(n) => "iconst",
                (Constant::Int(n), None) if i8::try_from(*n).is_ok() => "bipush",
                (Constant::Int(n), None) if i16::try_from(*n).is_ok() => "sipush",
                (Constant::Long(n), None) if matches!(n, 0 | 1) => "lconst",
                (Constant::Long(_), _) => "ldc2_w",
                (_, Some(index)) if *index <= 255 => "ldc",
                _ => "ldc_w",
            },
            Op::LoadOperand { ty, .. } => match ty {
                ValueType::Int => "iload",
                ValueType::Long => "lload",
                ValueType::Str => "aload",
            },
            Op::StoreOperand { ty, .. } => match ty {
                ValueType::Int => "istore",
                ValueType::Long => "lstore",
                ValueType::Str => "astore",
            },
            Op::BinaryOp { op, ty } => binary_mnemonic(*op, *ty),
            Op::Call { .. } => "invokestatic",
            Op::CombineDynamic { .. } => "invokedynamic",
            Op::Pop { ty } => match ty {
                ValueType::Long => "pop2",
                _ => "pop",
            },
            Op::Branch(_) => "goto",
            Op::Return(ty) => match ty {
                None => "return",
                Some(ValueType::Int) => "ireturn",
                Some(ValueType::Long) => "lreturn",
                Some(ValueType::Str) => "areturn",
            },
        }
    }

    /// Size of the encoded instruction in bytes.
    pub fn encoded_len(&self) -> u32 {
        match self {
            Op::Push { value, pool_index } => match (value, pool_index) {
                (Constant::Int(n), None) if (-1..=5).contains(n) => 1,
                (Constant::Int(n), None) if i8::try_from(*n).is_ok() => 2,
                (Constant::Int(n), None) if i16::try_from(*n).is_ok() => 3,
                (Constant::Long(n), None) if matches!(n, 0 | 1) => 1,
                (Constant::Long(_), _) => 3,
                (_, Some(index)) if *index <= 255 => 2,
                _ => 3,
            },
            Op::LoadOperand { slot, .. } | Op::StoreOperand { slot, .. } => match slot {
                0..=3 => 1,
                4..=255 => 2,
                _ => 4,
            },
            Op::BinaryOp { .. } => 1,
            Op::Call { .. } => 3,
            Op::CombineDynamic { .. } => 5,
            Op::Pop { .. } => 1,
            Op::Branch(_) => 3,
            Op::Return(_) => 1,
        }
    }
}

fn binary_mnemonic(op: BinaryOp, ty: ValueType) -> &'static str {
    let (int, long) = match op {
        BinaryOp::Add => ("iadd", "ladd"),
        BinaryOp::Sub => ("isub", "lsub"),
        BinaryOp::Mul => ("imul", "lmul"),
        BinaryOp::Div => ("idiv", "ldiv"),
        BinaryOp::Rem => ("irem", "lrem"),
        BinaryOp::And => ("iand", "land"),
        BinaryOp::Or => ("ior", "lor"),
        BinaryOp::Xor => ("ixor", "lxor"),
    };
    if ty == ValueType::Long { long } else { int }
}

/// Operand-stack slots consumed and produced by one instruction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackEffect {
    pub pops: u32,
    pub pushes: u32,
}

impl StackEffect {
    pub fn new(pops: u32, pushes: u32) -> Self {
        Self { pops, pushes }
    }

    pub fn delta(&self) -> i64 {
        self.pushes as i64 - self.pops as i64
    }
}

/// One emitted instruction: an operation plus its precomputed size and
/// stack effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    op: Op,
    effect: StackEffect,
    len: u32,
}

impl Instruction {
    fn new(op: Op, effect: StackEffect) -> Self {
        let len = op.encoded_len();
        Self { op, effect, len }
    }

    /// Push a constant. Pooled constants must carry their pool index;
    /// `InstructionStream::push_constant` takes care of that.
    pub fn push(value: Constant, pool_index: Option<u32>) -> Self {
        let pushes = value.ty().slots();
        Self::new(Op::Push { value, pool_index }, StackEffect::new(0, pushes))
    }

    pub fn load(slot: Slot, ty: ValueType) -> Self {
        Self::new(Op::LoadOperand { slot, ty }, StackEffect::new(0, ty.slots()))
    }

    pub fn store(slot: Slot, ty: ValueType) -> Self {
        Self::new(Op::StoreOperand { slot, ty }, StackEffect::new(ty.slots(), 0))
    }

    pub fn binary(op: BinaryOp, ty: ValueType) -> Self {
        let slots = ty.slots();
        Self::new(Op::BinaryOp { op, ty }, StackEffect::new(2 * slots, slots))
    }

    pub fn call(
        target: TargetId,
        args: &[ValueType],
        result: ValueType,
    ) -> Result<Self, InternalError> {
        Ok(Self::new(
            Op::Call {
                target,
                argc: argc(args)?,
                result,
            },
            StackEffect::new(arg_slots(args), result.slots()),
        ))
    }

    pub fn combine_dynamic(
        bootstrap: BootstrapId,
        args: &[ValueType],
    ) -> Result<Self, InternalError> {
        Ok(Self::new(
            Op::CombineDynamic {
                bootstrap,
                argc: argc(args)?,
            },
            StackEffect::new(arg_slots(args), ValueType::Str.slots()),
        ))
    }

    pub fn pop(ty: ValueType) -> Self {
        Self::new(Op::Pop { ty }, StackEffect::new(ty.slots(), 0))
    }

    pub fn branch(label: Label) -> Self {
        Self::new(Op::Branch(label), StackEffect::default())
    }

    pub fn ret(ty: Option<ValueType>) -> Self {
        let pops = ty.map_or(0, ValueType::slots);
        Self::new(Op::Return(ty), StackEffect::new(pops, 0))
    }

    pub fn op(&self) -> &Op {
        &self.op
    }

    pub fn effect(&self) -> StackEffect {
        self.effect
    }

    pub fn byte_len(&self) -> u32 {
        self.len
    }
}

fn argc(args: &[ValueType]) -> Result<u16, InternalError> {
    u16::try_from(args.len()).map_err(|_| InternalError::TooManyArguments(args.len()))
}

fn arg_slots(args: &[ValueType]) -> u32 {
    args.iter().map(|ty| ty.slots()).sum()
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mnemonic = self.op.mnemonic();
        match &self.op {
            Op::Push { value, pool_index } => match pool_index {
                Some(index) => write!(f, "{} #{} // {}", mnemonic, index, value),
                None => write!(f, "{} {}", mnemonic, value),
            },
            Op::LoadOperand { slot, .. } | Op::StoreOperand { slot, .. } => {
                write!(f, "{} {}", mnemonic, slot)
            }
            Op::Call { target, argc, .. } => write!(f, "{} #{} ({} args)", mnemonic, target, argc),
            Op::CombineDynamic { bootstrap, argc } => {
                write!(f, "{} #{} ({} args)", mnemonic, bootstrap, argc)
            }
            Op::Branch(label) => write!(f, "{} {}", mnemonic, label),
            Op::BinaryOp { .. } | Op::Pop { .. } | Op::Return(_) => f.write_str(mnemonic),
        }
    }
}
