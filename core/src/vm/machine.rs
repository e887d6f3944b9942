use crate::{
    ast::{BinaryOp, BootstrapId, Slot, TargetId, ValueType},
    stream::{FrozenStream, Op},
    vm::{ExecError, Stack, Value},
};

/// A native call target or bootstrap method. Receives its arguments in
/// evaluation order.
pub type NativeFn = fn(&[Value]) -> Result<Value, ExecError>;

/// Local variable slots of one activation.
pub type Locals = hashbrown::HashMap<Slot, Value>;

/// Executes frozen streams.
///
/// Bootstrap method `0` is preregistered as `Machine::concat`, matching the
/// default concatenation lowering.
pub struct Machine {
    targets: hashbrown::HashMap<TargetId, NativeFn>,
    bootstraps: hashbrown::HashMap<BootstrapId, NativeFn>,
    max_steps: u64,
}

impl Default for Machine {
    fn default() -> Self {
        let mut bootstraps = hashbrown::HashMap::new();
        bootstraps.insert(0, Machine::concat as NativeFn);
        Self {
            targets: hashbrown::HashMap::new(),
            bootstraps,
            max_steps: 10_000_000,
        }
    }
}

impl Machine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_target(mut self, target: TargetId, function: NativeFn) -> Self {
        self.targets.insert(target, function);
        self
    }

    pub fn with_bootstrap(mut self, bootstrap: BootstrapId, function: NativeFn) -> Self {
        self.bootstraps.insert(bootstrap, function);
        self
    }

    /// Stop with `ExecError::StepLimit` after this many instructions.
    pub fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// The string conversion and concatenation of all arguments.
    pub fn concat(args: &[Value]) -> Result<Value, ExecError> {
        Ok(Value::Str(args.iter().map(Value::to_string).collect()))
    }

    /// Run `code` from its first instruction until a return or the end of
    /// the stream.
    pub fn run(&self, code: &FrozenStream, locals: &mut Locals) -> Result<Option<Value>, ExecError> {
        let instructions = code.instructions();
        let mut stack = Stack::new(code.max_stack());
        let mut ip = 0;
        let mut steps = 0u64;

        while let Some(instruction) = instructions.get(ip) {
            steps += 1;
            if steps > self.max_steps {
                return Err(ExecError::StepLimit(self.max_steps));
            }
            let index = ip;
            ip += 1;

            match instruction.op() {
                Op::Push { value, .. } => stack.push(Value::from(value))?,
                Op::LoadOperand { slot, ty } => {
                    let value = locals.get(slot).ok_or(ExecError::UnboundSlot(*slot))?;
                    expect_type(*ty, value)?;
                    stack.push(value.clone())?;
                }
                Op::StoreOperand { slot, ty } => {
                    let value = stack.pop(index)?;
                    expect_type(*ty, &value)?;
                    locals.insert(*slot, value);
                }
                Op::BinaryOp { op, ty } => {
                    let right = stack.pop(index)?;
                    let left = stack.pop(index)?;
                    expect_type(*ty, &left)?;
                    expect_type(*ty, &right)?;
                    stack.push(binary(*op, left, right)?)?;
                }
                Op::Call {
                    target,
                    argc,
                    result,
                } => {
                    let function = self
                        .targets
                        .get(target)
                        .ok_or(ExecError::UnknownTarget(*target))?;
                    let args = stack.pop_n(usize::from(*argc), index)?;
                    let value = function(&args)?;
                    expect_type(*result, &value)?;
                    stack.push(value)?;
                }
                Op::CombineDynamic { bootstrap, argc } => {
                    let function = self
                        .bootstraps
                        .get(bootstrap)
                        .ok_or(ExecError::UnknownBootstrap(*bootstrap))?;
                    let args = stack.pop_n(usize::from(*argc), index)?;
                    let value = function(&args)?;
                    expect_type(ValueType::Str, &value)?;
                    stack.push(value)?;
                }
                Op::Pop { ty } => {
                    let value = stack.pop(index)?;
                    expect_type(*ty, &value)?;
                }
                Op::Branch(label) => {
                    ip = code
                        .label_target(*label)
                        .ok_or(ExecError::UnknownLabel(*label))?;
                }
                Op::Return(None) => return Ok(None),
                Op::Return(Some(ty)) => {
                    let value = stack.pop(index)?;
                    expect_type(*ty, &value)?;
                    return Ok(Some(value));
                }
            }
        }

        Ok(None)
    }
}

fn expect_type(expected: ValueType, value: &Value) -> Result<(), ExecError> {
    let found = value.ty();
    if found == expected {
        Ok(())
    } else {
        Err(ExecError::TypeMismatch { expected, found })
    }
}

/// Two's-complement arithmetic, wrapping on overflow.
fn binary(op: BinaryOp, left: Value, right: Value) -> Result<Value, ExecError> {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(match op {
            BinaryOp::Add => a.wrapping_add(b),
            BinaryOp::Sub => a.wrapping_sub(b),
            BinaryOp::Mul => a.wrapping_mul(b),
            BinaryOp::Div => nonzero(b).map(|b| a.wrapping_div(b))?,
            BinaryOp::Rem => nonzero(b).map(|b| a.wrapping_rem(b))?,
            BinaryOp::And => a & b,
            BinaryOp::Or => a | b,
            BinaryOp::Xor => a ^ b,
        })),
        (Value::Long(a), Value::Long(b)) => Ok(Value::Long(match op {
            BinaryOp::Add => a.wrapping_add(b),
            BinaryOp::Sub => a.wrapping_sub(b),
            BinaryOp::Mul => a.wrapping_mul(b),
            BinaryOp::Div => nonzero(b).map(|b| a.wrapping_div(b))?,
            BinaryOp::Rem => nonzero(b).map(|b| a.wrapping_rem(b))?,
            BinaryOp::And => a & b,
            BinaryOp::Or => a | b,
            BinaryOp::Xor => a ^ b,
        })),
        (left, right) => Err(ExecError::TypeMismatch {
            expected: left.ty(),
            found: right.ty(),
        }),
    }
}

fn nonzero<T: Default + PartialEq>(divisor: T) -> Result<T, ExecError> {
    if divisor == T::default() {
        Err(ExecError::DivisionByZero)
    } else {
        Ok(divisor)
    }
}
