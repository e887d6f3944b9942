use super::{ExecError, Value};

/// Operand stack of the machine.
///
/// Depth is counted in slots, like the generator counts it, and may never
/// exceed the `max_stack` recorded in the code being run. Crossing it means
/// the generator under-reported its high-water mark.
pub(crate) struct Stack {
    items: Vec<Value>,
    slots: u32,
    max_slots: u32,
}

impl Stack {
    pub fn new(max_slots: u32) -> Self {
        Self {
            items: Vec::with_capacity((max_slots as usize).min(256)),
            slots: 0,
            max_slots,
        }
    }

    pub fn push(&mut self, value: Value) -> Result<(), ExecError> {
        let depth = self.slots + value.ty().slots();
        if depth > self.max_slots {
            return Err(ExecError::StackOverflow {
                depth,
                max_stack: self.max_slots,
            });
        }
        self.slots = depth;
        self.items.push(value);
        Ok(())
    }

    /// `index` is the current instruction, for the error message.
    pub fn pop(&mut self, index: usize) -> Result<Value, ExecError> {
        let value = self
            .items
            .pop()
            .ok_or(ExecError::StackUnderflow { index })?;
        self.slots -= value.ty().slots();
        Ok(value)
    }

    /// Remove the top `n` values, oldest first.
    pub fn pop_n(&mut self, n: usize, index: usize) -> Result<Vec<Value>, ExecError> {
        let at = self
            .items
            .len()
            .checked_sub(n)
            .ok_or(ExecError::StackUnderflow { index })?;
        let values = self.items.split_off(at);
        self.slots -= values.iter().map(|v| v.ty().slots()).sum::<u32>();
        Ok(values)
    }
}
