//! Per-method constant pool bookkeeping.

use super::instruction::Constant;

/// Deduplicating constant pool.
///
/// Indices start at 1 and a `Long` takes two consecutive entries, matching
/// class-file numbering, so the index also tells the encoder whether the
/// short `ldc` form is reachable.
#[derive(Debug, Default, Clone)]
pub struct ConstantPool {
    /// Maps constants to their index so repeated literals share one entry.
    indices: hashbrown::HashMap<Constant, u32>,
    /// Entries used so far.
    entries: u32,
}

impl ConstantPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a constant to the pool (or reuse an existing entry) and return
    /// its index.
    pub fn intern(&mut self, constant: &Constant) -> u32 {
        if let Some(&index) = self.indices.get(constant) {
            return index;
        }
        let index = self.entries + 1;
        self.entries += constant.pool_entries();
        self.indices.insert(constant.clone(), index);
        index
    }

    pub fn entries(&self) -> u32 {
        self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_interning_deduplicates() {
        let mut pool = ConstantPool::new();
        let hello = Constant::Str("hello".to_string());

        assert_eq!(pool.intern(&hello), 1);
        assert_eq!(pool.intern(&Constant::Int(100_000)), 2);
        assert_eq!(pool.intern(&hello), 1);
        assert_eq!(pool.entries(), 2);
    }

    #[test]
    fn test_long_takes_two_entries() {
        let mut pool = ConstantPool::new();

        assert_eq!(pool.intern(&Constant::Long(42)), 1);
        assert_eq!(pool.intern(&Constant::Str("x".to_string())), 3);
        assert_eq!(pool.entries(), 3);
    }
}
