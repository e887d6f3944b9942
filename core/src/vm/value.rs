use core::fmt;

use crate::{ast::ValueType, stream::Constant};

/// A runtime value of the abstract machine.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Int(i32),
    Long(i64),
    Str(String),
}

impl Value {
    pub fn ty(&self) -> ValueType {
        match self {
            Value::Int(_) => ValueType::Int,
            Value::Long(_) => ValueType::Long,
            Value::Str(_) => ValueType::Str,
        }
    }
}

impl From<&Constant> for Value {
    fn from(constant: &Constant) -> Self {
        match constant {
            Constant::Int(n) => Value::Int(*n),
            Constant::Long(n) => Value::Long(*n),
            Constant::Str(s) => Value::Str(s.clone()),
        }
    }
}

/// The string conversion used by concatenation.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(n) => write!(f, "{}", n),
            Value::Long(n) => write!(f, "{}", n),
            Value::Str(s) => f.write_str(s),
        }
    }
}
