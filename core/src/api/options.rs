//! Configuration supplied once per compilation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ast::{BootstrapId, TargetId};

/// Method descriptors can describe at most this many parameter slots.
pub const MAX_DESCRIPTOR_SLOTS: usize = 255;

/// Hard VM ceilings checked by the method size guard.
///
/// A method is rejected when an observed value is strictly greater than the
/// corresponding limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Maximum bytes of code in one method body.
    ///
    /// Default: 65535
    pub max_code_length: u64,

    /// Maximum operand-stack depth, in slots.
    ///
    /// Default: 65535
    pub max_operand_stack: u32,

    /// Maximum constant-pool entries one method may contribute.
    ///
    /// Default: 65535
    pub max_constant_pool_entries: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_code_length: 65535,
            max_operand_stack: 65535,
            max_constant_pool_entries: 65535,
        }
    }
}

/// How the combine step of a string concatenation is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConcatLowering {
    /// One `CombineDynamic` per batch, linked through a bootstrap method.
    Dynamic { bootstrap: BootstrapId },
    /// One `Call` per batch to a static concatenation helper.
    Call { target: TargetId },
}

impl Default for ConcatLowering {
    fn default() -> Self {
        ConcatLowering::Dynamic { bootstrap: 0 }
    }
}

/// Code generation options.
///
/// # Example
///
/// ```
/// use sizeguard_core::api::{CodegenOptions, ConcatLowering, Limits};
///
/// let options = CodegenOptions {
///     limits: Limits {
///         max_code_length: 1024,
///         ..Limits::default()
///     },
///     max_arguments_per_dynamic_call: 200,
///     concat: ConcatLowering::Call { target: 7 },
/// };
/// assert!(options.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodegenOptions {
    pub limits: Limits,

    /// Largest number of operands passed to one concatenation call.
    ///
    /// Must be at least 2 (chained batches are folded pairwise) and below
    /// the method-descriptor slot limit. Concatenations with `long` operands
    /// use at most `(MAX_DESCRIPTOR_SLOTS - 1) / 2` operands per call.
    ///
    /// Default: 190
    pub max_arguments_per_dynamic_call: usize,

    pub concat: ConcatLowering,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            max_arguments_per_dynamic_call: 190,
            concat: ConcatLowering::default(),
        }
    }
}

impl CodegenOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ceiling = self.max_arguments_per_dynamic_call;
        if ceiling < 2 {
            return Err(ConfigError::CeilingTooSmall(ceiling));
        }
        if ceiling >= MAX_DESCRIPTOR_SLOTS {
            return Err(ConfigError::CeilingAboveDescriptorLimit(ceiling));
        }
        if self.limits.max_code_length == 0 {
            return Err(ConfigError::ZeroLimit("max_code_length"));
        }
        if self.limits.max_operand_stack == 0 {
            return Err(ConfigError::ZeroLimit("max_operand_stack"));
        }
        if self.limits.max_constant_pool_entries == 0 {
            return Err(ConfigError::ZeroLimit("max_constant_pool_entries"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("max_arguments_per_dynamic_call must be at least 2, got {0}")]
    CeilingTooSmall(usize),

    #[error(
        "max_arguments_per_dynamic_call must be below the {MAX_DESCRIPTOR_SLOTS}-slot descriptor limit, got {0}"
    )]
    CeilingAboveDescriptorLimit(usize),

    #[error("{0} must be greater than zero")]
    ZeroLimit(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let options = CodegenOptions::default();
        assert_eq!(options.limits.max_code_length, 65535);
        assert_eq!(options.limits.max_operand_stack, 65535);
        assert_eq!(options.max_arguments_per_dynamic_call, 190);
        assert_eq!(options.concat, ConcatLowering::Dynamic { bootstrap: 0 });
        assert_eq!(options.validate(), Ok(()));
    }

    #[test]
    fn test_ceiling_bounds() {
        let with_ceiling = |ceiling| CodegenOptions {
            max_arguments_per_dynamic_call: ceiling,
            ..CodegenOptions::default()
        };

        assert_eq!(
            with_ceiling(1).validate(),
            Err(ConfigError::CeilingTooSmall(1))
        );
        assert_eq!(
            with_ceiling(255).validate(),
            Err(ConfigError::CeilingAboveDescriptorLimit(255))
        );
        assert_eq!(with_ceiling(2).validate(), Ok(()));
        assert_eq!(with_ceiling(254).validate(), Ok(()));
    }

    #[test]
    fn test_zero_limit_rejected() {
        let options = CodegenOptions {
            limits: Limits {
                max_operand_stack: 0,
                ..Limits::default()
            },
            ..CodegenOptions::default()
        };
        let err = options.validate().unwrap_err();
        assert_eq!(err, ConfigError::ZeroLimit("max_operand_stack"));
        assert!(err.to_string().contains("max_operand_stack"));
    }
}
