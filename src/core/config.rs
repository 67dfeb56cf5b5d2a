//! Backend configuration.
//!
//! The constants the selector and allocator depend on are passed in explicitly
//! rather than living in process-wide statics, so two backends with different
//! register budgets can coexist.

use super::error::{CompileError, CompileResult};

/// Largest register pool the allocator's bitset can describe.
pub const MAX_REGISTER_COUNT: usize = 64;

/// Configuration consumed by automaton construction and register allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendConfig {
    /// Number of allocatable physical registers.
    pub register_count: usize,
    /// Upper bound on rules in a machine description; sizes the per-state
    /// acceptance and per-node partial-match tables.
    pub max_rules: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            register_count: 8,
            max_rules: 256,
        }
    }
}

impl BackendConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_register_count(mut self, register_count: usize) -> Self {
        self.register_count = register_count;
        self
    }

    pub fn with_max_rules(mut self, max_rules: usize) -> Self {
        self.max_rules = max_rules;
        self
    }

    /// Reject configurations the allocator or automaton cannot represent.
    pub fn validate(&self) -> CompileResult<()> {
        if self.register_count == 0 || self.register_count > MAX_REGISTER_COUNT {
            return Err(CompileError::InvalidConfig {
                reason: format!(
                    "register_count must be in 1..={}, got {}",
                    MAX_REGISTER_COUNT, self.register_count
                ),
            });
        }
        if self.max_rules == 0 {
            return Err(CompileError::InvalidConfig {
                reason: "max_rules must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(BackendConfig::default().validate().is_ok());
    }

    #[test]
    fn test_register_count_bounds() {
        let zero = BackendConfig::new().with_register_count(0);
        assert!(matches!(zero.validate(), Err(CompileError::InvalidConfig { .. })));

        let too_many = BackendConfig::new().with_register_count(65);
        assert!(too_many.validate().is_err());

        let max = BackendConfig::new().with_register_count(64);
        assert!(max.validate().is_ok());
    }
}
