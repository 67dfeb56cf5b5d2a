//! Bounded pool of allocatable physical registers.
//!
//! The pool is a single 64-bit set of free register ids. Fixed machine
//! registers used by the machine description are not part of it.

use crate::core::config::MAX_REGISTER_COUNT;
use crate::core::error::{CompileError, CompileResult};
use crate::ir::PhysReg;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterPool {
    free: u64,
    size: usize,
}

impl RegisterPool {
    pub fn new(size: usize) -> CompileResult<Self> {
        if size == 0 || size > MAX_REGISTER_COUNT {
            return Err(CompileError::InvalidConfig {
                reason: format!("register pool of {} must hold 1..={} registers", size, MAX_REGISTER_COUNT),
            });
        }
        let free = if size == MAX_REGISTER_COUNT { u64::MAX } else { (1u64 << size) - 1 };
        Ok(Self { free, size })
    }

    /// Total number of registers in the pool.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn free_count(&self) -> usize {
        self.free.count_ones() as usize
    }

    pub fn is_free(&self, reg: PhysReg) -> bool {
        (reg.0 as usize) < self.size && self.free & (1u64 << reg.0) != 0
    }

    /// Take the lowest-numbered free register.
    pub fn take(&mut self) -> Option<PhysReg> {
        if self.free == 0 {
            return None;
        }
        let id = self.free.trailing_zeros() as u8;
        self.free &= !(1u64 << id);
        Some(PhysReg(id))
    }

    pub fn release(&mut self, reg: PhysReg) {
        if (reg.0 as usize) < self.size {
            self.free |= 1u64 << reg.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_lowest_first() {
        let mut pool = RegisterPool::new(3).unwrap();
        assert_eq!(pool.take(), Some(PhysReg(0)));
        assert_eq!(pool.take(), Some(PhysReg(1)));
        pool.release(PhysReg(0));
        assert_eq!(pool.take(), Some(PhysReg(0)));
        assert_eq!(pool.take(), Some(PhysReg(2)));
        assert_eq!(pool.take(), None);
        assert_eq!(pool.free_count(), 0);
    }

    #[test]
    fn test_full_width_pool() {
        let mut pool = RegisterPool::new(64).unwrap();
        assert_eq!(pool.free_count(), 64);
        for _ in 0..64 {
            assert!(pool.take().is_some());
        }
        assert_eq!(pool.take(), None);
    }

    #[test]
    fn test_rejects_bad_sizes() {
        assert!(matches!(RegisterPool::new(0), Err(CompileError::InvalidConfig { .. })));
        assert!(matches!(RegisterPool::new(65), Err(CompileError::InvalidConfig { .. })));
    }

    #[test]
    fn test_release_out_of_range_ignored() {
        let mut pool = RegisterPool::new(2).unwrap();
        pool.release(PhysReg(5));
        assert!(!pool.is_free(PhysReg(5)));
        assert_eq!(pool.free_count(), 2);
    }
}
