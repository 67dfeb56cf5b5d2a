// This module implements the linear scan register allocator. Intervals are visited in start
// order while the active set is kept sorted by end position. Before an interval is placed,
// every active interval whose end lies strictly before its start expires and hands its
// register back to the pool, so a register is reused at the earliest position that keeps
// overlapping intervals apart. When the pool is empty the allocation fails with
// RegisterPoolExhausted; the error names the active interval with the furthest end, the one a
// spilling allocator would evict. After assignment every reference inside an interval's span,
// including register bases of memory operands, is bound to its physical register in place.

//! Linear scan allocation over live intervals.

use crate::core::config::BackendConfig;
use crate::core::error::{CompileError, CompileResult};
use crate::ir::PhysReg;
use crate::isel::instruction::InstructionStream;

use super::liveness::{compute_live_intervals, LiveInterval};
use super::register_pool::RegisterPool;

/// Result of allocating one function.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Allocation {
    /// `(vreg, register)` in interval start order.
    pub assignments: Vec<(u32, PhysReg)>,
    pub intervals: Vec<LiveInterval>,
    /// Most intervals live at once.
    pub max_pressure: usize,
}

impl Allocation {
    pub fn register_of(&self, vreg: u32) -> Option<PhysReg> {
        self.assignments.iter().find(|(v, _)| *v == vreg).map(|(_, reg)| *reg)
    }
}

#[derive(Debug, Clone, Copy)]
struct Active {
    interval: LiveInterval,
    reg: PhysReg,
}

/// Linear scan allocator over a bounded register pool.
#[derive(Debug, Clone)]
pub struct LinearScan {
    register_count: usize,
}

impl LinearScan {
    pub fn new(config: &BackendConfig) -> CompileResult<Self> {
        config.validate()?;
        Ok(Self { register_count: config.register_count })
    }

    /// Assign a register to every interval. `intervals` need not be sorted.
    pub fn assign(&self, intervals: &[LiveInterval]) -> CompileResult<Vec<(u32, PhysReg)>> {
        self.scan(intervals).map(|(assignments, _)| assignments)
    }

    /// Compute intervals for `stream`, assign registers and bind every
    /// reference in place.
    pub fn allocate(&self, stream: &mut InstructionStream) -> CompileResult<Allocation> {
        let intervals = compute_live_intervals(stream);
        let (assignments, max_pressure) = self.scan(&intervals)?;

        for (interval, &(vreg, reg)) in intervals.iter().zip(&assignments) {
            bind(stream, interval, vreg, reg);
        }

        log::debug!(
            "allocated {} virtual registers into {} physical (peak pressure {})",
            assignments.len(),
            self.register_count,
            max_pressure
        );
        Ok(Allocation { assignments, intervals, max_pressure })
    }

    fn scan(&self, intervals: &[LiveInterval]) -> CompileResult<(Vec<(u32, PhysReg)>, usize)> {
        let mut order = intervals.to_vec();
        order.sort_by_key(|interval| (interval.start, interval.vreg));

        let mut pool = RegisterPool::new(self.register_count)?;
        let mut active: Vec<Active> = Vec::with_capacity(self.register_count);
        let mut assignments = Vec::with_capacity(order.len());
        let mut max_pressure = 0;

        for interval in order {
            let expired = active.partition_point(|a| a.interval.end < interval.start);
            for done in active.drain(..expired) {
                log::trace!("v{} expires, r{} free", done.interval.vreg, done.reg.0);
                pool.release(done.reg);
            }

            let Some(reg) = pool.take() else {
                let candidate = active.last().map_or(interval.vreg, |a| a.interval.vreg);
                log::warn!(
                    "no register for v{} at {}: {} live, spill candidate v{}",
                    interval.vreg,
                    interval.start,
                    active.len(),
                    candidate
                );
                return Err(CompileError::RegisterPoolExhausted {
                    vreg: interval.vreg,
                    position: interval.start,
                    active: active.len(),
                    candidate,
                });
            };

            log::trace!("v{} [{}, {}] -> r{}", interval.vreg, interval.start, interval.end, reg.0);
            let at = active.partition_point(|a| a.interval.end <= interval.end);
            active.insert(at, Active { interval, reg });
            max_pressure = max_pressure.max(active.len());
            assignments.push((interval.vreg, reg));
        }

        Ok((assignments, max_pressure))
    }
}

fn bind(stream: &mut InstructionStream, interval: &LiveInterval, vreg: u32, reg: PhysReg) {
    for position in interval.start..=interval.end {
        let Some(inst) = stream.get_mut(position) else {
            break;
        };
        for operand in inst.operands_mut() {
            if let Some(v) = operand.vreg_mut() {
                if v.index == vreg {
                    v.phys = Some(reg);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{MemOperand, VirtualReg};
    use crate::isel::instruction::{Instruction, Opcode, Operand};

    fn scan(registers: usize) -> LinearScan {
        LinearScan::new(&BackendConfig::default().with_register_count(registers)).unwrap()
    }

    #[test]
    fn test_reuse_after_expiry() {
        let intervals = [
            LiveInterval::new(0, 0, 2),
            LiveInterval::new(1, 1, 3),
            LiveInterval::new(2, 3, 5),
        ];
        let assignments = scan(2).assign(&intervals).unwrap();
        assert_eq!(assignments, vec![(0, PhysReg(0)), (1, PhysReg(1)), (2, PhysReg(0))]);
    }

    #[test]
    fn test_exhaustion_names_furthest_end() {
        let intervals = [
            LiveInterval::new(0, 0, 5),
            LiveInterval::new(1, 1, 6),
            LiveInterval::new(2, 2, 7),
        ];
        let err = scan(2).assign(&intervals).unwrap_err();
        assert_eq!(
            err,
            CompileError::RegisterPoolExhausted { vreg: 2, position: 2, active: 2, candidate: 1 }
        );
    }

    #[test]
    fn test_touching_end_is_still_live() {
        // [1,3] is live at 3, so [3,4] cannot take its register.
        let intervals = [LiveInterval::new(0, 1, 3), LiveInterval::new(1, 3, 4)];
        let assignments = scan(2).assign(&intervals).unwrap();
        assert_ne!(assignments[0].1, assignments[1].1);
    }

    #[test]
    fn test_overlapping_intervals_never_share() {
        let intervals: Vec<LiveInterval> = (0..12)
            .map(|i| LiveInterval::new(i, (i as usize * 3) % 7, (i as usize * 3) % 7 + (i as usize % 4)))
            .collect();
        let assignments = scan(8).assign(&intervals).unwrap();
        let reg_of = |vreg: u32| assignments.iter().find(|(v, _)| *v == vreg).unwrap().1;
        for a in &intervals {
            for b in &intervals {
                if a.vreg != b.vreg && a.overlaps(b) {
                    assert_ne!(reg_of(a.vreg), reg_of(b.vreg), "v{} and v{}", a.vreg, b.vreg);
                }
            }
        }
    }

    #[test]
    fn test_allocate_binds_references() {
        let v = |i| Operand::VReg(VirtualReg::new(i));
        let mut stream = InstructionStream::from(vec![
            Instruction::new(Opcode::Mov, Some(v(0)), Some(Operand::Imm(16))),
            Instruction::new(Opcode::Mov, Some(v(1)), Some(Operand::Mem(MemOperand::reg(VirtualReg::new(0), 4)))),
            Instruction::new(Opcode::Add, Some(v(1)), Some(Operand::Imm(1))),
            Instruction::new(Opcode::Mov, Some(v(2)), Some(v(1))),
        ]);
        let allocation = scan(2).allocate(&mut stream).unwrap();
        assert_eq!(allocation.max_pressure, 2);

        for inst in stream.iter() {
            for operand in inst.operands() {
                if let Some(reg) = operand.vreg() {
                    assert_eq!(reg.phys, allocation.register_of(reg.index));
                    assert!(reg.phys.is_some());
                }
            }
        }
        // v0 ends at 1 and v2 starts at 3, so v2 reuses v0's register.
        assert_eq!(allocation.register_of(2), allocation.register_of(0));
    }
}
