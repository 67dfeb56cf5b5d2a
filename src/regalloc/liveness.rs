//! Live-interval computation over a straight-line instruction stream.
//!
//! An interval spans from the first to the last position at which a
//! virtual register is referenced, either as an operand or as the base of
//! a memory operand. Branches and joins are not modeled.

use hashbrown::HashMap;

use crate::isel::instruction::InstructionStream;

/// `[start, end]` positions (inclusive) over which `vreg` must stay in a register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveInterval {
    pub vreg: u32,
    pub start: usize,
    pub end: usize,
}

impl LiveInterval {
    pub const fn new(vreg: u32, start: usize, end: usize) -> Self {
        Self { vreg, start, end }
    }

    /// Whether the two intervals share at least one position.
    pub fn overlaps(&self, other: &LiveInterval) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    pub fn contains(&self, position: usize) -> bool {
        self.start <= position && position <= self.end
    }
}

/// Intervals of every virtual register in `stream`, sorted by start then vreg.
pub fn compute_live_intervals(stream: &InstructionStream) -> Vec<LiveInterval> {
    let mut index: HashMap<u32, usize> = HashMap::new();
    let mut intervals: Vec<LiveInterval> = Vec::new();

    for (position, inst) in stream.iter().enumerate() {
        for reg in inst.operands().filter_map(|op| op.vreg()) {
            match index.get(&reg.index) {
                Some(&slot) => intervals[slot].end = position,
                None => {
                    index.insert(reg.index, intervals.len());
                    intervals.push(LiveInterval::new(reg.index, position, position));
                }
            }
        }
    }

    intervals.sort_by_key(|interval| (interval.start, interval.vreg));
    log::trace!("computed {} live intervals", intervals.len());
    intervals
}
