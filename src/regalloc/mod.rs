//! Register allocation.
//!
//! Live intervals are computed over the selected instruction stream in
//! instruction order and assigned from a bounded pool by linear scan.

pub mod linear_scan;
pub mod liveness;
pub mod register_pool;

pub use linear_scan::{Allocation, LinearScan};
pub use liveness::{compute_live_intervals, LiveInterval};
pub use register_pool::RegisterPool;
