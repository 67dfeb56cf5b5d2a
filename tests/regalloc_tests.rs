//! Test linear scan allocation over hand-built live intervals.

use arbor::core::{BackendConfig, CompileError};
use arbor::ir::PhysReg;
use arbor::regalloc::{LinearScan, LiveInterval};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn scan(registers: usize) -> LinearScan {
    LinearScan::new(&BackendConfig::default().with_register_count(registers)).unwrap()
}

/// Deterministic pseudo-random intervals that never need more than `width` registers.
fn staggered(count: u32, width: usize) -> Vec<LiveInterval> {
    (0..count)
        .map(|i| {
            let start = i as usize;
            let len = (i as usize * 7 + 3) % width;
            LiveInterval::new(i, start, start + len)
        })
        .collect()
}

#[test]
fn test_register_freed_at_start_is_reused() {
    init();
    let intervals = [
        LiveInterval::new(0, 0, 2),
        LiveInterval::new(1, 1, 3),
        LiveInterval::new(2, 3, 5),
    ];
    let assignments = scan(2).assign(&intervals).unwrap();
    assert_ne!(assignments[0].1, assignments[1].1);
    assert_eq!(assignments[2], (2, assignments[0].1));
}

#[test]
fn test_no_expiry_exhausts_pool() {
    init();
    let intervals = [
        LiveInterval::new(0, 0, 5),
        LiveInterval::new(1, 1, 6),
        LiveInterval::new(2, 2, 7),
    ];
    let err = scan(2).assign(&intervals).unwrap_err();
    assert!(matches!(err, CompileError::RegisterPoolExhausted { vreg: 2, .. }));
}

#[test]
fn test_unsorted_input() {
    init();
    let intervals = [
        LiveInterval::new(2, 3, 5),
        LiveInterval::new(0, 0, 2),
        LiveInterval::new(1, 1, 3),
    ];
    let assignments = scan(2).assign(&intervals).unwrap();
    assert_eq!(assignments, vec![(0, PhysReg(0)), (1, PhysReg(1)), (2, PhysReg(0))]);
}

#[test]
fn test_safety_and_reuse_bound() {
    init();
    let intervals = staggered(40, 5);
    let assignments = scan(5).assign(&intervals).unwrap();
    assert_eq!(assignments.len(), intervals.len());

    let reg_of = |vreg: u32| assignments.iter().find(|(v, _)| *v == vreg).map(|(_, r)| *r).unwrap();
    for a in &intervals {
        for b in &intervals {
            if a.vreg == b.vreg {
                continue;
            }
            if a.overlaps(b) {
                assert_ne!(reg_of(a.vreg), reg_of(b.vreg), "v{} and v{} overlap", a.vreg, b.vreg);
            }
            if reg_of(a.vreg) == reg_of(b.vreg) && a.start < b.start {
                assert!(b.start > a.end, "v{} reused r{} before v{} ended", b.vreg, reg_of(a.vreg).0, a.vreg);
            }
        }
    }
}

#[test]
fn test_allocator_rejects_bad_config() {
    init();
    let err = LinearScan::new(&BackendConfig::default().with_register_count(65)).unwrap_err();
    assert!(matches!(err, CompileError::InvalidConfig { .. }));
}

#[test]
fn test_empty_input() {
    init();
    assert!(scan(1).assign(&[]).unwrap().is_empty());
}
