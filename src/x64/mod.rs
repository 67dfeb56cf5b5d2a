//! x86-64 machine description.
//!
//! The rule table in [`rules`] covers integer arithmetic, comparisons,
//! memory operands with folded displacements, sign extension, address
//! computation and System V calls. Selection results reduce to a register.

pub mod rules;

pub use rules::rules;
