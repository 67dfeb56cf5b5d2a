//! Arbor - tree-pattern instruction selection and linear scan allocation.
//!
//! Arbor is the backend core of a small compiler. Typed IR trees are
//! labeled by a cost-driven matcher running on one Aho-Corasick style
//! automaton shared by all rules, reduced into x86-64 shaped instructions
//! over virtual registers, and those registers are then mapped onto a
//! bounded physical pool by linear scan.
//!
//! # Primary Usage
//!
//! ```ignore
//! use arbor::core::{Backend, BackendConfig};
//! use arbor::ir::{BinaryOp, IrTree, Node, Variable};
//!
//! let backend = Backend::x64(BackendConfig::default())?;
//! let mut tree = IrTree::new();
//! let x = tree.push(Node::Var(Variable::new("x", -8)));
//! let one = tree.push(Node::Literal(1));
//! let sum = tree.push(Node::Binary { op: BinaryOp::Add, lhs: x, rhs: one });
//! let compiled = backend.compile_function(&mut tree, &[sum])?;
//! ```
//!
//! # Architecture
//!
//! - [`ir`] - IR node model
//! - [`isel`] - Rule sets, pattern automaton, matcher and reducer
//! - [`x64`] - x86-64 machine description
//! - [`regalloc`] - Live intervals and linear scan
//! - [`core`] - Configuration, errors, sessions and the driver

pub mod core;
pub mod ir;
pub mod isel;
pub mod regalloc;
pub mod x64;

pub use crate::core::{
    Backend, BackendConfig, CompileError, CompileResult, CompiledFunction, FunctionSession,
    SessionStats,
};
pub use ir::{IrTree, Node, NodeId, NodeKind};
pub use isel::{InstructionStream, Nonterminal, PatternAutomaton, Rule, RuleSet};
pub use regalloc::{Allocation, LinearScan};
