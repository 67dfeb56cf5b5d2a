// This module defines the error taxonomy for the backend using the thiserror crate. Every
// variant is fatal: NoRuleMatched and NotAnOperand mean the machine description does not
// cover a tree shape, DetachedNode means an emission procedure asked to select a node it
// created after labeling, MalformedRule is raised while the pattern automaton is built (startup,
// never per tree), RegisterPoolExhausted marks the unimplemented spill point of the linear
// scan allocator, and InvalidConfig rejects configurations the bitset structures cannot hold.
// Each variant carries enough context (node, kind, rule name, interval) to find the offender.

//! Error types for instruction selection and register allocation.

use thiserror::Error;

use crate::ir::{NodeId, NodeKind};
use crate::isel::Nonterminal;

/// Main error type for the backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("No rule produces {symbol:?} for {kind:?} node {node}")]
    NoRuleMatched {
        node: NodeId,
        kind: NodeKind,
        symbol: Nonterminal,
    },

    #[error("Malformed rule `{rule}`: {reason}")]
    MalformedRule {
        rule: &'static str,
        reason: String,
    },

    #[error(
        "Register pool exhausted allocating v{vreg} at position {position} \
         ({active} registers live, furthest-end candidate v{candidate})"
    )]
    RegisterPoolExhausted {
        vreg: u32,
        position: usize,
        active: usize,
        candidate: u32,
    },

    #[error("{kind:?} node {node} was pushed after the tree was labeled and cannot be selected")]
    DetachedNode {
        node: NodeId,
        kind: NodeKind,
    },

    #[error("{kind:?} node {node} is not an operand")]
    NotAnOperand {
        node: NodeId,
        kind: NodeKind,
    },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        reason: String,
    },
}

/// Result type alias for backend operations.
pub type CompileResult<T> = Result<T, CompileError>;
