//! IR node model.
//!
//! The input to instruction selection: a typed, already resolved expression
//! tree. Nodes are a closed enum stored in an arena ([`IrTree`]) and
//! addressed by [`NodeId`]; the automaton, matcher and emitter only ever
//! look at them through [`Node::kind`], [`Node::children`] and
//! [`Node::replace_child`], so they stay generic over node shape.

pub mod node;
pub mod tree;

pub use node::{
    BinaryOp, CmpOp, LogicalOp, MemBase, MemOperand, Node, NodeId, NodeKind, PhysReg, UnaryOp,
    Variable, VirtualReg,
};
pub use tree::IrTree;
