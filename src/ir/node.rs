//! IR node variants and the operand values shared with the instruction stream.

use std::fmt;

/// Index of a node inside its [`IrTree`](super::IrTree) arena.
///
/// Per-pass annotations are keyed by this index, so the node values
/// themselves never carry scratch state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Physical register id drawn from the allocatable pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PhysReg(pub u8);

/// A virtual temporary, optionally bound to a physical register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VirtualReg {
    pub index: u32,
    pub phys: Option<PhysReg>,
}

impl VirtualReg {
    pub const fn new(index: u32) -> Self {
        Self { index, phys: None }
    }
}

/// Base of a memory operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemBase {
    /// Displacement is an absolute address.
    Absolute,
    /// Relative to the frame pointer.
    FramePointer,
    /// Relative to a register.
    Reg(VirtualReg),
}

/// `[base + disp]` addressing form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemOperand {
    pub base: MemBase,
    pub disp: i32,
}

impl MemOperand {
    pub const fn frame(disp: i32) -> Self {
        Self { base: MemBase::FramePointer, disp }
    }

    pub const fn reg(reg: VirtualReg, disp: i32) -> Self {
        Self { base: MemBase::Reg(reg), disp }
    }

    pub fn vreg_mut(&mut self) -> Option<&mut VirtualReg> {
        match &mut self.base {
            MemBase::Reg(reg) => Some(reg),
            _ => None,
        }
    }
}

/// A resolved local variable: the front end has already assigned its frame slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub offset: i32,
}

impl Variable {
    pub fn new(name: impl Into<String>, offset: i32) -> Self {
        Self { name: name.into(), offset }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Not,
    LogicalNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOp {
    And,
    Or,
}

/// Closed set of IR node shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Binary { op: BinaryOp, lhs: NodeId, rhs: NodeId },
    /// Arguments are not pattern-visible children; the call rule selects them.
    Call { callee: String, args: Vec<NodeId> },
    Literal(i64),
    Var(Variable),
    VReg(VirtualReg),
    Mem(MemOperand),
    Unary { op: UnaryOp, operand: NodeId },
    Grouping(NodeId),
    Deref(NodeId),
    AddrOf(Variable),
    Compare { op: CmpOp, lhs: NodeId, rhs: NodeId },
    Logical { op: LogicalOp, lhs: NodeId, rhs: NodeId },
    Assign { target: NodeId, value: NodeId },
    SignExtend(NodeId),
    FramePointer,
}

/// Fieldless discriminant of [`Node`], used as an automaton symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    Binary,
    Call,
    Literal,
    Var,
    VReg,
    Mem,
    Unary,
    Grouping,
    Deref,
    AddrOf,
    Compare,
    Logical,
    Assign,
    SignExtend,
    FramePointer,
}

impl NodeKind {
    pub const ALL: [NodeKind; 15] = [
        NodeKind::Binary,
        NodeKind::Call,
        NodeKind::Literal,
        NodeKind::Var,
        NodeKind::VReg,
        NodeKind::Mem,
        NodeKind::Unary,
        NodeKind::Grouping,
        NodeKind::Deref,
        NodeKind::AddrOf,
        NodeKind::Compare,
        NodeKind::Logical,
        NodeKind::Assign,
        NodeKind::SignExtend,
        NodeKind::FramePointer,
    ];

    /// Number of pattern-visible children a node of this kind has.
    pub const fn arity(self) -> usize {
        match self {
            NodeKind::Binary | NodeKind::Compare | NodeKind::Logical | NodeKind::Assign => 2,
            NodeKind::Unary | NodeKind::Grouping | NodeKind::Deref | NodeKind::SignExtend => 1,
            NodeKind::Call
            | NodeKind::Literal
            | NodeKind::Var
            | NodeKind::VReg
            | NodeKind::Mem
            | NodeKind::AddrOf
            | NodeKind::FramePointer => 0,
        }
    }
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Binary { .. } => NodeKind::Binary,
            Node::Call { .. } => NodeKind::Call,
            Node::Literal(_) => NodeKind::Literal,
            Node::Var(_) => NodeKind::Var,
            Node::VReg(_) => NodeKind::VReg,
            Node::Mem(_) => NodeKind::Mem,
            Node::Unary { .. } => NodeKind::Unary,
            Node::Grouping(_) => NodeKind::Grouping,
            Node::Deref(_) => NodeKind::Deref,
            Node::AddrOf(_) => NodeKind::AddrOf,
            Node::Compare { .. } => NodeKind::Compare,
            Node::Logical { .. } => NodeKind::Logical,
            Node::Assign { .. } => NodeKind::Assign,
            Node::SignExtend(_) => NodeKind::SignExtend,
            Node::FramePointer => NodeKind::FramePointer,
        }
    }

    /// Pattern-visible children in order.
    pub fn children(&self) -> Vec<NodeId> {
        match self {
            Node::Binary { lhs, rhs, .. }
            | Node::Compare { lhs, rhs, .. }
            | Node::Logical { lhs, rhs, .. } => vec![*lhs, *rhs],
            Node::Assign { target, value } => vec![*target, *value],
            Node::Unary { operand, .. } => vec![*operand],
            Node::Grouping(inner) | Node::Deref(inner) | Node::SignExtend(inner) => vec![*inner],
            Node::Call { .. }
            | Node::Literal(_)
            | Node::Var(_)
            | Node::VReg(_)
            | Node::Mem(_)
            | Node::AddrOf(_)
            | Node::FramePointer => Vec::new(),
        }
    }

    /// Replace the child at `index`. Returns false if there is no such child.
    pub fn replace_child(&mut self, index: usize, new: NodeId) -> bool {
        let slot = match (self, index) {
            (Node::Binary { lhs, .. }, 0)
            | (Node::Compare { lhs, .. }, 0)
            | (Node::Logical { lhs, .. }, 0) => lhs,
            (Node::Binary { rhs, .. }, 1)
            | (Node::Compare { rhs, .. }, 1)
            | (Node::Logical { rhs, .. }, 1) => rhs,
            (Node::Assign { target, .. }, 0) => target,
            (Node::Assign { value, .. }, 1) => value,
            (Node::Unary { operand, .. }, 0) => operand,
            (Node::Grouping(inner), 0) | (Node::Deref(inner), 0) | (Node::SignExtend(inner), 0) => {
                inner
            }
            _ => return false,
        };
        *slot = new;
        true
    }
}
