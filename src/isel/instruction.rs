//! Target-shaped instructions produced by the emitter.
//!
//! Instructions are two-address x86-64 style: `dst` is read and/or written,
//! `src` is read. Rendering them as text is left to an external printer.

use crate::ir::{CmpOp, MemOperand, VirtualReg};

/// Fixed machine registers outside the allocatable pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MachineReg {
    Rax,
    Rcx,
    Rdx,
    Rsi,
    Rdi,
    R8,
    R9,
    Rsp,
    Rbp,
}

/// System V integer argument registers in order.
pub const ARG_REGS: [MachineReg; 6] = [
    MachineReg::Rdi,
    MachineReg::Rsi,
    MachineReg::Rdx,
    MachineReg::Rcx,
    MachineReg::R8,
    MachineReg::R9,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Condition {
    E,
    Ne,
    L,
    Le,
    G,
    Ge,
}

impl From<CmpOp> for Condition {
    fn from(op: CmpOp) -> Self {
        match op {
            CmpOp::Eq => Condition::E,
            CmpOp::Ne => Condition::Ne,
            CmpOp::Lt => Condition::L,
            CmpOp::Le => Condition::Le,
            CmpOp::Gt => Condition::G,
            CmpOp::Ge => Condition::Ge,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    Mov,
    Movsx,
    Lea,
    Add,
    Sub,
    Imul,
    Idiv,
    Cqo,
    And,
    Or,
    Xor,
    Shl,
    Sar,
    Neg,
    Not,
    Cmp,
    Set(Condition),
    Push,
    Call,
}

/// Instruction operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    VReg(VirtualReg),
    Mem(MemOperand),
    Imm(i64),
    Fixed(MachineReg),
    Symbol(String),
}

impl Operand {
    /// The virtual register this operand references, directly or as a memory base.
    pub fn vreg(&self) -> Option<VirtualReg> {
        match self {
            Operand::VReg(reg) => Some(*reg),
            Operand::Mem(mem) => match mem.base {
                crate::ir::MemBase::Reg(reg) => Some(reg),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn vreg_mut(&mut self) -> Option<&mut VirtualReg> {
        match self {
            Operand::VReg(reg) => Some(reg),
            Operand::Mem(mem) => mem.vreg_mut(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub dst: Option<Operand>,
    pub src: Option<Operand>,
}

impl Instruction {
    pub fn new(opcode: Opcode, dst: Option<Operand>, src: Option<Operand>) -> Self {
        Self { opcode, dst, src }
    }

    pub fn operands(&self) -> impl Iterator<Item = &Operand> {
        self.dst.iter().chain(self.src.iter())
    }

    pub fn operands_mut(&mut self) -> impl Iterator<Item = &mut Operand> {
        self.dst.iter_mut().chain(self.src.iter_mut())
    }
}

/// Append-only instruction sequence for one function.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstructionStream {
    insts: Vec<Instruction>,
}

impl InstructionStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, inst: Instruction) {
        self.insts.push(inst);
    }

    pub fn len(&self) -> usize {
        self.insts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.insts.is_empty()
    }

    pub fn get(&self, pos: usize) -> Option<&Instruction> {
        self.insts.get(pos)
    }

    pub fn get_mut(&mut self, pos: usize) -> Option<&mut Instruction> {
        self.insts.get_mut(pos)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Instruction> {
        self.insts.iter()
    }

    pub fn as_slice(&self) -> &[Instruction] {
        &self.insts
    }
}

impl From<Vec<Instruction>> for InstructionStream {
    fn from(insts: Vec<Instruction>) -> Self {
        Self { insts }
    }
}

impl<'a> IntoIterator for &'a InstructionStream {
    type Item = &'a Instruction;
    type IntoIter = std::slice::Iter<'a, Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.insts.iter()
    }
}
