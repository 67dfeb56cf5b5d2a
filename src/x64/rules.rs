// This module is the hand-authored x86-64 machine description: the rule table the pattern
// automaton is built from and the emission procedures that realize each rule. Rules produce
// one of three nonterminals (register, immediate, memory operand). Immediates are limited to
// the sign-extended 32-bit range x86-64 can encode. Division uses the fixed rax/rdx pair with
// cqo/idiv, shifts by a register count go through rcx, and calls pass the first six arguments
// in the System V integer argument registers, push the rest, and read the result from rax.
// Two-address forms copy the left operand into a fresh virtual register before combining, so
// every rule's result is a newly defined temporary the allocator is free to place.

//! x86-64 rule table and emission procedures.

use crate::core::error::{CompileError, CompileResult};
use crate::ir::{
    BinaryOp, IrTree, LogicalOp, MemBase, MemOperand, Node, NodeId, NodeKind, UnaryOp, VirtualReg,
};
use crate::isel::instruction::{Condition, MachineReg, Opcode, Operand, ARG_REGS};
use crate::isel::reducer::EmitContext;
use crate::isel::rule::{emit_passthrough, imm, mem, reg, Cost, Nonterminal, Pattern, Rule, RuleSet};

use Nonterminal::{Imm, Mem, Reg};

/// The full x86-64 rule set; trees reduce to a register.
pub fn rules() -> RuleSet {
    let binary = |a, b| Pattern::node(NodeKind::Binary, [a, b]);
    RuleSet::new(
        vec![
            Rule::new("imm_literal", Pattern::leaf(NodeKind::Literal), Imm, Cost::Computed(literal_cost), emit_passthrough),
            Rule::new("mov_imm", imm(), Reg, Cost::Fixed(1), emit_copy),
            Rule::new("mov_imm64", Pattern::leaf(NodeKind::Literal), Reg, Cost::Computed(wide_literal_cost), emit_copy),
            Rule::passthrough("vreg", Pattern::leaf(NodeKind::VReg), Reg, 0),
            Rule::new("load", mem(), Reg, Cost::Fixed(1), emit_copy),
            Rule::new("var_slot", Pattern::leaf(NodeKind::Var), Mem, Cost::Fixed(0), emit_var_slot),
            Rule::passthrough("mem", Pattern::leaf(NodeKind::Mem), Mem, 0),
            Rule::new("frame_pointer", Pattern::leaf(NodeKind::FramePointer), Reg, Cost::Fixed(1), emit_frame_pointer),
            Rule::new("binary_ri", binary(reg(), imm()), Reg, Cost::Computed(binary_imm_cost), emit_binary),
            Rule::new("binary_rr", binary(reg(), reg()), Reg, Cost::Computed(binary_reg_cost), emit_binary),
            Rule::new("binary_rm", binary(reg(), mem()), Reg, Cost::Computed(binary_mem_cost), emit_binary),
            Rule::new("unary", Pattern::node(NodeKind::Unary, [reg()]), Reg, Cost::Fixed(2), emit_unary),
            Rule::new("grouping", Pattern::node(NodeKind::Grouping, [reg()]), Reg, Cost::Fixed(0), emit_first_child),
            Rule::new("deref", Pattern::node(NodeKind::Deref, [reg()]), Mem, Cost::Fixed(0), emit_deref),
            Rule::new(
                "deref_disp",
                Pattern::node(NodeKind::Deref, [binary(reg(), imm())]),
                Mem,
                Cost::Computed(displacement_cost),
                emit_deref_disp,
            ),
            Rule::new("addr_of", Pattern::leaf(NodeKind::AddrOf), Reg, Cost::Fixed(1), emit_addr_of),
            Rule::new("compare_rr", Pattern::node(NodeKind::Compare, [reg(), reg()]), Reg, Cost::Fixed(2), emit_compare),
            Rule::new("compare_ri", Pattern::node(NodeKind::Compare, [reg(), imm()]), Reg, Cost::Fixed(2), emit_compare),
            Rule::new("logical", Pattern::node(NodeKind::Logical, [reg(), reg()]), Reg, Cost::Fixed(6), emit_logical),
            Rule::new("store", Pattern::node(NodeKind::Assign, [mem(), reg()]), Reg, Cost::Fixed(1), emit_store),
            Rule::new("sext_reg", Pattern::node(NodeKind::SignExtend, [reg()]), Reg, Cost::Fixed(1), emit_sign_extend),
            Rule::new("sext_mem", Pattern::node(NodeKind::SignExtend, [mem()]), Reg, Cost::Fixed(1), emit_sign_extend),
            Rule::new("call", Pattern::leaf(NodeKind::Call), Reg, Cost::Computed(call_cost), emit_call),
        ],
        Reg,
    )
}

fn fits_imm32(value: i64) -> bool {
    i32::try_from(value).is_ok()
}

fn literal_cost(tree: &IrTree, node: NodeId) -> Option<u32> {
    match tree.node(node) {
        Node::Literal(value) if fits_imm32(*value) => Some(0),
        _ => None,
    }
}

/// `movabs`: the only way to materialize a literal outside the imm32 range.
fn wide_literal_cost(tree: &IrTree, node: NodeId) -> Option<u32> {
    match tree.node(node) {
        Node::Literal(value) if !fits_imm32(*value) => Some(2),
        _ => None,
    }
}

fn binary_op(tree: &IrTree, node: NodeId) -> Option<BinaryOp> {
    match tree.node(node) {
        Node::Binary { op, .. } => Some(*op),
        _ => None,
    }
}

/// `op reg, imm`: idiv has no immediate form and needs a register.
fn binary_imm_cost(tree: &IrTree, node: NodeId) -> Option<u32> {
    match binary_op(tree, node)? {
        BinaryOp::Div | BinaryOp::Rem => None,
        _ => Some(2),
    }
}

/// `op reg, [mem]`; a memory shift count still goes through rcx.
fn binary_mem_cost(tree: &IrTree, node: NodeId) -> Option<u32> {
    match binary_op(tree, node)? {
        BinaryOp::Div | BinaryOp::Rem => None,
        BinaryOp::Shl | BinaryOp::Shr => Some(3),
        _ => Some(2),
    }
}

fn binary_reg_cost(tree: &IrTree, node: NodeId) -> Option<u32> {
    match binary_op(tree, node)? {
        BinaryOp::Div | BinaryOp::Rem => Some(4),
        BinaryOp::Shl | BinaryOp::Shr => Some(3),
        _ => Some(2),
    }
}

/// `[reg + disp]` folds `*(reg + imm)` and `*(reg - imm)` when the folded
/// displacement still fits in 32 bits.
fn displacement_cost(tree: &IrTree, node: NodeId) -> Option<u32> {
    let inner = tree.child(node, 0)?;
    let (op, rhs) = match tree.node(inner) {
        Node::Binary { op: op @ (BinaryOp::Add | BinaryOp::Sub), rhs, .. } => (*op, *rhs),
        _ => return None,
    };
    let Node::Literal(value) = tree.node(rhs) else {
        return None;
    };
    folded_displacement(op, *value).map(|_| 0)
}

fn folded_displacement(op: BinaryOp, offset: i64) -> Option<i32> {
    let offset = if op == BinaryOp::Sub { offset.checked_neg()? } else { offset };
    i32::try_from(offset).ok()
}

fn call_cost(tree: &IrTree, node: NodeId) -> Option<u32> {
    match tree.node(node) {
        Node::Call { args, .. } => Some(2 + args.len() as u32),
        _ => None,
    }
}

/// `mov vN, operand`
fn emit_copy(ctx: &mut EmitContext<'_, '_>, node: NodeId) -> CompileResult<NodeId> {
    let src = ctx.operand(node)?;
    let dst = ctx.fresh_vreg();
    ctx.emit2(Opcode::Mov, Operand::VReg(dst), src);
    Ok(ctx.vreg_node(dst))
}

fn emit_var_slot(ctx: &mut EmitContext<'_, '_>, node: NodeId) -> CompileResult<NodeId> {
    let offset = match ctx.node(node) {
        Node::Var(var) => var.offset,
        other => return Err(CompileError::NotAnOperand { node, kind: other.kind() }),
    };
    Ok(ctx.push_node(Node::Mem(MemOperand::frame(offset))))
}

fn emit_frame_pointer(ctx: &mut EmitContext<'_, '_>, _node: NodeId) -> CompileResult<NodeId> {
    let dst = ctx.fresh_vreg();
    ctx.emit2(Opcode::Mov, Operand::VReg(dst), Operand::Fixed(MachineReg::Rbp));
    Ok(ctx.vreg_node(dst))
}

fn emit_binary(ctx: &mut EmitContext<'_, '_>, node: NodeId) -> CompileResult<NodeId> {
    let Some(op) = binary_op(ctx.tree(), node) else {
        return Err(CompileError::NotAnOperand { node, kind: ctx.tree().kind(node) });
    };
    let lhs = ctx.child_operand(node, 0)?;
    let rhs = ctx.child_operand(node, 1)?;
    let dst = ctx.fresh_vreg();

    match op {
        BinaryOp::Div | BinaryOp::Rem => {
            let result = if op == BinaryOp::Div { MachineReg::Rax } else { MachineReg::Rdx };
            ctx.emit2(Opcode::Mov, Operand::Fixed(MachineReg::Rax), lhs);
            ctx.emit0(Opcode::Cqo);
            ctx.emit1(Opcode::Idiv, rhs);
            ctx.emit2(Opcode::Mov, Operand::VReg(dst), Operand::Fixed(result));
        }
        BinaryOp::Shl | BinaryOp::Shr if !matches!(rhs, Operand::Imm(_)) => {
            let opcode = if op == BinaryOp::Shl { Opcode::Shl } else { Opcode::Sar };
            ctx.emit2(Opcode::Mov, Operand::VReg(dst), lhs);
            ctx.emit2(Opcode::Mov, Operand::Fixed(MachineReg::Rcx), rhs);
            ctx.emit2(opcode, Operand::VReg(dst), Operand::Fixed(MachineReg::Rcx));
        }
        _ => {
            let opcode = match op {
                BinaryOp::Add => Opcode::Add,
                BinaryOp::Sub => Opcode::Sub,
                BinaryOp::Mul => Opcode::Imul,
                BinaryOp::And => Opcode::And,
                BinaryOp::Or => Opcode::Or,
                BinaryOp::Xor => Opcode::Xor,
                BinaryOp::Shl => Opcode::Shl,
                BinaryOp::Shr => Opcode::Sar,
                BinaryOp::Div | BinaryOp::Rem => unreachable!("handled above"),
            };
            ctx.emit2(Opcode::Mov, Operand::VReg(dst), lhs);
            ctx.emit2(opcode, Operand::VReg(dst), rhs);
        }
    }
    Ok(ctx.vreg_node(dst))
}

fn emit_unary(ctx: &mut EmitContext<'_, '_>, node: NodeId) -> CompileResult<NodeId> {
    let op = match ctx.node(node) {
        Node::Unary { op, .. } => *op,
        other => return Err(CompileError::NotAnOperand { node, kind: other.kind() }),
    };
    let src = ctx.child_operand(node, 0)?;
    let dst = ctx.fresh_vreg();
    match op {
        UnaryOp::Neg | UnaryOp::Not => {
            let opcode = if op == UnaryOp::Neg { Opcode::Neg } else { Opcode::Not };
            ctx.emit2(Opcode::Mov, Operand::VReg(dst), src);
            ctx.emit1(opcode, Operand::VReg(dst));
        }
        UnaryOp::LogicalNot => emit_set(ctx, dst, Condition::E, src, Operand::Imm(0)),
    }
    Ok(ctx.vreg_node(dst))
}

/// `mov dst, 0; cmp lhs, rhs; setcc dst`. setcc writes only the low byte,
/// so `dst` is cleared first; mov leaves the flags alone.
fn emit_set(ctx: &mut EmitContext<'_, '_>, dst: VirtualReg, cond: Condition, lhs: Operand, rhs: Operand) {
    ctx.emit2(Opcode::Mov, Operand::VReg(dst), Operand::Imm(0));
    ctx.emit2(Opcode::Cmp, lhs, rhs);
    ctx.emit1(Opcode::Set(cond), Operand::VReg(dst));
}

fn emit_first_child(ctx: &mut EmitContext<'_, '_>, node: NodeId) -> CompileResult<NodeId> {
    ctx.tree()
        .child(node, 0)
        .ok_or(CompileError::NotAnOperand { node, kind: ctx.tree().kind(node) })
}

fn emit_deref(ctx: &mut EmitContext<'_, '_>, node: NodeId) -> CompileResult<NodeId> {
    match ctx.child_operand(node, 0)? {
        Operand::VReg(base) => Ok(ctx.push_node(Node::Mem(MemOperand::reg(base, 0)))),
        _ => Err(CompileError::NotAnOperand { node, kind: NodeKind::Deref }),
    }
}

fn emit_deref_disp(ctx: &mut EmitContext<'_, '_>, node: NodeId) -> CompileResult<NodeId> {
    let not_operand = CompileError::NotAnOperand { node, kind: NodeKind::Deref };
    let inner = ctx.tree().child(node, 0).ok_or_else(|| not_operand.clone())?;
    let Some(op) = binary_op(ctx.tree(), inner) else {
        return Err(not_operand);
    };
    let base = ctx.child_operand(inner, 0)?;
    let offset = ctx.child_operand(inner, 1)?;
    match (base, offset) {
        (Operand::VReg(base), Operand::Imm(offset)) => {
            let disp = folded_displacement(op, offset).ok_or(not_operand)?;
            Ok(ctx.push_node(Node::Mem(MemOperand { base: MemBase::Reg(base), disp })))
        }
        _ => Err(not_operand),
    }
}

fn emit_addr_of(ctx: &mut EmitContext<'_, '_>, node: NodeId) -> CompileResult<NodeId> {
    let offset = match ctx.node(node) {
        Node::AddrOf(var) => var.offset,
        other => return Err(CompileError::NotAnOperand { node, kind: other.kind() }),
    };
    let dst = ctx.fresh_vreg();
    ctx.emit2(Opcode::Lea, Operand::VReg(dst), Operand::Mem(MemOperand::frame(offset)));
    Ok(ctx.vreg_node(dst))
}

fn emit_compare(ctx: &mut EmitContext<'_, '_>, node: NodeId) -> CompileResult<NodeId> {
    let op = match ctx.node(node) {
        Node::Compare { op, .. } => *op,
        other => return Err(CompileError::NotAnOperand { node, kind: other.kind() }),
    };
    let lhs = ctx.child_operand(node, 0)?;
    let rhs = ctx.child_operand(node, 1)?;
    let dst = ctx.fresh_vreg();
    emit_set(ctx, dst, Condition::from(op), lhs, rhs);
    Ok(ctx.vreg_node(dst))
}

/// Each side is normalized to 0/1 with `setne` before the bitwise combine.
fn emit_logical(ctx: &mut EmitContext<'_, '_>, node: NodeId) -> CompileResult<NodeId> {
    let opcode = match ctx.node(node) {
        Node::Logical { op: LogicalOp::And, .. } => Opcode::And,
        Node::Logical { op: LogicalOp::Or, .. } => Opcode::Or,
        other => return Err(CompileError::NotAnOperand { node, kind: other.kind() }),
    };
    let lhs = ctx.child_operand(node, 0)?;
    let rhs = ctx.child_operand(node, 1)?;
    let lhs_bool = ctx.fresh_vreg();
    emit_set(ctx, lhs_bool, Condition::Ne, lhs, Operand::Imm(0));
    let rhs_bool = ctx.fresh_vreg();
    emit_set(ctx, rhs_bool, Condition::Ne, rhs, Operand::Imm(0));
    let dst = ctx.fresh_vreg();
    ctx.emit2(Opcode::Mov, Operand::VReg(dst), Operand::VReg(lhs_bool));
    ctx.emit2(opcode, Operand::VReg(dst), Operand::VReg(rhs_bool));
    Ok(ctx.vreg_node(dst))
}

/// `mov [mem], reg`; the assignment's value is the stored register.
fn emit_store(ctx: &mut EmitContext<'_, '_>, node: NodeId) -> CompileResult<NodeId> {
    let target = ctx.child_operand(node, 0)?;
    let value = ctx.child_operand(node, 1)?;
    ctx.emit2(Opcode::Mov, target, value);
    ctx.tree()
        .child(node, 1)
        .ok_or(CompileError::NotAnOperand { node, kind: NodeKind::Assign })
}

fn emit_sign_extend(ctx: &mut EmitContext<'_, '_>, node: NodeId) -> CompileResult<NodeId> {
    let src = ctx.child_operand(node, 0)?;
    let dst = ctx.fresh_vreg();
    ctx.emit2(Opcode::Movsx, Operand::VReg(dst), src);
    Ok(ctx.vreg_node(dst))
}

fn emit_call(ctx: &mut EmitContext<'_, '_>, node: NodeId) -> CompileResult<NodeId> {
    let (callee, args) = match ctx.node(node) {
        Node::Call { callee, args } => (callee.clone(), args.clone()),
        other => return Err(CompileError::NotAnOperand { node, kind: other.kind() }),
    };

    let mut values = Vec::with_capacity(args.len());
    for arg in args {
        let value = ctx.select(arg, Reg)?;
        values.push(ctx.operand(value)?);
    }

    let stacked = values.len().saturating_sub(ARG_REGS.len());
    for value in values.iter().skip(ARG_REGS.len()).rev() {
        ctx.emit1(Opcode::Push, value.clone());
    }
    for (value, reg) in values.into_iter().zip(ARG_REGS) {
        ctx.emit2(Opcode::Mov, Operand::Fixed(reg), value);
    }
    ctx.emit1(Opcode::Call, Operand::Symbol(callee));
    if stacked > 0 {
        ctx.emit2(Opcode::Add, Operand::Fixed(MachineReg::Rsp), Operand::Imm(8 * stacked as i64));
    }

    let dst = ctx.fresh_vreg();
    ctx.emit2(Opcode::Mov, Operand::VReg(dst), Operand::Fixed(MachineReg::Rax));
    Ok(ctx.vreg_node(dst))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::BackendConfig;
    use crate::isel::PatternAutomaton;

    #[test]
    fn test_rules_build() {
        let rules = rules();
        let automaton = PatternAutomaton::build(&rules, &BackendConfig::default()).unwrap();
        assert_eq!(automaton.rule_count(), rules.len());
        assert_eq!(rules.start(), Reg);
    }

    #[test]
    fn test_literal_cost_range() {
        let mut tree = IrTree::new();
        let small = tree.push(Node::Literal(-42));
        let large = tree.push(Node::Literal(1 << 40));
        assert_eq!(literal_cost(&tree, small), Some(0));
        assert_eq!(literal_cost(&tree, large), None);
        assert_eq!(wide_literal_cost(&tree, small), None);
        assert_eq!(wide_literal_cost(&tree, large), Some(2));
    }

    #[test]
    fn test_shift_by_memory_priced_like_register_shift() {
        let mut tree = IrTree::new();
        let x = tree.push(Node::Var(crate::ir::Variable::new("x", -8)));
        let n = tree.push(Node::Var(crate::ir::Variable::new("n", -16)));
        let shl = tree.push(Node::Binary { op: BinaryOp::Shl, lhs: x, rhs: n });
        let add = tree.push(Node::Binary { op: BinaryOp::Add, lhs: x, rhs: n });
        assert_eq!(binary_mem_cost(&tree, shl), Some(3));
        assert_eq!(binary_mem_cost(&tree, shl), binary_reg_cost(&tree, shl));
        assert_eq!(binary_mem_cost(&tree, add), Some(2));
    }

    #[test]
    fn test_displacement_must_fit_after_negation() {
        assert_eq!(folded_displacement(BinaryOp::Sub, i32::MIN as i64), None);
        assert_eq!(folded_displacement(BinaryOp::Add, i32::MIN as i64), Some(i32::MIN));
        assert_eq!(folded_displacement(BinaryOp::Sub, i32::MAX as i64), Some(-i32::MAX));
    }
}
