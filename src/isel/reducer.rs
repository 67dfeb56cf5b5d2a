//! Reduction of a labeled tree into instructions.
//!
//! [`EmitContext::reduce`] looks up the rule recorded for a node and goal
//! symbol, first reduces every child the rule binds to a nonterminal
//! (splicing the produced operand node into the tree), and only then runs
//! the rule's emission procedure. Instructions are therefore appended in
//! dependency order. Emission procedures get the same context back, which
//! gives them fresh virtual registers, operand conversion and recursive
//! selection of detached subtrees such as call arguments.

use crate::core::error::{CompileError, CompileResult};
use crate::core::session::SessionStats;
use crate::ir::{IrTree, Node, NodeId, VirtualReg};

use super::automaton::PatternAutomaton;
use super::instruction::{Instruction, InstructionStream, Opcode, Operand};
use super::matcher::{MatchTable, Matcher};
use super::rule::{Nonterminal, Pattern, RuleSet};

/// Mutable state threaded through one tree's reduction.
pub struct EmitContext<'a, 'arena> {
    rules: &'a RuleSet,
    automaton: &'a PatternAutomaton,
    table: &'a mut MatchTable<'arena>,
    tree: &'a mut IrTree,
    stream: &'a mut InstructionStream,
    next_vreg: &'a mut u32,
    stats: &'a mut SessionStats,
}

impl<'a, 'arena> EmitContext<'a, 'arena> {
    pub(crate) fn new(
        rules: &'a RuleSet,
        automaton: &'a PatternAutomaton,
        table: &'a mut MatchTable<'arena>,
        tree: &'a mut IrTree,
        stream: &'a mut InstructionStream,
        next_vreg: &'a mut u32,
        stats: &'a mut SessionStats,
    ) -> Self {
        Self { rules, automaton, table, tree, stream, next_vreg, stats }
    }

    pub fn tree(&self) -> &IrTree {
        &*self.tree
    }

    pub fn node(&self, id: NodeId) -> &Node {
        self.tree.node(id)
    }

    /// Issue the next virtual register of this function.
    pub fn fresh_vreg(&mut self) -> VirtualReg {
        let reg = VirtualReg::new(*self.next_vreg);
        *self.next_vreg += 1;
        self.stats.vregs_issued += 1;
        reg
    }

    pub fn push_node(&mut self, node: Node) -> NodeId {
        self.tree.push(node)
    }

    pub fn vreg_node(&mut self, reg: VirtualReg) -> NodeId {
        self.tree.push(Node::VReg(reg))
    }

    /// Operand form of an already reduced node.
    pub fn operand(&self, id: NodeId) -> CompileResult<Operand> {
        match self.tree.node(id) {
            Node::VReg(reg) => Ok(Operand::VReg(*reg)),
            Node::Mem(mem) => Ok(Operand::Mem(*mem)),
            Node::Literal(value) => Ok(Operand::Imm(*value)),
            node => Err(CompileError::NotAnOperand { node: id, kind: node.kind() }),
        }
    }

    /// Operand form of the `index`th child of `id`.
    pub fn child_operand(&self, id: NodeId, index: usize) -> CompileResult<Operand> {
        let child = self
            .tree
            .child(id, index)
            .ok_or(CompileError::NotAnOperand { node: id, kind: self.tree.kind(id) })?;
        self.operand(child)
    }

    pub fn emit0(&mut self, opcode: Opcode) {
        self.push_inst(Instruction::new(opcode, None, None));
    }

    pub fn emit1(&mut self, opcode: Opcode, dst: Operand) {
        self.push_inst(Instruction::new(opcode, Some(dst), None));
    }

    pub fn emit2(&mut self, opcode: Opcode, dst: Operand, src: Operand) {
        self.push_inst(Instruction::new(opcode, Some(dst), Some(src)));
    }

    fn push_inst(&mut self, inst: Instruction) {
        log::trace!("  emit {:?}", inst);
        self.stream.push(inst);
        self.stats.instructions_emitted += 1;
    }

    /// Label a subtree that the enclosing pass did not visit and reduce it to `goal`.
    /// The subtree must already exist when the tree is labeled; nodes pushed
    /// during emission have no side-table slots.
    pub fn select(&mut self, node: NodeId, goal: Nonterminal) -> CompileResult<NodeId> {
        if !self.table.covers(node) {
            return Err(CompileError::DetachedNode { node, kind: self.tree.kind(node) });
        }
        Matcher::new(self.rules, self.automaton).label(self.tree, self.table, node);
        self.reduce(node, goal)
    }

    /// Realize the rule recorded for (`node`, `goal`) and return its operand node.
    pub fn reduce(&mut self, node: NodeId, goal: Nonterminal) -> CompileResult<NodeId> {
        let rules = self.rules;
        let id = self.table.best_rule(node, goal).ok_or_else(|| CompileError::NoRuleMatched {
            node,
            kind: self.tree.kind(node),
            symbol: goal,
        })?;
        let rule = rules.get(id);

        let bound = match &rule.pattern {
            Pattern::Nt(inner) => self.reduce(node, *inner)?,
            pattern => {
                self.reduce_children(rule.name, pattern, node)?;
                node
            }
        };

        log::debug!("reduce {} to {:?} with {}", node, goal, rule.name);
        *self.stats.rule_applications.entry(rule.name).or_insert(0) += 1;
        (rule.emit)(self, bound)
    }

    /// Reduce children bound to nonterminals, walking structurally through
    /// sub-patterns that spell out a concrete node kind.
    fn reduce_children(&mut self, rule: &'static str, pattern: &Pattern, node: NodeId) -> CompileResult<()> {
        for (index, sub) in pattern.children().iter().enumerate() {
            let child = self.tree.child(node, index).ok_or_else(|| CompileError::MalformedRule {
                rule,
                reason: format!("{:?} node {} has no child {}", self.tree.kind(node), node, index),
            })?;
            match sub {
                Pattern::Nt(nt) => {
                    let operand = self.reduce(child, *nt)?;
                    self.tree.replace_child(node, index, operand);
                }
                Pattern::Kind(..) => self.reduce_children(rule, sub, child)?,
            }
        }
        Ok(())
    }
}
