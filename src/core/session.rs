// This module provides the per-function selection session. A FunctionSession borrows the
// shared, read-only rule set and pattern automaton from the Backend and owns everything that
// is scoped to one function: the bumpalo scratch arena the per-tree match tables are allocated
// in (reset before every tree so annotations never leak between trees), the append-only
// instruction stream, the virtual register counter (indices are unique and monotonically
// issued for the whole function), and SessionStats with per-rule application counts. Sessions
// are independent of each other, so a host may run one per function on separate threads.

//! Per-function selection session and statistics.

use bumpalo::Bump;
use hashbrown::HashMap;
use std::fmt;

use crate::ir::{IrTree, NodeId};
use crate::isel::instruction::InstructionStream;
use crate::isel::matcher::{MatchTable, Matcher};
use crate::isel::reducer::EmitContext;
use crate::isel::{PatternAutomaton, RuleSet};

use super::error::CompileResult;

/// Statistics gathered while selecting one function.
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    pub trees_selected: usize,
    pub instructions_emitted: usize,
    pub vregs_issued: usize,
    pub rule_applications: HashMap<&'static str, usize>,
}

impl fmt::Display for SessionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Selection Statistics:")?;
        writeln!(f, "  Trees selected: {}", self.trees_selected)?;
        writeln!(f, "  Instructions emitted: {}", self.instructions_emitted)?;
        writeln!(f, "  Virtual registers: {}", self.vregs_issued)?;
        if !self.rule_applications.is_empty() {
            let mut rules: Vec<_> = self.rule_applications.iter().collect();
            rules.sort();
            writeln!(f, "  Rule applications:")?;
            for (name, count) in rules {
                writeln!(f, "    {}: {}", name, count)?;
            }
        }
        Ok(())
    }
}

/// Selection state for one function.
pub struct FunctionSession<'b> {
    rules: &'b RuleSet,
    automaton: &'b PatternAutomaton,
    scratch: Bump,
    stream: InstructionStream,
    next_vreg: u32,
    stats: SessionStats,
}

impl<'b> FunctionSession<'b> {
    pub fn new(rules: &'b RuleSet, automaton: &'b PatternAutomaton) -> Self {
        Self {
            rules,
            automaton,
            scratch: Bump::new(),
            stream: InstructionStream::new(),
            next_vreg: 0,
            stats: SessionStats::default(),
        }
    }

    /// Select instructions for the tree rooted at `root`, appending to this
    /// function's stream. Returns the operand node holding the tree's value.
    pub fn select_tree(&mut self, tree: &mut IrTree, root: NodeId) -> CompileResult<NodeId> {
        self.scratch.reset();
        let mut table = MatchTable::new_in(&self.scratch, tree.len(), self.rules.len());
        Matcher::new(self.rules, self.automaton).label(tree, &mut table, root);

        let start = self.rules.start();
        let mut ctx = EmitContext::new(
            self.rules,
            self.automaton,
            &mut table,
            tree,
            &mut self.stream,
            &mut self.next_vreg,
            &mut self.stats,
        );
        let result = ctx.reduce(root, start)?;
        self.stats.trees_selected += 1;
        log::debug!(
            "selected tree {}: {} instructions so far, {} scratch bytes",
            root,
            self.stream.len(),
            self.scratch.allocated_bytes()
        );
        Ok(result)
    }

    pub fn stream(&self) -> &InstructionStream {
        &self.stream
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Finish the function, handing back its instruction stream.
    pub fn finish(self) -> (InstructionStream, SessionStats) {
        (self.stream, self.stats)
    }
}
