//! Cost-driven bottom-up labeling.
//!
//! The matcher walks one tree in post order, advancing the shared
//! [`PatternAutomaton`] along every root-to-node path. Per node it keeps a
//! partial-match word per rule (bit `d`: the rule's pattern is satisfied
//! `d` levels above this node). Children's words are shifted down and
//! intersected into the parent, so bit 0 means the whole pattern matches
//! here. For every such rule the cost is evaluated and the cheapest rule per
//! result symbol is recorded; recording a symbol feeds the automaton again
//! as if the node were that nonterminal, which is how rules above it see it.
//!
//! All annotations live in a [`MatchTable`] side table allocated in the
//! session's scratch arena and keyed by [`NodeId`].

use bumpalo::collections::Vec as BumpVec;
use bumpalo::Bump;

use crate::ir::{IrTree, NodeId};

use super::automaton::{PatternAutomaton, StateId, ROOT};
use super::rule::{Cost, Nonterminal, Pattern, Rule, RuleId, RuleSet, Symbol};

/// Best `(cost, rule)` recorded for one node and result symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BestMatch {
    pub cost: u32,
    pub rule: RuleId,
}

/// Per-tree annotations keyed by node index.
pub struct MatchTable<'arena> {
    rule_count: usize,
    states: BumpVec<'arena, StateId>,
    partial: BumpVec<'arena, u64>,
    best: BumpVec<'arena, Option<BestMatch>>,
}

impl<'arena> MatchTable<'arena> {
    /// Allocate a table for `node_count` nodes and `rule_count` rules in `arena`.
    pub fn new_in(arena: &'arena Bump, node_count: usize, rule_count: usize) -> Self {
        let mut states = BumpVec::with_capacity_in(node_count, arena);
        states.resize(node_count, ROOT);
        let mut partial = BumpVec::with_capacity_in(node_count * rule_count, arena);
        partial.resize(node_count * rule_count, 0);
        let mut best = BumpVec::with_capacity_in(node_count * Nonterminal::COUNT, arena);
        best.resize(node_count * Nonterminal::COUNT, None);
        Self { rule_count, states, partial, best }
    }

    /// Whether `node` existed when the table was allocated.
    pub fn covers(&self, node: NodeId) -> bool {
        node.index() < self.states.len()
    }

    /// Automaton state reached at `node`.
    pub fn state(&self, node: NodeId) -> Option<StateId> {
        self.states.get(node.index()).copied()
    }

    /// Partial-match word of `rule` at `node`.
    pub fn partial(&self, node: NodeId, rule: RuleId) -> u64 {
        if !self.covers(node) {
            return 0;
        }
        self.partial[node.index() * self.rule_count + rule]
    }

    pub fn best(&self, node: NodeId, symbol: Nonterminal) -> Option<BestMatch> {
        if !self.covers(node) {
            return None;
        }
        self.best[node.index() * Nonterminal::COUNT + symbol.index()]
    }

    pub fn best_cost(&self, node: NodeId, symbol: Nonterminal) -> Option<u32> {
        self.best(node, symbol).map(|b| b.cost)
    }

    pub fn best_rule(&self, node: NodeId, symbol: Nonterminal) -> Option<RuleId> {
        self.best(node, symbol).map(|b| b.rule)
    }

    fn set_state(&mut self, node: NodeId, state: StateId) {
        self.states[node.index()] = state;
    }

    fn or_partial(&mut self, node: NodeId, rule: RuleId, bits: u64) {
        self.partial[node.index() * self.rule_count + rule] |= bits;
    }

    /// Record `candidate` if it is strictly cheaper than what is there.
    fn offer(&mut self, node: NodeId, symbol: Nonterminal, candidate: BestMatch) -> bool {
        let slot = &mut self.best[node.index() * Nonterminal::COUNT + symbol.index()];
        match *slot {
            Some(current) if current.cost <= candidate.cost => false,
            _ => {
                *slot = Some(candidate);
                true
            }
        }
    }
}

/// Where a node sits relative to its parent: the parent's state and the child index.
#[derive(Debug, Clone, Copy)]
struct Position {
    parent_state: StateId,
    index: u8,
}

/// Labels trees against a rule set through its automaton.
pub struct Matcher<'a> {
    rules: &'a RuleSet,
    automaton: &'a PatternAutomaton,
}

impl<'a> Matcher<'a> {
    pub fn new(rules: &'a RuleSet, automaton: &'a PatternAutomaton) -> Self {
        Self { rules, automaton }
    }

    /// Label the subtree rooted at `root`, treating it as a tree root.
    pub fn label(&self, tree: &IrTree, table: &mut MatchTable<'_>, root: NodeId) {
        self.visit(tree, table, root, None);
    }

    /// Cost of `rule` at `node` given the children's recorded costs.
    pub fn rule_cost(&self, tree: &IrTree, table: &MatchTable<'_>, rule: &Rule, node: NodeId) -> Option<u32> {
        let base = match rule.cost {
            Cost::Fixed(cost) => cost,
            Cost::Computed(f) => f(tree, node)?,
        };
        bound_cost(tree, table, &rule.pattern, node).map(|bound| base.saturating_add(bound))
    }

    fn visit(&self, tree: &IrTree, table: &mut MatchTable<'_>, node: NodeId, pos: Option<Position>) {
        let kind = Symbol::Kind(tree.kind(node));
        let state = match pos {
            Some(p) => {
                let index_state = self.automaton.succ(p.parent_state, Symbol::Child(p.index));
                self.automaton.succ(index_state, kind)
            }
            None => self.automaton.succ(ROOT, kind),
        };
        table.set_state(node, state);

        let children = tree.children(node);
        for (index, &child) in children.iter().enumerate() {
            let child_pos = Position { parent_state: state, index: index as u8 };
            self.visit(tree, table, child, Some(child_pos));
        }

        self.accept(table, node, state);
        if !children.is_empty() {
            for rule in 0..self.rules.len() {
                let product = children
                    .iter()
                    .fold(u64::MAX, |acc, &child| acc & (table.partial(child, rule) >> 1));
                table.or_partial(node, rule, product);
            }
        }
        self.reduce(tree, table, node, pos);
    }

    fn accept(&self, table: &mut MatchTable<'_>, node: NodeId, state: StateId) {
        for rule in 0..self.rules.len() {
            let bits = self.automaton.accepting(state, rule);
            if bits != 0 {
                table.or_partial(node, rule, bits);
            }
        }
    }

    /// Evaluate every fully matched rule until no best cost improves, so
    /// chain rules fire regardless of their position in the table.
    fn reduce(&self, tree: &IrTree, table: &mut MatchTable<'_>, node: NodeId, pos: Option<Position>) {
        loop {
            let mut changed = false;
            for (id, rule) in self.rules.iter() {
                if table.partial(node, id) & 1 == 0 {
                    continue;
                }
                let Some(cost) = self.rule_cost(tree, table, rule, node) else {
                    continue;
                };
                if !table.offer(node, rule.result, BestMatch { cost, rule: id }) {
                    continue;
                }
                log::trace!("node {} : {:?} <- {} (cost {})", node, rule.result, rule.name, cost);
                changed = true;

                let as_symbol = Symbol::Nt(rule.result);
                let state = match pos {
                    Some(p) => {
                        let index_state = self.automaton.succ(p.parent_state, Symbol::Child(p.index));
                        self.automaton.succ(index_state, as_symbol)
                    }
                    None => self.automaton.succ(ROOT, as_symbol),
                };
                self.accept(table, node, state);
            }
            if !changed {
                break;
            }
        }
    }
}

/// Sum of the best costs of every nonterminal-bound position of `pattern` laid over `node`.
fn bound_cost(tree: &IrTree, table: &MatchTable<'_>, pattern: &Pattern, node: NodeId) -> Option<u32> {
    match pattern {
        Pattern::Nt(nt) => table.best_cost(node, *nt),
        Pattern::Kind(kind, subs) => {
            if tree.kind(node) != *kind {
                return None;
            }
            let children = tree.children(node);
            subs.iter().zip(children).try_fold(0u32, |acc, (sub, child)| {
                bound_cost(tree, table, sub, child).map(|c| acc.saturating_add(c))
            })
        }
    }
}
