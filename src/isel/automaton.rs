// This module implements the pattern automaton shared by every tree the backend selects. It
// is the tree analogue of Aho-Corasick string matching: each rule pattern is linearized into
// its root-to-leaf paths (node kind, child index, node kind, ...) and those paths are inserted
// into one trie. Failure links are then computed breadth first exactly as in Aho-Corasick, and
// every state's acceptance set is unioned with its failure state's. Acceptance is recorded per
// rule as a bitmask of pattern tree depths, which the matcher shifts and intersects bottom up
// to decide whether a whole pattern is satisfied at a node. The automaton is built once per
// run, validated against node arities at that point, and is read-only afterwards.

//! Aho-Corasick style automaton over linearized tree patterns.

use std::collections::VecDeque;

use hashbrown::HashMap;

use crate::core::config::BackendConfig;
use crate::core::error::{CompileError, CompileResult};
use crate::ir::NodeKind;

use super::rule::{Nonterminal, Pattern, Rule, RuleId, RuleSet, Symbol};

/// Index of an automaton state.
pub type StateId = usize;

/// The root state; every walk starts here.
pub const ROOT: StateId = 0;

/// Deepest pattern the per-rule depth masks can represent.
pub const MAX_PATTERN_DEPTH: usize = 63;

/// A single trie state.
#[derive(Debug, Clone)]
pub struct State {
    pub id: StateId,
    /// Symbols consumed from the root to reach this state.
    pub length: usize,
    pub next: HashMap<Symbol, StateId>,
    pub failure: StateId,
    /// Per rule: bit `d` set when a leaf path of that rule at tree depth `d` ends here.
    pub accepting: Vec<u64>,
}

impl State {
    fn new(id: StateId, length: usize, rule_count: usize) -> Self {
        Self {
            id,
            length,
            next: HashMap::new(),
            failure: ROOT,
            accepting: vec![0; rule_count],
        }
    }
}

/// Tree-pattern automaton built from a [`RuleSet`].
#[derive(Debug, Clone)]
pub struct PatternAutomaton {
    states: Vec<State>,
    rule_count: usize,
}

impl PatternAutomaton {
    /// Build the trie for every rule and compute failure links.
    pub fn build(rules: &RuleSet, config: &BackendConfig) -> CompileResult<Self> {
        config.validate()?;
        if rules.len() > config.max_rules {
            let name = rules.get(config.max_rules).name;
            return Err(CompileError::MalformedRule {
                rule: name,
                reason: format!(
                    "rule set has {} rules, configuration allows {}",
                    rules.len(),
                    config.max_rules
                ),
            });
        }

        let rule_count = rules.len();
        let mut automaton = Self {
            states: vec![State::new(ROOT, 0, rule_count)],
            rule_count,
        };

        for (id, rule) in rules.iter() {
            validate_rule(rule)?;
            automaton.insert(&rule.pattern, id, ROOT);
        }
        automaton.compute_failure_links();

        log::debug!(
            "pattern automaton: {} rules, {} states",
            rule_count,
            automaton.states.len()
        );
        Ok(automaton)
    }

    pub fn rule_count(&self) -> usize {
        self.rule_count
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn state(&self, id: StateId) -> &State {
        &self.states[id]
    }

    /// Depth mask of `rule` accepted at `state`.
    pub fn accepting(&self, state: StateId, rule: RuleId) -> u64 {
        self.states[state].accepting[rule]
    }

    /// Every symbol the automaton may be asked to consume.
    pub fn symbols(&self) -> Vec<Symbol> {
        let max_arity = NodeKind::ALL.iter().map(|k| k.arity()).max().unwrap_or(0);
        NodeKind::ALL
            .iter()
            .map(|k| Symbol::Kind(*k))
            .chain((0..max_arity as u8).map(Symbol::Child))
            .chain(Nonterminal::ALL.iter().map(|nt| Symbol::Nt(*nt)))
            .collect()
    }

    /// Transition function. Falls back along failure links and ends at the
    /// root, so it is defined for every state and symbol.
    pub fn succ(&self, mut state: StateId, symbol: Symbol) -> StateId {
        loop {
            if let Some(&next) = self.states[state].next.get(&symbol) {
                return next;
            }
            if state == ROOT {
                return ROOT;
            }
            state = self.states[state].failure;
        }
    }

    fn insert(&mut self, pattern: &Pattern, rule: RuleId, from: StateId) {
        let state = self.goto_or_create(from, pattern.root_symbol());
        let children = pattern.children();
        if children.is_empty() {
            let depth = (self.states[state].length - 1) / 2;
            self.states[state].accepting[rule] |= 1u64 << depth;
        }
        for (index, child) in children.iter().enumerate() {
            let index_state = self.goto_or_create(state, Symbol::Child(index as u8));
            self.insert(child, rule, index_state);
        }
    }

    fn goto_or_create(&mut self, from: StateId, symbol: Symbol) -> StateId {
        if let Some(&existing) = self.states[from].next.get(&symbol) {
            return existing;
        }
        let id = self.states.len();
        let length = self.states[from].length + 1;
        self.states.push(State::new(id, length, self.rule_count));
        self.states[from].next.insert(symbol, id);
        id
    }

    fn compute_failure_links(&mut self) {
        let mut queue: VecDeque<StateId> = VecDeque::new();
        let root_edges: Vec<StateId> = self.states[ROOT].next.values().copied().collect();
        for s in root_edges {
            self.states[s].failure = ROOT;
            queue.push_back(s);
        }

        while let Some(r) = queue.pop_front() {
            let edges: Vec<(Symbol, StateId)> =
                self.states[r].next.iter().map(|(sym, s)| (*sym, *s)).collect();
            for (symbol, s) in edges {
                queue.push_back(s);

                let mut state = self.states[r].failure;
                while state != ROOT && !self.states[state].next.contains_key(&symbol) {
                    state = self.states[state].failure;
                }
                let failure = match self.states[state].next.get(&symbol) {
                    Some(&f) if f != s => f,
                    _ => ROOT,
                };
                self.states[s].failure = failure;

                for rule in 0..self.rule_count {
                    let inherited = self.states[failure].accepting[rule];
                    self.states[s].accepting[rule] |= inherited;
                }
            }
        }
    }
}

fn validate_rule(rule: &Rule) -> CompileResult<()> {
    if rule.pattern.depth() > MAX_PATTERN_DEPTH {
        return Err(CompileError::MalformedRule {
            rule: rule.name,
            reason: format!(
                "pattern depth {} exceeds {}",
                rule.pattern.depth(),
                MAX_PATTERN_DEPTH
            ),
        });
    }
    validate_arity(rule, &rule.pattern)
}

fn validate_arity(rule: &Rule, pattern: &Pattern) -> CompileResult<()> {
    if let Pattern::Kind(kind, children) = pattern {
        if children.len() != kind.arity() {
            return Err(CompileError::MalformedRule {
                rule: rule.name,
                reason: format!(
                    "{:?} takes {} children, pattern gives {}",
                    kind,
                    kind.arity(),
                    children.len()
                ),
            });
        }
        for child in children {
            validate_arity(rule, child)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isel::rule::{imm, reg, Rule};

    fn rules() -> RuleSet {
        RuleSet::new(
            vec![
                Rule::passthrough("lit", Pattern::leaf(NodeKind::Literal), Nonterminal::Imm, 0),
                Rule::passthrough(
                    "add_ri",
                    Pattern::node(NodeKind::Binary, [reg(), imm()]),
                    Nonterminal::Reg,
                    2,
                ),
                Rule::passthrough(
                    "load_off",
                    Pattern::node(
                        NodeKind::Deref,
                        [Pattern::node(NodeKind::Binary, [reg(), imm()])],
                    ),
                    Nonterminal::Mem,
                    0,
                ),
            ],
            Nonterminal::Reg,
        )
    }

    #[test]
    fn test_paths_and_acceptance() {
        let automaton = PatternAutomaton::build(&rules(), &BackendConfig::default()).unwrap();

        let lit = automaton.succ(ROOT, Symbol::Kind(NodeKind::Literal));
        assert_ne!(lit, ROOT);
        assert_eq!(automaton.accepting(lit, 0), 1);

        // Binary 1 Imm ends a depth-1 path of add_ri.
        let bin = automaton.succ(ROOT, Symbol::Kind(NodeKind::Binary));
        let bin1 = automaton.succ(bin, Symbol::Child(1));
        let bin1_imm = automaton.succ(bin1, Symbol::Nt(Nonterminal::Imm));
        assert_eq!(automaton.accepting(bin1_imm, 1), 1 << 1);
    }

    #[test]
    fn test_failure_union() {
        let automaton = PatternAutomaton::build(&rules(), &BackendConfig::default()).unwrap();

        // Deref 0 Binary 1 Imm: depth 2 for load_off, and via the failure
        // link to Binary 1 Imm, depth 1 for add_ri.
        let mut s = ROOT;
        for sym in [
            Symbol::Kind(NodeKind::Deref),
            Symbol::Child(0),
            Symbol::Kind(NodeKind::Binary),
            Symbol::Child(1),
            Symbol::Nt(Nonterminal::Imm),
        ] {
            s = automaton.succ(s, sym);
        }
        assert_eq!(automaton.accepting(s, 2), 1 << 2);
        assert_eq!(automaton.accepting(s, 1), 1 << 1);
    }

    #[test]
    fn test_succ_is_total() {
        let automaton = PatternAutomaton::build(&rules(), &BackendConfig::default()).unwrap();
        for state in 0..automaton.state_count() {
            for sym in automaton.symbols() {
                assert!(automaton.succ(state, sym) < automaton.state_count());
            }
        }
    }

    #[test]
    fn test_malformed_arity() {
        let bad = RuleSet::new(
            vec![Rule::passthrough(
                "bad_deref",
                Pattern::node(NodeKind::Deref, [reg(), reg()]),
                Nonterminal::Mem,
                0,
            )],
            Nonterminal::Mem,
        );
        let err = PatternAutomaton::build(&bad, &BackendConfig::default()).unwrap_err();
        assert!(matches!(err, CompileError::MalformedRule { rule: "bad_deref", .. }));
    }

    #[test]
    fn test_rule_limit() {
        let config = BackendConfig::default().with_max_rules(2);
        let err = PatternAutomaton::build(&rules(), &config).unwrap_err();
        assert!(matches!(err, CompileError::MalformedRule { rule: "load_off", .. }));
    }
}
