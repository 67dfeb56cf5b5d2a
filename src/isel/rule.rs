//! Machine description types: patterns, costs and rules.

use std::fmt;

use crate::core::error::CompileResult;
use crate::ir::{IrTree, NodeId, NodeKind};

use super::reducer::EmitContext;

/// Index of a rule inside its [`RuleSet`].
pub type RuleId = usize;

/// Result symbol of a rule: the category of value it produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Nonterminal {
    /// Value held in a register.
    Reg,
    /// Immediate operand.
    Imm,
    /// Memory addressing form.
    Mem,
}

impl Nonterminal {
    pub const COUNT: usize = 3;
    pub const ALL: [Nonterminal; Self::COUNT] = [Nonterminal::Reg, Nonterminal::Imm, Nonterminal::Mem];

    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Automaton alphabet. A pattern is linearized as its kind, then for every
/// child a `Child(i)` symbol followed by that child's linearization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    Kind(NodeKind),
    Child(u8),
    Nt(Nonterminal),
}

/// Pattern tree template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    /// A node of this kind whose children match the sub-patterns.
    Kind(NodeKind, Vec<Pattern>),
    /// Any node that can be reduced to the nonterminal.
    Nt(Nonterminal),
}

impl Pattern {
    pub fn leaf(kind: NodeKind) -> Self {
        Pattern::Kind(kind, Vec::new())
    }

    pub fn node(kind: NodeKind, children: impl Into<Vec<Pattern>>) -> Self {
        Pattern::Kind(kind, children.into())
    }

    pub fn root_symbol(&self) -> Symbol {
        match self {
            Pattern::Kind(kind, _) => Symbol::Kind(*kind),
            Pattern::Nt(nt) => Symbol::Nt(*nt),
        }
    }

    pub fn children(&self) -> &[Pattern] {
        match self {
            Pattern::Kind(_, children) => children,
            Pattern::Nt(_) => &[],
        }
    }

    /// Number of node levels below the root.
    pub fn depth(&self) -> usize {
        self.children().iter().map(|c| c.depth() + 1).max().unwrap_or(0)
    }
}

pub fn reg() -> Pattern {
    Pattern::Nt(Nonterminal::Reg)
}

pub fn imm() -> Pattern {
    Pattern::Nt(Nonterminal::Imm)
}

pub fn mem() -> Pattern {
    Pattern::Nt(Nonterminal::Mem)
}

/// Cost computed from the matched subtree; `None` means not applicable here.
pub type CostFn = fn(&IrTree, NodeId) -> Option<u32>;

/// Base cost of a rule. Bound nonterminal positions add their own best cost on top.
#[derive(Clone, Copy)]
pub enum Cost {
    Fixed(u32),
    Computed(CostFn),
}

impl fmt::Debug for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cost::Fixed(c) => write!(f, "Fixed({c})"),
            Cost::Computed(_) => write!(f, "Computed"),
        }
    }
}

/// Emission procedure: appends instructions for the matched node and
/// returns the operand node standing for its result.
pub type EmitFn = fn(&mut EmitContext<'_, '_>, NodeId) -> CompileResult<NodeId>;

/// Emission that hands the matched node back unchanged.
pub fn emit_passthrough(_ctx: &mut EmitContext<'_, '_>, node: NodeId) -> CompileResult<NodeId> {
    Ok(node)
}

/// One pattern → instruction rule.
#[derive(Clone)]
pub struct Rule {
    pub name: &'static str,
    pub pattern: Pattern,
    pub result: Nonterminal,
    pub cost: Cost,
    pub emit: EmitFn,
}

impl Rule {
    pub fn new(name: &'static str, pattern: Pattern, result: Nonterminal, cost: Cost, emit: EmitFn) -> Self {
        Self { name, pattern, result, cost, emit }
    }

    /// Rule emitting nothing, via [`emit_passthrough`].
    pub fn passthrough(name: &'static str, pattern: Pattern, result: Nonterminal, cost: u32) -> Self {
        Self::new(name, pattern, result, Cost::Fixed(cost), emit_passthrough)
    }

    pub fn is_chain(&self) -> bool {
        matches!(self.pattern, Pattern::Nt(_))
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("pattern", &self.pattern)
            .field("result", &self.result)
            .field("cost", &self.cost)
            .finish()
    }
}

/// A fixed machine description.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<Rule>,
    start: Nonterminal,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>, start: Nonterminal) -> Self {
        Self { rules, start }
    }

    /// Symbol the root of every tree must reduce to.
    pub fn start(&self) -> Nonterminal {
        self.start
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn get(&self, id: RuleId) -> &Rule {
        &self.rules[id]
    }

    pub fn iter(&self) -> impl Iterator<Item = (RuleId, &Rule)> {
        self.rules.iter().enumerate()
    }

    pub fn find(&self, name: &str) -> Option<RuleId> {
        self.rules.iter().position(|r| r.name == name)
    }
}
