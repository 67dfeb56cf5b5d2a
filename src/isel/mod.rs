// This module groups the instruction selector. A RuleSet is the machine description: tree
// patterns over node kinds and nonterminals, each with a cost and an emission procedure. The
// PatternAutomaton is built once from it and shared read-only by every tree. The Matcher
// labels a tree bottom up with the cheapest rule per node and nonterminal, recording its
// results in a MatchTable side table, and the EmitContext reduces the labeled tree top down
// into the function's InstructionStream over virtual registers.

//! Tree-pattern instruction selection.

pub mod automaton;
pub mod instruction;
pub mod matcher;
pub mod reducer;
pub mod rule;

pub use automaton::{PatternAutomaton, StateId, ROOT};
pub use instruction::{Condition, Instruction, InstructionStream, MachineReg, Opcode, Operand};
pub use matcher::{BestMatch, MatchTable, Matcher};
pub use reducer::EmitContext;
pub use rule::{emit_passthrough, imm, mem, reg, Cost, EmitFn, Nonterminal, Pattern, Rule, RuleId, RuleSet, Symbol};
