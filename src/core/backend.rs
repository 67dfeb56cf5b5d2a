// This module defines the Backend driver that ties the passes together for a compilation run.
// A Backend owns the immutable RuleSet and the PatternAutomaton built from it, plus the
// validated BackendConfig. For each function the host opens a FunctionSession, selects every
// statement tree into the function's instruction stream, and hands the finished stream to the
// linear scan allocator. compile_function runs that whole flow for a list of tree roots.
// Backend is Sync, so independent functions may be compiled on separate threads with one
// session each.

//! Compilation driver: rule set, automaton and per-function pipeline.

use crate::ir::{IrTree, NodeId};
use crate::isel::instruction::InstructionStream;
use crate::isel::{PatternAutomaton, RuleSet};
use crate::regalloc::{Allocation, LinearScan};

use super::config::BackendConfig;
use super::error::CompileResult;
use super::session::{FunctionSession, SessionStats};

/// A fully selected and allocated function.
#[derive(Debug, Clone)]
pub struct CompiledFunction {
    pub stream: InstructionStream,
    pub allocation: Allocation,
    pub stats: SessionStats,
}

/// Read-only state shared by every function of a run.
#[derive(Debug)]
pub struct Backend {
    rules: RuleSet,
    automaton: PatternAutomaton,
    config: BackendConfig,
}

impl Backend {
    /// Build the automaton for `rules`. Malformed rules fail here, never per tree.
    pub fn new(rules: RuleSet, config: BackendConfig) -> CompileResult<Self> {
        let automaton = PatternAutomaton::build(&rules, &config)?;
        Ok(Self { rules, automaton, config })
    }

    /// Backend for the built-in x86-64 machine description.
    pub fn x64(config: BackendConfig) -> CompileResult<Self> {
        Self::new(crate::x64::rules(), config)
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn automaton(&self) -> &PatternAutomaton {
        &self.automaton
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Open a selection session for one function.
    pub fn session(&self) -> FunctionSession<'_> {
        FunctionSession::new(&self.rules, &self.automaton)
    }

    /// Assign physical registers to a finished instruction stream.
    pub fn allocate(&self, stream: &mut InstructionStream) -> CompileResult<Allocation> {
        LinearScan::new(&self.config)?.allocate(stream)
    }

    /// Select every tree in `roots` in order, then allocate the function.
    pub fn compile_function(&self, tree: &mut IrTree, roots: &[NodeId]) -> CompileResult<CompiledFunction> {
        let mut session = self.session();
        for &root in roots {
            session.select_tree(tree, root)?;
        }
        let (mut stream, stats) = session.finish();
        let allocation = self.allocate(&mut stream)?;
        log::debug!(
            "compiled function: {} trees, {} instructions, {} virtual registers",
            stats.trees_selected,
            stream.len(),
            stats.vregs_issued
        );
        Ok(CompiledFunction { stream, allocation, stats })
    }
}
