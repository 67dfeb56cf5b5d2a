// This module holds the infrastructure shared by every pass of the backend: the BackendConfig
// passed explicitly into automaton construction and allocation, the CompileError taxonomy,
// the per-function FunctionSession with its scratch arena and SessionStats, and the Backend
// driver that owns the rule set and automaton for a run.

//! Core backend infrastructure.
//!
//! # Key Components
//!
//! ## Configuration (`config`)
//! - Register pool size and rule-count limit, validated up front
//!
//! ## Errors (`error`)
//! - One fatal error enum for selection, automaton construction and allocation
//!
//! ## Session Management (`session`)
//! - Arena-based scratch tables using `bumpalo`, reset per tree
//! - Instruction stream and virtual register numbering per function
//! - Selection statistics
//!
//! ## Driver (`backend`)
//! - Builds the pattern automaton once and runs select + allocate per function

pub mod backend;
pub mod config;
pub mod error;
pub mod session;

pub use backend::{Backend, CompiledFunction};
pub use config::{BackendConfig, MAX_REGISTER_COUNT};
pub use error::{CompileError, CompileResult};
pub use session::{FunctionSession, SessionStats};
