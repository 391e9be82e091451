//! # MG-SAT Parser
//!
//! Parsing with Minimalist Grammars as bounded constraint satisfaction.
//! Given a [`Lexicon`](mgsat_lexicon::Lexicon) and an [`InterfaceCondition`]
//! (a target sentence and/or a predicate-argument target), the parser decides
//! whether some derivation licensed by the grammar realizes the condition
//! within the caller's [`Bounds`], and if so extracts it.
//!
//! ## Architecture
//!
//! ```text
//! Lexicon + Bounds + words → Schema (slots × feature points)
//!   → Assembler (structure, movement, locality, PF, LF) → Formula
//!     → Solver (solve_one | Enumeration) → Model(s)
//!       → Extractor → Derivation(s)
//! ```
//!
//! The schema is a flat table: one slot per overt word plus
//! `max_num_empty_lexical_items` covert slots, and one point per feature
//! position of each slot. Every decision (which item fills a slot, which
//! feature checks which) is a boolean variable over that table, so the whole
//! search space is fixed before a single clause is written.
//!
//! Unsatisfiable and timed-out searches are ordinary results
//! ([`Solution::NotFound`], [`Solution::TimedOut`]); only malformed input and
//! internal defects are [`ParseError`]s.

#![warn(missing_docs)]

mod error;
pub use error::*;

mod options;
pub use options::*;

mod interface;
pub use interface::*;

mod schema;
pub use schema::*;

mod encoding;

mod assembler;
pub use assembler::*;

mod locality;
pub use locality::*;

mod pf;
mod lf;

mod derivation;
pub use derivation::*;

mod extract;

mod parser;
pub use parser::*;

pub use mgsat_solver::{Formula, Lit, Termination};
