//! Command line front end for the MG-SAT parser.
//!
//! Reads a lexicon and a corpus of interface conditions, parses each
//! condition under the given options, and prints a plain-text report: the
//! outcome, the pronounced yield, the derivation and what it used.

#![warn(missing_docs)]

mod cli;
pub use cli::*;

mod report;
pub use report::*;
