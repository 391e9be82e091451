//! # MG-SAT Solver
//!
//! The satisfiability side of the parser: a small propositional
//! [`Formula`] builder with the cardinality encodings the grammar needs, a
//! [`Backend`] abstraction over the CDCL solver, and the driver protocols on
//! top of it.
//!
//! ```text
//! Formula ──► Session (worker thread + backend)
//!               ├─ solve_one  → Outcome::{Sat, Unsat, Timeout}
//!               └─ Enumeration: solve → block projection → solve → …
//! ```
//!
//! A [`Session`] is owned by exactly one caller. Each solve blocks the caller
//! until the backend answers or the session's timeout elapses; a timed-out
//! call is reported as [`Outcome::Timeout`], never as unsatisfiable.

#![warn(missing_docs)]

mod error;
pub use error::*;

mod formula;
pub use formula::*;

mod backend;
pub use backend::*;

mod session;
pub use session::*;

mod enumerate;
pub use enumerate::*;
