use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rustsat::solvers::{Solve, SolverResult};
use rustsat::types::{Assignment, Clause, TernaryVal};
use rustsat_batsat::BasicSolver;

use crate::{Lit, SolverError};

/// A satisfying assignment, indexed by variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    values: Vec<bool>,
}

impl Model {
    /// A model assigning `values[i]` to variable `i`.
    pub fn new(values: Vec<bool>) -> Self {
        Self { values }
    }

    /// The value of `lit`. Variables the backend never saw are false.
    pub fn value(&self, lit: Lit) -> bool {
        let assigned = self.values.get(lit.var().index()).copied().unwrap_or(false);
        assigned != lit.is_negative()
    }

    /// Number of variables the model assigns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the model assigns no variable at all.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Answer of a single backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Satisfiable, with a witness.
    Sat(Model),
    /// Unsatisfiable.
    Unsat,
    /// The search was stopped through its [`Interrupt`].
    Interrupted,
}

/// A flag a session raises to stop its backend mid-search. Once raised it
/// stays raised.
#[derive(Debug, Clone, Default)]
pub struct Interrupt(Arc<AtomicBool>);

impl Interrupt {
    /// Asks the backend to give up the current and every later search.
    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether [`Interrupt::raise`] was called.
    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// An incremental SAT solver.
///
/// Backends live on the session's worker thread and are never shared, so
/// they need not be `Send`.
pub trait Backend {
    /// Adds a clause for this and every later [`Backend::solve`].
    fn add_clause(&mut self, clause: &[Lit]) -> Result<(), SolverError>;

    /// Decides the clauses added so far; a model covers variables
    /// `0..num_vars`. Backends built with an [`Interrupt`] answer
    /// [`Verdict::Interrupted`] soon after it is raised.
    fn solve(&mut self, num_vars: usize) -> Result<Verdict, SolverError>;
}

/// The pure Rust CDCL solver shipped with `rustsat-batsat`.
pub struct Batsat {
    solver: BasicSolver,
}

impl Batsat {
    /// A fresh solver that checks `interrupt` between conflicts.
    pub fn new(interrupt: Interrupt) -> Self {
        let mut solver = BasicSolver::default();
        solver
            .batsat_mut()
            .cb_mut()
            .set_stop(move || interrupt.is_raised());
        Self { solver }
    }
}

fn backend_error(error: impl std::fmt::Display) -> SolverError {
    SolverError::Backend(error.to_string())
}

fn encode(lit: Lit) -> rustsat::types::Lit {
    let var = rustsat::types::Var::new(lit.var().index() as u32);
    if lit.is_negative() {
        var.neg_lit()
    } else {
        var.pos_lit()
    }
}

impl Backend for Batsat {
    fn add_clause(&mut self, clause: &[Lit]) -> Result<(), SolverError> {
        let clause: Clause = clause.iter().map(|lit| encode(*lit)).collect();
        self.solver.add_clause(clause).map_err(backend_error)
    }

    fn solve(&mut self, num_vars: usize) -> Result<Verdict, SolverError> {
        match self.solver.solve().map_err(backend_error)? {
            SolverResult::Sat => {
                let assignment: Assignment = self.solver.full_solution().map_err(backend_error)?;
                let values = (0..num_vars)
                    .map(|index| {
                        let lit = rustsat::types::Var::new(index as u32).pos_lit();
                        assignment.lit_value(lit) == TernaryVal::True
                    })
                    .collect();
                Ok(Verdict::Sat(Model::new(values)))
            }
            SolverResult::Unsat => Ok(Verdict::Unsat),
            SolverResult::Interrupted => Ok(Verdict::Interrupted),
        }
    }
}
