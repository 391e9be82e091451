use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::{Backend, Batsat, Formula, Interrupt, Lit, Model, SolverError, Verdict};

/// Classification of one solve call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Satisfiable, with a witness.
    Sat(Model),
    /// No assignment satisfies the formula.
    Unsat,
    /// The backend did not answer in time. Nothing is known about
    /// satisfiability.
    Timeout,
}

impl Outcome {
    /// Whether a model was found.
    pub fn is_sat(&self) -> bool {
        matches!(self, Outcome::Sat(_))
    }

    /// `SAT`, `UNSAT` or `TIMEOUT`.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Sat(_) => "SAT",
            Outcome::Unsat => "UNSAT",
            Outcome::Timeout => "TIMEOUT",
        }
    }
}

enum Command {
    Solve,
    Block(Vec<Lit>),
}

type Reply = Result<Verdict, SolverError>;

/// A solver loaded with one formula, running on its own worker thread.
///
/// The session is owned by a single caller and every call blocks until the
/// worker answers or the timeout elapses. A timeout raises the backend's
/// [`Interrupt`] and the session refuses further work. Dropping the session
/// interrupts the backend and joins the worker.
pub struct Session {
    commands: Option<Sender<Command>>,
    replies: Receiver<Reply>,
    worker: Option<JoinHandle<()>>,
    timeout: Option<Duration>,
    interrupt: Interrupt,
    abandoned: bool,
}

impl Session {
    /// Opens a session on the default backend.
    pub fn open(formula: Formula, timeout: Option<Duration>) -> Result<Self, SolverError> {
        Self::open_with(formula, timeout, Batsat::new)
    }

    /// Opens a session on a backend built by `make_backend` inside the
    /// worker thread. The backend is handed the session's [`Interrupt`].
    pub fn open_with<B, F>(
        formula: Formula,
        timeout: Option<Duration>,
        make_backend: F,
    ) -> Result<Self, SolverError>
    where
        B: Backend,
        F: FnOnce(Interrupt) -> B + Send + 'static,
    {
        let interrupt = Interrupt::default();
        let stop = interrupt.clone();
        let (command_sender, command_receiver) = mpsc::channel::<Command>();
        let (reply_sender, reply_receiver) = mpsc::channel::<Reply>();

        let worker = thread::Builder::new()
            .name("mgsat-solver".into())
            .spawn(move || serve(formula, make_backend(stop), command_receiver, reply_sender))
            .map_err(|error| SolverError::Backend(error.to_string()))?;

        Ok(Self {
            commands: Some(command_sender),
            replies: reply_receiver,
            worker: Some(worker),
            timeout,
            interrupt,
            abandoned: false,
        })
    }

    /// Decides the formula plus every clause blocked so far.
    pub fn solve(&mut self) -> Result<Outcome, SolverError> {
        self.send(Command::Solve)?;

        let started = Instant::now();
        let reply = match self.timeout {
            Some(timeout) => match self.replies.recv_timeout(timeout) {
                Ok(reply) => reply,
                Err(RecvTimeoutError::Timeout) => {
                    self.interrupt.raise();
                    self.abandoned = true;
                    debug!(?timeout, "Solver call timed out");
                    return Ok(Outcome::Timeout);
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(SolverError::Disconnected("worker exited".into()));
                }
            },
            None => self
                .replies
                .recv()
                .map_err(|error| SolverError::Disconnected(error.to_string()))?,
        };

        let outcome = match reply? {
            Verdict::Sat(model) => Outcome::Sat(model),
            Verdict::Unsat => Outcome::Unsat,
            Verdict::Interrupted => {
                return Err(SolverError::Backend(
                    "search stopped before the session interrupted it".into(),
                ));
            }
        };
        debug!(outcome = outcome.label(), elapsed = ?started.elapsed(), "Solver call finished");
        Ok(outcome)
    }

    /// Adds a clause for all later calls.
    pub fn block(&mut self, clause: Vec<Lit>) -> Result<(), SolverError> {
        self.send(Command::Block(clause))
    }

    fn send(&mut self, command: Command) -> Result<(), SolverError> {
        if self.abandoned {
            return Err(SolverError::Abandoned);
        }
        self.commands
            .as_ref()
            .ok_or_else(|| SolverError::Disconnected("session closed".into()))?
            .send(command)
            .map_err(|error| SolverError::Disconnected(error.to_string()))
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // An idle worker leaves its loop once the command channel closes; a
        // busy one first has to notice the interrupt.
        self.interrupt.raise();
        self.commands.take();

        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Solver worker panicked");
            } else {
                debug!(timed_out = self.abandoned, "Solver worker released");
            }
        }
    }
}

fn serve<B: Backend>(
    formula: Formula,
    mut backend: B,
    commands: Receiver<Command>,
    replies: Sender<Reply>,
) {
    let num_vars = formula.num_vars();
    let loaded = formula
        .clauses()
        .iter()
        .try_for_each(|clause| backend.add_clause(clause));
    drop(formula);

    while let Ok(command) = commands.recv() {
        let reply = match (&loaded, command) {
            (Err(error), _) => Err(error.clone()),
            (Ok(()), Command::Solve) => backend.solve(num_vars),
            (Ok(()), Command::Block(clause)) => {
                if let Err(error) = backend.add_clause(&clause) {
                    if replies.send(Err(error)).is_err() {
                        return;
                    }
                }
                continue;
            }
        };
        if replies.send(reply).is_err() {
            return;
        }
    }
}

/// Solves `formula` once in a fresh session, so repeated calls on the same
/// formula classify it the same way.
pub fn solve_one(formula: &Formula, timeout: Option<Duration>) -> Result<Outcome, SolverError> {
    Session::open(formula.clone(), timeout)?.solve()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use testresult::TestResult;

    fn model_of(outcome: Outcome) -> Model {
        match outcome {
            Outcome::Sat(model) => model,
            other => panic!("expected SAT, got {other:?}"),
        }
    }

    /// Pigeons into one fewer holes: unsatisfiable and exponentially hard
    /// for resolution.
    fn pigeonhole(holes: usize) -> Formula {
        let mut formula = Formula::new();
        let sits: Vec<Vec<Lit>> = (0..=holes)
            .map(|_| (0..holes).map(|_| formula.new_lit()).collect())
            .collect();
        for pigeon in &sits {
            formula.add_clause(pigeon.iter().copied());
        }
        for hole in 0..holes {
            for (index, first) in sits.iter().enumerate() {
                for second in &sits[index + 1..] {
                    formula.forbid(&[first[hole], second[hole]]);
                }
            }
        }
        formula
    }

    #[test]
    fn it_classifies_sat_and_unsat() -> TestResult {
        let mut formula = Formula::new();
        let a = formula.new_lit();
        let b = formula.new_lit();
        formula.add_clause([a, b]);
        formula.add_clause([!a]);

        let model = model_of(solve_one(&formula, None)?);
        assert!(!model.value(a));
        assert!(model.value(b));
        assert!(model.value(formula.top()));

        formula.add_clause([!b]);
        assert_eq!(solve_one(&formula, None)?, Outcome::Unsat);
        Ok(())
    }

    #[test]
    fn it_keeps_blocked_clauses_across_calls() -> TestResult {
        let mut formula = Formula::new();
        let a = formula.new_lit();
        formula.add_clause([a, formula.bottom()]);

        let mut session = Session::open(formula, None)?;
        assert!(session.solve()?.is_sat());
        session.block(vec![!a])?;
        assert_eq!(session.solve()?, Outcome::Unsat);
        assert_eq!(session.solve()?, Outcome::Unsat);
        Ok(())
    }

    #[test]
    fn it_solves_one_idempotently() -> TestResult {
        let formula = pigeonhole(3);
        let first = solve_one(&formula, None)?;
        let second = solve_one(&formula, None)?;
        assert_eq!(first, Outcome::Unsat);
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn it_reports_timeouts_distinctly() -> TestResult {
        let mut session = Session::open(pigeonhole(12), Some(Duration::from_millis(10)))?;
        assert_eq!(session.solve()?, Outcome::Timeout);
        assert_eq!(session.solve(), Err(SolverError::Abandoned));
        Ok(())
    }

    /// Reports when its search has returned.
    struct Watched {
        backend: Batsat,
        finished: Arc<AtomicBool>,
    }

    impl Backend for Watched {
        fn add_clause(&mut self, clause: &[Lit]) -> Result<(), SolverError> {
            self.backend.add_clause(clause)
        }

        fn solve(&mut self, num_vars: usize) -> Result<Verdict, SolverError> {
            let verdict = self.backend.solve(num_vars);
            self.finished.store(true, Ordering::SeqCst);
            verdict
        }
    }

    #[test]
    fn it_stops_the_search_of_a_timed_out_session() -> TestResult {
        let finished = Arc::new(AtomicBool::new(false));
        let flag = finished.clone();
        let mut session = Session::open_with(
            pigeonhole(14),
            Some(Duration::from_millis(20)),
            move |interrupt| Watched {
                backend: Batsat::new(interrupt),
                finished: flag,
            },
        )?;

        assert_eq!(session.solve()?, Outcome::Timeout);
        let released = Instant::now();
        drop(session);

        assert!(finished.load(Ordering::SeqCst));
        assert!(released.elapsed() < Duration::from_secs(5));
        Ok(())
    }

    #[test]
    fn it_answers_interrupted_once_raised() -> TestResult {
        let interrupt = Interrupt::default();
        let mut backend = Batsat::new(interrupt.clone());
        let formula = pigeonhole(10);
        for clause in formula.clauses() {
            backend.add_clause(clause)?;
        }

        interrupt.raise();
        assert_eq!(backend.solve(formula.num_vars())?, Verdict::Interrupted);
        Ok(())
    }

    #[test]
    fn it_enforces_cardinality_bounds() -> TestResult {
        for bound in 0..=5 {
            for forced in 0..=5 {
                let mut formula = Formula::new();
                let lits: Vec<Lit> = (0..5).map(|_| formula.new_lit()).collect();
                formula.at_most(&lits, bound);
                for lit in &lits[..forced] {
                    formula.add_clause([*lit]);
                }
                let outcome = solve_one(&formula, None)?;
                assert_eq!(
                    outcome.is_sat(),
                    forced <= bound,
                    "at most {bound} with {forced} forced"
                );
            }
        }
        Ok(())
    }

    #[test]
    fn it_encodes_exactly_one() -> TestResult {
        for size in [3, 9] {
            let mut formula = Formula::new();
            let lits: Vec<Lit> = (0..size).map(|_| formula.new_lit()).collect();
            formula.exactly_one(&lits);

            let model = model_of(solve_one(&formula, None)?);
            assert_eq!(lits.iter().filter(|lit| model.value(**lit)).count(), 1);

            formula.add_clause([lits[0]]);
            formula.add_clause([lits[size - 1]]);
            assert_eq!(solve_one(&formula, None)?, Outcome::Unsat);
        }
        Ok(())
    }

    #[test]
    fn it_defines_gates() -> TestResult {
        let mut formula = Formula::new();
        let a = formula.new_lit();
        let b = formula.new_lit();
        let both = formula.and(&[a, b]);
        let either = formula.or(&[a, b]);
        formula.add_clause([a]);
        formula.add_clause([!b]);

        let model = model_of(solve_one(&formula, None)?);
        assert!(!model.value(both));
        assert!(model.value(either));
        Ok(())
    }
}
