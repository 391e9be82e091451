use std::time::Duration;

use tracing::debug;

use crate::{Formula, Lit, Model, Outcome, Session, SolverError};

/// Why an [`Enumeration`] stopped producing models.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The last solve was unsatisfiable: every model has been produced.
    Exhausted,
    /// The requested number of models was reached.
    LimitReached,
    /// The backend did not answer in time; more models may exist.
    TimedOut,
}

/// All models of a formula, distinct on a projection of its variables.
///
/// After each model the exact assignment of the projection variables is
/// blocked, so two yielded models always differ on at least one projection
/// variable. Auxiliary variables outside the projection never produce
/// repeats. The sequence is lazy, finite and cannot be restarted; each call to
/// `next` blocks on one solver call.
pub struct Enumeration {
    session: Option<Session>,
    projection: Vec<Lit>,
    remaining: Option<usize>,
    termination: Option<Termination>,
}

impl Enumeration {
    /// Enumerates at most `limit` models (`None` for all of them).
    pub fn new(
        formula: Formula,
        projection: Vec<Lit>,
        limit: Option<usize>,
        timeout: Option<Duration>,
    ) -> Result<Self, SolverError> {
        Ok(Self::from_session(
            Session::open(formula, timeout)?,
            projection,
            limit,
        ))
    }

    /// Enumerates over an open session, blocking `projection` after each
    /// model. `None` for `limit` runs until UNSAT or timeout.
    pub fn from_session(session: Session, projection: Vec<Lit>, limit: Option<usize>) -> Self {
        Self {
            session: Some(session),
            projection,
            remaining: limit,
            termination: None,
        }
    }

    /// Set once the enumeration has ended.
    pub fn termination(&self) -> Option<Termination> {
        self.termination
    }

    /// Forbids the projection of `model` in later solves.
    fn block(&mut self, model: &Model) -> Result<(), SolverError> {
        let clause = self
            .projection
            .iter()
            .map(|lit| if model.value(*lit) { !*lit } else { *lit })
            .collect();
        match self.session.as_mut() {
            Some(session) => session.block(clause),
            None => Ok(()),
        }
    }

    /// Ends the enumeration and releases the session.
    fn finish(&mut self, termination: Termination) {
        debug!(?termination, "Enumeration finished");
        self.termination = Some(termination);
        self.session = None;
    }

    fn step(&mut self) -> Result<Option<Model>, SolverError> {
        if self.termination.is_some() {
            return Ok(None);
        }
        if self.remaining == Some(0) {
            self.finish(Termination::LimitReached);
            return Ok(None);
        }
        let Some(session) = self.session.as_mut() else {
            return Ok(None);
        };

        match session.solve()? {
            Outcome::Sat(model) => {
                self.block(&model)?;
                if let Some(remaining) = self.remaining.as_mut() {
                    *remaining -= 1;
                }
                Ok(Some(model))
            }
            Outcome::Unsat => {
                self.finish(Termination::Exhausted);
                Ok(None)
            }
            Outcome::Timeout => {
                self.finish(Termination::TimedOut);
                Ok(None)
            }
        }
    }

    /// Gives back one unit of the limit for a model the caller decided not
    /// to count.
    pub fn refund(&mut self) {
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining += 1;
        }
    }
}

impl Iterator for Enumeration {
    type Item = Result<Model, SolverError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.step() {
            Ok(model) => model.map(Ok),
            Err(error) => {
                self.session = None;
                Some(Err(error))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;
    use testresult::TestResult;

    fn choose(n: usize, k: usize) -> usize {
        (0..k).fold(1, |acc, i| acc * (n - i) / (i + 1))
    }

    #[test]
    fn it_enumerates_each_projection_once() -> TestResult {
        let mut formula = Formula::new();
        let inputs: Vec<Lit> = (0..4).map(|_| formula.new_lit()).collect();
        formula.at_most(&inputs, 2);

        let models = Enumeration::new(formula, inputs.clone(), None, None)?
            .collect::<Result<Vec<_>, _>>()?;

        let expected = (0..=2).map(|k| choose(4, k)).sum::<usize>();
        assert_eq!(models.len(), expected);

        let distinct: HashSet<Vec<bool>> = models
            .iter()
            .map(|model| inputs.iter().map(|lit| model.value(*lit)).collect())
            .collect();
        assert_eq!(distinct.len(), expected);
        Ok(())
    }

    #[test]
    fn it_ignores_auxiliary_variables() -> TestResult {
        let mut formula = Formula::new();
        let shown = formula.new_lit();
        let hidden = formula.new_lit();
        formula.add_clause([shown]);
        formula.add_clause([hidden, shown]);

        let mut enumeration = Enumeration::new(formula, vec![shown], None, None)?;
        assert!(enumeration.next().transpose()?.is_some());
        assert!(enumeration.next().is_none());
        assert_eq!(enumeration.termination(), Some(Termination::Exhausted));
        Ok(())
    }

    #[test]
    fn it_stops_at_the_limit() -> TestResult {
        let mut formula = Formula::new();
        let inputs: Vec<Lit> = (0..3).map(|_| formula.new_lit()).collect();

        let mut enumeration = Enumeration::new(formula, inputs, Some(2), None)?;
        assert_eq!(enumeration.by_ref().count(), 2);
        assert_eq!(enumeration.termination(), Some(Termination::LimitReached));
        assert!(enumeration.next().is_none());
        Ok(())
    }
}
