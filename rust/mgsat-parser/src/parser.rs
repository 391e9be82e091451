use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use mgsat_lexicon::{Lexicon, LexiconSpec};
use mgsat_solver::{Enumeration, Formula, Outcome, Termination};
use tracing::{debug, info};

use crate::assembler::Assembler;
use crate::encoding::Encoding;
use crate::extract::Extractor;
use crate::lf::{self, Requirement};
use crate::{
    ConfigurationError, Derivation, FormulaStats, InterfaceCondition, LocalityPolicy, ParseError,
    ParseOptions, Schema,
};

/// The invocation surface: a lexicon, the options, and the locality policy
/// movement obeys.
///
/// ```no_run
/// # use mgsat_lexicon::Lexicon;
/// # use mgsat_parser::{InterfaceCondition, Parser, ParseOptions};
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let lexicon = Lexicon::from_path("lexicon.json")?;
/// let parser = Parser::new(lexicon).with_options(ParseOptions::default().with_lf_constraints(false));
/// let outcome = parser.parse(&InterfaceCondition::sentence(["John", "sleeps"]))?;
/// for derivation in &outcome.derivations {
///     println!("{derivation}");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Parser {
    lexicon: Arc<Lexicon>,
    options: ParseOptions,
    locality: Arc<dyn LocalityPolicy>,
}

impl Parser {
    /// A parser with default options.
    pub fn new(lexicon: Lexicon) -> Self {
        let options = ParseOptions::default();
        Self {
            lexicon: Arc::new(lexicon),
            locality: options.locality.policy(),
            options,
        }
    }

    /// Replaces the options, and with them the locality policy.
    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.locality = options.locality.policy();
        self.options = options;
        self
    }

    /// Installs a locality policy other than the configured ones.
    pub fn with_locality(mut self, locality: Arc<dyn LocalityPolicy>) -> Self {
        self.locality = locality;
        self
    }

    /// Adds ad-hoc items to the lexicon for this parser.
    pub fn with_extra_items(mut self, extra: LexiconSpec) -> Result<Self, ParseError> {
        if !extra.is_empty() {
            self.lexicon = Arc::new(self.lexicon.extend(extra)?);
        }
        Ok(self)
    }

    /// The lexicon, extra items included.
    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    /// The current options.
    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Validates the request, builds the schema and assembles the formula.
    /// Nothing is solved yet.
    pub fn prepare(&self, condition: &InterfaceCondition) -> Result<Problem, ParseError> {
        self.options.validate()?;

        let linearize = self.options.include_pf_constraints && condition.pf.is_some();
        let interpret = self.options.include_lf_constraints && condition.lf.is_some();
        if !linearize && !interpret {
            return Err(ConfigurationError::NoInterfaceConstraints.into());
        }

        let schema = Schema::build(
            self.lexicon.clone(),
            condition.numeration()?,
            self.options.bounds,
        )?;

        let requirements = match (&condition.lf, interpret) {
            (Some(target), true) => lf::requirements(target, &schema)?,
            _ => Vec::new(),
        };

        let (encoding, formula, stats) = Assembler {
            schema: &schema,
            locality: self.locality.as_ref(),
            linearize,
            requirements: &requirements,
        }
        .assemble();

        Ok(Problem {
            pf: condition.pf.clone().filter(|_| linearize),
            schema,
            encoding,
            formula,
            stats,
            requirements,
            timeout: self.options.timeout(),
        })
    }

    /// Parses one interface condition: the first derivation, or up to
    /// `max_parses` distinct ones when extracting all parses.
    pub fn parse(&self, condition: &InterfaceCondition) -> Result<ParseOutcome, ParseError> {
        let problem = self.prepare(condition)?;

        let outcome = if self.options.extract_all_parses {
            let mut parses = problem.solve_all(Some(self.options.max_parses))?;
            let derivations = parses.by_ref().collect::<Result<Vec<_>, _>>()?;
            ParseOutcome {
                derivations,
                termination: parses.termination().unwrap_or(Termination::Exhausted),
            }
        } else {
            match problem.solve_one()? {
                Solution::Found(derivation) => ParseOutcome {
                    derivations: vec![derivation],
                    termination: Termination::LimitReached,
                },
                Solution::NotFound => ParseOutcome {
                    derivations: Vec::new(),
                    termination: Termination::Exhausted,
                },
                Solution::TimedOut => ParseOutcome {
                    derivations: Vec::new(),
                    termination: Termination::TimedOut,
                },
            }
        };

        info!(
            words = problem.schema.numeration().len(),
            derivations = outcome.derivations.len(),
            termination = ?outcome.termination,
            "Parse finished"
        );
        Ok(outcome)
    }
}

/// The result of [`Parser::parse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOutcome {
    /// Distinct derivations found, in the order found.
    pub derivations: Vec<Derivation>,
    /// Why the search stopped.
    pub termination: Termination,
}

impl ParseOutcome {
    /// At least one derivation was found.
    pub fn is_satisfiable(&self) -> bool {
        !self.derivations.is_empty()
    }

    /// No derivation exists within the bounds.
    pub fn is_unsatisfiable(&self) -> bool {
        self.derivations.is_empty() && self.termination == Termination::Exhausted
    }

    /// The solver gave up before the search ended.
    pub fn timed_out(&self) -> bool {
        self.termination == Termination::TimedOut
    }
}

/// Result of a single solve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Solution {
    /// A derivation within the bounds.
    Found(Derivation),
    /// No derivation exists within the bounds.
    NotFound,
    /// The solver gave up; a derivation may still exist.
    TimedOut,
}

impl Solution {
    /// `SAT`, `UNSAT` or `TIMEOUT`.
    pub fn label(&self) -> &'static str {
        match self {
            Solution::Found(_) => "SAT",
            Solution::NotFound => "UNSAT",
            Solution::TimedOut => "TIMEOUT",
        }
    }
}

/// An assembled formula for one interface condition.
pub struct Problem {
    schema: Schema,
    encoding: Encoding,
    formula: Formula,
    stats: FormulaStats,
    pf: Option<Vec<String>>,
    requirements: Vec<Requirement>,
    timeout: Option<Duration>,
}

impl Problem {
    /// The search space.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The assembled CNF.
    pub fn formula(&self) -> &Formula {
        &self.formula
    }

    /// Formula size per constraint family.
    pub fn stats(&self) -> &FormulaStats {
        &self.stats
    }

    fn extractor(&self) -> Extractor<'_> {
        Extractor {
            schema: &self.schema,
            encoding: &self.encoding,
            pf: self.pf.as_deref(),
            requirements: &self.requirements,
        }
    }

    /// One solver call on a fresh session.
    pub fn solve_one(&self) -> Result<Solution, ParseError> {
        let started = Instant::now();
        let outcome = mgsat_solver::solve_one(&self.formula, self.timeout)?;
        debug!(
            outcome = outcome.label(),
            elapsed = ?started.elapsed(),
            "Solved"
        );

        Ok(match outcome {
            Outcome::Sat(model) => Solution::Found(self.extractor().extract(&model)?),
            Outcome::Unsat => Solution::NotFound,
            Outcome::Timeout => Solution::TimedOut,
        })
    }

    /// Distinct derivations, lazily, at most `limit` of them.
    pub fn solve_all(&self, limit: Option<usize>) -> Result<Parses<'_>, ParseError> {
        let enumeration = Enumeration::new(
            self.formula.clone(),
            self.encoding.projection(),
            limit,
            self.timeout,
        )?;
        Ok(Parses {
            extractor: self.extractor(),
            enumeration,
            seen: HashSet::new(),
        })
    }
}

/// Derivations of a [`Problem`], pairwise distinct.
///
/// Models that differ only in how covert slots are numbered describe the
/// same derivation; repeats are skipped and do not count against the limit.
pub struct Parses<'a> {
    extractor: Extractor<'a>,
    enumeration: Enumeration,
    seen: HashSet<String>,
}

impl Parses<'_> {
    /// Set once the sequence has ended.
    pub fn termination(&self) -> Option<Termination> {
        self.enumeration.termination()
    }
}

impl Iterator for Parses<'_> {
    type Item = Result<Derivation, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let model = match self.enumeration.next()? {
                Ok(model) => model,
                Err(error) => return Some(Err(error.into())),
            };
            let derivation = match self.extractor.extract(&model) {
                Ok(derivation) => derivation,
                Err(error) => return Some(Err(error.into())),
            };

            if self.seen.insert(derivation.to_string()) {
                debug!(parse = self.seen.len(), "Parse enumerated");
                return Some(Ok(derivation));
            }
            self.enumeration.refund();
        }
    }
}
