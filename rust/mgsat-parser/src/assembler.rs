use std::fmt;

use mgsat_solver::Formula;
use tracing::debug;

use crate::encoding::Encoding;
use crate::lf::{self, Requirement};
use crate::{LocalityContext, LocalityPolicy, Schema, pf};

/// The groups of clauses a formula is assembled from, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintFamily {
    /// One item per slot and the features it puts on each point.
    Lexical,
    /// Every trigger and target checked exactly once.
    Checking,
    /// Exactly one root, carrying the clause category.
    Root,
    /// Parenthood and dominance.
    Tree,
    /// Licensors attract licensee-bearing phrases from below.
    Movement,
    /// Incorporation by head-attracting selectors.
    HeadMovement,
    /// Canonical order of covert slots.
    Symmetry,
    /// The clauses of the locality policy.
    Locality,
    /// Word order against the PF target.
    Linearization,
    /// Predicate-argument structure against the LF target.
    LogicalForm,
}

impl fmt::Display for ConstraintFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Lexical => "lexical",
            Self::Checking => "checking",
            Self::Root => "root",
            Self::Tree => "tree",
            Self::Movement => "movement",
            Self::HeadMovement => "head movement",
            Self::Symmetry => "symmetry",
            Self::Locality => "locality",
            Self::Linearization => "linearization",
            Self::LogicalForm => "logical form",
        };
        write!(f, "{name}")
    }
}

/// Variables and clauses contributed by one family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FamilySize {
    /// Which family.
    pub family: ConstraintFamily,
    /// Variables it allocated.
    pub variables: usize,
    /// Clauses it added.
    pub clauses: usize,
}

/// Size of an assembled formula, per family.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormulaStats {
    /// In assembly order.
    pub families: Vec<FamilySize>,
}

impl FormulaStats {
    /// Variables over all families.
    pub fn variables(&self) -> usize {
        self.families.iter().map(|size| size.variables).sum()
    }

    /// Clauses over all families.
    pub fn clauses(&self) -> usize {
        self.families.iter().map(|size| size.clauses).sum()
    }

    fn measure<T>(
        &mut self,
        family: ConstraintFamily,
        formula: &mut Formula,
        build: impl FnOnce(&mut Formula) -> T,
    ) -> T {
        let (variables, clauses) = (formula.num_vars(), formula.num_clauses());
        let built = build(formula);
        let size = FamilySize {
            family,
            variables: formula.num_vars() - variables,
            clauses: formula.num_clauses() - clauses,
        };
        debug!(
            family = %family,
            variables = size.variables,
            clauses = size.clauses,
            "Constraints added"
        );
        self.families.push(size);
        built
    }
}

/// Translates a schema and the interface requirements into one formula.
/// Assembly is pure: the same inputs give the same formula.
pub(crate) struct Assembler<'a> {
    pub schema: &'a Schema,
    pub locality: &'a dyn LocalityPolicy,
    pub linearize: bool,
    pub requirements: &'a [Requirement],
}

impl Assembler<'_> {
    pub fn assemble(&self) -> (Encoding, Formula, FormulaStats) {
        let schema = self.schema;
        let bounds = schema.bounds();
        let mut formula = Formula::new();
        let mut stats = FormulaStats::default();

        let mut encoding = stats.measure(ConstraintFamily::Lexical, &mut formula, |formula| {
            Encoding::lexical(schema, formula)
        });
        stats.measure(ConstraintFamily::Checking, &mut formula, |formula| {
            encoding.link(schema, formula)
        });
        stats.measure(ConstraintFamily::Root, &mut formula, |formula| {
            encoding.root(formula)
        });
        stats.measure(ConstraintFamily::Tree, &mut formula, |formula| {
            encoding.tree(schema, formula)
        });
        stats.measure(ConstraintFamily::Movement, &mut formula, |formula| {
            encoding.movement(schema, formula, &bounds)
        });
        stats.measure(ConstraintFamily::HeadMovement, &mut formula, |formula| {
            encoding.head_movement(schema, formula, &bounds)
        });
        stats.measure(ConstraintFamily::Symmetry, &mut formula, |formula| {
            encoding.order_covert_slots(schema, formula)
        });
        stats.measure(ConstraintFamily::Locality, &mut formula, |formula| {
            let mut context = LocalityContext::new(schema, &encoding, formula);
            self.locality.constrain(&mut context);
        });

        if self.linearize {
            stats.measure(ConstraintFamily::Linearization, &mut formula, |formula| {
                pf::constrain(schema, &encoding, formula)
            });
        }
        if !self.requirements.is_empty() {
            stats.measure(ConstraintFamily::LogicalForm, &mut formula, |formula| {
                lf::constrain(self.requirements, schema, &encoding, formula)
            });
        }

        debug!(
            locality = self.locality.name(),
            variables = formula.num_vars(),
            clauses = formula.num_clauses(),
            "Formula assembled"
        );
        (encoding, formula, stats)
    }
}
