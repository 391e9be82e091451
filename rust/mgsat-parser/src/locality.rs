use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use mgsat_lexicon::{Feature, Polarity};
use mgsat_solver::{Formula, Lit};

use crate::encoding::Encoding;
use crate::{LocalityConfig, PointId, Schema};

/// One potential movement: the licensor at `checker` attracts the phrase
/// whose licensee sits at `landing`. The phrase was last at `base`, and the
/// licensor's projection after the check is `result`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Movement {
    /// The licensor.
    pub checker: PointId,
    /// The licensee of the moving phrase.
    pub landing: PointId,
    /// The phrase's previous position.
    pub base: PointId,
    /// The licensor's projection after the check.
    pub result: PointId,
    /// True when this movement takes place.
    pub link: Lit,
}

/// What a [`LocalityPolicy`] can see and constrain.
pub struct LocalityContext<'a> {
    schema: &'a Schema,
    encoding: &'a Encoding,
    formula: &'a mut Formula,
}

impl<'a> LocalityContext<'a> {
    pub(crate) fn new(schema: &'a Schema, encoding: &'a Encoding, formula: &'a mut Formula) -> Self {
        Self {
            schema,
            encoding,
            formula,
        }
    }

    /// The schema being constrained.
    pub fn schema(&self) -> &Schema {
        self.schema
    }

    /// Where the policy adds its clauses.
    pub fn formula(&mut self) -> &mut Formula {
        self.formula
    }

    /// Every potential movement of the encoding.
    pub fn movements(&self) -> &[Movement] {
        &self.encoding.movements
    }

    /// True when `above` properly dominates `below`; `None` when that is
    /// impossible.
    pub fn dominance(&self, above: PointId, below: PointId) -> Option<Lit> {
        self.encoding.dominance(above, below)
    }

    /// True when `point` carries `feature`.
    pub fn feature(&self, point: PointId, feature: &Feature) -> Option<Lit> {
        self.encoding.feature(point, feature)
    }

    /// The licensee features that may sit at `point`.
    pub fn licensees(&self, point: PointId) -> impl Iterator<Item = (&Feature, Lit)> {
        self.encoding.features[point.0]
            .iter()
            .filter(|(feature, _)| feature.polarity() == Polarity::Licensee)
            .map(|(feature, lit)| (feature, *lit))
    }

    /// The triggers that may check `point`.
    pub fn checkers(&self, point: PointId) -> &[(PointId, Lit)] {
        &self.encoding.checkers[point.0]
    }
}

/// A locality condition on movement, enforced by construction.
pub trait LocalityPolicy: fmt::Debug + Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Adds clauses ruling out the movements the policy forbids.
    fn constrain(&self, context: &mut LocalityContext<'_>);
}

impl LocalityConfig {
    /// The policy this configuration names.
    pub fn policy(&self) -> Arc<dyn LocalityPolicy> {
        match self {
            LocalityConfig::ShortestMove => Arc::new(ShortestMove),
            LocalityConfig::PhaseBounded { phases } => Arc::new(PhaseBounded::new(phases.clone())),
        }
    }
}

/// The shortest move constraint: when a licensor applies, no other phrase
/// may be waiting with the same licensee.
///
/// Stated over the finished tree: movements `m1` and `m2` of the same
/// licensee conflict when `m1`'s licensor projection dominates `m2`'s
/// landing while `m2`'s projection still dominates `m1`'s previous position.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShortestMove;

impl LocalityPolicy for ShortestMove {
    fn name(&self) -> &str {
        "shortest move"
    }

    fn constrain(&self, context: &mut LocalityContext<'_>) {
        let movements = context.movements().to_vec();

        for first in &movements {
            for second in &movements {
                let first_slot = context.schema().point(first.landing).slot;
                let second_slot = context.schema().point(second.landing).slot;
                if first_slot == second_slot || first.checker == second.checker {
                    continue;
                }

                let (Some(outer), Some(inner)) = (
                    context.dominance(first.result, second.landing),
                    context.dominance(second.result, first.base),
                ) else {
                    continue;
                };

                let shared: Vec<(Lit, Lit)> = context
                    .licensees(first.landing)
                    .filter_map(|(feature, lit)| {
                        context
                            .feature(second.landing, feature)
                            .map(|other| (lit, other))
                    })
                    .collect();
                for (first_feature, second_feature) in shared {
                    context.formula().forbid(&[
                        first.link,
                        second.link,
                        outer,
                        inner,
                        first_feature,
                        second_feature,
                    ]);
                }
            }
        }
    }
}

/// Shortest move, plus phase impenetrability: a phrase inside the maximal
/// projection of a phase head may only move out of it from the head's
/// specifier.
#[derive(Debug, Clone, Default)]
pub struct PhaseBounded {
    phases: BTreeSet<String>,
}

impl PhaseBounded {
    /// Phases are named by the category of their head.
    pub fn new<S: Into<String>>(phases: impl IntoIterator<Item = S>) -> Self {
        Self {
            phases: phases.into_iter().map(Into::into).collect(),
        }
    }
}

impl LocalityPolicy for PhaseBounded {
    fn name(&self) -> &str {
        "phase-bounded"
    }

    fn constrain(&self, context: &mut LocalityContext<'_>) {
        ShortestMove.constrain(context);

        let phase_points: Vec<(PointId, Lit)> = context
            .schema()
            .points()
            .flat_map(|(point, _)| {
                self.phases
                    .iter()
                    .filter_map(|phase| {
                        context
                            .feature(point, &Feature::new(phase.clone(), Polarity::Selectee))
                            .map(|lit| (point, lit))
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        for movement in context.movements().to_vec() {
            let mover = context.schema().point(movement.base).slot;

            for (phase, is_phase) in &phase_points {
                let head = context.schema().point(*phase).slot;
                if head == mover {
                    continue;
                }
                let (Some(outside), Some(inside)) = (
                    context.dominance(movement.result, *phase),
                    context.dominance(*phase, movement.base),
                ) else {
                    continue;
                };

                // Checked by a non-initial feature of the phase head: the edge.
                let edge: Vec<Lit> = context
                    .checkers(movement.base)
                    .iter()
                    .filter(|(checker, _)| {
                        let point = context.schema().point(*checker);
                        point.slot == head && !point.is_lexical()
                    })
                    .map(|(_, lit)| *lit)
                    .collect();

                let mut clause = vec![
                    !movement.link,
                    !*is_phase,
                    !outside,
                    !inside,
                ];
                clause.extend(edge);
                context.formula().add_clause(clause);
            }
        }
    }
}
