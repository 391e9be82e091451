//! Predicate-argument constraints. Relations of an LF target are anchored
//! on words of the numeration and become clauses over links and dominance.

use itertools::Itertools;
use mgsat_lexicon::{Feature, Polarity};
use mgsat_solver::{Formula, Lit};

use crate::encoding::Encoding;
use crate::extract::Structure;
use crate::{ConfigurationError, LfTarget, PointId, Relation, Role, Schema, SlotId};

/// One requirement of an LF target, resolved against a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Requirement {
    pub description: String,
    pub condition: Condition,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Condition {
    Root(String),
    Category {
        slot: SlotId,
        category: String,
    },
    Theta {
        predicate: SlotId,
        role: Role,
        argument: Vec<SlotId>,
    },
    Agree {
        predicate: SlotId,
        argument: Vec<SlotId>,
    },
}

pub(crate) fn requirements(
    target: &LfTarget,
    schema: &Schema,
) -> Result<Vec<Requirement>, ConfigurationError> {
    let mut requirements = Vec::new();

    if let Some(root) = &target.root {
        requirements.push(Requirement {
            description: format!("root is {root}"),
            condition: Condition::Root(root.clone()),
        });
    }

    for (word, category) in &target.categories {
        requirements.push(Requirement {
            description: format!("{word} is {category}"),
            condition: Condition::Category {
                slot: anchor(schema, word)?,
                category: category.clone(),
            },
        });
    }

    for relation in &target.relations {
        let predicate = anchor(schema, relation.predicate())?;
        let argument = relation
            .argument()
            .words()
            .iter()
            .map(|word| anchor(schema, word))
            .collect::<Result<Vec<_>, _>>()?;

        let condition = match relation {
            Relation::Theta { role, .. } => Condition::Theta {
                predicate,
                role: *role,
                argument,
            },
            Relation::Agree { .. } => Condition::Agree {
                predicate,
                argument,
            },
        };
        requirements.push(Requirement {
            description: relation.to_string(),
            condition,
        });
    }

    Ok(requirements)
}

/// The overt slot of a word that occurs exactly once in the numeration.
fn anchor(schema: &Schema, word: &str) -> Result<SlotId, ConfigurationError> {
    let positions: Vec<usize> = schema
        .numeration()
        .iter()
        .positions(|candidate| candidate == word)
        .collect();

    match positions.as_slice() {
        [position] => schema
            .overt_slot(*position)
            .ok_or_else(|| ConfigurationError::UnknownAnchor { word: word.into() }),
        [] => Err(ConfigurationError::UnknownAnchor { word: word.into() }),
        _ => Err(ConfigurationError::AmbiguousAnchor {
            word: word.into(),
            count: positions.len(),
        }),
    }
}

pub(crate) fn constrain(
    requirements: &[Requirement],
    schema: &Schema,
    encoding: &Encoding,
    formula: &mut Formula,
) {
    for requirement in requirements {
        let alternatives = match &requirement.condition {
            Condition::Root(name) => {
                let feature = Feature::new(name.clone(), Polarity::Category);
                schema
                    .points()
                    .filter_map(|(point, _)| encoding.feature(point, &feature))
                    .collect()
            }
            Condition::Category { slot, category } => schema
                .slot(*slot)
                .candidates()
                .iter()
                .zip(&encoding.choices[slot.0])
                .filter(|((_, item), _)| item.category() == category)
                .map(|(_, (_, choice))| *choice)
                .collect(),
            Condition::Theta {
                predicate,
                role,
                argument,
            } => theta(schema, encoding, formula, *predicate, *role, argument),
            Condition::Agree {
                predicate,
                argument,
            } => {
                let mut alternatives = Vec::new();
                for point in schema.slot(*predicate).points() {
                    for (target, link) in &encoding.partners[point.0] {
                        if let Some(spans) = phrase(schema, encoding, formula, *target, argument) {
                            alternatives.push(formula.and(&[*link, spans]));
                        }
                    }
                }
                alternatives
            }
        };

        // No alternatives leaves an empty clause.
        formula.add_clause(alternatives);
    }
}

fn theta(
    schema: &Schema,
    encoding: &Encoding,
    formula: &mut Formula,
    predicate: SlotId,
    role: Role,
    argument: &[SlotId],
) -> Vec<Lit> {
    let mut alternatives = Vec::new();

    match role {
        Role::Obj | Role::Iobj => {
            let index = if role == Role::Obj { 0 } else { 1 };
            let Some(point) = schema.point_at(predicate, index) else {
                return alternatives;
            };
            let selects = selector(encoding, formula, point);
            for (target, link) in &encoding.partners[point.0] {
                if let Some(spans) = phrase(schema, encoding, formula, *target, argument) {
                    alternatives.push(formula.and(&[selects, *link, spans]));
                }
            }
        }
        Role::Subj => {
            for point in schema.slot(predicate).points() {
                for (checker, link) in &encoding.checkers[point.0] {
                    let checker_point = schema.point(*checker);
                    if !checker_point.is_lexical() || checker_point.slot == predicate {
                        continue;
                    }
                    let Some(next) = schema.successor(*checker) else {
                        continue;
                    };
                    let selects = selector(encoding, formula, next);
                    for (target, merge) in &encoding.partners[next.0] {
                        if let Some(spans) = phrase(schema, encoding, formula, *target, argument)
                        {
                            alternatives.push(formula.and(&[*link, selects, *merge, spans]));
                        }
                    }
                }
            }
        }
    }

    alternatives
}

fn selector(encoding: &Encoding, formula: &mut Formula, point: PointId) -> Lit {
    let lits: Vec<Lit> = encoding.features[point.0]
        .iter()
        .filter(|(feature, _)| feature.polarity() == Polarity::Selector)
        .map(|(_, lit)| *lit)
        .collect();
    formula.or(&lits)
}

/// True when `head` projects from one of the argument's words and dominates
/// the rest of them.
fn phrase(
    schema: &Schema,
    encoding: &Encoding,
    formula: &mut Formula,
    head: PointId,
    argument: &[SlotId],
) -> Option<Lit> {
    let slot = schema.point(head).slot;
    if !argument.contains(&slot) {
        return None;
    }
    let lits = argument
        .iter()
        .filter(|word| **word != slot)
        .map(|word| encoding.dominance(head, schema.lexical_point(*word)))
        .collect::<Option<Vec<_>>>()?;
    Some(formula.and(&lits))
}

/// Whether an extracted structure meets `condition`, by the same reading
/// the clauses above impose.
pub(crate) fn satisfied(condition: &Condition, structure: &Structure<'_>) -> bool {
    let schema = structure.schema();
    let spans = |head: PointId, argument: &[SlotId]| {
        let slot = schema.point(head).slot;
        argument.contains(&slot)
            && argument
                .iter()
                .filter(|word| **word != slot)
                .all(|word| structure.dominates(head, schema.lexical_point(*word)))
    };
    let selects = |point: PointId| {
        structure
            .feature(point)
            .is_some_and(|feature| feature.polarity() == Polarity::Selector)
    };

    match condition {
        Condition::Root(name) => structure.feature(structure.root()).is_some_and(|feature| {
            feature.polarity() == Polarity::Category && feature.name() == name
        }),
        Condition::Category { slot, category } => structure
            .item(*slot)
            .is_some_and(|item| item.category() == category),
        Condition::Theta {
            predicate,
            role: role @ (Role::Obj | Role::Iobj),
            argument,
        } => {
            let index = if *role == Role::Obj { 0 } else { 1 };
            schema.point_at(*predicate, index).is_some_and(|point| {
                selects(point)
                    && structure
                        .partner(point)
                        .is_some_and(|target| spans(target, argument))
            })
        }
        Condition::Theta {
            predicate,
            role: Role::Subj,
            argument,
        } => schema
            .slot(*predicate)
            .points()
            .filter_map(|point| structure.checker(point))
            .filter(|checker| {
                let point = schema.point(*checker);
                point.is_lexical() && point.slot != *predicate
            })
            .filter_map(|checker| schema.successor(checker))
            .any(|next| {
                selects(next)
                    && structure
                        .partner(next)
                        .is_some_and(|target| spans(target, argument))
            }),
        Condition::Agree {
            predicate,
            argument,
        } => schema
            .slot(*predicate)
            .points()
            .filter_map(|point| structure.partner(point))
            .any(|target| spans(target, argument)),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::Bounds;
    use mgsat_lexicon::{LexicalItem, Lexicon};
    use pretty_assertions::assert_eq;
    use testresult::TestResult;

    fn schema(words: &[&str]) -> Schema {
        let items = [
            LexicalItem::parse("her", "~D", Some("her")),
            LexicalItem::parse("knows", "=D ~V", Some("knows")),
            LexicalItem::parse("v", "<=V =D ~v", None),
            LexicalItem::parse("C", "=v C", None),
        ];
        let lexicon = Lexicon::from_items(items.into_iter().map(Result::unwrap)).unwrap();
        Schema::build(
            Arc::new(lexicon),
            words.iter().map(|word| word.to_string()).collect(),
            Bounds::new(2, 0, 1),
        )
        .unwrap()
    }

    #[test]
    fn it_anchors_relations_on_words() -> TestResult {
        let schema = schema(&["her", "knows", "her"]);
        let target = LfTarget::new()
            .with_root("C")
            .with_category("knows", "V")
            .with_relation(Relation::theta("knows", Role::Obj, "knows"));

        let requirements = requirements(&target, &schema)?;
        assert_eq!(requirements.len(), 3);
        assert_eq!(requirements[0].condition, Condition::Root("C".into()));
        assert_eq!(
            requirements[1].condition,
            Condition::Category {
                slot: SlotId(1),
                category: "V".into()
            }
        );
        assert_eq!(requirements[2].description, "knows(obj: knows)");
        Ok(())
    }

    #[test]
    fn it_rejects_missing_and_repeated_anchors() -> TestResult {
        let schema = schema(&["her", "knows", "her"]);

        let missing = LfTarget::new().with_relation(Relation::theta("fears", Role::Obj, "her"));
        assert_eq!(
            requirements(&missing, &schema),
            Err(ConfigurationError::UnknownAnchor {
                word: "fears".into()
            })
        );

        let repeated = LfTarget::new().with_relation(Relation::agree("knows", "her"));
        assert_eq!(
            requirements(&repeated, &schema),
            Err(ConfigurationError::AmbiguousAnchor {
                word: "her".into(),
                count: 2
            })
        );
        Ok(())
    }
}
