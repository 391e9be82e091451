//! Reading a derivation out of a model.
//!
//! The constraints already guarantee everything checked here; a failed
//! check means the encoding is wrong, never the input.

use std::collections::BTreeMap;

use mgsat_lexicon::{Feature, ItemId, LexicalItem, Polarity};
use mgsat_solver::Model;
use tracing::debug;

use crate::encoding::Encoding;
use crate::lf::{self, Requirement};
use crate::{
    Check, Derivation, DerivationNode, FeatureRef, InconsistentModelError, Leaf, LeafId, NodeId,
    Operation, PointId, Schema, SlotId,
};

/// The tree a model describes, over schema points.
pub(crate) struct Structure<'a> {
    schema: &'a Schema,
    items: Vec<Option<(ItemId, &'a LexicalItem)>>,
    partners: Vec<Option<PointId>>,
    checkers: Vec<Option<PointId>>,
    parents: Vec<Option<PointId>>,
    root: PointId,
}

impl<'a> Structure<'a> {
    pub fn schema(&self) -> &'a Schema {
        self.schema
    }

    pub fn root(&self) -> PointId {
        self.root
    }

    pub fn item(&self, slot: SlotId) -> Option<&'a LexicalItem> {
        self.items[slot.0].map(|(_, item)| item)
    }

    /// The feature the chosen item carries at `point`.
    pub fn feature(&self, point: PointId) -> Option<&'a Feature> {
        let at = self.schema.point(point);
        self.item(at.slot).and_then(|item| item.feature(at.index))
    }

    /// The target a trigger point checks.
    pub fn partner(&self, point: PointId) -> Option<PointId> {
        self.partners[point.0]
    }

    /// The trigger that checks a target point.
    pub fn checker(&self, point: PointId) -> Option<PointId> {
        self.checkers[point.0]
    }

    /// Proper dominance.
    pub fn dominates(&self, above: PointId, below: PointId) -> bool {
        self.ancestors(below).any(|ancestor| ancestor == above)
    }

    fn ancestors(&self, point: PointId) -> impl Iterator<Item = PointId> + '_ {
        std::iter::successors(self.parents[point.0], |current| self.parents[current.0])
            .take(self.schema.point_count())
    }

    fn describe(&self, point: PointId) -> String {
        let slot = self.schema.point(point).slot;
        match self.feature(point) {
            Some(feature) => format!("{} {}", self.schema.describe(slot), feature),
            None => format!("{} {}", self.schema.describe(slot), point),
        }
    }

    fn active(&self) -> impl Iterator<Item = (PointId, &'a Feature)> + '_ {
        self.schema
            .points()
            .filter_map(|(point, _)| self.feature(point).map(|feature| (point, feature)))
    }
}

pub(crate) struct Extractor<'a> {
    pub schema: &'a Schema,
    pub encoding: &'a Encoding,
    /// Set when PF constraints apply.
    pub pf: Option<&'a [String]>,
    /// Empty when LF constraints do not apply.
    pub requirements: &'a [Requirement],
}

impl<'a> Extractor<'a> {
    pub fn extract(&self, model: &Model) -> Result<Derivation, InconsistentModelError> {
        let structure = self.structure(model)?;
        self.check_movement(&structure)?;
        self.check_head_movement(&structure)?;

        let derivation = Builder::new(&structure).build()?;

        if let Some(expected) = self.pf {
            let found = derivation.pronounced();
            if found != expected {
                return Err(InconsistentModelError::Linearization {
                    expected: expected.to_vec(),
                    found,
                });
            }
        }

        for requirement in self.requirements {
            if !lf::satisfied(&requirement.condition, &structure) {
                return Err(InconsistentModelError::LogicalForm {
                    requirement: requirement.description.clone(),
                });
            }
        }

        debug!(derivation = %derivation, "Derivation extracted");
        Ok(derivation)
    }

    fn structure(&self, model: &Model) -> Result<Structure<'a>, InconsistentModelError> {
        let schema = self.schema;
        let bounds = schema.bounds();

        let mut items = Vec::with_capacity(schema.slot_count());
        for (slot, data) in schema.slots() {
            let chosen: Vec<(ItemId, &LexicalItem)> = data
                .candidates()
                .iter()
                .zip(&self.encoding.choices[slot.0])
                .filter(|(_, (_, choice))| model.value(*choice))
                .map(|((id, item), _)| (*id, item))
                .collect();
            let required = usize::from(!data.is_covert());
            if chosen.len() < required || chosen.len() > 1 {
                return Err(InconsistentModelError::SlotChoice {
                    slot: slot.0,
                    count: chosen.len(),
                });
            }
            items.push(chosen.first().copied());
        }

        let empty = schema
            .covert_slots()
            .filter(|slot| items[slot.0].is_some())
            .count();
        if empty > bounds.max_num_empty_lexical_items {
            return Err(InconsistentModelError::BoundViolated {
                bound: "max_num_empty_lexical_items",
                limit: bounds.max_num_empty_lexical_items,
                used: empty,
            });
        }

        let mut structure = Structure {
            schema,
            items,
            partners: vec![None; schema.point_count()],
            checkers: vec![None; schema.point_count()],
            parents: vec![None; schema.point_count()],
            root: PointId(0),
        };

        let mut checked = vec![0usize; schema.point_count()];
        for ((trigger, target), link) in &self.encoding.links {
            if !model.value(*link) {
                continue;
            }
            let compatible = match (structure.feature(*trigger), structure.feature(*target)) {
                (Some(first), Some(second)) => first.checks(second),
                _ => false,
            };
            if !compatible {
                return Err(InconsistentModelError::Incompatible {
                    trigger: structure.describe(*trigger),
                    target: structure.describe(*target),
                });
            }
            structure.partners[trigger.0] = Some(*target);
            structure.checkers[target.0] = Some(*trigger);
            checked[trigger.0] += 1;
            checked[target.0] += 1;
        }

        let mut roots = Vec::new();
        for (point, feature) in structure.active().collect::<Vec<_>>() {
            let expected = usize::from(feature.polarity() != Polarity::Category);
            if checked[point.0] != expected {
                return Err(InconsistentModelError::CheckCount {
                    label: schema.describe(schema.point(point).slot),
                    feature: feature.to_string(),
                    count: checked[point.0],
                });
            }

            let parent = if feature.polarity().is_trigger() {
                schema.successor(point)
            } else if feature.polarity().is_target() {
                structure
                    .checker(point)
                    .and_then(|checker| schema.successor(checker))
            } else {
                roots.push(point);
                continue;
            };
            match parent {
                Some(parent) => structure.parents[point.0] = Some(parent),
                None => {
                    return Err(InconsistentModelError::Disconnected {
                        label: structure.describe(point),
                    });
                }
            }
        }

        structure.root = match roots.as_slice() {
            [root] => *root,
            _ => return Err(InconsistentModelError::RootCount { count: roots.len() }),
        };

        for (point, _) in structure.active() {
            if point != structure.root && !structure.dominates(structure.root, point) {
                return Err(InconsistentModelError::Disconnected {
                    label: structure.describe(point),
                });
            }
        }

        Ok(structure)
    }

    fn check_movement(&self, structure: &Structure<'_>) -> Result<(), InconsistentModelError> {
        let schema = self.schema;
        let mut movements = 0;

        for (landing, feature) in structure.active() {
            if feature.polarity() != Polarity::Licensee {
                continue;
            }
            movements += 1;

            let licensed = schema.predecessor(landing).is_some_and(|base| {
                structure
                    .checker(landing)
                    .and_then(|checker| schema.successor(checker))
                    .is_some_and(|result| structure.dominates(result, base))
            });
            if !licensed {
                return Err(InconsistentModelError::UnlicensedMovement {
                    label: structure.describe(landing),
                });
            }
        }

        let limit = schema.bounds().max_num_movements;
        if movements > limit {
            return Err(InconsistentModelError::BoundViolated {
                bound: "max_num_movements",
                limit,
                used: movements,
            });
        }
        Ok(())
    }

    fn check_head_movement(&self, structure: &Structure<'_>) -> Result<(), InconsistentModelError> {
        let schema = self.schema;

        let hosts: BTreeMap<SlotId, Option<SlotId>> = schema
            .slots()
            .filter(|(slot, _)| structure.item(*slot).is_some_and(LexicalItem::attracts_head))
            .map(|(slot, _)| {
                let mover = structure
                    .partner(schema.lexical_point(slot))
                    .map(|target| schema.point(target).slot);
                (slot, mover)
            })
            .collect();

        for (host, mover) in &hosts {
            let Some(mover) = mover else {
                return Err(InconsistentModelError::HeadMovement {
                    label: schema.describe(*host),
                });
            };
            if hosts.contains_key(mover) {
                return Err(InconsistentModelError::HeadMovement {
                    label: schema.describe(*host),
                });
            }
        }

        let limit = schema.bounds().max_num_head_movements;
        if hosts.len() > limit {
            return Err(InconsistentModelError::BoundViolated {
                bound: "max_num_head_movements",
                limit,
                used: hosts.len(),
            });
        }
        Ok(())
    }
}

/// Lays the structure out as a [`Derivation`]: nodes in preorder, head
/// first, and leaves in the order they are reached.
struct Builder<'s, 'a> {
    structure: &'s Structure<'a>,
    nodes: BTreeMap<PointId, NodeId>,
    leaves: BTreeMap<SlotId, LeafId>,
    order: Vec<PointId>,
}

impl<'s, 'a> Builder<'s, 'a> {
    fn new(structure: &'s Structure<'a>) -> Self {
        Self {
            structure,
            nodes: BTreeMap::new(),
            leaves: BTreeMap::new(),
            order: Vec::new(),
        }
    }

    fn build(mut self) -> Result<Derivation, InconsistentModelError> {
        self.number(self.structure.root);

        let schema = self.structure.schema;
        let mut leaves = self
            .leaves
            .iter()
            .map(|(slot, id)| {
                let item = self
                    .structure
                    .item(*slot)
                    .ok_or_else(|| InconsistentModelError::Unplaced {
                        label: schema.describe(*slot),
                    })?;
                Ok((
                    *id,
                    Leaf {
                        item: item.label().to_string(),
                        phonological_form: item.phonological_form().map(String::from),
                        denotation: item.denotation().map(String::from),
                        features: item.features().to_vec(),
                        position: schema.slot(*slot).position(),
                    },
                ))
            })
            .collect::<Result<Vec<(LeafId, Leaf)>, InconsistentModelError>>()?;
        leaves.sort_by_key(|(id, _)| *id);

        let nodes = self
            .order
            .iter()
            .map(|point| self.node(*point))
            .collect::<Result<_, _>>()?;

        Ok(Derivation::new(
            leaves.into_iter().map(|(_, leaf)| leaf).collect(),
            nodes,
        ))
    }

    /// Assigns ids in preorder. Landing sites of moved phrases are not
    /// nodes of their own.
    fn number(&mut self, point: PointId) {
        let schema = self.structure.schema;
        self.nodes.insert(point, NodeId(self.order.len()));
        self.order.push(point);

        let at = schema.point(point);
        if at.is_lexical() {
            let next = LeafId(self.leaves.len());
            self.leaves.entry(at.slot).or_insert(next);
            return;
        }

        let Some(head) = schema.predecessor(point) else {
            return;
        };
        self.number(head);
        if let Some(argument) = self.structure.partner(head) {
            if !self.is_landing(argument) {
                self.number(argument);
            }
        }
    }

    fn is_landing(&self, point: PointId) -> bool {
        self.structure
            .feature(point)
            .is_some_and(|feature| feature.polarity() == Polarity::Licensee)
    }

    fn unplaced(&self, point: PointId) -> InconsistentModelError {
        InconsistentModelError::Unplaced {
            label: self.structure.describe(point),
        }
    }

    fn feature_ref(&self, point: PointId) -> Result<FeatureRef, InconsistentModelError> {
        let at = self.structure.schema.point(point);
        let leaf = self.leaves.get(&at.slot).copied();
        Ok(FeatureRef {
            leaf: leaf.ok_or_else(|| self.unplaced(point))?,
            index: at.index,
        })
    }

    fn node_id(&self, point: PointId) -> Result<NodeId, InconsistentModelError> {
        self.nodes
            .get(&point)
            .copied()
            .ok_or_else(|| self.unplaced(point))
    }

    fn node(&self, point: PointId) -> Result<DerivationNode, InconsistentModelError> {
        let schema = self.structure.schema;
        let at = schema.point(point);
        let head_leaf = self.feature_ref(point)?.leaf;

        let operation = match schema.predecessor(point) {
            None => Operation::Lexical(head_leaf),
            Some(head) => {
                let argument = self.structure.partner(head).ok_or_else(|| {
                    InconsistentModelError::CheckCount {
                        label: schema.describe(schema.point(head).slot),
                        feature: self
                            .structure
                            .feature(head)
                            .map(ToString::to_string)
                            .unwrap_or_default(),
                        count: 0,
                    }
                })?;
                let check = Check {
                    trigger: self.feature_ref(head)?,
                    target: self.feature_ref(argument)?,
                };

                if self.is_landing(argument) {
                    Operation::Move {
                        head: self.node_id(head)?,
                        mover: self.node_id(self.mover(argument)?)?,
                        check,
                    }
                } else if self.structure.feature(head).is_some_and(Feature::moves_head) {
                    Operation::HeadMove {
                        head: self.node_id(head)?,
                        argument: self.node_id(argument)?,
                        check,
                        incorporated: self.feature_ref(argument)?.leaf,
                    }
                } else {
                    Operation::Merge {
                        head: self.node_id(head)?,
                        argument: self.node_id(argument)?,
                        check,
                    }
                }
            }
        };

        Ok(DerivationNode {
            operation,
            head: head_leaf,
            index: at.index,
        })
    }

    /// The phrase a landing site belongs to, as first merged.
    fn mover(&self, landing: PointId) -> Result<PointId, InconsistentModelError> {
        let schema = self.structure.schema;
        let slot = schema.point(landing).slot;
        self.structure
            .item(slot)
            .and_then(|item| schema.point_at(slot, item.category_index()))
            .ok_or_else(|| self.unplaced(landing))
    }
}
