//! Variables of the structural encoding and the clauses that tie them
//! together.
//!
//! For every slot there is one choice variable per candidate item, and
//! every point gets one variable per feature its candidates can carry
//! there. A *link* `(x, y)` says that the trigger feature at point `x`
//! checks the target feature at point `y`; the result of the check is the
//! point after `x`. Parenthood is read off the links, and dominance is its
//! exact transitive closure.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use indexmap::IndexMap;
use mgsat_lexicon::{Feature, ItemId, Polarity};
use mgsat_solver::{Formula, Lit};

use crate::{Bounds, Movement, PointId, Schema, SlotId, SlotKind};

pub(crate) struct Encoding {
    /// Per slot: one variable per candidate item.
    pub choices: Vec<Vec<(ItemId, Lit)>>,
    /// Per slot: some item fills it.
    pub used: Vec<Lit>,
    /// Per point: the slot's item has a feature at this position.
    pub active: Vec<Lit>,
    /// Per point: the distinct features that may sit there.
    pub features: Vec<Vec<(Feature, Lit)>>,
    pub triggers: Vec<Lit>,
    pub targets: Vec<Lit>,
    pub categories: Vec<Lit>,
    pub licensees: Vec<Lit>,
    pub links: IndexMap<(PointId, PointId), Lit>,
    /// Per trigger point: the targets it may check.
    pub partners: Vec<Vec<(PointId, Lit)>>,
    /// Per target point: the triggers that may check it.
    pub checkers: Vec<Vec<(PointId, Lit)>>,
    pub parents: Vec<Vec<(PointId, Lit)>>,
    /// `(z, w)`: z properly dominates w.
    pub dominance: BTreeMap<(PointId, PointId), Lit>,
    /// Per slot: its item attracts the head of its complement.
    pub hosts: Vec<Lit>,
    /// `(mover, host)`: the mover's head incorporates into the host.
    pub head_moves: IndexMap<(SlotId, SlotId), Lit>,
    pub movements: Vec<Movement>,
}

impl Encoding {
    /// Lexical choices and the feature each point carries.
    pub fn lexical(schema: &Schema, formula: &mut Formula) -> Self {
        let mut choices = Vec::with_capacity(schema.slot_count());
        let mut used = Vec::with_capacity(schema.slot_count());

        for (_, slot) in schema.slots() {
            let slot_choices: Vec<(ItemId, Lit)> = slot
                .candidates()
                .iter()
                .map(|(id, _)| (*id, formula.new_lit()))
                .collect();
            let lits: Vec<Lit> = slot_choices.iter().map(|(_, lit)| *lit).collect();

            let filled = match slot.kind() {
                SlotKind::Overt { .. } => {
                    formula.exactly_one(&lits);
                    formula.top()
                }
                SlotKind::Covert => {
                    formula.at_most_one(&lits);
                    formula.or(&lits)
                }
            };
            choices.push(slot_choices);
            used.push(filled);
        }

        let mut active = Vec::with_capacity(schema.point_count());
        let mut features = Vec::with_capacity(schema.point_count());
        for (_, point) in schema.points() {
            let slot = schema.slot(point.slot);
            let mut grouped: IndexMap<Feature, Vec<Lit>> = IndexMap::new();
            for ((_, item), (_, choice)) in slot.candidates().iter().zip(&choices[point.slot.0]) {
                if let Some(feature) = item.feature(point.index) {
                    grouped.entry(feature.clone()).or_default().push(*choice);
                }
            }

            let point_features: Vec<(Feature, Lit)> = grouped
                .into_iter()
                .map(|(feature, lits)| (feature, formula.or(&lits)))
                .collect();
            let lits: Vec<Lit> = point_features.iter().map(|(_, lit)| *lit).collect();
            active.push(formula.or(&lits));
            features.push(point_features);
        }

        let mut by_polarity = |keep: fn(Polarity) -> bool| -> Vec<Lit> {
            features
                .iter()
                .map(|point_features| {
                    let lits: Vec<Lit> = point_features
                        .iter()
                        .filter(|(feature, _)| keep(feature.polarity()))
                        .map(|(_, lit)| *lit)
                        .collect();
                    formula.or(&lits)
                })
                .collect()
        };
        let triggers = by_polarity(|polarity| polarity.is_trigger());
        let targets = by_polarity(|polarity| polarity.is_target());
        let categories = by_polarity(|polarity| polarity == Polarity::Category);
        let licensees = by_polarity(|polarity| polarity == Polarity::Licensee);

        let points = schema.point_count();
        Self {
            choices,
            used,
            active,
            features,
            triggers,
            targets,
            categories,
            licensees,
            links: IndexMap::new(),
            partners: vec![Vec::new(); points],
            checkers: vec![Vec::new(); points],
            parents: vec![Vec::new(); points],
            dominance: BTreeMap::new(),
            hosts: vec![formula.bottom(); schema.slot_count()],
            head_moves: IndexMap::new(),
            movements: Vec::new(),
        }
    }

    /// The variable for `feature` sitting at `point`, if any candidate puts
    /// it there.
    pub fn feature(&self, point: PointId, feature: &Feature) -> Option<Lit> {
        self.features[point.0]
            .iter()
            .find(|(candidate, _)| candidate == feature)
            .map(|(_, lit)| *lit)
    }

    pub fn dominance(&self, above: PointId, below: PointId) -> Option<Lit> {
        self.dominance.get(&(above, below)).copied()
    }

    /// Feature checking: every active trigger checks exactly one target in
    /// another slot, every active target is checked exactly once, and a
    /// link implies the two features match.
    pub fn link(&mut self, schema: &Schema, formula: &mut Formula) {
        for (x, trigger_point) in schema.points() {
            for (y, target_point) in schema.points() {
                if trigger_point.slot == target_point.slot {
                    continue;
                }

                let mut compatible = Vec::new();
                let mut requirements = Vec::new();
                for (trigger, trigger_lit) in &self.features[x.0] {
                    let matching: Vec<Lit> = self.features[y.0]
                        .iter()
                        .filter(|(target, _)| trigger.checks(target))
                        .map(|(_, lit)| *lit)
                        .collect();
                    if !matching.is_empty() {
                        compatible.push(*trigger_lit);
                        requirements.push((*trigger_lit, matching));
                    }
                }
                if compatible.is_empty() {
                    continue;
                }

                let link = formula.new_lit();
                formula.implies_any(&[link], &compatible);
                for (trigger_lit, matching) in requirements {
                    formula.implies_any(&[link, trigger_lit], &matching);
                }
                self.links.insert((x, y), link);
                self.partners[x.0].push((y, link));
                self.checkers[y.0].push((x, link));
            }
        }

        for (point, _) in schema.points() {
            let partners: Vec<Lit> = self.partners[point.0].iter().map(|(_, lit)| *lit).collect();
            formula.implies_any(&[self.triggers[point.0]], &partners);
            formula.at_most_one(&partners);

            let checkers: Vec<Lit> = self.checkers[point.0].iter().map(|(_, lit)| *lit).collect();
            formula.implies_any(&[self.targets[point.0]], &checkers);
            formula.at_most_one(&checkers);
        }
    }

    /// Exactly one point carries a clause category: the root.
    pub fn root(&mut self, formula: &mut Formula) {
        let bottom = formula.bottom();
        let roots: Vec<Lit> = self
            .categories
            .iter()
            .copied()
            .filter(|lit| *lit != bottom)
            .collect();
        formula.exactly_one(&roots);
    }

    /// Parenthood and dominance. A trigger's parent is the next point of its
    /// own slot; a target's parent is the point after its checker.
    /// Dominance is constrained to be exactly the transitive closure of
    /// parenthood, which with irreflexivity makes the structure a tree.
    pub fn tree(&mut self, schema: &Schema, formula: &mut Formula) {
        let bottom = formula.bottom();

        for (point, _) in schema.points() {
            let trigger = self.triggers[point.0];
            if trigger != bottom {
                match schema.successor(point) {
                    Some(next) => self.parents[point.0].push((next, trigger)),
                    None => formula.add_clause([!trigger]),
                }
            }
            for (checker, link) in self.checkers[point.0].clone() {
                match schema.successor(checker) {
                    Some(result) => self.parents[point.0].push((result, link)),
                    None => formula.add_clause([!link]),
                }
            }
        }

        let ancestors: Vec<Vec<PointId>> = schema
            .points()
            .map(|(point, _)| {
                self.reachable(point)
                    .into_iter()
                    .filter(|ancestor| *ancestor != point)
                    .collect()
            })
            .collect();
        for (point, _) in schema.points() {
            for ancestor in &ancestors[point.0] {
                let lit = formula.new_lit();
                self.dominance.insert((*ancestor, point), lit);
            }
        }

        for (point, _) in schema.points() {
            for (parent, lit) in &self.parents[point.0] {
                if let Some(direct) = self.dominance(*parent, point) {
                    formula.implies(&[*lit], direct);
                }

                for above in &ancestors[parent.0] {
                    let Some(upper) = self.dominance(*above, *parent) else {
                        continue;
                    };
                    if *above == point {
                        formula.forbid(&[*lit, upper]);
                    } else if let Some(through) = self.dominance(*above, point) {
                        formula.implies(&[*lit, upper], through);
                    }
                }
            }
        }

        for ((above, below), lit) in &self.dominance {
            let parents = &self.parents[below.0];
            let parent_lits: Vec<Lit> = parents.iter().map(|(_, parent)| *parent).collect();
            formula.implies_any(&[*lit], &parent_lits);

            for (parent, parent_lit) in parents {
                if parent == above {
                    continue;
                }
                match self.dominance(*above, *parent) {
                    Some(upper) => formula.implies(&[*lit, *parent_lit], upper),
                    None => formula.forbid(&[*lit, *parent_lit]),
                }
            }
        }
    }

    /// Points statically reachable from `point` by following parents.
    fn reachable(&self, point: PointId) -> BTreeSet<PointId> {
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([point]);
        while let Some(current) = queue.pop_front() {
            for (parent, _) in &self.parents[current.0] {
                if seen.insert(*parent) {
                    queue.push_back(*parent);
                }
            }
        }
        seen
    }

    /// Every licensee is one movement. The licensor's projection must
    /// dominate the mover's previous position, and the number of movements
    /// is bounded.
    pub fn movement(&mut self, schema: &Schema, formula: &mut Formula, bounds: &Bounds) {
        let bottom = formula.bottom();
        let mut counted = Vec::new();

        for (landing, _) in schema.points() {
            let licensee = self.licensees[landing.0];
            if licensee == bottom {
                continue;
            }
            counted.push(licensee);

            let Some(base) = schema.predecessor(landing) else {
                formula.add_clause([!licensee]);
                continue;
            };

            for (checker, link) in self.checkers[landing.0].clone() {
                let licensor = self.features[checker.0]
                    .iter()
                    .any(|(feature, _)| feature.polarity() == Polarity::Licensor);
                if !licensor {
                    continue;
                }
                let Some(result) = schema.successor(checker) else {
                    continue;
                };

                match self.dominance(result, base) {
                    Some(dominates) => formula.implies(&[link, licensee], dominates),
                    None => formula.forbid(&[link, licensee]),
                }
                self.movements.push(Movement {
                    checker,
                    landing,
                    base,
                    result,
                    link,
                });
            }
        }

        formula.at_most(&counted, bounds.max_num_movements);
    }

    /// A head-attracting selector incorporates the head of whatever it
    /// merges. Hosts never move on, and the number of hosts is bounded.
    pub fn head_movement(&mut self, schema: &Schema, formula: &mut Formula, bounds: &Bounds) {
        let mut counted = Vec::new();

        for (host_slot, _) in schema.slots() {
            let point = schema.lexical_point(host_slot);
            let attracting: Vec<Lit> = self.features[point.0]
                .iter()
                .filter(|(feature, _)| feature.moves_head())
                .map(|(_, lit)| *lit)
                .collect();
            if attracting.is_empty() {
                continue;
            }
            let host = formula.or(&attracting);
            self.hosts[host_slot.0] = host;
            counted.push(host);

            let mut by_mover: IndexMap<SlotId, Vec<Lit>> = IndexMap::new();
            for (target, link) in &self.partners[point.0] {
                by_mover
                    .entry(schema.point(*target).slot)
                    .or_default()
                    .push(*link);
            }
            for (mover, links) in by_mover {
                let moved = formula.new_lit();
                for link in &links {
                    formula.implies(&[host, *link], moved);
                }
                formula.implies(&[moved], host);
                formula.implies_any(&[moved], &links);
                self.head_moves.insert((mover, host_slot), moved);
            }
        }

        for ((_, host), moved) in &self.head_moves {
            for ((mover, _), onward) in &self.head_moves {
                if mover == host {
                    formula.forbid(&[*moved, *onward]);
                }
            }
        }

        formula.at_most(&counted, bounds.max_num_head_movements);
    }

    /// Covert slots are interchangeable, so they are filled in candidate
    /// order with the unused ones last.
    pub fn order_covert_slots(&self, schema: &Schema, formula: &mut Formula) {
        let covert: Vec<SlotId> = schema.covert_slots().collect();
        for pair in covert.windows(2) {
            let (earlier, later) = (pair[0].0, pair[1].0);
            formula.implies(&[self.used[later]], self.used[earlier]);

            for (index, (_, choice)) in self.choices[later].iter().enumerate() {
                let allowed: Vec<Lit> = self.choices[earlier][..=index]
                    .iter()
                    .map(|(_, lit)| *lit)
                    .collect();
                formula.implies_any(&[*choice], &allowed);
            }
        }
    }

    /// Head-movement sites of the slot's head: itself when it stays, or the
    /// host it incorporates into.
    pub fn sites(&self, formula: &mut Formula, slot: SlotId) -> Vec<(SlotId, Lit)> {
        let incorporations: Vec<(SlotId, Lit)> = self
            .head_moves
            .iter()
            .filter(|((mover, _), _)| *mover == slot)
            .map(|((_, host), lit)| (*host, *lit))
            .collect();
        let lits: Vec<Lit> = incorporations.iter().map(|(_, lit)| *lit).collect();
        let moved = formula.or(&lits);

        let mut sites = vec![(slot, formula.and(&[self.used[slot.0], !moved]))];
        sites.extend(incorporations);
        sites
    }

    /// Variables that determine the observable derivation: lexical choices
    /// and feature-checking links.
    pub fn projection(&self) -> Vec<Lit> {
        self.choices
            .iter()
            .flatten()
            .map(|(_, lit)| *lit)
            .chain(self.links.values().copied())
            .collect()
    }
}
