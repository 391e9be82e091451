//! Linearization. Every pronounced word sits at a site (its own slot, or
//! the host its head incorporated into) and the sites are totally ordered.
//! At each check the head's side is ordered before or after the argument's
//! side; the order of the sites must then agree with the PF target.

use std::collections::{BTreeMap, VecDeque};

use itertools::Itertools;
use mgsat_solver::{Formula, Lit};

use crate::encoding::Encoding;
use crate::{PointId, Schema, SlotId};

pub(crate) fn constrain(schema: &Schema, encoding: &Encoding, formula: &mut Formula) {
    let layout = Layout::new(schema, encoding, formula);
    let pins = layout.pins(schema, formula);
    let order = Order::new(schema, formula);

    for (trigger, target, stays) in &layout.stays {
        let head_first = schema.point(*trigger).is_lexical();
        for (head_site, head_pinned) in &pins[trigger.0] {
            for (argument_site, argument_pinned) in &pins[target.0] {
                if head_site == argument_site {
                    continue;
                }
                let ordered = if head_first {
                    order.before(*head_site, *argument_site)
                } else {
                    order.before(*argument_site, *head_site)
                };
                formula.implies(&[*stays, *head_pinned, *argument_pinned], ordered);
            }
        }
    }

    let words: Vec<SlotId> = (0..schema.numeration().len())
        .filter_map(|position| schema.overt_slot(position))
        .collect();
    let sites: Vec<Vec<(SlotId, Lit)>> = words
        .iter()
        .map(|slot| encoding.sites(formula, *slot))
        .collect();

    for (i, j) in (0..words.len()).tuple_combinations() {
        for (first, first_lit) in &sites[i] {
            for (second, second_lit) in &sites[j] {
                if first != second {
                    formula.implies(&[*first_lit, *second_lit], order.before(*first, *second));
                } else if *first != words[j] {
                    // Sharing a site is only fine when the earlier word is
                    // the head incorporated into the later one.
                    formula.forbid(&[*first_lit, *second_lit]);
                }
            }
        }
    }
}

/// Where the words under each point are pronounced. It follows the tree,
/// except that a phrase which moves on is pronounced at its next landing
/// instead of where it was checked.
struct Layout {
    parents: Vec<Vec<(PointId, Lit)>>,
    /// `(trigger, target, lit)`: the target's words are pronounced at the
    /// check.
    stays: Vec<(PointId, PointId, Lit)>,
}

impl Layout {
    fn new(schema: &Schema, encoding: &Encoding, formula: &mut Formula) -> Self {
        let bottom = formula.bottom();
        let mut parents = vec![Vec::new(); schema.point_count()];
        let mut stays = Vec::new();

        for (point, _) in schema.points() {
            let next = schema.successor(point);

            let trigger = encoding.triggers[point.0];
            if let Some(next) = next.filter(|_| trigger != bottom) {
                parents[point.0].push((next, trigger));
            }

            let onward = next
                .map(|next| (next, encoding.licensees[next.0]))
                .filter(|(_, licensee)| *licensee != bottom);
            if let Some((next, licensee)) = onward {
                parents[point.0].push((next, licensee));
            }

            for (checker, link) in &encoding.checkers[point.0] {
                let Some(result) = schema.successor(*checker) else {
                    continue;
                };
                let stays_here = match onward {
                    Some((_, licensee)) => formula.and(&[*link, !licensee]),
                    None => *link,
                };
                parents[point.0].push((result, stays_here));
                stays.push((*checker, point, stays_here));
            }
        }

        Self { parents, stays }
    }

    /// Per point: the sites that may lie below it. Pins are only bounded
    /// from below; a spurious pin can only add order requirements.
    fn pins(&self, schema: &Schema, formula: &mut Formula) -> Vec<Vec<(SlotId, Lit)>> {
        let mut pins = vec![Vec::new(); schema.point_count()];

        for (slot, _) in schema.slots() {
            let leaf = schema.lexical_point(slot);
            let mut reached = BTreeMap::from([(leaf, formula.top())]);
            let mut queue = VecDeque::from([leaf]);

            while let Some(point) = queue.pop_front() {
                let Some(below) = reached.get(&point).copied() else {
                    continue;
                };
                for (parent, lit) in &self.parents[point.0] {
                    let above = *reached.entry(*parent).or_insert_with(|| {
                        queue.push_back(*parent);
                        formula.new_lit()
                    });
                    formula.implies(&[*lit, below], above);
                }
            }

            for (point, lit) in reached {
                pins[point.0].push((slot, lit));
            }
        }

        pins
    }
}

/// One variable per unordered pair of sites.
struct Order {
    slots: usize,
    lits: Vec<Lit>,
}

impl Order {
    fn new(schema: &Schema, formula: &mut Formula) -> Self {
        let slots = schema.slot_count();
        let mut lits = vec![formula.top(); slots * slots];
        for (first, second) in (0..slots).tuple_combinations() {
            lits[first * slots + second] = formula.new_lit();
        }
        Self { slots, lits }
    }

    /// `first` is pronounced before `second`.
    fn before(&self, first: SlotId, second: SlotId) -> Lit {
        if first < second {
            self.lits[first.0 * self.slots + second.0]
        } else {
            !self.lits[second.0 * self.slots + first.0]
        }
    }
}
