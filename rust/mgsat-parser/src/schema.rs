use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use mgsat_lexicon::{Feature, ItemId, LexicalItem, Lexicon, LexiconError};
use tracing::debug;

use crate::{BoundExceededError, Bounds, ParseError};

/// Index of a slot in a [`Schema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotId(pub usize);

/// Index of a feature point in a [`Schema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointId(pub usize);

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// What a slot may host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    /// Hosts the word at `position` of the numeration.
    Overt { position: usize },
    /// Hosts a covert item, or nothing.
    Covert,
}

/// A position for one lexical item instance.
#[derive(Debug, Clone)]
pub struct Slot {
    kind: SlotKind,
    candidates: Vec<(ItemId, LexicalItem)>,
    points: Range<usize>,
}

impl Slot {
    /// Overt or covert.
    pub fn kind(&self) -> SlotKind {
        self.kind
    }

    /// Whether the slot hosts a covert item.
    pub fn is_covert(&self) -> bool {
        self.kind == SlotKind::Covert
    }

    /// Numeration position of an overt slot.
    pub fn position(&self) -> Option<usize> {
        match self.kind {
            SlotKind::Overt { position } => Some(position),
            SlotKind::Covert => None,
        }
    }

    /// The items that may fill this slot.
    pub fn candidates(&self) -> &[(ItemId, LexicalItem)] {
        &self.candidates
    }

    /// The candidate with id `id`.
    pub fn candidate(&self, id: ItemId) -> Option<&LexicalItem> {
        self.candidates
            .iter()
            .find(|(candidate, _)| *candidate == id)
            .map(|(_, item)| item)
    }

    /// The slot's feature points.
    pub fn points(&self) -> impl Iterator<Item = PointId> + use<> {
        self.points.clone().map(PointId)
    }

    /// Number of feature points.
    pub fn width(&self) -> usize {
        self.points.len()
    }
}

/// Feature position `index` of the item in `slot`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    /// The owning slot.
    pub slot: SlotId,
    /// Feature position within the slot.
    pub index: usize,
}

impl Point {
    /// The point hosting the lexical item itself.
    pub fn is_lexical(&self) -> bool {
        self.index == 0
    }
}

/// The finite search space of a parse.
///
/// Overt slots come first, in numeration order, followed by the covert
/// slots. Each slot owns one point per feature of its longest candidate;
/// points of a slot are contiguous. Everything the assembler creates
/// variables for is indexed by slots and points, so the size of the formula
/// is fixed here.
#[derive(Debug, Clone)]
pub struct Schema {
    lexicon: Arc<Lexicon>,
    numeration: Vec<String>,
    bounds: Bounds,
    slots: Vec<Slot>,
    points: Vec<Point>,
}

impl Schema {
    /// Lays out overt slots for `numeration` and `max_num_empty_lexical_items`
    /// covert slots. Fails only when no complete derivation fits the bounds.
    pub fn build(
        lexicon: Arc<Lexicon>,
        numeration: Vec<String>,
        bounds: Bounds,
    ) -> Result<Self, ParseError> {
        let mut slots = Vec::new();

        for (position, word) in numeration.iter().enumerate() {
            let candidates: Vec<_> = lexicon
                .pronounced(word)
                .map(|(id, item)| (id, item.clone()))
                .collect();
            if candidates.is_empty() {
                return Err(LexiconError::UnknownWord { word: word.clone() }.into());
            }
            slots.push((SlotKind::Overt { position }, candidates));
        }

        let covert: Vec<_> = lexicon
            .covert_items()
            .map(|(id, item)| (id, item.clone()))
            .collect();

        let overt_root = slots
            .iter()
            .flat_map(|(_, candidates)| candidates)
            .any(|(_, item)| item.completes_clause());
        let covert_root = covert.iter().any(|(_, item)| item.completes_clause());
        if !overt_root && covert_root && bounds.max_num_empty_lexical_items == 0 {
            return Err(BoundExceededError::EmptyLexicalItems {
                required: 1,
                available: 0,
            }
            .into());
        }

        if !covert.is_empty() {
            for _ in 0..bounds.max_num_empty_lexical_items {
                slots.push((SlotKind::Covert, covert.clone()));
            }
        }

        let required: usize = slots
            .iter()
            .map(|(_, candidates)| widest(candidates))
            .sum();
        let mut schema = Schema {
            lexicon,
            numeration,
            bounds,
            slots: Vec::with_capacity(slots.len()),
            points: Vec::with_capacity(required),
        };
        for (kind, candidates) in slots {
            let slot = SlotId(schema.slots.len());
            let start = schema.points.len();
            for index in 0..widest(&candidates) {
                schema.points.push(Point { slot, index });
            }
            schema.slots.push(Slot {
                kind,
                candidates,
                points: start..schema.points.len(),
            });
        }

        debug!(
            words = schema.numeration.len(),
            slots = schema.slots.len(),
            points = schema.points.len(),
            "Schema built"
        );
        Ok(schema)
    }

    /// The lexicon candidates come from.
    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    /// The words being parsed.
    pub fn numeration(&self) -> &[String] {
        &self.numeration
    }

    /// The bounds the schema was built for.
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// All slots, overt first.
    pub fn slots(&self) -> impl Iterator<Item = (SlotId, &Slot)> {
        self.slots
            .iter()
            .enumerate()
            .map(|(index, slot)| (SlotId(index), slot))
    }

    /// The slot `id`.
    pub fn slot(&self, id: SlotId) -> &Slot {
        &self.slots[id.0]
    }

    /// Overt and covert slots together.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// The slot hosting the word at numeration `position`.
    pub fn overt_slot(&self, position: usize) -> Option<SlotId> {
        (position < self.numeration.len()).then_some(SlotId(position))
    }

    /// The covert slots in order.
    pub fn covert_slots(&self) -> impl Iterator<Item = SlotId> + use<> {
        (self.numeration.len()..self.slots.len()).map(SlotId)
    }

    /// All points.
    pub fn points(&self) -> impl Iterator<Item = (PointId, Point)> + '_ {
        self.points
            .iter()
            .enumerate()
            .map(|(index, point)| (PointId(index), *point))
    }

    /// The point `id`.
    pub fn point(&self, id: PointId) -> Point {
        self.points[id.0]
    }

    /// Number of points over all slots.
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Point `index` of `slot`, if the slot is that wide.
    pub fn point_at(&self, slot: SlotId, index: usize) -> Option<PointId> {
        let points = &self.slots[slot.0].points;
        (index < points.len()).then_some(PointId(points.start + index))
    }

    /// The first point of `slot`.
    pub fn lexical_point(&self, slot: SlotId) -> PointId {
        PointId(self.slots[slot.0].points.start)
    }

    /// The next feature position of the same slot.
    pub fn successor(&self, point: PointId) -> Option<PointId> {
        let Point { slot, index } = self.point(point);
        self.point_at(slot, index + 1)
    }

    /// The previous feature position of the same slot.
    pub fn predecessor(&self, point: PointId) -> Option<PointId> {
        let Point { slot, index } = self.point(point);
        index.checked_sub(1).and_then(|index| self.point_at(slot, index))
    }

    /// The features candidates of the point's slot carry at its position.
    pub fn features_at(&self, point: PointId) -> impl Iterator<Item = (ItemId, &Feature)> {
        let Point { slot, index } = self.point(point);
        self.slots[slot.0]
            .candidates
            .iter()
            .filter_map(move |(id, item)| item.feature(index).map(|feature| (*id, feature)))
    }

    /// A readable name for diagnostics: the word, or `ε` with the slot.
    pub fn describe(&self, slot: SlotId) -> String {
        match self.slots[slot.0].kind {
            SlotKind::Overt { position } => self.numeration[position].clone(),
            SlotKind::Covert => format!("ε{}", slot.0),
        }
    }
}

fn widest(candidates: &[(ItemId, LexicalItem)]) -> usize {
    candidates
        .iter()
        .map(|(_, item)| item.features().len())
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use testresult::TestResult;

    fn lexicon() -> Arc<Lexicon> {
        let items = [
            LexicalItem::parse("John", "~D -k", Some("John")),
            LexicalItem::parse("sleeps", "=D ~V", Some("sleeps")),
            LexicalItem::parse("v", "<=V ~v", None),
            LexicalItem::parse("T", "=v +k ~T", None),
            LexicalItem::parse("C", "=T C", None),
        ];
        Arc::new(Lexicon::from_items(items.into_iter().map(Result::unwrap)).unwrap())
    }

    fn words(words: &[&str]) -> Vec<String> {
        words.iter().map(|word| word.to_string()).collect()
    }

    #[test]
    fn it_lays_out_overt_then_covert_slots() -> TestResult {
        let schema = Schema::build(lexicon(), words(&["John", "sleeps"]), Bounds::new(3, 1, 1))?;

        assert_eq!(schema.slot_count(), 5);
        assert_eq!(schema.slot(SlotId(0)).position(), Some(0));
        assert_eq!(schema.slot(SlotId(1)).position(), Some(1));
        assert_eq!(schema.covert_slots().collect::<Vec<_>>(), vec![SlotId(2), SlotId(3), SlotId(4)]);

        // John and sleeps have two features, the covert slots three.
        assert_eq!(schema.point_count(), 2 + 2 + 3 * 3);
        assert_eq!(schema.slot(SlotId(2)).candidates().len(), 3);

        let john = schema.lexical_point(SlotId(0));
        let landing = schema.successor(john).ok_or("John has a second point")?;
        assert_eq!(schema.point(landing), Point { slot: SlotId(0), index: 1 });
        assert_eq!(schema.successor(landing), None);
        assert_eq!(schema.predecessor(landing), Some(john));

        let features: Vec<String> = schema
            .features_at(landing)
            .map(|(_, feature)| feature.to_string())
            .collect();
        assert_eq!(features, vec!["-k"]);
        Ok(())
    }

    #[test]
    fn it_rejects_unknown_words() {
        let result = Schema::build(lexicon(), words(&["Mary", "sleeps"]), Bounds::default());
        assert_eq!(
            result.err(),
            Some(ParseError::Lexicon(LexiconError::UnknownWord {
                word: "Mary".into()
            }))
        );
    }

    #[test]
    fn it_fails_fast_without_room_for_the_root() {
        let result = Schema::build(lexicon(), words(&["John", "sleeps"]), Bounds::new(0, 1, 1));
        assert_eq!(
            result.err(),
            Some(ParseError::BoundExceeded(BoundExceededError::EmptyLexicalItems {
                required: 1,
                available: 0
            }))
        );
    }

    #[test]
    fn it_grows_with_the_empty_item_bound() -> TestResult {
        let small = Schema::build(lexicon(), words(&["John", "sleeps"]), Bounds::new(6, 1, 1))?;
        let large = Schema::build(lexicon(), words(&["John", "sleeps"]), Bounds::new(90, 1, 1))?;

        assert_eq!(large.slot_count() - small.slot_count(), 84);
        assert_eq!(large.point_count(), 2 + 2 + 90 * 3);
        Ok(())
    }
}
