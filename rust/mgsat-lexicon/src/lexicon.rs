use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use indexmap::IndexMap;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use tracing::debug;

use crate::{Feature, ItemId, LexicalItem, LexiconError, Polarity};

/// One entry of a lexicon file, before validation.
///
/// Accepts either the bare feature list (a covert item without denotation)
/// or an object with `features`, `pf` and `denotation`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ItemSpec {
    /// Just the features, as in `"C": ["=V", "C"]`.
    Features(Vec<Feature>),
    /// Features with an optional phonological form and denotation.
    Entry {
        features: Vec<Feature>,
        #[serde(default, alias = "phonological_form")]
        pf: Option<String>,
        #[serde(default)]
        denotation: Option<String>,
    },
}

impl ItemSpec {
    fn into_item(self, label: String) -> Result<LexicalItem, LexiconError> {
        match self {
            ItemSpec::Features(features) => LexicalItem::new(label, features, None, None),
            ItemSpec::Entry {
                features,
                pf,
                denotation,
            } => LexicalItem::new(label, features, pf, denotation),
        }
    }
}

/// The unvalidated contents of a lexicon file, in declaration order.
///
/// Unlike a plain map this keeps repeated labels around so that validation
/// can report them instead of silently keeping the last one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LexiconSpec {
    entries: Vec<(String, ItemSpec)>,
}

impl LexiconSpec {
    /// No entries yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry; duplicates are kept and rejected on validation.
    pub fn push(&mut self, label: impl Into<String>, item: ItemSpec) {
        self.entries.push((label.into(), item));
    }

    /// Number of entries, duplicates included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'de> Deserialize<'de> for LexiconSpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = LexiconSpec;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map from lexical item label to item description")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut spec = LexiconSpec::new();
                while let Some((label, item)) = map.next_entry::<String, ItemSpec>()? {
                    spec.push(label, item);
                }
                Ok(spec)
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

/// An immutable, validated mapping from item label to [`LexicalItem`].
///
/// Items keep their declaration order, which is also the order of their
/// [`ItemId`]s.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Lexicon {
    items: IndexMap<String, LexicalItem>,
}

impl Lexicon {
    /// Validates a list of lexicon entries.
    pub fn load(spec: LexiconSpec) -> Result<Self, LexiconError> {
        Self::default().extend(spec)
    }

    /// Decodes and validates a lexicon object keyed by label.
    pub fn from_json(json: &str) -> Result<Self, LexiconError> {
        Self::load(serde_json::from_str(json)?)
    }

    /// Reads a lexicon file and validates it like [`Lexicon::from_json`].
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LexiconError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|error| LexiconError::Io {
            path: path.display().to_string(),
            reason: error.to_string(),
        })?;
        Self::from_json(&json)
    }

    /// Builds a lexicon from already constructed items.
    pub fn from_items(items: impl IntoIterator<Item = LexicalItem>) -> Result<Self, LexiconError> {
        let mut lexicon = Self::default();
        for item in items {
            lexicon.insert(item)?;
        }
        lexicon.validate_counterparts()?;
        Ok(lexicon)
    }

    /// Returns a new lexicon with `extra` items added. Extra items are
    /// validated together with the existing ones, so they may supply
    /// counterparts for each other's features but may not reuse a label.
    pub fn extend(&self, extra: LexiconSpec) -> Result<Self, LexiconError> {
        let mut lexicon = self.clone();
        for (label, spec) in extra.entries {
            lexicon.insert(spec.into_item(label)?)?;
        }
        lexicon.validate_counterparts()?;

        debug!(items = lexicon.len(), "Lexicon validated");
        Ok(lexicon)
    }

    fn insert(&mut self, item: LexicalItem) -> Result<(), LexiconError> {
        if self.items.contains_key(item.label()) {
            return Err(LexiconError::DuplicateLabel {
                label: item.label().to_string(),
            });
        }
        self.items.insert(item.label().to_string(), item);
        Ok(())
    }

    /// Every selector needs a selectee of the same name somewhere, and
    /// licensors and licensees must pair up by name.
    fn validate_counterparts(&self) -> Result<(), LexiconError> {
        let names = |polarity: Polarity| -> BTreeSet<&str> {
            self.items
                .values()
                .flat_map(LexicalItem::features)
                .filter(|feature| feature.polarity() == polarity)
                .map(Feature::name)
                .collect()
        };
        let selectees = names(Polarity::Selectee);
        let licensors = names(Polarity::Licensor);
        let licensees = names(Polarity::Licensee);

        for item in self.items.values() {
            for feature in item.features() {
                let known = match feature.polarity() {
                    Polarity::Selector => selectees.contains(feature.name()),
                    Polarity::Licensor => licensees.contains(feature.name()),
                    Polarity::Licensee => licensors.contains(feature.name()),
                    Polarity::Selectee | Polarity::Category => true,
                };
                if !known {
                    return Err(LexiconError::UnknownFeature {
                        label: item.label().to_string(),
                        feature: feature.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the lexicon has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Looks an item up by label.
    pub fn get(&self, label: &str) -> Option<(ItemId, &LexicalItem)> {
        self.items
            .get_full(label)
            .map(|(index, _, item)| (ItemId(index), item))
    }

    /// The item with index `id`.
    pub fn item(&self, id: ItemId) -> Option<&LexicalItem> {
        self.items.get_index(id.0).map(|(_, item)| item)
    }

    /// All items in declaration order.
    pub fn items(&self) -> impl Iterator<Item = (ItemId, &LexicalItem)> {
        self.items
            .values()
            .enumerate()
            .map(|(index, item)| (ItemId(index), item))
    }

    /// Items pronounced as `word`.
    pub fn pronounced(&self, word: &str) -> impl Iterator<Item = (ItemId, &LexicalItem)> {
        self.items()
            .filter(move |(_, item)| item.phonological_form() == Some(word))
    }

    /// Items without a phonological form.
    pub fn covert_items(&self) -> impl Iterator<Item = (ItemId, &LexicalItem)> {
        self.items().filter(|(_, item)| item.is_covert())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use testresult::TestResult;

    const LEXICON: &str = r#"{
        "John": { "features": ["~D", "-k"], "pf": "John", "denotation": "john" },
        "sleeps": { "features": [{"name": "D", "polarity": "selector"}, "~V"], "pf": "sleeps" },
        "v": ["<=V", "~v"],
        "T": ["=v", "+k", "~T"],
        "C": ["=T", "C_declarative"]
    }"#;

    #[test]
    fn it_loads_items_in_declaration_order() -> TestResult {
        let lexicon = Lexicon::from_json(LEXICON)?;

        let labels: Vec<_> = lexicon.items().map(|(_, item)| item.label()).collect();
        assert_eq!(labels, vec!["John", "sleeps", "v", "T", "C"]);

        let (id, john) = lexicon.get("John").ok_or("John is missing")?;
        assert_eq!(id, ItemId(0));
        assert_eq!(john.denotation(), Some("john"));
        assert_eq!(lexicon.item(id), Some(john));

        let covert: Vec<_> = lexicon.covert_items().map(|(_, item)| item.label()).collect();
        assert_eq!(covert, vec!["v", "T", "C"]);
        assert_eq!(lexicon.pronounced("sleeps").count(), 1);
        assert_eq!(lexicon.pronounced("snores").count(), 0);
        Ok(())
    }

    #[test]
    fn it_rejects_duplicate_labels() {
        let result = Lexicon::from_json(
            r#"{ "John": { "features": ["~D"], "pf": "John" },
                 "John": { "features": ["~D"], "pf": "Johnny" } }"#,
        );
        assert_eq!(
            result,
            Err(LexiconError::DuplicateLabel {
                label: "John".into()
            })
        );
    }

    #[test]
    fn it_rejects_features_without_counterparts() {
        let result = Lexicon::from_json(r#"{ "sees": { "features": ["=D", "~V"], "pf": "sees" } }"#);
        assert_eq!(
            result,
            Err(LexiconError::UnknownFeature {
                label: "sees".into(),
                feature: "=D".into()
            })
        );

        let result = Lexicon::from_json(r#"{ "who": { "features": ["~D", "-wh"], "pf": "who" } }"#);
        assert!(matches!(result, Err(LexiconError::UnknownFeature { .. })));
    }

    #[test]
    fn it_validates_extra_items_with_the_base_lexicon() -> TestResult {
        let lexicon = Lexicon::from_json(LEXICON)?;

        let extra: LexiconSpec =
            serde_json::from_str(r#"{ "Mary": { "features": ["~D", "-k"], "pf": "Mary" } }"#)?;
        let extended = lexicon.extend(extra)?;
        assert_eq!(extended.len(), lexicon.len() + 1);

        let clash: LexiconSpec = serde_json::from_str(r#"{ "John": ["~D"] }"#)?;
        assert!(matches!(
            lexicon.extend(clash),
            Err(LexiconError::DuplicateLabel { .. })
        ));

        let dangling: LexiconSpec = serde_json::from_str(r#"{ "Q": ["=Q", "~D"] }"#)?;
        assert!(matches!(
            lexicon.extend(dangling),
            Err(LexiconError::UnknownFeature { .. })
        ));
        Ok(())
    }

    #[test]
    fn it_reports_malformed_json() {
        assert!(matches!(
            Lexicon::from_json(r#"{ "John": { "features": ["~D"], "pf": 7 } }"#),
            Err(LexiconError::Decode(_))
        ));
    }
}
