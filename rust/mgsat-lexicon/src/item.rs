use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Feature, LexiconError, Polarity};

/// Index of a [`LexicalItem`] within its [`crate::Lexicon`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub usize);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A validated lexical item.
///
/// Items are immutable once loaded. A derivation uses *instances* of them:
/// the same covert item may appear several times, or not at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LexicalItem {
    label: String,
    features: Vec<Feature>,
    #[serde(rename = "pf", skip_serializing_if = "Option::is_none")]
    phonological_form: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    denotation: Option<String>,
}

impl LexicalItem {
    /// Builds an item and validates its feature sequence.
    pub fn new(
        label: impl Into<String>,
        features: Vec<Feature>,
        phonological_form: Option<String>,
        denotation: Option<String>,
    ) -> Result<Self, LexiconError> {
        let label = label.into();

        if let Some(form) = &phonological_form {
            if form.trim().is_empty() {
                return Err(LexiconError::EmptyPhonologicalForm { label });
            }
        }
        validate_sequence(&label, &features)?;

        Ok(Self {
            label,
            features,
            phonological_form,
            denotation,
        })
    }

    /// Convenience constructor from compact feature notation, e.g.
    /// `LexicalItem::parse("John", "~D -k", Some("John"))`.
    pub fn parse(
        label: impl Into<String>,
        features: &str,
        phonological_form: Option<&str>,
    ) -> Result<Self, LexiconError> {
        let features = features
            .split_whitespace()
            .map(str::parse)
            .collect::<Result<Vec<Feature>, _>>()?;
        Self::new(label, features, phonological_form.map(String::from), None)
    }

    /// Attaches a semantic denotation.
    pub fn with_denotation(mut self, denotation: impl Into<String>) -> Self {
        self.denotation = Some(denotation.into());
        self
    }

    /// The label the item is stored under.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The feature sequence, checked left to right.
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// Feature `index`, if the item has that many.
    pub fn feature(&self, index: usize) -> Option<&Feature> {
        self.features.get(index)
    }

    /// `None` for covert items.
    pub fn phonological_form(&self) -> Option<&str> {
        self.phonological_form.as_deref()
    }

    /// The semantic constant, when the lexicon gives one.
    pub fn denotation(&self) -> Option<&str> {
        self.denotation.as_deref()
    }

    /// Whether the item is silent.
    pub fn is_covert(&self) -> bool {
        self.phonological_form.is_none()
    }

    /// Index of the selectee or category feature. Every validated item has
    /// exactly one.
    pub fn category_index(&self) -> usize {
        self.features
            .iter()
            .position(|feature| {
                matches!(
                    feature.polarity(),
                    Polarity::Selectee | Polarity::Category
                )
            })
            .unwrap_or(0)
    }

    /// Name of the item's category (selectee or clause category).
    pub fn category(&self) -> &str {
        self.features
            .get(self.category_index())
            .map(Feature::name)
            .unwrap_or_default()
    }

    /// Whether the item can head the root of a complete derivation.
    pub fn completes_clause(&self) -> bool {
        self.features
            .last()
            .is_some_and(|feature| feature.polarity() == Polarity::Category)
    }

    /// Number of movements a phrase headed by this item undergoes.
    pub fn licensee_count(&self) -> usize {
        self.features
            .iter()
            .filter(|feature| feature.polarity() == Polarity::Licensee)
            .count()
    }

    /// Whether the item's first selector incorporates its complement's head.
    pub fn attracts_head(&self) -> bool {
        self.features.first().is_some_and(Feature::moves_head)
    }
}

impl fmt::Display for LexicalItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ::", self.phonological_form.as_deref().unwrap_or("ε"))?;
        for feature in &self.features {
            write!(f, " {feature}")?;
        }
        Ok(())
    }
}

/// Where we are while walking a feature sequence.
#[derive(Clone, Copy, PartialEq)]
enum Stage {
    Triggers,
    Licensees,
    Complete,
}

fn validate_sequence(label: &str, features: &[Feature]) -> Result<(), LexiconError> {
    let malformed = |reason: &str| LexiconError::MalformedSequence {
        label: label.to_string(),
        reason: reason.to_string(),
    };

    if features.is_empty() {
        return Err(LexiconError::EmptyFeatures {
            label: label.to_string(),
        });
    }

    let mut stage = Stage::Triggers;
    for (index, feature) in features.iter().enumerate() {
        if feature.moves_head() && (index > 0 || feature.polarity() != Polarity::Selector) {
            return Err(malformed(
                "only a selector in first position may attract a head",
            ));
        }

        stage = match (stage, feature.polarity()) {
            (Stage::Triggers, Polarity::Licensor) if index == 0 => {
                return Err(malformed("an item cannot begin with a licensor"));
            }
            (Stage::Triggers, Polarity::Selector | Polarity::Licensor) => Stage::Triggers,
            (Stage::Triggers, Polarity::Selectee) => Stage::Licensees,
            (Stage::Triggers, Polarity::Category) => Stage::Complete,
            (Stage::Triggers, Polarity::Licensee) => {
                return Err(malformed("a licensee must follow the selectee"));
            }
            (Stage::Licensees, Polarity::Licensee) => Stage::Licensees,
            (Stage::Licensees, _) => {
                return Err(malformed("only licensees may follow the selectee"));
            }
            (Stage::Complete, _) => {
                return Err(malformed("nothing may follow a category feature"));
            }
        };
    }

    if stage == Stage::Triggers {
        return Err(malformed("missing a selectee or category feature"));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reason(result: Result<LexicalItem, LexiconError>) -> String {
        match result {
            Err(LexiconError::MalformedSequence { reason, .. }) => reason,
            other => panic!("expected a malformed sequence, got {other:?}"),
        }
    }

    #[test]
    fn it_accepts_well_formed_sequences() {
        for features in ["~D", "~D -k -wh", "=D ~V", "<=V =D ~v", "=v +k ~T", "=T C", "D"] {
            assert!(
                LexicalItem::parse("item", features, None).is_ok(),
                "{features} should be accepted"
            );
        }
    }

    #[test]
    fn it_rejects_malformed_sequences() {
        assert!(reason(LexicalItem::parse("x", "+k ~T", None)).contains("licensor"));
        assert!(reason(LexicalItem::parse("x", "-k ~D", None)).contains("licensee"));
        assert!(reason(LexicalItem::parse("x", "~D =D", None)).contains("follow"));
        assert!(reason(LexicalItem::parse("x", "=T C -k", None)).contains("category"));
        assert!(reason(LexicalItem::parse("x", "=D =D", None)).contains("missing"));
        assert!(reason(LexicalItem::parse("x", "=D <=V ~v", None)).contains("attract"));
    }

    #[test]
    fn it_rejects_empty_items() {
        assert!(matches!(
            LexicalItem::parse("x", "", None),
            Err(LexiconError::EmptyFeatures { .. })
        ));
        assert!(matches!(
            LexicalItem::parse("x", "~D", Some("  ")),
            Err(LexiconError::EmptyPhonologicalForm { .. })
        ));
    }

    #[test]
    fn it_reports_category_and_movements() {
        let who = LexicalItem::parse("who", "~D -k -wh", Some("who")).unwrap();
        assert_eq!(who.category(), "D");
        assert_eq!(who.category_index(), 0);
        assert_eq!(who.licensee_count(), 2);
        assert!(!who.completes_clause());
        assert!(!who.is_covert());

        let complementizer = LexicalItem::parse("C", "=T C_declarative", None).unwrap();
        assert_eq!(complementizer.category(), "C_declarative");
        assert!(complementizer.completes_clause());
        assert!(complementizer.is_covert());
        assert_eq!(complementizer.to_string(), "ε :: =T C_declarative");

        let light_verb = LexicalItem::parse("v", "<=V =D ~v", None).unwrap();
        assert!(light_verb.attracts_head());
        assert_eq!(light_verb.category_index(), 2);
    }
}
