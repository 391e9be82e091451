use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigurationError;

/// A grammatical relation between a predicate and one of its arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Introduced by the head that selects the predicate's projection, in
    /// that head's specifier.
    Subj,
    /// Merged by the predicate's first selector.
    Obj,
    /// Merged by the predicate's second selector.
    Iobj,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Subj => write!(f, "subj"),
            Self::Obj => write!(f, "obj"),
            Self::Iobj => write!(f, "iobj"),
        }
    }
}

/// The words spanned by an argument, written either as a list or as one
/// whitespace-separated string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "PhraseRepr", into = "Vec<String>")]
pub struct Phrase(Vec<String>);

#[derive(Deserialize)]
#[serde(untagged)]
enum PhraseRepr {
    Text(String),
    Words(Vec<String>),
}

impl From<PhraseRepr> for Phrase {
    fn from(repr: PhraseRepr) -> Self {
        match repr {
            PhraseRepr::Text(text) => Phrase::from(text.as_str()),
            PhraseRepr::Words(words) => Phrase(words),
        }
    }
}

impl From<Phrase> for Vec<String> {
    fn from(phrase: Phrase) -> Self {
        phrase.0
    }
}

impl From<&str> for Phrase {
    fn from(text: &str) -> Self {
        Phrase(text.split_whitespace().map(String::from).collect())
    }
}

impl Phrase {
    /// The words of the phrase.
    pub fn words(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for Phrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(" "))
    }
}

/// One predicate-argument requirement of an LF target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "relation", rename_all = "snake_case")]
pub enum Relation {
    /// `pred` assigns `role` to the phrase `arg`.
    Theta {
        pred: String,
        role: Role,
        arg: Phrase,
    },
    /// Some feature of `pred` is checked against the phrase `arg`.
    Agree { pred: String, arg: Phrase },
}

impl Relation {
    /// A theta relation.
    pub fn theta(pred: impl Into<String>, role: Role, arg: impl Into<Phrase>) -> Self {
        Relation::Theta {
            pred: pred.into(),
            role,
            arg: arg.into(),
        }
    }

    /// An agree relation.
    pub fn agree(pred: impl Into<String>, arg: impl Into<Phrase>) -> Self {
        Relation::Agree {
            pred: pred.into(),
            arg: arg.into(),
        }
    }

    /// The predicate word.
    pub fn predicate(&self) -> &str {
        match self {
            Relation::Theta { pred, .. } | Relation::Agree { pred, .. } => pred,
        }
    }

    /// The argument phrase.
    pub fn argument(&self) -> &Phrase {
        match self {
            Relation::Theta { arg, .. } | Relation::Agree { arg, .. } => arg,
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relation::Theta { pred, role, arg } => write!(f, "{pred}({role}: {arg})"),
            Relation::Agree { pred, arg } => write!(f, "{pred}(agree: {arg})"),
        }
    }
}

/// The logical-form side of an interface condition: the sentence type and
/// the predicate-argument structure a derivation must realize.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LfTarget {
    /// Category feature required at the root, e.g. `C_declarative`.
    pub root: Option<String>,
    /// Relations the derivation must realize.
    pub relations: Vec<Relation>,
    /// Required category of individual words.
    pub categories: BTreeMap<String, String>,
    /// The words to parse when there is no PF target.
    pub words: Option<Vec<String>>,
}

impl LfTarget {
    /// An empty target.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requires the root category `category`.
    pub fn with_root(mut self, category: impl Into<String>) -> Self {
        self.root = Some(category.into());
        self
    }

    /// Adds a relation.
    pub fn with_relation(mut self, relation: Relation) -> Self {
        self.relations.push(relation);
        self
    }

    /// Requires `word` to have category `category`.
    pub fn with_category(mut self, word: impl Into<String>, category: impl Into<String>) -> Self {
        self.categories.insert(word.into(), category.into());
        self
    }

    /// Sets the words to parse.
    pub fn with_words<S: Into<String>>(mut self, words: impl IntoIterator<Item = S>) -> Self {
        self.words = Some(words.into_iter().map(Into::into).collect());
        self
    }
}

/// What a derivation must realize: a target sentence, a target logical
/// form, or both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceCondition {
    /// The sentence, word by word.
    #[serde(default, alias = "PF", skip_serializing_if = "Option::is_none")]
    pub pf: Option<Vec<String>>,
    /// The logical form.
    #[serde(default, alias = "LF", skip_serializing_if = "Option::is_none")]
    pub lf: Option<LfTarget>,
}

impl InterfaceCondition {
    /// A PF-only condition.
    pub fn sentence<S: Into<String>>(words: impl IntoIterator<Item = S>) -> Self {
        Self {
            pf: Some(words.into_iter().map(Into::into).collect()),
            lf: None,
        }
    }

    /// An LF-only condition.
    pub fn logical_form(lf: LfTarget) -> Self {
        Self { pf: None, lf: Some(lf) }
    }

    /// Adds an LF target.
    pub fn with_lf(mut self, lf: LfTarget) -> Self {
        self.lf = Some(lf);
        self
    }

    /// The words a derivation is built from: the PF target, or the LF
    /// target's word list when there is no PF target.
    pub fn numeration(&self) -> Result<Vec<String>, ConfigurationError> {
        let lf_words = self.lf.as_ref().and_then(|lf| lf.words.clone());

        let words = match (&self.pf, lf_words) {
            (None, None) if self.lf.is_none() => {
                return Err(ConfigurationError::EmptyInterfaceCondition);
            }
            (None, None) => return Err(ConfigurationError::EmptyNumeration),
            (Some(pf), None) => pf.clone(),
            (None, Some(lf)) => lf,
            (Some(pf), Some(lf)) => {
                let mut sorted_pf = pf.clone();
                let mut sorted_lf = lf.clone();
                sorted_pf.sort();
                sorted_lf.sort();
                if sorted_pf != sorted_lf {
                    return Err(ConfigurationError::NumerationMismatch {
                        pf: pf.clone(),
                        lf,
                    });
                }
                pf.clone()
            }
        };

        if words.is_empty() {
            return Err(ConfigurationError::EmptyNumeration);
        }
        Ok(words)
    }
}

/// A corpus file: interface conditions to parse in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Corpus {
    /// The conditions, in order.
    pub input_sequence: Vec<InterfaceCondition>,
}

impl Corpus {
    /// Decodes a corpus.
    pub fn from_json(json: &str) -> Result<Self, ConfigurationError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and decodes a corpus file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|error| ConfigurationError::Io {
            path: path.display().to_string(),
            reason: error.to_string(),
        })?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use testresult::TestResult;

    #[test]
    fn it_decodes_a_corpus() -> TestResult {
        let corpus = Corpus::from_json(
            r#"{ "input_sequence": [
                { "pf": ["John", "sleeps"],
                  "lf": { "root": "C_declarative",
                          "relations": [ { "relation": "theta", "pred": "sleeps",
                                           "role": "subj", "arg": "John" } ] } },
                { "LF": { "words": ["John", "sleeps"],
                          "relations": [ { "relation": "agree", "pred": "sleeps",
                                           "arg": ["John"] } ] } }
            ] }"#,
        )?;

        assert_eq!(corpus.input_sequence.len(), 2);
        let first = &corpus.input_sequence[0];
        assert_eq!(first.numeration()?, vec!["John", "sleeps"]);
        assert_eq!(
            first.lf.as_ref().map(|lf| lf.relations.clone()),
            Some(vec![Relation::theta("sleeps", Role::Subj, "John")])
        );

        let second = &corpus.input_sequence[1];
        assert_eq!(second.pf, None);
        assert_eq!(second.numeration()?, vec!["John", "sleeps"]);
        Ok(())
    }

    #[test]
    fn it_splits_phrases_on_whitespace() {
        let relation = Relation::theta("fears", Role::Obj, "everyone who knows her");
        assert_eq!(relation.argument().words().len(), 4);
        assert_eq!(relation.to_string(), "fears(obj: everyone who knows her)");
    }

    #[test]
    fn it_requires_some_words() {
        assert_eq!(
            InterfaceCondition::default().numeration(),
            Err(ConfigurationError::EmptyInterfaceCondition)
        );
        assert_eq!(
            InterfaceCondition::logical_form(LfTarget::new().with_root("C")).numeration(),
            Err(ConfigurationError::EmptyNumeration)
        );
        assert!(matches!(
            InterfaceCondition::sentence(["John", "sleeps"])
                .with_lf(LfTarget::new().with_words(["Mary", "sleeps"]))
                .numeration(),
            Err(ConfigurationError::NumerationMismatch { .. })
        ));
    }
}
