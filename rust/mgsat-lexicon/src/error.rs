//! Error types for lexicon loading and validation.

use thiserror::Error;

/// Reasons a lexicon is rejected. All of them are detected before any
/// parsing work begins.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexiconError {
    /// The JSON is not a lexicon.
    #[error("lexicon could not be decoded: {0}")]
    Decode(String),

    /// The lexicon file could not be read.
    #[error("lexicon could not be read from '{path}': {reason}")]
    Io { path: String, reason: String },

    /// Two entries share a label.
    #[error("lexical item '{label}' is declared more than once")]
    DuplicateLabel { label: String },

    /// An item without any feature.
    #[error("lexical item '{label}' has no features")]
    EmptyFeatures { label: String },

    /// Features out of the `(selector | licensor)* (selectee licensee* | category)` shape.
    #[error("lexical item '{label}' has a malformed feature sequence: {reason}")]
    MalformedSequence { label: String, reason: String },

    /// An overt item pronounced as the empty string.
    #[error("lexical item '{label}' has an empty phonological form")]
    EmptyPhonologicalForm { label: String },

    /// A feature in compact notation that does not parse.
    #[error("feature '{feature}' is not a valid feature descriptor")]
    InvalidFeature { feature: String },

    /// A selector, licensor or licensee no item could ever check.
    #[error("feature '{feature}' of lexical item '{label}' has no counterpart in the lexicon")]
    UnknownFeature { label: String, feature: String },

    /// A word of the sentence with no item pronounced that way.
    #[error("no lexical item is pronounced '{word}'")]
    UnknownWord { word: String },
}

impl From<serde_json::Error> for LexiconError {
    fn from(error: serde_json::Error) -> Self {
        LexiconError::Decode(error.to_string())
    }
}
