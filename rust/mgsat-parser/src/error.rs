//! Error types for parsing.
//!
//! Unsatisfiability and timeouts are not errors; see [`crate::Solution`].

use mgsat_lexicon::LexiconError;
use mgsat_solver::SolverError;
use thiserror::Error;

/// The interface condition provably cannot be hosted within the bounds.
/// Raising the bounds and retrying may help.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoundExceededError {
    /// The root category is only available from covert items beyond the bound.
    #[error(
        "a complete derivation needs at least {required} empty lexical item(s) but max_num_empty_lexical_items is {available}"
    )]
    EmptyLexicalItems { required: usize, available: usize },
}

/// Invalid options or an interface condition the engine cannot use.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// Both interfaces are switched off or have nothing to constrain.
    #[error("no interface constraints remain: PF and LF are disabled or have no target")]
    NoInterfaceConstraints,

    /// Neither `pf` nor `lf` is given.
    #[error("interface condition has neither a PF nor an LF target")]
    EmptyInterfaceCondition,

    /// There are no words to build from.
    #[error("interface condition has no words to parse")]
    EmptyNumeration,

    /// The PF and LF word lists are not the same multiset.
    #[error("LF words {lf:?} do not match the PF target {pf:?}")]
    NumerationMismatch { pf: Vec<String>, lf: Vec<String> },

    /// An LF anchor that is not a word of the sentence.
    #[error("LF target mentions '{word}', which is not in the sentence")]
    UnknownAnchor { word: String },

    /// An LF anchor that occurs more than once.
    #[error("LF target mentions '{word}', which occurs {count} times in the sentence")]
    AmbiguousAnchor { word: String, count: usize },

    /// All parses were requested with `max_parses` of zero.
    #[error("max_parses must be positive when extracting all parses")]
    ZeroParseLimit,

    /// Options or corpus JSON that does not decode.
    #[error("configuration could not be decoded: {0}")]
    Decode(String),

    /// A file that could not be read.
    #[error("could not read '{path}': {reason}")]
    Io { path: String, reason: String },
}

impl From<serde_json::Error> for ConfigurationError {
    fn from(error: serde_json::Error) -> Self {
        ConfigurationError::Decode(error.to_string())
    }
}

/// A model that violates an invariant the constraints should guarantee.
/// This always points at a defect in the schema or the assembler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InconsistentModelError {
    /// A slot filled by more than one item, or an overt slot left empty.
    #[error("slot {slot} has {count} lexical choices")]
    SlotChoice { slot: usize, count: usize },

    /// A feature checked other than exactly once.
    #[error("feature {feature} of '{label}' is checked {count} times")]
    CheckCount {
        label: String,
        feature: String,
        count: usize,
    },

    /// Two features checked against each other that do not match.
    #[error("'{trigger}' cannot check '{target}'")]
    Incompatible { trigger: String, target: String },

    /// Not exactly one root.
    #[error("derivation has {count} roots")]
    RootCount { count: usize },

    /// A used point with no path to the root.
    #[error("a point of '{label}' is not connected to the root")]
    Disconnected { label: String },

    /// A slot in the tree that no item fills.
    #[error("'{label}' is part of the derivation but has no place in its layout")]
    Unplaced { label: String },

    /// A mover that is not below its licensor.
    #[error("movement of '{label}' is not licensed from above its previous position")]
    UnlicensedMovement { label: String },

    /// Head movement without a head-attracting selector.
    #[error("head movement into '{label}' is not well formed")]
    HeadMovement { label: String },

    /// A bound the model exceeds.
    #[error("{bound} is {limit} but the derivation uses {used}")]
    BoundViolated {
        bound: &'static str,
        limit: usize,
        used: usize,
    },

    /// A yield that differs from the PF target.
    #[error("derivation pronounces {found:?} instead of {expected:?}")]
    Linearization {
        expected: Vec<String>,
        found: Vec<String>,
    },

    /// An LF requirement the derivation does not meet.
    #[error("derivation does not satisfy the LF target: {requirement}")]
    LogicalForm { requirement: String },
}

/// Everything that can go wrong while parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The lexicon or its extra items are invalid.
    #[error(transparent)]
    Lexicon(#[from] LexiconError),

    /// The bounds cannot host the condition.
    #[error(transparent)]
    BoundExceeded(#[from] BoundExceededError),

    /// Options or the interface condition are invalid.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// The solver failed.
    #[error(transparent)]
    Solver(#[from] SolverError),

    /// The model contradicts the encoding.
    #[error(transparent)]
    InconsistentModel(#[from] InconsistentModelError),
}
