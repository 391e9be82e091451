use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ConfigurationError;

/// The three numbers that fix the size of the search space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Bounds {
    /// Covert slots available for empty lexical items.
    pub max_num_empty_lexical_items: usize,
    /// Licensee features that may be checked by movement.
    pub max_num_movements: usize,
    /// Head-attracting selectors that may be used.
    pub max_num_head_movements: usize,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            max_num_empty_lexical_items: 4,
            max_num_movements: 4,
            max_num_head_movements: 2,
        }
    }
}

impl Bounds {
    /// Bounds on empty items, movements and head movements.
    pub fn new(
        max_num_empty_lexical_items: usize,
        max_num_movements: usize,
        max_num_head_movements: usize,
    ) -> Self {
        Self {
            max_num_empty_lexical_items,
            max_num_movements,
            max_num_head_movements,
        }
    }

    /// Pointwise `self ≥ other`. Anything derivable within `other` is
    /// derivable within `self`.
    pub fn dominates(&self, other: &Bounds) -> bool {
        self.max_num_empty_lexical_items >= other.max_num_empty_lexical_items
            && self.max_num_movements >= other.max_num_movements
            && self.max_num_head_movements >= other.max_num_head_movements
    }
}

/// Which locality predicate constrains movement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum LocalityConfig {
    /// A licensor attracts the closest phrase bearing the matching licensee.
    #[default]
    ShortestMove,
    /// Shortest move, and a phrase may leave the maximal projection of a
    /// phase head only from that head's specifier (its edge).
    PhaseBounded { phases: Vec<String> },
}

/// The whole configuration surface of a parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Constrain word order by the PF target.
    pub include_pf_constraints: bool,
    /// Constrain structure by the LF target.
    pub include_lf_constraints: bool,
    /// Enumerate derivations instead of stopping at the first.
    pub extract_all_parses: bool,
    /// Upper limit on derivations returned when extracting all parses.
    pub max_parses: usize,
    /// Size of the search space.
    pub bounds: Bounds,
    /// Per solver call. `None` waits indefinitely.
    pub timeout_ms: Option<u64>,
    /// Which locality predicate applies.
    pub locality: LocalityConfig,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            include_pf_constraints: true,
            include_lf_constraints: true,
            extract_all_parses: false,
            max_parses: 3,
            bounds: Bounds::default(),
            timeout_ms: None,
            locality: LocalityConfig::default(),
        }
    }
}

impl ParseOptions {
    /// Decodes options; absent fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigurationError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and decodes an options file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|error| ConfigurationError::Io {
            path: path.display().to_string(),
            reason: error.to_string(),
        })?;
        Self::from_json(&json)
    }

    /// The per-call timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Replaces the bounds.
    pub fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = bounds;
        self
    }

    /// Switches PF constraints on or off.
    pub fn with_pf_constraints(mut self, include: bool) -> Self {
        self.include_pf_constraints = include;
        self
    }

    /// Switches LF constraints on or off.
    pub fn with_lf_constraints(mut self, include: bool) -> Self {
        self.include_lf_constraints = include;
        self
    }

    /// Extract up to `max_parses` distinct derivations instead of one.
    pub fn all_parses(mut self, max_parses: usize) -> Self {
        self.extract_all_parses = true;
        self.max_parses = max_parses;
        self
    }

    /// Limits each solver call. Durations beyond `u64::MAX` ms saturate.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Replaces the locality predicate.
    pub fn with_locality(mut self, locality: LocalityConfig) -> Self {
        self.locality = locality;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigurationError> {
        if !self.include_pf_constraints && !self.include_lf_constraints {
            return Err(ConfigurationError::NoInterfaceConstraints);
        }
        if self.extract_all_parses && self.max_parses == 0 {
            return Err(ConfigurationError::ZeroParseLimit);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn it_orders_bounds_pointwise() {
        let small = Bounds::new(2, 1, 0);
        let large = Bounds::new(3, 1, 2);
        assert!(large.dominates(&small));
        assert!(!small.dominates(&large));
        assert!(small.dominates(&small));
        assert!(!Bounds::new(3, 0, 2).dominates(&small));
    }

    #[test]
    fn it_fills_in_defaults_from_partial_json() {
        let options = ParseOptions::from_json(
            r#"{
                "include_lf_constraints": false,
                "bounds": { "max_num_movements": 6 },
                "locality": { "policy": "phase_bounded", "phases": ["v"] }
            }"#,
        )
        .unwrap();

        assert!(options.include_pf_constraints);
        assert!(!options.include_lf_constraints);
        assert_eq!(options.bounds, Bounds::new(4, 6, 2));
        assert_eq!(
            options.locality,
            LocalityConfig::PhaseBounded {
                phases: vec!["v".into()]
            }
        );
        assert_eq!(options.timeout(), None);
    }

    #[test]
    fn it_saturates_timeouts_beyond_the_millisecond_range() {
        let options = ParseOptions::default().with_timeout(Duration::from_millis(1500));
        assert_eq!(options.timeout_ms, Some(1500));

        let options = ParseOptions::default().with_timeout(Duration::MAX);
        assert_eq!(options.timeout_ms, Some(u64::MAX));
    }

    #[test]
    fn it_rejects_disabling_both_interfaces() {
        let options = ParseOptions::default()
            .with_pf_constraints(false)
            .with_lf_constraints(false);
        assert_eq!(
            options.validate(),
            Err(ConfigurationError::NoInterfaceConstraints)
        );
        assert_eq!(
            ParseOptions::default().all_parses(0).validate(),
            Err(ConfigurationError::ZeroParseLimit)
        );
    }
}
