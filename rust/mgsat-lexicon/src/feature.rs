use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::LexiconError;

/// The role a feature plays when it is checked.
///
/// Features are consumed pairwise: a [`Polarity::Selector`] checks a
/// [`Polarity::Selectee`] of the same name (merge), and a
/// [`Polarity::Licensor`] checks a [`Polarity::Licensee`] of the same name
/// (move). A [`Polarity::Category`] is never paired; it is consumed by
/// completing the derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    /// `=x`: selects a phrase of category `x`.
    Selector,
    /// `~x`: the category under which a phrase is selected.
    Selectee,
    /// `+x`: attracts a phrase bearing `-x`.
    Licensor,
    /// `-x`: makes a phrase move to a `+x` position.
    Licensee,
    /// `x`: completes the derivation as a clause of type `x`.
    Category,
}

impl Polarity {
    /// The polarity this one is checked against, if any.
    pub fn partner(&self) -> Option<Polarity> {
        match self {
            Polarity::Selector => Some(Polarity::Selectee),
            Polarity::Selectee => Some(Polarity::Selector),
            Polarity::Licensor => Some(Polarity::Licensee),
            Polarity::Licensee => Some(Polarity::Licensor),
            Polarity::Category => None,
        }
    }

    /// Whether a feature of this polarity projects: the head bearing it
    /// checks its partner and keeps going with its next feature.
    pub fn is_trigger(&self) -> bool {
        matches!(self, Polarity::Selector | Polarity::Licensor)
    }

    /// Whether a feature of this polarity is checked by a trigger in
    /// another item.
    pub fn is_target(&self) -> bool {
        matches!(self, Polarity::Selectee | Polarity::Licensee)
    }

    fn prefix(&self) -> &'static str {
        match self {
            Polarity::Selector => "=",
            Polarity::Selectee => "~",
            Polarity::Licensor => "+",
            Polarity::Licensee => "-",
            Polarity::Category => "",
        }
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Selector => write!(f, "selector"),
            Self::Selectee => write!(f, "selectee"),
            Self::Licensor => write!(f, "licensor"),
            Self::Licensee => write!(f, "licensee"),
            Self::Category => write!(f, "category"),
        }
    }
}

/// A single syntactic feature of a lexical item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "FeatureDescriptor")]
pub struct Feature {
    name: String,
    polarity: Polarity,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    head_movement: bool,
}

impl Feature {
    /// A feature that does not move heads.
    pub fn new(name: impl Into<String>, polarity: Polarity) -> Self {
        Self {
            name: name.into(),
            polarity,
            head_movement: false,
        }
    }

    /// A selector that also incorporates the head of the phrase it selects.
    pub fn head_attracting(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            polarity: Polarity::Selector,
            head_movement: true,
        }
    }

    /// The category or licensing name, without polarity marks.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// How the feature takes part in checking.
    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    /// Whether checking this feature also triggers head movement.
    pub fn moves_head(&self) -> bool {
        self.head_movement
    }

    /// Whether this feature, as a trigger, checks `other`.
    pub fn checks(&self, other: &Feature) -> bool {
        self.polarity.is_trigger()
            && self.polarity.partner() == Some(other.polarity)
            && self.name == other.name
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.head_movement {
            write!(f, "<")?;
        }
        write!(f, "{}{}", self.polarity.prefix(), self.name)
    }
}

impl FromStr for Feature {
    type Err = LexiconError;

    /// Parses the compact notation: `=x`, `<=x`, `~x`, `+x`, `-x` or a bare
    /// category name.
    fn from_str(notation: &str) -> Result<Self, Self::Err> {
        let invalid = || LexiconError::InvalidFeature {
            feature: notation.to_string(),
        };

        let (head_movement, rest) = match notation.strip_prefix('<') {
            Some(rest) => (true, rest),
            None => (false, notation),
        };

        let (polarity, name) = match rest.chars().next() {
            Some('=') => (Polarity::Selector, &rest[1..]),
            Some('~') => (Polarity::Selectee, &rest[1..]),
            Some('+') => (Polarity::Licensor, &rest[1..]),
            Some('-') => (Polarity::Licensee, &rest[1..]),
            Some(_) => (Polarity::Category, rest),
            None => return Err(invalid()),
        };

        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(invalid());
        }
        if head_movement && polarity != Polarity::Selector {
            return Err(invalid());
        }

        Ok(Feature {
            name: name.to_string(),
            polarity,
            head_movement,
        })
    }
}

/// Wire shapes accepted for a feature: the compact notation or an explicit
/// `{name, polarity}` descriptor.
#[derive(Deserialize)]
#[serde(untagged)]
enum FeatureDescriptor {
    Notation(String),
    Explicit {
        name: String,
        polarity: Polarity,
        #[serde(default)]
        head_movement: bool,
    },
}

impl TryFrom<FeatureDescriptor> for Feature {
    type Error = LexiconError;

    fn try_from(descriptor: FeatureDescriptor) -> Result<Self, Self::Error> {
        match descriptor {
            FeatureDescriptor::Notation(notation) => notation.parse(),
            FeatureDescriptor::Explicit {
                name,
                polarity,
                head_movement,
            } => {
                if name.is_empty() || (head_movement && polarity != Polarity::Selector) {
                    return Err(LexiconError::InvalidFeature {
                        feature: format!("{polarity} {name}"),
                    });
                }
                Ok(Feature {
                    name,
                    polarity,
                    head_movement,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn it_parses_compact_notation() {
        assert_eq!("=D".parse::<Feature>(), Ok(Feature::new("D", Polarity::Selector)));
        assert_eq!("<=V".parse::<Feature>(), Ok(Feature::head_attracting("V")));
        assert_eq!("~v".parse::<Feature>(), Ok(Feature::new("v", Polarity::Selectee)));
        assert_eq!("+wh".parse::<Feature>(), Ok(Feature::new("wh", Polarity::Licensor)));
        assert_eq!("-k".parse::<Feature>(), Ok(Feature::new("k", Polarity::Licensee)));
        assert_eq!(
            "C_declarative".parse::<Feature>(),
            Ok(Feature::new("C_declarative", Polarity::Category))
        );
    }

    #[test]
    fn it_rejects_bad_notation() {
        for bad in ["", "=", "<~D", "<+k", "= D"] {
            assert!(
                matches!(bad.parse::<Feature>(), Err(LexiconError::InvalidFeature { .. })),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn it_displays_in_compact_notation() {
        for notation in ["=D", "<=V", "~T", "+k", "-wh", "C"] {
            let feature: Feature = notation.parse().unwrap();
            assert_eq!(feature.to_string(), notation);
        }
    }

    #[test]
    fn it_checks_only_matching_partners() {
        let select_d = Feature::new("D", Polarity::Selector);
        assert!(select_d.checks(&Feature::new("D", Polarity::Selectee)));
        assert!(!select_d.checks(&Feature::new("N", Polarity::Selectee)));
        assert!(!select_d.checks(&Feature::new("D", Polarity::Licensee)));

        let selectee = Feature::new("D", Polarity::Selectee);
        assert!(!selectee.checks(&select_d));
    }

    #[test]
    fn it_decodes_both_wire_shapes() {
        let decoded: Vec<Feature> = serde_json::from_str(
            r#"["+k", {"name": "V", "polarity": "selector", "head_movement": true}]"#,
        )
        .unwrap();
        assert_eq!(
            decoded,
            vec![Feature::new("k", Polarity::Licensor), Feature::head_attracting("V")]
        );
    }
}
