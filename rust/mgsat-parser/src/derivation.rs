use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{self, Write as _};

use indexmap::IndexMap;
use mgsat_lexicon::{Feature, Polarity};

use crate::Role;

/// Index of a leaf in a [`Derivation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LeafId(pub usize);

/// Index of a node in a [`Derivation`]. Nodes are numbered in preorder,
/// head before argument, so the root is `NodeId(0)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// One instance of a lexical item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leaf {
    /// Label of the lexical item.
    pub item: String,
    /// `None` for covert items.
    pub phonological_form: Option<String>,
    /// The item's semantic constant.
    pub denotation: Option<String>,
    /// The item's full feature sequence.
    pub features: Vec<Feature>,
    /// Position in the sentence for overt items.
    pub position: Option<usize>,
}

impl Leaf {
    /// Whether the leaf is silent.
    pub fn is_covert(&self) -> bool {
        self.phonological_form.is_none()
    }
}

/// Feature `index` of a leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeatureRef {
    /// The leaf carrying the feature.
    pub leaf: LeafId,
    /// Position in the leaf's feature sequence.
    pub index: usize,
}

/// The feature pair consumed by an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Check {
    /// The selector or licensor.
    pub trigger: FeatureRef,
    /// The selectee or licensee it checks.
    pub target: FeatureRef,
}

/// How a node came about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// A lexical item on its own.
    Lexical(LeafId),
    /// `head` selects `argument`.
    Merge {
        head: NodeId,
        argument: NodeId,
        check: Check,
    },
    /// A merge whose selector also incorporates the argument's head.
    HeadMove {
        head: NodeId,
        argument: NodeId,
        check: Check,
        incorporated: LeafId,
    },
    /// `mover` is the phrase as first merged; it is re-merged here.
    Move {
        head: NodeId,
        mover: NodeId,
        check: Check,
    },
}

impl Operation {
    /// The feature pair consumed here; `None` for lexical nodes.
    pub fn check(&self) -> Option<Check> {
        match self {
            Operation::Lexical(_) => None,
            Operation::Merge { check, .. }
            | Operation::HeadMove { check, .. }
            | Operation::Move { check, .. } => Some(*check),
        }
    }
}

/// One step of a derivation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivationNode {
    /// The step and its daughters.
    pub operation: Operation,
    /// The leaf this node projects from.
    pub head: LeafId,
    /// The head's next unchecked feature at this node.
    pub index: usize,
}

/// Items used by a derivation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Usage {
    /// Per lexical item, in order of first use.
    pub items: Vec<ItemUsage>,
    /// Covert leaves.
    pub empty_items: usize,
    /// Phrasal movements.
    pub movements: usize,
    /// Head movements.
    pub head_movements: usize,
}

/// How often one lexical item is used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemUsage {
    /// The item's label.
    pub label: String,
    /// `None` for covert items.
    pub phonological_form: Option<String>,
    /// Number of leaves instantiating it.
    pub count: usize,
}

/// A predicate-argument relation realized by a derivation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Predication {
    /// Denotation of the predicate, or its label.
    pub predicate: String,
    /// The role assigned.
    pub role: Role,
    /// The pronounced words of the argument phrase.
    pub argument: Vec<String>,
}

impl fmt::Display for Predication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}: {})",
            self.predicate,
            self.role,
            self.argument.join(" ")
        )
    }
}

/// A derivation tree extracted from a model.
///
/// Leaves and nodes live in arenas addressed by [`LeafId`] and [`NodeId`].
/// A moved phrase appears once, where it was first merged; every [`Move`]
/// refers back to it.
///
/// [`Move`]: Operation::Move
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Derivation {
    leaves: Vec<Leaf>,
    nodes: Vec<DerivationNode>,
}

impl Derivation {
    pub(crate) fn new(leaves: Vec<Leaf>, nodes: Vec<DerivationNode>) -> Self {
        Self { leaves, nodes }
    }

    /// The topmost node.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// The node `id`.
    pub fn node(&self, id: NodeId) -> Option<&DerivationNode> {
        self.nodes.get(id.0)
    }

    /// All nodes in preorder.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &DerivationNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (NodeId(index), node))
    }

    /// The leaf `id`.
    pub fn leaf(&self, id: LeafId) -> Option<&Leaf> {
        self.leaves.get(id.0)
    }

    /// All leaves.
    pub fn leaves(&self) -> impl Iterator<Item = (LeafId, &Leaf)> {
        self.leaves
            .iter()
            .enumerate()
            .map(|(index, leaf)| (LeafId(index), leaf))
    }

    /// The feature a reference points at.
    pub fn feature(&self, at: FeatureRef) -> Option<&Feature> {
        self.leaf(at.leaf)
            .and_then(|leaf| leaf.features.get(at.index))
    }

    /// Every feature pair checked in the derivation, in preorder.
    pub fn checks(&self) -> Vec<Check> {
        self.nodes
            .iter()
            .filter_map(|node| node.operation.check())
            .collect()
    }

    /// The one feature left unchecked: the clause category at the root.
    pub fn completion(&self) -> Option<FeatureRef> {
        let root = self.node(self.root())?;
        let at = FeatureRef {
            leaf: root.head,
            index: root.index,
        };
        self.feature(at)
            .is_some_and(|feature| feature.polarity() == Polarity::Category)
            .then_some(at)
    }

    /// The pronounced words in order.
    pub fn pronounced(&self) -> Vec<String> {
        let layout = Layout::new(self);
        let mut order = Vec::new();
        layout.linearize(self, self.root(), &mut order);
        order
            .into_iter()
            .filter_map(|leaf| self.leaves[leaf.0].phonological_form.clone())
            .collect()
    }

    /// Items, empty items and movements the derivation uses.
    pub fn usage(&self) -> Usage {
        let mut items: IndexMap<&str, ItemUsage> = IndexMap::new();
        for leaf in &self.leaves {
            items
                .entry(leaf.item.as_str())
                .or_insert_with(|| ItemUsage {
                    label: leaf.item.clone(),
                    phonological_form: leaf.phonological_form.clone(),
                    count: 0,
                })
                .count += 1;
        }

        let count = |kind: fn(&Operation) -> bool| {
            self.nodes
                .iter()
                .filter(|node| kind(&node.operation))
                .count()
        };
        Usage {
            items: items.into_values().collect(),
            empty_items: self.leaves.iter().filter(|leaf| leaf.is_covert()).count(),
            movements: count(|operation| matches!(operation, Operation::Move { .. })),
            head_movements: count(|operation| matches!(operation, Operation::HeadMove { .. })),
        }
    }

    /// Predicate-argument relations read back from the tree: what each
    /// pronounced item merges with its first and second selector, and what
    /// the head selecting its projection merges as a specifier.
    pub fn predications(&self) -> Vec<Predication> {
        let merges: BTreeMap<FeatureRef, NodeId> = self
            .nodes
            .iter()
            .filter_map(|node| match &node.operation {
                Operation::Merge {
                    argument, check, ..
                }
                | Operation::HeadMove {
                    argument, check, ..
                } => Some((check.trigger, *argument)),
                _ => None,
            })
            .collect();

        let mut predications = BTreeSet::new();
        for (trigger, argument) in &merges {
            let Some(selected) = self.node(*argument) else {
                continue;
            };

            let role = match trigger.index {
                0 => Some(Role::Obj),
                1 => Some(Role::Iobj),
                _ => None,
            };
            if let Some(role) = role {
                predications.extend(self.predication(trigger.leaf, role, *argument));
            }

            // A head that selects a projection with its first feature and
            // merges a specifier with its second introduces the subject.
            if trigger.index == 0 {
                let specifier = FeatureRef {
                    leaf: trigger.leaf,
                    index: 1,
                };
                if let Some(subject) = merges.get(&specifier) {
                    predications.extend(self.predication(selected.head, Role::Subj, *subject));
                }
            }
        }
        predications.into_iter().collect()
    }

    fn predication(&self, predicate: LeafId, role: Role, argument: NodeId) -> Option<Predication> {
        let predicate = self.leaf(predicate)?.phonological_form.clone()?;
        Some(Predication {
            predicate,
            role,
            argument: self.words(argument),
        })
    }

    /// Pronounced words first merged under `node`, in sentence order.
    fn words(&self, node: NodeId) -> Vec<String> {
        let mut leaves = Vec::new();
        self.collect_leaves(node, &mut leaves);
        let mut words: Vec<(usize, String)> = leaves
            .into_iter()
            .filter_map(|leaf| {
                let leaf = &self.leaves[leaf.0];
                Some((leaf.position?, leaf.phonological_form.clone()?))
            })
            .collect();
        words.sort();
        words.into_iter().map(|(_, word)| word).collect()
    }

    fn collect_leaves(&self, node: NodeId, leaves: &mut Vec<LeafId>) {
        match &self.nodes[node.0].operation {
            Operation::Lexical(leaf) => leaves.push(*leaf),
            Operation::Merge { head, argument, .. } | Operation::HeadMove { head, argument, .. } => {
                self.collect_leaves(*head, leaves);
                self.collect_leaves(*argument, leaves);
            }
            Operation::Move { head, .. } => self.collect_leaves(*head, leaves),
        }
    }

    /// An indented rendering, one node per line.
    pub fn pretty(&self) -> String {
        let mut out = String::new();
        self.write_pretty(self.root(), 0, &mut out);
        out
    }

    fn write_pretty(&self, node: NodeId, depth: usize, out: &mut String) {
        let indent = "  ".repeat(depth);
        match &self.nodes[node.0].operation {
            Operation::Lexical(leaf) => {
                let leaf = &self.leaves[leaf.0];
                let features = leaf.features.iter().map(Feature::to_string).collect::<Vec<_>>();
                let _ = writeln!(
                    out,
                    "{indent}{} :: {} ({})",
                    leaf.item,
                    features.join(" "),
                    leaf.phonological_form.as_deref().unwrap_or("ε")
                );
            }
            Operation::Merge { head, argument, check } => {
                let _ = writeln!(out, "{indent}merge {}", self.describe(check.trigger));
                self.write_pretty(*head, depth + 1, out);
                self.write_pretty(*argument, depth + 1, out);
            }
            Operation::HeadMove {
                head,
                argument,
                check,
                incorporated,
            } => {
                let _ = writeln!(
                    out,
                    "{indent}head-move {} ({} incorporates)",
                    self.describe(check.trigger),
                    self.leaves[incorporated.0].item
                );
                self.write_pretty(*head, depth + 1, out);
                self.write_pretty(*argument, depth + 1, out);
            }
            Operation::Move { head, mover, check } => {
                let _ = writeln!(
                    out,
                    "{indent}move {} ({} moves)",
                    self.describe(check.trigger),
                    self.leaves[self.nodes[mover.0].head.0].item
                );
                self.write_pretty(*head, depth + 1, out);
            }
        }
    }

    fn describe(&self, at: FeatureRef) -> String {
        self.feature(at)
            .map(Feature::to_string)
            .unwrap_or_else(|| "?".into())
    }

    fn write_node(&self, node: NodeId, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.nodes[node.0].operation {
            Operation::Lexical(leaf) => write!(f, "{}", self.leaves[leaf.0].item),
            Operation::Merge { head, argument, check }
            | Operation::HeadMove {
                head,
                argument,
                check,
                ..
            } => {
                write!(f, "[{} ", self.describe(check.trigger))?;
                self.write_node(*head, f)?;
                write!(f, " ")?;
                self.write_node(*argument, f)?;
                write!(f, "]")
            }
            Operation::Move { head, mover, check } => {
                write!(f, "[{} ", self.describe(check.trigger))?;
                self.write_node(*head, f)?;
                write!(f, " ^{}]", self.leaves[self.nodes[mover.0].head.0].item)
            }
        }
    }
}

/// Bracketed form, e.g. `[=T C [+k [=v T ...] ^John]]`. Two derivations
/// print alike exactly when they differ at most in how covert slots were
/// numbered.
impl fmt::Display for Derivation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nodes.is_empty() {
            return write!(f, "[]");
        }
        self.write_node(self.root(), f)
    }
}

/// Where movement and head movement put things.
struct Layout {
    /// Phrase → the move that pronounces it: its last one.
    landings: BTreeMap<NodeId, (usize, NodeId)>,
    /// Host leaf → the head it incorporates.
    hosts: BTreeMap<LeafId, LeafId>,
    incorporated: BTreeSet<LeafId>,
}

impl Layout {
    fn new(derivation: &Derivation) -> Self {
        let mut landings: BTreeMap<NodeId, (usize, NodeId)> = BTreeMap::new();
        let mut hosts = BTreeMap::new();
        let mut incorporated = BTreeSet::new();

        for (id, node) in derivation.nodes() {
            match &node.operation {
                Operation::Move { mover, check, .. } => {
                    let index = check.target.index;
                    let last = landings.entry(*mover).or_insert((index, id));
                    if index > last.0 {
                        *last = (index, id);
                    }
                }
                Operation::HeadMove {
                    incorporated: mover,
                    check,
                    ..
                } => {
                    hosts.insert(check.trigger.leaf, *mover);
                    incorporated.insert(*mover);
                }
                _ => {}
            }
        }

        Self {
            landings,
            hosts,
            incorporated,
        }
    }

    /// Complements follow their lexical head, specifiers and moved phrases
    /// precede; a moved phrase is pronounced only at its last landing and an
    /// incorporated head right before its host.
    fn linearize(&self, derivation: &Derivation, node: NodeId, order: &mut Vec<LeafId>) {
        match &derivation.nodes[node.0].operation {
            Operation::Lexical(leaf) => {
                if self.incorporated.contains(leaf) {
                    return;
                }
                if let Some(mover) = self.hosts.get(leaf) {
                    order.push(*mover);
                }
                order.push(*leaf);
            }
            Operation::Merge { head, argument, .. } | Operation::HeadMove { head, argument, .. } => {
                let complement = matches!(
                    derivation.nodes[head.0].operation,
                    Operation::Lexical(_)
                );
                if complement {
                    self.linearize(derivation, *head, order);
                }
                if !self.landings.contains_key(argument) {
                    self.linearize(derivation, *argument, order);
                }
                if !complement {
                    self.linearize(derivation, *head, order);
                }
            }
            Operation::Move { head, mover, .. } => {
                if self
                    .landings
                    .get(mover)
                    .is_some_and(|(_, last)| *last == node)
                {
                    self.linearize(derivation, *mover, order);
                }
                self.linearize(derivation, *head, order);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn leaf(item: &str, features: &str, form: Option<&str>, position: Option<usize>) -> Leaf {
        Leaf {
            item: item.into(),
            phonological_form: form.map(String::from),
            denotation: None,
            features: features
                .split_whitespace()
                .map(|feature| feature.parse().unwrap())
                .collect(),
            position,
        }
    }

    fn at(leaf: usize, index: usize) -> FeatureRef {
        FeatureRef {
            leaf: LeafId(leaf),
            index,
        }
    }

    /// `ε::=V +k C` over `sees::=D ~V` and `her::~D -k`: her moves to
    /// the front.
    fn fronted() -> Derivation {
        let leaves = vec![
            leaf("C", "=V +k C", None, None),
            leaf("sees", "=D ~V", Some("sees"), Some(1)),
            leaf("her", "~D -k", Some("her"), Some(0)),
        ];
        let nodes = vec![
            DerivationNode {
                operation: Operation::Move {
                    head: NodeId(1),
                    mover: NodeId(5),
                    check: Check {
                        trigger: at(0, 1),
                        target: at(2, 1),
                    },
                },
                head: LeafId(0),
                index: 2,
            },
            DerivationNode {
                operation: Operation::Merge {
                    head: NodeId(2),
                    argument: NodeId(3),
                    check: Check {
                        trigger: at(0, 0),
                        target: at(1, 1),
                    },
                },
                head: LeafId(0),
                index: 1,
            },
            DerivationNode {
                operation: Operation::Lexical(LeafId(0)),
                head: LeafId(0),
                index: 0,
            },
            DerivationNode {
                operation: Operation::Merge {
                    head: NodeId(4),
                    argument: NodeId(5),
                    check: Check {
                        trigger: at(1, 0),
                        target: at(2, 0),
                    },
                },
                head: LeafId(1),
                index: 1,
            },
            DerivationNode {
                operation: Operation::Lexical(LeafId(1)),
                head: LeafId(1),
                index: 0,
            },
            DerivationNode {
                operation: Operation::Lexical(LeafId(2)),
                head: LeafId(2),
                index: 0,
            },
        ];
        Derivation::new(leaves, nodes)
    }

    #[test]
    fn it_pronounces_movers_at_their_landing() {
        let derivation = fronted();
        assert_eq!(derivation.pronounced(), vec!["her", "sees"]);
        assert_eq!(derivation.to_string(), "[+k [=V C [=D sees her]] ^her]");
    }

    #[test]
    fn it_leaves_only_the_category_unchecked() {
        let derivation = fronted();
        assert_eq!(derivation.completion(), Some(at(0, 2)));
        assert_eq!(derivation.checks().len(), 3);
    }

    #[test]
    fn it_reports_usage_and_predications() {
        let derivation = fronted();
        let usage = derivation.usage();
        assert_eq!(usage.empty_items, 1);
        assert_eq!(usage.movements, 1);
        assert_eq!(usage.head_movements, 0);
        assert_eq!(usage.items.len(), 3);

        assert_eq!(
            derivation
                .predications()
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>(),
            vec!["sees(obj: her)"]
        );
        assert!(derivation.pretty().contains("move +k (her moves)"));
    }
}
