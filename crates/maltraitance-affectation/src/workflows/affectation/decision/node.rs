use std::collections::BTreeMap;
use std::sync::Arc;

use super::super::context::{ContextField, SituationContext};
use super::super::domain::{EntiteAdminType, Vocabulary};

pub type NodeRef = Arc<DecisionNode>;
pub type Predicate = fn(&SituationContext) -> bool;
pub type Selector = fn(&SituationContext) -> Option<&str>;

/// Authority types a node adds to the result.
#[derive(Clone, Copy)]
pub enum Contribution {
    Fixed(&'static [EntiteAdminType]),
    Computed(fn(&SituationContext) -> Vec<EntiteAdminType>),
}

impl Contribution {
    pub fn resolve(&self, context: &SituationContext) -> Vec<EntiteAdminType> {
        match self {
            Contribution::Fixed(types) => types.to_vec(),
            Contribution::Computed(compute) => compute(context),
        }
    }
}

impl std::fmt::Debug for Contribution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Contribution::Fixed(types) => f.debug_tuple("Fixed").field(types).finish(),
            Contribution::Computed(_) => f.write_str("Computed"),
        }
    }
}

/// Switch case key drawn from a closed vocabulary.
///
/// Ordering follows the vocabulary's canonical order, which is the order used
/// when a switch lists its supported values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CaseKey {
    rank: usize,
    code: &'static str,
}

impl CaseKey {
    pub fn of<V: Vocabulary>(value: V) -> Self {
        Self {
            rank: value.rank(),
            code: value.code(),
        }
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

pub enum DecisionNode {
    Leaf(LeafNode),
    Branch(BranchNode),
    Switch(SwitchNode),
}

impl DecisionNode {
    pub fn id(&self) -> &'static str {
        match self {
            DecisionNode::Leaf(node) => node.id,
            DecisionNode::Branch(node) => node.id,
            DecisionNode::Switch(node) => node.id,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            DecisionNode::Leaf(node) => node.description,
            DecisionNode::Branch(node) => node.description,
            DecisionNode::Switch(node) => node.description,
        }
    }

    pub fn required(&self) -> &[ContextField] {
        match self {
            DecisionNode::Leaf(node) => &node.required,
            DecisionNode::Branch(node) => &node.required,
            DecisionNode::Switch(node) => &node.required,
        }
    }

    pub fn shared(self) -> NodeRef {
        Arc::new(self)
    }
}

impl std::fmt::Debug for DecisionNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            DecisionNode::Leaf(_) => "Leaf",
            DecisionNode::Branch(_) => "Branch",
            DecisionNode::Switch(_) => "Switch",
        };
        f.debug_struct(kind)
            .field("id", &self.id())
            .field("required", &self.required())
            .finish_non_exhaustive()
    }
}

pub struct LeafNode {
    pub id: &'static str,
    pub description: &'static str,
    pub required: Vec<ContextField>,
    pub add: Contribution,
    pub next: Option<NodeRef>,
}

impl LeafNode {
    pub fn new(id: &'static str, description: &'static str, add: Contribution) -> Self {
        Self {
            id,
            description,
            required: Vec::new(),
            add,
            next: None,
        }
    }

    /// Leaf contributing a fixed set of types.
    pub fn fixed(
        id: &'static str,
        description: &'static str,
        types: &'static [EntiteAdminType],
    ) -> Self {
        Self::new(id, description, Contribution::Fixed(types))
    }

    pub fn then(mut self, next: NodeRef) -> Self {
        self.next = Some(next);
        self
    }

    pub fn node(self) -> NodeRef {
        DecisionNode::Leaf(self).shared()
    }
}

pub struct BranchNode {
    pub id: &'static str,
    pub description: &'static str,
    pub required: Vec<ContextField>,
    pub predicate: Predicate,
    pub if_true: NodeRef,
    pub if_false: NodeRef,
    pub add_if_true: Option<Contribution>,
    pub add_if_false: Option<Contribution>,
}

impl BranchNode {
    pub fn new(
        id: &'static str,
        description: &'static str,
        predicate: Predicate,
        if_true: NodeRef,
        if_false: NodeRef,
    ) -> Self {
        Self {
            id,
            description,
            required: Vec::new(),
            predicate,
            if_true,
            if_false,
            add_if_true: None,
            add_if_false: None,
        }
    }

    pub fn requires(mut self, fields: &[ContextField]) -> Self {
        self.required = fields.to_vec();
        self
    }

    pub fn add_if_true(mut self, add: Contribution) -> Self {
        self.add_if_true = Some(add);
        self
    }

    pub fn add_if_false(mut self, add: Contribution) -> Self {
        self.add_if_false = Some(add);
        self
    }

    pub fn node(self) -> NodeRef {
        DecisionNode::Branch(self).shared()
    }
}

pub struct SwitchNode {
    pub id: &'static str,
    pub description: &'static str,
    pub required: Vec<ContextField>,
    pub select: Selector,
    pub cases: BTreeMap<CaseKey, NodeRef>,
    pub default: Option<NodeRef>,
}

impl SwitchNode {
    pub fn new(id: &'static str, description: &'static str, select: Selector) -> Self {
        Self {
            id,
            description,
            required: Vec::new(),
            select,
            cases: BTreeMap::new(),
            default: None,
        }
    }

    pub fn requires(mut self, fields: &[ContextField]) -> Self {
        self.required = fields.to_vec();
        self
    }

    pub fn case<V: Vocabulary>(mut self, key: V, node: NodeRef) -> Self {
        self.cases.insert(CaseKey::of(key), node);
        self
    }

    pub fn default_to(mut self, node: NodeRef) -> Self {
        self.default = Some(node);
        self
    }

    pub fn lookup(&self, key: &str) -> Option<&NodeRef> {
        self.cases
            .iter()
            .find(|(case, _)| case.code() == key)
            .map(|(_, node)| node)
    }

    /// Supported case keys in vocabulary order.
    pub fn supported_keys(&self) -> Vec<&'static str> {
        self.cases.keys().map(CaseKey::code).collect()
    }

    pub fn node(self) -> NodeRef {
        DecisionNode::Switch(self).shared()
    }
}
