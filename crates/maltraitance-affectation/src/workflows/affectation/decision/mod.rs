mod motifs;
mod node;
mod policy;

pub use motifs::{compute_entites_from_motifs, has_non_exempt_motif};
pub use node::{
    BranchNode, CaseKey, Contribution, DecisionNode, LeafNode, NodeRef, Predicate, Selector,
    SwitchNode,
};

use std::collections::BTreeSet;
use std::sync::OnceLock;

use tracing::debug;

use super::context::SituationContext;
use super::domain::EntiteAdminType;

/// Walk ceiling guarding against a cycle slipping into an authored tree.
pub const MAX_DEPTH: usize = 1000;

static STANDARD_TREE: OnceLock<DecisionTree> = OnceLock::new();

/// Errors raised while walking the tree. They abort the evaluation of one
/// situation only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecisionTreeError {
    #[error("Node {node_id} requires fields: {}", .missing.join(", "))]
    MissingRequiredFields {
        node_id: &'static str,
        missing: Vec<&'static str>,
    },
    #[error(
        "Node {node_id}: unsupported value '{value}' for field {field}. Supported values: {}",
        .supported.join(", ")
    )]
    UnsupportedValue {
        node_id: &'static str,
        value: String,
        field: &'static str,
        supported: Vec<&'static str>,
    },
    #[error("Node {node_id}: decision tree deeper than {max} levels")]
    DepthExceeded { node_id: &'static str, max: usize },
}

/// Immutable routing tree, safe to share between concurrent evaluations.
#[derive(Debug, Clone)]
pub struct DecisionTree {
    root: NodeRef,
}

impl DecisionTree {
    pub fn new(root: NodeRef) -> Self {
        Self { root }
    }

    /// The routing policy in force, built on first use.
    pub fn standard() -> &'static DecisionTree {
        STANDARD_TREE.get_or_init(|| DecisionTree::new(policy::standard_tree()))
    }

    pub fn root(&self) -> &DecisionNode {
        &self.root
    }

    pub fn evaluate(
        &self,
        context: &SituationContext,
    ) -> Result<BTreeSet<EntiteAdminType>, DecisionTreeError> {
        let mut entites = BTreeSet::new();
        eval_node(&self.root, context, &mut entites)?;
        Ok(entites)
    }
}

/// Runs the standard tree. Evaluation itself never awaits; the async signature
/// leaves room for lookups inside nodes.
pub async fn run_decision_tree(
    context: &SituationContext,
) -> Result<BTreeSet<EntiteAdminType>, DecisionTreeError> {
    DecisionTree::standard().evaluate(context)
}

fn eval_node(
    root: &DecisionNode,
    context: &SituationContext,
    entites: &mut BTreeSet<EntiteAdminType>,
) -> Result<(), DecisionTreeError> {
    let mut node = root;
    let mut depth = 0;

    loop {
        if depth > MAX_DEPTH {
            return Err(DecisionTreeError::DepthExceeded {
                node_id: node.id(),
                max: MAX_DEPTH,
            });
        }

        let missing: Vec<&'static str> = node
            .required()
            .iter()
            .filter(|field| !context.is_defined(**field))
            .map(|field| field.name())
            .collect();
        if !missing.is_empty() {
            return Err(DecisionTreeError::MissingRequiredFields {
                node_id: node.id(),
                missing,
            });
        }

        debug!(node = node.id(), depth, "evaluating decision node");

        node = match node {
            DecisionNode::Leaf(leaf) => {
                entites.extend(leaf.add.resolve(context));
                match &leaf.next {
                    Some(next) => &**next,
                    None => return Ok(()),
                }
            }
            DecisionNode::Branch(branch) => {
                let (add, child) = if (branch.predicate)(context) {
                    (branch.add_if_true.as_ref(), &branch.if_true)
                } else {
                    (branch.add_if_false.as_ref(), &branch.if_false)
                };
                if let Some(add) = add {
                    entites.extend(add.resolve(context));
                }
                &**child
            }
            DecisionNode::Switch(switch) => {
                let key = (switch.select)(context);
                match key.and_then(|key| switch.lookup(key)).or(switch.default.as_ref()) {
                    Some(child) => &**child,
                    None => {
                        return match (key, switch.required.first()) {
                            (Some(value), Some(field)) => {
                                Err(DecisionTreeError::UnsupportedValue {
                                    node_id: switch.id,
                                    value: value.to_string(),
                                    field: field.name(),
                                    supported: switch.supported_keys(),
                                })
                            }
                            _ => Ok(()),
                        };
                    }
                }
            }
        };
        depth += 1;
    }
}
