use arbor_tree::{OutputsChildren, OutputsNode, TreeNode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Session;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransformError {
    #[error("cannot transform a root node without children")]
    EmptyRoot,
}

/// Order of siblings in the view tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChildOrder {
    /// Lexicographic by child name.
    #[default]
    Name,
    /// Insertion order of the children mapping.
    Declared,
}

/// Derives [`TreeNode`]s from [`OutputsNode`]s. Pure: the output depends
/// only on the node, the session and the configured order.
#[derive(Debug, Clone, Copy, Default)]
pub struct Transformer {
    order: ChildOrder,
}

impl Transformer {
    pub fn new(order: ChildOrder) -> Self {
        Self { order }
    }

    /// For the root, returns an always-expanded wrapper holding the root's
    /// children rather than a node for the root itself.
    pub fn transform(
        &self,
        node: &OutputsNode,
        session: &Session,
    ) -> Result<TreeNode, TransformError> {
        if node.is_root {
            let children = node.children.as_ref().ok_or(TransformError::EmptyRoot)?;
            return Ok(TreeNode {
                toggled: Some(true),
                children: Some(self.children(children, session)),
                ..Default::default()
            });
        }

        Ok(self.node(node, session))
    }

    fn node(&self, node: &OutputsNode, session: &Session) -> TreeNode {
        let id = node.path.clone();
        TreeNode {
            name: id.clone(),
            toggled: session.toggled(&id),
            active: session.is_active(&id),
            loading: node.is_loading(),
            children: node
                .children
                .as_ref()
                .map(|children| self.children(children, session)),
            id,
        }
    }

    fn children(&self, children: &OutputsChildren, session: &Session) -> Vec<TreeNode> {
        let mut ordered: Vec<_> = children.iter().collect();
        if self.order == ChildOrder::Name {
            ordered.sort_by(|(a, _), (b, _)| a.cmp(b));
        }
        ordered
            .into_iter()
            .map(|(_, child)| self.node(child, session))
            .collect()
    }
}

/// [`Transformer::transform`] with name ordering.
pub fn transform(node: &OutputsNode, session: &Session) -> Result<TreeNode, TransformError> {
    Transformer::default().transform(node, session)
}
