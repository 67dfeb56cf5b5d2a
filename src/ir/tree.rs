//! Arena storage for IR trees.

use super::node::{Node, NodeId, NodeKind};

/// Arena holding the nodes of one or more IR trees.
///
/// Children reference each other by [`NodeId`]; emission appends operand
/// nodes and splices them in with [`IrTree::replace_child`].
#[derive(Debug, Clone, Default)]
pub struct IrTree {
    nodes: Vec<Node>,
}

impl IrTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node and return its id.
    pub fn push(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.node(id).kind()
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id).children()
    }

    pub fn child(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.node(id).children().get(index).copied()
    }

    pub fn replace_child(&mut self, id: NodeId, index: usize, new: NodeId) -> bool {
        self.nodes[id.index()].replace_child(index, new)
    }
}
