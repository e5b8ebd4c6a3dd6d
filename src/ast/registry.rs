use std::ops::Index;

use crate::ast::{Label, Node, NodeId, NodeKind, NodeValue};

/// Arena owning every node created during one parse + compile pass.
///
/// The registry is the only node factory and the only place links between
/// nodes are changed, which keeps `child ∈ parent.children ⇔ child.parent ==
/// parent` true at all times. Detached nodes stay in the arena until the
/// registry is dropped.
#[derive(Debug, Default, Clone)]
pub struct Registry {
    nodes: Vec<Node>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates and registers a new, unattached node.
    pub fn create(&mut self, kind: NodeKind, label: Option<Label>, value: NodeValue) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(id, kind, label, value));
        id
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self[id].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self[id].children
    }

    /// Appends `child` to `parent`, moving it away from any previous parent.
    ///
    /// Adding a child that is already present only re-asserts its parent link.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(
            parent != child && !self.ancestors(parent).any(|a| a == child),
            "attaching {child} under {parent} would create a cycle"
        );

        if let Some(old) = self[child].parent
            && old != parent
        {
            self.nodes[old.0].children.retain(|&c| c != child);
        }

        let siblings = &mut self.nodes[parent.0].children;
        if !siblings.contains(&child) {
            siblings.push(child);
        }
        self.nodes[child.0].parent = Some(parent);
    }

    /// Removes `child` from `parent`; a no-op when it is not attached there.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent.0].children.retain(|&c| c != child);
        if self[child].parent == Some(parent) {
            self.nodes[child.0].parent = None;
        }
    }

    /// Detaches `id` from its parent, if any.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self[id].parent {
            self.remove_child(parent, id);
        }
    }

    /// Detaches every child of `id`.
    pub fn clear_children(&mut self, id: NodeId) {
        let children = std::mem::take(&mut self.nodes[id.0].children);
        for child in children {
            self.nodes[child.0].parent = None;
        }
    }

    /// Walks from the parent of `id` up to the root.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            registry: self,
            next: self[id].parent,
        }
    }

    /// Node before its children, children left to right.
    pub fn pre_order(&self, root: NodeId) -> PreOrder<'_> {
        PreOrder {
            registry: self,
            stack: vec![root],
        }
    }

    /// Children (left to right) before their parent.
    pub fn post_order(&self, root: NodeId) -> PostOrder<'_> {
        PostOrder {
            registry: self,
            stack: vec![root],
            last_visited: None,
        }
    }
}

impl Index<NodeId> for Registry {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }
}

pub struct Ancestors<'a> {
    registry: &'a Registry,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.registry[current].parent;
        Some(current)
    }
}

/// Iterative pre-order walk over an explicit stack.
pub struct PreOrder<'a> {
    registry: &'a Registry,
    stack: Vec<NodeId>,
}

impl Iterator for PreOrder<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let node = self.stack.pop()?;
        let registry = self.registry;
        self.stack.extend(registry.children(node).iter().rev().copied());
        Some(node)
    }
}

/// Iterative post-order walk.
///
/// A node on top of the stack is emitted once its last child was the node
/// emitted just before; otherwise its children are pushed first.
pub struct PostOrder<'a> {
    registry: &'a Registry,
    stack: Vec<NodeId>,
    last_visited: Option<NodeId>,
}

impl Iterator for PostOrder<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let registry = self.registry;
        while let Some(&top) = self.stack.last() {
            let children = registry.children(top);
            match children.last() {
                Some(&last) if Some(last) != self.last_visited => {
                    self.stack.extend(children.iter().rev().copied());
                }
                _ => {
                    self.stack.pop();
                    self.last_visited = Some(top);
                    return Some(top);
                }
            }
        }
        None
    }
}
