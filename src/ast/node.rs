use std::fmt;

use serde_json::Value as JsonValue;

use crate::{
    ast::{ClauseKind, Label, TermKind, ValueOperator},
    path::AttributePath,
};

/// Identifier of a node, unique within one [`Registry`](crate::ast::Registry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Root,
    Clause,
    Term,
    ValueOperator,
    AttributePath,
    Literal,
}

/// Payload carried by a node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeValue {
    None,

    /// Comment text, entity names and aliases
    Text(String),

    /// Operand paths
    Path(AttributePath),

    /// Decoded literal operand, converted only once its target type is known
    Literal(JsonValue),

    /// `$isNull` operand and the `$caseSensitive` flag of `$like`
    Flag(bool),

    /// `$escape` character of `$like`
    Char(char),
}

/// One node of the expression tree.
///
/// Structure (parent and children) is only changed through the owning
/// registry so both sides of every link stay consistent.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) kind: NodeKind,
    pub(crate) label: Option<Label>,
    pub(crate) value: NodeValue,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    /// Query text this node compiles to; set by the compiler.
    pub(crate) fragment: Option<String>,
}

impl Node {
    pub(crate) fn new(id: NodeId, kind: NodeKind, label: Option<Label>, value: NodeValue) -> Self {
        Node {
            id,
            kind,
            label,
            value,
            parent: None,
            children: Vec::new(),
            fragment: None,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn label(&self) -> Option<Label> {
        self.label
    }

    pub fn value(&self) -> &NodeValue {
        &self.value
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn child(&self, index: usize) -> Option<NodeId> {
        self.children.get(index).copied()
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }

    pub fn clause(&self) -> Option<ClauseKind> {
        match self.label {
            Some(Label::Clause(c)) if self.kind == NodeKind::Clause => Some(c),
            _ => None,
        }
    }

    pub fn operator(&self) -> Option<ValueOperator> {
        match self.label {
            Some(Label::Operator(op)) if self.kind == NodeKind::ValueOperator => Some(op),
            _ => None,
        }
    }

    pub fn term(&self) -> Option<TermKind> {
        match self.label {
            Some(Label::Term(t)) if self.kind == NodeKind::Term => Some(t),
            _ => None,
        }
    }

    /// True for `$sqlExists` / `$nSqlExists` clause nodes.
    pub fn is_subquery(&self) -> bool {
        self.clause().is_some_and(ClauseKind::is_subquery)
    }

    pub fn text(&self) -> Option<&str> {
        match &self.value {
            NodeValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn path(&self) -> Option<&AttributePath> {
        match &self.value {
            NodeValue::Path(p) => Some(p),
            _ => None,
        }
    }
}
