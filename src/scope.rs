//! Nested query scopes and alias resolution.
//!
//! Every `$sqlExists` / `$nSqlExists` clause (the root filter included) opens
//! a [`SubQueryContext`]. Contexts form a tree mirroring how the clauses nest,
//! and aliases are scoped lexically along it: an inner query sees the aliases
//! of every query enclosing it, never those of its siblings or children.
//!
//! The tree is built in two passes over a finished expression tree. The first
//! pass discovers one context per clause node in post-order, so inner queries
//! always come before the queries containing them. The second pass links each
//! context to the nearest enclosing one; it has to run after discovery because
//! a parent is discovered after its children.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, instrument};

use crate::{
    ast::{NodeId, Registry, TermKind},
    error::MqlError,
    path::{AttributePath, is_identifier},
    schema::{AttributeType, EntityType, SchemaResolver},
};

/// Index of a context in its [`ContextTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(usize);

impl ContextId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Scope of one `EXISTS` query.
#[derive(Debug, Clone)]
pub struct SubQueryContext {
    node: NodeId,
    entity: EntityType,
    alias: String,
    negated: bool,
    query: NodeId,
    parent: Option<ContextId>,
    children: Vec<ContextId>,
    aliases: BTreeMap<String, EntityType>,
}

impl SubQueryContext {
    /// The clause node this context was opened by.
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn entity(&self) -> &EntityType {
        &self.entity
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// True for `$nSqlExists`.
    pub fn is_negated(&self) -> bool {
        self.negated
    }

    /// The `query` term holding the WHERE condition.
    pub fn query(&self) -> NodeId {
        self.query
    }

    pub fn parent(&self) -> Option<ContextId> {
        self.parent
    }

    pub fn children(&self) -> &[ContextId] {
        &self.children
    }

    /// Aliases bound by this scope itself.
    pub fn aliases(&self) -> impl Iterator<Item = (&str, &EntityType)> {
        self.aliases.iter().map(|(a, e)| (a.as_str(), e))
    }
}

/// An attribute path resolved against the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// The path as emitted, always starting with an alias
    pub path: AttributePath,
    /// Type of the last segment
    pub attribute: AttributeType,
}

/// All query scopes of one expression tree.
#[derive(Debug, Clone, Default)]
pub struct ContextTree {
    contexts: Vec<SubQueryContext>,
    by_node: HashMap<NodeId, ContextId>,
}

impl ContextTree {
    #[instrument(level = "debug", skip_all, fields(root = %root))]
    pub fn build(registry: &Registry, root: NodeId, schema: &dyn SchemaResolver) -> Result<Self, MqlError> {
        let mut tree = ContextTree::default();

        for id in registry.post_order(root) {
            if !registry[id].is_subquery() {
                continue;
            }

            let context = discover(registry, id, schema)?;
            debug!(
                node = %id,
                entity = %context.entity.name,
                alias = %context.alias,
                negated = context.negated,
                "discovered subquery"
            );
            tree.by_node.insert(id, ContextId(tree.contexts.len()));
            tree.contexts.push(context);
        }

        for index in 0..tree.contexts.len() {
            let node = tree.contexts[index].node;
            let enclosing = registry
                .ancestors(node)
                .find(|&a| registry[a].is_subquery())
                .and_then(|a| tree.by_node.get(&a).copied());

            if let Some(parent) = enclosing {
                tree.contexts[index].parent = Some(parent);
                tree.contexts[parent.0].children.push(ContextId(index));
            }
        }

        for context in &tree.contexts {
            let mut scope = context.parent;
            while let Some(id) = scope {
                let outer = &tree.contexts[id.0];
                if outer.aliases.contains_key(&context.alias) {
                    return Err(MqlError::syntax(format!(
                        "Alias {} is already defined in an enclosing query",
                        context.alias
                    )));
                }
                scope = outer.parent;
            }
        }

        Ok(tree)
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    pub fn get(&self, id: ContextId) -> &SubQueryContext {
        &self.contexts[id.0]
    }

    /// Contexts in discovery order: inner queries before outer ones.
    pub fn iter(&self) -> impl Iterator<Item = (ContextId, &SubQueryContext)> {
        self.contexts
            .iter()
            .enumerate()
            .map(|(i, c)| (ContextId(i), c))
    }

    /// Context opened by a clause node.
    pub fn by_node(&self, node: NodeId) -> Option<ContextId> {
        self.by_node.get(&node).copied()
    }

    /// The outermost query, discovered last.
    pub fn root(&self) -> Option<ContextId> {
        self.contexts
            .iter()
            .rposition(|c| c.parent.is_none())
            .map(ContextId)
    }

    /// Finds the scope binding `alias`, looking outward from `from`.
    pub fn resolve_alias(&self, from: ContextId, alias: &str) -> Option<ContextId> {
        let mut scope = Some(from);
        while let Some(id) = scope {
            let context = &self.contexts[id.0];
            if context.aliases.contains_key(alias) {
                return Some(id);
            }
            scope = context.parent;
        }
        None
    }

    /// Resolves `path` as seen from `from`.
    ///
    /// When the first token is a visible alias the rest of the path is
    /// resolved on that alias' entity; otherwise the whole path is taken
    /// relative to `from`'s own alias. Each following segment is looked up on
    /// the entity the previous segment points to.
    pub fn resolve_path(
        &self,
        from: ContextId,
        path: &AttributePath,
        schema: &dyn SchemaResolver,
    ) -> Result<ResolvedPath, MqlError> {
        let (owner, attributes, qualified) = match self.resolve_alias(from, path.first()) {
            Some(owner) => (owner, path.slice(1..path.len()), path.clone()),
            None => {
                let alias = &self.contexts[from.0].alias;
                (from, Some(path.clone()), path.prefixed(alias)?)
            }
        };

        let attributes = attributes.ok_or_else(|| {
            MqlError::syntax(format!("Path {} names an alias, not an attribute", path))
        })?;

        let mut entity = self.contexts[owner.0].entity.clone();
        let mut resolved: Option<AttributeType> = None;
        for segment in attributes.iter() {
            if let Some(previous) = &resolved {
                let target = previous.target_entity().ok_or_else(|| {
                    MqlError::syntax(format!(
                        "Attribute {} of {} is not a relation in path {}",
                        previous.name, entity.name, qualified
                    ))
                })?;
                entity = schema.resolve_entity(target)?;
            }
            resolved = Some(schema.resolve_attribute(&entity, segment)?);
        }

        let attribute = resolved
            .ok_or_else(|| MqlError::syntax(format!("Path {} has no attribute", path)))?;
        debug!(path = %qualified, value_type = attribute.value_type.name(), "resolved path");

        Ok(ResolvedPath {
            path: qualified,
            attribute,
        })
    }
}

impl std::ops::Index<ContextId> for ContextTree {
    type Output = SubQueryContext;

    fn index(&self, id: ContextId) -> &SubQueryContext {
        &self.contexts[id.0]
    }
}

fn discover(registry: &Registry, node: NodeId, schema: &dyn SchemaResolver) -> Result<SubQueryContext, MqlError> {
    let clause = &registry[node];
    let negated = clause.clause().is_some_and(|c| c.is_negated());
    let term = |kind: TermKind| {
        clause
            .children()
            .iter()
            .copied()
            .find(|&c| registry[c].term() == Some(kind))
    };

    let missing = |what: &str| MqlError::syntax(format!("Subquery {} has no {}", node, what));

    let entity_name = term(TermKind::EntityName)
        .and_then(|t| registry[t].text())
        .ok_or_else(|| missing("$entityName"))?;
    let alias = term(TermKind::Alias)
        .and_then(|t| registry[t].text())
        .ok_or_else(|| missing("$alias"))?;
    let query = term(TermKind::Query).ok_or_else(|| missing("$query"))?;

    if !is_identifier(alias) {
        return Err(MqlError::syntax(format!("Alias '{}' is not a valid identifier", alias)));
    }

    let entity = schema.resolve_entity(entity_name)?;
    let mut aliases = BTreeMap::new();
    aliases.insert(alias.to_string(), entity.clone());

    Ok(SubQueryContext {
        node,
        entity,
        alias: alias.to_string(),
        negated,
        query,
        parent: None,
        children: Vec::new(),
        aliases,
    })
}
