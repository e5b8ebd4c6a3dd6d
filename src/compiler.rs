//! Compilation of expression trees into parameterized query statements.
//!
//! Compilation runs after parsing and never recurses:
//!
//! 1. the [`ContextTree`] of the expression tree is built, listing every
//!    query scope with inner scopes first;
//! 2. each scope's WHERE subtree is walked in post-order, every node
//!    receiving the fragment of query text it compiles to once its children
//!    have theirs; consumed children are dropped from the tree;
//! 3. the scope's clause node gets `FROM <Entity> <alias> [WHERE ...]`, or the
//!    `[NOT ]EXISTS (SELECT ...)` form when it is nested, and becomes a leaf
//!    of the enclosing scope's WHERE subtree;
//! 4. the root fragment is wrapped into the row and count statements.
//!
//! Literal operands are converted to their attribute's declared type and
//! bound to generated placeholders; the emitted text never contains a
//! literal value.
//!
//! # Examples
//!
//! ```
//! use mql_lang::{CompileOptions, Compiler, JsonTypeConverter, StaticSchema, Value, ValueType};
//! use serde_json::json;
//!
//! let schema = StaticSchema::new().with_entity(
//!     "Employee",
//!     [("name", ValueType::String), ("age", ValueType::Integer)],
//! );
//! let converter = JsonTypeConverter::new();
//! let options = CompileOptions::new("Employee").with_alias("e");
//! let compiler = Compiler::new(&schema, &converter, options).unwrap();
//!
//! let query = compiler.compile(&json!({"age": {"$gte": "18"}})).unwrap();
//! assert_eq!(query.rows.text, "SELECT e FROM Employee e WHERE e.age >= :p1");
//! assert_eq!(query.count.text, "SELECT COUNT(*) FROM Employee e WHERE e.age >= :p1");
//! assert_eq!(query.parameters.get("p1"), Some(&Value::Integer(18)));
//! ```

use serde_json::Value as JsonValue;
use tracing::{debug, instrument};

use crate::{
    ast::{ClauseKind, Label, NodeId, NodeKind, NodeValue, Registry, ValueOperator},
    convert::TypeConverter,
    error::MqlError,
    params::ParameterTable,
    parser::{ExpressionTree, Parser, ParserOptions, decode_filter},
    path::{AttributePath, is_identifier},
    schema::SchemaResolver,
    scope::{ContextId, ContextTree, ResolvedPath},
    sort::Order,
    value::Value,
};

/// Compile inputs other than the filter and the collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOptions {
    /// Entity the rows are fetched from; the filter may name it with
    /// `$entityName` instead
    pub entity: Option<String>,
    /// Alias of the root query; the filter may name it with `$alias` instead
    pub alias: Option<String>,
    pub order_by: Vec<Order>,
    pub max_rows: Option<usize>,
    pub first_row: usize,
    /// See [`ParserOptions::strict_operands`]
    pub strict_operands: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        CompileOptions {
            entity: None,
            alias: None,
            order_by: Vec::new(),
            max_rows: None,
            first_row: 0,
            strict_operands: true,
        }
    }
}

impl CompileOptions {
    pub fn new(entity: impl Into<String>) -> Self {
        CompileOptions {
            entity: Some(entity.into()),
            ..Self::default()
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_order(mut self, order: Order) -> Self {
        self.order_by.push(order);
        self
    }

    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = Some(max_rows);
        self
    }

    pub fn with_first_row(mut self, first_row: usize) -> Self {
        self.first_row = first_row;
        self
    }

    /// Resolve operand maps with several operator keys by priority.
    pub fn lenient(mut self) -> Self {
        self.strict_operands = false;
        self
    }

    fn parser_options(&self) -> ParserOptions {
        ParserOptions {
            entity_name: self.entity.clone(),
            alias: self.alias.clone(),
            strict_operands: self.strict_operands,
        }
    }
}

/// Query text plus the paging it is to be executed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub text: String,
    pub max_rows: Option<usize>,
    pub first_row: usize,
}

/// Output of one compile call. Both statements bind the same parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub rows: Statement,
    pub count: Statement,
    pub parameters: ParameterTable,
}

pub struct Compiler<'a> {
    schema: &'a dyn SchemaResolver,
    converter: &'a dyn TypeConverter,
    options: CompileOptions,
}

impl<'a> Compiler<'a> {
    pub fn new(
        schema: &'a dyn SchemaResolver,
        converter: &'a dyn TypeConverter,
        options: CompileOptions,
    ) -> Result<Self, MqlError> {
        if let Some(entity) = &options.entity
            && entity.trim().is_empty()
        {
            return Err(MqlError::configuration("The entity selector cannot be blank"));
        }

        if let Some(alias) = &options.alias
            && !is_identifier(alias)
        {
            return Err(MqlError::configuration(format!(
                "Alias '{}' is not a valid identifier",
                alias
            )));
        }

        Ok(Compiler {
            schema,
            converter,
            options,
        })
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Parses filter text and compiles it.
    pub fn compile_str(&self, text: &str) -> Result<CompiledQuery, MqlError> {
        let filter = decode_filter(text)
            .map_err(|e| MqlError::syntax(format!("Invalid filter JSON: {}", e)))?;
        self.compile(&filter)
    }

    #[instrument(level = "debug", skip_all, fields(entity = ?self.options.entity))]
    pub fn compile(&self, filter: &JsonValue) -> Result<CompiledQuery, MqlError> {
        if filter.is_null() {
            return Err(MqlError::configuration("No filter given"));
        }

        let tree = Parser::from_value(filter, self.options.parser_options())?.parse()?;
        self.compile_tree(tree)
    }

    /// Compiles an already parsed tree. The tree is consumed by the rewrite.
    pub fn compile_tree(&self, mut tree: ExpressionTree) -> Result<CompiledQuery, MqlError> {
        let root = tree.root();
        let contexts = ContextTree::build(tree.registry(), root, self.schema)?;
        let root_context = contexts
            .root()
            .ok_or_else(|| MqlError::syntax("The filter has no root query"))?;

        let mut emitter = Emitter {
            schema: self.schema,
            converter: self.converter,
            contexts: &contexts,
            registry: tree.registry_mut(),
            params: ParameterTable::new(),
        };
        for (id, _) in contexts.iter() {
            emitter.emit_context(id)?;
        }

        let root_clause = contexts[root_context].node();
        let from = emitter.registry[root_clause]
            .fragment()
            .ok_or_else(|| MqlError::syntax("The root query produced no text"))?
            .to_string();
        let params = emitter.params;
        debug!(from = %from, "composed root query");

        let order_by = self.order_by_clause(&contexts, root_context)?;
        if !order_by.is_empty() {
            debug!(order_by = %order_by, "composed order");
        }

        let alias = contexts[root_context].alias();
        let mut rows = format!("SELECT {} {}", alias, from);
        if !order_by.is_empty() {
            rows.push_str(" ORDER BY ");
            rows.push_str(&order_by);
        }

        Ok(CompiledQuery {
            rows: Statement {
                text: rows,
                max_rows: self.options.max_rows,
                first_row: self.options.first_row,
            },
            count: Statement {
                text: format!("SELECT COUNT(*) {}", from),
                max_rows: None,
                first_row: 0,
            },
            parameters: params,
        })
    }

    fn order_by_clause(&self, contexts: &ContextTree, root: ContextId) -> Result<String, MqlError> {
        let terms = self
            .options
            .order_by
            .iter()
            .map(|order| {
                let resolved = contexts.resolve_path(root, &order.path, self.schema)?;
                Ok(order.render(&resolved.path))
            })
            .collect::<Result<Vec<_>, MqlError>>()?;
        Ok(terms.join(", "))
    }
}

/// Rewrites the nodes of one expression tree into query text.
struct Emitter<'a> {
    schema: &'a dyn SchemaResolver,
    converter: &'a dyn TypeConverter,
    contexts: &'a ContextTree,
    registry: &'a mut Registry,
    params: ParameterTable,
}

impl Emitter<'_> {
    fn emit_context(&mut self, id: ContextId) -> Result<(), MqlError> {
        let contexts = self.contexts;
        let context = &contexts[id];
        let query = context.query();
        let condition = self.registry[query].child(0);

        if let Some(condition) = condition {
            let order: Vec<NodeId> = self.registry.post_order(condition).collect();
            for node in order {
                self.emit_node(id, node)?;
            }
        }

        let mut from = format!("FROM {} {}", context.entity().name, context.alias());
        if let Some(text) = condition.and_then(|c| self.registry[c].fragment())
            && !text.is_empty()
        {
            from.push_str(" WHERE ");
            from.push_str(text);
        }

        let clause = context.node();
        let nested = self.registry[clause]
            .parent()
            .is_some_and(|p| self.registry[p].kind() != NodeKind::Root);
        let fragment = if nested {
            let not = if context.is_negated() { "NOT " } else { "" };
            format!("{}EXISTS (SELECT {} {})", not, context.alias(), from)
        } else if context.is_negated() {
            return Err(MqlError::syntax("The root query cannot be negated"));
        } else {
            from
        };

        debug!(node = %clause, fragment = %fragment, "compiled subquery");
        self.set_fragment(clause, Some(fragment));
        self.registry.clear_children(clause);
        Ok(())
    }

    fn emit_node(&mut self, context: ContextId, id: NodeId) -> Result<(), MqlError> {
        let node = &self.registry[id];
        match (node.kind(), node.label()) {
            (NodeKind::Clause, Some(Label::Clause(ClauseKind::Comment))) => {
                self.registry.detach(id);
                Ok(())
            }
            (NodeKind::Clause, Some(Label::Clause(clause @ (ClauseKind::And | ClauseKind::Or)))) => {
                self.emit_junction(id, clause);
                Ok(())
            }
            // compiled with its own scope
            (NodeKind::Clause, Some(Label::Clause(_))) => Ok(()),
            (NodeKind::ValueOperator, Some(Label::Operator(op))) => self.emit_operator(context, id, op),
            _ => Ok(()),
        }
    }

    fn emit_junction(&mut self, id: NodeId, clause: ClauseKind) {
        let terms: Vec<String> = self.registry[id]
            .children()
            .iter()
            .filter_map(|&c| self.registry[c].fragment())
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .collect();

        // every side of a join is parenthesized, the join itself is not
        let fragment = match terms.len() {
            0 => None,
            1 => terms.into_iter().next(),
            _ => {
                let conjunction = clause.conjunction().unwrap_or("AND");
                let sides: Vec<String> = terms.iter().map(|t| format!("({})", t)).collect();
                Some(sides.join(&format!(" {} ", conjunction)))
            }
        };

        self.set_fragment(id, fragment);
        self.registry.clear_children(id);
    }

    fn emit_operator(&mut self, context: ContextId, id: NodeId, op: ValueOperator) -> Result<(), MqlError> {
        match op {
            ValueOperator::AttrPath => self.emit_attr_path(context, id),
            ValueOperator::IsNull => self.emit_is_null(context, id),
            ValueOperator::In | ValueOperator::NIn => self.emit_in(context, id, op),
            ValueOperator::Like | ValueOperator::NLike => self.emit_like(context, id, op),
            op if op.is_comparison() => self.emit_comparison(context, id, op),
            _ => Err(MqlError::syntax(format!(
                "The {} operator is not supported",
                op.key()
            ))),
        }
    }

    /// Turns an `attrPath` operand into the ATTRIBUTE_PATH node it names.
    fn emit_attr_path(&mut self, context: ContextId, id: NodeId) -> Result<(), MqlError> {
        let path = self
            .child(id, 0)
            .and_then(|c| match self.registry[c].value() {
                NodeValue::Path(p) => Some(p.clone()),
                _ => None,
            })
            .ok_or_else(|| MqlError::syntax("The operand of attrPath operator must be a path"))?;
        let resolved = self.contexts.resolve_path(context, &path, self.schema)?;

        self.registry.clear_children(id);
        let node = self.registry.node_mut(id);
        node.kind = NodeKind::AttributePath;
        node.label = None;
        node.value = NodeValue::Path(resolved.path);
        Ok(())
    }

    fn emit_is_null(&mut self, context: ContextId, id: NodeId) -> Result<(), MqlError> {
        let lhs = self.left_operand(context, id)?;
        let flag = match self.child(id, 1).map(|c| self.registry[c].value()) {
            Some(NodeValue::Flag(b)) => *b,
            _ => {
                return Err(MqlError::syntax("The operand of isNull operator must be a boolean"));
            }
        };

        let symbol = if flag { "IS" } else { "IS NOT" };
        self.finish(id, format!("{} {} NULL", lhs.path, symbol));
        Ok(())
    }

    fn emit_comparison(&mut self, context: ContextId, id: NodeId, op: ValueOperator) -> Result<(), MqlError> {
        let lhs = self.left_operand(context, id)?;
        let rhs = self
            .child(id, 1)
            .ok_or_else(|| MqlError::syntax(format!("The {} operator has no operand", op.name())))?;

        let (symbol, rhs_text) = match self.registry[rhs].value() {
            NodeValue::Path(path) if self.registry[rhs].kind() == NodeKind::AttributePath => {
                (op.symbol(), path.to_string())
            }
            NodeValue::Literal(JsonValue::Null) => match op.null_symbol() {
                Some(symbol) => (Some(symbol), "NULL".to_string()),
                None => {
                    return Err(MqlError::syntax(format!(
                        "The {} operator cannot compare with null",
                        op.name()
                    )));
                }
            },
            NodeValue::Literal(raw) => {
                let value = self.converter.convert(raw, &lhs.attribute.value_type)?;
                (op.symbol(), format!(":{}", self.params.issue(value)))
            }
            _ => {
                return Err(MqlError::syntax(format!(
                    "Invalid operand of {} operator",
                    op.name()
                )));
            }
        };

        let symbol = symbol.ok_or_else(|| MqlError::syntax(format!("{} is not a comparison", op.name())))?;
        self.finish(id, format!("{} {} {}", lhs.path, symbol, rhs_text));
        Ok(())
    }

    fn emit_in(&mut self, context: ContextId, id: NodeId, op: ValueOperator) -> Result<(), MqlError> {
        let lhs = self.left_operand(context, id)?;
        let raw = self.registry[id]
            .children()
            .iter()
            .skip(1)
            .map(|&c| match self.registry[c].value() {
                NodeValue::Literal(v) => Ok(v.clone()),
                _ => Err(MqlError::syntax(format!(
                    "The operands of {} operator must be literals",
                    op.name()
                ))),
            })
            .collect::<Result<Vec<_>, MqlError>>()?;

        let items = self.converter.convert_list(&raw, &lhs.attribute.value_type)?;
        let name = self.params.issue(Value::List(items));
        let symbol = op.symbol().unwrap_or("IN");
        self.finish(id, format!("{} {} :{}", lhs.path, symbol, name));
        Ok(())
    }

    fn emit_like(&mut self, context: ContextId, id: NodeId, op: ValueOperator) -> Result<(), MqlError> {
        let lhs = self.left_operand(context, id)?;

        let pattern = match self.child(id, 1).map(|c| self.registry[c].value()) {
            Some(NodeValue::Literal(JsonValue::String(s))) => s.clone(),
            _ => {
                return Err(MqlError::syntax(format!(
                    "The operand of {} operator must be a string",
                    op.name()
                )));
            }
        };
        let case_sensitive = match self.child(id, 2).map(|c| self.registry[c].value()) {
            Some(NodeValue::Flag(b)) => *b,
            _ => true,
        };
        let escape = match self.child(id, 3).map(|c| self.registry[c].value()) {
            Some(NodeValue::Char(c)) => Some(*c),
            _ => None,
        };

        let mut lhs_text = lhs.path.to_string();
        let mut rhs_text = format!(":{}", self.params.issue(Value::String(pattern)));
        if !case_sensitive {
            lhs_text = format!("LOWER({})", lhs_text);
            rhs_text = format!("LOWER({})", rhs_text);
        }

        let symbol = op.symbol().unwrap_or("LIKE");
        let mut fragment = format!("{} {} {}", lhs_text, symbol, rhs_text);
        if let Some(c) = escape {
            let name = self.params.issue(Value::Char(c));
            fragment.push_str(&format!(" ESCAPE :{}", name));
        }

        self.finish(id, fragment);
        Ok(())
    }

    /// Resolves the attribute path an operator node compares.
    fn left_operand(&self, context: ContextId, id: NodeId) -> Result<ResolvedPath, MqlError> {
        let path: &AttributePath = self
            .child(id, 0)
            .filter(|&c| self.registry[c].kind() == NodeKind::AttributePath)
            .and_then(|c| self.registry[c].path())
            .ok_or_else(|| MqlError::syntax(format!("Operator node {} has no attribute path", id)))?;
        self.contexts.resolve_path(context, path, self.schema)
    }

    fn child(&self, id: NodeId, index: usize) -> Option<NodeId> {
        self.registry[id].child(index)
    }

    fn finish(&mut self, id: NodeId, fragment: String) {
        self.set_fragment(id, Some(fragment));
        self.registry.clear_children(id);
    }

    fn set_fragment(&mut self, id: NodeId, fragment: Option<String>) {
        self.registry.node_mut(id).fragment = fragment;
    }
}
