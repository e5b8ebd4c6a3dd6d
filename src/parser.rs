//! Iterative parser turning a decoded filter mapping into an expression tree.
//!
//! The parser never recurses. Work that recursive descent would do on the call
//! stack is kept as [`ParseFrame`]s on an explicit stack; each step of the
//! driving state machine (`Begin → Process → End`) pops one frame, attaches
//! the nodes it produces and pushes the frames for its nested terms. Nesting
//! depth is therefore bounded by memory rather than by the thread's stack.
//!
//! The parser is a lazy sequence of [`ParseResult`]s that ends with the first
//! completed result; [`Parser::parse`] drains it.
//!
//! # Examples
//!
//! ```
//! use mql_lang::{NodeKind, Parser, ParserOptions};
//! use serde_json::json;
//!
//! let filter = json!({"$alias": "e", "age": {"$gte": 18}});
//! let options = ParserOptions::for_entity("Employee");
//! let tree = Parser::from_value(&filter, options).unwrap().parse().unwrap();
//!
//! let registry = tree.registry();
//! assert_eq!(registry[tree.root()].kind(), NodeKind::Root);
//! ```

use std::fmt::Write as _;

use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};
use tracing::trace;

use crate::{
    ast::{
        ClauseKind, Label, NodeId, NodeKind, NodeValue, Registry, TermKind, ValueOperator,
        operators::is_operator_key,
    },
    error::MqlError,
    path::AttributePath,
};

type JsonMap = Map<String, JsonValue>;

const ENTITY_NAME_KEY: &str = "$entityName";
const ALIAS_KEY: &str = "$alias";
const QUERY_KEY: &str = "$query";
const CASE_SENSITIVE_KEY: &str = "$caseSensitive";
const ESCAPE_KEY: &str = "$escape";

/// Inputs the parser needs besides the filter itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserOptions {
    /// Entity of the root query, unless the filter names one with `$entityName`
    pub entity_name: Option<String>,
    /// Alias of the root query, unless the filter names one with `$alias`
    pub alias: Option<String>,
    /// Reject operand maps with more than one operator key instead of
    /// applying [`ValueOperator::PRIORITY`]
    pub strict_operands: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        ParserOptions {
            entity_name: None,
            alias: None,
            strict_operands: true,
        }
    }
}

impl ParserOptions {
    pub fn for_entity(entity_name: impl Into<String>) -> Self {
        ParserOptions {
            entity_name: Some(entity_name.into()),
            ..Self::default()
        }
    }
}

/// One step of the parse sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseResult {
    /// True on the final step only
    pub completed: bool,
    pub root: NodeId,
}

/// A parsed filter: the registry owning all nodes and the ROOT node.
#[derive(Debug, Clone)]
pub struct ExpressionTree {
    registry: Registry,
    root: NodeId,
}

impl ExpressionTree {
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// The `$sqlExists` clause standing for the whole filter.
    pub fn root_clause(&self) -> Option<NodeId> {
        self.registry[self.root].child(0)
    }

    /// Indented outline of the tree, one node per line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let mut stack = vec![(self.root, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            let node = &self.registry[id];
            let _ = write!(out, "{}{:?}", "  ".repeat(depth), node.kind());
            if let Some(label) = node.label() {
                let _ = write!(out, " {}", label);
            }
            match node.value() {
                NodeValue::None => {}
                NodeValue::Text(s) => {
                    let _ = write!(out, " {:?}", s);
                }
                NodeValue::Path(p) => {
                    let _ = write!(out, " {}", p);
                }
                NodeValue::Literal(v) => {
                    let _ = write!(out, " {}", v);
                }
                NodeValue::Flag(b) => {
                    let _ = write!(out, " {}", b);
                }
                NodeValue::Char(c) => {
                    let _ = write!(out, " {:?}", c);
                }
            }
            out.push('\n');
            stack.extend(node.children().iter().rev().map(|&c| (c, depth + 1)));
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    Begin,
    Process,
    End,
    Ended,
}

/// A pending unit of interpretation.
#[derive(Debug, Clone)]
enum FrameKind {
    /// Sibling condition terms, implicitly AND-ed
    TermGroup(JsonMap),
    /// Body of a `$`-clause
    Clause(ClauseKind, JsonValue),
    /// Operand map of one attribute path
    Operand(String, JsonMap),
}

#[derive(Debug, Clone)]
struct ParseFrame {
    id: usize,
    /// Frame that pushed this one; kept for diagnostics only
    origin: Option<usize>,
    /// Node the results are attached to
    target: NodeId,
    kind: FrameKind,
}

impl FrameKind {
    fn name(&self) -> &'static str {
        match self {
            FrameKind::TermGroup(_) => "terms",
            FrameKind::Clause(..) => "clause",
            FrameKind::Operand(..) => "operand",
        }
    }
}

/// Term-level key, classified once.
enum TermClass {
    Clause(ClauseKind),
    Operand(JsonMap),
}

fn classify_term(key: &str, value: &JsonValue) -> TermClass {
    if let Some(clause) = ClauseKind::from_key(key) {
        return TermClass::Clause(clause);
    }

    match value {
        JsonValue::Object(map) => TermClass::Operand(map.clone()),
        other => {
            let mut map = JsonMap::new();
            map.insert(ValueOperator::Eq.key(), other.clone());
            TermClass::Operand(map)
        }
    }
}

/// Decodes filter text without a nesting limit. Deep documents grow the
/// stack on the heap instead of overflowing it.
pub fn decode_filter(text: &str) -> Result<JsonValue, serde_json::Error> {
    let mut de = serde_json::Deserializer::from_str(text);
    de.disable_recursion_limit();
    let value = JsonValue::deserialize(serde_stacker::Deserializer::new(&mut de))?;
    de.end()?;
    Ok(value)
}

fn type_name(v: &JsonValue) -> &'static str {
    match v {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "list",
        JsonValue::Object(_) => "map",
    }
}

pub struct Parser {
    filter: JsonMap,
    options: ParserOptions,
    state: ParseState,
    stack: Vec<ParseFrame>,
    registry: Registry,
    root: Option<NodeId>,
    next_frame_id: usize,
}

impl Parser {
    pub fn new(filter: JsonMap, options: ParserOptions) -> Self {
        Parser {
            filter,
            options,
            state: ParseState::Begin,
            stack: Vec::new(),
            registry: Registry::new(),
            root: None,
            next_frame_id: 0,
        }
    }

    /// Accepts any decoded JSON value; only maps are valid filters.
    pub fn from_value(filter: &JsonValue, options: ParserOptions) -> Result<Self, MqlError> {
        match filter {
            JsonValue::Object(map) => Ok(Self::new(map.clone(), options)),
            other => Err(MqlError::syntax(format!(
                "A filter must be a map, got {}",
                type_name(other)
            ))),
        }
    }

    /// Decodes filter text and creates a parser for it.
    pub fn from_json(text: &str, options: ParserOptions) -> Result<Self, MqlError> {
        let value = decode_filter(text)
            .map_err(|e| MqlError::syntax(format!("Invalid filter JSON: {}", e)))?;
        Self::from_value(&value, options)
    }

    /// Nodes created so far.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Discards all progress so the sequence can be replayed from the start.
    pub fn reset(&mut self) {
        self.state = ParseState::Begin;
        self.stack.clear();
        self.registry = Registry::new();
        self.root = None;
        self.next_frame_id = 0;
    }

    /// Drains the sequence and returns the finished tree.
    pub fn parse(mut self) -> Result<ExpressionTree, MqlError> {
        for step in self.by_ref() {
            if step?.completed {
                break;
            }
        }

        let root = self
            .root
            .ok_or_else(|| MqlError::syntax("The filter produced no expression"))?;
        Ok(ExpressionTree {
            registry: self.registry,
            root,
        })
    }

    fn step(&mut self) -> Result<ParseResult, MqlError> {
        match self.state {
            ParseState::Begin => self.begin()?,
            ParseState::Process => match self.stack.pop() {
                Some(frame) => self.process(frame)?,
                None => self.state = ParseState::End,
            },
            ParseState::End | ParseState::Ended => self.state = ParseState::Ended,
        }

        let root = self
            .root
            .ok_or_else(|| MqlError::syntax("The filter produced no expression"))?;
        Ok(ParseResult {
            completed: self.state == ParseState::Ended,
            root,
        })
    }

    fn push(&mut self, origin: Option<usize>, target: NodeId, kind: FrameKind) {
        let id = self.next_frame_id;
        self.next_frame_id += 1;
        self.stack.push(ParseFrame {
            id,
            origin,
            target,
            kind,
        });
    }

    fn begin(&mut self) -> Result<(), MqlError> {
        self.registry = Registry::new();
        self.stack.clear();

        let root = self.registry.create(NodeKind::Root, None, NodeValue::None);
        self.root = Some(root);

        let body = self.root_clause_body()?;
        self.push(
            None,
            root,
            FrameKind::Clause(ClauseKind::SqlExists, JsonValue::Object(body)),
        );
        self.state = ParseState::Process;
        Ok(())
    }

    /// The whole filter is read as the `$sqlExists` body of the root query.
    fn root_clause_body(&self) -> Result<JsonMap, MqlError> {
        let entity_name = pick_setting(
            &self.filter,
            ENTITY_NAME_KEY,
            self.options.entity_name.as_deref(),
        )?
        .ok_or_else(|| MqlError::configuration("No entity selected for the filter"))?;

        let alias = pick_setting(&self.filter, ALIAS_KEY, self.options.alias.as_deref())?
            .ok_or_else(|| MqlError::configuration("$alias is missing"))?;

        let query = match self.filter.get(QUERY_KEY) {
            Some(query) => {
                let stray = self
                    .filter
                    .keys()
                    .find(|k| ![ENTITY_NAME_KEY, ALIAS_KEY, QUERY_KEY].contains(&k.as_str()));
                if let Some(key) = stray {
                    return Err(MqlError::syntax(format!(
                        "Key {} cannot be combined with {} at the top level",
                        key, QUERY_KEY
                    )));
                }
                query.clone()
            }
            None => {
                let terms: JsonMap = self
                    .filter
                    .iter()
                    .filter(|(k, _)| k.as_str() != ENTITY_NAME_KEY && k.as_str() != ALIAS_KEY)
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                JsonValue::Object(terms)
            }
        };

        let mut body = JsonMap::new();
        body.insert(ENTITY_NAME_KEY.to_string(), JsonValue::String(entity_name));
        body.insert(ALIAS_KEY.to_string(), JsonValue::String(alias));
        body.insert(QUERY_KEY.to_string(), query);
        Ok(body)
    }

    fn process(&mut self, frame: ParseFrame) -> Result<(), MqlError> {
        trace!(
            frame = frame.id,
            origin = ?frame.origin,
            target = %frame.target,
            kind = frame.kind.name(),
            "parse step"
        );

        match frame.kind {
            FrameKind::TermGroup(terms) => self.process_terms(frame.id, frame.target, terms),
            FrameKind::Clause(clause, body) => {
                self.process_clause(frame.id, frame.target, clause, body)
            }
            FrameKind::Operand(path, body) => self.process_operand(frame.target, &path, &body),
        }
    }

    fn process_terms(&mut self, frame_id: usize, target: NodeId, terms: JsonMap) -> Result<(), MqlError> {
        let mut frames = Vec::with_capacity(terms.len());
        for (key, value) in terms {
            if key.trim().is_empty() {
                return Err(MqlError::syntax("A key of an expression cannot be blank"));
            }

            let kind = match classify_term(&key, &value) {
                TermClass::Clause(clause) => FrameKind::Clause(clause, value),
                TermClass::Operand(body) => FrameKind::Operand(key, body),
            };
            frames.push(kind);
        }

        // first term on top, so terms are handled in document order
        for kind in frames.into_iter().rev() {
            self.push(Some(frame_id), target, kind);
        }
        Ok(())
    }

    fn process_clause(
        &mut self,
        frame_id: usize,
        target: NodeId,
        clause: ClauseKind,
        body: JsonValue,
    ) -> Result<(), MqlError> {
        let name = clause.name();
        let node = self
            .registry
            .create(NodeKind::Clause, Some(Label::Clause(clause)), NodeValue::None);
        self.registry.add_child(target, node);

        match clause {
            ClauseKind::Comment => {
                let JsonValue::String(text) = body else {
                    return Err(MqlError::syntax(format!(
                        "The term of {} clause must be a string",
                        name
                    )));
                };
                let literal = self
                    .registry
                    .create(NodeKind::Literal, None, NodeValue::Text(text));
                self.registry.add_child(node, literal);
            }
            ClauseKind::And | ClauseKind::Or => {
                let JsonValue::Array(terms) = body else {
                    return Err(MqlError::syntax(format!(
                        "The term of {} clause must be a list",
                        name
                    )));
                };

                let mut groups = Vec::with_capacity(terms.len());
                for term in terms {
                    let JsonValue::Object(map) = term else {
                        return Err(MqlError::syntax(format!(
                            "Each term of {} clause must be a map",
                            name
                        )));
                    };
                    let group = self.registry.create(
                        NodeKind::Clause,
                        Some(Label::Clause(ClauseKind::And)),
                        NodeValue::None,
                    );
                    self.registry.add_child(node, group);
                    groups.push((group, map));
                }

                for (group, map) in groups.into_iter().rev() {
                    self.push(Some(frame_id), group, FrameKind::TermGroup(map));
                }
            }
            ClauseKind::SqlExists | ClauseKind::NSqlExists => {
                let JsonValue::Object(mut map) = body else {
                    return Err(MqlError::syntax(format!(
                        "The term of {} clause must be a map",
                        name
                    )));
                };

                let entity_name = match map.remove(ENTITY_NAME_KEY) {
                    Some(JsonValue::String(s)) if !s.trim().is_empty() => s,
                    _ => {
                        return Err(MqlError::syntax(format!(
                            "{} of {} clause must be a string",
                            ENTITY_NAME_KEY, name
                        )));
                    }
                };
                let alias = match map.remove(ALIAS_KEY) {
                    Some(JsonValue::String(s)) if !s.trim().is_empty() => s,
                    _ => {
                        return Err(MqlError::syntax(format!(
                            "{} of {} clause must be a string",
                            ALIAS_KEY, name
                        )));
                    }
                };
                let Some(JsonValue::Object(query)) = map.remove(QUERY_KEY) else {
                    return Err(MqlError::syntax(format!(
                        "{} of {} clause must be an expression",
                        QUERY_KEY, name
                    )));
                };

                let entity_node = self.registry.create(
                    NodeKind::Term,
                    Some(Label::Term(TermKind::EntityName)),
                    NodeValue::Text(entity_name),
                );
                let alias_node = self.registry.create(
                    NodeKind::Term,
                    Some(Label::Term(TermKind::Alias)),
                    NodeValue::Text(alias),
                );
                let query_node =
                    self.registry
                        .create(NodeKind::Term, Some(Label::Term(TermKind::Query)), NodeValue::None);
                let where_node = self.registry.create(
                    NodeKind::Clause,
                    Some(Label::Clause(ClauseKind::And)),
                    NodeValue::None,
                );
                self.registry.add_child(node, entity_node);
                self.registry.add_child(node, alias_node);
                self.registry.add_child(node, query_node);
                self.registry.add_child(query_node, where_node);

                self.push(Some(frame_id), where_node, FrameKind::TermGroup(query));
            }
        }
        Ok(())
    }

    fn process_operand(&mut self, target: NodeId, path: &str, body: &JsonMap) -> Result<(), MqlError> {
        let lhs = AttributePath::parse(path)?;
        let op = self.select_operator(path, body)?;
        let operand = body.get(&op.key()).unwrap_or(&JsonValue::Null);

        match op {
            ValueOperator::AttrPath => {
                // `{"x": {"$attrPath": "y"}}` reads as `x = y`
                let node = self.operator_node(target, ValueOperator::Eq, lhs);
                let rhs = self.attr_path_operand(op, operand)?;
                self.registry.add_child(node, rhs);
            }
            ValueOperator::IsNull => {
                let JsonValue::Bool(flag) = operand else {
                    return Err(MqlError::syntax(format!(
                        "The operand of {} operator must be a boolean",
                        op.name()
                    )));
                };
                let node = self.operator_node(target, op, lhs);
                self.add_literal(node, NodeValue::Flag(*flag));
            }
            ValueOperator::Like | ValueOperator::NLike => {
                let JsonValue::String(pattern) = operand else {
                    return Err(MqlError::syntax(format!(
                        "The operand of {} operator must be a string",
                        op.name()
                    )));
                };
                let case_sensitive = match body.get(CASE_SENSITIVE_KEY) {
                    None | Some(JsonValue::Null) => true,
                    Some(JsonValue::Bool(b)) => *b,
                    Some(_) => {
                        return Err(MqlError::syntax(format!(
                            "The operand of {} must be a boolean",
                            CASE_SENSITIVE_KEY
                        )));
                    }
                };
                let escape = match body.get(ESCAPE_KEY) {
                    None | Some(JsonValue::Null) => None,
                    Some(JsonValue::String(s)) if s.chars().count() == 1 => s.chars().next(),
                    Some(_) => {
                        return Err(MqlError::syntax(format!(
                            "The operand of {} must be a single character",
                            ESCAPE_KEY
                        )));
                    }
                };

                let node = self.operator_node(target, op, lhs);
                self.add_literal(node, NodeValue::Literal(JsonValue::String(pattern.clone())));
                self.add_literal(node, NodeValue::Flag(case_sensitive));
                if let Some(c) = escape {
                    self.add_literal(node, NodeValue::Char(c));
                }
            }
            ValueOperator::In | ValueOperator::NIn => {
                let JsonValue::Array(items) = operand else {
                    return Err(MqlError::syntax(format!(
                        "The operand of {} operator must be a list",
                        op.name()
                    )));
                };
                if items.is_empty() {
                    return Err(MqlError::syntax(format!(
                        "The operand of {} operator cannot be an empty list",
                        op.name()
                    )));
                }
                if items.iter().any(JsonValue::is_null) {
                    return Err(MqlError::syntax(format!(
                        "The operand of {} operator cannot contain null, use $isNull instead",
                        op.name()
                    )));
                }
                let node = self.operator_node(target, op, lhs);
                for item in items {
                    self.add_literal(node, NodeValue::Literal(item.clone()));
                }
            }
            op if op.is_comparison() => {
                let rhs = match operand {
                    JsonValue::Object(_) => self.attr_path_operand(op, operand)?,
                    JsonValue::Array(_) => {
                        return Err(MqlError::syntax(format!(
                            "The operand of {} operator cannot be a list",
                            op.name()
                        )));
                    }
                    literal => self.registry.create(
                        NodeKind::Literal,
                        None,
                        NodeValue::Literal(literal.clone()),
                    ),
                };
                let node = self.operator_node(target, op, lhs);
                self.registry.add_child(node, rhs);
            }
            _ => {
                return Err(MqlError::syntax(format!(
                    "The {} operator is not supported",
                    op.key()
                )));
            }
        }
        Ok(())
    }

    /// Picks the one operator an operand map denotes.
    fn select_operator(&self, path: &str, body: &JsonMap) -> Result<ValueOperator, MqlError> {
        let operators: Vec<ValueOperator> = body
            .keys()
            .filter(|k| is_operator_key(k))
            .filter_map(|k| ValueOperator::from_key(k))
            .collect();

        if self.options.strict_operands {
            if operators.len() > 1 {
                let keys: Vec<String> = operators.iter().map(|op| op.key()).collect();
                return Err(MqlError::syntax(format!(
                    "The operand of {} combines operators {}",
                    path,
                    keys.join(", ")
                )));
            }

            let unknown = body.keys().find(|k| {
                ValueOperator::from_key(k).is_none()
                    && k.as_str() != CASE_SENSITIVE_KEY
                    && k.as_str() != ESCAPE_KEY
            });
            if let Some(key) = unknown {
                return Err(MqlError::syntax(format!(
                    "Unknown key {} in the operand of {}",
                    key, path
                )));
            }
        }

        let op = ValueOperator::select(body.keys().map(String::as_str)).ok_or_else(|| {
            MqlError::syntax(format!("The operand of {} has no supported operator", path))
        })?;

        if self.options.strict_operands && !matches!(op, ValueOperator::Like | ValueOperator::NLike) {
            let setting = [CASE_SENSITIVE_KEY, ESCAPE_KEY]
                .into_iter()
                .find(|key| body.contains_key(*key));
            if let Some(key) = setting {
                return Err(MqlError::syntax(format!(
                    "{} only applies to like operators, not {} in the operand of {}",
                    key,
                    op.name(),
                    path
                )));
            }
        }
        Ok(op)
    }

    /// Builds the `attrPath` operator node for a `{"$attrPath": "..."}` operand.
    fn attr_path_operand(&mut self, op: ValueOperator, operand: &JsonValue) -> Result<NodeId, MqlError> {
        let invalid = || {
            MqlError::syntax(format!(
                "A map operand of {} operator must be {{\"$attrPath\": string}}",
                op.name()
            ))
        };

        let text = match operand {
            JsonValue::String(s) if op == ValueOperator::AttrPath => s,
            JsonValue::Object(map) if map.len() == 1 => match map.get("$attrPath") {
                Some(JsonValue::String(s)) => s,
                _ => return Err(invalid()),
            },
            _ => return Err(invalid()),
        };
        let path = AttributePath::parse(text)?;

        let node = self.registry.create(
            NodeKind::ValueOperator,
            Some(Label::Operator(ValueOperator::AttrPath)),
            NodeValue::None,
        );
        self.add_literal(node, NodeValue::Path(path));
        Ok(node)
    }

    /// Creates an operator node with its left-hand path and attaches it.
    fn operator_node(&mut self, target: NodeId, op: ValueOperator, lhs: AttributePath) -> NodeId {
        let node = self
            .registry
            .create(NodeKind::ValueOperator, Some(Label::Operator(op)), NodeValue::None);
        let lhs = self
            .registry
            .create(NodeKind::AttributePath, None, NodeValue::Path(lhs));
        self.registry.add_child(node, lhs);
        self.registry.add_child(target, node);
        node
    }

    fn add_literal(&mut self, parent: NodeId, value: NodeValue) {
        let literal = self.registry.create(NodeKind::Literal, None, value);
        self.registry.add_child(parent, literal);
    }
}

impl Iterator for Parser {
    type Item = Result<ParseResult, MqlError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.state == ParseState::Ended {
            return None;
        }

        let result = self.step();
        if result.is_err() {
            self.state = ParseState::Ended;
        }
        Some(result)
    }
}

/// Resolves a root setting given both in the filter and in the options.
fn pick_setting(filter: &JsonMap, key: &str, configured: Option<&str>) -> Result<Option<String>, MqlError> {
    let in_filter = match filter.get(key) {
        None => None,
        Some(JsonValue::String(s)) if !s.trim().is_empty() => Some(s.as_str()),
        Some(_) => {
            return Err(MqlError::syntax(format!("{} must be a non-blank string", key)));
        }
    };

    match (in_filter, configured) {
        (Some(a), Some(b)) if a != b => Err(MqlError::configuration(format!(
            "{} '{}' in the filter conflicts with the configured '{}'",
            key, a, b
        ))),
        (Some(a), _) => Ok(Some(a.to_string())),
        (None, Some(b)) => Ok(Some(b.to_string())),
        (None, None) => Ok(None),
    }
}
