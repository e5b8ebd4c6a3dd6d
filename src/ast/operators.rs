/// Returns true for `$`-prefixed keys that can name a clause or an operator.
///
/// A dotted key such as `$x.y` is a path, not an operator name.
pub fn is_operator_key(key: &str) -> bool {
    key.len() > 1 && key.starts_with('$') && !key.contains('.')
}

/// Structural clauses that combine other clauses and terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClauseKind {
    /// `$comment` - ignored text
    Comment,
    /// `$and` - every term must hold
    And,
    /// `$or` - any term must hold
    Or,
    /// `$sqlExists` - correlated `EXISTS` subquery
    SqlExists,
    /// `$nSqlExists` - correlated `NOT EXISTS` subquery
    NSqlExists,
}

impl ClauseKind {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "$comment" => Some(ClauseKind::Comment),
            "$and" => Some(ClauseKind::And),
            "$or" => Some(ClauseKind::Or),
            "$sqlExists" => Some(ClauseKind::SqlExists),
            "$nSqlExists" => Some(ClauseKind::NSqlExists),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ClauseKind::Comment => "comment",
            ClauseKind::And => "and",
            ClauseKind::Or => "or",
            ClauseKind::SqlExists => "sqlExists",
            ClauseKind::NSqlExists => "nSqlExists",
        }
    }

    pub fn is_subquery(self) -> bool {
        matches!(self, ClauseKind::SqlExists | ClauseKind::NSqlExists)
    }

    pub fn is_negated(self) -> bool {
        self == ClauseKind::NSqlExists
    }

    /// The keyword joining the terms of `$and` / `$or`.
    pub fn conjunction(self) -> Option<&'static str> {
        match self {
            ClauseKind::And => Some("AND"),
            ClauseKind::Or => Some("OR"),
            _ => None,
        }
    }
}

/// Leaf comparisons attached to one attribute path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueOperator {
    AttrPath,
    IsNull,
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Regex,
    NRegex,
    Like,
    NLike,
    In,
    NIn,
}

impl ValueOperator {
    /// Tie-break order used when one operand map carries several operator
    /// keys: the first entry present wins.
    pub const PRIORITY: [ValueOperator; 14] = [
        ValueOperator::AttrPath,
        ValueOperator::IsNull,
        ValueOperator::Lte,
        ValueOperator::Gt,
        ValueOperator::Lt,
        ValueOperator::Gte,
        ValueOperator::Ne,
        ValueOperator::Eq,
        ValueOperator::NRegex,
        ValueOperator::Regex,
        ValueOperator::NLike,
        ValueOperator::Like,
        ValueOperator::NIn,
        ValueOperator::In,
    ];

    pub fn from_key(key: &str) -> Option<Self> {
        let op = match key {
            "$attrPath" => ValueOperator::AttrPath,
            "$isNull" => ValueOperator::IsNull,
            "$eq" => ValueOperator::Eq,
            "$ne" => ValueOperator::Ne,
            "$gt" => ValueOperator::Gt,
            "$gte" => ValueOperator::Gte,
            "$lt" => ValueOperator::Lt,
            "$lte" => ValueOperator::Lte,
            "$regex" => ValueOperator::Regex,
            "$nregex" => ValueOperator::NRegex,
            "$like" => ValueOperator::Like,
            "$nlike" => ValueOperator::NLike,
            "$in" => ValueOperator::In,
            "$nin" => ValueOperator::NIn,
            _ => return None,
        };
        Some(op)
    }

    pub fn name(self) -> &'static str {
        match self {
            ValueOperator::AttrPath => "attrPath",
            ValueOperator::IsNull => "isNull",
            ValueOperator::Eq => "eq",
            ValueOperator::Ne => "ne",
            ValueOperator::Gt => "gt",
            ValueOperator::Gte => "gte",
            ValueOperator::Lt => "lt",
            ValueOperator::Lte => "lte",
            ValueOperator::Regex => "regex",
            ValueOperator::NRegex => "nregex",
            ValueOperator::Like => "like",
            ValueOperator::NLike => "nlike",
            ValueOperator::In => "in",
            ValueOperator::NIn => "nin",
        }
    }

    /// The filter key spelling, e.g. `$gte`.
    pub fn key(self) -> String {
        format!("${}", self.name())
    }

    /// Picks the operator a set of operand keys denotes, by [`Self::PRIORITY`].
    pub fn select<'a>(keys: impl IntoIterator<Item = &'a str>) -> Option<Self> {
        let present: Vec<ValueOperator> = keys.into_iter().filter_map(Self::from_key).collect();
        Self::PRIORITY.into_iter().find(|op| present.contains(op))
    }

    /// Comparison symbol emitted between the operands.
    pub fn symbol(self) -> Option<&'static str> {
        match self {
            ValueOperator::Eq => Some("="),
            ValueOperator::Ne => Some("<>"),
            ValueOperator::Gt => Some(">"),
            ValueOperator::Gte => Some(">="),
            ValueOperator::Lt => Some("<"),
            ValueOperator::Lte => Some("<="),
            ValueOperator::In => Some("IN"),
            ValueOperator::NIn => Some("NOT IN"),
            ValueOperator::Like => Some("LIKE"),
            ValueOperator::NLike => Some("NOT LIKE"),
            _ => None,
        }
    }

    /// Symbol used instead of [`Self::symbol`] when the right operand is NULL.
    pub fn null_symbol(self) -> Option<&'static str> {
        match self {
            ValueOperator::Eq => Some("IS"),
            ValueOperator::Ne => Some("IS NOT"),
            _ => None,
        }
    }

    /// Operators whose right operand may be a literal or `{"$attrPath": ...}`.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            ValueOperator::Eq
                | ValueOperator::Ne
                | ValueOperator::Gt
                | ValueOperator::Gte
                | ValueOperator::Lt
                | ValueOperator::Lte
        )
    }
}

/// Fixed children of a subquery clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TermKind {
    EntityName,
    Alias,
    Query,
}

/// What a node stands for; `None` on attribute paths and literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Label {
    Clause(ClauseKind),
    Operator(ValueOperator),
    Term(TermKind),
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Label::Clause(c) => f.write_str(c.name()),
            Label::Operator(op) => f.write_str(op.name()),
            Label::Term(TermKind::EntityName) => f.write_str("entityName"),
            Label::Term(TermKind::Alias) => f.write_str("alias"),
            Label::Term(TermKind::Query) => f.write_str("query"),
        }
    }
}
