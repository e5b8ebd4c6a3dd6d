//! Documentation content for mql CLI

use super::CliError;

/// Available documentation categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocCategory {
    Clauses,
    Operators,
    Paths,
    Subqueries,
    Sorting,
}

impl DocCategory {
    /// Parse category name from string
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "clauses" | "clause" | "logic" => Some(Self::Clauses),
            "operators" | "ops" => Some(Self::Operators),
            "paths" | "path" | "attributes" => Some(Self::Paths),
            "subqueries" | "subquery" | "exists" => Some(Self::Subqueries),
            "sorting" | "sort" | "order" | "order_by" => Some(Self::Sorting),
            _ => None,
        }
    }
}

/// Get the docs overview (category listing)
pub fn get_docs_overview() -> &'static str {
    r#"MQL DOCUMENTATION

MQL is a JSON filter language with Mongo-style operators. A filter is compiled
against an entity schema into a parameterized row query and a matching count
query. Literal values never appear in the query text; each one is bound to a
generated placeholder (:p1, :p2, ...).

DOCUMENTATION CATEGORIES

  clauses           $and, $or, $comment and the implicit AND of sibling keys
  operators         $eq, $ne, $gt, $in, $like, $isNull, $attrPath, ...
  paths             Dotted attribute paths, aliases and relation traversal
  subqueries        Correlated $sqlExists / $nSqlExists blocks
  sorting           Order terms and NULL placement

QUICK REFERENCE

  {"age": 30}                         e.age = :p1
  {"age": {"$gte": 18}}               e.age >= :p1
  {"name": {"$like": "A%"}}           e.name LIKE :p1
  {"$or": [{...}, {...}]}             (...) OR (...)
  {"manager": {"$isNull": true}}      e.manager IS NULL

Run 'mql doc <category>' for detailed documentation.
"#
}

/// Get documentation for a specific category
pub fn get_doc_category(name: &str) -> Result<&'static str, CliError> {
    match DocCategory::from_name(name) {
        Some(DocCategory::Clauses) => Ok(CLAUSES_DOC),
        Some(DocCategory::Operators) => Ok(OPERATORS_DOC),
        Some(DocCategory::Paths) => Ok(PATHS_DOC),
        Some(DocCategory::Subqueries) => Ok(SUBQUERIES_DOC),
        Some(DocCategory::Sorting) => Ok(SORTING_DOC),
        None => Err(CliError::UnknownCategory(name.to_string())),
    }
}

const CLAUSES_DOC: &str = r#"CLAUSES - Combining Conditions

IMPLICIT AND
  {"k1": ..., "k2": ...}
    Sibling keys of one map must all hold.

    Example:
      Filter: {"$alias": "e", "age": {"$gte": 18}, "active": true}
      Where:  (e.age >= :p1) AND (e.active = :p2)

$and / $or
  {"$and": [map, map, ...]}
  {"$or":  [map, map, ...]}
    Every (any) term must hold. Each term is a map and is itself an
    implicit AND of its keys.

    Example:
      Filter: {"$or": [{"age": {"$lt": 18}}, {"age": {"$gt": 65}}]}
      Where:  (e.age < :p1) OR (e.age > :p2)

    Constraints:
      - The value must be a list, each element a map
      - An empty list contributes no condition
      - A single term is emitted without parentheses
      - With two or more terms each term is parenthesized

$comment
  {"$comment": "text"}
    Ignored. Useful to annotate stored filters.

THE ROOT MAP
  $entityName   Entity of the root query (or configured with --entity)
  $alias        Alias of the root query (or configured with --alias)
  $query        Condition map; without it the remaining keys are the condition
"#;

const OPERATORS_DOC: &str = r#"OPERATORS - Comparing Attributes

COMPARISON
  $eq   =        $ne   <>
  $gt   >        $gte  >=
  $lt   <        $lte  <=

  Examples:
    {"age": 30}                          e.age = :p1
    {"age": {"$ne": 30}}                 e.age <> :p1
    {"hiredAt": {"$lt": "2020-01-01"}}   e.hiredAt < :p1

  Constraints:
    - The literal is converted to the attribute's declared type
    - {"$eq": null} emits IS NULL, {"$ne": null} emits IS NOT NULL
    - $gt, $gte, $lt and $lte cannot compare with null

NULL TESTS
  {"path": {"$isNull": true}}            e.path IS NULL
  {"path": {"$isNull": false}}           e.path IS NOT NULL

    Constraints:
      - The operand must be a JSON boolean

MEMBERSHIP
  {"id": {"$in": [1, 2, 3]}}             e.id IN :p1
  {"id": {"$nin": [1, 2, 3]}}            e.id NOT IN :p1

    The whole list is bound to one parameter.

    Constraints:
      - The list cannot be empty
      - The list cannot contain null; use $isNull instead

PATTERNS
  {"name": {"$like": "A%"}}              e.name LIKE :p1
  {"name": {"$nlike": "A%"}}             e.name NOT LIKE :p1

  Modifiers:
    "$caseSensitive": false              LOWER(e.name) LIKE LOWER(:p1)
    "$escape": "\\"                      e.name LIKE :p1 ESCAPE :p2

    Constraints:
      - The pattern must be a string
      - The escape must be a single character

ATTRIBUTE OPERANDS
  {"a": {"$gt": {"$attrPath": "b"}}}     e.a > e.b
  {"a": {"$attrPath": "b"}}              e.a = e.b

UNSUPPORTED
  $regex and $nregex are rejected.

ONE OPERATOR PER MAP
  An operand map names exactly one operator. With --lenient, a map naming
  several is resolved by priority:
    attrPath > isNull > lte > gt > lt > gte > ne > eq > nregex > regex
    > nlike > like > nin > in
"#;

const PATHS_DOC: &str = r#"PATHS - Addressing Attributes

DOTTED PATHS
  "department.name"
    Each token after the first names an attribute of the entity the
    previous token points to.

    Constraints:
      - Tokens match [A-Za-z$_][A-Za-z$_0-9]*
      - Every token except the last must be a relation

ALIASES
  "e.name"
    A path starting with a visible alias is resolved from that alias.
    Any other path is resolved from the alias of the enclosing query and
    emitted qualified:

      Filter: {"$alias": "e", "name": "Alice"}
      Where:  e.name = :p1

    Constraints:
      - An alias wins over an attribute of the same name
      - A path naming only an alias is rejected
"#;

const SUBQUERIES_DOC: &str = r#"SUBQUERIES - Correlated EXISTS

$sqlExists / $nSqlExists
  {"$sqlExists": {"$entityName": "Task", "$alias": "t", "$query": map}}
    Holds when (no) row of the entity matches the query.

    Example:
      Filter: {"$alias": "e",
               "$sqlExists": {"$entityName": "Task", "$alias": "t",
                              "$query": {"t.ownerId": {"$attrPath": "e.id"}}}}
      Where:  EXISTS (SELECT t FROM Task t WHERE t.ownerId = e.id)

SCOPING
  An inner query sees the aliases of every query around it. Sibling
  subqueries may reuse an alias; a subquery may not reuse an alias that
  is visible from an enclosing query.
"#;

const SORTING_DOC: &str = r#"SORTING - Order Terms

SYNTAX
  <path> [asc|desc] [nulls first|nulls last]

    Example:
      --order "hiredAt desc nulls last" --order name
      ORDER BY (CASE WHEN e.hiredAt IS NULL THEN 0 ELSE 1 END) DESC,
               e.hiredAt DESC, e.name ASC

    Constraints:
      - Paths are resolved like filter paths, from the root alias
      - Without a nulls clause the store decides where NULLs go
      - Paging (--limit, --offset) applies to the row query only
"#;
