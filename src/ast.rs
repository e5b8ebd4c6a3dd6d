//! # MQL Expression Tree
//!
//! This module defines the mutable expression tree a filter is parsed into and
//! the compiler rewrites in place.
//!
//! ## Architecture Overview
//!
//! - **[node]** - Node kinds, labels, payloads and the compiled fragment slot
//! - **[registry]** - The arena that owns every node of one compile pass, with
//!   parent/child bookkeeping and iterative pre-/post-order traversal
//! - **[operators]** - Closed enumerations of clauses and value operators,
//!   including the operator priority table and the emitted symbols
//!
//! ## Shape of a parsed filter
//!
//! ```text
//! {"$alias": "e", "age": {"$gte": 18}, "$or": [{"name": "a"}, {"name": "b"}]}
//! ```
//!
//! parses into
//!
//! ```text
//! ROOT
//! └── CLAUSE sqlExists
//!     ├── TERM entityName "Employee"
//!     ├── TERM alias "e"
//!     └── TERM query
//!         └── CLAUSE and
//!             ├── VALUE_OPERATOR gte
//!             │   ├── ATTRIBUTE_PATH age
//!             │   └── LITERAL 18
//!             └── CLAUSE or
//!                 ├── CLAUSE and
//!                 │   └── VALUE_OPERATOR eq (name, "a")
//!                 └── CLAUSE and
//!                     └── VALUE_OPERATOR eq (name, "b")
//! ```
//!
//! Nodes are addressed by [`NodeId`]s handed out by the [`Registry`]; there are
//! no owning pointers between nodes, so arbitrarily deep filters never need
//! recursive drops or recursive walks.
pub mod node;
pub mod operators;
pub mod registry;

pub use node::{Node, NodeId, NodeKind, NodeValue};
pub use operators::{ClauseKind, Label, TermKind, ValueOperator};
pub use registry::{Ancestors, PostOrder, PreOrder, Registry};
