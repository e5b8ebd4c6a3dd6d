pub mod ast;
pub mod cli;
pub mod compiler;
pub mod convert;
pub mod error;
pub mod params;
pub mod parser;
pub mod path;
pub mod schema;
pub mod scope;
pub mod sort;
pub mod value;

pub use ast::{ClauseKind, Node, NodeId, NodeKind, NodeValue, Registry, ValueOperator};
pub use compiler::{CompileOptions, CompiledQuery, Compiler, Statement};
pub use convert::{JsonTypeConverter, TypeConverter};
pub use error::{ErrorKind, MqlError};
pub use params::ParameterTable;
pub use parser::{ExpressionTree, ParseResult, Parser, ParserOptions, decode_filter};
pub use path::AttributePath;
pub use schema::{AttributeType, EntityType, SchemaResolver, StaticSchema, ValueType};
pub use scope::{ContextTree, SubQueryContext};
pub use sort::{NullOrder, Order};
pub use value::Value;
