//! Compile filters given as JSON text

use super::{CliError, compiled_to_json};
use crate::{
    CompileOptions, Compiler, JsonTypeConverter, MqlError, Order, Parser, ParserOptions,
    StaticSchema, decode_filter,
};

/// Options for the compile command
#[derive(Debug, Clone, Default)]
pub struct CompileCommand {
    /// Filter JSON text
    pub filter: Option<String>,
    /// Schema JSON text, required unless `syntax_only` is set
    pub schema: Option<String>,
    /// Entity of the root query
    pub entity: Option<String>,
    /// Alias of the root query
    pub alias: Option<String>,
    /// Order terms such as `name desc nulls last`
    pub order_by: Vec<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    /// Resolve operand maps with several operators by priority
    pub lenient: bool,
    /// Only validate syntax, don't compile
    pub syntax_only: bool,
}

/// Result of a compile operation
#[derive(Debug)]
pub enum CompileResult {
    /// Syntax validation passed
    SyntaxValid,
    /// Filter compiled; statements and parameters as JSON
    Success(serde_json::Value),
}

impl CompileCommand {
    fn compile_options(&self) -> Result<CompileOptions, MqlError> {
        let order_by = self
            .order_by
            .iter()
            .map(|term| term.parse::<Order>())
            .collect::<Result<Vec<_>, _>>()?;

        Ok(CompileOptions {
            entity: self.entity.clone(),
            alias: self.alias.clone(),
            order_by,
            max_rows: self.limit,
            first_row: self.offset.unwrap_or(0),
            strict_operands: !self.lenient,
        })
    }
}

/// Execute an mql compile operation
pub fn execute_compile(command: &CompileCommand) -> Result<CompileResult, CliError> {
    let text = command.filter.as_deref().ok_or(CliError::NoInput)?;
    let filter = decode_filter(text)?;

    if command.syntax_only {
        let parser_options = ParserOptions {
            entity_name: command.entity.clone(),
            alias: command.alias.clone(),
            strict_operands: !command.lenient,
        };
        Parser::from_value(&filter, parser_options)
            .and_then(Parser::parse)
            .map_err(CliError::Parse)?;
        return Ok(CompileResult::SyntaxValid);
    }

    let schema_text = command
        .schema
        .as_deref()
        .ok_or_else(|| CliError::Compile(MqlError::configuration("No schema given")))?;
    let schema = StaticSchema::from_json(schema_text).map_err(CliError::Compile)?;
    let converter = JsonTypeConverter::new();

    let options = command.compile_options().map_err(CliError::Compile)?;
    let compiler = Compiler::new(&schema, &converter, options).map_err(CliError::Compile)?;
    let compiled = compiler.compile(&filter).map_err(CliError::Compile)?;

    Ok(CompileResult::Success(compiled_to_json(&compiled)))
}
