/// Category of a compile failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Syntax,
    Configuration,
    Conversion,
}

/// Errors produced while parsing or compiling a filter.
///
/// Every variant is terminal: a compile call that fails produces no partial
/// output and is not retried.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MqlError {
    /// Malformed filter shape, unresolvable alias or attribute path,
    /// duplicate alias, invalid operand, or an unsupported operator.
    #[error("Syntax error: {0}")]
    Syntax(String),

    /// A required compile input is missing or contradictory.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A literal could not be converted to the resolved attribute type.
    #[error("Conversion error: {0}")]
    Conversion(String),
}

impl MqlError {
    pub fn syntax(msg: impl Into<String>) -> Self {
        MqlError::Syntax(msg.into())
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        MqlError::Configuration(msg.into())
    }

    pub fn conversion(msg: impl Into<String>) -> Self {
        MqlError::Conversion(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            MqlError::Syntax(_) => ErrorKind::Syntax,
            MqlError::Configuration(_) => ErrorKind::Configuration,
            MqlError::Conversion(_) => ErrorKind::Conversion,
        }
    }
}
