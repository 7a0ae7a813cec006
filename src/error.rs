//! Error types for sqlcraft.

use thiserror::Error;

/// Category of a [`CompileError`], for callers that branch on the kind of
/// failure rather than on the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Argument,
    NoForeignKey,
    AmbiguousJoin,
    Compile,
    Identifier,
    NoReferencedTable,
    NoReferencedColumn,
    TypeCoercion,
    Config,
    Io,
}

/// The main error type for statement construction and compilation.
#[derive(Debug, Error)]
pub enum CompileError {
    /// Malformed input to a builder or compile call.
    #[error("Argument error: {0}")]
    Argument(String),

    /// Join inference found no foreign key between the two sides.
    #[error("Can't find any foreign key relationships between '{left}' and '{right}'")]
    NoForeignKey { left: String, right: String },

    /// Join inference found more than one foreign key path.
    #[error(
        "Can't determine join between '{left}' and '{right}'; tables have more than one foreign key constraint relationship between them: {}",
        candidates.join(", ")
    )]
    AmbiguousJoin {
        left: String,
        right: String,
        candidates: Vec<String>,
    },

    /// The statement cannot be expressed in the target dialect.
    #[error("Compile error: {0}")]
    Compile(String),

    /// A name exceeds the dialect limit and cannot be truncated.
    #[error("Identifier '{name}' exceeds maximum length of {limit} characters")]
    Identifier { name: String, limit: usize },

    /// A foreign key names a table missing from the metadata.
    #[error("Foreign key on table '{table}' references unknown table '{referenced}'")]
    NoReferencedTable { table: String, referenced: String },

    /// A foreign key names a column missing from its referenced table.
    #[error("Foreign key on table '{table}' references unknown column '{referenced}.{column}'")]
    NoReferencedColumn {
        table: String,
        referenced: String,
        column: String,
    },

    /// A value could not be converted to or from its logical type.
    #[error("Cannot coerce value for type {type_name}: {message}")]
    TypeCoercion { type_name: String, message: String },

    /// Invalid dialect profile or catalog configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CompileError {
    /// Create an argument error.
    pub fn argument(message: impl Into<String>) -> Self {
        Self::Argument(message.into())
    }

    /// Create a compile error.
    pub fn compile(message: impl Into<String>) -> Self {
        Self::Compile(message.into())
    }

    /// Create a type coercion error for the named type.
    pub fn coercion(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TypeCoercion {
            type_name: type_name.into(),
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Argument(_) => ErrorKind::Argument,
            Self::NoForeignKey { .. } => ErrorKind::NoForeignKey,
            Self::AmbiguousJoin { .. } => ErrorKind::AmbiguousJoin,
            Self::Compile(_) => ErrorKind::Compile,
            Self::Identifier { .. } => ErrorKind::Identifier,
            Self::NoReferencedTable { .. } => ErrorKind::NoReferencedTable,
            Self::NoReferencedColumn { .. } => ErrorKind::NoReferencedColumn,
            Self::TypeCoercion { .. } => ErrorKind::TypeCoercion,
            Self::Config(_) => ErrorKind::Config,
            Self::Io(_) => ErrorKind::Io,
        }
    }
}

/// Result type alias for sqlcraft operations.
pub type CompileResult<T> = Result<T, CompileError>;
