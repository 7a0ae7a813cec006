//! Logical types carried by columns, binds and expressions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CompileError;

/// A database-independent type. Dialects turn these into DDL names and the
/// type registry maps them to value handlers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LogicalType {
    /// Untyped; values pass through by their own shape.
    Null,
    Integer,
    BigInteger,
    SmallInteger,
    Numeric {
        precision: Option<u32>,
        scale: Option<u32>,
        /// Decode to `Value::Decimal` rather than `Value::Float`.
        as_decimal: bool,
    },
    Float {
        as_decimal: bool,
    },
    String {
        length: Option<u32>,
    },
    Text,
    Boolean,
    DateTime {
        timezone: bool,
    },
    Date,
    Time,
    Binary {
        length: Option<u32>,
    },
    Json,
    Uuid,
    Enum {
        name: Option<String>,
        variants: Vec<String>,
    },
    Array(Box<LogicalType>),
    /// A user type resolved through a registered custom handler.
    Custom(String),
}

impl LogicalType {
    pub fn string(length: u32) -> Self {
        LogicalType::String {
            length: Some(length),
        }
    }

    pub fn numeric(precision: u32, scale: u32) -> Self {
        LogicalType::Numeric {
            precision: Some(precision),
            scale: Some(scale),
            as_decimal: true,
        }
    }

    pub fn enumeration(name: Option<&str>, variants: &[&str]) -> Self {
        LogicalType::Enum {
            name: name.map(str::to_string),
            variants: variants.iter().map(|v| v.to_string()).collect(),
        }
    }

    pub fn array(element: LogicalType) -> Self {
        LogicalType::Array(Box::new(element))
    }

    /// The registry key this type resolves through.
    pub fn key(&self) -> TypeKey {
        match self {
            LogicalType::Null => TypeKey::Null,
            LogicalType::Integer | LogicalType::BigInteger | LogicalType::SmallInteger => {
                TypeKey::Integer
            }
            LogicalType::Numeric { .. } | LogicalType::Float { .. } => TypeKey::Numeric,
            LogicalType::String { .. } | LogicalType::Text => TypeKey::String,
            LogicalType::Boolean => TypeKey::Boolean,
            LogicalType::DateTime { .. } => TypeKey::DateTime,
            LogicalType::Date => TypeKey::Date,
            LogicalType::Time => TypeKey::Time,
            LogicalType::Binary { .. } => TypeKey::Binary,
            LogicalType::Json => TypeKey::Json,
            LogicalType::Uuid => TypeKey::Uuid,
            LogicalType::Enum { .. } => TypeKey::Enum,
            LogicalType::Array(_) => TypeKey::Array,
            LogicalType::Custom(name) => TypeKey::Custom(name.clone()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, LogicalType::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            LogicalType::Integer
                | LogicalType::BigInteger
                | LogicalType::SmallInteger
                | LogicalType::Numeric { .. }
                | LogicalType::Float { .. }
        )
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalType::Null => write!(f, "NullType"),
            LogicalType::Integer => write!(f, "Integer"),
            LogicalType::BigInteger => write!(f, "BigInteger"),
            LogicalType::SmallInteger => write!(f, "SmallInteger"),
            LogicalType::Numeric {
                precision, scale, ..
            } => match (precision, scale) {
                (Some(p), Some(s)) => write!(f, "Numeric({}, {})", p, s),
                (Some(p), None) => write!(f, "Numeric({})", p),
                _ => write!(f, "Numeric"),
            },
            LogicalType::Float { .. } => write!(f, "Float"),
            LogicalType::String { length: Some(n) } => write!(f, "String({})", n),
            LogicalType::String { length: None } => write!(f, "String"),
            LogicalType::Text => write!(f, "Text"),
            LogicalType::Boolean => write!(f, "Boolean"),
            LogicalType::DateTime { timezone: true } => write!(f, "DateTime(timezone)"),
            LogicalType::DateTime { timezone: false } => write!(f, "DateTime"),
            LogicalType::Date => write!(f, "Date"),
            LogicalType::Time => write!(f, "Time"),
            LogicalType::Binary { .. } => write!(f, "Binary"),
            LogicalType::Json => write!(f, "Json"),
            LogicalType::Uuid => write!(f, "Uuid"),
            LogicalType::Enum { name: Some(n), .. } => write!(f, "Enum({})", n),
            LogicalType::Enum { name: None, .. } => write!(f, "Enum"),
            LogicalType::Array(inner) => write!(f, "Array({})", inner),
            LogicalType::Custom(name) => write!(f, "{}", name),
        }
    }
}

/// Registry key: the family of logical types one handler serves.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TypeKey {
    Null,
    Integer,
    Numeric,
    String,
    Boolean,
    DateTime,
    Date,
    Time,
    Binary,
    Json,
    Uuid,
    Enum,
    Array,
    Custom(String),
}

impl TypeKey {
    pub const BUILTIN: [TypeKey; 13] = [
        TypeKey::Null,
        TypeKey::Integer,
        TypeKey::Numeric,
        TypeKey::String,
        TypeKey::Boolean,
        TypeKey::DateTime,
        TypeKey::Date,
        TypeKey::Time,
        TypeKey::Binary,
        TypeKey::Json,
        TypeKey::Uuid,
        TypeKey::Enum,
        TypeKey::Array,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            TypeKey::Null => "null",
            TypeKey::Integer => "integer",
            TypeKey::Numeric => "numeric",
            TypeKey::String => "string",
            TypeKey::Boolean => "boolean",
            TypeKey::DateTime => "datetime",
            TypeKey::Date => "date",
            TypeKey::Time => "time",
            TypeKey::Binary => "binary",
            TypeKey::Json => "json",
            TypeKey::Uuid => "uuid",
            TypeKey::Enum => "enum",
            TypeKey::Array => "array",
            TypeKey::Custom(name) => name,
        }
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TypeKey {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = match s.to_lowercase().as_str() {
            "null" => TypeKey::Null,
            "integer" | "int" => TypeKey::Integer,
            "numeric" | "decimal" | "float" => TypeKey::Numeric,
            "string" | "text" | "varchar" => TypeKey::String,
            "boolean" | "bool" => TypeKey::Boolean,
            "datetime" | "timestamp" => TypeKey::DateTime,
            "date" => TypeKey::Date,
            "time" => TypeKey::Time,
            "binary" | "bytes" => TypeKey::Binary,
            "json" => TypeKey::Json,
            "uuid" => TypeKey::Uuid,
            "enum" => TypeKey::Enum,
            "array" => TypeKey::Array,
            "" => return Err(CompileError::config("empty type key")),
            _ => TypeKey::Custom(s.to_string()),
        };
        Ok(key)
    }
}

impl TryFrom<String> for TypeKey {
    type Error = CompileError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TypeKey> for String {
    fn from(key: TypeKey) -> Self {
        key.as_str().to_string()
    }
}
