//! DDL / CAST type names per dialect family.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ast::{LogicalType, TypeKey};
use crate::error::{CompileError, CompileResult};

/// Which grammar the type names follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeFamily {
    Generic,
    Postgresql,
    Mysql,
    Sqlite,
    Oracle,
    Mssql,
}

/// Turns logical types into SQL type names. `overrides` replaces the name
/// of a whole type family, e.g. `json = "JSONB"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCompiler {
    pub family: TypeFamily,
    #[serde(default)]
    pub overrides: BTreeMap<TypeKey, String>,
}

fn sized(name: &str, length: Option<u32>) -> String {
    match length {
        Some(n) => format!("{}({})", name, n),
        None => name.to_string(),
    }
}

fn quote_variant(v: &str) -> String {
    format!("'{}'", v.replace('\'', "''"))
}

impl TypeCompiler {
    pub fn new(family: TypeFamily) -> Self {
        Self {
            family,
            overrides: BTreeMap::new(),
        }
    }

    pub fn with_override(mut self, key: TypeKey, name: impl Into<String>) -> Self {
        self.overrides.insert(key, name.into());
        self
    }

    /// SQL name of a scalar type. Arrays and custom types are named by their
    /// handlers.
    pub fn type_name(&self, ty: &LogicalType) -> CompileResult<String> {
        if let Some(name) = self.overrides.get(&ty.key()) {
            return Ok(name.clone());
        }
        use TypeFamily::*;
        let f = self.family;
        let name = match ty {
            LogicalType::Null => {
                return Err(CompileError::compile(
                    "Can't generate DDL for an untyped (NullType) column",
                ));
            }
            LogicalType::Integer => "INTEGER".to_string(),
            LogicalType::BigInteger => match f {
                Oracle => "NUMBER(19)".to_string(),
                _ => "BIGINT".to_string(),
            },
            LogicalType::SmallInteger => match f {
                Oracle => "NUMBER(5)".to_string(),
                _ => "SMALLINT".to_string(),
            },
            LogicalType::Numeric {
                precision, scale, ..
            } => {
                let base = if f == Oracle { "NUMBER" } else { "NUMERIC" };
                match (precision, scale) {
                    (Some(p), Some(s)) => format!("{}({}, {})", base, p, s),
                    (Some(p), None) => format!("{}({})", base, p),
                    _ => base.to_string(),
                }
            }
            LogicalType::Float { .. } => match f {
                Postgresql => "DOUBLE PRECISION".to_string(),
                Mysql => "DOUBLE".to_string(),
                Sqlite => "REAL".to_string(),
                Oracle => "BINARY_DOUBLE".to_string(),
                Mssql | Generic => "FLOAT".to_string(),
            },
            LogicalType::String { length } => match (f, length) {
                (Oracle, _) => sized("VARCHAR2", *length),
                (Mssql, _) => sized("NVARCHAR", *length),
                (Mysql, None) => {
                    return Err(CompileError::compile(
                        "VARCHAR requires a length on dialect mysql",
                    ));
                }
                _ => sized("VARCHAR", *length),
            },
            LogicalType::Text => match f {
                Oracle => "CLOB".to_string(),
                Mssql => "NVARCHAR(max)".to_string(),
                _ => "TEXT".to_string(),
            },
            LogicalType::Boolean => match f {
                Mssql => "BIT".to_string(),
                Oracle => "NUMBER(1)".to_string(),
                Mysql => "BOOL".to_string(),
                _ => "BOOLEAN".to_string(),
            },
            LogicalType::DateTime { timezone } => match (f, timezone) {
                (Postgresql, true) => "TIMESTAMP WITH TIME ZONE".to_string(),
                (Oracle, true) => "TIMESTAMP WITH TIME ZONE".to_string(),
                (Mssql, true) => "DATETIMEOFFSET".to_string(),
                (Mysql, _) | (Sqlite, _) => "DATETIME".to_string(),
                (Mssql, false) => "DATETIME2".to_string(),
                _ => "TIMESTAMP".to_string(),
            },
            LogicalType::Date => "DATE".to_string(),
            LogicalType::Time => match f {
                Oracle => "INTERVAL DAY TO SECOND".to_string(),
                _ => "TIME".to_string(),
            },
            LogicalType::Binary { length } => match f {
                Postgresql => "BYTEA".to_string(),
                Oracle => "BLOB".to_string(),
                Sqlite => "BLOB".to_string(),
                Mysql | Mssql => match length {
                    Some(n) => format!("VARBINARY({})", n),
                    None if f == Mssql => "VARBINARY(max)".to_string(),
                    None => "BLOB".to_string(),
                },
                Generic => sized("VARBINARY", *length),
            },
            LogicalType::Json => match f {
                Postgresql | Mysql | Sqlite | Generic => "JSON".to_string(),
                Oracle => "CLOB".to_string(),
                Mssql => "NVARCHAR(max)".to_string(),
            },
            LogicalType::Uuid => match f {
                Postgresql | Generic => "UUID".to_string(),
                Mssql => "UNIQUEIDENTIFIER".to_string(),
                Mysql | Sqlite | Oracle => "CHAR(32)".to_string(),
            },
            LogicalType::Enum { name, variants } => match f {
                Postgresql => match name {
                    Some(n) => n.clone(),
                    None => {
                        return Err(CompileError::compile(
                            "PostgreSQL ENUM type requires a name.",
                        ));
                    }
                },
                Mysql => format!(
                    "ENUM({})",
                    variants.iter().map(|v| quote_variant(v)).collect::<Vec<_>>().join(", ")
                ),
                _ => {
                    let width = variants.iter().map(|v| v.chars().count()).max().unwrap_or(1);
                    sized("VARCHAR", Some(width as u32))
                }
            },
            LogicalType::Array(_) | LogicalType::Custom(_) => {
                return Err(CompileError::compile(format!(
                    "Type {} has no built-in SQL name; its handler must provide one",
                    ty
                )));
            }
        };
        Ok(name)
    }
}
