//! Type registry: per logical type, an SQL name resolver, a bind encoder and
//! a result decoder.
//!
//! Handlers are registered once, when the [`TypeRegistry`] is built, and are
//! read-only afterwards. The compiler pairs each parameter and result column
//! with a [`HandlerRef`]: the handler plus the exact logical type it serves.

pub mod registry;
pub mod scalar;
pub mod structured;
pub mod temporal;
pub mod numeric;

pub use registry::{TypeRegistry, TypeRegistryBuilder};

use std::fmt;
use std::sync::Arc;

use crate::ast::{LogicalType, TypeKey, Value};
use crate::dialect::DialectProfile;
use crate::error::{CompileError, CompileResult};

/// A value as exchanged with a database driver.
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Json(serde_json::Value),
    Array(Vec<WireValue>),
}

impl WireValue {
    pub fn kind_name(&self) -> &'static str {
        match self {
            WireValue::Null => "null",
            WireValue::Bool(_) => "bool",
            WireValue::Int(_) => "int",
            WireValue::Float(_) => "float",
            WireValue::Text(_) => "text",
            WireValue::Bytes(_) => "bytes",
            WireValue::Json(_) => "json",
            WireValue::Array(_) => "array",
        }
    }
}

/// What a handler may consult while converting.
#[derive(Clone, Copy)]
pub struct TypeContext<'a> {
    pub registry: &'a TypeRegistry,
    pub dialect: &'a DialectProfile,
}

/// Conversion strategy for one family of logical types.
///
/// Implementations must be total over their domain: any value they cannot
/// represent is a [`CompileError::TypeCoercion`], never a silent truncation.
pub trait TypeHandler: Send + Sync {
    /// Display name, e.g. `IntegerHandler`.
    fn name(&self) -> &str;

    fn key(&self) -> TypeKey;

    /// SQL type name for DDL and CAST.
    fn sql_name(&self, ty: &LogicalType, ctx: &TypeContext<'_>) -> CompileResult<String> {
        ctx.dialect.type_compiler.type_name(ty)
    }

    fn encode(&self, ty: &LogicalType, value: &Value, ctx: &TypeContext<'_>)
    -> CompileResult<WireValue>;

    fn decode(&self, ty: &LogicalType, wire: &WireValue, ctx: &TypeContext<'_>)
    -> CompileResult<Value>;

    /// SQL literal text for literal-binds rendering.
    fn render_literal(
        &self,
        ty: &LogicalType,
        value: &Value,
        _ctx: &TypeContext<'_>,
    ) -> CompileResult<String> {
        Err(CompileError::compile(format!(
            "No literal value renderer is available for literal value {} with datatype {}",
            value, ty
        )))
    }
}

/// Shorthand for the coercion error of one handler.
pub(crate) fn mismatch(ty: &LogicalType, what: &str, got: &str) -> CompileError {
    CompileError::coercion(ty.to_string(), format!("expected {}, got {}", what, got))
}

/// A handler bound to the logical type it converts.
#[derive(Clone)]
pub struct HandlerRef {
    handler: Arc<dyn TypeHandler>,
    ty: LogicalType,
    registry: Arc<TypeRegistry>,
}

impl HandlerRef {
    pub(crate) fn new(
        handler: Arc<dyn TypeHandler>,
        ty: LogicalType,
        registry: Arc<TypeRegistry>,
    ) -> Self {
        Self {
            handler,
            ty,
            registry,
        }
    }

    pub fn name(&self) -> &str {
        self.handler.name()
    }

    pub fn ty(&self) -> &LogicalType {
        &self.ty
    }

    fn ctx<'a>(&'a self, dialect: &'a DialectProfile) -> TypeContext<'a> {
        TypeContext {
            registry: &self.registry,
            dialect,
        }
    }

    pub fn sql_name(&self, dialect: &DialectProfile) -> CompileResult<String> {
        self.handler.sql_name(&self.ty, &self.ctx(dialect))
    }

    /// NULL passes through every handler unchanged.
    pub fn encode(&self, value: &Value, dialect: &DialectProfile) -> CompileResult<WireValue> {
        if value.is_null() {
            return Ok(WireValue::Null);
        }
        self.handler.encode(&self.ty, value, &self.ctx(dialect))
    }

    pub fn decode(&self, wire: &WireValue, dialect: &DialectProfile) -> CompileResult<Value> {
        if matches!(wire, WireValue::Null) {
            return Ok(Value::Null);
        }
        self.handler.decode(&self.ty, wire, &self.ctx(dialect))
    }

    pub fn render_literal(&self, value: &Value, dialect: &DialectProfile) -> CompileResult<String> {
        if value.is_null() {
            return Ok("NULL".to_string());
        }
        self.handler.render_literal(&self.ty, value, &self.ctx(dialect))
    }
}

impl PartialEq for HandlerRef {
    fn eq(&self, other: &Self) -> bool {
        self.handler.name() == other.handler.name() && self.ty == other.ty
    }
}

impl fmt::Debug for HandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.handler.name(), self.ty)
    }
}

impl fmt::Display for HandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.handler.name())
    }
}
