//! Inline literal rendering through the type registry.

use std::sync::Arc;

use crate::ast::{BindParam, LogicalType, Value};
use crate::dialect::{DialectProfile, ParamStyle};
use crate::error::{CompileError, CompileResult};
use crate::types::TypeRegistry;

/// SQL text for `value` as a literal of type `ty`. An untyped value renders
/// after its own natural type.
pub(crate) fn render_value(
    registry: &Arc<TypeRegistry>,
    dialect: &DialectProfile,
    ty: &LogicalType,
    value: &Value,
) -> CompileResult<String> {
    let ty = if ty.is_null() {
        value.natural_type()
    } else {
        ty.clone()
    };
    registry.resolve(&ty, dialect)?.render_literal(value, dialect)
}

/// The value a bind parameter renders with in literal-binds mode.
pub(crate) fn bind_value(bind: &BindParam) -> CompileResult<&Value> {
    bind.current_value().ok_or_else(|| {
        CompileError::compile(format!(
            "Bind parameter '{}' without a renderable value not allowed here",
            bind.key()
        ))
    })
}

/// Elements of an expanding bind's value.
pub(crate) fn expanded_items(bind: &BindParam) -> CompileResult<&[Value]> {
    match bind.current_value() {
        Some(Value::Array(items)) => Ok(items),
        Some(other) => Err(CompileError::argument(format!(
            "Expanding bind parameter '{}' requires a list value, got {}",
            bind.key(),
            other.kind_name()
        ))),
        None => Err(CompileError::compile(format!(
            "Expanding bind parameter '{}' needs its list value at compile time",
            bind.key()
        ))),
    }
}

/// Double `%` where the driver would otherwise read it as a placeholder.
pub(crate) fn escape_percent(text: &str, style: ParamStyle, literal_binds: bool) -> String {
    match style {
        ParamStyle::Format | ParamStyle::Pyformat if !literal_binds => text.replace('%', "%%"),
        _ => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::bindparam;

    #[test]
    fn test_render_value_uses_natural_type() {
        let registry = TypeRegistry::with_builtins();
        let d = DialectProfile::postgresql();
        assert_eq!(
            render_value(&registry, &d, &LogicalType::Null, &Value::from("it's")).unwrap(),
            "'it''s'"
        );
        assert_eq!(
            render_value(&registry, &d, &LogicalType::Integer, &Value::Int(42)).unwrap(),
            "42"
        );
        assert_eq!(
            render_value(&registry, &d, &LogicalType::Integer, &Value::Null).unwrap(),
            "NULL"
        );
    }

    #[test]
    fn test_bind_without_value() {
        let err = bind_value(&bindparam("x")).unwrap_err();
        assert!(err.to_string().contains("'x'"));
    }

    #[test]
    fn test_percent_escaping() {
        assert_eq!(escape_percent("a%b", ParamStyle::Format, false), "a%%b");
        assert_eq!(escape_percent("a%b", ParamStyle::Pyformat, false), "a%%b");
        assert_eq!(escape_percent("a%b", ParamStyle::Format, true), "a%b");
        assert_eq!(escape_percent("a%b", ParamStyle::Named, false), "a%b");
    }
}
