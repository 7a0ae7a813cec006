//! JSON, ENUM and ARRAY handlers.

use super::{TypeContext, TypeHandler, WireValue, mismatch};
use crate::ast::{LogicalType, TypeKey, Value};
use crate::dialect::TypeFamily;
use crate::error::{CompileError, CompileResult};

pub struct JsonHandler;

impl JsonHandler {
    fn to_json(ty: &LogicalType, value: &Value) -> CompileResult<serde_json::Value> {
        let json = match value {
            Value::Json(j) => j.clone(),
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(n) => serde_json::Value::from(*n),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .ok_or_else(|| mismatch(ty, "a finite number", &f.to_string()))?,
            Value::String(s) => serde_json::Value::String(s.clone()),
            other => return Err(mismatch(ty, "a JSON document", other.kind_name())),
        };
        Ok(json)
    }
}

impl TypeHandler for JsonHandler {
    fn name(&self) -> &str {
        "JsonHandler"
    }

    fn key(&self) -> TypeKey {
        TypeKey::Json
    }

    fn encode(&self, ty: &LogicalType, value: &Value, ctx: &TypeContext<'_>) -> CompileResult<WireValue> {
        let json = Self::to_json(ty, value)?;
        if ctx.dialect.quirks.native_json {
            Ok(WireValue::Json(json))
        } else {
            Ok(WireValue::Text(json.to_string()))
        }
    }

    fn decode(&self, ty: &LogicalType, wire: &WireValue, _ctx: &TypeContext<'_>) -> CompileResult<Value> {
        let parsed = match wire {
            WireValue::Json(j) => return Ok(Value::Json(j.clone())),
            WireValue::Text(s) => serde_json::from_str(s),
            WireValue::Bytes(b) => serde_json::from_slice(b),
            other => return Err(mismatch(ty, "JSON text", other.kind_name())),
        };
        parsed
            .map(Value::Json)
            .map_err(|e| CompileError::coercion(ty.to_string(), e.to_string()))
    }

    fn render_literal(&self, ty: &LogicalType, value: &Value, ctx: &TypeContext<'_>) -> CompileResult<String> {
        let json = Self::to_json(ty, value)?;
        Ok(ctx.dialect.quote_string(&json.to_string()))
    }
}

/// String enumerations; values outside the declared variants are rejected
/// in both directions.
pub struct EnumHandler;

impl EnumHandler {
    fn check(ty: &LogicalType, s: &str) -> CompileResult<()> {
        if let LogicalType::Enum { variants, .. } = ty {
            if !variants.is_empty() && !variants.iter().any(|v| v == s) {
                return Err(CompileError::coercion(
                    ty.to_string(),
                    format!("'{}' is not among the defined enum values", s),
                ));
            }
        }
        Ok(())
    }
}

impl TypeHandler for EnumHandler {
    fn name(&self) -> &str {
        "EnumHandler"
    }

    fn key(&self) -> TypeKey {
        TypeKey::Enum
    }

    fn sql_name(&self, ty: &LogicalType, ctx: &TypeContext<'_>) -> CompileResult<String> {
        if !ctx.dialect.features.named_enums {
            return ctx.dialect.type_compiler.type_name(ty);
        }
        match ty {
            LogicalType::Enum { name: Some(name), .. } => Ok(ctx.dialect.preparer.quote(name)),
            _ => Err(CompileError::compile(format!(
                "{} ENUM type requires a name.",
                ctx.dialect.name
            ))),
        }
    }

    fn encode(&self, ty: &LogicalType, value: &Value, _ctx: &TypeContext<'_>) -> CompileResult<WireValue> {
        match value {
            Value::String(s) => {
                Self::check(ty, s)?;
                Ok(WireValue::Text(s.clone()))
            }
            other => Err(mismatch(ty, "a string", other.kind_name())),
        }
    }

    fn decode(&self, ty: &LogicalType, wire: &WireValue, _ctx: &TypeContext<'_>) -> CompileResult<Value> {
        match wire {
            WireValue::Text(s) => {
                Self::check(ty, s)?;
                Ok(Value::String(s.clone()))
            }
            other => Err(mismatch(ty, "text", other.kind_name())),
        }
    }

    fn render_literal(&self, ty: &LogicalType, value: &Value, ctx: &TypeContext<'_>) -> CompileResult<String> {
        match value {
            Value::String(s) => {
                Self::check(ty, s)?;
                Ok(ctx.dialect.quote_string(s))
            }
            other => Err(mismatch(ty, "a string", other.kind_name())),
        }
    }
}

/// Split `{a,"b,c",NULL}` into elements. Unquoted `NULL` is `None`.
pub fn decode_text_array(s: &str) -> Vec<Option<String>> {
    let s = s.trim();
    let inner = s.strip_prefix('{').and_then(|s| s.strip_suffix('}')).unwrap_or(s);
    if inner.is_empty() {
        return vec![];
    }

    let mut result = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut in_quotes = false;
    let mut escape_next = false;

    for c in inner.chars() {
        if escape_next {
            current.push(c);
            escape_next = false;
            continue;
        }

        match c {
            '\\' => escape_next = true,
            '"' => {
                in_quotes = !in_quotes;
                quoted = true;
            }
            ',' if !in_quotes => {
                result.push(text_element(std::mem::take(&mut current), quoted));
                quoted = false;
            }
            _ => current.push(c),
        }
    }
    result.push(text_element(current, quoted));

    result
}

fn text_element(raw: String, quoted: bool) -> Option<String> {
    if !quoted && raw.eq_ignore_ascii_case("null") {
        None
    } else {
        Some(raw)
    }
}

/// One-dimensional arrays; elements go through the handler of the element
/// type.
pub struct ArrayHandler;

impl ArrayHandler {
    fn element<'t>(
        ty: &'t LogicalType,
        ctx: &TypeContext<'_>,
    ) -> CompileResult<(&'t LogicalType, std::sync::Arc<dyn TypeHandler>)> {
        let LogicalType::Array(inner) = ty else {
            return Err(mismatch(ty, "an array type", &ty.to_string()));
        };
        let handler = ctx
            .registry
            .handler(&inner.key(), &ctx.dialect.name)
            .ok_or_else(|| {
                CompileError::compile(format!(
                    "No type handler registered for type '{}'",
                    inner.key()
                ))
            })?;
        Ok((inner.as_ref(), handler))
    }

    fn supported(ctx: &TypeContext<'_>) -> CompileResult<()> {
        if ctx.dialect.type_compiler.family == TypeFamily::Postgresql {
            Ok(())
        } else {
            Err(CompileError::compile(format!(
                "Dialect {} does not support ARRAY types",
                ctx.dialect.name
            )))
        }
    }
}

impl TypeHandler for ArrayHandler {
    fn name(&self) -> &str {
        "ArrayHandler"
    }

    fn key(&self) -> TypeKey {
        TypeKey::Array
    }

    fn sql_name(&self, ty: &LogicalType, ctx: &TypeContext<'_>) -> CompileResult<String> {
        Self::supported(ctx)?;
        let (inner, handler) = Self::element(ty, ctx)?;
        Ok(format!("{}[]", handler.sql_name(inner, ctx)?))
    }

    fn encode(&self, ty: &LogicalType, value: &Value, ctx: &TypeContext<'_>) -> CompileResult<WireValue> {
        let Value::Array(items) = value else {
            return Err(mismatch(ty, "an array", value.kind_name()));
        };
        let (inner, handler) = Self::element(ty, ctx)?;
        items
            .iter()
            .map(|item| match item {
                Value::Null => Ok(WireValue::Null),
                v => handler.encode(inner, v, ctx),
            })
            .collect::<CompileResult<Vec<_>>>()
            .map(WireValue::Array)
    }

    fn decode(&self, ty: &LogicalType, wire: &WireValue, ctx: &TypeContext<'_>) -> CompileResult<Value> {
        let (inner, handler) = Self::element(ty, ctx)?;
        let elements: Vec<WireValue> = match wire {
            WireValue::Array(items) => items.clone(),
            WireValue::Text(s) if ctx.dialect.quirks.array_as_text => decode_text_array(s)
                .into_iter()
                .map(|e| e.map(WireValue::Text).unwrap_or(WireValue::Null))
                .collect(),
            other => return Err(mismatch(ty, "an array", other.kind_name())),
        };
        elements
            .iter()
            .map(|e| match e {
                WireValue::Null => Ok(Value::Null),
                e => handler.decode(inner, e, ctx),
            })
            .collect::<CompileResult<Vec<_>>>()
            .map(Value::Array)
    }

    fn render_literal(&self, ty: &LogicalType, value: &Value, ctx: &TypeContext<'_>) -> CompileResult<String> {
        Self::supported(ctx)?;
        let Value::Array(items) = value else {
            return Err(mismatch(ty, "an array", value.kind_name()));
        };
        let (inner, handler) = Self::element(ty, ctx)?;
        if items.is_empty() {
            return Ok(format!("ARRAY[]::{}[]", handler.sql_name(inner, ctx)?));
        }
        let rendered = items
            .iter()
            .map(|item| match item {
                Value::Null => Ok("NULL".to_string()),
                v => handler.render_literal(inner, v, ctx),
            })
            .collect::<CompileResult<Vec<_>>>()?;
        Ok(format!("ARRAY[{}]", rendered.join(", ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::DialectProfile;
    use crate::error::ErrorKind;
    use crate::types::TypeRegistry;
    use serde_json::json;

    #[test]
    fn test_json_native_and_text() {
        let registry = TypeRegistry::with_builtins();
        let doc = Value::Json(json!({"a": [1, 2], "b": "it's"}));

        let pg = DialectProfile::postgresql();
        let h = registry.resolve(&LogicalType::Json, &pg).unwrap();
        let wire = h.encode(&doc, &pg).unwrap();
        assert!(matches!(wire, WireValue::Json(_)));
        assert_eq!(h.decode(&wire, &pg).unwrap(), doc);

        let lite = DialectProfile::sqlite();
        let wire = h.encode(&doc, &lite).unwrap();
        assert!(matches!(wire, WireValue::Text(_)));
        assert_eq!(h.decode(&wire, &lite).unwrap(), doc);
        assert!(h.decode(&WireValue::Text("{oops".into()), &lite).is_err());
    }

    #[test]
    fn test_enum_validation() {
        let d = DialectProfile::mysql();
        let ty = LogicalType::enumeration(Some("mood"), &["happy", "sad"]);
        let h = TypeRegistry::with_builtins().resolve(&ty, &d).unwrap();
        assert_eq!(h.encode(&Value::from("sad"), &d).unwrap(), WireValue::Text("sad".into()));
        let err = h.encode(&Value::from("meh"), &d).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeCoercion);
        assert_eq!(h.sql_name(&d).unwrap(), "ENUM('happy', 'sad')");
    }

    #[test]
    fn test_named_enum_requires_name() {
        let pg = DialectProfile::postgresql();
        let registry = TypeRegistry::with_builtins();
        let named = registry
            .resolve(&LogicalType::enumeration(Some("mood"), &["a"]), &pg)
            .unwrap();
        assert_eq!(named.sql_name(&pg).unwrap(), "mood");
        let anon = registry
            .resolve(&LogicalType::enumeration(None, &["a"]), &pg)
            .unwrap();
        assert_eq!(
            anon.sql_name(&pg).unwrap_err().to_string(),
            "Compile error: postgresql ENUM type requires a name."
        );
    }

    #[test]
    fn test_decode_text_array() {
        assert_eq!(
            decode_text_array(r#"{a,"b,c",NULL,"NULL","x\"y"}"#),
            vec![
                Some("a".to_string()),
                Some("b,c".to_string()),
                None,
                Some("NULL".to_string()),
                Some("x\"y".to_string()),
            ]
        );
        assert!(decode_text_array("{}").is_empty());
    }

    #[test]
    fn test_array_roundtrip_and_text_quirk() {
        let pg = DialectProfile::postgresql();
        let ty = LogicalType::array(LogicalType::Integer);
        let h = TypeRegistry::with_builtins().resolve(&ty, &pg).unwrap();
        let value = Value::Array(vec![Value::Int(1), Value::Null, Value::Int(3)]);
        let wire = h.encode(&value, &pg).unwrap();
        assert_eq!(h.decode(&wire, &pg).unwrap(), value);
        assert_eq!(h.sql_name(&pg).unwrap(), "INTEGER[]");
        assert_eq!(h.render_literal(&value, &pg).unwrap(), "ARRAY[1, NULL, 3]");

        let text = pg.clone().with_quirks(crate::dialect::DriverQuirks {
            array_as_text: true,
            ..Default::default()
        });
        assert_eq!(
            h.decode(&WireValue::Text("{1,NULL,3}".into()), &text).unwrap(),
            value
        );
    }

    #[test]
    fn test_array_unsupported_outside_postgresql() {
        let my = DialectProfile::mysql();
        let ty = LogicalType::array(LogicalType::Text);
        let h = TypeRegistry::with_builtins().resolve(&ty, &my).unwrap();
        assert!(h.sql_name(&my).is_err());
        assert!(h.render_literal(&Value::from(vec!["a"]), &my).is_err());
    }
}
