//! Untyped, integer, boolean, string, binary and UUID handlers.

use rust_decimal::prelude::ToPrimitive;
use uuid::Uuid;

use super::{TypeContext, TypeHandler, WireValue, mismatch};
use crate::ast::{LogicalType, TypeKey, Value};
use crate::dialect::TypeFamily;
use crate::error::{CompileError, CompileResult};

/// Shape-preserving conversion used for untyped values.
pub(crate) fn natural_wire(value: &Value) -> WireValue {
    match value {
        Value::Null => WireValue::Null,
        Value::Bool(b) => WireValue::Bool(*b),
        Value::Int(n) => WireValue::Int(*n),
        Value::Float(f) => WireValue::Float(*f),
        Value::Decimal(d) => WireValue::Text(d.to_string()),
        Value::String(s) => WireValue::Text(s.clone()),
        Value::Bytes(b) => WireValue::Bytes(b.clone()),
        Value::Uuid(u) => WireValue::Text(u.hyphenated().to_string()),
        Value::Json(j) => WireValue::Json(j.clone()),
        Value::Timestamp(ts) => WireValue::Text(ts.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
        Value::Date(d) => WireValue::Text(d.format("%Y-%m-%d").to_string()),
        Value::Time(t) => WireValue::Text(t.format("%H:%M:%S%.f").to_string()),
        Value::Array(items) => WireValue::Array(items.iter().map(natural_wire).collect()),
    }
}

fn natural_value(wire: &WireValue) -> Value {
    match wire {
        WireValue::Null => Value::Null,
        WireValue::Bool(b) => Value::Bool(*b),
        WireValue::Int(n) => Value::Int(*n),
        WireValue::Float(f) => Value::Float(*f),
        WireValue::Text(s) => Value::String(s.clone()),
        WireValue::Bytes(b) => Value::Bytes(b.clone()),
        WireValue::Json(j) => Value::Json(j.clone()),
        WireValue::Array(items) => Value::Array(items.iter().map(natural_value).collect()),
    }
}

/// Handler for values with no declared type.
pub struct NullHandler;

impl TypeHandler for NullHandler {
    fn name(&self) -> &str {
        "NullHandler"
    }

    fn key(&self) -> TypeKey {
        TypeKey::Null
    }

    fn encode(&self, _ty: &LogicalType, value: &Value, _ctx: &TypeContext<'_>) -> CompileResult<WireValue> {
        Ok(natural_wire(value))
    }

    fn decode(&self, _ty: &LogicalType, wire: &WireValue, _ctx: &TypeContext<'_>) -> CompileResult<Value> {
        Ok(natural_value(wire))
    }

    /// Untyped values render by their own shape when that shape has an
    /// unambiguous literal form.
    fn render_literal(&self, ty: &LogicalType, value: &Value, ctx: &TypeContext<'_>) -> CompileResult<String> {
        let d = ctx.dialect;
        match value {
            Value::Null => Ok("NULL".to_string()),
            Value::Bool(b) => Ok(d.bool_literal(*b).to_string()),
            Value::Int(n) => Ok(n.to_string()),
            Value::Float(f) if f.is_finite() => Ok(format!("{:?}", f)),
            Value::Decimal(dec) => Ok(dec.to_string()),
            Value::String(s) => Ok(d.quote_string(s)),
            Value::Bytes(b) => Ok(d.binary_literal(b)),
            Value::Uuid(u) => Ok(d.quote_string(&u.hyphenated().to_string())),
            Value::Json(j) => Ok(d.quote_string(&j.to_string())),
            Value::Timestamp(ts) => Ok(d.quote_string(&ts.format("%Y-%m-%d %H:%M:%S%.f").to_string())),
            Value::Date(dt) => Ok(d.quote_string(&dt.format("%Y-%m-%d").to_string())),
            Value::Time(t) => Ok(d.quote_string(&t.format("%H:%M:%S%.f").to_string())),
            other => Err(CompileError::compile(format!(
                "No literal value renderer is available for literal value {} with datatype {}",
                other, ty
            ))),
        }
    }
}

fn integer_bounds(ty: &LogicalType) -> (i64, i64) {
    match ty {
        LogicalType::SmallInteger => (i16::MIN as i64, i16::MAX as i64),
        LogicalType::Integer => (i32::MIN as i64, i32::MAX as i64),
        _ => (i64::MIN, i64::MAX),
    }
}

fn checked_integer(ty: &LogicalType, n: i64) -> CompileResult<i64> {
    let (lo, hi) = integer_bounds(ty);
    if n < lo || n > hi {
        return Err(CompileError::coercion(
            ty.to_string(),
            format!("value {} out of range", n),
        ));
    }
    Ok(n)
}

fn integral_float(ty: &LogicalType, f: f64) -> CompileResult<i64> {
    if !f.is_finite() || f.fract() != 0.0 || f < i64::MIN as f64 || f >= i64::MAX as f64 {
        return Err(CompileError::coercion(
            ty.to_string(),
            format!("{} is not an integer", f),
        ));
    }
    checked_integer(ty, f as i64)
}

/// INTEGER, BIGINT and SMALLINT, range-checked per width.
pub struct IntegerHandler;

impl TypeHandler for IntegerHandler {
    fn name(&self) -> &str {
        "IntegerHandler"
    }

    fn key(&self) -> TypeKey {
        TypeKey::Integer
    }

    fn encode(&self, ty: &LogicalType, value: &Value, _ctx: &TypeContext<'_>) -> CompileResult<WireValue> {
        let n = match value {
            Value::Int(n) => checked_integer(ty, *n)?,
            Value::Bool(b) => *b as i64,
            Value::Float(f) => integral_float(ty, *f)?,
            Value::Decimal(d) if d.fract().is_zero() => {
                let n = d.to_i64().ok_or_else(|| {
                    CompileError::coercion(ty.to_string(), format!("value {} out of range", d))
                })?;
                checked_integer(ty, n)?
            }
            other => return Err(mismatch(ty, "an integer", other.kind_name())),
        };
        Ok(WireValue::Int(n))
    }

    fn decode(&self, ty: &LogicalType, wire: &WireValue, _ctx: &TypeContext<'_>) -> CompileResult<Value> {
        let n = match wire {
            WireValue::Int(n) => checked_integer(ty, *n)?,
            WireValue::Bool(b) => *b as i64,
            WireValue::Float(f) => integral_float(ty, *f)?,
            WireValue::Text(s) => {
                let n = s.trim().parse::<i64>().map_err(|e| {
                    CompileError::coercion(ty.to_string(), format!("'{}': {}", s, e))
                })?;
                checked_integer(ty, n)?
            }
            other => return Err(mismatch(ty, "an integer", other.kind_name())),
        };
        Ok(Value::Int(n))
    }

    fn render_literal(&self, ty: &LogicalType, value: &Value, ctx: &TypeContext<'_>) -> CompileResult<String> {
        match self.encode(ty, value, ctx)? {
            WireValue::Int(n) => Ok(n.to_string()),
            other => Err(mismatch(ty, "an integer", other.kind_name())),
        }
    }
}

/// BOOLEAN; accepts 0/1 from drivers that store booleans as integers.
pub struct BooleanHandler;

impl TypeHandler for BooleanHandler {
    fn name(&self) -> &str {
        "BooleanHandler"
    }

    fn key(&self) -> TypeKey {
        TypeKey::Boolean
    }

    fn encode(&self, ty: &LogicalType, value: &Value, ctx: &TypeContext<'_>) -> CompileResult<WireValue> {
        let b = match value {
            Value::Bool(b) => *b,
            Value::Int(0) => false,
            Value::Int(1) => true,
            other => return Err(mismatch(ty, "a boolean or 0/1", &other.to_string())),
        };
        if ctx.dialect.quirks.boolean_as_int {
            Ok(WireValue::Int(b as i64))
        } else {
            Ok(WireValue::Bool(b))
        }
    }

    fn decode(&self, ty: &LogicalType, wire: &WireValue, _ctx: &TypeContext<'_>) -> CompileResult<Value> {
        let b = match wire {
            WireValue::Bool(b) => *b,
            WireValue::Int(0) => false,
            WireValue::Int(1) => true,
            WireValue::Text(s) => match s.to_lowercase().as_str() {
                "t" | "true" | "1" => true,
                "f" | "false" | "0" => false,
                _ => return Err(mismatch(ty, "a boolean", &format!("'{}'", s))),
            },
            WireValue::Int(n) => return Err(mismatch(ty, "0 or 1", &n.to_string())),
            other => return Err(mismatch(ty, "a boolean", other.kind_name())),
        };
        Ok(Value::Bool(b))
    }

    fn render_literal(&self, ty: &LogicalType, value: &Value, ctx: &TypeContext<'_>) -> CompileResult<String> {
        match value {
            Value::Bool(b) => Ok(ctx.dialect.bool_literal(*b).to_string()),
            Value::Int(n @ (0 | 1)) => Ok(ctx.dialect.bool_literal(*n == 1).to_string()),
            other => Err(mismatch(ty, "a boolean", other.kind_name())),
        }
    }
}

fn max_length(ty: &LogicalType) -> Option<u32> {
    match ty {
        LogicalType::String { length } | LogicalType::Binary { length } => *length,
        _ => None,
    }
}

fn check_length(ty: &LogicalType, len: usize) -> CompileResult<()> {
    match max_length(ty) {
        Some(max) if len > max as usize => Err(CompileError::coercion(
            ty.to_string(),
            format!("length {} exceeds {}", len, max),
        )),
        _ => Ok(()),
    }
}

/// VARCHAR and TEXT.
pub struct StringHandler;

impl TypeHandler for StringHandler {
    fn name(&self) -> &str {
        "StringHandler"
    }

    fn key(&self) -> TypeKey {
        TypeKey::String
    }

    fn encode(&self, ty: &LogicalType, value: &Value, _ctx: &TypeContext<'_>) -> CompileResult<WireValue> {
        match value {
            Value::String(s) => {
                check_length(ty, s.chars().count())?;
                Ok(WireValue::Text(s.clone()))
            }
            other => Err(mismatch(ty, "a string", other.kind_name())),
        }
    }

    fn decode(&self, ty: &LogicalType, wire: &WireValue, _ctx: &TypeContext<'_>) -> CompileResult<Value> {
        match wire {
            WireValue::Text(s) => Ok(Value::String(s.clone())),
            WireValue::Bytes(b) => String::from_utf8(b.clone())
                .map(Value::String)
                .map_err(|e| CompileError::coercion(ty.to_string(), format!("invalid UTF-8: {}", e))),
            other => Err(mismatch(ty, "text", other.kind_name())),
        }
    }

    fn render_literal(&self, ty: &LogicalType, value: &Value, ctx: &TypeContext<'_>) -> CompileResult<String> {
        match value {
            Value::String(s) => Ok(ctx.dialect.quote_string(s)),
            other => Err(mismatch(ty, "a string", other.kind_name())),
        }
    }
}

fn decode_hex(ty: &LogicalType, hex: &str) -> CompileResult<Vec<u8>> {
    if hex.len() % 2 != 0 {
        return Err(mismatch(ty, "an even number of hex digits", &hex.len().to_string()));
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|e| CompileError::coercion(ty.to_string(), format!("invalid hex: {}", e)))
        })
        .collect()
}

/// BINARY / BYTEA / BLOB.
pub struct BinaryHandler;

impl TypeHandler for BinaryHandler {
    fn name(&self) -> &str {
        "BinaryHandler"
    }

    fn key(&self) -> TypeKey {
        TypeKey::Binary
    }

    fn encode(&self, ty: &LogicalType, value: &Value, _ctx: &TypeContext<'_>) -> CompileResult<WireValue> {
        match value {
            Value::Bytes(b) => {
                check_length(ty, b.len())?;
                Ok(WireValue::Bytes(b.clone()))
            }
            other => Err(mismatch(ty, "bytes", other.kind_name())),
        }
    }

    /// Text input is PostgreSQL's `\x` hex form.
    fn decode(&self, ty: &LogicalType, wire: &WireValue, _ctx: &TypeContext<'_>) -> CompileResult<Value> {
        match wire {
            WireValue::Bytes(b) => Ok(Value::Bytes(b.clone())),
            WireValue::Text(s) => match s.strip_prefix("\\x") {
                Some(hex) => Ok(Value::Bytes(decode_hex(ty, hex)?)),
                None => Err(mismatch(ty, "\\x-prefixed hex text", "plain text")),
            },
            other => Err(mismatch(ty, "bytes", other.kind_name())),
        }
    }

    fn render_literal(&self, ty: &LogicalType, value: &Value, ctx: &TypeContext<'_>) -> CompileResult<String> {
        match value {
            Value::Bytes(b) => Ok(ctx.dialect.binary_literal(b)),
            other => Err(mismatch(ty, "bytes", other.kind_name())),
        }
    }
}

/// UUID; hyphenated text where the type is native, 32 hex digits where it
/// is stored as CHAR(32), raw bytes when the driver says so.
pub struct UuidHandler;

impl UuidHandler {
    fn text_form(u: &Uuid, family: TypeFamily) -> String {
        match family {
            TypeFamily::Mysql | TypeFamily::Sqlite | TypeFamily::Oracle => u.simple().to_string(),
            _ => u.hyphenated().to_string(),
        }
    }

    fn coerce(ty: &LogicalType, value: &Value) -> CompileResult<Uuid> {
        match value {
            Value::Uuid(u) => Ok(*u),
            Value::String(s) => Uuid::parse_str(s)
                .map_err(|e| CompileError::coercion(ty.to_string(), format!("'{}': {}", s, e))),
            other => Err(mismatch(ty, "a UUID", other.kind_name())),
        }
    }
}

impl TypeHandler for UuidHandler {
    fn name(&self) -> &str {
        "UuidHandler"
    }

    fn key(&self) -> TypeKey {
        TypeKey::Uuid
    }

    fn encode(&self, ty: &LogicalType, value: &Value, ctx: &TypeContext<'_>) -> CompileResult<WireValue> {
        let u = Self::coerce(ty, value)?;
        if ctx.dialect.quirks.uuid_as_bytes {
            return Ok(WireValue::Bytes(u.as_bytes().to_vec()));
        }
        Ok(WireValue::Text(Self::text_form(&u, ctx.dialect.type_compiler.family)))
    }

    fn decode(&self, ty: &LogicalType, wire: &WireValue, _ctx: &TypeContext<'_>) -> CompileResult<Value> {
        let u = match wire {
            WireValue::Text(s) => Uuid::parse_str(s.trim())
                .map_err(|e| CompileError::coercion(ty.to_string(), format!("'{}': {}", s, e)))?,
            WireValue::Bytes(b) => Uuid::from_slice(b)
                .map_err(|e| CompileError::coercion(ty.to_string(), e.to_string()))?,
            other => return Err(mismatch(ty, "a UUID", other.kind_name())),
        };
        Ok(Value::Uuid(u))
    }

    fn render_literal(&self, ty: &LogicalType, value: &Value, ctx: &TypeContext<'_>) -> CompileResult<String> {
        let u = Self::coerce(ty, value)?;
        Ok(ctx
            .dialect
            .quote_string(&Self::text_form(&u, ctx.dialect.type_compiler.family)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::DialectProfile;
    use crate::types::TypeRegistry;
    use crate::error::ErrorKind;

    fn roundtrip(ty: LogicalType, dialect: &DialectProfile, value: Value) {
        let registry = TypeRegistry::with_builtins();
        let handler = registry.resolve(&ty, dialect).unwrap();
        let wire = handler.encode(&value, dialect).unwrap();
        assert_eq!(handler.decode(&wire, dialect).unwrap(), value, "{:?}", wire);
    }

    #[test]
    fn test_integer_roundtrip_and_range() {
        let d = DialectProfile::generic();
        roundtrip(LogicalType::Integer, &d, Value::Int(42));
        roundtrip(LogicalType::BigInteger, &d, Value::Int(i64::MAX));
        roundtrip(LogicalType::Integer, &d, Value::Null);

        let registry = TypeRegistry::with_builtins();
        let h = registry.resolve(&LogicalType::Integer, &d).unwrap();
        let err = h.encode(&Value::Int(3_000_000_000), &d).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeCoercion);
        assert!(h.encode(&Value::Float(1.5), &d).is_err());
        assert_eq!(h.encode(&Value::Float(2.0), &d).unwrap(), WireValue::Int(2));
        assert_eq!(
            h.decode(&WireValue::Text("17".into()), &d).unwrap(),
            Value::Int(17)
        );
    }

    #[test]
    fn test_integer_decode_checks_width() {
        let d = DialectProfile::generic();
        let registry = TypeRegistry::with_builtins();
        let small = registry.resolve(&LogicalType::SmallInteger, &d).unwrap();
        assert_eq!(small.decode(&WireValue::Int(32_767), &d).unwrap(), Value::Int(32_767));
        let err = small.decode(&WireValue::Int(40_000), &d).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeCoercion);
        assert!(small.decode(&WireValue::Text("40000".into()), &d).is_err());

        let int = registry.resolve(&LogicalType::Integer, &d).unwrap();
        assert!(int.decode(&WireValue::Int(3_000_000_000), &d).is_err());
        let big = registry.resolve(&LogicalType::BigInteger, &d).unwrap();
        assert_eq!(
            big.decode(&WireValue::Int(3_000_000_000), &d).unwrap(),
            Value::Int(3_000_000_000)
        );
    }

    #[test]
    fn test_boolean_as_int_quirk() {
        let sqlite = DialectProfile::sqlite();
        let registry = TypeRegistry::with_builtins();
        let h = registry.resolve(&LogicalType::Boolean, &sqlite).unwrap();
        assert_eq!(h.encode(&Value::Bool(true), &sqlite).unwrap(), WireValue::Int(1));
        assert_eq!(h.decode(&WireValue::Int(0), &sqlite).unwrap(), Value::Bool(false));
        assert!(h.decode(&WireValue::Int(2), &sqlite).is_err());
        assert_eq!(h.render_literal(&Value::Bool(true), &sqlite).unwrap(), "1");
        roundtrip(LogicalType::Boolean, &DialectProfile::postgresql(), Value::Bool(true));
    }

    #[test]
    fn test_string_roundtrip_and_length() {
        let d = DialectProfile::postgresql();
        roundtrip(
            LogicalType::Text,
            &d,
            Value::from("it's a \"quoted\" \\ string ✓"),
        );
        roundtrip(LogicalType::string(10), &d, Value::from(""));
        let registry = TypeRegistry::with_builtins();
        let h = registry.resolve(&LogicalType::string(3), &d).unwrap();
        assert_eq!(
            h.encode(&Value::from("abcd"), &d).unwrap_err().kind(),
            ErrorKind::TypeCoercion
        );
        assert_eq!(h.render_literal(&Value::from("it's"), &d).unwrap(), "'it''s'");
    }

    #[test]
    fn test_binary_roundtrip_and_pg_text() {
        let d = DialectProfile::postgresql();
        roundtrip(LogicalType::Binary { length: None }, &d, Value::Bytes(vec![0, 1, 254]));
        let registry = TypeRegistry::with_builtins();
        let h = registry.resolve(&LogicalType::Binary { length: None }, &d).unwrap();
        assert_eq!(
            h.decode(&WireValue::Text("\\x00ff".into()), &d).unwrap(),
            Value::Bytes(vec![0, 255])
        );
    }

    #[test]
    fn test_uuid_forms() {
        let u = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        roundtrip(LogicalType::Uuid, &DialectProfile::postgresql(), Value::Uuid(u));
        roundtrip(LogicalType::Uuid, &DialectProfile::mysql(), Value::Uuid(u));

        let registry = TypeRegistry::with_builtins();
        let my = DialectProfile::mysql();
        let h = registry.resolve(&LogicalType::Uuid, &my).unwrap();
        assert_eq!(
            h.encode(&Value::Uuid(u), &my).unwrap(),
            WireValue::Text("550e8400e29b41d4a716446655440000".into())
        );

        let bytes = DialectProfile::generic().with_quirks(crate::dialect::DriverQuirks {
            uuid_as_bytes: true,
            ..Default::default()
        });
        roundtrip(LogicalType::Uuid, &bytes, Value::Uuid(u));
    }

    #[test]
    fn test_untyped_literals() {
        let d = DialectProfile::sqlite();
        let registry = TypeRegistry::with_builtins();
        let h = registry.resolve(&LogicalType::Null, &d).unwrap();
        assert_eq!(h.render_literal(&Value::Bool(false), &d).unwrap(), "0");
        assert_eq!(h.render_literal(&Value::Float(1.0), &d).unwrap(), "1.0");
        assert!(h.render_literal(&Value::Array(vec![]), &d).is_err());
    }
}
