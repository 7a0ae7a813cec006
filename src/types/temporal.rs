//! DATETIME, DATE and TIME. All three travel as ISO text.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

use super::{TypeContext, TypeHandler, WireValue, mismatch};
use crate::ast::{LogicalType, TypeKey, Value};
use crate::dialect::TypeFamily;
use crate::error::{CompileError, CompileResult};

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];
const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"];
const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S%.f";

fn unparsable(ty: &LogicalType, s: &str) -> CompileError {
    CompileError::coercion(ty.to_string(), format!("unparsable value '{}'", s))
}

/// Parse a timestamp; with a timezone, offset-qualified text is normalized
/// to UTC.
fn parse_datetime(ty: &LogicalType, s: &str) -> CompileResult<NaiveDateTime> {
    let s = s.trim();
    if let LogicalType::DateTime { timezone: true } = ty {
        for fmt in OFFSET_FORMATS {
            if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
                return Ok(dt.naive_utc());
            }
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(dt.naive_utc());
        }
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .ok_or_else(|| unparsable(ty, s))
}

fn typed_literal(keyword: &str, text: &str, ctx: &TypeContext<'_>) -> String {
    let quoted = ctx.dialect.quote_string(text);
    match ctx.dialect.type_compiler.family {
        TypeFamily::Generic | TypeFamily::Postgresql | TypeFamily::Oracle => {
            format!("{} {}", keyword, quoted)
        }
        _ => quoted,
    }
}

pub struct DateTimeHandler;

impl DateTimeHandler {
    fn coerce(ty: &LogicalType, value: &Value) -> CompileResult<NaiveDateTime> {
        match value {
            Value::Timestamp(ts) => Ok(*ts),
            Value::Date(d) => Ok(d.and_time(NaiveTime::MIN)),
            Value::String(s) => parse_datetime(ty, s),
            other => Err(mismatch(ty, "a timestamp", other.kind_name())),
        }
    }

    fn text(ts: &NaiveDateTime) -> String {
        ts.format(DATETIME_FORMATS[0]).to_string()
    }
}

impl TypeHandler for DateTimeHandler {
    fn name(&self) -> &str {
        "DateTimeHandler"
    }

    fn key(&self) -> TypeKey {
        TypeKey::DateTime
    }

    fn encode(&self, ty: &LogicalType, value: &Value, _ctx: &TypeContext<'_>) -> CompileResult<WireValue> {
        Ok(WireValue::Text(Self::text(&Self::coerce(ty, value)?)))
    }

    fn decode(&self, ty: &LogicalType, wire: &WireValue, _ctx: &TypeContext<'_>) -> CompileResult<Value> {
        match wire {
            WireValue::Text(s) => Ok(Value::Timestamp(parse_datetime(ty, s)?)),
            other => Err(mismatch(ty, "timestamp text", other.kind_name())),
        }
    }

    fn render_literal(&self, ty: &LogicalType, value: &Value, ctx: &TypeContext<'_>) -> CompileResult<String> {
        let text = Self::text(&Self::coerce(ty, value)?);
        Ok(typed_literal("TIMESTAMP", &text, ctx))
    }
}

pub struct DateHandler;

impl DateHandler {
    fn coerce(ty: &LogicalType, value: &Value) -> CompileResult<NaiveDate> {
        match value {
            Value::Date(d) => Ok(*d),
            Value::String(s) => {
                NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).map_err(|_| unparsable(ty, s))
            }
            other => Err(mismatch(ty, "a date", other.kind_name())),
        }
    }
}

impl TypeHandler for DateHandler {
    fn name(&self) -> &str {
        "DateHandler"
    }

    fn key(&self) -> TypeKey {
        TypeKey::Date
    }

    fn encode(&self, ty: &LogicalType, value: &Value, _ctx: &TypeContext<'_>) -> CompileResult<WireValue> {
        let d = Self::coerce(ty, value)?;
        Ok(WireValue::Text(d.format(DATE_FORMAT).to_string()))
    }

    /// Drivers that hand back a full timestamp for DATE columns are accepted.
    fn decode(&self, ty: &LogicalType, wire: &WireValue, _ctx: &TypeContext<'_>) -> CompileResult<Value> {
        match wire {
            WireValue::Text(s) => {
                let s = s.trim();
                NaiveDate::parse_from_str(s, DATE_FORMAT)
                    .or_else(|_| parse_datetime(ty, s).map(|ts| ts.date()))
                    .map(Value::Date)
                    .map_err(|_| unparsable(ty, s))
            }
            other => Err(mismatch(ty, "date text", other.kind_name())),
        }
    }

    fn render_literal(&self, ty: &LogicalType, value: &Value, ctx: &TypeContext<'_>) -> CompileResult<String> {
        let d = Self::coerce(ty, value)?;
        Ok(typed_literal("DATE", &d.format(DATE_FORMAT).to_string(), ctx))
    }
}

pub struct TimeHandler;

impl TimeHandler {
    fn coerce(ty: &LogicalType, value: &Value) -> CompileResult<NaiveTime> {
        match value {
            Value::Time(t) => Ok(*t),
            Value::String(s) => {
                NaiveTime::parse_from_str(s.trim(), TIME_FORMAT).map_err(|_| unparsable(ty, s))
            }
            other => Err(mismatch(ty, "a time", other.kind_name())),
        }
    }
}

impl TypeHandler for TimeHandler {
    fn name(&self) -> &str {
        "TimeHandler"
    }

    fn key(&self) -> TypeKey {
        TypeKey::Time
    }

    fn encode(&self, ty: &LogicalType, value: &Value, _ctx: &TypeContext<'_>) -> CompileResult<WireValue> {
        let t = Self::coerce(ty, value)?;
        Ok(WireValue::Text(t.format(TIME_FORMAT).to_string()))
    }

    fn decode(&self, ty: &LogicalType, wire: &WireValue, _ctx: &TypeContext<'_>) -> CompileResult<Value> {
        match wire {
            WireValue::Text(s) => NaiveTime::parse_from_str(s.trim(), TIME_FORMAT)
                .map(Value::Time)
                .map_err(|_| unparsable(ty, s)),
            other => Err(mismatch(ty, "time text", other.kind_name())),
        }
    }

    fn render_literal(&self, ty: &LogicalType, value: &Value, ctx: &TypeContext<'_>) -> CompileResult<String> {
        let t = Self::coerce(ty, value)?;
        Ok(typed_literal("TIME", &t.format(TIME_FORMAT).to_string(), ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::DialectProfile;
    use crate::types::TypeRegistry;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").unwrap()
    }

    #[test]
    fn test_datetime_roundtrip() {
        let d = DialectProfile::sqlite();
        let h = TypeRegistry::with_builtins()
            .resolve(&LogicalType::DateTime { timezone: false }, &d)
            .unwrap();
        let value = Value::Timestamp(ts("2024-03-01 12:30:45.250"));
        let wire = h.encode(&value, &d).unwrap();
        assert_eq!(wire, WireValue::Text("2024-03-01 12:30:45.250".into()));
        assert_eq!(h.decode(&wire, &d).unwrap(), value);
        assert_eq!(
            h.decode(&WireValue::Text("2024-03-01T12:30:45.250".into()), &d)
                .unwrap(),
            value
        );
    }

    #[test]
    fn test_timezone_normalized_to_utc() {
        let d = DialectProfile::postgresql();
        let h = TypeRegistry::with_builtins()
            .resolve(&LogicalType::DateTime { timezone: true }, &d)
            .unwrap();
        assert_eq!(
            h.decode(&WireValue::Text("2024-03-01 12:00:00+02".into()), &d)
                .unwrap(),
            Value::Timestamp(ts("2024-03-01 10:00:00"))
        );
    }

    #[test]
    fn test_date_and_time() {
        let d = DialectProfile::postgresql();
        let registry = TypeRegistry::with_builtins();
        let date = registry.resolve(&LogicalType::Date, &d).unwrap();
        let value = Value::Date(NaiveDate::from_ymd_opt(2020, 2, 29).unwrap());
        let wire = date.encode(&value, &d).unwrap();
        assert_eq!(date.decode(&wire, &d).unwrap(), value);
        assert_eq!(
            date.decode(&WireValue::Text("2020-02-29 00:00:00".into()), &d)
                .unwrap(),
            value
        );
        assert_eq!(date.render_literal(&value, &d).unwrap(), "DATE '2020-02-29'");

        let time = registry.resolve(&LogicalType::Time, &d).unwrap();
        let value = Value::Time(NaiveTime::from_hms_opt(23, 59, 1).unwrap());
        let wire = time.encode(&value, &d).unwrap();
        assert_eq!(wire, WireValue::Text("23:59:01".into()));
        assert_eq!(time.decode(&wire, &d).unwrap(), value);
    }

    #[test]
    fn test_literal_by_family() {
        let value = Value::Timestamp(ts("2024-01-02 03:04:05"));
        let registry = TypeRegistry::with_builtins();
        let pg = DialectProfile::postgresql();
        let h = registry
            .resolve(&LogicalType::DateTime { timezone: false }, &pg)
            .unwrap();
        assert_eq!(
            h.render_literal(&value, &pg).unwrap(),
            "TIMESTAMP '2024-01-02 03:04:05'"
        );
        let my = DialectProfile::mysql();
        assert_eq!(h.render_literal(&value, &my).unwrap(), "'2024-01-02 03:04:05'");
        assert!(h.encode(&Value::from("not a date"), &pg).is_err());
    }
}
