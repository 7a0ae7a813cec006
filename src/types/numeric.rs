//! NUMERIC, DECIMAL and FLOAT.

use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use super::{TypeContext, TypeHandler, WireValue, mismatch};
use crate::ast::{LogicalType, TypeKey, Value};
use crate::error::{CompileError, CompileResult};

pub struct NumericHandler;

struct Shape {
    precision: Option<u32>,
    scale: Option<u32>,
    as_decimal: bool,
}

impl NumericHandler {
    fn shape(ty: &LogicalType) -> Shape {
        match ty {
            LogicalType::Numeric {
                precision,
                scale,
                as_decimal,
            } => Shape {
                precision: *precision,
                scale: *scale,
                as_decimal: *as_decimal,
            },
            LogicalType::Float { as_decimal } => Shape {
                precision: None,
                scale: None,
                as_decimal: *as_decimal,
            },
            _ => Shape {
                precision: None,
                scale: None,
                as_decimal: true,
            },
        }
    }

    fn parse_decimal(ty: &LogicalType, s: &str) -> CompileResult<Decimal> {
        let s = s.trim();
        Decimal::from_str(s)
            .or_else(|_| Decimal::from_scientific(s))
            .map_err(|e| CompileError::coercion(ty.to_string(), format!("'{}': {}", s, e)))
    }

    fn float_to_decimal(ty: &LogicalType, f: f64) -> CompileResult<Decimal> {
        if !f.is_finite() {
            return Err(CompileError::coercion(
                ty.to_string(),
                format!("{} has no decimal representation", f),
            ));
        }
        Self::parse_decimal(ty, &f.to_string())
    }

    /// Reject values with more fractional digits than the declared scale, or
    /// whose integer part does not fit the declared precision.
    fn fit(ty: &LogicalType, shape: &Shape, d: Decimal) -> CompileResult<Decimal> {
        if let Some(scale) = shape.scale {
            if d.round_dp(scale) != d {
                return Err(CompileError::coercion(
                    ty.to_string(),
                    format!("{} has more than {} fractional digit(s)", d, scale),
                ));
            }
        }
        if let Some(precision) = shape.precision {
            let int_digits = precision.saturating_sub(shape.scale.unwrap_or(0));
            let whole = d.trunc().abs();
            let digits = if whole.is_zero() {
                0
            } else {
                whole.to_string().len() as u32
            };
            if digits > int_digits {
                return Err(CompileError::coercion(
                    ty.to_string(),
                    format!("numeric field overflow for {}", d),
                ));
            }
        }
        Ok(d)
    }

    fn to_decimal(ty: &LogicalType, value: &Value) -> CompileResult<Decimal> {
        match value {
            Value::Decimal(d) => Ok(*d),
            Value::Int(n) => Ok(Decimal::from(*n)),
            Value::Float(f) => Self::float_to_decimal(ty, *f),
            other => Err(mismatch(ty, "a number", other.kind_name())),
        }
    }

    fn int_to_float(ty: &LogicalType, n: i64) -> CompileResult<f64> {
        let f = n as f64;
        if f as i128 != i128::from(n) {
            return Err(CompileError::coercion(
                ty.to_string(),
                format!("{} is not exactly representable as a double", n),
            ));
        }
        Ok(f)
    }

    fn to_float(ty: &LogicalType, value: &Value) -> CompileResult<f64> {
        match value {
            Value::Float(f) => Ok(*f),
            Value::Int(n) => Self::int_to_float(ty, *n),
            Value::Decimal(d) => {
                let f = d.to_f64().ok_or_else(|| {
                    CompileError::coercion(ty.to_string(), format!("{} out of range", d))
                })?;
                match Self::float_to_decimal(ty, f) {
                    Ok(back) if back == *d => Ok(f),
                    _ => Err(CompileError::coercion(
                        ty.to_string(),
                        format!("{} is not exactly representable as a double", d),
                    )),
                }
            }
            other => Err(mismatch(ty, "a number", other.kind_name())),
        }
    }
}

impl TypeHandler for NumericHandler {
    fn name(&self) -> &str {
        "NumericHandler"
    }

    fn key(&self) -> TypeKey {
        TypeKey::Numeric
    }

    /// Decimals travel as exact text; floats as binary doubles.
    fn encode(&self, ty: &LogicalType, value: &Value, _ctx: &TypeContext<'_>) -> CompileResult<WireValue> {
        let shape = Self::shape(ty);
        if shape.as_decimal {
            let d = Self::fit(ty, &shape, Self::to_decimal(ty, value)?)?;
            Ok(WireValue::Text(d.to_string()))
        } else {
            Ok(WireValue::Float(Self::to_float(ty, value)?))
        }
    }

    fn decode(&self, ty: &LogicalType, wire: &WireValue, _ctx: &TypeContext<'_>) -> CompileResult<Value> {
        let shape = Self::shape(ty);
        if shape.as_decimal {
            let d = match wire {
                WireValue::Text(s) => Self::parse_decimal(ty, s)?,
                WireValue::Int(n) => Decimal::from(*n),
                WireValue::Float(f) => Self::float_to_decimal(ty, *f)?,
                other => return Err(mismatch(ty, "a number", other.kind_name())),
            };
            let d = match shape.scale {
                Some(scale) => d.round_dp(scale),
                None => d,
            };
            return Ok(Value::Decimal(d));
        }
        let f = match wire {
            WireValue::Float(f) => *f,
            WireValue::Int(n) => Self::int_to_float(ty, *n)?,
            WireValue::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|e| CompileError::coercion(ty.to_string(), format!("'{}': {}", s, e)))?,
            other => return Err(mismatch(ty, "a number", other.kind_name())),
        };
        Ok(Value::Float(f))
    }

    fn render_literal(&self, ty: &LogicalType, value: &Value, _ctx: &TypeContext<'_>) -> CompileResult<String> {
        let shape = Self::shape(ty);
        match value {
            Value::Int(n) => Ok(n.to_string()),
            Value::Float(f) if !shape.as_decimal => {
                if !f.is_finite() {
                    return Err(CompileError::compile(format!(
                        "No literal value renderer is available for literal value {} with datatype {}",
                        f, ty
                    )));
                }
                Ok(format!("{:?}", f))
            }
            _ => Ok(Self::fit(ty, &shape, Self::to_decimal(ty, value)?)?.to_string()),
        }
    }
}
