//! Free builder functions.
//!
//! ```ignore
//! select([t1.c("a")?, count_star().label("n")])
//!     .filter(and_([t1.c("a")?.gt(5), t1.c("b")?.is_not_null()]))
//!     .group_by([t1.c("a")?]);
//! ```

use super::column::SourceRef;
use super::compound::{CompoundSelect, SetOp};
use super::expr::{BindParam, CaseExpr, Expr, FunctionCall};
use super::from::FromItem;
use super::operators::BinaryOp;
use super::select::Select;
use super::statement::Queryable;
use super::text::TextClause;
use super::types::LogicalType;
use super::values::Value;
use crate::error::{CompileError, CompileResult};

/// Literal value rendered inline, e.g. `lit(5)`.
pub fn lit(value: impl Into<Value>) -> Expr {
    Expr::Literal(value.into())
}

/// SQL NULL
pub fn null() -> Expr {
    Expr::Literal(Value::Null)
}

/// Named bind parameter, e.g. `bindparam("x")` renders `:x`.
pub fn bindparam(key: &str) -> BindParam {
    BindParam::new(key)
}

/// Named bind parameter carrying a value and its type.
pub fn bindparam_value(key: &str, value: impl Into<Value>, ty: LogicalType) -> BindParam {
    BindParam::new(key).typed(ty).value(value)
}

/// Raw SQL fragment, `:name` tokens becoming bind parameters.
pub fn text(sql: &str) -> TextClause {
    TextClause::new(sql)
}

/// `*`
pub fn star() -> Expr {
    Expr::Wildcard(None)
}

/// `source.*`
pub fn star_of(source: impl Into<FromItem>) -> CompileResult<Expr> {
    let src = match source.into() {
        FromItem::Table(t) => SourceRef::Table(t),
        FromItem::Alias(a) => SourceRef::Alias(a),
        FromItem::Cte(c) => SourceRef::Cte(c),
        FromItem::Join(_) => {
            return Err(CompileError::argument("Can't qualify '*' by a join"));
        }
    };
    Ok(Expr::Wildcard(Some(src)))
}

/// Function call, return type inferred from the name where known.
pub fn func<E: Into<Expr>>(name: &str, args: impl IntoIterator<Item = E>) -> Expr {
    Expr::Function(FunctionCall {
        name: name.to_string(),
        args: args.into_iter().map(Into::into).collect(),
        return_type: None,
    })
}

/// Function call with an explicit return type.
pub fn func_typed<E: Into<Expr>>(
    name: &str,
    args: impl IntoIterator<Item = E>,
    return_type: LogicalType,
) -> Expr {
    Expr::Function(FunctionCall {
        name: name.to_string(),
        args: args.into_iter().map(Into::into).collect(),
        return_type: Some(return_type),
    })
}

/// `count(*)`
pub fn count_star() -> Expr {
    func("count", [star()])
}

pub fn count(expr: impl Into<Expr>) -> Expr {
    func("count", [expr.into()])
}

pub fn sum(expr: impl Into<Expr>) -> Expr {
    func("sum", [expr.into()])
}

pub fn max(expr: impl Into<Expr>) -> Expr {
    func("max", [expr.into()])
}

pub fn min(expr: impl Into<Expr>) -> Expr {
    func("min", [expr.into()])
}

pub fn coalesce<E: Into<Expr>>(args: impl IntoIterator<Item = E>) -> Expr {
    func("coalesce", args)
}

/// `CURRENT_TIMESTAMP`
pub fn current_timestamp() -> Expr {
    func("current_timestamp", Vec::<Expr>::new())
}

fn conjunction<E: Into<Expr>>(op: BinaryOp, clauses: impl IntoIterator<Item = E>) -> Expr {
    let mut iter = clauses.into_iter().map(Into::into);
    let Some(first) = iter.next() else {
        return lit(op == BinaryOp::And);
    };
    iter.fold(first, |acc, c| Expr::binary(acc, op, c))
}

/// AND together all clauses. An empty list is `true`.
pub fn and_<E: Into<Expr>>(clauses: impl IntoIterator<Item = E>) -> Expr {
    conjunction(BinaryOp::And, clauses)
}

/// OR together all clauses. An empty list is `false`.
pub fn or_<E: Into<Expr>>(clauses: impl IntoIterator<Item = E>) -> Expr {
    conjunction(BinaryOp::Or, clauses)
}

pub fn not_(expr: impl Into<Expr>) -> Expr {
    expr.into().negate()
}

/// Explicit parentheses.
pub fn grouping(expr: impl Into<Expr>) -> Expr {
    Expr::Grouping(Box::new(expr.into()))
}

pub fn cast(expr: impl Into<Expr>, ty: LogicalType) -> Expr {
    Expr::Cast {
        expr: Box::new(expr.into()),
        ty,
    }
}

/// `CASE WHEN ... THEN ... [ELSE ...] END`
pub fn case<C: Into<Expr>, T: Into<Expr>>(
    whens: impl IntoIterator<Item = (C, T)>,
    else_result: Option<Expr>,
) -> Expr {
    Expr::Case(CaseExpr {
        whens: whens
            .into_iter()
            .map(|(c, t)| (c.into(), t.into()))
            .collect(),
        else_result: else_result.map(Box::new),
    })
}

pub fn exists(query: impl Into<Queryable>) -> Expr {
    Expr::Exists {
        query: Box::new(query.into()),
        negated: false,
    }
}

pub fn select<E: Into<Expr>>(columns: impl IntoIterator<Item = E>) -> Select {
    Select::new(columns)
}

pub fn union<Q: Into<Queryable>>(queries: impl IntoIterator<Item = Q>) -> CompileResult<CompoundSelect> {
    CompoundSelect::new(SetOp::Union, queries.into_iter().map(Into::into).collect())
}

pub fn union_all<Q: Into<Queryable>>(
    queries: impl IntoIterator<Item = Q>,
) -> CompileResult<CompoundSelect> {
    CompoundSelect::new(SetOp::UnionAll, queries.into_iter().map(Into::into).collect())
}

pub fn intersect<Q: Into<Queryable>>(
    queries: impl IntoIterator<Item = Q>,
) -> CompileResult<CompoundSelect> {
    CompoundSelect::new(SetOp::Intersect, queries.into_iter().map(Into::into).collect())
}

pub fn except<Q: Into<Queryable>>(
    queries: impl IntoIterator<Item = Q>,
) -> CompileResult<CompoundSelect> {
    CompoundSelect::new(SetOp::Except, queries.into_iter().map(Into::into).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_conjunctions() {
        assert_eq!(and_(Vec::<Expr>::new()), Expr::Literal(Value::Bool(true)));
        assert_eq!(or_(Vec::<Expr>::new()), Expr::Literal(Value::Bool(false)));
    }

    #[test]
    fn test_and_chain_is_flat() {
        let e = and_([lit(1), lit(2), lit(3)]);
        match e {
            Expr::Binary { left, op, .. } => {
                assert_eq!(op, BinaryOp::And);
                assert!(matches!(*left, Expr::Binary { .. }));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_or_inside_and_grouped() {
        let e = and_([or_([lit(1), lit(2)]), lit(3)]);
        match e {
            Expr::Binary { left, .. } => assert!(matches!(*left, Expr::Grouping(_))),
            other => panic!("unexpected {:?}", other),
        }
    }
}
