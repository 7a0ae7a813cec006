//! Expression nodes.
//!
//! Operators are attached through [`ExprExt`], so columns, binds and
//! expressions all compose the same way:
//!
//! ```ignore
//! let cond = t1.c("a")?.eq(5).and(t1.c("b")?.like("x%"));
//! ```
//!
//! Operands that are plain values become anonymous bind parameters typed
//! after the other side of the comparison.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use uuid::Uuid;

use super::column::{ColumnRef, SourceRef};
use super::ids::NodeId;
use super::operators::{BinaryOp, UnaryOp};
use super::selectable::Selectable;
use super::statement::Queryable;
use super::text::TextClause;
use super::types::LogicalType;
use super::values::Value;

/// A bind parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct BindParam {
    pub(crate) id: NodeId,
    pub(crate) key: String,
    /// Anonymous binds are named `<key>_<n>` at compile time.
    pub(crate) anonymous: bool,
    pub(crate) value: Option<Value>,
    pub(crate) ty: LogicalType,
    /// Renders one placeholder per element of an array value.
    pub(crate) expanding: bool,
}

impl BindParam {
    /// A named parameter; every occurrence of the key shares one value.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            id: NodeId::next(),
            key: key.into(),
            anonymous: false,
            value: None,
            ty: LogicalType::Null,
            expanding: false,
        }
    }

    pub(crate) fn anonymous(hint: &str, value: Value, ty: LogicalType) -> Self {
        Self {
            id: NodeId::next(),
            key: hint.to_string(),
            anonymous: true,
            value: Some(value),
            ty,
            expanding: false,
        }
    }

    pub fn value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(value.into());
        if self.ty.is_null() {
            self.ty = self.value.as_ref().map(Value::natural_type).unwrap_or(LogicalType::Null);
        }
        self
    }

    pub fn typed(mut self, ty: LogicalType) -> Self {
        self.ty = ty;
        self
    }

    /// Generate a fresh name from the key instead of using it verbatim.
    pub fn unique(mut self) -> Self {
        self.anonymous = true;
        self
    }

    pub fn expanding(mut self) -> Self {
        self.expanding = true;
        self
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_anonymous(&self) -> bool {
        self.anonymous
    }

    pub fn is_expanding(&self) -> bool {
        self.expanding
    }

    pub fn current_value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn ty(&self) -> &LogicalType {
        &self.ty
    }
}

/// `expr AS name`. Anonymous labels are named at compile time from `hint`.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub(crate) id: NodeId,
    pub(crate) name: Option<String>,
    pub(crate) hint: String,
    pub(crate) expr: Box<Expr>,
}

impl Label {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Explicit name, or the base the anonymous name is generated from.
    pub fn key(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.hint)
    }

    pub fn element(&self) -> &Expr {
        &self.expr
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub args: Vec<Expr>,
    pub return_type: Option<LogicalType>,
}

/// ANSI functions rendered without parentheses.
pub const NO_PAREN_FUNCTIONS: &[&str] = &[
    "current_date",
    "current_time",
    "current_timestamp",
    "current_user",
    "localtime",
    "localtimestamp",
    "session_user",
    "user",
];

impl FunctionCall {
    fn inferred_type(&self) -> LogicalType {
        if let Some(ty) = &self.return_type {
            return ty.clone();
        }
        let first = || {
            self.args
                .first()
                .map(Expr::type_of)
                .unwrap_or(LogicalType::Null)
        };
        match self.name.to_lowercase().as_str() {
            "count" => LogicalType::Integer,
            "sum" | "min" | "max" | "coalesce" | "abs" => first(),
            "avg" => LogicalType::Numeric {
                precision: None,
                scale: None,
                as_decimal: true,
            },
            "lower" | "upper" | "trim" | "concat" | "substr" => LogicalType::String { length: None },
            "length" | "char_length" => LogicalType::Integer,
            "now" | "current_timestamp" | "localtimestamp" => {
                LogicalType::DateTime { timezone: false }
            }
            "current_date" => LogicalType::Date,
            "current_time" | "localtime" => LogicalType::Time,
            "current_user" | "session_user" | "user" => LogicalType::String { length: None },
            _ => LogicalType::Null,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseExpr {
    pub whens: Vec<(Expr, Expr)>,
    pub else_result: Option<Box<Expr>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NullsOrder {
    First,
    Last,
}

/// One ORDER BY element.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub expr: Expr,
    pub direction: Option<OrderDirection>,
    pub nulls: Option<NullsOrder>,
}

impl OrderBy {
    pub fn nulls_first(mut self) -> Self {
        self.nulls = Some(NullsOrder::First);
        self
    }

    pub fn nulls_last(mut self) -> Self {
        self.nulls = Some(NullsOrder::Last);
        self
    }
}

impl From<Expr> for OrderBy {
    fn from(expr: Expr) -> Self {
        OrderBy {
            expr,
            direction: None,
            nulls: None,
        }
    }
}

impl From<ColumnRef> for OrderBy {
    fn from(col: ColumnRef) -> Self {
        OrderBy::from(Expr::Column(col))
    }
}

/// SQL expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column(ColumnRef),
    Bind(BindParam),
    Literal(Value),
    Function(FunctionCall),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    Label(Label),
    /// Explicit parentheses.
    Grouping(Box<Expr>),
    Cast {
        expr: Box<Expr>,
        ty: LogicalType,
    },
    Case(CaseExpr),
    Between {
        expr: Box<Expr>,
        low: Box<Expr>,
        high: Box<Expr>,
        negated: bool,
    },
    /// `x IN (...)`; a single expanding bind stands for the whole list.
    InList {
        expr: Box<Expr>,
        items: Vec<Expr>,
        negated: bool,
    },
    InSubquery {
        expr: Box<Expr>,
        query: Box<Queryable>,
        negated: bool,
    },
    ScalarSubquery(Box<Queryable>),
    Exists {
        query: Box<Queryable>,
        negated: bool,
    },
    /// `*`, or `source.*` when qualified.
    Wildcard(Option<SourceRef>),
    /// Raw SQL with `:name` binds.
    Text(TextClause),
}

impl Expr {
    /// Build a binary expression, parenthesizing operands that bind looser.
    pub fn binary(left: Expr, op: BinaryOp, right: Expr) -> Expr {
        let prec = op.precedence();
        let left = left.self_group(prec, false);
        let right = right.self_group(prec, !op.is_associative());
        Expr::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Expr {
        Expr::Unary {
            op,
            operand: Box::new(operand.self_group(op.precedence(), true)),
        }
    }

    /// Binding strength of this node when it appears as an operand.
    pub fn precedence(&self) -> Option<u8> {
        match self {
            Expr::Binary { op, .. } => Some(op.precedence()),
            Expr::Unary { op, .. } => Some(op.precedence()),
            Expr::Between { .. } | Expr::InList { .. } | Expr::InSubquery { .. } => Some(5),
            Expr::Exists { negated: true, .. } => Some(UnaryOp::Not.precedence()),
            Expr::Label(label) => label.expr.precedence(),
            _ => None,
        }
    }

    fn self_group(self, against: u8, equal_groups: bool) -> Expr {
        match self.precedence() {
            Some(p) if p < against || (p == against && equal_groups) => {
                Expr::Grouping(Box::new(self))
            }
            _ => self,
        }
    }

    /// Logical type of the expression's result.
    pub fn type_of(&self) -> LogicalType {
        match self {
            Expr::Column(c) => c.ty().clone(),
            Expr::Bind(b) => b.ty.clone(),
            Expr::Literal(v) => v.natural_type(),
            Expr::Function(f) => f.inferred_type(),
            Expr::Unary { op: UnaryOp::Not, .. } => LogicalType::Boolean,
            Expr::Unary { operand, .. } => operand.type_of(),
            Expr::Binary { left, op, right } => {
                if op.is_boolean() {
                    LogicalType::Boolean
                } else if *op == BinaryOp::Concat {
                    LogicalType::String { length: None }
                } else {
                    let lt = left.type_of();
                    if lt.is_null() { right.type_of() } else { lt }
                }
            }
            Expr::Label(l) => l.expr.type_of(),
            Expr::Grouping(inner) => inner.type_of(),
            Expr::Cast { ty, .. } => ty.clone(),
            Expr::Case(case) => case
                .whens
                .iter()
                .map(|(_, then)| then.type_of())
                .find(|t| !t.is_null())
                .or_else(|| case.else_result.as_ref().map(|e| e.type_of()))
                .unwrap_or(LogicalType::Null),
            Expr::Between { .. }
            | Expr::InList { .. }
            | Expr::InSubquery { .. }
            | Expr::Exists { .. } => LogicalType::Boolean,
            Expr::ScalarSubquery(q) => q
                .columns()
                .first()
                .map(|c| c.ty().clone())
                .unwrap_or(LogicalType::Null),
            Expr::Wildcard(_) => LogicalType::Null,
            Expr::Text(t) => t.ty.clone(),
        }
    }

    /// Base name for binds compared against this expression.
    pub(crate) fn bind_hint(&self) -> String {
        match self {
            Expr::Column(c) => c.name().to_string(),
            Expr::Label(l) => l.key().to_string(),
            Expr::Grouping(inner) => inner.bind_hint(),
            Expr::Cast { expr, .. } => expr.bind_hint(),
            _ => "param".to_string(),
        }
    }

    /// Base name for the anonymous label of an unlabeled select-list entry.
    pub(crate) fn label_hint(&self) -> String {
        match self {
            Expr::Function(f) => f.name.to_lowercase(),
            Expr::Grouping(inner) => inner.label_hint(),
            _ => "anon".to_string(),
        }
    }

    /// Wrap in an anonymous label unless the entry already names itself.
    pub(crate) fn into_select_entry(self) -> Expr {
        match self {
            Expr::Column(_) | Expr::Label(_) | Expr::Wildcard(_) => self,
            Expr::Grouping(inner) if matches!(*inner, Expr::Column(_)) => *inner,
            other => {
                let hint = other.label_hint();
                Expr::Label(Label {
                    id: NodeId::next(),
                    name: None,
                    hint,
                    expr: Box::new(other),
                })
            }
        }
    }

    /// Sources referenced outside of nested subqueries, first-seen order.
    pub(crate) fn collect_sources(&self, out: &mut Vec<SourceRef>) {
        fn push(out: &mut Vec<SourceRef>, src: &SourceRef) {
            if !matches!(src, SourceRef::Derived(_)) && !out.iter().any(|s| s == src) {
                out.push(src.clone());
            }
        }
        match self {
            Expr::Column(c) => push(out, c.source()),
            Expr::Wildcard(Some(src)) => push(out, src),
            Expr::Wildcard(None) | Expr::Bind(_) | Expr::Literal(_) | Expr::Text(_) => {}
            Expr::Function(f) => f.args.iter().for_each(|a| a.collect_sources(out)),
            Expr::Unary { operand, .. } => operand.collect_sources(out),
            Expr::Binary { left, right, .. } => {
                left.collect_sources(out);
                right.collect_sources(out);
            }
            Expr::Label(l) => l.expr.collect_sources(out),
            Expr::Grouping(inner) => inner.collect_sources(out),
            Expr::Cast { expr, .. } => expr.collect_sources(out),
            Expr::Case(case) => {
                for (cond, then) in &case.whens {
                    cond.collect_sources(out);
                    then.collect_sources(out);
                }
                if let Some(e) = &case.else_result {
                    e.collect_sources(out);
                }
            }
            Expr::Between {
                expr, low, high, ..
            } => {
                expr.collect_sources(out);
                low.collect_sources(out);
                high.collect_sources(out);
            }
            Expr::InList { expr, items, .. } => {
                expr.collect_sources(out);
                items.iter().for_each(|i| i.collect_sources(out));
            }
            Expr::InSubquery { expr, .. } => expr.collect_sources(out),
            Expr::ScalarSubquery(_) | Expr::Exists { .. } => {}
        }
    }

    /// Logical negation, folding into the operator where SQL has one.
    pub fn negate(self) -> Expr {
        match self {
            Expr::Binary { left, op, right } if op.negate().is_some() => Expr::Binary {
                left,
                op: op.negate().unwrap_or(op),
                right,
            },
            Expr::Between {
                expr,
                low,
                high,
                negated,
            } => Expr::Between {
                expr,
                low,
                high,
                negated: !negated,
            },
            Expr::InList {
                expr,
                items,
                negated,
            } => Expr::InList {
                expr,
                items,
                negated: !negated,
            },
            Expr::InSubquery {
                expr,
                query,
                negated,
            } => Expr::InSubquery {
                expr,
                query,
                negated: !negated,
            },
            Expr::Exists { query, negated } => Expr::Exists {
                query,
                negated: !negated,
            },
            Expr::Unary {
                op: UnaryOp::Not,
                operand,
            } => match *operand {
                Expr::Grouping(inner) => *inner,
                other => other,
            },
            other => Expr::unary(UnaryOp::Not, other),
        }
    }
}

impl From<ColumnRef> for Expr {
    fn from(col: ColumnRef) -> Self {
        Expr::Column(col)
    }
}

impl From<BindParam> for Expr {
    fn from(bind: BindParam) -> Self {
        Expr::Bind(bind)
    }
}

impl From<Label> for Expr {
    fn from(label: Label) -> Self {
        Expr::Label(label)
    }
}

impl From<FunctionCall> for Expr {
    fn from(f: FunctionCall) -> Self {
        Expr::Function(f)
    }
}

/// Right-hand side of an operator, converted in the context of the left side.
pub trait IntoOperand {
    fn into_operand(self, against: &Expr) -> Expr;
}

impl IntoOperand for Expr {
    fn into_operand(self, _against: &Expr) -> Expr {
        self
    }
}

impl IntoOperand for ColumnRef {
    fn into_operand(self, _against: &Expr) -> Expr {
        Expr::Column(self)
    }
}

impl IntoOperand for BindParam {
    fn into_operand(mut self, against: &Expr) -> Expr {
        if self.ty.is_null() {
            self.ty = against.type_of();
        }
        Expr::Bind(self)
    }
}

impl IntoOperand for Value {
    fn into_operand(self, against: &Expr) -> Expr {
        if self.is_null() {
            return Expr::Literal(Value::Null);
        }
        let ty = match against.type_of() {
            LogicalType::Null => self.natural_type(),
            ty => ty,
        };
        Expr::Bind(BindParam::anonymous(&against.bind_hint(), self, ty))
    }
}

macro_rules! value_operand {
    ($($t:ty),* $(,)?) => {
        $(
            impl IntoOperand for $t {
                fn into_operand(self, against: &Expr) -> Expr {
                    Value::from(self).into_operand(against)
                }
            }
        )*
    };
}

value_operand!(
    bool,
    i32,
    i64,
    f64,
    &str,
    String,
    Decimal,
    Uuid,
    NaiveDateTime,
    NaiveDate,
    NaiveTime,
    serde_json::Value,
    Vec<u8>,
);

impl<T: Into<Value>> IntoOperand for Option<T> {
    fn into_operand(self, against: &Expr) -> Expr {
        match self {
            Some(v) => v.into().into_operand(against),
            None => Expr::Literal(Value::Null),
        }
    }
}

fn compare(left: Expr, op: BinaryOp, right: Expr) -> Expr {
    let op = match (&right, op) {
        (Expr::Literal(Value::Null), BinaryOp::Eq) => BinaryOp::Is,
        (Expr::Literal(Value::Null), BinaryOp::Ne) => BinaryOp::IsNot,
        (_, op) => op,
    };
    Expr::binary(left, op, right)
}

/// Fluent operators for anything that converts into an [`Expr`].
pub trait ExprExt: Into<Expr> + Sized {
    fn eq(self, other: impl IntoOperand) -> Expr {
        let left = self.into();
        let right = other.into_operand(&left);
        compare(left, BinaryOp::Eq, right)
    }

    fn ne(self, other: impl IntoOperand) -> Expr {
        let left = self.into();
        let right = other.into_operand(&left);
        compare(left, BinaryOp::Ne, right)
    }

    fn gt(self, other: impl IntoOperand) -> Expr {
        let left = self.into();
        let right = other.into_operand(&left);
        compare(left, BinaryOp::Gt, right)
    }

    fn gte(self, other: impl IntoOperand) -> Expr {
        let left = self.into();
        let right = other.into_operand(&left);
        compare(left, BinaryOp::Gte, right)
    }

    fn lt(self, other: impl IntoOperand) -> Expr {
        let left = self.into();
        let right = other.into_operand(&left);
        compare(left, BinaryOp::Lt, right)
    }

    fn lte(self, other: impl IntoOperand) -> Expr {
        let left = self.into();
        let right = other.into_operand(&left);
        compare(left, BinaryOp::Lte, right)
    }

    fn like(self, pattern: impl IntoOperand) -> Expr {
        let left = self.into();
        let right = pattern.into_operand(&left);
        compare(left, BinaryOp::Like, right)
    }

    fn not_like(self, pattern: impl IntoOperand) -> Expr {
        let left = self.into();
        let right = pattern.into_operand(&left);
        compare(left, BinaryOp::NotLike, right)
    }

    /// Case-insensitive LIKE; `lower(x) LIKE lower(y)` where ILIKE is missing.
    fn ilike(self, pattern: impl IntoOperand) -> Expr {
        let left = self.into();
        let right = pattern.into_operand(&left);
        compare(left, BinaryOp::ILike, right)
    }

    fn not_ilike(self, pattern: impl IntoOperand) -> Expr {
        let left = self.into();
        let right = pattern.into_operand(&left);
        compare(left, BinaryOp::NotILike, right)
    }

    fn is_null(self) -> Expr {
        compare(self.into(), BinaryOp::Is, Expr::Literal(Value::Null))
    }

    fn is_not_null(self) -> Expr {
        compare(self.into(), BinaryOp::IsNot, Expr::Literal(Value::Null))
    }

    /// `x IN (...)` over one expanding bind holding all values.
    fn is_in<V: Into<Value>>(self, values: impl IntoIterator<Item = V>) -> Expr {
        let left = self.into();
        let items: Vec<Value> = values.into_iter().map(Into::into).collect();
        let mut bind = BindParam::anonymous(
            &left.bind_hint(),
            Value::Array(items),
            LogicalType::Null,
        );
        bind.ty = left.type_of();
        bind.expanding = true;
        Expr::InList {
            expr: Box::new(left.self_group(5, true)),
            items: vec![Expr::Bind(bind)],
            negated: false,
        }
    }

    fn not_in<V: Into<Value>>(self, values: impl IntoIterator<Item = V>) -> Expr {
        self.is_in(values).negate()
    }

    /// `x IN (a, b, ...)` over explicit expressions.
    fn in_exprs(self, items: Vec<Expr>) -> Expr {
        Expr::InList {
            expr: Box::new(self.into().self_group(5, true)),
            items,
            negated: false,
        }
    }

    fn in_select(self, query: impl Into<Queryable>) -> Expr {
        Expr::InSubquery {
            expr: Box::new(self.into().self_group(5, true)),
            query: Box::new(query.into()),
            negated: false,
        }
    }

    fn between(self, low: impl IntoOperand, high: impl IntoOperand) -> Expr {
        let left = self.into();
        let low = low.into_operand(&left);
        let high = high.into_operand(&left);
        Expr::Between {
            expr: Box::new(left.self_group(5, true)),
            low: Box::new(low.self_group(5, true)),
            high: Box::new(high.self_group(5, true)),
            negated: false,
        }
    }

    fn and(self, other: impl Into<Expr>) -> Expr {
        Expr::binary(self.into(), BinaryOp::And, other.into())
    }

    fn or(self, other: impl Into<Expr>) -> Expr {
        Expr::binary(self.into(), BinaryOp::Or, other.into())
    }

    fn negate(self) -> Expr {
        self.into().negate()
    }

    fn add(self, other: impl IntoOperand) -> Expr {
        let left = self.into();
        let right = other.into_operand(&left);
        Expr::binary(left, BinaryOp::Add, right)
    }

    fn sub(self, other: impl IntoOperand) -> Expr {
        let left = self.into();
        let right = other.into_operand(&left);
        Expr::binary(left, BinaryOp::Sub, right)
    }

    fn mul(self, other: impl IntoOperand) -> Expr {
        let left = self.into();
        let right = other.into_operand(&left);
        Expr::binary(left, BinaryOp::Mul, right)
    }

    fn div(self, other: impl IntoOperand) -> Expr {
        let left = self.into();
        let right = other.into_operand(&left);
        Expr::binary(left, BinaryOp::Div, right)
    }

    fn modulo(self, other: impl IntoOperand) -> Expr {
        let left = self.into();
        let right = other.into_operand(&left);
        Expr::binary(left, BinaryOp::Mod, right)
    }

    /// String concatenation; `||` or `concat()` depending on dialect.
    fn concat(self, other: impl IntoOperand) -> Expr {
        let left = self.into();
        let right = other.into_operand(&left);
        Expr::binary(left, BinaryOp::Concat, right)
    }

    fn neg(self) -> Expr {
        Expr::unary(UnaryOp::Neg, self.into())
    }

    fn label(self, name: &str) -> Expr {
        Expr::Label(Label {
            id: NodeId::next(),
            name: Some(name.to_string()),
            hint: name.to_string(),
            expr: Box::new(self.into()),
        })
    }

    fn cast(self, ty: LogicalType) -> Expr {
        Expr::Cast {
            expr: Box::new(self.into()),
            ty,
        }
    }

    fn asc(self) -> OrderBy {
        OrderBy {
            expr: self.into(),
            direction: Some(OrderDirection::Asc),
            nulls: None,
        }
    }

    fn desc(self) -> OrderBy {
        OrderBy {
            expr: self.into(),
            direction: Some(OrderDirection::Desc),
            nulls: None,
        }
    }
}

impl ExprExt for Expr {}
impl ExprExt for ColumnRef {}
impl ExprExt for BindParam {}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(n: i64) -> Expr {
        Expr::Literal(Value::Int(n))
    }

    #[test]
    fn test_grouping_by_precedence() {
        let sum = lit(1).add(lit(2));
        let product = sum.mul(lit(3));
        match product {
            Expr::Binary { left, op, .. } => {
                assert_eq!(op, BinaryOp::Mul);
                assert!(matches!(*left, Expr::Grouping(_)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_left_associative_chain_not_grouped() {
        let expr = lit(1).sub(lit(2)).sub(lit(3));
        match expr {
            Expr::Binary { left, .. } => assert!(matches!(*left, Expr::Binary { .. })),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_right_side_non_associative_grouped() {
        let expr = lit(1).sub(lit(2).sub(lit(3)));
        match expr {
            Expr::Binary { right, .. } => assert!(matches!(*right, Expr::Grouping(_))),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_or_inside_and_grouped() {
        let expr = lit(1).eq(lit(1)).and(lit(2).eq(lit(2)).or(lit(3).eq(lit(3))));
        match expr {
            Expr::Binary { right, op, .. } => {
                assert_eq!(op, BinaryOp::And);
                assert!(matches!(*right, Expr::Grouping(_)));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_eq_null_becomes_is() {
        let expr = lit(1).eq(Value::Null);
        assert!(matches!(
            expr,
            Expr::Binary {
                op: BinaryOp::Is,
                ..
            }
        ));
    }

    #[test]
    fn test_negate_folds_operator() {
        let expr = lit(1).eq(lit(2)).negate();
        assert!(matches!(
            expr,
            Expr::Binary {
                op: BinaryOp::Ne,
                ..
            }
        ));
        let expr = lit(1).is_in([1, 2]).negate();
        assert!(matches!(expr, Expr::InList { negated: true, .. }));
    }

    #[test]
    fn test_value_operand_becomes_anonymous_bind() {
        let expr = Expr::Literal(Value::Int(1)).label("x").eq(5);
        match expr {
            Expr::Binary { right, .. } => match *right {
                Expr::Bind(b) => {
                    assert!(b.is_anonymous());
                    assert_eq!(b.key(), "x");
                    assert_eq!(b.ty(), &LogicalType::Integer);
                }
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unlabeled_function_gets_anonymous_label() {
        let entry = Expr::Function(FunctionCall {
            name: "count".into(),
            args: vec![Expr::Wildcard(None)],
            return_type: None,
        })
        .into_select_entry();
        match entry {
            Expr::Label(l) => {
                assert_eq!(l.name(), None);
                assert_eq!(l.key(), "count");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
