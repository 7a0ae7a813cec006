//! UNION / INTERSECT / EXCEPT.

use super::column::{ColumnRef, Proxy, SourceRef};
use super::cte::Cte;
use super::expr::OrderBy;
use super::from::{Alias, AliasTarget};
use super::ids::NodeId;
use super::selectable::Selectable;
use super::statement::Queryable;
use crate::error::{CompileError, CompileResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SetOp {
    Union,
    UnionAll,
    Intersect,
    IntersectAll,
    Except,
    ExceptAll,
}

impl SetOp {
    pub fn keyword(self) -> &'static str {
        match self {
            SetOp::Union => "UNION",
            SetOp::UnionAll => "UNION ALL",
            SetOp::Intersect => "INTERSECT",
            SetOp::IntersectAll => "INTERSECT ALL",
            SetOp::Except => "EXCEPT",
            SetOp::ExceptAll => "EXCEPT ALL",
        }
    }
}

/// Two or more queries combined by one set operator.
#[derive(Debug, Clone, PartialEq)]
pub struct CompoundSelect {
    id: NodeId,
    op: SetOp,
    selects: Vec<Queryable>,
    order_by: Vec<OrderBy>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl CompoundSelect {
    pub fn new(op: SetOp, selects: Vec<Queryable>) -> CompileResult<Self> {
        if selects.len() < 2 {
            return Err(CompileError::argument(format!(
                "{} needs at least two queries",
                op.keyword()
            )));
        }
        let arity = selects[0].columns().len();
        for (i, q) in selects.iter().enumerate().skip(1) {
            let n = q.columns().len();
            if n != arity {
                return Err(CompileError::argument(format!(
                    "All selectables passed to {} must have identical numbers of columns; \
                     query #1 has {}, query #{} has {}",
                    op.keyword(),
                    arity,
                    i + 1,
                    n
                )));
            }
        }
        Ok(Self {
            id: NodeId::next(),
            op,
            selects,
            order_by: Vec::new(),
            limit: None,
            offset: None,
        })
    }

    pub fn order_by(mut self, ob: impl Into<OrderBy>) -> Self {
        self.order_by.push(ob.into());
        self
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn offset(mut self, n: u64) -> Self {
        self.offset = Some(n);
        self
    }

    /// Append another query. Chains of the same operator stay flat.
    pub fn union(self, other: impl Into<Queryable>) -> CompileResult<Self> {
        self.chain(SetOp::Union, other.into())
    }

    pub fn union_all(self, other: impl Into<Queryable>) -> CompileResult<Self> {
        self.chain(SetOp::UnionAll, other.into())
    }

    fn chain(self, op: SetOp, other: Queryable) -> CompileResult<Self> {
        if op == self.op && self.order_by.is_empty() && self.limit.is_none() && self.offset.is_none()
        {
            let mut selects = self.selects;
            selects.push(other);
            CompoundSelect::new(op, selects)
        } else {
            CompoundSelect::new(op, vec![Queryable::from(self), other])
        }
    }

    pub fn alias(self, name: &str) -> Alias {
        Alias::new(
            AliasTarget::Query(Queryable::from(self)),
            Some(name.to_string()),
        )
    }

    pub fn subquery(self) -> Alias {
        Alias::new(AliasTarget::Query(Queryable::from(self)), None)
    }

    pub fn cte(self, name: &str) -> Cte {
        Cte::new(name, self)
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn op(&self) -> SetOp {
        self.op
    }

    pub fn selects(&self) -> &[Queryable] {
        &self.selects
    }

    pub fn order_by_exprs(&self) -> &[OrderBy] {
        &self.order_by
    }

    pub fn limit_value(&self) -> Option<u64> {
        self.limit
    }

    pub fn offset_value(&self) -> Option<u64> {
        self.offset
    }
}

impl Selectable for CompoundSelect {
    /// Names and types come from the first query; lineage merges every
    /// query's column at the same position.
    fn columns(&self) -> Vec<ColumnRef> {
        let per_select: Vec<Vec<ColumnRef>> = self.selects.iter().map(|q| q.columns()).collect();
        let Some(first) = per_select.first() else {
            return Vec::new();
        };
        first
            .iter()
            .enumerate()
            .map(|(i, head)| {
                let lineage: Vec<&[Proxy]> = per_select
                    .iter()
                    .filter_map(|cols| cols.get(i).map(ColumnRef::proxies))
                    .collect();
                ColumnRef::project(
                    SourceRef::Derived(self.id),
                    head.name(),
                    head.ty().clone(),
                    head.label_id(),
                    lineage,
                )
            })
            .collect()
    }

    fn describe(&self) -> String {
        self.op.keyword().to_string()
    }
}
