//! Normalization helpers shared by the compiler stages and the cache.

use std::collections::HashMap;

use super::walk::{Visitor, Walker};
use crate::ast::{BindParam, Expr, NodeId, Statement, Value};
use crate::error::CompileResult;

/// Every distinct bind parameter of a statement, in canonical walk order.
///
/// Two statements with the same fingerprint list their binds in the same
/// order, which is what lets a cached statement take its values from a fresh
/// tree.
#[derive(Debug, Default)]
pub struct BindInventory {
    binds: Vec<BindParam>,
    index: HashMap<NodeId, usize>,
}

impl Visitor for BindInventory {
    fn bind(&mut self, bind: &BindParam) -> CompileResult<()> {
        if !self.index.contains_key(&bind.id()) {
            self.index.insert(bind.id(), self.binds.len());
            self.binds.push(bind.clone());
        }
        Ok(())
    }
}

impl BindInventory {
    pub fn collect(stmt: &Statement) -> CompileResult<Self> {
        let mut inventory = BindInventory::default();
        Walker::new(&mut inventory).statement(stmt)?;
        Ok(inventory)
    }

    pub fn binds(&self) -> &[BindParam] {
        &self.binds
    }

    pub fn position(&self, id: NodeId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// Current value of each bind, by inventory position.
    pub fn values(&self) -> Vec<Option<Value>> {
        self.binds
            .iter()
            .map(|b| b.current_value().cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.binds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.binds.is_empty()
    }
}

/// Strip parentheses that cannot change meaning: nested groupings and
/// groupings around atoms.
pub(crate) fn flatten_grouping(expr: &Expr) -> &Expr {
    match expr {
        Expr::Grouping(inner) => match inner.as_ref() {
            Expr::Grouping(_) => flatten_grouping(inner),
            Expr::Column(_)
            | Expr::Bind(_)
            | Expr::Literal(_)
            | Expr::Function(_)
            | Expr::Cast { .. }
            | Expr::Case(_)
            | Expr::ScalarSubquery(_)
            | Expr::Wildcard(_) => inner,
            _ => expr,
        },
        other => other,
    }
}
