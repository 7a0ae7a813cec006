//! Common table expressions.
//!
//! A recursive CTE is built in two steps: the base query is declared with
//! [`Cte::recursive`], then [`Cte::union_all`] appends the recursive step,
//! which may reference the base through an alias. Each union produces a new
//! generation of the same CTE; compilation keeps only the latest generation.

use std::fmt;
use std::sync::Arc;

use super::column::{ColumnRef, SourceRef};
use super::compound::{CompoundSelect, SetOp};
use super::from::{Alias, AliasTarget};
use super::ids::NodeId;
use super::selectable::Selectable;
use super::statement::Queryable;
use crate::error::{CompileError, CompileResult};

struct CteInner {
    id: NodeId,
    name: String,
    columns: Option<Vec<String>>,
    query: Queryable,
    recursive: bool,
    generation: u32,
}

#[derive(Clone)]
pub struct Cte(Arc<CteInner>);

impl Cte {
    pub fn new(name: impl Into<String>, query: impl Into<Queryable>) -> Self {
        Self::build(name.into(), query.into(), false)
    }

    pub fn recursive(name: impl Into<String>, query: impl Into<Queryable>) -> Self {
        Self::build(name.into(), query.into(), true)
    }

    fn build(name: String, query: Queryable, recursive: bool) -> Self {
        Cte(Arc::new(CteInner {
            id: NodeId::next(),
            name,
            columns: None,
            query,
            recursive,
            generation: 0,
        }))
    }

    fn next_generation(&self, query: Queryable, columns: Option<Vec<String>>) -> Self {
        Cte(Arc::new(CteInner {
            id: self.0.id,
            name: self.0.name.clone(),
            columns,
            query,
            recursive: self.0.recursive,
            generation: self.0.generation + 1,
        }))
    }

    /// Rename the exported columns.
    pub fn with_columns(&self, names: &[&str]) -> CompileResult<Self> {
        let arity = self.0.query.columns().len();
        if names.len() != arity {
            return Err(CompileError::argument(format!(
                "CTE '{}' exports {} columns but {} names were given",
                self.0.name,
                arity,
                names.len()
            )));
        }
        let names = names.iter().map(|n| n.to_string()).collect();
        Ok(self.next_generation(self.0.query.clone(), Some(names)))
    }

    pub fn union_all(&self, step: impl Into<Queryable>) -> CompileResult<Self> {
        self.extend(SetOp::UnionAll, step.into())
    }

    pub fn union(&self, step: impl Into<Queryable>) -> CompileResult<Self> {
        self.extend(SetOp::Union, step.into())
    }

    fn extend(&self, op: SetOp, step: Queryable) -> CompileResult<Self> {
        let compound = CompoundSelect::new(op, vec![self.0.query.clone(), step])?;
        Ok(self.next_generation(Queryable::from(compound), self.0.columns.clone()))
    }

    pub fn alias(&self, name: &str) -> Alias {
        Alias::new(AliasTarget::Cte(self.clone()), Some(name.to_string()))
    }

    /// Anonymous alias, typically used to reference the CTE from its own
    /// recursive step.
    pub fn alias_anon(&self) -> Alias {
        Alias::new(AliasTarget::Cte(self.clone()), None)
    }

    pub fn id(&self) -> NodeId {
        self.0.id
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn query(&self) -> &Queryable {
        &self.0.query
    }

    pub fn is_recursive(&self) -> bool {
        self.0.recursive
    }

    pub fn generation(&self) -> u32 {
        self.0.generation
    }

    /// Explicit column names, if any were given.
    pub fn declared_columns(&self) -> Option<&[String]> {
        self.0.columns.as_deref()
    }
}

impl Selectable for Cte {
    fn columns(&self) -> Vec<ColumnRef> {
        let inner = self.0.query.columns();
        inner
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let renamed = self.0.columns.as_ref().and_then(|names| names.get(i));
                let name = renamed.map(String::as_str).unwrap_or(c.name());
                let label = if renamed.is_some() { None } else { c.label_id() };
                ColumnRef::project(
                    SourceRef::Cte(self.clone()),
                    name,
                    c.ty().clone(),
                    label,
                    [c.proxies()],
                )
            })
            .collect()
    }

    fn describe(&self) -> String {
        self.0.name.clone()
    }
}

impl PartialEq for Cte {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id && self.0.generation == other.0.generation
    }
}

impl fmt::Debug for Cte {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cte({} {:?} gen {})",
            self.0.name, self.0.id, self.0.generation
        )
    }
}
