//! CTE collection and dependency ordering.
//!
//! Every CTE referenced anywhere in the statement is hoisted into one WITH
//! clause. A CTE whose body mentions another one is emitted after it.

use std::collections::HashMap;

use super::walk::{Visitor, Walker};
use crate::ast::{Cte, NodeId, Statement};
use crate::dialect::DialectProfile;
use crate::error::{CompileError, CompileResult};

/// The WITH clause of one statement.
#[derive(Debug, Default)]
pub(crate) struct CtePlan {
    /// Definitions in emission order.
    pub ordered: Vec<Cte>,
    /// `WITH`, `WITH RECURSIVE`, or empty when there are no CTEs.
    pub keyword: &'static str,
}

impl CtePlan {
    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

#[derive(Default)]
struct Collector {
    first_seen: Vec<NodeId>,
    latest: HashMap<NodeId, Cte>,
    names: HashMap<String, NodeId>,
    deps: HashMap<NodeId, Vec<NodeId>>,
    stack: Vec<NodeId>,
}

impl Visitor for Collector {
    fn cte_ref(&mut self, cte: &Cte) -> CompileResult<()> {
        let id = cte.id();
        match self.names.get(cte.name()) {
            Some(existing) if *existing != id => {
                return Err(CompileError::compile(format!(
                    "Multiple, unrelated CTEs found with the same name: '{}'",
                    cte.name()
                )));
            }
            Some(_) => {}
            None => {
                self.names.insert(cte.name().to_string(), id);
            }
        }

        match self.latest.get(&id) {
            Some(known) if known.generation() >= cte.generation() => {}
            Some(_) => {
                self.latest.insert(id, cte.clone());
            }
            None => {
                self.first_seen.push(id);
                self.latest.insert(id, cte.clone());
            }
        }

        if let Some(&parent) = self.stack.last() {
            if parent != id {
                let deps = self.deps.entry(parent).or_default();
                if !deps.contains(&id) {
                    deps.push(id);
                }
            }
        }
        Ok(())
    }

    fn enter_cte(&mut self, cte: &Cte) {
        self.stack.push(cte.id());
    }

    fn exit_cte(&mut self, _cte: &Cte) {
        self.stack.pop();
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Visiting,
    Done,
}

impl Collector {
    /// Depth-first post-order from each CTE in first-seen order, so
    /// dependencies come out ahead of their dependents and unrelated CTEs
    /// keep their statement order.
    fn sorted(&self) -> CompileResult<Vec<Cte>> {
        let mut marks: HashMap<NodeId, Mark> = HashMap::new();
        let mut out: Vec<NodeId> = Vec::with_capacity(self.first_seen.len());
        for &id in &self.first_seen {
            self.visit(id, &mut marks, &mut Vec::new(), &mut out)?;
        }
        Ok(out
            .iter()
            .filter_map(|id| self.latest.get(id).cloned())
            .collect())
    }

    fn visit(
        &self,
        id: NodeId,
        marks: &mut HashMap<NodeId, Mark>,
        path: &mut Vec<NodeId>,
        out: &mut Vec<NodeId>,
    ) -> CompileResult<()> {
        match marks.get(&id) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::Visiting) => {
                let start = path.iter().position(|p| *p == id).unwrap_or(0);
                let cycle: Vec<&str> = path[start..]
                    .iter()
                    .chain(std::iter::once(&id))
                    .filter_map(|p| self.latest.get(p).map(Cte::name))
                    .collect();
                return Err(CompileError::compile(format!(
                    "circular CTE reference: {}",
                    cycle.join(" -> ")
                )));
            }
            None => {}
        }
        marks.insert(id, Mark::Visiting);
        path.push(id);
        for &dep in self.deps.get(&id).map(Vec::as_slice).unwrap_or(&[]) {
            self.visit(dep, marks, path, out)?;
        }
        path.pop();
        marks.insert(id, Mark::Done);
        out.push(id);
        Ok(())
    }
}

/// Collect, validate and order the CTEs of `stmt` for `dialect`.
pub(crate) fn plan(stmt: &Statement, dialect: &DialectProfile) -> CompileResult<CtePlan> {
    let mut collector = Collector::default();
    Walker::new(&mut collector).statement(stmt)?;
    if collector.first_seen.is_empty() {
        return Ok(CtePlan::default());
    }
    if !dialect.features.cte {
        return Err(CompileError::compile(format!(
            "Dialect '{}' does not support common table expressions",
            dialect.name
        )));
    }

    let ordered = collector.sorted()?;
    let keyword = if ordered.iter().any(Cte::is_recursive) {
        dialect.recursive_with_keyword().ok_or_else(|| {
            CompileError::compile(format!(
                "Dialect '{}' does not support recursive common table expressions",
                dialect.name
            ))
        })?
    } else {
        "WITH"
    };

    tracing::trace!(
        "cte order: {}",
        ordered.iter().map(Cte::name).collect::<Vec<_>>().join(", ")
    );
    Ok(CtePlan { ordered, keyword })
}
