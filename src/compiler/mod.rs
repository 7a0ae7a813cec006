//! Statement compiler.
//!
//! A compilation runs a fixed sequence of passes over an immutable
//! statement:
//!
//! 1. bind inventory: every bind parameter in canonical walk order
//! 2. name assignment: aliases, labels and placeholders, length-bounded
//! 3. CTE ordering: one WITH clause, dependencies first
//! 4. render: SQL text plus the ordered parameter list
//! 5. result map: what each returned column is
//!
//! Each pass owns its state; nothing is shared between two compilations, so
//! one [`Compiler`] may serve any number of threads.

pub(crate) mod cte;
mod literal;
pub mod namer;
mod names;
pub mod normalize;
mod render;
mod result_map;
pub(crate) mod walk;

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::ast::{Correspondence, ColumnRef, Statement, Value, best_match};
use crate::dialect::DialectProfile;
use crate::error::{CompileError, CompileResult};
use crate::types::{HandlerRef, TypeRegistry, WireValue};

pub use namer::{IdentifierNamer, truncate_name};
pub use normalize::BindInventory;
pub use result_map::ResultColumn;

/// Per-call compile switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CompileOptions {
    /// Render bind values inline as SQL literals instead of placeholders.
    pub literal_binds: bool,
}

impl CompileOptions {
    pub fn literal_binds() -> Self {
        Self {
            literal_binds: true,
        }
    }
}

/// Position of one placeholder inside an expanded IN list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Element {
    pub index: usize,
    pub count: usize,
}

/// One entry of the parameter list, in placeholder order for positional
/// styles and first-occurrence order for named ones.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Placeholder name as rendered.
    pub name: String,
    /// Key a caller supplies a value under.
    pub key: String,
    /// Index of the owning bind in the statement's bind inventory.
    pub bind: usize,
    pub element: Option<Element>,
    pub handler: HandlerRef,
}

/// Output of one compilation.
#[derive(Debug, Clone)]
pub struct CompiledStatement {
    sql: String,
    parameters: Vec<Parameter>,
    result_columns: Vec<ResultColumn>,
    dialect: Arc<DialectProfile>,
    values: Vec<Option<Value>>,
}

impl CompiledStatement {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// `(placeholder, handler name)` pairs.
    pub fn parameter_types(&self) -> Vec<(&str, &str)> {
        self.parameters
            .iter()
            .map(|p| (p.name.as_str(), p.handler.name()))
            .collect()
    }

    pub fn result_columns(&self) -> &[ResultColumn] {
        &self.result_columns
    }

    pub fn dialect(&self) -> &DialectProfile {
        &self.dialect
    }

    /// Bind values captured from the statement, in inventory order.
    pub fn values(&self) -> &[Option<Value>] {
        &self.values
    }

    /// The same SQL with bind values taken from another statement of the
    /// same shape.
    pub(crate) fn with_values(&self, values: Vec<Option<Value>>) -> Self {
        Self {
            values,
            ..self.clone()
        }
    }

    /// Values for every parameter, in parameter order. `overrides` replaces
    /// values by bind key; an expanding bind must keep its element count.
    pub fn construct_params(
        &self,
        overrides: &HashMap<String, Value>,
    ) -> CompileResult<Vec<(String, Value)>> {
        let mut out = Vec::with_capacity(self.parameters.len());
        for p in &self.parameters {
            let value = match overrides.get(&p.key) {
                Some(v) => v,
                None => self
                    .values
                    .get(p.bind)
                    .and_then(Option::as_ref)
                    .ok_or_else(|| {
                        CompileError::argument(format!(
                            "A value is required for bind parameter '{}'",
                            p.key
                        ))
                    })?,
            };
            let value = match p.element {
                None => value.clone(),
                Some(Element { index, count }) => match value {
                    Value::Array(items) if items.len() == count => items[index].clone(),
                    Value::Array(items) => {
                        return Err(CompileError::argument(format!(
                            "Expanding bind parameter '{}' was compiled for {} values, got {}",
                            p.key,
                            count,
                            items.len()
                        )));
                    }
                    other => {
                        return Err(CompileError::argument(format!(
                            "Expanding bind parameter '{}' requires a list value, got {}",
                            p.key,
                            other.kind_name()
                        )));
                    }
                },
            };
            out.push((p.name.clone(), value));
        }
        Ok(out)
    }

    /// [`construct_params`](Self::construct_params) converted to driver
    /// values through each parameter's handler.
    pub fn encode_params(
        &self,
        overrides: &HashMap<String, Value>,
    ) -> CompileResult<Vec<(String, WireValue)>> {
        let values = self.construct_params(overrides)?;
        self.parameters
            .iter()
            .zip(values)
            .map(|(p, (name, value))| Ok((name, p.handler.encode(&value, &self.dialect)?)))
            .collect()
    }

    /// Decode one driver row positionally through the result map.
    pub fn decode_row(&self, row: &[WireValue]) -> CompileResult<Vec<Value>> {
        if row.len() != self.result_columns.len() {
            return Err(CompileError::argument(format!(
                "row has {} values, statement returns {} columns",
                row.len(),
                self.result_columns.len()
            )));
        }
        self.result_columns
            .iter()
            .zip(row)
            .map(|(c, wire)| c.handler.decode(wire, &self.dialect))
            .collect()
    }

    /// Position of the result column that derives from `column` through the
    /// shortest lineage.
    pub fn column_position(&self, column: &ColumnRef) -> Option<usize> {
        let found = best_match(
            self.result_columns.iter().map(|c| c.proxies.as_slice()),
            column.proxies(),
        );
        if let Correspondence::Tied { chosen, others } = &found {
            warn!(
                "column '{}' matches {} result columns; using position {}",
                column.name(),
                others.len() + 1,
                chosen
            );
        }
        found.index()
    }
}

/// Compiles statements against dialect profiles.
#[derive(Clone)]
pub struct Compiler {
    registry: Arc<TypeRegistry>,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new(TypeRegistry::with_builtins())
    }
}

impl Compiler {
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    pub fn compile(
        &self,
        stmt: &Statement,
        dialect: &DialectProfile,
    ) -> CompileResult<CompiledStatement> {
        self.compile_with(stmt, dialect, CompileOptions::default())
    }

    pub fn compile_with(
        &self,
        stmt: &Statement,
        dialect: &DialectProfile,
        options: CompileOptions,
    ) -> CompileResult<CompiledStatement> {
        if options.literal_binds && !dialect.features.literal_binds {
            return Err(CompileError::compile(format!(
                "Dialect '{}' does not support rendering bind values as literals",
                dialect.name
            )));
        }

        let inventory = BindInventory::collect(stmt)?;
        let mut namer = IdentifierNamer::new(dialect.max_identifier_length());
        let names = names::NameTable::assign(stmt, &mut namer)?;
        let plan = cte::plan(stmt, dialect)?;

        let (sql, parameters) = render::Renderer::new(
            dialect,
            &self.registry,
            &names,
            &mut namer,
            &inventory,
            options.literal_binds,
        )
        .statement(stmt, &plan)?;

        let result_columns =
            result_map::build(stmt, &names, &mut namer, &self.registry, dialect)?;

        debug!(
            "compiled {} for {}: {} parameters, {} result columns",
            stmt.kind(),
            dialect.name,
            parameters.len(),
            result_columns.len()
        );

        Ok(CompiledStatement {
            sql,
            parameters,
            result_columns,
            dialect: Arc::new(dialect.clone()),
            values: inventory.values(),
        })
    }
}
