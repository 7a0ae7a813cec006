//! INSERT, UPDATE and DELETE.
//!
//! Values given to these builders become named bind parameters keyed by
//! column, so `insert(&users).value("name", "x")` renders `:name`.

use super::cte::Cte;
use super::expr::{BindParam, Expr};
use super::operators::BinaryOp;
use super::selectable::Selectable;
use super::statement::Queryable;
use super::table::{ColumnDef, Table};
use super::values::Value;
use crate::error::{CompileError, CompileResult};

fn column_def<'a>(table: &'a Table, column: &str) -> CompileResult<&'a ColumnDef> {
    table.column_def(column).ok_or_else(|| {
        CompileError::argument(format!(
            "Unconsumed column name '{}' for table '{}'",
            column,
            table.name()
        ))
    })
}

fn keyed_bind(key: String, def: &ColumnDef, value: Value) -> Expr {
    Expr::Bind(BindParam::new(key).value(value).typed(def.ty.clone()))
}

fn and_together(existing: Option<Expr>, cond: Expr) -> Expr {
    match existing {
        Some(prev) => Expr::binary(prev, BinaryOp::And, cond),
        None => cond,
    }
}

/// Where INSERT rows come from.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertSource {
    DefaultValues,
    Values {
        columns: Vec<String>,
        rows: Vec<Vec<Expr>>,
    },
    Query {
        columns: Vec<String>,
        query: Queryable,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    table: Table,
    source: InsertSource,
    multi_row: bool,
    returning: Vec<Expr>,
    ctes: Vec<Cte>,
}

impl Insert {
    pub fn new(table: &Table) -> Self {
        Self {
            table: table.clone(),
            source: InsertSource::DefaultValues,
            multi_row: false,
            returning: Vec::new(),
            ctes: Vec::new(),
        }
    }

    /// Set one column of a single-row insert to a bound value.
    pub fn value(self, column: &str, value: impl Into<Value>) -> CompileResult<Self> {
        let def = column_def(&self.table, column)?;
        let expr = keyed_bind(column.to_string(), def, value.into());
        self.value_expr(column, expr)
    }

    /// Set one column of a single-row insert to an SQL expression.
    pub fn value_expr(mut self, column: &str, expr: impl Into<Expr>) -> CompileResult<Self> {
        column_def(&self.table, column)?;
        if self.multi_row {
            return Err(CompileError::argument(
                "Can't mix single-row values with a multi-row insert",
            ));
        }
        if matches!(self.source, InsertSource::DefaultValues) {
            self.source = InsertSource::Values {
                columns: vec![column.to_string()],
                rows: vec![vec![expr.into()]],
            };
            return Ok(self);
        }
        match &mut self.source {
            InsertSource::DefaultValues => {}
            InsertSource::Values { columns, rows } => {
                if columns.iter().any(|c| c == column) {
                    return Err(CompileError::argument(format!(
                        "Column '{}' is given more than once",
                        column
                    )));
                }
                columns.push(column.to_string());
                rows[0].push(expr.into());
            }
            InsertSource::Query { .. } => {
                return Err(CompileError::argument(
                    "Can't add values to an INSERT ... SELECT",
                ));
            }
        }
        Ok(self)
    }

    /// Multi-row VALUES; each value binds as `<column>_m<row>`.
    pub fn rows(mut self, columns: &[&str], rows: Vec<Vec<Value>>) -> CompileResult<Self> {
        if !matches!(self.source, InsertSource::DefaultValues) {
            return Err(CompileError::argument("INSERT values were already given"));
        }
        if rows.is_empty() {
            return Err(CompileError::argument("Multi-row insert needs at least one row"));
        }
        let defs = columns
            .iter()
            .map(|c| column_def(&self.table, c))
            .collect::<CompileResult<Vec<_>>>()?;
        let mut out = Vec::with_capacity(rows.len());
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != columns.len() {
                return Err(CompileError::argument(format!(
                    "Row {} has {} values for {} columns",
                    i,
                    row.len(),
                    columns.len()
                )));
            }
            out.push(
                row.into_iter()
                    .zip(&defs)
                    .map(|(v, def)| keyed_bind(format!("{}_m{}", def.name, i), def, v))
                    .collect(),
            );
        }
        self.source = InsertSource::Values {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: out,
        };
        self.multi_row = true;
        Ok(self)
    }

    /// `INSERT INTO t (cols) SELECT ...`.
    pub fn from_select(
        mut self,
        columns: &[&str],
        query: impl Into<Queryable>,
    ) -> CompileResult<Self> {
        if !matches!(self.source, InsertSource::DefaultValues) {
            return Err(CompileError::argument("INSERT values were already given"));
        }
        for c in columns {
            column_def(&self.table, c)?;
        }
        let query = query.into();
        let arity = query.columns().len();
        if arity != columns.len() {
            return Err(CompileError::argument(format!(
                "INSERT names {} columns but the query returns {}",
                columns.len(),
                arity
            )));
        }
        self.source = InsertSource::Query {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            query,
        };
        Ok(self)
    }

    pub fn returning<E: Into<Expr>>(mut self, exprs: impl IntoIterator<Item = E>) -> Self {
        self.returning
            .extend(exprs.into_iter().map(|e| e.into().into_select_entry()));
        self
    }

    pub fn add_cte(mut self, cte: Cte) -> Self {
        self.ctes.push(cte);
        self
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn source(&self) -> &InsertSource {
        &self.source
    }

    pub fn is_multi_row(&self) -> bool {
        self.multi_row
    }

    pub fn returning_exprs(&self) -> &[Expr] {
        &self.returning
    }

    pub fn attached_ctes(&self) -> &[Cte] {
        &self.ctes
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    table: Table,
    sets: Vec<(String, Expr)>,
    where_clause: Option<Expr>,
    returning: Vec<Expr>,
    ctes: Vec<Cte>,
}

impl Update {
    pub fn new(table: &Table) -> Self {
        Self {
            table: table.clone(),
            sets: Vec::new(),
            where_clause: None,
            returning: Vec::new(),
            ctes: Vec::new(),
        }
    }

    pub fn set(self, column: &str, value: impl Into<Value>) -> CompileResult<Self> {
        let def = column_def(&self.table, column)?;
        let expr = keyed_bind(column.to_string(), def, value.into());
        self.set_expr(column, expr)
    }

    pub fn set_expr(mut self, column: &str, expr: impl Into<Expr>) -> CompileResult<Self> {
        column_def(&self.table, column)?;
        if self.sets.iter().any(|(c, _)| c == column) {
            return Err(CompileError::argument(format!(
                "Column '{}' is set more than once",
                column
            )));
        }
        self.sets.push((column.to_string(), expr.into()));
        Ok(self)
    }

    pub fn filter(mut self, cond: impl Into<Expr>) -> Self {
        self.where_clause = Some(and_together(self.where_clause.take(), cond.into()));
        self
    }

    pub fn returning<E: Into<Expr>>(mut self, exprs: impl IntoIterator<Item = E>) -> Self {
        self.returning
            .extend(exprs.into_iter().map(|e| e.into().into_select_entry()));
        self
    }

    pub fn add_cte(mut self, cte: Cte) -> Self {
        self.ctes.push(cte);
        self
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn assignments(&self) -> &[(String, Expr)] {
        &self.sets
    }

    pub fn where_clause(&self) -> Option<&Expr> {
        self.where_clause.as_ref()
    }

    pub fn returning_exprs(&self) -> &[Expr] {
        &self.returning
    }

    pub fn attached_ctes(&self) -> &[Cte] {
        &self.ctes
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    table: Table,
    where_clause: Option<Expr>,
    returning: Vec<Expr>,
    ctes: Vec<Cte>,
}

impl Delete {
    pub fn new(table: &Table) -> Self {
        Self {
            table: table.clone(),
            where_clause: None,
            returning: Vec::new(),
            ctes: Vec::new(),
        }
    }

    pub fn filter(mut self, cond: impl Into<Expr>) -> Self {
        self.where_clause = Some(and_together(self.where_clause.take(), cond.into()));
        self
    }

    pub fn returning<E: Into<Expr>>(mut self, exprs: impl IntoIterator<Item = E>) -> Self {
        self.returning
            .extend(exprs.into_iter().map(|e| e.into().into_select_entry()));
        self
    }

    pub fn add_cte(mut self, cte: Cte) -> Self {
        self.ctes.push(cte);
        self
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn where_clause(&self) -> Option<&Expr> {
        self.where_clause.as_ref()
    }

    pub fn returning_exprs(&self) -> &[Expr] {
        &self.returning
    }

    pub fn attached_ctes(&self) -> &[Cte] {
        &self.ctes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::table::{MetaData, TableDef};
    use crate::ast::types::LogicalType;
    use crate::error::ErrorKind;

    fn users() -> Table {
        MetaData::builder()
            .table(
                TableDef::new("users")
                    .column(ColumnDef::new("id", LogicalType::Integer).primary_key())
                    .column(ColumnDef::new("name", LogicalType::string(50))),
            )
            .build()
            .unwrap()
            .table("users")
            .unwrap()
    }

    #[test]
    fn test_insert_unknown_column() {
        let err = Insert::new(&users()).value("nope", 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
    }

    #[test]
    fn test_insert_value_binds_by_column() {
        let ins = Insert::new(&users()).value("name", "x").unwrap();
        match ins.source() {
            InsertSource::Values { columns, rows } => {
                assert_eq!(columns, &vec!["name".to_string()]);
                match &rows[0][0] {
                    Expr::Bind(b) => {
                        assert_eq!(b.key(), "name");
                        assert!(!b.is_anonymous());
                        assert_eq!(b.ty(), &LogicalType::string(50));
                    }
                    other => panic!("unexpected {:?}", other),
                }
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_multi_row_keys() {
        let ins = Insert::new(&users())
            .rows(
                &["id", "name"],
                vec![
                    vec![Value::from(1), Value::from("a")],
                    vec![Value::from(2), Value::from("b")],
                ],
            )
            .unwrap();
        match ins.source() {
            InsertSource::Values { rows, .. } => match &rows[1][1] {
                Expr::Bind(b) => assert_eq!(b.key(), "name_m1"),
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
        assert!(ins.value("id", 3).is_err());
    }

    #[test]
    fn test_update_rejects_duplicate_set() {
        let err = Update::new(&users())
            .set("name", "a")
            .unwrap()
            .set("name", "b")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
    }
}
