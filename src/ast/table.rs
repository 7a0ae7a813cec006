//! Table metadata.
//!
//! Tables are declared as plain [`TableDef`]s and resolved together through a
//! [`MetaData`] builder, which checks every foreign key against the declared
//! tables before any statement can use them.
//!
//! ```ignore
//! let md = MetaData::builder()
//!     .table(TableDef::new("t1").column(ColumnDef::new("id", LogicalType::Integer).primary_key()))
//!     .table(
//!         TableDef::new("t2")
//!             .column(ColumnDef::new("id", LogicalType::Integer).primary_key())
//!             .column(ColumnDef::new("t1_id", LogicalType::Integer).references("t1.id")),
//!     )
//!     .build()?;
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use super::column::{ColumnRef, SourceRef};
use super::from::Alias;
use super::ids::NodeId;
use super::selectable::Selectable;
use super::types::LogicalType;
use super::values::Value;
use crate::error::{CompileError, CompileResult};

/// Column declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub ty: LogicalType,
    pub nullable: bool,
    pub primary_key: bool,
    pub default: Option<Value>,
    /// Inline foreign key target as `table.column` or `schema.table.column`.
    pub references: Option<String>,
    /// Inline single-column UNIQUE.
    pub unique: bool,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, ty: LogicalType) -> Self {
        Self {
            name: name.into(),
            ty,
            nullable: true,
            primary_key: false,
            default: None,
            references: None,
            unique: false,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn references(mut self, target: impl Into<String>) -> Self {
        self.references = Some(target.into());
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// Table-level foreign key declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKeyDef {
    pub name: Option<String>,
    pub columns: Vec<String>,
    pub referred_table: String,
    pub referred_columns: Vec<String>,
}

impl ForeignKeyDef {
    pub fn new(columns: &[&str], referred_table: &str, referred_columns: &[&str]) -> Self {
        Self {
            name: None,
            columns: columns.iter().map(|c| c.to_string()).collect(),
            referred_table: referred_table.to_string(),
            referred_columns: referred_columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// `[CONSTRAINT name] UNIQUE (columns)`
#[derive(Debug, Clone, PartialEq, Hash)]
pub struct UniqueConstraint {
    pub name: Option<String>,
    pub columns: Vec<String>,
}

impl UniqueConstraint {
    pub fn new(columns: &[&str]) -> Self {
        Self {
            name: None,
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// `[CONSTRAINT name] CHECK (sqltext)`; the text is emitted verbatim.
#[derive(Debug, Clone, PartialEq, Hash)]
pub struct CheckConstraint {
    pub name: Option<String>,
    pub sqltext: String,
}

impl CheckConstraint {
    pub fn new(sqltext: impl Into<String>) -> Self {
        Self {
            name: None,
            sqltext: sqltext.into(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Table declaration, resolved by [`MetaData::builder`].
#[derive(Debug, Clone, PartialEq)]
pub struct TableDef {
    pub name: String,
    pub schema: Option<String>,
    pub columns: Vec<ColumnDef>,
    pub foreign_keys: Vec<ForeignKeyDef>,
    pub unique_constraints: Vec<UniqueConstraint>,
    pub checks: Vec<CheckConstraint>,
}

impl TableDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
            columns: Vec::new(),
            foreign_keys: Vec::new(),
            unique_constraints: Vec::new(),
            checks: Vec::new(),
        }
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn column(mut self, column: ColumnDef) -> Self {
        self.columns.push(column);
        self
    }

    pub fn foreign_key(mut self, fk: ForeignKeyDef) -> Self {
        self.foreign_keys.push(fk);
        self
    }

    pub fn unique_constraint(mut self, unique: UniqueConstraint) -> Self {
        self.unique_constraints.push(unique);
        self
    }

    pub fn check(mut self, check: CheckConstraint) -> Self {
        self.checks.push(check);
        self
    }

    fn fullname(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", schema, self.name),
            None => self.name.clone(),
        }
    }
}

/// A resolved foreign key constraint.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKey {
    pub name: Option<String>,
    pub columns: Vec<String>,
    pub referred_table: NodeId,
    pub referred_table_name: String,
    pub referred_schema: Option<String>,
    pub referred_columns: Vec<String>,
}

struct TableInner {
    id: NodeId,
    name: String,
    schema: Option<String>,
    columns: Vec<ColumnDef>,
    foreign_keys: Vec<ForeignKey>,
    unique_constraints: Vec<UniqueConstraint>,
    checks: Vec<CheckConstraint>,
}

/// A table known to a [`MetaData`]. Cheap to clone; clones are the same table.
#[derive(Clone)]
pub struct Table(Arc<TableInner>);

impl Table {
    pub fn id(&self) -> NodeId {
        self.0.id
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn schema(&self) -> Option<&str> {
        self.0.schema.as_deref()
    }

    pub fn fullname(&self) -> String {
        match &self.0.schema {
            Some(schema) => format!("{}.{}", schema, self.0.name),
            None => self.0.name.clone(),
        }
    }

    pub fn column_defs(&self) -> &[ColumnDef] {
        &self.0.columns
    }

    pub fn column_def(&self, name: &str) -> Option<&ColumnDef> {
        self.0.columns.iter().find(|c| c.name == name)
    }

    pub fn foreign_keys(&self) -> &[ForeignKey] {
        &self.0.foreign_keys
    }

    pub fn unique_constraints(&self) -> &[UniqueConstraint] {
        &self.0.unique_constraints
    }

    pub fn checks(&self) -> &[CheckConstraint] {
        &self.0.checks
    }

    pub fn primary_key(&self) -> Vec<&ColumnDef> {
        self.0.columns.iter().filter(|c| c.primary_key).collect()
    }

    /// Named alias, rendered `table AS name`.
    pub fn alias(&self, name: &str) -> Alias {
        Alias::of_table(self.clone(), Some(name.to_string()))
    }

    /// Anonymous alias, named `<table>_<n>` at compile time.
    pub fn alias_anon(&self) -> Alias {
        Alias::of_table(self.clone(), None)
    }
}

impl Selectable for Table {
    fn columns(&self) -> Vec<ColumnRef> {
        self.0
            .columns
            .iter()
            .map(|c| ColumnRef::base(SourceRef::Table(self.clone()), &c.name, c.ty.clone()))
            .collect()
    }

    fn describe(&self) -> String {
        self.fullname()
    }
}

impl PartialEq for Table {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Table({} {:?})", self.fullname(), self.0.id)
    }
}

/// A resolved set of tables.
#[derive(Debug, Clone, Default)]
pub struct MetaData {
    tables: Vec<Table>,
    by_name: HashMap<String, usize>,
}

impl MetaData {
    pub fn builder() -> MetaDataBuilder {
        MetaDataBuilder::default()
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    /// Look up a table by name or `schema.name`.
    pub fn table(&self, name: &str) -> CompileResult<Table> {
        self.by_name
            .get(name)
            .map(|&i| self.tables[i].clone())
            .ok_or_else(|| CompileError::argument(format!("Unknown table '{}'", name)))
    }

    /// Tables ordered so that every table follows the tables it references.
    pub fn sorted_tables(&self) -> Vec<Table> {
        let mut out: Vec<Table> = Vec::with_capacity(self.tables.len());
        let mut placed: HashSet<NodeId> = HashSet::new();
        while out.len() < self.tables.len() {
            let before = out.len();
            for table in &self.tables {
                if placed.contains(&table.id()) {
                    continue;
                }
                let ready = table
                    .foreign_keys()
                    .iter()
                    .all(|fk| fk.referred_table == table.id() || placed.contains(&fk.referred_table));
                if ready {
                    placed.insert(table.id());
                    out.push(table.clone());
                }
            }
            if out.len() == before {
                // Reference cycle: emit the rest in declaration order.
                for table in &self.tables {
                    if placed.insert(table.id()) {
                        out.push(table.clone());
                    }
                }
            }
        }
        out
    }
}

#[derive(Debug, Clone, Default)]
pub struct MetaDataBuilder {
    defs: Vec<TableDef>,
}

impl MetaDataBuilder {
    pub fn table(mut self, def: TableDef) -> Self {
        self.defs.push(def);
        self
    }

    /// Resolve every foreign key and freeze the table set.
    pub fn build(self) -> CompileResult<MetaData> {
        let mut by_name: HashMap<String, usize> = HashMap::new();
        let mut ids = Vec::with_capacity(self.defs.len());

        for (i, def) in self.defs.iter().enumerate() {
            if def.name.is_empty() {
                return Err(CompileError::argument("Table name must not be empty"));
            }
            let fullname = def.fullname();
            if by_name.insert(fullname.clone(), i).is_some() {
                return Err(CompileError::argument(format!(
                    "Table '{}' is already defined",
                    fullname
                )));
            }
            let mut seen = HashSet::new();
            for col in &def.columns {
                if !seen.insert(col.name.as_str()) {
                    return Err(CompileError::argument(format!(
                        "Duplicate column '{}' on table '{}'",
                        col.name, fullname
                    )));
                }
            }
            ids.push(NodeId::next());
        }
        // Unqualified lookups also find schema-qualified tables when unambiguous.
        let mut short: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, def) in self.defs.iter().enumerate() {
            if def.schema.is_some() {
                short.entry(def.name.clone()).or_default().push(i);
            }
        }
        for (name, idxs) in short {
            if idxs.len() == 1 && !by_name.contains_key(&name) {
                by_name.insert(name, idxs[0]);
            }
        }

        let mut tables = Vec::with_capacity(self.defs.len());
        for (i, def) in self.defs.iter().enumerate() {
            let fullname = def.fullname();
            let mut fk_defs = def.foreign_keys.clone();
            for col in &def.columns {
                if let Some(target) = &col.references {
                    let (table, column) = target.rsplit_once('.').ok_or_else(|| {
                        CompileError::argument(format!(
                            "Foreign key target '{}' on '{}.{}' must be 'table.column'",
                            target, fullname, col.name
                        ))
                    })?;
                    fk_defs.push(ForeignKeyDef::new(&[col.name.as_str()], table, &[column]));
                }
            }

            let mut foreign_keys = Vec::with_capacity(fk_defs.len());
            for fk in fk_defs {
                if fk.columns.is_empty() || fk.columns.len() != fk.referred_columns.len() {
                    return Err(CompileError::argument(format!(
                        "Foreign key on '{}' must pair each local column with one referenced column",
                        fullname
                    )));
                }
                for local in &fk.columns {
                    if !def.columns.iter().any(|c| &c.name == local) {
                        return Err(CompileError::argument(format!(
                            "Foreign key on '{}' names unknown local column '{}'",
                            fullname, local
                        )));
                    }
                }
                let &target_idx = by_name.get(&fk.referred_table).ok_or_else(|| {
                    CompileError::NoReferencedTable {
                        table: fullname.clone(),
                        referenced: fk.referred_table.clone(),
                    }
                })?;
                let target = &self.defs[target_idx];
                for referred in &fk.referred_columns {
                    if !target.columns.iter().any(|c| &c.name == referred) {
                        return Err(CompileError::NoReferencedColumn {
                            table: fullname.clone(),
                            referenced: target.fullname(),
                            column: referred.clone(),
                        });
                    }
                }
                foreign_keys.push(ForeignKey {
                    name: fk.name,
                    columns: fk.columns,
                    referred_table: ids[target_idx],
                    referred_table_name: target.name.clone(),
                    referred_schema: target.schema.clone(),
                    referred_columns: fk.referred_columns,
                });
            }

            for unique in &def.unique_constraints {
                if unique.columns.is_empty() {
                    return Err(CompileError::argument(format!(
                        "UNIQUE constraint on '{}' names no columns",
                        fullname
                    )));
                }
                for local in &unique.columns {
                    if !def.columns.iter().any(|c| &c.name == local) {
                        return Err(CompileError::argument(format!(
                            "UNIQUE constraint on '{}' names unknown column '{}'",
                            fullname, local
                        )));
                    }
                }
            }

            tables.push(Table(Arc::new(TableInner {
                id: ids[i],
                name: def.name.clone(),
                schema: def.schema.clone(),
                columns: def.columns.clone(),
                foreign_keys,
                unique_constraints: def.unique_constraints.clone(),
                checks: def.checks.clone(),
            })));
        }

        Ok(MetaData { tables, by_name })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn int(name: &str) -> ColumnDef {
        ColumnDef::new(name, LogicalType::Integer)
    }

    #[test]
    fn test_resolves_foreign_keys() {
        let md = MetaData::builder()
            .table(TableDef::new("t1").column(int("id").primary_key()))
            .table(
                TableDef::new("t2")
                    .column(int("id").primary_key())
                    .column(int("t1_id").references("t1.id")),
            )
            .build()
            .unwrap();
        let t1 = md.table("t1").unwrap();
        let t2 = md.table("t2").unwrap();
        assert_eq!(t2.foreign_keys().len(), 1);
        assert_eq!(t2.foreign_keys()[0].referred_table, t1.id());
        assert_eq!(t2.foreign_keys()[0].referred_columns, vec!["id".to_string()]);
        assert_eq!(md.sorted_tables()[0].name(), "t1");
    }

    #[test]
    fn test_unknown_referenced_table() {
        let err = MetaData::builder()
            .table(TableDef::new("t2").column(int("t9_id").references("t9.id")))
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoReferencedTable);
    }

    #[test]
    fn test_unknown_referenced_column() {
        let err = MetaData::builder()
            .table(TableDef::new("t1").column(int("id")))
            .table(TableDef::new("t2").column(int("t1_id").references("t1.nope")))
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoReferencedColumn);
    }

    #[test]
    fn test_duplicate_table_rejected() {
        let err = MetaData::builder()
            .table(TableDef::new("t1"))
            .table(TableDef::new("t1"))
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
    }

    #[test]
    fn test_schema_qualified_lookup() {
        let md = MetaData::builder()
            .table(TableDef::new("accounts").schema("billing").column(int("id")))
            .build()
            .unwrap();
        assert_eq!(md.table("billing.accounts").unwrap().fullname(), "billing.accounts");
        assert_eq!(md.table("accounts").unwrap().schema(), Some("billing"));
    }

    #[test]
    fn test_unique_constraint_columns_checked() {
        let md = MetaData::builder()
            .table(
                TableDef::new("t1")
                    .column(int("a"))
                    .column(int("b"))
                    .unique_constraint(UniqueConstraint::new(&["a", "b"]).named("uq_ab"))
                    .check(CheckConstraint::new("a < b")),
            )
            .build()
            .unwrap();
        let t1 = md.table("t1").unwrap();
        assert_eq!(t1.unique_constraints()[0].name.as_deref(), Some("uq_ab"));
        assert_eq!(t1.checks()[0].sqltext, "a < b");

        let err = MetaData::builder()
            .table(
                TableDef::new("t2")
                    .column(int("a"))
                    .unique_constraint(UniqueConstraint::new(&["nope"])),
            )
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
    }

    #[test]
    fn test_missing_column_accessor() {
        let md = MetaData::builder()
            .table(TableDef::new("t1").column(int("id")))
            .build()
            .unwrap();
        let err = md.table("t1").unwrap().c("nope").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Argument);
    }
}
