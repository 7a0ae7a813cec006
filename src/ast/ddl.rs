//! CREATE/DROP TABLE and CREATE/DROP INDEX.

use super::table::Table;

#[derive(Debug, Clone, PartialEq)]
pub struct CreateTable {
    pub table: Table,
    pub if_not_exists: bool,
}

impl CreateTable {
    pub fn new(table: &Table) -> Self {
        Self {
            table: table.clone(),
            if_not_exists: false,
        }
    }

    pub fn if_not_exists(mut self) -> Self {
        self.if_not_exists = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DropTable {
    pub table: Table,
    pub if_exists: bool,
}

impl DropTable {
    pub fn new(table: &Table) -> Self {
        Self {
            table: table.clone(),
            if_exists: false,
        }
    }

    pub fn if_exists(mut self) -> Self {
        self.if_exists = true;
        self
    }
}

/// `CREATE [UNIQUE] INDEX name ON table (columns)`
///
/// Columns are checked against the table when the statement is compiled.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateIndex {
    pub name: String,
    pub table: Table,
    pub columns: Vec<String>,
    pub unique: bool,
    pub if_not_exists: bool,
}

impl CreateIndex {
    pub fn new(name: impl Into<String>, table: &Table, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            table: table.clone(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            unique: false,
            if_not_exists: false,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn if_not_exists(mut self) -> Self {
        self.if_not_exists = true;
        self
    }
}

/// `DROP INDEX name`; MySQL and SQL Server spell it `DROP INDEX name ON table`.
#[derive(Debug, Clone, PartialEq)]
pub struct DropIndex {
    pub name: String,
    pub table: Table,
    pub if_exists: bool,
}

impl DropIndex {
    pub fn new(name: impl Into<String>, table: &Table) -> Self {
        Self {
            name: name.into(),
            table: table.clone(),
            if_exists: false,
        }
    }

    pub fn if_exists(mut self) -> Self {
        self.if_exists = true;
        self
    }
}
