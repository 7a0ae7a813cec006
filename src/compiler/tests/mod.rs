//! Compiler tests, grouped by concern. All statements are built against
//! the small schema below.

mod dialects;
mod features;

use crate::ast::{ColumnDef, LogicalType, MetaData, Statement, Table, TableDef};
use crate::compiler::{CompileOptions, CompiledStatement, Compiler};
use crate::dialect::DialectProfile;
use crate::error::CompileError;

fn int(name: &str) -> ColumnDef {
    ColumnDef::new(name, LogicalType::Integer)
}

fn varchar(name: &str, length: u32) -> ColumnDef {
    ColumnDef::new(
        name,
        LogicalType::String {
            length: Some(length),
        },
    )
}

/// `t2` and `t3` reference `t1`; `t3` does so twice; `lone` references
/// nothing.
fn metadata() -> MetaData {
    MetaData::builder()
        .table(
            TableDef::new("t1")
                .column(int("id").primary_key())
                .column(int("a"))
                .column(varchar("b", 20)),
        )
        .table(
            TableDef::new("t2")
                .column(int("id").primary_key())
                .column(int("t1_id").references("t1.id"))
                .column(varchar("data", 50)),
        )
        .table(
            TableDef::new("t3")
                .column(int("id").primary_key())
                .column(int("owner_id").references("t1.id"))
                .column(int("editor_id").references("t1.id")),
        )
        .table(TableDef::new("lone").column(int("id").primary_key()))
        .table(
            TableDef::new("parts")
                .column(varchar("part", 30))
                .column(varchar("sub_part", 30))
                .column(int("quantity")),
        )
        .build()
        .unwrap()
}

fn table(name: &str) -> Table {
    metadata().table(name).unwrap()
}

/// `t1` and `t2` from one metadata, so the foreign key between them
/// resolves.
fn t1_t2() -> (Table, Table) {
    let md = metadata();
    (md.table("t1").unwrap(), md.table("t2").unwrap())
}

fn compile(stmt: impl Into<Statement>, dialect: &DialectProfile) -> CompiledStatement {
    Compiler::default().compile(&stmt.into(), dialect).unwrap()
}

fn compile_literal(stmt: impl Into<Statement>, dialect: &DialectProfile) -> CompiledStatement {
    Compiler::default()
        .compile_with(&stmt.into(), dialect, CompileOptions::literal_binds())
        .unwrap()
}

fn compile_err(stmt: impl Into<Statement>, dialect: &DialectProfile) -> CompileError {
    Compiler::default()
        .compile(&stmt.into(), dialect)
        .unwrap_err()
}
