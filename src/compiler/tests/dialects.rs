//! Per-dialect rendering: paramstyles, quoting, row limits and operators.

use pretty_assertions::assert_eq;

use super::*;
use crate::ast::{ExprExt, Selectable, TableDef, bindparam, lit, select};
use crate::dialect::ParamStyle;
use crate::error::ErrorKind;

fn shared_bind_sql(style: ParamStyle) -> (String, usize) {
    let t1 = table("t1");
    let stmt = select([t1.c("a").unwrap()]).filter(
        t1.c("a")
            .unwrap()
            .eq(bindparam("x"))
            .or(t1.c("id").unwrap().eq(bindparam("x"))),
    );
    let compiled = compile(stmt, &DialectProfile::generic().with_paramstyle(style));
    (compiled.sql().to_string(), compiled.parameters().len())
}

#[test]
fn test_paramstyles() {
    let cases = [
        (ParamStyle::Named, "t1.a = :x OR t1.id = :x", 1),
        (ParamStyle::Qmark, "t1.a = ? OR t1.id = ?", 2),
        (ParamStyle::Numbered, "t1.a = :1 OR t1.id = :2", 2),
        (ParamStyle::Dollar, "t1.a = $1 OR t1.id = $2", 2),
        (ParamStyle::Format, "t1.a = %s OR t1.id = %s", 2),
        (ParamStyle::Pyformat, "t1.a = %(x)s OR t1.id = %(x)s", 1),
    ];
    for (style, clause, count) in cases {
        let (sql, params) = shared_bind_sql(style);
        assert_eq!(sql, format!("SELECT t1.a FROM t1 WHERE {}", clause), "{}", style);
        assert_eq!(params, count, "{}", style);
    }
}

#[test]
fn test_identifier_quoting() {
    let md = MetaData::builder()
        .table(
            TableDef::new("order")
                .column(int("id").primary_key())
                .column(int("Total")),
        )
        .build()
        .unwrap();
    let order = md.table("order").unwrap();
    let stmt = select([order.c("id").unwrap(), order.c("Total").unwrap()]);

    let cases = [
        (
            DialectProfile::postgresql(),
            r#"SELECT "order".id, "order"."Total" FROM "order""#,
        ),
        (
            DialectProfile::mysql(),
            "SELECT `order`.id, `order`.`Total` FROM `order`",
        ),
        (
            DialectProfile::mssql(),
            "SELECT [order].id, [order].[Total] FROM [order]",
        ),
    ];
    for (dialect, expected) in cases {
        assert_eq!(compile(stmt.clone(), &dialect).sql(), expected);
    }
}

#[test]
fn test_limit_offset_forms() {
    let t1 = table("t1");
    let base = select([t1.c("a").unwrap()]);

    let generic = DialectProfile::generic();
    assert_eq!(
        compile(base.clone().limit(10).offset(20), &generic).sql(),
        "SELECT t1.a FROM t1 LIMIT 10 OFFSET 20"
    );
    assert_eq!(
        compile(base.clone().offset(20), &generic).sql(),
        "SELECT t1.a FROM t1 OFFSET 20"
    );
    assert_eq!(
        compile(base.clone().offset(20), &DialectProfile::sqlite()).sql(),
        "SELECT t1.a FROM t1 LIMIT -1 OFFSET 20"
    );
    assert_eq!(
        compile(base.clone().offset(20), &DialectProfile::mysql()).sql(),
        "SELECT t1.a FROM t1 LIMIT 18446744073709551615 OFFSET 20"
    );
    assert_eq!(
        compile(base.clone().limit(10).offset(20), &DialectProfile::oracle()).sql(),
        "SELECT t1.a FROM t1 OFFSET 20 ROWS FETCH FIRST 10 ROWS ONLY"
    );
}

#[test]
fn test_mssql_top_and_offset() {
    let t1 = table("t1");
    let base = select([t1.c("a").unwrap()]);
    let mssql = DialectProfile::mssql();

    assert_eq!(
        compile(base.clone().limit(5).distinct(), &mssql).sql(),
        "SELECT DISTINCT TOP 5 t1.a FROM t1"
    );
    assert_eq!(
        compile(
            base.clone().order_by(t1.c("a").unwrap()).limit(10).offset(20),
            &mssql
        )
        .sql(),
        "SELECT t1.a FROM t1 ORDER BY t1.a OFFSET 20 ROWS FETCH NEXT 10 ROWS ONLY"
    );
    let err = compile_err(base.offset(20), &mssql);
    assert_eq!(err.kind(), ErrorKind::Compile);
}

#[test]
fn test_oracle_dual_and_bare_alias() {
    let oracle = DialectProfile::oracle();
    assert_eq!(
        compile(select([lit(1)]), &oracle).sql(),
        "SELECT 1 AS anon_1 FROM DUAL"
    );

    let t1 = table("t1");
    let x = t1.alias("x");
    assert_eq!(
        compile(select([x.c("a").unwrap()]), &oracle).sql(),
        "SELECT x.a FROM t1 x"
    );
}

#[test]
fn test_boolean_literals() {
    let stmt = select([lit(true).label("flag")]);
    assert_eq!(
        compile(stmt.clone(), &DialectProfile::postgresql()).sql(),
        "SELECT true AS flag"
    );
    assert_eq!(
        compile(stmt, &DialectProfile::sqlite()).sql(),
        "SELECT 1 AS flag"
    );
}

#[test]
fn test_concat_without_operator() {
    let t1 = table("t1");
    let stmt = select([t1.c("b").unwrap().concat(t1.c("b").unwrap()).label("bb")]);
    assert_eq!(
        compile(stmt.clone(), &DialectProfile::generic()).sql(),
        "SELECT t1.b || t1.b AS bb FROM t1"
    );
    assert_eq!(
        compile(stmt, &DialectProfile::mysql()).sql(),
        "SELECT concat(t1.b, t1.b) AS bb FROM t1"
    );
}

#[test]
fn test_ilike_fallback() {
    let t1 = table("t1");
    let stmt = select([t1.c("a").unwrap()]).filter(t1.c("b").unwrap().ilike("x%"));
    assert_eq!(
        compile(stmt.clone(), &DialectProfile::postgresql()).sql(),
        "SELECT t1.a FROM t1 WHERE t1.b ILIKE $1"
    );
    assert_eq!(
        compile(stmt, &DialectProfile::generic()).sql(),
        "SELECT t1.a FROM t1 WHERE lower(t1.b) LIKE lower(:b_1)"
    );
}

#[test]
fn test_percent_doubled_for_format_styles() {
    let t1 = table("t1");
    let stmt = select([t1.c("a").unwrap().modulo(lit(2)).label("m")]);
    assert_eq!(
        compile(stmt.clone(), &DialectProfile::mysql()).sql(),
        "SELECT t1.a %% 2 AS m FROM t1"
    );
    assert_eq!(
        compile(stmt.clone(), &DialectProfile::generic()).sql(),
        "SELECT t1.a % 2 AS m FROM t1"
    );
    assert_eq!(
        compile_literal(stmt, &DialectProfile::mysql()).sql(),
        "SELECT t1.a % 2 AS m FROM t1"
    );
}

#[test]
fn test_nulls_ordering_support() {
    let t1 = table("t1");
    let stmt = select([t1.c("a").unwrap()]).order_by(t1.c("a").unwrap().desc().nulls_last());
    assert_eq!(
        compile(stmt.clone(), &DialectProfile::postgresql()).sql(),
        "SELECT t1.a FROM t1 ORDER BY t1.a DESC NULLS LAST"
    );
    let err = compile_err(stmt, &DialectProfile::mysql());
    assert_eq!(err.kind(), ErrorKind::Compile);
}
