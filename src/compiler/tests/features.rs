//! Literal binds, expanding IN, subqueries, compounds, text, row locking,
//! DML and DDL.

use std::collections::HashMap;

use pretty_assertions::assert_eq;

use super::*;
use crate::ast::{
    CheckConstraint, CreateIndex, CreateTable, Delete, DropIndex, DropTable, Expr, ExprExt,
    ForUpdate, Insert, Selectable, UniqueConstraint, Update, Value, bindparam, case, cast,
    count_star, exists, lit, select, text, union_all,
};
use crate::compiler::Element;
use crate::dialect::{Features, ParamStyle};
use crate::error::ErrorKind;
use crate::types::WireValue;

#[test]
fn test_literal_binds() {
    let t1 = table("t1");
    let stmt = select([t1.c("a").unwrap()])
        .filter(t1.c("b").unwrap().eq("it's").and(t1.c("a").unwrap().gt(3)));
    let compiled = compile_literal(stmt, &DialectProfile::generic());
    assert_eq!(
        compiled.sql(),
        "SELECT t1.a FROM t1 WHERE t1.b = 'it''s' AND t1.a > 3"
    );
    assert!(compiled.parameters().is_empty());
}

#[test]
fn test_literal_binds_need_values() {
    let t1 = table("t1");
    let stmt = select([t1.c("a").unwrap()]).filter(t1.c("a").unwrap().eq(bindparam("x")));
    let err = Compiler::default()
        .compile_with(
            &stmt.clone().into(),
            &DialectProfile::generic(),
            CompileOptions::literal_binds(),
        )
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Compile);

    let no_literals = DialectProfile::generic().with_features(Features {
        literal_binds: false,
        ..Features::default()
    });
    let err = Compiler::default()
        .compile_with(&stmt.into(), &no_literals, CompileOptions::literal_binds())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Compile);
}

#[test]
fn test_expanding_in() {
    let t1 = table("t1");
    let stmt = select([t1.c("b").unwrap()]).filter(t1.c("a").unwrap().is_in([1, 2, 3]));

    let named = compile(stmt.clone(), &DialectProfile::generic());
    assert_eq!(
        named.sql(),
        "SELECT t1.b FROM t1 WHERE t1.a IN (:a_1_1, :a_1_2, :a_1_3)"
    );
    let elements: Vec<Option<Element>> = named.parameters().iter().map(|p| p.element).collect();
    assert_eq!(
        elements,
        vec![
            Some(Element { index: 0, count: 3 }),
            Some(Element { index: 1, count: 3 }),
            Some(Element { index: 2, count: 3 }),
        ]
    );
    let params = named.construct_params(&HashMap::new()).unwrap();
    assert_eq!(
        params,
        vec![
            ("a_1_1".to_string(), Value::Int(1)),
            ("a_1_2".to_string(), Value::Int(2)),
            ("a_1_3".to_string(), Value::Int(3)),
        ]
    );

    let qmark = compile(stmt.clone(), &DialectProfile::sqlite());
    assert_eq!(qmark.sql(), "SELECT t1.b FROM t1 WHERE t1.a IN (?, ?, ?)");

    let literal = compile_literal(stmt, &DialectProfile::generic());
    assert_eq!(literal.sql(), "SELECT t1.b FROM t1 WHERE t1.a IN (1, 2, 3)");
}

#[test]
fn test_expanding_override_must_keep_count() {
    let t1 = table("t1");
    let stmt = select([t1.c("b").unwrap()]).filter(t1.c("a").unwrap().is_in([1, 2]));
    let compiled = compile(stmt, &DialectProfile::generic());

    let same = HashMap::from([(
        "a_1".to_string(),
        Value::Array(vec![Value::Int(7), Value::Int(8)]),
    )]);
    let params = compiled.construct_params(&same).unwrap();
    assert_eq!(params[1], ("a_1_2".to_string(), Value::Int(8)));

    let longer = HashMap::from([(
        "a_1".to_string(),
        Value::Array(vec![Value::Int(7), Value::Int(8), Value::Int(9)]),
    )]);
    let err = compiled.construct_params(&longer).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Argument);
}

#[test]
fn test_empty_in() {
    let t1 = table("t1");
    let empty: Vec<i64> = Vec::new();
    let stmt = select([t1.c("b").unwrap()]).filter(t1.c("a").unwrap().is_in(empty.clone()));
    let compiled = compile(stmt, &DialectProfile::generic());
    assert_eq!(compiled.sql(), "SELECT t1.b FROM t1 WHERE 1 != 1");
    assert!(compiled.parameters().is_empty());

    let stmt = select([t1.c("b").unwrap()]).filter(t1.c("a").unwrap().not_in(empty));
    let compiled = compile(stmt, &DialectProfile::generic());
    assert_eq!(compiled.sql(), "SELECT t1.b FROM t1 WHERE 1 = 1");
}

#[test]
fn test_correlated_scalar_subquery() {
    let (t1, t2) = t1_t2();
    let inner = select([count_star()]).filter(t2.c("t1_id").unwrap().eq(t1.c("id").unwrap()));
    let stmt = select([Expr::from(t1.c("a").unwrap()), inner.scalar_subquery()]);
    let compiled = compile(stmt, &DialectProfile::generic());
    assert_eq!(
        compiled.sql(),
        "SELECT t1.a, (SELECT count(*) FROM t2 WHERE t2.t1_id = t1.id) AS anon_1 FROM t1"
    );
}

#[test]
fn test_exists_and_in_subquery() {
    let (t1, t2) = t1_t2();
    let has_rows = exists(
        select([t2.c("id").unwrap()]).filter(t2.c("t1_id").unwrap().eq(t1.c("id").unwrap())),
    );
    let stmt = select([t1.c("a").unwrap()]).filter(has_rows);
    assert_eq!(
        compile(stmt, &DialectProfile::generic()).sql(),
        "SELECT t1.a FROM t1 WHERE EXISTS (SELECT t2.id FROM t2 WHERE t2.t1_id = t1.id)"
    );

    let stmt = select([t1.c("a").unwrap()])
        .filter(t1.c("id").unwrap().in_select(select([t2.c("t1_id").unwrap()])));
    assert_eq!(
        compile(stmt, &DialectProfile::generic()).sql(),
        "SELECT t1.a FROM t1 WHERE t1.id IN (SELECT t2.t1_id FROM t2)"
    );
}

#[test]
fn test_fully_correlated_subquery_is_an_error() {
    let t1 = table("t1");
    let inner = select([t1.c("b").unwrap()]).filter(t1.c("a").unwrap().gt(1));
    let stmt = select([t1.c("a").unwrap()]).filter(exists(inner));
    let err = compile_err(stmt, &DialectProfile::generic());
    assert_eq!(err.kind(), ErrorKind::Compile);
    assert!(err.to_string().contains("auto-correlation"));
}

#[test]
fn test_case_cast_between() {
    let t1 = table("t1");
    let stmt = select([
        case(
            [(t1.c("a").unwrap().gt(10), lit("big"))],
            Some(lit("small")),
        )
        .label("size"),
        cast(t1.c("a").unwrap(), crate::ast::LogicalType::Text).label("a_text"),
    ])
    .filter(t1.c("a").unwrap().between(1, 5));
    let compiled = compile_literal(stmt, &DialectProfile::generic());
    assert_eq!(
        compiled.sql(),
        "SELECT CASE WHEN t1.a > 10 THEN 'big' ELSE 'small' END AS size, \
         CAST(t1.a AS TEXT) AS a_text FROM t1 WHERE t1.a BETWEEN 1 AND 5"
    );
}

#[test]
fn test_compound_members_grouped_when_limited() {
    let (t1, t2) = t1_t2();
    let first = select([t1.c("id").unwrap()]);
    let second = select([t2.c("t1_id").unwrap()]).limit(5);
    let stmt = union_all([first, second]).unwrap().limit(10);
    let compiled = compile(stmt, &DialectProfile::generic());
    assert_eq!(
        compiled.sql(),
        "SELECT t1.id FROM t1 UNION ALL (SELECT t2.t1_id FROM t2 LIMIT 5) LIMIT 10"
    );
}

#[test]
fn test_intersect_unsupported() {
    let (t1, t2) = t1_t2();
    let stmt = select([t1.c("id").unwrap()])
        .intersect(select([t2.c("t1_id").unwrap()]))
        .unwrap();
    assert_eq!(
        compile(stmt.clone(), &DialectProfile::generic()).sql(),
        "SELECT t1.id FROM t1 INTERSECT SELECT t2.t1_id FROM t2"
    );
    let err = compile_err(stmt, &DialectProfile::mysql());
    assert_eq!(err.kind(), ErrorKind::Compile);
}

#[test]
fn test_insert_forms() {
    let t1 = table("t1");
    let single = Insert::new(&t1).value("id", 1).unwrap().value("b", "x").unwrap();
    let compiled = compile(single, &DialectProfile::generic());
    assert_eq!(compiled.sql(), "INSERT INTO t1 (id, b) VALUES (:id, :b)");
    assert_eq!(
        compiled.parameter_types(),
        vec![("id", "IntegerHandler"), ("b", "StringHandler")]
    );

    let multi = Insert::new(&t1)
        .rows(
            &["id", "a"],
            vec![vec![1.into(), 2.into()], vec![3.into(), 4.into()]],
        )
        .unwrap();
    assert_eq!(
        compile(multi.clone(), &DialectProfile::generic()).sql(),
        "INSERT INTO t1 (id, a) VALUES (:id_m0, :a_m0), (:id_m1, :a_m1)"
    );
    let err = compile_err(multi, &DialectProfile::oracle());
    assert_eq!(err.kind(), ErrorKind::Compile);

    assert_eq!(
        compile(Insert::new(&t1), &DialectProfile::generic()).sql(),
        "INSERT INTO t1 DEFAULT VALUES"
    );
}

#[test]
fn test_insert_returning() {
    let t1 = table("t1");
    let stmt = Insert::new(&t1)
        .value("a", 5)
        .unwrap()
        .returning([t1.c("id").unwrap()]);
    let compiled = compile(stmt.clone(), &DialectProfile::postgresql());
    assert_eq!(compiled.sql(), "INSERT INTO t1 (a) VALUES ($1) RETURNING t1.id");
    assert_eq!(compiled.result_columns().len(), 1);
    assert_eq!(compiled.result_columns()[0].name, "id");
    assert_eq!(
        compiled.result_columns()[0].origin,
        Some(t1.c("id").unwrap().identity())
    );

    let err = compile_err(stmt, &DialectProfile::generic());
    assert_eq!(err.kind(), ErrorKind::Compile);
}

#[test]
fn test_update_and_delete() {
    let t1 = table("t1");
    let update = Update::new(&t1)
        .set("b", "y")
        .unwrap()
        .filter(t1.c("id").unwrap().eq(1));
    assert_eq!(
        compile(update, &DialectProfile::generic()).sql(),
        "UPDATE t1 SET b=:b WHERE t1.id = :id_1"
    );

    let delete = Delete::new(&t1).filter(t1.c("a").unwrap().lt(0));
    let compiled = compile(delete, &DialectProfile::generic().with_paramstyle(ParamStyle::Qmark));
    assert_eq!(compiled.sql(), "DELETE FROM t1 WHERE t1.a < ?");
    assert_eq!(
        compiled.construct_params(&HashMap::new()).unwrap(),
        vec![("a_1".to_string(), Value::Int(0))]
    );
}

#[test]
fn test_create_and_drop_table() {
    let md = metadata();
    let t2 = md.table("t2").unwrap();
    assert_eq!(
        compile(CreateTable::new(&t2), &DialectProfile::generic()).sql(),
        "CREATE TABLE t2 (\n\tid INTEGER NOT NULL, \n\tt1_id INTEGER, \n\tdata VARCHAR(50), \
         \n\tPRIMARY KEY (id), \n\tFOREIGN KEY(t1_id) REFERENCES t1 (id)\n)"
    );
    assert_eq!(
        compile(DropTable::new(&t2).if_exists(), &DialectProfile::generic()).sql(),
        "DROP TABLE IF EXISTS t2"
    );
    let err = compile_err(DropTable::new(&t2).if_exists(), &DialectProfile::oracle());
    assert_eq!(err.kind(), ErrorKind::Compile);
}

#[test]
fn test_text_fragments() {
    let t1 = table("t1");
    let cond = text("t1.a > :low AND t1.b LIKE '10%'").bind("low", 5).unwrap();
    let stmt = select([t1.c("a").unwrap()]).filter(cond);

    let named = compile(stmt.clone(), &DialectProfile::generic());
    assert_eq!(
        named.sql(),
        "SELECT t1.a FROM t1 WHERE t1.a > :low AND t1.b LIKE '10%'"
    );
    assert_eq!(
        named.construct_params(&HashMap::new()).unwrap(),
        vec![("low".to_string(), Value::Int(5))]
    );
    assert_eq!(
        compile(stmt.clone(), &DialectProfile::mysql()).sql(),
        "SELECT t1.a FROM t1 WHERE t1.a > %s AND t1.b LIKE '10%%'"
    );
    assert_eq!(
        compile_literal(stmt, &DialectProfile::generic()).sql(),
        "SELECT t1.a FROM t1 WHERE t1.a > 5 AND t1.b LIKE '10%'"
    );
}

#[test]
fn test_textual_select_result_map() {
    let stmt = text("SELECT id, flag FROM t WHERE id = :id")
        .bind("id", 3)
        .unwrap()
        .columns([("id", LogicalType::Integer), ("flag", LogicalType::Boolean)]);
    let compiled = compile(stmt, &DialectProfile::sqlite());
    assert_eq!(compiled.sql(), "SELECT id, flag FROM t WHERE id = ?");

    let names: Vec<&str> = compiled
        .result_columns()
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(names, vec!["id", "flag"]);
    let row = compiled
        .decode_row(&[WireValue::Int(3), WireValue::Int(1)])
        .unwrap();
    assert_eq!(row, vec![Value::Int(3), Value::Bool(true)]);
}

#[test]
fn test_select_for_update() {
    let t1 = table("t1");
    let base = select([t1.c("a").unwrap()]).filter(t1.c("id").unwrap().eq(1));

    assert_eq!(
        compile(base.clone().for_update(), &DialectProfile::generic()).sql(),
        "SELECT t1.a FROM t1 WHERE t1.id = :id_1 FOR UPDATE"
    );
    assert_eq!(
        compile(
            base.clone().with_for_update(ForUpdate::read().nowait()),
            &DialectProfile::postgresql()
        )
        .sql(),
        "SELECT t1.a FROM t1 WHERE t1.id = $1 FOR SHARE NOWAIT"
    );
    assert_eq!(
        compile(
            base.clone().with_for_update(ForUpdate::read().nowait()),
            &DialectProfile::mysql()
        )
        .sql(),
        "SELECT t1.a FROM t1 WHERE t1.id = %s LOCK IN SHARE MODE"
    );
    assert_eq!(
        compile(
            base.clone().with_for_update(ForUpdate::default().skip_locked()),
            &DialectProfile::oracle()
        )
        .sql(),
        "SELECT t1.a FROM t1 WHERE t1.id = :id_1 FOR UPDATE SKIP LOCKED"
    );
    // No row locking on SQLite.
    assert_eq!(
        compile(base.for_update(), &DialectProfile::sqlite()).sql(),
        "SELECT t1.a FROM t1 WHERE t1.id = ?"
    );
}

#[test]
fn test_create_table_constraints() {
    let md = MetaData::builder()
        .table(
            TableDef::new("accounts")
                .column(int("id").primary_key())
                .column(varchar("email", 100).unique())
                .column(int("lo"))
                .column(int("hi"))
                .unique_constraint(UniqueConstraint::new(&["lo", "hi"]).named("uq_span"))
                .check(CheckConstraint::new("lo <= hi").named("ck_span")),
        )
        .build()
        .unwrap();
    let accounts = md.table("accounts").unwrap();
    assert_eq!(
        compile(CreateTable::new(&accounts), &DialectProfile::generic()).sql(),
        "CREATE TABLE accounts (\n\tid INTEGER NOT NULL, \n\temail VARCHAR(100), \
         \n\tlo INTEGER, \n\thi INTEGER, \n\tPRIMARY KEY (id), \n\tUNIQUE (email), \
         \n\tCONSTRAINT uq_span UNIQUE (lo, hi), \n\tCONSTRAINT ck_span CHECK (lo <= hi)\n)"
    );
}

#[test]
fn test_create_and_drop_index() {
    let t2 = table("t2");
    let generic = DialectProfile::generic();
    assert_eq!(
        compile(CreateIndex::new("ix_t2_data", &t2, &["data"]), &generic).sql(),
        "CREATE INDEX ix_t2_data ON t2 (data)"
    );
    assert_eq!(
        compile(
            CreateIndex::new("ix_t2_pair", &t2, &["t1_id", "data"])
                .unique()
                .if_not_exists(),
            &generic
        )
        .sql(),
        "CREATE UNIQUE INDEX IF NOT EXISTS ix_t2_pair ON t2 (t1_id, data)"
    );
    assert_eq!(
        compile(DropIndex::new("ix_t2_data", &t2), &generic).sql(),
        "DROP INDEX ix_t2_data"
    );
    assert_eq!(
        compile(DropIndex::new("ix_t2_data", &t2), &DialectProfile::mysql()).sql(),
        "DROP INDEX ix_t2_data ON t2"
    );

    let err = compile_err(CreateIndex::new("ix_bad", &t2, &["nope"]), &generic);
    assert_eq!(err.kind(), ErrorKind::Argument);
    let err = compile_err(
        CreateIndex::new("ix_t2_data", &t2, &["data"]).if_not_exists(),
        &DialectProfile::oracle(),
    );
    assert_eq!(err.kind(), ErrorKind::Compile);
}
