//! End-to-end scenarios through the public API.

use std::collections::HashMap;

use pretty_assertions::assert_eq;
use sqlcraft::prelude::*;

fn schema() -> MetaData {
    MetaData::builder()
        .table(
            TableDef::new("t1")
                .column(ColumnDef::new("id", LogicalType::Integer).primary_key())
                .column(ColumnDef::new("a", LogicalType::Integer))
                .column(ColumnDef::new("b", LogicalType::string(20))),
        )
        .table(
            TableDef::new("t2")
                .column(ColumnDef::new("id", LogicalType::Integer).primary_key())
                .column(ColumnDef::new("t1_id", LogicalType::Integer).references("t1.id")),
        )
        .table(
            TableDef::new("parts")
                .column(ColumnDef::new("part", LogicalType::string(30)))
                .column(ColumnDef::new("sub_part", LogicalType::string(30))),
        )
        .build()
        .unwrap()
}

#[test]
fn numbered_parameters_over_an_inferred_join() {
    let md = schema();
    let (t1, t2) = (md.table("t1").unwrap(), md.table("t2").unwrap());
    let stmt = select([t1.c("a").unwrap(), t1.c("b").unwrap()])
        .join(&t2)
        .unwrap()
        .filter(t1.c("a").unwrap().eq(bindparam("x")));

    let catalog = Catalog::builtins();
    let dialect = (*catalog.profile("generic").unwrap())
        .clone()
        .with_paramstyle(ParamStyle::Numbered);
    let compiled = catalog.compiler().compile(&stmt.into(), &dialect).unwrap();

    assert_eq!(
        compiled.sql(),
        "SELECT t1.a, t1.b FROM t1 JOIN t2 ON t1.id = t2.t1_id WHERE t1.a = :1"
    );
    assert_eq!(compiled.parameter_types(), vec![("x", "IntegerHandler")]);

    let params = compiled
        .encode_params(&HashMap::from([("x".to_string(), Value::Int(5))]))
        .unwrap();
    assert_eq!(params, vec![("x".to_string(), WireValue::Int(5))]);
}

#[test]
fn recursive_cte_keyword_follows_the_dialect() {
    let md = schema();
    let parts = md.table("parts").unwrap();
    let seed = select([parts.c("sub_part").unwrap(), parts.c("part").unwrap()])
        .filter(parts.c("part").unwrap().eq("our part"))
        .cte_recursive("included_parts");
    let pr = seed.alias("pr");
    let p = parts.alias("p");
    let included = seed
        .union_all(
            select([p.c("sub_part").unwrap(), p.c("part").unwrap()])
                .filter(p.c("part").unwrap().eq(pr.c("sub_part").unwrap())),
        )
        .unwrap();
    let stmt: Statement = select([included.c("sub_part").unwrap()]).into();

    let compiler = Compiler::default();
    let pg = compiler.compile(&stmt, &DialectProfile::postgresql()).unwrap();
    let mssql = compiler.compile(&stmt, &DialectProfile::mssql()).unwrap();

    assert!(pg.sql().starts_with("WITH RECURSIVE included_parts(sub_part, part) AS ("));
    assert!(mssql.sql().starts_with("WITH included_parts(sub_part, part) AS ("));
    assert_eq!(pg.parameters().len(), 1);
    assert_eq!(mssql.parameters().len(), 1);
}

#[test]
fn long_labels_truncate_deterministically() {
    let md = MetaData::builder()
        .table(
            TableDef::new("some_large_named_table")
                .column(
                    ColumnDef::new("this_is_the_primarykey_column", LogicalType::Integer)
                        .primary_key(),
                )
                .column(ColumnDef::new("this_is_the_data_column", LogicalType::string(30))),
        )
        .build()
        .unwrap();
    let t = md.table("some_large_named_table").unwrap();
    let stmt: Statement = select([
        t.c("this_is_the_primarykey_column").unwrap(),
        t.c("this_is_the_data_column").unwrap(),
    ])
    .label_style(LabelStyle::TablenamePlusCol)
    .into();
    let dialect = DialectProfile::generic().with_max_identifier_length(29);

    let compiled = Compiler::default().compile(&stmt, &dialect).unwrap();
    let names: Vec<&str> = compiled
        .result_columns()
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(names.len(), 2);
    assert_ne!(names[0], names[1]);
    for name in &names {
        assert_eq!(name.len(), 29);
        assert!(compiled.sql().contains(&format!(" AS {}", name)));
    }
    assert!(names[0].starts_with("some_large_named_table_"));

    let again = Compiler::default().compile(&stmt, &dialect).unwrap();
    assert_eq!(compiled.sql(), again.sql());
}

#[test]
fn repeated_long_columns_keep_distinct_labels() {
    let md = MetaData::builder()
        .table(
            TableDef::new("some_large_named_table").column(
                ColumnDef::new("this_is_the_primarykey_column", LogicalType::Integer)
                    .primary_key(),
            ),
        )
        .build()
        .unwrap();
    let t = md.table("some_large_named_table").unwrap();
    let pk = t.c("this_is_the_primarykey_column").unwrap();
    let stmt: Statement = select([pk.clone(), pk])
        .label_style(LabelStyle::TablenamePlusCol)
        .into();
    let dialect = DialectProfile::generic().with_max_identifier_length(29);

    let compiled = Compiler::default().compile(&stmt, &dialect).unwrap();
    let names: Vec<&str> = compiled
        .result_columns()
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(names.len(), 2);
    assert_ne!(names[0], names[1]);
    for name in &names {
        assert_eq!(name.len(), 29);
        assert_eq!(compiled.sql().matches(&format!(" AS {}", name)).count(), 1);
    }
}

#[test]
fn cached_statements_rebind_values() {
    let md = schema();
    let t1 = md.table("t1").unwrap();
    let by_a = |a: i64| -> Statement {
        select([t1.c("b").unwrap()])
            .filter(t1.c("a").unwrap().eq(a))
            .into()
    };

    let cache = StatementCache::new(Catalog::builtins().compiler(), CacheConfig::default());
    let pg = DialectProfile::postgresql();
    let first = cache.compile(&by_a(1), &pg).unwrap();
    let second = cache.compile(&by_a(2), &pg).unwrap();

    assert_eq!(first.sql(), "SELECT t1.b FROM t1 WHERE t1.a = $1");
    assert_eq!(first.sql(), second.sql());
    assert_eq!(
        second.construct_params(&HashMap::new()).unwrap(),
        vec![("a_1".to_string(), Value::Int(2))]
    );
    assert_eq!(cache.stats().hits, 1);
}
