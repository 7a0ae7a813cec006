//! Structural hashing of statements for the statement cache.
//!
//! Two statements hash equal when they compile to the same SQL text and
//! parameter layout. Bind values are left out unless literal rendering is
//! requested; the element count of expanding binds is always included. Node
//! ids are replaced by first-seen ordinals so that rebuilding the same shape
//! with fresh nodes hashes the same, while a node shared twice still differs
//! from two distinct nodes.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use super::column::{ColumnRef, SourceRef};
use super::compound::CompoundSelect;
use super::cte::Cte;
use super::ddl::{CreateIndex, CreateTable, DropIndex, DropTable};
use super::dml::{Delete, Insert, InsertSource, Update};
use super::expr::{BindParam, Expr, OrderBy};
use super::from::{Alias, AliasTarget, FromItem};
use super::ids::NodeId;
use super::select::Select;
use super::statement::{Queryable, Statement};
use super::table::Table;
use super::text::{TextClause, TextPart};
use super::values::Value;

pub struct Fingerprinter {
    hasher: DefaultHasher,
    include_values: bool,
    ordinals: HashMap<NodeId, usize>,
    cte_generations: HashMap<(NodeId, u32), usize>,
}

impl Fingerprinter {
    pub fn new(include_values: bool) -> Self {
        Self {
            hasher: DefaultHasher::new(),
            include_values,
            ordinals: HashMap::new(),
            cte_generations: HashMap::new(),
        }
    }

    pub fn statement(mut self, stmt: &Statement) -> u64 {
        self.hash_statement(stmt);
        self.hasher.finish()
    }

    fn tag(&mut self, tag: &str) {
        tag.hash(&mut self.hasher);
    }

    /// Returns the ordinal and whether this is the first sighting.
    fn ordinal(&mut self, id: NodeId) -> (usize, bool) {
        let next = self.ordinals.len();
        let mut first = false;
        let ordinal = *self.ordinals.entry(id).or_insert_with(|| {
            first = true;
            next
        });
        ordinal.hash(&mut self.hasher);
        (ordinal, first)
    }

    fn hash_statement(&mut self, stmt: &Statement) {
        self.tag(stmt.kind());
        match stmt {
            Statement::Select(s) => self.hash_select(s),
            Statement::Compound(c) => self.hash_compound(c),
            Statement::Insert(i) => self.hash_insert(i),
            Statement::Update(u) => self.hash_update(u),
            Statement::Delete(d) => self.hash_delete(d),
            Statement::CreateTable(c) => self.hash_create(c),
            Statement::DropTable(d) => self.hash_drop(d),
            Statement::Text(t) => {
                self.hash_text(t.text());
                t.result_columns().hash(&mut self.hasher);
            }
            Statement::CreateIndex(c) => self.hash_create_index(c),
            Statement::DropIndex(d) => {
                d.name.hash(&mut self.hasher);
                self.hash_table(&d.table);
                d.if_exists.hash(&mut self.hasher);
            }
        }
    }

    fn hash_select(&mut self, s: &Select) {
        self.ordinal(s.id());
        for cte in s.attached_ctes() {
            self.hash_cte(cte);
        }
        s.raw_columns().len().hash(&mut self.hasher);
        for c in s.raw_columns() {
            self.hash_expr(c);
        }
        s.explicit_froms().len().hash(&mut self.hasher);
        for f in s.explicit_froms() {
            self.hash_from(f);
        }
        self.hash_opt_expr(s.where_clause());
        s.group_by_exprs().len().hash(&mut self.hasher);
        for g in s.group_by_exprs() {
            self.hash_expr(g);
        }
        self.hash_opt_expr(s.having_clause());
        self.hash_order_by(s.order_by_exprs());
        s.limit_value().hash(&mut self.hasher);
        s.offset_value().hash(&mut self.hasher);
        s.is_distinct().hash(&mut self.hasher);
        s.get_label_style().hash(&mut self.hasher);
        s.for_update_value().hash(&mut self.hasher);
    }

    fn hash_compound(&mut self, c: &CompoundSelect) {
        self.ordinal(c.id());
        c.op().hash(&mut self.hasher);
        c.selects().len().hash(&mut self.hasher);
        for q in c.selects() {
            self.hash_queryable(q);
        }
        self.hash_order_by(c.order_by_exprs());
        c.limit_value().hash(&mut self.hasher);
        c.offset_value().hash(&mut self.hasher);
    }

    fn hash_queryable(&mut self, q: &Queryable) {
        match q {
            Queryable::Select(s) => {
                self.tag("select");
                self.hash_select(s);
            }
            Queryable::Compound(c) => {
                self.tag("compound");
                self.hash_compound(c);
            }
        }
    }

    fn hash_insert(&mut self, i: &Insert) {
        for cte in i.attached_ctes() {
            self.hash_cte(cte);
        }
        self.hash_table(i.table());
        match i.source() {
            InsertSource::DefaultValues => self.tag("default"),
            InsertSource::Values { columns, rows } => {
                self.tag("values");
                columns.hash(&mut self.hasher);
                i.is_multi_row().hash(&mut self.hasher);
                rows.len().hash(&mut self.hasher);
                for row in rows {
                    for e in row {
                        self.hash_expr(e);
                    }
                }
            }
            InsertSource::Query { columns, query } => {
                self.tag("query");
                columns.hash(&mut self.hasher);
                self.hash_queryable(query);
            }
        }
        self.hash_exprs(i.returning_exprs());
    }

    fn hash_update(&mut self, u: &Update) {
        for cte in u.attached_ctes() {
            self.hash_cte(cte);
        }
        self.hash_table(u.table());
        u.assignments().len().hash(&mut self.hasher);
        for (col, e) in u.assignments() {
            col.hash(&mut self.hasher);
            self.hash_expr(e);
        }
        self.hash_opt_expr(u.where_clause());
        self.hash_exprs(u.returning_exprs());
    }

    fn hash_delete(&mut self, d: &Delete) {
        for cte in d.attached_ctes() {
            self.hash_cte(cte);
        }
        self.hash_table(d.table());
        self.hash_opt_expr(d.where_clause());
        self.hash_exprs(d.returning_exprs());
    }

    fn hash_create(&mut self, c: &CreateTable) {
        self.hash_table(&c.table);
        c.if_not_exists.hash(&mut self.hasher);
        for col in c.table.column_defs() {
            col.name.hash(&mut self.hasher);
            col.ty.hash(&mut self.hasher);
            col.nullable.hash(&mut self.hasher);
            col.primary_key.hash(&mut self.hasher);
            // Defaults always render inline.
            match &col.default {
                Some(v) => v.hash_into(&mut self.hasher),
                None => self.tag("nodefault"),
            }
            col.unique.hash(&mut self.hasher);
        }
        c.table.unique_constraints().hash(&mut self.hasher);
        c.table.checks().hash(&mut self.hasher);
    }

    fn hash_create_index(&mut self, c: &CreateIndex) {
        c.name.hash(&mut self.hasher);
        self.hash_table(&c.table);
        c.columns.hash(&mut self.hasher);
        c.unique.hash(&mut self.hasher);
        c.if_not_exists.hash(&mut self.hasher);
    }

    fn hash_text(&mut self, t: &TextClause) {
        self.tag("text");
        t.ty.hash(&mut self.hasher);
        for part in t.parts() {
            match part {
                TextPart::Sql(sql) => sql.hash(&mut self.hasher),
                TextPart::Bind(b) => self.hash_bind(b),
            }
        }
    }

    fn hash_drop(&mut self, d: &DropTable) {
        self.hash_table(&d.table);
        d.if_exists.hash(&mut self.hasher);
    }

    fn hash_table(&mut self, t: &Table) {
        self.tag("table");
        t.id().get().hash(&mut self.hasher);
        t.fullname().hash(&mut self.hasher);
    }

    fn hash_alias(&mut self, a: &Alias) {
        self.tag("alias");
        a.name().hash(&mut self.hasher);
        let (_, first) = self.ordinal(a.id());
        if !first {
            return;
        }
        match a.target() {
            AliasTarget::Table(t) => self.hash_table(t),
            AliasTarget::Query(q) => self.hash_queryable(q),
            AliasTarget::Cte(c) => self.hash_cte(c),
        }
    }

    fn hash_cte(&mut self, c: &Cte) {
        self.tag("cte");
        c.name().hash(&mut self.hasher);
        self.ordinal(c.id());
        let key = (c.id(), c.generation());
        let next = self.cte_generations.len();
        if let Some(seen) = self.cte_generations.get(&key) {
            seen.hash(&mut self.hasher);
            return;
        }
        self.cte_generations.insert(key, next);
        next.hash(&mut self.hasher);
        c.is_recursive().hash(&mut self.hasher);
        c.declared_columns().hash(&mut self.hasher);
        self.hash_queryable(c.query());
    }

    fn hash_from(&mut self, f: &FromItem) {
        match f {
            FromItem::Table(t) => self.hash_table(t),
            FromItem::Alias(a) => self.hash_alias(a),
            FromItem::Cte(c) => self.hash_cte(c),
            FromItem::Join(j) => {
                self.tag("join");
                j.kind.hash(&mut self.hasher);
                self.hash_from(&j.left);
                self.hash_from(&j.right);
                self.hash_opt_expr(j.on.as_ref());
            }
        }
    }

    fn hash_source(&mut self, s: &SourceRef) {
        match s {
            SourceRef::Table(t) => self.hash_table(t),
            SourceRef::Alias(a) => self.hash_alias(a),
            SourceRef::Cte(c) => self.hash_cte(c),
            SourceRef::Derived(id) => {
                self.tag("derived");
                self.ordinal(*id);
            }
        }
    }

    fn hash_column(&mut self, c: &ColumnRef) {
        self.tag("column");
        self.hash_source(c.source());
        c.name().hash(&mut self.hasher);
        c.ty().hash(&mut self.hasher);
        match c.label_id() {
            Some(id) => {
                self.ordinal(id);
            }
            None => self.tag("unlabeled"),
        }
    }

    fn hash_bind(&mut self, b: &BindParam) {
        self.tag("bind");
        self.ordinal(b.id());
        b.key().hash(&mut self.hasher);
        b.is_anonymous().hash(&mut self.hasher);
        b.ty().hash(&mut self.hasher);
        b.is_expanding().hash(&mut self.hasher);
        if b.is_expanding() {
            let count = match b.current_value() {
                Some(Value::Array(items)) => items.len(),
                Some(_) => 1,
                None => 0,
            };
            count.hash(&mut self.hasher);
        }
        if b.ty().is_null() {
            // Untyped binds take their handler from the value.
            let natural = match b.current_value() {
                Some(Value::Array(items)) if b.is_expanding() => {
                    items.first().map(Value::natural_type)
                }
                Some(v) => Some(v.natural_type()),
                None => None,
            };
            natural.hash(&mut self.hasher);
        }
        if self.include_values {
            match b.current_value() {
                Some(v) => v.hash_into(&mut self.hasher),
                None => self.tag("novalue"),
            }
        }
    }

    fn hash_opt_expr(&mut self, e: Option<&Expr>) {
        match e {
            Some(e) => self.hash_expr(e),
            None => self.tag("none"),
        }
    }

    fn hash_exprs(&mut self, exprs: &[Expr]) {
        exprs.len().hash(&mut self.hasher);
        for e in exprs {
            self.hash_expr(e);
        }
    }

    fn hash_order_by(&mut self, order: &[OrderBy]) {
        order.len().hash(&mut self.hasher);
        for o in order {
            self.hash_expr(&o.expr);
            o.direction.hash(&mut self.hasher);
            o.nulls.hash(&mut self.hasher);
        }
    }

    fn hash_expr(&mut self, e: &Expr) {
        std::mem::discriminant(e).hash(&mut self.hasher);
        match e {
            Expr::Column(c) => self.hash_column(c),
            Expr::Bind(b) => self.hash_bind(b),
            Expr::Literal(v) => v.hash_into(&mut self.hasher),
            Expr::Function(f) => {
                f.name.hash(&mut self.hasher);
                f.return_type.hash(&mut self.hasher);
                self.hash_exprs(&f.args);
            }
            Expr::Unary { op, operand } => {
                op.hash(&mut self.hasher);
                self.hash_expr(operand);
            }
            Expr::Binary { left, op, right } => {
                op.hash(&mut self.hasher);
                self.hash_expr(left);
                self.hash_expr(right);
            }
            Expr::Label(l) => {
                self.ordinal(l.id());
                l.name().hash(&mut self.hasher);
                l.key().hash(&mut self.hasher);
                self.hash_expr(l.element());
            }
            Expr::Grouping(inner) => self.hash_expr(inner),
            Expr::Cast { expr, ty } => {
                ty.hash(&mut self.hasher);
                self.hash_expr(expr);
            }
            Expr::Case(case) => {
                case.whens.len().hash(&mut self.hasher);
                for (cond, then) in &case.whens {
                    self.hash_expr(cond);
                    self.hash_expr(then);
                }
                self.hash_opt_expr(case.else_result.as_deref());
            }
            Expr::Between {
                expr,
                low,
                high,
                negated,
            } => {
                negated.hash(&mut self.hasher);
                self.hash_expr(expr);
                self.hash_expr(low);
                self.hash_expr(high);
            }
            Expr::InList {
                expr,
                items,
                negated,
            } => {
                negated.hash(&mut self.hasher);
                self.hash_expr(expr);
                self.hash_exprs(items);
            }
            Expr::InSubquery {
                expr,
                query,
                negated,
            } => {
                negated.hash(&mut self.hasher);
                self.hash_expr(expr);
                self.hash_queryable(query);
            }
            Expr::ScalarSubquery(q) => self.hash_queryable(q),
            Expr::Exists { query, negated } => {
                negated.hash(&mut self.hasher);
                self.hash_queryable(query);
            }
            Expr::Wildcard(src) => match src {
                Some(s) => self.hash_source(s),
                None => self.tag("star"),
            },
            Expr::Text(t) => self.hash_text(t),
        }
    }
}

impl Statement {
    /// Structural hash; see [`Fingerprinter`].
    pub fn fingerprint(&self, include_values: bool) -> u64 {
        Fingerprinter::new(include_values).statement(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::expr::ExprExt;
    use crate::ast::selectable::Selectable;
    use crate::ast::table::{ColumnDef, MetaData, TableDef};
    use crate::ast::types::LogicalType;

    fn table() -> Table {
        MetaData::builder()
            .table(
                TableDef::new("t1")
                    .column(ColumnDef::new("a", LogicalType::Integer))
                    .column(ColumnDef::new("b", LogicalType::Integer)),
            )
            .build()
            .unwrap()
            .table("t1")
            .unwrap()
    }

    fn query(t: &Table, value: i64) -> Statement {
        Select::new([t.c("a").unwrap()])
            .filter(t.c("b").unwrap().eq(value))
            .into()
    }

    #[test]
    fn test_values_excluded() {
        let t = table();
        assert_eq!(query(&t, 1).fingerprint(false), query(&t, 2).fingerprint(false));
        assert_ne!(query(&t, 1).fingerprint(true), query(&t, 2).fingerprint(true));
    }

    #[test]
    fn test_expanding_count_included() {
        let t = table();
        let two: Statement = Select::new([t.c("a").unwrap()])
            .filter(t.c("b").unwrap().is_in([1, 2]))
            .into();
        let three: Statement = Select::new([t.c("a").unwrap()])
            .filter(t.c("b").unwrap().is_in([1, 2, 3]))
            .into();
        let other_two: Statement = Select::new([t.c("a").unwrap()])
            .filter(t.c("b").unwrap().is_in([7, 8]))
            .into();
        assert_ne!(two.fingerprint(false), three.fingerprint(false));
        assert_eq!(two.fingerprint(false), other_two.fingerprint(false));
    }

    #[test]
    fn test_shared_alias_differs_from_two_aliases() {
        let t = table();
        let shared = t.alias_anon();
        let once: Statement = Select::new([shared.c("a").unwrap(), shared.c("b").unwrap()]).into();
        let twice: Statement = Select::new([
            t.alias_anon().c("a").unwrap(),
            t.alias_anon().c("b").unwrap(),
        ])
        .into();
        assert_ne!(once.fingerprint(false), twice.fingerprint(false));
    }

    #[test]
    fn test_row_locking_included() {
        let t = table();
        let plain = Select::new([t.c("a").unwrap()]);
        let locked: Statement = plain.clone().for_update().into();
        let shared: Statement = plain
            .clone()
            .with_for_update(crate::ast::select::ForUpdate::read())
            .into();
        let plain: Statement = plain.into();
        assert_ne!(plain.fingerprint(false), locked.fingerprint(false));
        assert_ne!(locked.fingerprint(false), shared.fingerprint(false));
    }
}
