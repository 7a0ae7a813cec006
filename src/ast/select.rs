//! SELECT statements.

use std::collections::{HashMap, HashSet};

use super::column::{ColumnIdentity, ColumnRef, Proxy, SourceRef};
use super::compound::{CompoundSelect, SetOp};
use super::cte::Cte;
use super::expr::{Expr, OrderBy};
use super::from::{Alias, AliasTarget, FromItem, Join, JoinKind};
use super::ids::NodeId;
use super::operators::BinaryOp;
use super::selectable::Selectable;
use super::statement::Queryable;
use super::table::Table;
use crate::error::{CompileError, CompileResult};

/// How plain column entries of the select list are labeled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LabelStyle {
    /// `t.a`; the exported name is the column name.
    #[default]
    Plain,
    /// `t.a AS t_a`.
    TablenamePlusCol,
}

/// Row locking requested with `SELECT ... FOR UPDATE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ForUpdate {
    /// Shared lock: `FOR SHARE` on PostgreSQL, `LOCK IN SHARE MODE` on MySQL.
    pub read: bool,
    pub nowait: bool,
    pub skip_locked: bool,
}

impl ForUpdate {
    pub fn read() -> Self {
        Self {
            read: true,
            ..Self::default()
        }
    }

    pub fn nowait(mut self) -> Self {
        self.nowait = true;
        self
    }

    pub fn skip_locked(mut self) -> Self {
        self.skip_locked = true;
        self
    }
}

/// A SELECT statement. Builder methods return a modified copy.
#[derive(Debug, Clone, PartialEq)]
pub struct Select {
    id: NodeId,
    columns: Vec<Expr>,
    from: Vec<FromItem>,
    where_clause: Option<Expr>,
    group_by: Vec<Expr>,
    having: Option<Expr>,
    order_by: Vec<OrderBy>,
    limit: Option<u64>,
    offset: Option<u64>,
    distinct: bool,
    label_style: LabelStyle,
    ctes: Vec<Cte>,
    for_update: Option<ForUpdate>,
}

fn and_together(existing: Option<Expr>, cond: Expr) -> Expr {
    match existing {
        Some(prev) => Expr::binary(prev, BinaryOp::And, cond),
        None => cond,
    }
}

impl Select {
    pub fn new<E: Into<Expr>>(columns: impl IntoIterator<Item = E>) -> Self {
        Self {
            id: NodeId::next(),
            columns: columns
                .into_iter()
                .map(|c| c.into().into_select_entry())
                .collect(),
            from: Vec::new(),
            where_clause: None,
            group_by: Vec::new(),
            having: None,
            order_by: Vec::new(),
            limit: None,
            offset: None,
            distinct: false,
            label_style: LabelStyle::Plain,
            ctes: Vec::new(),
            for_update: None,
        }
    }

    pub fn column(mut self, expr: impl Into<Expr>) -> Self {
        self.columns.push(expr.into().into_select_entry());
        self
    }

    /// Replace the select list, keeping everything else.
    pub fn with_only_columns<E: Into<Expr>>(&self, columns: impl IntoIterator<Item = E>) -> Self {
        let mut next = self.clone();
        next.columns = columns
            .into_iter()
            .map(|c| c.into().into_select_entry())
            .collect();
        next
    }

    pub fn from(mut self, item: impl Into<FromItem>) -> Self {
        let item = item.into();
        if !self.from.contains(&item) {
            self.from.push(item);
        }
        self
    }

    /// Add a WHERE criterion, AND-ed with any existing one.
    pub fn filter(mut self, cond: impl Into<Expr>) -> Self {
        self.where_clause = Some(and_together(self.where_clause.take(), cond.into()));
        self
    }

    pub fn having(mut self, cond: impl Into<Expr>) -> Self {
        self.having = Some(and_together(self.having.take(), cond.into()));
        self
    }

    pub fn group_by<E: Into<Expr>>(mut self, exprs: impl IntoIterator<Item = E>) -> Self {
        self.group_by.extend(exprs.into_iter().map(Into::into));
        self
    }

    pub fn order_by(mut self, ob: impl Into<OrderBy>) -> Self {
        self.order_by.push(ob.into());
        self
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn offset(mut self, n: u64) -> Self {
        self.offset = Some(n);
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn label_style(mut self, style: LabelStyle) -> Self {
        self.label_style = style;
        self
    }

    /// `FOR UPDATE`
    pub fn for_update(self) -> Self {
        self.with_for_update(ForUpdate::default())
    }

    pub fn with_for_update(mut self, lock: ForUpdate) -> Self {
        self.for_update = Some(lock);
        self
    }

    /// Attach a CTE even if nothing in the statement references it.
    pub fn add_cte(mut self, cte: Cte) -> Self {
        self.ctes.push(cte);
        self
    }

    fn join_with(
        mut self,
        right: FromItem,
        kind: JoinKind,
        on: Option<Expr>,
    ) -> CompileResult<Self> {
        let left = match self.from.pop() {
            Some(item) => item,
            None => self.implicit_froms().into_iter().next().ok_or_else(|| {
                CompileError::argument("Can't join: the select has no FROM element to join from")
            })?,
        };
        let join = match on {
            Some(on) => Join::on(left, right, kind, on),
            None => Join::infer(left, right, kind)?,
        };
        self.from.push(FromItem::from(join));
        Ok(self)
    }

    /// Inner join the last FROM element to `right`, inferring the ON clause.
    pub fn join(self, right: impl Into<FromItem>) -> CompileResult<Self> {
        self.join_with(right.into(), JoinKind::Inner, None)
    }

    pub fn outer_join(self, right: impl Into<FromItem>) -> CompileResult<Self> {
        self.join_with(right.into(), JoinKind::LeftOuter, None)
    }

    pub fn join_on(self, right: impl Into<FromItem>, on: impl Into<Expr>) -> CompileResult<Self> {
        self.join_with(right.into(), JoinKind::Inner, Some(on.into()))
    }

    pub fn outer_join_on(
        self,
        right: impl Into<FromItem>,
        on: impl Into<Expr>,
    ) -> CompileResult<Self> {
        self.join_with(right.into(), JoinKind::LeftOuter, Some(on.into()))
    }

    /// Named subquery, rendered `(SELECT ...) AS name`.
    pub fn alias(self, name: &str) -> Alias {
        Alias::new(
            AliasTarget::Query(Queryable::from(self)),
            Some(name.to_string()),
        )
    }

    /// Anonymous subquery, named `anon_<n>` at compile time.
    pub fn subquery(self) -> Alias {
        Alias::new(AliasTarget::Query(Queryable::from(self)), None)
    }

    pub fn cte(self, name: &str) -> Cte {
        Cte::new(name, self)
    }

    pub fn cte_recursive(self, name: &str) -> Cte {
        Cte::recursive(name, self)
    }

    pub fn scalar_subquery(self) -> Expr {
        Expr::ScalarSubquery(Box::new(Queryable::from(self)))
    }

    pub fn exists(self) -> Expr {
        Expr::Exists {
            query: Box::new(Queryable::from(self)),
            negated: false,
        }
    }

    pub fn union(self, other: impl Into<Queryable>) -> CompileResult<CompoundSelect> {
        CompoundSelect::new(SetOp::Union, vec![self.into(), other.into()])
    }

    pub fn union_all(self, other: impl Into<Queryable>) -> CompileResult<CompoundSelect> {
        CompoundSelect::new(SetOp::UnionAll, vec![self.into(), other.into()])
    }

    pub fn intersect(self, other: impl Into<Queryable>) -> CompileResult<CompoundSelect> {
        CompoundSelect::new(SetOp::Intersect, vec![self.into(), other.into()])
    }

    pub fn except(self, other: impl Into<Queryable>) -> CompileResult<CompoundSelect> {
        CompoundSelect::new(SetOp::Except, vec![self.into(), other.into()])
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Select-list entries as written, before wildcard expansion.
    pub fn raw_columns(&self) -> &[Expr] {
        &self.columns
    }

    pub fn explicit_froms(&self) -> &[FromItem] {
        &self.from
    }

    pub fn where_clause(&self) -> Option<&Expr> {
        self.where_clause.as_ref()
    }

    pub fn group_by_exprs(&self) -> &[Expr] {
        &self.group_by
    }

    pub fn having_clause(&self) -> Option<&Expr> {
        self.having.as_ref()
    }

    pub fn order_by_exprs(&self) -> &[OrderBy] {
        &self.order_by
    }

    pub fn limit_value(&self) -> Option<u64> {
        self.limit
    }

    pub fn offset_value(&self) -> Option<u64> {
        self.offset
    }

    pub fn for_update_value(&self) -> Option<ForUpdate> {
        self.for_update
    }

    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    pub fn get_label_style(&self) -> LabelStyle {
        self.label_style
    }

    pub fn attached_ctes(&self) -> &[Cte] {
        &self.ctes
    }

    /// Sources referenced by expressions but not named in the FROM list.
    fn implicit_froms(&self) -> Vec<FromItem> {
        let covered: HashSet<NodeId> = self.from.iter().flat_map(FromItem::covered_ids).collect();
        let mut sources: Vec<SourceRef> = Vec::new();
        for c in &self.columns {
            c.collect_sources(&mut sources);
        }
        if let Some(w) = &self.where_clause {
            w.collect_sources(&mut sources);
        }
        for g in &self.group_by {
            g.collect_sources(&mut sources);
        }
        if let Some(h) = &self.having {
            h.collect_sources(&mut sources);
        }
        for o in &self.order_by {
            o.expr.collect_sources(&mut sources);
        }
        sources
            .into_iter()
            .filter(|s| !covered.contains(&s.id()))
            .filter_map(|s| s.from_item())
            .collect()
    }

    /// Full FROM list: explicit elements first, then every other source the
    /// statement's expressions reference, in first-seen order.
    pub fn froms(&self) -> Vec<FromItem> {
        let mut out = self.from.clone();
        out.extend(self.implicit_froms());
        out
    }

    /// Select list with wildcards expanded against the FROM list.
    pub fn output_exprs(&self) -> Vec<Expr> {
        let mut out = Vec::with_capacity(self.columns.len());
        for entry in &self.columns {
            match entry {
                Expr::Wildcard(None) => {
                    for item in self.froms() {
                        out.extend(item.columns().into_iter().map(Expr::Column));
                    }
                }
                Expr::Wildcard(Some(src)) => {
                    if let Some(item) = src.from_item() {
                        out.extend(item.columns().into_iter().map(Expr::Column));
                    }
                }
                other => out.push(other.clone()),
            }
        }
        out
    }

    /// Exported names of the select list, in [`Select::output_exprs`] order,
    /// before compile-time shortening.
    ///
    /// In [`LabelStyle::TablenamePlusCol`] every column entry gets a distinct
    /// label. A different column whose `<table>_<col>` is taken gets `_1`,
    /// `_2`, ...; a repeat of a column already selected gets `__1`, `__2`,
    /// ... after the name of its first occurrence.
    pub(crate) fn entry_names(&self) -> Vec<String> {
        let exprs = self.output_exprs();
        let mut used: HashSet<String> = exprs
            .iter()
            .filter_map(|e| match e {
                Expr::Label(l) => l.name().map(str::to_string),
                _ => None,
            })
            .collect();
        let mut first: HashMap<ColumnIdentity, String> = HashMap::new();

        let mut out = Vec::with_capacity(exprs.len());
        for entry in &exprs {
            let name = match entry {
                Expr::Column(c) if self.label_style == LabelStyle::TablenamePlusCol => {
                    let (base, sep) = match first.get(&c.identity()) {
                        Some(earlier) => (earlier.clone(), "__"),
                        None => (format!("{}_{}", c.source().display_name(), c.name()), "_"),
                    };
                    let mut name = base.clone();
                    let mut n = 0;
                    while used.contains(&name) {
                        n += 1;
                        name = format!("{}{}{}", base, sep, n);
                    }
                    used.insert(name.clone());
                    first.entry(c.identity()).or_insert_with(|| name.clone());
                    name
                }
                Expr::Column(c) => c.name().to_string(),
                Expr::Label(l) => l.key().to_string(),
                other => other.label_hint(),
            };
            out.push(name);
        }
        out
    }

    pub(crate) fn base_tables(&self) -> Vec<Table> {
        self.froms().iter().flat_map(FromItem::base_tables).collect()
    }
}

impl Selectable for Select {
    fn columns(&self) -> Vec<ColumnRef> {
        self.output_exprs()
            .iter()
            .zip(self.entry_names())
            .map(|(entry, name)| {
                match entry {
                    Expr::Column(c) => {
                        // A plain entry re-exports the inner label under its own name.
                        let label = match self.label_style {
                            LabelStyle::Plain => c.label_id(),
                            LabelStyle::TablenamePlusCol => None,
                        };
                        ColumnRef::project(
                            SourceRef::Derived(self.id),
                            &name,
                            c.ty().clone(),
                            label,
                            [c.proxies()],
                        )
                    }
                    Expr::Label(l) => {
                        let label = if l.name().is_none() { Some(l.id()) } else { None };
                        let lineage: Vec<&[Proxy]> = match l.element() {
                            Expr::Column(c) => vec![c.proxies()],
                            _ => Vec::new(),
                        };
                        ColumnRef::project(
                            SourceRef::Derived(self.id),
                            &name,
                            entry.type_of(),
                            label,
                            lineage,
                        )
                    }
                    other => ColumnRef::project(
                        SourceRef::Derived(self.id),
                        &name,
                        other.type_of(),
                        None,
                        Vec::<&[Proxy]>::new(),
                    ),
                }
            })
            .collect()
    }

    fn describe(&self) -> String {
        "SELECT".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::expr::ExprExt;
    use crate::ast::table::{ColumnDef, MetaData, TableDef};
    use crate::ast::types::LogicalType;

    fn tables() -> (Table, Table) {
        let md = MetaData::builder()
            .table(
                TableDef::new("t1")
                    .column(ColumnDef::new("id", LogicalType::Integer).primary_key())
                    .column(ColumnDef::new("a", LogicalType::Integer))
                    .column(ColumnDef::new("b", LogicalType::Text)),
            )
            .table(
                TableDef::new("t2")
                    .column(ColumnDef::new("id", LogicalType::Integer).primary_key())
                    .column(ColumnDef::new("t1_id", LogicalType::Integer).references("t1.id")),
            )
            .build()
            .unwrap();
        (md.table("t1").unwrap(), md.table("t2").unwrap())
    }

    #[test]
    fn test_implicit_froms_from_columns_and_where() {
        let (t1, t2) = tables();
        let s = Select::new([t1.c("a").unwrap()]).filter(t2.c("id").unwrap().eq(1));
        let froms = s.froms();
        assert_eq!(froms.len(), 2);
        assert_eq!(froms[0], FromItem::Table(t1));
        assert_eq!(froms[1], FromItem::Table(t2));
    }

    #[test]
    fn test_join_covers_both_tables() {
        let (t1, t2) = tables();
        let s = Select::new([t1.c("a").unwrap(), t2.c("id").unwrap()])
            .from(&t1)
            .join(&t2)
            .unwrap();
        let froms = s.froms();
        assert_eq!(froms.len(), 1);
        assert!(matches!(froms[0], FromItem::Join(_)));
    }

    #[test]
    fn test_wildcard_expands_in_from_order() {
        let (t1, _) = tables();
        let s = Select::new([Expr::Wildcard(None)]).from(&t1);
        let names: Vec<String> = s.columns().iter().map(|c| c.name().to_string()).collect();
        assert_eq!(names, vec!["id", "a", "b"]);
    }

    #[test]
    fn test_exported_columns_correspond_to_base() {
        let (t1, _) = tables();
        let sub = Select::new([t1.c("a").unwrap(), t1.c("b").unwrap()]).subquery();
        let col = sub.corresponding_column(&t1.c("b").unwrap()).unwrap();
        assert_eq!(col.name(), "b");
        assert_eq!(col.source().id(), sub.id());
    }

    #[test]
    fn test_label_style_names() {
        let (t1, _) = tables();
        let s = Select::new([t1.c("a").unwrap()]).label_style(LabelStyle::TablenamePlusCol);
        assert_eq!(s.columns()[0].name(), "t1_a");
    }

    #[test]
    fn test_generated_labels_are_unique() {
        let md = MetaData::builder()
            .table(TableDef::new("a_b").column(ColumnDef::new("c", LogicalType::Integer)))
            .table(TableDef::new("a").column(ColumnDef::new("b_c", LogicalType::Integer)))
            .build()
            .unwrap();
        let (ab, a) = (md.table("a_b").unwrap(), md.table("a").unwrap());
        let s = Select::new([
            ab.c("c").unwrap(),
            a.c("b_c").unwrap(),
            ab.c("c").unwrap(),
            a.c("b_c").unwrap(),
        ])
        .label_style(LabelStyle::TablenamePlusCol);
        assert_eq!(s.entry_names(), vec!["a_b_c", "a_b_c_1", "a_b_c__1", "a_b_c_1__1"]);

        let plain = Select::new([ab.c("c").unwrap(), ab.c("c").unwrap()]);
        assert_eq!(plain.entry_names(), vec!["c", "c"]);
    }

    #[test]
    fn test_with_only_columns_keeps_filter() {
        let (t1, _) = tables();
        let s = Select::new([t1.c("a").unwrap()]).filter(t1.c("b").unwrap().eq("x"));
        let narrowed = s.with_only_columns([t1.c("id").unwrap()]);
        assert_eq!(narrowed.columns().len(), 1);
        assert!(narrowed.where_clause().is_some());
        assert_eq!(s.columns()[0].name(), "a");
    }
}
