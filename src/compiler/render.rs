//! Render pass: recursive descent from the statement root to SQL text.
//!
//! Fragments are produced strictly in text order, so positional parameters
//! are recorded in the order their placeholders appear.

use std::collections::HashSet;
use std::sync::Arc;

use super::cte::CtePlan;
use super::literal::{bind_value, escape_percent, expanded_items, render_value};
use super::namer::IdentifierNamer;
use super::names::NameTable;
use super::normalize::{BindInventory, flatten_grouping};
use super::{Element, Parameter};
use crate::ast::{
    AliasTarget, BinaryOp, BindParam, CaseExpr, ColumnRef, CompoundSelect, CreateIndex,
    CreateTable, Delete, DropIndex, DropTable, Expr, ForUpdate, FromItem, FunctionCall, Insert,
    InsertSource, LabelStyle, LogicalType, NodeId, NullsOrder, OrderBy, OrderDirection, Queryable,
    Select, Selectable, SetOp, SourceRef, Statement, Table, TextClause, TextPart, Update, Value,
};
use crate::ast::expr::NO_PAREN_FUNCTIONS;
use crate::dialect::{DialectProfile, LimitStyle, TypeFamily};
use crate::error::{CompileError, CompileResult};
use crate::types::{HandlerRef, TypeRegistry};

/// How a nested query sees the FROM elements of the queries around it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Nesting {
    /// Statement root, FROM subquery or CTE body: nothing is inherited.
    Fresh,
    /// Scalar, EXISTS or IN subquery: FROM elements already present in an
    /// enclosing query are dropped from this one.
    Correlated,
}

pub(crate) struct Renderer<'a> {
    dialect: &'a DialectProfile,
    registry: &'a Arc<TypeRegistry>,
    names: &'a NameTable,
    namer: &'a mut IdentifierNamer,
    inventory: &'a BindInventory,
    literal_binds: bool,
    parameters: Vec<Parameter>,
    named: HashSet<String>,
    scopes: Vec<HashSet<NodeId>>,
}

impl<'a> Renderer<'a> {
    pub fn new(
        dialect: &'a DialectProfile,
        registry: &'a Arc<TypeRegistry>,
        names: &'a NameTable,
        namer: &'a mut IdentifierNamer,
        inventory: &'a BindInventory,
        literal_binds: bool,
    ) -> Self {
        Self {
            dialect,
            registry,
            names,
            namer,
            inventory,
            literal_binds,
            parameters: Vec::new(),
            named: HashSet::new(),
            scopes: Vec::new(),
        }
    }

    /// Render `stmt` with the WITH clause described by `plan` hoisted to the
    /// front.
    pub fn statement(
        mut self,
        stmt: &Statement,
        plan: &CtePlan,
    ) -> CompileResult<(String, Vec<Parameter>)> {
        let mut sql = String::new();
        if !plan.is_empty() {
            sql.push_str(&self.with_clause(plan)?);
            sql.push(' ');
        }
        let body = match stmt {
            Statement::Select(s) => self.select(s, Nesting::Fresh)?,
            Statement::Compound(c) => self.compound(c, Nesting::Fresh)?,
            Statement::Insert(ins) => self.insert(ins)?,
            Statement::Update(upd) => self.update(upd)?,
            Statement::Delete(del) => self.delete(del)?,
            Statement::CreateTable(create) => self.create_table(create)?,
            Statement::DropTable(drop) => self.drop_table(drop)?,
            Statement::Text(ts) => self.text(ts.text())?,
            Statement::CreateIndex(create) => self.create_index(create)?,
            Statement::DropIndex(drop) => self.drop_index(drop)?,
        };
        sql.push_str(&body);
        Ok((sql, self.parameters))
    }

    fn quote(&self, name: &str) -> String {
        self.dialect.preparer.quote(name)
    }

    // ---------------------------------------------------------------
    // WITH
    // ---------------------------------------------------------------

    fn with_clause(&mut self, plan: &CtePlan) -> CompileResult<String> {
        let mut parts = Vec::with_capacity(plan.ordered.len());
        for cte in &plan.ordered {
            let mut head = self.quote(cte.name());
            if cte.declared_columns().is_some() || cte.is_recursive() {
                let mut cols = Vec::new();
                for c in cte.columns() {
                    let name = self.column_name(&c)?;
                    cols.push(self.quote(&name));
                }
                head.push_str(&format!("({})", cols.join(", ")));
            }
            let body = self.queryable(cte.query(), Nesting::Fresh)?;
            parts.push(format!("{} AS ({})", head, body));
        }
        Ok(format!("{} {}", plan.keyword, parts.join(", ")))
    }

    // ---------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------

    fn queryable(&mut self, q: &Queryable, nesting: Nesting) -> CompileResult<String> {
        match q {
            Queryable::Select(s) => self.select(s, nesting),
            Queryable::Compound(c) => self.compound(c, nesting),
        }
    }

    fn select(&mut self, s: &Select, nesting: Nesting) -> CompileResult<String> {
        let saved = match nesting {
            Nesting::Fresh => Some(std::mem::take(&mut self.scopes)),
            Nesting::Correlated => None,
        };
        let froms = self.visible_froms(s, nesting);
        let rendered = froms.and_then(|froms| {
            self.scopes
                .push(froms.iter().flat_map(FromItem::covered_ids).collect());
            let out = self.select_clauses(s, &froms);
            self.scopes.pop();
            out
        });
        if let Some(saved) = saved {
            self.scopes = saved;
        }
        rendered
    }

    fn visible_froms(&self, s: &Select, nesting: Nesting) -> CompileResult<Vec<FromItem>> {
        let all = s.froms();
        if nesting == Nesting::Fresh || all.is_empty() {
            return Ok(all);
        }
        let enclosing: HashSet<NodeId> = self.scopes.iter().flatten().copied().collect();
        let kept: Vec<FromItem> = all
            .into_iter()
            .filter(|item| !item.id().is_some_and(|id| enclosing.contains(&id)))
            .collect();
        if kept.is_empty() {
            return Err(CompileError::compile(
                "Select statement returned no FROM clauses due to auto-correlation; \
                 specify correlate(<tables>) to control correlation manually.",
            ));
        }
        Ok(kept)
    }

    fn select_clauses(&mut self, s: &Select, froms: &[FromItem]) -> CompileResult<String> {
        let mut sql = String::from("SELECT ");
        if s.is_distinct() {
            sql.push_str("DISTINCT ");
        }
        let top = self.dialect.limit_style == LimitStyle::Top && s.offset_value().is_none();
        if top {
            if let Some(n) = s.limit_value() {
                sql.push_str(&format!("TOP {} ", n));
            }
        }

        let mut entries = Vec::with_capacity(s.raw_columns().len());
        match s.get_label_style() {
            LabelStyle::Plain => {
                for entry in s.raw_columns() {
                    entries.push(self.select_entry(entry, None)?);
                }
            }
            LabelStyle::TablenamePlusCol => {
                for (entry, name) in s.output_exprs().iter().zip(s.entry_names()) {
                    entries.push(self.select_entry(entry, Some(&name))?);
                }
            }
        }
        sql.push_str(&entries.join(", "));

        if !froms.is_empty() {
            let mut items = Vec::with_capacity(froms.len());
            for item in froms {
                items.push(self.from_item(item)?);
            }
            sql.push_str(" FROM ");
            sql.push_str(&items.join(", "));
        } else if matches!(self.dialect.type_compiler.family, TypeFamily::Oracle) {
            sql.push_str(" FROM DUAL");
        }

        if let Some(w) = s.where_clause() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.expr(w)?);
        }
        if !s.group_by_exprs().is_empty() {
            let mut items = Vec::with_capacity(s.group_by_exprs().len());
            for g in s.group_by_exprs() {
                items.push(self.label_reference(g)?);
            }
            sql.push_str(" GROUP BY ");
            sql.push_str(&items.join(", "));
        }
        if let Some(h) = s.having_clause() {
            sql.push_str(" HAVING ");
            sql.push_str(&self.expr(h)?);
        }
        sql.push_str(&self.order_by(s.order_by_exprs())?);
        sql.push_str(&self.row_limits(
            s.limit_value().filter(|_| !top),
            s.offset_value(),
            !s.order_by_exprs().is_empty(),
        )?);
        if let Some(lock) = s.for_update_value() {
            sql.push_str(&self.for_update(lock));
        }
        Ok(sql)
    }

    fn for_update(&self, lock: ForUpdate) -> String {
        if !self.dialect.features.for_update {
            tracing::debug!(
                "dialect '{}' has no row locking, dropping FOR UPDATE",
                self.dialect.name
            );
            return String::new();
        }
        let family = self.dialect.type_compiler.family;
        if lock.read && family == TypeFamily::Mysql {
            return " LOCK IN SHARE MODE".to_string();
        }
        let mut sql = if lock.read && family == TypeFamily::Postgresql {
            " FOR SHARE".to_string()
        } else {
            " FOR UPDATE".to_string()
        };
        if matches!(family, TypeFamily::Postgresql | TypeFamily::Mysql | TypeFamily::Oracle) {
            if lock.nowait {
                sql.push_str(" NOWAIT");
            }
            if lock.skip_locked {
                sql.push_str(" SKIP LOCKED");
            }
        }
        sql
    }

    /// `generated` is the unshortened `<table>_<col>` label of a column
    /// entry in labeled mode.
    fn select_entry(&mut self, entry: &Expr, generated: Option<&str>) -> CompileResult<String> {
        match entry {
            Expr::Column(c) => {
                let rendered = self.column(c)?;
                let Some(generated) = generated else {
                    return Ok(rendered);
                };
                let label = self.names.entry_label(generated).ok_or_else(|| {
                    CompileError::compile(format!(
                        "label '{}' is not part of the statement being compiled",
                        generated
                    ))
                })?;
                Ok(format!("{} AS {}", rendered, self.quote(label)))
            }
            Expr::Label(l) => {
                let inner = self.expr(l.element())?;
                let name = self.label_name(l.id(), l.key())?;
                Ok(format!("{} AS {}", inner, self.quote(&name)))
            }
            other => self.expr(other),
        }
    }

    fn compound(&mut self, c: &CompoundSelect, nesting: Nesting) -> CompileResult<String> {
        let set_op = matches!(
            c.op(),
            SetOp::Intersect | SetOp::IntersectAll | SetOp::Except | SetOp::ExceptAll
        );
        if set_op && !self.dialect.features.intersect_except {
            return Err(CompileError::compile(format!(
                "Dialect '{}' does not support {}",
                self.dialect.name,
                c.op().keyword()
            )));
        }

        let mut members = Vec::with_capacity(c.selects().len());
        for q in c.selects() {
            let sql = self.queryable(q, nesting)?;
            let grouped = q.has_row_clauses() || matches!(q, Queryable::Compound(_));
            members.push(if grouped { format!("({})", sql) } else { sql });
        }
        let mut sql = members.join(&format!(" {} ", c.op().keyword()));
        sql.push_str(&self.order_by(c.order_by_exprs())?);
        sql.push_str(&self.row_limits(
            c.limit_value(),
            c.offset_value(),
            !c.order_by_exprs().is_empty(),
        )?);
        Ok(sql)
    }

    fn order_by(&mut self, items: &[OrderBy]) -> CompileResult<String> {
        if items.is_empty() {
            return Ok(String::new());
        }
        let mut parts = Vec::with_capacity(items.len());
        for ob in items {
            let mut part = self.label_reference(&ob.expr)?;
            match ob.direction {
                Some(OrderDirection::Asc) => part.push_str(" ASC"),
                Some(OrderDirection::Desc) => part.push_str(" DESC"),
                None => {}
            }
            if let Some(nulls) = ob.nulls {
                if !self.dialect.features.nulls_ordering {
                    return Err(CompileError::compile(format!(
                        "Dialect '{}' does not support NULLS FIRST / NULLS LAST",
                        self.dialect.name
                    )));
                }
                part.push_str(match nulls {
                    NullsOrder::First => " NULLS FIRST",
                    NullsOrder::Last => " NULLS LAST",
                });
            }
            parts.push(part);
        }
        Ok(format!(" ORDER BY {}", parts.join(", ")))
    }

    /// LIMIT / OFFSET in the dialect's form. `limit` is `None` when TOP
    /// already carries it.
    fn row_limits(
        &self,
        limit: Option<u64>,
        offset: Option<u64>,
        ordered: bool,
    ) -> CompileResult<String> {
        match self.dialect.limit_style {
            LimitStyle::LimitOffset => Ok(match (limit, offset) {
                (None, None) => String::new(),
                (Some(l), None) => format!(" LIMIT {}", l),
                (Some(l), Some(o)) => format!(" LIMIT {} OFFSET {}", l, o),
                (None, Some(o)) => match &self.dialect.no_limit_token {
                    Some(token) => format!(" LIMIT {} OFFSET {}", token, o),
                    None => format!(" OFFSET {}", o),
                },
            }),
            LimitStyle::FetchFirst => {
                let mut sql = String::new();
                if let Some(o) = offset {
                    sql.push_str(&format!(" OFFSET {} ROWS", o));
                }
                if let Some(l) = limit {
                    sql.push_str(&format!(" FETCH FIRST {} ROWS ONLY", l));
                }
                Ok(sql)
            }
            LimitStyle::Top => {
                if limit.is_none() && offset.is_none() {
                    return Ok(String::new());
                }
                if !ordered {
                    return Err(CompileError::compile(format!(
                        "Dialect '{}' requires an ORDER BY when using an OFFSET or a non-simple LIMIT clause",
                        self.dialect.name
                    )));
                }
                let mut sql = format!(" OFFSET {} ROWS", offset.unwrap_or(0));
                if let Some(l) = limit {
                    sql.push_str(&format!(" FETCH NEXT {} ROWS ONLY", l));
                }
                Ok(sql)
            }
        }
    }

    // ---------------------------------------------------------------
    // FROM
    // ---------------------------------------------------------------

    fn table_name(&self, t: &Table) -> CompileResult<String> {
        self.namer.check_explicit(t.name())?;
        Ok(self.dialect.preparer.format_table(t.schema(), t.name()))
    }

    fn from_item(&mut self, item: &FromItem) -> CompileResult<String> {
        match item {
            FromItem::Table(t) => self.table_name(t),
            FromItem::Cte(c) => Ok(self.quote(c.name())),
            FromItem::Alias(a) => {
                let target = match a.target() {
                    AliasTarget::Table(t) => self.table_name(t)?,
                    AliasTarget::Query(q) => format!("({})", self.queryable(q, Nesting::Fresh)?),
                    AliasTarget::Cte(c) => self.quote(c.name()),
                };
                let name = self.quote(self.names.alias(a)?);
                if self.dialect.features.table_alias_as {
                    Ok(format!("{} AS {}", target, name))
                } else {
                    Ok(format!("{} {}", target, name))
                }
            }
            FromItem::Join(j) => {
                let left = self.from_item(&j.left)?;
                let right = match &j.right {
                    FromItem::Join(_) => format!("({})", self.from_item(&j.right)?),
                    other => self.from_item(other)?,
                };
                match &j.on {
                    Some(on) => {
                        let on = self.expr(on)?;
                        Ok(format!("{} {} {} ON {}", left, j.kind.keyword(), right, on))
                    }
                    None => Ok(format!("{} {} {}", left, j.kind.keyword(), right)),
                }
            }
        }
    }

    // ---------------------------------------------------------------
    // Columns and labels
    // ---------------------------------------------------------------

    fn label_name(&self, id: NodeId, key: &str) -> CompileResult<String> {
        self.names.label(id).map(str::to_string).ok_or_else(|| {
            CompileError::compile(format!(
                "label '{}' is not part of the statement being compiled",
                key
            ))
        })
    }

    /// Name a column is exported under by its source.
    pub(crate) fn column_name(&mut self, c: &ColumnRef) -> CompileResult<String> {
        column_name(self.names, self.namer, c)
    }

    fn qualifier(&self, src: &SourceRef) -> CompileResult<Option<String>> {
        match src {
            SourceRef::Table(t) => self.table_name(t).map(Some),
            SourceRef::Alias(a) => Ok(Some(self.quote(self.names.alias(a)?))),
            SourceRef::Cte(c) => Ok(Some(self.quote(c.name()))),
            SourceRef::Derived(_) => Ok(None),
        }
    }

    fn column(&mut self, c: &ColumnRef) -> CompileResult<String> {
        let name = self.column_name(c)?;
        let name = self.quote(&name);
        Ok(match self.qualifier(c.source())? {
            Some(q) => format!("{}.{}", q, name),
            None => name,
        })
    }

    /// GROUP BY / ORDER BY element: a label refers to the select-list entry
    /// by name.
    fn label_reference(&mut self, e: &Expr) -> CompileResult<String> {
        match e {
            Expr::Label(l) => Ok(self.quote(&self.label_name(l.id(), l.key())?)),
            other => self.expr(other),
        }
    }

    // ---------------------------------------------------------------
    // Binds
    // ---------------------------------------------------------------

    fn handler_for(&self, bind: &BindParam, value: Option<&Value>) -> CompileResult<HandlerRef> {
        let ty = match value {
            _ if !bind.ty().is_null() => bind.ty().clone(),
            Some(Value::Array(items)) if bind.is_expanding() => items
                .first()
                .map(Value::natural_type)
                .unwrap_or(LogicalType::Null),
            Some(v) => v.natural_type(),
            None => LogicalType::Null,
        };
        self.registry.resolve(&ty, self.dialect)
    }

    fn bind(&mut self, bind: &BindParam) -> CompileResult<String> {
        if self.literal_binds {
            return self.literal_bind(bind);
        }

        let name = self.names.bind(bind)?.clone();
        let position = self.inventory.position(name.owner).ok_or_else(|| {
            CompileError::compile(format!(
                "bind parameter '{}' is not part of the statement being compiled",
                name.key
            ))
        })?;
        let inventory = self.inventory;
        let owner = &inventory.binds()[position];
        let handler = self.handler_for(owner, owner.current_value())?;

        if owner.is_expanding() {
            let count = expanded_items(owner)?.len();
            let mut placeholders = Vec::with_capacity(count);
            for index in 0..count {
                let element = self
                    .namer
                    .generated(&format!("{}_{}", name.placeholder, index + 1))?;
                placeholders.push(self.placeholder(
                    &element,
                    &name.key,
                    position,
                    Some(Element { index, count }),
                    handler.clone(),
                ));
            }
            return Ok(format!("({})", placeholders.join(", ")));
        }
        Ok(self.placeholder(&name.placeholder, &name.key, position, None, handler))
    }

    fn placeholder(
        &mut self,
        name: &str,
        key: &str,
        bind: usize,
        element: Option<Element>,
        handler: HandlerRef,
    ) -> String {
        let style = self.dialect.paramstyle;
        let record = style.is_positional() || self.named.insert(name.to_string());
        if record {
            self.parameters.push(Parameter {
                name: name.to_string(),
                key: key.to_string(),
                bind,
                element,
                handler,
            });
        }
        style.placeholder(name, self.parameters.len())
    }

    fn literal_bind(&mut self, bind: &BindParam) -> CompileResult<String> {
        if bind.is_expanding() {
            let items = expanded_items(bind)?;
            let mut rendered = Vec::with_capacity(items.len());
            for item in items {
                rendered.push(render_value(self.registry, self.dialect, bind.ty(), item)?);
            }
            return Ok(format!("({})", rendered.join(", ")));
        }
        render_value(self.registry, self.dialect, bind.ty(), bind_value(bind)?)
    }

    /// An expanding bind whose list is empty; `x IN ()` is not valid SQL.
    fn empty_expansion(&self, items: &[Expr]) -> CompileResult<bool> {
        match items {
            [] => Ok(true),
            [Expr::Bind(b)] if b.is_expanding() => {
                let owner = if self.literal_binds {
                    b
                } else {
                    let name = self.names.bind(b)?;
                    self.inventory
                        .position(name.owner)
                        .map(|p| &self.inventory.binds()[p])
                        .unwrap_or(b)
                };
                Ok(expanded_items(owner)?.is_empty())
            }
            _ => Ok(false),
        }
    }

    // ---------------------------------------------------------------
    // Expressions
    // ---------------------------------------------------------------

    fn exprs(&mut self, exprs: &[Expr]) -> CompileResult<String> {
        let mut parts = Vec::with_capacity(exprs.len());
        for e in exprs {
            parts.push(self.expr(e)?);
        }
        Ok(parts.join(", "))
    }

    fn expr(&mut self, e: &Expr) -> CompileResult<String> {
        match e {
            Expr::Column(c) => self.column(c),
            Expr::Bind(b) => self.bind(b),
            Expr::Literal(v) => {
                let text = render_value(self.registry, self.dialect, &v.natural_type(), v)?;
                Ok(escape_percent(&text, self.dialect.paramstyle, self.literal_binds))
            }
            Expr::Function(f) => self.function(f),
            Expr::Unary { op, operand } => Ok(format!("{}{}", op.sql_symbol(), self.expr(operand)?)),
            Expr::Binary { left, op, right } => self.binary(left, *op, right),
            // Outside the select list a label stands for its expression.
            Expr::Label(l) => self.expr(l.element()),
            Expr::Grouping(_) => match flatten_grouping(e) {
                Expr::Grouping(inner) => Ok(format!("({})", self.expr(inner)?)),
                flat => self.expr(flat),
            },
            Expr::Cast { expr, ty } => {
                let inner = self.expr(expr)?;
                let type_name = self.registry.resolve(ty, self.dialect)?.sql_name(self.dialect)?;
                Ok(format!("CAST({} AS {})", inner, type_name))
            }
            Expr::Case(case) => self.case(case),
            Expr::Between {
                expr,
                low,
                high,
                negated,
            } => {
                let subject = self.expr(expr)?;
                let low = self.expr(low)?;
                let high = self.expr(high)?;
                let not = if *negated { "NOT " } else { "" };
                Ok(format!("{} {}BETWEEN {} AND {}", subject, not, low, high))
            }
            Expr::InList {
                expr,
                items,
                negated,
            } => {
                if self.empty_expansion(items)? {
                    return Ok(if *negated { "1 = 1" } else { "1 != 1" }.to_string());
                }
                let subject = self.expr(expr)?;
                let not = if *negated { "NOT " } else { "" };
                match items.as_slice() {
                    [Expr::Bind(b)] if b.is_expanding() => {
                        Ok(format!("{} {}IN {}", subject, not, self.bind(b)?))
                    }
                    _ => Ok(format!("{} {}IN ({})", subject, not, self.exprs(items)?)),
                }
            }
            Expr::InSubquery {
                expr,
                query,
                negated,
            } => {
                let subject = self.expr(expr)?;
                let sub = self.queryable(query, Nesting::Correlated)?;
                let not = if *negated { "NOT " } else { "" };
                Ok(format!("{} {}IN ({})", subject, not, sub))
            }
            Expr::ScalarSubquery(q) => Ok(format!("({})", self.queryable(q, Nesting::Correlated)?)),
            Expr::Exists { query, negated } => {
                let sub = self.queryable(query, Nesting::Correlated)?;
                let not = if *negated { "NOT " } else { "" };
                Ok(format!("{}EXISTS ({})", not, sub))
            }
            Expr::Wildcard(None) => Ok("*".to_string()),
            Expr::Wildcard(Some(src)) => Ok(match self.qualifier(src)? {
                Some(q) => format!("{}.*", q),
                None => "*".to_string(),
            }),
            Expr::Text(t) => self.text(t),
        }
    }

    fn text(&mut self, t: &TextClause) -> CompileResult<String> {
        let mut sql = String::new();
        for part in t.parts() {
            match part {
                TextPart::Sql(raw) => sql.push_str(&escape_percent(
                    raw,
                    self.dialect.paramstyle,
                    self.literal_binds,
                )),
                TextPart::Bind(b) => sql.push_str(&self.bind(b)?),
            }
        }
        Ok(sql)
    }

    fn function(&mut self, f: &FunctionCall) -> CompileResult<String> {
        let lower = f.name.to_lowercase();
        if f.args.is_empty() && NO_PAREN_FUNCTIONS.contains(&lower.as_str()) {
            return Ok(f.name.to_uppercase());
        }
        Ok(format!("{}({})", f.name, self.exprs(&f.args)?))
    }

    fn binary(&mut self, left: &Expr, op: BinaryOp, right: &Expr) -> CompileResult<String> {
        let l = self.expr(left)?;
        let r = self.expr(right)?;
        let features = &self.dialect.features;
        Ok(match op {
            BinaryOp::Concat if !features.concat_operator => format!("concat({}, {})", l, r),
            BinaryOp::ILike if !features.ilike => format!("lower({}) LIKE lower({})", l, r),
            BinaryOp::NotILike if !features.ilike => {
                format!("lower({}) NOT LIKE lower({})", l, r)
            }
            BinaryOp::Mod => format!(
                "{} {} {}",
                l,
                escape_percent("%", self.dialect.paramstyle, self.literal_binds),
                r
            ),
            _ => format!("{} {} {}", l, op.sql_symbol(), r),
        })
    }

    fn case(&mut self, case: &CaseExpr) -> CompileResult<String> {
        let mut sql = String::from("CASE");
        for (cond, then) in &case.whens {
            let cond = self.expr(cond)?;
            let then = self.expr(then)?;
            sql.push_str(&format!(" WHEN {} THEN {}", cond, then));
        }
        if let Some(e) = &case.else_result {
            sql.push_str(&format!(" ELSE {}", self.expr(e)?));
        }
        sql.push_str(" END");
        Ok(sql)
    }

    // ---------------------------------------------------------------
    // DML
    // ---------------------------------------------------------------

    fn returning(&mut self, exprs: &[Expr]) -> CompileResult<String> {
        if exprs.is_empty() {
            return Ok(String::new());
        }
        if !self.dialect.features.returning {
            return Err(CompileError::compile(format!(
                "RETURNING is not supported by dialect '{}'",
                self.dialect.name
            )));
        }
        let mut parts = Vec::with_capacity(exprs.len());
        for e in exprs {
            parts.push(match e {
                Expr::Label(l) => {
                    let inner = self.expr(l.element())?;
                    let name = self.label_name(l.id(), l.key())?;
                    format!("{} AS {}", inner, self.quote(&name))
                }
                other => self.expr(other)?,
            });
        }
        Ok(format!(" RETURNING {}", parts.join(", ")))
    }

    fn column_list(&self, columns: &[String]) -> CompileResult<String> {
        let mut quoted = Vec::with_capacity(columns.len());
        for c in columns {
            self.namer.check_explicit(c)?;
            quoted.push(self.quote(c));
        }
        Ok(quoted.join(", "))
    }

    fn insert(&mut self, ins: &Insert) -> CompileResult<String> {
        let table = self.table_name(ins.table())?;
        let mut sql = match ins.source() {
            InsertSource::DefaultValues => format!("INSERT INTO {} DEFAULT VALUES", table),
            InsertSource::Values { columns, rows } => {
                if rows.len() > 1 && !self.dialect.features.multi_values_insert {
                    return Err(CompileError::compile(format!(
                        "Dialect '{}' does not support multi-row VALUES inserts",
                        self.dialect.name
                    )));
                }
                let cols = self.column_list(columns)?;
                let mut rendered = Vec::with_capacity(rows.len());
                for row in rows {
                    rendered.push(format!("({})", self.exprs(row)?));
                }
                format!("INSERT INTO {} ({}) VALUES {}", table, cols, rendered.join(", "))
            }
            InsertSource::Query { columns, query } => {
                let cols = self.column_list(columns)?;
                let sub = self.queryable(query, Nesting::Fresh)?;
                format!("INSERT INTO {} ({}) {}", table, cols, sub)
            }
        };
        sql.push_str(&self.returning(ins.returning_exprs())?);
        Ok(sql)
    }

    fn update(&mut self, upd: &Update) -> CompileResult<String> {
        let table = self.table_name(upd.table())?;
        self.scopes = vec![HashSet::from([upd.table().id()])];
        let mut sets = Vec::with_capacity(upd.assignments().len());
        for (column, value) in upd.assignments() {
            self.namer.check_explicit(column)?;
            let value = self.expr(value)?;
            sets.push(format!("{}={}", self.quote(column), value));
        }
        let mut sql = format!("UPDATE {} SET {}", table, sets.join(", "));
        if let Some(w) = upd.where_clause() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.expr(w)?);
        }
        sql.push_str(&self.returning(upd.returning_exprs())?);
        self.scopes.clear();
        Ok(sql)
    }

    fn delete(&mut self, del: &Delete) -> CompileResult<String> {
        let table = self.table_name(del.table())?;
        self.scopes = vec![HashSet::from([del.table().id()])];
        let mut sql = format!("DELETE FROM {}", table);
        if let Some(w) = del.where_clause() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.expr(w)?);
        }
        sql.push_str(&self.returning(del.returning_exprs())?);
        self.scopes.clear();
        Ok(sql)
    }

    // ---------------------------------------------------------------
    // DDL
    // ---------------------------------------------------------------

    fn create_table(&mut self, create: &CreateTable) -> CompileResult<String> {
        if create.if_not_exists && !self.dialect.features.if_exists_ddl {
            return Err(CompileError::compile(format!(
                "Dialect '{}' does not support CREATE TABLE IF NOT EXISTS",
                self.dialect.name
            )));
        }
        let table = &create.table;
        let mut lines = Vec::new();
        for col in table.column_defs() {
            self.namer.check_explicit(&col.name)?;
            let type_name = self
                .registry
                .resolve(&col.ty, self.dialect)?
                .sql_name(self.dialect)?;
            let mut line = format!("{} {}", self.quote(&col.name), type_name);
            if let Some(default) = &col.default {
                line.push_str(" DEFAULT ");
                line.push_str(&render_value(self.registry, self.dialect, &col.ty, default)?);
            }
            if !col.nullable {
                line.push_str(" NOT NULL");
            }
            lines.push(line);
        }

        let pk: Vec<String> = table.primary_key().iter().map(|c| c.name.clone()).collect();
        if !pk.is_empty() {
            lines.push(format!("PRIMARY KEY ({})", self.column_list(&pk)?));
        }
        for fk in table.foreign_keys() {
            let mut line = String::new();
            if let Some(name) = &fk.name {
                self.namer.check_explicit(name)?;
                line.push_str(&format!("CONSTRAINT {} ", self.quote(name)));
            }
            self.namer.check_explicit(&fk.referred_table_name)?;
            let referred = self
                .dialect
                .preparer
                .format_table(fk.referred_schema.as_deref(), &fk.referred_table_name);
            line.push_str(&format!(
                "FOREIGN KEY({}) REFERENCES {} ({})",
                self.column_list(&fk.columns)?,
                referred,
                self.column_list(&fk.referred_columns)?
            ));
            lines.push(line);
        }
        for col in table.column_defs().iter().filter(|c| c.unique) {
            lines.push(format!("UNIQUE ({})", self.column_list(&[col.name.clone()])?));
        }
        for unique in table.unique_constraints() {
            lines.push(format!(
                "{}UNIQUE ({})",
                self.constraint_name(unique.name.as_deref())?,
                self.column_list(&unique.columns)?
            ));
        }
        for check in table.checks() {
            lines.push(format!(
                "{}CHECK ({})",
                self.constraint_name(check.name.as_deref())?,
                check.sqltext
            ));
        }

        let not_exists = if create.if_not_exists { "IF NOT EXISTS " } else { "" };
        Ok(format!(
            "CREATE TABLE {}{} (\n\t{}\n)",
            not_exists,
            self.table_name(table)?,
            lines.join(", \n\t")
        ))
    }

    fn drop_table(&mut self, drop: &DropTable) -> CompileResult<String> {
        if drop.if_exists && !self.dialect.features.if_exists_ddl {
            return Err(CompileError::compile(format!(
                "Dialect '{}' does not support DROP TABLE IF EXISTS",
                self.dialect.name
            )));
        }
        let if_exists = if drop.if_exists { "IF EXISTS " } else { "" };
        Ok(format!("DROP TABLE {}{}", if_exists, self.table_name(&drop.table)?))
    }

    fn constraint_name(&self, name: Option<&str>) -> CompileResult<String> {
        match name {
            Some(name) => {
                self.namer.check_explicit(name)?;
                Ok(format!("CONSTRAINT {} ", self.quote(name)))
            }
            None => Ok(String::new()),
        }
    }

    fn create_index(&mut self, create: &CreateIndex) -> CompileResult<String> {
        if create.if_not_exists && !self.dialect.features.if_exists_ddl {
            return Err(CompileError::compile(format!(
                "Dialect '{}' does not support CREATE INDEX IF NOT EXISTS",
                self.dialect.name
            )));
        }
        if create.columns.is_empty() {
            return Err(CompileError::argument(format!(
                "Index '{}' names no columns",
                create.name
            )));
        }
        for col in &create.columns {
            if create.table.column_def(col).is_none() {
                return Err(CompileError::argument(format!(
                    "Index '{}' names unknown column '{}' of table '{}'",
                    create.name,
                    col,
                    create.table.fullname()
                )));
            }
        }
        self.namer.check_explicit(&create.name)?;
        let unique = if create.unique { "UNIQUE " } else { "" };
        let not_exists = if create.if_not_exists { "IF NOT EXISTS " } else { "" };
        Ok(format!(
            "CREATE {}INDEX {}{} ON {} ({})",
            unique,
            not_exists,
            self.quote(&create.name),
            self.table_name(&create.table)?,
            self.column_list(&create.columns)?
        ))
    }

    fn drop_index(&mut self, drop: &DropIndex) -> CompileResult<String> {
        if drop.if_exists && !self.dialect.features.if_exists_ddl {
            return Err(CompileError::compile(format!(
                "Dialect '{}' does not support DROP INDEX IF EXISTS",
                self.dialect.name
            )));
        }
        self.namer.check_explicit(&drop.name)?;
        let if_exists = if drop.if_exists { "IF EXISTS " } else { "" };
        match self.dialect.type_compiler.family {
            TypeFamily::Mysql | TypeFamily::Mssql => Ok(format!(
                "DROP INDEX {}{} ON {}",
                if_exists,
                self.quote(&drop.name),
                self.table_name(&drop.table)?
            )),
            // Indexes live in their table's schema.
            _ => Ok(format!(
                "DROP INDEX {}{}",
                if_exists,
                self.dialect
                    .preparer
                    .format_table(drop.table.schema(), &drop.name)
            )),
        }
    }
}

/// Exported name of a column: the generated name of the label it carries,
/// the declared name for table columns, and the (possibly shortened)
/// derived name otherwise.
pub(crate) fn column_name(
    names: &NameTable,
    namer: &mut IdentifierNamer,
    c: &ColumnRef,
) -> CompileResult<String> {
    if let Some(label) = c.label_id().and_then(|id| names.label(id)) {
        return Ok(label.to_string());
    }
    let declared = match c.source() {
        SourceRef::Table(_) => true,
        SourceRef::Alias(a) => matches!(a.target(), AliasTarget::Table(_)),
        SourceRef::Cte(_) | SourceRef::Derived(_) => false,
    };
    if declared {
        namer.check_explicit(c.name())?;
        Ok(c.name().to_string())
    } else {
        namer.generated(c.name())
    }
}
