//! Canonical traversal of a statement tree.
//!
//! Every pre-render stage walks the tree through [`Walker`], so they all see
//! nodes in the same structural order. Alias targets and CTE bodies are
//! entered once per identity (once per generation for CTEs), however many
//! times they are referenced.

use std::collections::HashSet;

use crate::ast::{
    Alias, AliasTarget, BindParam, ColumnRef, CompoundSelect, Cte, Expr, FromItem, InsertSource,
    Label, NodeId, Queryable, Select, SourceRef, Statement, TextClause, TextPart,
};
use crate::error::CompileResult;

/// Callbacks for the nodes the compiler names or inventories.
pub(crate) trait Visitor {
    fn bind(&mut self, _bind: &BindParam) -> CompileResult<()> {
        Ok(())
    }

    fn label(&mut self, _label: &Label) -> CompileResult<()> {
        Ok(())
    }

    fn alias(&mut self, _alias: &Alias) -> CompileResult<()> {
        Ok(())
    }

    /// Called on entering a SELECT, before any of its parts.
    fn select(&mut self, _select: &Select) -> CompileResult<()> {
        Ok(())
    }

    /// Called on every reference, before the body is entered.
    fn cte_ref(&mut self, _cte: &Cte) -> CompileResult<()> {
        Ok(())
    }

    fn enter_cte(&mut self, _cte: &Cte) {}

    fn exit_cte(&mut self, _cte: &Cte) {}
}

pub(crate) struct Walker<'v, V: Visitor> {
    visitor: &'v mut V,
    aliases: HashSet<NodeId>,
    ctes: HashSet<(NodeId, u32)>,
}

impl<'v, V: Visitor> Walker<'v, V> {
    pub fn new(visitor: &'v mut V) -> Self {
        Self {
            visitor,
            aliases: HashSet::new(),
            ctes: HashSet::new(),
        }
    }

    pub fn statement(&mut self, stmt: &Statement) -> CompileResult<()> {
        match stmt {
            Statement::Select(s) => self.select(s),
            Statement::Compound(c) => self.compound(c),
            Statement::Insert(ins) => {
                self.ctes(ins.attached_ctes())?;
                match ins.source() {
                    InsertSource::DefaultValues => {}
                    InsertSource::Values { rows, .. } => {
                        for row in rows {
                            self.exprs(row)?;
                        }
                    }
                    InsertSource::Query { query, .. } => self.queryable(query)?,
                }
                self.exprs(ins.returning_exprs())
            }
            Statement::Update(upd) => {
                self.ctes(upd.attached_ctes())?;
                for (_, value) in upd.assignments() {
                    self.expr(value)?;
                }
                if let Some(w) = upd.where_clause() {
                    self.expr(w)?;
                }
                self.exprs(upd.returning_exprs())
            }
            Statement::Delete(del) => {
                self.ctes(del.attached_ctes())?;
                if let Some(w) = del.where_clause() {
                    self.expr(w)?;
                }
                self.exprs(del.returning_exprs())
            }
            Statement::Text(ts) => self.text(ts.text()),
            Statement::CreateTable(_)
            | Statement::DropTable(_)
            | Statement::CreateIndex(_)
            | Statement::DropIndex(_) => Ok(()),
        }
    }

    pub fn queryable(&mut self, q: &Queryable) -> CompileResult<()> {
        match q {
            Queryable::Select(s) => self.select(s),
            Queryable::Compound(c) => self.compound(c),
        }
    }

    fn ctes(&mut self, ctes: &[Cte]) -> CompileResult<()> {
        for cte in ctes {
            self.cte(cte)?;
        }
        Ok(())
    }

    /// Columns before FROM, the order the SELECT is rendered in.
    fn select(&mut self, s: &Select) -> CompileResult<()> {
        self.visitor.select(s)?;
        self.ctes(s.attached_ctes())?;
        self.exprs(&s.output_exprs())?;
        for item in s.froms() {
            self.from_item(&item)?;
        }
        if let Some(w) = s.where_clause() {
            self.expr(w)?;
        }
        self.exprs(s.group_by_exprs())?;
        if let Some(h) = s.having_clause() {
            self.expr(h)?;
        }
        for ob in s.order_by_exprs() {
            self.expr(&ob.expr)?;
        }
        Ok(())
    }

    fn compound(&mut self, c: &CompoundSelect) -> CompileResult<()> {
        for q in c.selects() {
            self.queryable(q)?;
        }
        for ob in c.order_by_exprs() {
            self.expr(&ob.expr)?;
        }
        Ok(())
    }

    fn cte(&mut self, cte: &Cte) -> CompileResult<()> {
        self.visitor.cte_ref(cte)?;
        if self.ctes.insert((cte.id(), cte.generation())) {
            self.visitor.enter_cte(cte);
            let walked = self.queryable(cte.query());
            self.visitor.exit_cte(cte);
            walked?;
        }
        Ok(())
    }

    fn alias(&mut self, alias: &Alias) -> CompileResult<()> {
        self.visitor.alias(alias)?;
        if self.aliases.insert(alias.id()) {
            match alias.target() {
                AliasTarget::Table(_) => {}
                AliasTarget::Query(q) => self.queryable(q)?,
                AliasTarget::Cte(c) => self.cte(c)?,
            }
        }
        Ok(())
    }

    fn from_item(&mut self, item: &FromItem) -> CompileResult<()> {
        match item {
            FromItem::Table(_) => Ok(()),
            FromItem::Alias(a) => self.alias(a),
            FromItem::Cte(c) => self.cte(c),
            FromItem::Join(j) => {
                self.from_item(&j.left)?;
                self.from_item(&j.right)?;
                match &j.on {
                    Some(on) => self.expr(on),
                    None => Ok(()),
                }
            }
        }
    }

    fn source(&mut self, src: &SourceRef) -> CompileResult<()> {
        match src {
            SourceRef::Alias(a) => self.alias(a),
            SourceRef::Cte(c) => self.cte(c),
            SourceRef::Table(_) | SourceRef::Derived(_) => Ok(()),
        }
    }

    fn column(&mut self, c: &ColumnRef) -> CompileResult<()> {
        self.source(c.source())
    }

    fn exprs(&mut self, exprs: &[Expr]) -> CompileResult<()> {
        for e in exprs {
            self.expr(e)?;
        }
        Ok(())
    }

    pub fn expr(&mut self, expr: &Expr) -> CompileResult<()> {
        match expr {
            Expr::Column(c) => self.column(c),
            Expr::Bind(b) => self.visitor.bind(b),
            Expr::Literal(_) | Expr::Wildcard(None) => Ok(()),
            Expr::Wildcard(Some(src)) => self.source(src),
            Expr::Function(f) => self.exprs(&f.args),
            Expr::Unary { operand, .. } => self.expr(operand),
            Expr::Binary { left, right, .. } => {
                self.expr(left)?;
                self.expr(right)
            }
            Expr::Label(l) => {
                self.visitor.label(l)?;
                self.expr(l.element())
            }
            Expr::Grouping(inner) => self.expr(inner),
            Expr::Cast { expr, .. } => self.expr(expr),
            Expr::Case(case) => {
                for (cond, then) in &case.whens {
                    self.expr(cond)?;
                    self.expr(then)?;
                }
                match &case.else_result {
                    Some(e) => self.expr(e),
                    None => Ok(()),
                }
            }
            Expr::Between {
                expr, low, high, ..
            } => {
                self.expr(expr)?;
                self.expr(low)?;
                self.expr(high)
            }
            Expr::InList { expr, items, .. } => {
                self.expr(expr)?;
                self.exprs(items)
            }
            Expr::InSubquery { expr, query, .. } => {
                self.expr(expr)?;
                self.queryable(query)
            }
            Expr::ScalarSubquery(q) => self.queryable(q),
            Expr::Exists { query, .. } => self.queryable(query),
            Expr::Text(t) => self.text(t),
        }
    }

    fn text(&mut self, t: &TextClause) -> CompileResult<()> {
        for part in t.parts() {
            if let TextPart::Bind(b) = part {
                self.visitor.bind(b)?;
            }
        }
        Ok(())
    }
}
