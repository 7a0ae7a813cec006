//! Top-level statements.

use super::column::ColumnRef;
use super::compound::CompoundSelect;
use super::ddl::{CreateIndex, CreateTable, DropIndex, DropTable};
use super::dml::{Delete, Insert, Update};
use super::expr::OrderBy;
use super::ids::NodeId;
use super::select::Select;
use super::selectable::Selectable;
use super::table::Table;
use super::text::{TextClause, TextualSelect};

/// A query that can appear as a subquery, CTE body or compound member.
#[derive(Debug, Clone, PartialEq)]
pub enum Queryable {
    Select(Box<Select>),
    Compound(Box<CompoundSelect>),
}

impl Queryable {
    pub fn id(&self) -> NodeId {
        match self {
            Queryable::Select(s) => s.id(),
            Queryable::Compound(c) => c.id(),
        }
    }

    pub fn order_by_exprs(&self) -> &[OrderBy] {
        match self {
            Queryable::Select(s) => s.order_by_exprs(),
            Queryable::Compound(c) => c.order_by_exprs(),
        }
    }

    /// True when the query carries ORDER BY, LIMIT or OFFSET of its own.
    pub fn has_row_clauses(&self) -> bool {
        let (limit, offset) = match self {
            Queryable::Select(s) => (s.limit_value(), s.offset_value()),
            Queryable::Compound(c) => (c.limit_value(), c.offset_value()),
        };
        !self.order_by_exprs().is_empty() || limit.is_some() || offset.is_some()
    }

    pub(crate) fn base_tables(&self) -> Vec<Table> {
        match self {
            Queryable::Select(s) => s.base_tables(),
            Queryable::Compound(c) => c.selects().iter().flat_map(Queryable::base_tables).collect(),
        }
    }
}

impl Selectable for Queryable {
    fn columns(&self) -> Vec<ColumnRef> {
        match self {
            Queryable::Select(s) => s.columns(),
            Queryable::Compound(c) => c.columns(),
        }
    }

    fn describe(&self) -> String {
        match self {
            Queryable::Select(s) => s.describe(),
            Queryable::Compound(c) => c.describe(),
        }
    }
}

impl From<Select> for Queryable {
    fn from(s: Select) -> Self {
        Queryable::Select(Box::new(s))
    }
}

impl From<CompoundSelect> for Queryable {
    fn from(c: CompoundSelect) -> Self {
        Queryable::Compound(Box::new(c))
    }
}

/// Anything the compiler accepts.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(Select),
    Compound(CompoundSelect),
    Insert(Insert),
    Update(Update),
    Delete(Delete),
    Text(TextualSelect),
    CreateTable(CreateTable),
    DropTable(DropTable),
    CreateIndex(CreateIndex),
    DropIndex(DropIndex),
}

impl Statement {
    pub fn kind(&self) -> &'static str {
        match self {
            Statement::Select(_) => "select",
            Statement::Compound(_) => "compound",
            Statement::Insert(_) => "insert",
            Statement::Update(_) => "update",
            Statement::Delete(_) => "delete",
            Statement::CreateTable(_) => "create_table",
            Statement::Text(_) => "text",
            Statement::DropTable(_) => "drop_table",
            Statement::CreateIndex(_) => "create_index",
            Statement::DropIndex(_) => "drop_index",
        }
    }
}

impl From<Select> for Statement {
    fn from(s: Select) -> Self {
        Statement::Select(s)
    }
}

impl From<CompoundSelect> for Statement {
    fn from(c: CompoundSelect) -> Self {
        Statement::Compound(c)
    }
}

impl From<Queryable> for Statement {
    fn from(q: Queryable) -> Self {
        match q {
            Queryable::Select(s) => Statement::Select(*s),
            Queryable::Compound(c) => Statement::Compound(*c),
        }
    }
}

impl From<Insert> for Statement {
    fn from(i: Insert) -> Self {
        Statement::Insert(i)
    }
}

impl From<Update> for Statement {
    fn from(u: Update) -> Self {
        Statement::Update(u)
    }
}

impl From<Delete> for Statement {
    fn from(d: Delete) -> Self {
        Statement::Delete(d)
    }
}

impl From<CreateTable> for Statement {
    fn from(c: CreateTable) -> Self {
        Statement::CreateTable(c)
    }
}

impl From<DropTable> for Statement {
    fn from(d: DropTable) -> Self {
        Statement::DropTable(d)
    }
}

impl From<TextualSelect> for Statement {
    fn from(t: TextualSelect) -> Self {
        Statement::Text(t)
    }
}

/// A text statement with no declared result columns.
impl From<TextClause> for Statement {
    fn from(t: TextClause) -> Self {
        Statement::Text(t.columns(Vec::<(String, _)>::new()))
    }
}

impl From<CreateIndex> for Statement {
    fn from(c: CreateIndex) -> Self {
        Statement::CreateIndex(c)
    }
}

impl From<DropIndex> for Statement {
    fn from(d: DropIndex) -> Self {
        Statement::DropIndex(d)
    }
}
