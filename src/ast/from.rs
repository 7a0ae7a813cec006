//! FROM elements: aliases, joins and join inference.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use super::column::{ColumnIdentity, ColumnRef, SourceRef};
use super::cte::Cte;
use super::expr::Expr;
use super::ids::NodeId;
use super::operators::BinaryOp;
use super::selectable::Selectable;
use super::statement::Queryable;
use super::table::Table;
use crate::error::{CompileError, CompileResult};

/// What an alias renames.
#[derive(Debug, Clone, PartialEq)]
pub enum AliasTarget {
    Table(Table),
    Query(Queryable),
    Cte(Cte),
}

struct AliasInner {
    id: NodeId,
    name: Option<String>,
    target: AliasTarget,
}

/// A named or anonymous alias. Anonymous aliases are named at compile time.
#[derive(Clone)]
pub struct Alias(Arc<AliasInner>);

impl Alias {
    pub(crate) fn of_table(table: Table, name: Option<String>) -> Self {
        Self::new(AliasTarget::Table(table), name)
    }

    pub(crate) fn new(target: AliasTarget, name: Option<String>) -> Self {
        Alias(Arc::new(AliasInner {
            id: NodeId::next(),
            name,
            target,
        }))
    }

    pub fn id(&self) -> NodeId {
        self.0.id
    }

    pub fn name(&self) -> Option<&str> {
        self.0.name.as_deref()
    }

    pub fn is_anonymous(&self) -> bool {
        self.0.name.is_none()
    }

    /// Base an anonymous name is generated from.
    pub fn hint(&self) -> &str {
        match &self.0.target {
            AliasTarget::Table(t) => t.name(),
            AliasTarget::Cte(c) => c.name(),
            AliasTarget::Query(_) => "anon",
        }
    }

    pub fn name_or_hint(&self) -> &str {
        self.0.name.as_deref().unwrap_or_else(|| self.hint())
    }

    pub fn target(&self) -> &AliasTarget {
        &self.0.target
    }

    pub(crate) fn base_tables(&self) -> Vec<Table> {
        match &self.0.target {
            AliasTarget::Table(t) => vec![t.clone()],
            AliasTarget::Query(q) => q.base_tables(),
            AliasTarget::Cte(c) => c.query().base_tables(),
        }
    }
}

impl Selectable for Alias {
    fn columns(&self) -> Vec<ColumnRef> {
        let inner = match &self.0.target {
            AliasTarget::Table(t) => t.columns(),
            AliasTarget::Query(q) => q.columns(),
            AliasTarget::Cte(c) => c.columns(),
        };
        inner
            .iter()
            .map(|c| {
                ColumnRef::project(
                    SourceRef::Alias(self.clone()),
                    c.name(),
                    c.ty().clone(),
                    c.label_id(),
                    [c.proxies()],
                )
            })
            .collect()
    }

    fn describe(&self) -> String {
        self.name_or_hint().to_string()
    }
}

impl PartialEq for Alias {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl fmt::Debug for Alias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Alias({} {:?})", self.name_or_hint(), self.0.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinKind {
    Inner,
    LeftOuter,
    RightOuter,
    FullOuter,
    Cross,
}

impl JoinKind {
    pub fn keyword(self) -> &'static str {
        match self {
            JoinKind::Inner => "JOIN",
            JoinKind::LeftOuter => "LEFT OUTER JOIN",
            JoinKind::RightOuter => "RIGHT OUTER JOIN",
            JoinKind::FullOuter => "FULL OUTER JOIN",
            JoinKind::Cross => "CROSS JOIN",
        }
    }
}

/// One element of a FROM list.
#[derive(Debug, Clone, PartialEq)]
pub enum FromItem {
    Table(Table),
    Alias(Alias),
    Cte(Cte),
    Join(Box<Join>),
}

impl FromItem {
    /// Ids of every table, alias and CTE this element brings into scope.
    pub fn covered_ids(&self) -> Vec<NodeId> {
        self.leaves().iter().filter_map(FromItem::id).collect()
    }

    pub fn id(&self) -> Option<NodeId> {
        match self {
            FromItem::Table(t) => Some(t.id()),
            FromItem::Alias(a) => Some(a.id()),
            FromItem::Cte(c) => Some(c.id()),
            FromItem::Join(_) => None,
        }
    }

    /// Non-join elements, left to right.
    pub fn leaves(&self) -> Vec<FromItem> {
        match self {
            FromItem::Join(j) => {
                let mut out = j.left.leaves();
                out.extend(j.right.leaves());
                out
            }
            other => vec![other.clone()],
        }
    }

    pub(crate) fn base_tables(&self) -> Vec<Table> {
        match self {
            FromItem::Table(t) => vec![t.clone()],
            FromItem::Alias(a) => a.base_tables(),
            FromItem::Cte(c) => c.query().base_tables(),
            FromItem::Join(j) => {
                let mut out = j.left.base_tables();
                out.extend(j.right.base_tables());
                out
            }
        }
    }
}

impl Selectable for FromItem {
    fn columns(&self) -> Vec<ColumnRef> {
        match self {
            FromItem::Table(t) => t.columns(),
            FromItem::Alias(a) => a.columns(),
            FromItem::Cte(c) => c.columns(),
            FromItem::Join(j) => {
                let mut out = j.left.columns();
                out.extend(j.right.columns());
                out
            }
        }
    }

    fn describe(&self) -> String {
        match self {
            FromItem::Table(t) => t.describe(),
            FromItem::Alias(a) => a.describe(),
            FromItem::Cte(c) => c.describe(),
            FromItem::Join(j) => format!("{} JOIN {}", j.left.describe(), j.right.describe()),
        }
    }
}

impl From<Table> for FromItem {
    fn from(t: Table) -> Self {
        FromItem::Table(t)
    }
}

impl From<&Table> for FromItem {
    fn from(t: &Table) -> Self {
        FromItem::Table(t.clone())
    }
}

impl From<Alias> for FromItem {
    fn from(a: Alias) -> Self {
        FromItem::Alias(a)
    }
}

impl From<&Alias> for FromItem {
    fn from(a: &Alias) -> Self {
        FromItem::Alias(a.clone())
    }
}

impl From<Cte> for FromItem {
    fn from(c: Cte) -> Self {
        FromItem::Cte(c)
    }
}

impl From<&Cte> for FromItem {
    fn from(c: &Cte) -> Self {
        FromItem::Cte(c.clone())
    }
}

impl From<Join> for FromItem {
    fn from(j: Join) -> Self {
        FromItem::Join(Box::new(j))
    }
}

/// `left <kind> JOIN right ON on`.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub left: FromItem,
    pub right: FromItem,
    pub kind: JoinKind,
    /// `None` only for cross joins.
    pub on: Option<Expr>,
}

impl Join {
    pub fn on(
        left: impl Into<FromItem>,
        right: impl Into<FromItem>,
        kind: JoinKind,
        on: impl Into<Expr>,
    ) -> Self {
        Join {
            left: left.into(),
            right: right.into(),
            kind,
            on: Some(on.into()),
        }
    }

    pub fn cross(left: impl Into<FromItem>, right: impl Into<FromItem>) -> Self {
        Join {
            left: left.into(),
            right: right.into(),
            kind: JoinKind::Cross,
            on: None,
        }
    }

    /// Join with the ON clause inferred from foreign keys.
    pub fn infer(
        left: impl Into<FromItem>,
        right: impl Into<FromItem>,
        kind: JoinKind,
    ) -> CompileResult<Self> {
        let left = left.into();
        let right = right.into();
        let on = join_condition(&left, &right, None)?;
        Ok(Join {
            left,
            right,
            kind,
            on: Some(on),
        })
    }

    /// Like [`Join::infer`], but the `hint` elements of the left side are
    /// searched for foreign keys first. Used to break ties between several
    /// paths.
    pub fn infer_with_hint(
        left: impl Into<FromItem>,
        right: impl Into<FromItem>,
        kind: JoinKind,
        hint: &[FromItem],
    ) -> CompileResult<Self> {
        let left = left.into();
        let right = right.into();
        let on = join_condition(&left, &right, Some(hint))?;
        Ok(Join {
            left,
            right,
            kind,
            on: Some(on),
        })
    }
}

/// Referenced column paired with the referencing column of one foreign key.
struct Relationship {
    pairs: Vec<(ColumnRef, ColumnRef)>,
}

impl Relationship {
    fn key(&self) -> Vec<(ColumnIdentity, ColumnIdentity)> {
        let mut key: Vec<_> = self
            .pairs
            .iter()
            .map(|(r, f)| (r.identity(), f.identity()))
            .collect();
        key.sort();
        key
    }

    fn describe(&self) -> String {
        self.pairs
            .iter()
            .map(|(r, f)| {
                format!(
                    "{}.{} -> {}.{}",
                    f.source().display_name(),
                    f.name(),
                    r.source().display_name(),
                    r.name()
                )
            })
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    fn condition(self) -> Expr {
        let mut clauses = self
            .pairs
            .into_iter()
            .map(|(r, f)| Expr::binary(Expr::Column(r), BinaryOp::Eq, Expr::Column(f)));
        let first = clauses.next();
        clauses.fold(first.unwrap_or(Expr::Literal(true.into())), |acc, c| {
            Expr::binary(acc, BinaryOp::And, c)
        })
    }
}

/// Foreign keys declared on `fk_side`'s tables that point at `ref_side`.
fn foreign_key_paths(fk_side: &FromItem, ref_side: &FromItem) -> Vec<Relationship> {
    let mut out = Vec::new();
    let ref_tables = ref_side.base_tables();
    for table in fk_side.base_tables() {
        for fk in table.foreign_keys() {
            for referred in ref_tables.iter().filter(|t| t.id() == fk.referred_table) {
                let mut pairs = Vec::with_capacity(fk.columns.len());
                for (local, remote) in fk.columns.iter().zip(&fk.referred_columns) {
                    let (Some(base_local), Some(base_remote)) =
                        (table.column(local), referred.column(remote))
                    else {
                        break;
                    };
                    let (Some(f), Some(r)) = (
                        fk_side.corresponding_column(&base_local),
                        ref_side.corresponding_column(&base_remote),
                    ) else {
                        break;
                    };
                    pairs.push((r, f));
                }
                if pairs.len() == fk.columns.len() {
                    out.push(Relationship { pairs });
                }
            }
        }
    }
    out
}

/// Distinct foreign key paths between any of `left_leaves` and `right`.
fn relationships(left_leaves: &[FromItem], right: &FromItem) -> Vec<Relationship> {
    let mut found: Vec<Relationship> = Vec::new();
    let mut seen: HashSet<Vec<(ColumnIdentity, ColumnIdentity)>> = HashSet::new();
    for r in right.leaves() {
        for l in left_leaves {
            let mut candidates = foreign_key_paths(&r, l);
            if l.id() != r.id() {
                candidates.extend(foreign_key_paths(l, &r));
            }
            for rel in candidates {
                if seen.insert(rel.key()) {
                    found.push(rel);
                }
            }
        }
    }
    found
}

/// Infer `left.referred = right.referencing [AND ...]` from foreign keys in
/// either direction.
///
/// With a `hint`, only those elements of the left side are searched first;
/// the whole left side is searched when they have no path to `right`.
pub fn join_condition(
    left: &FromItem,
    right: &FromItem,
    hint: Option<&[FromItem]>,
) -> CompileResult<Expr> {
    let mut found = match hint {
        Some(items) => {
            let leaves: Vec<FromItem> = items.iter().flat_map(FromItem::leaves).collect();
            relationships(&leaves, right)
        }
        None => Vec::new(),
    };
    if found.is_empty() {
        found = relationships(&left.leaves(), right);
    }

    match found.len() {
        0 => Err(CompileError::NoForeignKey {
            left: left.describe(),
            right: right.describe(),
        }),
        1 => Ok(found.remove(0).condition()),
        _ => Err(CompileError::AmbiguousJoin {
            left: left.describe(),
            right: right.describe(),
            candidates: found.iter().map(Relationship::describe).collect(),
        }),
    }
}
