//! Column references and their lineage.
//!
//! Every column a selectable exports remembers the columns it was derived
//! from, each with a distance (0 for itself, +1 per layer of aliasing,
//! subquerying or CTE wrapping). Correspondence between columns of different
//! selectables is decided on that lineage alone.

use std::fmt;
use std::sync::Arc;

use super::cte::Cte;
use super::from::{Alias, FromItem};
use super::ids::NodeId;
use super::table::Table;
use super::types::LogicalType;

/// What a column reference is qualified by.
#[derive(Clone)]
pub enum SourceRef {
    Table(Table),
    Alias(Alias),
    Cte(Cte),
    /// Exported by an unaliased select or compound; cannot be rendered.
    Derived(NodeId),
}

impl SourceRef {
    pub fn id(&self) -> NodeId {
        match self {
            SourceRef::Table(t) => t.id(),
            SourceRef::Alias(a) => a.id(),
            SourceRef::Cte(c) => c.id(),
            SourceRef::Derived(id) => *id,
        }
    }

    /// Name used for `table_column` style labels and for error messages.
    pub fn display_name(&self) -> String {
        match self {
            SourceRef::Table(t) => t.name().to_string(),
            SourceRef::Alias(a) => a.name_or_hint().to_string(),
            SourceRef::Cte(c) => c.name().to_string(),
            SourceRef::Derived(_) => "anon".to_string(),
        }
    }

    /// The FROM element that brings this source into scope.
    pub fn from_item(&self) -> Option<FromItem> {
        match self {
            SourceRef::Table(t) => Some(FromItem::Table(t.clone())),
            SourceRef::Alias(a) => Some(FromItem::Alias(a.clone())),
            SourceRef::Cte(c) => Some(FromItem::Cte(c.clone())),
            SourceRef::Derived(_) => None,
        }
    }
}

impl PartialEq for SourceRef {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl fmt::Debug for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceRef::Table(t) => write!(f, "table {}", t.fullname()),
            SourceRef::Alias(a) => write!(f, "alias {}", a.name_or_hint()),
            SourceRef::Cte(c) => write!(f, "cte {}", c.name()),
            SourceRef::Derived(id) => write!(f, "derived {:?}", id),
        }
    }
}

/// A column as exported by one particular selectable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnIdentity {
    pub source: NodeId,
    pub name: String,
}

/// One ancestor in a column's lineage.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Proxy {
    pub identity: ColumnIdentity,
    pub distance: u32,
}

/// A column exported by a table, alias, CTE or select.
#[derive(Clone)]
pub struct ColumnRef {
    source: SourceRef,
    name: String,
    ty: LogicalType,
    proxies: Arc<[Proxy]>,
    /// Anonymous label this column re-exports; its name is decided at compile time.
    label: Option<NodeId>,
}

impl ColumnRef {
    /// A column with no ancestry beyond itself.
    pub(crate) fn base(source: SourceRef, name: &str, ty: LogicalType) -> Self {
        let identity = ColumnIdentity {
            source: source.id(),
            name: name.to_string(),
        };
        Self {
            source,
            name: name.to_string(),
            ty,
            proxies: Arc::from(vec![Proxy {
                identity,
                distance: 0,
            }]),
            label: None,
        }
    }

    /// A column derived from one or more inner columns, one layer further out.
    pub(crate) fn project<'a>(
        source: SourceRef,
        name: &str,
        ty: LogicalType,
        label: Option<NodeId>,
        lineage: impl IntoIterator<Item = &'a [Proxy]>,
    ) -> Self {
        let mut proxies = vec![Proxy {
            identity: ColumnIdentity {
                source: source.id(),
                name: name.to_string(),
            },
            distance: 0,
        }];
        for inner in lineage {
            for p in inner {
                match proxies.iter_mut().find(|q| q.identity == p.identity) {
                    Some(existing) => existing.distance = existing.distance.min(p.distance + 1),
                    None => proxies.push(Proxy {
                        identity: p.identity.clone(),
                        distance: p.distance + 1,
                    }),
                }
            }
        }
        Self {
            source,
            name: name.to_string(),
            ty,
            proxies: Arc::from(proxies),
            label,
        }
    }

    pub fn source(&self) -> &SourceRef {
        &self.source
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &LogicalType {
        &self.ty
    }

    pub fn proxies(&self) -> &[Proxy] {
        &self.proxies
    }

    pub fn label_id(&self) -> Option<NodeId> {
        self.label
    }

    pub fn identity(&self) -> ColumnIdentity {
        ColumnIdentity {
            source: self.source.id(),
            name: self.name.clone(),
        }
    }

    /// True when both columns descend from a common ancestor.
    pub fn shares_lineage(&self, other: &ColumnRef) -> bool {
        self.proxies
            .iter()
            .any(|p| other.proxies.iter().any(|q| q.identity == p.identity))
    }
}

impl PartialEq for ColumnRef {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.name == other.name && self.label == other.label
    }
}

impl fmt::Debug for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Column({:?}.{})", self.source, self.name)
    }
}
