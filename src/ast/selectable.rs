//! Things that export columns, and column correspondence between them.

use super::column::{ColumnRef, Proxy};
use crate::error::{CompileError, CompileResult};

/// Outcome of matching a column against a selectable's exported columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Correspondence {
    None,
    Unique(usize),
    /// Several candidates share the smallest distance. `chosen` is the first
    /// of them in column order.
    Tied { chosen: usize, others: Vec<usize> },
}

impl Correspondence {
    pub fn index(&self) -> Option<usize> {
        match self {
            Correspondence::None => None,
            Correspondence::Unique(i) => Some(*i),
            Correspondence::Tied { chosen, .. } => Some(*chosen),
        }
    }
}

/// Distance between two lineages: the smallest combined distance to a
/// shared ancestor.
fn lineage_distance(candidate: &[Proxy], target: &[Proxy]) -> Option<u32> {
    candidate
        .iter()
        .filter_map(|c| {
            target
                .iter()
                .find(|t| t.identity == c.identity)
                .map(|t| c.distance + t.distance)
        })
        .min()
}

/// Pick the candidate lineage closest to `target`.
pub fn best_match<'a>(
    candidates: impl IntoIterator<Item = &'a [Proxy]>,
    target: &[Proxy],
) -> Correspondence {
    let mut best: Option<(u32, usize)> = None;
    let mut ties: Vec<usize> = Vec::new();
    for (i, candidate) in candidates.into_iter().enumerate() {
        let Some(d) = lineage_distance(candidate, target) else {
            continue;
        };
        match best {
            Some((bd, _)) if d > bd => {}
            Some((bd, _)) if d == bd => ties.push(i),
            _ => {
                best = Some((d, i));
                ties.clear();
            }
        }
    }
    match best {
        None => Correspondence::None,
        Some((_, i)) if ties.is_empty() => Correspondence::Unique(i),
        Some((_, chosen)) => Correspondence::Tied {
            chosen,
            others: ties,
        },
    }
}

/// A FROM-able or selectable node exposing an ordered column list.
pub trait Selectable {
    fn columns(&self) -> Vec<ColumnRef>;

    /// Human-readable name for error messages.
    fn describe(&self) -> String;

    fn column(&self, name: &str) -> Option<ColumnRef> {
        self.columns().into_iter().find(|c| c.name() == name)
    }

    /// Column accessor.
    fn c(&self, name: &str) -> CompileResult<ColumnRef> {
        self.column(name).ok_or_else(|| {
            CompileError::argument(format!("'{}' has no column '{}'", self.describe(), name))
        })
    }

    fn correspondence(&self, target: &ColumnRef) -> Correspondence {
        let columns = self.columns();
        best_match(columns.iter().map(ColumnRef::proxies), target.proxies())
    }

    /// The exported column that derives from `target` through the shortest
    /// lineage. Ties resolve to the first candidate in column order.
    fn corresponding_column(&self, target: &ColumnRef) -> Option<ColumnRef> {
        let columns = self.columns();
        match best_match(columns.iter().map(ColumnRef::proxies), target.proxies()) {
            Correspondence::None => None,
            Correspondence::Unique(i) => columns.get(i).cloned(),
            Correspondence::Tied { chosen, others } => {
                tracing::warn!(
                    "column '{}' corresponds equally to {} columns of '{}'; using '{}'",
                    target.name(),
                    others.len() + 1,
                    self.describe(),
                    columns[chosen].name()
                );
                columns.get(chosen).cloned()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::column::ColumnIdentity;
    use crate::ast::ids::NodeId;

    fn proxy(source: NodeId, name: &str, distance: u32) -> Proxy {
        Proxy {
            identity: ColumnIdentity {
                source,
                name: name.to_string(),
            },
            distance,
        }
    }

    #[test]
    fn test_closest_lineage_wins() {
        let base = NodeId::next();
        let alias = NodeId::next();
        let target = vec![proxy(base, "a", 0)];
        let far = vec![proxy(alias, "x", 0), proxy(base, "a", 2)];
        let near = vec![proxy(alias, "y", 0), proxy(base, "a", 1)];
        let none = vec![proxy(alias, "z", 0)];
        let result = best_match(
            [far.as_slice(), near.as_slice(), none.as_slice()],
            &target,
        );
        assert_eq!(result, Correspondence::Unique(1));
    }

    #[test]
    fn test_tie_reports_all_candidates() {
        let base = NodeId::next();
        let alias = NodeId::next();
        let target = vec![proxy(base, "a", 0)];
        let first = vec![proxy(alias, "x", 0), proxy(base, "a", 1)];
        let second = vec![proxy(alias, "y", 0), proxy(base, "a", 1)];
        let result = best_match([first.as_slice(), second.as_slice()], &target);
        assert_eq!(
            result,
            Correspondence::Tied {
                chosen: 0,
                others: vec![1]
            }
        );
        assert_eq!(result.index(), Some(0));
    }

    #[test]
    fn test_no_shared_ancestor() {
        let target = vec![proxy(NodeId::next(), "a", 0)];
        let other = vec![proxy(NodeId::next(), "a", 0)];
        assert_eq!(best_match([other.as_slice()], &target), Correspondence::None);
    }
}
