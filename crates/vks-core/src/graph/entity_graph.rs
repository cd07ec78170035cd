//! Row reference graph used by the delete path.
//!
//! Design:
//! - Forward edges: dependent row -> rows it references
//! - Reverse edges: referenced row -> rows that depend on it
//! - Invariant: edges and reverse_edges must be kept in sync

use std::collections::hash_map::Entry;
use std::collections::{BTreeSet, HashMap};

use super::policy::{DeletePolicy, Relationship, RelationshipTable};
use crate::domain::errors::{TrackerError, TrackerResult};
use crate::domain::table::RowRef;

/// One stored relationship column value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Link {
    pub relationship: &'static str,
    pub row: RowRef,
}

/// Reference graph between rows.
///
/// This graph maintains both forward and reverse edges for efficient lookups:
/// - `edges`: dependent -> links it holds
/// - `reverse_edges`: referenced -> links pointing at it
#[derive(Debug, Default, Clone)]
pub struct EntityGraph {
    edges: HashMap<RowRef, BTreeSet<Link>>,
    reverse_edges: HashMap<RowRef, BTreeSet<Link>>,
}

impl EntityGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `dependent` references `referenced` through `rel`.
    ///
    /// Example: link(order_state.order, state_row, order_row) means
    /// "state_row belongs to order_row", and updates both:
    /// - edges: state_row -> {order_row}
    /// - reverse_edges: order_row -> {state_row}
    pub fn link(
        &mut self,
        rel: &Relationship,
        dependent: RowRef,
        referenced: RowRef,
    ) -> TrackerResult<()> {
        if dependent.table != rel.dependent || referenced.table != rel.referenced {
            return Err(TrackerError::InvalidLink {
                relationship: rel.name,
                dependent,
                referenced,
            });
        }
        self.edges.entry(dependent).or_default().insert(Link {
            relationship: rel.name,
            row: referenced,
        });
        self.reverse_edges.entry(referenced).or_default().insert(Link {
            relationship: rel.name,
            row: dependent,
        });
        Ok(())
    }

    /// Drop every link held by `dependent`. Called when that row is deleted.
    pub fn unlink_all(&mut self, dependent: RowRef) {
        let Some(links) = self.edges.remove(&dependent) else {
            return;
        };
        for link in links {
            if let Entry::Occupied(mut e) = self.reverse_edges.entry(link.row) {
                e.get_mut().remove(&Link {
                    relationship: link.relationship,
                    row: dependent,
                });
                if e.get().is_empty() {
                    e.remove_entry();
                }
            }
        }
    }

    /// Rows referencing `row`, with the relationship they use.
    pub fn dependents_of(&self, row: RowRef) -> Vec<Link> {
        self.reverse_edges
            .get(&row)
            .map(|links| links.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Rows `row` references.
    pub fn references_of(&self, row: RowRef) -> Vec<Link> {
        self.edges
            .get(&row)
            .map(|links| links.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn has_dependents(&self, row: RowRef) -> bool {
        self.reverse_edges
            .get(&row)
            .map(|links| !links.is_empty())
            .unwrap_or(false)
    }

    /// Application-level pre-check for deleting `row`.
    ///
    /// Fails with `ReferentialIntegrity` on the first restrict relationship
    /// (in table declaration order) that still has dependents.
    pub fn check_delete(&self, row: RowRef, policies: &RelationshipTable) -> TrackerResult<()> {
        let dependents = self.dependents_of(row);
        if dependents.is_empty() {
            return Ok(());
        }
        for rel in policies.referencing(row.table) {
            if rel.policy != DeletePolicy::Restrict {
                continue;
            }
            let count = dependents
                .iter()
                .filter(|link| link.relationship == rel.name)
                .count();
            if count > 0 {
                return Err(TrackerError::ReferentialIntegrity {
                    row,
                    relationship: rel.name,
                    dependents: count,
                });
            }
        }
        Ok(())
    }
}
