//! Graph module: relationship policies and the row reference graph.

mod entity_graph;
mod policy;

pub use entity_graph::{EntityGraph, Link};
pub use policy::{
    DeletePolicy, PolicyError, Relationship, RelationshipKind, RelationshipTable,
    STANDARD_RELATIONSHIPS,
};
