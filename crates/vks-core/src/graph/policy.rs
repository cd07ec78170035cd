//! Relationship policy table.
//!
//! Design:
//! - Every relationship is `(name, dependent table, referenced table, kind)`.
//! - Historical, referential and join-table links are `Restrict`.
//! - Only compositions (embedded documents) are `Cascade`; they live inside
//!   the owner's row and are never deleted through the delete path.

use std::collections::HashMap;

use crate::domain::table::Table;

/// What happens to dependents when the referenced row is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeletePolicy {
    /// Reject the delete while at least one dependent exists.
    Restrict,
    /// Remove together with the owner.
    Cascade,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationshipKind {
    /// State history row → tracked entity.
    Historical,
    Referential,
    JoinTable,
    /// Embedded document owned 1:1 by its row.
    Composition,
}

impl RelationshipKind {
    pub fn default_policy(self) -> DeletePolicy {
        match self {
            RelationshipKind::Composition => DeletePolicy::Cascade,
            RelationshipKind::Historical
            | RelationshipKind::Referential
            | RelationshipKind::JoinTable => DeletePolicy::Restrict,
        }
    }
}

/// A directed link `dependent → referenced`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Relationship {
    pub name: &'static str,
    pub dependent: Table,
    pub referenced: Table,
    pub kind: RelationshipKind,
    pub policy: DeletePolicy,
}

impl Relationship {
    pub const fn new(
        name: &'static str,
        dependent: Table,
        referenced: Table,
        kind: RelationshipKind,
        policy: DeletePolicy,
    ) -> Self {
        Self {
            name,
            dependent,
            referenced,
            kind,
            policy,
        }
    }

    const fn restrict(
        name: &'static str,
        dependent: Table,
        referenced: Table,
        kind: RelationshipKind,
    ) -> Self {
        Self::new(name, dependent, referenced, kind, DeletePolicy::Restrict)
    }

    /// Compositions point a row's embedded document at the row itself.
    const fn composition(name: &'static str, owner: Table) -> Self {
        Self::new(
            name,
            owner,
            owner,
            RelationshipKind::Composition,
            DeletePolicy::Cascade,
        )
    }
}

use RelationshipKind::{Historical, JoinTable, Referential};

/// The relationships persisted by the order tracking core.
pub const STANDARD_RELATIONSHIPS: &[Relationship] = &[
    Relationship::restrict("stock_item_option_value.option", Table::StockItemOptionValue, Table::StockItemOption, Referential),
    Relationship::restrict("stock_item_option.stock_item", Table::StockItemOption, Table::StockItem, Referential),
    Relationship::restrict("option_accessory_set.product", Table::OptionAccessorySet, Table::Product, Referential),
    Relationship::restrict("order_item_option_value.option_value", Table::OrderItemOptionValue, Table::OptionValue, Referential),
    Relationship::restrict("product_subproduct.product", Table::ProductSubproduct, Table::Product, JoinTable),
    Relationship::restrict("product_subproduct.subproduct", Table::ProductSubproduct, Table::Product, JoinTable),
    Relationship::restrict("permission_group_step.group", Table::PermissionGroupStep, Table::PermissionGroup, JoinTable),
    Relationship::restrict("permission_group_user.group", Table::PermissionGroupUser, Table::PermissionGroup, JoinTable),
    Relationship::restrict("permission_product.group", Table::PermissionProduct, Table::PermissionGroup, JoinTable),
    Relationship::restrict("order_item.order", Table::OrderItem, Table::Order, Referential),
    Relationship::restrict("order_state.order", Table::OrderState, Table::Order, Historical),
    Relationship::restrict("order_item_state.order_item", Table::OrderItemState, Table::OrderItem, Historical),
    Relationship::restrict("stock_item_state.stock_item", Table::StockItemState, Table::StockItem, Historical),
    Relationship::composition("order.properties", Table::Order),
    Relationship::composition("permission_product.permissions", Table::PermissionProduct),
    Relationship::composition("permission_group.permissions", Table::PermissionGroup),
];

/// PolicyError は RelationshipTable の構築エラー
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("relationship '{0}' is declared more than once")]
    DuplicateRelationship(&'static str),

    #[error("composition '{0}' must cascade")]
    CompositionMustCascade(&'static str),

    #[error("relationship '{0}' is not a composition and cannot cascade")]
    CascadeOutsideComposition(&'static str),
}

/// Static `(relationship, policy)` table consulted by the delete path.
#[derive(Debug, Clone)]
pub struct RelationshipTable {
    by_name: HashMap<&'static str, Relationship>,
    /// referenced table → relationships pointing at it (declaration order)
    by_referenced: HashMap<Table, Vec<Relationship>>,
}

impl RelationshipTable {
    pub fn new(relationships: &[Relationship]) -> Result<Self, PolicyError> {
        let mut by_name = HashMap::new();
        let mut by_referenced: HashMap<Table, Vec<Relationship>> = HashMap::new();
        for rel in relationships {
            match (rel.kind, rel.policy) {
                (RelationshipKind::Composition, DeletePolicy::Restrict) => {
                    return Err(PolicyError::CompositionMustCascade(rel.name));
                }
                (kind, DeletePolicy::Cascade) if kind != RelationshipKind::Composition => {
                    return Err(PolicyError::CascadeOutsideComposition(rel.name));
                }
                _ => {}
            }
            if by_name.insert(rel.name, *rel).is_some() {
                return Err(PolicyError::DuplicateRelationship(rel.name));
            }
            by_referenced.entry(rel.referenced).or_default().push(*rel);
        }
        Ok(Self {
            by_name,
            by_referenced,
        })
    }

    pub fn standard() -> Self {
        // The standard list is checked by `standard_table_is_valid`.
        match Self::new(STANDARD_RELATIONSHIPS) {
            Ok(table) => table,
            Err(e) => unreachable!("standard relationship table is invalid: {e}"),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Relationship> {
        self.by_name.get(name)
    }

    pub fn policy_of(&self, name: &str) -> Option<DeletePolicy> {
        self.get(name).map(|rel| rel.policy)
    }

    /// Relationships whose referenced side is `table`, compositions excluded.
    pub fn referencing(&self, table: Table) -> impl Iterator<Item = &Relationship> {
        self.by_referenced
            .get(&table)
            .into_iter()
            .flatten()
            .filter(|rel| rel.kind != RelationshipKind::Composition)
    }

    pub fn compositions_of(&self, table: Table) -> impl Iterator<Item = &Relationship> {
        self.by_referenced
            .get(&table)
            .into_iter()
            .flatten()
            .filter(|rel| rel.kind == RelationshipKind::Composition)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.by_name.values()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

impl Default for RelationshipTable {
    fn default() -> Self {
        Self::standard()
    }
}
