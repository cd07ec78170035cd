//! Tables and row references.
//!
//! Every persisted row is addressed by `(table, ulid)`. Tracked entities and
//! their history rows use the same addressing, which lets the relationship
//! policy treat them uniformly.

use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

use super::ids::{Id, IdMarker};
use crate::type_family;

type_family! {
    /// Tables known to the persistence core.
    pub enum Table: "Table" {
        Order => "Order",
        OrderItem => "OrderItem",
        OrderState => "OrderState",
        OrderItemState => "OrderItemState",
        OrderItemOptionValue => "OrderItemOptionValue",
        StockItem => "StockItem",
        StockItemState => "StockItemState",
        StockItemOption => "StockItemOption",
        StockItemOptionValue => "StockItemOptionValue",
        Product => "Product",
        ProductSubproduct => "ProductSubproduct",
        OptionValue => "OptionValue",
        OptionAccessorySet => "OptionAccessorySet",
        PermissionGroup => "PermissionGroup",
        PermissionGroupStep => "PermissionGroupStep",
        PermissionGroupUser => "PermissionGroupUser",
        PermissionProduct => "PermissionProduct",
    }
}

impl Table {
    /// History tables hold immutable state records.
    pub fn is_history(self) -> bool {
        matches!(
            self,
            Table::OrderState | Table::OrderItemState | Table::StockItemState
        )
    }

    /// Tables whose rows carry a state history and a LastState pointer.
    pub fn is_tracked(self) -> bool {
        self.history_table().is_some()
    }

    /// History table of a tracked table.
    pub fn history_table(self) -> Option<Table> {
        match self {
            Table::Order => Some(Table::OrderState),
            Table::OrderItem => Some(Table::OrderItemState),
            Table::StockItem => Some(Table::StockItemState),
            _ => None,
        }
    }
}

/// Reference to one row: the value stored in a relationship column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RowRef {
    pub table: Table,
    pub id: Ulid,
}

impl RowRef {
    pub fn new(table: Table, id: impl Into<Ulid>) -> Self {
        Self {
            table,
            id: id.into(),
        }
    }

    /// Build a reference from a typed id.
    pub fn of<T: IdMarker>(table: Table, id: Id<T>) -> Self {
        Self::new(table, id.as_ulid())
    }
}

impl fmt::Display for RowRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.table, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ids::OrderId;

    #[test]
    fn row_ref_display_names_table() {
        let id = OrderId::from_ulid(Ulid::new());
        let row = RowRef::of(Table::Order, id);
        assert_eq!(row.to_string(), format!("Order/{}", id.as_ulid()));
    }

    #[test]
    fn history_tables_are_not_tracked() {
        for table in [Table::OrderState, Table::OrderItemState, Table::StockItemState] {
            assert!(table.is_history());
            assert!(!table.is_tracked());
        }
        assert!(Table::StockItem.is_tracked());
        assert!(!Table::Product.is_history());
    }
}
