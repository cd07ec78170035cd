//! Embedded documents stored in PropertyBag columns.
//!
//! Field names are written verbatim; do not add `rename_all` here, older
//! documents are matched by these exact names.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::typed::PropertyBag;

/// Free-form properties embedded in an order row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderProperties {
    pub customer_reference: Option<String>,
    pub delivery_note: Option<String>,
    pub priority: u8,
    pub tags: Vec<String>,
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl PropertyBag for OrderProperties {}

/// Per-product permissions of a permission group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductPermission {
    pub can_view: bool,
    pub can_order: bool,
    pub can_edit: bool,
}

impl PropertyBag for ProductPermission {}

/// Permissions granted to every member of a permission group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupPermission {
    pub manage_orders: bool,
    pub manage_stock: bool,
    pub manage_products: bool,
    pub manage_users: bool,
    /// Order steps members may record.
    pub allowed_steps: Vec<String>,
}

impl PropertyBag for GroupPermission {}
