//! Domain model (ids, type families, tables, state history, errors).

pub mod errors;
pub mod ids;
pub mod properties;
pub mod state;
pub mod table;
pub mod variants;

pub use errors::{ErrorKind, TrackerError, TrackerResult};
pub use ids::{
    Id, IdMarker, Order, OrderId, OrderItem, OrderItemId, RowId, StateId, StockItem, StockItemId,
};
pub use properties::{GroupPermission, OrderProperties, ProductPermission};
pub use state::{StateDraft, StatePayload, StateRecord, StoredState, TrackedKind};
pub use table::{RowRef, Table};
pub use variants::{
    AmountUnitType, ControlType, OrderStepType, OrderType, ProductCategoryType, ProductFileType,
    StockItemStepType, StorageType,
};
