//! Domain identifiers (strongly-typed IDs).
//!
//! # ULID ベースの ID + ジェネリック実装
//! すべての行 ID は ULID (Universally Unique Lexicographically Sortable Identifier) です。
//! Phantom type パターンで `OrderId` と `StockItemId` などを型レベルで区別します。
//!
//! ## ULID の特性
//! - **時刻でソート可能**: timestamp が先頭にあるため、生成順序でソートできる
//! - **分散生成可能**: 調整なしで複数ノードで生成できる
//! - **UUID互換**: 128-bit で UUID と同じサイズ

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

/// IdMarker は各 ID 型のマーカー trait
///
/// Display で使うプレフィックス（"order-", "state-" など）を提供します。
pub trait IdMarker: Send + Sync + 'static {
    /// Display で使うプレフィックス（例: "order-", "stock-item-"）
    fn prefix() -> &'static str;
}

/// ジェネリック ID 型
///
/// `T` は PhantomData で、実行時にはメモリを消費しませんが、
/// コンパイル時に型安全性を提供します。
///
/// # 例
/// ```ignore
/// let order_id: OrderId = Id::from(Ulid::new());
/// let stock_id: StockItemId = Id::from(Ulid::new());
/// // order_id と stock_id は異なる型なので、混同できない
/// ```
#[repr(transparent)]
#[derive(Serialize, Deserialize)]
#[serde(transparent, bound = "")]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

// derive は `T: Clone` などを要求してしまうので手で実装する
impl<T: IdMarker> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: IdMarker> Copy for Id<T> {}

impl<T: IdMarker> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ulid == other.ulid
    }
}

impl<T: IdMarker> Eq for Id<T> {}

impl<T: IdMarker> std::hash::Hash for Id<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.ulid.hash(state);
    }
}

impl<T: IdMarker> PartialOrd for Id<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: IdMarker> Ord for Id<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.ulid.cmp(&other.ulid)
    }
}

impl<T: IdMarker> Id<T> {
    /// ULID から Id を作成
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    /// 内部の ULID を取得
    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

// ========================================
// マーカー型の定義
// ========================================

/// Order のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Order {}

impl IdMarker for Order {
    fn prefix() -> &'static str {
        "order-"
    }
}

/// OrderItem のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OrderItem {}

impl IdMarker for OrderItem {
    fn prefix() -> &'static str {
        "order-item-"
    }
}

/// StockItem のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StockItem {}

impl IdMarker for StockItem {
    fn prefix() -> &'static str {
        "stock-item-"
    }
}

/// StateRecord のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum State {}

impl IdMarker for State {
    fn prefix() -> &'static str {
        "state-"
    }
}

/// 追跡対象でない一般の行（Product, Option など）のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Row {}

impl IdMarker for Row {
    fn prefix() -> &'static str {
        "row-"
    }
}

// ========================================
// Type Alias（使いやすさのため）
// ========================================

/// Identifier of an Order.
pub type OrderId = Id<Order>;

/// Identifier of an item within an Order.
pub type OrderItemId = Id<OrderItem>;

/// Identifier of a StockItem.
pub type StockItemId = Id<StockItem>;

/// Identifier of one immutable StateRecord.
pub type StateId = Id<State>;

/// Identifier of a plain (untracked) row.
pub type RowId = Id<Row>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_types() {
        let ulid1 = Ulid::new();
        let ulid2 = Ulid::new();
        let ulid3 = Ulid::new();

        let order = OrderId::from_ulid(ulid1);
        let stock = StockItemId::from_ulid(ulid2);
        let state = StateId::from_ulid(ulid3);

        assert_eq!(order.as_ulid(), ulid1);
        assert_eq!(stock.as_ulid(), ulid2);
        assert_eq!(state.as_ulid(), ulid3);

        assert!(order.to_string().starts_with("order-"));
        assert!(stock.to_string().starts_with("stock-item-"));
        assert!(state.to_string().starts_with("state-"));

        // let _: OrderId = stock; // <- does not compile
    }

    #[test]
    fn ulid_ids_are_sortable() {
        let id1 = OrderId::from_ulid(Ulid::new());
        std::thread::sleep(std::time::Duration::from_millis(2));
        let id2 = OrderId::from_ulid(Ulid::new());

        assert!(id1 < id2);
    }

    #[test]
    fn ids_serialize_as_bare_ulid() {
        let order_id = OrderId::from_ulid(Ulid::new());

        let serialized = serde_json::to_string(&order_id).unwrap();
        assert_eq!(serialized, format!("\"{}\"", order_id.as_ulid()));

        let deserialized: OrderId = serde_json::from_str(&serialized).unwrap();
        assert_eq!(order_id, deserialized);
    }

    #[test]
    fn phantom_data_does_not_consume_memory() {
        use std::mem::size_of;

        assert_eq!(size_of::<OrderId>(), size_of::<Ulid>());
        assert_eq!(size_of::<StateId>(), 16);
    }
}
