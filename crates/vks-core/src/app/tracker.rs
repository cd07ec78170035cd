//! Tracker - 状態履歴・型付き列・PropertyBag 列の型付きファサード
//!
//! # 学習ポイント
//! - 型付き API（`append_state::<Order>`）から名前ベースの StateStore への変換
//! - 読み込み時に必ず TypeRegistry を通す（未知の名前はデフォルトに落とさない）
//! - 楽観的バージョニング：`version` を読んでから `append_state_at_version`
//!
//! Tracker はリトライしません。`Conflict` / `Timeout` を受け取った呼び出し側が
//! 判断します（`TrackerError::is_retryable`）。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::domain::errors::{TrackerError, TrackerResult};
use crate::domain::ids::{Id, Order, OrderId, OrderItem, OrderItemId, Row, State, StockItem, StockItemId};
use crate::domain::state::{StateDraft, StatePayload, StateRecord, TrackedKind};
use crate::domain::table::{RowRef, Table};
use crate::graph::{Link, RelationshipTable};
use crate::observability::StoreCounts;
use crate::ports::{Clock, IdGenerator, StateStore};
use crate::typed::{PropertyBag, PropertyCodec, TypeRegistry, TypeVariant};

/// Relationship that ties an order item to its order.
pub const ORDER_ITEM_ORDER: &str = "order_item.order";

/// Composition holding an order's embedded properties.
pub const ORDER_PROPERTIES: &str = "order.properties";

pub struct Tracker {
    registry: Arc<TypeRegistry>,
    policies: Arc<RelationshipTable>,
    store: Arc<dyn StateStore>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    codec: PropertyCodec,
}

impl Tracker {
    pub(crate) fn new(
        registry: Arc<TypeRegistry>,
        policies: Arc<RelationshipTable>,
        store: Arc<dyn StateStore>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            registry,
            policies,
            store,
            clock,
            ids,
            codec: PropertyCodec::new(),
        }
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    pub fn relationships(&self) -> &RelationshipTable {
        &self.policies
    }

    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    pub fn codec(&self) -> PropertyCodec {
        self.codec
    }

    // ----------------------------------------
    // rows and tracked entities
    // ----------------------------------------

    /// Create a tracked entity with no state yet.
    pub async fn create<K: TrackedKind>(&self, links: &[Link]) -> TrackerResult<Id<K>> {
        let id: Id<K> = self.ids.generate();
        self.store.insert_row(K::row(id), links).await?;
        Ok(id)
    }

    pub async fn create_order(&self) -> TrackerResult<OrderId> {
        self.create::<Order>(&[]).await
    }

    /// Create an item of `order`; the order cannot be deleted while it exists.
    pub async fn create_order_item(&self, order: OrderId) -> TrackerResult<OrderItemId> {
        let link = Link {
            relationship: ORDER_ITEM_ORDER,
            row: Order::row(order),
        };
        self.create::<OrderItem>(&[link]).await
    }

    pub async fn create_stock_item(&self) -> TrackerResult<StockItemId> {
        self.create::<StockItem>(&[]).await
    }

    /// Insert an untracked row (product, option, permission group, ...).
    pub async fn insert_row(&self, table: Table, links: &[Link]) -> TrackerResult<RowRef> {
        let id: Id<Row> = self.ids.generate();
        let row = RowRef::of(table, id);
        self.store.insert_row(row, links).await?;
        Ok(row)
    }

    /// Delete a row after the restrict pre-check.
    ///
    /// State history rows are rejected with `ImmutableRecord`.
    pub async fn delete(&self, row: RowRef) -> TrackerResult<()> {
        self.store.delete_row(row).await
    }

    /// Delete a tracked entity. Fails with `ReferentialIntegrity` once it has
    /// any history.
    pub async fn delete_entity<K: TrackedKind>(&self, id: Id<K>) -> TrackerResult<()> {
        self.delete(K::row(id)).await
    }

    pub async fn exists(&self, row: RowRef) -> TrackerResult<bool> {
        self.store.row_exists(row).await
    }

    // ----------------------------------------
    // state history
    // ----------------------------------------

    /// Version the next append of `id` must name.
    pub async fn version<K: TrackedKind>(&self, id: Id<K>) -> TrackerResult<u64> {
        self.store.version(K::row(id)).await
    }

    /// Append a state record timestamped by the clock.
    pub async fn record<K: TrackedKind>(
        &self,
        id: Id<K>,
        payload: StatePayload<K::Step>,
    ) -> TrackerResult<StateRecord<K>> {
        let now = self.clock.now();
        self.append_state(id, payload, now).await
    }

    /// Append against the entity's current version.
    ///
    /// A concurrent append that lands between the version read and the write
    /// makes this fail with `Conflict`; nothing is written in that case.
    pub async fn append_state<K: TrackedKind>(
        &self,
        id: Id<K>,
        payload: StatePayload<K::Step>,
        timestamp: DateTime<Utc>,
    ) -> TrackerResult<StateRecord<K>> {
        let version = self.version(id).await?;
        self.append_state_at_version(id, version, payload, timestamp)
            .await
    }

    pub async fn append_state_at_version<K: TrackedKind>(
        &self,
        id: Id<K>,
        expected_version: u64,
        payload: StatePayload<K::Step>,
        timestamp: DateTime<Utc>,
    ) -> TrackerResult<StateRecord<K>> {
        let family = <K::Step as TypeVariant>::FAMILY;
        if !self.registry.contains_family(family) {
            return Err(TrackerError::UnknownFamily(family.to_string()));
        }
        let draft = StateDraft {
            id: self.ids.generate::<State>(),
            timestamp,
            step: self.registry.name_of(payload.step).to_string(),
            note: payload.note,
            actor: payload.actor,
        };
        let stored = self
            .store
            .append_state(K::row(id), expected_version, draft)
            .await?;
        debug!(entity = %id, step = %stored.step, sequence = stored.sequence, "transition recorded");
        StateRecord::decode(&stored, &self.registry)
    }

    /// Latest record, or `None` before the first transition.
    pub async fn current_state<K: TrackedKind>(
        &self,
        id: Id<K>,
    ) -> TrackerResult<Option<StateRecord<K>>> {
        self.store
            .current_state(K::row(id))
            .await?
            .map(|stored| StateRecord::decode(&stored, &self.registry))
            .transpose()
    }

    /// Every record in append order.
    pub async fn history<K: TrackedKind>(&self, id: Id<K>) -> TrackerResult<Vec<StateRecord<K>>> {
        self.store
            .history(K::row(id))
            .await?
            .iter()
            .map(|stored| StateRecord::decode(stored, &self.registry))
            .collect()
    }

    // ----------------------------------------
    // embedded documents
    // ----------------------------------------

    pub async fn write_properties<B: PropertyBag>(
        &self,
        row: RowRef,
        composition: &'static str,
        bag: &B,
    ) -> TrackerResult<()> {
        let text = self.codec.encode(bag)?;
        self.store.write_document(row, composition, text).await
    }

    /// Read an embedded document; a never-written document reads as the default.
    pub async fn read_properties<B: PropertyBag>(
        &self,
        row: RowRef,
        composition: &'static str,
    ) -> TrackerResult<B> {
        let text = self.store.read_document(row, composition).await?;
        self.codec.decode(text.as_deref())
    }

    // ----------------------------------------
    // typed-enum columns
    // ----------------------------------------

    pub async fn write_type_column<F: TypeVariant>(
        &self,
        row: RowRef,
        column: &'static str,
        variant: F,
    ) -> TrackerResult<()> {
        if !self.registry.contains_family(F::FAMILY) {
            return Err(TrackerError::UnknownFamily(F::FAMILY.to_string()));
        }
        self.store
            .write_type_column(row, column, self.registry.name_of(variant))
            .await
    }

    /// `None` when the column was never written. A stored name that no
    /// longer resolves is `NotFound`.
    pub async fn read_type_column<F: TypeVariant>(
        &self,
        row: RowRef,
        column: &'static str,
    ) -> TrackerResult<Option<F>> {
        self.store
            .read_type_column(row, column)
            .await?
            .map(|name| self.registry.lookup_by_name::<F>(&name))
            .transpose()
    }

    pub async fn counts(&self) -> TrackerResult<StoreCounts> {
        self.store.counts().await
    }
}
