//! State - 追跡エンティティの状態履歴
//!
//! # モデル
//! - 追跡エンティティ（Order, OrderItem, StockItem）は append-only の履歴を持つ
//! - LastState は履歴内のインデックス（`Option<usize>`）で、相互参照を作らない
//! - StateRecord は作成後に変更できない（フィールドは private、getter のみ）

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::TrackerResult;
use super::ids::{Id, IdMarker, Order, OrderItem, StateId, StockItem};
use super::table::{RowRef, Table};
use super::variants::{OrderStepType, StockItemStepType};
use crate::typed::{TypeRegistry, TypeVariant};

/// TrackedKind は状態履歴を持つエンティティの種類
///
/// `Step` はそのエンティティの履歴に記録される型ファミリーです。
pub trait TrackedKind: IdMarker + Clone + std::fmt::Debug + PartialEq {
    /// エンティティ本体のテーブル
    const TABLE: Table;

    /// 履歴レコードのテーブル
    const HISTORY_TABLE: Table;

    /// 履歴 → 本体の relationship 名（restrict）
    const HISTORY_RELATIONSHIP: &'static str;

    type Step: TypeVariant;

    fn row(id: Id<Self>) -> RowRef
    where
        Self: Sized,
    {
        RowRef::of(Self::TABLE, id)
    }
}

impl TrackedKind for Order {
    const TABLE: Table = Table::Order;
    const HISTORY_TABLE: Table = Table::OrderState;
    const HISTORY_RELATIONSHIP: &'static str = "order_state.order";
    type Step = OrderStepType;
}

impl TrackedKind for OrderItem {
    const TABLE: Table = Table::OrderItem;
    const HISTORY_TABLE: Table = Table::OrderItemState;
    const HISTORY_RELATIONSHIP: &'static str = "order_item_state.order_item";
    type Step = OrderStepType;
}

impl TrackedKind for StockItem {
    const TABLE: Table = Table::StockItem;
    const HISTORY_TABLE: Table = Table::StockItemState;
    const HISTORY_RELATIONSHIP: &'static str = "stock_item_state.stock_item";
    type Step = StockItemStepType;
}

/// What a transition records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatePayload<S> {
    pub step: S,
    pub note: Option<String>,
    /// Who recorded the transition (opaque identity from the caller).
    pub actor: Option<String>,
}

impl<S> StatePayload<S> {
    pub fn new(step: S) -> Self {
        Self {
            step,
            note: None,
            actor: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }
}

/// Input to the store's append: everything but the sequence number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateDraft {
    pub id: StateId,
    pub timestamp: DateTime<Utc>,
    /// Display name of the step variant (typed-enum column).
    pub step: String,
    pub note: Option<String>,
    pub actor: Option<String>,
}

/// A state record as persisted: the step is stored by name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredState {
    pub row: RowRef,
    pub owner: RowRef,
    /// 1-based position in the owner's history.
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub step: String,
    pub note: Option<String>,
    pub actor: Option<String>,
}

impl StoredState {
    pub(crate) fn from_draft(draft: StateDraft, history_table: Table, owner: RowRef, sequence: u64) -> Self {
        Self {
            row: RowRef::of(history_table, draft.id),
            owner,
            sequence,
            timestamp: draft.timestamp,
            step: draft.step,
            note: draft.note,
            actor: draft.actor,
        }
    }
}

/// An immutable, typed snapshot of an entity's status at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct StateRecord<K: TrackedKind> {
    id: StateId,
    owner: Id<K>,
    sequence: u64,
    timestamp: DateTime<Utc>,
    payload: StatePayload<K::Step>,
}

impl<K: TrackedKind> StateRecord<K> {
    /// Decode a persisted record; an unknown step name propagates as `NotFound`.
    pub fn decode(stored: &StoredState, registry: &TypeRegistry) -> TrackerResult<Self> {
        let step = registry.lookup_by_name::<K::Step>(&stored.step)?;
        Ok(Self {
            id: StateId::from_ulid(stored.row.id),
            owner: Id::from_ulid(stored.owner.id),
            sequence: stored.sequence,
            timestamp: stored.timestamp,
            payload: StatePayload {
                step,
                note: stored.note.clone(),
                actor: stored.actor.clone(),
            },
        })
    }

    pub fn id(&self) -> StateId {
        self.id
    }

    pub fn owner(&self) -> Id<K> {
        self.owner
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn payload(&self) -> &StatePayload<K::Step> {
        &self.payload
    }

    pub fn step(&self) -> K::Step {
        self.payload.step
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::ErrorKind;
    use crate::domain::ids::OrderId;
    use chrono::TimeZone;
    use ulid::Ulid;

    fn stored(step: &str) -> StoredState {
        let owner = OrderId::from_ulid(Ulid::new());
        StoredState::from_draft(
            StateDraft {
                id: StateId::from_ulid(Ulid::new()),
                timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap(),
                step: step.to_string(),
                note: Some("line 2".to_string()),
                actor: None,
            },
            Table::OrderState,
            Order::row(owner),
            1,
        )
    }

    #[test]
    fn decodes_step_through_registry() {
        let registry = TypeRegistry::standard().unwrap();
        let stored = stored("InProduction");
        let record = StateRecord::<Order>::decode(&stored, &registry).unwrap();

        assert_eq!(record.step(), OrderStepType::InProduction);
        assert_eq!(record.sequence(), 1);
        assert_eq!(record.owner().as_ulid(), stored.owner.id);
        assert_eq!(record.id().as_ulid(), stored.row.id);
        assert_eq!(record.payload().note.as_deref(), Some("line 2"));
    }

    #[test]
    fn unknown_stored_step_is_not_silently_defaulted() {
        let registry = TypeRegistry::standard().unwrap();
        let err = StateRecord::<Order>::decode(&stored("Archived"), &registry).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn stock_steps_do_not_decode_as_order_steps() {
        let registry = TypeRegistry::standard().unwrap();
        assert!(StateRecord::<Order>::decode(&stored("Received"), &registry).is_err());
    }
}
