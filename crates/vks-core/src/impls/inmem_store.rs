//! InMemoryStateStore - 開発用・テスト用の StateStore
//!
//! # 学習ポイント
//! - tokio RwLock 1 つで unit of work を表現（ロック取得後は await しない）
//! - `tokio::time::timeout` による unit of work の期限
//! - 楽観的バージョニングによる並行 append の検出
//!
//! ロック取得より後に await がないため、タイムアウトで中断されるのは
//! ロック待ちの間だけです。部分的に適用された変更は残りません。

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::domain::errors::{TrackerError, TrackerResult};
use crate::domain::state::{StateDraft, StoredState};
use crate::domain::table::RowRef;
use crate::graph::{EntityGraph, Link, Relationship, RelationshipKind, RelationshipTable};
use crate::observability::StoreCounts;
use crate::ports::StateStore;

pub const DEFAULT_UNIT_OF_WORK_TIMEOUT: Duration = Duration::from_secs(5);

/// History and LastState pointer of one tracked entity.
#[derive(Debug, Default)]
struct TrackedRow {
    version: u64,
    history: Vec<StoredState>,
    /// Index into `history`; always the last element once set.
    last_state: Option<usize>,
}

impl TrackedRow {
    fn current(&self) -> Option<&StoredState> {
        self.last_state.and_then(|idx| self.history.get(idx))
    }
}

#[derive(Debug, Default)]
struct RowData {
    tracked: Option<TrackedRow>,
    /// Embedded documents keyed by composition name.
    documents: BTreeMap<&'static str, String>,
    /// Typed-enum columns: column name -> variant display name.
    type_columns: BTreeMap<&'static str, String>,
}

/// In-memory store state.
struct InMemoryStoreState {
    /// All non-history rows (single source of truth).
    rows: HashMap<RowRef, RowData>,

    /// History row -> (owner, index in owner's history).
    history_index: HashMap<RowRef, (RowRef, usize)>,

    /// Relationship columns.
    graph: EntityGraph,

    policies: Arc<RelationshipTable>,
}

impl InMemoryStoreState {
    fn new(policies: Arc<RelationshipTable>) -> Self {
        Self {
            rows: HashMap::new(),
            history_index: HashMap::new(),
            graph: EntityGraph::new(),
            policies,
        }
    }

    fn exists(&self, row: RowRef) -> bool {
        self.rows.contains_key(&row) || self.history_index.contains_key(&row)
    }

    fn row(&self, row: RowRef) -> TrackerResult<&RowData> {
        self.rows.get(&row).ok_or(TrackerError::RowNotFound(row))
    }

    /// Row whose columns may be rewritten. History rows never are.
    fn row_mut(&mut self, row: RowRef) -> TrackerResult<&mut RowData> {
        if row.table.is_history() {
            return Err(TrackerError::ImmutableRecord(row));
        }
        self.rows.get_mut(&row).ok_or(TrackerError::RowNotFound(row))
    }

    fn tracked(&self, owner: RowRef) -> TrackerResult<&TrackedRow> {
        self.row(owner)?
            .tracked
            .as_ref()
            .ok_or(TrackerError::RowNotFound(owner))
    }

    /// Resolve a relationship column and check it fits `dependent`.
    fn resolve_link(&self, dependent: RowRef, link: &Link) -> TrackerResult<Relationship> {
        let invalid = || TrackerError::InvalidLink {
            relationship: link.relationship,
            dependent,
            referenced: link.row,
        };
        let rel = *self.policies.get(link.relationship).ok_or_else(invalid)?;
        if rel.kind == RelationshipKind::Composition
            || rel.dependent != dependent.table
            || rel.referenced != link.row.table
        {
            return Err(invalid());
        }
        if !self.exists(link.row) {
            return Err(TrackerError::RowNotFound(link.row));
        }
        Ok(rel)
    }

    fn history_relationship(&self, owner: RowRef) -> TrackerResult<Relationship> {
        let history_table = owner
            .table
            .history_table()
            .ok_or(TrackerError::RowNotFound(owner))?;
        self.policies
            .referencing(owner.table)
            .find(|rel| rel.kind == RelationshipKind::Historical && rel.dependent == history_table)
            .copied()
            .ok_or(TrackerError::InvalidLink {
                relationship: "<history>",
                dependent: RowRef::new(history_table, owner.id),
                referenced: owner,
            })
    }

    fn composition(&self, row: RowRef, name: &'static str) -> TrackerResult<Relationship> {
        match self.policies.get(name) {
            Some(rel) if rel.kind == RelationshipKind::Composition && rel.dependent == row.table => {
                Ok(*rel)
            }
            _ => Err(TrackerError::InvalidLink {
                relationship: name,
                dependent: row,
                referenced: row,
            }),
        }
    }

    fn insert_row(&mut self, row: RowRef, links: &[Link]) -> TrackerResult<()> {
        if row.table.is_history() {
            return Err(TrackerError::ImmutableRecord(row));
        }
        if self.exists(row) {
            return Err(TrackerError::DuplicateRow(row));
        }
        // validate everything before the first mutation
        let resolved = links
            .iter()
            .map(|link| self.resolve_link(row, link).map(|rel| (rel, link.row)))
            .collect::<TrackerResult<Vec<_>>>()?;

        for (rel, referenced) in &resolved {
            self.graph.link(rel, row, *referenced)?;
        }
        let data = RowData {
            tracked: row.table.is_tracked().then(TrackedRow::default),
            ..Default::default()
        };
        self.rows.insert(row, data);
        Ok(())
    }

    fn delete_row(&mut self, row: RowRef) -> TrackerResult<()> {
        if self.history_index.contains_key(&row) {
            return Err(TrackerError::ImmutableRecord(row));
        }
        if !self.rows.contains_key(&row) {
            return Err(TrackerError::RowNotFound(row));
        }
        self.graph.check_delete(row, &self.policies)?;

        // documents and type columns are part of RowData and go with it
        self.rows.remove(&row);
        self.graph.unlink_all(row);
        Ok(())
    }

    fn append_state(
        &mut self,
        owner: RowRef,
        expected_version: u64,
        draft: StateDraft,
    ) -> TrackerResult<StoredState> {
        let rel = self.history_relationship(owner)?;
        let record_row = RowRef::of(rel.dependent, draft.id);
        if self.exists(record_row) {
            return Err(TrackerError::DuplicateRow(record_row));
        }

        let tracked = self.tracked(owner)?;
        if tracked.version != expected_version {
            return Err(TrackerError::Conflict {
                row: owner,
                expected: expected_version,
                actual: tracked.version,
            });
        }
        if let Some(last) = tracked.current().filter(|last| draft.timestamp < last.timestamp) {
            warn!(
                owner = %owner,
                last = %last.timestamp,
                appended = %draft.timestamp,
                "state timestamp earlier than the previous record; keeping append order"
            );
        }
        let sequence = tracked.history.len() as u64 + 1;

        self.graph.link(&rel, record_row, owner)?;

        let record = StoredState::from_draft(draft, rel.dependent, owner, sequence);
        let tracked = self
            .rows
            .get_mut(&owner)
            .and_then(|data| data.tracked.as_mut())
            .ok_or(TrackerError::RowNotFound(owner))?;
        tracked.history.push(record.clone());
        let idx = tracked.history.len() - 1;
        tracked.last_state = Some(idx);
        tracked.version += 1;
        self.history_index.insert(record_row, (owner, idx));
        Ok(record)
    }

    fn counts(&self) -> StoreCounts {
        let mut counts = StoreCounts::default();
        for (row, data) in &self.rows {
            *counts.rows.entry(row.table.to_string()).or_default() += 1;
            counts.documents += data.documents.len();
            if let Some(tracked) = &data.tracked {
                counts.tracked_entities += 1;
                counts.state_records += tracked.history.len();
                if tracked.last_state.is_some() {
                    counts.with_last_state += 1;
                }
            }
        }
        for row in self.history_index.keys() {
            *counts.rows.entry(row.table.to_string()).or_default() += 1;
        }
        counts
    }
}

/// In-memory StateStore implementation.
pub struct InMemoryStateStore {
    state: Arc<RwLock<InMemoryStoreState>>,
    policies: Arc<RelationshipTable>,
    timeout: Duration,
}

impl InMemoryStateStore {
    pub fn new(policies: Arc<RelationshipTable>, timeout: Duration) -> Self {
        info!(
            relationships = policies.len(),
            timeout_ms = timeout.as_millis() as u64,
            "in-memory state store ready"
        );
        Self {
            state: Arc::new(RwLock::new(InMemoryStoreState::new(policies.clone()))),
            policies,
            timeout,
        }
    }

    /// Standard relationship table and default timeout.
    pub fn standard() -> Self {
        Self::new(
            Arc::new(RelationshipTable::standard()),
            DEFAULT_UNIT_OF_WORK_TIMEOUT,
        )
    }

    /// Run one unit of work under the configured deadline.
    async fn unit_of_work<T, F>(&self, operation: &'static str, work: F) -> TrackerResult<T>
    where
        F: Future<Output = TrackerResult<T>>,
    {
        match tokio::time::timeout(self.timeout, work).await {
            Ok(result) => result,
            Err(_) => {
                warn!(operation, timeout_ms = self.timeout.as_millis() as u64, "unit of work timed out");
                Err(TrackerError::Timeout {
                    operation,
                    after: self.timeout,
                })
            }
        }
    }
}

impl Default for InMemoryStateStore {
    fn default() -> Self {
        Self::standard()
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    fn relationships(&self) -> Arc<RelationshipTable> {
        self.policies.clone()
    }

    async fn insert_row(&self, row: RowRef, links: &[Link]) -> TrackerResult<()> {
        self.unit_of_work("insert_row", async {
            let mut state = self.state.write().await;
            state.insert_row(row, links)?;
            debug!(row = %row, links = links.len(), "row inserted");
            Ok(())
        })
        .await
    }

    async fn delete_row(&self, row: RowRef) -> TrackerResult<()> {
        self.unit_of_work("delete_row", async {
            let mut state = self.state.write().await;
            match state.delete_row(row) {
                Ok(()) => {
                    debug!(row = %row, "row deleted");
                    Ok(())
                }
                Err(e) => {
                    warn!(row = %row, error = %e, "delete rejected");
                    Err(e)
                }
            }
        })
        .await
    }

    async fn row_exists(&self, row: RowRef) -> TrackerResult<bool> {
        self.unit_of_work("row_exists", async {
            let state = self.state.read().await;
            Ok(state.exists(row))
        })
        .await
    }

    async fn dependents_of(&self, row: RowRef) -> TrackerResult<Vec<Link>> {
        self.unit_of_work("dependents_of", async {
            let state = self.state.read().await;
            if !state.exists(row) {
                return Err(TrackerError::RowNotFound(row));
            }
            Ok(state.graph.dependents_of(row))
        })
        .await
    }

    async fn append_state(
        &self,
        owner: RowRef,
        expected_version: u64,
        draft: StateDraft,
    ) -> TrackerResult<StoredState> {
        self.unit_of_work("append_state", async {
            let mut state = self.state.write().await;
            match state.append_state(owner, expected_version, draft) {
                Ok(record) => {
                    debug!(owner = %owner, sequence = record.sequence, step = %record.step, "state appended");
                    Ok(record)
                }
                Err(e @ TrackerError::Conflict { .. }) => {
                    warn!(owner = %owner, error = %e, "state append lost a concurrent race");
                    Err(e)
                }
                Err(e) => Err(e),
            }
        })
        .await
    }

    async fn current_state(&self, owner: RowRef) -> TrackerResult<Option<StoredState>> {
        self.unit_of_work("current_state", async {
            let state = self.state.read().await;
            Ok(state.tracked(owner)?.current().cloned())
        })
        .await
    }

    async fn history(&self, owner: RowRef) -> TrackerResult<Vec<StoredState>> {
        self.unit_of_work("history", async {
            let state = self.state.read().await;
            Ok(state.tracked(owner)?.history.clone())
        })
        .await
    }

    async fn version(&self, owner: RowRef) -> TrackerResult<u64> {
        self.unit_of_work("version", async {
            let state = self.state.read().await;
            Ok(state.tracked(owner)?.version)
        })
        .await
    }

    async fn write_document(
        &self,
        row: RowRef,
        composition: &'static str,
        text: String,
    ) -> TrackerResult<()> {
        self.unit_of_work("write_document", async {
            let mut state = self.state.write().await;
            if row.table.is_history() {
                return Err(TrackerError::ImmutableRecord(row));
            }
            state.composition(row, composition)?;
            state.row_mut(row)?.documents.insert(composition, text);
            debug!(row = %row, composition, "document written");
            Ok(())
        })
        .await
    }

    async fn read_document(
        &self,
        row: RowRef,
        composition: &'static str,
    ) -> TrackerResult<Option<String>> {
        self.unit_of_work("read_document", async {
            let state = self.state.read().await;
            state.composition(row, composition)?;
            Ok(state.row(row)?.documents.get(composition).cloned())
        })
        .await
    }

    async fn write_type_column(
        &self,
        row: RowRef,
        column: &'static str,
        name: &'static str,
    ) -> TrackerResult<()> {
        self.unit_of_work("write_type_column", async {
            let mut state = self.state.write().await;
            state
                .row_mut(row)?
                .type_columns
                .insert(column, name.to_string());
            Ok(())
        })
        .await
    }

    async fn read_type_column(
        &self,
        row: RowRef,
        column: &'static str,
    ) -> TrackerResult<Option<String>> {
        self.unit_of_work("read_type_column", async {
            let state = self.state.read().await;
            Ok(state.row(row)?.type_columns.get(column).cloned())
        })
        .await
    }

    async fn counts(&self) -> TrackerResult<StoreCounts> {
        self.unit_of_work("counts", async {
            let state = self.state.read().await;
            Ok(state.counts())
        })
        .await
    }
}

impl InMemoryStateStore {
    /// Store a raw typed-enum column value, bypassing the registry.
    /// Simulates rows written by an older build.
    #[cfg(test)]
    pub(crate) async fn write_raw_type_column(&self, row: RowRef, column: &'static str, raw: &str) {
        let mut state = self.state.write().await;
        if let Some(data) = state.rows.get_mut(&row) {
            data.type_columns.insert(column, raw.to_string());
        }
    }

    /// Overwrite the stored step name of a history record (for testing decode failures).
    #[cfg(test)]
    pub(crate) async fn corrupt_step(&self, record: RowRef, raw: &str) {
        let mut state = self.state.write().await;
        let Some(&(owner, idx)) = state.history_index.get(&record) else {
            return;
        };
        if let Some(tracked) = state.rows.get_mut(&owner).and_then(|d| d.tracked.as_mut()) {
            tracked.history[idx].step = raw.to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::ErrorKind;
    use crate::domain::ids::StateId;
    use crate::domain::table::Table;
    use chrono::{TimeZone, Utc};
    use ulid::Ulid;

    fn row(table: Table) -> RowRef {
        RowRef::new(table, Ulid::new())
    }

    fn draft(step: &str, minute: u32) -> StateDraft {
        StateDraft {
            id: StateId::from_ulid(Ulid::new()),
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 9, minute, 0).unwrap(),
            step: step.to_string(),
            note: None,
            actor: Some("tester".to_string()),
        }
    }

    async fn store_with_order() -> (InMemoryStateStore, RowRef) {
        let store = InMemoryStateStore::standard();
        let order = row(Table::Order);
        store.insert_row(order, &[]).await.unwrap();
        (store, order)
    }

    #[tokio::test]
    async fn new_entity_has_no_state() {
        let (store, order) = store_with_order().await;
        assert_eq!(store.current_state(order).await.unwrap(), None);
        assert!(store.history(order).await.unwrap().is_empty());
        assert_eq!(store.version(order).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn append_moves_last_state_and_keeps_order() {
        let (store, order) = store_with_order().await;

        let first = store.append_state(order, 0, draft("Created", 0)).await.unwrap();
        let second = store.append_state(order, 1, draft("Confirmed", 5)).await.unwrap();

        assert_eq!(first.sequence, 1);
        assert_eq!(second.sequence, 2);
        assert_eq!(store.current_state(order).await.unwrap(), Some(second.clone()));
        assert_eq!(store.history(order).await.unwrap(), vec![first, second]);
        assert_eq!(store.version(order).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn stale_version_is_a_conflict() {
        let (store, order) = store_with_order().await;
        store.append_state(order, 0, draft("Created", 0)).await.unwrap();

        let err = store
            .append_state(order, 0, draft("Confirmed", 1))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TrackerError::Conflict { expected: 0, actual: 1, .. }
        ));
        assert_eq!(store.history(order).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn append_to_unknown_entity_is_not_found() {
        let store = InMemoryStateStore::standard();
        let err = store
            .append_state(row(Table::StockItem), 0, draft("Received", 0))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn append_to_untracked_row_is_not_found() {
        let store = InMemoryStateStore::standard();
        let product = row(Table::Product);
        store.insert_row(product, &[]).await.unwrap();
        let err = store
            .append_state(product, 0, draft("Created", 0))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn history_records_cannot_be_deleted_or_inserted_directly() {
        let (store, order) = store_with_order().await;
        let record = store.append_state(order, 0, draft("Created", 0)).await.unwrap();

        let err = store.delete_row(record.row).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ImmutableRecord);

        let err = store.insert_row(row(Table::OrderState), &[]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ImmutableRecord);

        assert!(store.row_exists(record.row).await.unwrap());
    }

    #[tokio::test]
    async fn history_records_reject_column_and_document_writes() {
        let (store, order) = store_with_order().await;
        let record = store.append_state(order, 0, draft("Created", 0)).await.unwrap();

        let err = store
            .write_type_column(record.row, "step", "Cancelled")
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::ImmutableRecord(r) if r == record.row));

        let err = store
            .write_document(record.row, "order.properties", "{}".to_string())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ImmutableRecord);

        assert_eq!(store.history(order).await.unwrap(), vec![record]);
        assert_eq!(store.counts().await.unwrap().documents, 0);
    }

    #[tokio::test]
    async fn store_reports_the_relationships_it_enforces() {
        let store = InMemoryStateStore::standard();
        assert_eq!(store.relationships().len(), RelationshipTable::standard().len());
    }

    #[tokio::test]
    async fn entity_with_history_cannot_be_deleted() {
        let (store, order) = store_with_order().await;
        store.append_state(order, 0, draft("Created", 0)).await.unwrap();

        let err = store.delete_row(order).await.unwrap_err();
        assert!(matches!(
            err,
            TrackerError::ReferentialIntegrity { relationship: "order_state.order", dependents: 1, .. }
        ));
        assert!(store.row_exists(order).await.unwrap());
        assert_eq!(store.history(order).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn restrict_keeps_both_rows() {
        let store = InMemoryStateStore::standard();
        let stock = row(Table::StockItem);
        let option = row(Table::StockItemOption);
        store.insert_row(stock, &[]).await.unwrap();
        store
            .insert_row(
                option,
                &[Link {
                    relationship: "stock_item_option.stock_item",
                    row: stock,
                }],
            )
            .await
            .unwrap();

        let err = store.delete_row(stock).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ReferentialIntegrity);
        assert!(store.row_exists(stock).await.unwrap());
        assert!(store.row_exists(option).await.unwrap());

        // deleting the dependent first releases the referenced row
        store.delete_row(option).await.unwrap();
        store.delete_row(stock).await.unwrap();
        assert!(!store.row_exists(stock).await.unwrap());
    }

    #[tokio::test]
    async fn insert_rejects_missing_or_mismatched_references() {
        let store = InMemoryStateStore::standard();
        let missing = row(Table::StockItem);
        let err = store
            .insert_row(
                row(Table::StockItemOption),
                &[Link {
                    relationship: "stock_item_option.stock_item",
                    row: missing,
                }],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::RowNotFound(r) if r == missing));

        let product = row(Table::Product);
        store.insert_row(product, &[]).await.unwrap();
        let err = store
            .insert_row(
                row(Table::StockItemOption),
                &[Link {
                    relationship: "stock_item_option.stock_item",
                    row: product,
                }],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::InvalidLink { .. }));
        assert_eq!(err.kind(), ErrorKind::InvalidLink);
        assert_ne!(err.kind(), ErrorKind::ReferentialIntegrity);
    }

    #[tokio::test]
    async fn duplicate_insert_is_rejected() {
        let (store, order) = store_with_order().await;
        let err = store.insert_row(order, &[]).await.unwrap_err();
        assert!(matches!(err, TrackerError::DuplicateRow(r) if r == order));
    }

    #[tokio::test]
    async fn documents_cascade_with_owner() {
        let (store, order) = store_with_order().await;
        store
            .write_document(order, "order.properties", "{\"priority\":1}".to_string())
            .await
            .unwrap();
        assert_eq!(
            store.read_document(order, "order.properties").await.unwrap().as_deref(),
            Some("{\"priority\":1}")
        );
        assert_eq!(store.counts().await.unwrap().documents, 1);

        store.delete_row(order).await.unwrap();
        assert_eq!(store.counts().await.unwrap().documents, 0);
        let err = store.read_document(order, "order.properties").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn documents_require_a_composition_of_the_row_table() {
        let (store, order) = store_with_order().await;
        let err = store
            .write_document(order, "permission_group.permissions", "{}".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::InvalidLink { .. }));
        let err = store
            .write_document(order, "order_state.order", "{}".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::InvalidLink { .. }));
    }

    #[tokio::test]
    async fn waiting_for_the_lock_times_out_without_partial_writes() {
        let store = InMemoryStateStore::new(
            Arc::new(RelationshipTable::standard()),
            Duration::from_millis(20),
        );
        let order = row(Table::Order);
        store.insert_row(order, &[]).await.unwrap();

        let guard = store.state.write().await;
        let err = store
            .append_state(order, 0, draft("Created", 0))
            .await
            .unwrap_err();
        drop(guard);

        assert!(matches!(err, TrackerError::Timeout { operation: "append_state", .. }));
        assert!(err.is_retryable());
        assert!(store.history(order).await.unwrap().is_empty());
        assert_eq!(store.version(order).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn counts_cover_rows_and_history() {
        let (store, order) = store_with_order().await;
        store.append_state(order, 0, draft("Created", 0)).await.unwrap();
        store.insert_row(row(Table::StockItem), &[]).await.unwrap();

        let counts = store.counts().await.unwrap();
        assert_eq!(counts.tracked_entities, 2);
        assert_eq!(counts.state_records, 1);
        assert_eq!(counts.with_last_state, 1);
        assert_eq!(counts.rows.get("OrderState"), Some(&1));
        assert_eq!(counts.rows.get("Order"), Some(&1));
    }
}
