//! StateStore port - 行・履歴・埋め込みドキュメントの正本（source of truth）
//!
//! StateStore は以下を管理します：
//! - 行と relationship 列（restrict ポリシーの delete 事前チェック込み）
//! - 追跡エンティティの履歴と LastState ポインタ
//! - 型付き enum 列と PropertyBag 列（どちらもテキスト）
//!
//! # 実装
//! - InMemoryStateStore（開発用・テスト用）

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::errors::TrackerResult;
use crate::domain::state::{StateDraft, StoredState};
use crate::domain::table::RowRef;
use crate::graph::{Link, RelationshipTable};
use crate::observability::StoreCounts;

/// StateStore は 1 操作 = 1 unit of work で動く
///
/// # 設計原則
/// - 履歴の append と LastState の更新は同一 unit of work 内でコミットされる
/// - append は楽観的バージョニング：`expected_version` が古ければ `Conflict`
/// - 内部リトライはしない（リトライは呼び出し側の判断）
/// - 履歴行の更新・削除・列の書き込みはできない（`ImmutableRecord`）
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Relationship table the delete pre-check consults.
    fn relationships(&self) -> Arc<RelationshipTable>;

    /// Insert a row together with its relationship columns.
    ///
    /// Tracked tables start with an empty history at version 0. Every
    /// referenced row must exist.
    async fn insert_row(&self, row: RowRef, links: &[Link]) -> TrackerResult<()>;

    /// Delete a row after the restrict pre-check. Embedded documents and
    /// typed-enum columns go with it.
    async fn delete_row(&self, row: RowRef) -> TrackerResult<()>;

    async fn row_exists(&self, row: RowRef) -> TrackerResult<bool>;

    async fn dependents_of(&self, row: RowRef) -> TrackerResult<Vec<Link>>;

    /// Append one state record and move the LastState pointer to it.
    async fn append_state(
        &self,
        owner: RowRef,
        expected_version: u64,
        draft: StateDraft,
    ) -> TrackerResult<StoredState>;

    async fn current_state(&self, owner: RowRef) -> TrackerResult<Option<StoredState>>;

    /// Full history in append order.
    async fn history(&self, owner: RowRef) -> TrackerResult<Vec<StoredState>>;

    /// Version the next append must name.
    async fn version(&self, owner: RowRef) -> TrackerResult<u64>;

    /// Replace the embedded document of `row` held by `composition`.
    async fn write_document(
        &self,
        row: RowRef,
        composition: &'static str,
        text: String,
    ) -> TrackerResult<()>;

    async fn read_document(
        &self,
        row: RowRef,
        composition: &'static str,
    ) -> TrackerResult<Option<String>>;

    /// Store a variant's display name in a typed-enum column.
    async fn write_type_column(
        &self,
        row: RowRef,
        column: &'static str,
        name: &'static str,
    ) -> TrackerResult<()>;

    async fn read_type_column(&self, row: RowRef, column: &'static str)
    -> TrackerResult<Option<String>>;

    async fn counts(&self) -> TrackerResult<StoreCounts>;
}
