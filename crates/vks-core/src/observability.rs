//! Observability - 件数ビュー
//!
//! CLI の demo と運用時の確認用。StateStore::counts が返します。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreCounts {
    /// Rows per table name, history rows included.
    pub rows: BTreeMap<String, usize>,
    pub tracked_entities: usize,
    pub state_records: usize,
    /// Tracked entities whose LastState pointer is set.
    pub with_last_state: usize,
    pub documents: usize,
}
