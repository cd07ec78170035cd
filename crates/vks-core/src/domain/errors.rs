//! Errors - エラー型と分類
//!
//! すべての操作エラーは `ErrorKind` に分類され、問題の識別子（行・名前）を持ちます。
//! この層は内部でリトライしません。`Conflict` と `Timeout` だけが呼び出し側での
//! リトライ対象です。

use std::time::Duration;

use thiserror::Error;

use super::table::RowRef;

/// ErrorKind は操作エラーの分類
///
/// # 分類
/// - NotFound: 未知の variant 名・ファミリー・行
/// - ReferentialIntegrity: restrict ポリシーにより削除が拒否された
/// - InvalidLink: relationship 名やテーブルの組み合わせが誤っている（呼び出し側のバグ）
/// - Conflict: 同一エンティティへの並行 append に負けた（リトライ推奨）
/// - ImmutableRecord: 履歴レコードの変更が試みられた
/// - MalformedDocument: PropertyBag のデコード失敗
/// - Timeout: unit of work が期限を超えた（部分的な書き込みはない）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    ReferentialIntegrity,
    InvalidLink,
    Conflict,
    ImmutableRecord,
    MalformedDocument,
    Timeout,
}

/// TrackerError は永続化コアのドメインエラー
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("unknown {family} variant '{name}'")]
    UnknownVariant { family: String, name: String },

    #[error("type family '{0}' is not registered")]
    UnknownFamily(String),

    #[error("row not found: {0}")]
    RowNotFound(RowRef),

    #[error("row already exists: {0}")]
    DuplicateRow(RowRef),

    #[error("cannot delete {row}: {dependents} dependent row(s) via restrict relationship '{relationship}'")]
    ReferentialIntegrity {
        row: RowRef,
        relationship: &'static str,
        dependents: usize,
    },

    #[error("concurrent update of {row}: expected version {expected}, found {actual}")]
    Conflict {
        row: RowRef,
        expected: u64,
        actual: u64,
    },

    #[error("state record {0} is immutable")]
    ImmutableRecord(RowRef),

    #[error("malformed document: {0}")]
    MalformedDocument(#[source] serde_json::Error),

    #[error("{operation} did not complete within {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// A relationship name is unknown, or was used with rows of the wrong tables.
    #[error("relationship '{relationship}' cannot link {dependent} to {referenced}")]
    InvalidLink {
        relationship: &'static str,
        dependent: RowRef,
        referenced: RowRef,
    },
}

impl TrackerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TrackerError::UnknownVariant { .. }
            | TrackerError::UnknownFamily(_)
            | TrackerError::RowNotFound(_) => ErrorKind::NotFound,
            TrackerError::ReferentialIntegrity { .. } => ErrorKind::ReferentialIntegrity,
            TrackerError::InvalidLink { .. } => ErrorKind::InvalidLink,
            TrackerError::Conflict { .. } | TrackerError::DuplicateRow(_) => ErrorKind::Conflict,
            TrackerError::ImmutableRecord(_) => ErrorKind::ImmutableRecord,
            TrackerError::MalformedDocument(_) => ErrorKind::MalformedDocument,
            TrackerError::Timeout { .. } => ErrorKind::Timeout,
        }
    }

    /// Whether the caller may retry the whole operation.
    ///
    /// A duplicate row id is a `Conflict` too, but retrying it with the same
    /// id cannot succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TrackerError::Conflict { .. } | TrackerError::Timeout { .. }
        )
    }

    pub(crate) fn unknown_variant(family: &str, name: &str) -> Self {
        TrackerError::UnknownVariant {
            family: family.to_string(),
            name: name.to_string(),
        }
    }
}

pub type TrackerResult<T> = Result<T, TrackerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::table::Table;
    use rstest::rstest;
    use ulid::Ulid;

    fn row() -> RowRef {
        RowRef::new(Table::Order, Ulid::new())
    }

    #[rstest]
    #[case::unknown_variant(TrackerError::unknown_variant("OrderType", "Priority"), ErrorKind::NotFound, false)]
    #[case::row_missing(TrackerError::RowNotFound(row()), ErrorKind::NotFound, false)]
    #[case::restricted(
        TrackerError::ReferentialIntegrity { row: row(), relationship: "order_state.order", dependents: 1 },
        ErrorKind::ReferentialIntegrity,
        false
    )]
    #[case::invalid_link(
        TrackerError::InvalidLink { relationship: "order.properties", dependent: row(), referenced: row() },
        ErrorKind::InvalidLink,
        false
    )]
    #[case::conflict(TrackerError::Conflict { row: row(), expected: 1, actual: 2 }, ErrorKind::Conflict, true)]
    #[case::immutable(TrackerError::ImmutableRecord(row()), ErrorKind::ImmutableRecord, false)]
    #[case::timeout(
        TrackerError::Timeout { operation: "append_state", after: Duration::from_millis(10) },
        ErrorKind::Timeout,
        true
    )]
    fn errors_are_classified(
        #[case] err: TrackerError,
        #[case] kind: ErrorKind,
        #[case] retryable: bool,
    ) {
        assert_eq!(err.kind(), kind);
        assert_eq!(err.is_retryable(), retryable);
    }

    #[test]
    fn message_carries_offending_name() {
        let err = TrackerError::unknown_variant("OrderType", "Priority");
        assert_eq!(err.to_string(), "unknown OrderType variant 'Priority'");
    }

    #[test]
    fn conflict_message_carries_versions() {
        let row = row();
        let err = TrackerError::Conflict {
            row,
            expected: 3,
            actual: 4,
        };
        let msg = err.to_string();
        assert!(msg.contains(&row.to_string()));
        assert!(msg.contains("expected version 3"));
        assert!(msg.contains("found 4"));
    }
}
