//! Impls - 実装（開発用・テスト用）
//!
//! このモジュールには ports の実装を含めます。
//!
//! # 含まれる実装
//! - **InMemoryStateStore**: 開発用・テスト用の StateStore
//!
//! # 本番用実装
//! トランザクションを持つ RDB 向けの実装は別クレートに配置します。

pub mod inmem_store;

pub use self::inmem_store::{DEFAULT_UNIT_OF_WORK_TIMEOUT, InMemoryStateStore};
