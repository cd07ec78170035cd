//! App - アプリケーション層
//!
//! このモジュールは、ports を組み合わせてアプリケーションロジックを実装します。
//!
//! # 主要コンポーネント
//! - **TrackerConfig**: `vks.toml` の読み込みと検証
//! - **TrackerBuilder**: Tracker の構築とワイヤリング
//! - **Tracker**: 状態履歴・型付き列・PropertyBag 列の型付きファサード

pub mod builder;
pub mod config;
pub mod tracker;

// 主要な型を再エクスポート
pub use self::builder::{BuildError, TrackerBuilder};
pub use self::config::{ConfigError, LoggingConfig, TrackerConfig};
pub use self::tracker::{ORDER_ITEM_ORDER, ORDER_PROPERTIES, Tracker};
