//! vks-core
//!
//! Persistence-consistency core of the order/production tracking system.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, variants, table, state, properties, errors）
//! - **typed**: 型付き enum 列と PropertyBag 列（TypeVariant, TypeRegistry, PropertyCodec）
//! - **graph**: relationship ポリシーと行参照グラフ（restrict / cascade）
//! - **ports**: 抽象化レイヤー（StateStore, Clock, IdGenerator）
//! - **impls**: 実装（InMemoryStateStore）
//! - **app**: アプリケーション層（TrackerConfig, TrackerBuilder, Tracker）
//! - **observability**: 件数ビュー

pub mod app;
pub mod domain;
pub mod graph;
pub mod impls;
pub mod observability;
pub mod ports;
pub mod typed;

pub use app::{Tracker, TrackerBuilder, TrackerConfig};
pub use domain::{ErrorKind, TrackerError, TrackerResult};
pub use typed::{TypeRegistry, TypeVariant};
