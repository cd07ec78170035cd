//! Typed - 型付き enum 列と PropertyBag 列
//!
//! 永続化される閉じた enum（型ファミリー）と、行に埋め込まれる
//! 構造化ドキュメントを型で扱うためのモジュールです。
//!
//! # 二層構造
//! - **表層（Typed）**: `TypeVariant` trait, `PropertyBag` trait - 型安全
//! - **内部（名前）**: 表示名の文字列。`TypeRegistry` が相互変換を担う

pub mod codec;
pub mod registry;
pub mod variant;

// 主要な trait/型 を再エクスポート
pub use self::codec::{PropertyBag, PropertyCodec};
pub use self::registry::{RegistryError, TypeRegistry, TypeRegistryBuilder};
pub use self::variant::TypeVariant;
