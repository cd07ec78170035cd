//! PropertyCodec - PropertyBag と JSON テキストの相互変換
//!
//! # デシリアライズフロー
//! 1. 列が NULL / 空文字 / 空白のみ / `null` → `Default::default()`
//! 2. それ以外は serde_json で T にデシリアライズ
//! 3. 失敗時は `MalformedDocument`（デフォルト値にはフォールバックしない）
//!
//! フィールド名は宣言どおりに書き出します（命名ポリシーでの書き換えなし）。

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::domain::errors::{TrackerError, TrackerResult};

/// PropertyBag は所有者の行に埋め込まれる構造化ドキュメント
///
/// # Trait Bounds
/// - `Default`: 空の列を読んだときの値
/// - `Serialize + DeserializeOwned`: JSON 列との変換のため
pub trait PropertyBag: Serialize + DeserializeOwned + Default + Send + Sync + 'static {}

/// PropertyCodec は PropertyBag を JSON テキストに変換する
#[derive(Debug, Clone, Copy, Default)]
pub struct PropertyCodec;

impl PropertyCodec {
    pub fn new() -> Self {
        Self
    }

    pub fn encode<B: PropertyBag>(&self, bag: &B) -> TrackerResult<String> {
        serde_json::to_string(bag).map_err(TrackerError::MalformedDocument)
    }

    /// Decode a stored column. Absent input yields the default document.
    pub fn decode<B: PropertyBag>(&self, text: Option<&str>) -> TrackerResult<B> {
        let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
            return Ok(B::default());
        };
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(TrackerError::MalformedDocument)?;
        if value.is_null() {
            return Ok(B::default());
        }
        serde_json::from_value(value).map_err(TrackerError::MalformedDocument)
    }
}
