//! TypeRegistry - 型ファミリーの登録と名前解決
//!
//! # 学習ポイント
//! - Builder で一度だけ構築し、以後は不変（`Arc<TypeRegistry>` で共有）
//! - グローバル変数を使わず、呼び出し側へ明示的に渡す
//! - 型付き lookup（`lookup_by_name::<F>`）と動的 lookup（`lookup(family, name)`）

use std::collections::{HashMap, HashSet};

use super::variant::TypeVariant;
use crate::domain::errors::{TrackerError, TrackerResult};
use crate::domain::table::Table;
use crate::domain::variants::{
    AmountUnitType, ControlType, OrderStepType, OrderType, ProductCategoryType, ProductFileType,
    StockItemStepType, StorageType,
};

/// TypeRegistry は起動時に構築される不変の名前表
///
/// # 使用例
/// ```ignore
/// let registry = TypeRegistry::builder()
///     .register::<OrderType>()?
///     .register::<OrderStepType>()?
///     .build();
///
/// let express: OrderType = registry.lookup_by_name("Express")?;
/// assert_eq!(registry.name_of(express), "Express");
/// ```
///
/// # 内部実装
/// - ファミリー名 → 宣言順の表示名リスト
/// - 構築後に変更するメソッドはない（読み取りはロック不要）
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    families: HashMap<&'static str, Vec<&'static str>>,
    order: Vec<&'static str>,
}

/// RegistryError は TypeRegistry の構築エラー
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("type family '{0}' is already registered")]
    AlreadyRegistered(&'static str),

    #[error("type family '{family}' declares '{name}' more than once")]
    DuplicateName {
        family: &'static str,
        name: &'static str,
    },
}

/// TypeRegistryBuilder は起動時にだけ使う
#[derive(Debug, Default)]
pub struct TypeRegistryBuilder {
    families: HashMap<&'static str, Vec<&'static str>>,
    order: Vec<&'static str>,
}

impl TypeRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F: TypeVariant>(mut self) -> Result<Self, RegistryError> {
        if self.families.contains_key(F::FAMILY) {
            return Err(RegistryError::AlreadyRegistered(F::FAMILY));
        }
        let names = F::names();
        let mut seen = HashSet::new();
        for name in &names {
            if !seen.insert(*name) {
                return Err(RegistryError::DuplicateName {
                    family: F::FAMILY,
                    name: *name,
                });
            }
        }
        self.families.insert(F::FAMILY, names);
        self.order.push(F::FAMILY);
        Ok(self)
    }

    pub fn build(self) -> TypeRegistry {
        TypeRegistry {
            families: self.families,
            order: self.order,
        }
    }
}

impl TypeRegistry {
    pub fn builder() -> TypeRegistryBuilder {
        TypeRegistryBuilder::new()
    }

    /// Registry with every family the order tracking core persists.
    pub fn standard() -> Result<Self, RegistryError> {
        Ok(Self::builder()
            .register::<OrderType>()?
            .register::<OrderStepType>()?
            .register::<ProductCategoryType>()?
            .register::<AmountUnitType>()?
            .register::<ControlType>()?
            .register::<StorageType>()?
            .register::<StockItemStepType>()?
            .register::<ProductFileType>()?
            .register::<Table>()?
            .build())
    }

    /// Resolve a stored name to its variant.
    ///
    /// An unknown name is a data-integrity problem and is returned as
    /// `NotFound`; there is no fallback variant.
    pub fn lookup_by_name<F: TypeVariant>(&self, name: &str) -> TrackerResult<F> {
        if !self.families.contains_key(F::FAMILY) {
            return Err(TrackerError::UnknownFamily(F::FAMILY.to_string()));
        }
        F::from_name(name).ok_or_else(|| TrackerError::unknown_variant(F::FAMILY, name))
    }

    /// Dynamic lookup for callers that only know the family name.
    pub fn lookup(&self, family: &str, name: &str) -> TrackerResult<&'static str> {
        let names = self
            .families
            .get(family)
            .ok_or_else(|| TrackerError::UnknownFamily(family.to_string()))?;
        names
            .iter()
            .copied()
            .find(|candidate| *candidate == name)
            .ok_or_else(|| TrackerError::unknown_variant(family, name))
    }

    pub fn name_of<F: TypeVariant>(&self, variant: F) -> &'static str {
        variant.name()
    }

    pub fn contains_family(&self, family: &str) -> bool {
        self.families.contains_key(family)
    }

    /// Family names in registration order.
    pub fn families(&self) -> &[&'static str] {
        &self.order
    }

    pub fn names(&self, family: &str) -> TrackerResult<&[&'static str]> {
        self.families
            .get(family)
            .map(Vec::as_slice)
            .ok_or_else(|| TrackerError::UnknownFamily(family.to_string()))
    }
}
