//! TrackerBuilder - Tracker の構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//! - 省略されたポートにはデフォルト実装を入れる

use std::sync::Arc;

use tracing::info;

use super::config::{ConfigError, TrackerConfig};
use super::tracker::Tracker;
use crate::graph::RelationshipTable;
use crate::impls::InMemoryStateStore;
use crate::ports::{Clock, IdGenerator, StateStore, SystemClock, UlidGenerator};
use crate::typed::{RegistryError, TypeRegistry};

/// TrackerBuilder は Tracker を構築
///
/// # 使用例
/// ```ignore
/// let tracker = TrackerBuilder::new()
///     .config(TrackerConfig::load("vks.toml")?)
///     .expect_families(&["OrderType", "OrderStepType"])
///     .build()?;
/// ```
///
/// # Fail-fast 設計
/// - expect_families() で必要な型ファミリーを宣言
/// - build() 時に「期待集合 ⊆ 登録済み集合」をチェック
/// - 不足があれば BuildError を返す
pub struct TrackerBuilder {
    registry: Option<TypeRegistry>,
    policies: Option<RelationshipTable>,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
    store: Option<Arc<dyn StateStore>>,
    config: TrackerConfig,
    expected_families: Option<Vec<String>>,
}

/// BuildError は Tracker 構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing type families: {0:?}. These families were expected but not registered.")]
    MissingFamilies(Vec<String>),

    #[error("a relationship table cannot be set together with an existing store; the store enforces its own")]
    RelationshipsWithStore,

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl TrackerBuilder {
    pub fn new() -> Self {
        Self {
            registry: None,
            policies: None,
            clock: None,
            ids: None,
            store: None,
            config: TrackerConfig::default(),
            expected_families: None,
        }
    }

    /// Use `registry` instead of [`TypeRegistry::standard`].
    pub fn registry(mut self, registry: TypeRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn relationships(mut self, policies: RelationshipTable) -> Self {
        self.policies = Some(policies);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// Use an existing store. Without one, an [`InMemoryStateStore`] is
    /// created with the configured timeout.
    ///
    /// The tracker then reports the store's relationship table.
    pub fn store(mut self, store: Arc<dyn StateStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config(mut self, config: TrackerConfig) -> Self {
        self.config = config;
        self
    }

    /// 期待される型ファミリーのリストを設定
    pub fn expect_families(mut self, families: &[&str]) -> Self {
        self.expected_families = Some(families.iter().map(|f| f.to_string()).collect());
        self
    }

    /// # 検証
    /// - 設定値の検証（ConfigError）
    /// - expect_families() のファミリーが全て登録されているか
    pub fn build(self) -> Result<Tracker, BuildError> {
        self.config.validate()?;

        let registry = match self.registry {
            Some(registry) => registry,
            None => TypeRegistry::standard()?,
        };
        if let Some(expected) = &self.expected_families {
            let missing: Vec<String> = expected
                .iter()
                .filter(|family| !registry.contains_family(family))
                .cloned()
                .collect();
            if !missing.is_empty() {
                return Err(BuildError::MissingFamilies(missing));
            }
        }

        let (policies, store) = match (self.store, self.policies) {
            (Some(_), Some(_)) => return Err(BuildError::RelationshipsWithStore),
            (Some(store), None) => (store.relationships(), store),
            (None, policies) => {
                let policies = Arc::new(policies.unwrap_or_default());
                let store: Arc<dyn StateStore> = Arc::new(InMemoryStateStore::new(
                    policies.clone(),
                    self.config.unit_of_work_timeout(),
                ));
                (policies, store)
            }
        };
        let clock: Arc<dyn Clock> = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let ids: Arc<dyn IdGenerator> = self
            .ids
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(clock.clone())));

        info!(
            families = registry.families().len(),
            relationships = policies.len(),
            "tracker built"
        );
        Ok(Tracker::new(
            Arc::new(registry),
            policies,
            store,
            clock,
            ids,
        ))
    }
}

impl Default for TrackerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
