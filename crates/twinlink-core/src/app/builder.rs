//! CorrelatorBuilder - Correlator の構築とワイヤリング
//!
//! # Fail-fast 設計
//! - transport 未設定や不正な config は build() 時に BuildError として返す
//! - 実行中に初めて気づく、という状況を作らない

use std::sync::Arc;

use super::config::CorrelatorConfig;
use super::correlator::Correlator;
use crate::domain::ValidationError;
use crate::ports::{Clock, IdGenerator, SystemClock, Transport, UlidGenerator};

/// # 使用例
/// ```ignore
/// let correlator = CorrelatorBuilder::new()
///     .transport(Arc::new(transport))
///     .config(config)
///     .build()?;
/// ```
pub struct CorrelatorBuilder {
    transport: Option<Arc<dyn Transport>>,
    config: CorrelatorConfig,
    clock: Arc<dyn Clock>,
    ids: Option<Arc<dyn IdGenerator>>,
}

/// BuildError は構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("no transport configured")]
    MissingTransport,

    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ValidationError),
}

impl CorrelatorBuilder {
    pub fn new() -> Self {
        Self {
            transport: None,
            config: CorrelatorConfig::default(),
            clock: Arc::new(SystemClock),
            ids: None,
        }
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn config(mut self, config: CorrelatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Used for request timestamps and, unless an id generator is set, for
    /// the timestamp part of the tokens.
    pub fn clock<C: Clock + 'static>(mut self, clock: C) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn id_generator<G: IdGenerator + 'static>(mut self, ids: G) -> Self {
        self.ids = Some(Arc::new(ids));
        self
    }

    pub fn build(self) -> Result<Correlator, BuildError> {
        let transport = self.transport.ok_or(BuildError::MissingTransport)?;
        self.config.validate()?;
        let clock = Arc::clone(&self.clock);
        let ids: Arc<dyn IdGenerator> = match self.ids {
            Some(ids) => ids,
            None => Arc::new(UlidGenerator::new(clock)),
        };
        Ok(Correlator::from_parts(transport, self.config, self.clock, ids))
    }
}

impl Default for CorrelatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
