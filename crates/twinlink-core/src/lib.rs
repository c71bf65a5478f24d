//! twinlink-core
//!
//! Request correlation for digital-twin management commands.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（CorrelationId, envelopes, FeatureDefinition, state, errors）
//! - **ports**: 抽象化レイヤー（Transport, ResponseSink, Clock, IdGenerator）
//! - **app**: Correlator, ResponseHandle, config / retry, FeatureDefinitionClient
//! - **impls**: 実装（ChannelTransport, LoopbackTransport など開発用）

pub mod app;
pub mod domain;
pub mod impls;
pub mod ports;
