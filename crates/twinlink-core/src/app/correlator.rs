//! Correlator - コマンドと応答の対応付け
//!
//! # フロー
//! 1. `submit()` で入力を検証し、生きているトークンと重複しない CorrelationId を発行
//! 2. PendingRequest をテーブルに挿入（= Pending 状態に入る）
//! 3. タイムアウト用タイマーを起動し、transport への送信を spawn（呼び出し側は待たない）
//! 4. 応答 / タイムアウト / キャンセル / 送信失敗 / shutdown のいずれか最初の一つが
//!    エントリを remove して completion を書き込む
//!
//! # 排他制御
//! - テーブルは DashMap。終端遷移は `remove()` で、勝つのは常に一つだけ
//! - 負けた側はエントリが見つからないので何もしない（no-op）
//! - completion は oneshot なので、書き込みは待たない

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info, warn};

use super::config::{CallOptions, CorrelatorConfig};
use super::handle::ResponseHandle;
use super::stats::{CorrelatorStats, StatsSnapshot};
use crate::domain::{
    CommandEnvelope, CorrelationError, CorrelationId, OperationKind, RequestState,
    ResponseEnvelope, ResponseOutcome, ValidationError,
};
use crate::ports::{Clock, IdGenerator, ResponseSink, Transport};

pub(crate) type Completion = oneshot::Sender<Result<(), CorrelationError>>;

/// One outstanding command. Owned by the pending table for its whole life.
struct PendingRequest {
    operation: OperationKind,
    created_at: DateTime<Utc>,
    timeout: Duration,
    timeout_at: Option<DateTime<Utc>>,
    completion: Completion,
    timer: Option<AbortHandle>,
}

pub(crate) struct Shared {
    pending: DashMap<CorrelationId, PendingRequest>,
    config: CorrelatorConfig,
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    stats: CorrelatorStats,
    closed: AtomicBool,
    shutdown_tx: watch::Sender<bool>,
}

impl Shared {
    /// Remove the entry and write its completion. Returns false if another
    /// resolver already won.
    fn resolve(&self, id: CorrelationId, result: Result<(), CorrelationError>) -> bool {
        let Some((_, pending)) = self.pending.remove(&id) else {
            return false;
        };
        self.finish(id, pending, result);
        true
    }

    fn finish(
        &self,
        id: CorrelationId,
        pending: PendingRequest,
        result: Result<(), CorrelationError>,
    ) {
        if let Some(timer) = pending.timer {
            timer.abort();
        }

        let state = RequestState::from_result(&result);
        self.stats.record(state);

        let elapsed_ms = (self.clock.now() - pending.created_at).num_milliseconds();
        debug!(
            correlation_id = %id,
            operation = %pending.operation,
            state = ?state,
            elapsed_ms,
            "Resolved pending request"
        );

        // the handle may already be gone; nothing to deliver then
        let _ = pending.completion.send(result);
    }

    pub(crate) fn cancel(&self, id: CorrelationId) -> bool {
        let cancelled = self.resolve(id, Err(CorrelationError::Cancelled));
        if cancelled {
            debug!(correlation_id = %id, "Cancelled pending request");
        }
        cancelled
    }

    fn on_timeout(&self, id: CorrelationId) -> bool {
        let Some((_, pending)) = self.pending.remove(&id) else {
            return false;
        };
        warn!(
            correlation_id = %id,
            operation = %pending.operation,
            timeout_ms = pending.timeout.as_millis() as u64,
            timeout_at = ?pending.timeout_at,
            "No response before deadline"
        );
        let after = pending.timeout;
        self.finish(id, pending, Err(CorrelationError::Timeout { after }));
        true
    }

    fn on_response(&self, response: ResponseEnvelope) -> bool {
        let id = response.correlation_id;
        let result = match response.outcome {
            ResponseOutcome::Acknowledged => Ok(()),
            ResponseOutcome::Failed(reason) => Err(CorrelationError::Remote { reason }),
        };
        if self.resolve(id, result) {
            return true;
        }
        self.stats.record_dropped_response();
        warn!(correlation_id = %id, "Response for unknown or expired correlation id");
        false
    }
}

/// Turns fire-and-forget commands into single-resolution handles.
///
/// Cloning is cheap; all clones share one pending table.
///
/// `submit` spawns tasks, so it must be called from within a Tokio runtime.
#[derive(Clone)]
pub struct Correlator {
    shared: Arc<Shared>,
}

impl Correlator {
    pub(crate) fn from_parts(
        transport: Arc<dyn Transport>,
        config: CorrelatorConfig,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            shared: Arc::new(Shared {
                pending: DashMap::new(),
                config,
                transport,
                clock,
                ids,
                stats: CorrelatorStats::default(),
                closed: AtomicBool::new(false),
                shutdown_tx,
            }),
        }
    }

    pub fn config(&self) -> &CorrelatorConfig {
        &self.shared.config
    }

    /// Submit a command and get a handle for its outcome.
    ///
    /// Input errors are returned here, before any token exists. Every failure
    /// after that travels through the handle.
    pub fn submit(
        &self,
        operation: OperationKind,
        payload: serde_json::Value,
        options: CallOptions,
    ) -> Result<ResponseHandle, CorrelationError> {
        if payload.is_null() {
            return Err(ValidationError::MissingPayload.into());
        }
        let (timeout, response_required) = options.resolve(&self.shared.config)?;
        if self.shared.closed.load(Ordering::Acquire) {
            return Err(CorrelationError::Closed);
        }

        let (tx, rx) = oneshot::channel();
        let created_at = self.shared.clock.now();
        let timeout_at = chrono::Duration::from_std(timeout)
            .ok()
            .and_then(|d| created_at.checked_add_signed(d));

        // 生きているトークンとは絶対に重複させない
        let id = loop {
            let candidate = self.shared.ids.generate();
            match self.shared.pending.entry(candidate) {
                Entry::Occupied(_) => {
                    warn!(correlation_id = %candidate, "Correlation id collision, regenerating");
                }
                Entry::Vacant(slot) => {
                    slot.insert(PendingRequest {
                        operation,
                        created_at,
                        timeout,
                        timeout_at,
                        completion: tx,
                        timer: None,
                    });
                    break candidate;
                }
            }
        };
        self.shared.stats.record_registered();
        debug!(
            correlation_id = %id,
            operation = %operation,
            timeout_ms = timeout.as_millis() as u64,
            response_required,
            "Registered pending request"
        );

        let handle = ResponseHandle::new(id, operation, rx, Arc::downgrade(&self.shared));

        // shutdown が key を集め終わった後に挿入した場合は自分で閉じる
        if self.shared.closed.load(Ordering::SeqCst) {
            self.shared.resolve(id, Err(CorrelationError::Closed));
            return Ok(handle);
        }

        self.arm_timer(id, timeout);
        self.dispatch(CommandEnvelope::new(id, operation, payload, response_required));

        Ok(handle)
    }

    fn arm_timer(&self, id: CorrelationId, timeout: Duration) {
        let shared = Arc::downgrade(&self.shared);
        let timer = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(shared) = shared.upgrade() {
                shared.on_timeout(id);
            }
        })
        .abort_handle();

        match self.shared.pending.get_mut(&id) {
            Some(mut entry) => entry.timer = Some(timer),
            // already resolved (fast response or dispatch failure)
            None => timer.abort(),
        }
    }

    fn dispatch(&self, command: CommandEnvelope) {
        let shared = Arc::downgrade(&self.shared);
        let transport = Arc::clone(&self.shared.transport);
        tokio::spawn(async move {
            let id = command.correlation_id();
            let response_required = command.response_required();
            let sent = transport.send(command).await;

            let Some(shared) = shared.upgrade() else {
                return;
            };
            match sent {
                Err(err) => {
                    warn!(correlation_id = %id, error = %err, "Dispatch failed");
                    shared.resolve(id, Err(CorrelationError::Dispatch(err)));
                }
                Ok(()) if !response_required => {
                    shared.resolve(id, Ok(()));
                }
                Ok(()) => {}
            }
        });
    }

    /// Resolve the matching pending request. Unknown tokens are dropped and
    /// `false` is returned.
    pub fn on_response(&self, response: ResponseEnvelope) -> bool {
        self.shared.on_response(response)
    }

    /// Fail the request with a timeout now, as if its deadline had elapsed.
    pub fn on_timeout(&self, id: CorrelationId) -> bool {
        self.shared.on_timeout(id)
    }

    /// Fail the request with [`CorrelationError::Cancelled`].
    pub fn cancel(&self, id: CorrelationId) -> bool {
        self.shared.cancel(id)
    }

    /// Drive [`on_response`](Self::on_response) from a response stream until it
    /// ends or the correlator shuts down.
    pub fn listen(
        &self,
        mut responses: mpsc::UnboundedReceiver<ResponseEnvelope>,
    ) -> JoinHandle<()> {
        let shared = Arc::downgrade(&self.shared);
        let mut shutdown_rx = self.shared.shutdown_tx.subscribe();
        tokio::spawn(async move {
            loop {
                if *shutdown_rx.borrow() {
                    break;
                }
                let response = tokio::select! {
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        continue;
                    }
                    response = responses.recv() => response,
                };
                let Some(response) = response else {
                    debug!("Response stream ended");
                    break;
                };
                let Some(shared) = shared.upgrade() else {
                    break;
                };
                shared.on_response(response);
            }
        })
    }

    /// Stop accepting commands and fail everything still pending with
    /// [`CorrelationError::Closed`].
    pub fn shutdown(&self) -> usize {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return 0;
        }
        let _ = self.shared.shutdown_tx.send(true);

        // iter のガードを持ったまま remove しない
        let ids: Vec<CorrelationId> = self.shared.pending.iter().map(|e| *e.key()).collect();
        let mut failed = 0;
        for id in ids {
            if self.shared.resolve(id, Err(CorrelationError::Closed)) {
                failed += 1;
            }
        }
        info!(failed, "Correlator shut down");
        failed
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    pub fn is_pending(&self, id: CorrelationId) -> bool {
        self.shared.pending.contains_key(&id)
    }

    pub fn pending_count(&self) -> usize {
        self.shared.pending.len()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot(self.pending_count())
    }

    #[cfg(test)]
    pub(crate) fn downgrade(&self) -> std::sync::Weak<Shared> {
        Arc::downgrade(&self.shared)
    }
}

impl ResponseSink for Correlator {
    fn on_message(&self, response: ResponseEnvelope) {
        self.on_response(response);
    }
}
