//! ResponseHandle - 呼び出し側に返す単一解決の非同期ハンドル

use std::future::Future;
use std::pin::Pin;
use std::sync::Weak;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use super::correlator::Shared;
use crate::domain::{CorrelationError, CorrelationId, OperationKind};

/// Caller-facing result of a submitted command.
///
/// Resolves exactly once to `Ok(())` or a [`CorrelationError`]. Can be awaited
/// from any task. Dropping an unresolved handle cancels the request so its
/// table entry is released right away.
#[must_use = "dropping a ResponseHandle cancels the request"]
pub struct ResponseHandle {
    id: CorrelationId,
    operation: OperationKind,
    rx: oneshot::Receiver<Result<(), CorrelationError>>,
    correlator: Weak<Shared>,
    resolved: bool,
}

impl ResponseHandle {
    pub(crate) fn new(
        id: CorrelationId,
        operation: OperationKind,
        rx: oneshot::Receiver<Result<(), CorrelationError>>,
        correlator: Weak<Shared>,
    ) -> Self {
        Self {
            id,
            operation,
            rx,
            correlator,
            resolved: false,
        }
    }

    pub fn id(&self) -> CorrelationId {
        self.id
    }

    pub fn operation(&self) -> OperationKind {
        self.operation
    }

    /// Resolve the request with [`CorrelationError::Cancelled`] unless something
    /// else already resolved it. Returns whether this call won.
    pub fn cancel(&self) -> bool {
        self.correlator
            .upgrade()
            .is_some_and(|shared| shared.cancel(self.id))
    }
}

impl Future for ResponseHandle {
    type Output = Result<(), CorrelationError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        match Pin::new(&mut this.rx).poll(cx) {
            Poll::Ready(result) => {
                this.resolved = true;
                // sender dropped without resolving: the correlator went away
                Poll::Ready(result.unwrap_or(Err(CorrelationError::Closed)))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for ResponseHandle {
    fn drop(&mut self) {
        if !self.resolved {
            self.cancel();
        }
    }
}

impl std::fmt::Debug for ResponseHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseHandle")
            .field("id", &self.id)
            .field("operation", &self.operation)
            .field("resolved", &self.resolved)
            .finish()
    }
}
