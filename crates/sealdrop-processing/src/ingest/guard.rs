use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::IngestError;

/// Deadline and cancellation shared by every file of one batch.
#[derive(Clone, Debug)]
pub(crate) struct BatchGuard {
    deadline: Instant,
    cancel: CancellationToken,
}

impl BatchGuard {
    pub(crate) fn new(timeout: Duration, cancel: CancellationToken) -> Self {
        Self {
            deadline: Instant::now() + timeout,
            cancel,
        }
    }

    /// Fail fast when the batch is already cancelled or out of time.
    pub(crate) fn check(&self) -> Result<(), IngestError> {
        if self.cancel.is_cancelled() {
            return Err(IngestError::Cancelled);
        }
        if Instant::now() >= self.deadline {
            return Err(IngestError::Timeout);
        }
        Ok(())
    }

    /// Run `fut` until it completes, the deadline passes, or the batch is cancelled.
    pub(crate) async fn run<F, T, E>(&self, fut: F) -> Result<T, IngestError>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<IngestError>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(IngestError::Cancelled),
            res = tokio::time::timeout_at(self.deadline, fut) => match res {
                Ok(inner) => inner.map_err(Into::into),
                Err(_) => Err(IngestError::Timeout),
            },
        }
    }
}
