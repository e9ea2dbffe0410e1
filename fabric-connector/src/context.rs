//! Cancellation-capable context threaded through every adapter operation
//! (spec §4.4 "Every operation takes a cancellation-capable context", §5
//! "every public operation accepts an abortable context").

use fabric_types::errors::FabricError;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct OpContext {
    cancellation: CancellationToken,
    deadline: Option<std::time::Instant>,
}

impl OpContext {
    pub fn new() -> Self {
        Self {
            cancellation: CancellationToken::new(),
            deadline: None,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            cancellation: CancellationToken::new(),
            deadline: Some(std::time::Instant::now() + timeout),
        }
    }

    pub fn child(&self) -> Self {
        Self {
            cancellation: self.cancellation.child_token(),
            deadline: self.deadline,
        }
    }

    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(std::time::Instant::now()))
    }

    /// Runs `fut` to completion unless cancelled or the deadline elapses
    /// first, in which case `Cancelled`/`DeadlineExceeded` is returned and
    /// `fut` is dropped (bounded suspension point, spec §5).
    pub async fn run<F, T>(&self, fut: F) -> Result<T, FabricError>
    where
        F: std::future::Future<Output = T>,
    {
        let cancelled = self.cancellation.cancelled();
        match self.remaining() {
            Some(remaining) => tokio::select! {
                biased;
                _ = cancelled => Err(FabricError::Cancelled),
                result = tokio::time::timeout(remaining, fut) => {
                    result.map_err(|_| FabricError::DeadlineExceeded)
                }
            },
            None => tokio::select! {
                biased;
                _ = cancelled => Err(FabricError::Cancelled),
                result = fut => Ok(result),
            },
        }
    }
}

impl Default for OpContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cancellation_short_circuits_pending_future() {
        let ctx = OpContext::new();
        let child = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            child.cancel();
        });
        let result = ctx.run(std::future::pending::<()>()).await;
        assert!(matches!(result, Err(FabricError::Cancelled)));
    }

    #[tokio::test]
    async fn deadline_elapses_into_deadline_exceeded() {
        let ctx = OpContext::with_timeout(Duration::from_millis(5));
        let result = ctx.run(std::future::pending::<()>()).await;
        assert!(matches!(result, Err(FabricError::DeadlineExceeded)));
    }

    #[tokio::test]
    async fn completes_normally_within_deadline() {
        let ctx = OpContext::with_timeout(Duration::from_millis(500));
        let result = ctx.run(async { 42 }).await;
        assert_eq!(result.unwrap(), 42);
    }
}
