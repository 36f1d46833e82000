use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// A single connectivity check against a named database connection.
///
/// Implementations return `AppError::Probe` with the failure classified, so the
/// prober can decide whether to retry.
#[async_trait]
pub trait ConnectivityCheck: Send + Sync {
    async fn check(&self, database: &str) -> Result<()>;
}

/// Pause between attempts. Swapped out in tests to avoid real sleeps.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}
