use crate::adapters::{PgConnectivityCheck, TokioSleeper};
use crate::config::toml_config::AppConfig;
use crate::core::prober::DbReadinessProber;
use crate::core::ProbeReport;
use crate::utils::error::Result;

/// Build a Postgres-backed prober for `database` from validated configuration.
pub fn build_prober(
    config: &AppConfig,
    database: &str,
) -> Result<DbReadinessProber<PgConnectivityCheck, TokioSleeper>> {
    config.validate_for(database)?;

    let policy = config.retry_policy();
    match policy.max_attempts {
        Some(max) => tracing::debug!(
            "Retry policy: every {:?}, at most {} attempts",
            policy.interval,
            max
        ),
        None => tracing::debug!("Retry policy: every {:?}, unbounded", policy.interval),
    }

    let check = PgConnectivityCheck::new(config.clone(), config.connect_timeout());
    Ok(DbReadinessProber::with_policy(check, TokioSleeper, policy))
}

pub async fn wait_for_db(config: &AppConfig, database: &str) -> Result<ProbeReport> {
    // 未知的連線名稱直接失敗，不進入重試
    let settings = config.database(database)?;
    tracing::info!("🎯 Target: {} ({})", database, settings.describe());

    let prober = build_prober(config, database)?;
    prober.wait_for(database).await
}
