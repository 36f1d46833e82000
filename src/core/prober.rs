use crate::core::{ConnectivityCheck, ProbeAttempt, ProbeReport, Sleeper};
use crate::utils::error::{AppError, Result};
use std::time::{Duration, Instant};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub interval: Duration,
    /// `None` retries transient failures forever.
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            max_attempts: None,
        }
    }
}

pub struct DbReadinessProber<C: ConnectivityCheck, S: Sleeper> {
    check: C,
    sleeper: S,
    policy: RetryPolicy,
}

impl<C: ConnectivityCheck, S: Sleeper> DbReadinessProber<C, S> {
    pub fn new(check: C, sleeper: S) -> Self {
        Self::with_policy(check, sleeper, RetryPolicy::default())
    }

    pub fn with_policy(check: C, sleeper: S, policy: RetryPolicy) -> Self {
        Self {
            check,
            sleeper,
            policy,
        }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Block until `database` accepts connections.
    ///
    /// Connection-refused and not-ready failures are retried after a fixed
    /// interval; any other failure is returned from the first attempt that hits it.
    pub async fn wait_for(&self, database: &str) -> Result<ProbeReport> {
        let started = Instant::now();
        let mut attempt = ProbeAttempt {
            database: database.to_string(),
            attempt: 0,
        };

        tracing::info!("⏳ Waiting for database '{}'...", database);

        loop {
            attempt.attempt += 1;

            match self.check.check(database).await {
                Ok(()) => {
                    tracing::info!(
                        "✅ Database '{}' available after {} attempt(s)",
                        database,
                        attempt.attempt
                    );
                    return Ok(ProbeReport {
                        database: attempt.database,
                        attempts: attempt.attempt,
                        elapsed: started.elapsed(),
                    });
                }
                Err(e) if e.is_transient() => {
                    if self
                        .policy
                        .max_attempts
                        .is_some_and(|max| attempt.attempt >= max)
                    {
                        tracing::error!(
                            "❌ Database '{}' unavailable, giving up after {} attempts: {}",
                            database,
                            attempt.attempt,
                            e
                        );
                        return Err(AppError::RetriesExhausted {
                            database: attempt.database,
                            attempts: attempt.attempt,
                        });
                    }

                    tracing::warn!(
                        "Database '{}' unavailable (attempt {}), retrying in {:?}: {}",
                        database,
                        attempt.attempt,
                        self.policy.interval,
                        e
                    );
                    self.sleeper.sleep(self.policy.interval).await;
                }
                Err(e) => {
                    tracing::error!(
                        "❌ Database '{}' check failed on attempt {}: {}",
                        database,
                        attempt.attempt,
                        e
                    );
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::ProbeErrorKind;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct ScriptedCheck {
        outcomes: Arc<Mutex<VecDeque<Option<ProbeErrorKind>>>>,
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl ScriptedCheck {
        fn new(outcomes: Vec<Option<ProbeErrorKind>>) -> Self {
            Self {
                outcomes: Arc::new(Mutex::new(outcomes.into())),
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ConnectivityCheck for ScriptedCheck {
        async fn check(&self, database: &str) -> Result<()> {
            self.calls.lock().unwrap().push(database.to_string());
            // 腳本用完後一律視為成功
            match self.outcomes.lock().unwrap().pop_front().flatten() {
                Some(kind) => Err(AppError::probe(database, kind, "scripted failure")),
                None => Ok(()),
            }
        }
    }

    #[derive(Clone, Default)]
    struct RecordingSleeper {
        naps: Arc<Mutex<Vec<Duration>>>,
    }

    impl RecordingSleeper {
        fn naps(&self) -> Vec<Duration> {
            self.naps.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.naps.lock().unwrap().push(duration);
        }
    }

    #[tokio::test]
    async fn test_wait_for_db_ready() {
        let check = ScriptedCheck::new(vec![]);
        let sleeper = RecordingSleeper::default();
        let prober = DbReadinessProber::new(check.clone(), sleeper.clone());

        let report = prober.wait_for("default").await.unwrap();

        assert_eq!(report.attempts, 1);
        assert_eq!(check.calls(), vec!["default".to_string()]);
        assert!(sleeper.naps().is_empty());
    }

    #[tokio::test]
    async fn test_wait_for_db_delay() {
        let mut script = vec![Some(ProbeErrorKind::ConnectionRefused); 2];
        script.extend(vec![Some(ProbeErrorKind::NotReady); 3]);
        let check = ScriptedCheck::new(script);
        let sleeper = RecordingSleeper::default();
        let prober = DbReadinessProber::new(check.clone(), sleeper.clone());

        let report = prober.wait_for("default").await.unwrap();

        assert_eq!(report.attempts, 6);
        let calls = check.calls();
        assert_eq!(calls.len(), 6);
        assert!(calls.iter().all(|db| db == "default"));
        assert_eq!(sleeper.naps(), vec![DEFAULT_INTERVAL; 5]);
    }

    #[tokio::test]
    async fn test_fatal_error_is_not_retried() {
        let check = ScriptedCheck::new(vec![Some(ProbeErrorKind::Fatal), None]);
        let sleeper = RecordingSleeper::default();
        let prober = DbReadinessProber::new(check.clone(), sleeper.clone());

        let err = prober.wait_for("default").await.unwrap_err();

        assert_eq!(err.probe_kind(), Some(ProbeErrorKind::Fatal));
        assert_eq!(check.calls().len(), 1);
        assert!(sleeper.naps().is_empty());
    }

    #[tokio::test]
    async fn test_fixed_interval_is_used() {
        let check = ScriptedCheck::new(vec![Some(ProbeErrorKind::NotReady); 3]);
        let sleeper = RecordingSleeper::default();
        let policy = RetryPolicy {
            interval: Duration::from_millis(250),
            max_attempts: None,
        };
        let prober = DbReadinessProber::with_policy(check, sleeper.clone(), policy);

        prober.wait_for("default").await.unwrap();

        assert_eq!(sleeper.naps(), vec![Duration::from_millis(250); 3]);
    }

    #[tokio::test]
    async fn test_max_attempts_caps_retries() {
        let check = ScriptedCheck::new(vec![Some(ProbeErrorKind::ConnectionRefused); 10]);
        let sleeper = RecordingSleeper::default();
        let policy = RetryPolicy {
            interval: DEFAULT_INTERVAL,
            max_attempts: Some(3),
        };
        let prober = DbReadinessProber::with_policy(check.clone(), sleeper.clone(), policy);

        let err = prober.wait_for("replica").await.unwrap_err();

        match err {
            AppError::RetriesExhausted { database, attempts } => {
                assert_eq!(database, "replica");
                assert_eq!(attempts, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(check.calls().len(), 3);
        assert_eq!(sleeper.naps().len(), 2);
    }

    #[tokio::test]
    async fn test_non_probe_error_propagates() {
        struct MisconfiguredCheck;

        #[async_trait]
        impl ConnectivityCheck for MisconfiguredCheck {
            async fn check(&self, database: &str) -> Result<()> {
                Err(AppError::UnknownDatabase {
                    name: database.to_string(),
                })
            }
        }

        let sleeper = RecordingSleeper::default();
        let prober = DbReadinessProber::new(MisconfiguredCheck, sleeper.clone());

        let err = prober.wait_for("missing").await.unwrap_err();

        assert!(matches!(err, AppError::UnknownDatabase { .. }));
        assert!(sleeper.naps().is_empty());
    }
}
