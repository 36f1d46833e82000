use crate::config::toml_config::AppConfig;
use crate::core::{ConnectivityCheck, ProbeErrorKind};
use crate::utils::error::{AppError, Result};
use async_trait::async_trait;
use sqlx::{Connection, PgConnection};
use std::io::ErrorKind;
use std::time::Duration;

/// SQLSTATE codes a server reports while it is still initialising.
const NOT_READY_SQLSTATES: &[&str] = &[
    "57P03", // cannot_connect_now: the database system is starting up
    "3D000", // invalid_catalog_name: database not created yet
    "28000", // invalid_authorization_specification: role not created yet
    "53300", // too_many_connections
];

/// Opens a fresh connection per check and pings it.
pub struct PgConnectivityCheck {
    config: AppConfig,
    connect_timeout: Duration,
}

impl PgConnectivityCheck {
    pub fn new(config: AppConfig, connect_timeout: Duration) -> Self {
        Self {
            config,
            connect_timeout,
        }
    }

    async fn connect_and_ping(&self, database: &str) -> Result<()> {
        let settings = self.config.database(database)?;
        let options = settings.connect_options()?;

        tracing::debug!("Connecting to {}", settings.describe());

        let attempt = async {
            let mut conn = PgConnection::connect_with(&options).await?;
            conn.ping().await?;
            conn.close().await
        };

        match tokio::time::timeout(self.connect_timeout, attempt).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(AppError::probe(database, classify(&e), e.to_string())),
            Err(_) => Err(AppError::probe(
                database,
                ProbeErrorKind::NotReady,
                format!("no response within {:?}", self.connect_timeout),
            )),
        }
    }
}

#[async_trait]
impl ConnectivityCheck for PgConnectivityCheck {
    async fn check(&self, database: &str) -> Result<()> {
        self.connect_and_ping(database).await
    }
}

pub fn classify(error: &sqlx::Error) -> ProbeErrorKind {
    match error {
        sqlx::Error::Io(io) => classify_io(io.kind()),
        sqlx::Error::PoolTimedOut => ProbeErrorKind::NotReady,
        sqlx::Error::Database(db) => match db.code() {
            Some(code) => classify_sqlstate(&code),
            None => ProbeErrorKind::Fatal,
        },
        _ => ProbeErrorKind::Fatal,
    }
}

/// Socket failures while the server is unreachable: refused, reset, timed out,
/// unroutable, or a host name that does not resolve yet (surfaced as an
/// uncategorized I/O error). Only a local permission problem is final.
pub fn classify_io(kind: ErrorKind) -> ProbeErrorKind {
    match kind {
        ErrorKind::PermissionDenied => ProbeErrorKind::Fatal,
        _ => ProbeErrorKind::ConnectionRefused,
    }
}

pub fn classify_sqlstate(code: &str) -> ProbeErrorKind {
    if NOT_READY_SQLSTATES.contains(&code) {
        ProbeErrorKind::NotReady
    } else {
        ProbeErrorKind::Fatal
    }
}
