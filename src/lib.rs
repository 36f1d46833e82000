pub mod adapters;
pub mod app;
pub mod calc;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{PgConnectivityCheck, TokioSleeper};
pub use app::wait_for_db::wait_for_db;
pub use config::AppConfig;
pub use core::prober::{DbReadinessProber, RetryPolicy};
pub use domain::model::{ProbeErrorKind, ProbeReport};
pub use utils::error::{AppError, Result};
