pub mod prober;

pub use crate::domain::model::{ProbeAttempt, ProbeErrorKind, ProbeReport};
pub use crate::domain::ports::{ConnectivityCheck, Sleeper};
pub use crate::utils::error::Result;
