use std::fmt;
use std::time::Duration;

/// Classification of a failed connectivity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeErrorKind {
    /// Nothing is listening yet on the database address.
    ConnectionRefused,
    /// The server accepts connections but the database, role or schema is not ready.
    NotReady,
    /// Anything retrying will not fix.
    Fatal,
}

impl ProbeErrorKind {
    pub fn is_transient(self) -> bool {
        matches!(self, Self::ConnectionRefused | Self::NotReady)
    }
}

impl fmt::Display for ProbeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::ConnectionRefused => "connection refused",
            Self::NotReady => "not ready",
            Self::Fatal => "fatal",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeAttempt {
    pub database: String,
    pub attempt: u32,
}

/// Returned once a check succeeds.
#[derive(Debug, Clone)]
pub struct ProbeReport {
    pub database: String,
    pub attempts: u32,
    pub elapsed: Duration,
}
