use crate::domain::model::ProbeErrorKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Database driver error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Unknown database connection '{name}'")]
    UnknownDatabase { name: String },

    #[error("Database '{database}' check failed ({kind}): {message}")]
    Probe {
        database: String,
        kind: ProbeErrorKind,
        message: String,
    },

    #[error("Database '{database}' still unavailable after {attempts} attempts")]
    RetriesExhausted { database: String, attempts: u32 },

    #[error("Arithmetic overflow: {message}")]
    ArithmeticError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Connectivity,
    Database,
    System,
    Input,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AppError {
    pub fn probe(database: &str, kind: ProbeErrorKind, message: impl Into<String>) -> Self {
        Self::Probe {
            database: database.to_string(),
            kind,
            message: message.into(),
        }
    }

    /// 只有連線拒絕與尚未就緒兩種錯誤可以重試
    pub fn probe_kind(&self) -> Option<ProbeErrorKind> {
        match self {
            Self::Probe { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.probe_kind().is_some_and(|kind| kind.is_transient())
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. }
            | Self::UnknownDatabase { .. } => ErrorCategory::Configuration,
            Self::Probe { kind, .. } if kind.is_transient() => ErrorCategory::Connectivity,
            Self::RetriesExhausted { .. } => ErrorCategory::Connectivity,
            Self::Probe { .. } | Self::DatabaseError(_) => ErrorCategory::Database,
            Self::IoError(_) => ErrorCategory::System,
            Self::ArithmeticError { .. } => ErrorCategory::Input,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Probe { kind, .. } if kind.is_transient() => ErrorSeverity::Medium,
            Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. }
            | Self::UnknownDatabase { .. }
            | Self::RetriesExhausted { .. }
            | Self::ArithmeticError { .. } => ErrorSeverity::High,
            Self::Probe { .. } | Self::DatabaseError(_) | Self::IoError(_) => {
                ErrorSeverity::Critical
            }
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::ConfigValidationError { .. } | Self::InvalidConfigValueError { .. } => {
                "Check the configuration file (valid TOML?) and command line flags"
            }
            Self::MissingConfigError { .. } => {
                "Set DATABASE_URL or DB_HOST/DB_NAME/DB_USER/DB_PASS, or pass --config"
            }
            Self::UnknownDatabase { .. } => {
                "Add a [databases.<name>] table to the config file or use --database default"
            }
            Self::RetriesExhausted { .. } => {
                "Increase --max-attempts or check that the database container is starting"
            }
            Self::Probe { kind, .. } if kind.is_transient() => {
                "The database is still starting; retrying should resolve this"
            }
            Self::Probe { .. } | Self::DatabaseError(_) => {
                "Verify credentials, TLS settings and the database URL"
            }
            Self::IoError(_) => "Check file permissions and paths",
            Self::ArithmeticError { .. } => "Use smaller operands",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::RetriesExhausted { database, attempts } => format!(
                "Gave up waiting for database '{}' after {} attempts",
                database, attempts
            ),
            Self::Probe {
                database, message, ..
            } => format!("Database '{}' is not usable: {}", database, message),
            Self::UnknownDatabase { name } => {
                format!("No connection settings for database '{}'", name)
            }
            other => other.to_string(),
        }
    }

    /// 根據錯誤嚴重程度決定退出碼
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
