use crate::core::prober::RetryPolicy;
use crate::utils::error::{AppError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgConnectOptions;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

pub const DEFAULT_DATABASE: &str = "default";
pub const DEFAULT_PORT: u16 = 5432;
pub const DEFAULT_INTERVAL_SECS: u64 = 1;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
const MAX_INTERVAL_SECS: u64 = 3600;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub prober: ProberSettings,
    #[serde(default)]
    pub databases: BTreeMap<String, DatabaseSettings>,
    /// Why the `default` database could not be built from the environment.
    /// Reported only when that connection is actually requested.
    #[serde(skip)]
    env_fallback_error: Option<InvalidEnvValue>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct InvalidEnvValue {
    field: String,
    value: String,
    reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProberSettings {
    pub interval_secs: Option<u64>,
    pub connect_timeout_secs: Option<u64>,
    pub max_attempts: Option<u32>,
}

/// Connection settings for one named database.
///
/// Either `url` or `host` must be set. When both are present the URL wins.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub name: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("url", &self.url.as_deref().map(validation::redact_url))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("name", &self.name)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl DatabaseSettings {
    /// 從環境變數建立預設連線設定
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// `DATABASE_URL` takes precedence over the discrete `DB_*` variables.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty("DATABASE_URL") {
            return Ok(Self {
                url: Some(url),
                ..Self::default()
            });
        }

        let host = non_empty("DB_HOST").ok_or_else(|| AppError::MissingConfigError {
            field: "DATABASE_URL or DB_HOST".to_string(),
        })?;

        let port = match non_empty("DB_PORT") {
            Some(raw) => Some(raw.parse::<u16>().map_err(|e| {
                AppError::InvalidConfigValueError {
                    field: "DB_PORT".to_string(),
                    value: raw.clone(),
                    reason: e.to_string(),
                }
            })?),
            None => None,
        };

        Ok(Self {
            url: None,
            host: Some(host),
            port,
            name: non_empty("DB_NAME"),
            user: non_empty("DB_USER"),
            password: lookup("DB_PASS"),
        })
    }

    /// Human-readable target for log lines, never includes the password.
    pub fn describe(&self) -> String {
        match (&self.url, &self.host) {
            (Some(url), _) => validation::redact_url(url),
            (None, Some(host)) => format!(
                "{}:{}/{}",
                host,
                self.port.unwrap_or(DEFAULT_PORT),
                self.name.as_deref().unwrap_or("")
            ),
            (None, None) => "<unset>".to_string(),
        }
    }

    pub fn connect_options(&self) -> Result<PgConnectOptions> {
        if let Some(url) = &self.url {
            return url
                .parse::<PgConnectOptions>()
                .map_err(|e| AppError::InvalidConfigValueError {
                    field: "url".to_string(),
                    value: validation::redact_url(url),
                    reason: e.to_string(),
                });
        }

        let host = self.host.as_deref().ok_or_else(|| AppError::MissingConfigError {
            field: "host".to_string(),
        })?;

        let mut options = PgConnectOptions::new()
            .host(host)
            .port(self.port.unwrap_or(DEFAULT_PORT));
        if let Some(name) = &self.name {
            options = options.database(name);
        }
        if let Some(user) = &self.user {
            options = options.username(user);
        }
        if let Some(password) = &self.password {
            options = options.password(password);
        }
        Ok(options)
    }

    fn validate_named(&self, name: &str) -> Result<()> {
        match (&self.url, &self.host) {
            (Some(url), _) => {
                validation::validate_database_url(&format!("databases.{}.url", name), url)
            }
            (None, Some(host)) => {
                validation::validate_non_empty_string(&format!("databases.{}.host", name), host)?;
                if let Some(db_name) = &self.name {
                    validation::validate_non_empty_string(
                        &format!("databases.{}.name", name),
                        db_name,
                    )?;
                }
                Ok(())
            }
            (None, None) => Err(AppError::ConfigValidationError {
                field: format!("databases.{}", name),
                message: "either 'url' or 'host' must be set".to_string(),
            }),
        }
    }
}

impl AppConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| AppError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Load the optional config file, then fill in the `default` database from the
    /// environment when the file does not define one.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if !config.databases.contains_key(DEFAULT_DATABASE) {
            // 環境變數有誤時延後到實際查詢該連線時才報錯
            match DatabaseSettings::from_lookup(lookup) {
                Ok(settings) => {
                    config
                        .databases
                        .insert(DEFAULT_DATABASE.to_string(), settings);
                }
                Err(AppError::MissingConfigError { .. }) => {}
                Err(AppError::InvalidConfigValueError {
                    field,
                    value,
                    reason,
                }) => {
                    config.env_fallback_error = Some(InvalidEnvValue {
                        field,
                        value,
                        reason,
                    });
                }
                Err(e) => return Err(e),
            }
        }

        Ok(config)
    }

    /// 替換環境變數 (例如 ${DB_PASS})
    fn substitute_env_vars(content: &str) -> String {
        static ENV_VAR: OnceLock<Regex> = OnceLock::new();
        let re = ENV_VAR.get_or_init(|| {
            Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("env var pattern is valid")
        });

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
    }

    pub fn database(&self, name: &str) -> Result<&DatabaseSettings> {
        match self.databases.get(name) {
            Some(settings) => Ok(settings),
            None if name == DEFAULT_DATABASE => match &self.env_fallback_error {
                Some(invalid) => Err(AppError::InvalidConfigValueError {
                    field: invalid.field.clone(),
                    value: invalid.value.clone(),
                    reason: invalid.reason.clone(),
                }),
                None => Err(AppError::MissingConfigError {
                    field: "DATABASE_URL or DB_HOST".to_string(),
                }),
            },
            None => Err(AppError::UnknownDatabase {
                name: name.to_string(),
            }),
        }
    }

    /// Validate the prober settings and only the connection that will be probed,
    /// so a broken entry for some other database does not block startup.
    pub fn validate_for(&self, name: &str) -> Result<()> {
        self.prober.validate()?;
        self.database(name)?.validate_named(name)
    }

    pub fn interval_secs(&self) -> u64 {
        self.prober.interval_secs.unwrap_or(DEFAULT_INTERVAL_SECS)
    }

    pub fn connect_timeout_secs(&self) -> u64 {
        self.prober
            .connect_timeout_secs
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS)
    }

    pub fn max_attempts(&self) -> Option<u32> {
        self.prober.max_attempts
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            interval: Duration::from_secs(self.interval_secs()),
            max_attempts: self.max_attempts(),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs())
    }
}

impl Validate for ProberSettings {
    fn validate(&self) -> Result<()> {
        if let Some(interval) = self.interval_secs {
            validation::validate_range("prober.interval_secs", interval, 1, MAX_INTERVAL_SECS)?;
        }
        if let Some(timeout) = self.connect_timeout_secs {
            validation::validate_positive_number("prober.connect_timeout_secs", timeout, 1)?;
        }
        if let Some(max) = self.max_attempts {
            validation::validate_positive_number("prober.max_attempts", u64::from(max), 1)?;
        }
        Ok(())
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        self.prober.validate()?;
        for (name, settings) in &self.databases {
            settings.validate_named(name)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_parse_basic_toml_config() {
        let toml_content = r#"
[prober]
interval_secs = 2
max_attempts = 30

[databases.default]
host = "db"
name = "app"
user = "app"
password = "changeme"

[databases.replica]
url = "postgres://app@replica:5432/app"
"#;

        let config = AppConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.interval_secs(), 2);
        assert_eq!(config.max_attempts(), Some(30));
        assert_eq!(config.connect_timeout_secs(), DEFAULT_CONNECT_TIMEOUT_SECS);
        assert_eq!(config.database("default").unwrap().host.as_deref(), Some("db"));
        assert!(config.database("replica").unwrap().url.is_some());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("APPCTL_TEST_DB_PASSWORD", "s3cret");

        let toml_content = r#"
[databases.default]
host = "db"
password = "${APPCTL_TEST_DB_PASSWORD}"
"#;

        let config = AppConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(
            config.database("default").unwrap().password.as_deref(),
            Some("s3cret")
        );

        std::env::remove_var("APPCTL_TEST_DB_PASSWORD");
    }

    #[test]
    fn test_unknown_database() {
        let config = AppConfig::default();
        assert!(matches!(
            config.database("replica"),
            Err(AppError::UnknownDatabase { .. })
        ));
        assert!(matches!(
            config.database(DEFAULT_DATABASE),
            Err(AppError::MissingConfigError { .. })
        ));
    }

    #[test]
    fn test_config_validation() {
        let bad_scheme = AppConfig::from_toml_str(
            r#"
[databases.default]
url = "mysql://db/app"
"#,
        )
        .unwrap();
        assert!(bad_scheme.validate().is_err());

        let empty = AppConfig::from_toml_str("[databases.default]\n").unwrap();
        assert!(matches!(
            empty.validate(),
            Err(AppError::ConfigValidationError { .. })
        ));

        let zero_interval = AppConfig::from_toml_str("[prober]\ninterval_secs = 0\n").unwrap();
        assert!(zero_interval.validate().is_err());
    }

    #[test]
    fn test_from_lookup_prefers_database_url() {
        let settings = DatabaseSettings::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://app:pw@db/app"),
            ("DB_HOST", "ignored"),
        ]))
        .unwrap();

        assert_eq!(settings.url.as_deref(), Some("postgres://app:pw@db/app"));
        assert!(settings.host.is_none());
    }

    #[test]
    fn test_from_lookup_discrete_vars() {
        let settings = DatabaseSettings::from_lookup(lookup_from(&[
            ("DB_HOST", "db"),
            ("DB_PORT", "6543"),
            ("DB_NAME", "devdb"),
            ("DB_USER", "devuser"),
            ("DB_PASS", "changeme"),
        ]))
        .unwrap();

        assert_eq!(settings.host.as_deref(), Some("db"));
        assert_eq!(settings.port, Some(6543));
        assert_eq!(settings.describe(), "db:6543/devdb");
        assert!(settings.connect_options().is_ok());
    }

    #[test]
    fn test_from_lookup_errors() {
        assert!(matches!(
            DatabaseSettings::from_lookup(lookup_from(&[])),
            Err(AppError::MissingConfigError { .. })
        ));
        assert!(matches!(
            DatabaseSettings::from_lookup(lookup_from(&[("DB_HOST", "db"), ("DB_PORT", "x")])),
            Err(AppError::InvalidConfigValueError { .. })
        ));
    }

    #[test]
    fn test_invalid_env_fallback_is_deferred() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[databases.replica]\nurl = \"postgres://app@replica/app\"\n")
            .unwrap();

        let config = AppConfig::load_with(
            Some(temp_file.path()),
            lookup_from(&[("DB_HOST", "db"), ("DB_PORT", "not-a-port")]),
        )
        .unwrap();

        assert!(config.validate_for("replica").is_ok());
        match config.database(DEFAULT_DATABASE) {
            Err(AppError::InvalidConfigValueError { field, value, .. }) => {
                assert_eq!(field, "DB_PORT");
                assert_eq!(value, "not-a-port");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_validate_for_ignores_other_databases() {
        let config = AppConfig::from_toml_str(
            r#"
[databases.default]
host = "db"

[databases.replica]
url = "mysql://replica/app"
"#,
        )
        .unwrap();

        assert!(config.validate_for(DEFAULT_DATABASE).is_ok());
        assert!(config.validate_for("replica").is_err());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_syntax_error_is_config_error() {
        match AppConfig::from_toml_str("[prober\ninterval_secs = ") {
            Err(AppError::ConfigValidationError { field, .. }) => {
                assert_eq!(field, "toml_parsing");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_debug_redacts_password() {
        let settings = DatabaseSettings {
            url: Some("postgres://app:hunter2@db/app".to_string()),
            password: Some("hunter2".to_string()),
            ..DatabaseSettings::default()
        };

        let debug = format!("{:?}", settings);
        assert!(!debug.contains("hunter2"));
        assert!(!settings.describe().contains("hunter2"));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();

        let toml_content = r#"
[prober]
connect_timeout_secs = 10

[databases.default]
url = "postgres://app@db:5432/app"
"#;

        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = AppConfig::load(Some(temp_file.path())).unwrap();
        assert_eq!(config.connect_timeout_secs(), 10);
        assert!(config.database(DEFAULT_DATABASE).is_ok());
    }
}
