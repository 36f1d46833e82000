#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::{CalcOp, CliConfig, Command, LogFormat, WaitForDbArgs};
pub use toml_config::{AppConfig, DatabaseSettings, ProberSettings, DEFAULT_DATABASE};
