use crate::config::toml_config::{AppConfig, DEFAULT_DATABASE};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "appctl")]
#[command(about = "Startup and maintenance commands for the app service")]
pub struct CliConfig {
    /// Optional TOML configuration file
    #[arg(short, long, global = true, env = "APPCTL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Compact)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Compact,
    Json,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Block until the database accepts connections
    WaitForDb(WaitForDbArgs),

    /// Arithmetic helpers
    Calc {
        #[command(subcommand)]
        op: CalcOp,
    },
}

#[derive(Debug, Clone, Args)]
pub struct WaitForDbArgs {
    /// Named database connection to probe
    #[arg(long, default_value = DEFAULT_DATABASE)]
    pub database: String,

    /// Fixed delay between attempts, in seconds
    #[arg(long)]
    pub interval_secs: Option<u64>,

    /// Give up after this many attempts (unbounded when omitted)
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Timeout for a single connectivity check, in seconds
    #[arg(long)]
    pub connect_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Copy, Subcommand)]
pub enum CalcOp {
    Add {
        #[arg(allow_negative_numbers = true)]
        x: i64,
        #[arg(allow_negative_numbers = true)]
        y: i64,
    },
    Subtract {
        #[arg(allow_negative_numbers = true)]
        x: i64,
        #[arg(allow_negative_numbers = true)]
        y: i64,
    },
}

impl WaitForDbArgs {
    /// 命令列參數優先於設定檔
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(interval) = self.interval_secs {
            config.prober.interval_secs = Some(interval);
        }
        if let Some(max) = self.max_attempts {
            config.prober.max_attempts = Some(max);
        }
        if let Some(timeout) = self.connect_timeout_secs {
            config.prober.connect_timeout_secs = Some(timeout);
        }
    }
}
