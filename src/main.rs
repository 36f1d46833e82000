use anyhow::Context;
use appctl::config::{CalcOp, CliConfig, Command, LogFormat, WaitForDbArgs};
use appctl::utils::logger;
use appctl::{calc, AppConfig, AppError};
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    match cli.log_format {
        LogFormat::Compact => logger::init_cli_logger(cli.verbose),
        LogFormat::Json => logger::init_json_logger(cli.verbose),
    }

    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    match &cli.command {
        Command::WaitForDb(args) => run_wait_for_db(&cli, args).await,
        Command::Calc { op } => {
            run_calc(*op);
            Ok(())
        }
    }
}

async fn run_wait_for_db(cli: &CliConfig, args: &WaitForDbArgs) -> anyhow::Result<()> {
    if let Some(path) = &cli.config {
        tracing::info!("📁 Loading configuration from: {}", path.display());
    }

    let mut config = AppConfig::load(cli.config.as_deref()).with_context(|| match &cli.config {
        Some(path) => format!("failed to load config file '{}'", path.display()),
        None => "failed to read database settings from the environment".to_string(),
    })?;
    args.apply_overrides(&mut config);

    match appctl::wait_for_db(&config, &args.database).await {
        Ok(report) => {
            tracing::info!(
                "✅ Database '{}' available ({} attempt(s), {:?})",
                report.database,
                report.attempts,
                report.elapsed
            );
            Ok(())
        }
        Err(e) => exit_with(e),
    }
}

fn run_calc(op: CalcOp) {
    let result = match op {
        CalcOp::Add { x, y } => calc::add(x, y),
        CalcOp::Subtract { x, y } => calc::subtract(x, y),
    };

    match result {
        Ok(value) => println!("{}", value),
        Err(e) => exit_with(e),
    }
}

fn exit_with(e: AppError) -> ! {
    // 記錄詳細錯誤信息
    tracing::error!(
        "❌ {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    // 輸出用戶友好的錯誤信息
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    std::process::exit(e.exit_code().max(1));
}
