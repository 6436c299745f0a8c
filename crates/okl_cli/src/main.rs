// src/main.rs

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::EnvFilter;

mod cli;
mod report;

use cli::Cli;

/// 不输出时间戳
struct NoTimestamp;

impl FormatTime for NoTimestamp {
    fn format_time(&self, _w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        Ok(())
    }
}

/// 设置了 OKL_LOG 时初始化日志
/// OKL_LOG_STYLE: "compact" (默认) 或 "full" (带时间戳和 span 事件)
fn init_tracing() {
    let Ok(filter) = EnvFilter::try_from_env("OKL_LOG") else {
        return;
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(io::stderr);

    if std::env::var("OKL_LOG_STYLE").is_ok_and(|style| style == "full") {
        builder.with_span_events(FmtSpan::NEW | FmtSpan::CLOSE).init();
    } else {
        builder.with_timer(NoTimestamp).init();
    }
    tracing::debug!("tracing initialized");
}

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    match report::run(&cli, io::stderr()) {
        Ok(true) => ExitCode::FAILURE,
        Ok(false) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("okl-diag: {:#}", err);
            ExitCode::from(2)
        }
    }
}
