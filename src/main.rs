use clap::Parser;

use storestats::cli::Cli;
use storestats::config::{get_config, init_config_from};
use storestats::runtime::modes::{self, Mode};
use storestats::system::init_logging;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_config_from(cli.config.as_deref());

    let config = get_config();
    // 日志 guard 必须存活到进程结束
    let _log_guard = match init_logging(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {:#}", e);
            std::process::exit(1);
        }
    };

    match modes::detect_mode(cli.command.as_ref()) {
        Mode::Worker => {
            if let Err(e) = modes::run_worker().await {
                tracing::error!("Worker failed: {:#}", e);
                eprintln!("Worker failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Mode::Cli => {
            let Some(command) = cli.command else {
                return;
            };
            if let Err(e) = modes::run_cli(command).await {
                eprintln!("{}", e.format_colored());
                std::process::exit(1);
            }
        }
    }
}
