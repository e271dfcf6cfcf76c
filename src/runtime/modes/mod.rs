//! Mode routing
//!
//! - Worker mode (`storestats run` or no subcommand): scheduled background jobs
//! - CLI mode: one-shot commands

pub mod cli;
pub mod worker;

pub use cli::run_cli;
pub use worker::run_worker;

use crate::cli::Commands;

/// Mode detection result
#[derive(Debug, PartialEq)]
pub enum Mode {
    Worker,
    Cli,
}

/// 没有子命令或为 `run` 时进入 worker 模式
pub fn detect_mode(command: Option<&Commands>) -> Mode {
    match command {
        None | Some(Commands::Run) => Mode::Worker,
        Some(_) => Mode::Cli,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_mode() {
        assert_eq!(detect_mode(None), Mode::Worker);
        assert_eq!(detect_mode(Some(&Commands::Run)), Mode::Worker);
        assert_eq!(detect_mode(Some(&Commands::Archive)), Mode::Cli);
    }
}
