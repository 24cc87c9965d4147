mod cli;
mod command;
mod config;
mod error;
mod watcher;

use error::WrapErr;

use clap::CommandFactory;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// 日志级别：默认 warn，每个 `-v` 提升一级
fn log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level(verbose)));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> error::Result<()> {
    color_eyre::install()?;
    let command_line = cli::Cli::parse();
    init_tracing(command_line.verbose);

    let cfg = config::Config::load().context("Load configuration error")?;

    if let Some(command) = command_line.command {
        let cmd: Box<dyn command::Command> = match command {
            cli::Commands::Serve => Box::new(command::ServeCommand::new(cfg)),
            cli::Commands::Index { root_path } => Box::new(command::IndexCommand::new(cfg, root_path)),
            cli::Commands::Search { query, scope, limit } => {
                Box::new(command::SearchCommand::new(cfg, query, scope, limit))
            }
            cli::Commands::Suggest { prefix, limit } => Box::new(command::SuggestCommand::new(cfg, prefix, limit)),
            cli::Commands::ClearCache => Box::new(command::ClearCacheCommand::new(cfg)),
        };
        cmd.execute().await?;
    } else {
        cli::Cli::command().print_help()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, "warn")]
    #[case(1, "info")]
    #[case(2, "debug")]
    #[case(3, "trace")]
    #[case(9, "trace")]
    fn verbosity_selects_level(#[case] verbose: u8, #[case] level: &str) {
        assert_eq!(log_level(verbose), level);
    }
}
