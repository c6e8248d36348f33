use clap::Parser;

use lenna::cli::{run_cli, Cli};
use lenna::config::{LogConfig, LogFormat, LogTarget};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    lenna::logging::init(&LogConfig {
        level: cli.log_level.clone(),
        format: LogFormat::Pretty,
        include_location: false,
        target: LogTarget::Stderr,
    })?;

    run_cli(cli)
}
