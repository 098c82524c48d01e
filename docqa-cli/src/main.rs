use std::process::ExitCode;

use clap::Parser;
use docqa_cli::{Cli, app, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    telemetry::init(cli.log_format);
    app::run(cli).await
}
