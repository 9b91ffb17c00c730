use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = procsock::Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();

    procsock::run(cli)
}
