mod app;
mod cli;
mod config;
mod effects;
mod logging;
mod results;

use clap::Parser;

fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    let config = config::load(cli.config.as_deref())?;

    let log_file = cli.log_file.clone().or_else(|| config.log_file.clone());
    logging::initialize(
        mirror_logging::level_for_verbosity(cli.verbose),
        log_file.as_deref(),
    );

    let all_succeeded = app::run(&cli, &config)?;
    if !all_succeeded {
        std::process::exit(1);
    }
    Ok(())
}
