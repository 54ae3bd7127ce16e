use std::path::PathBuf;

use clap::Parser;

/// Capture web pages together with their stylesheets and scripts as zip archives.
#[derive(Debug, Parser)]
#[command(name = "site-mirror", version)]
pub struct Cli {
    /// Pages to mirror. Host-like input without a scheme is read as https;
    /// `/path`, `./path` and dotless first segments follow the previous page.
    pub urls: Vec<String>,

    /// Search results file (`{"items": [...]}`) to pick pages from.
    #[arg(long)]
    pub results: Option<PathBuf>,

    /// Comma-separated indices into --results to mirror. Without it the
    /// results are listed and nothing is fetched.
    #[arg(long = "pick", value_delimiter = ',')]
    pub picks: Vec<usize>,

    /// Directory archives are written to (overrides the config file).
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// RON config file. Defaults to ./mirror.ron when present.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Also write logs to this file.
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// More log output (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
