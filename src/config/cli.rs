use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "bank-etl")]
#[command(about = "Collect bank contents from WoW addon SavedVariables into a database, CSV or JSON file")]
pub struct CliArgs {
    /// Path to the config file (.json or .toml)
    #[arg(short, long, default_value = "conf.json")]
    pub config: String,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Log process CPU and memory usage after each phase
    #[arg(long)]
    pub monitor: bool,

    /// Override the sink type from the config (mariadb, csv, json)
    #[arg(long)]
    pub sink: Option<String>,

    /// Show which characters and files would be read, then exit without writing
    #[arg(long)]
    pub dry_run: bool,
}
