pub mod commands;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "ditt-api")]
#[command(about = "Ditt API - per-user JSON record service")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Start the API server")]
    Start(commands::start::StartArgs),

    #[command(about = "Show version and build information")]
    Version,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command {
        Commands::Start(args) => commands::start::handle(args).await,
        Commands::Version => commands::version::handle(output_format),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_start_flags() {
        let cli = Cli::parse_from([
            "ditt-api",
            "start",
            "--port",
            "9090",
            "--db-uri",
            "postgres://localhost/ditt",
            "--data-dir",
            "/tmp/blobs",
        ]);
        match cli.command {
            Commands::Start(args) => {
                assert_eq!(args.port, Some(9090));
                assert_eq!(args.db_uri.as_deref(), Some("postgres://localhost/ditt"));
                assert_eq!(args.data_dir, Some(std::path::PathBuf::from("/tmp/blobs")));
            }
            Commands::Version => panic!("expected start"),
        }
    }

    #[test]
    fn test_parse_version_json() {
        let cli = Cli::parse_from(["ditt-api", "version", "--json"]);
        assert!(matches!(OutputFormat::from_cli(&cli), OutputFormat::Json));
    }
}
