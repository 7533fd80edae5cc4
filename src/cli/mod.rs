use clap::Parser;
use std::path::PathBuf;

use crate::config::AppConfig;

#[derive(Debug, Parser)]
#[command(name = "annynotes")]
#[command(about = "AnnyNotes - note sharing REST service")]
#[command(version)]
pub struct Cli {
    #[arg(long, help = "Load environment variables from this file instead of ./.env")]
    pub env_file: Option<PathBuf>,

    #[arg(long, help = "Port to listen on (overrides ANNYNOTES_PORT / PORT)")]
    pub port: Option<u16>,

    #[arg(long, help = "Database URL (overrides DATABASE_URL)")]
    pub database_url: Option<String>,
}

impl Cli {
    /// Command-line flags win over the environment
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(url) = &self.database_url {
            config.database.url = url.clone();
        }
    }
}
