use clap::Parser;

use authgate::{cli::Cli, Result};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists; must happen before configuration is read
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: Error loading .env file: {}", e);
        }
    }

    authgate::cli::run_cli(Cli::parse()).await
}
