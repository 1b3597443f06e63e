//! # Command Line Interface
//!
//! Serving the API, database maintenance and super admin seeding.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;

use crate::api::start_api_server;
use crate::auth::bootstrap::ensure_super_admin;
use crate::auth::{GroupService, UserService};
use crate::config::AppConfig;
use crate::errors::{Error, Result};
use crate::observability::{init_observability, log_config_info};
use crate::storage::{
    create_pool, list_applied_migrations, run_migrations, validate_migrations, DbPool,
    MigrationInfo,
};

#[derive(Parser, Debug)]
#[command(name = "authgate")]
#[command(about = "JWT authentication service for users and groups")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Database URL override
    #[arg(long)]
    pub database_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Port to bind to
        #[arg(short, long)]
        port: Option<u16>,

        /// Address to bind to
        #[arg(short = 'H', long)]
        host: Option<String>,
    },

    /// Database management commands
    Database {
        #[command(subcommand)]
        command: DatabaseCommands,
    },

    /// Create the super admin group and user if they are missing
    Seed,
}

#[derive(Subcommand, Debug)]
pub enum DatabaseCommands {
    /// Run pending migrations
    Migrate,

    /// Show migration status
    Status,

    /// List all applied migrations
    List,
}

/// Run the parsed command line.
pub async fn run_cli(cli: Cli) -> Result<()> {
    let mut config = AppConfig::load(cli.config.as_deref())?;

    if let Some(url) = cli.database_url {
        config.database.url = url;
    }
    if cli.verbose {
        config.observability.log_level = "debug".to_string();
    }

    init_observability(&config.observability).await?;

    match cli.command.unwrap_or(Commands::Serve { port: None, host: None }) {
        Commands::Serve { port, host } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(host) = host {
                config.server.host = host;
            }
            config.validate()?;
            log_config_info(&config);

            let pool = create_pool(&config.database).await?;
            seed(&pool, &config).await?;
            start_api_server(&config, pool).await
        }
        Commands::Database { command } => {
            let pool = create_pool(&config.database).await?;
            handle_database_command(command, &pool).await
        }
        Commands::Seed => {
            let pool = create_pool(&config.database).await?;
            match seed(&pool, &config).await? {
                Some(admin) => println!("Super admin ready: {} ({})", admin.username, admin.id),
                None => println!("No bootstrap admin password configured, nothing seeded"),
            }
            Ok(())
        }
    }
}

async fn seed(pool: &DbPool, config: &AppConfig) -> Result<Option<crate::auth::User>> {
    let groups = GroupService::with_sqlx(pool.clone());
    let users = UserService::with_sqlx(pool.clone());
    ensure_super_admin(&groups, &users, &config.auth).await
}

/// Handle database management commands
async fn handle_database_command(command: DatabaseCommands, pool: &DbPool) -> Result<()> {
    match command {
        DatabaseCommands::Migrate => {
            println!("Running database migrations...");
            run_migrations(pool).await?;
            println!("Migrations completed successfully!");
        }

        DatabaseCommands::Status => {
            if validate_migrations(pool).await? {
                println!("Database schema is up to date");
            } else {
                return Err(Error::validation("Database schema has pending migrations"));
            }
        }

        DatabaseCommands::List => {
            let migrations = list_applied_migrations(pool).await?;
            if migrations.is_empty() {
                println!("No migrations have been applied");
            } else {
                println!("Applied migrations:");
                print_migrations_table(&migrations);
            }
        }
    }

    info!("database command finished");
    Ok(())
}

/// Print migrations in a formatted table
fn print_migrations_table(migrations: &[MigrationInfo]) {
    println!();
    println!("{:<15} {:<50} {:<25} {:<10}", "Version", "Description", "Applied On", "Time (ms)");
    println!("{}", "-".repeat(100));

    for migration in migrations {
        println!(
            "{:<15} {:<50} {:<25} {:<10}",
            migration.version,
            truncate_string(&migration.description, 48),
            migration.installed_on.format("%Y-%m-%d %H:%M:%S"),
            migration.execution_time
        );
    }
    println!();
}

/// Truncate string to fit in table column
fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_database_status() {
        let cli = Cli::try_parse_from(["authgate", "database", "status"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Database { command: DatabaseCommands::Status })
        ));
    }

    #[test]
    fn parses_serve_overrides() {
        let cli = Cli::try_parse_from([
            "authgate",
            "--config",
            "authgate.toml",
            "serve",
            "--port",
            "9090",
            "-H",
            "0.0.0.0",
        ])
        .unwrap();

        assert_eq!(cli.config.as_deref(), Some(std::path::Path::new("authgate.toml")));
        match cli.command {
            Some(Commands::Serve { port, host }) => {
                assert_eq!(port, Some(9090));
                assert_eq!(host.as_deref(), Some("0.0.0.0"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn no_subcommand_is_accepted() {
        let cli = Cli::try_parse_from(["authgate"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("short", 10), "short");
        assert_eq!(truncate_string("this is a very long string", 10), "this is...");
    }

    #[tokio::test]
    async fn migrate_and_list_on_memory_database() {
        let pool = crate::storage::test_helpers::memory_pool().await;
        handle_database_command(DatabaseCommands::Status, &pool).await.unwrap();
        assert!(!list_applied_migrations(&pool).await.unwrap().is_empty());
    }
}
