//! digiful CLI - Database migrations and key management.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! digiful-cli migrate
//!
//! # Generate a value for ENCRYPTION_KEY
//! digiful-cli keygen
//!
//! # Verify the configured ENCRYPTION_KEY
//! digiful-cli encrypt-check
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `keygen` - Print a random 32-byte hex key
//! - `encrypt-check` - Round-trip a probe value through the credential codec

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "digiful-cli")]
#[command(author, version, about = "digiful CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Generate a new encryption key
    Keygen,
    /// Check that ENCRYPTION_KEY can encrypt and decrypt
    EncryptCheck,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

#[allow(clippy::print_stdout)]
async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Keygen => println!("{}", commands::keys::keygen()),
        Commands::EncryptCheck => {
            let iv = commands::keys::encrypt_check()?;
            tracing::info!(iv = %iv, "ENCRYPTION_KEY round trip succeeded");
        }
    }
    Ok(())
}
