//! Shelfwise CLI - database migrations and user bootstrap.
//!
//! # Usage
//!
//! ```bash
//! # Apply application and session-store migrations
//! shelfwise migrate
//!
//! # Create a user (password from --password or SHELFWISE_USER_PASSWORD)
//! shelfwise user create -e owner@example.com -n "Shop Owner" -r admin
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `user create` - Create an active user with a role

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use shelfwise_core::Role;

mod commands;

#[derive(Parser)]
#[command(name = "shelfwise")]
#[command(author, version, about = "Shelfwise CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations (application tables and session store)
    Migrate,
    /// Manage users
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create a new, active user
    Create {
        /// Email address (login)
        #[arg(short, long)]
        email: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Role (`admin`, `manager`, `staff`)
        #[arg(short, long, default_value = "staff")]
        role: Role,

        /// Password (at least 8 characters)
        #[arg(long, env = "SHELFWISE_USER_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::User { action } => match action {
            UserAction::Create {
                email,
                name,
                role,
                password,
            } => {
                commands::user::create(&email, &name, role, password).await?;
            }
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_user_create() {
        let cli = Cli::try_parse_from([
            "shelfwise", "user", "create", "-e", "a@b.co", "-n", "Ann", "-r", "manager",
            "--password", "correct-horse",
        ]);
        assert!(matches!(
            cli.map(|c| c.command),
            Ok(Commands::User {
                action: UserAction::Create {
                    role: Role::Manager,
                    ..
                }
            })
        ));
    }

    #[test]
    fn test_rejects_unknown_role() {
        let cli = Cli::try_parse_from([
            "shelfwise", "user", "create", "-e", "a@b.co", "-n", "Ann", "-r", "owner",
            "--password", "correct-horse",
        ]);
        assert!(cli.is_err());
    }
}
