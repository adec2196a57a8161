//! Bazaar CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! bazaar-cli migrate
//!
//! # List registered users, promote one to admin
//! bazaar-cli users list
//! bazaar-cli users promote owner@example.com
//!
//! # List pending orders
//! bazaar-cli orders list --status pending
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `users` - List users and change roles
//! - `orders` - List orders

#![cfg_attr(not(test), forbid(unsafe_code))]

use bazaar_core::Role;
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "bazaar-cli")]
#[command(author, version, about = "Bazaar CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage registered users
    Users {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Inspect orders
    Orders {
        #[command(subcommand)]
        action: OrderAction,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// List registered users
    List,
    /// Give a user the admin role
    Promote {
        /// User email address
        email: String,
    },
    /// Return an admin to the user role
    Demote {
        /// User email address
        email: String,
    },
}

#[derive(Subcommand)]
enum OrderAction {
    /// List orders, newest first
    List {
        /// Only show orders with this status (pending, confirmed, shipped, delivered)
        #[arg(short, long)]
        status: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Users { action } => match action {
            UserAction::List => commands::users::list().await?,
            UserAction::Promote { email } => commands::users::set_role(&email, Role::Admin).await?,
            UserAction::Demote { email } => commands::users::set_role(&email, Role::User).await?,
        },
        Commands::Orders { action } => match action {
            OrderAction::List { status } => commands::orders::list(status.as_deref()).await?,
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_orders_status() {
        let cli = Cli::parse_from(["bazaar-cli", "orders", "list", "--status", "pending"]);
        assert!(matches!(
            cli.command,
            Commands::Orders {
                action: OrderAction::List { status: Some(ref s) }
            } if s == "pending"
        ));
    }
}
