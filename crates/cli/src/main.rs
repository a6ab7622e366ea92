//! Threadline CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply migrations
//! tl-cli migrate
//!
//! # Load categories, suppliers, products and opening stock
//! tl-cli seed --file catalog.yaml
//!
//! # Recompute cached variant stock
//! tl-cli stock refresh [--item 12]
//!
//! # Create the first admin
//! tl-cli staff create -e lan@threadline.vn -n "Lan Nguyen" -r admin
//! ```
//!
//! Connects with `ADMIN_DATABASE_URL`, or `DATABASE_URL` when unset.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "tl-cli")]
#[command(author, version, about = "Threadline CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the catalog and opening stock from YAML
    Seed {
        /// Path to the catalog file
        #[arg(short, long)]
        file: String,
    },
    /// Manage the variant stock cache
    Stock {
        #[command(subcommand)]
        action: StockAction,
    },
    /// Manage staff accounts
    Staff {
        #[command(subcommand)]
        action: StaffAction,
    },
}

#[derive(Subcommand)]
enum StockAction {
    /// Recompute cached stock from storage lots
    Refresh {
        /// Only this product's variants
        #[arg(long)]
        item: Option<i32>,
    },
}

#[derive(Subcommand)]
enum StaffAction {
    /// Create a staff account
    Create {
        /// Staff email address
        #[arg(short, long)]
        email: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Role (`admin`, `employee`)
        #[arg(short, long, default_value = "employee")]
        role: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { file } => {
            commands::seed::from_file(&file).await?;
        }
        Commands::Stock { action } => match action {
            StockAction::Refresh { item } => {
                commands::stock::refresh(item).await?;
            }
        },
        Commands::Staff { action } => match action {
            StaffAction::Create { email, name, role } => {
                commands::staff::create(&email, &name, &role).await?;
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
    fn test_parse_stock_refresh_for_item() {
        let cli = Cli::try_parse_from(["tl-cli", "stock", "refresh", "--item", "12"]);
        assert!(matches!(
            cli.map(|c| c.command),
            Ok(Commands::Stock {
                action: StockAction::Refresh { item: Some(12) }
            })
        ));
    }

    #[test]
    fn test_staff_role_defaults_to_employee() {
        let cli = Cli::try_parse_from(["tl-cli", "staff", "create", "-e", "a@b.vn", "-n", "A"]);
        let Ok(Cli {
            command: Commands::Staff {
                action: StaffAction::Create { role, .. },
            },
        }) = cli
        else {
            panic!("expected staff create");
        };
        assert_eq!(role, "employee");
    }
}
