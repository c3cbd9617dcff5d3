//! RecipeGen Admin CLI
//!
//! Operator tool working directly on the server database.
//!
//! # Usage
//!
//! ```bash
//! recipegen-admin user list
//! recipegen-admin recipe purge
//! recipegen-admin recipe purge --user 42
//! ```
//!
//! Uses the same configuration as the server (`--config`, `RECIPEGEN_*`).

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use recipegen::config::Config;
use recipegen::db::{init_db, RecipeRepository, UserRepository};

// ============================================================================
// CLI Structure
// ============================================================================

#[derive(Parser)]
#[command(name = "recipegen-admin")]
#[command(version)]
#[command(about = "RecipeGen server administration tool")]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage users
    User(UserCommand),
    /// Manage stored recipes
    Recipe(RecipeCommand),
}

#[derive(Args)]
struct UserCommand {
    #[command(subcommand)]
    command: UserSubcommand,
}

#[derive(Subcommand)]
enum UserSubcommand {
    /// List all users
    List,
}

#[derive(Args)]
struct RecipeCommand {
    #[command(subcommand)]
    command: RecipeSubcommand,
}

#[derive(Subcommand)]
enum RecipeSubcommand {
    /// Physically remove soft-deleted recipes
    Purge {
        /// Only purge recipes owned by this user id
        #[arg(long)]
        user: Option<i64>,
    },
}

// ============================================================================
// Commands
// ============================================================================

async fn list_users(users: &UserRepository) -> Result<(), Box<dyn std::error::Error>> {
    let all = users.list().await?;

    if all.is_empty() {
        println!("No users registered.");
        return Ok(());
    }

    println!("{:<8} {:<40} {:<20} {:<20}", "ID", "EMAIL", "NAME", "CREATED");
    println!("{}", "-".repeat(90));
    for user in &all {
        println!(
            "{:<8} {:<40} {:<20} {:<20}",
            user.id,
            user.email,
            user.name,
            user.created_at.format("%Y-%m-%d %H:%M")
        );
    }

    println!();
    println!("Total: {} user(s)", all.len());
    Ok(())
}

async fn purge_recipes(
    recipes: &RecipeRepository,
    user: Option<i64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let removed = recipes.purge_deleted(user).await?;

    match user {
        Some(id) => println!("Purged {} deleted recipe(s) for user {}", removed, id),
        None => println!("Purged {} deleted recipe(s)", removed),
    }
    Ok(())
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load(cli.config)?;
    let pool = init_db(&config.database_path).await?;

    match cli.command {
        Commands::User(user_cmd) => match user_cmd.command {
            UserSubcommand::List => list_users(&UserRepository::new(pool)).await,
        },
        Commands::Recipe(recipe_cmd) => match recipe_cmd.command {
            RecipeSubcommand::Purge { user } => {
                purge_recipes(&RecipeRepository::new(pool), user).await
            }
        },
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
