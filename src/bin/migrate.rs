use anyhow::{Context, Result};
use clap::Parser;
use mybookmarks::config::DatabaseConfig;
use mybookmarks::db::Database;

#[derive(Parser)]
#[command(name = "migrate")]
#[command(about = "Create the bookmarks, tags and bookmark_tags tables")]
struct Cli {}

#[tokio::main]
async fn main() -> Result<()> {
    Cli::parse();
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cfg = DatabaseConfig::from_env()?;
    let db = Database::connect(&cfg).await.context("failed to open database")?;
    let applied = db.migrate().await?;

    if applied.is_empty() {
        println!("schema is up to date");
    } else {
        for name in applied {
            println!("applied {name}");
        }
    }

    Ok(())
}
