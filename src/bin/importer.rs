use anyhow::{Context, Result};
use clap::Parser;
use mybookmarks::config::DatabaseConfig;
use mybookmarks::db::Database;
use mybookmarks::importer::parse_bookmarks;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "importer")]
#[command(about = "Import a browser bookmark export (bookmarks.html)")]
struct Cli {
    bookmarks_html: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let html = std::fs::read_to_string(&cli.bookmarks_html)
        .with_context(|| format!("failed to read {}", cli.bookmarks_html.display()))?;
    let bookmarks = parse_bookmarks(&html)?;

    let cfg = DatabaseConfig::from_env()?;
    let db = Database::connect(&cfg).await.context("failed to open database")?;
    let imported = db.import_bookmarks(&bookmarks).await.context("failed to save bookmarks")?;

    tracing::info!(imported, file = %cli.bookmarks_html.display(), "import finished");
    println!("imported {imported} bookmarks");

    Ok(())
}
