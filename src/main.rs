use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;

use feedmerge::config::Config;
use feedmerge::feed::{Aggregator, Post};

/// Get the default config file path (~/.config/feedmerge/config.toml)
fn default_config_path() -> Option<PathBuf> {
    let home = std::env::var_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("feedmerge")
            .join("config.toml"),
    )
}

#[derive(Parser, Debug)]
#[command(
    name = "feedmerge",
    about = "Fetch RSS/Atom feeds and print one merged, newest-first post list"
)]
struct Args {
    /// Feed URLs, fetched in addition to those in the config file
    #[arg(value_name = "URL")]
    urls: Vec<String>,

    /// Config file (defaults to ~/.config/feedmerge/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print one JSON object per post
    #[arg(long)]
    json: bool,

    /// Print at most this many posts
    #[arg(long, value_name = "N")]
    limit: Option<usize>,
}

fn write_post(out: &mut impl Write, post: &Post, json: bool) -> Result<()> {
    if json {
        serde_json::to_writer(&mut *out, post)?;
        writeln!(out)?;
    } else {
        writeln!(
            out,
            "{} | {} | {}",
            post.date().format("%Y-%m-%d %H:%M"),
            post.author(),
            post.title()
        )?;
        writeln!(out, "    {}", post.link())?;
        writeln!(out, "    {}", post.summary())?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing for debug logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match args.config.or_else(default_config_path) {
        Some(path) => Config::load(&path)
            .with_context(|| format!("Failed to load config file: {}", path.display()))?,
        None => Config::default(),
    };

    let mut urls = config.feeds.clone();
    urls.extend(args.urls);
    if urls.is_empty() {
        anyhow::bail!("No feeds given: pass URLs as arguments or list them under `feeds` in the config file");
    }

    let aggregator = Aggregator::from_config(&config).context("Failed to create HTTP client")?;
    let report = aggregator.fetch_all_with_report(&urls).await;

    if !report.failures.is_empty() {
        eprintln!(
            "Warning: {} of {} feeds could not be loaded",
            report.failures.len(),
            urls.len()
        );
        for failure in &report.failures {
            eprintln!("  {}", failure.error);
        }
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for post in report.posts.iter().take(args.limit.unwrap_or(usize::MAX)) {
        write_post(&mut out, post, args.json)?;
    }
    out.flush()?;

    Ok(())
}
