//! scores - mirror file-hosting trees linked from subreddit posts.

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use console::style;

use scores_dl::hosts::GoogleDriveHost;
use scores_dl::{
    AppConfig, DiskSink, FetchOptions, HostRegistry, Ledger, RedditClient, ingest,
};

fn print_usage() {
    eprintln!("Usage: scores [OPTIONS] [url]...");
    eprintln!();
    eprintln!("Modes:");
    eprintln!("  --ingest            Search the configured subreddit and fetch linked trees");
    eprintln!("  (default)           Fetch the given URLs directly");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --config <FILE>     Config file (default: <config dir>/scores-dl/config.toml)");
    eprintln!("  --data-dir <DIR>    Root directory for fetched trees");
    eprintln!("  --overwrite         Re-process posts already in the ledger");
    eprintln!("  -h, --help          Show this help");
}

#[derive(Debug, Default, PartialEq, Eq)]
struct Args {
    ingest: bool,
    overwrite: bool,
    help: bool,
    config: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    urls: Vec<String>,
}

fn parse_args<I: Iterator<Item = String>>(mut args: I) -> Result<Args, String> {
    let mut parsed = Args::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--ingest" => parsed.ingest = true,
            "--overwrite" => parsed.overwrite = true,
            "-h" | "--help" => parsed.help = true,
            "--config" => {
                let value = args.next().ok_or("--config requires a value")?;
                parsed.config = Some(PathBuf::from(value));
            }
            "--data-dir" => {
                let value = args.next().ok_or("--data-dir requires a value")?;
                parsed.data_dir = Some(PathBuf::from(value));
            }
            other if other.starts_with('-') => {
                return Err(format!("unknown option: {other}"));
            }
            _ => parsed.urls.push(arg),
        }
    }
    Ok(parsed)
}

#[tokio::main]
async fn main() -> scores_dl::Result<()> {
    env_logger::init();

    let args = match parse_args(env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {e}");
            print_usage();
            std::process::exit(1);
        }
    };

    if args.help || (!args.ingest && args.urls.is_empty()) {
        print_usage();
        return Ok(());
    }

    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(data_dir) = args.data_dir {
        config.paths.data_dir = data_dir;
    }
    if args.overwrite {
        config.fetch.overwrite = true;
    }

    println!("Connecting to Google Drive...");
    let drive = GoogleDriveHost::connect(&config.paths.drive_secrets).await?;
    let mut registry = HostRegistry::new();
    registry.register(Arc::new(drive));

    let sink = DiskSink::new();

    if args.ingest {
        println!("Searching r/{}...", config.fetch.subreddit);
        let source = RedditClient::connect(
            &config.paths.reddit_secrets,
            &config.fetch.subreddit,
            &config.fetch.search_query,
            config.fetch.search_limit,
        )
        .await?;

        let mut ledger = Ledger::load(&config.paths.ledger_path)?;
        let stats = ingest::run(
            &source,
            &registry,
            &mut ledger,
            &config.paths.ledger_path,
            &config.fetch,
            &config.paths.data_dir,
            &sink,
        )
        .await?;

        println!();
        println!(
            "{} {} post(s) processed, {} skipped, {} tree(s) fetched",
            style("✓").green(),
            stats.posts_processed,
            stats.posts_skipped,
            stats.trees_fetched,
        );
        if stats.urls_unmatched > 0 {
            println!(
                "{} {} URL(s) had no matching host interface",
                style("!").yellow(),
                stats.urls_unmatched
            );
        }
    } else {
        for url in &args.urls {
            println!("Processing: {url}");
            let host = match registry.resolve(url) {
                Ok(host) => host,
                Err(e) => {
                    eprintln!("{} {e}", style("!").yellow());
                    continue;
                }
            };
            let options = FetchOptions::new(&config.paths.data_dir);
            match host.fetch(url, true, &options, &sink).await {
                Ok((tree, head)) => println!(
                    "{} fetched {} node(s)",
                    style("✓").green(),
                    tree.descendants(head).count()
                ),
                Err(e) => eprintln!("{} fetching {url} failed: {e}", style("✗").red()),
            }
            println!();
        }
    }

    Ok(())
}
