use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;

use podfeed::config::Config;
use podfeed::export::{write_audio_urls, write_csv, JsonExport};
use podfeed::feed::{parse_feed, ParsedFeed, ValidatedFeed};
use podfeed::http::HttpClient;
use podfeed::resolve::{Orchestrator, ResolveError, ResolutionFailure};

/// Get the config directory path (~/.config/podfeed/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    let config_dir = PathBuf::from(home).join(".config").join("podfeed");
    Ok(config_dir)
}

#[derive(Parser, Debug)]
#[command(
    name = "podfeed",
    version,
    about = "Find the RSS feed behind a podcast URL or show name"
)]
struct Args {
    /// Apple Podcasts / Spotify / website URL, or a show name to search for
    #[arg(required = true, num_args = 1..)]
    input: Vec<String>,

    /// Parse the feed and list its episodes
    #[arg(short, long)]
    episodes: bool,

    /// Number of episodes to list in text output
    #[arg(long, default_value_t = 20, value_name = "N")]
    limit: usize,

    /// Print JSON instead of text (all episodes when combined with --episodes)
    #[arg(long, conflicts_with_all = ["urls", "csv"])]
    json: bool,

    /// Print the audio URL of every episode, one per line
    #[arg(long, conflicts_with = "csv")]
    urls: bool,

    /// Print every episode as CSV (title, pub_date, duration, audio_url, description)
    #[arg(long)]
    csv: bool,

    /// Config file (default: ~/.config/podfeed/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Directory search results to try per query
    #[arg(long, value_name = "N")]
    max_candidates: Option<usize>,
}

#[derive(Serialize)]
struct FailureOutput<'a> {
    error: &'a ResolutionFailure,
    likely_exclusive: bool,
}

fn load_config(args: &Args) -> Result<Config> {
    let path = match &args.config {
        Some(path) => path.clone(),
        None => get_config_dir()?.join("config.toml"),
    };
    let mut config = Config::load(&path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;

    if let Some(timeout) = args.timeout {
        config.timeout_secs = timeout;
    }
    if let Some(max_candidates) = args.max_candidates {
        config.max_candidates = max_candidates;
    }
    config.validate().context("Invalid command-line option")?;
    Ok(config)
}

fn print_text(feed: &ValidatedFeed, parsed: Option<&ParsedFeed>, limit: usize) {
    println!("{}", feed.url());
    if feed.final_url() != feed.url() {
        println!("  served from {}", feed.final_url());
    }
    if let Some(source) = feed.source() {
        println!("  found via {source} ({})", feed.dialect());
    }

    let Some(parsed) = parsed else {
        return;
    };
    let podcast = &parsed.podcast;
    println!();
    println!("{}", podcast.title);
    if let Some(author) = &podcast.author {
        println!("  by {author}");
    }
    if let Some(link) = &podcast.link {
        println!("  {link}");
    }
    println!(
        "  {} episodes ({} with audio)",
        parsed.episodes.len(),
        parsed.downloadable().count()
    );
    println!();

    for episode in parsed.episodes.iter().take(limit) {
        let date = episode
            .published_at
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "----------".to_owned());
        let duration = episode
            .duration_seconds
            .map(format_duration)
            .unwrap_or_default();
        let title = if episode.title.is_empty() {
            "(untitled)"
        } else {
            &episode.title
        };
        let marker = if episode.is_downloadable() { ' ' } else { '!' };
        println!("{date} {marker} {title} {duration}");
    }
    if parsed.episodes.len() > limit {
        println!("... {} more", parsed.episodes.len() - limit);
    }
}

fn format_duration(seconds: u64) -> String {
    let (h, m, s) = (seconds / 3600, seconds % 3600 / 60, seconds % 60);
    if h > 0 {
        format!("[{h}:{m:02}:{s:02}]")
    } else {
        format!("[{m}:{s:02}]")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays machine-readable with --json
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;

    let client =
        HttpClient::new(&config.http_settings()).context("Failed to create HTTP client")?;
    let orchestrator = Orchestrator::new(client, &config.resolver_settings());

    let input = args.input.join(" ");
    let feed = match orchestrator.resolve(&input).await {
        Ok(feed) => feed,
        Err(ResolveError::StrategiesExhausted(failure)) => {
            if args.json {
                let output = FailureOutput {
                    likely_exclusive: failure.likely_exclusive(),
                    error: &failure,
                };
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                eprintln!("Error: {failure}");
            }
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let parsed = if args.episodes || args.urls || args.csv {
        Some(parse_feed(&feed).context("Failed to parse feed")?)
    } else {
        None
    };

    let mut stdout = std::io::stdout().lock();
    match parsed.as_ref() {
        Some(parsed) if args.urls => {
            write_audio_urls(parsed, &mut stdout).context("Failed to write audio URLs")?
        }
        Some(parsed) if args.csv => write_csv(parsed, &mut stdout).context("Failed to write CSV")?,
        _ if args.json => {
            let output = JsonExport::new(&feed, parsed.as_ref());
            serde_json::to_writer_pretty(&mut stdout, &output)?;
            writeln!(stdout)?;
        }
        _ => print_text(&feed, parsed.as_ref(), args.limit),
    }
    stdout.flush()?;

    Ok(())
}
