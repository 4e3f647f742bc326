use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use provenance_feed::app::{App, AppEvent};
use provenance_feed::config::Config;
use provenance_feed::feed::FeedClient;
use provenance_feed::http::build_client;
use provenance_feed::presenter::provenance_link_for_id;
use provenance_feed::provenance::{BadgeCache, ProvenanceClient, ProvenanceLinks};
use provenance_feed::render::{render, RenderOptions, DEFAULT_WIDTH};
use provenance_feed::theme::{EnvAppearance, FileStore, Theme, ThemeMarker, ThemeStore};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Get the config directory path (~/.config/provenance-feed/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("provenance-feed"))
}

#[derive(Parser, Debug)]
#[command(
    name = "provenance-feed",
    about = "Chronological feed with best-effort provenance trust badges"
)]
struct Args {
    /// Number of feed items to load (defaults to the config value)
    #[arg(long)]
    limit: Option<usize>,

    /// Set and remember the theme (light or dark)
    #[arg(long, value_name = "THEME")]
    theme: Option<Theme>,

    /// Flip the remembered theme
    #[arg(long, conflicts_with = "theme")]
    toggle_theme: bool,

    /// Output width in columns
    #[arg(long, default_value_t = DEFAULT_WIDTH)]
    width: usize,

    /// Disable coloured output
    #[arg(long)]
    no_color: bool,

    /// Seconds to wait for badges before rendering what has arrived
    #[arg(long, default_value_t = 10)]
    wait_secs: u64,

    /// Config file (defaults to ~/.config/provenance-feed/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Open the provenance view for a content id in the browser
    Open {
        /// Content id, e.g. nyt:123
        content_id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing for debug logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config_dir = get_config_dir()?;
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?
        .with_env_overrides();

    let links = ProvenanceLinks::new(config.provenance_base()?, config.link_style);

    if let Some(Command::Open { content_id }) = &args.command {
        let link = provenance_link_for_id(content_id, &links);
        println!("{link}");
        open::that(&link).with_context(|| format!("Failed to open {link}"))?;
        return Ok(());
    }

    let http = build_client(config.request_timeout()).context("Failed to build HTTP client")?;
    let feed_client = FeedClient::new(http.clone(), config.api_base()?);
    let badges = BadgeCache::init_global(ProvenanceClient::new(http, config.provenance_base()?));

    let theme = ThemeStore::new(
        Arc::new(FileStore::new(&config_dir)),
        Arc::new(EnvAppearance),
        ThemeMarker::root().clone(),
    );
    if let Some(choice) = args.theme {
        theme.set_user_theme(choice);
    } else if args.toggle_theme {
        theme.toggle();
    }

    let limit = args.limit.unwrap_or(config.feed_limit);
    let mut app = App::new(theme, feed_client, badges.clone(), links, limit);

    let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(64);
    app.mount(event_tx.clone());

    let deadline = tokio::time::sleep(Duration::from_secs(args.wait_secs));
    tokio::pin!(deadline);

    while !app.is_settled() {
        tokio::select! {
            Some(event) = event_rx.recv() => app.handle_event(event, &event_tx),
            _ = &mut deadline => {
                tracing::info!("Wait elapsed, rendering partial results");
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
        }
    }

    let output = render(
        &app,
        &RenderOptions {
            width: args.width,
            color: !args.no_color,
        },
    );
    app.unmount();
    print!("{output}");

    Ok(())
}
