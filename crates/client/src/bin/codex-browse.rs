//! Codex catalog browser.
//!
//! Pages through the catalog from the command line the same way the web
//! client does.
//!
//! Usage:
//!   codex-browse --query "type=cryptid&sort=cost_asc" --pages 3
//!   codex-browse --query "taxa=Avian" --neighbors C-042

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

use codex_client::{
    ClientConfig, HttpCardFetcher, ListStatus, MemoryHistory, ResultOrder, UiEvent, spawn_session,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base URL of the catalog API (overrides CODEX_API_URL).
    #[arg(long)]
    base_url: Option<Url>,

    /// Filter query string, as found in the page URL.
    #[arg(long, default_value = "")]
    query: String,

    /// Number of pages to load.
    #[arg(long, default_value = "1")]
    pages: u32,

    /// Rows per page (overrides CODEX_PAGE_LIMIT).
    #[arg(long)]
    limit: Option<i64>,

    /// Print the previous and next card ids around this card.
    #[arg(long)]
    neighbors: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args = Args::parse();
    let mut config = ClientConfig::from_env().context("failed to load client configuration")?;
    if let Some(base_url) = args.base_url {
        config.base_url = base_url;
    }
    if let Some(limit) = args.limit {
        anyhow::ensure!(limit >= 1, "--limit must be at least 1");
        config.page_limit = limit;
    }

    let fetcher = Arc::new(
        HttpCardFetcher::new(config.base_url.clone(), config.request_timeout)
            .context("failed to build HTTP client")?,
    );
    let history = MemoryHistory::new();
    let session = spawn_session(fetcher.clone(), history.clone(), &config, &args.query)?;

    let mut page = 0;
    let mut issued = 0;
    loop {
        let view = session
            .wait_for(|v| {
                v.fetches_issued > issued
                    && !matches!(v.status, ListStatus::Idle | ListStatus::Loading)
            })
            .await?;
        page += 1;
        issued = view.fetches_issued;

        match &view.status {
            ListStatus::Failed(failure) => {
                anyhow::bail!("fetch failed: {}", failure.message);
            }
            ListStatus::Empty => {
                println!("no cards match");
                break;
            }
            _ => {}
        }

        if page >= args.pages || !view.has_more {
            break;
        }
        session.send(UiEvent::SentinelVisible).await?;
    }

    let view = session.view();
    for id in &view.card_ids {
        println!("{id}");
    }
    if let Some(query) = history.current() {
        println!("canonical query: {query}");
    }

    if let Some(id) = args.neighbors {
        let order = ResultOrder::load(fetcher.as_ref(), &view.filters).await?;
        match order.neighbors(&id) {
            Some(n) => println!(
                "{id}: previous={} next={}",
                n.previous.as_deref().unwrap_or("-"),
                n.next.as_deref().unwrap_or("-")
            ),
            None => println!("{id} is not in this result set"),
        }
    }

    session.shutdown().await;
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
