//! Merge binary: copy runs from one or more source databases into a target.
//!
//! ```text
//! censere-merge <target-url> <source-url> [<source-url> ...]
//! ```
//!
//! Each source is copied in its own transaction. A source holding a
//! simulation ID the target already has is rejected whole and the merge
//! stops there.

use anyhow::{Context, bail};
use censere_db::{PostgresPool, merge_databases};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let mut args = std::env::args().skip(1);
    let Some(target_url) = args.next() else {
        bail!("usage: censere-merge <target-url> <source-url> [<source-url> ...]");
    };
    let source_urls: Vec<String> = args.collect();
    if source_urls.is_empty() {
        bail!("at least one source database is required");
    }

    let target = PostgresPool::connect_url(&target_url)
        .await
        .context("connecting to target database")?;
    target
        .run_migrations()
        .await
        .context("migrating target database")?;

    let mut sources = Vec::with_capacity(source_urls.len());
    for url in &source_urls {
        let source = PostgresPool::connect_url(url)
            .await
            .with_context(|| format!("connecting to source database {url}"))?;
        sources.push(source.pool().clone());
    }

    let counts = merge_databases(target.pool(), &sources)
        .await
        .context("merging databases")?;
    info!(
        sources = sources.len(),
        simulations = counts.simulations,
        summaries = counts.summaries,
        snapshots = counts.snapshots,
        "Merge complete"
    );

    target.close().await;
    Ok(())
}
