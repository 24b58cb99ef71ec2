mod config;
mod error;
mod flips;
mod loader;
mod model;
mod report;
mod stats;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::time::Instant;
use tracing::info;

use config::Args;
use loader::EsiClient;
use report::FilterCriteria;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let start = Instant::now();
    let now = Utc::now();

    dotenvy::dotenv().ok();
    let args = Args::parse();
    config::init_logging(&args.log_level);

    let fees = args.fees()?;
    info!(region = args.region, ?fees, "scanning region");

    let client = EsiClient::new(&args.esi_url, &args.datasource, args.region)
        .context("failed to build ESI client")?;

    let batch = loader::fetch_orders(&client)
        .await
        .context("could not load the first page of market orders")?;
    info!(
        pages = batch.pages,
        failed = batch.failed_pages.len(),
        orders = batch.orders.len(),
        skipped = batch.skipped,
        "fetched market orders"
    );

    let mut groups = flips::aggregate(batch.orders, &fees, now);

    let type_ids: Vec<i32> = groups.keys().copied().collect();
    let histories = loader::fetch_histories(&client, &type_ids).await;
    info!(
        items = type_ids.len(),
        failed = histories.failed,
        skipped = histories.skipped,
        "fetched market history"
    );
    stats::enrich_all(&mut groups, &histories.histories, now);

    let names = loader::load_names(&args.names)
        .with_context(|| format!("loading item names from {}", args.names.display()))?;

    let rows = report::build_recommendations(&groups, &names);

    for r in report::candidates(&rows, &FilterCriteria::default()) {
        println!("{}", r.item);
    }

    report::write_report(&args.output, &rows)
        .with_context(|| format!("writing {}", args.output.display()))?;

    println!("--- {} seconds ---", start.elapsed().as_secs_f64());

    Ok(())
}
