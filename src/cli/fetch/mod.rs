//! Fetch command - drives the caller-side product client against a server

use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Args;
use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::domain::DomainError;
use crate::infrastructure::client::{ClientState, HttpProductFetcher, ProductClient};

#[derive(Args, Debug, Clone)]
pub struct FetchArgs {
    /// Product listing URL (defaults to `client.endpoint` from configuration)
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Bypass the client cache on every fetch
    #[arg(long)]
    pub force: bool,

    /// Concurrent callers per round
    #[arg(long, default_value_t = 1)]
    pub concurrency: usize,

    /// Number of rounds
    #[arg(long, default_value_t = 1)]
    pub repeat: usize,
}

/// Outcome of one round of concurrent fetches
#[derive(Debug, Clone, PartialEq)]
pub struct RoundReport {
    pub round: usize,
    pub succeeded: usize,
    pub failed: Vec<DomainError>,
    pub products: usize,
    pub state: ClientState,
    pub elapsed: Duration,
}

pub async fn run(args: FetchArgs) -> anyhow::Result<()> {
    let config = super::init_from_config()?;

    let endpoint = args
        .endpoint
        .clone()
        .unwrap_or_else(|| config.client.endpoint.clone());
    let timeout = Duration::from_secs(config.client.timeout_secs);

    let fetcher = Arc::new(HttpProductFetcher::with_timeout(endpoint.clone(), timeout)?);
    let client = ProductClient::with_timeout(fetcher, timeout);

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    info!(endpoint = %endpoint, concurrency = args.concurrency, repeat = args.repeat, "Fetching products");

    let reports = run_rounds(&client, &args, &cancel).await;
    let mut failures = 0;

    for report in &reports {
        println!(
            "round {}: {} ok, {} failed, {} products, state {:?}, {:?}",
            report.round,
            report.succeeded,
            report.failed.len(),
            report.products,
            report.state,
            report.elapsed
        );

        for error in &report.failed {
            println!("  error: {}", error);
        }

        failures += report.failed.len();
    }

    if failures > 0 {
        anyhow::bail!("{} fetches failed", failures);
    }

    Ok(())
}

/// Runs `repeat` rounds of `concurrency` simultaneous fetches
pub async fn run_rounds(
    client: &ProductClient,
    args: &FetchArgs,
    cancel: &CancellationToken,
) -> Vec<RoundReport> {
    let mut reports = Vec::with_capacity(args.repeat);

    for round in 1..=args.repeat {
        if cancel.is_cancelled() {
            warn!(round, "Fetch rounds interrupted");
            break;
        }

        let start = Instant::now();
        let results =
            join_all((0..args.concurrency.max(1)).map(|_| client.fetch(args.force, cancel))).await;

        let mut report = RoundReport {
            round,
            succeeded: 0,
            failed: Vec::new(),
            products: 0,
            state: client.state().await,
            elapsed: start.elapsed(),
        };

        for result in results {
            match result {
                Ok(products) => {
                    report.succeeded += 1;
                    report.products = products.len();
                }
                Err(e) => report.failed.push(e),
            }
        }

        reports.push(report);
    }

    reports
}
