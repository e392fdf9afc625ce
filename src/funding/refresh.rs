// =============================================================================
// Refresh cycle — fetch, merge, rank, apply
// =============================================================================
//
// One cycle issues the three dataset requests concurrently, joins them with
// `rank`, and applies exactly one transition to the shared board. Any
// transport or body-parse failure on any request aborts the whole cycle; no
// partial results ever reach the board.
//
// The timer loop and the manual `POST /api/v1/refresh` trigger share this
// code path. A single-flight guard on AppState serialises them: whichever
// trigger arrives while a cycle is in flight is rejected, so a stale
// response can never overwrite a newer one.

use anyhow::Result;
use tracing::{debug, error, info};

use crate::app_state::{AppState, CycleOutcome};
use crate::binance::FuturesClient;
use crate::funding::rank::{rank, RankedEntry};

/// Generic message shown on the dashboard when a cycle fails. The specific
/// cause goes to the log and the diagnostics ring only.
pub const REFRESH_FAILED_MESSAGE: &str =
    "Unable to fetch exchange data. Check connectivity and retry.";

/// What happened to a refresh request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshStatus {
    /// The cycle ran to completion (the board now reflects its outcome).
    Completed,
    /// Another cycle was already in flight; this request was rejected.
    AlreadyRunning,
}

/// Run one guarded refresh cycle against `state`.
///
/// Returns [`RefreshStatus::AlreadyRunning`] without touching the board if
/// a cycle is in flight. Never returns an error: a failed cycle is a state
/// transition, not a fault.
pub async fn run_refresh_cycle(state: &AppState) -> RefreshStatus {
    if !state.begin_refresh() {
        debug!("refresh already in flight — request rejected");
        return RefreshStatus::AlreadyRunning;
    }
    // WS clients see the busy flag flip on.
    state.increment_version();

    let top_n = state.runtime_config.read().top_n;

    let outcome = match fetch_and_rank(&state.client, top_n).await {
        Ok(entries) => {
            info!(count = entries.len(), "refresh cycle complete");
            CycleOutcome::Success(entries)
        }
        Err(e) => {
            error!(error = format!("{e:#}"), "refresh cycle failed");
            state.push_error(format!("{e:#}"));
            CycleOutcome::Failure(REFRESH_FAILED_MESSAGE.to_string())
        }
    };

    // Commit the transition while still holding the single-flight slot:
    // a cycle admitted after release can never be overwritten by this one.
    // The single version bump afterwards carries the new board and the
    // cleared busy flag out to WebSocket clients in one push.
    state.apply_cycle(outcome);
    state.end_refresh();
    state.increment_version();
    RefreshStatus::Completed
}

/// Fetch the three datasets concurrently and rank the join.
///
/// The requests have no ordering dependency, but all three must succeed
/// before the join runs.
async fn fetch_and_rank(client: &FuturesClient, top_n: usize) -> Result<Vec<RankedEntry>> {
    let (funding_info, premium_index, tickers) = tokio::try_join!(
        client.get_funding_info(),
        client.get_premium_index(),
        client.get_ticker_24hr(),
    )?;

    Ok(rank(&funding_info, &premium_index, &tickers, top_n))
}
