// =============================================================================
// Funding-Rate Aggregator
// =============================================================================
//
// Joins three independent datasets from the Binance Futures API into a
// ranked view of the highest annualized funding yields:
//
//   1. fundingInfo   — settlement interval per symbol
//   2. premiumIndex  — current funding rate per symbol
//   3. ticker/24hr   — 24 h quote volume per symbol
//
// `rank` is the pure join/compute/sort stage; `refresh` wraps it in the
// guarded fetch cycle that the timer and the manual trigger share.

pub mod rank;
pub mod refresh;

pub use rank::{format_volume, rank, RankedEntry};
pub use refresh::{run_refresh_cycle, RefreshStatus, REFRESH_FAILED_MESSAGE};
