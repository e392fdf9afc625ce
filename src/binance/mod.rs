pub mod client;

// Re-export for convenient access (e.g. `use crate::binance::FuturesClient`).
pub use client::{FundingInfo, FuturesClient, PremiumIndex, Ticker24h, DEFAULT_BASE_URL};
