// =============================================================================
// Funding APR ranking — the join/compute/sort stage of a refresh cycle
// =============================================================================
//
// Three datasets keyed by symbol are merged into one ranked view:
//
//   fundingInfo   → settlement interval in hours
//   premiumIndex  → last funding rate (string-encoded, may be absent)
//   ticker/24hr   → 24 h quote volume (string-encoded)
//
// A symbol qualifies only if it appears in all three with a parseable,
// non-empty rate. Qualifiers are scored by annualized funding yield:
//
//   apr = |rate| * (24 / interval_hours) * 365 * 100
//
// The sign of the rate is kept for display but not for ranking — a deeply
// negative rate is just as harvestable as a positive one.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::binance::{FundingInfo, PremiumIndex, Ticker24h};

/// One row of the ranked funding board.
///
/// Rebuilt from scratch every refresh cycle; nothing carries over from the
/// previous cycle except the symbol string itself.
#[derive(Debug, Clone, Serialize)]
pub struct RankedEntry {
    pub symbol: String,
    /// Last funding rate as a percentage, 4 decimal places, sign preserved.
    pub rate_percent: String,
    /// Settlement interval in hours.
    pub interval_hours: f64,
    /// 24 h quote-asset volume.
    pub volume: f64,
    /// Human-readable volume for the dashboard card (e.g. "5.00B").
    pub volume_display: String,
    /// Annualized rate as a percentage, 2 decimal places.
    pub apr_percent: String,
    /// Unrounded annualized rate — the ranking key.
    pub apr_raw: f64,
}

/// Build symbol → settlement-interval-hours from the fundingInfo dataset.
///
/// Zero or negative intervals would make the settlements-per-day division
/// meaningless, so those symbols are treated as having no interval at all.
pub fn build_interval_map(funding_info: &[FundingInfo]) -> HashMap<String, f64> {
    funding_info
        .iter()
        .filter(|item| item.funding_interval_hours > 0.0)
        .map(|item| (item.symbol.clone(), item.funding_interval_hours))
        .collect()
}

/// Build symbol → 24 h quote volume from the ticker dataset.
///
/// Unparsable and zero volumes are dropped here, so a zero-volume symbol can
/// never qualify downstream (matches the upstream dashboard's behaviour).
pub fn build_volume_map(tickers: &[Ticker24h]) -> HashMap<String, f64> {
    tickers
        .iter()
        .filter_map(|item| {
            let vol: f64 = item.quote_volume.parse().ok()?;
            if vol.is_finite() && vol != 0.0 {
                Some((item.symbol.clone(), vol))
            } else {
                None
            }
        })
        .collect()
}

/// Join the three datasets, compute APR per qualifying symbol, and return
/// the top `top_n` entries sorted strictly descending by raw APR.
///
/// A record with a missing, empty, or unparsable rate is skipped; it never
/// aborts the cycle.
pub fn rank(
    funding_info: &[FundingInfo],
    premium_index: &[PremiumIndex],
    tickers: &[Ticker24h],
    top_n: usize,
) -> Vec<RankedEntry> {
    let intervals = build_interval_map(funding_info);
    let volumes = build_volume_map(tickers);

    let mut entries: Vec<RankedEntry> = Vec::new();

    for snap in premium_index {
        let Some(&interval) = intervals.get(&snap.symbol) else {
            continue;
        };
        let Some(&volume) = volumes.get(&snap.symbol) else {
            continue;
        };

        let raw_rate = match snap.last_funding_rate.as_deref() {
            Some(s) if !s.is_empty() => s,
            _ => continue,
        };
        let rate: f64 = match raw_rate.parse() {
            Ok(r) => r,
            Err(_) => {
                debug!(symbol = %snap.symbol, raw = raw_rate, "unparsable funding rate — skipping record");
                continue;
            }
        };
        // Exchange payloads can carry "-0.00000000"; render it unsigned.
        let rate = if rate == 0.0 { 0.0 } else { rate };

        let times_per_day = 24.0 / interval;
        let apr_raw = rate.abs() * times_per_day * 365.0 * 100.0;

        entries.push(RankedEntry {
            symbol: snap.symbol.clone(),
            rate_percent: format!("{:.4}", rate * 100.0),
            interval_hours: interval,
            volume,
            volume_display: format_volume(volume),
            apr_percent: format!("{apr_raw:.2}"),
            apr_raw,
        });
    }

    entries.sort_by(|a, b| b.apr_raw.total_cmp(&a.apr_raw));
    entries.truncate(top_n);
    entries
}

/// Human-readable volume: billions and millions get a two-decimal suffix,
/// everything below is comma-grouped.
pub fn format_volume(value: f64) -> String {
    if value >= 1e9 {
        format!("{:.2}B", value / 1e9)
    } else if value >= 1e6 {
        format!("{:.2}M", value / 1e6)
    } else {
        group_thousands(value)
    }
}

/// Comma-group the integer part; keep up to three fractional digits with
/// trailing zeros trimmed.
fn group_thousands(value: f64) -> String {
    let scaled = (value.abs() * 1000.0).round() as u64;
    let int_part = scaled / 1000;
    let frac_millis = scaled % 1000;

    let digits = int_part.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 4);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }

    if frac_millis > 0 {
        out.push('.');
        let frac = format!("{frac_millis:03}");
        out.push_str(frac.trim_end_matches('0'));
    }

    if value < 0.0 {
        format!("-{out}")
    } else {
        out
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn info(symbol: &str, hours: f64) -> FundingInfo {
        FundingInfo {
            symbol: symbol.to_string(),
            funding_interval_hours: hours,
        }
    }

    fn premium(symbol: &str, rate: Option<&str>) -> PremiumIndex {
        PremiumIndex {
            symbol: symbol.to_string(),
            last_funding_rate: rate.map(|s| s.to_string()),
        }
    }

    fn ticker(symbol: &str, quote_volume: &str) -> Ticker24h {
        Ticker24h {
            symbol: symbol.to_string(),
            quote_volume: quote_volume.to_string(),
        }
    }

    #[test]
    fn btcusdt_example_numbers() {
        // 0.0015 at an 8 h interval: 3 settlements/day, APR 164.25 %.
        let entries = rank(
            &[info("BTCUSDT", 8.0)],
            &[premium("BTCUSDT", Some("0.0015"))],
            &[ticker("BTCUSDT", "5000000000")],
            3,
        );
        assert_eq!(entries.len(), 1);
        let e = &entries[0];
        assert_eq!(e.rate_percent, "0.1500");
        assert!((e.apr_raw - 164.25).abs() < 1e-9);
        assert_eq!(e.apr_percent, "164.25");
        assert!((e.volume - 5e9).abs() < f64::EPSILON);
        assert_eq!(e.volume_display, "5.00B");
        assert!((e.interval_hours - 8.0).abs() < f64::EPSILON);
    }

    #[test]
    fn sorts_descending_and_truncates_to_top_n() {
        let infos = vec![
            info("AUSDT", 8.0),
            info("BUSDT", 4.0),
            info("CUSDT", 8.0),
            info("DUSDT", 1.0),
        ];
        let premiums = vec![
            premium("AUSDT", Some("0.0001")),
            premium("BUSDT", Some("0.0005")),
            premium("CUSDT", Some("0.0004")),
            premium("DUSDT", Some("0.0003")),
        ];
        let tickers = vec![
            ticker("AUSDT", "1000000"),
            ticker("BUSDT", "1000000"),
            ticker("CUSDT", "1000000"),
            ticker("DUSDT", "1000000"),
        ];

        let entries = rank(&infos, &premiums, &tickers, 3);
        assert_eq!(entries.len(), 3);
        // DUSDT: 0.0003 * 24 = 0.0072/day; BUSDT: 0.0005 * 6 = 0.003;
        // CUSDT: 0.0004 * 3 = 0.0012; AUSDT drops off the board.
        assert_eq!(entries[0].symbol, "DUSDT");
        assert_eq!(entries[1].symbol, "BUSDT");
        assert_eq!(entries[2].symbol, "CUSDT");
        assert!(entries[0].apr_raw > entries[1].apr_raw);
        assert!(entries[1].apr_raw > entries[2].apr_raw);
    }

    #[test]
    fn output_never_exceeds_qualifying_count() {
        let entries = rank(
            &[info("BTCUSDT", 8.0)],
            &[premium("BTCUSDT", Some("0.0001"))],
            &[ticker("BTCUSDT", "1000000")],
            3,
        );
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn symbol_missing_from_any_source_is_excluded() {
        // No interval entry.
        assert!(rank(
            &[],
            &[premium("BTCUSDT", Some("0.001"))],
            &[ticker("BTCUSDT", "1000000")],
            3,
        )
        .is_empty());

        // No volume entry.
        assert!(rank(
            &[info("BTCUSDT", 8.0)],
            &[premium("BTCUSDT", Some("0.001"))],
            &[],
            3,
        )
        .is_empty());

        // No premium snapshot.
        assert!(rank(&[info("BTCUSDT", 8.0)], &[], &[ticker("BTCUSDT", "1000000")], 3).is_empty());
    }

    #[test]
    fn null_empty_or_unparsable_rate_is_excluded() {
        let infos = vec![info("AUSDT", 8.0), info("BUSDT", 8.0), info("CUSDT", 8.0)];
        let tickers = vec![
            ticker("AUSDT", "1000000"),
            ticker("BUSDT", "1000000"),
            ticker("CUSDT", "1000000"),
        ];
        let premiums = vec![
            premium("AUSDT", None),
            premium("BUSDT", Some("")),
            premium("CUSDT", Some("not-a-number")),
        ];

        assert!(rank(&infos, &premiums, &tickers, 3).is_empty());
    }

    #[test]
    fn bad_record_does_not_poison_the_rest() {
        let infos = vec![info("GOODUSDT", 8.0), info("BADUSDT", 8.0)];
        let tickers = vec![ticker("GOODUSDT", "1000000"), ticker("BADUSDT", "1000000")];
        let premiums = vec![
            premium("BADUSDT", Some("garbage")),
            premium("GOODUSDT", Some("0.0002")),
        ];

        let entries = rank(&infos, &premiums, &tickers, 3);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].symbol, "GOODUSDT");
    }

    #[test]
    fn zero_or_negative_interval_is_excluded() {
        let premiums = vec![premium("ZEROUSDT", Some("0.001")), premium("NEGUSDT", Some("0.001"))];
        let tickers = vec![ticker("ZEROUSDT", "1000000"), ticker("NEGUSDT", "1000000")];
        let infos = vec![info("ZEROUSDT", 0.0), info("NEGUSDT", -8.0)];

        assert!(rank(&infos, &premiums, &tickers, 3).is_empty());
    }

    #[test]
    fn zero_volume_is_excluded() {
        let entries = rank(
            &[info("BTCUSDT", 8.0)],
            &[premium("BTCUSDT", Some("0.001"))],
            &[ticker("BTCUSDT", "0.00")],
            3,
        );
        assert!(entries.is_empty());
    }

    #[test]
    fn negative_rate_keeps_sign_in_display_but_ranks_by_magnitude() {
        let entries = rank(
            &[info("AUSDT", 8.0), info("BUSDT", 8.0)],
            &[
                premium("AUSDT", Some("-0.0020")),
                premium("BUSDT", Some("0.0010")),
            ],
            &[ticker("AUSDT", "1000000"), ticker("BUSDT", "1000000")],
            3,
        );
        assert_eq!(entries[0].symbol, "AUSDT");
        assert_eq!(entries[0].rate_percent, "-0.2000");
        assert!(entries[0].apr_raw > 0.0);
    }

    #[test]
    fn negative_zero_rate_renders_unsigned() {
        let entries = rank(
            &[info("BTCUSDT", 8.0)],
            &[premium("BTCUSDT", Some("-0.00000000"))],
            &[ticker("BTCUSDT", "1000000")],
            3,
        );
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].rate_percent, "0.0000");
        assert_eq!(entries[0].apr_percent, "0.00");
    }

    #[test]
    fn format_volume_suffixes() {
        assert_eq!(format_volume(2_500_000_000.0), "2.50B");
        assert_eq!(format_volume(3_400_000.0), "3.40M");
        assert_eq!(format_volume(999.0), "999");
    }

    #[test]
    fn format_volume_groups_small_values() {
        assert_eq!(format_volume(123_456.0), "123,456");
        assert_eq!(format_volume(1_234.5), "1,234.5");
        assert_eq!(format_volume(0.0), "0");
    }
}
