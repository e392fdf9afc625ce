// =============================================================================
// Central Application State — funding-radar
// =============================================================================
//
// Single source of truth for the service. Every async task holds an
// `Arc<AppState>`; the REST handlers and the WebSocket push feed read from
// it, the refresh cycle writes to it.
//
// Thread safety:
//   - Atomic counters for lock-free version tracking and the single-flight
//     refresh guard.
//   - parking_lot::RwLock for the funding board and error log.
//
// The funding board is only ever mutated through `apply_cycle`, one whole
// transition per refresh outcome. Nothing is partially updated.
// =============================================================================

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;

use crate::binance::FuturesClient;
use crate::funding::RankedEntry;
use crate::runtime_config::RuntimeConfig;

/// Maximum number of recent errors to retain.
const MAX_RECENT_ERRORS: usize = 50;

// =============================================================================
// Board + cycle outcome
// =============================================================================

/// The latest ranked funding view plus its freshness/error metadata.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FundingBoard {
    /// Top entries by annualized funding yield, strictly descending.
    pub entries: Vec<RankedEntry>,
    /// RFC 3339 timestamp of the last successful cycle.
    pub last_updated: Option<String>,
    /// User-facing message from the most recent failed cycle; cleared on
    /// the next success.
    pub error: Option<String>,
}

/// Result of one refresh cycle, applied as a single state transition.
#[derive(Debug)]
pub enum CycleOutcome {
    /// Fresh ranked list — replaces the board wholesale.
    Success(Vec<RankedEntry>),
    /// Generic user-facing message; the previous entries stay on display.
    Failure(String),
}

// =============================================================================
// Error record
// =============================================================================

/// A recorded error event for diagnostics (never shown verbatim on the
/// dashboard).
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    pub message: String,
    /// ISO 8601 timestamp.
    pub at: String,
}

// =============================================================================
// AppState
// =============================================================================

/// Central application state shared across all async tasks via `Arc<AppState>`.
pub struct AppState {
    // ── Version tracking ────────────────────────────────────────────────
    /// Monotonically increasing version counter, bumped on every board
    /// mutation. The WebSocket feed uses this to detect changes.
    pub state_version: AtomicU64,

    /// WebSocket message sequence number (incremented per message sent).
    pub ws_sequence_number: AtomicU64,

    // ── Refresh cycle ───────────────────────────────────────────────────
    /// Single-flight guard: exactly one refresh cycle may run at a time.
    /// Doubles as the dashboard's busy flag.
    pub refresh_in_flight: AtomicBool,

    // ── Configuration ───────────────────────────────────────────────────
    pub runtime_config: RwLock<RuntimeConfig>,

    // ── Exchange access ─────────────────────────────────────────────────
    pub client: FuturesClient,

    // ── Funding board ───────────────────────────────────────────────────
    pub board: RwLock<FundingBoard>,

    // ── Error log ───────────────────────────────────────────────────────
    pub recent_errors: RwLock<Vec<ErrorRecord>>,

    // ── Timing ──────────────────────────────────────────────────────────
    /// Instant when the service was started. Used for uptime calculations.
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Construct a new `AppState` from the given runtime configuration.
    /// The returned value is typically wrapped in `Arc` immediately.
    pub fn new(config: RuntimeConfig) -> Self {
        let client = FuturesClient::new(config.base_url.clone());

        Self {
            state_version: AtomicU64::new(1),
            ws_sequence_number: AtomicU64::new(0),
            refresh_in_flight: AtomicBool::new(false),
            runtime_config: RwLock::new(config),
            client,
            board: RwLock::new(FundingBoard::default()),
            recent_errors: RwLock::new(Vec::new()),
            start_time: std::time::Instant::now(),
        }
    }

    // ── Version management ──────────────────────────────────────────────

    /// Atomically increment the state version. Call this after every
    /// meaningful mutation so WebSocket clients see fresh data.
    pub fn increment_version(&self) -> u64 {
        self.state_version.fetch_add(1, Ordering::SeqCst)
    }

    /// Read the current state version without modifying it.
    pub fn current_state_version(&self) -> u64 {
        self.state_version.load(Ordering::SeqCst)
    }

    // ── Refresh guard ───────────────────────────────────────────────────

    /// Try to claim the single-flight refresh slot. Returns `false` when a
    /// cycle is already in flight.
    pub fn begin_refresh(&self) -> bool {
        self.refresh_in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Release the refresh slot after a cycle completes, success or not.
    pub fn end_refresh(&self) {
        self.refresh_in_flight.store(false, Ordering::SeqCst);
    }

    /// Whether a refresh cycle is currently running.
    pub fn is_refreshing(&self) -> bool {
        self.refresh_in_flight.load(Ordering::SeqCst)
    }

    // ── Board transitions ───────────────────────────────────────────────

    /// Apply one refresh outcome to the board.
    ///
    /// Success replaces the entry list wholesale and stamps the time; a
    /// failure records the display message and leaves the previous entries
    /// untouched (empty if no cycle has ever succeeded).
    ///
    /// This is the transition only — the refresh cycle bumps the state
    /// version itself, after it has also released the single-flight slot,
    /// so WebSocket clients pick up the new board and the cleared busy
    /// flag in one push.
    pub fn apply_cycle(&self, outcome: CycleOutcome) {
        let mut board = self.board.write();
        match outcome {
            CycleOutcome::Success(entries) => {
                board.entries = entries;
                board.last_updated = Some(Utc::now().to_rfc3339());
                board.error = None;
            }
            CycleOutcome::Failure(message) => {
                board.error = Some(message);
            }
        }
    }

    // ── Error logging ───────────────────────────────────────────────────

    /// Record an error message for diagnostics. The ring buffer is capped
    /// at [`MAX_RECENT_ERRORS`]; oldest entries are evicted first.
    pub fn push_error(&self, msg: String) {
        let record = ErrorRecord {
            message: msg,
            at: Utc::now().to_rfc3339(),
        };

        let mut errors = self.recent_errors.write();
        errors.push(record);
        while errors.len() > MAX_RECENT_ERRORS {
            errors.remove(0);
        }
    }

    // ── Snapshot builder ────────────────────────────────────────────────

    /// Build a complete, serialisable snapshot of the service state.
    ///
    /// This is the payload for `GET /api/v1/state` and the WebSocket push
    /// feed.
    pub fn build_snapshot(&self) -> StateSnapshot {
        let config = self.runtime_config.read();

        StateSnapshot {
            state_version: self.current_state_version(),
            server_time: Utc::now().timestamp_millis(),
            refreshing: self.is_refreshing(),
            board: self.board.read().clone(),
            recent_errors: self.recent_errors.read().clone(),
            uptime_secs: self.start_time.elapsed().as_secs(),
            config: ConfigSummary {
                poll_interval_secs: config.poll_interval_secs,
                top_n: config.top_n,
            },
        }
    }
}

// =============================================================================
// Serialisable snapshot types
// =============================================================================

/// Full service state snapshot sent to the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    pub state_version: u64,
    pub server_time: i64,
    pub refreshing: bool,
    pub board: FundingBoard,
    pub recent_errors: Vec<ErrorRecord>,
    pub uptime_secs: u64,
    pub config: ConfigSummary,
}

/// The subset of runtime config the dashboard cares about.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigSummary {
    pub poll_interval_secs: u64,
    pub top_n: usize,
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn entry(symbol: &str, apr_raw: f64) -> RankedEntry {
        RankedEntry {
            symbol: symbol.to_string(),
            rate_percent: "0.0100".to_string(),
            interval_hours: 8.0,
            volume: 1_000_000.0,
            volume_display: "1.00M".to_string(),
            apr_percent: format!("{apr_raw:.2}"),
            apr_raw,
        }
    }

    #[test]
    fn success_replaces_board_and_clears_error() {
        let state = AppState::new(RuntimeConfig::default());
        state.apply_cycle(CycleOutcome::Failure("down".to_string()));
        state.apply_cycle(CycleOutcome::Success(vec![entry("BTCUSDT", 100.0)]));

        let board = state.board.read();
        assert_eq!(board.entries.len(), 1);
        assert_eq!(board.entries[0].symbol, "BTCUSDT");
        assert!(board.error.is_none());
        assert!(board.last_updated.is_some());
    }

    #[test]
    fn failure_preserves_previous_entries() {
        let state = AppState::new(RuntimeConfig::default());
        state.apply_cycle(CycleOutcome::Success(vec![
            entry("BTCUSDT", 100.0),
            entry("ETHUSDT", 50.0),
        ]));
        let stamp = state.board.read().last_updated.clone();

        state.apply_cycle(CycleOutcome::Failure("down".to_string()));

        let board = state.board.read();
        assert_eq!(board.entries.len(), 2);
        assert_eq!(board.error.as_deref(), Some("down"));
        assert_eq!(board.last_updated, stamp);
    }

    #[test]
    fn first_failure_leaves_board_empty_with_error() {
        let state = AppState::new(RuntimeConfig::default());
        state.apply_cycle(CycleOutcome::Failure("down".to_string()));

        let board = state.board.read();
        assert!(board.entries.is_empty());
        assert_eq!(board.error.as_deref(), Some("down"));
        assert!(board.last_updated.is_none());
    }

    #[test]
    fn consecutive_successes_replace_wholesale() {
        let state = AppState::new(RuntimeConfig::default());
        state.apply_cycle(CycleOutcome::Success(vec![entry("AUSDT", 10.0)]));
        state.apply_cycle(CycleOutcome::Success(vec![entry("BUSDT", 20.0)]));

        let board = state.board.read();
        assert_eq!(board.entries.len(), 1);
        assert_eq!(board.entries[0].symbol, "BUSDT");
    }

    #[test]
    fn apply_cycle_is_the_transition_only() {
        // Version bumps belong to the refresh cycle, after the slot is
        // released, so the board and the busy flag change in one push.
        let state = AppState::new(RuntimeConfig::default());
        let v0 = state.current_state_version();
        state.apply_cycle(CycleOutcome::Success(vec![entry("BTCUSDT", 100.0)]));
        assert_eq!(state.current_state_version(), v0);
        assert_eq!(state.board.read().entries.len(), 1);
    }

    #[test]
    fn single_flight_guard_rejects_overlap() {
        let state = AppState::new(RuntimeConfig::default());
        assert!(state.begin_refresh());
        assert!(state.is_refreshing());
        assert!(!state.begin_refresh());
        state.end_refresh();
        assert!(!state.is_refreshing());
        assert!(state.begin_refresh());
    }

    #[test]
    fn error_ring_is_capped() {
        let state = AppState::new(RuntimeConfig::default());
        for i in 0..60 {
            state.push_error(format!("error {i}"));
        }
        let errors = state.recent_errors.read();
        assert_eq!(errors.len(), 50);
        assert_eq!(errors[0].message, "error 10");
        assert_eq!(errors[49].message, "error 59");
    }
}
