//! Metric names emitted by the collector and relay.
//!
//! Kept as constants so dashboards and tests reference one spelling.

/// Counter: connections accepted.
pub const SESSIONS_OPENED_TOTAL: &str = "collector_sessions_opened_total";
/// Counter: sessions ended, for any reason.
pub const SESSIONS_CLOSED_TOTAL: &str = "collector_sessions_closed_total";
/// Gauge: sessions currently live.
pub const SESSIONS_ACTIVE: &str = "collector_sessions_active";
/// Counter: handshakes rejected.
pub const AUTH_FAILURES_TOTAL: &str = "collector_auth_failures_total";
/// Counter: authenticated frames received, labeled by tag.
pub const FRAMES_TOTAL: &str = "collector_frames_total";
/// Counter: authenticated frames that failed to decode.
pub const DECODE_ERRORS_TOTAL: &str = "collector_decode_errors_total";
/// Counter: events handed to the session manager, labeled by tag.
pub const EVENTS_DISPATCHED_TOTAL: &str = "collector_events_dispatched_total";
/// Counter: frames accepted onto a relay queue.
pub const RELAY_ENQUEUED_TOTAL: &str = "relay_frames_enqueued_total";
/// Counter: frames dropped because a relay queue was full or closed.
pub const RELAY_DROPPED_TOTAL: &str = "relay_frames_dropped_total";
/// Counter: upstream connections re-established after a failure.
pub const RELAY_RECONNECTS_TOTAL: &str = "relay_reconnects_total";
