//! Timeout and buffering configuration injected into sessions.
//!
//! The engine reads every tunable from an explicit [`MsrpConfig`] value
//! passed to the manager or session constructor; there is no process-wide
//! settings singleton.

use std::time::Duration;

/// Tunables consumed by [`MsrpSession`](crate::session::MsrpSession) and
/// the connection tasks.
#[derive(Clone, Copy, Debug)]
pub struct MsrpConfig {
    /// Bound on a single request/response wait, and the per-wave timeout
    /// while draining pipelined chunk acknowledgments. The wave timer
    /// resets on every response so slow but steady peers are not
    /// penalised.
    pub request_timeout: Duration,
    /// Bound on waiting for success REPORTs to cover the full message
    /// size.
    pub report_timeout: Duration,
    /// Age after which an unanswered transaction-info entry is evicted.
    pub transaction_expiry: Duration,
    /// Cap on the receive reassembly buffer. Exceeding it maps to
    /// [`MsrpError::BufferOverflow`](crate::MsrpError::BufferOverflow).
    pub max_receive_buffer: usize,
}

impl Default for MsrpConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            report_timeout: Duration::from_secs(3600),
            transaction_expiry: Duration::from_secs(30),
            max_receive_buffer: 16 * 1024 * 1024,
        }
    }
}
