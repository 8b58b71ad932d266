//! Transport instrumentation.
//!
//! The connection tasks count frames per direction, error occurrences
//! and the number of open connections through the recorder installed by
//! the embedding application (see the
//! [`metrics`](https://docs.rs/metrics) facade). Builds without the
//! `metrics` feature get empty inline helpers instead, so the sender
//! and receiver loops never branch on the feature themselves.

/// Gauge: connections currently running a task pair.
pub const CONNECTIONS_ACTIVE: &str = "msrp_connections_active";
/// Counter: frames written to or parsed off a stream, labelled by
/// `direction`.
pub const FRAMES_PROCESSED: &str = "msrp_frames_processed_total";
/// Counter: decode, dispatch and write failures.
pub const ERRORS_TOTAL: &str = "msrp_errors_total";

/// Label value distinguishing read-side from write-side frames.
#[derive(Clone, Copy)]
pub enum Direction {
    /// Frames parsed off the stream by the receiver task.
    Inbound,
    /// Frames written to the stream by the sender task.
    Outbound,
}

impl Direction {
    #[cfg_attr(not(feature = "metrics"), allow(dead_code))]
    fn as_str(self) -> &'static str {
        match self {
            Direction::Inbound => "inbound",
            Direction::Outbound => "outbound",
        }
    }
}

#[cfg(feature = "metrics")]
mod imp {
    use metrics::{counter, gauge};

    use super::{CONNECTIONS_ACTIVE, Direction, ERRORS_TOTAL, FRAMES_PROCESSED};

    /// A connection started its task pair.
    pub fn inc_connections() { gauge!(CONNECTIONS_ACTIVE).increment(1.0); }

    /// A connection closed and released its task pair.
    pub fn dec_connections() { gauge!(CONNECTIONS_ACTIVE).decrement(1.0); }

    /// One frame crossed the stream in `direction`.
    pub fn inc_frames(direction: Direction) {
        counter!(FRAMES_PROCESSED, "direction" => direction.as_str()).increment(1);
    }

    /// A decode, dispatch or write failure occurred.
    pub fn inc_errors() { counter!(ERRORS_TOTAL).increment(1); }
}

#[cfg(not(feature = "metrics"))]
mod imp {
    use super::Direction;

    pub fn inc_connections() {}
    pub fn dec_connections() {}
    pub fn inc_frames(_direction: Direction) {}
    pub fn inc_errors() {}
}

pub use imp::{dec_connections, inc_connections, inc_errors, inc_frames};
