//! Error taxonomy for the MSRP engine.
//!
//! The variants distinguish peer problems (framing and protocol errors)
//! from local ones (I/O failures, buffer exhaustion, missing
//! configuration) so callers can react differently to each. Nothing in
//! this crate retries internally; retry policy belongs to the signalling
//! layer above the listener callbacks.

use std::{io, time::Duration};

use thiserror::Error;

/// Errors surfaced by sessions, connections and the wire decoder.
#[derive(Debug, Error)]
pub enum MsrpError {
    /// The byte stream does not parse as MSRP framing. Fatal to the
    /// connection.
    #[error("malformed frame: {0}")]
    Framing(String),

    /// Transport failure on the underlying stream.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// The peer rejected a request or reported a delivery failure.
    #[error("protocol failure with status {status}")]
    Protocol {
        /// Status code carried by the response or REPORT.
        status: u16,
    },

    /// A bounded wait for a response, report or probe acknowledgment
    /// elapsed.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The receive reassembly buffer reached its configured cap. Local
    /// resource exhaustion, distinct from I/O failure.
    #[error("receive buffer limit of {limit} bytes exceeded")]
    BufferOverflow {
        /// Configured buffer cap in bytes.
        limit: usize,
    },

    /// The session is missing a prerequisite (paths, connection or
    /// listener) for the attempted operation.
    #[error("session not configured: missing {0}")]
    NotConfigured(&'static str),

    /// The connection was closed while an operation was in flight.
    #[error("connection closed")]
    Closed,
}
