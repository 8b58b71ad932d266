//! Caller-facing event interface.
//!
//! Sessions emit transfer lifecycle events through a caller-supplied
//! [`MsrpEventListener`]. Callbacks run on the connection tasks, so
//! implementations should hand heavy work off to their own executors.

use async_trait::async_trait;
use bytes::Bytes;

/// Tag describing what kind of payload a chunk belongs to.
///
/// Carried in the transaction-info table so delivery failures reported
/// long after the SEND can still be attributed to the right feature.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ChunkKind {
    TextMessage,
    IsComposing,
    MessageDisplayedReport,
    MessageDeliveredReport,
    OtherMessageDeliveredReportStatus,
    FileSharing,
    HttpFileSharing,
    ImageTransfer,
    EmptyChunk,
    GeoLocation,
    StatusReport,
    #[default]
    Unknown,
}

/// Decision returned from [`MsrpEventListener::on_chunk_received`].
///
/// File and image transfers consume data chunk by chunk; chat sessions
/// retain the buffer and consume the whole message after the last chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkConsumption {
    /// The listener took the partial data; reset the reassembly buffer.
    Consume,
    /// Keep accumulating until the final chunk arrives.
    Retain,
}

/// Events emitted by a session, asynchronous relative to the caller.
///
/// All methods have no-op defaults so implementations only override the
/// events they care about.
#[async_trait]
pub trait MsrpEventListener: Send + Sync {
    /// The message identified by `msg_id` was fully transmitted and, when
    /// reports were requested, acknowledged.
    async fn on_transferred(&self, msg_id: &str) { let _ = msg_id; }

    /// A complete message was reassembled.
    async fn on_received(&self, msg_id: Option<&str>, data: Bytes, content_type: Option<&str>) {
        let _ = (msg_id, data, content_type);
    }

    /// Transfer progress, in bytes out of the announced total.
    async fn on_progress(&self, current: u64, total: u64) { let _ = (current, total); }

    /// A non-final chunk arrived; `data` is the buffered partial message.
    ///
    /// The return value decides whether the engine resets its buffer now
    /// or keeps accumulating until the final chunk.
    async fn on_chunk_received(&self, current: u64, total: u64, data: Bytes) -> ChunkConsumption {
        let _ = (current, total, data);
        ChunkConsumption::Retain
    }

    /// The peer aborted an inbound transfer.
    async fn on_aborted(&self) {}

    /// A transfer failed. `msg_id` is the correlated higher-level message
    /// id when the failing transaction could be resolved.
    async fn on_error(&self, msg_id: Option<&str>, error: &str, kind: ChunkKind) {
        let _ = (msg_id, error, kind);
    }
}
