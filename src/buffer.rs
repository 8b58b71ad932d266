//! Receive-side reassembly buffer.
//!
//! Accumulates chunk bodies for the message currently being received and
//! enforces a cap so a peer streaming unbounded data maps to a local
//! resource-exhaustion error rather than an allocation failure.

use bytes::{Bytes, BytesMut};

use crate::error::MsrpError;

/// Accumulator for the in-flight inbound message.
#[derive(Debug)]
pub struct ReceiveBuffer {
    data: BytesMut,
    limit: usize,
}

impl ReceiveBuffer {
    /// Create a buffer that refuses to grow beyond `limit` bytes.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            data: BytesMut::new(),
            limit,
        }
    }

    /// Append one chunk body.
    ///
    /// # Errors
    ///
    /// Returns [`MsrpError::BufferOverflow`] when the accumulated size
    /// would exceed the cap; the buffered data is discarded in that case.
    pub fn push(&mut self, chunk: &[u8]) -> Result<(), MsrpError> {
        if self.data.len().saturating_add(chunk.len()) > self.limit {
            self.data.clear();
            return Err(MsrpError::BufferOverflow { limit: self.limit });
        }
        self.data.extend_from_slice(chunk);
        Ok(())
    }

    /// Extract the accumulated message and reset the buffer.
    #[must_use]
    pub fn take(&mut self) -> Bytes { self.data.split().freeze() }

    /// Copy of the current partial message, for chunk-progress events.
    #[must_use]
    pub fn snapshot(&self) -> Bytes { Bytes::copy_from_slice(&self.data) }

    #[must_use]
    pub fn len(&self) -> usize { self.data.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.data.is_empty() }

    /// Discard any buffered data.
    pub fn clear(&mut self) { self.data.clear(); }
}
