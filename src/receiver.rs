//! Chunk receiver task.
//!
//! Owns the read half of the stream. The loop drains every frame the
//! decoder can produce from the buffered bytes, hands each to the session
//! for dispatch, then reads more from the socket. A clean EOF ends the
//! task silently; a read or dispatch failure while the connection is
//! still live is surfaced through the session's event listener before the
//! cancellation token winds the peer sender task down.

use std::{sync::Arc, time::Duration};

use bytes::BytesMut;
use log::{debug, trace, warn};
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    task::JoinHandle,
    time::timeout,
};
use tokio_util::{codec::Decoder, sync::CancellationToken};

use crate::{
    decoder::FrameDecoder,
    error::MsrpError,
    listener::ChunkKind,
    metrics::{self, Direction},
    session::MsrpSession,
};

const READ_CHUNK: usize = 8 * 1024;

/// Spawn the receiver task over `reader`, dispatching into `session`.
///
/// `read_timeout` bounds each socket read; `None` waits indefinitely.
pub fn spawn_receiver<R>(
    reader: R,
    session: Arc<MsrpSession>,
    cancel: CancellationToken,
    read_timeout: Option<Duration>,
) -> JoinHandle<()>
where
    R: AsyncRead + Send + Unpin + 'static,
{
    tokio::spawn(async move {
        if let Err(error) = receive_loop(reader, &session, &cancel, read_timeout).await {
            if cancel.is_cancelled() {
                debug!("receiver stopping after cancellation: {error}");
            } else {
                warn!("chunk receiver failed: {error}");
                metrics::inc_errors();
                session.emit_error(None, &error.to_string(), ChunkKind::Unknown).await;
            }
        }
        cancel.cancel();
    })
}

async fn receive_loop<R>(
    mut reader: R,
    session: &Arc<MsrpSession>,
    cancel: &CancellationToken,
    read_timeout: Option<Duration>,
) -> Result<(), MsrpError>
where
    R: AsyncRead + Unpin,
{
    let mut decoder = FrameDecoder::new();
    let mut buffer = BytesMut::with_capacity(READ_CHUNK);
    loop {
        while let Some(frame) = decoder.decode(&mut buffer)? {
            trace!("dispatching inbound frame");
            metrics::inc_frames(Direction::Inbound);
            session.handle_frame(frame).await?;
            session.sweep_transactions();
        }
        let read = tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(()),
            read = bounded_read(&mut reader, &mut buffer, read_timeout) => read?,
        };
        if read == 0 {
            // Peer closed the stream; anything left buffered is an
            // incomplete frame and is dropped with the connection.
            debug!("peer closed the stream");
            return Ok(());
        }
    }
}

async fn bounded_read<R>(
    reader: &mut R,
    buffer: &mut BytesMut,
    limit: Option<Duration>,
) -> Result<usize, MsrpError>
where
    R: AsyncRead + Unpin,
{
    match limit {
        Some(limit) => timeout(limit, reader.read_buf(buffer))
            .await
            .map_err(|_| MsrpError::Timeout(limit))?
            .map_err(MsrpError::from),
        None => reader.read_buf(buffer).await.map_err(MsrpError::from),
    }
}
