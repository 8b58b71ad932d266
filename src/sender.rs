//! Chunk sender task.
//!
//! A single writer task owns the write half of the stream, keeping writes
//! mutually exclusive. Producers reach it through a cloneable
//! [`SenderHandle`] with two lanes: an **immediate** lane for responses,
//! REPORTs, probes and unpaced SENDs, and a **paced** lane used while
//! success-report pacing is active so data chunks are serialised with
//! report delivery. The drain loop is a biased select so the immediate
//! lane always wins, mirroring the priority layering of the outbound
//! queues elsewhere in this codebase.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use bytes::Bytes;
use log::{trace, warn};
use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::mpsc,
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

use crate::{
    error::MsrpError,
    metrics::{self, Direction},
};

/// Depth of each outbound lane.
const QUEUE_CAPACITY: usize = 32;

/// Cloneable handle producers use to queue outbound frames.
#[derive(Clone, Debug)]
pub struct SenderHandle {
    immediate_tx: mpsc::Sender<Bytes>,
    paced_tx: mpsc::Sender<Bytes>,
    paced: Arc<AtomicBool>,
    cancel: CancellationToken,
}

impl SenderHandle {
    /// Queue a frame on the lane selected by the pacing flag.
    ///
    /// # Errors
    ///
    /// Returns [`MsrpError::Closed`] when the writer task has stopped.
    pub async fn send(&self, frame: Bytes) -> Result<(), MsrpError> {
        let lane = if self.paced.load(Ordering::Acquire) {
            &self.paced_tx
        } else {
            &self.immediate_tx
        };
        lane.send(frame).await.map_err(|_| MsrpError::Closed)
    }

    /// Queue a frame on the immediate lane regardless of pacing.
    ///
    /// # Errors
    ///
    /// Returns [`MsrpError::Closed`] when the writer task has stopped.
    pub async fn send_immediate(&self, frame: Bytes) -> Result<(), MsrpError> {
        self.immediate_tx
            .send(frame)
            .await
            .map_err(|_| MsrpError::Closed)
    }

    /// Route subsequent [`send`](Self::send) calls through the paced lane.
    pub fn set_paced(&self, paced: bool) { self.paced.store(paced, Ordering::Release); }

    /// Stop the writer task without surfacing an error.
    pub fn terminate(&self) { self.cancel.cancel(); }
}

/// Spawn the writer task over `writer`.
///
/// The task stops when `cancel` fires, when every handle clone is dropped,
/// or on the first write failure (which also fires `cancel` so the peer
/// receiver loop winds down).
pub fn spawn_sender<W>(mut writer: W, cancel: CancellationToken) -> (SenderHandle, JoinHandle<()>)
where
    W: AsyncWrite + Send + Unpin + 'static,
{
    let (immediate_tx, mut immediate_rx) = mpsc::channel(QUEUE_CAPACITY);
    let (paced_tx, mut paced_rx) = mpsc::channel(QUEUE_CAPACITY);
    let handle = SenderHandle {
        immediate_tx,
        paced_tx,
        paced: Arc::new(AtomicBool::new(false)),
        cancel: cancel.clone(),
    };

    let task = tokio::spawn(async move {
        loop {
            let frame = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                frame = immediate_rx.recv() => frame,
                frame = paced_rx.recv() => frame,
            };
            let Some(frame) = frame else { break };
            trace!("writing frame of {} bytes", frame.len());
            if let Err(error) = write_frame(&mut writer, &frame).await {
                if !cancel.is_cancelled() {
                    warn!("chunk sender write failed: {error}");
                    metrics::inc_errors();
                }
                cancel.cancel();
                break;
            }
            metrics::inc_frames(Direction::Outbound);
        }
    });

    (handle, task)
}

async fn write_frame<W>(writer: &mut W, frame: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(frame).await?;
    writer.flush().await
}
