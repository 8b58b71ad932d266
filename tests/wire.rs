//! Session behaviour against raw bytes written straight to the stream.

mod common;

use std::{
    io,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use msrp::{ChunkKind, MsrpConfig, MsrpError, MsrpSession, consts::CHUNK_MAX_SIZE};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt, DuplexStream, ReadBuf};

use crate::common::{Event, Recorder};

fn attached_session(
    config: MsrpConfig,
) -> (Arc<MsrpSession>, Arc<Recorder>, DuplexStream) {
    let (local, remote) = tokio::io::duplex(64 * 1024);
    let session = MsrpSession::new(config);
    let recorder = Recorder::new();
    session.set_event_listener(recorder.clone());
    session.set_from_path("msrp://10.0.0.1:2855/1;tcp");
    session.set_to_path("msrp://10.0.0.2:2855/2;tcp");
    session.attach(local, None);
    (session, recorder, remote)
}

/// Read frames off `remote` until a terminator line goes by, returning
/// the transaction id from the first start line seen.
async fn read_transaction_id(remote: &mut DuplexStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let read = remote.read(&mut chunk).await.expect("read");
        assert!(read > 0, "stream closed while waiting for a frame");
        buf.extend_from_slice(&chunk[..read]);
        if buf.ends_with(b"$\r\n") {
            break;
        }
    }
    let text = String::from_utf8(buf).expect("utf-8 frame");
    let start_line = text.lines().next().expect("start line");
    start_line.split(' ').nth(1).expect("transaction id").to_owned()
}

/// Source that serves a fixed buffer, then cancels the transfer at the
/// point the next chunk would be read.
struct CancellingSource {
    session: Arc<MsrpSession>,
    data: Vec<u8>,
    served: usize,
}

impl AsyncRead for CancellingSource {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if self.served >= self.data.len() {
            self.session.cancel_transfer();
            return Poll::Ready(Ok(()));
        }
        let start = self.served;
        let n = (self.data.len() - start).min(buf.remaining());
        buf.put_slice(&self.data[start..start + n]);
        self.served += n;
        Poll::Ready(Ok(()))
    }
}

#[tokio::test]
async fn unacknowledged_send_completes_when_no_reports_are_requested() {
    let (session, recorder, mut remote) = attached_session(MsrpConfig::default());

    session
        .send_chunks(
            &b"twenty five bytes of data"[..],
            "msg-f",
            "text/plain",
            25,
            ChunkKind::TextMessage,
        )
        .await
        .expect("send");

    // The silent peer never answers; completion and progress fire on
    // transmission alone.
    assert!(recorder
        .events()
        .contains(&Event::Transferred("msg-f".into())));
    assert!(recorder.events().contains(&Event::Progress {
        current: 25,
        total: 25
    }));
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let read = remote.read(&mut chunk).await.expect("read");
        assert!(read > 0, "stream closed before the chunk arrived");
        buf.extend_from_slice(&chunk[..read]);
        if buf.ends_with(b"$\r\n") {
            break;
        }
    }
}

#[tokio::test]
async fn cancelling_mid_transfer_leaves_the_message_unterminated() {
    let (session, recorder, mut remote) = attached_session(MsrpConfig::default());

    let total = 2 * CHUNK_MAX_SIZE;
    let source = CancellingSource {
        session: Arc::clone(&session),
        data: vec![7u8; CHUNK_MAX_SIZE],
        served: 0,
    };
    session
        .send_chunks(
            source,
            "msg-c",
            "application/octet-stream",
            total as u64,
            ChunkKind::FileSharing,
        )
        .await
        .expect("send");

    // Exactly one chunk reaches the wire, flagged as non-final; the
    // cancelled remainder never produces a `$` terminator.
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let read = remote.read(&mut chunk).await.expect("read");
        assert!(read > 0, "stream closed before the chunk arrived");
        buf.extend_from_slice(&chunk[..read]);
        if buf.ends_with(b"+\r\n") {
            break;
        }
    }
    assert!(!buf.windows(3).any(|window| window == b"$\r\n"));
    assert!(!recorder.events().iter().any(|event| {
        matches!(event, Event::Transferred(_) | Event::Error { .. })
    }));
}

#[tokio::test]
async fn abort_flag_discards_the_partial_message() {
    let (_session, recorder, mut remote) = attached_session(MsrpConfig::default());

    remote
        .write_all(
            b"MSRP t1 SEND\r\n\
              To-Path: msrp://10.0.0.1:2855/1;tcp\r\n\
              From-Path: msrp://10.0.0.2:2855/2;tcp\r\n\
              Message-ID: MID-abort\r\n\
              Byte-Range: 1-5/20\r\n\
              \r\n\
              hello\r\n\
              -------t1+\r\n",
        )
        .await
        .expect("write");
    remote
        .write_all(
            b"MSRP t2 SEND\r\n\
              To-Path: msrp://10.0.0.1:2855/1;tcp\r\n\
              From-Path: msrp://10.0.0.2:2855/2;tcp\r\n\
              Message-ID: MID-abort\r\n\
              Byte-Range: 6-9/20\r\n\
              \r\n\
              worl\r\n\
              -------t2#\r\n",
        )
        .await
        .expect("write");

    recorder
        .wait_until("abort event", |events| events.contains(&Event::Aborted))
        .await;
    assert!(recorder.events().contains(&Event::Chunk {
        current: 5,
        total: 20,
        len: 5
    }));
    assert!(!recorder
        .events()
        .iter()
        .any(|event| matches!(event, Event::Received { .. })));
}

#[tokio::test]
async fn failed_report_surfaces_a_transfer_error() {
    let (_session, recorder, mut remote) = attached_session(MsrpConfig::default());

    remote
        .write_all(
            b"MSRP t9 REPORT\r\n\
              To-Path: msrp://10.0.0.1:2855/1;tcp\r\n\
              From-Path: msrp://10.0.0.2:2855/2;tcp\r\n\
              Status: 000 413 413\r\n\
              Message-ID: MID-unknown\r\n\
              Byte-Range: 1-305/305\r\n\
              -------t9$\r\n",
        )
        .await
        .expect("write");

    recorder
        .wait_until("report error", |events| {
            events.contains(&Event::Error {
                msg_id: None,
                text: "error report 413".into(),
                kind: ChunkKind::Unknown,
            })
        })
        .await;
}

#[tokio::test]
async fn rejected_probe_correlates_back_to_its_transaction() {
    let (session, recorder, mut remote) = attached_session(MsrpConfig::default());

    let probe = tokio::spawn({
        let session = Arc::clone(&session);
        async move { session.send_empty_chunk().await }
    });
    let transaction_id = read_transaction_id(&mut remote).await;
    let rejection = format!(
        "MSRP {transaction_id} 481 Session-does-not-exist\r\n\
         To-Path: msrp://10.0.0.2:2855/2;tcp\r\n\
         From-Path: msrp://10.0.0.1:2855/1;tcp\r\n\
         -------{transaction_id}$\r\n"
    );
    remote.write_all(rejection.as_bytes()).await.expect("write");

    let result = probe.await.expect("probe task");
    assert!(matches!(result, Err(MsrpError::Protocol { status: 481 })));
    recorder
        .wait_until("correlated error", |events| {
            events.contains(&Event::Error {
                msg_id: None,
                text: "error response 481".into(),
                kind: ChunkKind::EmptyChunk,
            })
        })
        .await;
}

#[tokio::test]
async fn oversized_message_trips_the_buffer_cap() {
    let config = MsrpConfig {
        max_receive_buffer: 8,
        ..MsrpConfig::default()
    };
    let (_session, recorder, mut remote) = attached_session(config);

    remote
        .write_all(
            b"MSRP t3 SEND\r\n\
              To-Path: msrp://10.0.0.1:2855/1;tcp\r\n\
              From-Path: msrp://10.0.0.2:2855/2;tcp\r\n\
              Message-ID: MID-big\r\n\
              Byte-Range: 1-20/40\r\n\
              \r\n\
              twenty bytes of data\r\n\
              -------t3+\r\n",
        )
        .await
        .expect("write");

    recorder
        .wait_until("overflow error", |events| {
            events.iter().any(|event| {
                matches!(event, Event::Error { text, .. } if text.contains("receive buffer limit"))
            })
        })
        .await;
}

#[tokio::test]
async fn unknown_methods_are_skipped_without_killing_the_connection() {
    let (_session, recorder, mut remote) = attached_session(MsrpConfig::default());

    remote
        .write_all(
            b"MSRP t5 NICKNAME\r\n\
              To-Path: msrp://10.0.0.1:2855/1;tcp\r\n\
              From-Path: msrp://10.0.0.2:2855/2;tcp\r\n\
              -------t5$\r\n\
              MSRP t6 SEND\r\n\
              To-Path: msrp://10.0.0.1:2855/1;tcp\r\n\
              From-Path: msrp://10.0.0.2:2855/2;tcp\r\n\
              Message-ID: MID-after\r\n\
              Byte-Range: 1-4/4\r\n\
              Content-Type: text/plain\r\n\
              \r\n\
              data\r\n\
              -------t6$\r\n",
        )
        .await
        .expect("write");

    recorder
        .wait_until("message after unknown method", |events| {
            events.iter().any(|event| {
                matches!(event, Event::Received { data, .. } if data.as_ref() == b"data")
            })
        })
        .await;
    assert!(!recorder
        .events()
        .iter()
        .any(|event| matches!(event, Event::Error { .. })));
}

#[tokio::test]
async fn unannounced_chunk_sizes_still_reassemble() {
    let (_session, recorder, mut remote) = attached_session(MsrpConfig::default());

    remote
        .write_all(
            b"MSRP u1 SEND\r\n\
              To-Path: msrp://10.0.0.1:2855/1;tcp\r\n\
              From-Path: msrp://10.0.0.2:2855/2;tcp\r\n\
              Message-ID: MID-u\r\n\
              Content-Type: text/plain\r\n\
              Byte-Range: 1-*/*\r\n\
              \r\n\
              first part \r\n\
              -------u1+\r\n",
        )
        .await
        .expect("write");
    remote
        .write_all(
            b"MSRP u2 SEND\r\n\
              To-Path: msrp://10.0.0.1:2855/1;tcp\r\n\
              From-Path: msrp://10.0.0.2:2855/2;tcp\r\n\
              Message-ID: MID-u\r\n\
              Content-Type: text/plain\r\n\
              Byte-Range: 12-*/*\r\n\
              \r\n\
              second part\r\n\
              -------u2$\r\n",
        )
        .await
        .expect("write");

    recorder
        .wait_until("reassembled message", |events| {
            events.iter().any(|event| {
                matches!(
                    event,
                    Event::Received { data, .. } if data.as_ref() == b"first part second part"
                )
            })
        })
        .await;
    // Without a total the partial-chunk event reports zero.
    assert!(recorder.events().contains(&Event::Chunk {
        current: 11,
        total: 0,
        len: 11
    }));
}
