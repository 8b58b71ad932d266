//! Shared test fixtures: a recording event listener and session wiring
//! over in-process duplex streams.

use std::{sync::Arc, sync::Mutex, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use msrp::{ChunkConsumption, ChunkKind, MsrpConfig, MsrpEventListener, MsrpSession};

/// One observed listener callback.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Transferred(String),
    Received {
        msg_id: Option<String>,
        data: Bytes,
        content_type: Option<String>,
    },
    Progress {
        current: u64,
        total: u64,
    },
    Chunk {
        current: u64,
        total: u64,
        len: usize,
    },
    Aborted,
    Error {
        msg_id: Option<String>,
        text: String,
        kind: ChunkKind,
    },
}

/// Listener that records every callback and wakes waiters.
pub struct Recorder {
    events: Mutex<Vec<Event>>,
    notify: tokio::sync::Notify,
    consume_chunks: bool,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
            notify: tokio::sync::Notify::new(),
            consume_chunks: false,
        })
    }

    /// Recorder that consumes partial data chunk by chunk, as a file
    /// transfer listener would.
    pub fn consuming() -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
            notify: tokio::sync::Notify::new(),
            consume_chunks: true,
        })
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().expect("events lock").clone()
    }

    fn record(&self, event: Event) {
        self.events.lock().expect("events lock").push(event);
        self.notify.notify_waiters();
    }

    /// Block until the recorded events satisfy `pred`, or panic after
    /// five seconds with the events seen so far.
    pub async fn wait_until(&self, what: &str, pred: impl Fn(&[Event]) -> bool) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            let mut notified = std::pin::pin!(self.notify.notified());
            notified.as_mut().enable();
            if pred(&self.events()) {
                return;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                panic!("timed out waiting for {what}; events: {:?}", self.events());
            }
        }
    }
}

#[async_trait]
impl MsrpEventListener for Recorder {
    async fn on_transferred(&self, msg_id: &str) {
        self.record(Event::Transferred(msg_id.to_owned()));
    }

    async fn on_received(&self, msg_id: Option<&str>, data: Bytes, content_type: Option<&str>) {
        self.record(Event::Received {
            msg_id: msg_id.map(str::to_owned),
            data,
            content_type: content_type.map(str::to_owned),
        });
    }

    async fn on_progress(&self, current: u64, total: u64) {
        self.record(Event::Progress { current, total });
    }

    async fn on_chunk_received(&self, current: u64, total: u64, data: Bytes) -> ChunkConsumption {
        self.record(Event::Chunk {
            current,
            total,
            len: data.len(),
        });
        if self.consume_chunks {
            ChunkConsumption::Consume
        } else {
            ChunkConsumption::Retain
        }
    }

    async fn on_aborted(&self) { self.record(Event::Aborted); }

    async fn on_error(&self, msg_id: Option<&str>, error: &str, kind: ChunkKind) {
        self.record(Event::Error {
            msg_id: msg_id.map(str::to_owned),
            text: error.to_owned(),
            kind,
        });
    }
}

/// Two sessions wired back to back over an in-process duplex stream,
/// each with its own recorder.
pub fn session_pair(
    config: MsrpConfig,
) -> (Arc<MsrpSession>, Arc<Recorder>, Arc<MsrpSession>, Arc<Recorder>) {
    let (left, right) = tokio::io::duplex(256 * 1024);
    let session_a = MsrpSession::new(config);
    let recorder_a = Recorder::new();
    session_a.set_event_listener(recorder_a.clone());
    session_a.set_from_path("msrp://10.0.0.1:2855/1;tcp");
    session_a.set_to_path("msrp://10.0.0.2:2855/2;tcp");
    session_a.attach(left, None);

    let session_b = MsrpSession::new(config);
    let recorder_b = Recorder::new();
    session_b.set_event_listener(recorder_b.clone());
    session_b.set_from_path("msrp://10.0.0.2:2855/2;tcp");
    session_b.set_to_path("msrp://10.0.0.1:2855/1;tcp");
    session_b.attach(right, None);

    (session_a, recorder_a, session_b, recorder_b)
}
