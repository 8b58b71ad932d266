//! Session orchestration: segmentation, dispatch and acknowledgment.
//!
//! An [`MsrpSession`] owns one connection and drives both transfer
//! directions over it. Outbound messages are cut into chunks of at most
//! [`CHUNK_MAX_SIZE`](crate::consts::CHUNK_MAX_SIZE) bytes and correlated
//! with responses and success REPORTs through the waiter types in
//! [`transaction`](crate::transaction); inbound frames arrive from the
//! receiver task via [`handle_frame`](MsrpSession::handle_frame) and are
//! reassembled, acknowledged and surfaced through the event listener.
//!
//! Shared state sits behind `std::sync::Mutex` and atomics. No lock is
//! ever held across an await; callbacks and writes always run on cloned
//! handles.

mod store;

use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Duration,
};

use bytes::Bytes;
use log::{debug, info, warn};
use rand::Rng;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio_util::sync::CancellationToken;

pub use self::store::{TransactionInfo, TransactionStore};
use crate::{
    buffer::ReceiveBuffer,
    config::MsrpConfig,
    connection::MsrpConnection,
    consts,
    error::MsrpError,
    frame::{
        self, ByteRange, ContinuationFlag, Frame, Method, Request, Response,
        byte_range,
    },
    listener::{ChunkConsumption, ChunkKind, MsrpEventListener},
    sender::SenderHandle,
    transaction::{ReportTransaction, RequestTransaction, SendTransaction},
};

/// Interval between acknowledgment-based progress samples while a
/// failure-report transfer is draining.
const PROGRESS_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// One MSRP session over a single persistent connection.
pub struct MsrpSession {
    config: MsrpConfig,
    from_path: Mutex<Option<String>>,
    to_path: Mutex<Option<String>>,
    failure_report: AtomicBool,
    success_report: AtomicBool,
    established: AtomicBool,
    closed: AtomicBool,
    cancel_transfer: Arc<AtomicBool>,
    connection: Mutex<Option<MsrpConnection>>,
    /// Cancellation token of a connection currently inside `open`, so
    /// `close` can interrupt a pending dial or accept while the
    /// connection value itself is out of the slot.
    open_cancel: Mutex<Option<CancellationToken>>,
    listener: Mutex<Option<Arc<dyn MsrpEventListener>>>,
    received: Mutex<ReceiveBuffer>,
    /// Cumulative byte positions queued per transmitted chunk, popped one
    /// per acknowledgment to drive progress events.
    progress: Mutex<VecDeque<u64>>,
    total_size: AtomicU64,
    request_transaction: Mutex<Option<Arc<RequestTransaction>>>,
    report_transaction: Mutex<Option<Arc<ReportTransaction>>>,
    send_transaction: Mutex<Option<Arc<SendTransaction>>>,
    store: TransactionStore,
}

impl MsrpSession {
    /// Create a session with the given tunables.
    #[must_use]
    pub fn new(config: MsrpConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            from_path: Mutex::new(None),
            to_path: Mutex::new(None),
            failure_report: AtomicBool::new(false),
            success_report: AtomicBool::new(false),
            established: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            cancel_transfer: Arc::new(AtomicBool::new(false)),
            connection: Mutex::new(None),
            open_cancel: Mutex::new(None),
            listener: Mutex::new(None),
            received: Mutex::new(ReceiveBuffer::new(config.max_receive_buffer)),
            progress: Mutex::new(VecDeque::new()),
            total_size: AtomicU64::new(0),
            request_transaction: Mutex::new(None),
            report_transaction: Mutex::new(None),
            send_transaction: Mutex::new(None),
            store: TransactionStore::new(),
        })
    }

    pub fn set_event_listener(&self, listener: Arc<dyn MsrpEventListener>) {
        *lock(&self.listener) = Some(listener);
    }

    pub fn set_from_path(&self, path: impl Into<String>) {
        *lock(&self.from_path) = Some(path.into());
    }

    pub fn set_to_path(&self, path: impl Into<String>) {
        *lock(&self.to_path) = Some(path.into());
    }

    #[must_use]
    pub fn from_path(&self) -> Option<String> { lock(&self.from_path).clone() }

    #[must_use]
    pub fn to_path(&self) -> Option<String> { lock(&self.to_path).clone() }

    /// Request a 200 response for every transmitted chunk.
    pub fn set_failure_report_option(&self, enabled: bool) {
        self.failure_report.store(enabled, Ordering::Release);
    }

    #[must_use]
    pub fn is_failure_report_requested(&self) -> bool {
        self.failure_report.load(Ordering::Acquire)
    }

    /// Request success REPORTs covering each transmitted message.
    pub fn set_success_report_option(&self, enabled: bool) {
        self.success_report.store(enabled, Ordering::Release);
    }

    #[must_use]
    pub fn is_success_report_requested(&self) -> bool {
        self.success_report.load(Ordering::Acquire)
    }

    /// Install the connection this session will transfer over.
    pub fn set_connection(&self, connection: MsrpConnection) {
        *lock(&self.connection) = Some(connection);
    }

    /// Establish the installed connection and start its task pair.
    ///
    /// # Errors
    ///
    /// Returns [`MsrpError::NotConfigured`] when no connection was
    /// installed, or the connection's own open failure.
    pub async fn open(self: &Arc<Self>) -> Result<(), MsrpError> {
        self.open_with_timeout(None).await
    }

    /// [`open`](Self::open) bounded by an optional setup timeout.
    ///
    /// # Errors
    ///
    /// As [`open`](Self::open), plus [`MsrpError::Timeout`] when the
    /// stream is not established in time.
    pub async fn open_with_timeout(
        self: &Arc<Self>,
        limit: Option<Duration>,
    ) -> Result<(), MsrpError> {
        let Some(mut connection) = lock(&self.connection).take() else {
            return Err(MsrpError::NotConfigured("connection"));
        };
        *lock(&self.open_cancel) = Some(connection.cancel_token());
        if self.closed.load(Ordering::Acquire) {
            // close ran between the take above and the token store.
            connection.close();
        }
        let result = connection.open_with_timeout(Arc::clone(self), limit).await;
        *lock(&self.open_cancel) = None;
        *lock(&self.connection) = Some(connection);
        result
    }

    /// Run this session over a stream the caller already holds. Used for
    /// in-process wiring where no socket is involved.
    pub fn attach<S>(self: &Arc<Self>, stream: S, read_timeout: Option<Duration>)
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let mut connection = MsrpConnection::attached();
        connection.attach(stream, Arc::clone(self), read_timeout);
        *lock(&self.connection) = Some(connection);
    }

    /// Whether traffic has been seen and the session is neither closed
    /// nor mid-cancellation.
    #[must_use]
    pub fn is_established(&self) -> bool {
        self.established.load(Ordering::Acquire)
            && !self.cancel_transfer.load(Ordering::Acquire)
            && !self.closed.load(Ordering::Acquire)
    }

    /// Abort the outbound transfer currently in progress. The chunk loop
    /// stops before the final chunk, leaving the message unterminated.
    pub fn cancel_transfer(&self) { self.cancel_transfer.store(true, Ordering::Release); }

    /// Close the session: stop the connection tasks and unblock every
    /// waiter. Safe to call repeatedly.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        info!("closing session");
        self.cancel_transfer.store(true, Ordering::Release);
        if let Some(transaction) = self.request_transaction() {
            transaction.terminate();
        }
        if let Some(transaction) = self.report_transaction() {
            transaction.terminate();
        }
        if let Some(transaction) = self.send_transaction() {
            transaction.terminate();
        }
        if let Some(pending) = lock(&self.open_cancel).take() {
            pending.cancel();
        }
        if let Some(connection) = lock(&self.connection).as_mut() {
            connection.close();
        }
    }

    /// Segment `reader` into SEND chunks and transmit the whole message.
    ///
    /// `msg_id` is the caller's identifier, echoed back on completion and
    /// delivery-failure events; the wire carries a freshly generated
    /// Message-ID. `total_size` must be the exact stream length, since it
    /// decides the final continuation flag and the Byte-Range totals.
    ///
    /// The call returns once the message is fully transmitted and, per
    /// the report options, acknowledged. Delivery failures that have a
    /// listener event (response timeout, error REPORT) are reported
    /// through the listener, not as an `Err`.
    ///
    /// # Errors
    ///
    /// Returns [`MsrpError::NotConfigured`] when paths or connection are
    /// missing, I/O errors from the source stream and [`MsrpError::Closed`]
    /// when the connection stops mid-transfer.
    pub async fn send_chunks<R>(
        &self,
        mut reader: R,
        msg_id: &str,
        content_type: &str,
        total_size: u64,
        kind: ChunkKind,
    ) -> Result<(), MsrpError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let to = self.to_path().ok_or(MsrpError::NotConfigured("to path"))?;
        let from = self.from_path().ok_or(MsrpError::NotConfigured("from path"))?;
        let sender = self.sender()?;
        let failure_report = self.is_failure_report_requested();
        let success_report = self.is_success_report_requested();
        info!("sending {total_size} bytes of {content_type} ({kind:?})");

        self.cancel_transfer.store(false, Ordering::Release);
        self.total_size.store(total_size, Ordering::Release);
        lock(&self.progress).clear();

        let report_transaction = success_report.then(|| Arc::new(ReportTransaction::new()));
        *lock(&self.report_transaction) = report_transaction.clone();
        let send_transaction = failure_report.then(|| Arc::new(SendTransaction::new()));
        *lock(&self.send_transaction) = send_transaction.clone();

        // Data chunks share the paced lane with report traffic while
        // success reports are in play.
        sender.set_paced(success_report);
        let poller = CancellationToken::new();
        let _poller_guard = poller.clone().drop_guard();
        if let Some(transaction) = &send_transaction {
            self.spawn_progress_poller(Arc::clone(transaction), total_size, poller.clone());
        }

        let wire_msg_id = generate_message_id();
        let result = self
            .transmit_chunks(
                &mut reader,
                &sender,
                ChunkContext {
                    to: &to,
                    from: &from,
                    wire_msg_id: &wire_msg_id,
                    msg_id,
                    content_type,
                    total_size,
                    kind,
                    failure_report,
                    success_report,
                },
                send_transaction.as_deref(),
            )
            .await;
        sender.set_paced(false);
        result?;

        if self.cancel_transfer.load(Ordering::Acquire) {
            return Ok(());
        }

        if let Some(transaction) = &send_transaction {
            transaction.wait_all_responses(self.config.request_timeout).await;
            if transaction.is_all_responses_received() {
                self.notify_transferred(msg_id).await;
            } else if !transaction.is_terminated() {
                self.emit_error(Some(msg_id), "response timeout 408", kind).await;
            }
        }

        if let Some(transaction) = &report_transaction {
            loop {
                if transaction.is_finished(total_size) {
                    break;
                }
                if !transaction.wait_report(self.config.report_timeout).await {
                    break;
                }
                if transaction
                    .status_code()
                    .is_some_and(|status| status != consts::STATUS_200_OK)
                {
                    break;
                }
            }
            if transaction.status_code() == Some(consts::STATUS_200_OK) {
                self.notify_transferred(msg_id).await;
            } else {
                let status = transaction.status_code().unwrap_or(0);
                self.emit_error(Some(msg_id), &format!("error report {status}"), kind)
                    .await;
            }
        }

        if send_transaction.is_none() && report_transaction.is_none() {
            self.notify_transferred(msg_id).await;
        }
        Ok(())
    }

    /// Send a body-less SEND probe and wait for its acknowledgment.
    ///
    /// # Errors
    ///
    /// Returns [`MsrpError::NotConfigured`] when paths or connection are
    /// missing, [`MsrpError::Timeout`] when no response arrives and
    /// [`MsrpError::Protocol`] when the peer rejects the probe.
    pub async fn send_empty_chunk(&self) -> Result<(), MsrpError> {
        let to = self.to_path().ok_or(MsrpError::NotConfigured("to path"))?;
        let from = self.from_path().ok_or(MsrpError::NotConfigured("from path"))?;
        let sender = self.sender()?;
        debug!("sending keep-alive probe");

        let transaction_id = generate_transaction_id();
        let message_id = generate_transaction_id();
        self.store
            .insert(&transaction_id, &message_id, None, ChunkKind::EmptyChunk);
        let transaction = Arc::new(RequestTransaction::new());
        *lock(&self.request_transaction) = Some(Arc::clone(&transaction));

        let request = Request::empty_send(&transaction_id, &to, &from, &message_id);
        sender
            .send_immediate(Frame::Request(request).to_bytes())
            .await?;
        match transaction.wait_response(self.config.request_timeout).await {
            Some(consts::STATUS_200_OK) => Ok(()),
            Some(status) => Err(MsrpError::Protocol { status }),
            None => Err(MsrpError::Timeout(self.config.request_timeout)),
        }
    }

    /// Dispatch one inbound frame. Called from the receiver task.
    pub(crate) async fn handle_frame(&self, frame: Frame) -> Result<(), MsrpError> {
        match frame {
            Frame::Request(request) => match &request.method {
                Method::Send => self.receive_send(request).await,
                Method::Report => self.receive_report(request).await,
                Method::Other(name) => {
                    warn!("dropping request with unsupported method {name}");
                    self.store.remove(&request.transaction_id);
                    Ok(())
                }
            },
            Frame::Response(response) => {
                self.receive_response(response).await;
                Ok(())
            }
        }
    }

    /// Evict transaction bookkeeping that outlived its expiry.
    pub(crate) fn sweep_transactions(&self) {
        self.store.sweep(self.config.transaction_expiry);
    }

    /// Surface a transfer error through the event listener.
    pub(crate) async fn emit_error(&self, msg_id: Option<&str>, error: &str, kind: ChunkKind) {
        warn!("transfer error ({kind:?}): {error}");
        if let Some(listener) = self.listener() {
            listener.on_error(msg_id, error, kind).await;
        }
    }

    async fn transmit_chunks<R>(
        &self,
        reader: &mut R,
        sender: &SenderHandle,
        ctx: ChunkContext<'_>,
        send_transaction: Option<&SendTransaction>,
    ) -> Result<(), MsrpError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let mut chunk = vec![0u8; consts::CHUNK_MAX_SIZE];
        let mut first: u64 = 1;
        let mut last: u64 = 0;
        loop {
            let read = fill_chunk(reader, &mut chunk).await?;
            if read == 0 || self.cancel_transfer.load(Ordering::Acquire) {
                return Ok(());
            }
            last += read as u64;
            let transaction_id = generate_transaction_id();
            if ctx.failure_report {
                self.store
                    .insert(&transaction_id, ctx.wire_msg_id, Some(ctx.msg_id), ctx.kind);
            }
            let continuation = if last == ctx.total_size {
                ContinuationFlag::Last
            } else {
                ContinuationFlag::More
            };
            let request = Request::data_send(
                &transaction_id,
                ctx.to,
                ctx.from,
                ctx.wire_msg_id,
                ByteRange::known(first, last, ctx.total_size),
                ctx.failure_report,
                ctx.success_report,
                Some(ctx.content_type),
                Bytes::copy_from_slice(&chunk[..read]),
                continuation,
            );
            first = last + 1;

            if let Some(transaction) = send_transaction {
                transaction.handle_request();
                sender.send(Frame::Request(request).to_bytes()).await?;
                lock(&self.progress).push_back(last);
            } else {
                sender.send(Frame::Request(request).to_bytes()).await?;
                if !self.cancel_transfer.load(Ordering::Acquire) {
                    if let Some(listener) = self.listener() {
                        listener.on_progress(last, ctx.total_size).await;
                    }
                }
            }
        }
    }

    /// Emit acknowledgment-based progress every 500ms while pipelined
    /// chunks are still unacknowledged.
    fn spawn_progress_poller(
        &self,
        transaction: Arc<SendTransaction>,
        total_size: u64,
        cancel: CancellationToken,
    ) {
        let listener = self.listener();
        let cancelled = Arc::clone(&self.cancel_transfer);
        let total_chunks = total_size.div_ceil(consts::CHUNK_MAX_SIZE as u64);
        tokio::spawn(async move {
            loop {
                if transaction.acked_chunks() >= total_chunks || cancelled.load(Ordering::Acquire)
                {
                    break;
                }
                if let Some(listener) = &listener {
                    let acked = transaction.acked_chunks() * consts::CHUNK_MAX_SIZE as u64;
                    listener.on_progress(acked, total_size).await;
                }
                tokio::select! {
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(PROGRESS_POLL_INTERVAL) => {}
                }
            }
        });
    }

    async fn receive_send(&self, request: Request) -> Result<(), MsrpError> {
        self.established.store(true, Ordering::Release);
        debug!("SEND received (transaction {})", request.transaction_id);

        if acknowledgement_requested(&request) {
            let response = Response::to_request(&request, consts::STATUS_200_OK);
            self.sender()?
                .send(Frame::Response(response).to_bytes())
                .await?;
        }

        let Some(body) = request.body.clone() else {
            // Keep-alive probe, nothing to buffer.
            return Ok(());
        };
        if body.is_empty() {
            return Ok(());
        }
        let total = request
            .headers
            .get(consts::HEADER_BYTE_RANGE)
            .and_then(byte_range::total_size_of)
            .unwrap_or(0);
        {
            lock(&self.received).push(&body)?;
        }

        match request.continuation {
            ContinuationFlag::Last => {
                let data = lock(&self.received).take();
                let received_len = data.len() as u64;
                if let Some(listener) = self.listener() {
                    listener
                        .on_received(
                            request.message_id(),
                            data,
                            request.headers.get(consts::HEADER_CONTENT_TYPE),
                        )
                        .await;
                }
                if success_report_requested(&request) {
                    self.send_success_report(&request, received_len, total).await?;
                }
            }
            ContinuationFlag::Abort => {
                lock(&self.received).clear();
                if let Some(listener) = self.listener() {
                    listener.on_aborted().await;
                }
            }
            ContinuationFlag::More => {
                let (current, snapshot) = {
                    let received = lock(&self.received);
                    (received.len() as u64, received.snapshot())
                };
                if let Some(listener) = self.listener() {
                    let decision = listener.on_chunk_received(current, total, snapshot).await;
                    if decision == ChunkConsumption::Consume {
                        lock(&self.received).clear();
                    }
                }
            }
        }
        Ok(())
    }

    /// Acknowledge a fully received message with a success REPORT. The
    /// REPORT reuses the transaction id of the final SEND chunk and
    /// mirrors its path headers.
    async fn send_success_report(
        &self,
        request: &Request,
        received_len: u64,
        total: u64,
    ) -> Result<(), MsrpError> {
        let (Some(to), Some(from), Some(message_id)) =
            (request.from_path(), request.to_path(), request.message_id())
        else {
            warn!("cannot build success report, path or message id missing");
            return Ok(());
        };
        let total = if total > 0 { total } else { received_len };
        let report = Request::report(
            &request.transaction_id,
            to,
            from,
            message_id,
            received_len,
            total,
        );
        self.sender()?
            .send(Frame::Request(report).to_bytes())
            .await
    }

    async fn receive_report(&self, request: Request) -> Result<(), MsrpError> {
        info!("REPORT received (transaction {})", request.transaction_id);
        let info = request
            .message_id()
            .and_then(|message_id| self.store.by_message(message_id));

        if acknowledgement_requested(&request) {
            let response = Response::to_request(&request, consts::STATUS_200_OK);
            self.sender()?
                .send(Frame::Response(response).to_bytes())
                .await?;
        }

        let status = request
            .headers
            .get(consts::HEADER_STATUS)
            .and_then(frame::parse_status)
            .unwrap_or(0);
        if status != consts::STATUS_200_OK {
            let (msg_id, kind) = info.as_ref().map_or((None, ChunkKind::Unknown), |info| {
                (info.caller_message_id.clone(), info.kind)
            });
            self.emit_error(msg_id.as_deref(), &format!("error report {status}"), kind)
                .await;
        }

        if let Some(transaction) = self.report_transaction() {
            let last_byte = request
                .headers
                .get(consts::HEADER_BYTE_RANGE)
                .and_then(byte_range::last_byte_of)
                .unwrap_or(0);
            transaction.notify_report(status, last_byte);
        }

        // The REPORT is a final state for the original transaction.
        if let Some(info) = info {
            self.store.remove(&info.transaction_id);
        }
        Ok(())
    }

    async fn receive_response(&self, response: Response) {
        self.established.store(true, Ordering::Release);
        debug!(
            "response received (code={}, transaction={})",
            response.status, response.transaction_id
        );

        if self.is_failure_report_requested() && !self.cancel_transfer.load(Ordering::Acquire) {
            let sample = lock(&self.progress).pop_front();
            if let Some(sample) = sample {
                if let Some(listener) = self.listener() {
                    listener
                        .on_progress(sample, self.total_size.load(Ordering::Acquire))
                        .await;
                }
            }
        }

        if let Some(transaction) = self.request_transaction() {
            transaction.notify_response(response.status);
        }
        if let Some(transaction) = self.send_transaction() {
            transaction.handle_response();
        }

        if response.status != consts::STATUS_200_OK {
            let info = self.store.by_transaction(&response.transaction_id);
            let (msg_id, kind) = info.as_ref().map_or((None, ChunkKind::Unknown), |info| {
                (info.caller_message_id.clone(), info.kind)
            });
            self.emit_error(
                msg_id.as_deref(),
                &format!("error response {}", response.status),
                kind,
            )
            .await;
            self.store.remove(&response.transaction_id);
        }
        // Entries answered with 200 stay registered; a REPORT may still
        // need the correlation later.
    }

    async fn notify_transferred(&self, msg_id: &str) {
        info!("message {msg_id} transferred");
        if let Some(listener) = self.listener() {
            listener.on_transferred(msg_id).await;
        }
    }

    fn sender(&self) -> Result<SenderHandle, MsrpError> {
        lock(&self.connection)
            .as_ref()
            .and_then(MsrpConnection::sender_handle)
            .ok_or(MsrpError::NotConfigured("open connection"))
    }

    fn listener(&self) -> Option<Arc<dyn MsrpEventListener>> { lock(&self.listener).clone() }

    fn request_transaction(&self) -> Option<Arc<RequestTransaction>> {
        lock(&self.request_transaction).clone()
    }

    fn report_transaction(&self) -> Option<Arc<ReportTransaction>> {
        lock(&self.report_transaction).clone()
    }

    fn send_transaction(&self) -> Option<Arc<SendTransaction>> {
        lock(&self.send_transaction).clone()
    }
}

impl std::fmt::Debug for MsrpSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MsrpSession")
            .field("from_path", &self.from_path)
            .field("to_path", &self.to_path)
            .field("established", &self.established)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

/// Wire and policy fields threaded through the chunk loop.
struct ChunkContext<'a> {
    to: &'a str,
    from: &'a str,
    wire_msg_id: &'a str,
    msg_id: &'a str,
    content_type: &'a str,
    total_size: u64,
    kind: ChunkKind,
    failure_report: bool,
    success_report: bool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Whether a request wants a response, per its Failure-Report header.
/// Absence means yes.
fn acknowledgement_requested(request: &Request) -> bool {
    !request
        .headers
        .get(consts::HEADER_FAILURE_REPORT)
        .is_some_and(|value| value.eq_ignore_ascii_case("no"))
}

fn success_report_requested(request: &Request) -> bool {
    request
        .headers
        .get(consts::HEADER_SUCCESS_REPORT)
        .is_some_and(|value| value.eq_ignore_ascii_case("yes"))
}

/// Read until `buf` is full or the stream ends.
async fn fill_chunk<R>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < buf.len() {
        let read = reader.read(&mut buf[filled..]).await?;
        if read == 0 {
            break;
        }
        filled += read;
    }
    Ok(filled)
}

fn generate_transaction_id() -> String { format!("{:x}", rand::random::<u64>()) }

fn generate_message_id() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(12)
        .map(char::from)
        .collect();
    format!("MID-{suffix}")
}
