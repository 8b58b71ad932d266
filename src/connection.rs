//! Connection lifecycle over persistent TCP.
//!
//! An [`MsrpConnection`] either dials a remote endpoint or accepts a
//! single inbound stream, then splits it between one receiver task and
//! one sender task tied together by a shared [`CancellationToken`].
//! [`attach`](MsrpConnection::attach) wires the same task pair over any
//! duplex stream, which is how in-process tests drive the engine without
//! sockets.

use std::{sync::Arc, time::Duration};

use log::{debug, info, warn};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::{TcpListener, TcpStream},
    task::JoinHandle,
    time::timeout,
};
use tokio_util::sync::CancellationToken;

use crate::{
    error::MsrpError,
    metrics,
    receiver::spawn_receiver,
    sender::{SenderHandle, spawn_sender},
    session::MsrpSession,
};

/// Where the connection's byte stream comes from.
#[derive(Clone, Debug)]
pub enum Endpoint {
    /// Dial out to a remote MSRP endpoint.
    Client {
        host: String,
        port: u16,
        secured: bool,
        /// TLS fingerprint advertised in SDP, kept for session setup only.
        fingerprint: Option<String>,
    },
    /// Accept exactly one inbound stream on a local port.
    Server { port: u16 },
    /// Stream supplied by the caller through [`MsrpConnection::attach`].
    Attached,
}

/// One MSRP transport connection and its task pair.
#[derive(Debug)]
pub struct MsrpConnection {
    endpoint: Endpoint,
    cancel: CancellationToken,
    sender: Option<SenderHandle>,
    tasks: Vec<JoinHandle<()>>,
    read_timeout: Option<Duration>,
}

impl MsrpConnection {
    /// Connection that will dial `host:port` when opened.
    #[must_use]
    pub fn client(host: impl Into<String>, port: u16, secured: bool, fingerprint: Option<String>) -> Self {
        Self::new(Endpoint::Client {
            host: host.into(),
            port,
            secured,
            fingerprint,
        })
    }

    /// Connection that will accept one peer on `port` when opened.
    #[must_use]
    pub fn server(port: u16) -> Self { Self::new(Endpoint::Server { port }) }

    /// Connection over a stream the caller already holds; see
    /// [`attach`](Self::attach).
    #[must_use]
    pub fn attached() -> Self { Self::new(Endpoint::Attached) }

    fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            cancel: CancellationToken::new(),
            sender: None,
            tasks: Vec::new(),
            read_timeout: None,
        }
    }

    #[must_use]
    pub fn endpoint(&self) -> &Endpoint { &self.endpoint }

    /// Bound each socket read once the connection is open. `None` (the
    /// default) waits indefinitely.
    pub fn set_read_timeout(&mut self, read_timeout: Option<Duration>) {
        self.read_timeout = read_timeout;
    }

    /// Handle for queueing outbound frames, once the connection is open.
    #[must_use]
    pub fn sender_handle(&self) -> Option<SenderHandle> { self.sender.clone() }

    /// Token that interrupts a pending dial or accept and stops the task
    /// pair.
    pub(crate) fn cancel_token(&self) -> CancellationToken { self.cancel.clone() }

    /// Establish the stream and start the task pair.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the dial or accept fails, or
    /// [`MsrpError::Closed`] when the connection was already closed.
    pub async fn open(&mut self, session: Arc<MsrpSession>) -> Result<(), MsrpError> {
        self.open_with_timeout(session, None).await
    }

    /// [`open`](Self::open) bounded by an optional setup timeout.
    ///
    /// # Errors
    ///
    /// As [`open`](Self::open), plus [`MsrpError::Timeout`] when the
    /// stream is not established within `limit`.
    pub async fn open_with_timeout(
        &mut self,
        session: Arc<MsrpSession>,
        limit: Option<Duration>,
    ) -> Result<(), MsrpError> {
        if self.cancel.is_cancelled() {
            return Err(MsrpError::Closed);
        }
        let stream = match limit {
            Some(limit) => timeout(limit, self.establish())
                .await
                .map_err(|_| MsrpError::Timeout(limit))??,
            None => self.establish().await?,
        };
        stream.set_nodelay(true)?;
        self.start_tasks(stream, session);
        Ok(())
    }

    async fn establish(&self) -> Result<TcpStream, MsrpError> {
        match &self.endpoint {
            Endpoint::Client {
                host,
                port,
                secured,
                ..
            } => {
                info!("connecting to {host}:{port} (secured: {secured})");
                let stream = tokio::select! {
                    () = self.cancel.cancelled() => return Err(MsrpError::Closed),
                    connected = TcpStream::connect((host.as_str(), *port)) => connected?,
                };
                Ok(stream)
            }
            Endpoint::Server { port } => {
                let listener = TcpListener::bind(("0.0.0.0", *port)).await?;
                info!("waiting for peer on port {port}");
                let accepted = tokio::select! {
                    () = self.cancel.cancelled() => return Err(MsrpError::Closed),
                    accepted = listener.accept() => accepted?,
                };
                let (stream, peer) = accepted;
                debug!("accepted peer {peer}");
                Ok(stream)
            }
            Endpoint::Attached => Err(MsrpError::NotConfigured("attached stream")),
        }
    }

    /// Run the task pair over an already established duplex stream.
    pub fn attach<S>(
        &mut self,
        stream: S,
        session: Arc<MsrpSession>,
        read_timeout: Option<Duration>,
    ) where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        let receiver = spawn_receiver(reader, session, self.cancel.clone(), read_timeout);
        let (handle, sender_task) = spawn_sender(writer, self.cancel.clone());
        self.sender = Some(handle);
        self.tasks.push(receiver);
        self.tasks.push(sender_task);
        metrics::inc_connections();
    }

    fn start_tasks(&mut self, stream: TcpStream, session: Arc<MsrpSession>) {
        let (reader, writer) = stream.into_split();
        let receiver = spawn_receiver(reader, session, self.cancel.clone(), self.read_timeout);
        let (handle, sender_task) = spawn_sender(writer, self.cancel.clone());
        self.sender = Some(handle);
        self.tasks.push(receiver);
        self.tasks.push(sender_task);
        metrics::inc_connections();
    }

    /// Stop both tasks and release the stream. Safe to call repeatedly.
    pub fn close(&mut self) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.cancel.cancel();
        if self.sender.take().is_some() {
            metrics::dec_connections();
        }
        for task in self.tasks.drain(..) {
            task.abort();
        }
        debug!("connection closed");
    }
}

impl Drop for MsrpConnection {
    fn drop(&mut self) {
        if !self.cancel.is_cancelled() {
            warn!("connection dropped without close");
            self.close();
        }
    }
}
