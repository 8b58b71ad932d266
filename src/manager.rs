//! Session factory and lifecycle facade.
//!
//! An [`MsrpManager`] owns the local transport identity (address, port,
//! TLS flag) and builds client or server sessions from it, deriving the
//! local MSRP path advertised in SDP. It keeps at most one live session
//! and forwards transfer calls to it, which is the granularity the
//! signalling layer works at: one media session, one MSRP session.

use std::{
    net::IpAddr,
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use log::info;

use crate::{
    config::MsrpConfig,
    connection::MsrpConnection,
    consts,
    error::MsrpError,
    listener::{ChunkKind, MsrpEventListener},
    session::MsrpSession,
};

/// Factory for MSRP sessions bound to one local endpoint.
#[derive(Debug)]
pub struct MsrpManager {
    local_address: IpAddr,
    local_port: u16,
    secured: bool,
    /// Session identifier used in the local MSRP path. Unix time in
    /// milliseconds at construction, unique enough per endpoint.
    session_id: u64,
    config: MsrpConfig,
    session: Option<Arc<MsrpSession>>,
}

impl MsrpManager {
    /// Manager for the local endpoint `local_address:local_port`.
    #[must_use]
    pub fn new(local_address: IpAddr, local_port: u16, config: MsrpConfig) -> Self {
        let session_id = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(0));
        Self {
            local_address,
            local_port,
            secured: false,
            session_id,
            config,
            session: None,
        }
    }

    /// Use TLS-secured paths and transport protocol strings.
    pub fn set_secured(&mut self, secured: bool) { self.secured = secured; }

    #[must_use]
    pub fn is_secured(&self) -> bool { self.secured }

    #[must_use]
    pub fn local_port(&self) -> u16 { self.local_port }

    /// URI scheme for this endpoint's MSRP paths.
    #[must_use]
    pub fn msrp_protocol(&self) -> &'static str {
        if self.secured {
            consts::MSRP_SECURED_PROTOCOL
        } else {
            consts::MSRP_PROTOCOL
        }
    }

    /// Transport protocol string for the SDP media line.
    #[must_use]
    pub fn local_socket_protocol(&self) -> &'static str {
        if self.secured {
            consts::SOCKET_MSRP_SECURED_PROTOCOL
        } else {
            consts::SOCKET_MSRP_PROTOCOL
        }
    }

    /// Local MSRP path advertised to the peer, with IPv6 addresses in
    /// brackets.
    #[must_use]
    pub fn local_msrp_path(&self) -> String {
        let host = match self.local_address {
            IpAddr::V4(address) => address.to_string(),
            IpAddr::V6(address) => format!("[{address}]"),
        };
        format!(
            "{}://{}:{}/{};tcp",
            self.msrp_protocol(),
            host,
            self.local_port,
            self.session_id
        )
    }

    /// Create a session that dials the peer's endpoint when opened.
    pub fn create_client_session(
        &mut self,
        remote_host: impl Into<String>,
        remote_port: u16,
        remote_msrp_path: &str,
        listener: Arc<dyn MsrpEventListener>,
        fingerprint: Option<String>,
    ) -> Arc<MsrpSession> {
        info!("creating client session towards {remote_msrp_path}");
        let session = self.build_session(remote_msrp_path, listener);
        session.set_connection(MsrpConnection::client(
            remote_host,
            remote_port,
            self.secured,
            fingerprint,
        ));
        session
    }

    /// Create a session that accepts the peer on the local port when
    /// opened.
    pub fn create_server_session(
        &mut self,
        remote_msrp_path: &str,
        listener: Arc<dyn MsrpEventListener>,
    ) -> Arc<MsrpSession> {
        info!("creating server session for {remote_msrp_path}");
        let session = self.build_session(remote_msrp_path, listener);
        session.set_connection(MsrpConnection::server(self.local_port));
        session
    }

    fn build_session(
        &mut self,
        remote_msrp_path: &str,
        listener: Arc<dyn MsrpEventListener>,
    ) -> Arc<MsrpSession> {
        let session = MsrpSession::new(self.config);
        session.set_event_listener(listener);
        session.set_from_path(self.local_msrp_path());
        session.set_to_path(remote_msrp_path);
        self.session = Some(Arc::clone(&session));
        session
    }

    /// Establish the current session's connection.
    ///
    /// # Errors
    ///
    /// Returns [`MsrpError::NotConfigured`] when no session exists, or
    /// the session's own open failure.
    pub async fn open_session(&self) -> Result<(), MsrpError> {
        self.open_session_with_timeout(None).await
    }

    /// [`open_session`](Self::open_session) bounded by a setup timeout.
    ///
    /// # Errors
    ///
    /// As [`open_session`](Self::open_session), plus
    /// [`MsrpError::Timeout`].
    pub async fn open_session_with_timeout(
        &self,
        limit: Option<Duration>,
    ) -> Result<(), MsrpError> {
        self.current()?.open_with_timeout(limit).await
    }

    /// Transmit a message over the current session; see
    /// [`MsrpSession::send_chunks`].
    ///
    /// # Errors
    ///
    /// Returns [`MsrpError::NotConfigured`] when no session exists, plus
    /// the session's own failures.
    pub async fn send_chunks<R>(
        &self,
        reader: R,
        msg_id: &str,
        content_type: &str,
        total_size: u64,
        kind: ChunkKind,
    ) -> Result<(), MsrpError>
    where
        R: tokio::io::AsyncRead + Unpin + Send,
    {
        self.current()?
            .send_chunks(reader, msg_id, content_type, total_size, kind)
            .await
    }

    /// Send a keep-alive probe over the current session.
    ///
    /// # Errors
    ///
    /// Returns [`MsrpError::NotConfigured`] when no session exists, plus
    /// the session's own failures.
    pub async fn send_empty_chunk(&self) -> Result<(), MsrpError> {
        self.current()?.send_empty_chunk().await
    }

    /// Close and drop the current session, if any.
    pub fn close_session(&mut self) {
        if let Some(session) = self.session.take() {
            session.close();
        }
    }

    #[must_use]
    pub fn is_established(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.is_established())
    }

    #[must_use]
    pub fn session(&self) -> Option<&Arc<MsrpSession>> { self.session.as_ref() }

    fn current(&self) -> Result<&Arc<MsrpSession>, MsrpError> {
        self.session.as_ref().ok_or(MsrpError::NotConfigured("session"))
    }
}
