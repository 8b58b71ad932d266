//! Asynchronous MSRP (RFC 4975) transport engine.
//!
//! Implements the message-session half of an IM or file-transfer stack:
//! segmentation of outbound messages into SEND chunks, incremental
//! parsing and reassembly of inbound chunks, acknowledgment and success
//! REPORT correlation, all over one persistent TCP connection per
//! session.
//!
//! The building blocks layer as follows:
//!
//! - [`frame`] models requests, responses and the `Byte-Range` grammar,
//!   and [`decoder`] parses them incrementally off a byte stream,
//!   boundary-scanning chunks whose size is not announced.
//! - [`connection`] establishes the stream (dial, accept or a caller
//!   supplied duplex) and runs one receiver and one sender task over it.
//! - [`session`] orchestrates transfers: chunking, progress events,
//!   response and REPORT waiting, inbound reassembly and the event
//!   listener surface defined in [`listener`].
//! - [`manager`] derives local MSRP paths from the endpoint identity and
//!   hands out client or server sessions.
//!
//! A typical exchange:
//!
//! ```no_run
//! use std::{net::{IpAddr, Ipv4Addr}, sync::Arc};
//!
//! use msrp::{ChunkKind, MsrpConfig, MsrpEventListener, MsrpManager};
//!
//! struct Events;
//!
//! #[async_trait::async_trait]
//! impl MsrpEventListener for Events {
//!     async fn on_transferred(&self, msg_id: &str) {
//!         println!("delivered {msg_id}");
//!     }
//! }
//!
//! # async fn run() -> Result<(), msrp::MsrpError> {
//! let mut manager = MsrpManager::new(
//!     IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)),
//!     2855,
//!     MsrpConfig::default(),
//! );
//! let session = manager.create_client_session(
//!     "10.0.0.9",
//!     2855,
//!     "msrp://10.0.0.9:2855/17;tcp",
//!     Arc::new(Events),
//!     None,
//! );
//! session.set_failure_report_option(true);
//! manager.open_session().await?;
//! let body = b"hello over msrp" as &[u8];
//! manager
//!     .send_chunks(body, "msg-1", "text/plain", body.len() as u64, ChunkKind::TextMessage)
//!     .await?;
//! manager.close_session();
//! # Ok(())
//! # }
//! ```

pub mod buffer;
pub mod config;
pub mod connection;
pub mod consts;
pub mod decoder;
pub mod error;
pub mod frame;
pub mod listener;
pub mod manager;
pub mod metrics;
pub mod receiver;
pub mod sender;
pub mod session;
pub mod transaction;

pub use crate::{
    config::MsrpConfig,
    connection::{Endpoint, MsrpConnection},
    decoder::FrameDecoder,
    error::MsrpError,
    frame::{ByteRange, ContinuationFlag, Frame, Headers, Method, Request, Response},
    listener::{ChunkConsumption, ChunkKind, MsrpEventListener},
    manager::MsrpManager,
    sender::SenderHandle,
    session::MsrpSession,
};
