//! Protocol constants from RFC 4975.
//!
//! Tokens, header names, continuation flag characters and size limits used
//! by the frame model, the wire decoder and the session logic.

/// Protocol token opening every request and response line.
pub const MSRP_TOKEN: &str = "MSRP";

/// SEND method name.
pub const METHOD_SEND: &str = "SEND";
/// REPORT method name.
pub const METHOD_REPORT: &str = "REPORT";

/// Seven-dash prefix of the frame terminator line.
pub const END_MSRP_MSG: &str = "-------";

/// CRLF line ending used throughout the wire format.
pub const NEW_LINE: &str = "\r\n";

/// Maximum payload carried by a single SEND chunk, in bytes.
pub const CHUNK_MAX_SIZE: usize = 10240;

pub const HEADER_TO_PATH: &str = "To-Path";
pub const HEADER_FROM_PATH: &str = "From-Path";
pub const HEADER_MESSAGE_ID: &str = "Message-ID";
pub const HEADER_BYTE_RANGE: &str = "Byte-Range";
pub const HEADER_CONTENT_TYPE: &str = "Content-Type";
pub const HEADER_FAILURE_REPORT: &str = "Failure-Report";
pub const HEADER_SUCCESS_REPORT: &str = "Success-Report";
pub const HEADER_STATUS: &str = "Status";

/// Continuation flag ending a complete message.
pub const FLAG_LAST_CHUNK: char = '$';
/// Continuation flag announcing further chunks.
pub const FLAG_MORE_CHUNK: char = '+';
/// Continuation flag aborting the message.
pub const FLAG_ABORT_CHUNK: char = '#';

/// Status code used when acknowledging requests.
pub const STATUS_200_OK: u16 = 200;

/// URI scheme for plain MSRP paths.
pub const MSRP_PROTOCOL: &str = "msrp";
/// URI scheme for TLS-secured MSRP paths.
pub const MSRP_SECURED_PROTOCOL: &str = "msrps";

/// SDP transport protocol string for plain MSRP.
pub const SOCKET_MSRP_PROTOCOL: &str = "TCP/MSRP";
/// SDP transport protocol string for TLS-secured MSRP.
pub const SOCKET_MSRP_SECURED_PROTOCOL: &str = "TCP/TLS/MSRP";
