//! MSRP frame model and wire encoding.
//!
//! A [`Frame`] is either a request (SEND or REPORT) or a numeric-status
//! response. Requests may carry a body and always end with a
//! continuation flag; responses carry neither. Encoding writes CRLF line
//! endings and the seven-dash terminator line defined by RFC 4975.

pub mod byte_range;

use bytes::{BufMut, Bytes, BytesMut};

pub use self::byte_range::ByteRange;
use crate::consts;

/// Request method parsed from the start line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Method {
    Send,
    Report,
    /// A method this engine does not implement. Dispatched nowhere, but
    /// the pending transaction-info entry for its transaction is dropped.
    Other(String),
}

impl Method {
    #[must_use]
    pub fn parse(token: &str) -> Self {
        match token {
            consts::METHOD_SEND => Self::Send,
            consts::METHOD_REPORT => Self::Report,
            other => Self::Other(other.to_owned()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Send => consts::METHOD_SEND,
            Self::Report => consts::METHOD_REPORT,
            Self::Other(name) => name,
        }
    }
}

/// Continuation flag closing a request frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContinuationFlag {
    /// `+`, further chunks follow.
    More,
    /// `$`, final chunk of the message.
    Last,
    /// `#`, the sender aborted the message.
    Abort,
}

impl ContinuationFlag {
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::More => consts::FLAG_MORE_CHUNK,
            Self::Last => consts::FLAG_LAST_CHUNK,
            Self::Abort => consts::FLAG_ABORT_CHUNK,
        }
    }

    #[must_use]
    pub const fn from_char(c: char) -> Option<Self> {
        match c {
            consts::FLAG_MORE_CHUNK => Some(Self::More),
            consts::FLAG_LAST_CHUNK => Some(Self::Last),
            consts::FLAG_ABORT_CHUNK => Some(Self::Abort),
            _ => None,
        }
    }
}

/// Ordered header list. Keys are case-sensitive and the first occurrence
/// of a name wins on lookup.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Append a header, preserving insertion order.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    /// First value recorded under `name`, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Iterate headers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}

/// A SEND or REPORT request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Request {
    pub transaction_id: String,
    pub method: Method,
    pub headers: Headers,
    /// Body bytes, present only on data-bearing SENDs.
    pub body: Option<Bytes>,
    pub continuation: ContinuationFlag,
}

/// A numeric-status response. Never carries a body or a meaningful
/// continuation flag; its terminator line always ends in `$`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    pub transaction_id: String,
    pub status: u16,
    pub comment: Option<String>,
    pub headers: Headers,
}

/// One parsed or outbound MSRP frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    Request(Request),
    Response(Response),
}

impl Request {
    /// Build a data-bearing SEND chunk.
    ///
    /// Headers are written in the order the protocol guidelines expect:
    /// To-Path, From-Path, Message-ID, Byte-Range, the optional report
    /// headers and Content-Type.
    #[must_use]
    #[allow(clippy::too_many_arguments, reason = "wire fields of a SEND chunk")]
    pub fn data_send(
        transaction_id: impl Into<String>,
        to: &str,
        from: &str,
        message_id: &str,
        range: ByteRange,
        failure_report: bool,
        success_report: bool,
        content_type: Option<&str>,
        body: Bytes,
        continuation: ContinuationFlag,
    ) -> Self {
        let mut headers = Headers::new();
        headers.push(consts::HEADER_TO_PATH, to);
        headers.push(consts::HEADER_FROM_PATH, from);
        headers.push(consts::HEADER_MESSAGE_ID, message_id);
        headers.push(consts::HEADER_BYTE_RANGE, range.to_string());
        if failure_report {
            headers.push(consts::HEADER_FAILURE_REPORT, "yes");
        }
        if success_report {
            headers.push(consts::HEADER_SUCCESS_REPORT, "yes");
        }
        if let Some(content_type) = content_type {
            headers.push(consts::HEADER_CONTENT_TYPE, content_type);
        }
        Self {
            transaction_id: transaction_id.into(),
            method: Method::Send,
            headers,
            body: Some(body),
            continuation,
        }
    }

    /// Build a body-less SEND used as a keep-alive probe.
    #[must_use]
    pub fn empty_send(
        transaction_id: impl Into<String>,
        to: &str,
        from: &str,
        message_id: &str,
    ) -> Self {
        let mut headers = Headers::new();
        headers.push(consts::HEADER_TO_PATH, to);
        headers.push(consts::HEADER_FROM_PATH, from);
        headers.push(consts::HEADER_MESSAGE_ID, message_id);
        Self {
            transaction_id: transaction_id.into(),
            method: Method::Send,
            headers,
            body: None,
            continuation: ContinuationFlag::Last,
        }
    }

    /// Build a success REPORT for a fully received message.
    #[must_use]
    pub fn report(
        transaction_id: impl Into<String>,
        to: &str,
        from: &str,
        message_id: &str,
        last_byte: u64,
        total: u64,
    ) -> Self {
        let mut headers = Headers::new();
        headers.push(consts::HEADER_TO_PATH, to);
        headers.push(consts::HEADER_FROM_PATH, from);
        headers.push(consts::HEADER_MESSAGE_ID, message_id);
        headers.push(
            consts::HEADER_BYTE_RANGE,
            ByteRange::known(1, last_byte, total).to_string(),
        );
        headers.push(
            consts::HEADER_STATUS,
            format!("000 {} OK", consts::STATUS_200_OK),
        );
        Self {
            transaction_id: transaction_id.into(),
            method: Method::Report,
            headers,
            body: None,
            continuation: ContinuationFlag::Last,
        }
    }

    #[must_use]
    pub fn to_path(&self) -> Option<&str> { self.headers.get(consts::HEADER_TO_PATH) }

    #[must_use]
    pub fn from_path(&self) -> Option<&str> { self.headers.get(consts::HEADER_FROM_PATH) }

    #[must_use]
    pub fn message_id(&self) -> Option<&str> { self.headers.get(consts::HEADER_MESSAGE_ID) }
}

impl Response {
    /// Acknowledge `request` with `status`, mirroring its path headers.
    #[must_use]
    pub fn to_request(request: &Request, status: u16) -> Self {
        let mut headers = Headers::new();
        if let Some(from) = request.from_path() {
            headers.push(consts::HEADER_TO_PATH, from);
        }
        if let Some(to) = request.to_path() {
            headers.push(consts::HEADER_FROM_PATH, to);
        }
        Self {
            transaction_id: request.transaction_id.clone(),
            status,
            comment: (status == consts::STATUS_200_OK).then(|| "OK".to_owned()),
            headers,
        }
    }
}

impl Frame {
    #[must_use]
    pub fn transaction_id(&self) -> &str {
        match self {
            Self::Request(request) => &request.transaction_id,
            Self::Response(response) => &response.transaction_id,
        }
    }

    /// Serialise the frame, appending the bytes to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) {
        match self {
            Self::Request(request) => request.encode(dst),
            Self::Response(response) => response.encode(dst),
        }
    }

    /// Serialise the frame into a freshly allocated buffer.
    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        let mut dst = BytesMut::with_capacity(256);
        self.encode(&mut dst);
        dst.freeze()
    }
}

impl Request {
    /// Serialise the request, appending the bytes to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) {
        let body_len = self.body.as_ref().map_or(0, Bytes::len);
        dst.reserve(128 + body_len);
        dst.put_slice(consts::MSRP_TOKEN.as_bytes());
        dst.put_u8(b' ');
        dst.put_slice(self.transaction_id.as_bytes());
        dst.put_u8(b' ');
        dst.put_slice(self.method.as_str().as_bytes());
        put_crlf(dst);
        put_headers(dst, &self.headers);
        if let Some(body) = &self.body {
            put_crlf(dst);
            dst.put_slice(body);
            put_crlf(dst);
        }
        put_end_line(dst, &self.transaction_id, self.continuation.as_char());
    }
}

impl Response {
    /// Serialise the response, appending the bytes to `dst`.
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(128);
        dst.put_slice(consts::MSRP_TOKEN.as_bytes());
        dst.put_u8(b' ');
        dst.put_slice(self.transaction_id.as_bytes());
        dst.put_slice(format!(" {}", self.status).as_bytes());
        if let Some(comment) = &self.comment {
            dst.put_u8(b' ');
            dst.put_slice(comment.as_bytes());
        }
        put_crlf(dst);
        put_headers(dst, &self.headers);
        put_end_line(dst, &self.transaction_id, consts::FLAG_LAST_CHUNK);
    }
}

fn put_crlf(dst: &mut BytesMut) { dst.put_slice(consts::NEW_LINE.as_bytes()); }

fn put_headers(dst: &mut BytesMut, headers: &Headers) {
    for (name, value) in headers.iter() {
        dst.put_slice(name.as_bytes());
        dst.put_slice(b": ");
        dst.put_slice(value.as_bytes());
        put_crlf(dst);
    }
}

fn put_end_line(dst: &mut BytesMut, transaction_id: &str, flag: char) {
    dst.put_slice(consts::END_MSRP_MSG.as_bytes());
    dst.put_slice(transaction_id.as_bytes());
    let mut flag_buf = [0u8; 4];
    dst.put_slice(flag.encode_utf8(&mut flag_buf).as_bytes());
    put_crlf(dst);
}

/// Parse a `Status` header of the form `000 <code> <comment>`.
#[must_use]
pub fn parse_status(value: &str) -> Option<u16> {
    value.split_whitespace().nth(1).and_then(|code| code.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_send_encodes_headers_body_and_terminator() {
        let request = Request::data_send(
            "tx1",
            "msrp://peer/1;tcp",
            "msrp://local/2;tcp",
            "MID-abc",
            ByteRange::known(1, 5, 5),
            true,
            false,
            Some("text/plain"),
            Bytes::from_static(b"hello"),
            ContinuationFlag::Last,
        );
        let wire = Frame::Request(request).to_bytes();
        let expected = "MSRP tx1 SEND\r\n\
                        To-Path: msrp://peer/1;tcp\r\n\
                        From-Path: msrp://local/2;tcp\r\n\
                        Message-ID: MID-abc\r\n\
                        Byte-Range: 1-5/5\r\n\
                        Failure-Report: yes\r\n\
                        Content-Type: text/plain\r\n\
                        \r\n\
                        hello\r\n\
                        -------tx1$\r\n";
        assert_eq!(wire.as_ref(), expected.as_bytes());
    }

    #[test]
    fn empty_send_has_no_blank_line() {
        let request = Request::empty_send("tx2", "msrp://a/1;tcp", "msrp://b/2;tcp", "MID-k");
        let wire = Frame::Request(request).to_bytes();
        let text = std::str::from_utf8(&wire).unwrap();
        assert!(text.ends_with("Message-ID: MID-k\r\n-------tx2$\r\n"));
        assert!(!text.contains("\r\n\r\n"));
    }

    #[test]
    fn response_mirrors_request_paths() {
        let request = Request::empty_send("tx3", "msrp://a/1;tcp", "msrp://b/2;tcp", "MID-k");
        let response = Response::to_request(&request, 200);
        assert_eq!(response.headers.get("To-Path"), Some("msrp://b/2;tcp"));
        assert_eq!(response.headers.get("From-Path"), Some("msrp://a/1;tcp"));
        let text = String::from_utf8(Frame::Response(response).to_bytes().to_vec()).unwrap();
        assert!(text.starts_with("MSRP tx3 200 OK\r\n"));
        assert!(text.ends_with("-------tx3$\r\n"));
    }

    #[test]
    fn report_carries_status_and_range() {
        let request = Request::report("tx4", "to", "from", "MID-r", 305, 305);
        assert_eq!(request.headers.get("Status"), Some("000 200 OK"));
        assert_eq!(request.headers.get("Byte-Range"), Some("1-305/305"));
        assert_eq!(request.body, None);
    }

    #[test]
    fn first_header_occurrence_wins() {
        let mut headers = Headers::new();
        headers.push("Message-ID", "first");
        headers.push("Message-ID", "second");
        assert_eq!(headers.get("Message-ID"), Some("first"));
    }

    #[test]
    fn status_header_parses_middle_token() {
        assert_eq!(parse_status("000 200 OK"), Some(200));
        assert_eq!(parse_status("000 413 413"), Some(413));
        assert_eq!(parse_status("garbage"), None);
        assert_eq!(parse_status(""), None);
    }
}
