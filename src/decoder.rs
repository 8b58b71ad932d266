//! Incremental MSRP wire decoder.
//!
//! [`FrameDecoder`] implements [`tokio_util::codec::Decoder`], consuming
//! bytes from a reassembly buffer as the receiver task reads them off the
//! socket. Frames are parsed start line first, then headers, then either
//! an exact-size body (when `Byte-Range` announces the chunk size) or a
//! boundary scan for the `-------<txid>` terminator (when the size is
//! unknown). Boundary scans are capped at [`CHUNK_MAX_SIZE`] so a frame
//! that never produces its terminator cannot exhaust memory; overflow is
//! treated as end-of-message. Announced chunk sizes above the same cap
//! are rejected before any body byte is buffered.
//!
//! Any start line or header that does not match the grammar is a fatal
//! framing error; the receiver terminates the connection on it.

use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::Decoder;

use crate::{
    consts::{self, CHUNK_MAX_SIZE},
    error::MsrpError,
    frame::{ContinuationFlag, Frame, Headers, Method, Request, Response, byte_range},
};

/// Stateful decoder turning a raw byte stream into [`Frame`] values.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    state: State,
}

#[derive(Debug, Default)]
enum State {
    #[default]
    StartLine,
    Headers(Partial),
    /// Reading an exact-size body followed by CRLF.
    Body {
        partial: Partial,
        size: usize,
    },
    /// Body consumed, awaiting the terminator line.
    EndLine {
        partial: Partial,
        body: Bytes,
    },
    /// Unknown chunk size, scanning for `CRLF-------<txid>`.
    Scan(Partial),
}

#[derive(Debug)]
struct Partial {
    transaction_id: String,
    kind: StartKind,
    headers: Headers,
    /// `-------<txid>`, the terminator line prefix for this frame.
    end_marker: Vec<u8>,
}

#[derive(Debug)]
enum StartKind {
    Request(Method),
    Response { status: u16, comment: Option<String> },
}

impl FrameDecoder {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    fn decode_step(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, MsrpError> {
        loop {
            match std::mem::take(&mut self.state) {
                State::StartLine => {
                    let Some(line) = take_line(src)? else {
                        return Ok(None);
                    };
                    if line.is_empty() {
                        // Stray CRLF between frames, skip it.
                        continue;
                    }
                    self.state = State::Headers(parse_start_line(&line)?);
                }
                State::Headers(mut partial) => {
                    let Some(line) = take_line(src)? else {
                        self.state = State::Headers(partial);
                        return Ok(None);
                    };
                    if line.is_empty() {
                        if matches!(partial.kind, StartKind::Response { .. }) {
                            return Err(MsrpError::Framing(
                                "response must not carry a body".into(),
                            ));
                        }
                        let size = partial
                            .headers
                            .get(consts::HEADER_BYTE_RANGE)
                            .and_then(byte_range::chunk_size_of);
                        self.state = match size {
                            Some(size) => {
                                let size = usize::try_from(size).map_err(|_| {
                                    MsrpError::Framing(format!("chunk size {size} out of range"))
                                })?;
                                if size > CHUNK_MAX_SIZE {
                                    return Err(MsrpError::Framing(format!(
                                        "announced chunk size {size} exceeds the \
                                         {CHUNK_MAX_SIZE} byte cap"
                                    )));
                                }
                                State::Body { partial, size }
                            }
                            None => State::Scan(partial),
                        };
                    } else if let Some(rest) = strip_marker(&line, &partial.end_marker) {
                        let flag = parse_flag(rest)?;
                        return finish(partial, None, flag).map(Some);
                    } else if let Some((name, value)) = line.split_once(':') {
                        partial.headers.push(name.trim(), value.trim());
                        self.state = State::Headers(partial);
                    } else {
                        return Err(MsrpError::Framing(format!("invalid header line: {line}")));
                    }
                }
                State::Body { partial, size } => {
                    if src.len() < size + consts::NEW_LINE.len() {
                        self.state = State::Body { partial, size };
                        return Ok(None);
                    }
                    let body = src.split_to(size).freeze();
                    if !src.starts_with(consts::NEW_LINE.as_bytes()) {
                        return Err(MsrpError::Framing(
                            "chunk body not followed by CRLF".into(),
                        ));
                    }
                    src.advance(consts::NEW_LINE.len());
                    self.state = State::EndLine { partial, body };
                }
                State::EndLine { partial, body } => {
                    let Some(line) = take_line(src)? else {
                        self.state = State::EndLine { partial, body };
                        return Ok(None);
                    };
                    let Some(rest) = strip_marker(&line, &partial.end_marker) else {
                        return Err(MsrpError::Framing(format!(
                            "expected terminator line, got: {line}"
                        )));
                    };
                    let flag = parse_flag(rest)?;
                    return finish(partial, Some(body), flag).map(Some);
                }
                State::Scan(partial) => {
                    // Terminator is preceded by the CRLF that closes the body.
                    let mut pattern =
                        Vec::with_capacity(consts::NEW_LINE.len() + partial.end_marker.len());
                    pattern.extend_from_slice(consts::NEW_LINE.as_bytes());
                    pattern.extend_from_slice(&partial.end_marker);
                    if let Some(at) = find(src, &pattern) {
                        let tail = at + pattern.len();
                        if src.len() < tail + 1 + consts::NEW_LINE.len() {
                            self.state = State::Scan(partial);
                            return Ok(None);
                        }
                        let body = src.split_to(at).freeze();
                        src.advance(pattern.len());
                        let flag_char = char::from(src[0]);
                        src.advance(1);
                        if !src.starts_with(consts::NEW_LINE.as_bytes()) {
                            return Err(MsrpError::Framing(
                                "terminator line not followed by CRLF".into(),
                            ));
                        }
                        src.advance(consts::NEW_LINE.len());
                        let flag = ContinuationFlag::from_char(flag_char).ok_or_else(|| {
                            MsrpError::Framing(format!(
                                "invalid continuation flag: {flag_char:?}"
                            ))
                        })?;
                        return finish(partial, Some(body), flag).map(Some);
                    }
                    if src.len() > CHUNK_MAX_SIZE + pattern.len() {
                        // No terminator within the chunk cap; treat what we
                        // have as the end of the message.
                        let body = src.split_to(CHUNK_MAX_SIZE).freeze();
                        return finish(partial, Some(body), ContinuationFlag::Last).map(Some);
                    }
                    self.state = State::Scan(partial);
                    return Ok(None);
                }
            }
        }
    }
}

impl Decoder for FrameDecoder {
    type Item = Frame;
    type Error = MsrpError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, MsrpError> {
        self.decode_step(src)
    }
}

/// Split one CRLF-terminated line off `src`, or `None` if incomplete.
fn take_line(src: &mut BytesMut) -> Result<Option<String>, MsrpError> {
    let Some(at) = find(src, consts::NEW_LINE.as_bytes()) else {
        return Ok(None);
    };
    let line = src.split_to(at);
    src.advance(consts::NEW_LINE.len());
    String::from_utf8(line.to_vec())
        .map(Some)
        .map_err(|_| MsrpError::Framing("non-UTF-8 text outside chunk body".into()))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn parse_start_line(line: &str) -> Result<Partial, MsrpError> {
    let mut tokens = line.split(' ');
    let (Some(token), Some(transaction_id), Some(third)) =
        (tokens.next(), tokens.next(), tokens.next())
    else {
        return Err(MsrpError::Framing(format!("short start line: {line}")));
    };
    if token != consts::MSRP_TOKEN || transaction_id.is_empty() {
        return Err(MsrpError::Framing(format!("not an MSRP start line: {line}")));
    }
    let kind = match third.parse::<u16>() {
        Ok(status) => {
            let comment = tokens.collect::<Vec<_>>().join(" ");
            StartKind::Response {
                status,
                comment: (!comment.is_empty()).then_some(comment),
            }
        }
        Err(_) => StartKind::Request(Method::parse(third)),
    };
    Ok(Partial {
        end_marker: format!("{}{transaction_id}", consts::END_MSRP_MSG).into_bytes(),
        transaction_id: transaction_id.to_owned(),
        kind,
        headers: Headers::new(),
    })
}

/// Return the text after the end marker when `line` is this frame's
/// terminator line.
fn strip_marker<'a>(line: &'a str, end_marker: &[u8]) -> Option<&'a str> {
    line.as_bytes()
        .starts_with(end_marker)
        .then(|| &line[end_marker.len()..])
}

fn parse_flag(rest: &str) -> Result<ContinuationFlag, MsrpError> {
    let mut chars = rest.chars();
    match (chars.next().and_then(ContinuationFlag::from_char), chars.next()) {
        (Some(flag), None) => Ok(flag),
        _ => Err(MsrpError::Framing(format!(
            "invalid continuation flag: {rest:?}"
        ))),
    }
}

fn finish(
    partial: Partial,
    body: Option<Bytes>,
    flag: ContinuationFlag,
) -> Result<Frame, MsrpError> {
    match partial.kind {
        StartKind::Response { status, comment } => Ok(Frame::Response(Response {
            transaction_id: partial.transaction_id,
            status,
            comment,
            headers: partial.headers,
        })),
        StartKind::Request(method) => {
            if matches!(method, Method::Report) && body.is_some() {
                return Err(MsrpError::Framing("REPORT must not carry a body".into()));
            }
            Ok(Frame::Request(Request {
                transaction_id: partial.transaction_id,
                method,
                headers: partial.headers,
                body,
                continuation: flag,
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rstest::rstest;

    use super::*;
    use crate::frame::ByteRange;

    fn decode_all(wire: &[u8]) -> Vec<Frame> {
        let mut decoder = FrameDecoder::new();
        let mut src = BytesMut::from(wire);
        let mut frames = Vec::new();
        while let Some(frame) = decoder.decode(&mut src).expect("decode") {
            frames.push(frame);
        }
        frames
    }

    #[test]
    fn decodes_send_with_known_byte_range() {
        let wire = b"MSRP tx9 SEND\r\n\
                     To-Path: msrp://a/1;tcp\r\n\
                     From-Path: msrp://b/2;tcp\r\n\
                     Message-ID: MID-1\r\n\
                     Byte-Range: 1-5/5\r\n\
                     \r\n\
                     hello\r\n\
                     -------tx9$\r\n";
        let frames = decode_all(wire);
        assert_eq!(frames.len(), 1);
        let Frame::Request(request) = &frames[0] else {
            panic!("expected a request");
        };
        assert_eq!(request.method, Method::Send);
        assert_eq!(request.body.as_deref(), Some(b"hello".as_slice()));
        assert_eq!(request.continuation, ContinuationFlag::Last);
    }

    #[test]
    fn decodes_response_without_body() {
        let wire = b"MSRP tx1 200 OK\r\n\
                     To-Path: msrp://b/2;tcp\r\n\
                     From-Path: msrp://a/1;tcp\r\n\
                     -------tx1$\r\n";
        let frames = decode_all(wire);
        let Frame::Response(response) = &frames[0] else {
            panic!("expected a response");
        };
        assert_eq!(response.status, 200);
        assert_eq!(response.comment.as_deref(), Some("OK"));
    }

    #[test]
    fn decodes_header_only_report() {
        let wire = b"MSRP txr REPORT\r\n\
                     To-Path: msrp://a/1;tcp\r\n\
                     From-Path: msrp://b/2;tcp\r\n\
                     Status: 000 413 413\r\n\
                     Message-ID: MID-3\r\n\
                     Byte-Range: 1-305/305\r\n\
                     -------txr$\r\n";
        let frames = decode_all(wire);
        let Frame::Request(request) = &frames[0] else {
            panic!("expected a request");
        };
        assert_eq!(request.method, Method::Report);
        assert_eq!(request.body, None);
        assert_eq!(request.headers.get("Status"), Some("000 413 413"));
    }

    #[test]
    fn decodes_empty_send_as_bodyless() {
        let wire = b"MSRP txe SEND\r\n\
                     To-Path: msrp://a/1;tcp\r\n\
                     From-Path: msrp://b/2;tcp\r\n\
                     Message-ID: MID-e\r\n\
                     -------txe$\r\n";
        let frames = decode_all(wire);
        let Frame::Request(request) = &frames[0] else {
            panic!("expected a request");
        };
        assert_eq!(request.body, None);
    }

    #[test]
    fn unknown_total_body_is_boundary_scanned() {
        let wire = b"MSRP txu SEND\r\n\
                     Message-ID: MID-u\r\n\
                     Byte-Range: 1-*/*\r\n\
                     \r\n\
                     partial body bytes\r\n\
                     -------txu+\r\n";
        let frames = decode_all(wire);
        let Frame::Request(request) = &frames[0] else {
            panic!("expected a request");
        };
        assert_eq!(request.body.as_deref(), Some(b"partial body bytes".as_slice()));
        assert_eq!(request.continuation, ContinuationFlag::More);
    }

    #[test]
    fn scanned_body_may_contain_crlf() {
        let wire = b"MSRP txs SEND\r\n\
                     Byte-Range: 1-*/*\r\n\
                     \r\n\
                     line one\r\nline two\r\n\
                     -------txs$\r\n";
        let frames = decode_all(wire);
        let Frame::Request(request) = &frames[0] else {
            panic!("expected a request");
        };
        assert_eq!(request.body.as_deref(), Some(b"line one\r\nline two".as_slice()));
    }

    #[test]
    fn incremental_delivery_yields_one_frame() {
        let wire: &[u8] = b"MSRP txi SEND\r\n\
                            Message-ID: MID-i\r\n\
                            Byte-Range: 1-4/4\r\n\
                            \r\n\
                            data\r\n\
                            -------txi$\r\n";
        let mut decoder = FrameDecoder::new();
        let mut src = BytesMut::new();
        let mut frames = Vec::new();
        for chunk in wire.chunks(3) {
            src.extend_from_slice(chunk);
            while let Some(frame) = decoder.decode(&mut src).expect("decode") {
                frames.push(frame);
            }
        }
        assert_eq!(frames.len(), 1);
        assert!(src.is_empty());
    }

    #[rstest]
    #[case(b"GARBAGE tx SEND\r\n".as_slice())]
    #[case(b"MSRP tx\r\n".as_slice())]
    #[case(b"MSRP tx SEND\r\nno-colon-header\r\n".as_slice())]
    fn malformed_framing_is_fatal(#[case] wire: &[u8]) {
        let mut decoder = FrameDecoder::new();
        let mut src = BytesMut::from(wire);
        let result = decoder.decode(&mut src);
        assert!(matches!(result, Err(MsrpError::Framing(_))));
    }

    #[test]
    fn response_with_body_is_a_framing_error() {
        let wire = b"MSRP tx 200 OK\r\nTo-Path: x\r\n\r\nbody\r\n-------tx$\r\n";
        let mut decoder = FrameDecoder::new();
        let mut src = BytesMut::from(wire.as_slice());
        assert!(matches!(
            decoder.decode(&mut src),
            Err(MsrpError::Framing(_))
        ));
    }

    #[test]
    fn announced_size_above_the_chunk_cap_is_rejected() {
        let wire = b"MSRP txg SEND\r\n\
                     Message-ID: MID-g\r\n\
                     Byte-Range: 1-1073741824/1073741824\r\n\
                     \r\n";
        let mut decoder = FrameDecoder::new();
        let mut src = BytesMut::from(wire.as_slice());
        assert!(matches!(
            decoder.decode(&mut src),
            Err(MsrpError::Framing(_))
        ));
    }

    #[test]
    fn runaway_scan_is_capped_at_chunk_size() {
        let mut src = BytesMut::new();
        src.extend_from_slice(b"MSRP txb SEND\r\nByte-Range: 1-*/*\r\n\r\n");
        src.extend_from_slice(&vec![b'x'; consts::CHUNK_MAX_SIZE + 64]);
        let mut decoder = FrameDecoder::new();
        let frame = decoder.decode(&mut src).expect("decode").expect("frame");
        let Frame::Request(request) = frame else {
            panic!("expected a request");
        };
        assert_eq!(request.body.map(|b| b.len()), Some(consts::CHUNK_MAX_SIZE));
        assert_eq!(request.continuation, ContinuationFlag::Last);
    }

    proptest! {
        #[test]
        fn known_size_bodies_round_trip(body in proptest::collection::vec(any::<u8>(), 1..2048)) {
            let len = body.len() as u64;
            let request = Request::data_send(
                "txp",
                "msrp://a/1;tcp",
                "msrp://b/2;tcp",
                "MID-p",
                ByteRange::known(1, len, len),
                false,
                false,
                Some("application/octet-stream"),
                Bytes::from(body.clone()),
                ContinuationFlag::Last,
            );
            let wire = Frame::Request(request.clone()).to_bytes();
            let mut decoder = FrameDecoder::new();
            let mut src = BytesMut::from(wire.as_ref());
            let decoded = decoder.decode(&mut src).unwrap().unwrap();
            prop_assert_eq!(decoded, Frame::Request(request));
            prop_assert!(src.is_empty());
        }
    }
}
