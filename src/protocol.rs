//! gRPC-web frame codec.
//!
//! Every unit on the wire is a five byte header followed by a payload:
//!
//! ```text
//! [flag:1][length:4, big-endian][payload:length]
//! ```
//!
//! A flag with the high bit set marks a trailer frame. Its payload is a block of
//! ASCII `key:value\r\n` lines carrying `grpc-status` and, optionally,
//! `grpc-message`. The trailer travels inside the response body, not in HTTP
//! trailers, so it has to be recovered here.

use crate::error::Result;
use bytes::{BufMut, Bytes, BytesMut};
use prost::Message;
use std::borrow::Cow;
use std::fmt;
use thiserror::Error;

/// Flag byte plus 4-byte length.
pub const HEADER_LEN: usize = 5;
/// Uncompressed data frame.
pub const FLAG_DATA: u8 = 0x00;
/// Compressed data frame (never negotiated by this client).
pub const FLAG_COMPRESSED: u8 = 0x01;
/// Trailer frame.
pub const FLAG_TRAILER: u8 = 0x80;
/// Largest payload accepted from the service.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Buffer too small: need {need} bytes, got {got}")]
    BufferTooSmall { need: usize, got: usize },
    #[error("Frame too large: {0} bytes")]
    FrameTooLarge(usize),
    #[error("Compressed frames are not supported")]
    Compressed,
    #[error("Malformed trailer line: {0:?}")]
    MalformedTrailer(String),
    #[error("Trailer is missing grpc-status")]
    MissingStatus,
    #[error("Invalid grpc-status: {0:?}")]
    InvalidStatus(String),
    #[error("Response carried no message")]
    MissingMessage,
    #[error("Stream ended with {buffered} bytes of an incomplete frame")]
    Incomplete { buffered: usize },
    #[error("Protobuf decoding failed: {0}")]
    Message(#[from] prost::DecodeError),
}

/// Canonical gRPC status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GrpcCode {
    Ok,
    Cancelled,
    Unknown,
    InvalidArgument,
    DeadlineExceeded,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    ResourceExhausted,
    FailedPrecondition,
    Aborted,
    OutOfRange,
    Unimplemented,
    Internal,
    Unavailable,
    DataLoss,
    Unauthenticated,
    Other(u32),
}

impl From<u32> for GrpcCode {
    fn from(v: u32) -> Self {
        match v {
            0 => Self::Ok,
            1 => Self::Cancelled,
            2 => Self::Unknown,
            3 => Self::InvalidArgument,
            4 => Self::DeadlineExceeded,
            5 => Self::NotFound,
            6 => Self::AlreadyExists,
            7 => Self::PermissionDenied,
            8 => Self::ResourceExhausted,
            9 => Self::FailedPrecondition,
            10 => Self::Aborted,
            11 => Self::OutOfRange,
            12 => Self::Unimplemented,
            13 => Self::Internal,
            14 => Self::Unavailable,
            15 => Self::DataLoss,
            16 => Self::Unauthenticated,
            other => Self::Other(other),
        }
    }
}

impl fmt::Display for GrpcCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other(v) => write!(f, "status {}", v),
            code => write!(f, "{:?}", code),
        }
    }
}

/// A service-level rejection carried in a trailer frame.
///
/// The message is kept as raw bytes; the service does not promise UTF-8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrpcError {
    pub status: u32,
    pub message: Bytes,
}

impl fmt::Display for GrpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gRPC error {}: {}", self.code(), self.message_lossy())
    }
}

impl std::error::Error for GrpcError {}

impl GrpcError {
    pub fn new(status: u32, message: impl Into<Bytes>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn code(&self) -> GrpcCode {
        GrpcCode::from(self.status)
    }

    pub fn message_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.message)
    }
}

/// Parsed trailer frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trailer {
    pub status: u32,
    pub message: Option<Bytes>,
    /// Any other `key:value` lines, keys lowercased.
    pub metadata: Vec<(String, Bytes)>,
}

impl Trailer {
    /// Trailer with the given status and no message.
    pub fn with_status(status: u32) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }

    /// Parse a trailer payload.
    ///
    /// Lines are separated by CRLF (a bare LF is accepted); the key is split
    /// at the first colon.
    pub fn parse(payload: &[u8]) -> Result<Self, DecodeError> {
        let mut status = None;
        let mut message = None;
        let mut metadata = Vec::new();

        for line in payload.split(|&b| b == b'\n') {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            if line.is_empty() {
                continue;
            }

            let colon = line.iter().position(|&b| b == b':').ok_or_else(|| {
                DecodeError::MalformedTrailer(String::from_utf8_lossy(line).into_owned())
            })?;
            let key = String::from_utf8_lossy(trim(&line[..colon])).to_ascii_lowercase();
            let value = trim(&line[colon + 1..]);

            match key.as_str() {
                "grpc-status" => {
                    let parsed = std::str::from_utf8(value)
                        .ok()
                        .and_then(|v| v.parse::<u32>().ok())
                        .ok_or_else(|| {
                            DecodeError::InvalidStatus(String::from_utf8_lossy(value).into_owned())
                        })?;
                    status = Some(parsed);
                }
                "grpc-message" => message = Some(Bytes::copy_from_slice(value)),
                _ => metadata.push((key, Bytes::copy_from_slice(value))),
            }
        }

        Ok(Self {
            status: status.ok_or(DecodeError::MissingStatus)?,
            message,
            metadata,
        })
    }

    pub fn is_ok(&self) -> bool {
        self.status == 0
    }

    /// `Ok(())` for status 0, the status as an error otherwise.
    pub fn into_result(self) -> Result<(), GrpcError> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(GrpcError {
                status: self.status,
                message: self.message.unwrap_or_default(),
            })
        }
    }

    /// Serialize the trailer payload (without the frame header).
    pub fn to_payload(&self) -> Bytes {
        let mut out = BytesMut::new();
        out.put_slice(format!("grpc-status:{}\r\n", self.status).as_bytes());
        if let Some(ref message) = self.message {
            out.put_slice(b"grpc-message:");
            out.put_slice(message);
            out.put_slice(b"\r\n");
        }
        for (key, value) in &self.metadata {
            out.put_slice(key.as_bytes());
            out.put_u8(b':');
            out.put_slice(value);
            out.put_slice(b"\r\n");
        }
        out.freeze()
    }
}

fn trim(mut bytes: &[u8]) -> &[u8] {
    while let [first, rest @ ..] = bytes {
        if first.is_ascii_whitespace() {
            bytes = rest;
        } else {
            break;
        }
    }
    while let [rest @ .., last] = bytes {
        if last.is_ascii_whitespace() {
            bytes = rest;
        } else {
            break;
        }
    }
    bytes
}

/// One decoded unit of the wire protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Data(Bytes),
    Trailer(Trailer),
}

/// Wrap a raw payload in a frame header.
pub fn encode_payload(flag: u8, payload: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(HEADER_LEN + payload.len());
    buf.put_u8(flag);
    buf.put_u32(payload.len() as u32);
    buf.put_slice(payload);
    buf.freeze()
}

/// Serialize a message into a single data frame.
pub fn encode<M: Message>(message: &M) -> Bytes {
    encode_payload(FLAG_DATA, &message.encode_to_vec())
}

/// Serialize a trailer into a trailer frame.
pub fn encode_trailer(trailer: &Trailer) -> Bytes {
    encode_payload(FLAG_TRAILER, &trailer.to_payload())
}

fn parse_header(buf: &[u8]) -> Option<(u8, usize)> {
    if buf.len() < HEADER_LEN {
        return None;
    }
    let len = u32::from_be_bytes([buf[1], buf[2], buf[3], buf[4]]) as usize;
    Some((buf[0], len))
}

fn frame_from_payload(flag: u8, payload: Bytes) -> Result<Frame, DecodeError> {
    if flag & FLAG_TRAILER != 0 {
        Ok(Frame::Trailer(Trailer::parse(&payload)?))
    } else if flag & FLAG_COMPRESSED != 0 {
        Err(DecodeError::Compressed)
    } else {
        Ok(Frame::Data(payload))
    }
}

/// Decode one frame from the front of `buf`.
///
/// Returns the frame and the number of bytes it occupied, or `None` if `buf`
/// does not yet hold a complete frame.
pub fn decode_frame(buf: &[u8]) -> Result<Option<(Frame, usize)>, DecodeError> {
    let Some((flag, len)) = parse_header(buf) else {
        return Ok(None);
    };
    if len > MAX_FRAME_LEN {
        return Err(DecodeError::FrameTooLarge(len));
    }
    let end = HEADER_LEN + len;
    if buf.len() < end {
        return Ok(None);
    }

    let payload = Bytes::copy_from_slice(&buf[HEADER_LEN..end]);
    Ok(Some((frame_from_payload(flag, payload)?, end)))
}

fn incomplete(buf: &[u8]) -> DecodeError {
    let need = match parse_header(buf) {
        Some((_, len)) => HEADER_LEN + len,
        None => HEADER_LEN,
    };
    DecodeError::BufferTooSmall {
        need,
        got: buf.len(),
    }
}

/// Decode a complete unary response body into `T`.
///
/// A trailer with a non-zero status yields [`GrpcError`], whether it is the
/// only frame or follows one or more data frames. The first data frame is
/// the message. Framing problems yield
/// [`DecodeError`].
pub fn decode<T>(buf: &[u8]) -> Result<T>
where
    T: Message + Default,
{
    if buf.is_empty() {
        return Err(DecodeError::MissingMessage.into());
    }

    let (frame, used) = decode_frame(buf)?.ok_or_else(|| incomplete(buf))?;

    match frame {
        Frame::Trailer(trailer) => {
            trailer.into_result()?;
            Err(DecodeError::MissingMessage.into())
        }
        Frame::Data(payload) => {
            // Extra data frames are skipped; the first trailer decides.
            let mut rest = &buf[used..];
            while !rest.is_empty() {
                let (next, len) = decode_frame(rest)?.ok_or_else(|| incomplete(rest))?;
                if let Frame::Trailer(trailer) = next {
                    trailer.into_result()?;
                    break;
                }
                rest = &rest[len..];
            }
            Ok(T::decode(payload).map_err(DecodeError::from)?)
        }
    }
}

/// Incremental frame decoder for streamed bodies.
///
/// Chunks are appended with [`push`](Self::push); complete frames are taken off
/// the front with [`next_frame`](Self::next_frame). A frame whose payload is
/// malformed is consumed before the error is returned, so decoding can resume
/// at the next frame. An oversized length cannot be skipped and poisons the
/// decoder.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: BytesMut,
    poisoned: bool,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) {
        if !self.poisoned {
            self.buffer.extend_from_slice(chunk);
        }
    }

    /// Bytes held for a frame that is not complete yet.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    pub fn next_frame(&mut self) -> Result<Option<Frame>, DecodeError> {
        if self.poisoned {
            return Ok(None);
        }
        let Some((flag, len)) = parse_header(&self.buffer) else {
            return Ok(None);
        };
        if len > MAX_FRAME_LEN {
            self.poisoned = true;
            self.buffer.clear();
            return Err(DecodeError::FrameTooLarge(len));
        }
        if self.buffer.len() < HEADER_LEN + len {
            return Ok(None);
        }

        let mut frame = self.buffer.split_to(HEADER_LEN + len);
        let payload = frame.split_off(HEADER_LEN).freeze();
        frame_from_payload(flag, payload).map(Some)
    }
}
