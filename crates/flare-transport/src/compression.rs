//! Streaming compression of request bodies.
//!
//! `CompressedBody` wraps a `RequestBody` so that its bytes pass through a
//! gzip or deflate encoder on their way to the wire. The wrapper carries the
//! original body's headers plus a `Content-Encoding` marker, and reports its
//! length as unknown: output is produced chunk by chunk instead of being
//! compressed up front.

use std::{
    fmt,
    io::{self, Write},
    str::FromStr,
};

use bytes::Bytes;
use flate2::{
    write::{GzEncoder, ZlibEncoder},
    Compression,
};
use futures::stream::{self, Stream};
use http::{
    header::{HeaderName, CONTENT_ENCODING, CONTENT_TYPE},
    HeaderMap, HeaderValue,
};

use crate::error::{Result, TransportError};

/// Input fed to the encoder per stream chunk.
const STREAM_CHUNK_SIZE: usize = 16 * 1024;

/// Supported content encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentEncoding {
    /// RFC 1952 gzip.
    Gzip,
    /// RFC 1950 zlib stream, which is what HTTP calls `deflate`.
    Deflate,
}

impl ContentEncoding {
    /// Token used in the `Content-Encoding` header.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Gzip => "gzip",
            Self::Deflate => "deflate",
        }
    }
}

impl fmt::Display for ContentEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentEncoding {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim();
        if name.is_empty() {
            return Err(TransportError::missing("content encoding"));
        }
        if name.eq_ignore_ascii_case("gzip") {
            Ok(Self::Gzip)
        } else if name.eq_ignore_ascii_case("deflate") {
            Ok(Self::Deflate)
        } else {
            Err(TransportError::unsupported_encoding(name))
        }
    }
}

/// Request payload together with the headers describing it.
#[derive(Debug, Clone, Default)]
pub struct RequestBody {
    headers: HeaderMap,
    content: Bytes,
}

impl RequestBody {
    /// Creates a body with no headers.
    pub fn new(content: impl Into<Bytes>) -> Self {
        Self { headers: HeaderMap::new(), content: content.into() }
    }

    /// Creates a UTF-8 JSON body.
    pub fn json(content: impl Into<Bytes>) -> Self {
        Self::new(content)
            .with_header(CONTENT_TYPE, HeaderValue::from_static("application/json; charset=utf-8"))
    }

    /// Adds a header describing the content.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Headers describing the content.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Raw content.
    pub fn content(&self) -> &Bytes {
        &self.content
    }

    /// Exact content length.
    pub fn content_length(&self) -> Option<u64> {
        u64::try_from(self.content.len()).ok()
    }

    /// Converts into a body the HTTP client can send.
    pub fn into_body(self) -> reqwest::Body {
        reqwest::Body::from(self.content)
    }

    fn into_parts(self) -> (HeaderMap, Bytes) {
        (self.headers, self.content)
    }
}

/// Body whose bytes are compressed as they are written out.
///
/// # Example
///
/// ```
/// use flare_transport::compression::{CompressedBody, RequestBody};
///
/// let body = RequestBody::json(r#"{"message":"hello"}"#);
/// let compressed = CompressedBody::new(body, "GZIP").unwrap();
///
/// assert_eq!(compressed.headers()["content-encoding"], "gzip");
/// assert_eq!(compressed.content_length(), None);
///
/// let mut wire = Vec::new();
/// compressed.write_to(&mut wire).unwrap();
/// assert_eq!(&wire[..2], &[0x1f, 0x8b]);
/// ```
#[derive(Debug)]
pub struct CompressedBody {
    headers: HeaderMap,
    content: Bytes,
    encoding: ContentEncoding,
}

impl CompressedBody {
    /// Wraps `body`, compressing with the encoding named by `encoding`.
    ///
    /// The name is matched case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::MissingInput` for a blank encoding and
    /// `TransportError::UnsupportedEncoding` for anything other than gzip or
    /// deflate. Nothing is compressed or sent in either case.
    pub fn new(body: RequestBody, encoding: &str) -> Result<Self> {
        let encoding = encoding.parse()?;
        Ok(Self::with_encoding(body, encoding))
    }

    /// Wraps `body` with an already validated encoding.
    pub fn with_encoding(body: RequestBody, encoding: ContentEncoding) -> Self {
        let (mut headers, content) = body.into_parts();
        headers.append(CONTENT_ENCODING, HeaderValue::from_static(encoding.as_str()));
        Self { headers, content, encoding }
    }

    /// Original headers followed by the `Content-Encoding` marker.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Encoding applied to the content.
    pub fn encoding(&self) -> ContentEncoding {
        self.encoding
    }

    /// Always `None`: the compressed length is only known once streaming
    /// has finished.
    pub fn content_length(&self) -> Option<u64> {
        None
    }

    /// Compresses the full content into `sink`.
    ///
    /// The sink is borrowed, so it stays open for the caller. The encoder is
    /// finished and the sink flushed before this returns, so every
    /// compressed byte has been handed to the sink.
    ///
    /// # Errors
    ///
    /// Returns any I/O error raised by the encoder or the sink.
    pub fn write_to<W: Write>(&self, sink: &mut W) -> io::Result<()> {
        let mut compressor = Compressor::new(self.encoding, sink);
        compressor.write_all(&self.content)?;
        compressor.finish()?.flush()
    }

    /// Converts into a stream of compressed chunks.
    ///
    /// The original content is released as soon as the stream has consumed
    /// it, or when the stream is dropped early.
    pub fn into_stream(self) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static {
        let state = StreamState {
            compressor: Some(Compressor::new(self.encoding, Vec::new())),
            content: self.content,
        };
        stream::unfold(state, |mut state| async move {
            state.next_chunk().map(|chunk| (chunk, state))
        })
    }

    /// Converts into a streaming body the HTTP client can send.
    pub fn into_body(self) -> reqwest::Body {
        reqwest::Body::wrap_stream(self.into_stream())
    }
}

struct StreamState {
    compressor: Option<Compressor<Vec<u8>>>,
    content: Bytes,
}

impl StreamState {
    fn next_chunk(&mut self) -> Option<io::Result<Bytes>> {
        loop {
            if self.content.is_empty() {
                let compressor = self.compressor.take()?;
                return Some(compressor.finish().map(Bytes::from));
            }

            let chunk = self.content.split_to(self.content.len().min(STREAM_CHUNK_SIZE));
            let compressor = self.compressor.as_mut()?;
            if let Err(e) = compressor.write_all(&chunk) {
                self.compressor = None;
                self.content = Bytes::new();
                return Some(Err(e));
            }

            let output = std::mem::take(compressor.get_mut());
            if !output.is_empty() {
                return Some(Ok(Bytes::from(output)));
            }
        }
    }
}

enum Compressor<W: Write> {
    Gzip(GzEncoder<W>),
    Deflate(ZlibEncoder<W>),
}

impl<W: Write> Compressor<W> {
    fn new(encoding: ContentEncoding, sink: W) -> Self {
        match encoding {
            ContentEncoding::Gzip => Self::Gzip(GzEncoder::new(sink, Compression::default())),
            ContentEncoding::Deflate => {
                Self::Deflate(ZlibEncoder::new(sink, Compression::default()))
            },
        }
    }

    fn get_mut(&mut self) -> &mut W {
        match self {
            Self::Gzip(encoder) => encoder.get_mut(),
            Self::Deflate(encoder) => encoder.get_mut(),
        }
    }

    /// Writes the trailer and returns the sink.
    fn finish(self) -> io::Result<W> {
        match self {
            Self::Gzip(encoder) => encoder.finish(),
            Self::Deflate(encoder) => encoder.finish(),
        }
    }
}

impl<W: Write> Write for Compressor<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Gzip(encoder) => encoder.write(buf),
            Self::Deflate(encoder) => encoder.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Gzip(encoder) => encoder.flush(),
            Self::Deflate(encoder) => encoder.flush(),
        }
    }
}
