//! Line framing for the SCP byte stream
//!
//! TCP delivers arbitrary fragments. Complete lines end in LF; anything after
//! the last LF is kept until the next chunk arrives.

use bytes::{BufMut, BytesMut};
use std::io;
use tokio_util::codec::{Decoder, Encoder};

/// Substring identifying the reply to the identity query
pub const DEVICE_IDENTITY_MARKER: &str = "OK devinfo productname";

/// Identity query sent after connecting
pub const IDENTITY_QUERY: &str = "devinfo productname";

/// Upper bound for a line still waiting for its LF
pub const MAX_PENDING: usize = 64 * 1024;

/// A complete line from the console
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FramedLine {
    /// Reply to the identity query, carrying the product name
    Identity(String),
    /// Anything else, to be decoded by the codec
    Record(String),
}

impl FramedLine {
    fn classify(line: String) -> Self {
        if line.contains(DEVICE_IDENTITY_MARKER) {
            let product = line.split(' ').next_back().unwrap_or_default().trim();
            Self::Identity(product.to_string())
        } else {
            Self::Record(line)
        }
    }
}

/// Split `pending + chunk` into complete lines and the new pending bytes.
/// Empty lines are dropped.
pub fn split_lines(pending: &[u8], chunk: &[u8]) -> (Vec<String>, Vec<u8>) {
    let mut buffer = Vec::with_capacity(pending.len() + chunk.len());
    buffer.extend_from_slice(pending);
    buffer.extend_from_slice(chunk);

    let mut segments: Vec<&[u8]> = buffer.split(|&b| b == b'\n').collect();
    let rest = segments.pop().unwrap_or_default().to_vec();

    let lines = segments
        .into_iter()
        .filter(|s| !s.is_empty())
        .map(|s| String::from_utf8_lossy(s).into_owned())
        .collect();

    (lines, rest)
}

/// Pending-bytes state of one connection
#[derive(Debug, Default)]
pub struct LineFramer {
    pending: BytesMut,
    /// Skipping the tail of an over-long line until its LF
    discarding: bool,
}

impl LineFramer {
    /// Create new framer
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a chunk and return the lines it completed
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<FramedLine> {
        let chunk = if self.discarding {
            match chunk.iter().position(|&b| b == b'\n') {
                Some(pos) => {
                    self.discarding = false;
                    &chunk[pos + 1..]
                }
                None => return Vec::new(),
            }
        } else {
            chunk
        };

        let (lines, rest) = split_lines(&self.pending, chunk);

        self.pending.clear();
        if rest.len() > MAX_PENDING {
            tracing::warn!("Dropping {} bytes without line end", rest.len());
            self.discarding = true;
        } else {
            self.pending.extend_from_slice(&rest);
        }

        lines.into_iter().map(FramedLine::classify).collect()
    }

    /// Forget any partial line (connection state changed)
    pub fn reset(&mut self) {
        self.pending.clear();
        self.discarding = false;
    }

    /// Bytes waiting for a line end
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// Newline-delimited SCP lines as a `tokio_util` codec
#[derive(Debug, Clone, Copy, Default)]
pub struct ScpLineCodec;

impl Decoder for ScpLineCodec {
    type Item = String;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        while let Some(pos) = src.iter().position(|&b| b == b'\n') {
            let frame = src.split_to(pos + 1);
            if pos > 0 {
                return Ok(Some(String::from_utf8_lossy(&frame[..pos]).into_owned()));
            }
        }
        if src.len() > MAX_PENDING {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "line too long"));
        }
        Ok(None)
    }
}

impl<T: AsRef<str>> Encoder<T> for ScpLineCodec {
    type Error = io::Error;

    fn encode(&mut self, item: T, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let line = item.as_ref();
        if line.contains('\n') {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "command contains a line break",
            ));
        }
        dst.reserve(line.len() + 1);
        dst.put_slice(line.as_bytes());
        dst.put_u8(b'\n');
        Ok(())
    }
}
