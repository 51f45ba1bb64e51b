//! Length-prefixed frame reader
//!
//! The wire format is a 2-byte big-endian length followed by exactly that many
//! payload bytes. A stream that ends inside a frame ends the replay normally.

use bytes::{Bytes, BytesMut};
use futures_util::stream::{self, Stream};
use tokio::io::{AsyncRead, AsyncReadExt, BufReader};
use tracing::warn;

use crate::error::{DepthError, Result};

/// Size of the frame length prefix in bytes
pub const LENGTH_PREFIX: usize = 2;

/// One undecoded message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// Length declared by the prefix
    pub length: u16,
    pub payload: Bytes,
}

impl RawFrame {
    /// Wrap a payload, declaring its own length
    pub fn new(payload: Bytes) -> Self {
        Self {
            length: u16::try_from(payload.len()).unwrap_or(u16::MAX),
            payload,
        }
    }
}

/// Reads frames from an async byte stream
pub struct FrameReader<R> {
    reader: BufReader<R>,
    frames: u64,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Create a new frame reader
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            frames: 0,
        }
    }

    /// Number of complete frames read so far
    pub fn frames_read(&self) -> u64 {
        self.frames
    }

    /// Read the next frame
    ///
    /// Returns `Ok(None)` at end of stream, including a stream cut short inside
    /// a prefix or payload. Only I/O faults are errors.
    pub async fn next_frame(&mut self) -> Result<Option<RawFrame>> {
        let mut prefix = [0u8; LENGTH_PREFIX];
        match read_fully(&mut self.reader, &mut prefix).await? {
            0 => return Ok(None),
            LENGTH_PREFIX => {}
            _ => {
                warn!(frames = self.frames, "Stream ended inside a length prefix");
                return Ok(None);
            }
        }

        let length = u16::from_be_bytes(prefix);
        let mut payload = BytesMut::zeroed(length as usize);
        let received = read_fully(&mut self.reader, &mut payload).await?;
        if received < payload.len() {
            warn!(
                frames = self.frames,
                declared = length,
                received,
                "Stream ended inside a frame"
            );
            return Ok(None);
        }

        self.frames += 1;
        Ok(Some(RawFrame {
            length,
            payload: payload.freeze(),
        }))
    }

    /// Turn the reader into a stream of frames
    pub fn into_stream(self) -> impl Stream<Item = Result<RawFrame>> {
        stream::try_unfold(self, |mut reader| async move {
            let frame = reader.next_frame().await?;
            Ok::<_, DepthError>(frame.map(|frame| (frame, reader)))
        })
    }
}

/// Fill `buf` until it is full or the stream ends, returning the bytes read
async fn read_fully<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]).await? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}
