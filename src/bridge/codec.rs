//! Browser native-messaging framing: a 4-byte little-endian length, then
//! that many bytes of UTF-8 JSON.

use std::io;

use serde::Serialize;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest message the browser may send to a native host (64 MiB).
pub const MAX_INBOUND_FRAME: usize = 64 * 1024 * 1024;

/// Largest message a native host may send to the browser (1 MiB).
pub const MAX_OUTBOUND_FRAME: usize = 1024 * 1024;

#[derive(Debug, Error)]
pub enum BridgeError {
    /// Checked against the length prefix, before anything is allocated.
    #[error("frame too large: {size} bytes exceeds maximum {max} bytes")]
    FrameTooLarge { size: usize, max: usize },

    #[error("connection closed mid-frame")]
    ConnectionClosed,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Reads one frame. `Ok(None)` is a clean end of stream between frames.
/// An oversized frame is skipped so the stream stays aligned, then
/// reported as [`BridgeError::FrameTooLarge`].
pub async fn read_frame<R>(reader: &mut R, max: usize) -> Result<Option<Vec<u8>>, BridgeError>
where
    R: AsyncRead + Unpin,
{
    let mut prefix = [0_u8; 4];
    let mut filled = 0;
    while filled < prefix.len() {
        let read = reader.read(&mut prefix[filled..]).await?;
        if read == 0 {
            return if filled == 0 {
                Ok(None)
            } else {
                Err(BridgeError::ConnectionClosed)
            };
        }
        filled += read;
    }

    let size = u32::from_le_bytes(prefix) as usize;
    if size > max {
        let mut remainder = (&mut *reader).take(size as u64);
        let skipped = tokio::io::copy(&mut remainder, &mut tokio::io::sink()).await?;
        if skipped < size as u64 {
            return Err(BridgeError::ConnectionClosed);
        }
        return Err(BridgeError::FrameTooLarge { size, max });
    }

    let mut payload = vec![0_u8; size];
    reader.read_exact(&mut payload).await.map_err(|err| {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            BridgeError::ConnectionClosed
        } else {
            BridgeError::Io(err)
        }
    })?;
    Ok(Some(payload))
}

pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<(), BridgeError>
where
    W: AsyncWrite + Unpin,
{
    if payload.len() > MAX_OUTBOUND_FRAME {
        return Err(BridgeError::FrameTooLarge {
            size: payload.len(),
            max: MAX_OUTBOUND_FRAME,
        });
    }
    writer.write_all(&(payload.len() as u32).to_le_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn write_message<W, T>(writer: &mut W, message: &T) -> Result<(), BridgeError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let payload = serde_json::to_vec(message)?;
    write_frame(writer, &payload).await
}
