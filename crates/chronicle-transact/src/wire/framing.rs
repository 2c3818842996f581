//! Frame codec: a u32 big-endian length prefix followed by a JSON body.
//!
//! One frame per message, one per response; anything larger than
//! [`MAX_FRAME_BYTES`] is refused before allocation.

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::domain::errors::TransactError;

/// Upper bound on a single frame body.
pub const MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

/// Serialize `value` and write it as one frame.
pub async fn write_frame<S, T>(stream: &mut S, value: &T) -> Result<(), TransactError>
where
    S: AsyncWrite + Unpin + ?Sized,
    T: Serialize,
{
    let body = serde_json::to_vec(value)?;
    if body.len() > MAX_FRAME_BYTES {
        return Err(TransactError::FrameTooLarge {
            len: body.len(),
            max: MAX_FRAME_BYTES,
        });
    }
    stream.write_all(&(body.len() as u32).to_be_bytes()).await?;
    stream.write_all(&body).await?;
    stream.flush().await?;
    Ok(())
}

/// Read one frame and decode it. A stream that closes before delivering a
/// complete frame yields [`TransactError::StreamClosed`].
pub async fn read_frame<S, T>(stream: &mut S) -> Result<T, TransactError>
where
    S: AsyncRead + Unpin + ?Sized,
    T: DeserializeOwned,
{
    let mut len_bytes = [0u8; 4];
    stream
        .read_exact(&mut len_bytes)
        .await
        .map_err(eof_as_closed)?;
    let len = u32::from_be_bytes(len_bytes) as usize;
    if len > MAX_FRAME_BYTES {
        return Err(TransactError::FrameTooLarge {
            len,
            max: MAX_FRAME_BYTES,
        });
    }
    let mut body = vec![0u8; len];
    stream.read_exact(&mut body).await.map_err(eof_as_closed)?;
    Ok(serde_json::from_slice(&body)?)
}

fn eof_as_closed(err: std::io::Error) -> TransactError {
    if err.kind() == std::io::ErrorKind::UnexpectedEof {
        TransactError::StreamClosed
    } else {
        TransactError::Io(err)
    }
}
