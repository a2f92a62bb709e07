//! Length-delimited frame codec.
//!
//! A frame on the wire is an unsigned-LEB128 varint byte length followed by
//! exactly that many payload bytes. Clean EOF at a frame boundary is the end
//! of the archive (`Ok(None)`); EOF anywhere else, a varint longer than ten
//! bytes, or a length above [`MAX_FRAME_SIZE`] is an
//! `InvalidLengthDelimiter`; a zero-length frame is an `EmptyFinalFrame`.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use valise_shared::constants::MAX_FRAME_SIZE;

use crate::error::{ArchiveError, Result};

// Max encoded size of a u64 varint
const VARINT_MAX_LEN: usize = 10;

/// Encode `value` as an unsigned LEB128 varint.
pub fn encode_varint(mut value: u64, out: &mut Vec<u8>) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

/// Read one varint. `Ok(None)` means clean EOF before the first byte.
pub async fn read_varint<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Option<u64>> {
    let mut result: u64 = 0;

    for i in 0..VARINT_MAX_LEN {
        let mut buf = [0u8; 1];
        match reader.read_exact(&mut buf).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                if i == 0 {
                    // Clean EOF at a frame boundary.
                    return Ok(None);
                }
                return Err(ArchiveError::InvalidLengthDelimiter);
            }
            Err(e) => return Err(e.into()),
        }

        let byte = buf[0];
        // The tenth byte of a u64 varint can only carry one bit.
        if i == VARINT_MAX_LEN - 1 && byte > 0x01 {
            return Err(ArchiveError::InvalidLengthDelimiter);
        }
        result |= u64::from(byte & 0x7F) << (i * 7);

        if byte & 0x80 == 0 {
            return Ok(Some(result));
        }
    }

    Err(ArchiveError::InvalidLengthDelimiter)
}

/// Write one length-delimited frame. Returns the number of bytes written.
pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, payload: &[u8]) -> Result<u64> {
    let mut prefix = Vec::with_capacity(VARINT_MAX_LEN);
    encode_varint(payload.len() as u64, &mut prefix);

    writer.write_all(&prefix).await?;
    writer.write_all(payload).await?;
    Ok((prefix.len() + payload.len()) as u64)
}

/// Read one length-delimited frame. `Ok(None)` means clean end of archive.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Option<Vec<u8>>> {
    let len = match read_varint(reader).await? {
        Some(len) => len,
        None => return Ok(None),
    };

    if len == 0 {
        return Err(ArchiveError::EmptyFinalFrame);
    }
    if len > MAX_FRAME_SIZE as u64 {
        return Err(ArchiveError::InvalidLengthDelimiter);
    }

    let mut payload = vec![0u8; len as usize];
    reader
        .read_exact(&mut payload)
        .await
        .map_err(|e| match e.kind() {
            // Truncated mid-frame: the delimiter promised more than exists.
            std::io::ErrorKind::UnexpectedEof => ArchiveError::InvalidLengthDelimiter,
            _ => ArchiveError::Io(e),
        })?;
    Ok(Some(payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn encoded(value: u64) -> Vec<u8> {
        let mut buf = Vec::new();
        encode_varint(value, &mut buf);
        buf
    }

    #[tokio::test]
    async fn test_varint_identity() {
        for value in [0u64, 1, 127, 128, 300, 16_383, 16_384, u32::MAX as u64, u64::MAX] {
            let buf = encoded(value);
            let mut cursor = Cursor::new(buf);
            assert_eq!(read_varint(&mut cursor).await.unwrap(), Some(value));
        }
    }

    #[tokio::test]
    async fn test_varint_clean_eof() {
        let mut cursor = Cursor::new(Vec::<u8>::new());
        assert!(read_varint(&mut cursor).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_varint_truncated_fails() {
        // Continuation bit set but nothing follows.
        let mut cursor = Cursor::new(vec![0x80u8]);
        assert!(matches!(
            read_varint(&mut cursor).await,
            Err(ArchiveError::InvalidLengthDelimiter)
        ));
    }

    #[tokio::test]
    async fn test_varint_overlong_fails() {
        let mut cursor = Cursor::new(vec![0xFFu8; 11]);
        assert!(matches!(
            read_varint(&mut cursor).await,
            Err(ArchiveError::InvalidLengthDelimiter)
        ));
    }

    #[tokio::test]
    async fn test_frame_roundtrip() {
        let mut buf = Vec::new();
        let payload = vec![7u8; 300];
        let written = write_frame(&mut buf, &payload).await.unwrap();
        assert_eq!(written as usize, buf.len());

        let mut cursor = Cursor::new(buf);
        assert_eq!(read_frame(&mut cursor).await.unwrap(), Some(payload));
        assert!(read_frame(&mut cursor).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_zero_length_frame_fails() {
        let mut cursor = Cursor::new(encoded(0));
        assert!(matches!(
            read_frame(&mut cursor).await,
            Err(ArchiveError::EmptyFinalFrame)
        ));
    }

    #[tokio::test]
    async fn test_truncated_payload_fails() {
        let mut buf = encoded(10);
        buf.extend_from_slice(&[1, 2, 3]); // promised 10, delivered 3
        let mut cursor = Cursor::new(buf);
        assert!(matches!(
            read_frame(&mut cursor).await,
            Err(ArchiveError::InvalidLengthDelimiter)
        ));
    }

    #[tokio::test]
    async fn test_oversized_length_fails() {
        let mut cursor = Cursor::new(encoded(u64::MAX / 2));
        assert!(matches!(
            read_frame(&mut cursor).await,
            Err(ArchiveError::InvalidLengthDelimiter)
        ));
    }
}
