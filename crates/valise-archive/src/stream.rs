//! Stream I/O layer: a file as an ordered, optionally encrypted and
//! MAC-validated sequence of frames.
//!
//! On-disk layout (a persisted, versioned contract):
//!
//! ```text
//! magic "VLSE" | envelope version (1 byte) | flags (1 byte)
//! frame 0 (header) | frame 1 | ... | frame N
//! [32-byte keyed-BLAKE3 MAC, encrypted archives only]
//! ```
//!
//! When encrypted, each frame payload is sealed individually with
//! XChaCha20-Poly1305 (24-byte nonce prepended) and the MAC covers every
//! post-envelope byte as written. Opening an encrypted input makes one
//! streaming forward pass to verify the MAC before any frame is surfaced,
//! then re-opens the file for the read pass. Reading is strictly
//! forward-only; writing is append-only.

use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader, BufWriter, Take};

use valise_shared::constants::MAC_SIZE;
use valise_shared::crypto::{self, BackupKey, StreamMac, SymmetricKey};

use crate::error::{ArchiveError, Result};
use crate::frame;
use crate::progress::BackupProgress;
use crate::proto::BackupHeader;

pub const MAGIC: [u8; 4] = *b"VLSE";
pub const ENVELOPE_VERSION: u8 = 1;

const FLAG_ENCRYPTED: u8 = 0b0000_0001;
const ENVELOPE_LEN: u64 = 6;

/// Whether an archive is plaintext or sealed with a caller-derived key.
#[derive(Clone)]
pub enum StreamMode {
    Plaintext,
    Encrypted(BackupKey),
}

impl StreamMode {
    fn flags(&self) -> u8 {
        match self {
            Self::Plaintext => 0,
            Self::Encrypted(_) => FLAG_ENCRYPTED,
        }
    }
}

async fn open_for_read(path: &Path) -> Result<File> {
    match File::open(path).await {
        Ok(file) => Ok(file),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ArchiveError::FileNotFound(PathBuf::from(path)))
        }
        Err(e) => Err(ArchiveError::UnableToOpenStream(e)),
    }
}

/// Read and check the six-byte envelope. Returns the flags byte.
async fn read_envelope(file: &mut File) -> Result<u8> {
    let mut envelope = [0u8; ENVELOPE_LEN as usize];
    file.read_exact(&mut envelope)
        .await
        .map_err(|_| ArchiveError::InvalidEnvelope("file too short for envelope"))?;

    if envelope[..4] != MAGIC {
        return Err(ArchiveError::InvalidEnvelope("bad magic"));
    }
    if envelope[4] != ENVELOPE_VERSION {
        return Err(ArchiveError::InvalidEnvelope("unsupported envelope version"));
    }
    Ok(envelope[5])
}

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Append-only frame writer over a newly created file.
pub struct ArchiveWriter {
    file: BufWriter<File>,
    cipher_key: Option<SymmetricKey>,
    mac: Option<StreamMac>,
    bytes_written: u64,
    frames_written: u64,
}

impl ArchiveWriter {
    /// Create `path` and write the envelope.
    pub async fn create(path: &Path, mode: &StreamMode) -> Result<Self> {
        let file = File::create(path)
            .await
            .map_err(ArchiveError::UnableToOpenStream)?;
        let mut file = BufWriter::new(file);

        let mut envelope = Vec::with_capacity(ENVELOPE_LEN as usize);
        envelope.extend_from_slice(&MAGIC);
        envelope.push(ENVELOPE_VERSION);
        envelope.push(mode.flags());
        file.write_all(&envelope).await?;

        let (cipher_key, mac) = match mode {
            StreamMode::Plaintext => (None, None),
            StreamMode::Encrypted(key) => {
                (Some(key.cipher_key()), Some(StreamMac::new(&key.mac_key())))
            }
        };

        Ok(Self {
            file,
            cipher_key,
            mac,
            bytes_written: ENVELOPE_LEN,
            frames_written: 0,
        })
    }

    /// Write the header frame. Must be the first frame written.
    pub async fn write_header(&mut self, header: &BackupHeader) -> Result<()> {
        let payload = header.to_bytes()?;
        self.write_payload(&payload).await
    }

    /// Seal (when encrypted) and append one frame.
    pub async fn write_payload(&mut self, payload: &[u8]) -> Result<()> {
        let sealed;
        let on_disk: &[u8] = match &self.cipher_key {
            Some(key) => {
                sealed = crypto::encrypt(key, payload)
                    .map_err(|_| ArchiveError::FrameDecrypt)?;
                &sealed
            }
            None => payload,
        };

        // Build the whole frame in memory so the MAC sees exactly the bytes
        // that land on disk.
        let mut frame_bytes = Vec::with_capacity(on_disk.len() + 10);
        frame::encode_varint(on_disk.len() as u64, &mut frame_bytes);
        frame_bytes.extend_from_slice(on_disk);

        if let Some(mac) = &mut self.mac {
            mac.update(&frame_bytes);
        }
        self.file.write_all(&frame_bytes).await?;

        self.bytes_written += frame_bytes.len() as u64;
        self.frames_written += 1;
        Ok(())
    }

    pub fn progress(&self) -> BackupProgress {
        BackupProgress {
            bytes: self.bytes_written,
            frames: self.frames_written,
        }
    }

    /// Flush, append the MAC trailer (encrypted archives) and sync.
    pub async fn finalize(mut self) -> Result<()> {
        if let Some(mac) = self.mac.take() {
            let tag = mac.finalize();
            self.file.write_all(&tag).await?;
        }
        self.file.flush().await?;
        self.file.get_mut().sync_all().await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// Forward-only frame reader.
pub struct ArchiveReader {
    file: Take<BufReader<File>>,
    cipher_key: Option<SymmetricKey>,
    body_len: u64,
    bytes_read: u64,
    frames_read: u64,
}

impl ArchiveReader {
    /// Open `path` for reading.
    ///
    /// For encrypted archives this first verifies the trailing MAC in one
    /// streaming pass (constant memory), then re-opens the file; no frame is
    /// ever surfaced from a tampered file.
    pub async fn open(path: &Path, mode: &StreamMode) -> Result<Self> {
        let mut file = open_for_read(path).await?;
        let total_len = file.metadata().await?.len();
        let flags = read_envelope(&mut file).await?;

        let encrypted = flags & FLAG_ENCRYPTED != 0;
        let key = match (mode, encrypted) {
            (StreamMode::Plaintext, false) => None,
            (StreamMode::Encrypted(key), true) => Some(key.clone()),
            (StreamMode::Plaintext, true) => {
                return Err(ArchiveError::InvalidEnvelope("archive is encrypted"))
            }
            (StreamMode::Encrypted(_), false) => {
                return Err(ArchiveError::InvalidEnvelope("archive is not encrypted"))
            }
        };

        let trailer_len = if encrypted { MAC_SIZE as u64 } else { 0 };
        let body_len = total_len
            .checked_sub(ENVELOPE_LEN + trailer_len)
            .ok_or(ArchiveError::InvalidEnvelope("file too short for trailer"))?;

        if let Some(key) = &key {
            verify_stream_mac(&mut file, key, body_len).await?;
            // Re-open for the forward read pass.
            file = open_for_read(path).await?;
            read_envelope(&mut file).await?;
        }

        Ok(Self {
            file: BufReader::new(file).take(body_len),
            cipher_key: key.as_ref().map(|k| k.cipher_key()),
            body_len,
            bytes_read: 0,
            frames_read: 0,
        })
    }

    /// Read and parse the header frame. Must be the first read.
    pub async fn read_header(&mut self) -> Result<BackupHeader> {
        let payload = self
            .next_payload()
            .await?
            .ok_or(ArchiveError::HeaderDeserialization)?;
        BackupHeader::from_bytes(&payload)
    }

    /// Read and (when encrypted) unseal the next frame payload.
    /// `Ok(None)` at the end of the archive.
    pub async fn next_payload(&mut self) -> Result<Option<Vec<u8>>> {
        let before = self.file.limit();
        let Some(on_disk) = frame::read_frame(&mut self.file).await? else {
            return Ok(None);
        };
        self.bytes_read += before - self.file.limit();
        self.frames_read += 1;

        match &self.cipher_key {
            Some(key) => {
                let plain =
                    crypto::decrypt(key, &on_disk).map_err(|_| ArchiveError::FrameDecrypt)?;
                Ok(Some(plain))
            }
            None => Ok(Some(on_disk)),
        }
    }

    pub fn progress(&self) -> BackupProgress {
        BackupProgress {
            bytes: self.bytes_read,
            frames: self.frames_read,
        }
    }

    /// Total post-envelope body length in bytes (for progress ratios).
    pub fn body_len(&self) -> u64 {
        self.body_len
    }
}

/// One streaming pass over the body, comparing against the MAC trailer.
async fn verify_stream_mac(file: &mut File, key: &BackupKey, body_len: u64) -> Result<()> {
    let mut mac = StreamMac::new(&key.mac_key());
    let mut remaining = body_len;
    let mut buf = vec![0u8; 64 * 1024];

    while remaining > 0 {
        let want = remaining.min(buf.len() as u64) as usize;
        file.read_exact(&mut buf[..want])
            .await
            .map_err(|_| ArchiveError::MacValidationFailed)?;
        mac.update(&buf[..want]);
        remaining -= want as u64;
    }

    let mut expected = [0u8; MAC_SIZE];
    file.read_exact(&mut expected)
        .await
        .map_err(|_| ArchiveError::MacValidationFailed)?;

    if !mac.verify(&expected) {
        return Err(ArchiveError::MacValidationFailed);
    }
    Ok(())
}
