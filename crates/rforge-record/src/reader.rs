use std::path::{Path, PathBuf};

use bytes::Bytes;
use rforge_stream::{decode_payload, DataFrame};
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, BufReader};
use tracing::{debug, warn};

use crate::chunk::{RecordChunk, CHUNK_HEADER_LEN, DEFAULT_MAX_CHUNK_PAYLOAD, MAGIC};
use crate::error::{RecordError, Result};

/// Sequential chunk reader over a record file.
///
/// A short read or an out-of-range length ends the sequence: everything
/// before the damaged tail is still returned.
#[derive(Debug)]
pub struct RecordReader<R> {
    inner: R,
    path: PathBuf,
    max_chunk_payload: usize,
    done: bool,
}

impl RecordReader<BufReader<File>> {
    /// Open `path` and validate the magic.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)
            .await
            .map_err(|e| RecordError::io(&path, e))?;
        Self::from_reader(BufReader::new(file), path).await
    }
}

impl<R: AsyncRead + Unpin> RecordReader<R> {
    /// Wrap an already-open stream positioned at the magic. `path` is used
    /// for error context only.
    pub async fn from_reader(mut inner: R, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut magic = [0u8; MAGIC.len()];
        let read = read_full(&mut inner, &mut magic)
            .await
            .map_err(|e| RecordError::io(&path, e))?;
        if read != MAGIC.len() || magic != MAGIC {
            return Err(RecordError::BadMagic { path });
        }
        Ok(Self {
            inner,
            path,
            max_chunk_payload: DEFAULT_MAX_CHUNK_PAYLOAD,
            done: false,
        })
    }

    /// Override the largest payload length considered valid.
    pub fn with_max_chunk_payload(mut self, max: usize) -> Self {
        self.max_chunk_payload = max;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the next chunk, or `None` at the end of valid data.
    pub async fn next_chunk(&mut self) -> Result<Option<RecordChunk>> {
        if self.done {
            return Ok(None);
        }
        let chunk = self.read_chunk().await;
        if !matches!(chunk, Ok(Some(_))) {
            self.done = true;
        }
        chunk
    }

    async fn read_chunk(&mut self) -> Result<Option<RecordChunk>> {
        let mut header = [0u8; CHUNK_HEADER_LEN];
        let read = read_full(&mut self.inner, &mut header)
            .await
            .map_err(|e| RecordError::io(&self.path, e))?;
        if read == 0 {
            return Ok(None);
        }
        if read < CHUNK_HEADER_LEN {
            warn!(path = %self.path.display(), read, "record ends with a partial chunk header");
            return Ok(None);
        }

        let start_ts = u64::from_le_bytes(le(&header[0..8]));
        let end_ts = u64::from_le_bytes(le(&header[8..16]));
        let len = u32::from_le_bytes(le(&header[16..20])) as usize;
        if len > self.max_chunk_payload {
            warn!(
                path = %self.path.display(),
                len,
                max = self.max_chunk_payload,
                "record chunk length out of range, stopping"
            );
            return Ok(None);
        }

        let mut payload = vec![0u8; len];
        let read = read_full(&mut self.inner, &mut payload)
            .await
            .map_err(|e| RecordError::io(&self.path, e))?;
        if read < len {
            warn!(
                path = %self.path.display(),
                expected = len,
                read,
                "record ends with a partial chunk"
            );
            return Ok(None);
        }

        Ok(Some(RecordChunk {
            start_ts,
            end_ts,
            payload: Bytes::from(payload),
        }))
    }
}

fn le<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(bytes);
    out
}

/// Fill `buf` as far as the stream allows; returns bytes read.
async fn read_full<R: AsyncRead + Unpin>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]).await? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}

/// Read every valid chunk of a record file.
pub async fn read_chunks(path: impl AsRef<Path>) -> Result<Vec<RecordChunk>> {
    let mut reader = RecordReader::open(path).await?;
    let mut chunks = Vec::new();
    while let Some(chunk) = reader.next_chunk().await? {
        chunks.push(chunk);
    }
    Ok(chunks)
}

/// Replay a record into data frames.
///
/// Each payload is decoded with the chunk's start timestamp as fallback.
/// Payloads that decode to nothing are skipped.
pub async fn load_frames(path: impl AsRef<Path>) -> Result<Vec<DataFrame>> {
    let mut reader = RecordReader::open(path).await?;
    let mut frames = Vec::new();
    let mut skipped = 0usize;
    while let Some(chunk) = reader.next_chunk().await? {
        match decode_payload(&chunk.payload, Some(chunk.start_ts)) {
            Some(frame) => frames.push(frame),
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        debug!(path = %reader.path().display(), skipped, "undecodable record chunks skipped");
    }
    Ok(frames)
}
