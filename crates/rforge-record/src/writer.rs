use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use bytes::BytesMut;
use tokio::fs::File;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::chunk::{RecordChunk, DEFAULT_MAX_CHUNK_PAYLOAD, MAGIC};
use crate::error::{RecordError, Result};

/// Default number of chunks batched between flushes.
pub const DEFAULT_FLUSH_EVERY: usize = 32;

#[derive(Debug, Clone)]
pub struct RecordConfig {
    /// Chunks batched in memory before they are written out.
    pub flush_every: usize,
    /// Largest accepted chunk payload.
    pub max_chunk_payload: usize,
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self {
            flush_every: DEFAULT_FLUSH_EVERY,
            max_chunk_payload: DEFAULT_MAX_CHUNK_PAYLOAD,
        }
    }
}

#[derive(Debug)]
struct OpenRecord {
    path: PathBuf,
    file: File,
    /// File length covering only complete chunks.
    committed: u64,
    /// Encoded chunks not yet written.
    pending: BytesMut,
    pending_chunks: usize,
    /// A write was interrupted; bytes past `committed` may be garbage.
    dirty: bool,
}

impl OpenRecord {
    async fn repair(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        warn!(
            path = %self.path.display(),
            committed = self.committed,
            "truncating partially written record tail"
        );
        self.file
            .set_len(self.committed)
            .await
            .map_err(|e| RecordError::io(&self.path, e))?;
        self.file
            .seek(SeekFrom::Start(self.committed))
            .await
            .map_err(|e| RecordError::io(&self.path, e))?;
        self.dirty = false;
        Ok(())
    }

    /// Write the pending batch. If this future is dropped or fails part
    /// way, the batch stays pending and the tail is truncated first on the
    /// next attempt.
    async fn write_pending(&mut self) -> Result<()> {
        self.repair().await?;
        if self.pending.is_empty() {
            return Ok(());
        }
        self.dirty = true;
        self.file
            .write_all(&self.pending)
            .await
            .map_err(|e| RecordError::io(&self.path, e))?;
        self.file
            .flush()
            .await
            .map_err(|e| RecordError::io(&self.path, e))?;
        self.committed += self.pending.len() as u64;
        debug!(chunks = self.pending_chunks, committed = self.committed, "record batch flushed");
        self.pending.clear();
        self.pending_chunks = 0;
        self.dirty = false;
        Ok(())
    }
}

/// Single-writer append-only record file.
///
/// `start`, `append`, `flush` and `close` are serialised through one async
/// gate, so at most one file mutation is in flight.
#[derive(Debug)]
pub struct RecordWriter {
    gate: Mutex<Option<OpenRecord>>,
    config: RecordConfig,
    recording: AtomicBool,
    chunks_written: AtomicU64,
}

impl RecordWriter {
    pub fn new() -> Self {
        Self::with_config(RecordConfig::default())
    }

    pub fn with_config(config: RecordConfig) -> Self {
        Self {
            gate: Mutex::new(None),
            config,
            recording: AtomicBool::new(false),
            chunks_written: AtomicU64::new(0),
        }
    }

    pub fn is_recording(&self) -> bool {
        self.recording.load(Ordering::Acquire)
    }

    /// Chunks accepted since the current record was started.
    pub fn chunks_written(&self) -> u64 {
        self.chunks_written.load(Ordering::Acquire)
    }

    /// Path of the open record, if any.
    pub async fn path(&self) -> Option<PathBuf> {
        self.gate.lock().await.as_ref().map(|r| r.path.clone())
    }

    /// Create (or truncate) `path` and start recording into it.
    ///
    /// A record already open is closed first.
    pub async fn start(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref().to_path_buf();
        let mut gate = self.gate.lock().await;
        if let Some(mut open) = gate.take() {
            self.recording.store(false, Ordering::Release);
            finish(&mut open).await?;
        }

        let mut file = File::create(&path)
            .await
            .map_err(|e| RecordError::io(&path, e))?;
        file.write_all(&MAGIC)
            .await
            .map_err(|e| RecordError::io(&path, e))?;
        file.flush().await.map_err(|e| RecordError::io(&path, e))?;

        info!(path = %path.display(), "record started");
        *gate = Some(OpenRecord {
            path,
            file,
            committed: MAGIC.len() as u64,
            pending: BytesMut::new(),
            pending_chunks: 0,
            dirty: false,
        });
        self.chunks_written.store(0, Ordering::Release);
        self.recording.store(true, Ordering::Release);
        Ok(())
    }

    /// Queue a chunk, writing the batch out every `flush_every` chunks.
    ///
    /// `ChunkTooLarge` and `NotRecording` reject the chunk. Any other error
    /// comes from writing the batch out after the chunk was queued: the
    /// chunk stays pending and goes out with the next `flush` or `close`.
    /// Do not append it again.
    pub async fn append(&self, chunk: &RecordChunk) -> Result<()> {
        let max = self.config.max_chunk_payload.min(u32::MAX as usize);
        if chunk.payload.len() > max {
            return Err(RecordError::ChunkTooLarge {
                size: chunk.payload.len(),
                max,
            });
        }

        let mut gate = self.gate.lock().await;
        let open = gate.as_mut().ok_or(RecordError::NotRecording)?;
        chunk.encode_into(&mut open.pending);
        open.pending_chunks += 1;
        self.chunks_written.fetch_add(1, Ordering::AcqRel);

        if open.pending_chunks >= self.config.flush_every.max(1) {
            open.write_pending().await?;
        }
        Ok(())
    }

    /// Write out any batched chunks now.
    pub async fn flush(&self) -> Result<()> {
        let mut gate = self.gate.lock().await;
        let open = gate.as_mut().ok_or(RecordError::NotRecording)?;
        open.write_pending().await
    }

    /// Flush and close the record. Closing with nothing open is a no-op.
    pub async fn close(&self) -> Result<()> {
        let mut gate = self.gate.lock().await;
        let Some(open) = gate.as_mut() else {
            return Ok(());
        };
        finish(open).await?;
        if let Some(open) = gate.take() {
            info!(
                path = %open.path.display(),
                chunks = self.chunks_written(),
                bytes = open.committed,
                "record closed"
            );
        }
        self.recording.store(false, Ordering::Release);
        Ok(())
    }
}

impl Default for RecordWriter {
    fn default() -> Self {
        Self::new()
    }
}

async fn finish(open: &mut OpenRecord) -> Result<()> {
    open.write_pending().await?;
    open.file
        .sync_all()
        .await
        .map_err(|e| RecordError::io(&open.path, e))
}

#[cfg(test)]
mod tests {
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::*;
    use crate::reader::read_chunks;

    fn temp_path(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!(
            "rforge-record-{name}-{}-{nanos}.rfr",
            std::process::id()
        ))
    }

    #[tokio::test]
    async fn start_writes_magic() {
        let path = temp_path("magic");
        let writer = RecordWriter::new();
        writer.start(&path).await.unwrap();
        assert!(writer.is_recording());
        writer.close().await.unwrap();
        assert!(!writer.is_recording());

        assert_eq!(tokio::fs::read(&path).await.unwrap(), MAGIC.to_vec());
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn append_without_start_fails() {
        let writer = RecordWriter::new();
        let err = writer
            .append(&RecordChunk::new(0, 0, vec![1]))
            .await
            .unwrap_err();
        assert!(matches!(err, RecordError::NotRecording));
        writer.close().await.unwrap();
    }

    #[tokio::test]
    async fn batches_flush_every_n_chunks() {
        let path = temp_path("batch");
        let writer = RecordWriter::with_config(RecordConfig {
            flush_every: 4,
            ..RecordConfig::default()
        });
        writer.start(&path).await.unwrap();

        for i in 0..3u64 {
            writer.append(&RecordChunk::new(i, i, vec![0u8; 10])).await.unwrap();
        }
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 4);

        writer.append(&RecordChunk::new(3, 3, vec![0u8; 10])).await.unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 4 + 4 * 30);
        assert_eq!(writer.chunks_written(), 4);

        writer.close().await.unwrap();
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn oversize_chunk_is_rejected() {
        let writer = RecordWriter::with_config(RecordConfig {
            max_chunk_payload: 8,
            ..RecordConfig::default()
        });
        let err = writer
            .append(&RecordChunk::new(0, 0, vec![0u8; 9]))
            .await
            .unwrap_err();
        assert!(matches!(err, RecordError::ChunkTooLarge { size: 9, max: 8 }));
    }

    #[tokio::test]
    async fn interrupted_write_is_truncated_before_next_batch() {
        let path = temp_path("repair");
        let writer = RecordWriter::with_config(RecordConfig {
            flush_every: 1,
            ..RecordConfig::default()
        });
        writer.start(&path).await.unwrap();
        writer.append(&RecordChunk::new(1, 1, vec![1, 2, 3])).await.unwrap();

        {
            // Leave a half-written chunk header behind, as a dropped write would.
            let mut gate = writer.gate.lock().await;
            let open = gate.as_mut().unwrap();
            open.file.write_all(&[0xEE; 11]).await.unwrap();
            open.file.flush().await.unwrap();
            open.dirty = true;
        }

        writer.append(&RecordChunk::new(2, 2, vec![4, 5])).await.unwrap();
        writer.close().await.unwrap();

        let chunks = read_chunks(&path).await.unwrap();
        assert_eq!(
            chunks,
            vec![
                RecordChunk::new(1, 1, vec![1, 2, 3]),
                RecordChunk::new(2, 2, vec![4, 5]),
            ]
        );
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn failed_batch_write_keeps_chunk_pending_once() {
        let path = temp_path("failed-write");
        let writer = RecordWriter::with_config(RecordConfig {
            flush_every: 1,
            ..RecordConfig::default()
        });
        writer.start(&path).await.unwrap();

        let writable = {
            let mut gate = writer.gate.lock().await;
            let open = gate.as_mut().unwrap();
            std::mem::replace(&mut open.file, File::open(&path).await.unwrap())
        };
        let err = writer
            .append(&RecordChunk::new(1, 2, vec![7, 8]))
            .await
            .unwrap_err();
        assert!(matches!(err, RecordError::Io { .. }));
        assert_eq!(writer.chunks_written(), 1);

        writer.gate.lock().await.as_mut().unwrap().file = writable;
        writer.flush().await.unwrap();
        writer.close().await.unwrap();

        assert_eq!(
            read_chunks(&path).await.unwrap(),
            vec![RecordChunk::new(1, 2, vec![7, 8])]
        );
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn restart_closes_previous_record() {
        let first = temp_path("first");
        let second = temp_path("second");
        let writer = RecordWriter::new();

        writer.start(&first).await.unwrap();
        writer.append(&RecordChunk::new(5, 6, vec![9])).await.unwrap();
        writer.start(&second).await.unwrap();
        assert_eq!(writer.chunks_written(), 0);
        assert_eq!(writer.path().await, Some(second.clone()));
        writer.close().await.unwrap();

        assert_eq!(read_chunks(&first).await.unwrap().len(), 1);
        assert!(read_chunks(&second).await.unwrap().is_empty());
        let _ = std::fs::remove_file(&first);
        let _ = std::fs::remove_file(&second);
    }

    #[tokio::test]
    async fn start_in_missing_directory_fails() {
        let path = temp_path("missing-dir").join("nested").join("x.rfr");
        let writer = RecordWriter::new();
        let err = writer.start(&path).await.unwrap_err();
        assert!(matches!(err, RecordError::Io { .. }));
        assert!(!writer.is_recording());
    }
}
