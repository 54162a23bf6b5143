//! Transfer client: drives one chunked upload or download.
//!
//! The client knows nothing about resource kinds. A [`ChunkSource`] or
//! [`ChunkSink`] binds the three remote operations (size query, chunk query,
//! chunk command) for one resource; the client computes chunk boundaries,
//! fans calls out, unwraps every envelope and reassembles the result.
//!
//! Failure policy: the first failed chunk fails the transfer. No new chunk
//! call is issued after it. Calls that are already in flight are still driven
//! to completion and their results discarded; a partially reassembled buffer
//! is never handed out.

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{FuturesUnordered, StreamExt};

use asynce_core::chunk::{self, Reassembler, TransferDescriptor};
use asynce_core::config::TransferConfig;
use asynce_core::envelope::{self, Envelope};
use asynce_core::error::{Error, Result};
use asynce_core::model::{ResourceRef, UploadMode};

use crate::chunk_types::OutgoingChunk;
use crate::progress::Progress;

/// Raw result of one remote call: transport failure, no envelope, or envelope.
pub type Reply<T> = Result<Option<Envelope<T>>>;

/// Read side of a chunked resource.
#[async_trait]
pub trait ChunkSource: Send + Sync {
    fn resource(&self) -> ResourceRef;

    /// Total length of the stored blob.
    async fn size(&self) -> Reply<u64>;

    async fn chunk(&self, index: u64) -> Reply<Bytes>;
}

/// Write side of a chunked resource.
#[async_trait]
pub trait ChunkSink: Send + Sync {
    fn resource(&self) -> ResourceRef;

    fn mode(&self) -> UploadMode {
        self.resource().kind.upload_mode()
    }

    async fn put_chunk(&self, chunk: OutgoingChunk) -> Reply<()>;
}

#[derive(Debug, Clone)]
pub struct TransferClient {
    chunk_size: usize,
    /// Max calls in flight per transfer. 0 = unlimited.
    max_in_flight: usize,
}

impl Default for TransferClient {
    fn default() -> Self {
        Self {
            chunk_size: chunk::CHUNK_SIZE,
            max_in_flight: 0,
        }
    }
}

impl TransferClient {
    pub fn new(chunk_size: usize, max_in_flight: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::invalid("chunk size must be greater than zero"));
        }
        Ok(Self {
            chunk_size,
            max_in_flight,
        })
    }

    pub fn from_config(config: &TransferConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.max_in_flight)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// How many of `count` independent calls may run at once.
    pub fn window(&self, count: usize) -> usize {
        match self.max_in_flight {
            0 => count.max(1),
            n => n,
        }
    }

    // ── Upload ────────────────────────────────────────────────────────────────

    pub async fn upload<S>(&self, sink: &S, data: Bytes) -> Result<()>
    where
        S: ChunkSink + ?Sized,
    {
        self.upload_tracked(sink, data, &Progress::new()).await
    }

    /// Upload `data`, reporting completed bytes into `progress`.
    pub async fn upload_tracked<S>(&self, sink: &S, data: Bytes, progress: &Progress) -> Result<()>
    where
        S: ChunkSink + ?Sized,
    {
        let total = data.len() as u64;
        let desc = TransferDescriptor::new(sink.resource(), total, self.chunk_size)?;
        let resource = &desc.resource;
        let chunks = OutgoingChunk::sequence(&desc, &data)?;
        let count = chunks.len();
        let mode = sink.mode();
        progress.begin(total);

        tracing::debug!(resource = %resource, total, chunks = count, ?mode, "upload started");

        match mode {
            UploadMode::Sequential => {
                for chunk in chunks {
                    let index = chunk.index;
                    let len = chunk.payload.len() as u64;
                    let reply = sink.put_chunk(chunk).await?;
                    envelope::unwrap_chunk(index, reply).inspect_err(|e| {
                        tracing::warn!(resource = %resource, index, error = %e, "upload aborted");
                    })?;
                    progress.advance(len);
                }
            }
            UploadMode::Concurrent => {
                let put = move |chunk: OutgoingChunk| async move {
                    let index = chunk.index;
                    let len = chunk.payload.len() as u64;
                    (index, len, sink.put_chunk(chunk).await)
                };
                let mut pending = chunks.into_iter();
                let mut in_flight: FuturesUnordered<_> =
                    pending.by_ref().take(self.window(count)).map(put).collect();

                let mut failure = None;
                while let Some((index, len, reply)) = in_flight.next().await {
                    match reply.and_then(|r| envelope::unwrap_chunk(index, r)) {
                        Ok(()) => progress.advance(len),
                        Err(e) if failure.is_none() => {
                            tracing::warn!(resource = %resource, index, error = %e, "upload failed");
                            failure = Some(e);
                        }
                        Err(_) => {}
                    }
                    if failure.is_none() {
                        in_flight.extend(pending.next().map(put));
                    }
                }
                if let Some(e) = failure {
                    return Err(e);
                }
            }
        }

        progress.finish();
        tracing::info!(resource = %resource, bytes = total, chunks = count, "upload complete");
        Ok(())
    }

    // ── Download ──────────────────────────────────────────────────────────────

    pub async fn download<S>(&self, source: &S) -> Result<Bytes>
    where
        S: ChunkSource + ?Sized,
    {
        let total = envelope::unwrap(source.size().await?)?;
        let desc = TransferDescriptor::new(source.resource(), total, self.chunk_size)?;
        let resource = &desc.resource;
        if total == 0 {
            tracing::debug!(resource = %resource, "empty resource");
            return Ok(Bytes::new());
        }

        let mut assembly = Reassembler::new(desc.total_length, desc.chunk_size)?;
        let count = desc.chunk_count();
        let window = self.window(usize::try_from(count).unwrap_or(usize::MAX));

        let fetch = move |index: u64| async move { (index, source.chunk(index).await) };
        let mut pending = 0..count;
        let mut in_flight: FuturesUnordered<_> = pending.by_ref().take(window).map(fetch).collect();

        let mut failure = None;
        while let Some((index, reply)) = in_flight.next().await {
            if failure.is_some() {
                continue;
            }
            let written = reply
                .and_then(|r| envelope::unwrap_chunk(index, r))
                .and_then(|bytes| assembly.insert(index, &bytes));
            match written {
                Ok(()) => in_flight.extend(pending.next().map(fetch)),
                Err(e) => {
                    tracing::warn!(resource = %resource, index, error = %e, "download failed");
                    failure = Some(e);
                }
            }
        }
        if let Some(e) = failure {
            return Err(e);
        }

        let data = assembly.finish()?;
        tracing::info!(resource = %resource, bytes = total, chunks = count, "download complete");
        Ok(data)
    }

    /// Download and hand the completed buffer to `consume`.
    pub async fn download_with<S, F, T>(&self, source: &S, consume: F) -> Result<T>
    where
        S: ChunkSource + ?Sized,
        F: FnOnce(Bytes) -> T,
    {
        self.download(source).await.map(consume)
    }
}
