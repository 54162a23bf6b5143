//! Chunk codec: splitting blobs into fixed-size chunks and putting them back.
//!
//! Chunk boundaries are fully determined by the total length and the chunk
//! size. No chunk carries its own length or offset: chunk `i` always covers
//! `[i * chunk_size, min((i + 1) * chunk_size, total_len))`. Because the
//! write offset comes from the index, reassembly does not care in which
//! order chunks arrive.

use std::ops::Range;

use bytes::Bytes;

use crate::error::{Error, Result};
use crate::model::ResourceRef;

/// Largest payload the remote interface accepts per call (1.8 MiB, floored).
pub const CHUNK_SIZE: usize = 1_887_436;

/// Number of chunks needed for `total_len` bytes: `ceil(total_len / chunk_size)`.
pub fn chunk_count(total_len: u64, chunk_size: usize) -> Result<u64> {
    if chunk_size == 0 {
        return Err(Error::invalid("chunk size must be greater than zero"));
    }
    Ok(total_len.div_ceil(chunk_size as u64))
}

/// Byte range covered by chunk `index`.
pub fn chunk_range(index: u64, total_len: u64, chunk_size: usize) -> Result<Range<usize>> {
    let count = chunk_count(total_len, chunk_size)?;
    if index >= count {
        return Err(Error::invalid(format!(
            "chunk index {index} out of range (chunk count {count})"
        )));
    }
    let start = index * chunk_size as u64;
    let end = (start + chunk_size as u64).min(total_len);
    Ok(to_usize(start)?..to_usize(end)?)
}

fn to_usize(n: u64) -> Result<usize> {
    usize::try_from(n).map_err(|_| Error::invalid(format!("size {n} does not fit in memory")))
}

/// Zeroed buffer of `len` elements, or `InvalidArgument` if it cannot be allocated.
fn zeroed<T: Clone + Default>(len: u64) -> Result<Vec<T>> {
    if len > isize::MAX as u64 {
        return Err(Error::invalid(format!("size {len} does not fit in memory")));
    }
    let len = to_usize(len)?;
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|e| Error::invalid(format!("cannot allocate {len} bytes: {e}")))?;
    buf.resize(len, T::default());
    Ok(buf)
}

/// Split a buffer into chunks, in index order. Slices share the buffer.
pub fn split(data: &Bytes, chunk_size: usize) -> Result<Vec<Bytes>> {
    let total = data.len() as u64;
    let count = chunk_count(total, chunk_size)?;
    (0..count)
        .map(|i| chunk_range(i, total, chunk_size).map(|r| data.slice(r)))
        .collect()
}

/// Rebuild a buffer of `total_len` bytes by asking `provider` for every chunk.
pub fn reassemble<F>(total_len: u64, chunk_size: usize, mut provider: F) -> Result<Bytes>
where
    F: FnMut(u64) -> Result<Bytes>,
{
    let mut assembly = Reassembler::new(total_len, chunk_size)?;
    for index in 0..assembly.chunk_count() {
        let chunk = provider(index)?;
        assembly.insert(index, &chunk)?;
    }
    assembly.finish()
}

/// Incremental reassembly into a pre-allocated buffer.
///
/// Used by concurrent downloads: chunks are inserted as their calls resolve,
/// in whatever order that happens.
pub struct Reassembler {
    buf: Vec<u8>,
    total_len: u64,
    chunk_size: usize,
    received: Vec<bool>,
    remaining: u64,
}

impl Reassembler {
    pub fn new(total_len: u64, chunk_size: usize) -> Result<Self> {
        let count = chunk_count(total_len, chunk_size)?;
        Ok(Self {
            buf: zeroed(total_len)?,
            total_len,
            chunk_size,
            received: zeroed(count)?,
            remaining: count,
        })
    }

    pub fn chunk_count(&self) -> u64 {
        self.received.len() as u64
    }

    /// Write chunk `index` at its offset. The chunk must be exactly as long
    /// as its index implies. Re-inserting an index overwrites it.
    pub fn insert(&mut self, index: u64, chunk: &[u8]) -> Result<()> {
        let range = chunk_range(index, self.total_len, self.chunk_size)?;
        if chunk.len() != range.len() {
            return Err(Error::invalid(format!(
                "chunk {index} has {} bytes, expected {}",
                chunk.len(),
                range.len()
            )));
        }
        self.buf[range].copy_from_slice(chunk);

        let slot = &mut self.received[index as usize];
        if !*slot {
            *slot = true;
            self.remaining -= 1;
        }
        Ok(())
    }

    /// Hand out the finished buffer. Fails if any chunk never arrived.
    pub fn finish(self) -> Result<Bytes> {
        if let Some(missing) = self.received.iter().position(|r| !*r) {
            return Err(Error::invalid(format!(
                "chunk {missing} missing ({} of {} outstanding)",
                self.remaining,
                self.received.len()
            )));
        }
        Ok(Bytes::from(self.buf))
    }
}

/// Everything needed to address the chunks of one transfer.
/// Created once the size is known; dropped when the transfer ends.
///
/// The chunk size is validated on construction.
#[derive(Debug, Clone)]
pub struct TransferDescriptor {
    pub resource: ResourceRef,
    pub total_length: u64,
    pub chunk_size: usize,
}

impl TransferDescriptor {
    pub fn new(resource: ResourceRef, total_length: u64, chunk_size: usize) -> Result<Self> {
        chunk_count(total_length, chunk_size)?;
        Ok(Self {
            resource,
            total_length,
            chunk_size,
        })
    }

    pub fn chunk_count(&self) -> u64 {
        self.total_length.div_ceil(self.chunk_size as u64)
    }

    pub fn is_last(&self, index: u64) -> bool {
        index + 1 == self.chunk_count()
    }
}
