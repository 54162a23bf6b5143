//! Chunk types: the unit of a chunked upload.

use bytes::Bytes;

use asynce_core::chunk::{self, TransferDescriptor};
use asynce_core::error::Result;

/// A chunk ready to be sent with a chunk command.
#[derive(Debug, Clone)]
pub struct OutgoingChunk {
    pub index: u64,
    pub payload: Bytes,
    /// Set on the final chunk only. Some remotes finalize on it.
    pub is_last: bool,
    /// Length of the whole blob, sent with every chunk.
    pub total_length: u64,
}

impl OutgoingChunk {
    /// Build the chunk list for `data`, in index order.
    ///
    /// An empty blob still yields one empty chunk flagged `is_last`, so the
    /// remote sees the upload finish.
    pub fn sequence(desc: &TransferDescriptor, data: &Bytes) -> Result<Vec<OutgoingChunk>> {
        let payloads = chunk::split(data, desc.chunk_size)?;
        if payloads.is_empty() {
            return Ok(vec![OutgoingChunk {
                index: 0,
                payload: Bytes::new(),
                is_last: true,
                total_length: desc.total_length,
            }]);
        }
        Ok((0u64..)
            .zip(payloads)
            .map(|(index, payload)| OutgoingChunk {
                index,
                payload,
                is_last: desc.is_last(index),
                total_length: desc.total_length,
            })
            .collect())
    }
}
