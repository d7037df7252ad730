use crate::error::RagError;

/// Incremental UTF-8 decoder for arbitrary chunk boundaries.
///
/// The transport delivers byte chunks with no alignment guarantees — a
/// multi-byte character can be split across two chunks. An incomplete
/// trailing sequence is carried over and prepended to the next chunk;
/// anything actually invalid is a `Decode` error.
#[derive(Debug, Default)]
pub struct ChunkDecoder {
    pending: Vec<u8>,
}

impl ChunkDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next chunk, returning all text that is complete so far.
    pub fn decode(&mut self, bytes: &[u8]) -> Result<String, RagError> {
        self.pending.extend_from_slice(bytes);

        match std::str::from_utf8(&self.pending) {
            Ok(_) => {
                let complete = std::mem::take(&mut self.pending);
                String::from_utf8(complete).map_err(|_| RagError::Decode)
            }
            Err(e) if e.error_len().is_none() => {
                // Incomplete sequence at the end — hold it for the next chunk
                let tail = self.pending.split_off(e.valid_up_to());
                let complete = std::mem::replace(&mut self.pending, tail);
                String::from_utf8(complete).map_err(|_| RagError::Decode)
            }
            Err(_) => Err(RagError::Decode),
        }
    }

    /// Called at end-of-stream: a held partial sequence means the stream
    /// was truncated mid-character.
    pub fn finish(&self) -> Result<(), RagError> {
        if self.pending.is_empty() {
            Ok(())
        } else {
            Err(RagError::Decode)
        }
    }
}
