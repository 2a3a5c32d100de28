//! Signature read-back buffer
//!
//! Holds the output of the most recent signing command so the host can pull
//! it back in fixed-size chunks. The valid length is tracked, so reads past
//! the last result are refused instead of returning stale bytes.

/// Most recent signing result, readable in `chunk_size` pieces
#[derive(Debug, Clone, Default)]
pub struct SignatureBuffer {
    data: Vec<u8>,
    chunk_size: usize,
}

impl SignatureBuffer {
    /// Empty buffer read back in `chunk_size` pieces
    #[must_use]
    pub fn new(chunk_size: usize) -> Self {
        Self {
            data: Vec::new(),
            chunk_size,
        }
    }

    /// Replace the contents with a new result
    pub fn replace(&mut self, bytes: Vec<u8>) {
        self.data = bytes;
    }

    /// Current contents
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Number of valid bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// No signing command has produced output yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of complete chunks available
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.data.len() / self.chunk_size.max(1)
    }

    /// Chunk at `index`, if it lies entirely within the valid bytes
    #[must_use]
    pub fn chunk(&self, index: u16) -> Option<&[u8]> {
        let start = usize::from(index) * self.chunk_size;
        self.data.get(start..start + self.chunk_size)
    }
}
