use std::collections::VecDeque;

/// FIFO byte queue between the capture path and the pacing loop.
///
/// Producers append transformed PCM bytes; the owning protocol client
/// drains fixed-size slices. Exclusively owned by one client task.
#[derive(Debug, Default)]
pub struct TransmissionBuffer {
    bytes: VecDeque<u8>,
}

impl TransmissionBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes at the tail.
    pub fn append(&mut self, data: &[u8]) {
        self.bytes.extend(data);
    }

    /// Remove and return up to `n` bytes from the head, preserving order.
    pub fn drain(&mut self, n: usize) -> Vec<u8> {
        let take = n.min(self.bytes.len());
        self.bytes.drain(..take).collect()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
