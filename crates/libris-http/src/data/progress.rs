use std::sync::Arc;

/// Callback invoked as request body bytes are handed to the network.
pub type ProgressCallback = Arc<dyn Fn(&TransferProgress) + Send + Sync>;

/// Upload progress snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferProgress {
    /// Bytes of the file payload sent so far.
    pub bytes_sent: u64,

    /// Size of the file payload, when known.
    pub total_bytes: Option<u64>,
}

impl TransferProgress {
    pub fn new(bytes_sent: u64, total_bytes: Option<u64>) -> Self {
        Self {
            bytes_sent,
            total_bytes,
        }
    }

    /// Completion percentage in `0..=100`.
    ///
    /// Returns `None` if `total_bytes` is unknown. An empty payload counts as
    /// complete.
    #[must_use]
    pub fn percentage(&self) -> Option<u8> {
        self.total_bytes.map(|total| {
            if total == 0 {
                return 100;
            }
            let pct = (self.bytes_sent.min(total) as f64 / total as f64) * 100.0;
            pct.round() as u8
        })
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.total_bytes.is_some_and(|total| self.bytes_sent >= total)
    }
}
