use thiserror::Error;

/// Errors produced by the gene finder.
#[derive(Error, Debug)]
pub enum OrfeusError {
    /// Input contained a byte outside the recognized nucleotide alphabet.
    #[error("invalid sequence: {0}")]
    InvalidSequence(String),
    /// Zero-length (or all-ambiguous) input.
    #[error("empty input sequence")]
    EmptyInput,
    /// Single-mode training had too little data. Recovered internally by
    /// falling back to a bank model; only surfaced when no fallback exists.
    #[error("insufficient training data: {0}")]
    InsufficientData(String),
    /// Requested genetic code outside {1-6, 9-16, 21-25}.
    #[error("unsupported translation table: {0}")]
    UnsupportedTable(u8),
    /// Signed collection index outside [-len, len).
    #[error("gene index {index} out of bounds for collection of length {len}")]
    IndexOutOfBounds { index: isize, len: usize },
    /// Gene record (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// I/O failure while writing results.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
