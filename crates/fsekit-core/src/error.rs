//! Error types for entropy coding operations.

use thiserror::Error;

/// Result type alias for entropy coding operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Entropy coding error kinds.
///
/// Every failure in the bitstream, table and header code maps to exactly one
/// of these kinds. They carry no payload so they can be returned from hot
/// paths without allocating; context is logged at the failure site instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum Error {
    /// Destination buffer exhausted, or too small to hold a bitstream.
    #[error("destination buffer is too small")]
    DstSizeTooSmall,

    /// Source size is structurally invalid (empty stream, truncated header).
    #[error("source size is wrong")]
    SrcSizeWrong,

    /// Input violates a format invariant.
    #[error("corrupted data detected")]
    CorruptionDetected,

    /// Table log exceeds what the caller or the format supports.
    #[error("table log is too large")]
    TableLogTooLarge,

    /// Alphabet exceeds 256 symbols or the provided counts.
    #[error("max symbol value is too large")]
    MaxSymbolValueTooLarge,

    /// Input contains symbols above the declared alphabet bound.
    #[error("max symbol value is too small")]
    MaxSymbolValueTooSmall,

    /// Caller-provided scratch buffer is undersized.
    #[error("workspace is too small")]
    WorkSpaceTooSmall,

    /// Internal invariant failure, e.g. an invalid normalized distribution.
    #[error("generic error")]
    GenericError,
}

impl Error {
    /// Check if error is recoverable (can retry with different parameters).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::DstSizeTooSmall | Error::WorkSpaceTooSmall | Error::MaxSymbolValueTooSmall
        )
    }

    /// Check if error was caused by malformed input rather than bad parameters.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Error::CorruptionDetected | Error::SrcSizeWrong)
    }

    /// Get error category for metrics.
    pub fn category(&self) -> &'static str {
        match self {
            Error::DstSizeTooSmall => "dst_size_too_small",
            Error::SrcSizeWrong => "src_size_wrong",
            Error::CorruptionDetected => "corruption_detected",
            Error::TableLogTooLarge => "table_log_too_large",
            Error::MaxSymbolValueTooLarge => "max_symbol_value_too_large",
            Error::MaxSymbolValueTooSmall => "max_symbol_value_too_small",
            Error::WorkSpaceTooSmall => "workspace_too_small",
            Error::GenericError => "generic",
        }
    }
}
