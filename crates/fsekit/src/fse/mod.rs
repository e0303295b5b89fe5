//! Finite State Entropy (FSE) coding.
//!
//! FSE is a table-driven variant of ANS (Asymmetric Numeral Systems). A
//! normalized distribution, whose counts sum to `1 << table_log`, is spread
//! over a table of states; encoding a symbol moves the state and emits a few
//! low bits, decoding reads them back in reverse.
//!
//! ## Overview
//!
//! - [`DecodeTable`] and [`EncodeTable`] are built from the same normalized
//!   counts with the same spreading rule, so they agree on every state.
//! - [`FseCState`] / [`FseDState`] are the per-stream state machines; the
//!   block loops [`compress_using_ctable`] and [`decompress_using_dtable`]
//!   run two of them interleaved over one bitstream.
//! - [`normalize_count`] turns a histogram into normalized counts, and
//!   [`compress`] / [`decompress`] wrap everything into a self-describing
//!   block (NCount header followed by the bitstream).
//!
//! ## References
//!
//! - [RFC 8878 Section 4.1](https://datatracker.ietf.org/doc/html/rfc8878#section-4.1)
//! - [Asymmetric Numeral Systems](https://arxiv.org/abs/0902.0271)

mod compress;
mod decoder;
mod encoder;
mod normalize;
mod table;

pub use compress::{compress, compress_bound, decompress, CompressOutcome};
pub use decoder::{decompress_using_dtable, FseDState};
pub use encoder::{
    compress_using_ctable, ctable_workspace_len, EncodeTable, FseCState, SymbolTransform,
};
pub use normalize::{min_table_log, normalize_count, optimal_table_log};
pub use table::{
    dtable_workspace_len, DecodeEntry, DecodeTable, DTABLE_CELL_SIZE, DTABLE_HEADER_SIZE,
};

/// Smallest table log accepted by the NCount format.
pub const FSE_MIN_TABLELOG: u32 = 5;

/// Largest supported table log.
pub const FSE_MAX_TABLELOG: u32 = 15;

/// Table log used when the caller passes 0.
pub const FSE_DEFAULT_TABLELOG: u32 = 11;

/// Largest symbol value (byte alphabet).
pub const FSE_MAX_SYMBOL_VALUE: u32 = 255;

/// Worst-case NCount header size for the byte alphabet.
pub const FSE_NCOUNT_BOUND: usize = 512;

/// Worst-case bitstream size for `size` input bytes.
#[inline]
pub const fn block_bound(size: usize) -> usize {
    size + (size >> 7) + 4 + crate::bitstream::CONTAINER_BYTES
}

/// Spreading stride. Odd for every table log except 1 and 3, which makes the
/// walk visit every cell exactly once.
#[inline]
pub(crate) const fn spread_step(table_size: usize) -> usize {
    (table_size >> 1) + (table_size >> 3) + 3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert!(FSE_MIN_TABLELOG <= FSE_DEFAULT_TABLELOG);
        assert!(FSE_DEFAULT_TABLELOG <= FSE_MAX_TABLELOG);
        assert_eq!(FSE_MAX_SYMBOL_VALUE, 255);
    }

    #[test]
    fn test_spread_step_is_odd_for_supported_logs() {
        for table_log in FSE_MIN_TABLELOG..=FSE_MAX_TABLELOG {
            assert_eq!(spread_step(1 << table_log) & 1, 1, "log {table_log}");
        }
        assert_eq!(spread_step(1 << 3) & 1, 0);
    }

    #[test]
    fn test_block_bound() {
        assert_eq!(block_bound(0), 12);
        assert_eq!(block_bound(4), 16);
        assert_eq!(block_bound(1280), 1280 + 10 + 12);
    }
}
