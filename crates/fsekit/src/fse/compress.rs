//! One-shot FSE block codec.
//!
//! A block is an NCount header followed by the FSE bitstream:
//!
//! ```text
//! +----------------+---------------------------+
//! | NCount header  | bitstream (read backward) |
//! +----------------+---------------------------+
//! ```
//!
//! The original size is not stored; the caller keeps it alongside the block.

use super::{
    block_bound, compress_using_ctable, decompress_using_dtable, normalize_count,
    optimal_table_log, DecodeTable, EncodeTable, FSE_NCOUNT_BOUND,
};
use crate::config::FseConfig;
use crate::hist::{self, HIST_WKSP_SIZE};
use crate::ncount::{read_ncount, write_ncount};
use fsekit_core::{Error, Result};
use tracing::debug;

/// Inputs at least this large may use the low-probability count class.
const LOW_PROB_MIN_SRC_SIZE: usize = 2048;

/// Result of [`compress`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressOutcome {
    /// `dst[..n]` holds the block.
    Compressed(usize),
    /// Every input byte equals this symbol; nothing was written.
    Rle(u8),
    /// FSE would not shrink the input; nothing useful was written.
    Incompressible,
}

/// Worst-case block size for `size` input bytes.
#[inline]
pub const fn compress_bound(size: usize) -> usize {
    FSE_NCOUNT_BOUND + block_bound(size)
}

/// Compress `src` into `dst` as a single FSE block.
///
/// # Arguments
/// * `dst` - Output buffer; [`compress_bound`] bytes always suffice
/// * `src` - Input bytes
/// * `config` - Alphabet bound and table log
///
/// # Returns
/// The outcome. Only [`CompressOutcome::Compressed`] leaves a decodable
/// block in `dst`.
pub fn compress(dst: &mut [u8], src: &[u8], config: &FseConfig) -> Result<CompressOutcome> {
    config.validate()?;
    if src.len() <= 1 {
        return Ok(CompressOutcome::Incompressible);
    }

    let mut count = [0u32; 256];
    let mut max_symbol_value = config.max_symbol_value;
    let mut wksp = [0u32; HIST_WKSP_SIZE];
    let max_count = hist::count(&mut count, &mut max_symbol_value, src, &mut wksp)? as usize;

    if max_count == src.len() {
        debug!(len = src.len(), symbol = src[0], "single-symbol input, using RLE");
        return Ok(CompressOutcome::Rle(src[0]));
    }
    if max_count == 1 || max_count < (src.len() >> 7) {
        debug!(len = src.len(), max_count, "flat distribution, not compressible");
        return Ok(CompressOutcome::Incompressible);
    }

    let table_log = optimal_table_log(config.table_log, src.len(), max_symbol_value);
    let mut norm = [0i16; 256];
    let table_log = normalize_count(
        &mut norm,
        table_log,
        &count,
        src.len(),
        max_symbol_value,
        src.len() >= LOW_PROB_MIN_SRC_SIZE,
    )?;

    let header_size = write_ncount(dst, &norm, max_symbol_value, table_log)?;
    let table = EncodeTable::build(&norm, max_symbol_value, table_log)?;
    let stream_size = compress_using_ctable(&mut dst[header_size..], src, &table);
    if stream_size == 0 {
        debug!(len = src.len(), "FSE stream does not fit in the output buffer");
        return Ok(CompressOutcome::Incompressible);
    }

    let total = header_size + stream_size;
    if total >= src.len() - 1 {
        debug!(len = src.len(), total, "FSE block not smaller than input");
        return Ok(CompressOutcome::Incompressible);
    }

    debug!(
        len = src.len(),
        compressed = total,
        table_log,
        max_symbol_value,
        "compressed FSE block"
    );
    Ok(CompressOutcome::Compressed(total))
}

/// Decompress a block produced by [`compress`].
///
/// Tables above `max_table_log` are refused with
/// [`Error::TableLogTooLarge`], which bounds the memory an untrusted header
/// can make the decoder allocate.
///
/// # Returns
/// The number of bytes written to `dst`.
pub fn decompress(dst: &mut [u8], src: &[u8], max_table_log: u32) -> Result<usize> {
    let mut counts = [0i16; 256];
    let ncount = read_ncount(&mut counts, src)?;
    if ncount.table_log > max_table_log {
        debug!(
            table_log = ncount.table_log,
            max_table_log, "FSE block table log above the limit"
        );
        return Err(Error::TableLogTooLarge);
    }
    let table = DecodeTable::build(&counts, ncount.max_symbol_value, ncount.table_log)?;
    let stream = src
        .get(ncount.header_size..)
        .ok_or(Error::CorruptionDetected)?;
    decompress_using_dtable(dst, stream, &table)
}
