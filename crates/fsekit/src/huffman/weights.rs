//! Huffman weight header reader.

use super::{HUF_DIRECT_HEADER_MIN, HUF_SYMBOLVALUE_MAX, HUF_TABLELOG_MAX, HUF_WEIGHT_TABLELOG};
use crate::bitstream::highbit32;
use crate::fse;
use fsekit_core::{Error, Result};
use tracing::debug;

/// Decoded Huffman weight header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HuffmanStats {
    /// One weight per symbol, including the implied last one.
    pub weights: Vec<u8>,
    /// `rank_stats[w]` is the number of symbols with weight `w`.
    pub rank_stats: [u32; HUF_TABLELOG_MAX as usize + 1],
    /// Number of symbols described, `weights.len()`.
    pub nb_symbols: u32,
    /// Huffman table log (longest code length).
    pub table_log: u32,
    /// Bytes of `src` the header occupied.
    pub header_size: usize,
}

/// Read a Huffman weight header from the start of `src`.
///
/// # Errors
/// - [`Error::SrcSizeWrong`] if `src` is shorter than the header claims
/// - [`Error::CorruptionDetected`] if the weights do not describe a
///   complete prefix code
/// - any error of [`fse::decompress`] for FSE-compressed weights
pub fn read_stats(src: &[u8]) -> Result<HuffmanStats> {
    let header = *src.first().ok_or(Error::SrcSizeWrong)?;

    let mut weights = Vec::with_capacity(HUF_SYMBOLVALUE_MAX as usize + 1);
    let input_size = if header >= HUF_DIRECT_HEADER_MIN {
        let count = (header - (HUF_DIRECT_HEADER_MIN - 1)) as usize;
        let input_size = (count + 1) / 2;
        let packed = src.get(1..=input_size).ok_or(Error::SrcSizeWrong)?;
        for &byte in packed {
            weights.push(byte >> 4);
            weights.push(byte & 0x0F);
        }
        weights.truncate(count);
        input_size
    } else {
        let input_size = header as usize;
        let block = src.get(1..=input_size).ok_or(Error::SrcSizeWrong)?;
        let mut buffer = [0u8; HUF_SYMBOLVALUE_MAX as usize];
        let n = fse::decompress(&mut buffer, block, HUF_WEIGHT_TABLELOG)?;
        weights.extend_from_slice(&buffer[..n]);
        input_size
    };

    let mut rank_stats = [0u32; HUF_TABLELOG_MAX as usize + 1];
    let mut weight_total = 0u32;
    for &weight in &weights {
        if u32::from(weight) > HUF_TABLELOG_MAX {
            debug!(weight, "Huffman weight above the maximum");
            return Err(Error::CorruptionDetected);
        }
        rank_stats[weight as usize] += 1;
        weight_total += (1 << weight) >> 1;
    }
    if weight_total == 0 {
        return Err(Error::CorruptionDetected);
    }

    let table_log = highbit32(weight_total) + 1;
    if table_log > HUF_TABLELOG_MAX {
        debug!(table_log, "Huffman table log above the maximum");
        return Err(Error::CorruptionDetected);
    }

    // The implied last weight must fill the gap to 2^table_log exactly.
    let rest = (1u32 << table_log) - weight_total;
    let rest_log = highbit32(rest);
    if 1 << rest_log != rest {
        debug!(weight_total, table_log, "Huffman weights leave an uneven gap");
        return Err(Error::CorruptionDetected);
    }
    let last_weight = rest_log + 1;
    weights.push(last_weight as u8);
    rank_stats[last_weight as usize] += 1;

    // The two longest codes always come as a pair.
    if rank_stats[1] < 2 || rank_stats[1] & 1 == 1 {
        debug!(rank_1 = rank_stats[1], "odd number of longest Huffman codes");
        return Err(Error::CorruptionDetected);
    }

    Ok(HuffmanStats {
        nb_symbols: weights.len() as u32,
        weights,
        rank_stats,
        table_log,
        header_size: input_size + 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FseConfig;
    use crate::fse::{compress, compress_bound, CompressOutcome};

    #[test]
    fn test_direct_weights() {
        // Weights 2, 1, 1; the padding nibble is ignored.
        let stats = read_stats(&[130, 0x21, 0x10, 0xFF]).unwrap();
        assert_eq!(stats.weights, vec![2, 1, 1, 3]);
        assert_eq!(stats.nb_symbols, 4);
        assert_eq!(stats.table_log, 3);
        assert_eq!(stats.header_size, 3);
        assert_eq!(&stats.rank_stats[..4], &[0, 2, 1, 1]);
    }

    #[test]
    fn test_fse_compressed_weights() {
        let mut weights = vec![1u8; 96];
        weights.extend(std::iter::repeat(2u8).take(16));

        let mut block = vec![0u8; compress_bound(weights.len())];
        let size = match compress(&mut block, &weights, &FseConfig::for_huffman_weights()).unwrap()
        {
            CompressOutcome::Compressed(size) => size,
            other => panic!("unexpected {other:?}"),
        };
        assert!(size < 128);

        let mut src = vec![size as u8];
        src.extend_from_slice(&block[..size]);
        src.extend_from_slice(b"trailing");

        let stats = read_stats(&src).unwrap();
        assert_eq!(stats.header_size, size + 1);
        assert_eq!(stats.nb_symbols, 113);
        assert_eq!(stats.table_log, 8);
        assert_eq!(stats.weights[..112], weights[..]);
        assert_eq!(stats.weights[112], 8);
        assert_eq!(stats.rank_stats[1], 96);
        assert_eq!(stats.rank_stats[2], 16);
        assert_eq!(stats.rank_stats[8], 1);
    }

    #[test]
    fn test_truncated_header() {
        assert_eq!(read_stats(&[]).unwrap_err(), Error::SrcSizeWrong);
        assert_eq!(read_stats(&[130, 0x21]).unwrap_err(), Error::SrcSizeWrong);
        assert_eq!(read_stats(&[20, 1, 2, 3]).unwrap_err(), Error::SrcSizeWrong);
    }

    #[test]
    fn test_invalid_weight_sets() {
        // Weight 13.
        assert_eq!(
            read_stats(&[129, 0xD1]).unwrap_err(),
            Error::CorruptionDetected
        );
        // All weights zero.
        assert_eq!(
            read_stats(&[129, 0x00]).unwrap_err(),
            Error::CorruptionDetected
        );
        // Total 4096 needs a table log of 13.
        assert_eq!(
            read_stats(&[129, 0xCC]).unwrap_err(),
            Error::CorruptionDetected
        );
        // Gap of 3 is not a power of two.
        assert_eq!(
            read_stats(&[130, 0x22, 0x10]).unwrap_err(),
            Error::CorruptionDetected
        );
        // No weight-1 symbols at all.
        assert_eq!(
            read_stats(&[129, 0x22]).unwrap_err(),
            Error::CorruptionDetected
        );
    }
}
