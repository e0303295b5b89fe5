//! FSE decoding tables.
//!
//! A decoding table has `1 << table_log` cells. Each cell names the symbol
//! decoded from that state and how to reach the next state: read `nb_bits`
//! from the stream and add them to `new_state`.

use super::{spread_step, FSE_MAX_SYMBOL_VALUE, FSE_MAX_TABLELOG};
use crate::bitstream::highbit32;
use fsekit_core::{Error, Result};
use tracing::trace;

/// Number of `u16` scratch cells [`DecodeTable::build_with_workspace`] needs.
#[inline]
pub const fn dtable_workspace_len(max_symbol_value: u32, table_log: u32) -> usize {
    max_symbol_value as usize + 1 + (1usize << table_log)
}

/// A single cell of a decoding table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C)]
pub struct DecodeEntry {
    /// Base value of the next state, before the low bits are added.
    pub new_state: u16,
    /// Symbol decoded from this state.
    pub symbol: u8,
    /// Number of bits to read for the next state.
    pub nb_bits: u8,
}

impl DecodeEntry {
    /// Create a new decoding cell.
    #[inline]
    pub const fn new(symbol: u8, nb_bits: u8, new_state: u16) -> Self {
        Self {
            new_state,
            symbol,
            nb_bits,
        }
    }
}

/// Serialized size of the decoding table header.
pub const DTABLE_HEADER_SIZE: usize = 4;

/// Serialized size of a decoding table cell.
pub const DTABLE_CELL_SIZE: usize = 4;

/// FSE decoding table.
///
/// Built from a normalized distribution, or directly as an RLE or raw table.
/// `fast_mode` is set when every reachable cell reads at least one bit, which
/// lets the decoder use the unchecked reader path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeTable {
    entries: Vec<DecodeEntry>,
    table_log: u32,
    fast_mode: bool,
}

impl DecodeTable {
    /// Build a decoding table from a normalized distribution.
    ///
    /// # Arguments
    /// * `counts` - Normalized count per symbol; `-1` marks a low-probability
    ///   symbol that takes exactly one cell
    /// * `max_symbol_value` - Largest symbol present in `counts`
    /// * `table_log` - Log2 of the table size
    ///
    /// # Returns
    /// The built table, or an error if the parameters or the distribution
    /// are invalid.
    pub fn build(counts: &[i16], max_symbol_value: u32, table_log: u32) -> Result<Self> {
        let mut wksp = vec![
            0u16;
            dtable_workspace_len(
                max_symbol_value.min(FSE_MAX_SYMBOL_VALUE),
                table_log.min(FSE_MAX_TABLELOG)
            )
        ];
        Self::build_with_workspace(counts, max_symbol_value, table_log, &mut wksp)
    }

    /// Build a decoding table using caller-provided scratch space.
    ///
    /// `wksp` must hold at least [`dtable_workspace_len`] cells.
    pub fn build_with_workspace(
        counts: &[i16],
        max_symbol_value: u32,
        table_log: u32,
        wksp: &mut [u16],
    ) -> Result<Self> {
        if max_symbol_value > FSE_MAX_SYMBOL_VALUE {
            return Err(Error::MaxSymbolValueTooLarge);
        }
        if table_log > FSE_MAX_TABLELOG {
            return Err(Error::TableLogTooLarge);
        }
        let max_sv1 = max_symbol_value as usize + 1;
        if counts.len() < max_sv1 {
            return Err(Error::MaxSymbolValueTooLarge);
        }
        if wksp.len() < dtable_workspace_len(max_symbol_value, table_log) {
            return Err(Error::WorkSpaceTooSmall);
        }
        let counts = &counts[..max_sv1];
        let table_size = 1usize << table_log;
        let step = spread_step(table_size);
        if table_log == 0 || step & 1 == 0 {
            return Err(Error::GenericError);
        }
        validate_distribution(counts, table_size)?;

        let (symbol_next, spread) = wksp.split_at_mut(max_sv1);
        let spread = &mut spread[..table_size];
        let mut entries = vec![DecodeEntry::default(); table_size];

        // Low-probability symbols go to the top of the table
        let large_limit = 1i16 << (table_log - 1);
        let mut fast_mode = true;
        let mut high_threshold = table_size - 1;
        for (s, &count) in counts.iter().enumerate() {
            if count == -1 {
                entries[high_threshold].symbol = s as u8;
                high_threshold = high_threshold.wrapping_sub(1);
                symbol_next[s] = 1;
            } else {
                if count >= large_limit {
                    fast_mode = false;
                }
                symbol_next[s] = count.max(0) as u16;
            }
        }

        let mask = table_size - 1;
        if high_threshold == table_size - 1 {
            // No low-probability symbols: lay out the symbol sequence first,
            // then scatter it with the stride.
            let mut pos = 0;
            for (s, &count) in counts.iter().enumerate() {
                for cell in &mut spread[pos..pos + count as usize] {
                    *cell = s as u16;
                }
                pos += count as usize;
            }
            let mut position = 0usize;
            for pair in spread.chunks_exact(2) {
                for (u, &symbol) in pair.iter().enumerate() {
                    entries[(position + u * step) & mask].symbol = symbol as u8;
                }
                position = (position + 2 * step) & mask;
            }
            debug_assert_eq!(position, 0);
        } else {
            let mut position = 0usize;
            for (s, &count) in counts.iter().enumerate() {
                for _ in 0..count.max(0) {
                    entries[position].symbol = s as u8;
                    position = (position + step) & mask;
                    while position > high_threshold {
                        position = (position + step) & mask;
                    }
                }
            }
            if position != 0 {
                return Err(Error::GenericError);
            }
        }

        for entry in entries.iter_mut() {
            let symbol = entry.symbol as usize;
            let next_state = u32::from(symbol_next[symbol]);
            symbol_next[symbol] += 1;
            let nb_bits = table_log - highbit32(next_state);
            entry.nb_bits = nb_bits as u8;
            entry.new_state = ((next_state << nb_bits) - table_size as u32) as u16;
        }

        trace!(table_log, max_symbol_value, fast_mode, "built FSE decoding table");

        Ok(Self {
            entries,
            table_log,
            fast_mode,
        })
    }

    /// Table that always decodes `symbol` and never reads bits.
    pub fn rle(symbol: u8) -> Self {
        Self {
            entries: vec![DecodeEntry::new(symbol, 0, 0)],
            table_log: 0,
            fast_mode: false,
        }
    }

    /// Table that decodes each `nb_bits`-bit field as the symbol equal to it.
    ///
    /// Fails with [`Error::GenericError`] unless `1 <= nb_bits <= 8`.
    pub fn raw(nb_bits: u32) -> Result<Self> {
        if !(1..=8).contains(&nb_bits) {
            return Err(Error::GenericError);
        }
        let table_size = 1usize << nb_bits;
        let entries = (0..table_size)
            .map(|s| DecodeEntry::new(s as u8, nb_bits as u8, 0))
            .collect();
        Ok(Self {
            entries,
            table_log: nb_bits,
            fast_mode: true,
        })
    }

    /// Log2 of the number of cells.
    #[inline]
    pub fn table_log(&self) -> u32 {
        self.table_log
    }

    /// Number of cells.
    #[inline]
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    /// Whether every cell reads at least one bit.
    #[inline]
    pub fn fast_mode(&self) -> bool {
        self.fast_mode
    }

    /// All cells, indexed by state.
    #[inline]
    pub fn entries(&self) -> &[DecodeEntry] {
        &self.entries
    }

    /// Cell for `state`.
    #[inline]
    pub fn decode(&self, state: usize) -> &DecodeEntry {
        &self.entries[state]
    }

    /// Serialize the table.
    ///
    /// Layout is a header of `table_log` and `fast_mode` as little-endian
    /// `u16`s, then one 4-byte cell per state holding `symbol`, `nb_bits`
    /// and `new_state` (little-endian).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(DTABLE_HEADER_SIZE + self.entries.len() * DTABLE_CELL_SIZE);
        out.extend_from_slice(&(self.table_log as u16).to_le_bytes());
        out.extend_from_slice(&u16::from(self.fast_mode).to_le_bytes());
        for entry in &self.entries {
            out.push(entry.symbol);
            out.push(entry.nb_bits);
            out.extend_from_slice(&entry.new_state.to_le_bytes());
        }
        out
    }
}

/// Check that `counts` fills exactly `table_size` cells.
pub(crate) fn validate_distribution(counts: &[i16], table_size: usize) -> Result<()> {
    let mut total = 0usize;
    for &count in counts {
        match count {
            -1 => total += 1,
            c if c >= 0 => total += c as usize,
            _ => return Err(Error::GenericError),
        }
    }
    if total != table_size {
        return Err(Error::GenericError);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_symbol_table() {
        let table = DecodeTable::build(&[3, 1], 1, 2).unwrap();
        let symbols: Vec<u8> = table.entries().iter().map(|e| e.symbol).collect();
        assert_eq!(symbols, vec![0, 0, 0, 1]);
        assert!(!table.fast_mode());
        assert_eq!(table.size(), 4);

        // Symbol 0 occupies three states; the first one reads a bit.
        assert_eq!(table.decode(0).nb_bits, 1);
        assert_eq!(table.decode(0).new_state, 2);
        assert_eq!(table.decode(1).nb_bits, 0);
        assert_eq!(table.decode(2).nb_bits, 0);
        assert_eq!(table.decode(3).nb_bits, 2);
        assert_eq!(table.decode(3).new_state, 0);
    }

    #[test]
    fn test_every_symbol_occupies_its_count() {
        let counts: [i16; 5] = [10, 7, 1, -1, 13];
        let table = DecodeTable::build(&counts, 4, 5).unwrap();
        for (s, &count) in counts.iter().enumerate() {
            let expected = if count == -1 { 1 } else { count as usize };
            let seen = table.entries().iter().filter(|e| e.symbol as usize == s).count();
            assert_eq!(seen, expected, "symbol {s}");
        }
        // Low-probability symbols sit at the top and read a full state.
        let last = table.decode(31);
        assert_eq!(last.symbol, 3);
        assert_eq!(last.nb_bits, 5);
        assert_eq!(last.new_state, 0);
    }

    #[test]
    fn test_next_state_stays_in_range() {
        let counts: [i16; 4] = [12, 10, 9, 1];
        let table = DecodeTable::build(&counts, 3, 5).unwrap();
        assert!(table.fast_mode());
        for entry in table.entries() {
            let max_next = entry.new_state as usize + (1usize << entry.nb_bits) - 1;
            assert!(max_next < table.size());
            assert!(entry.nb_bits >= 1);
        }
    }

    #[test]
    fn test_dominant_symbol_clears_fast_mode() {
        let table = DecodeTable::build(&[16, 16], 1, 5).unwrap();
        assert!(!table.fast_mode());
    }

    #[test]
    fn test_rejects_bad_parameters() {
        assert_eq!(
            DecodeTable::build(&[0], 0, 16).unwrap_err(),
            Error::TableLogTooLarge
        );
        assert_eq!(
            DecodeTable::build(&[0; 300], 256, 5).unwrap_err(),
            Error::MaxSymbolValueTooLarge
        );
        assert_eq!(
            DecodeTable::build(&[16, 16], 2, 5).unwrap_err(),
            Error::MaxSymbolValueTooLarge
        );
        assert_eq!(
            DecodeTable::build(&[16, 15], 1, 5).unwrap_err(),
            Error::GenericError
        );
        assert_eq!(
            DecodeTable::build(&[16, 17, -2], 2, 5).unwrap_err(),
            Error::GenericError
        );
    }

    #[test]
    fn test_workspace_too_small() {
        let mut wksp = vec![0u16; dtable_workspace_len(1, 5) - 1];
        assert_eq!(
            DecodeTable::build_with_workspace(&[16, 16], 1, 5, &mut wksp).unwrap_err(),
            Error::WorkSpaceTooSmall
        );
    }

    #[test]
    fn test_rle_table() {
        let table = DecodeTable::rle(0x41);
        assert_eq!(table.table_log(), 0);
        assert!(!table.fast_mode());
        assert_eq!(table.entries(), &[DecodeEntry::new(0x41, 0, 0)]);
    }

    #[test]
    fn test_raw_table() {
        let table = DecodeTable::raw(8).unwrap();
        assert_eq!(table.size(), 256);
        assert!(table.fast_mode());
        assert_eq!(*table.decode(0x7F), DecodeEntry::new(0x7F, 8, 0));
        assert!(DecodeTable::raw(0).is_err());
        assert!(DecodeTable::raw(9).is_err());
    }

    #[test]
    fn test_to_bytes_is_idempotent() {
        let counts: [i16; 3] = [20, 11, 1];
        let a = DecodeTable::build(&counts, 2, 5).unwrap();
        let b = DecodeTable::build(&counts, 2, 5).unwrap();
        let bytes = a.to_bytes();
        assert_eq!(bytes, b.to_bytes());
        assert_eq!(bytes.len(), DTABLE_HEADER_SIZE + 32 * DTABLE_CELL_SIZE);
        assert_eq!(&bytes[..4], &[5, 0, 0, 0]);
    }
}
