//! FSE encoding tables and the encoder state machine.
//!
//! The encoder walks the input backward so the decoder, which reads the
//! bitstream backward, produces symbols in forward order. Each symbol moves
//! the state through a per-symbol transform:
//!
//! ```text
//! nb_out = (value + delta_nb_bits) >> 16
//! emit low nb_out bits of value
//! value  = state_table[(value >> nb_out) + delta_find_state]
//! ```

use super::table::validate_distribution;
use super::{block_bound, spread_step, FSE_MAX_SYMBOL_VALUE, FSE_MAX_TABLELOG};
use crate::bitstream::{highbit32, BitWriter, CONTAINER_BITS, CONTAINER_BYTES};
use fsekit_core::{Error, Result};
use tracing::trace;

const ALPHABET_SIZE: usize = FSE_MAX_SYMBOL_VALUE as usize + 1;

/// Number of `u16` scratch cells [`EncodeTable::build_with_workspace`] needs.
#[inline]
pub const fn ctable_workspace_len(max_symbol_value: u32, table_log: u32) -> usize {
    max_symbol_value as usize + 2 + 2 * (1usize << table_log)
}

/// Per-symbol transform applied by the encoder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SymbolTransform {
    /// Offset into the state table for this symbol's states.
    pub delta_find_state: i32,
    /// Bias added to the state so the top 16 bits give the output bit count.
    pub delta_nb_bits: u32,
}

impl SymbolTransform {
    /// Transform for a symbol that never occurs. Encoding it yields garbage
    /// but keeps the state inside the table.
    #[inline]
    const fn absent(table_log: u32) -> Self {
        Self {
            delta_find_state: 0,
            delta_nb_bits: ((table_log + 1) << 16) - (1 << table_log),
        }
    }
}

/// FSE encoding table.
///
/// Holds the state table, sorted by symbol, and one [`SymbolTransform`] per
/// byte value. Symbols outside the declared alphabet get the absent
/// transform, so any byte can be fed to the encoder without indexing out of
/// bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeTable {
    table_log: u32,
    max_symbol_value: u32,
    state_table: Vec<u16>,
    symbol_tt: Box<[SymbolTransform; ALPHABET_SIZE]>,
}

impl EncodeTable {
    /// Build an encoding table from a normalized distribution.
    ///
    /// # Arguments
    /// * `counts` - Normalized count per symbol, `-1` for low-probability
    /// * `max_symbol_value` - Largest symbol present in `counts`
    /// * `table_log` - Log2 of the table size
    pub fn build(counts: &[i16], max_symbol_value: u32, table_log: u32) -> Result<Self> {
        let mut wksp = vec![
            0u16;
            ctable_workspace_len(
                max_symbol_value.min(FSE_MAX_SYMBOL_VALUE),
                table_log.min(FSE_MAX_TABLELOG)
            )
        ];
        Self::build_with_workspace(counts, max_symbol_value, table_log, &mut wksp)
    }

    /// Build an encoding table using caller-provided scratch space.
    ///
    /// `wksp` must hold at least [`ctable_workspace_len`] cells.
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
        if wksp.len() < ctable_workspace_len(max_symbol_value, table_log) {
            return Err(Error::WorkSpaceTooSmall);
        }
        let counts = &counts[..max_sv1];
        let table_size = 1usize << table_log;
        let step = spread_step(table_size);
        if table_log == 0 || step & 1 == 0 {
            return Err(Error::GenericError);
        }
        validate_distribution(counts, table_size)?;

        let (cumul, rest) = wksp.split_at_mut(max_sv1 + 1);
        let (table_symbol, spread) = rest.split_at_mut(table_size);
        let spread = &mut spread[..table_size];

        // Symbol start positions; low-probability symbols go to the top.
        let mut high_threshold = table_size - 1;
        cumul[0] = 0;
        for (s, &count) in counts.iter().enumerate() {
            if count == -1 {
                cumul[s + 1] = cumul[s] + 1;
                table_symbol[high_threshold] = s as u16;
                high_threshold = high_threshold.wrapping_sub(1);
            } else {
                cumul[s + 1] = cumul[s] + count as u16;
            }
        }
        cumul[max_sv1] = table_size as u16 + 1;

        let mask = table_size - 1;
        if high_threshold == table_size - 1 {
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
                    table_symbol[(position + u * step) & mask] = symbol;
                }
                position = (position + 2 * step) & mask;
            }
        } else {
            let mut position = 0usize;
            for (s, &count) in counts.iter().enumerate() {
                for _ in 0..count.max(0) {
                    table_symbol[position] = s as u16;
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

        let mut state_table = vec![0u16; table_size];
        for (u, &symbol) in table_symbol[..table_size].iter().enumerate() {
            let slot = &mut cumul[symbol as usize];
            state_table[*slot as usize] = (table_size + u) as u16;
            *slot += 1;
        }

        let mut symbol_tt = Box::new([SymbolTransform::absent(table_log); ALPHABET_SIZE]);
        let mut total: i32 = 0;
        for (s, &count) in counts.iter().enumerate() {
            match count {
                0 => {}
                -1 | 1 => {
                    symbol_tt[s] = SymbolTransform {
                        delta_nb_bits: (table_log << 16) - (1 << table_log),
                        delta_find_state: total - 1,
                    };
                    total += 1;
                }
                _ => {
                    let count = count as u32;
                    let max_bits_out = table_log - highbit32(count - 1);
                    let min_state_plus = count << max_bits_out;
                    symbol_tt[s] = SymbolTransform {
                        delta_nb_bits: (max_bits_out << 16) - min_state_plus,
                        delta_find_state: total - count as i32,
                    };
                    total += count as i32;
                }
            }
        }

        trace!(table_log, max_symbol_value, "built FSE encoding table");

        Ok(Self {
            table_log,
            max_symbol_value,
            state_table,
            symbol_tt,
        })
    }

    /// Table that encodes `symbol` with zero bits.
    pub fn rle(symbol: u8) -> Self {
        let mut symbol_tt = Box::new([SymbolTransform::absent(0); ALPHABET_SIZE]);
        symbol_tt[symbol as usize] = SymbolTransform::default();
        Self {
            table_log: 0,
            max_symbol_value: u32::from(symbol),
            state_table: vec![0, 0],
            symbol_tt,
        }
    }

    /// Table that writes every symbol as a plain `nb_bits`-bit field.
    ///
    /// Fails with [`Error::GenericError`] unless `1 <= nb_bits <= 8`.
    pub fn raw(nb_bits: u32) -> Result<Self> {
        if !(1..=8).contains(&nb_bits) {
            return Err(Error::GenericError);
        }
        let table_size = 1usize << nb_bits;
        let state_table = (0..table_size).map(|s| (table_size + s) as u16).collect();
        let mut symbol_tt = Box::new([SymbolTransform::absent(nb_bits); ALPHABET_SIZE]);
        for (s, tt) in symbol_tt.iter_mut().take(table_size).enumerate() {
            *tt = SymbolTransform {
                delta_nb_bits: (nb_bits << 16) - (1 << nb_bits),
                delta_find_state: s as i32 - 1,
            };
        }
        Ok(Self {
            table_log: nb_bits,
            max_symbol_value: table_size as u32 - 1,
            state_table,
            symbol_tt,
        })
    }

    /// Log2 of the table size.
    #[inline]
    pub fn table_log(&self) -> u32 {
        self.table_log
    }

    /// Largest symbol the table was built for.
    #[inline]
    pub fn max_symbol_value(&self) -> u32 {
        self.max_symbol_value
    }

    /// Encoder states, grouped by symbol.
    #[inline]
    pub fn state_table(&self) -> &[u16] {
        &self.state_table
    }

    /// Transform for `symbol`.
    #[inline]
    pub fn transform(&self, symbol: u8) -> SymbolTransform {
        self.symbol_tt[symbol as usize]
    }

    /// Upper bound on the bits spent encoding `symbol`.
    pub fn max_nb_bits(&self, symbol: u8) -> u32 {
        (self.transform(symbol).delta_nb_bits + ((1 << 16) - 1)) >> 16
    }

    /// Lower bound on the bits spent encoding `symbol`.
    pub fn min_nb_bits(&self, symbol: u8) -> u32 {
        self.transform(symbol).delta_nb_bits >> 16
    }

    /// Approximate cost of `symbol` in fixed point with `accuracy_log`
    /// fractional bits.
    ///
    /// `accuracy_log + table_log` must stay below 31. Not meaningful for
    /// symbols with a zero count.
    pub fn bit_cost(&self, symbol: u8, accuracy_log: u32) -> u32 {
        debug_assert!(accuracy_log + self.table_log < 31);
        let delta_nb_bits = self.transform(symbol).delta_nb_bits;
        let min_nb_bits = delta_nb_bits >> 16;
        let threshold = (min_nb_bits + 1) << 16;
        let table_size = 1u32 << self.table_log;
        let delta_from_threshold = threshold.wrapping_sub(delta_nb_bits + table_size);
        let normalized_delta = (delta_from_threshold << accuracy_log) >> self.table_log;
        let bit_multiplier = 1u32 << accuracy_log;
        ((min_nb_bits + 1) * bit_multiplier).wrapping_sub(normalized_delta)
    }
}

/// Encoder state bound to an [`EncodeTable`].
#[derive(Debug, Clone, Copy)]
pub struct FseCState<'t> {
    value: usize,
    table: &'t EncodeTable,
}

impl<'t> FseCState<'t> {
    /// Initial state before any symbol has been encoded.
    #[inline]
    pub fn new(table: &'t EncodeTable) -> Self {
        Self {
            value: 1usize << table.table_log,
            table,
        }
    }

    /// Initial state that already accounts for `symbol`, saving the bits
    /// the first symbol would otherwise cost.
    #[inline]
    pub fn with_first_symbol(table: &'t EncodeTable, symbol: u8) -> Self {
        let tt = table.transform(symbol);
        let nb_bits_out = (tt.delta_nb_bits + (1 << 15)) >> 16;
        let value = ((nb_bits_out << 16).wrapping_sub(tt.delta_nb_bits)) as usize;
        let index = ((value >> nb_bits_out) as i64 + i64::from(tt.delta_find_state)) as usize;
        Self {
            value: usize::from(table.state_table[index]),
            table,
        }
    }

    /// Emit the bits for `symbol` and move to the next state.
    #[inline]
    pub fn encode_symbol(&mut self, writer: &mut BitWriter<'_>, symbol: u8) {
        let tt = self.table.transform(symbol);
        let nb_bits_out = (self.value as u32 + tt.delta_nb_bits) >> 16;
        writer.add_bits(self.value as u64, nb_bits_out);
        let index = ((self.value >> nb_bits_out) as i64 + i64::from(tt.delta_find_state)) as usize;
        self.value = usize::from(self.table.state_table[index]);
    }

    /// Write the final state so the decoder can start from it.
    #[inline]
    pub fn flush(&self, writer: &mut BitWriter<'_>) {
        writer.add_bits(self.value as u64, self.table.table_log);
        writer.flush_bits();
    }

    /// Current state value.
    #[inline]
    pub fn value(&self) -> usize {
        self.value
    }
}

/// Encode `src` into `dst` with `table`.
///
/// Returns the size of the bitstream, or 0 when `src` has two bytes or
/// fewer or the stream does not fit in `dst`. The unclamped flush is used
/// only when `dst` holds the worst case for this table's log. Every byte of `src` must have
/// a non-zero count in `table`; other symbols produce an undecodable stream.
pub fn compress_using_ctable(dst: &mut [u8], src: &[u8], table: &EncodeTable) -> usize {
    if dst.len() >= stream_bound(src.len(), table.table_log) {
        compress_generic::<true>(dst, src, table)
    } else {
        compress_generic::<false>(dst, src, table)
    }
}

/// Output size that guarantees the unclamped flush never runs past `dst`.
///
/// A symbol costs at most `table_log + 1` bits (the extra bit covers symbols
/// absent from the table), the two final states `table_log` bits each, plus
/// the terminator and one spare register for the last flush.
#[inline]
fn stream_bound(src_len: usize, table_log: u32) -> usize {
    let max_bits = src_len * (table_log as usize + 1) + 2 * table_log as usize + 1;
    let bound = (max_bits + 7) / 8 + CONTAINER_BYTES;
    bound.max(block_bound(src_len))
}

fn compress_generic<const FAST: bool>(dst: &mut [u8], src: &[u8], table: &EncodeTable) -> usize {
    if src.len() <= 2 {
        return 0;
    }
    let mut writer = match BitWriter::new(dst) {
        Ok(writer) => writer,
        Err(_) => return 0,
    };
    let mut ip = src.len();
    let mut state1;
    let mut state2;
    if src.len() & 1 == 1 {
        state1 = FseCState::with_first_symbol(table, src[ip - 1]);
        state2 = FseCState::with_first_symbol(table, src[ip - 2]);
        state1.encode_symbol(&mut writer, src[ip - 3]);
        ip -= 3;
        flush::<FAST>(&mut writer);
    } else {
        state2 = FseCState::with_first_symbol(table, src[ip - 1]);
        state1 = FseCState::with_first_symbol(table, src[ip - 2]);
        ip -= 2;
    }

    // Four symbols fit between flushes when the register has room for them.
    let wide = table.table_log * 4 + 7 < CONTAINER_BITS;
    if wide && (src.len() - 2) & 2 != 0 {
        state2.encode_symbol(&mut writer, src[ip - 1]);
        state1.encode_symbol(&mut writer, src[ip - 2]);
        ip -= 2;
        flush::<FAST>(&mut writer);
    }

    while ip > 0 {
        state2.encode_symbol(&mut writer, src[ip - 1]);
        state1.encode_symbol(&mut writer, src[ip - 2]);
        ip -= 2;
        if wide {
            state2.encode_symbol(&mut writer, src[ip - 1]);
            state1.encode_symbol(&mut writer, src[ip - 2]);
            ip -= 2;
        }
        flush::<FAST>(&mut writer);
    }

    state2.flush(&mut writer);
    state1.flush(&mut writer);
    writer.close()
}

#[inline(always)]
fn flush<const FAST: bool>(writer: &mut BitWriter<'_>) {
    if FAST {
        writer.flush_bits_fast();
    } else {
        writer.flush_bits();
    }
}
