//! FSE stream decoder.
//!
//! Two states decode alternately from one backward bitstream, mirroring the
//! two interleaved encoder states.

use super::table::DecodeTable;
use crate::bitstream::{BitReader, ReloadStatus, CONTAINER_BITS};
use fsekit_core::{Error, Result};
use tracing::debug;

/// Decoder state bound to a [`DecodeTable`].
#[derive(Debug, Clone, Copy)]
pub struct FseDState<'t> {
    state: usize,
    table: &'t DecodeTable,
}

impl<'t> FseDState<'t> {
    /// Read the initial state from the stream.
    ///
    /// Reads `table_log` bits, then refills the reader once.
    #[inline]
    pub fn new(reader: &mut BitReader<'_>, table: &'t DecodeTable) -> Self {
        let state = reader.read_bits(table.table_log()) as usize;
        reader.reload();
        Self { state, table }
    }

    /// Decode the current symbol and read the bits for the next state.
    #[inline]
    pub fn decode_symbol(&mut self, reader: &mut BitReader<'_>) -> u8 {
        let entry = *self.table.decode(self.state);
        let low_bits = reader.read_bits(u32::from(entry.nb_bits)) as usize;
        self.state = usize::from(entry.new_state) + low_bits;
        entry.symbol
    }

    /// Same as [`decode_symbol`](Self::decode_symbol), for tables in fast
    /// mode where every cell reads at least one bit.
    #[inline]
    pub fn decode_symbol_fast(&mut self, reader: &mut BitReader<'_>) -> u8 {
        let entry = *self.table.decode(self.state);
        let low_bits = reader.read_bits_fast(u32::from(entry.nb_bits)) as usize;
        self.state = usize::from(entry.new_state) + low_bits;
        entry.symbol
    }

    /// Symbol the next decode will produce, without reading bits.
    #[inline]
    pub fn peek_symbol(&self) -> u8 {
        self.table.decode(self.state).symbol
    }

    /// Current state.
    #[inline]
    pub fn state(&self) -> usize {
        self.state
    }

    /// True when the state has returned to 0.
    #[inline]
    pub fn is_at_end(&self) -> bool {
        self.state == 0
    }
}

/// Decode the bitstream `src` into `dst` with `table`.
///
/// Returns the number of symbols written. Fails with
/// [`Error::DstSizeTooSmall`] if `dst` fills up before the stream ends and
/// with [`Error::CorruptionDetected`] if the stream cannot even hold the two
/// initial states.
pub fn decompress_using_dtable(dst: &mut [u8], src: &[u8], table: &DecodeTable) -> Result<usize> {
    if table.fast_mode() {
        decompress_generic::<true>(dst, src, table)
    } else {
        decompress_generic::<false>(dst, src, table)
    }
}

fn decompress_generic<const FAST: bool>(
    dst: &mut [u8],
    src: &[u8],
    table: &DecodeTable,
) -> Result<usize> {
    let mut reader = BitReader::new(src)?;
    let mut state1 = FseDState::new(&mut reader, table);
    let mut state2 = FseDState::new(&mut reader, table);

    if reader.reload() == ReloadStatus::Overflow {
        debug!(src_len = src.len(), "FSE stream too short for its initial states");
        return Err(Error::CorruptionDetected);
    }

    let omax = dst.len();
    let olimit = omax.saturating_sub(3);
    let mid_reload = table.table_log() * 4 + 7 > CONTAINER_BITS;
    let mut op = 0usize;

    // Four symbols per refill while the register is full.
    loop {
        let status = reader.reload();
        if status != ReloadStatus::Unfinished || op >= olimit {
            break;
        }
        dst[op] = decode::<FAST>(&mut state1, &mut reader);
        dst[op + 1] = decode::<FAST>(&mut state2, &mut reader);
        if mid_reload && reader.reload() > ReloadStatus::Unfinished {
            op += 2;
            break;
        }
        dst[op + 2] = decode::<FAST>(&mut state1, &mut reader);
        dst[op + 3] = decode::<FAST>(&mut state2, &mut reader);
        op += 4;
    }

    // Tail: alternate states until the reader runs past the stream start.
    loop {
        if op + 2 > omax {
            return Err(Error::DstSizeTooSmall);
        }
        dst[op] = decode::<FAST>(&mut state1, &mut reader);
        op += 1;
        if reader.reload() == ReloadStatus::Overflow {
            dst[op] = decode::<FAST>(&mut state2, &mut reader);
            op += 1;
            break;
        }

        if op + 2 > omax {
            return Err(Error::DstSizeTooSmall);
        }
        dst[op] = decode::<FAST>(&mut state2, &mut reader);
        op += 1;
        if reader.reload() == ReloadStatus::Overflow {
            dst[op] = decode::<FAST>(&mut state1, &mut reader);
            op += 1;
            break;
        }
    }

    Ok(op)
}

#[inline(always)]
fn decode<const FAST: bool>(state: &mut FseDState<'_>, reader: &mut BitReader<'_>) -> u8 {
    if FAST {
        state.decode_symbol_fast(reader)
    } else {
        state.decode_symbol(reader)
    }
}
