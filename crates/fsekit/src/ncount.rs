//! NCount header codec.
//!
//! Serializes a normalized distribution compactly, so a decoder can rebuild
//! the same FSE table. The header is a little-endian bitstream:
//!
//! 1. 4 bits: `table_log - 5`.
//! 2. One variable-width field per symbol in order. The field holds the count
//!    plus one (so `-1` becomes 0); its width shrinks as the remaining
//!    probability mass shrinks, and values below a threshold use one bit
//!    less.
//! 3. After a zero count, runs of further zero counts are written as 2-bit
//!    repeat codes: `0b11` means "three more zeros, keep going", anything
//!    else ends the run. Sixteen bits of `0xFFFF` stand for 24 zeros.
//!
//! The header ends once the counts have filled the whole table.

use crate::bitstream::highbit32;
use crate::fse::{FSE_MAX_TABLELOG, FSE_MIN_TABLELOG, FSE_NCOUNT_BOUND};
use fsekit_core::{Error, Result};
use tracing::debug;

/// Result of [`read_ncount`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NCount {
    /// Largest symbol with an entry in the header.
    pub max_symbol_value: u32,
    /// Table log of the distribution.
    pub table_log: u32,
    /// Bytes consumed from the input.
    pub header_size: usize,
}

/// Worst-case header size for an alphabet of `max_symbol_value + 1`.
pub fn ncount_write_bound(max_symbol_value: u32, table_log: u32) -> usize {
    if max_symbol_value == 0 {
        return FSE_NCOUNT_BOUND;
    }
    (((max_symbol_value as usize + 1) * table_log as usize + 4 + 2) / 8) + 1 + 2
}

/// Write the header for `counts` into `dst`.
///
/// # Arguments
/// * `dst` - Output buffer
/// * `counts` - Normalized counts, at least `max_symbol_value + 1` long
/// * `max_symbol_value` - Largest symbol to describe
/// * `table_log` - Table log the counts are normalized to
///
/// # Returns
/// Bytes written. Fails with [`Error::DstSizeTooSmall`] if `dst` cannot hold
/// the header, and with [`Error::GenericError`] if the counts do not fill the
/// table exactly.
pub fn write_ncount(
    dst: &mut [u8],
    counts: &[i16],
    max_symbol_value: u32,
    table_log: u32,
) -> Result<usize> {
    if table_log > FSE_MAX_TABLELOG {
        return Err(Error::TableLogTooLarge);
    }
    if table_log < FSE_MIN_TABLELOG {
        return Err(Error::GenericError);
    }
    if counts.len() <= max_symbol_value as usize {
        return Err(Error::MaxSymbolValueTooLarge);
    }
    write_ncount_generic(dst, &counts[..=max_symbol_value as usize], table_log)
}

fn write_ncount_generic(dst: &mut [u8], counts: &[i16], table_log: u32) -> Result<usize> {
    let alphabet_size = counts.len();
    let table_size: i32 = 1 << table_log;
    let mut out = 0usize;

    let mut bit_stream: u32 = table_log - FSE_MIN_TABLELOG;
    let mut bit_count: u32 = 4;
    // +1 for the extra accuracy
    let mut remaining: i32 = table_size + 1;
    let mut threshold: i32 = table_size;
    let mut nb_bits: u32 = table_log + 1;
    let mut symbol = 0usize;
    let mut previous_is0 = false;

    while symbol < alphabet_size && remaining > 1 {
        if previous_is0 {
            let mut start = symbol;
            while symbol < alphabet_size && counts[symbol] == 0 {
                symbol += 1;
            }
            if symbol == alphabet_size {
                // Trailing zeros are implied; the distribution is incomplete.
                break;
            }
            while symbol >= start + 24 {
                start += 24;
                bit_stream |= 0xFFFF << bit_count;
                put_u16(dst, &mut out, bit_stream)?;
                bit_stream >>= 16;
            }
            while symbol >= start + 3 {
                start += 3;
                bit_stream |= 3 << bit_count;
                bit_count += 2;
            }
            bit_stream |= ((symbol - start) as u32) << bit_count;
            bit_count += 2;
            if bit_count > 16 {
                put_u16(dst, &mut out, bit_stream)?;
                bit_stream >>= 16;
                bit_count -= 16;
            }
        }

        let mut count = i32::from(counts[symbol]);
        symbol += 1;
        let max = (2 * threshold - 1) - remaining;
        remaining -= count.abs();
        // +1 for the extra accuracy
        count += 1;
        if count >= threshold {
            // [0..max[ [max..threshold[ (...) [threshold+max 2*threshold[
            count += max;
        }
        bit_stream |= (count as u32) << bit_count;
        bit_count += nb_bits;
        if count < max {
            bit_count -= 1;
        }
        previous_is0 = count == 1;
        if remaining < 1 {
            return Err(Error::GenericError);
        }
        while remaining < threshold {
            nb_bits -= 1;
            threshold >>= 1;
        }

        if bit_count > 16 {
            put_u16(dst, &mut out, bit_stream)?;
            bit_stream >>= 16;
            bit_count -= 16;
        }
    }

    if remaining != 1 {
        // Incorrect normalized distribution
        return Err(Error::GenericError);
    }

    // Final flush
    put_u16(dst, &mut out, bit_stream)?;
    out -= 2;
    out += ((bit_count + 7) / 8) as usize;

    Ok(out)
}

#[inline]
fn put_u16(dst: &mut [u8], out: &mut usize, value: u32) -> Result<()> {
    let slot = dst.get_mut(*out..*out + 2).ok_or(Error::DstSizeTooSmall)?;
    slot.copy_from_slice(&(value as u16).to_le_bytes());
    *out += 2;
    Ok(())
}

/// Read a header from `src` into `counts`.
///
/// `counts.len() - 1` is the largest symbol the caller accepts. Entries past
/// the returned `max_symbol_value` are zeroed.
///
/// Inputs shorter than 8 bytes are decoded from a zero-padded copy; a header
/// that would need bytes past the real input is rejected as corrupted.
pub fn read_ncount(counts: &mut [i16], src: &[u8]) -> Result<NCount> {
    if counts.is_empty() {
        return Err(Error::MaxSymbolValueTooSmall);
    }
    if src.len() < 8 {
        let mut buffer = [0u8; 8];
        buffer[..src.len()].copy_from_slice(src);
        let ncount = read_ncount_body(counts, &buffer)?;
        if ncount.header_size > src.len() {
            debug!(
                header_size = ncount.header_size,
                src_len = src.len(),
                "NCount header runs past the input"
            );
            return Err(Error::CorruptionDetected);
        }
        return Ok(ncount);
    }
    read_ncount_body(counts, src)
}

/// Little-endian 32-bit load; bytes past the end read as zero.
#[inline]
fn read_le32(src: &[u8], pos: usize) -> u32 {
    let mut word = [0u8; 4];
    if let Some(bytes) = src.get(pos..) {
        let n = bytes.len().min(4);
        word[..n].copy_from_slice(&bytes[..n]);
    }
    u32::from_le_bytes(word)
}

fn read_ncount_body(counts: &mut [i16], src: &[u8]) -> Result<NCount> {
    debug_assert!(src.len() >= 8);
    let iend = src.len() as i64;
    let max_sv1 = counts.len();
    counts.fill(0);

    let mut ip: i64 = 0;
    let mut bit_stream = read_le32(src, 0);
    let mut nb_bits = (bit_stream & 0xF) as i32 + FSE_MIN_TABLELOG as i32;
    if nb_bits > FSE_MAX_TABLELOG as i32 {
        return Err(Error::TableLogTooLarge);
    }
    bit_stream >>= 4;
    let mut bit_count: i32 = 4;
    let table_log = nb_bits as u32;
    let mut remaining: i32 = (1 << nb_bits) + 1;
    let mut threshold: i32 = 1 << nb_bits;
    nb_bits += 1;

    let mut charnum = 0usize;
    let mut previous0 = false;

    loop {
        if previous0 {
            // Count the 2-bit repeat codes by looking for the first 0b00 pair
            let mut repeats = ((!bit_stream) | 0x8000_0000).trailing_zeros() >> 1;
            while repeats >= 12 {
                charnum += 3 * 12;
                if ip <= iend - 7 {
                    ip += 3;
                } else {
                    bit_count -= (8 * (iend - 7 - ip)) as i32;
                    bit_count &= 31;
                    ip = iend - 4;
                }
                bit_stream = read_le32(src, ip as usize) >> bit_count;
                repeats = ((!bit_stream) | 0x8000_0000).trailing_zeros() >> 1;
            }
            charnum += 3 * repeats as usize;
            bit_stream >>= 2 * repeats;
            bit_count += 2 * repeats as i32;

            // Final repeat code, 0..=2 more zeros
            charnum += (bit_stream & 3) as usize;
            bit_count += 2;

            // Zeros past the caller's alphabet are an error below.
            if charnum >= max_sv1 {
                break;
            }

            advance(&mut ip, &mut bit_count, iend);
            bit_stream = read_le32(src, ip as usize) >> bit_count;
        }

        let max = (2 * threshold - 1) - remaining;
        let mut count: i32;
        if ((bit_stream & (threshold - 1) as u32) as i32) < max {
            count = (bit_stream & (threshold - 1) as u32) as i32;
            bit_count += nb_bits - 1;
        } else {
            count = (bit_stream & (2 * threshold - 1) as u32) as i32;
            if count >= threshold {
                count -= max;
            }
            bit_count += nb_bits;
        }

        // -1 means low probability
        count -= 1;
        if count >= 0 {
            remaining -= count;
        } else {
            remaining += count;
        }
        counts[charnum] = count as i16;
        charnum += 1;
        previous0 = count == 0;

        if remaining < threshold {
            // Once remaining drops to 1 or less the table is complete (or
            // overdrawn, which the check below reports).
            if remaining <= 1 {
                break;
            }
            nb_bits = highbit32(remaining as u32) as i32 + 1;
            threshold = 1 << (nb_bits - 1);
        }
        if charnum >= max_sv1 {
            break;
        }

        advance(&mut ip, &mut bit_count, iend);
        bit_stream = read_le32(src, ip as usize) >> bit_count;
    }

    // Stopped at the caller's alphabet bound with probability mass left over.
    if remaining > 1 && charnum >= max_sv1 {
        debug!(remaining, max_sv1, "NCount header describes more symbols than allowed");
        return Err(Error::MaxSymbolValueTooSmall);
    }
    if remaining != 1 {
        debug!(remaining, "NCount header does not fill the table");
        return Err(Error::CorruptionDetected);
    }
    // Only possible when the last run of zeros overshoots the alphabet
    if charnum > max_sv1 {
        return Err(Error::MaxSymbolValueTooSmall);
    }
    if bit_count > 32 {
        return Err(Error::CorruptionDetected);
    }

    ip += i64::from((bit_count + 7) >> 3);
    Ok(NCount {
        max_symbol_value: (charnum - 1) as u32,
        table_log,
        header_size: ip as usize,
    })
}

/// Move the read position forward by the whole bytes consumed, clamping so a
/// 4-byte load at the new position stays inside the input.
#[inline(always)]
fn advance(ip: &mut i64, bit_count: &mut i32, iend: i64) {
    if *ip <= iend - 7 || *ip + i64::from(*bit_count >> 3) <= iend - 4 {
        *ip += i64::from(*bit_count >> 3);
        *bit_count &= 7;
    } else {
        *bit_count -= (8 * (iend - 4 - *ip)) as i32;
        *bit_count &= 31;
        *ip = iend - 4;
    }
}
