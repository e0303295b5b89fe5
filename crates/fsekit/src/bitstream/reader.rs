//! Backward-reading bitstream reader.

use super::{highbit32, BitContainer, CONTAINER_BITS, CONTAINER_BYTES};
use fsekit_core::{Error, Result};

/// Outcome of a reader refill.
///
/// Variants are ordered by how far the reader has progressed, so callers can
/// test `status > ReloadStatus::Unfinished` to mean "stop the fast loop".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReloadStatus {
    /// More than one register of input remains; the register is full.
    Unfinished,
    /// The start of the buffer has been reached; the register may be partial.
    EndOfBuffer,
    /// Every bit has been consumed exactly.
    Completed,
    /// More bits were consumed than the stream holds.
    Overflow,
}

/// Reader over a stream produced by [`BitWriter`](super::BitWriter).
///
/// Reads start from the last field written and walk toward the start of the
/// buffer. The register holds the 8 bytes starting at `ptr`; bits are
/// consumed from its top end.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    src: &'a [u8],
    container: BitContainer,
    bits_consumed: u32,
    ptr: usize,
}

impl<'a> BitReader<'a> {
    /// Initialize a reader at the end of `src`.
    ///
    /// The terminator bit in the final byte is located and skipped. Fails
    /// with [`Error::SrcSizeWrong`] on an empty stream and
    /// [`Error::CorruptionDetected`] when the final byte is zero.
    pub fn new(src: &'a [u8]) -> Result<Self> {
        let last = match src.last() {
            Some(&b) => b,
            None => return Err(Error::SrcSizeWrong),
        };
        if last == 0 {
            return Err(Error::CorruptionDetected);
        }
        let terminator_skip = 8 - highbit32(u32::from(last));

        if src.len() >= CONTAINER_BYTES {
            let ptr = src.len() - CONTAINER_BYTES;
            Ok(Self {
                src,
                container: read_le64(src, ptr),
                bits_consumed: terminator_skip,
                ptr,
            })
        } else {
            let mut container: BitContainer = 0;
            for (i, &b) in src.iter().enumerate() {
                container |= BitContainer::from(b) << (8 * i);
            }
            let missing = (CONTAINER_BYTES - src.len()) as u32;
            Ok(Self {
                src,
                container,
                bits_consumed: terminator_skip + missing * 8,
                ptr: 0,
            })
        }
    }

    /// Peek at the next `nb_bits` without consuming them. Accepts 0.
    #[inline]
    pub fn look_bits(&self, nb_bits: u32) -> u64 {
        let start = CONTAINER_BITS
            .wrapping_sub(self.bits_consumed)
            .wrapping_sub(nb_bits)
            & (CONTAINER_BITS - 1);
        let mask = if nb_bits >= CONTAINER_BITS {
            u64::MAX
        } else {
            (1u64 << nb_bits) - 1
        };
        (self.container >> start) & mask
    }

    /// Peek at the next `nb_bits`, which must be at least 1.
    #[inline]
    pub fn look_bits_fast(&self, nb_bits: u32) -> u64 {
        debug_assert!(nb_bits >= 1);
        let mask = CONTAINER_BITS - 1;
        (self.container << (self.bits_consumed & mask)) >> ((CONTAINER_BITS - nb_bits) & mask)
    }

    /// Consume `nb_bits` without returning them.
    #[inline]
    pub fn skip_bits(&mut self, nb_bits: u32) {
        self.bits_consumed = self.bits_consumed.wrapping_add(nb_bits);
    }

    /// Consume and return the next `nb_bits`.
    #[inline]
    pub fn read_bits(&mut self, nb_bits: u32) -> u64 {
        let value = self.look_bits(nb_bits);
        self.skip_bits(nb_bits);
        value
    }

    /// Consume and return the next `nb_bits`, which must be at least 1.
    #[inline]
    pub fn read_bits_fast(&mut self, nb_bits: u32) -> u64 {
        let value = self.look_bits_fast(nb_bits);
        self.skip_bits(nb_bits);
        value
    }

    /// Refill the register from the buffer.
    ///
    /// After `Unfinished` at least 57 bits are readable. Near the start of
    /// the buffer the cursor is clamped, the register holds fewer fresh
    /// bits, and the status becomes `EndOfBuffer` (or `Completed` once every
    /// bit has been consumed).
    #[inline]
    pub fn reload(&mut self) -> ReloadStatus {
        if self.bits_consumed > CONTAINER_BITS {
            return ReloadStatus::Overflow;
        }
        if self.ptr >= CONTAINER_BYTES {
            return self.reload_internal();
        }
        if self.ptr == 0 {
            if self.bits_consumed < CONTAINER_BITS {
                return ReloadStatus::EndOfBuffer;
            }
            return ReloadStatus::Completed;
        }

        let mut nb_bytes = (self.bits_consumed >> 3) as usize;
        let mut status = ReloadStatus::Unfinished;
        if nb_bytes > self.ptr {
            nb_bytes = self.ptr;
            status = ReloadStatus::EndOfBuffer;
        }
        self.ptr -= nb_bytes;
        self.bits_consumed -= (nb_bytes * 8) as u32;
        self.container = read_le64(self.src, self.ptr);
        status
    }

    /// Refill assuming at least one full register of input remains before
    /// the cursor. Returns `Overflow` instead of refilling otherwise.
    #[inline]
    pub fn reload_fast(&mut self) -> ReloadStatus {
        if self.ptr < CONTAINER_BYTES || self.bits_consumed > CONTAINER_BITS {
            return ReloadStatus::Overflow;
        }
        self.reload_internal()
    }

    /// True once the cursor is at the start and every bit has been consumed.
    #[inline]
    pub fn is_at_end(&self) -> bool {
        self.ptr == 0 && self.bits_consumed == CONTAINER_BITS
    }

    /// Bits consumed from the current register.
    #[inline]
    pub fn bits_consumed(&self) -> u32 {
        self.bits_consumed
    }

    #[inline(always)]
    fn reload_internal(&mut self) -> ReloadStatus {
        self.ptr -= (self.bits_consumed >> 3) as usize;
        self.bits_consumed &= 7;
        self.container = read_le64(self.src, self.ptr);
        ReloadStatus::Unfinished
    }
}

#[inline(always)]
fn read_le64(src: &[u8], pos: usize) -> u64 {
    let mut word = [0u8; CONTAINER_BYTES];
    word.copy_from_slice(&src[pos..pos + CONTAINER_BYTES]);
    u64::from_le_bytes(word)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitstream::BitWriter;

    #[test]
    fn test_empty_stream_rejected() {
        assert_eq!(BitReader::new(&[]).unwrap_err(), Error::SrcSizeWrong);
    }

    #[test]
    fn test_zero_last_byte_is_corruption() {
        assert_eq!(
            BitReader::new(&[0x12, 0x00]).unwrap_err(),
            Error::CorruptionDetected
        );
        let long = [0xFFu8, 1, 2, 3, 4, 5, 6, 7, 8, 0];
        assert_eq!(
            BitReader::new(&long).unwrap_err(),
            Error::CorruptionDetected
        );
    }

    #[test]
    fn test_terminator_only_stream_is_at_end() {
        let reader = BitReader::new(&[0x01]).unwrap();
        assert_eq!(reader.bits_consumed(), CONTAINER_BITS);
        assert!(reader.is_at_end());
    }

    #[test]
    fn test_short_stream_reads_back() {
        let mut buf = [0u8; 16];
        let mut writer = BitWriter::new(&mut buf).unwrap();
        writer.add_bits(0x3, 2);
        writer.add_bits(0x1AB, 9);
        writer.flush_bits();
        let size = writer.close();
        assert_eq!(size, 2);

        let mut reader = BitReader::new(&buf[..size]).unwrap();
        assert_eq!(reader.look_bits(9), 0x1AB);
        assert_eq!(reader.read_bits_fast(9), 0x1AB);
        assert_eq!(reader.reload(), ReloadStatus::EndOfBuffer);
        assert_eq!(reader.read_bits(2), 0x3);
        assert_eq!(reader.reload(), ReloadStatus::Completed);
        assert!(reader.is_at_end());
    }

    #[test]
    fn test_read_zero_bits() {
        let reader = BitReader::new(&[0xFF]).unwrap();
        assert_eq!(reader.look_bits(0), 0);
    }

    #[test]
    fn test_overflow_after_reading_past_start() {
        let mut reader = BitReader::new(&[0x05]).unwrap();
        assert_eq!(reader.read_bits(2), 0x1);
        assert_eq!(reader.reload(), ReloadStatus::Completed);
        reader.read_bits(3);
        assert_eq!(reader.reload(), ReloadStatus::Overflow);
        assert!(!reader.is_at_end());
    }

    #[test]
    fn test_reload_fast_near_start_reports_overflow() {
        let mut reader = BitReader::new(&[0xAA, 0x01]).unwrap();
        assert_eq!(reader.reload_fast(), ReloadStatus::Overflow);
    }

    fn boundary_stream(len: usize) -> Vec<u8> {
        let mut data: Vec<u8> = (1..=len as u8).collect();
        data[len - 1] = 0x80;
        data
    }

    #[test]
    fn test_reload_fast_with_full_register_before_cursor() {
        // 16 bytes leave the cursor exactly one register from the start.
        let data = boundary_stream(16);
        let mut reader = BitReader::new(&data).unwrap();
        reader.read_bits(16);
        assert_eq!(reader.reload_fast(), ReloadStatus::Unfinished);
        assert!(reader.bits_consumed() < 8);
    }

    #[test]
    fn test_reload_fast_one_byte_short_of_register() {
        let data = boundary_stream(15);
        let mut reader = BitReader::new(&data).unwrap();
        reader.read_bits(16);
        assert_eq!(reader.reload_fast(), ReloadStatus::Overflow);
        // The fast path leaves the reader untouched for the checked refill.
        assert_eq!(reader.bits_consumed(), 17);
        assert_eq!(reader.reload(), ReloadStatus::Unfinished);
        assert_eq!(reader.bits_consumed(), 1);
    }

    #[test]
    fn test_reload_matches_reload_fast_at_boundary() {
        let data = boundary_stream(16);
        let mut fast = BitReader::new(&data).unwrap();
        let mut slow = BitReader::new(&data).unwrap();
        fast.read_bits(23);
        slow.read_bits(23);
        assert_eq!(fast.reload_fast(), ReloadStatus::Unfinished);
        assert_eq!(slow.reload(), ReloadStatus::Unfinished);
        assert_eq!(fast.bits_consumed(), slow.bits_consumed());
        assert_eq!(fast.look_bits(40), slow.look_bits(40));
    }

    #[test]
    fn test_long_stream_status_progression() {
        let mut buf = vec![0u8; 64];
        let mut writer = BitWriter::new(&mut buf).unwrap();
        for i in 0..24u64 {
            writer.add_bits(i, 8);
            writer.flush_bits();
        }
        let size = writer.close();
        assert_eq!(size, 25);

        let mut reader = BitReader::new(&buf[..size]).unwrap();
        let mut statuses = Vec::new();
        for i in (0..24u64).rev() {
            assert_eq!(reader.read_bits(8), i);
            statuses.push(reader.reload());
        }
        assert_eq!(statuses.first(), Some(&ReloadStatus::Unfinished));
        assert_eq!(statuses.last(), Some(&ReloadStatus::Completed));
        assert!(statuses.windows(2).all(|w| w[0] <= w[1]));
        assert!(reader.is_at_end());
    }

    #[test]
    fn test_look_bits_fast_matches_look_bits() {
        let data = [0x5Au8, 0xC3, 0x99, 0x17, 0x42, 0xE8, 0x0F, 0x71, 0x2D, 0x81];
        let reader = BitReader::new(&data).unwrap();
        for nb in 1..=24 {
            assert_eq!(reader.look_bits(nb), reader.look_bits_fast(nb));
        }
    }
}
