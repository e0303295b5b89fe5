//! Forward-building bitstream writer.

use super::{BitContainer, CONTAINER_BITS, CONTAINER_BYTES};
use fsekit_core::{Error, Result};

/// Bitstream writer over a caller-provided buffer.
///
/// Fields are packed into a 64-bit register and flushed to the buffer in
/// whole bytes. The stream is meant to be read back with
/// [`BitReader`](super::BitReader), which returns fields in reverse order.
///
/// Overflowing the buffer through [`flush_bits`](Self::flush_bits) is not an
/// error at the time it happens: the cursor is clamped and the overflow is
/// only reported when [`close`](Self::close) returns 0.
#[derive(Debug)]
pub struct BitWriter<'a> {
    /// Output buffer.
    dst: &'a mut [u8],
    /// Pending bits, lowest bit first.
    container: BitContainer,
    /// Number of pending bits in `container`.
    bit_pos: u32,
    /// Next byte to write.
    pos: usize,
    /// Last position where a full register can still be stored.
    limit: usize,
}

impl<'a> BitWriter<'a> {
    /// Create a writer over `dst`.
    ///
    /// Fails with [`Error::DstSizeTooSmall`] unless `dst` is strictly larger
    /// than one register.
    pub fn new(dst: &'a mut [u8]) -> Result<Self> {
        if dst.len() <= CONTAINER_BYTES {
            return Err(Error::DstSizeTooSmall);
        }
        let limit = dst.len() - CONTAINER_BYTES;
        Ok(Self {
            dst,
            container: 0,
            bit_pos: 0,
            pos: 0,
            limit,
        })
    }

    /// Append the low `nb_bits` of `value`.
    ///
    /// `nb_bits` must be at most 31 and the register must have room for the
    /// field; both are only checked in debug builds.
    #[inline]
    pub fn add_bits(&mut self, value: u64, nb_bits: u32) {
        debug_assert!(nb_bits < 32);
        debug_assert!(nb_bits + self.bit_pos < CONTAINER_BITS);
        let mask = (1u64 << nb_bits) - 1;
        self.container |= (value & mask) << self.bit_pos;
        self.bit_pos += nb_bits;
    }

    /// Append `value`, which must already fit in `nb_bits`.
    #[inline]
    pub fn add_bits_fast(&mut self, value: u64, nb_bits: u32) {
        debug_assert!(value >> nb_bits == 0);
        debug_assert!(nb_bits + self.bit_pos < CONTAINER_BITS);
        self.container |= value << self.bit_pos;
        self.bit_pos += nb_bits;
    }

    /// Store the register and advance past the complete bytes.
    ///
    /// The cursor is clamped to the last position where a full register
    /// fits, so writing past the end silently loses data until
    /// [`close`](Self::close) reports it.
    #[inline]
    pub fn flush_bits(&mut self) {
        let nb_bytes = (self.bit_pos >> 3) as usize;
        self.store();
        self.pos += nb_bytes;
        if self.pos > self.limit {
            self.pos = self.limit;
        }
        self.bit_pos &= 7;
        self.container >>= nb_bytes * 8;
    }

    /// Store the register and advance without clamping.
    ///
    /// The caller guarantees the buffer is large enough for everything that
    /// will be written, e.g. by sizing it with
    /// [`block_bound`](crate::block_bound).
    #[inline]
    pub fn flush_bits_fast(&mut self) {
        let nb_bytes = (self.bit_pos >> 3) as usize;
        debug_assert!(self.pos <= self.limit);
        self.store();
        self.pos += nb_bytes;
        self.bit_pos &= 7;
        self.container >>= nb_bytes * 8;
    }

    /// Append the terminator bit and flush.
    ///
    /// Returns the total number of bytes written, or 0 if the stream did not
    /// fit in the buffer.
    pub fn close(&mut self) -> usize {
        self.add_bits_fast(1, 1);
        self.flush_bits();
        if self.pos >= self.limit {
            return 0;
        }
        self.pos + usize::from(self.bit_pos > 0)
    }

    /// Bytes flushed so far, not counting pending bits.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of pending bits in the register.
    #[inline]
    pub fn pending_bits(&self) -> u32 {
        self.bit_pos
    }

    #[inline(always)]
    fn store(&mut self) {
        self.dst[self.pos..self.pos + CONTAINER_BYTES]
            .copy_from_slice(&self.container.to_le_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_equal_to_register_is_rejected() {
        let mut buf = [0u8; CONTAINER_BYTES];
        assert_eq!(BitWriter::new(&mut buf).unwrap_err(), Error::DstSizeTooSmall);

        let mut empty: [u8; 0] = [];
        assert_eq!(BitWriter::new(&mut empty).unwrap_err(), Error::DstSizeTooSmall);
    }

    #[test]
    fn test_minimum_capacity_accepted() {
        let mut buf = [0u8; CONTAINER_BYTES + 1];
        assert!(BitWriter::new(&mut buf).is_ok());
    }

    #[test]
    fn test_close_empty_stream_is_terminator_only() {
        let mut buf = [0u8; 16];
        let mut writer = BitWriter::new(&mut buf).unwrap();
        assert_eq!(writer.close(), 1);
        assert_eq!(buf[0], 0x01);
    }

    #[test]
    fn test_little_endian_layout() {
        let mut buf = [0u8; 16];
        let mut writer = BitWriter::new(&mut buf).unwrap();
        writer.add_bits(0b101, 3);
        writer.add_bits(0xAB, 8);
        writer.flush_bits();
        assert_eq!(writer.position(), 1);
        assert_eq!(writer.pending_bits(), 3);
        let size = writer.close();
        assert_eq!(size, 2);
        // 0b101 | 0xAB << 3 | 1 << 11
        let expected: u16 = 0b101 | (0xAB << 3) | (1 << 11);
        assert_eq!(buf[0], expected as u8);
        assert_eq!(buf[1], (expected >> 8) as u8);
    }

    #[test]
    fn test_add_bits_masks_value() {
        let mut buf = [0u8; 16];
        let mut writer = BitWriter::new(&mut buf).unwrap();
        writer.add_bits(0xFF, 4);
        writer.close();
        assert_eq!(buf[0], 0x1F);
    }

    #[test]
    fn test_overflow_reported_by_close() {
        let mut buf = [0u8; 10];
        let mut writer = BitWriter::new(&mut buf).unwrap();
        for _ in 0..10 {
            writer.add_bits(0x7FFF_FFFF, 31);
            writer.flush_bits();
        }
        assert_eq!(writer.position(), 2);
        assert_eq!(writer.close(), 0);
    }

    #[test]
    fn test_fast_flush_matches_safe_flush() {
        let mut a = [0u8; 64];
        let mut b = [0u8; 64];
        let size_a = {
            let mut writer = BitWriter::new(&mut a).unwrap();
            for i in 0..20u64 {
                writer.add_bits(i * 7, 9);
                writer.flush_bits();
            }
            writer.close()
        };
        let size_b = {
            let mut writer = BitWriter::new(&mut b).unwrap();
            for i in 0..20u64 {
                writer.add_bits_fast((i * 7) & 0x1FF, 9);
                writer.flush_bits_fast();
            }
            writer.close()
        };
        assert_eq!(size_a, size_b);
        assert_eq!(a[..size_a], b[..size_b]);
    }
}
