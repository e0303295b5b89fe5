//! LIFO bitstreams.
//!
//! The writer appends bit fields from the low end of a 64-bit register and
//! flushes completed bytes forward. The reader starts at the end of the
//! buffer and walks backward, so the last field written is the first field
//! read. A single set terminator bit marks where the real data ends; its
//! position is recovered from the highest set bit of the final byte.
//!
//! ## Fast and safe entry points
//!
//! Both sides expose a checked and an unchecked variant of their hot
//! operation:
//!
//! | operation | safe                        | fast                                  |
//! |-----------|-----------------------------|---------------------------------------|
//! | add       | [`BitWriter::add_bits`]     | [`BitWriter::add_bits_fast`] (pre-masked value) |
//! | flush     | [`BitWriter::flush_bits`]   | [`BitWriter::flush_bits_fast`] (no clamp) |
//! | look      | [`BitReader::look_bits`]    | [`BitReader::look_bits_fast`] (`nb_bits >= 1`) |
//! | reload    | [`BitReader::reload`]       | [`BitReader::reload_fast`] (cursor above the safe limit) |
//!
//! Violating a fast-path precondition never touches memory out of bounds;
//! it either produces garbage bits or panics on a slice bound.

mod reader;
mod writer;

pub use reader::{BitReader, ReloadStatus};
pub use writer::BitWriter;

/// Register type used by both bitstream directions.
pub type BitContainer = u64;

/// Size of the register in bytes.
pub const CONTAINER_BYTES: usize = core::mem::size_of::<BitContainer>();

/// Size of the register in bits.
pub const CONTAINER_BITS: u32 = (CONTAINER_BYTES * 8) as u32;

/// Position of the highest set bit. `value` must be non-zero.
#[inline]
pub(crate) fn highbit32(value: u32) -> u32 {
    debug_assert!(value != 0);
    31 - value.leading_zeros()
}
