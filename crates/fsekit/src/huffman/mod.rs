//! Huffman statistics.
//!
//! Huffman coders describe their code lengths as a list of weights
//! (`weight = max_bits + 1 - code_length`, 0 for an absent symbol). This
//! module reads that weight header back; building and using the Huffman
//! code itself is left to the caller.
//!
//! ## Overview
//!
//! The header comes in one of two forms, chosen by its first byte:
//! - `< 128`: the byte is the size of an FSE block holding the weights
//! - `>= 128`: `byte - 127` weights follow as 4-bit nibbles
//!
//! The weight of the last symbol is never stored; it is the one value that
//! brings the weight total to a power of two.
//!
//! ## References
//!
//! - [RFC 8878 Section 4.2.1](https://datatracker.ietf.org/doc/html/rfc8878#section-4.2.1)

mod weights;

pub use weights::{read_stats, HuffmanStats};

/// Largest Huffman weight, and so the largest Huffman table log.
pub const HUF_TABLELOG_MAX: u32 = 12;

/// Largest symbol a Huffman table can describe.
pub const HUF_SYMBOLVALUE_MAX: u32 = 255;

/// Table log limit for FSE-compressed weight streams.
pub const HUF_WEIGHT_TABLELOG: u32 = 6;

/// Header byte values at or above this select direct 4-bit weights.
pub const HUF_DIRECT_HEADER_MIN: u8 = 128;
