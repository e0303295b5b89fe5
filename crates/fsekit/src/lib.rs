//! # fsekit
//!
//! Finite State Entropy (FSE) coding in native Rust.
//!
//! FSE is the tANS entropy coder used by Zstandard for its sequence codes and
//! Huffman weights. This crate provides the whole pipeline: byte histograms,
//! count normalization, the NCount table header, encode/decode tables, the
//! backward bitstream and the interleaved two-state coders.
//!
//! ## Quick Start
//!
//! ```rust
//! use fsekit::{EncodedBlock, FseCodec};
//!
//! let data = b"entropy coding loves skewed distributions: eeeeeeeeeeeeeeeeeeeeee".repeat(8);
//! let codec = FseCodec::default();
//! let block = codec.compress(&data).unwrap();
//! assert!(matches!(block, EncodedBlock::Fse(_)));
//! assert_eq!(codec.decode(&block, data.len()).unwrap(), data);
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                         fsekit                           │
//! ├──────────────────────────────────────────────────────────┤
//! │  codec.rs / config.rs   │  huffman/                      │
//! │  (allocating wrapper)   │  └── weights.rs (read_stats)   │
//! ├──────────────────────────────────────────────────────────┤
//! │  fse/                   │  ncount.rs   hist.rs           │
//! │  ├── compress.rs        │  (table      (byte             │
//! │  ├── normalize.rs       │   header)     histograms)      │
//! │  ├── table.rs           │                                │
//! │  ├── encoder.rs         │                                │
//! │  └── decoder.rs         │                                │
//! ├──────────────────────────────────────────────────────────┤
//! │  bitstream/ (BitWriter, BitReader)                       │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Low-level use
//!
//! The building blocks can be driven directly when the caller owns the
//! framing:
//!
//! ```rust
//! use fsekit::fse::{compress_using_ctable, decompress_using_dtable, DecodeTable, EncodeTable};
//!
//! let counts = [24i16, 8];
//! let encode = EncodeTable::build(&counts, 1, 5).unwrap();
//! let decode = DecodeTable::build(&counts, 1, 5).unwrap();
//!
//! let src = [0u8, 0, 1, 0, 0, 0, 1, 0, 0, 1];
//! let mut stream = [0u8; 32];
//! let size = compress_using_ctable(&mut stream, &src, &encode);
//! assert!(size > 0);
//!
//! let mut out = [0u8; 10];
//! let n = decompress_using_dtable(&mut out, &stream[..size], &decode).unwrap();
//! assert_eq!(&out[..n], &src);
//! ```

pub mod bitstream;
pub mod codec;
pub mod config;
pub mod fse;
pub mod hist;
pub mod huffman;
pub mod ncount;

pub use codec::{EncodedBlock, FseCodec};
pub use config::FseConfig;
pub use fse::{
    block_bound, compress, compress_bound, decompress, CompressOutcome, DecodeTable,
    EncodeTable, FSE_DEFAULT_TABLELOG, FSE_MAX_SYMBOL_VALUE, FSE_MAX_TABLELOG, FSE_MIN_TABLELOG,
    FSE_NCOUNT_BOUND,
};
pub use hist::Histogram;
pub use huffman::{read_stats, HuffmanStats, HUF_TABLELOG_MAX};
pub use ncount::{read_ncount, write_ncount, NCount};

pub use fsekit_core::{Error, Result};
