//! Allocating wrapper around the block codec.

use crate::config::FseConfig;
use crate::fse::{self, CompressOutcome};
use fsekit_core::{Error, Result};

/// An encoded block together with how to expand it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodedBlock {
    /// NCount header plus FSE bitstream.
    Fse(Vec<u8>),
    /// The input was one byte value repeated.
    Rle(u8),
    /// FSE did not help; the input is kept as is.
    Raw(Vec<u8>),
}

impl EncodedBlock {
    /// Bytes this block occupies when stored.
    pub fn stored_size(&self) -> usize {
        match self {
            EncodedBlock::Fse(data) | EncodedBlock::Raw(data) => data.len(),
            EncodedBlock::Rle(_) => 1,
        }
    }
}

/// FSE block codec with a fixed configuration.
#[derive(Debug, Clone, Default)]
pub struct FseCodec {
    config: FseConfig,
}

impl FseCodec {
    /// Create a codec, rejecting an invalid configuration.
    pub fn new(config: FseConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &FseConfig {
        &self.config
    }

    /// Compress `src` into a freshly allocated block.
    pub fn compress(&self, src: &[u8]) -> Result<EncodedBlock> {
        let mut dst = vec![0u8; fse::compress_bound(src.len())];
        match fse::compress(&mut dst, src, &self.config)? {
            CompressOutcome::Compressed(size) => {
                dst.truncate(size);
                Ok(EncodedBlock::Fse(dst))
            }
            CompressOutcome::Rle(symbol) => Ok(EncodedBlock::Rle(symbol)),
            CompressOutcome::Incompressible => Ok(EncodedBlock::Raw(src.to_vec())),
        }
    }

    /// Decompress an FSE block whose original size is `original_size`.
    pub fn decompress(&self, block: &[u8], original_size: usize) -> Result<Vec<u8>> {
        let mut dst = vec![0u8; original_size];
        let n = fse::decompress(&mut dst, block, self.config.max_decode_table_log)?;
        if n != original_size {
            return Err(Error::SrcSizeWrong);
        }
        Ok(dst)
    }

    /// Expand any [`EncodedBlock`] back to `original_size` bytes.
    pub fn decode(&self, block: &EncodedBlock, original_size: usize) -> Result<Vec<u8>> {
        match block {
            EncodedBlock::Fse(data) => self.decompress(data, original_size),
            EncodedBlock::Rle(symbol) => Ok(vec![*symbol; original_size]),
            EncodedBlock::Raw(data) if data.len() == original_size => Ok(data.clone()),
            EncodedBlock::Raw(_) => Err(Error::SrcSizeWrong),
        }
    }
}
