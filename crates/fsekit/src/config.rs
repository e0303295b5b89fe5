//! Codec configuration.

use crate::fse::{FSE_DEFAULT_TABLELOG, FSE_MAX_SYMBOL_VALUE, FSE_MAX_TABLELOG, FSE_MIN_TABLELOG};
use fsekit_core::{Error, Result};

/// Parameters for the block codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FseConfig {
    /// Largest byte value the input may contain (default: 255).
    pub max_symbol_value: u32,

    /// Requested table log; clamped per input by `optimal_table_log`
    /// (default: 11).
    pub table_log: u32,

    /// Largest table log a decoder accepts from a header (default: 15).
    pub max_decode_table_log: u32,
}

impl Default for FseConfig {
    fn default() -> Self {
        FseConfig {
            max_symbol_value: FSE_MAX_SYMBOL_VALUE,
            table_log: FSE_DEFAULT_TABLELOG,
            max_decode_table_log: FSE_MAX_TABLELOG,
        }
    }
}

impl FseConfig {
    /// Settings used for Huffman weight streams: weights 0..=12 and a table
    /// log of at most 6.
    pub fn for_huffman_weights() -> Self {
        FseConfig {
            max_symbol_value: crate::huffman::HUF_TABLELOG_MAX,
            table_log: crate::huffman::HUF_WEIGHT_TABLELOG,
            max_decode_table_log: crate::huffman::HUF_WEIGHT_TABLELOG,
        }
    }

    /// Set the largest byte value the input may contain.
    pub fn with_max_symbol_value(mut self, max_symbol_value: u32) -> Self {
        self.max_symbol_value = max_symbol_value;
        self
    }

    /// Set the requested table log. Normalization may lower it for small inputs.
    pub fn with_table_log(mut self, table_log: u32) -> Self {
        self.table_log = table_log;
        self
    }

    /// Set the largest table log a decoder accepts from a header.
    pub fn with_max_decode_table_log(mut self, max_decode_table_log: u32) -> Self {
        self.max_decode_table_log = max_decode_table_log;
        self
    }

    /// Check every field against the supported ranges.
    pub fn validate(&self) -> Result<()> {
        if self.max_symbol_value > FSE_MAX_SYMBOL_VALUE {
            return Err(Error::MaxSymbolValueTooLarge);
        }
        Self::check_table_log(self.table_log)?;
        Self::check_table_log(self.max_decode_table_log)
    }

    fn check_table_log(table_log: u32) -> Result<()> {
        if table_log > FSE_MAX_TABLELOG {
            return Err(Error::TableLogTooLarge);
        }
        if table_log < FSE_MIN_TABLELOG {
            return Err(Error::GenericError);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = FseConfig::default();
        assert_eq!(config.max_symbol_value, 255);
        assert_eq!(config.table_log, 11);
        assert_eq!(config.max_decode_table_log, 15);
        assert!(config.validate().is_ok());
        assert!(FseConfig::for_huffman_weights().validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = FseConfig::default()
            .with_max_symbol_value(12)
            .with_table_log(6)
            .with_max_decode_table_log(7);
        assert_eq!(config.max_symbol_value, 12);
        assert_eq!(config.table_log, 6);
        assert_eq!(config.max_decode_table_log, 7);
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        assert_eq!(
            FseConfig::default()
                .with_max_symbol_value(256)
                .validate()
                .unwrap_err(),
            Error::MaxSymbolValueTooLarge
        );
        assert_eq!(
            FseConfig::default().with_table_log(16).validate().unwrap_err(),
            Error::TableLogTooLarge
        );
        assert_eq!(
            FseConfig::default().with_table_log(4).validate().unwrap_err(),
            Error::GenericError
        );
        assert_eq!(
            FseConfig::default()
                .with_max_decode_table_log(20)
                .validate()
                .unwrap_err(),
            Error::TableLogTooLarge
        );
    }
}
