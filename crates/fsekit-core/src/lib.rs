//! # fsekit Core
//!
//! Shared error types for the fsekit entropy coding crates.
//!
//! All fallible operations in the bitstream, FSE table, NCount header and
//! histogram code return [`Result`], whose error side is the fixed set of
//! kinds in [`Error`]. Errors are local and synchronous: the caller decides
//! whether to retry with different parameters (a larger buffer, a smaller
//! table log) or give up.
//!
//! ## Example
//!
//! ```
//! use fsekit_core::{Error, Result};
//!
//! fn check_capacity(len: usize) -> Result<()> {
//!     if len <= 8 {
//!         return Err(Error::DstSizeTooSmall);
//!     }
//!     Ok(())
//! }
//!
//! let err = check_capacity(4).unwrap_err();
//! assert!(err.is_recoverable());
//! assert_eq!(err.category(), "dst_size_too_small");
//! ```

pub mod error;

pub use error::{Error, Result};
