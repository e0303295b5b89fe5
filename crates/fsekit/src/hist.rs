//! Byte histograms.
//!
//! All counters report the largest single-symbol count and shrink
//! `max_symbol_value` to the highest symbol actually present.

use fsekit_core::{Error, Result};

/// Number of `u32` cells [`count_parallel`] needs as scratch.
pub const HIST_WKSP_SIZE: usize = 1024;

/// Inputs below this size are counted with [`count_simple`].
const FAST_COUNT_THRESHOLD: usize = 1500;

/// Whether [`count_parallel`] validates symbols against the declared bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckInput {
    /// Assume every byte is at most `max_symbol_value`.
    TrustInput,
    /// Fail with [`Error::MaxSymbolValueTooSmall`] on larger bytes.
    CheckMaxSymbolValue,
}

/// Count bytes with a single counter array.
///
/// `count` must hold at least `max_symbol_value + 1` entries; bytes above
/// `max_symbol_value` are rejected with [`Error::MaxSymbolValueTooSmall`].
pub fn count_simple(count: &mut [u32], max_symbol_value: &mut u32, src: &[u8]) -> Result<u32> {
    let max_sv1 = *max_symbol_value as usize + 1;
    if count.len() < max_sv1 {
        return Err(Error::DstSizeTooSmall);
    }
    let count = &mut count[..max_sv1];
    count.fill(0);
    if src.is_empty() {
        *max_symbol_value = 0;
        return Ok(0);
    }

    for &byte in src {
        match count.get_mut(byte as usize) {
            Some(slot) => *slot += 1,
            None => return Err(Error::MaxSymbolValueTooSmall),
        }
    }

    let mut max = max_sv1 - 1;
    while count[max] == 0 {
        max -= 1;
    }
    *max_symbol_value = max as u32;

    Ok(count.iter().copied().max().unwrap_or(0))
}

/// Count bytes with four interleaved counter lanes.
///
/// Splitting the counts over four tables removes the store-to-load
/// dependency when consecutive bytes are equal. `wksp` must hold at least
/// [`HIST_WKSP_SIZE`] cells.
pub fn count_parallel(
    count: &mut [u32],
    max_symbol_value: &mut u32,
    src: &[u8],
    check: CheckInput,
    wksp: &mut [u32],
) -> Result<u32> {
    if wksp.len() < HIST_WKSP_SIZE {
        return Err(Error::WorkSpaceTooSmall);
    }
    let declared = (*max_symbol_value).min(255) as usize;
    if count.len() <= declared {
        return Err(Error::DstSizeTooSmall);
    }
    if src.is_empty() {
        count[..=declared].fill(0);
        *max_symbol_value = 0;
        return Ok(0);
    }

    let wksp = &mut wksp[..HIST_WKSP_SIZE];
    wksp.fill(0);
    let (lane1, rest) = wksp.split_at_mut(256);
    let (lane2, rest) = rest.split_at_mut(256);
    let (lane3, lane4) = rest.split_at_mut(256);

    let mut stripes = src.chunks_exact(16);
    for stripe in &mut stripes {
        for word in stripe.chunks_exact(4) {
            let c = u32::from_le_bytes([word[0], word[1], word[2], word[3]]);
            lane1[(c & 0xFF) as usize] += 1;
            lane2[((c >> 8) & 0xFF) as usize] += 1;
            lane3[((c >> 16) & 0xFF) as usize] += 1;
            lane4[(c >> 24) as usize] += 1;
        }
    }
    for &byte in stripes.remainder() {
        lane1[byte as usize] += 1;
    }

    let mut max = 0u32;
    for s in 0..256 {
        lane1[s] += lane2[s] + lane3[s] + lane4[s];
        max = max.max(lane1[s]);
    }

    let mut max_symbol = 255usize;
    while lane1[max_symbol] == 0 {
        max_symbol -= 1;
    }
    if check == CheckInput::CheckMaxSymbolValue && max_symbol > declared {
        return Err(Error::MaxSymbolValueTooSmall);
    }
    *max_symbol_value = max_symbol as u32;

    let n = count.len().min(256);
    count[..n].copy_from_slice(&lane1[..n]);
    Ok(max)
}

/// Count bytes, trusting that none exceeds `max_symbol_value`.
///
/// Small inputs use [`count_simple`]; larger ones the four-lane counter.
pub fn count_fast(
    count: &mut [u32],
    max_symbol_value: &mut u32,
    src: &[u8],
    wksp: &mut [u32],
) -> Result<u32> {
    if src.len() < FAST_COUNT_THRESHOLD {
        return count_simple(count, max_symbol_value, src);
    }
    count_parallel(count, max_symbol_value, src, CheckInput::TrustInput, wksp)
}

/// Count bytes, validating them when `max_symbol_value` is below 255.
pub fn count(
    count: &mut [u32],
    max_symbol_value: &mut u32,
    src: &[u8],
    wksp: &mut [u32],
) -> Result<u32> {
    if *max_symbol_value < 255 {
        return count_parallel(
            count,
            max_symbol_value,
            src,
            CheckInput::CheckMaxSymbolValue,
            wksp,
        );
    }
    *max_symbol_value = 255;
    count_fast(count, max_symbol_value, src, wksp)
}

/// Owned histogram of a byte slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Histogram {
    counts: [u32; 256],
    max_symbol_value: u32,
    largest_count: u32,
    total: usize,
}

impl Histogram {
    /// Count every byte of `src` over the full byte alphabet.
    pub fn from_bytes(src: &[u8]) -> Result<Self> {
        Self::with_max_symbol_value(src, 255)
    }

    /// Count every byte of `src`, rejecting bytes above `max_symbol_value`.
    pub fn with_max_symbol_value(src: &[u8], max_symbol_value: u32) -> Result<Self> {
        if max_symbol_value > 255 {
            return Err(Error::MaxSymbolValueTooLarge);
        }
        let mut counts = [0u32; 256];
        let mut max = max_symbol_value;
        let mut wksp = [0u32; HIST_WKSP_SIZE];
        let largest_count = count(&mut counts, &mut max, src, &mut wksp)?;
        Ok(Self {
            counts,
            max_symbol_value: max,
            largest_count,
            total: src.len(),
        })
    }

    /// Counts for symbols `0..=max_symbol_value`.
    pub fn counts(&self) -> &[u32] {
        &self.counts[..=self.max_symbol_value as usize]
    }

    /// Highest symbol present, or 0 for an empty input.
    pub fn max_symbol_value(&self) -> u32 {
        self.max_symbol_value
    }

    /// Count of the most frequent symbol.
    pub fn largest_count(&self) -> u32 {
        self.largest_count
    }

    /// Number of bytes counted.
    pub fn total(&self) -> usize {
        self.total
    }

    /// True when a single symbol makes up the whole non-empty input.
    pub fn is_rle(&self) -> bool {
        self.total > 0 && self.largest_count as usize == self.total
    }
}
