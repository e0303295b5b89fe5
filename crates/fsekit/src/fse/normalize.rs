//! Histogram normalization and table log selection.

use super::{FSE_DEFAULT_TABLELOG, FSE_MAX_TABLELOG, FSE_MIN_TABLELOG};
use crate::bitstream::highbit32;
use fsekit_core::{Error, Result};
use tracing::trace;

/// Rounding thresholds for probabilities below 8, in units of `2^-20`.
const RTB_TABLE: [u64; 8] = [0, 473195, 504333, 520860, 550000, 700000, 750000, 830000];

const NOT_YET_ASSIGNED: i16 = -2;

#[inline]
fn highbit_usize(value: usize) -> u32 {
    debug_assert!(value != 0);
    usize::BITS - 1 - value.leading_zeros()
}

/// Smallest table log that can represent `src_size` symbols drawn from an
/// alphabet of `max_symbol_value + 1`.
pub fn min_table_log(src_size: usize, max_symbol_value: u32) -> u32 {
    let min_bits_src = highbit_usize(src_size.max(1)) + 1;
    let min_bits_symbols = highbit32(max_symbol_value.max(1)) + 2;
    min_bits_src.min(min_bits_symbols)
}

/// Pick a table log for `src_size` symbols.
///
/// Starts from `max_table_log` (or the default when 0), shrinks it for small
/// inputs, and never goes below [`min_table_log`] or outside the supported
/// range.
pub fn optimal_table_log(max_table_log: u32, src_size: usize, max_symbol_value: u32) -> u32 {
    optimal_table_log_internal(max_table_log, src_size, max_symbol_value, 2)
}

fn optimal_table_log_internal(
    max_table_log: u32,
    src_size: usize,
    max_symbol_value: u32,
    minus: u32,
) -> u32 {
    let mut table_log = if max_table_log == 0 {
        FSE_DEFAULT_TABLELOG
    } else {
        max_table_log
    };

    // Inputs of one symbol or fewer put no bound on the table.
    let max_bits_src = if src_size > 1 {
        highbit_usize(src_size - 1).checked_sub(minus)
    } else {
        None
    };
    if let Some(max_bits_src) = max_bits_src {
        table_log = table_log.min(max_bits_src);
    }

    let min_bits = min_table_log(src_size, max_symbol_value);
    table_log = table_log.max(min_bits);
    table_log.clamp(FSE_MIN_TABLELOG, FSE_MAX_TABLELOG)
}

/// Normalize a histogram so its counts sum to `1 << table_log`.
///
/// # Arguments
/// * `norm` - Output normalized counts, at least `max_symbol_value + 1` long
/// * `table_log` - Target table log, 0 for the default
/// * `count` - Histogram
/// * `total` - Sum of `count`
/// * `max_symbol_value` - Largest symbol with a non-zero count
/// * `use_low_prob_count` - Represent very rare symbols as `-1` instead of 1
///
/// # Returns
/// The table log used, or 0 when a single symbol holds the whole total (the
/// input should be coded as RLE).
pub fn normalize_count(
    norm: &mut [i16],
    table_log: u32,
    count: &[u32],
    total: usize,
    max_symbol_value: u32,
    use_low_prob_count: bool,
) -> Result<u32> {
    let table_log = if table_log == 0 {
        FSE_DEFAULT_TABLELOG
    } else {
        table_log
    };
    if table_log < FSE_MIN_TABLELOG {
        return Err(Error::GenericError);
    }
    if table_log > FSE_MAX_TABLELOG {
        return Err(Error::TableLogTooLarge);
    }
    let max_sv1 = max_symbol_value as usize + 1;
    if norm.len() < max_sv1 || count.len() < max_sv1 {
        return Err(Error::MaxSymbolValueTooLarge);
    }
    if total == 0 || table_log < min_table_log(total, max_symbol_value) {
        return Err(Error::GenericError);
    }

    let scale = 62 - table_log;
    let step = (1u64 << 62) / total as u64;
    let v_step = 1u64 << (scale - 20);
    let low_threshold = (total >> table_log) as u64;
    let low_prob_count: i16 = if use_low_prob_count { -1 } else { 1 };

    let mut still_to_distribute: i32 = 1 << table_log;
    let mut largest = 0usize;
    let mut largest_proba: i16 = 0;

    for s in 0..max_sv1 {
        let c = u64::from(count[s]);
        if c == total as u64 {
            return Ok(0);
        }
        if c == 0 {
            norm[s] = 0;
            continue;
        }
        if c <= low_threshold {
            norm[s] = low_prob_count;
            still_to_distribute -= 1;
        } else {
            let scaled = c * step;
            let mut proba = (scaled >> scale) as i16;
            if proba < 8 {
                let rest_to_beat = v_step * RTB_TABLE[proba as usize];
                if scaled - ((proba as u64) << scale) > rest_to_beat {
                    proba += 1;
                }
            }
            if proba > largest_proba {
                largest_proba = proba;
                largest = s;
            }
            norm[s] = proba;
            still_to_distribute -= i32::from(proba);
        }
    }

    if -still_to_distribute >= i32::from(norm[largest] >> 1) {
        // The largest symbol cannot absorb the rounding error.
        trace!(table_log, still_to_distribute, "falling back to secondary normalization");
        normalize_m2(norm, table_log, count, total as u64, max_sv1, low_prob_count)?;
    } else {
        norm[largest] += still_to_distribute as i16;
    }

    Ok(table_log)
}

/// Secondary method: assign the rare symbols first, then share the rest of
/// the table proportionally among the others.
fn normalize_m2(
    norm: &mut [i16],
    table_log: u32,
    count: &[u32],
    mut total: u64,
    max_sv1: usize,
    low_prob_count: i16,
) -> Result<()> {
    let mut distributed: u32 = 0;
    let low_threshold = total >> table_log;
    let mut low_one = (total * 3) >> (table_log + 1);

    for s in 0..max_sv1 {
        let c = u64::from(count[s]);
        if c == 0 {
            norm[s] = 0;
        } else if c <= low_threshold {
            norm[s] = low_prob_count;
            distributed += 1;
            total -= c;
        } else if c <= low_one {
            norm[s] = 1;
            distributed += 1;
            total -= c;
        } else {
            norm[s] = NOT_YET_ASSIGNED;
        }
    }

    let table_size = 1u32 << table_log;
    let mut to_distribute = table_size
        .checked_sub(distributed)
        .ok_or(Error::GenericError)?;
    if to_distribute == 0 {
        return Ok(());
    }

    if total / u64::from(to_distribute) > low_one {
        // Risk of rounding to zero
        low_one = (total * 3) / (u64::from(to_distribute) * 2);
        for s in 0..max_sv1 {
            let c = u64::from(count[s]);
            if norm[s] == NOT_YET_ASSIGNED && c <= low_one {
                norm[s] = 1;
                distributed += 1;
                total -= c;
            }
        }
        to_distribute = table_size
            .checked_sub(distributed)
            .ok_or(Error::GenericError)?;
    }

    if distributed as usize == max_sv1 {
        // Every symbol is rare: hand the remainder to the most frequent one.
        let mut max_v = 0usize;
        let mut max_c = 0u32;
        for (s, &c) in count[..max_sv1].iter().enumerate() {
            if c > max_c {
                max_v = s;
                max_c = c;
            }
        }
        norm[max_v] += to_distribute as i16;
        return Ok(());
    }

    if total == 0 {
        // Every remaining symbol got a unit slot; spread the rest round-robin.
        if !norm[..max_sv1].iter().any(|&n| n > 0) {
            return Err(Error::GenericError);
        }
        let mut s = 0usize;
        while to_distribute > 0 {
            if norm[s] > 0 {
                to_distribute -= 1;
                norm[s] += 1;
            }
            s = (s + 1) % max_sv1;
        }
        return Ok(());
    }

    let v_step_log = 62 - table_log;
    let mid = (1u64 << (v_step_log - 1)) - 1;
    let r_step = ((1u64 << v_step_log) * u64::from(to_distribute) + mid) / total;
    let mut tmp_total = mid;
    for s in 0..max_sv1 {
        if norm[s] == NOT_YET_ASSIGNED {
            let end = tmp_total + u64::from(count[s]) * r_step;
            let s_start = tmp_total >> v_step_log;
            let s_end = end >> v_step_log;
            let weight = s_end - s_start;
            if weight < 1 {
                return Err(Error::GenericError);
            }
            norm[s] = weight as i16;
            tmp_total = end;
        }
    }

    Ok(())
}
