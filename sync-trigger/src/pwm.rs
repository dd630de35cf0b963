//! Discrete pulse-width-modulation codec.
//!
//! A frame is `SEP DELIM SEP (BIT SEP)x4 (BIT SEP)xN DELIM SEP`: a separator/delimiter/separator
//! preamble, a 4-bit precision field, a variable-width value field, then a closing
//! delimiter/separator. Each element is a constant-width pulse measured in receiver samples;
//! see the width constants below.

use crate::error::{Error, Result};

/// Pulse level for a separator (low).
pub const SEP_LEVEL: u8 = 0;
/// Width, in samples, of a separator pulse.
pub const SEP_WIDTH: u32 = 2;
/// Pulse level for delimiters and bits (high).
pub const MARK_LEVEL: u8 = 1;
/// Width, in samples, of a delimiter pulse.
pub const DELIM_WIDTH: u32 = 7;
/// Width, in samples, of a `0` bit pulse.
pub const BIT0_WIDTH: u32 = 5;
/// Width, in samples, of a `1` bit pulse.
pub const BIT1_WIDTH: u32 = 2;
/// Number of bits used to encode the precision field.
pub const PRECISION_BITS: usize = 4;

fn width_for_bit(bit: bool) -> u32 {
    if bit {
        BIT1_WIDTH
    } else {
        BIT0_WIDTH
    }
}

fn push_run(samples: &mut Vec<f64>, level: u8, width: u32) {
    samples.extend(std::iter::repeat(f64::from(level)).take(width as usize));
}

fn bits_msb_first(value: u64, width: usize) -> Vec<bool> {
    (0..width).rev().map(|i| (value >> i) & 1 == 1).collect()
}

/// Encodes `value` at the given decimal `precision` into a noiseless sample train.
///
/// `precision` is the number of decimal digits retained (`round(value * 10^precision)` is
/// what actually gets transmitted); it must be in `0..=9`.
pub fn encode(precision: u8, value: f64) -> Result<Vec<f64>> {
    if precision > 9 {
        return Err(Error::InvalidPrecision);
    }

    let scaled = (value * 10f64.powi(i32::from(precision))).round();
    if scaled < 0.0 || scaled > u64::MAX as f64 {
        return Err(Error::InvalidPrecision);
    }
    let scaled = scaled as u64;
    let value_width = (64 - scaled.leading_zeros()).max(1) as usize;

    let precision_bits = bits_msb_first(u64::from(precision), PRECISION_BITS);
    let value_bits = bits_msb_first(scaled, value_width);

    let mut samples = Vec::new();
    push_run(&mut samples, SEP_LEVEL, SEP_WIDTH);
    push_run(&mut samples, MARK_LEVEL, DELIM_WIDTH);
    push_run(&mut samples, SEP_LEVEL, SEP_WIDTH);

    for bit in precision_bits.into_iter().chain(value_bits) {
        push_run(&mut samples, MARK_LEVEL, width_for_bit(bit));
        push_run(&mut samples, SEP_LEVEL, SEP_WIDTH);
    }

    push_run(&mut samples, MARK_LEVEL, DELIM_WIDTH);
    push_run(&mut samples, SEP_LEVEL, SEP_WIDTH);

    Ok(samples)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunKind {
    Sep,
    Delim,
    Bit(bool),
}

struct Run {
    kind: RunKind,
    start: usize,
}

fn classify(level: u8, length: u32) -> Option<RunKind> {
    match (level, length) {
        (SEP_LEVEL, 1..=3) => Some(RunKind::Sep),
        (MARK_LEVEL, 6..=8) => Some(RunKind::Delim),
        (MARK_LEVEL, 1..=3) => Some(RunKind::Bit(true)),
        (MARK_LEVEL, 4..=6) => Some(RunKind::Bit(false)),
        _ => None,
    }
}

fn run_length_encode(bits: &[u8]) -> Vec<Run> {
    let mut runs = Vec::new();
    let mut i = 0;

    while i < bits.len() {
        let level = bits[i];
        let start = i;
        while i < bits.len() && bits[i] == level {
            i += 1;
        }
        let length = (i - start) as u32;
        // a run matching no known pulse width is simply dropped; that naturally breaks
        // the adjacency any frame spanning it would need.
        if let Some(kind) = classify(level, length) {
            runs.push(Run { kind, start });
        }
    }

    runs
}

/// Binarizes a raw sampled signal at 50% of its peak amplitude.
fn binarize(samples: &[f64]) -> Vec<u8> {
    let peak = samples.iter().cloned().fold(f64::MIN, f64::max);
    let threshold = peak * 0.5;
    samples
        .iter()
        .map(|&s| if s > threshold { 1 } else { 0 })
        .collect()
}

fn bits_to_value(bits: &[bool]) -> u64 {
    bits.iter().fold(0u64, |acc, &b| (acc << 1) | u64::from(b))
}

/// Decodes every well-formed PWM frame found in a (possibly noisy) sampled signal.
///
/// Returns `(sample_index_of_frame_start, decoded_value)` pairs in order of occurrence.
/// A region of the signal that matches the outer `DELIM ... DELIM` envelope but whose inner
/// bit fields don't parse is logged and skipped; other frames in the same signal are still
/// returned. This function never fails: a signal containing no valid frame decodes to an
/// empty vector.
pub fn decode(samples: &[f64]) -> Vec<(usize, f64)> {
    if samples.is_empty() {
        return Vec::new();
    }

    let bits = binarize(samples);
    let runs = run_length_encode(&bits);
    let mut results = Vec::new();
    let mut i = 0;

    while i < runs.len() {
        if runs[i].kind != RunKind::Delim {
            i += 1;
            continue;
        }
        // The frame's logical opening is the SEP immediately before this DELIM (the
        // `SEP DELIM SEP ...` preamble); fall back to the DELIM's own start when the
        // stream begins right at the delimiter (no leading SEP was captured).
        let frame_start = if i > 0 && runs[i - 1].kind == RunKind::Sep {
            runs[i - 1].start
        } else {
            runs[i].start
        };

        // expect SEP after the opening DELIM
        if i + 1 >= runs.len() || runs[i + 1].kind != RunKind::Sep {
            i += 1;
            continue;
        }

        let mut j = i + 2;
        let mut bits_found = Vec::new();
        while j + 1 < runs.len() {
            let (bit_kind, sep_kind) = (runs[j].kind, runs[j + 1].kind);
            match (bit_kind, sep_kind) {
                (RunKind::Bit(b), RunKind::Sep) => {
                    bits_found.push(b);
                    j += 2;
                }
                _ => break,
            }
        }

        let closed_by_delim = j < runs.len() && runs[j].kind == RunKind::Delim;

        if closed_by_delim && bits_found.len() >= PRECISION_BITS + 1 {
            let (precision_bits, value_bits) = bits_found.split_at(PRECISION_BITS);
            let precision = bits_to_value(precision_bits);

            if precision <= 9 {
                let raw_value = bits_to_value(value_bits);
                let value = raw_value as f64 / 10f64.powi(precision as i32);
                results.push((frame_start, value));
            } else {
                #[cfg(feature = "log")]
                log::warn!("pwm: frame at sample {frame_start} has out-of-range precision {precision}");
            }
            i = j + 1;
        } else {
            #[cfg(feature = "log")]
            log::warn!("pwm: malformed frame at sample {frame_start}, skipping");
            i += 1;
        }
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_round_trip_is_exact_without_noise() {
        let samples = encode(0, 5.0).unwrap();
        let decoded = decode(&samples);
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0], (0, 5.0));
    }

    #[test]
    fn encode_decode_round_trip_with_precision() {
        let samples = encode(6, 1_234.567_891).unwrap();
        let decoded = decode(&samples);
        assert_eq!(decoded.len(), 1);
        assert!((decoded[0].1 - 1_234.567_891).abs() < 1e-6);
    }

    #[test]
    fn decode_tolerates_uniform_sub_sample_noise() {
        use rand::Rng;
        let mut rng = rand::thread_rng();
        let samples: Vec<f64> = encode(3, 42.125)
            .unwrap()
            .into_iter()
            .map(|s| s + rng.gen_range(0.0..0.5))
            .collect();

        let decoded = decode(&samples);
        assert_eq!(decoded.len(), 1);
        assert!((decoded[0].1 - 42.125).abs() <= 1e-3);
    }

    #[test]
    fn encode_rejects_precision_above_nine() {
        assert_eq!(encode(10, 1.0), Err(Error::InvalidPrecision));
    }

    #[test]
    fn decode_of_empty_signal_is_empty() {
        assert!(decode(&[]).is_empty());
    }

    #[test]
    fn decode_finds_back_to_back_frames() {
        let mut samples = encode(0, 3.0).unwrap();
        samples.extend(encode(0, 7.0).unwrap());

        let decoded = decode(&samples);
        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded[0].1, 3.0);
        assert_eq!(decoded[1].1, 7.0);
    }
}
