//! Schedules a [`crate::pwm`] frame's pulses against a target sample rate using a
//! monotonic-clock busy-wait, the same way [`crate::trigger_client`] schedules a trigger fire.

use crate::clock;
use crate::error::{Error, Result};
use crate::pwm::{self, BIT0_WIDTH, BIT1_WIDTH, DELIM_WIDTH, PRECISION_BITS, SEP_WIDTH};

/// Emits one PWM frame per call to [`PulseEmitter::send_value`] through an `on`/`off` pair.
///
/// `precision` is fixed at construction, matching the upstream protocol's
/// `__init__(self, precision)` — every frame this emitter sends uses the same decimal
/// precision.
pub struct PulseEmitter {
    precision: u8,
}

/// Outcome of transmitting one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SendOutcome {
    /// The value actually encoded (the result of the caller's `value_fn`).
    pub transmitted_value: f64,
    /// Delay between `send_value` being called and the first (delimiter) pulse starting.
    pub overhead_before_first_bit: f64,
    /// Total wall-clock duration of the whole frame.
    pub total_send_duration: f64,
}

impl PulseEmitter {
    pub fn new(precision: u8) -> Result<PulseEmitter> {
        if precision > 9 {
            return Err(Error::InvalidPrecision);
        }
        Ok(PulseEmitter { precision })
    }

    /// Transmits one frame at `rate` Hz, calling `on`/`off` to drive the physical channel.
    ///
    /// `value_fn` is invoked immediately before the leading delimiter pulse starts, so a
    /// caller can pass something like `clock::wall_now` and have the encoded value be the
    /// instant transmission actually began, net of whatever `value_fn` itself costs. This
    /// mirrors the upstream protocol precisely: the delimiter pulse's own deadline is
    /// captured *before* the value is resolved, so a slow `value_fn` eats into that specific
    /// pulse's nominal width rather than into the time preceding it.
    pub fn send_value(
        &self,
        rate: f64,
        value_fn: impl FnOnce() -> f64,
        mut on: impl FnMut(),
        mut off: impl FnMut(),
    ) -> Result<SendOutcome> {
        if rate <= 0.0 {
            return Err(Error::InvalidDuration);
        }

        let dt = 1.0 / rate;
        let started_at = clock::mono_now();

        off();
        let mut tic = clock::mono_now();
        clock::spin_until(tic + dt * f64::from(SEP_WIDTH));

        let overhead_before_first_bit = clock::mono_now() - started_at;
        tic = clock::mono_now();
        let value = value_fn();

        let value_scaled = (value * 10f64.powi(i32::from(self.precision))).round();
        let value_scaled = value_scaled.max(0.0) as u64;
        let value_width = (64 - value_scaled.leading_zeros()).max(1) as usize;

        let mut emit_pulse = |tic: &mut f64, level_width: u32, sep_width: u32| {
            on();
            *tic += dt * f64::from(level_width);
            clock::spin_until(*tic);
            off();
            *tic += dt * f64::from(sep_width);
            clock::spin_until(*tic);
        };

        emit_pulse(&mut tic, DELIM_WIDTH, SEP_WIDTH);

        let precision_bits = (0..PRECISION_BITS)
            .rev()
            .map(|i| (u64::from(self.precision) >> i) & 1 == 1);
        let value_bits = (0..value_width)
            .rev()
            .map(|i| (value_scaled >> i) & 1 == 1);

        for bit in precision_bits.chain(value_bits) {
            let width = if bit { BIT1_WIDTH } else { BIT0_WIDTH };
            emit_pulse(&mut tic, width, SEP_WIDTH);
        }

        emit_pulse(&mut tic, DELIM_WIDTH, SEP_WIDTH);

        Ok(SendOutcome {
            transmitted_value: value,
            overhead_before_first_bit,
            total_send_duration: clock::mono_now() - started_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU8, Ordering};
    use std::sync::Arc;

    #[test]
    fn send_value_decodes_back_through_the_recorder() {
        let slot = Arc::new(AtomicU8::new(0));
        let write_slot = slot.clone();
        let read_slot = slot.clone();

        let emitter = PulseEmitter::new(3).unwrap();
        let rate = 2_000.0;

        let recorder = crate::recorder::Recorder::new(read_slot, rate, 0.05).unwrap();
        let handle = recorder.start();

        let outcome = emitter
            .send_value(
                rate,
                || 12.345,
                || write_slot.store(1, Ordering::Relaxed),
                || write_slot.store(0, Ordering::Relaxed),
            )
            .unwrap();

        assert_eq!(outcome.transmitted_value, 12.345);

        let buffer = handle.join();
        let samples: Vec<f64> = buffer.iter().map(|&b| f64::from(b)).collect();
        let decoded = pwm::decode(&samples);

        assert_eq!(decoded.len(), 1);
        assert!((decoded[0].1 - 12.345).abs() < 1e-3);
    }

    #[test]
    fn send_value_through_a_pulse_emulator_recovers_a_wall_clock_timestamp() {
        use crate::recorder::PulseEmulator;

        let emulator = PulseEmulator::new();
        let emitter = PulseEmitter::new(6).unwrap();
        let rate = 300.0;

        let recorder = emulator.recorder(rate, 0.5).unwrap();
        let handle = recorder.start();

        let outcome = emitter
            .send_value(rate, crate::clock::wall_now, emulator.on(), emulator.off())
            .unwrap();

        let buffer = handle.join();
        let samples: Vec<f64> = buffer.iter().map(|&b| f64::from(b)).collect();
        let decoded = pwm::decode(&samples);

        assert_eq!(decoded.len(), 1);
        assert!((decoded[0].1 - outcome.transmitted_value).abs() < 1e-6);
    }

    #[test]
    fn send_value_rejects_non_positive_rate() {
        let emitter = PulseEmitter::new(0).unwrap();
        let err = emitter
            .send_value(0.0, || 1.0, || {}, || {})
            .unwrap_err();
        assert_eq!(err, Error::InvalidDuration);
    }

    #[test]
    fn new_rejects_precision_above_nine() {
        assert_eq!(PulseEmitter::new(10).unwrap_err(), Error::InvalidPrecision);
    }
}
