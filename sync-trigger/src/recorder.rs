//! Background periodic sampler of a shared binary flag into a fixed-size buffer.
//!
//! Used to capture a [`crate::emitter::PulseEmitter`]'s output for later decoding with
//! [`crate::pwm::decode`] without a second communication channel between emitter and reader.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::clock;
use crate::error::{Error, Result};

/// Single-writer/single-reader sample cell shared between an emitter and a [`Recorder`].
pub type SampleSlot = Arc<AtomicU8>;

/// Samples a [`SampleSlot`] at a fixed rate into a pre-sized buffer.
///
/// The buffer never grows past `round(max_duration * sampling_rate)` entries; recording
/// stops once it is full, or once [`Recorder::stop`] is called from another thread.
pub struct Recorder {
    slot: SampleSlot,
    sampling_rate: f64,
    capacity: usize,
    stop_flag: Arc<AtomicBool>,
    start_delay: Arc<std::sync::Mutex<Option<f64>>>,
}

/// Handle to a recording in progress; join it to get the captured buffer back.
pub struct RecordingHandle {
    join: JoinHandle<Vec<u8>>,
    stop_flag: Arc<AtomicBool>,
    start_delay: Arc<std::sync::Mutex<Option<f64>>>,
}

impl RecordingHandle {
    /// Requests early termination; the recorder thread observes this at its next tick.
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::Relaxed);
    }

    /// Blocks until the recorder thread finishes and returns the samples it captured.
    ///
    /// The returned buffer is truncated to however many samples were actually written;
    /// a recorder stopped early does not return trailing zeroes.
    pub fn join(self) -> Vec<u8> {
        self.join.join().expect("recorder thread panicked")
    }

    /// Delay between the caller spawning the recorder and the first sample being taken.
    ///
    /// `None` until the first sample has been captured.
    pub fn start_delay(&self) -> Option<f64> {
        *self.start_delay.lock().expect("start_delay mutex poisoned")
    }
}

impl Recorder {
    pub fn new(slot: SampleSlot, sampling_rate: f64, max_duration: f64) -> Result<Recorder> {
        if sampling_rate <= 0.0 || max_duration <= 0.0 {
            return Err(Error::InvalidDuration);
        }

        let capacity = (max_duration * sampling_rate).round() as usize;

        Ok(Recorder {
            slot,
            sampling_rate,
            capacity: capacity.max(1),
            stop_flag: Arc::new(AtomicBool::new(false)),
            start_delay: Arc::new(std::sync::Mutex::new(None)),
        })
    }

    /// Spawns the recorder thread and returns a handle to control and join it.
    pub fn start(self) -> RecordingHandle {
        let Recorder {
            slot,
            sampling_rate,
            capacity,
            stop_flag,
            start_delay,
        } = self;
        let pace = (1.0 / sampling_rate * 1e6).round() / 1e6;
        let launched_at = clock::mono_now();
        let stop_flag_thread = stop_flag.clone();
        let start_delay_thread = start_delay.clone();

        let join = std::thread::spawn(move || {
            let mut buffer = Vec::with_capacity(capacity);
            let mut next_tick = {
                let started_at = clock::mono_now();
                *start_delay_thread
                    .lock()
                    .expect("start_delay mutex poisoned") = Some(started_at - launched_at);
                started_at
            };

            while buffer.len() < capacity && !stop_flag_thread.load(Ordering::Relaxed) {
                buffer.push(slot.load(Ordering::Relaxed));
                next_tick += pace;
                clock::spin_until(next_tick);
            }

            buffer
        });

        RecordingHandle {
            join,
            stop_flag,
            start_delay,
        }
    }
}

/// Bundles a [`SampleSlot`] with ready-made `on`/`off` closures over it.
///
/// Convenience for wiring a [`crate::emitter::PulseEmitter`] straight into a [`Recorder`]
/// without the caller having to build the shared cell and closures by hand, matching the
/// upstream protocol's `PulseEmulator(Recorder)` helper used by its own PWM round-trip tests.
pub struct PulseEmulator {
    slot: SampleSlot,
}

impl PulseEmulator {
    pub fn new() -> PulseEmulator {
        PulseEmulator {
            slot: Arc::new(AtomicU8::new(0)),
        }
    }

    /// A cloned handle onto the shared slot, suitable for [`Recorder::new`].
    pub fn slot(&self) -> SampleSlot {
        self.slot.clone()
    }

    /// A closure that sets the shared slot high; pass as `on` to
    /// [`crate::emitter::PulseEmitter::send_value`].
    pub fn on(&self) -> impl FnMut() {
        let slot = self.slot.clone();
        move || slot.store(1, Ordering::Relaxed)
    }

    /// A closure that sets the shared slot low; pass as `off` to
    /// [`crate::emitter::PulseEmitter::send_value`].
    pub fn off(&self) -> impl FnMut() {
        let slot = self.slot.clone();
        move || slot.store(0, Ordering::Relaxed)
    }

    /// Builds a [`Recorder`] sampling this emulator's slot.
    pub fn recorder(&self, sampling_rate: f64, max_duration: f64) -> Result<Recorder> {
        Recorder::new(self.slot(), sampling_rate, max_duration)
    }
}

impl Default for PulseEmulator {
    fn default() -> Self {
        PulseEmulator::new()
    }
}
