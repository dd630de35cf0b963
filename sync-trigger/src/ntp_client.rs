//! NTP-style four-timestamp offset/delay estimator built on top of the trigger wire protocol.

use crate::clock;
use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::protocol::{self, Opcode};
use crate::status::{SharedStatus, StatusHandler, StatusKind};

/// Offsets are considered acceptable when their magnitude is below this many seconds.
pub const CLOCK_OFFSET_TOLERANCE: f64 = 10e-3;

/// Per-trial and aggregate one-way delay measurements from an [`NtpStyleClient::request`].
#[derive(Debug, Clone, PartialEq)]
pub struct DelaySamples {
    pub offsets: Vec<f64>,
    pub delays: Vec<f64>,
}

impl DelaySamples {
    pub fn median_delay(&self) -> f64 {
        median(&self.delays)
    }

    pub fn min_delay(&self) -> f64 {
        self.delays.iter().cloned().fold(f64::INFINITY, f64::min)
    }

    pub fn max_delay(&self) -> f64 {
        self.delays.iter().cloned().fold(f64::NEG_INFINITY, f64::max)
    }

    pub fn std_delay(&self) -> f64 {
        population_std(&self.delays)
    }

    /// Offset taken from the trial whose one-way delay is closest to the median: requests
    /// with a shorter round trip are trusted more than ones with a longer round trip.
    pub fn representative_offset(&self) -> f64 {
        let mut indices: Vec<usize> = (0..self.delays.len()).collect();
        indices.sort_by(|&a, &b| self.delays[a].total_cmp(&self.delays[b]));
        let median_index = indices[indices.len() / 2];
        self.offsets[median_index]
    }
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

fn population_std(values: &[f64]) -> f64 {
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Runs repeated echo trials against a [`crate::server::TriggerServer`] to estimate clock
/// offset and one-way network delay, without ever invoking the server's primary callback.
pub struct NtpStyleClient {
    conn: Connection,
}

impl NtpStyleClient {
    pub fn connect(host: &str, port: u16, client_name: impl Into<String>) -> Result<NtpStyleClient> {
        Ok(NtpStyleClient {
            conn: Connection::connect(host, port, client_name)?,
        })
    }

    pub fn status(&self) -> SharedStatus {
        self.conn.status.clone()
    }

    /// Runs `n` dummy-opcode trials and returns the resulting delay/offset samples.
    pub fn request(&mut self, n: usize) -> Result<DelaySamples> {
        if n == 0 {
            return Err(Error::InvalidTrialCount);
        }

        let mut offsets = Vec::with_capacity(n);
        let mut delays = Vec::with_capacity(n);

        for _ in 0..n {
            let t_orig = clock::wall_now();
            let reply = protocol::send_opcode(&mut self.conn.stream, Opcode::Cb2)?;
            let t_dest = clock::wall_now();

            let offset = ((reply.t_recv - t_orig) - (reply.t_tx - t_dest)) / 2.0;
            let delay = (t_dest - t_orig) - (reply.t_tx - reply.t_recv);

            offsets.push(offset);
            delays.push(delay);
        }

        let samples = DelaySamples { offsets, delays };
        let offset = samples.representative_offset();

        if offset.abs() < CLOCK_OFFSET_TOLERANCE {
            self.conn
                .status
                .set_status(StatusKind::Ok, format!("Time offset with server: {offset:.3} s"));
        } else {
            self.conn.status.set_status(
                StatusKind::Warning,
                format!("LARGE time offset with server: {offset:.3} s"),
            );
        }

        #[cfg(feature = "log")]
        log::info!(
            "{} estimated round-trip delay: {:.6} ({:.6}) sec",
            self.conn.name,
            samples.median_delay(),
            samples.std_delay()
        );
        #[cfg(not(feature = "log"))]
        let _ = &self.conn.name;

        Ok(samples)
    }

    pub fn close(&mut self) {
        self.conn.close();
    }
}
