//! Synchronized remote triggering: the client's hard-real-time centerpiece.
//!
//! Runs a warm-up phase of dummy-opcode trials to estimate the one-way network delay to the
//! server, then a single final trial where the real trigger opcode is sent and the local
//! callback is busy-waited to fire at the moment the remote callback is estimated to fire.

use crate::clock;
use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::ntp_client::DelaySamples;
use crate::protocol::{self, Opcode};
use crate::status::SharedStatus;

/// Width of the trailing window, in trials, averaged to produce the pre-fire delay estimate.
/// Excludes the final trial itself, whose delay is what the estimate is trying to predict.
const ESTIMATE_WINDOW: usize = 9;

/// Result of one [`TriggerClient::trigger`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerOutcome {
    /// Wall-clock time the final trial's request was issued (`t_orig`).
    pub remote_trigger_sent_at: f64,
    /// Mean one-way delay over the warm-up window, used to schedule the local fire.
    pub estimated_delay: f64,
    /// `estimated_delay` minus the one-way delay actually observed on the final trial.
    pub trigger_delay_error: f64,
    /// Every trial's delay sample, in order, including the final trial.
    pub delays: DelaySamples,
}

impl TriggerOutcome {
    pub fn one_way_delay_std(&self) -> f64 {
        self.delays.std_delay()
    }
}

/// A client that schedules a local callback to fire in step with a remote one.
pub struct TriggerClient {
    conn: Connection,
}

impl TriggerClient {
    pub fn connect(host: &str, port: u16) -> Result<TriggerClient> {
        Ok(TriggerClient {
            conn: Connection::connect(host, port, "SyncTriggerClient")?,
        })
    }

    pub fn status(&self) -> SharedStatus {
        self.conn.status.clone()
    }

    /// Runs `n` trials (the first `n - 1` are warm-up, the last is the real trigger) and
    /// calls `local_fire` at the estimated remote-fire instant.
    pub fn trigger(&mut self, n: usize, local_fire: impl FnOnce()) -> Result<TriggerOutcome> {
        if n < ESTIMATE_WINDOW + 2 {
            return Err(Error::InvalidTrialCount);
        }

        let mut offsets = Vec::with_capacity(n);
        let mut delays = Vec::with_capacity(n);
        let mut estimated_delay = 0.0;
        let mut remote_trigger_sent_at = 0.0;

        for trial in 0..n {
            let is_final = trial == n - 1;
            let opcode = if is_final { Opcode::Cb1 } else { Opcode::Cb2 };

            let t_orig = clock::wall_now();
            protocol::write_opcode_byte(&mut self.conn.stream, opcode)?;
            let t_send = clock::wall_now();

            if is_final {
                remote_trigger_sent_at = t_orig;
                let wait = estimated_delay - (t_send - t_orig);
                clock::spin_until(clock::mono_now() + wait);
                local_fire();
            }

            let reply = protocol::read_reply(&mut self.conn.stream)?;
            let t_dest = clock::wall_now();

            let delay = ((t_dest - t_orig) - (reply.t_tx - reply.t_recv)) / 2.0;

            offsets.push(delay);
            delays.push(delay);

            // Computed right after trial n-2's own delay lands, so the trailing window
            // covers that trial too — the final trial (whose opcode differs) is still
            // excluded since it hasn't run yet.
            if trial == n - 2 {
                let window_start = delays.len().saturating_sub(ESTIMATE_WINDOW);
                estimated_delay =
                    delays[window_start..].iter().sum::<f64>() / (delays.len() - window_start) as f64;
            }
        }

        let trigger_delay_error = estimated_delay - delays[n - 1];

        #[cfg(feature = "log")]
        log::info!(
            "{} estimated remote delay: {:.6}, trigger delay error: {:.6}",
            self.conn.name,
            estimated_delay,
            trigger_delay_error
        );
        #[cfg(not(feature = "log"))]
        let _ = &self.conn.name;

        Ok(TriggerOutcome {
            remote_trigger_sent_at,
            estimated_delay,
            trigger_delay_error,
            delays: DelaySamples { offsets, delays },
        })
    }

    /// Sends the `QUIT` opcode, asking the server to terminate.
    pub fn shutdown_server(&mut self) -> Result<()> {
        protocol::send_quit(&mut self.conn.stream)
    }

    pub fn close(&mut self) {
        self.conn.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn trigger_rejects_too_few_trials_before_sending_anything() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        // Accept once so `connect` below succeeds, then drop the listener's own handling:
        // a trial-count rejection must happen before any byte is written, so the peer never
        // needs to reply for this test to be meaningful.
        let accept_thread = std::thread::spawn(move || listener.accept());

        let mut client = TriggerClient::connect("127.0.0.1", port).unwrap();
        accept_thread.join().unwrap().unwrap();

        let result = client.trigger(ESTIMATE_WINDOW + 1, || {});
        assert_eq!(result.unwrap_err(), Error::InvalidTrialCount);
    }
}
