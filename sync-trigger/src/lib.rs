//! Synchronized remote triggering over TCP, plus a discrete PWM timestamp codec.
//!
//! # Overview
//!
//! This crate lets two processes fire callbacks at (as close as achievable to) the same
//! wall-clock instant, even though they only talk to each other over a TCP socket with
//! ordinary scheduling and network jitter. It does this with an NTP-style four-timestamp
//! exchange ([`ntp_client`]) used to estimate one-way network delay, and a trigger protocol
//! ([`trigger_client`], [`server`]) that schedules the local fire against that estimate with
//! a monotonic-clock busy-wait ([`clock`]).
//!
//! A second, related piece ([`pwm`], [`emitter`], [`recorder`]) lets a value (typically a
//! timestamp) be broadcast on a one-bit output channel as a train of constant-width pulses,
//! and recovered later from a sampled recording of that channel. This is useful when the
//! only link between two systems is a digital input/output pin rather than a network.
//!
//! ## Features
//!
//! - `std` (default): enables functionality that depends on the standard library; this crate
//!   has no meaningful `no_std` mode, since TCP sockets and threads are inherent to the
//!   problem, but the flag is kept for parity with the wider ecosystem's convention of an
//!   explicit `std` feature.
//! - `log` (default): enables library debug/info output via the `log` crate.
//! - `health`: enables the [`health`] module's OS probes, which additionally pull in `chrono`
//!   for parsing hardware-clock output.
//!
//! # Example
//!
//! ```no_run
//! use sync_trigger::server::{ServerConfig, TriggerServer};
//! use sync_trigger::ntp_client::NtpStyleClient;
//!
//! let server = TriggerServer::new(ServerConfig::default(), None, None);
//! let handle = server.spawn().unwrap();
//!
//! let mut client = NtpStyleClient::connect("127.0.0.1", 8888, "example").unwrap();
//! let samples = client.request(10).unwrap();
//! println!("offset: {}", samples.representative_offset());
//!
//! handle.stop();
//! handle.join();
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

mod connection;
#[cfg(test)]
mod test_support;

pub mod clock;
pub mod emitter;
pub mod error;
#[cfg(feature = "health")]
pub mod health;
pub mod ntp_client;
pub mod protocol;
pub mod pwm;
pub mod recorder;
pub mod server;
pub mod status;
pub mod trigger_client;

pub use error::{Error, Result};
