//! Error type shared across the whole crate.

/// Library wide result alias.
pub type Result<T> = core::result::Result<T, Error>;

/// Error conditions produced by `sync-trigger`.
///
/// Mirrors the "one flat enum, no wrapped OS error" approach used throughout this crate:
/// `std::io::Error` is neither `Copy` nor `PartialEq`, which makes it awkward to compare in
/// tests and to pass across thread boundaries without cloning a message string. Every I/O
/// failure is collapsed into [`Error::Network`] instead.
#[non_exhaustive]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Error {
    /// `precision` passed to a PWM operation was outside `0..=9`.
    InvalidPrecision,
    /// A recorder/emitter duration or rate was zero or negative.
    InvalidDuration,
    /// `request`/`trigger` was called with a trial count of zero.
    InvalidTrialCount,
    /// A byte received by the trigger server did not match a known [`crate::protocol::Opcode`].
    InvalidOpcode(u8),
    /// A reply could not be parsed into three timestamps.
    MalformedReply,
    /// A socket operation (connect, send, recv, accept, bind) failed.
    Network,
    /// The peer closed the connection before a full reply was received.
    ConnectionClosed,
    /// No reply arrived within the allotted read timeout.
    Timeout,
}
