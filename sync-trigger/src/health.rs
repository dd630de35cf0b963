//! Best-effort OS health probes: RTC presence, hardware clock reading, NTP daemon status.
//!
//! These are genuinely peripheral to the trigger/PWM core; nothing in [`crate::server`],
//! [`crate::ntp_client`] or [`crate::trigger_client`] depends on this module. It exists so a
//! deployment can ask "is this host's time source trustworthy" alongside the measured
//! clock offset.

use crate::status::Status;

#[cfg(unix)]
mod unix;

/// A single best-effort check of some aspect of host time-keeping health.
pub trait HealthProbe {
    fn check(&self) -> Status;
}

/// Checks for the presence of a real-time clock device.
pub struct RtcPresence;

/// Reads the hardware clock via the `hwclock` utility.
pub struct HardwareClockReading;

/// Inspects the local NTP daemon's peer association via `ntpq -p`.
pub struct NtpDaemonStatus;

#[cfg(unix)]
impl HealthProbe for RtcPresence {
    fn check(&self) -> Status {
        unix::rtc_presence()
    }
}

#[cfg(unix)]
impl HealthProbe for HardwareClockReading {
    fn check(&self) -> Status {
        unix::hardware_clock_reading()
    }
}

#[cfg(unix)]
impl HealthProbe for NtpDaemonStatus {
    fn check(&self) -> Status {
        unix::ntp_daemon_status()
    }
}
