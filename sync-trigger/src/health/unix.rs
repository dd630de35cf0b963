//! Unix implementations of the [`super::HealthProbe`]s.

use std::process::Command;

use chrono::DateTime;

use crate::status::{Status, StatusKind};

pub(super) fn rtc_presence() -> Status {
    let Ok(entries) = std::fs::read_dir("/dev") else {
        return Status::new(StatusKind::Warning, "Could not read /dev");
    };

    let found = entries
        .filter_map(|e| e.ok())
        .any(|e| e.file_name().to_string_lossy().starts_with("rtc"));

    if found {
        Status::new(StatusKind::Ok, "RTC device present")
    } else {
        Status::new(StatusKind::Warning, "No RTC device found under /dev")
    }
}

pub(super) fn hardware_clock_reading() -> Status {
    let output = Command::new("hwclock").arg("--show").output();

    match output {
        Ok(output) if output.status.success() => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let reading = stdout.trim();
            if DateTime::parse_from_str(reading, "%Y-%m-%d %H:%M:%S%.f %z").is_ok() {
                Status::new(StatusKind::Ok, format!("Hardware clock reads {reading}"))
            } else {
                Status::new(StatusKind::Warning, format!("Unparseable hwclock output: {reading}"))
            }
        }
        Ok(output) => Status::new(
            StatusKind::Error,
            format!("hwclock exited with {}", output.status),
        ),
        Err(e) => Status::new(StatusKind::Error, format!("failed to run hwclock: {e}")),
    }
}

pub(super) fn ntp_daemon_status() -> Status {
    let output = Command::new("ntpq").arg("-p").output();

    let Ok(output) = output else {
        return Status::new(StatusKind::Error, "ntpq not available");
    };
    if !output.status.success() {
        return Status::new(StatusKind::Error, "ntp daemon is not enabled");
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let has_ntp_peer = stdout
        .lines()
        .skip(2)
        .any(|line| line.starts_with('*') || line.starts_with('+'));

    if has_ntp_peer {
        Status::new(StatusKind::Ok, "NTP daemon enabled with an active NTP peer")
    } else {
        Status::new(
            StatusKind::Warning,
            "NTP daemon enabled but no NTP-type peer is synchronized",
        )
    }
}
