//! Shared `(kind, message)` status triple used by the server and both clients.

use core::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex};

/// Coarse health indicator attached to every [`Status`].
///
/// The discriminants are fixed and are not ordered by severity: `Warning` is neither
/// "worse" nor "better" than `Error` in this scheme, so do not compare variants with `<`/`>`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum StatusKind {
    Error = 0,
    Ok = 1,
    Warning = 2,
}

impl Display for StatusKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        let label = match self {
            StatusKind::Error => "ERROR",
            StatusKind::Ok => "Ok",
            StatusKind::Warning => "Warning",
        };

        write!(f, "{label}")
    }
}

/// A status kind paired with a human readable message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub kind: StatusKind,
    pub message: String,
}

impl Status {
    pub fn new(kind: StatusKind, message: impl Into<String>) -> Self {
        Status {
            kind,
            message: message.into(),
        }
    }

    pub fn idle() -> Self {
        Status::new(StatusKind::Error, "Idle")
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Publishes and reads a [`Status`].
///
/// Implemented by [`SharedStatus`]; kept as a trait so a caller embedding this crate into a
/// larger service can route status updates into their own observability stack instead.
pub trait StatusHandler {
    fn set_status(&self, kind: StatusKind, message: impl Into<String>);
    fn get_status(&self) -> Status;
}

/// Thread-shared [`Status`] cell, cloned cheaply across the worker thread and its observers.
#[derive(Debug, Clone)]
pub struct SharedStatus(Arc<Mutex<Status>>);

impl SharedStatus {
    pub fn new(initial: Status) -> Self {
        SharedStatus(Arc::new(Mutex::new(initial)))
    }
}

impl Default for SharedStatus {
    fn default() -> Self {
        SharedStatus::new(Status::idle())
    }
}

impl StatusHandler for SharedStatus {
    fn set_status(&self, kind: StatusKind, message: impl Into<String>) {
        let mut guard = self.0.lock().expect("status mutex poisoned");
        *guard = Status::new(kind, message);
    }

    fn get_status(&self) -> Status {
        self.0.lock().expect("status mutex poisoned").clone()
    }
}
