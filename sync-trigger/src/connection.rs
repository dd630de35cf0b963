//! Shared socket/status/name state for the two trigger-wire clients.
//!
//! [`crate::ntp_client::NtpStyleClient`] and [`crate::trigger_client::TriggerClient`] are not
//! related by inheritance; they each hold one of these instead of sharing a base class.

use std::net::TcpStream;

use crate::error::{Error, Result};
use crate::status::{SharedStatus, StatusHandler, StatusKind};

pub(crate) struct Connection {
    pub(crate) stream: TcpStream,
    pub(crate) status: SharedStatus,
    pub(crate) name: String,
}

impl Connection {
    pub(crate) fn connect(host: &str, port: u16, name: impl Into<String>) -> Result<Connection> {
        let stream = TcpStream::connect((host, port)).map_err(|_| Error::Network)?;
        let status = SharedStatus::default();
        status.set_status(
            StatusKind::Warning,
            format!("Connected to {host}:{port}, but no query yet"),
        );

        Ok(Connection {
            stream,
            status,
            name: name.into(),
        })
    }

    pub(crate) fn close(&mut self) {
        let _ = self.stream.shutdown(std::net::Shutdown::Both);
        self.status.set_status(StatusKind::Error, "Closed");
    }
}
