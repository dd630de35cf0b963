//! Wire protocol shared by [`crate::server`], [`crate::ntp_client`] and [`crate::trigger_client`].

use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use crate::error::{Error, Result};

/// Default TCP port the trigger server listens on.
pub const DEFAULT_PORT: u16 = 8888;
/// Size, in bytes, of both the request and reply buffers.
pub const BUFFER_SIZE: usize = 64;
/// Hard cap on how long a client waits for a reply before raising [`Error::Timeout`].
pub const REPLY_TIMEOUT: Duration = Duration::from_secs(1);
/// How long the server's `accept` polls before checking its stop flag.
pub const ACCEPT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// A single-byte request understood by the trigger server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// Invoke the server's primary callback before replying.
    Cb1,
    /// Invoke the server's secondary (dummy) callback before replying.
    Cb2,
    /// Terminate the server; no reply is sent for this opcode.
    Quit,
}

impl Opcode {
    const CB1_BYTE: u8 = b'0';
    const CB2_BYTE: u8 = b'1';
    const QUIT_BYTE: u8 = b'2';
}

impl TryFrom<u8> for Opcode {
    type Error = Error;

    fn try_from(byte: u8) -> Result<Opcode> {
        match byte {
            Opcode::CB1_BYTE => Ok(Opcode::Cb1),
            Opcode::CB2_BYTE => Ok(Opcode::Cb2),
            Opcode::QUIT_BYTE => Ok(Opcode::Quit),
            other => Err(Error::InvalidOpcode(other)),
        }
    }
}

impl From<Opcode> for u8 {
    fn from(opcode: Opcode) -> u8 {
        match opcode {
            Opcode::Cb1 => Opcode::CB1_BYTE,
            Opcode::Cb2 => Opcode::CB2_BYTE,
            Opcode::Quit => Opcode::QUIT_BYTE,
        }
    }
}

/// The three timestamps carried by a server reply.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplyTimestamps {
    pub t_recv: f64,
    pub t_cb: f64,
    pub t_tx: f64,
}

impl ReplyTimestamps {
    pub fn encode(self) -> String {
        format!("{} {} {}", self.t_recv, self.t_cb, self.t_tx)
    }

    pub fn parse(raw: &str) -> Result<ReplyTimestamps> {
        let mut parts = raw.trim().split(' ');
        let (Some(a), Some(b), Some(c), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(Error::MalformedReply);
        };

        let parse_one = |s: &str| s.parse::<f64>().map_err(|_| Error::MalformedReply);

        Ok(ReplyTimestamps {
            t_recv: parse_one(a)?,
            t_cb: parse_one(b)?,
            t_tx: parse_one(c)?,
        })
    }
}

/// Sends one opcode byte and blocks for the three-timestamp reply, applying
/// [`REPLY_TIMEOUT`] to the read.
pub fn send_opcode(stream: &mut TcpStream, opcode: Opcode) -> Result<ReplyTimestamps> {
    write_opcode_byte(stream, opcode)?;
    read_reply(stream)
}

/// Writes a single opcode byte without waiting for the reply.
///
/// Split out from [`send_opcode`] so callers that need to act between the request being
/// sent and the reply arriving (the trigger client's final trial) can do so.
pub fn write_opcode_byte(stream: &mut TcpStream, opcode: Opcode) -> Result<()> {
    stream.write_all(&[u8::from(opcode)]).map_err(|_| Error::Network)
}

/// Blocks for a three-timestamp reply, applying [`REPLY_TIMEOUT`] to the read.
pub fn read_reply(stream: &mut TcpStream) -> Result<ReplyTimestamps> {
    stream
        .set_read_timeout(Some(REPLY_TIMEOUT))
        .map_err(|_| Error::Network)?;

    let mut buf = [0u8; BUFFER_SIZE];
    let n = match stream.read(&mut buf) {
        Ok(0) => return Err(Error::ConnectionClosed),
        Ok(n) => n,
        Err(e)
            if e.kind() == std::io::ErrorKind::WouldBlock
                || e.kind() == std::io::ErrorKind::TimedOut =>
        {
            return Err(Error::Timeout)
        }
        Err(_) => return Err(Error::Network),
    };

    let raw = std::str::from_utf8(&buf[..n]).map_err(|_| Error::MalformedReply)?;
    ReplyTimestamps::parse(raw)
}

/// Sends the `QUIT` opcode and does not wait for a reply (the server sends none).
pub fn send_quit(stream: &mut TcpStream) -> Result<()> {
    stream
        .write_all(&[u8::from(Opcode::Quit)])
        .map_err(|_| Error::Network)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_round_trips_through_its_byte() {
        for opcode in [Opcode::Cb1, Opcode::Cb2, Opcode::Quit] {
            assert_eq!(Opcode::try_from(u8::from(opcode)).unwrap(), opcode);
        }
    }

    #[test]
    fn unknown_byte_is_rejected() {
        assert_eq!(Opcode::try_from(b'9'), Err(Error::InvalidOpcode(b'9')));
    }

    #[test]
    fn reply_timestamps_round_trip_through_the_wire_format() {
        let ts = ReplyTimestamps {
            t_recv: 1.5,
            t_cb: 1.6,
            t_tx: 1.7,
        };
        let parsed = ReplyTimestamps::parse(&ts.encode()).unwrap();
        assert_eq!(parsed, ts);
    }

    #[test]
    fn malformed_reply_is_rejected() {
        assert_eq!(
            ReplyTimestamps::parse("not-a-reply"),
            Err(Error::MalformedReply)
        );
        assert_eq!(ReplyTimestamps::parse("1.0 2.0"), Err(Error::MalformedReply));
    }
}
