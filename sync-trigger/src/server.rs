//! TCP trigger server: accepts one connection at a time, dispatches each request byte to a
//! callback, and replies with the three timestamps bracketing that callback's execution.

use std::io::Read;
use std::net::{Shutdown, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::clock;
use crate::error::{Error, Result};
use crate::protocol::{self, Opcode, ReplyTimestamps, BUFFER_SIZE};
use crate::status::{SharedStatus, StatusHandler, StatusKind};

#[cfg(feature = "log")]
use log::{error, info};

/// Configuration for a [`TriggerServer`].
pub struct ServerConfig {
    pub port: u16,
    pub recv_timeout: Duration,
    pub server_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: protocol::DEFAULT_PORT,
            recv_timeout: Duration::from_secs(5),
            server_name: "TriggerServer".to_string(),
        }
    }
}

type Callback = Box<dyn FnMut() + Send>;

/// Routes an [`Opcode`] to one of two stored callbacks.
///
/// Both arms call through exactly one indirect call, so `Cb1` and `Cb2` cost the same to
/// dispatch regardless of which one fires; nothing about which callback ran should leak into
/// the timing of the reply besides the callback's own execution time.
struct Dispatch {
    cb1: Callback,
    cb2: Callback,
}

impl Dispatch {
    fn invoke(&mut self, opcode: Opcode) {
        let callback = match opcode {
            Opcode::Cb1 => &mut self.cb1,
            Opcode::Cb2 => &mut self.cb2,
            Opcode::Quit => return,
        };
        callback();
    }
}

/// A synchronized trigger server: one TCP listener, served from a dedicated thread.
pub struct TriggerServer {
    config: ServerConfig,
    dispatch: Dispatch,
    status: SharedStatus,
    stop_flag: Arc<AtomicBool>,
}

/// A running server; drop or call [`ServerHandle::stop`] to shut it down.
pub struct ServerHandle {
    join: std::thread::JoinHandle<()>,
    stop_flag: Arc<AtomicBool>,
}

impl ServerHandle {
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::Relaxed);
    }

    pub fn join(self) {
        let _ = self.join.join();
    }
}

impl TriggerServer {
    /// Creates a server. `cb1`/`cb2` default to no-ops if omitted.
    pub fn new(
        config: ServerConfig,
        cb1: Option<Callback>,
        cb2: Option<Callback>,
    ) -> TriggerServer {
        TriggerServer {
            config,
            dispatch: Dispatch {
                cb1: cb1.unwrap_or_else(|| Box::new(|| {})),
                cb2: cb2.unwrap_or_else(|| Box::new(|| {})),
            },
            status: SharedStatus::default(),
            stop_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn status(&self) -> SharedStatus {
        self.status.clone()
    }

    /// Binds the listener and measures reply-encoding overhead, without yet accepting
    /// connections. Exposed separately so callers can detect a bind failure before the
    /// server thread is spawned.
    fn bind(&self) -> Result<TcpListener> {
        let listener =
            TcpListener::bind(("0.0.0.0", self.config.port)).map_err(|_| Error::Network)?;
        listener.set_nonblocking(true).map_err(|_| Error::Network)?;
        Ok(listener)
    }

    /// Spawns the accept/serve loop on its own thread and returns a handle to control it.
    pub fn spawn(mut self) -> Result<ServerHandle> {
        let listener = self.bind()?;
        let ts_encode_time = measure_encode_overhead();
        let status = self.status.clone();
        let stop_flag = self.stop_flag.clone();
        let server_name = self.config.server_name.clone();
        let recv_timeout = self.config.recv_timeout;

        status.set_status(StatusKind::Warning, "Waiting connection...");
        #[cfg(feature = "log")]
        info!("{server_name} listening on port {}", self.config.port);

        let join = std::thread::spawn(move || {
            serve(
                listener,
                &mut self.dispatch,
                &status,
                &stop_flag,
                recv_timeout,
                ts_encode_time,
                &server_name,
            );
        });

        Ok(ServerHandle {
            join,
            stop_flag: self.stop_flag,
        })
    }
}

fn measure_encode_overhead() -> Duration {
    const TRIALS: u32 = 10_000;
    let start = Instant::now();
    for _ in 0..TRIALS {
        let ts = clock::wall_now();
        let _ = ReplyTimestamps {
            t_recv: ts,
            t_cb: ts,
            t_tx: ts,
        }
        .encode();
    }
    start.elapsed() / TRIALS
}

fn serve(
    listener: TcpListener,
    dispatch: &mut Dispatch,
    status: &SharedStatus,
    stop_flag: &AtomicBool,
    recv_timeout: Duration,
    ts_encode_time: Duration,
    server_name: &str,
) {
    while !stop_flag.load(Ordering::Relaxed) {
        let accepted = listener.accept();
        let Ok((mut connection, addr)) = accepted else {
            std::thread::sleep(protocol::ACCEPT_POLL_INTERVAL);
            continue;
        };

        status.set_status(StatusKind::Ok, format!("Connected to {addr}"));
        #[cfg(feature = "log")]
        info!("{server_name} connected to {addr}");

        if connection.set_nonblocking(false).is_err()
            || connection.set_read_timeout(Some(recv_timeout)).is_err()
        {
            status.set_status(StatusKind::Error, "Failed to configure connection");
            continue;
        }

        serve_connection(&mut connection, dispatch, status, stop_flag, ts_encode_time);

        let _ = connection.shutdown(Shutdown::Both);

        if stop_flag.load(Ordering::Relaxed) {
            break;
        }

        status.set_status(StatusKind::Warning, "Waiting connection...");
    }

    status.set_status(StatusKind::Error, "Finished");
    #[cfg(feature = "log")]
    info!("{server_name} finished");
}

fn serve_connection(
    connection: &mut TcpStream,
    dispatch: &mut Dispatch,
    status: &SharedStatus,
    stop_flag: &AtomicBool,
    ts_encode_time: Duration,
) {
    let mut buf = [0u8; BUFFER_SIZE];

    loop {
        if stop_flag.load(Ordering::Relaxed) {
            return;
        }

        let n = match connection.read(&mut buf) {
            Ok(0) => return,
            Ok(n) => n,
            Err(e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                continue;
            }
            Err(_) => return,
        };
        let t_recv = clock::wall_now();
        let _ = n;

        let opcode = match Opcode::try_from(buf[0]) {
            Ok(opcode) => opcode,
            Err(_) => {
                status.set_status(
                    StatusKind::Error,
                    format!("received bad request byte {:#x}", buf[0]),
                );
                #[cfg(feature = "log")]
                error!("bad request byte {:#x}", buf[0]);
                stop_flag.store(true, Ordering::Relaxed);
                return;
            }
        };

        if opcode == Opcode::Quit {
            stop_flag.store(true, Ordering::Relaxed);
            return;
        }

        dispatch.invoke(opcode);
        let t_cb = clock::wall_now();
        let t_tx = clock::wall_now() + ts_encode_time.as_secs_f64();

        let reply = ReplyTimestamps { t_recv, t_cb, t_tx }.encode();
        if std::io::Write::write_all(connection, reply.as_bytes()).is_err() {
            return;
        }
    }
}
