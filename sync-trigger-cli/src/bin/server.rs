use std::time::Duration;

use clap::Parser;
use log::{info, LevelFilter};

use sync_trigger::protocol::DEFAULT_PORT;
use sync_trigger::server::{ServerConfig, TriggerServer};
use sync_trigger::status::StatusHandler;

/// Runs a synchronized trigger server and prints status transitions until interrupted.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// TCP port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Per-connection receive timeout, in milliseconds.
    #[arg(long, default_value_t = 5000)]
    recv_timeout_ms: u64,

    /// Enable verbose (debug level) logging.
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();
    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    simple_logger::SimpleLogger::new()
        .with_level(level)
        .init()
        .expect("failed to initialize logger");

    let config = ServerConfig {
        port: args.port,
        recv_timeout: Duration::from_millis(args.recv_timeout_ms),
        server_name: "sync-trigger-server".to_string(),
    };

    let server = TriggerServer::new(config, None, None);
    let status = server.status();
    let handle = server.spawn().expect("failed to start trigger server");

    info!("press enter (or send EOF) to stop");
    // No signal-handling dependency is pulled in for a minimal CLI: blocking on stdin and
    // treating EOF/newline as the stop signal keeps this binary's dependency footprint the
    // same as the library's.
    let mut line = String::new();
    let _ = std::io::stdin().read_line(&mut line);
    handle.stop();
    handle.join();

    let final_status = status.get_status();
    info!("server stopped: {final_status}");
}
