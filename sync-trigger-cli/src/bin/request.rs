use clap::Parser;
use log::{info, LevelFilter};

use sync_trigger::ntp_client::NtpStyleClient;
use sync_trigger::protocol::DEFAULT_PORT;

/// Connects to a sync-trigger server and reports the estimated clock offset and round-trip
/// delay over a number of trials.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Hostname or address of the trigger server.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// TCP port the server is listening on.
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Number of echo trials to run.
    #[arg(short, long, default_value_t = 10)]
    trials: usize,

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

    let mut client = NtpStyleClient::connect(&args.host, args.port, "sync-trigger-request")
        .expect("failed to connect to trigger server");

    let samples = client
        .request(args.trials)
        .expect("request failed");

    info!(
        "offset={:.6}s delay(median)={:.6}s delay(std)={:.6}s [{} trials]",
        samples.representative_offset(),
        samples.median_delay(),
        samples.std_delay(),
        args.trials
    );

    client.close();
}
