//! End-to-end loopback exercises for the trigger server/client pair.

use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sync_trigger::ntp_client::NtpStyleClient;
use sync_trigger::server::{ServerConfig, TriggerServer};
use sync_trigger::trigger_client::TriggerClient;

fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

#[test]
fn ntp_style_request_never_triggers_the_primary_callback() {
    let port = free_port();
    let cb1_calls = Arc::new(AtomicUsize::new(0));
    let cb1_calls_clone = cb1_calls.clone();

    let server = TriggerServer::new(
        ServerConfig {
            port,
            recv_timeout: Duration::from_millis(500),
            server_name: "loopback-ntp".to_string(),
        },
        Some(Box::new(move || {
            cb1_calls_clone.fetch_add(1, Ordering::SeqCst);
        })),
        None,
    );
    let handle = server.spawn().unwrap();
    std::thread::sleep(Duration::from_millis(50));

    let mut client = NtpStyleClient::connect("127.0.0.1", port, "loopback").unwrap();
    let samples = client.request(10).unwrap();

    assert_eq!(samples.offsets.len(), 10);
    assert_eq!(samples.delays.len(), 10);
    assert!(samples.min_delay() <= samples.median_delay());
    assert!(samples.median_delay() <= samples.max_delay());
    assert_eq!(cb1_calls.load(Ordering::SeqCst), 0);

    client.close();
    handle.stop();
    handle.join();
}

#[test]
fn synchronized_trigger_fires_local_and_remote_callbacks_close_together() {
    let port = free_port();
    let remote_fire_at: Arc<Mutex<Option<f64>>> = Arc::new(Mutex::new(None));
    let remote_fire_at_clone = remote_fire_at.clone();

    let server = TriggerServer::new(
        ServerConfig {
            port,
            recv_timeout: Duration::from_millis(500),
            server_name: "loopback-trigger".to_string(),
        },
        Some(Box::new(move || {
            *remote_fire_at_clone.lock().unwrap() = Some(sync_trigger::clock::wall_now());
        })),
        None,
    );
    let handle = server.spawn().unwrap();
    std::thread::sleep(Duration::from_millis(50));

    let local_fire_at: Arc<Mutex<Option<f64>>> = Arc::new(Mutex::new(None));
    let local_fire_at_clone = local_fire_at.clone();

    let mut client = TriggerClient::connect("127.0.0.1", port).unwrap();
    let outcome = client
        .trigger(20, move || {
            *local_fire_at_clone.lock().unwrap() = Some(sync_trigger::clock::wall_now());
        })
        .unwrap();

    let local_ts = local_fire_at.lock().unwrap().expect("local callback did not fire");
    let remote_ts = remote_fire_at.lock().unwrap().expect("remote callback did not fire");

    let std_dev = outcome.one_way_delay_std();
    let tolerance = (1.5 * std_dev).max(1e-3);
    assert!(
        (local_ts - remote_ts).abs() < tolerance,
        "local/remote fire times differ by {} (tolerance {})",
        (local_ts - remote_ts).abs(),
        tolerance
    );

    client.shutdown_server().ok();
    client.close();
    handle.stop();
    handle.join();
}
