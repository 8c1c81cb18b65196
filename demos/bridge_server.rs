//! Peripheral bridge example
//!
//! Run with: cargo run --example bridge_server [HOST]
//!
//! Examples:
//!   cargo run --example bridge_server              # TCP 0.0.0.0:8080, UDP 0.0.0.0:44444
//!   cargo run --example bridge_server localhost    # TCP 127.0.0.1:8080, UDP 127.0.0.1:44444
//!
//! ## Connecting a peripheral by hand
//!
//!   nc localhost 8080
//!   IAM:ULTRASONIC
//!   DANGER
//!
//! A second `nc` announcing `IAM:BUTTON` receives `ALARM_ON` / `ALARM_OFF`.
//!
//! ## Simulated peripherals
//!
//!   cargo run --example peripheral_sim

use std::net::IpAddr;

use periph_bridge::protocol::constants::{DEFAULT_TCP_PORT, DEFAULT_UDP_PORT};
use periph_bridge::{BridgeConfig, PeripheralBridge, ReceiverConfig, ServerConfig};

fn parse_host(arg: &str) -> Result<IpAddr, String> {
    let normalized = arg.replace("localhost", "127.0.0.1");

    normalized
        .parse::<IpAddr>()
        .map_err(|_| format!("Invalid host: '{}'. Expected an IP address or 'localhost'", arg))
}

fn print_usage() {
    eprintln!("Usage: bridge_server [HOST]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  HOST    Address to bind both channels to (default: 0.0.0.0)");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let host = match args.get(1) {
        Some(arg) => match parse_host(arg) {
            Ok(host) => host,
            Err(e) => {
                eprintln!("Error: {}", e);
                eprintln!();
                print_usage();
                std::process::exit(1);
            }
        },
        None => IpAddr::from([0, 0, 0, 0]),
    };

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("periph_bridge=debug".parse()?)
                .add_directive("bridge_server=debug".parse()?),
        )
        .init();

    let config = BridgeConfig::default()
        .server(ServerConfig::with_addr((host, DEFAULT_TCP_PORT).into()))
        .receiver(ReceiverConfig::with_addr((host, DEFAULT_UDP_PORT).into()));

    let bridge = PeripheralBridge::new(config);
    let addrs = bridge.start().await?;

    println!("Control channel (TCP): {}", addrs.control);
    println!("Video channel (UDP):   {}", addrs.video);
    println!();

    let mut events = bridge.subscribe_events();
    let mut frames = bridge.subscribe_frames();

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => println!("[event] {:<24} from {:?}", event.to_string(), event.source()),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Event display lagging");
                }
                Err(_) => break,
            },
            changed = frames.changed() => {
                if changed.is_err() {
                    break;
                }
                if let Some(frame) = frames.borrow_and_update().clone() {
                    println!(
                        "[frame] id={} bytes={} jpeg={}",
                        frame.frame_id,
                        frame.len(),
                        frame.looks_like_jpeg()
                    );
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("\nShutting down...");
                break;
            }
        }
    }

    bridge.shutdown().await;
    println!("Stats: {:?}", bridge.server_stats());
    println!("Stats: {:?}", bridge.reassembly_stats());

    Ok(())
}
