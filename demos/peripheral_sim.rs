//! Simulated peripherals
//!
//! Run with: cargo run --example peripheral_sim [HOST]
//!
//! Connects a button, an ultrasonic sensor and a camera to a running
//! `bridge_server`. The sensor walks a distance towards the button and back,
//! reporting `DANGER` when close and `SAFE` once clear; the camera streams a
//! fake JPEG every 200ms.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};
use periph_bridge::client::{CameraStreamer, PeripheralClient};
use periph_bridge::protocol::constants::{
    BUTTON_PERIPHERAL, DEFAULT_TCP_PORT, DEFAULT_UDP_PORT, ULTRASONIC_PERIPHERAL,
};
use periph_bridge::Thresholds;

fn fake_jpeg(seq: u32, size: usize) -> Bytes {
    let mut buf = BytesMut::with_capacity(size);
    buf.put_slice(&[0xFF, 0xD8, 0xFF]);
    while buf.len() < size.saturating_sub(2) {
        buf.put_u32(seq);
    }
    buf.put_slice(&[0xFF, 0xD9]);
    buf.freeze()
}

async fn run_button(addr: SocketAddr) -> periph_bridge::Result<()> {
    let mut button = PeripheralClient::connect(addr, BUTTON_PERIPHERAL).await?;

    while let Some(line) = button.next_line().await? {
        println!("[button] {}", line);
    }

    Ok(())
}

async fn run_sensor(addr: SocketAddr) -> periph_bridge::Result<()> {
    let mut sensor = PeripheralClient::connect(addr, ULTRASONIC_PERIPHERAL).await?;
    let thresholds = Thresholds::default();
    let mut danger = false;

    let distances = (0..20).map(|i| 200.0 - i as f32 * 10.0).chain((0..20).map(|i| i as f32 * 10.0));

    for distance in distances {
        sensor.send_line(&format!("ULTRASONIC:{:.1}", distance)).await?;

        let close = distance < thresholds.front_cm;
        if close != danger {
            danger = close;
            sensor.send_line(if danger { "DANGER" } else { "SAFE" }).await?;
        }

        tokio::time::sleep(Duration::from_millis(250)).await;
    }

    sensor.close().await
}

async fn run_camera(target: SocketAddr) -> periph_bridge::Result<()> {
    let mut camera = CameraStreamer::bind(SocketAddr::from(([0, 0, 0, 0], 0)), target).await?;

    for seq in 0..50 {
        let frame_id = camera.send_frame(&fake_jpeg(seq, 8 * 1024)).await?;
        tracing::debug!(frame_id = frame_id, "Camera frame sent");
        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("periph_bridge=debug".parse()?)
                .add_directive("peripheral_sim=debug".parse()?),
        )
        .init();

    let host: IpAddr = match std::env::args().nth(1) {
        Some(arg) => arg.replace("localhost", "127.0.0.1").parse()?,
        None => IpAddr::from([127, 0, 0, 1]),
    };

    let control = SocketAddr::new(host, DEFAULT_TCP_PORT);
    let video = SocketAddr::new(host, DEFAULT_UDP_PORT);

    let button = tokio::spawn(run_button(control));
    // Give the button time to register before the first reading
    tokio::time::sleep(Duration::from_millis(200)).await;

    let (sensor, camera) = tokio::join!(run_sensor(control), run_camera(video));
    sensor?;
    camera?;

    button.abort();
    println!("Simulation finished");

    Ok(())
}
