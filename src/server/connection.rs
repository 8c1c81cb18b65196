//! Per-connection task
//!
//! Reads newline-delimited lines from one peripheral, runs them through the
//! session state machine, and publishes the resulting events. On EOF or a
//! read error it closes the transport, releases the name and announces the
//! disconnect.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncRead;
use tokio::sync::broadcast;
use tokio::time::Instant;

use crate::error::Result;
use crate::protocol::line::ControlEvent;
use crate::registry::{ClientRegistry, PeripheralConnection};
use crate::server::config::ServerConfig;
use crate::server::lines::{LineReader, ReadLine};
use crate::session::{DropReason, LineAction, SessionState};
use crate::stats::ServerCounters;

/// One peripheral connection's read side
pub(crate) struct Connection<R> {
    state: SessionState,
    lines: LineReader<R>,
    handshake_timeout: Duration,
    handle: Arc<PeripheralConnection>,
    registry: Arc<ClientRegistry>,
    events: broadcast::Sender<ControlEvent>,
    counters: Arc<ServerCounters>,
}

impl<R: AsyncRead + Unpin> Connection<R> {
    pub(crate) fn new(
        reader: R,
        handle: Arc<PeripheralConnection>,
        config: &ServerConfig,
        registry: Arc<ClientRegistry>,
        events: broadcast::Sender<ControlEvent>,
        counters: Arc<ServerCounters>,
    ) -> Self {
        Self {
            state: SessionState::new(handle.id(), handle.peer_addr()),
            lines: LineReader::new(reader, config.max_line_length),
            handshake_timeout: config.connection_timeout,
            handle,
            registry,
            events,
            counters,
        }
    }

    /// Run until the peer disconnects
    ///
    /// Cleanup runs whether the loop ended on EOF or on an error; the error is
    /// returned afterwards for logging.
    pub(crate) async fn run(&mut self) -> Result<()> {
        let result = self.read_loop().await;
        self.finish().await;
        result
    }

    async fn read_loop(&mut self) -> Result<()> {
        let deadline = Instant::now() + self.handshake_timeout;

        loop {
            let next = if self.state.is_registered() {
                self.lines.next_line().await?
            } else {
                match tokio::time::timeout_at(deadline, self.lines.next_line()).await {
                    Ok(next) => next?,
                    Err(_) => {
                        tracing::warn!(
                            session_id = self.state.id,
                            peer = %self.state.peer_addr,
                            timeout_ms = self.handshake_timeout.as_millis() as u64,
                            "No handshake in time, closing"
                        );
                        return Ok(());
                    }
                }
            };

            let action = match next {
                Some(ReadLine::Text(line)) => self.state.on_line(&line),
                Some(ReadLine::TooLong(len)) => self.state.on_oversized(len),
                None => return Ok(()),
            };

            match action {
                LineAction::Register(name) => self.register(name).await,
                LineAction::Publish(event) => {
                    tracing::trace!(session_id = self.state.id, event = %event, "Line received");
                    self.publish(event);
                }
                LineAction::Drop(reason) => self.dropped(reason),
            }
        }
    }

    async fn register(&mut self, name: String) {
        self.handle.set_name(&name);
        self.registry.register(&name, Arc::clone(&self.handle)).await;

        tracing::info!(
            session_id = self.state.id,
            peer = %self.state.peer_addr,
            peripheral = %name,
            "Handshake complete"
        );

        self.publish(ControlEvent::iam(&name));
    }

    fn dropped(&self, reason: DropReason) {
        match reason {
            DropReason::BeforeHandshake(line) => tracing::warn!(
                session_id = self.state.id,
                peer = %self.state.peer_addr,
                line = %line,
                "Line before handshake, dropping"
            ),
            DropReason::RepeatedHandshake => tracing::warn!(
                session_id = self.state.id,
                peripheral = ?self.state.name(),
                "Repeated handshake ignored"
            ),
            DropReason::TooLong(len) => tracing::warn!(
                session_id = self.state.id,
                peer = %self.state.peer_addr,
                len = len,
                "Line too long, dropping"
            ),
            DropReason::Empty | DropReason::Closed => {}
        }
    }

    fn publish(&self, event: ControlEvent) {
        // Err only means nobody is subscribed right now
        let _ = self.events.send(event);
    }

    /// Release the name and announce the disconnect
    ///
    /// A connection whose name was taken over by a reconnect leaves the newer
    /// entry in place and publishes nothing, so the peripheral does not look
    /// disconnected while it is still reachable.
    async fn finish(&mut self) {
        self.state.close();

        let released = match self.state.name() {
            Some(name) => self.registry.unregister(name, &self.handle).await,
            None => false,
        };

        self.handle.close().await;

        if released {
            if let Some(name) = self.state.name() {
                self.publish(ControlEvent::disconnected(name));
            }
        }

        self.counters
            .add_lines(self.state.lines_received, self.state.lines_dropped);

        tracing::info!(
            session_id = self.state.id,
            peripheral = ?self.state.name(),
            duration_ms = self.state.duration().as_millis() as u64,
            lines = self.state.lines_received,
            "Peripheral disconnected"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};

    use super::*;
    use crate::protocol::line::EventTag;

    struct Harness {
        registry: Arc<ClientRegistry>,
        events: broadcast::Sender<ControlEvent>,
        rx: broadcast::Receiver<ControlEvent>,
        counters: Arc<ServerCounters>,
        config: ServerConfig,
    }

    impl Harness {
        fn new() -> Self {
            let (events, rx) = broadcast::channel(16);
            Self {
                registry: Arc::new(ClientRegistry::new()),
                events,
                rx,
                counters: Arc::new(ServerCounters::default()),
                config: ServerConfig::default(),
            }
        }

        fn connection<R: AsyncRead + Unpin>(&self, id: u64, reader: R) -> (Connection<R>, Arc<PeripheralConnection>) {
            let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 40000);
            let handle = Arc::new(PeripheralConnection::new(id, addr, tokio::io::sink()));
            let conn = Connection::new(
                reader,
                Arc::clone(&handle),
                &self.config,
                Arc::clone(&self.registry),
                self.events.clone(),
                Arc::clone(&self.counters),
            );
            (conn, handle)
        }

        fn drain(&mut self) -> Vec<ControlEvent> {
            let mut out = Vec::new();
            while let Ok(event) = self.rx.try_recv() {
                out.push(event);
            }
            out
        }
    }

    #[tokio::test]
    async fn test_handshake_then_lines() {
        let mut h = Harness::new();
        let input: &[u8] = b"IAM:ULTRASONIC\nDANGER\r\n87.5\n";
        let (mut conn, handle) = h.connection(1, input);

        conn.run().await.unwrap();

        let events = h.drain();
        assert_eq!(events.len(), 4);
        assert_eq!(events[0], ControlEvent::iam("ULTRASONIC"));
        assert!(events[1].is_reading("DANGER"));
        assert_eq!(events[2].distance_cm(), Some(87.5));
        assert_eq!(events[3], ControlEvent::disconnected("ULTRASONIC"));

        assert_eq!(handle.name(), Some("ULTRASONIC"));
        assert!(!handle.is_open());
        assert!(h.registry.get("ULTRASONIC").await.is_none());
        assert_eq!(h.counters.snapshot().lines_received, 3);
    }

    #[tokio::test]
    async fn test_lines_before_handshake_are_dropped() {
        let mut h = Harness::new();
        let input: &[u8] = b"BUTTON_1_PRESSED\nIAM:BUTTON\nBUTTON_2_PRESSED\n";
        let (mut conn, _) = h.connection(1, input);

        conn.run().await.unwrap();

        let events = h.drain();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].tag(), EventTag::Iam);
        assert_eq!(events[1].payload(), "BUTTON_2_PRESSED");
        assert_eq!(events[2].tag(), EventTag::ClientDisconnected);
        assert_eq!(h.counters.snapshot().lines_dropped, 1);
    }

    #[tokio::test]
    async fn test_never_named_connection_publishes_nothing() {
        let mut h = Harness::new();
        let input: &[u8] = b"hello\nworld\n";
        let (mut conn, _) = h.connection(1, input);

        conn.run().await.unwrap();

        assert!(h.drain().is_empty());
        assert!(h.registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_registered_connection_visible_while_open() {
        let mut h = Harness::new();
        let (client, server) = tokio::io::duplex(64);
        let (mut conn, handle) = h.connection(1, server);

        let task = tokio::spawn(async move { conn.run().await });

        let mut client = client;
        tokio::io::AsyncWriteExt::write_all(&mut client, b"IAM:BUTTON\n")
            .await
            .unwrap();

        let event = h.rx.recv().await.unwrap();
        assert_eq!(event, ControlEvent::iam("BUTTON"));
        let found = h.registry.get("BUTTON").await.unwrap();
        assert!(Arc::ptr_eq(&found, &handle));

        drop(client);
        task.await.unwrap().unwrap();
        assert!(h.registry.get("BUTTON").await.is_none());
    }

    #[tokio::test]
    async fn test_superseded_connection_does_not_evict_reconnect() {
        let mut h = Harness::new();
        let (mut old_conn, _) = h.connection(1, &b"IAM:BUTTON\n"[..]);

        // Newer connection claims the name before the old one notices EOF
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 40001);
        let newer = Arc::new(PeripheralConnection::new(2, addr, tokio::io::sink()));

        // Run the old read loop up to EOF, re-registering the name midway
        old_conn.read_loop().await.unwrap();
        h.registry.register("BUTTON", Arc::clone(&newer)).await;
        old_conn.finish().await;

        let found = h.registry.get("BUTTON").await.unwrap();
        assert!(Arc::ptr_eq(&found, &newer));

        let events = h.drain();
        assert_eq!(events, vec![ControlEvent::iam("BUTTON")]);
    }

    #[tokio::test]
    async fn test_read_error_still_cleans_up() {
        let mut h = Harness::new();
        let mock = tokio_test::io::Builder::new()
            .read(b"IAM:CAMERA\n")
            .read_error(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
            .build();
        let (mut conn, handle) = h.connection(1, mock);

        assert!(conn.run().await.is_err());

        let events = h.drain();
        assert_eq!(events.last(), Some(&ControlEvent::disconnected("CAMERA")));
        assert!(!handle.is_open());
        assert!(h.registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_does_not_end_connection() {
        let mut h = Harness::new();
        let input: &[u8] = b"IAM:ULTRASONIC\n\xff\xfe noise\nDANGER\n";
        let (mut conn, _) = h.connection(1, input);

        conn.run().await.unwrap();

        let events = h.drain();
        assert_eq!(events.len(), 4);
        assert_eq!(events[1].payload(), "\u{FFFD}\u{FFFD} noise");
        assert!(events[2].is_reading("DANGER"));
        assert_eq!(events[3], ControlEvent::disconnected("ULTRASONIC"));
    }

    #[tokio::test]
    async fn test_oversized_line_dropped() {
        let mut h = Harness::new();
        h.config = ServerConfig::default().max_line_length(16);

        let mut builder = tokio_test::io::Builder::new();
        builder.read(b"IAM:BUTTON\n");
        for _ in 0..8 {
            builder.read(&[b'x'; 64]);
        }
        builder.read(b"\nBUTTON_1_PRESSED\n");
        let (mut conn, _) = h.connection(1, builder.build());

        conn.run().await.unwrap();

        let events = h.drain();
        assert_eq!(events.len(), 3);
        assert_eq!(events[1].payload(), "BUTTON_1_PRESSED");
        assert_eq!(h.counters.snapshot().lines_dropped, 1);
    }

    #[tokio::test]
    async fn test_handshake_deadline() {
        let mut h = Harness::new();
        h.config = ServerConfig::default().connection_timeout(Duration::from_millis(50));

        // Peer stays connected but never names itself
        let (_client, server) = tokio::io::duplex(64);
        let (mut conn, handle) = h.connection(1, server);

        tokio::time::timeout(Duration::from_secs(2), conn.run())
            .await
            .expect("handshake deadline not enforced")
            .unwrap();

        assert!(!handle.is_open());
        assert!(h.drain().is_empty());
    }

    #[tokio::test]
    async fn test_deadline_does_not_apply_after_handshake() {
        let mut h = Harness::new();
        h.config = ServerConfig::default().connection_timeout(Duration::from_millis(50));

        let (mut client, server) = tokio::io::duplex(64);
        let (mut conn, _) = h.connection(1, server);
        let task = tokio::spawn(async move { conn.run().await });

        tokio::io::AsyncWriteExt::write_all(&mut client, b"IAM:BUTTON\n")
            .await
            .unwrap();
        assert_eq!(h.rx.recv().await.unwrap(), ControlEvent::iam("BUTTON"));

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(!task.is_finished());
        assert!(h.registry.contains("BUTTON").await);

        drop(client);
        task.await.unwrap().unwrap();
    }
}
