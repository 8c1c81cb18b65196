//! TCP peripheral client
//!
//! The device side of the control channel: connect, announce a name, then
//! exchange newline-delimited lines with the bridge.

use std::net::SocketAddr;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::error::{ProtocolError, Result};
use crate::protocol::constants::LINE_TERMINATOR;
use crate::protocol::handshake::handshake_line;

/// A connected, named peripheral
///
/// # Example
/// ```no_run
/// use periph_bridge::client::PeripheralClient;
///
/// # async fn example() -> periph_bridge::error::Result<()> {
/// let addr = "127.0.0.1:8080".parse().unwrap();
/// let mut sensor = PeripheralClient::connect(addr, "ULTRASONIC").await?;
///
/// sensor.send_line("DANGER").await?;
/// while let Some(line) = sensor.next_line().await? {
///     println!("Bridge says: {}", line);
/// }
/// # Ok(())
/// # }
/// ```
pub struct PeripheralClient {
    name: String,
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl PeripheralClient {
    /// Connect to the bridge and send the handshake
    pub async fn connect(addr: SocketAddr, name: &str) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ProtocolError::EmptyName.into());
        }

        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let (reader, writer) = stream.into_split();

        let mut client = Self {
            name: name.to_string(),
            lines: BufReader::new(reader).lines(),
            writer,
        };
        client.send_line(&handshake_line(name)).await?;

        tracing::debug!(peripheral = name, addr = %addr, "Connected to bridge");

        Ok(client)
    }

    /// Name sent in the handshake
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Send one line
    pub async fn send_line(&mut self, line: &str) -> Result<()> {
        let mut buf = String::with_capacity(line.len() + LINE_TERMINATOR.len());
        buf.push_str(line);
        buf.push_str(LINE_TERMINATOR);

        self.writer.write_all(buf.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Receive the next line, `None` once the bridge closes the connection
    pub async fn next_line(&mut self) -> Result<Option<String>> {
        Ok(self.lines.next_line().await?)
    }

    /// Close the connection
    pub async fn close(mut self) -> Result<()> {
        self.writer.shutdown().await?;
        tracing::debug!(peripheral = %self.name, "Disconnected from bridge");
        Ok(())
    }
}

impl std::fmt::Debug for PeripheralClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeripheralClient")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
