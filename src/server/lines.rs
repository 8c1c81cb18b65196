//! Bounded line reader
//!
//! Splits a byte stream on `\n` like `AsyncBufReadExt::lines`, with two
//! differences: invalid UTF-8 is replaced instead of failing the stream, and
//! a line longer than the limit is skipped without being buffered.

use std::io;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

/// One unit read from the stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ReadLine {
    /// A line without its terminator
    Text(String),
    /// A line over the limit; carries the number of bytes discarded
    TooLong(usize),
}

pub(crate) struct LineReader<R> {
    reader: BufReader<R>,
    buf: Vec<u8>,
    max_line_length: usize,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub(crate) fn new(reader: R, max_line_length: usize) -> Self {
        Self {
            reader: BufReader::new(reader),
            buf: Vec::new(),
            max_line_length,
        }
    }

    /// Read the next line, `None` at EOF
    ///
    /// A final line without a terminator is still returned.
    pub(crate) async fn next_line(&mut self) -> io::Result<Option<ReadLine>> {
        self.buf.clear();
        let mut discarded = 0usize;
        let mut read_any = false;

        loop {
            let available = self.reader.fill_buf().await?;
            if available.is_empty() {
                break;
            }
            read_any = true;

            let (len, complete) = match available.iter().position(|&b| b == b'\n') {
                Some(i) => (i + 1, true),
                None => (available.len(), false),
            };

            if discarded > 0 {
                discarded += len;
            } else if self.buf.len() + len > self.max_line_length + 1 {
                // Terminator does not count against the limit
                discarded = self.buf.len() + len;
                self.buf.clear();
                self.buf.shrink_to(self.max_line_length + 1);
            } else {
                self.buf.extend_from_slice(&available[..len]);
            }

            self.reader.consume(len);
            if complete {
                break;
            }
        }

        if !read_any {
            return Ok(None);
        }
        if discarded > 0 {
            return Ok(Some(ReadLine::TooLong(discarded)));
        }

        let mut line = self.buf.as_slice();
        if let Some(rest) = line.strip_suffix(b"\n") {
            line = rest;
        }
        if let Some(rest) = line.strip_suffix(b"\r") {
            line = rest;
        }

        Ok(Some(ReadLine::Text(String::from_utf8_lossy(line).into_owned())))
    }
}
