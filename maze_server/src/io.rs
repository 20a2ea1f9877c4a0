// io.rs - Line framing over async byte streams
//
// Works the same over a TCP socket half and an in-memory pipe.

use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Result, SessionError};
use crate::protocol::Reply;

/// Longest accepted command line, terminator included.
pub const MAX_LINE: usize = 1024;

pub struct LineReader<R> {
    inner: R,
    timeout: Duration,
    buf: Vec<u8>,
}

impl<R: AsyncBufRead + Unpin> LineReader<R> {
    pub fn new(inner: R, timeout: Duration) -> Self {
        Self {
            inner,
            timeout,
            buf: Vec::with_capacity(64),
        }
    }

    /// Next line without its CR/LF terminator.
    ///
    /// A partially received line survives cancellation of this future, so it
    /// can be raced in `select!`. EOF before any byte is a disconnect; a final
    /// unterminated line is returned as is.
    pub async fn read_line(&mut self) -> Result<String> {
        let timeout = self.timeout;
        let read = async {
            loop {
                let remaining = (MAX_LINE - self.buf.len()) as u64;
                let n = (&mut self.inner)
                    .take(remaining)
                    .read_until(b'\n', &mut self.buf)
                    .await?;

                if self.buf.last() == Some(&b'\n') || (n == 0 && !self.buf.is_empty()) {
                    return Ok(());
                }
                if n == 0 {
                    return Err(SessionError::Disconnected);
                }
                if self.buf.len() >= MAX_LINE {
                    return Err(SessionError::LineTooLong { limit: MAX_LINE });
                }
            }
        };

        match tokio::time::timeout(timeout, read).await {
            Ok(result) => result?,
            Err(_) => return Err(SessionError::ReadTimeout { timeout }),
        }

        let line = String::from_utf8_lossy(&self.buf)
            .trim_end_matches(['\r', '\n'])
            .to_string();
        self.buf.clear();
        Ok(line)
    }

    /// Resolves once the peer either sends more input or closes its side,
    /// returning `true` for a close. Nothing is consumed. Cancel safe.
    pub async fn peer_closed(&mut self) -> Result<bool> {
        let pending = self.inner.fill_buf().await?;
        Ok(pending.is_empty())
    }
}

pub struct LineWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin> LineWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub async fn line(&mut self, reply: &Reply) -> Result<()> {
        self.inner.write_all(reply.to_string().as_bytes()).await?;
        self.end_line().await
    }

    pub async fn lines(&mut self, replies: &[Reply]) -> Result<()> {
        for reply in replies {
            self.line(reply).await?;
        }
        Ok(())
    }

    /// Writes text without a terminator; the line is closed by [`Self::end_line`].
    pub async fn partial(&mut self, text: &str) -> Result<()> {
        self.inner.write_all(text.as_bytes()).await?;
        Ok(())
    }

    pub async fn end_line(&mut self) -> Result<()> {
        self.inner.write_all(b"\r\n").await?;
        Ok(())
    }

    pub async fn flush(&mut self) -> Result<()> {
        self.inner.flush().await?;
        Ok(())
    }

    /// Flushes and closes the write half.
    pub async fn close(&mut self) -> Result<()> {
        self.inner.flush().await?;
        self.inner.shutdown().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    fn reader(input: &'static [u8]) -> LineReader<BufReader<&'static [u8]>> {
        LineReader::new(BufReader::new(input), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_reads_crlf_and_lf_lines() {
        let mut r = reader(b"WIDTH 32\r\nSTART\nprint");
        assert_eq!(r.read_line().await.unwrap(), "WIDTH 32");
        assert_eq!(r.read_line().await.unwrap(), "START");
        assert_eq!(r.read_line().await.unwrap(), "print");
        assert!(matches!(r.read_line().await, Err(SessionError::Disconnected)));
    }

    #[tokio::test]
    async fn test_non_ascii_is_replaced() {
        let mut r = reader(b"UP\xff\r\n");
        assert_eq!(r.read_line().await.unwrap(), "UP\u{fffd}");
    }

    #[tokio::test]
    async fn test_overlong_line_rejected() {
        let long: &'static [u8] = Box::leak(vec![b'a'; MAX_LINE + 10].into_boxed_slice());
        let mut r = reader(long);
        assert!(matches!(
            r.read_line().await,
            Err(SessionError::LineTooLong { limit: MAX_LINE })
        ));
    }

    #[tokio::test]
    async fn test_peer_closed_leaves_input_in_place() {
        let mut r = reader(b"UP\r\n");
        assert!(!r.peer_closed().await.unwrap());
        assert_eq!(r.read_line().await.unwrap(), "UP");
        assert!(r.peer_closed().await.unwrap());
    }

    #[tokio::test]
    async fn test_peer_closed_on_dropped_client() {
        let (client, server) = tokio::io::duplex(64);
        let mut r = LineReader::new(BufReader::new(server), Duration::from_secs(5));
        drop(client);
        assert!(r.peer_closed().await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_stream_times_out() {
        let (_client, server) = tokio::io::duplex(64);
        let mut r = LineReader::new(BufReader::new(server), Duration::from_secs(120));
        assert!(matches!(
            r.read_line().await,
            Err(SessionError::ReadTimeout { .. })
        ));
    }

    #[tokio::test]
    async fn test_writer_frames_lines() {
        let mut out = Vec::new();
        {
            let mut w = LineWriter::new(&mut out);
            w.line(&Reply::ok()).await.unwrap();
            w.partial("1").await.unwrap();
            w.partial(" 0%").await.unwrap();
            w.end_line().await.unwrap();
            w.flush().await.unwrap();
        }
        assert_eq!(out, b"2 OK.\r\n1 0%\r\n");
    }
}
