//! Line reading for subprocess output
//!
//! Build tools write in whatever code page the agent runs under, so output
//! is read as raw bytes and decoded lossily. A bad byte costs one replacement
//! character, never the rest of the stream.

use std::io;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Lines of `reader` with invalid UTF-8 replaced by U+FFFD
pub struct LossyLines<R> {
    reader: R,
    buf: Vec<u8>,
}

impl<R: AsyncBufRead + Unpin> LossyLines<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
        }
    }

    /// Next line without its `\n` or `\r\n` terminator, `None` at end of input
    pub async fn next_line(&mut self) -> io::Result<Option<String>> {
        self.buf.clear();
        if self.reader.read_until(b'\n', &mut self.buf).await? == 0 {
            return Ok(None);
        }
        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
            if self.buf.last() == Some(&b'\r') {
                self.buf.pop();
            }
        }
        Ok(Some(String::from_utf8_lossy(&self.buf).into_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    async fn collect(input: &[u8]) -> Vec<String> {
        let mut lines = LossyLines::new(BufReader::new(input));
        let mut out = Vec::new();
        while let Some(line) = lines.next_line().await.unwrap() {
            out.push(line);
        }
        out
    }

    #[tokio::test]
    async fn test_invalid_bytes_do_not_end_the_stream() {
        let lines = collect(b"[INFO] Compiling caf\xe9.java\n[ERROR] /a/File.java:[1,2] x\n").await;
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], "[INFO] Compiling caf\u{FFFD}.java");
        assert_eq!(lines[1], "[ERROR] /a/File.java:[1,2] x");
    }

    #[tokio::test]
    async fn test_terminators() {
        assert_eq!(collect(b"a\r\nb\n\nc").await, vec!["a", "b", "", "c"]);
        assert!(collect(b"").await.is_empty());
    }
}
