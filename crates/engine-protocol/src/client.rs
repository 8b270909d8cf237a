//! Line transport.

use crate::{ProtocolError, Request, OK};
use std::io::{BufRead, Write};
use tracing::trace;

/// One end of a line-oriented conversation.
///
/// Implementors only move single lines; the provided methods layer the
/// `ok` acknowledgement and request encoding on top.
pub trait Peer {
    /// Writes one line and flushes immediately.
    fn send(&mut self, line: &str) -> Result<(), ProtocolError>;

    /// Blocks until one line is available.
    ///
    /// Fails with [`ProtocolError::PeerClosed`] at end of stream.
    fn receive(&mut self) -> Result<String, ProtocolError>;

    /// Sends every wire line of `request`.
    fn request(&mut self, request: &Request) -> Result<(), ProtocolError> {
        for line in request.lines() {
            self.send(&line)?;
        }
        Ok(())
    }

    /// Reads one line that must be the `ok` sentinel.
    fn expect_ok(&mut self) -> Result<(), ProtocolError> {
        let line = self.receive()?;
        if line == OK {
            Ok(())
        } else {
            Err(ProtocolError::violation("ok", line))
        }
    }
}

/// A [`Peer`] over any buffered reader and writer.
pub struct LineClient<R: BufRead, W: Write> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> LineClient<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Gives back the reader and writer.
    pub fn into_parts(self) -> (R, W) {
        (self.reader, self.writer)
    }
}

impl<R: BufRead, W: Write> Peer for LineClient<R, W> {
    fn send(&mut self, line: &str) -> Result<(), ProtocolError> {
        trace!(line, ">>");
        writeln!(self.writer, "{}", line)?;
        self.writer.flush()?;
        Ok(())
    }

    fn receive(&mut self) -> Result<String, ProtocolError> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Err(ProtocolError::PeerClosed);
        }
        let line = line.trim().to_string();
        trace!(line = line.as_str(), "<<");
        Ok(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn client(input: &str) -> LineClient<Cursor<Vec<u8>>, Vec<u8>> {
        LineClient::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn send_writes_one_line_per_call() {
        let mut c = client("");
        c.send("setfen").unwrap();
        c.send("8/8/8/8/8/8/8/8 w - - 0 1").unwrap();
        let (_, written) = c.into_parts();
        assert_eq!(
            String::from_utf8(written).unwrap(),
            "setfen\n8/8/8/8/8/8/8/8 w - - 0 1\n"
        );
    }

    #[test]
    fn receive_strips_line_endings() {
        let mut c = client("e2e4\r\nok\n");
        assert_eq!(c.receive().unwrap(), "e2e4");
        assert_eq!(c.receive().unwrap(), "ok");
    }

    #[test]
    fn receive_at_end_of_stream_is_peer_closed() {
        let mut c = client("ok\n");
        c.receive().unwrap();
        assert!(matches!(c.receive(), Err(ProtocolError::PeerClosed)));
    }

    #[test]
    fn empty_line_is_still_a_line() {
        let mut c = client("\nok\n");
        assert_eq!(c.receive().unwrap(), "");
        c.expect_ok().unwrap();
    }

    #[test]
    fn expect_ok_rejects_other_content() {
        let mut c = client("error: bad fen\n");
        match c.expect_ok() {
            Err(ProtocolError::Violation { expected, got }) => {
                assert_eq!(expected, "ok");
                assert_eq!(got, "error: bad fen");
            }
            other => panic!("Expected Violation, got {:?}", other),
        }
    }

    #[test]
    fn request_sends_command_and_payload() {
        let mut c = client("");
        c.request(&Request::GetMove { budget_ms: 250 }).unwrap();
        let (_, written) = c.into_parts();
        assert_eq!(String::from_utf8(written).unwrap(), "getmove\n250\n");
    }
}
