//! Event sink: the publishing boundary for scans
//!
//! Adapters hand every assembled scan to a [`ScanSink`]. The production sink
//! writes one line per scan to stdout and flushes immediately, so a reader
//! on the other end of a pipe sees each scan as soon as it happens.

use protocol::ScanEvent;
use std::io::{self, Write};
use std::sync::Mutex;

/// Environment variable holding the identity prefixed to every line
pub const IDENTITY_ENV: &str = "CB_BARCODE_IDENTITY";

/// Receives normalized scans from adapters
///
/// Implementations must be callable from several adapter tasks at once.
/// Lines from one adapter keep their order; lines from different adapters
/// interleave in whatever order they are published.
pub trait ScanSink: Send + Sync {
    fn publish(&self, event: &ScanEvent) -> crate::Result<()>;
}

/// Sink writing the line format to any writer
pub struct LineSink<W: Write + Send> {
    identity: Option<String>,
    writer: Mutex<W>,
}

/// The sink used by the daemon
pub type StdoutSink = LineSink<io::Stdout>;

impl LineSink<io::Stdout> {
    /// Stdout sink using the identity from `CB_BARCODE_IDENTITY`
    pub fn stdout() -> Self {
        Self::new(std::env::var(IDENTITY_ENV).ok(), io::stdout())
    }
}

impl<W: Write + Send> LineSink<W> {
    pub fn new(identity: Option<String>, writer: W) -> Self {
        Self {
            identity,
            writer: Mutex::new(writer),
        }
    }

    /// Consume the sink and return the writer
    pub fn into_inner(self) -> W {
        match self.writer.into_inner() {
            Ok(writer) => writer,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<W: Write + Send> ScanSink for LineSink<W> {
    fn publish(&self, event: &ScanEvent) -> crate::Result<()> {
        let line = event.to_line(self.identity.as_deref());
        let mut writer = match self.writer.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        writeln!(writer, "{}", line)?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_sink_writes_and_flushes() {
        let sink = LineSink::new(Some("station-2".to_string()), Vec::new());
        sink.publish(&ScanEvent::barcode("123")).unwrap();
        sink.publish(&ScanEvent::nfc(&[0xde, 0xad])).unwrap();

        let output = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(
            output,
            "station-2 found bar : 123\nstation-2 found NFC : dead\n"
        );
    }

    #[test]
    fn test_line_sink_without_identity() {
        let sink = LineSink::new(None, Vec::new());
        sink.publish(&ScanEvent::barcode("abc")).unwrap();
        assert_eq!(sink.into_inner(), b"None found bar : abc\n".to_vec());
    }
}
