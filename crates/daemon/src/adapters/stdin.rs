//! Standard-input adapter
//!
//! Every line read is published as a barcode, which makes it easy to drive
//! the daemon from a pipe or a terminal.

use super::emit;
use crate::error::AdapterResult;
use common::ScanSink;
use protocol::ScanEvent;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::info;

/// Publish each line of `reader` until EOF
pub async fn read_lines<R>(reader: R, sink: &dyn ScanSink) -> AdapterResult<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.strip_suffix('\r').unwrap_or(&line);
        emit(sink, ScanEvent::barcode(line));
    }
    info!("EOF on stdin");
    Ok(())
}

/// Read barcodes from the process's standard input
pub async fn run(sink: &dyn ScanSink) -> AdapterResult<()> {
    read_lines(BufReader::new(tokio::io::stdin()), sink).await
}
