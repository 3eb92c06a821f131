//! Bounded line producer.
//!
//! [`LineSource`] reads a file on its own tokio task and hands complete
//! lines to the consumer through a fixed-capacity channel. The producer
//! waits while the channel is full and the consumer waits while it is
//! empty, so disk reads overlap with matching and persistence without
//! buffering the whole file.
//!
//! Lines are delivered strictly in file order. Trailing `\n` and `\r\n` are
//! stripped and invalid UTF-8 is replaced (with a warning) rather than
//! rejected. A read error is delivered in sequence and ends the stream.

use std::borrow::Cow;
use std::io;
use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::error::{IngestError, Result};

/// Default number of lines buffered between producer and consumer.
pub const DEFAULT_CAPACITY: usize = 1024;

pub struct LineSource {
    path: PathBuf,
    rx: mpsc::Receiver<io::Result<String>>,
    producer: JoinHandle<()>,
}

impl LineSource {
    /// Open `path` and start producing lines into a channel of `capacity`.
    pub async fn open(path: &Path, capacity: usize) -> Result<Self> {
        let file = File::open(path)
            .await
            .map_err(|e| IngestError::io(path, e))?;
        Ok(Self::from_reader(path, file, capacity))
    }

    /// Start producing lines from an arbitrary reader. `path` is only used
    /// to label errors.
    pub fn from_reader<R>(path: &Path, reader: R, capacity: usize) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let producer = tokio::spawn(produce(BufReader::new(reader), tx));
        Self {
            path: path.to_path_buf(),
            rx,
            producer,
        }
    }

    /// Next line in file order, or `None` at end of file.
    pub async fn next_line(&mut self) -> Result<Option<String>> {
        match self.rx.recv().await {
            Some(Ok(line)) => Ok(Some(line)),
            Some(Err(e)) => Err(IngestError::io(&self.path, e)),
            None => Ok(None),
        }
    }

    /// Lines read from disk but not yet consumed.
    #[cfg(test)]
    fn pending(&self) -> usize {
        self.rx.len()
    }
}

impl Drop for LineSource {
    fn drop(&mut self) {
        self.producer.abort();
    }
}

async fn produce<R>(mut reader: R, tx: mpsc::Sender<io::Result<String>>)
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let mut number = 0u64;
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => return,
            Ok(_) => {
                number += 1;
                if buf.last() == Some(&b'\n') {
                    buf.pop();
                    if buf.last() == Some(&b'\r') {
                        buf.pop();
                    }
                }
                let line = match String::from_utf8_lossy(&buf) {
                    Cow::Borrowed(text) => text.to_string(),
                    Cow::Owned(text) => {
                        warn!(line = number, "invalid UTF-8 replaced in log line");
                        text
                    }
                };
                // Receiver gone: the run was aborted.
                if tx.send(Ok(line)).await.is_err() {
                    return;
                }
            }
            Err(e) => {
                let _ = tx.send(Err(e)).await;
                return;
            }
        }
    }
}
