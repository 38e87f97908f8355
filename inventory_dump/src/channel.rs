use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tokio::sync::mpsc;

use crate::record::Record;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("record channel is closed")]
    Closed,
}

/// Sending half of the record channel between a dumper and its consumer.
///
/// Pushes suspend while the channel is at capacity. After [`DumperChannel::close`],
/// data records are rejected while finished records still go through, so the
/// end-of-stream markers can reach a consumer that is draining the channel.
#[derive(Debug, Clone)]
pub struct DumperChannel {
    sender: mpsc::Sender<Record>,
    closed: Arc<AtomicBool>,
}

impl DumperChannel {
    pub fn wrap(sender: mpsc::Sender<Record>) -> Self {
        Self {
            sender,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Pushes one record, waiting for capacity while the channel is full.
    pub async fn push_record(&self, record: Record) -> Result<(), ChannelError> {
        if self.closed.load(Ordering::Acquire) && matches!(record, Record::Data(_)) {
            return Err(ChannelError::Closed);
        }

        self.sender
            .send(record)
            .await
            .map_err(|_| ChannelError::Closed)
    }

    /// Stops accepting data records.
    ///
    /// Finished records are still deliverable while the receiver is alive.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

/// Receiving half of the record channel.
pub type RecordRx = mpsc::Receiver<Record>;

/// Creates the bounded record channel connecting a dumper to its consumer.
pub fn create_record_channel(capacity: usize) -> (DumperChannel, RecordRx) {
    let (tx, rx) = mpsc::channel(capacity);
    (DumperChannel::wrap(tx), rx)
}
