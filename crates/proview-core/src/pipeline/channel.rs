//! Bounded channel for streaming batches to the consumer.

use tokio::sync::mpsc;

use crate::config::IngestConfig;

/// Create a bounded channel pair with the configured capacity.
///
/// When the buffer is full the coordinator waits before starting the next
/// batch, so a slow consumer throttles decoding instead of piling up records.
pub fn bounded_channel<T>(config: &IngestConfig) -> (mpsc::Sender<T>, mpsc::Receiver<T>) {
    mpsc::channel(config.channel_capacity.max(1))
}
