//! The producer/consumer handoff between the acquisition paths and the
//! network. Producers offer readings into a bounded queue and never
//! block; one consumer loop drains it, serializes, and forwards to the
//! active transport. Ownership of a reading transfers with the enqueue,
//! so every reading is dropped exactly once no matter which side loses
//! it.

use crate::events::EventFlags;
use crate::reading::Reading;
use crate::transport::Transport;

use log::{error, info, warn};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender, TrySendError};

/// Depth of the hand-off queue.
pub const QUEUE_DEPTH: usize = 16;

/// The bounded hand-off queue.
pub fn channel() -> (SyncSender<Reading>, Receiver<Reading>) {
    sync_channel(QUEUE_DEPTH)
}

/// Offers a reading to the relay. Returns false when the reading was
/// dropped instead: uploads not ready, queue full, or relay gone. Never
/// blocks the producer.
pub fn offer(tx: &SyncSender<Reading>, flags: &EventFlags, reading: Reading) -> bool {
    if !flags.upload_ok() {
        return false;
    }
    match tx.try_send(reading) {
        Ok(()) => true,
        Err(TrySendError::Full(_)) => {
            warn!("upload queue full, dropping reading");
            false
        }
        Err(TrySendError::Disconnected(_)) => {
            warn!("upload relay is gone, dropping reading");
            false
        }
    }
}

/// The consumer loop. Runs until the queue closes or, on a transport
/// with fatal errors, until the first failed send. Clears the
/// upload-ready flag on the way out so producers stop offering.
pub fn run<T: Transport>(rx: Receiver<Reading>, mut transport: T, flags: &EventFlags) {
    while let Ok(reading) = rx.recv() {
        let stream_name = reading.stream_name();
        let payload = reading.to_json();
        drop(reading);

        if let Err(e) = transport.send(stream_name, &payload) {
            if transport.fatal_errors() {
                error!("send error, closing the relay: {}", e);
                break;
            }
            warn!("upload error: {}", e);
        }
    }
    flags.swap_upload_ok(false);
    info!("upload relay terminated.");
}
