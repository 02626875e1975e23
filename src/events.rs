//! Shared readiness flags, the replacement for the firmware's event
//! bitmask. Each flag is an `AtomicBool` behind an `Arc`; the `mark_*`
//! helpers report whether the value actually changed so callers can log
//! a transition exactly once per edge.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The three readiness flags shared across subsystems.
#[derive(Debug, Default)]
pub struct EventFlags {
    net_ok: AtomicBool,
    upload_ok: AtomicBool,
    tgam_online: AtomicBool,
}

impl EventFlags {
    /// A fresh set of flags, all down, ready to share.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// True once the network layer reports ready.
    pub fn net_ok(&self) -> bool {
        self.net_ok.load(Ordering::SeqCst)
    }

    /// Raises or lowers the network-ready flag.
    pub fn set_net_ok(&self, value: bool) {
        self.net_ok.store(value, Ordering::SeqCst);
    }

    /// True while a relay is connected and accepting readings.
    pub fn upload_ok(&self) -> bool {
        self.upload_ok.load(Ordering::SeqCst)
    }

    /// Sets the upload-ready flag, returning its previous value. The
    /// previous value doubles as the double-start guard for the relay.
    pub fn swap_upload_ok(&self, value: bool) -> bool {
        self.upload_ok.swap(value, Ordering::SeqCst)
    }

    /// True while the headset is producing records.
    pub fn tgam_online(&self) -> bool {
        self.tgam_online.load(Ordering::SeqCst)
    }

    /// Edge-triggered headset presence: returns true only when the flag
    /// actually flipped.
    pub fn mark_tgam(&self, online: bool) -> bool {
        self.tgam_online.swap(online, Ordering::SeqCst) != online
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tgam_edges_fire_once() {
        let flags = EventFlags::new();
        assert!(flags.mark_tgam(true));
        assert!(!flags.mark_tgam(true));
        assert!(flags.tgam_online());
        assert!(flags.mark_tgam(false));
        assert!(!flags.mark_tgam(false));
    }

    #[test]
    fn upload_swap_reports_previous_state() {
        let flags = EventFlags::new();
        assert!(!flags.swap_upload_ok(true));
        assert!(flags.swap_upload_ok(true));
        assert!(flags.upload_ok());
        assert!(flags.swap_upload_ok(false));
        assert!(!flags.upload_ok());
    }
}
