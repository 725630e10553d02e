//! Process-wide forwarder delivering vital reports to the active consumer.
//!
//! The platform's vitals feed may only be registered once per process,
//! but collector instances come and go across the page lifecycle. The
//! forwarder holds a single active-handler slot: activation is
//! last-writer-wins and returns an ownership token, deactivation is
//! compare-and-clear so a stale owner cannot evict a newer one. Reports
//! arriving with no active handler are silently dropped.

use std::sync::{
    Mutex, OnceLock,
    atomic::{AtomicBool, AtomicU64, Ordering},
};

use tokio::sync::mpsc;
use tracing::debug;

use super::RawVitalReport;

/// Token identifying one activation of the forwarder slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandlerToken(u64);

struct ActiveHandler {
    token: HandlerToken,
    sender: mpsc::UnboundedSender<RawVitalReport>,
}

/// Singleton forwarding each platform report to the active handler.
pub struct VitalForwarder {
    registered: AtomicBool,
    next_token: AtomicU64,
    slot: Mutex<Option<ActiveHandler>>,
}

static FORWARDER: OnceLock<VitalForwarder> = OnceLock::new();

impl VitalForwarder {
    fn new() -> Self {
        Self {
            registered: AtomicBool::new(false),
            next_token: AtomicU64::new(1),
            slot: Mutex::new(None),
        }
    }

    /// Process-wide instance.
    pub fn global() -> &'static VitalForwarder {
        FORWARDER.get_or_init(VitalForwarder::new)
    }

    /// Marks the underlying platform registration as done. Returns true
    /// exactly once; callers use it to avoid duplicate feed subscriptions.
    pub fn register(&self) -> bool {
        !self.registered.swap(true, Ordering::SeqCst)
    }

    /// Installs `sender` as the active handler, displacing any previous
    /// owner (last-writer-wins). The returned token is required to
    /// deactivate.
    pub fn activate(&self, sender: mpsc::UnboundedSender<RawVitalReport>) -> HandlerToken {
        let token = HandlerToken(self.next_token.fetch_add(1, Ordering::SeqCst));
        let mut slot = self.slot.lock().expect("forwarder mutex poisoned");
        *slot = Some(ActiveHandler { token, sender });
        token
    }

    /// Clears the slot only while `token` still owns it, so an unmount
    /// racing a newer activation leaves the newer owner in place.
    pub fn deactivate(&self, token: HandlerToken) {
        let mut slot = self.slot.lock().expect("forwarder mutex poisoned");
        if slot.as_ref().is_some_and(|active| active.token == token) {
            *slot = None;
        }
    }

    /// Forwards one report to the active handler; dropped when no handler
    /// is active or the handler's channel has closed.
    pub fn forward(&self, report: RawVitalReport) {
        let slot = self.slot.lock().expect("forwarder mutex poisoned");
        match slot.as_ref() {
            Some(active) => {
                if active.sender.send(report).is_err() {
                    debug!(target: "vitals", "active handler channel closed; report dropped");
                }
            }
            None => debug!(target: "vitals", "no active handler; report dropped"),
        }
    }

    /// True while some handler owns the slot.
    pub fn has_active_handler(&self) -> bool {
        self.slot
            .lock()
            .expect("forwarder mutex poisoned")
            .is_some()
    }
}
