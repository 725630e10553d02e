//! Recording session state machine and time anchoring.

pub mod aggregator;
pub mod snapshot;

use std::sync::{Arc, Mutex};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use self::snapshot::{InstrumentationSnapshot, RunSummary, SnapshotUpdate};

/// Time sources injected into the session machine.
///
/// `now_ms` must share the platform entry timebase (milliseconds since
/// the platform time origin) so the captured anchor can re-base entry
/// timestamps; `unix_ms` stamps wall-clock fields.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> f64;
    fn unix_ms(&self) -> u64;
}

/// Process clock: monotonic milliseconds since construction plus the
/// system wall clock.
pub struct SystemClock {
    started: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }

    fn unix_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Manually advanced clock used by trace replay and tests.
pub struct ManualClock {
    now_ms: Mutex<f64>,
    unix_base_ms: u64,
}

impl ManualClock {
    pub fn new(start_ms: f64, unix_base_ms: u64) -> Self {
        Self {
            now_ms: Mutex::new(start_ms),
            unix_base_ms,
        }
    }

    pub fn set_ms(&self, now_ms: f64) {
        *self.now_ms.lock().expect("clock mutex poisoned") = now_ms;
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        *self.now_ms.lock().expect("clock mutex poisoned")
    }

    fn unix_ms(&self) -> u64 {
        self.unix_base_ms + self.now_ms() as u64
    }
}

/// Recording lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RecordingState {
    Idle,
    Recording,
    Stopped,
}

/// Record of one completed run, kept in the bounded history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    pub session_id: String,
    pub started_at: u64,
    pub stopped_at: u64,
    pub summary: RunSummary,
}

#[derive(Debug)]
struct SessionInner {
    state: RecordingState,
    snapshot: InstrumentationSnapshot,
    session_id: Option<String>,
    anchor_ms: Option<f64>,
    started_at: Option<u64>,
    stopped_at: Option<u64>,
    history: Vec<RunRecord>,
}

impl SessionInner {
    fn new() -> Self {
        Self {
            state: RecordingState::Idle,
            snapshot: InstrumentationSnapshot::empty(),
            session_id: None,
            anchor_ms: None,
            started_at: None,
            stopped_at: None,
            history: Vec::new(),
        }
    }
}

/// Shared handle onto the session state machine.
///
/// Clones observe and mutate the same session. Double start, stop while
/// idle, and repeated reset are defined no-ops so callers never need to
/// track state externally.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<Mutex<SessionInner>>,
    clock: Arc<dyn Clock>,
    anchor_tx: Arc<watch::Sender<Option<f64>>>,
    max_history: usize,
}

const SESSION_ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

fn generate_session_id(unix_ms: u64) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..6)
        .map(|_| SESSION_ID_ALPHABET[rng.gen_range(0..SESSION_ID_ALPHABET.len())] as char)
        .collect();
    format!("session-{unix_ms}-{suffix}")
}

impl SessionHandle {
    pub fn new(clock: Arc<dyn Clock>, max_history: usize) -> Self {
        let (anchor_tx, _) = watch::channel(None);
        Self {
            inner: Arc::new(Mutex::new(SessionInner::new())),
            clock,
            anchor_tx: Arc::new(anchor_tx),
            max_history,
        }
    }

    pub fn with_system_clock(max_history: usize) -> Self {
        Self::new(Arc::new(SystemClock::new()), max_history)
    }

    /// Subscribes to session-anchor changes (set on start, cleared on
    /// reset); the timeline collector re-normalizes on every change.
    pub fn anchor_watch(&self) -> watch::Receiver<Option<f64>> {
        self.anchor_tx.subscribe()
    }

    /// Begins a recording session. No-op while already recording:
    /// generates a fresh session id, stamps the wall-clock start, clears
    /// the stop time, replaces the snapshot with an empty one, captures
    /// the monotonic anchor, and transitions to Recording.
    pub fn start(&self) {
        let mut inner = self.lock();
        if inner.state == RecordingState::Recording {
            return;
        }
        let started_at = self.clock.unix_ms();
        let anchor = self.clock.now_ms();
        inner.session_id = Some(generate_session_id(started_at));
        inner.started_at = Some(started_at);
        inner.stopped_at = None;
        inner.snapshot = InstrumentationSnapshot::empty();
        inner.anchor_ms = Some(anchor);
        inner.state = RecordingState::Recording;
        drop(inner);
        self.anchor_tx.send_replace(Some(anchor));
    }

    /// Ends the recording session. No-op unless recording: stamps the
    /// wall-clock stop, derives the run summary from the current
    /// snapshot, and prepends the record to the bounded history.
    pub fn stop(&self) {
        let mut inner = self.lock();
        if inner.state != RecordingState::Recording {
            return;
        }
        let stopped_at = self.clock.unix_ms();
        inner.stopped_at = Some(stopped_at);
        inner.state = RecordingState::Stopped;

        let record = RunRecord {
            session_id: inner
                .session_id
                .clone()
                .unwrap_or_else(|| generate_session_id(stopped_at)),
            started_at: inner.started_at.unwrap_or(stopped_at),
            stopped_at,
            summary: RunSummary::from_snapshot(&inner.snapshot),
        };
        inner.history.insert(0, record);
        inner.history.truncate(self.max_history);
    }

    /// Clears snapshot, session identity, anchor, and timestamps;
    /// transitions to Idle from any state.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.snapshot = InstrumentationSnapshot::empty();
        inner.session_id = None;
        inner.anchor_ms = None;
        inner.started_at = None;
        inner.stopped_at = None;
        inner.state = RecordingState::Idle;
        drop(inner);
        self.anchor_tx.send_replace(None);
    }

    /// Empties the run history without touching the live snapshot.
    pub fn clear_history(&self) {
        self.lock().history.clear();
    }

    /// Merges a partial update into the snapshot. Recording-gating is the
    /// aggregator's responsibility; the machine applies whatever its sole
    /// caller forwards.
    pub fn update_snapshot(&self, update: SnapshotUpdate) {
        self.lock().snapshot.apply(update);
    }

    pub fn snapshot(&self) -> InstrumentationSnapshot {
        self.lock().snapshot.clone()
    }

    pub fn state(&self) -> RecordingState {
        self.lock().state
    }

    pub fn is_recording(&self) -> bool {
        self.state() == RecordingState::Recording
    }

    pub fn session_id(&self) -> Option<String> {
        self.lock().session_id.clone()
    }

    /// Monotonic anchor marking recording start; entries are re-based
    /// against it so 0 = session start.
    pub fn session_anchor(&self) -> Option<f64> {
        self.lock().anchor_ms
    }

    pub fn session_started_at(&self) -> Option<u64> {
        self.lock().started_at
    }

    pub fn session_stopped_at(&self) -> Option<u64> {
        self.lock().stopped_at
    }

    pub fn runs_history(&self) -> Vec<RunRecord> {
        self.lock().history.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SessionInner> {
        self.inner.lock().expect("session mutex poisoned")
    }
}
