//! Periodic tick sources
//!
//! The scrobbler is driven by two ticks: `Refresh` (poll which track is
//! playing) and `Count` (poll the position and count playback). A
//! [`TickSource`] posts its tick into the scrobbler's event channel; the
//! scrobbler handles everything on one thread, so the two never interleave.

use log::debug;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::scrobbler::Event;

/// Default period for both ticks
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_millis(1000);

/// Which handler a tick is meant for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Re-read the current track
    Refresh,
    /// Re-read the position and count played seconds
    Count,
}

/// Something that periodically posts a [`Tick`].
///
/// Both methods must be safe to call repeatedly and in any order.
pub trait TickSource: Send {
    /// Begin posting ticks into `events`. No-op when already running.
    fn start(&mut self, events: Sender<Event>);

    /// Stop posting ticks. No-op when not running.
    fn stop(&mut self);

    /// Whether ticks are currently being posted.
    fn is_running(&self) -> bool;

    /// Called by the scrobbler as it picks up one of this source's ticks.
    fn acknowledge(&self) {}
}

/// Wall-clock ticker backed by a thread.
///
/// At most one tick is in flight: while a posted tick has not been
/// acknowledged, later periods are skipped instead of queueing up behind a
/// slow handler.
pub struct IntervalTicker {
    tick: Tick,
    period: Duration,
    pending: Arc<AtomicBool>,
    running: Option<(Sender<()>, JoinHandle<()>)>,
}

impl IntervalTicker {
    pub fn new(tick: Tick, period: Duration) -> Self {
        Self {
            tick,
            period,
            pending: Arc::new(AtomicBool::new(false)),
            running: None,
        }
    }
}

impl TickSource for IntervalTicker {
    fn start(&mut self, events: Sender<Event>) {
        if self.running.is_some() {
            return;
        }

        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let tick = self.tick;
        let period = self.period;
        let pending = Arc::clone(&self.pending);
        pending.store(false, Ordering::SeqCst);

        let handle = thread::spawn(move || loop {
            match stop_rx.recv_timeout(period) {
                Err(RecvTimeoutError::Timeout) => {
                    if pending.swap(true, Ordering::SeqCst) {
                        debug!("{tick:?} tick still pending, skipping");
                        continue;
                    }
                    if events.send(Event::Tick(tick)).is_err() {
                        debug!("{tick:?} ticker: receiver gone, stopping");
                        break;
                    }
                }
                // Explicit stop, or the ticker was dropped
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        });

        self.running = Some((stop_tx, handle));
    }

    fn stop(&mut self) {
        if let Some((stop_tx, handle)) = self.running.take() {
            drop(stop_tx);
            let _ = handle.join();
        }
    }

    fn is_running(&self) -> bool {
        self.running.is_some()
    }

    fn acknowledge(&self) {
        self.pending.store(false, Ordering::SeqCst);
    }
}

impl Drop for IntervalTicker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Tick source fired by hand. Clones share state, so a test can keep one
/// handle while the scrobbler owns another.
#[derive(Clone)]
pub struct ManualTicker {
    tick: Tick,
    target: Arc<Mutex<Option<Sender<Event>>>>,
}

impl ManualTicker {
    pub fn new(tick: Tick) -> Self {
        Self {
            tick,
            target: Arc::new(Mutex::new(None)),
        }
    }

    /// Post one tick. Returns `false` when the ticker is stopped.
    pub fn fire(&self) -> bool {
        let target = self.target.lock().unwrap_or_else(PoisonError::into_inner);
        target
            .as_ref()
            .is_some_and(|events| events.send(Event::Tick(self.tick)).is_ok())
    }
}

impl TickSource for ManualTicker {
    fn start(&mut self, events: Sender<Event>) {
        let mut target = self.target.lock().unwrap_or_else(PoisonError::into_inner);
        if target.is_none() {
            *target = Some(events);
        }
    }

    fn stop(&mut self) {
        self.target
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    fn is_running(&self) -> bool {
        self.target
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}
