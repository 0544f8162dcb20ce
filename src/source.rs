//! Media source abstraction
//!
//! A [`MediaSource`] is whatever can tell us what the player is doing right
//! now. The scrobbler only ever asks two questions of it (which track, and
//! where in the track) plus connect/disconnect.

use log::{debug, warn};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use crate::error::SourceError;
use crate::track::TrackIdentity;

/// Default bound on a single source call.
pub const DEFAULT_SOURCE_TIMEOUT: Duration = Duration::from_secs(3);

/// Capability interface to the player being observed.
pub trait MediaSource {
    /// Attach to the player. Fails with [`SourceError::Unavailable`] when it
    /// is not running or cannot be reached.
    fn connect(&mut self) -> Result<(), SourceError>;

    /// Release whatever `connect` acquired. Safe to call when not connected.
    fn disconnect(&mut self);

    /// The track currently loaded, or `None` when nothing is playing.
    fn current_track(&mut self) -> Result<Option<TrackIdentity>, SourceError>;

    /// Playback position in whole seconds, or `None` when unknown.
    fn current_position_seconds(&mut self) -> Result<Option<u32>, SourceError>;
}

impl<S: MediaSource + ?Sized> MediaSource for Box<S> {
    fn connect(&mut self) -> Result<(), SourceError> {
        (**self).connect()
    }

    fn disconnect(&mut self) {
        (**self).disconnect();
    }

    fn current_track(&mut self) -> Result<Option<TrackIdentity>, SourceError> {
        (**self).current_track()
    }

    fn current_position_seconds(&mut self) -> Result<Option<u32>, SourceError> {
        (**self).current_position_seconds()
    }
}

/// Requests forwarded to the worker thread, each with its own reply channel
/// so a late answer to a timed-out call is never mistaken for a fresh one.
enum Request {
    Connect(Sender<Result<(), SourceError>>),
    Disconnect(Sender<()>),
    CurrentTrack(Sender<Result<Option<TrackIdentity>, SourceError>>),
    Position(Sender<Result<Option<u32>, SourceError>>),
}

/// Runs a [`MediaSource`] on its own thread and bounds every call.
///
/// A call that does not answer within the timeout fails with
/// [`SourceError::Timeout`]; the stuck call keeps running on the worker and
/// later requests queue behind it.
pub struct BoundedSource {
    requests: Sender<Request>,
    timeout: Duration,
}

impl BoundedSource {
    /// Move `source` onto a worker thread.
    pub fn spawn<S>(mut source: S, timeout: Duration) -> Self
    where
        S: MediaSource + Send + 'static,
    {
        let (requests, inbox) = mpsc::channel::<Request>();

        thread::spawn(move || {
            for request in inbox {
                // Receivers that gave up are gone; ignore failed replies
                match request {
                    Request::Connect(reply) => {
                        let _ = reply.send(source.connect());
                    }
                    Request::Disconnect(reply) => {
                        source.disconnect();
                        let _ = reply.send(());
                    }
                    Request::CurrentTrack(reply) => {
                        let _ = reply.send(source.current_track());
                    }
                    Request::Position(reply) => {
                        let _ = reply.send(source.current_position_seconds());
                    }
                }
            }
            source.disconnect();
            debug!("Media source worker stopped");
        });

        Self { requests, timeout }
    }

    fn call<T>(&self, request: impl FnOnce(Sender<T>) -> Request) -> Result<T, SourceError> {
        let (reply, answer) = mpsc::channel();
        self.requests
            .send(request(reply))
            .map_err(|_| worker_gone())?;

        answer.recv_timeout(self.timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => SourceError::Timeout(self.timeout),
            RecvTimeoutError::Disconnected => worker_gone(),
        })
    }
}

fn worker_gone() -> SourceError {
    SourceError::Fault("media source worker has stopped".to_string())
}

impl MediaSource for BoundedSource {
    fn connect(&mut self) -> Result<(), SourceError> {
        match self.call(Request::Connect) {
            // A connect that hangs means the player cannot be reached
            Err(SourceError::Timeout(t)) => Err(SourceError::Unavailable(format!(
                "connect did not complete within {t:?}"
            ))),
            Err(e) => Err(e),
            Ok(result) => result,
        }
    }

    fn disconnect(&mut self) {
        if let Err(e) = self.call(Request::Disconnect) {
            warn!("Media source disconnect did not complete: {e}");
        }
    }

    fn current_track(&mut self) -> Result<Option<TrackIdentity>, SourceError> {
        self.call(Request::CurrentTrack)?
    }

    fn current_position_seconds(&mut self) -> Result<Option<u32>, SourceError> {
        self.call(Request::Position)?
    }
}
