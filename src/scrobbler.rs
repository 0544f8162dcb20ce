//! Now-playing tracker and scrobble trigger
//!
//! [`Scrobbler`] owns the connection to the media source, the two tick
//! sources and the [`TrackingSession`]. Ticks and commands arrive on a single
//! channel and are handled one at a time, so the refresh and count handlers
//! never interleave their updates.
//!
//! Lifecycle: `Disconnected -> Connecting -> Connected -> Disconnected`. Any
//! source fault inside a tick handler drops back to `Disconnected`; there is
//! no automatic reconnect.

use chrono::Utc;
use log::{debug, error, info, warn};
use std::io::BufRead;
use std::slice;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use crate::error::SourceError;
use crate::session::{scrobble_threshold, Progress, TrackingSession, DEFAULT_SCROBBLE_CAP_SECS};
use crate::sink::ScrobbleSink;
use crate::source::MediaSource;
use crate::ticker::{Tick, TickSource};
use crate::track::{Scrobble, TrackIdentity};

/// Requests sent to a running scrobbler from other threads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Connect,
    ToggleConnection,
    /// Log a one-line status summary
    ReportStatus,
    /// Disconnect and leave the event loop
    Shutdown,
}

/// Everything the scrobbler's event loop reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Tick(Tick),
    Command(Command),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Notifications delivered to subscribers, in the order they happen.
#[derive(Debug, Clone, PartialEq)]
pub enum ScrobblerEvent {
    Connected,
    Disconnected,
    /// Display fields changed: a new track, or nothing playing
    TrackChanged(Option<TrackIdentity>),
    /// A play submission was emitted
    Scrobbled(Scrobble),
}

type Observer = Box<dyn FnMut(&ScrobblerEvent) + Send>;

/// Cloneable sender for driving a scrobbler from another thread.
#[derive(Debug, Clone)]
pub struct ScrobblerHandle {
    events: Sender<Event>,
}

impl ScrobblerHandle {
    /// Queue a command. Returns `false` when the scrobbler is gone.
    pub fn send(&self, command: Command) -> bool {
        self.events.send(Event::Command(command)).is_ok()
    }

    /// Forward one-letter commands read from `input`, one per line: `c`
    /// toggles the connection, `s` logs the status, `q` quits.
    ///
    /// Returns when `input` ends or the scrobbler is gone. End of input is
    /// not a quit request.
    pub fn forward_commands(&self, input: impl BufRead) {
        for line in input.lines() {
            let Ok(line) = line else {
                break;
            };
            let command = match line.trim() {
                "c" => Command::ToggleConnection,
                "s" => Command::ReportStatus,
                "q" => Command::Shutdown,
                "" => continue,
                other => {
                    warn!("Unknown command: {other}");
                    continue;
                }
            };
            if !self.send(command) {
                return;
            }
        }
        debug!("Command input closed");
    }
}

/// Tracks the player's current song and scrobbles it once it has been
/// played long enough.
pub struct Scrobbler {
    source: Box<dyn MediaSource + Send>,
    sink: Box<dyn ScrobbleSink>,
    refresh_ticks: Box<dyn TickSource>,
    count_ticks: Box<dyn TickSource>,
    observers: Vec<Observer>,
    session: TrackingSession,
    state: ConnectionState,
    scrobble_cap: u32,
    events_tx: Sender<Event>,
    events_rx: Receiver<Event>,
}

impl Scrobbler {
    pub fn new(
        source: impl MediaSource + Send + 'static,
        sink: impl ScrobbleSink + 'static,
        refresh_ticks: impl TickSource + 'static,
        count_ticks: impl TickSource + 'static,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        Self {
            source: Box::new(source),
            sink: Box::new(sink),
            refresh_ticks: Box::new(refresh_ticks),
            count_ticks: Box::new(count_ticks),
            observers: Vec::new(),
            session: TrackingSession::new(),
            state: ConnectionState::Disconnected,
            scrobble_cap: DEFAULT_SCROBBLE_CAP_SECS,
            events_tx,
            events_rx,
        }
    }

    /// Set the ceiling on the scrobble threshold.
    #[must_use]
    pub fn with_scrobble_cap(mut self, cap_seconds: u32) -> Self {
        self.scrobble_cap = cap_seconds;
        self
    }

    /// Register an observer. Called synchronously on the scrobbler's thread.
    pub fn subscribe(&mut self, observer: impl FnMut(&ScrobblerEvent) + Send + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn handle(&self) -> ScrobblerHandle {
        ScrobblerHandle {
            events: self.events_tx.clone(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    pub fn session(&self) -> &TrackingSession {
        &self.session
    }

    pub fn current_track(&self) -> Option<&TrackIdentity> {
        self.session.current_track()
    }

    /// Counted seconds needed before the current track is scrobbled.
    pub fn current_threshold(&self) -> Option<u32> {
        self.session
            .current_track()
            .and_then(|t| scrobble_threshold(t.duration_seconds, self.scrobble_cap))
    }

    /// One-line summary for status output.
    pub fn status_line(&self) -> String {
        match (self.state, self.session.current_track()) {
            (ConnectionState::Connected, Some(track)) => {
                let threshold = self
                    .current_threshold()
                    .map_or_else(|| "-".to_string(), |t| t.to_string());
                format!(
                    "{} [{}/{}s{}]",
                    track.display_line(),
                    self.session.played_seconds(),
                    threshold,
                    if self.session.scrobbled() { ", scrobbled" } else { "" }
                )
            }
            (ConnectionState::Connected, None) => "Connected, nothing playing".to_string(),
            _ => "Not connected".to_string(),
        }
    }

    /// Attach to the media source and start both ticks.
    ///
    /// Does nothing unless currently disconnected. On failure the scrobbler
    /// stays disconnected and the error is returned; nothing is started.
    pub fn connect(&mut self) -> Result<(), SourceError> {
        if self.state != ConnectionState::Disconnected {
            debug!("Connect ignored, already {:?}", self.state);
            return Ok(());
        }

        self.state = ConnectionState::Connecting;
        self.session = TrackingSession::new();

        if let Err(e) = self.source.connect() {
            error!("Error connecting to Apple Music: {e}");
            self.state = ConnectionState::Disconnected;
            return Err(e);
        }

        self.refresh_ticks.start(self.events_tx.clone());
        self.count_ticks.start(self.events_tx.clone());
        self.state = ConnectionState::Connected;

        info!("✅ Connected to Apple Music");
        self.notify(&ScrobblerEvent::Connected);
        Ok(())
    }

    /// Stop both ticks, release the source and forget the session.
    /// Safe to call in any state.
    pub fn disconnect(&mut self) {
        self.refresh_ticks.stop();
        self.count_ticks.stop();
        self.source.disconnect();

        let was_connected = self.state != ConnectionState::Disconnected;
        self.session = TrackingSession::new();
        self.state = ConnectionState::Disconnected;

        if was_connected {
            info!("Disconnected from Apple Music");
            self.notify(&ScrobblerEvent::Disconnected);
        }
    }

    pub fn toggle_connection(&mut self) {
        if self.state == ConnectionState::Disconnected {
            // Failure is already logged; staying disconnected is the outcome
            let _ = self.connect();
        } else {
            self.disconnect();
        }
    }

    /// Poll the current track and reset counters when it changed.
    pub fn on_refresh_tick(&mut self) {
        if !self.is_connected() {
            return;
        }

        let track = match self.source.current_track() {
            Ok(track) => track,
            Err(SourceError::Parse(e)) => {
                warn!("Ignoring unreadable track info: {e}");
                None
            }
            Err(e) => {
                error!("Error while getting Apple Music info: {e}");
                self.disconnect();
                return;
            }
        };

        if self.session.observe_track(track) {
            match self.session.current_track() {
                Some(track) => info!("🎵 Now playing: {}", track.display_line()),
                None => debug!("Nothing playing"),
            }
            let changed = ScrobblerEvent::TrackChanged(self.session.current_track().cloned());
            self.notify(&changed);
        }
    }

    /// Poll the position, count forward playback and scrobble at the threshold.
    pub fn on_count_tick(&mut self) {
        if !self.is_connected() || self.session.current_track().is_none() {
            return;
        }

        let position = match self.source.current_position_seconds() {
            Ok(position) => position,
            Err(e) => {
                error!("Error while reading Apple Music position: {e}");
                self.disconnect();
                return;
            }
        };

        let progress = self.session.observe_position(position, self.scrobble_cap);
        let Some(track) = self.session.current_track() else {
            return;
        };

        if progress.advanced() {
            self.sink.update_now_playing(track);
        }

        if let Progress::ThresholdReached { played_seconds } = progress {
            let scrobble = Scrobble::from_track(track, Utc::now());
            info!(
                "Threshold reached after {played_seconds}s: {}",
                track.display_line()
            );
            self.sink.scrobble(slice::from_ref(&scrobble));
            self.notify(&ScrobblerEvent::Scrobbled(scrobble));
        }
    }

    /// Dispatch one event. Returns `false` once shutdown was requested.
    pub fn handle_event(&mut self, event: Event) -> bool {
        match event {
            Event::Tick(Tick::Refresh) => {
                self.refresh_ticks.acknowledge();
                self.on_refresh_tick();
            }
            Event::Tick(Tick::Count) => {
                self.count_ticks.acknowledge();
                self.on_count_tick();
            }
            Event::Command(Command::Connect) => {
                let _ = self.connect();
            }
            Event::Command(Command::ToggleConnection) => self.toggle_connection(),
            Event::Command(Command::ReportStatus) => info!("{}", self.status_line()),
            Event::Command(Command::Shutdown) => {
                self.disconnect();
                return false;
            }
        }
        true
    }

    /// Handle every event already queued without blocking.
    /// Returns `false` once shutdown was requested.
    pub fn process_pending(&mut self) -> bool {
        loop {
            match self.events_rx.try_recv() {
                Ok(event) => {
                    if !self.handle_event(event) {
                        return false;
                    }
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => return true,
            }
        }
    }

    /// Block handling events until [`Command::Shutdown`] arrives.
    pub fn run(&mut self) {
        info!("🔄 Waiting for ticks...");
        while let Ok(event) = self.events_rx.recv() {
            if !self.handle_event(event) {
                break;
            }
        }
        info!("Scrobbler stopped");
    }

    fn notify(&mut self, event: &ScrobblerEvent) {
        for observer in &mut self.observers {
            observer(event);
        }
    }
}

impl Drop for Scrobbler {
    fn drop(&mut self) {
        self.refresh_ticks.stop();
        self.count_ticks.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MetadataError;
    use crate::ticker::{IntervalTicker, ManualTicker};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::thread;
    use std::time::{Duration, Instant};

    /// Scripted stand-in for the player. Queued answers are used first; once a
    /// queue runs dry the default answer repeats.
    #[derive(Default)]
    struct Script {
        fail_connect: bool,
        connects: usize,
        disconnects: usize,
        track_queue: VecDeque<Result<Option<TrackIdentity>, SourceError>>,
        track: Option<TrackIdentity>,
        position_queue: VecDeque<Result<Option<u32>, SourceError>>,
        position: Option<u32>,
        /// Time each read takes
        delay: Duration,
    }

    #[derive(Clone, Default)]
    struct ScriptedSource(Arc<Mutex<Script>>);

    impl ScriptedSource {
        fn wait(&self) {
            let delay = self.0.lock().unwrap().delay;
            if !delay.is_zero() {
                thread::sleep(delay);
            }
        }
    }

    impl MediaSource for ScriptedSource {
        fn connect(&mut self) -> Result<(), SourceError> {
            let mut script = self.0.lock().unwrap();
            script.connects += 1;
            if script.fail_connect {
                Err(SourceError::Unavailable("Apple Music not running".to_string()))
            } else {
                Ok(())
            }
        }

        fn disconnect(&mut self) {
            self.0.lock().unwrap().disconnects += 1;
        }

        fn current_track(&mut self) -> Result<Option<TrackIdentity>, SourceError> {
            self.wait();
            let mut script = self.0.lock().unwrap();
            let fallback = script.track.clone();
            script.track_queue.pop_front().unwrap_or(Ok(fallback))
        }

        fn current_position_seconds(&mut self) -> Result<Option<u32>, SourceError> {
            self.wait();
            let mut script = self.0.lock().unwrap();
            let fallback = script.position;
            script.position_queue.pop_front().unwrap_or(Ok(fallback))
        }
    }

    #[derive(Clone, Default)]
    struct RecordingSink {
        scrobbles: Arc<Mutex<Vec<Scrobble>>>,
        heartbeats: Arc<Mutex<Vec<String>>>,
    }

    impl ScrobbleSink for RecordingSink {
        fn scrobble(&mut self, scrobbles: &[Scrobble]) {
            self.scrobbles.lock().unwrap().extend_from_slice(scrobbles);
        }

        fn update_now_playing(&mut self, track: &TrackIdentity) {
            self.heartbeats.lock().unwrap().push(track.title.clone());
        }
    }

    struct Harness {
        scrobbler: Scrobbler,
        script: Arc<Mutex<Script>>,
        sink: RecordingSink,
        refresh: ManualTicker,
        count: ManualTicker,
    }

    impl Harness {
        fn new() -> Self {
            let source = ScriptedSource::default();
            let script = Arc::clone(&source.0);
            let sink = RecordingSink::default();
            let refresh = ManualTicker::new(Tick::Refresh);
            let count = ManualTicker::new(Tick::Count);

            let scrobbler = Scrobbler::new(source, sink.clone(), refresh.clone(), count.clone());

            Self {
                scrobbler,
                script,
                sink,
                refresh,
                count,
            }
        }

        fn script(&self) -> std::sync::MutexGuard<'_, Script> {
            self.script.lock().unwrap()
        }

        fn fire_refresh(&mut self) {
            self.refresh.fire();
            self.scrobbler.process_pending();
        }

        fn fire_count(&mut self) {
            self.count.fire();
            self.scrobbler.process_pending();
        }

        fn scrobbles(&self) -> Vec<Scrobble> {
            self.sink.scrobbles.lock().unwrap().clone()
        }
    }

    fn song() -> TrackIdentity {
        TrackIdentity::new("Track", "Artist", "Album", "Artist", 100)
    }

    fn playing(harness: &mut Harness, track: TrackIdentity) {
        harness.script().track = Some(track);
        harness.scrobbler.connect().unwrap();
        harness.fire_refresh();
    }

    #[test]
    fn test_connect_initializes_state_and_connects_source() {
        let mut h = Harness::new();
        h.scrobbler.connect().unwrap();

        assert_eq!(h.script().connects, 1);
        assert!(h.scrobbler.is_connected());
        assert!(!h.scrobbler.session().scrobbled());
        assert_eq!(h.scrobbler.session().played_seconds(), 0);
        assert!(h.refresh.is_running());
        assert!(h.count.is_running());
    }

    #[test]
    fn test_refresh_tick_sets_current_song() {
        let mut h = Harness::new();
        playing(&mut h, song());

        let current = h.scrobbler.current_track().unwrap();
        assert_eq!(current.title, "Track");
        assert_eq!(current.artist, "Artist");
        assert_eq!(current.album, "Album");
    }

    #[test]
    fn test_song_change_resets_counters() {
        let mut h = Harness::new();
        let short = TrackIdentity::new("Short", "Artist", "Album", "Artist", 10);
        playing(&mut h, short);

        h.script().position_queue.extend((1..=8).map(|p| Ok(Some(p))));
        for _ in 0..8 {
            h.fire_count();
        }
        assert_eq!(h.scrobbler.session().played_seconds(), 7);
        assert!(h.scrobbler.session().scrobbled());

        h.script().track = Some(TrackIdentity::new("Other", "Artist", "Album", "Artist", 200));
        h.fire_refresh();

        assert_eq!(h.scrobbler.session().played_seconds(), 0);
        assert!(!h.scrobbler.session().scrobbled());
        assert_eq!(h.scrobbler.current_track().unwrap().title, "Other");
    }

    #[test]
    fn test_count_tick_increments_when_playback_advances() {
        let mut h = Harness::new();
        playing(&mut h, song());
        h.script().position_queue.extend([Ok(Some(1)), Ok(Some(2)), Ok(Some(3))]);

        h.fire_count();
        h.fire_count();
        h.fire_count();

        assert_eq!(h.scrobbler.session().played_seconds(), 2);
        assert_eq!(*h.sink.heartbeats.lock().unwrap(), ["Track", "Track"]);
    }

    #[test]
    fn test_count_tick_does_not_increment_when_paused() {
        let mut h = Harness::new();
        playing(&mut h, song());
        h.script().position = Some(5);

        for _ in 0..10 {
            h.fire_count();
        }

        assert_eq!(h.scrobbler.session().played_seconds(), 0);
        assert!(h.sink.heartbeats.lock().unwrap().is_empty());
    }

    #[test]
    fn test_unknown_position_leaves_counters_alone() {
        let mut h = Harness::new();
        playing(&mut h, song());
        h.script()
            .position_queue
            .extend([Ok(Some(1)), Ok(Some(2)), Ok(None), Ok(None), Ok(Some(3))]);

        for _ in 0..5 {
            h.fire_count();
        }

        assert_eq!(h.scrobbler.session().played_seconds(), 2);
        assert!(h.scrobbler.is_connected());
    }

    #[test]
    fn test_scrobble_is_emitted_after_50_percent_played() {
        let mut h = Harness::new();
        playing(&mut h, song());
        h.script().position_queue.extend((1..=51).map(|p| Ok(Some(p))));

        let threshold = h.scrobbler.current_threshold().unwrap();
        assert_eq!(threshold, 50);
        for _ in 0..=threshold {
            h.fire_count();
        }

        let scrobbles = h.scrobbles();
        assert_eq!(scrobbles.len(), 1);
        assert_eq!(scrobbles[0].track, "Track");
        assert_eq!(scrobbles[0].album, "Album");
        assert_eq!(scrobbles[0].album_artist, "Artist");
    }

    #[test]
    fn test_scrobble_not_repeated_past_threshold() {
        let mut h = Harness::new();
        playing(&mut h, song());
        h.script().position_queue.extend((1..=200).map(|p| Ok(Some(p))));

        for _ in 0..200 {
            h.fire_count();
        }

        assert_eq!(h.scrobbles().len(), 1);
        assert_eq!(h.scrobbler.session().played_seconds(), 199);
    }

    #[test]
    fn test_long_track_uses_cap() {
        let mut h = Harness::new();
        h.scrobbler = {
            let source = ScriptedSource(Arc::clone(&h.script));
            Scrobbler::new(source, h.sink.clone(), h.refresh.clone(), h.count.clone())
                .with_scrobble_cap(30)
        };
        playing(&mut h, TrackIdentity::new("Epic", "Band", "Album", "Band", 1200));
        assert_eq!(h.scrobbler.current_threshold(), Some(30));

        h.script().position_queue.extend((1..=30).map(|p| Ok(Some(p))));
        for _ in 0..30 {
            h.fire_count();
        }
        assert!(h.scrobbles().is_empty());

        h.script().position = Some(31);
        h.fire_count();
        assert_eq!(h.scrobbles().len(), 1);
    }

    #[test]
    fn test_same_song_again_after_gap_is_scrobbled_again() {
        let mut h = Harness::new();
        let short = TrackIdentity::new("Short", "Artist", "Album", "Artist", 4);
        playing(&mut h, short.clone());

        h.script().position_queue.extend((1..=3).map(|p| Ok(Some(p))));
        for _ in 0..3 {
            h.fire_count();
        }
        assert_eq!(h.scrobbles().len(), 1);

        h.script().track_queue.push_back(Ok(None));
        h.fire_refresh();
        assert!(h.scrobbler.current_track().is_none());

        h.fire_refresh();
        h.script().position_queue.extend((1..=3).map(|p| Ok(Some(p))));
        for _ in 0..3 {
            h.fire_count();
        }
        assert_eq!(h.scrobbles().len(), 2);
    }

    #[test]
    fn test_failed_connect_starts_nothing() {
        let mut h = Harness::new();
        h.script().fail_connect = true;
        h.script().track = Some(song());
        h.script().position_queue.extend((1..=60).map(|p| Ok(Some(p))));

        let result = h.scrobbler.connect();
        assert!(matches!(result, Err(SourceError::Unavailable(_))));
        assert_eq!(h.scrobbler.state(), ConnectionState::Disconnected);
        assert!(!h.refresh.is_running());
        assert!(!h.count.is_running());

        assert!(!h.refresh.fire());
        for _ in 0..60 {
            h.fire_count();
        }
        assert!(h.scrobbles().is_empty());
        assert!(h.scrobbler.current_track().is_none());
    }

    #[test]
    fn test_connect_while_connected_is_ignored() {
        let mut h = Harness::new();
        h.scrobbler.connect().unwrap();
        h.scrobbler.connect().unwrap();
        assert_eq!(h.script().connects, 1);
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        let mut h = Harness::new();
        playing(&mut h, song());

        h.scrobbler.disconnect();
        let first = (h.scrobbler.state(), h.scrobbler.status_line());
        h.scrobbler.disconnect();
        let second = (h.scrobbler.state(), h.scrobbler.status_line());

        assert_eq!(first, second);
        assert_eq!(second.0, ConnectionState::Disconnected);
        assert!(h.scrobbler.current_track().is_none());
        assert!(!h.refresh.is_running());
        assert!(!h.count.is_running());
    }

    #[test]
    fn test_disconnect_when_never_connected() {
        let mut h = Harness::new();
        h.scrobbler.disconnect();
        assert_eq!(h.scrobbler.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_refresh_fault_disconnects() {
        let mut h = Harness::new();
        playing(&mut h, song());
        h.script()
            .track_queue
            .push_back(Err(SourceError::Fault("window closed".to_string())));

        h.fire_refresh();

        assert_eq!(h.scrobbler.state(), ConnectionState::Disconnected);
        assert!(h.scrobbler.current_track().is_none());
        assert!(!h.refresh.is_running());
        assert_eq!(h.script().disconnects, 1);
    }

    #[test]
    fn test_count_fault_disconnects() {
        let mut h = Harness::new();
        playing(&mut h, song());
        h.script()
            .position_queue
            .extend([Ok(Some(1)), Err(SourceError::Timeout(Duration::from_secs(3)))]);

        h.fire_count();
        h.fire_count();

        assert!(!h.scrobbler.is_connected());
        assert!(!h.count.is_running());
        // Further ticks cannot arrive, and a manual call is a no-op
        h.scrobbler.on_count_tick();
        assert!(h.scrobbles().is_empty());
    }

    #[test]
    fn test_parse_failure_clears_track_but_stays_connected() {
        let mut h = Harness::new();
        playing(&mut h, song());

        h.script()
            .track_queue
            .push_back(Err(SourceError::Parse(MetadataError::MissingComposerSegments {
                raw: "By Someone \u{2014} Orchestra".to_string(),
                found: 2,
            })));
        h.fire_refresh();

        assert!(h.scrobbler.is_connected());
        assert!(h.scrobbler.current_track().is_none());

        h.fire_refresh();
        assert_eq!(h.scrobbler.current_track(), Some(&song()));
    }

    #[test]
    fn test_ticks_are_ignored_while_disconnected() {
        let mut h = Harness::new();
        h.script().track = Some(song());
        h.scrobbler.on_refresh_tick();
        h.scrobbler.on_count_tick();
        assert!(h.scrobbler.current_track().is_none());
    }

    #[test]
    fn test_toggle_connection() {
        let mut h = Harness::new();
        h.scrobbler.toggle_connection();
        assert!(h.scrobbler.is_connected());
        h.scrobbler.toggle_connection();
        assert!(!h.scrobbler.is_connected());
        assert_eq!(h.script().connects, 1);
        assert_eq!(h.script().disconnects, 1);
    }

    #[test]
    fn test_observers_see_events_in_order() {
        let mut h = Harness::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        h.scrobbler.subscribe(move |event| sink.lock().unwrap().push(event.clone()));

        let short = TrackIdentity::new("Short", "Artist", "Album", "Artist", 4);
        playing(&mut h, short.clone());
        h.script().position_queue.extend((1..=3).map(|p| Ok(Some(p))));
        for _ in 0..3 {
            h.fire_count();
        }
        h.scrobbler.disconnect();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[0], ScrobblerEvent::Connected);
        assert_eq!(seen[1], ScrobblerEvent::TrackChanged(Some(short)));
        assert!(matches!(&seen[2], ScrobblerEvent::Scrobbled(s) if s.track == "Short"));
        assert_eq!(seen[3], ScrobblerEvent::Disconnected);
    }

    #[test]
    fn test_status_line() {
        let mut h = Harness::new();
        assert_eq!(h.scrobbler.status_line(), "Not connected");
        h.scrobbler.connect().unwrap();
        assert_eq!(h.scrobbler.status_line(), "Connected, nothing playing");
        h.script().track = Some(song());
        h.fire_refresh();
        assert_eq!(h.scrobbler.status_line(), "Artist - Track (Album) [0/50s]");
    }

    #[test]
    fn test_run_until_shutdown() {
        let mut h = Harness::new();
        h.script().track = Some(song());
        let handle = h.scrobbler.handle();
        let refresh = h.refresh.clone();

        let worker = thread::spawn(move || {
            h.scrobbler.run();
            h
        });

        assert!(handle.send(Command::Connect));
        // Ticks only land once the connect has been processed
        while !refresh.is_running() {
            thread::yield_now();
        }
        refresh.fire();
        assert!(handle.send(Command::Shutdown));

        let h = worker.join().unwrap();
        assert!(!h.scrobbler.is_connected());
        assert_eq!(h.script().disconnects, 1);
    }

    #[test]
    fn test_slow_source_does_not_build_tick_backlog() {
        let source = ScriptedSource::default();
        {
            let mut script = source.0.lock().unwrap();
            script.track = Some(song());
            script.position = Some(1);
            script.delay = Duration::from_millis(30);
        }
        let mut scrobbler = Scrobbler::new(
            source,
            RecordingSink::default(),
            IntervalTicker::new(Tick::Refresh, Duration::from_millis(5)),
            IntervalTicker::new(Tick::Count, Duration::from_millis(5)),
        );
        let handle = scrobbler.handle();
        scrobbler.connect().unwrap();

        let worker = thread::spawn(move || scrobbler.run());
        thread::sleep(Duration::from_millis(500));

        // Only one tick per ticker can be queued ahead of the shutdown
        let asked = Instant::now();
        assert!(handle.send(Command::Shutdown));
        worker.join().unwrap();
        assert!(asked.elapsed() < Duration::from_millis(400));
    }

    #[test]
    fn test_end_of_command_input_keeps_running() {
        let mut h = Harness::new();
        h.script().track = Some(song());
        h.scrobbler
            .handle()
            .forward_commands("c\n\n bogus \ns\n".as_bytes());

        assert!(h.scrobbler.process_pending());
        assert!(h.scrobbler.is_connected());
    }

    #[test]
    fn test_quit_command_stops_the_loop() {
        let mut h = Harness::new();
        h.scrobbler.handle().forward_commands("c\nq\n".as_bytes());

        assert!(!h.scrobbler.process_pending());
        assert!(!h.scrobbler.is_connected());
    }
}
