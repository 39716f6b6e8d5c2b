use super::{Command, Phase, PlayQueue, PlaybackState};
use crate::library::{Library, Playable};
use crate::notify::{Notification, Notifier};
use crate::synth::{Completion, SynthError, Synthesizer};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Pause between playables that could not be started, scaled by how many
/// failed in a row.
const FAILURE_BACKOFF: Duration = Duration::from_millis(100);
const MAX_BACKOFF_STEPS: u32 = 8;

/// One thing the wait phase woke up for.
#[derive(Debug)]
enum Event {
    Line(String),
    InputClosed,
    Completed,
    StopTimedOut,
    BackoffElapsed,
}

/// The jukebox state machine.
///
/// Owns the queue, the playback state and the synthesizer. `run` is the
/// only loop; it merges input lines and track completions one at a time,
/// so nothing here needs a lock.
pub struct Orchestrator<S, N> {
    library: Library,
    queue: PlayQueue,
    state: PlaybackState,
    synth: S,
    notifier: N,
    rng: StdRng,
    stop_timeout: Duration,

    // Loop bookkeeping
    track_active: bool,
    idle: bool,
    input_open: bool,
    stop_requested: Option<Instant>,
    failures: u32,
}

impl<S: Synthesizer, N: Notifier> Orchestrator<S, N> {
    pub fn new(library: Library, synth: S, notifier: N) -> Self {
        Self {
            library,
            queue: PlayQueue::new(),
            state: PlaybackState::default(),
            synth,
            notifier,
            rng: StdRng::from_entropy(),
            stop_timeout: Duration::from_secs(5),
            track_active: false,
            idle: false,
            input_open: true,
            stop_requested: None,
            failures: 0,
        }
    }

    pub fn with_autoplay(mut self, autoplay: bool) -> Self {
        self.state.autoplay = autoplay;
        self
    }

    /// Start paused: the first track is loaded but waits for `p`.
    pub fn with_start_paused(mut self, paused: bool) -> Self {
        self.state.paused = paused;
        self
    }

    /// Upper bound on waiting for a stopped track to report completion.
    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn queue(&self) -> &PlayQueue {
        &self.queue
    }

    pub fn phase(&self) -> Phase {
        if self.state.quit {
            Phase::Stopping
        } else if self.track_active && self.state.paused {
            Phase::Paused
        } else if self.track_active {
            Phase::PlayingTrack
        } else if self.idle {
            Phase::Idle
        } else {
            Phase::Selecting
        }
    }

    /// Play until `q` or end of input.
    pub async fn run(&mut self, mut input: mpsc::Receiver<String>) {
        info!(
            "Jukebox running: {} playables, autoplay {}",
            self.library.len(),
            self.state.autoplay
        );

        while !self.state.quit {
            if let Some(playable) = self.select_next(&mut input).await {
                if self.play(&playable, &mut input).await {
                    self.failures = 0;
                } else {
                    self.failures += 1;
                    self.back_off(&mut input).await;
                }
            }
        }

        if self.track_active {
            self.request_stop();
        }
        info!("Jukebox stopped");
    }

    /// Next playable from the queue, then autoplay. With neither, block for
    /// one input line, apply it and return `None` so the caller re-evaluates.
    async fn select_next(&mut self, input: &mut mpsc::Receiver<String>) -> Option<Playable> {
        if let Some(name) = self.queue.pop_front() {
            return match self.library.get(&name) {
                Some(playable) => Some(playable.clone()),
                None => {
                    warn!("Queued '{}' is not in the library, skipping", name);
                    None
                }
            };
        }

        if self.state.autoplay {
            if let Some(name) = self.library.random_name(&mut self.rng) {
                debug!("Autoplay picked '{}'", name);
                return self.library.get(name).cloned();
            }
        }

        self.idle = true;
        debug!("Idle, waiting for input");
        self.notifier.notify(&Notification::QueueEmpty);
        let line = if self.input_open {
            input.recv().await
        } else {
            None
        };
        self.idle = false;

        match line {
            Some(line) => self.handle_line(&line),
            None => self.handle_input_closed(),
        }
        None
    }

    /// Play every item of `playable`. Returns whether any of them started.
    async fn play(&mut self, playable: &Playable, input: &mut mpsc::Receiver<String>) -> bool {
        let paths = playable.file_paths(self.library.root());
        self.state.current = Some(playable.name().to_string());
        let mut started = false;

        if paths.is_empty() {
            warn!("'{}' has nothing to play", playable.name());
        }

        for (index, path) in paths.iter().enumerate() {
            if self.state.quit {
                break;
            }
            self.state.index = index;

            if let Some(completion) = self.start_track(playable, index, path) {
                started = true;
                self.wait_for_track(completion, input).await;
            }

            self.track_active = false;
            self.stop_requested = None;
        }

        started
    }

    /// After a playable that could not start, wait a little while still
    /// taking input, so a library of unplayable files cannot spin the loop.
    async fn back_off(&mut self, input: &mut mpsc::Receiver<String>) {
        let delay = FAILURE_BACKOFF * self.failures.min(MAX_BACKOFF_STEPS);
        debug!("{} failed playables in a row, backing off {:?}", self.failures, delay);

        let event = tokio::select! {
            _ = tokio::time::sleep(delay) => Event::BackoffElapsed,
            line = input.recv(), if self.input_open => match line {
                Some(line) => Event::Line(line),
                None => Event::InputClosed,
            },
        };

        match event {
            Event::Line(line) => self.handle_line(&line),
            Event::InputClosed => self.handle_input_closed(),
            _ => {}
        }
    }

    /// Load and (unless paused) play one file. `None` means it could not be
    /// started and counts as already finished.
    fn start_track(&mut self, playable: &Playable, index: usize, path: &Path) -> Option<Completion> {
        let completion = match self.synth.load(path) {
            Ok(completion) => completion,
            Err(e) => {
                self.report_failure(path, &e);
                return None;
            }
        };

        if !self.state.paused {
            if let Err(e) = self.synth.play() {
                self.report_failure(path, &e);
                return None;
            }
        }

        self.track_active = true;
        debug!("Playing {}", path.display());
        self.notifier.notify(&Notification::now_playing(playable, index));
        Some(completion)
    }

    /// Race completion against input until the track is done. While paused
    /// only input is read; a completion that lands meanwhile stays in its
    /// channel and is picked up after resuming.
    async fn wait_for_track(&mut self, mut completion: Completion, input: &mut mpsc::Receiver<String>) {
        loop {
            let racing = !self.state.paused;
            let deadline = self.stop_requested.map(|at| at + self.stop_timeout);

            let event = tokio::select! {
                _ = &mut completion, if racing => Event::Completed,
                line = input.recv(), if self.input_open => match line {
                    Some(line) => Event::Line(line),
                    None => Event::InputClosed,
                },
                _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)),
                    if racing && deadline.is_some() => Event::StopTimedOut,
                // Paused with no input left cannot be resumed
                else => Event::Completed,
            };

            match event {
                Event::Completed => return,
                Event::StopTimedOut => {
                    warn!(
                        "No completion {:?} after stop, moving on",
                        self.stop_timeout
                    );
                    return;
                }
                Event::Line(line) => self.handle_line(&line),
                Event::InputClosed => self.handle_input_closed(),
                Event::BackoffElapsed => {}
            }
        }
    }

    fn handle_line(&mut self, line: &str) {
        match Command::parse(line) {
            Some(command) => self.apply(command),
            None => debug!("Ignoring input {:?}", line),
        }
    }

    fn handle_input_closed(&mut self) {
        info!("Input closed, quitting");
        self.input_open = false;
        self.apply(Command::Quit);
    }

    pub fn apply(&mut self, command: Command) {
        debug!("Command {:?} in {:?}", command, self.phase());

        match command {
            Command::Skip => {
                if self.track_active {
                    self.request_stop();
                }
            }
            Command::ToggleAutoplay => {
                self.state.autoplay = !self.state.autoplay;
                info!("Autoplay {}", if self.state.autoplay { "on" } else { "off" });
            }
            Command::Quit => {
                self.state.quit = true;
                if self.track_active {
                    self.request_stop();
                }
            }
            Command::TogglePause => self.toggle_pause(),
            Command::Enqueue(name) => {
                if self.library.contains(&name) {
                    debug!("Queued '{}'", name);
                    self.queue.push_back(name);
                } else {
                    self.notifier.notify(&Notification::NotFound(name));
                }
            }
        }
    }

    fn toggle_pause(&mut self) {
        if self.track_active {
            let result = if self.state.paused {
                self.synth.play()
            } else {
                self.synth.pause()
            };
            if let Err(e) = result {
                warn!("Pause toggle failed: {}", e);
                self.notifier.notify(&Notification::PlaybackFailed {
                    file: self.state.current.clone().unwrap_or_default(),
                    reason: e.to_string(),
                });
                return;
            }
        }

        self.state.paused = !self.state.paused;
        info!("{}", if self.state.paused { "Paused" } else { "Resumed" });
    }

    /// Stop the current track; its completion is still awaited.
    fn request_stop(&mut self) {
        // A stopped track must be able to finish, so never stay paused
        self.state.paused = false;
        if self.stop_requested.is_none() {
            self.stop_requested = Some(Instant::now());
        }
        if let Err(e) = self.synth.stop() {
            warn!("Stopping synthesizer failed: {}", e);
        }
    }

    fn report_failure(&self, path: &Path, error: &SynthError) {
        warn!("Could not play {}: {}", path.display(), error);
        self.notifier.notify(&Notification::PlaybackFailed {
            file: path.display().to_string(),
            reason: error.to_string(),
        });
    }
}
