/// Where the orchestrator currently is in its loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Queue empty, autoplay off, blocked on input
    Idle,
    /// Choosing the next playable
    Selecting,
    PlayingTrack,
    Paused,
    /// Quit requested, draining the current track
    Stopping,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackState {
    /// Name of the playable being played, if any has started yet.
    pub current: Option<String>,
    /// Position within `current`, 0-based.
    pub index: usize,
    pub autoplay: bool,
    pub paused: bool,
    pub quit: bool,
}

impl PlaybackState {
    pub fn new(autoplay: bool, paused: bool) -> Self {
        Self {
            current: None,
            index: 0,
            autoplay,
            paused,
            quit: false,
        }
    }
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::new(true, false)
    }
}
