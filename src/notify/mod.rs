// Notifications - what the listener sees when a track starts or a request fails
// Console output by default, desktop popups behind the `notify` feature

use crate::library::Playable;
use std::fmt;
use std::io::Write;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    NowPlaying {
        playable: String,
        /// `(item name, 1-based position, count)` for multi-item playables.
        item: Option<(String, usize, usize)>,
    },
    NotFound(String),
    QueueEmpty,
    PlaybackFailed { file: String, reason: String },
}

impl Notification {
    pub fn now_playing(playable: &Playable, index: usize) -> Self {
        let items = playable.item_names();
        let item = if items.len() > 1 {
            items
                .get(index)
                .map(|name| (name.clone(), index + 1, items.len()))
        } else {
            None
        };

        Notification::NowPlaying {
            playable: playable.name().to_string(),
            item,
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notification::NowPlaying {
                playable,
                item: Some((name, position, count)),
            } => write!(f, "{} > {} ({}/{})", playable, name, position, count),
            Notification::NowPlaying { playable, item: None } => write!(f, "{}", playable),
            Notification::NotFound(name) => write!(f, "\"{}\" not found", name),
            Notification::QueueEmpty => write!(f, "No more tracks in queue"),
            Notification::PlaybackFailed { file, reason } => {
                write!(f, "Could not play {}: {}", file, reason)
            }
        }
    }
}

pub trait Notifier {
    fn notify(&self, notification: &Notification);
}

/// One line per notification on stdout.
#[derive(Debug, Default, Clone)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: &Notification) {
        info!("notify: {}", notification);
        let mut stdout = std::io::stdout().lock();
        let _ = writeln!(stdout, "{}", notification);
        let _ = stdout.flush();
    }
}

#[cfg(feature = "notify")]
#[derive(Debug, Default, Clone)]
pub struct DesktopNotifier;

#[cfg(feature = "notify")]
impl Notifier for DesktopNotifier {
    fn notify(&self, notification: &Notification) {
        info!("notify: {}", notification);
        let result = notify_rust::Notification::new()
            .appname("midibox")
            .summary(&notification.to_string())
            .show();
        if let Err(e) = result {
            warn!("Desktop notification failed: {}", e);
        }
    }
}

/// Pick the back-end asked for in the config.
pub fn notifier_for(desktop: bool) -> Box<dyn Notifier + Send> {
    if desktop {
        #[cfg(feature = "notify")]
        return Box::new(DesktopNotifier);
        #[cfg(not(feature = "notify"))]
        warn!("Desktop notifications requested but the `notify` feature is off, using console");
    }
    Box::new(ConsoleNotifier)
}

impl<N: Notifier + ?Sized> Notifier for Box<N> {
    fn notify(&self, notification: &Notification) {
        (**self).notify(notification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_playing_single_item() {
        let track = Playable::track("solo.mid");
        let note = Notification::now_playing(&track, 0);

        assert_eq!(note.to_string(), "solo.mid");
    }

    #[test]
    fn test_now_playing_album_position() {
        let album = Playable::album("album1", vec!["a.mid".into(), "b.mid".into()]);

        assert_eq!(Notification::now_playing(&album, 0).to_string(), "album1 > a.mid (1/2)");
        assert_eq!(Notification::now_playing(&album, 1).to_string(), "album1 > b.mid (2/2)");
    }

    #[test]
    fn test_single_entry_album_shows_name_only() {
        let album = Playable::album("ep", vec!["only.mid".into()]);
        assert_eq!(Notification::now_playing(&album, 0).to_string(), "ep");
    }

    #[test]
    fn test_console_notifier_without_desktop() {
        // Must build and hand back a usable back-end with or without `notify`
        let notifier = notifier_for(false);
        notifier.notify(&Notification::QueueEmpty);
    }

    #[cfg(not(feature = "notify"))]
    #[test]
    fn test_desktop_request_falls_back_to_console() {
        let notifier = notifier_for(true);
        notifier.notify(&Notification::QueueEmpty);
    }

    #[test]
    fn test_not_found_wording() {
        assert_eq!(
            Notification::NotFound("nope".into()).to_string(),
            "\"nope\" not found"
        );
    }
}
