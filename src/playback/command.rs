/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `n` - stop the current track and move on
    Skip,
    /// `a` - toggle autoplay
    ToggleAutoplay,
    /// `q` - quit after stopping playback
    Quit,
    /// `p` - pause or resume
    TogglePause,
    /// `p <name>` - append a playable to the queue
    Enqueue(String),
}

impl Command {
    /// Whitespace-separated tokens, first structural match wins.
    /// Anything unrecognised yields `None` and is ignored by the caller.
    pub fn parse(line: &str) -> Option<Self> {
        let tokens: Vec<&str> = line.split_whitespace().collect();

        match tokens.as_slice() {
            ["n"] => Some(Command::Skip),
            ["a"] => Some(Command::ToggleAutoplay),
            ["q"] => Some(Command::Quit),
            ["p"] => Some(Command::TogglePause),
            ["p", name] => Some(Command::Enqueue((*name).to_string())),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_letter_commands() {
        assert_eq!(Command::parse("n"), Some(Command::Skip));
        assert_eq!(Command::parse("a"), Some(Command::ToggleAutoplay));
        assert_eq!(Command::parse("q"), Some(Command::Quit));
        assert_eq!(Command::parse("p"), Some(Command::TogglePause));
    }

    #[test]
    fn test_enqueue_takes_one_name() {
        assert_eq!(
            Command::parse("p album1"),
            Some(Command::Enqueue("album1".into()))
        );
        assert_eq!(
            Command::parse("  p   games/doom/e1m1.mid \r"),
            Some(Command::Enqueue("games/doom/e1m1.mid".into()))
        );
        assert_eq!(Command::parse("p two words"), None);
    }

    #[test]
    fn test_everything_else_ignored() {
        for line in ["", "   ", "x", "nn", "n extra", "q now", "a b", "P", "play album1"] {
            assert_eq!(Command::parse(line), None, "line {:?}", line);
        }
    }
}
