// Library model - tracks and ordered albums, keyed by name
// Built once at startup by the scanner, read-only afterwards

pub mod scanner; // walks the library root and classifies files

pub use scanner::{LibraryScanner, ORDER_FILENAME};

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error("failed to read library directory {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
    #[error("failed to read order file {path}: {source}")]
    OrderFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Anything addressable by name and enqueuable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Playable {
    /// A single file, named by its path relative to the library root.
    Track { name: String },
    /// A directory (relative to the root) plus the filenames listed in its
    /// order file, in play order.
    Album { name: String, tracks: Vec<String> },
}

impl Playable {
    pub fn track(name: impl Into<String>) -> Self {
        Playable::Track { name: name.into() }
    }

    pub fn album(name: impl Into<String>, tracks: Vec<String>) -> Self {
        Playable::Album {
            name: name.into(),
            tracks,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Playable::Track { name } | Playable::Album { name, .. } => name,
        }
    }

    /// Absolute file paths, one per sub-item, in play order.
    pub fn file_paths(&self, root: &Path) -> Vec<PathBuf> {
        match self {
            Playable::Track { name } => vec![root.join(name)],
            Playable::Album { name, tracks } => {
                let dir = root.join(name);
                tracks.iter().map(|file| dir.join(file)).collect()
            }
        }
    }

    /// Display names of the sub-items. A track's only sub-item is itself.
    pub fn item_names(&self) -> &[String] {
        match self {
            Playable::Track { name } => std::slice::from_ref(name),
            Playable::Album { tracks, .. } => tracks,
        }
    }

    pub fn len(&self) -> usize {
        self.item_names().len()
    }

    pub fn is_empty(&self) -> bool {
        self.item_names().is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Library {
    root: PathBuf,
    playables: HashMap<String, Playable>,
    // Sorted key list, so random picks index into a stable slice
    names: Vec<String>,
}

impl Library {
    pub fn new(root: PathBuf, playables: impl IntoIterator<Item = Playable>) -> Self {
        let playables: HashMap<String, Playable> = playables
            .into_iter()
            .map(|p| (p.name().to_string(), p))
            .collect();

        let mut names: Vec<String> = playables.keys().cloned().collect();
        names.sort();

        Self {
            root,
            playables,
            names,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn get(&self, name: &str) -> Option<&Playable> {
        self.playables.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.playables.contains_key(name)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.playables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.playables.is_empty()
    }

    /// Uniform pick over every key. Repeats of the previous pick are allowed.
    pub fn random_name<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&str> {
        self.names.choose(rng).map(String::as_str)
    }

    pub fn albums(&self) -> impl Iterator<Item = &Playable> {
        self.playables
            .values()
            .filter(|p| matches!(p, Playable::Album { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn sample_library() -> Library {
        Library::new(
            PathBuf::from("/music"),
            vec![
                Playable::track("solo.mid"),
                Playable::album("album1", vec!["a.mid".into(), "b.mid".into()]),
            ],
        )
    }

    #[test]
    fn test_album_paths_follow_order() {
        let album = Playable::album("jazz/blue", vec!["2.mid".into(), "1.mid".into(), "2.mid".into()]);
        let paths = album.file_paths(Path::new("/music"));

        assert_eq!(
            paths,
            vec![
                PathBuf::from("/music/jazz/blue/2.mid"),
                PathBuf::from("/music/jazz/blue/1.mid"),
                PathBuf::from("/music/jazz/blue/2.mid"),
            ]
        );
        assert_eq!(album.len(), 3);
    }

    #[test]
    fn test_track_is_its_own_item() {
        let track = Playable::track("misc/intro.mid");

        assert_eq!(track.name(), "misc/intro.mid");
        assert_eq!(track.item_names(), ["misc/intro.mid".to_string()]);
        assert_eq!(
            track.file_paths(Path::new("/music")),
            vec![PathBuf::from("/music/misc/intro.mid")]
        );
    }

    #[test]
    fn test_random_name_is_always_a_key() {
        let library = sample_library();
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..200 {
            let name = library.random_name(&mut rng).unwrap();
            assert!(library.contains(name));
        }
    }

    #[test]
    fn test_random_name_on_empty_library() {
        let library = Library::default();
        let mut rng = StdRng::seed_from_u64(1);

        assert!(library.random_name(&mut rng).is_none());
        assert!(library.is_empty());
    }

    #[test]
    fn test_names_sorted() {
        let library = sample_library();
        assert_eq!(library.names(), ["album1".to_string(), "solo.mid".to_string()]);
        assert_eq!(library.albums().count(), 1);
    }
}
