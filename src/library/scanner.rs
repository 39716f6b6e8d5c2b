use super::{Library, LibraryError, Playable};
use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// A directory containing a file with this name is an album.
pub const ORDER_FILENAME: &str = "order";

#[derive(Clone)]
pub struct LibraryScanner {
    order_filename: String,
    follow_links: bool,
}

impl LibraryScanner {
    pub fn new() -> Self {
        Self {
            order_filename: ORDER_FILENAME.to_string(),
            follow_links: true,
        }
    }

    /// Walk `root` and classify every regular file into albums and tracks.
    ///
    /// Files listed by an order file belong to that album. Everything else,
    /// order files included unless one lists itself, becomes a standalone
    /// track named by its path relative to `root`. Any read error is fatal.
    pub fn scan<P: AsRef<Path>>(&self, root: P) -> Result<Library, LibraryError> {
        let root = root.as_ref();
        let files = self.collect_files(root)?;

        let mut playables = Vec::new();
        let mut consumed: HashSet<PathBuf> = HashSet::new();

        // First pass: order files. Consumed status is settled before any
        // track is created, so walk order does not matter.
        for file in &files {
            let Some(album_name) = self.album_name_for(root, file) else {
                continue;
            };

            let tracks = read_order_file(file)?;
            let album_dir = root.join(&album_name);
            for track in &tracks {
                consumed.insert(album_dir.join(track));
            }

            debug!("Album '{}' with {} tracks", album_name, tracks.len());
            playables.push(Playable::album(album_name, tracks));
        }

        // Second pass: whatever is left is a standalone track
        for file in &files {
            if consumed.contains(file) {
                continue;
            }
            if let Some(name) = relative_name(root, file) {
                playables.push(Playable::track(name));
            }
        }

        let library = Library::new(root.to_path_buf(), playables);
        info!(
            "Scanned {}: {} playables ({} albums)",
            root.display(),
            library.len(),
            library.albums().count()
        );

        Ok(library)
    }

    fn collect_files(&self, root: &Path) -> Result<Vec<PathBuf>, LibraryError> {
        let mut files = Vec::new();

        for entry in WalkDir::new(root).follow_links(self.follow_links) {
            let entry = entry.map_err(|source| LibraryError::Walk {
                path: source
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| root.to_path_buf()),
                source,
            })?;

            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }

        Ok(files)
    }

    /// The album an order file defines, or `None` when `file` is not an
    /// order file below the root.
    fn album_name_for(&self, root: &Path, file: &Path) -> Option<String> {
        let is_order = file
            .file_name()
            .and_then(|n| n.to_str())
            .map_or(false, |n| n == self.order_filename);
        if !is_order {
            return None;
        }

        let dir = file.parent()?;
        relative_name(root, dir).filter(|name| !name.is_empty())
    }
}

impl Default for LibraryScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// One filename per line, blank lines skipped, duplicates kept.
fn read_order_file(path: &Path) -> Result<Vec<String>, LibraryError> {
    let content = fs::read_to_string(path).map_err(|source| LibraryError::OrderFile {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(content
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect())
}

/// `path` relative to `root`, `/`-separated.
fn relative_name(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"MThd").unwrap();
    }

    fn write_order(root: &Path, dir: &str, lines: &str) {
        let path = root.join(dir).join(ORDER_FILENAME);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, lines).unwrap();
    }

    #[test]
    fn test_order_file_defines_album() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "albumA/t1.mid");
        touch(dir.path(), "albumA/t2.mid");
        write_order(dir.path(), "albumA", "t1.mid\nt2.mid\n");

        let library = LibraryScanner::new().scan(dir.path()).unwrap();

        assert_eq!(
            library.get("albumA"),
            Some(&Playable::album("albumA", vec!["t1.mid".into(), "t2.mid".into()]))
        );
        assert!(!library.contains("albumA/t1.mid"));
        assert!(!library.contains("albumA/t2.mid"));
        // The marker is an ordinary file nobody listed
        assert_eq!(library.get("albumA/order"), Some(&Playable::track("albumA/order")));
        assert_eq!(library.len(), 2);
    }

    #[test]
    fn test_unreferenced_files_become_tracks() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "solo.mid");
        touch(dir.path(), "misc/deep/other.mid");
        touch(dir.path(), "albumA/t1.mid");
        touch(dir.path(), "albumA/bonus.mid");
        write_order(dir.path(), "albumA", "t1.mid\n");

        let library = LibraryScanner::new().scan(dir.path()).unwrap();

        assert_eq!(library.get("solo.mid"), Some(&Playable::track("solo.mid")));
        assert_eq!(
            library.get("misc/deep/other.mid"),
            Some(&Playable::track("misc/deep/other.mid"))
        );
        assert_eq!(
            library.get("albumA/bonus.mid"),
            Some(&Playable::track("albumA/bonus.mid"))
        );
        assert!(library.contains("albumA/order"));
        assert_eq!(library.len(), 5);
    }

    #[test]
    fn test_order_file_listing_itself_is_consumed() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "albumA/t1.mid");
        write_order(dir.path(), "albumA", "t1.mid\norder\n");

        let library = LibraryScanner::new().scan(dir.path()).unwrap();

        assert!(!library.contains("albumA/order"));
        assert_eq!(library.len(), 1);
    }

    #[test]
    fn test_nested_album_name_and_paths() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "games/doom/e1m1.mid");
        write_order(dir.path(), "games/doom", "e1m1.mid\n");

        let library = LibraryScanner::new().scan(dir.path()).unwrap();
        let album = library.get("games/doom").unwrap();

        assert_eq!(
            album.file_paths(library.root()),
            vec![dir.path().join("games/doom/e1m1.mid")]
        );
    }

    #[test]
    fn test_order_keeps_repeats_and_skips_blank_lines() {
        let dir = TempDir::new().unwrap();
        write_order(dir.path(), "loop", "b.mid\r\n\na.mid\nb.mid\n\n");

        let library = LibraryScanner::new().scan(dir.path()).unwrap();

        assert_eq!(
            library.get("loop").unwrap().item_names(),
            ["b.mid".to_string(), "a.mid".to_string(), "b.mid".to_string()]
        );
    }

    #[test]
    fn test_order_file_at_root_is_a_plain_file() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a.mid");
        fs::write(dir.path().join(ORDER_FILENAME), "a.mid\n").unwrap();

        let library = LibraryScanner::new().scan(dir.path()).unwrap();

        assert!(library.contains("a.mid"));
        assert!(library.contains(ORDER_FILENAME));
        assert_eq!(library.albums().count(), 0);
    }

    #[test]
    fn test_empty_root_gives_empty_library() {
        let dir = TempDir::new().unwrap();
        let library = LibraryScanner::new().scan(dir.path()).unwrap();
        assert!(library.is_empty());
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let dir = TempDir::new().unwrap();
        let result = LibraryScanner::new().scan(dir.path().join("nope"));
        assert!(matches!(result, Err(LibraryError::Walk { .. })));
    }
}
