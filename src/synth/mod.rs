// Synthesizer adapter - the boundary between the jukebox and whatever renders audio
// The orchestrator only ever sees the five capabilities on `Synthesizer`

pub mod fluidsynth; // one fluidsynth child process per track

pub use fluidsynth::FluidSynth;

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::oneshot;

/// Resolves once the loaded track finishes, naturally or because it was
/// stopped. A dropped sender counts as finished too.
pub type Completion = oneshot::Receiver<()>;

#[derive(Debug, Error)]
pub enum SynthError {
    #[error("failed to start synthesizer '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("not a soundfont: {0}")]
    InvalidSoundfont(PathBuf),
    #[error("not a MIDI file: {0}")]
    NotMidi(PathBuf),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to signal synthesizer process: {0}")]
    Signal(#[source] std::io::Error),
    #[error("nothing loaded")]
    NothingLoaded,
    #[error("{0} is not supported on this platform")]
    Unsupported(&'static str),
}

pub trait Synthesizer {
    /// Stage one file. The returned completion fires when that file is done.
    fn load(&mut self, path: &Path) -> Result<Completion, SynthError>;

    /// Start the staged file, or resume it after `pause`. Never blocks.
    fn play(&mut self) -> Result<(), SynthError>;

    /// Suspend output. Returns once the engine has acknowledged.
    fn pause(&mut self) -> Result<(), SynthError>;

    /// Abort the current file. Its completion still fires.
    fn stop(&mut self) -> Result<(), SynthError>;
}

/// Standard MIDI files start with an `MThd` chunk.
pub fn is_midi_file(path: &Path) -> Result<bool, SynthError> {
    let mut header = [0u8; 4];
    Ok(read_prefix(path, &mut header)? && &header == b"MThd")
}

/// SF2 files are RIFF containers of form type `sfbk`.
pub fn is_soundfont(path: &Path) -> Result<bool, SynthError> {
    let mut header = [0u8; 12];
    Ok(read_prefix(path, &mut header)? && &header[0..4] == b"RIFF" && &header[8..12] == b"sfbk")
}

fn read_prefix(path: &Path, buf: &mut [u8]) -> Result<bool, SynthError> {
    let io_err = |source| SynthError::Io {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(io_err)?;
    let mut limited = file.take(buf.len() as u64);
    let mut read = 0;
    while read < buf.len() {
        let n = limited.read(&mut buf[read..]).map_err(io_err)?;
        if n == 0 {
            return Ok(false);
        }
        read += n;
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_midi_header_check() {
        let dir = TempDir::new().unwrap();
        let midi = dir.path().join("a.mid");
        let text = dir.path().join("notes.txt");
        let short = dir.path().join("short.mid");
        std::fs::write(&midi, b"MThd\x00\x00\x00\x06").unwrap();
        std::fs::write(&text, b"hello world").unwrap();
        std::fs::write(&short, b"MT").unwrap();

        assert!(is_midi_file(&midi).unwrap());
        assert!(!is_midi_file(&text).unwrap());
        assert!(!is_midi_file(&short).unwrap());
        assert!(matches!(
            is_midi_file(&dir.path().join("missing.mid")),
            Err(SynthError::Io { .. })
        ));
    }

    #[test]
    fn test_soundfont_header_check() {
        let dir = TempDir::new().unwrap();
        let sf2 = dir.path().join("font.sf2");
        let wav = dir.path().join("sound.wav");
        std::fs::write(&sf2, b"RIFF\x10\x00\x00\x00sfbkLIST").unwrap();
        std::fs::write(&wav, b"RIFF\x10\x00\x00\x00WAVEfmt ").unwrap();

        assert!(is_soundfont(&sf2).unwrap());
        assert!(!is_soundfont(&wav).unwrap());
    }
}
