// midibox library - core modules for the command-line MIDI jukebox
// Scanner builds the library once, the orchestrator plays it until quit

pub mod config;   // settings and defaults
pub mod library;  // tracks, albums, directory scanning
pub mod notify;   // now-playing and error messages
pub mod playback; // queue, commands, state machine
pub mod synth;    // synthesizer adapter

// Export the stuff the binary actually uses
pub use config::Config;
pub use library::{Library, LibraryScanner, Playable};
pub use notify::{Notification, Notifier};
pub use playback::{Command, Orchestrator, PlayQueue, PlaybackState};
pub use synth::{FluidSynth, Synthesizer};
