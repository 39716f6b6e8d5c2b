// Playback - the queue, the command grammar and the loop that ties them together
// Single owner of all mutable state, fed by the input thread and completion watchers

pub mod command;      // one input line -> one action
pub mod input;        // stdin line producer
pub mod orchestrator; // the state machine
pub mod queue;        // FIFO of playable names
pub mod state;        // playback flags and phase

pub use command::Command;
pub use input::{spawn_line_reader, stdin_lines};
pub use orchestrator::Orchestrator;
pub use queue::PlayQueue;
pub use state::{Phase, PlaybackState};
