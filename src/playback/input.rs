use std::io::{self, BufRead};
use std::thread;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Feed lines from `reader` into a single-slot channel.
///
/// Reading happens on a plain thread: a blocked stdin read must never hold
/// up runtime shutdown. The channel closes exactly once, when input ends.
pub fn spawn_line_reader<R>(mut reader: R) -> mpsc::Receiver<String>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(1);

    let spawned = thread::Builder::new()
        .name("midibox-input".to_string())
        .spawn(move || {
            let mut buf = Vec::new();
            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf) {
                    Ok(0) => break,
                    Ok(_) => {
                        if tx.blocking_send(decode_line(&buf)).is_err() {
                            // Orchestrator is gone
                            return;
                        }
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        warn!("Failed reading input: {}", e);
                        return;
                    }
                }
            }
            debug!("Input stream ended");
        });

    // Without a reader thread the sender is already dropped, which the
    // orchestrator sees as end of input.
    if let Err(e) = spawned {
        warn!("Failed to start input thread: {}", e);
    }

    rx
}

/// Strip the line ending. Bytes that are not UTF-8 are replaced rather than
/// ending input, so one bad line cannot quit the player.
fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

pub fn stdin_lines() -> mpsc::Receiver<String> {
    spawn_line_reader(std::io::BufReader::new(std::io::stdin()))
}
