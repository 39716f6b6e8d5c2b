use super::{is_midi_file, is_soundfont, Completion, SynthError, Synthesizer};
use crate::config::SynthConfig;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Plays each file through its own `fluidsynth` child process.
///
/// Pause and resume are `SIGSTOP`/`SIGCONT` on the child, stop kills it.
/// A watcher task per child fires the track's completion when the process
/// exits for any reason.
pub struct FluidSynth {
    command: String,
    args: Vec<String>,
    staged: Option<Staged>,
    running: Option<Running>,
}

struct Staged {
    path: PathBuf,
    done_tx: oneshot::Sender<()>,
}

struct Running {
    pid: Option<u32>,
    kill_tx: oneshot::Sender<()>,
    paused: bool,
}

impl Running {
    // The watcher drops its receiver once the child has exited
    fn is_alive(&self) -> bool {
        !self.kill_tx.is_closed()
    }
}

impl FluidSynth {
    pub fn new(config: &SynthConfig) -> Result<Self, SynthError> {
        if !is_soundfont(&config.soundfont)? {
            return Err(SynthError::InvalidSoundfont(config.soundfont.clone()));
        }

        // Make sure the binary is actually there before we promise to play
        std::process::Command::new(&config.command)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|source| SynthError::Spawn {
                command: config.command.clone(),
                source,
            })?;

        let mut args = vec![
            "-a".to_string(),
            config.audio_driver.clone(),
            "-m".to_string(),
            config.midi_driver.clone(),
            "-l".to_string(),
            "-i".to_string(),
        ];
        args.extend(config.extra_args.iter().cloned());
        args.push(config.soundfont.to_string_lossy().into_owned());

        info!(
            "Synthesizer ready: {} (driver {}, soundfont {})",
            config.command,
            config.audio_driver,
            config.soundfont.display()
        );

        Ok(Self {
            command: config.command.clone(),
            args,
            staged: None,
            running: None,
        })
    }

    fn spawn(&mut self, staged: Staged) -> Result<(), SynthError> {
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .arg(&staged.path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SynthError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        let pid = child.id();
        let (kill_tx, kill_rx) = oneshot::channel::<()>();
        let done_tx = staged.done_tx;
        let path = staged.path;

        debug!("Started {} for {} (pid {:?})", self.command, path.display(), pid);

        tokio::spawn(async move {
            tokio::select! {
                status = child.wait() => match status {
                    Ok(status) => debug!("{} finished: {}", path.display(), status),
                    Err(e) => warn!("Failed waiting on synthesizer for {}: {}", path.display(), e),
                },
                _ = kill_rx => {
                    if let Err(e) = child.kill().await {
                        warn!("Failed to kill synthesizer for {}: {}", path.display(), e);
                    }
                    debug!("{} stopped", path.display());
                }
            }
            let _ = done_tx.send(());
        });

        self.running = Some(Running {
            pid,
            kill_tx,
            paused: false,
        });
        Ok(())
    }
}

impl Synthesizer for FluidSynth {
    fn load(&mut self, path: &Path) -> Result<Completion, SynthError> {
        self.stop()?;

        if !is_midi_file(path)? {
            return Err(SynthError::NotMidi(path.to_path_buf()));
        }

        let (done_tx, done_rx) = oneshot::channel();
        self.staged = Some(Staged {
            path: path.to_path_buf(),
            done_tx,
        });
        Ok(done_rx)
    }

    fn play(&mut self) -> Result<(), SynthError> {
        if let Some(running) = self.running.as_mut() {
            if running.paused && running.is_alive() {
                if let Some(pid) = running.pid {
                    signal(pid, Signal::Continue)?;
                }
                running.paused = false;
            }
            return Ok(());
        }

        match self.staged.take() {
            Some(staged) => self.spawn(staged),
            None => Err(SynthError::NothingLoaded),
        }
    }

    fn pause(&mut self) -> Result<(), SynthError> {
        if let Some(running) = self.running.as_mut() {
            if !running.paused && running.is_alive() {
                if let Some(pid) = running.pid {
                    signal(pid, Signal::Stop)?;
                }
                running.paused = true;
            }
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), SynthError> {
        if let Some(running) = self.running.take() {
            // SIGKILL reaches a stopped process too
            let _ = running.kill_tx.send(());
        }
        if let Some(staged) = self.staged.take() {
            // Never started, so nobody else will report it done
            let _ = staged.done_tx.send(());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
enum Signal {
    Stop,
    Continue,
}

#[cfg(unix)]
fn signal(pid: u32, sig: Signal) -> Result<(), SynthError> {
    let sig = match sig {
        Signal::Stop => libc::SIGSTOP,
        Signal::Continue => libc::SIGCONT,
    };

    let rc = unsafe { libc::kill(pid as libc::pid_t, sig) };
    if rc == -1 {
        return Err(SynthError::Signal(std::io::Error::last_os_error()));
    }
    Ok(())
}

#[cfg(not(unix))]
fn signal(_pid: u32, sig: Signal) -> Result<(), SynthError> {
    match sig {
        Signal::Stop => Err(SynthError::Unsupported("pause")),
        Signal::Continue => Err(SynthError::Unsupported("resume")),
    }
}
