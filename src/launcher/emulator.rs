use std::{
    fs::OpenOptions,
    io,
    path::{Path, PathBuf},
    process::{Child, Command, Stdio},
};

use log::{error, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("cannot resolve {path}: {source}")]
    UnresolvablePath {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("no emulator command configured")]
    EmptyCommand,
    #[error("cannot start emulator: {0}")]
    Io(#[from] io::Error),
}

/// Background emulator process started for one cartridge.
pub struct Emulator {
    child: Child,
    rom: PathBuf,
}

impl Emulator {
    /// Starts `command <absolute rom path>` with its output appended to `log`.
    /// The first word of `command` is the program, the rest are passed
    /// ahead of the ROM path.
    pub fn launch(command: &str, rom: &Path, log: &Path) -> Result<Emulator, LaunchError> {
        let mut words = command.split_whitespace();
        let program = words.next().ok_or(LaunchError::EmptyCommand)?;
        let rom = rom
            .canonicalize()
            .map_err(|source| LaunchError::UnresolvablePath {
                path: rom.to_path_buf(),
                source,
            })?;
        let log_file = OpenOptions::new().create(true).append(true).open(log)?;

        info!("launching {} with {}", rom.display(), command);
        let child = Command::new(program)
            .args(words)
            .arg(&rom)
            .stdin(Stdio::null())
            .stdout(log_file.try_clone()?)
            .stderr(log_file)
            .spawn()?;
        info!("emulator pid {}, output in {}", child.id(), log.display());

        Ok(Emulator { child, rom })
    }

    /// Returns true once the process has exited.
    pub fn poll(&mut self) -> bool {
        match self.child.try_wait() {
            Ok(Some(status)) if status.success() => {
                info!("emulator for {} exited", self.rom.display());
                true
            }
            Ok(Some(status)) => {
                warn!("emulator for {} exited with {status}", self.rom.display());
                true
            }
            Ok(None) => false,
            Err(err) => {
                error!("cannot query emulator state: {err}");
                true
            }
        }
    }
}
