use std::fs;
use std::io;
use std::os::unix::fs::FileTypeExt;
use std::os::unix::net::UnixStream;

use camino::{Utf8Path, Utf8PathBuf};
use nix::errno::Errno;
use nix::sys::signal::kill;
use nix::unistd::Pid;
use tracing::{info, warn};

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::files::{atomic_write, remove_if_present};

/// Owns the socket file and the pid record for one daemon run.
///
/// Only artefacts this run created are removed on release, so a guard that
/// loses a start-up race never deletes another daemon's socket.
#[derive(Debug)]
pub(crate) struct ProcessGuard {
    socket: Utf8PathBuf,
    pid_path: Utf8PathBuf,
    socket_bound: bool,
    pid_written: bool,
}

impl ProcessGuard {
    /// Claims the socket path, clearing artefacts left by a dead daemon.
    pub(crate) fn acquire(socket: &Utf8Path, pid_path: &Utf8Path) -> Result<Self, LaunchError> {
        let recorded = read_pid(pid_path);
        if socket_answers(socket) {
            info!(
                target: PROCESS_TARGET,
                socket = %socket,
                pid = ?recorded,
                "refusing to start: existing daemon answers on socket"
            );
            return Err(LaunchError::AlreadyRunning {
                socket: socket.to_path_buf(),
                pid: recorded,
            });
        }

        if let Some(pid) = recorded {
            if check_process(pid)? {
                warn!(
                    target: PROCESS_TARGET,
                    pid,
                    "pid record names a live process but its socket does not answer; treating as stale"
                );
            } else {
                info!(target: PROCESS_TARGET, pid, "removing stale pid record");
            }
        }
        remove_file(pid_path)?;
        remove_stale_socket(socket)?;

        Ok(Self {
            socket: socket.to_path_buf(),
            pid_path: pid_path.to_path_buf(),
            socket_bound: false,
            pid_written: false,
        })
    }

    /// Records that the listener now owns the socket file.
    pub(crate) fn mark_socket_bound(&mut self) {
        self.socket_bound = true;
    }

    /// Writes the pid record next to the socket.
    pub(crate) fn write_pid(&mut self, pid: u32) -> Result<(), LaunchError> {
        atomic_write(self.pid_path.as_std_path(), format!("{pid}\n").as_bytes()).map_err(
            |source| LaunchError::PidWrite {
                path: self.pid_path.clone(),
                source,
            },
        )?;
        self.pid_written = true;
        info!(
            target: PROCESS_TARGET,
            pid,
            file = %self.pid_path,
            "pid record written"
        );
        Ok(())
    }

    /// Removes the socket and pid record. Safe to call repeatedly.
    pub(crate) fn release(&mut self) {
        if self.socket_bound {
            release_file(&self.socket, "socket");
            self.socket_bound = false;
        }
        if self.pid_written {
            release_file(&self.pid_path, "pid record");
            self.pid_written = false;
        }
    }
}

impl Drop for ProcessGuard {
    fn drop(&mut self) {
        self.release();
    }
}

fn release_file(path: &Utf8Path, kind: &'static str) {
    if let Err(error) = remove_if_present(path.as_std_path()) {
        warn!(
            target: PROCESS_TARGET,
            file = %path,
            kind,
            error = %error,
            "failed to remove runtime file"
        );
    }
}

fn socket_answers(socket: &Utf8Path) -> bool {
    UnixStream::connect(socket.as_std_path()).is_ok()
}

fn remove_stale_socket(socket: &Utf8Path) -> Result<(), LaunchError> {
    match fs::symlink_metadata(socket.as_std_path()) {
        Ok(metadata) if metadata.file_type().is_socket() => {
            info!(target: PROCESS_TARGET, socket = %socket, "removing stale socket");
            remove_file(socket)
        }
        // Anything else is left for the listener to reject.
        Ok(_) => Ok(()),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(LaunchError::Cleanup {
            path: socket.to_path_buf(),
            source,
        }),
    }
}

pub(crate) fn read_pid(path: &Utf8Path) -> Option<u32> {
    let content = fs::read_to_string(path).ok()?;
    content.trim().parse::<u32>().ok().filter(|pid| *pid != 0)
}

fn remove_file(path: &Utf8Path) -> Result<(), LaunchError> {
    remove_if_present(path.as_std_path())
        .map(|_| ())
        .map_err(|source| LaunchError::Cleanup {
            path: path.to_path_buf(),
            source,
        })
}

fn check_process(pid: u32) -> Result<bool, LaunchError> {
    let Ok(raw) = i32::try_from(pid) else {
        return Ok(false);
    };
    match kill(Pid::from_raw(raw), None) {
        Ok(()) | Err(Errno::EPERM) => Ok(true),
        Err(Errno::ESRCH | Errno::ECHILD) => Ok(false),
        Err(errno) => Err(LaunchError::CheckProcess { pid, source: errno }),
    }
}
