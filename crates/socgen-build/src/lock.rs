//! Exclusive lock on a build output directory.

use std::fs::{self, File, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::thread;
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::error::{BuildError, Result};
use crate::toolchain::CancelToken;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A lock file created with exclusive-create semantics.
///
/// The file holds a random token on its first line and the holder's process
/// id on the second. Dropping the guard removes the file, but only while it
/// still carries that token. A lock whose holder process no longer exists is
/// reclaimed by the next [`BuildLock::try_acquire`].
#[derive(Debug)]
pub struct BuildLock {
    path: PathBuf,
    token: Uuid,
}

impl BuildLock {
    /// Take the lock or fail at once with [`BuildError::LockContention`].
    pub fn try_acquire(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match Self::create(path) {
            Err(BuildError::LockContention { .. }) if reclaim_stale(path)? => Self::create(path),
            other => other,
        }
    }

    /// Take the lock, polling until `timeout` elapses or `cancel` is set.
    pub fn acquire(path: impl AsRef<Path>, timeout: Duration, cancel: &CancelToken) -> Result<Self> {
        let path = path.as_ref();
        let deadline = Instant::now() + timeout;
        let mut announced = false;
        loop {
            match Self::try_acquire(path) {
                Err(BuildError::LockContention { .. }) if cancel.is_cancelled() => {
                    return Err(BuildError::Cancelled);
                }
                Err(BuildError::LockContention { holder, .. }) if Instant::now() < deadline => {
                    if !announced {
                        log::info!("waiting for build {holder} to release {}", path.display());
                        announced = true;
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                other => return other,
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn token(&self) -> Uuid {
        self.token
    }

    fn create(path: &Path) -> Result<Self> {
        let token = Uuid::new_v4();
        let contents = format!("{token}\n{}\n", process::id());
        match write_new(path, |file| file.write_all(contents.as_bytes())) {
            Ok(()) => {
                log::debug!("acquired build lock {} ({token})", path.display());
                Ok(Self {
                    path: path.to_path_buf(),
                    token,
                })
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(BuildError::LockContention {
                path: path.to_path_buf(),
                holder: holder(path),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

/// Create `path` exclusively and fill it; a failed fill removes the file.
fn write_new(path: &Path, fill: impl FnOnce(&mut File) -> io::Result<()>) -> io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    if let Err(e) = fill(&mut file) {
        drop(file);
        if let Err(rm) = fs::remove_file(path) {
            log::warn!("failed to remove partial build lock {}: {rm}", path.display());
        }
        return Err(e);
    }
    Ok(())
}

fn holder(path: &Path) -> String {
    match fs::read_to_string(path) {
        Ok(s) => match s.lines().next().map(str::trim) {
            Some(token) if !token.is_empty() => token.to_string(),
            _ => "unknown".to_string(),
        },
        Err(_) => "unknown".to_string(),
    }
}

fn holder_pid(contents: &str) -> Option<u32> {
    contents.lines().nth(1)?.trim().parse().ok()
}

/// Remove a lock left by a process that no longer runs.
fn reclaim_stale(path: &Path) -> Result<bool> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(true),
        Err(e) => return Err(e.into()),
    };
    let Some(pid) = holder_pid(&contents) else {
        return Ok(false);
    };
    if process_alive(pid) {
        return Ok(false);
    }
    // Another process may have reclaimed and re-locked meanwhile.
    if fs::read_to_string(path).ok().as_deref() != Some(contents.as_str()) {
        return Ok(false);
    }
    log::warn!(
        "reclaiming build lock {} from exited process {pid}",
        path.display()
    );
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(true),
        Err(e) => Err(e.into()),
    }
}

#[cfg(unix)]
fn process_alive(pid: u32) -> bool {
    let Ok(pid) = libc::pid_t::try_from(pid) else {
        return false;
    };
    // SAFETY: signal 0 performs the permission and existence checks only.
    let ret = unsafe { libc::kill(pid, 0) };
    ret == 0 || io::Error::last_os_error().raw_os_error() == Some(libc::EPERM)
}

#[cfg(not(unix))]
fn process_alive(_pid: u32) -> bool {
    true
}

impl Drop for BuildLock {
    fn drop(&mut self) {
        if holder(&self.path) != self.token.to_string() {
            log::warn!("build lock {} was taken over; leaving it", self.path.display());
            return;
        }
        if let Err(e) = fs::remove_file(&self.path) {
            log::warn!("failed to release build lock {}: {e}", self.path.display());
        }
    }
}
