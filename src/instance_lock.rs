//! Per-pin single instance lock using a Unix socket.
//!
//! Two processes driving the same pin would fight over its level, so each
//! pin gets its own socket. The OS drops the socket when the holder dies,
//! so a crashed process never leaves the pin locked.

use std::io;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error types for instance lock operations.
#[derive(Debug, Error)]
pub enum InstanceLockError {
    /// Another process already drives this pin.
    #[error("another instance is already driving pin {0}")]
    AlreadyRunning(u8),

    /// I/O error during lock acquisition.
    #[error("failed to acquire instance lock: {0}")]
    Io(#[from] io::Error),
}

/// Held for as long as this process drives the pin.
pub struct InstanceLock {
    _listener: UnixListener,
    path: PathBuf,
}

impl InstanceLock {
    /// Lock `pin` using a socket in the default runtime directory.
    pub fn acquire(pin: u8) -> Result<Self, InstanceLockError> {
        let runtime_dir = std::env::var_os("XDG_RUNTIME_DIR").map(PathBuf::from);
        Self::acquire_at(socket_path(runtime_dir.as_deref(), pin), pin)
    }

    /// Lock `pin` using the socket at `path`.
    pub fn acquire_at(path: PathBuf, pin: u8) -> Result<Self, InstanceLockError> {
        if path.exists() {
            // A live holder accepts connections; a stale socket file does not
            if UnixStream::connect(&path).is_ok() {
                return Err(InstanceLockError::AlreadyRunning(pin));
            }
            let _ = std::fs::remove_file(&path);
        }

        match UnixListener::bind(&path) {
            Ok(listener) => Ok(Self {
                _listener: listener,
                path,
            }),
            Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                Err(InstanceLockError::AlreadyRunning(pin))
            }
            Err(e) => Err(InstanceLockError::Io(e)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Socket path for `pin`, under `runtime_dir` or `/tmp`.
pub fn socket_path(runtime_dir: Option<&Path>, pin: u8) -> PathBuf {
    runtime_dir
        .unwrap_or_else(|| Path::new("/tmp"))
        .join(format!("gpio-status-sync-{}.sock", pin))
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "gpio-status-sync-test-{}-{}",
            name,
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_socket_path_uses_runtime_dir() {
        let path = socket_path(Some(Path::new("/run/user/1000")), 17);
        assert_eq!(
            path,
            PathBuf::from("/run/user/1000/gpio-status-sync-17.sock")
        );
    }

    #[test]
    fn test_socket_path_fallback_to_tmp() {
        assert_eq!(
            socket_path(None, 4),
            PathBuf::from("/tmp/gpio-status-sync-4.sock")
        );
    }

    #[test]
    fn test_second_lock_on_same_pin_fails() {
        let dir = scratch_dir("same-pin");
        let path = socket_path(Some(&dir), 17);

        let first = InstanceLock::acquire_at(path.clone(), 17).unwrap();
        let second = InstanceLock::acquire_at(path.clone(), 17);
        assert!(matches!(second, Err(InstanceLockError::AlreadyRunning(17))));

        drop(first);
        assert!(!path.exists());
        let third = InstanceLock::acquire_at(path, 17);
        assert!(third.is_ok());
    }

    #[test]
    fn test_stale_socket_is_replaced() {
        let dir = scratch_dir("stale");
        let path = socket_path(Some(&dir), 22);
        std::fs::write(&path, b"").unwrap();

        let lock = InstanceLock::acquire_at(path.clone(), 22).unwrap();
        assert_eq!(lock.path(), path.as_path());
    }
}
