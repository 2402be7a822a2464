// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gustavo Noronha Silva <gustavo@noronha.dev.br>

use std::io::ErrorKind;

use log::{debug, trace};

use crate::{
    fdmap::{FdInfo, FdMap},
    procfs::{FileIdentity, HostProcFs, ProcFs},
};

/// Shown when a descriptor's target can't be trusted.
pub const UNKNOWN_PATH: &str = "unknown";

/// State shared by every decode: the descriptor table and the way to look at
/// traced processes.
pub struct Context {
    fds: FdMap,
    procfs: Box<dyn ProcFs>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    pub fn new() -> Self {
        Self::with_procfs(HostProcFs::default())
    }

    pub fn with_procfs(procfs: impl ProcFs + 'static) -> Self {
        Context {
            fds: FdMap::new(),
            procfs: Box::new(procfs),
        }
    }

    pub fn fds(&self) -> &FdMap {
        &self.fds
    }

    /// Records the file behind a freshly installed descriptor and returns its
    /// path. Only absolute paths are tracked; sockets, pipes and anonymous
    /// inodes are not.
    pub fn install_fd(&self, pid: u32, fd: u32, identity: FileIdentity) -> String {
        let path = match self.procfs.readlink_fd(pid, fd) {
            Ok(path) => path,
            Err(e) => {
                debug!("Could not read link for fd {fd} of pid {pid}: {e}");
                return UNKNOWN_PATH.to_string();
            }
        };

        let display = path.to_string_lossy().into_owned();

        if path.is_absolute() {
            self.fds.put(
                pid,
                fd,
                FdInfo {
                    path,
                    ino: identity.ino,
                    major: identity.major,
                    minor: identity.minor,
                },
            );
        } else {
            trace!("Not tracking fd {fd} of pid {pid}: {display}");
        }

        display
    }

    /// Path of a tracked descriptor, if the file it was installed for is
    /// still the one at that path.
    pub fn resolve_fd_path(&self, pid: u32, fd: u32) -> String {
        // Copy the entry out so the lock isn't held across the stat.
        let Some(info) = self.fds.get(pid, fd) else {
            return UNKNOWN_PATH.to_string();
        };

        let path = info.path.to_string_lossy();

        match self.procfs.stat(pid, &info.path) {
            Ok(current)
                if current.ino == info.ino
                    && current.major == info.major
                    && current.minor == info.minor =>
            {
                // The descriptor may have been closed or reused while the lock
                // was released.
                if self.fds.get(pid, fd).as_ref() == Some(&info) {
                    path.into_owned()
                } else {
                    debug!("fd {fd} of pid {pid} changed while resolving {path}");
                    UNKNOWN_PATH.to_string()
                }
            }
            Ok(current) => {
                debug!(
                    "fd {fd} of pid {pid} went stale: {path} is now {}:{}/{}",
                    current.major, current.minor, current.ino
                );
                UNKNOWN_PATH.to_string()
            }
            Err(e) if e.kind() == ErrorKind::NotFound => format!("[deleted] ({path:?})?"),
            Err(e) => {
                debug!("Could not stat {path} for pid {pid}: {e}");
                UNKNOWN_PATH.to_string()
            }
        }
    }

    pub fn forget_fd(&self, pid: u32, fd: u32) {
        self.fds.delete(pid, fd);
    }

    /// To be called by the owner of the event loop when a traced process
    /// goes away.
    pub fn process_exited(&self, pid: u32) {
        self.fds.delete_pid(pid);
    }
}
