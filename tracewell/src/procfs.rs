// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gustavo Noronha Silva <gustavo@noronha.dev.br>

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use nix::sys::stat::{major, minor, stat};

/// Identity of a file: inode plus the device it lives on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FileIdentity {
    pub ino: u64,
    pub major: u64,
    pub minor: u64,
}

/// Access to other processes' views of the filesystem.
pub trait ProcFs: Send + Sync {
    /// Target of `/proc/<pid>/fd/<fd>`.
    fn readlink_fd(&self, pid: u32, fd: u32) -> io::Result<PathBuf>;

    /// Identity of `path` as seen from the root of `pid`.
    fn stat(&self, pid: u32, path: &Path) -> io::Result<FileIdentity>;
}

/// The `/proc` of the machine we run on.
#[derive(Clone, Debug)]
pub struct HostProcFs {
    root: PathBuf,
}

impl Default for HostProcFs {
    fn default() -> Self {
        HostProcFs {
            root: PathBuf::from("/proc"),
        }
    }
}

impl HostProcFs {
    /// A procfs mounted somewhere other than `/proc`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        HostProcFs { root: root.into() }
    }

    fn pid_dir(&self, pid: u32) -> PathBuf {
        self.root.join(pid.to_string())
    }
}

impl ProcFs for HostProcFs {
    fn readlink_fd(&self, pid: u32, fd: u32) -> io::Result<PathBuf> {
        fs::read_link(self.pid_dir(pid).join("fd").join(fd.to_string()))
    }

    fn stat(&self, pid: u32, path: &Path) -> io::Result<FileIdentity> {
        // Joining an absolute path would replace the process root.
        let relative = path.strip_prefix("/").unwrap_or(path);
        let full = self.pid_dir(pid).join("root").join(relative);

        let st = stat(full.as_path()).map_err(io::Error::from)?;

        Ok(FileIdentity {
            ino: st.st_ino as u64,
            major: major(st.st_dev),
            minor: minor(st.st_dev),
        })
    }
}
