// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gustavo Noronha Silva <gustavo@noronha.dev.br>

use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

/// What a descriptor pointed at when it was installed.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FdInfo {
    pub path: PathBuf,
    pub ino: u64,
    pub major: u64,
    pub minor: u64,
}

/// Last known identity of every tracked descriptor, per process.
///
/// A single lock guards the whole table; no operation holds it across I/O.
#[derive(Debug, Default)]
pub struct FdMap {
    pids: RwLock<HashMap<u32, HashMap<u32, FdInfo>>>,
}

impl FdMap {
    pub fn new() -> Self {
        Self::default()
    }

    // Entries are written whole, so a poisoned table is still consistent.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<u32, HashMap<u32, FdInfo>>> {
        self.pids.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<u32, HashMap<u32, FdInfo>>> {
        self.pids.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn put(&self, pid: u32, fd: u32, info: FdInfo) {
        self.write().entry(pid).or_default().insert(fd, info);
    }

    pub fn get(&self, pid: u32, fd: u32) -> Option<FdInfo> {
        self.read().get(&pid)?.get(&fd).cloned()
    }

    pub fn delete(&self, pid: u32, fd: u32) {
        let mut pids = self.write();
        if let Some(fds) = pids.get_mut(&pid) {
            fds.remove(&fd);
            if fds.is_empty() {
                pids.remove(&pid);
            }
        }
    }

    /// Forgets everything about a process.
    pub fn delete_pid(&self, pid: u32) {
        self.write().remove(&pid);
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    /// Number of descriptors tracked across all processes.
    pub fn len(&self) -> usize {
        self.read().values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn pid_len(&self, pid: u32) -> usize {
        self.read().get(&pid).map_or(0, HashMap::len)
    }
}
