// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gustavo Noronha Silva <gustavo@noronha.dev.br>

#![no_std]

use core::mem::size_of;

/// Bytes copied out of string-like syscall arguments.
pub const MAX_BUFFER_SIZE: usize = 256;

/// Size of the NUL-padded event name in [`CommonEvent`].
pub const EVENT_NAME_LEN: usize = 64;

pub const FD_INSTALL_EVENT: &str = "fd_install";
pub const CONNECT_V4_EVENT: &str = "connect_v4";
pub const ACCEPT_V4_EVENT: &str = "accept_v4";
pub const CLOSE_V4_EVENT: &str = "close_v4";
pub const CONNECT_V6_EVENT: &str = "connect_v6";
pub const ACCEPT_V6_EVENT: &str = "accept_v6";
pub const CLOSE_V6_EVENT: &str = "close_v6";

/// Header the probe puts in front of every record.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommonEvent {
    /// Monotonic clock, in nanoseconds.
    pub timestamp: u64,
    pub pid: i64,
    pub ret: i64,
    pub name: [u8; EVENT_NAME_LEN],
}

pub const COMMON_EVENT_SIZE: usize = size_of::<CommonEvent>();

const _: () = assert!(COMMON_EVENT_SIZE == 88);

impl CommonEvent {
    /// Names longer than [`EVENT_NAME_LEN`] - 1 bytes are cut so the field
    /// stays NUL-terminated.
    pub fn new(timestamp: u64, pid: i64, ret: i64, name: &str) -> Self {
        let mut buf = [0u8; EVENT_NAME_LEN];
        let len = name.len().min(EVENT_NAME_LEN - 1);
        buf[..len].copy_from_slice(&name.as_bytes()[..len]);

        CommonEvent {
            timestamp,
            pid,
            ret,
            name: buf,
        }
    }

    /// The name up to its first NUL byte.
    pub fn name_bytes(&self) -> &[u8] {
        let end = self
            .name
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(EVENT_NAME_LEN);
        &self.name[..end]
    }
}

/// A descriptor was installed into a process' file table.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileEventData {
    pub fd: u64,
    pub ino: u64,
    pub major: u64,
    pub minor: u64,
}

/// Addresses and ports as they sit in the socket, in network order.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConnectV4Data {
    pub saddr: u32,
    pub daddr: u32,
    pub sport: u16,
    pub dport: u16,
    pub netns: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConnectV6Data {
    pub saddr: [u8; 16],
    pub daddr: [u8; 16],
    pub sport: u16,
    pub dport: u16,
    pub netns: u32,
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct FileEventRecord {
    pub common: CommonEvent,
    pub data: FileEventData,
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct ConnectV4Record {
    pub common: CommonEvent,
    pub data: ConnectV4Data,
}

#[repr(C, packed)]
#[derive(Clone, Copy)]
pub struct ConnectV6Record {
    pub common: CommonEvent,
    pub data: ConnectV6Data,
}

const _: () = assert!(size_of::<FileEventData>() == 32);
const _: () = assert!(size_of::<ConnectV4Data>() == 16);
const _: () = assert!(size_of::<ConnectV6Data>() == 40);
const _: () = assert!(size_of::<FileEventRecord>() == COMMON_EVENT_SIZE + 32);
const _: () = assert!(size_of::<ConnectV4Record>() == COMMON_EVENT_SIZE + 16);
const _: () = assert!(size_of::<ConnectV6Record>() == COMMON_EVENT_SIZE + 40);

/// Per-syscall records, generated from the kernel's tracepoint formats.
pub mod records {
    use crate::{CommonEvent, COMMON_EVENT_SIZE, MAX_BUFFER_SIZE};

    include!(concat!(env!("OUT_DIR"), "/records_generated.rs"));
}

const _: () = assert!(records::GENERATED_BUFFER_SIZE == MAX_BUFFER_SIZE);
