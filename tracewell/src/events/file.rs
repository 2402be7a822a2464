// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gustavo Noronha Silva <gustavo@noronha.dev.br>

use std::mem::size_of;

use bytes::Buf as _;
use tracewell_common::{FileEventData, FD_INSTALL_EVENT};

use super::TraceEvent;
use crate::{
    context::Context,
    error::{ArgError, DecodeError},
    format_helpers::ensure_payload,
    header::Header,
    procfs::FileIdentity,
    wire::Metric,
};

/// A descriptor was installed; the tracker learns what it points at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileEvent {
    pub fd: u64,
    pub ino: u64,
    pub major: u64,
    pub minor: u64,
    pub path: String,
}

impl FileEvent {
    pub const PAYLOAD_SIZE: usize = size_of::<FileEventData>();

    pub fn decode(
        header: &Header,
        payload: &mut &[u8],
        ctx: &Context,
    ) -> Result<Self, DecodeError> {
        ensure_payload(FD_INSTALL_EVENT, payload, Self::PAYLOAD_SIZE)?;

        let fd = payload.get_u64_ne();
        let ino = payload.get_u64_ne();
        let major = payload.get_u64_ne();
        let minor = payload.get_u64_ne();

        let path = ctx.install_fd(
            header.pid as u32,
            fd as u32,
            FileIdentity { ino, major, minor },
        );

        Ok(FileEvent {
            fd,
            ino,
            major,
            minor,
            path,
        })
    }
}

impl TraceEvent for FileEvent {
    fn render(&self, _ret: i64) -> String {
        format!("Fd {} ", self.fd)
    }

    fn arg(&self, _n: usize, _ret: i64) -> Result<String, ArgError> {
        Err(ArgError::Unsupported {
            event: FD_INSTALL_EVENT,
        })
    }

    fn args(&self, _ret: i64) -> Vec<(&'static str, String)> {
        vec![("fd", format!("{}<{}>", self.fd, self.path))]
    }

    fn metric(&self) -> Option<Metric> {
        None
    }
}
