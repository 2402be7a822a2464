// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gustavo Noronha Silva <gustavo@noronha.dev.br>

use std::{
    borrow::Cow,
    net::{Ipv4Addr, Ipv6Addr},
};

use bytes::Buf as _;
use tracewell_common::MAX_BUFFER_SIZE;

use crate::error::DecodeError;

/// The bytes of a C string buffer up to the first NUL, or all of them.
pub fn c_str(buf: &[u8]) -> &[u8] {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    &buf[..end]
}

/// The part of `buf` a read or write actually transferred.
pub fn ret_bounded(buf: &[u8], ret: i64) -> &[u8] {
    if ret <= 0 {
        return &[];
    }

    let len = usize::try_from(ret).map_or(buf.len(), |ret| ret.min(buf.len()));
    &buf[..len]
}

/// Takes a by-value string argument off the front of `payload`.
///
/// Callers check the payload size first.
pub fn read_buffer(payload: &mut &[u8]) -> [u8; MAX_BUFFER_SIZE] {
    let mut buf = [0u8; MAX_BUFFER_SIZE];
    payload.copy_to_slice(&mut buf);
    buf
}

pub fn ensure_payload(
    event: &'static str,
    payload: &[u8],
    expected: usize,
) -> Result<(), DecodeError> {
    if payload.len() < expected {
        return Err(DecodeError::TruncatedPayload {
            event,
            expected,
            actual: payload.len(),
        });
    }
    Ok(())
}

/// IPv4 address as stored in the socket, i.e. network order in memory.
pub fn format_ipv4(addr: u32) -> String {
    Ipv4Addr::from(addr.to_ne_bytes()).to_string()
}

pub fn format_ipv6(addr: [u8; 16]) -> String {
    Ipv6Addr::from(addr).to_string()
}

/// Gives meaning to the value a syscall returned.
pub fn format_return_value(syscall: &str, return_value: i64) -> Cow<'static, str> {
    // Handle the common error case first
    if return_value == -1 {
        return Cow::Borrowed("-1 (error)");
    }

    match syscall {
        // File descriptor returning syscalls - show success with fd number
        "open" => {
            if return_value >= 0 {
                Cow::Owned(format!("{return_value} (fd)"))
            } else {
                Cow::Owned(format!("{return_value} (error)"))
            }
        }

        // Byte count returning syscalls - show success with byte count
        "read" | "write" => {
            if return_value >= 0 {
                Cow::Owned(format!("{return_value} (bytes)"))
            } else {
                Cow::Owned(format!("{return_value} (error)"))
            }
        }

        // Boolean-like syscalls - 0 for success, non-zero for error
        "close" | "mkdir" | "mkdirat" | "chmod" | "fchmod" | "fchmodat" | "chown" | "fchown"
        | "fchownat" => match return_value {
            0 => Cow::Borrowed("0 (success)"),
            _ => Cow::Owned(format!("{return_value} (error)")),
        },

        _ if return_value < 0 => Cow::Owned(format!("{return_value} (error)")),
        _ => Cow::Owned(return_value.to_string()),
    }
}
