// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gustavo Noronha Silva <gustavo@noronha.dev.br>

//! One event per traced syscall, generated from the kernel's tracepoint
//! formats.

use bytes::Buf as _;
use tracewell_common::MAX_BUFFER_SIZE;

use super::TraceEvent;
use crate::{
    context::Context,
    error::{ArgError, DecodeError},
    format_helpers::{c_str, ensure_payload, read_buffer, ret_bounded},
    header::Header,
    wire::*,
};

include!(concat!(env!("OUT_DIR"), "/events_generated.rs"));
