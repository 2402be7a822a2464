// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gustavo Noronha Silva <gustavo@noronha.dev.br>

//! Messages shipped to metric collectors.

include!(concat!(env!("OUT_DIR"), "/wire_generated.rs"));

/// The `.proto` definition the types above mirror.
pub const PROTO: &str = include_str!(concat!(env!("OUT_DIR"), "/tracewell.proto"));
