// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gustavo Noronha Silva <gustavo@noronha.dev.br>

//! Decodes the records a syscall tracing probe emits into typed events, keeping
//! track of which file every traced descriptor refers to.

pub mod context;
pub mod error;
pub mod events;
pub mod fdmap;
pub mod format_helpers;
pub mod formatting;
pub mod header;
pub mod procfs;
pub mod wire;

pub use context::Context;
pub use error::{ArgError, DecodeError};
pub use events::{decode_buffer, DecodedEvent, Event, TraceEvent};
pub use fdmap::{FdInfo, FdMap};
pub use header::Header;
