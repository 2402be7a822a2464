// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gustavo Noronha Silva <gustavo@noronha.dev.br>

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("buffer of {len} bytes is too short for the common event header")]
    TruncatedHeader { len: usize },

    #[error("{event} needs {expected} bytes of payload, got {actual}")]
    TruncatedPayload {
        event: &'static str,
        expected: usize,
        actual: usize,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArgError {
    #[error("{event} has no argument {index}")]
    OutOfRange { event: &'static str, index: usize },

    #[error("{event} does not expose its arguments")]
    Unsupported { event: &'static str },
}
