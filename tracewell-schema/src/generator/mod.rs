// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gustavo Noronha Silva <gustavo@noronha.dev.br>

//! Renders compiled schemas into source text for each target.

use anyhow::{bail, ensure};

use crate::compiler::SyscallSchemas;

mod decoder;
mod records;
mod wire;

pub use decoder::generate_decoder;
pub use records::generate_records;
pub use wire::{generate_proto, generate_wire};

pub(crate) const HEADER: &str = "\
// Generated file, do not edit.
// Source: tracewell-schema
";

/// Everything generated from one set of schemas.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifacts {
    /// Rust decoder events, included by the `tracewell` crate.
    pub decoder: String,
    /// Rust kernel records, included by the `tracewell-common` crate.
    pub records: String,
    /// Rust mirror of the wire messages.
    pub wire: String,
    /// Protocol buffers definition of the wire messages.
    pub proto: String,
}

pub fn generate(schemas: &SyscallSchemas) -> anyhow::Result<Artifacts> {
    Ok(Artifacts {
        decoder: generate_decoder(schemas)?,
        records: generate_records(schemas)?,
        wire: generate_wire(schemas)?,
        proto: generate_proto(schemas)?,
    })
}

/// Checks that the three variants describe the same syscalls with the same
/// fields, in the same order and at compatible widths. Any divergence would
/// silently corrupt decoding.
pub fn check_aligned(schemas: &SyscallSchemas) -> anyhow::Result<()> {
    ensure!(!schemas.is_empty(), "no syscalls to generate");
    ensure!(
        schemas.decoder.len() == schemas.kernel.len() && schemas.decoder.len() == schemas.wire.len(),
        "schema variants disagree on the number of syscalls ({} decoder, {} kernel, {} wire)",
        schemas.decoder.len(),
        schemas.kernel.len(),
        schemas.wire.len()
    );

    let variants = schemas
        .decoder
        .iter()
        .zip(&schemas.kernel)
        .zip(&schemas.wire);

    for ((decoder, kernel), wire) in variants {
        let syscall = &decoder.raw_name;

        if kernel.raw_name != *syscall || wire.raw_name != *syscall {
            bail!(
                "schema variants out of order: {syscall} / {} / {}",
                kernel.raw_name,
                wire.raw_name
            );
        }

        ensure!(
            decoder.params.len() == kernel.params.len()
                && decoder.params.len() == wire.params.len(),
            "{syscall}: schema variants disagree on the number of fields"
        );

        let params = decoder
            .params
            .iter()
            .zip(&kernel.params)
            .zip(&wire.params);

        for (position, ((d, k), w)) in params.enumerate() {
            ensure!(
                d.position == position && k.position == position && w.position == position,
                "{syscall}.{}: field is out of position",
                d.raw_name
            );
            ensure!(
                d.raw_name == k.raw_name && d.raw_name == w.raw_name,
                "{syscall}: field {position} is {} / {} / {}",
                d.raw_name,
                k.raw_name,
                w.raw_name
            );
            ensure!(
                d.ty.size() == k.ty.size()
                    && d.ty.is_buffer() == k.ty.is_buffer()
                    && (d.ty.is_buffer() || d.ty.is_signed() == k.ty.is_signed()),
                "{syscall}.{}: decoder type {:?} does not match kernel record type {:?}",
                d.raw_name,
                d.ty,
                k.ty
            );
            ensure!(
                d.ty.is_buffer() || w.ty.size().is_some_and(|size| size >= d.ty.size()),
                "{syscall}.{}: wire type {:?} cannot hold {:?}",
                d.raw_name,
                w.ty,
                d.ty
            );
        }
    }

    Ok(())
}

const RUST_KEYWORDS: &[&str] = &[
    "as", "async", "await", "box", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
    "mut", "pub", "ref", "return", "static", "struct", "super", "trait", "true", "type", "unsafe",
    "use", "where", "while", "yield",
];

/// Turns a kernel field name into a Rust field name.
pub(crate) fn rust_ident(name: &str) -> String {
    if RUST_KEYWORDS.contains(&name) {
        format!("r#{name}")
    } else {
        name.to_string()
    }
}
