// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gustavo Noronha Silva <gustavo@noronha.dev.br>

//! Outbound wire messages: a `.proto` definition for collectors and a plain
//! Rust mirror of it for the decoder.

use std::fmt::Write as _;

use super::{check_aligned, rust_ident, HEADER};
use crate::{
    compiler::{Syscall, SyscallSchemas},
    types::WireType,
};

const PROTO_PACKAGE: &str = "tracewell";

/// Messages that exist regardless of which syscalls are traced.
struct FixedMessage {
    name: &'static str,
    fields: &'static [(&'static str, WireType)],
    /// Name of the field carrying this message in the `Metric` envelope, if
    /// it is one of the events.
    envelope_field: Option<&'static str>,
}

const COMMON_EVENT: FixedMessage = FixedMessage {
    name: "ProtobufCommonEvent",
    fields: &[
        ("timestamp", WireType::Uint64),
        ("pid", WireType::Int64),
        ("ret", WireType::Int64),
        ("name", WireType::String),
        // Aggregation keys filled in by collectors, never by the decoder.
        ("hash", WireType::Uint64),
        ("flags", WireType::Uint64),
    ],
    envelope_field: None,
};

const CONNECT_V4_EVENT: FixedMessage = FixedMessage {
    name: "ProtobufConnectV4Event",
    fields: &[
        ("saddr", WireType::Uint32),
        ("daddr", WireType::Uint32),
        ("sport", WireType::Uint32),
        ("dport", WireType::Uint32),
        ("netns", WireType::Uint32),
    ],
    envelope_field: Some("connect_v4_event"),
};

const CONNECT_V6_EVENT: FixedMessage = FixedMessage {
    name: "ProtobufConnectV6Event",
    fields: &[
        ("saddr", WireType::String),
        ("daddr", WireType::String),
        ("sport", WireType::Uint32),
        ("dport", WireType::Uint32),
        ("netns", WireType::Uint32),
    ],
    envelope_field: Some("connect_v6_event"),
};

const FIXED_MESSAGES: &[FixedMessage] = &[COMMON_EVENT, CONNECT_V4_EVENT, CONNECT_V6_EVENT];

/// One alternative of the `Metric.event` oneof.
struct EnvelopeEntry {
    field: String,
    variant: String,
    message: String,
}

fn envelope(syscalls: &[Syscall<WireType>]) -> Vec<EnvelopeEntry> {
    let fixed = FIXED_MESSAGES.iter().filter_map(|message| {
        message.envelope_field.map(|field| EnvelopeEntry {
            field: field.to_string(),
            variant: message.name.trim_start_matches("Protobuf").to_string(),
            message: message.name.to_string(),
        })
    });

    let generated = syscalls.iter().map(|syscall| EnvelopeEntry {
        field: format!("{}_event", syscall.raw_name),
        variant: format!("{}Event", syscall.camel_name()),
        message: syscall.name.clone(),
    });

    fixed.chain(generated).collect()
}

fn rust_type(ty: WireType) -> &'static str {
    match ty {
        WireType::Bytes => "Vec<u8>",
        WireType::String => "String",
        WireType::Int32 => "i32",
        WireType::Uint32 => "u32",
        WireType::Int64 => "i64",
        WireType::Uint64 => "u64",
    }
}

pub fn generate_proto(schemas: &SyscallSchemas) -> anyhow::Result<String> {
    check_aligned(schemas)?;

    let mut out = String::from(HEADER);
    writeln!(out)?;
    writeln!(out, "syntax = \"proto3\";")?;
    writeln!(out)?;
    writeln!(out, "package {PROTO_PACKAGE};")?;

    for message in FIXED_MESSAGES {
        let fields = message.fields.iter().map(|(name, ty)| (*name, *ty));
        write_proto_message(&mut out, message.name, fields)?;
    }

    for syscall in &schemas.wire {
        let fields = syscall
            .params
            .iter()
            .map(|param| (param.raw_name.as_str(), param.ty));
        write_proto_message(&mut out, &syscall.name, fields)?;
    }

    writeln!(out)?;
    writeln!(out, "service MetricCollector {{")?;
    writeln!(out, "  rpc Process (stream Metric) returns (Empty) {{}}")?;
    writeln!(out, "}}")?;
    writeln!(out)?;
    writeln!(out, "message Empty {{}}")?;
    writeln!(out)?;
    writeln!(out, "message Metric {{")?;
    writeln!(out, "  uint64 count = 1;")?;
    writeln!(out, "  {} common_event = 2;", COMMON_EVENT.name)?;
    writeln!(out, "  oneof event {{")?;
    for (tag, entry) in (3..).zip(envelope(&schemas.wire)) {
        writeln!(out, "    {} {} = {tag};", entry.message, entry.field)?;
    }
    writeln!(out, "  }}")?;
    writeln!(out, "}}")?;

    Ok(out)
}

fn write_proto_message<'a>(
    out: &mut String,
    name: &str,
    fields: impl Iterator<Item = (&'a str, WireType)>,
) -> std::fmt::Result {
    writeln!(out)?;
    writeln!(out, "message {name} {{")?;
    for (tag, (field, ty)) in (1..).zip(fields) {
        writeln!(out, "  {} {field} = {tag};", ty.proto_name())?;
    }
    writeln!(out, "}}")
}

pub fn generate_wire(schemas: &SyscallSchemas) -> anyhow::Result<String> {
    check_aligned(schemas)?;

    let mut out = String::from(HEADER);

    for message in FIXED_MESSAGES {
        let fields = message.fields.iter().map(|(name, ty)| (*name, *ty));
        write_rust_message(&mut out, message.name, fields)?;
    }

    for syscall in &schemas.wire {
        let fields = syscall
            .params
            .iter()
            .map(|param| (param.raw_name.as_str(), param.ty));
        write_rust_message(&mut out, &syscall.name, fields)?;
    }

    writeln!(out)?;
    writeln!(out, "/// Envelope shipped to collectors, one per decoded event.")?;
    writeln!(out, "#[derive(Clone, Debug, Default, PartialEq, Eq)]")?;
    writeln!(out, "pub struct Metric {{")?;
    writeln!(out, "    pub count: u64,")?;
    writeln!(out, "    pub common_event: Option<{}>,", COMMON_EVENT.name)?;
    writeln!(out, "    pub event: Option<metric::Event>,")?;
    writeln!(out, "}}")?;
    writeln!(out)?;
    writeln!(out, "pub mod metric {{")?;
    writeln!(out, "    use super::*;")?;
    writeln!(out)?;
    writeln!(out, "    #[derive(Clone, Debug, PartialEq, Eq)]")?;
    writeln!(out, "    pub enum Event {{")?;
    for entry in envelope(&schemas.wire) {
        writeln!(out, "        {}({}),", entry.variant, entry.message)?;
    }
    writeln!(out, "    }}")?;
    writeln!(out, "}}")?;

    Ok(out)
}

fn write_rust_message<'a>(
    out: &mut String,
    name: &str,
    fields: impl Iterator<Item = (&'a str, WireType)>,
) -> std::fmt::Result {
    writeln!(out)?;
    writeln!(out, "#[derive(Clone, Debug, Default, PartialEq, Eq)]")?;
    writeln!(out, "pub struct {name} {{")?;
    for (field, ty) in fields {
        writeln!(out, "    pub {}: {},", rust_ident(field), rust_type(ty))?;
    }
    writeln!(out, "}}")
}
