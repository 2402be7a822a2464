// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gustavo Noronha Silva <gustavo@noronha.dev.br>

use std::{fs, path::Path, sync::OnceLock};

use anyhow::Context as _;
use log::{debug, trace};
use regex::Regex;
use thiserror::Error;

use crate::types::{
    decoder_type, kernel_record_type, wire_type, DecoderType, KernelRecordType, WireType,
};

/// Syscalls we generate events for.
pub const CONSIDERED_SYSCALLS: &[&str] = &[
    "open", "close", "read", "write", "mkdir", "mkdirat", "chmod", "fchmod", "fchmodat", "chown",
    "fchown", "fchownat",
];

/// Syscalls whose return value is the number of valid bytes in their buffer.
pub const RETURN_BOUNDED_SYSCALLS: &[&str] = &["read", "write"];

const SYSCALL_NR_FIELD: &str = "__syscall_nr";
const ENTER_PREFIX: &str = "sys_enter_";
const EXIT_PREFIX: &str = "sys_exit";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("no {table} mapping for kernel type {kernel_type:?} ({syscall}.{field})")]
    UnmappedType {
        table: &'static str,
        kernel_type: String,
        syscall: String,
        field: String,
    },

    #[error("malformed field line in the {syscall} format: {line:?}")]
    MalformedLine { syscall: String, line: String },
}

/// How byte buffers of a syscall are turned into strings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferPolicy {
    /// C string, ends at the first NUL byte.
    NulTerminated,
    /// The return value holds the number of valid bytes.
    ReturnBounded,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Param<T> {
    /// Index among the syscall's arguments.
    pub position: usize,
    /// CamelCase identifier, e.g. `Fd`.
    pub name: String,
    /// Field name as the kernel spells it, e.g. `fd`.
    pub raw_name: String,
    pub kernel_type: String,
    pub ty: T,
    pub needs_path: bool,
}

/// One syscall as seen by one of the targets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Syscall<T> {
    /// Name of the type this syscall becomes in the target.
    pub name: String,
    /// Kernel event name, e.g. `open`.
    pub raw_name: String,
    pub buffer_policy: BufferPolicy,
    pub params: Vec<Param<T>>,
}

impl Param<()> {
    fn with_type<T>(&self, ty: T) -> Param<T> {
        Param {
            position: self.position,
            name: self.name.clone(),
            raw_name: self.raw_name.clone(),
            kernel_type: self.kernel_type.clone(),
            ty,
            needs_path: self.needs_path,
        }
    }
}

impl<T> Syscall<T> {
    fn new(
        name: String,
        raw_name: &str,
        buffer_policy: BufferPolicy,
        params: Vec<Param<T>>,
    ) -> Self {
        Syscall {
            name,
            raw_name: raw_name.to_string(),
            buffer_policy,
            params,
        }
    }

    /// CamelCase syscall name without any target decoration, e.g. `Fchownat`.
    pub fn camel_name(&self) -> String {
        to_camel(&self.raw_name)
    }
}

impl<T: Copy> Syscall<T> {
    pub fn param_types(&self) -> impl Iterator<Item = T> + '_ {
        self.params.iter().map(|p| p.ty)
    }
}

/// The three positionally aligned views of every compiled syscall.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SyscallSchemas {
    pub decoder: Vec<Syscall<DecoderType>>,
    pub kernel: Vec<Syscall<KernelRecordType>>,
    pub wire: Vec<Syscall<WireType>>,
}

impl SyscallSchemas {
    pub fn len(&self) -> usize {
        self.decoder.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decoder.is_empty()
    }
}

/// Converts a kernel identifier to CamelCase, dropping anything that can't be
/// part of one.
pub fn to_camel(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut cap_next = true;

    for c in s.trim_matches(' ').chars() {
        if c.is_ascii_uppercase() || c.is_ascii_digit() {
            out.push(c);
        }
        if c.is_ascii_lowercase() {
            if cap_next {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        cap_next = c == '_' || c == ' ';
    }

    out
}

fn field_regex() -> &'static Regex {
    static FIELD_RE: OnceLock<Regex> = OnceLock::new();
    FIELD_RE.get_or_init(|| {
        Regex::new(r"\s+field:(?P<type>.*?) (?P<name>[a-z_0-9]+);.*")
            .expect("field pattern is a valid regex")
    })
}

type ParamTriple = (Param<DecoderType>, Param<KernelRecordType>, Param<WireType>);

fn parse_line(
    syscall: &str,
    line: &str,
    position: usize,
) -> Result<Option<ParamTriple>, SchemaError> {
    if !line.trim_start().starts_with("field:") {
        return Ok(None);
    }

    let captures = field_regex()
        .captures(line)
        .ok_or_else(|| SchemaError::MalformedLine {
            syscall: syscall.to_string(),
            line: line.to_string(),
        })?;

    let kernel_type = &captures["type"];
    let raw_name = &captures["name"];

    if raw_name == SYSCALL_NR_FIELD {
        return Ok(None);
    }

    let unmapped = |table| SchemaError::UnmappedType {
        table,
        kernel_type: kernel_type.to_string(),
        syscall: syscall.to_string(),
        field: raw_name.to_string(),
    };

    let decoder = decoder_type(kernel_type).ok_or_else(|| unmapped("decoder"))?;
    let kernel = kernel_record_type(kernel_type).ok_or_else(|| unmapped("kernel record"))?;
    let wire = wire_type(decoder).ok_or_else(|| unmapped("wire"))?;

    let name = to_camel(raw_name);
    let needs_path = name == "Fd" || name == "Dfd";

    let param = Param {
        position,
        name,
        raw_name: raw_name.to_string(),
        kernel_type: kernel_type.to_string(),
        ty: (),
        needs_path,
    };

    Ok(Some((
        param.with_type(decoder),
        param.with_type(kernel),
        param.with_type(wire),
    )))
}

/// Compiles one tracepoint `format` description into its three schema variants.
pub fn parse_syscall(
    name: &str,
    format: &str,
) -> Result<
    (
        Syscall<DecoderType>,
        Syscall<KernelRecordType>,
        Syscall<WireType>,
    ),
    SchemaError,
> {
    let mut decoder_params = vec![];
    let mut kernel_params = vec![];
    let mut wire_params = vec![];

    // Everything up to the first blank line describes the common tracepoint header.
    for line in format.lines().skip_while(|line| !line.is_empty()) {
        if let Some((decoder, kernel, wire)) = parse_line(name, line, decoder_params.len())? {
            decoder_params.push(decoder);
            kernel_params.push(kernel);
            wire_params.push(wire);
        }
    }

    let buffer_policy = if RETURN_BOUNDED_SYSCALLS.contains(&name) {
        BufferPolicy::ReturnBounded
    } else {
        BufferPolicy::NulTerminated
    };

    let camel = to_camel(name);

    Ok((
        Syscall::new(format!("{camel}Event"), name, buffer_policy, decoder_params),
        Syscall::new(format!("{camel}Record"), name, buffer_policy, kernel_params),
        Syscall::new(format!("Protobuf{camel}Event"), name, buffer_policy, wire_params),
    ))
}

/// Walks a tracefs `events/syscalls` directory and compiles every considered
/// syscall whose format description can be read.
pub fn gather_syscalls(syscalls_dir: &Path) -> anyhow::Result<SyscallSchemas> {
    let mut schemas = SyscallSchemas::default();

    let entries = fs::read_dir(syscalls_dir)
        .with_context(|| format!("reading tracepoints from {}", syscalls_dir.display()))?;

    for entry in entries {
        let Ok(entry) = entry else {
            continue;
        };

        if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            continue;
        }

        let event_name = entry.file_name().to_string_lossy().into_owned();
        if event_name.starts_with(EXIT_PREFIX) {
            continue;
        }

        let Some(syscall_name) = event_name.strip_prefix(ENTER_PREFIX) else {
            continue;
        };

        if !CONSIDERED_SYSCALLS.contains(&syscall_name) {
            trace!("Skipping tracepoint {event_name}");
            continue;
        }

        let format_path = entry.path().join("format");
        let format = match fs::read_to_string(&format_path) {
            Ok(format) => format,
            Err(e) => {
                debug!("{syscall_name} is unavailable: {}: {e}", format_path.display());
                continue;
            }
        };

        let (decoder, kernel, wire) = parse_syscall(syscall_name, &format)?;

        schemas.decoder.push(decoder);
        schemas.kernel.push(kernel);
        schemas.wire.push(wire);
    }

    schemas.decoder.sort_by(|a, b| a.raw_name.cmp(&b.raw_name));
    schemas.kernel.sort_by(|a, b| a.raw_name.cmp(&b.raw_name));
    schemas.wire.sort_by(|a, b| a.raw_name.cmp(&b.raw_name));

    debug!("Compiled {} syscalls", schemas.len());

    Ok(schemas)
}
