// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gustavo Noronha Silva <gustavo@noronha.dev.br>

//! Fixed-layout records as the probe writes them, included by
//! `tracewell-common` next to `CommonEvent`.

use std::fmt::Write as _;

use super::{check_aligned, rust_ident, HEADER};
use crate::{
    compiler::{Syscall, SyscallSchemas},
    types::{KernelRecordType, MAX_BUFFER_SIZE},
};

pub fn generate_records(schemas: &SyscallSchemas) -> anyhow::Result<String> {
    check_aligned(schemas)?;

    let mut out = String::from(HEADER);
    writeln!(out)?;
    writeln!(out, "pub const GENERATED_BUFFER_SIZE: usize = {MAX_BUFFER_SIZE};")?;

    for syscall in &schemas.kernel {
        write_record(&mut out, syscall)?;
    }

    Ok(out)
}

fn c_type(ty: KernelRecordType) -> &'static str {
    match ty {
        KernelRecordType::Char => "[u8; MAX_BUFFER_SIZE]",
        KernelRecordType::S32 => "i32",
        KernelRecordType::U32 => "u32",
        KernelRecordType::S64 => "i64",
        KernelRecordType::U64 => "u64",
    }
}

fn write_record(out: &mut String, syscall: &Syscall<KernelRecordType>) -> std::fmt::Result {
    let payload_size: usize = syscall.param_types().map(KernelRecordType::size).sum();

    writeln!(out)?;
    writeln!(out, "/// Record written for `{}`.", syscall.raw_name)?;
    writeln!(out, "#[repr(C, packed)]")?;
    writeln!(out, "#[derive(Clone, Copy)]")?;
    writeln!(out, "pub struct {} {{", syscall.name)?;
    writeln!(out, "    pub common: CommonEvent,")?;
    for param in &syscall.params {
        writeln!(out, "    pub {}: {},", rust_ident(&param.raw_name), c_type(param.ty))?;
    }
    writeln!(out, "}}")?;
    writeln!(out)?;
    writeln!(out, "impl {} {{", syscall.name)?;
    writeln!(out, "    pub const NAME: &'static str = {:?};", syscall.raw_name)?;
    writeln!(out, "    pub const PAYLOAD_SIZE: usize = {payload_size};")?;
    writeln!(out, "}}")?;
    writeln!(out)?;
    writeln!(out, "const _: () = assert!(")?;
    writeln!(
        out,
        "    core::mem::size_of::<{0}>() == COMMON_EVENT_SIZE + {0}::PAYLOAD_SIZE",
        syscall.name
    )?;
    writeln!(out, ");")
}
