// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gustavo Noronha Silva <gustavo@noronha.dev.br>

use std::{env, fs, path::PathBuf};

use anyhow::Context as _;
use tracewell_schema::{gather_syscalls, generator::generate_records, RECORDS_FILE, TRACEFS_ENV};

fn main() -> anyhow::Result<()> {
    println!("cargo:rerun-if-env-changed={TRACEFS_ENV}");

    let tracefs = tracewell_schema::tracefs_from_env();
    println!("cargo:rerun-if-changed={}", tracefs.display());

    let schemas = gather_syscalls(&tracefs)?;
    let records = generate_records(&schemas)?;

    let out_dir = PathBuf::from(env::var_os("OUT_DIR").context("OUT_DIR is not set")?);
    fs::write(out_dir.join(RECORDS_FILE), records)
        .with_context(|| format!("failed to write {RECORDS_FILE}"))?;

    Ok(())
}
