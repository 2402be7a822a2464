// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gustavo Noronha Silva <gustavo@noronha.dev.br>

use std::{env, path::PathBuf};

use anyhow::Context as _;
use tracewell_schema::{build_artifacts, tracefs_from_env, TRACEFS_ENV};

fn main() -> anyhow::Result<()> {
    println!("cargo:rerun-if-env-changed={TRACEFS_ENV}");

    let tracefs = tracefs_from_env();
    println!("cargo:rerun-if-changed={}", tracefs.display());

    let out_dir = PathBuf::from(env::var_os("OUT_DIR").context("OUT_DIR is not set")?);
    build_artifacts(&tracefs)?.write_to(&out_dir)?;

    Ok(())
}
