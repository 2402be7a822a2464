// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gustavo Noronha Silva <gustavo@noronha.dev.br>

use std::{fs, path::PathBuf};

use anyhow::{Context as _, Result};
use clap::Parser;
use log::info;
use tracewell_schema::build_artifacts;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Directory holding the `sys_enter_*` tracepoints
    #[arg(long = "tracefs", default_value = "/sys/kernel/debug/tracing/events/syscalls")]
    tracefs: PathBuf,

    /// Where to write the generated sources
    #[arg(short = 'o', long = "out", default_value = ".")]
    out: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();

    let artifacts = build_artifacts(&args.tracefs)?;

    fs::create_dir_all(&args.out)
        .with_context(|| format!("failed to create {}", args.out.display()))?;
    artifacts.write_to(&args.out)?;

    info!(
        "Generated sources from {} into {}",
        args.tracefs.display(),
        args.out.display()
    );

    Ok(())
}
