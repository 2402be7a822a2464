// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gustavo Noronha Silva <gustavo@noronha.dev.br>

//! Compiles kernel tracepoint format descriptions into the decoder, kernel
//! record and wire sources used by the rest of the workspace.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use anyhow::Context as _;

pub mod compiler;
pub mod generator;
pub mod types;

pub use compiler::{gather_syscalls, parse_syscall, SchemaError, SyscallSchemas};
pub use generator::{generate, Artifacts};

/// Overrides the directory build scripts read format files from.
pub const TRACEFS_ENV: &str = "TRACEWELL_TRACEFS_SYSCALLS";

pub const DECODER_FILE: &str = "events_generated.rs";
pub const RECORDS_FILE: &str = "records_generated.rs";
pub const WIRE_FILE: &str = "wire_generated.rs";
pub const PROTO_FILE: &str = "tracewell.proto";

/// Snapshot of the format files shipped with the sources.
pub fn bundled_formats() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("formats")
        .join("syscalls")
}

/// Directory to compile schemas from: `$TRACEWELL_TRACEFS_SYSCALLS` if set,
/// the bundled snapshot otherwise.
pub fn tracefs_from_env() -> PathBuf {
    env::var_os(TRACEFS_ENV)
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(bundled_formats)
}

impl Artifacts {
    /// Writes every artifact into `dir`, which must exist.
    pub fn write_to(&self, dir: &Path) -> anyhow::Result<()> {
        for (file, contents) in [
            (DECODER_FILE, &self.decoder),
            (RECORDS_FILE, &self.records),
            (WIRE_FILE, &self.wire),
            (PROTO_FILE, &self.proto),
        ] {
            let path = dir.join(file);
            fs::write(&path, contents)
                .with_context(|| format!("failed to write {}", path.display()))?;
        }
        Ok(())
    }
}

/// Compiles and renders everything found under `syscalls_dir`.
pub fn build_artifacts(syscalls_dir: &Path) -> anyhow::Result<Artifacts> {
    let schemas = gather_syscalls(syscalls_dir)?;
    generate(&schemas)
        .with_context(|| format!("failed to generate sources from {}", syscalls_dir.display()))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::compiler::CONSIDERED_SYSCALLS;

    #[test]
    fn bundled_formats_cover_every_considered_syscall() {
        let schemas = gather_syscalls(&bundled_formats()).unwrap();

        let mut names: Vec<_> = schemas.decoder.iter().map(|s| s.raw_name.as_str()).collect();
        let mut expected = CONSIDERED_SYSCALLS.to_vec();
        names.sort();
        expected.sort();
        assert_eq!(names, expected);
    }

    #[test]
    fn bundled_payload_sizes() {
        let artifacts = build_artifacts(&bundled_formats()).unwrap();

        for (record, size) in [
            ("OpenRecord", 272),
            ("CloseRecord", 8),
            ("ReadRecord", 272),
            ("WriteRecord", 272),
            ("MkdirRecord", 264),
            ("MkdiratRecord", 272),
            ("ChmodRecord", 264),
            ("FchmodRecord", 16),
            ("FchmodatRecord", 272),
            ("ChownRecord", 264),
            ("FchownRecord", 16),
            ("FchownatRecord", 280),
        ] {
            let needle = format!("impl {record} {{\n    pub const NAME: &'static str = ");
            let start = artifacts.records.find(&needle).unwrap_or_else(|| panic!("{record}"));
            let block = &artifacts.records[start..];
            let size_line = format!("    pub const PAYLOAD_SIZE: usize = {size};\n");
            let end = block.find("}\n").unwrap();
            assert!(block[..end].contains(&size_line), "{record}: {}", &block[..end]);
        }
    }

    #[test]
    fn artifacts_are_written() {
        let dir = tempfile::tempdir().unwrap();
        let artifacts = build_artifacts(&bundled_formats()).unwrap();
        artifacts.write_to(dir.path()).unwrap();

        for file in [DECODER_FILE, RECORDS_FILE, WIRE_FILE, PROTO_FILE] {
            let written = fs::read_to_string(dir.path().join(file)).unwrap();
            assert!(written.starts_with("// Generated file, do not edit."), "{file}");
        }
    }

    #[test]
    fn generation_is_deterministic() {
        let first = build_artifacts(&bundled_formats()).unwrap();
        let second = build_artifacts(&bundled_formats()).unwrap();
        assert_eq!(first, second);
    }
}
