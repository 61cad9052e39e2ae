#![allow(dead_code)]

pub mod fixtures;

use std::path::{Path, PathBuf};
use std::time::Duration;

use folio_core::IngestConfig;

/// Integration tests that drive the real archive tools are skipped when they
/// are not installed.
pub fn tools_available() -> bool {
    let found = ["unzip", "zipinfo"].iter().all(|tool| {
        std::process::Command::new(tool)
            .arg("-h")
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status()
            .is_ok()
    });
    if !found {
        eprintln!("unzip/zipinfo not installed; skipping");
    }
    found
}

pub fn test_config(temp_root: &Path) -> IngestConfig {
    IngestConfig {
        temp_root: temp_root.to_path_buf(),
        tool_timeout: Duration::from_secs(10),
        ..IngestConfig::default()
    }
}

/// Number of staging directories left under `temp_root`.
pub fn staging_dirs(temp_root: &Path) -> Vec<PathBuf> {
    match std::fs::read_dir(temp_root) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("bulk-upload-"))
            })
            .collect(),
        Err(_) => Vec::new(),
    }
}

/// Write an executable shell script.
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// An `unzip` wrapper that appends a line to `counter` on every run.
#[cfg(unix)]
pub fn counting_unzip(dir: &Path) -> (PathBuf, PathBuf) {
    let counter = dir.join("unzip-calls");
    let script = write_script(
        dir,
        "counting-unzip",
        &format!("echo run >> '{}'\nexec unzip \"$@\"", counter.display()),
    );
    (script, counter)
}

pub fn invocations(counter: &Path) -> usize {
    std::fs::read_to_string(counter)
        .map(|s| s.lines().count())
        .unwrap_or(0)
}
