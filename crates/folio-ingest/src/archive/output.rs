//! Parsing of the extraction tool's line-oriented stdout.
//!
//! The tool prints one line per entry (`  inflating: /dest/a.pdf`) mixed with
//! log lines (`Archive:  upload.zip`, `   creating: /dest/dir/`). Only file
//! lines inside the destination directory are kept; OS X resource forks are
//! dropped.

use std::path::{Component, Path, PathBuf};

const LOG_PREFIXES: [&str; 2] = ["Archive:", "creating:"];
const FILE_PREFIXES: [&str; 2] = ["inflating:", "extracting:"];
const RESOURCE_FORK_DIR: &str = "__MACOSX";
/// Appended by the tool after each entry name. Names are printed through a
/// `%-22s` format, and absolute destination paths are always longer than that.
const ENTRY_PADDING: &str = "  ";

/// Extract absolute file paths from extraction tool output, in output order.
///
/// Entry names keep their own leading and trailing whitespace; only the
/// tool's padding is removed.
pub fn parse_extracted_paths(output: &str, destination: &Path) -> Vec<PathBuf> {
    output
        .split(|c: char| c == '\r' || c == '\n')
        .map(str::trim_start)
        .filter(|line| !line.trim_end().is_empty())
        .filter(|line| !LOG_PREFIXES.iter().any(|p| line.starts_with(p)))
        .filter_map(|line| {
            let path = FILE_PREFIXES
                .iter()
                .find_map(|p| line.strip_prefix(p))
                .map(|rest| rest.strip_prefix(' ').unwrap_or(rest))
                .map(|rest| rest.strip_suffix(ENTRY_PADDING).unwrap_or(rest));
            if path.is_none() {
                tracing::debug!(line = %line, "Skipping unrecognised extraction output line");
            }
            path
        })
        .map(|path| absolutize(Path::new(path), destination))
        .filter(|path| !is_resource_fork(path))
        .filter(|path| {
            let inside = path.starts_with(destination);
            if !inside {
                tracing::warn!(
                    path = %path.display(),
                    destination = %destination.display(),
                    "Ignoring extracted path outside the extraction directory"
                );
            }
            inside
        })
        .collect()
}

fn absolutize(path: &Path, destination: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => destination.join(path),
    }
}

fn is_resource_fork(path: &Path) -> bool {
    path.components()
        .any(|c| matches!(c, Component::Normal(name) if name == RESOURCE_FORK_DIR))
}
