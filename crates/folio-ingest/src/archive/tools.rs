//! External archive utilities (listing and extraction).
//!
//! Tools are always invoked with an argument vector, never through a shell,
//! and every invocation is bounded by the configured timeout. A child that
//! outlives the timeout is killed when its future is dropped.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use folio_core::IngestConfig;
use tokio::process::Command;

use crate::error::IngestError;

/// Captured result of one tool run.
#[derive(Debug)]
pub struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Clone)]
pub struct ArchiveTools {
    unzip_path: PathBuf,
    zipinfo_path: PathBuf,
    timeout: Duration,
}

impl ArchiveTools {
    pub fn new(unzip_path: PathBuf, zipinfo_path: PathBuf, timeout: Duration) -> Self {
        Self {
            unzip_path,
            zipinfo_path,
            timeout,
        }
    }

    pub fn from_config(config: &IngestConfig) -> Self {
        Self::new(
            config.unzip_path.clone(),
            config.zipinfo_path.clone(),
            config.tool_timeout,
        )
    }

    /// `zipinfo -1 <archive>`
    #[tracing::instrument(skip(self), fields(
        process.executable.path = %self.zipinfo_path.display(),
        archive.operation = "list"
    ))]
    pub async fn list(&self, archive: &Path) -> Result<ToolOutput, IngestError> {
        self.run(
            "zipinfo",
            &self.zipinfo_path,
            &[OsStr::new("-1"), archive.as_os_str()],
        )
        .await
    }

    /// `unzip -o -d <destination> <archive>`
    #[tracing::instrument(skip(self), fields(
        process.executable.path = %self.unzip_path.display(),
        archive.operation = "extract"
    ))]
    pub async fn extract(
        &self,
        archive: &Path,
        destination: &Path,
    ) -> Result<ToolOutput, IngestError> {
        self.run(
            "unzip",
            &self.unzip_path,
            &[
                OsStr::new("-o"),
                OsStr::new("-d"),
                destination.as_os_str(),
                archive.as_os_str(),
            ],
        )
        .await
    }

    async fn run(
        &self,
        tool: &'static str,
        program: &Path,
        args: &[&OsStr],
    ) -> Result<ToolOutput, IngestError> {
        let start = std::time::Instant::now();

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(result) => result.map_err(|e| {
                IngestError::staging(format!("failed to run {}", program.display()), e)
            })?,
            Err(_) => {
                tracing::warn!(
                    tool,
                    timeout_secs = self.timeout.as_secs(),
                    "Archive tool timed out"
                );
                return Err(IngestError::ToolTimeout {
                    tool,
                    timeout: self.timeout,
                });
            }
        };

        tracing::debug!(
            tool,
            exit_code = ?output.status.code(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Archive tool finished"
        );

        Ok(ToolOutput {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
