#![cfg(unix)]

mod helpers;

use std::time::Duration;

use folio_ingest::{ArchiveContentPolicy, ArchiveStager, IngestError, UploadedFile};
use helpers::fixtures;
use helpers::{counting_unzip, invocations, test_config, tools_available, write_script};
use tempfile::TempDir;

#[tokio::test]
async fn test_extraction_runs_once_and_is_cached() {
    if !tools_available() {
        return;
    }
    let temp = TempDir::new().unwrap();
    let zip = fixtures::two_pages_and_greenpaper(temp.path());
    let (unzip, counter) = counting_unzip(temp.path());
    let mut config = test_config(&temp.path().join("scratch"));
    config.unzip_path = unzip;
    let stager = ArchiveStager::new(&config);

    let staged = stager.stage(&UploadedFile::from_path(&zip)).await.unwrap();
    let first = staged.extracted_file_paths().await.unwrap().to_vec();
    let second = staged.extracted_file_paths().await.unwrap().to_vec();

    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
    assert_eq!(invocations(&counter), 1);
    staged.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_non_zip_never_reaches_extraction() {
    if !tools_available() {
        return;
    }
    let temp = TempDir::new().unwrap();
    let upload = fixtures::not_a_zip(temp.path());
    let (unzip, counter) = counting_unzip(temp.path());
    let mut config = test_config(&temp.path().join("scratch"));
    config.unzip_path = unzip;
    let stager = ArchiveStager::new(&config);
    let policy = ArchiveContentPolicy::from_config(&config);

    let staged = stager.stage(&UploadedFile::from_path(&upload)).await.unwrap();
    let result = policy.check(Some(&staged)).await;

    assert!(matches!(result, Err(IngestError::NotAZipFile)));
    assert_eq!(invocations(&counter), 0);
    staged.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_failed_extraction_is_not_a_zip_and_not_retried() {
    let temp = TempDir::new().unwrap();
    let zip = fixtures::two_pages_and_greenpaper(temp.path());
    let counter = temp.path().join("calls");
    let failing = write_script(
        temp.path(),
        "failing-unzip",
        &format!(
            "echo run >> '{}'\necho 'End-of-central-directory signature not found.' >&2\nexit 9",
            counter.display()
        ),
    );
    let mut config = test_config(&temp.path().join("scratch"));
    config.unzip_path = failing;
    let stager = ArchiveStager::new(&config);

    let staged = stager.stage(&UploadedFile::from_path(&zip)).await.unwrap();

    assert!(matches!(
        staged.extracted_file_paths().await,
        Err(IngestError::NotAZipFile)
    ));
    assert!(matches!(
        staged.extracted_file_paths().await,
        Err(IngestError::NotAZipFile)
    ));
    assert_eq!(invocations(&counter), 1);
    staged.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_hanging_tool_times_out_as_staging_error() {
    let temp = TempDir::new().unwrap();
    let zip = fixtures::two_pages_and_greenpaper(temp.path());
    let hanging = write_script(temp.path(), "hanging-unzip", "sleep 10");
    let mut config = test_config(&temp.path().join("scratch"));
    config.unzip_path = hanging;
    config.tool_timeout = Duration::from_secs(1);
    let stager = ArchiveStager::new(&config);

    let staged = stager.stage(&UploadedFile::from_path(&zip)).await.unwrap();
    let started = std::time::Instant::now();
    let err = staged.extracted_file_paths().await.unwrap_err();

    assert!(matches!(err, IngestError::ToolTimeout { tool: "unzip", .. }));
    assert!(err.is_staging_error());
    assert!(started.elapsed() < Duration::from_secs(8));
    staged.cleanup().await.unwrap();
}
