mod helpers;

use std::path::PathBuf;
use std::time::Duration;

use folio_ingest::{ArchiveContentPolicy, ArchiveStager, IngestError, UploadedFile};
use helpers::fixtures;
use helpers::{staging_dirs, test_config, tools_available};
use tempfile::TempDir;

#[tokio::test]
async fn test_extracts_two_pages_and_greenpaper() {
    if !tools_available() {
        return;
    }
    let temp = TempDir::new().unwrap();
    let zip = fixtures::two_pages_and_greenpaper(temp.path());
    let stager = ArchiveStager::new(&test_config(&temp.path().join("scratch")));

    let staged = stager.stage(&UploadedFile::from_path(&zip)).await.unwrap();
    assert!(staged.is_zip_file().await.unwrap());
    let paths = staged.extracted_file_paths().await.unwrap().to_vec();

    let extracted = staged.extraction_dir();
    assert_eq!(
        paths,
        vec![extracted.join("two-pages.pdf"), extracted.join("greenpaper.pdf")]
    );
    assert!(paths.iter().all(|p| p.is_absolute() && p.is_file()));
    staged.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_resource_fork_entries_are_dropped() {
    if !tools_available() {
        return;
    }
    let temp = TempDir::new().unwrap();
    let zip = fixtures::greenpaper_with_resource_fork(temp.path());
    let stager = ArchiveStager::new(&test_config(&temp.path().join("scratch")));

    let staged = stager.stage(&UploadedFile::from_path(&zip)).await.unwrap();
    let paths = staged.extracted_file_paths().await.unwrap();

    assert_eq!(paths, &[staged.extraction_dir().join("greenpaper.pdf")]);
    staged.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_entry_names_keep_surrounding_whitespace() {
    if !tools_available() {
        return;
    }
    let temp = TempDir::new().unwrap();
    let zip = fixtures::padded_names(temp.path());
    let stager = ArchiveStager::new(&test_config(&temp.path().join("scratch")));

    let staged = stager.stage(&UploadedFile::from_path(&zip)).await.unwrap();
    let paths = staged.extracted_file_paths().await.unwrap().to_vec();

    let extracted = staged.extraction_dir();
    assert_eq!(
        paths,
        vec![extracted.join("trail .pdf "), extracted.join(" lead.pdf")]
    );
    assert!(paths.iter().all(|p| p.is_file()));
    staged.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_disallowed_file_type_and_cleanup_leaves_nothing() {
    if !tools_available() {
        return;
    }
    let temp = TempDir::new().unwrap();
    let scratch = temp.path().join("scratch");
    let zip = fixtures::with_executable(temp.path());
    let config = test_config(&scratch);
    let stager = ArchiveStager::new(&config);
    let policy = ArchiveContentPolicy::from_config(&config);

    let staged = stager.stage(&UploadedFile::from_path(&zip)).await.unwrap();
    let result = policy.check(Some(&staged)).await;

    match result {
        Err(IngestError::DisallowedFileType { files }) => {
            assert_eq!(files, vec!["setup.exe".to_string()]);
        }
        other => panic!("expected DisallowedFileType, got {:?}", other),
    }

    staged.cleanup().await.unwrap();
    assert!(!staged.root().exists());
    assert!(staging_dirs(&scratch).is_empty());
    staged.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_non_zip_is_rejected_before_extraction() {
    if !tools_available() {
        return;
    }
    let temp = TempDir::new().unwrap();
    let upload = fixtures::not_a_zip(temp.path());
    let config = test_config(&temp.path().join("scratch"));
    let stager = ArchiveStager::new(&config);
    let policy = ArchiveContentPolicy::from_config(&config);

    let staged = stager.stage(&UploadedFile::from_path(&upload)).await.unwrap();

    assert!(!staged.is_zip_file().await.unwrap());
    assert!(matches!(
        policy.check(Some(&staged)).await,
        Err(IngestError::NotAZipFile)
    ));
    assert!(!staged.extraction_dir().exists());
    staged.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_cleanup_after_extraction_removes_everything() {
    if !tools_available() {
        return;
    }
    let temp = TempDir::new().unwrap();
    let scratch = temp.path().join("scratch");
    let zip = fixtures::two_pages_and_greenpaper(temp.path());
    let stager = ArchiveStager::new(&test_config(&scratch));

    let staged = stager.stage(&UploadedFile::from_path(&zip)).await.unwrap();
    let paths: Vec<PathBuf> = staged.extracted_file_paths().await.unwrap().to_vec();
    assert!(!paths.is_empty());

    staged.cleanup().await.unwrap();

    assert!(paths.iter().all(|p| !p.exists()));
    assert!(!staged.root().exists());
    assert!(staging_dirs(&scratch).is_empty());
    assert!(staged.cleanup().await.is_ok());
}

#[tokio::test]
async fn test_staging_bytes_upload_uses_base_name() {
    if !tools_available() {
        return;
    }
    let temp = TempDir::new().unwrap();
    let zip = fixtures::two_pages_and_greenpaper(temp.path());
    let content = bytes::Bytes::from(std::fs::read(&zip).unwrap());
    let stager = ArchiveStager::new(&test_config(&temp.path().join("scratch")));

    let upload = UploadedFile::from_bytes("../../uploads/batch.zip", content);
    let staged = stager.stage(&upload).await.unwrap();

    assert_eq!(staged.archive_path(), staged.root().join("batch.zip"));
    assert!(staged.is_zip_file().await.unwrap());
    assert_eq!(staged.extracted_file_paths().await.unwrap().len(), 2);
    staged.cleanup().await.unwrap();
}

#[tokio::test]
async fn test_missing_tool_is_a_staging_error() {
    let temp = TempDir::new().unwrap();
    let zip = fixtures::two_pages_and_greenpaper(temp.path());
    let mut config = test_config(&temp.path().join("scratch"));
    config.zipinfo_path = temp.path().join("no-such-zipinfo");
    config.tool_timeout = Duration::from_secs(2);
    let stager = ArchiveStager::new(&config);

    let staged = stager.stage(&UploadedFile::from_path(&zip)).await.unwrap();
    let err = staged.is_zip_file().await.unwrap_err();

    assert!(err.is_staging_error());
    staged.cleanup().await.unwrap();
}
