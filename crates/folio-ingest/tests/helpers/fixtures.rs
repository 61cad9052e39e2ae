use std::io::Write;
use std::path::{Path, PathBuf};

use zip::write::{FileOptions, ZipWriter};
use zip::CompressionMethod;

pub const PDF_BYTES: &[u8] = b"%PDF-1.4\n1 0 obj << /Type /Catalog >> endobj\ntrailer << /Root 1 0 R >>\n%%EOF\n";

/// Build a zip archive. Names ending in `/` become directory entries.
pub fn build_zip(dir: &Path, name: &str, entries: &[(&str, &[u8])]) -> PathBuf {
    let path = dir.join(name);
    let file = std::fs::File::create(&path).unwrap();
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for (entry, content) in entries {
        if entry.ends_with('/') {
            zip.add_directory(*entry, options).unwrap();
        } else {
            zip.start_file(*entry, options).unwrap();
            zip.write_all(content).unwrap();
        }
    }
    zip.finish().unwrap();
    path
}

pub fn two_pages_and_greenpaper(dir: &Path) -> PathBuf {
    build_zip(
        dir,
        "two-pages-and-greenpaper.zip",
        &[("two-pages.pdf", PDF_BYTES), ("greenpaper.pdf", PDF_BYTES)],
    )
}

pub fn greenpaper_with_resource_fork(dir: &Path) -> PathBuf {
    build_zip(
        dir,
        "greenpaper-with-osx-resource-fork.zip",
        &[
            ("greenpaper.pdf", PDF_BYTES),
            ("__MACOSX/", b""),
            ("__MACOSX/._greenpaper.pdf", b"\x00\x05\x16\x07"),
        ],
    )
}

pub fn with_executable(dir: &Path) -> PathBuf {
    build_zip(
        dir,
        "sample-from-excel-with-exe.zip",
        &[("sample.csv", b"a,b\n1,2\n"), ("setup.exe", b"MZ\x90\x00")],
    )
}

/// Entry names with whitespace at either end.
pub fn padded_names(dir: &Path) -> PathBuf {
    build_zip(
        dir,
        "padded-names.zip",
        &[("trail .pdf ", PDF_BYTES), (" lead.pdf", PDF_BYTES)],
    )
}

/// A PDF masquerading as a zip.
pub fn not_a_zip(dir: &Path) -> PathBuf {
    let path = dir.join("greenpaper.zip");
    std::fs::write(&path, PDF_BYTES).unwrap();
    path
}
