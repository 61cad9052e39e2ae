//! Staging and extraction of uploaded zip archives.

pub mod output;
pub mod staging;
pub mod tools;

pub use output::parse_extracted_paths;
pub use staging::{ArchiveStager, StagedArchive, UploadedFile};
pub use tools::{ArchiveTools, ToolOutput};
