use std::collections::BTreeMap;
use std::path::Path;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

/// Field name → messages, in a stable order for redisplay.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Binary content record backing an attachment.
///
/// Records are never mutated in place: replacing an attachment's file creates
/// a new record whose `replaces` points at the previous one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentData {
    pub id: Uuid,
    pub original_filename: String,
    pub content_type: String,
    pub file_size: i64,
    /// Hex-encoded SHA-256 of the content
    pub checksum: String,
    pub replaces: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub content: Bytes,
}

impl AttachmentData {
    pub fn new(original_filename: impl Into<String>, content: Bytes) -> Self {
        let original_filename = original_filename.into();
        let content_type = Path::new(&original_filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(content_type_for_extension)
            .unwrap_or("application/octet-stream")
            .to_string();

        Self {
            id: Uuid::new_v4(),
            checksum: hex::encode(Sha256::digest(&content)),
            file_size: content.len() as i64,
            content_type,
            original_filename,
            replaces: None,
            created_at: Utc::now(),
            content,
        }
    }

    /// Mark this record as the successor of `previous`.
    pub fn replacing(mut self, previous: &AttachmentData) -> Self {
        self.replaces = Some(previous.id);
        self
    }

    pub fn filename(&self) -> &str {
        &self.original_filename
    }
}

/// A file associated with an edition.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Attachment {
    /// Present only once persisted
    pub id: Option<Uuid>,
    #[validate(custom(function = "validate_present"))]
    pub title: String,
    pub accessible: bool,
    pub isbn: Option<String>,
    #[validate(length(max = 255, message = "is too long (maximum is 255 characters)"))]
    pub unique_reference: Option<String>,
    pub command_paper_number: Option<String>,
    #[validate(url(message = "is not a valid URL"))]
    pub order_url: Option<String>,
    pub price: Option<String>,
    pub ordering: i32,
    #[validate(required(message = "must be provided"))]
    pub attachment_data: Option<AttachmentData>,
}

fn validate_present(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message("can't be blank".into()));
    }
    Ok(())
}

impl Attachment {
    /// An unpersisted attachment with no metadata and no payload.
    pub fn blank() -> Self {
        Self {
            id: None,
            title: String::new(),
            accessible: false,
            isbn: None,
            unique_reference: None,
            command_paper_number: None,
            order_url: None,
            price: None,
            ordering: 0,
            attachment_data: None,
        }
    }

    /// An unpersisted attachment with no metadata yet.
    pub fn with_data(data: AttachmentData) -> Self {
        Self {
            attachment_data: Some(data),
            ..Self::blank()
        }
    }

    /// Filename of the current payload.
    pub fn filename(&self) -> Option<&str> {
        self.attachment_data.as_ref().map(|d| d.filename())
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Run field validation and flatten the result for display.
    pub fn field_errors(&self) -> FieldErrors {
        match self.validate() {
            Ok(()) => FieldErrors::new(),
            Err(errors) => flatten_validation_errors(&errors),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

/// Metadata supplied alongside an uploaded file. `None` leaves the
/// attachment's current value untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttachmentParams {
    pub title: Option<String>,
    pub accessible: Option<bool>,
    pub isbn: Option<String>,
    pub unique_reference: Option<String>,
    pub command_paper_number: Option<String>,
    pub order_url: Option<String>,
    pub price: Option<String>,
}

impl AttachmentParams {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn apply_to(&self, attachment: &mut Attachment) {
        if let Some(title) = &self.title {
            attachment.title = title.clone();
        }
        if let Some(accessible) = self.accessible {
            attachment.accessible = accessible;
        }
        if let Some(isbn) = &self.isbn {
            attachment.isbn = Some(isbn.clone());
        }
        if let Some(reference) = &self.unique_reference {
            attachment.unique_reference = Some(reference.clone());
        }
        if let Some(number) = &self.command_paper_number {
            attachment.command_paper_number = Some(number.clone());
        }
        if let Some(url) = &self.order_url {
            attachment.order_url = Some(url.clone());
        }
        if let Some(price) = &self.price {
            attachment.price = Some(price.clone());
        }
    }
}

pub fn flatten_validation_errors(errors: &ValidationErrors) -> FieldErrors {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let messages = errs
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string())
                })
                .collect();
            (field.to_string(), messages)
        })
        .collect()
}

/// Content type for a file extension. Unknown extensions fall back to
/// `application/octet-stream`.
pub fn content_type_for_extension(extension: &str) -> &'static str {
    match extension.to_lowercase().as_str() {
        "pdf" => "application/pdf",
        "doc" | "dot" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" | "xlt" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "xlsm" => "application/vnd.ms-excel.sheet.macroEnabled.12",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "odt" => "application/vnd.oasis.opendocument.text",
        "ods" => "application/vnd.oasis.opendocument.spreadsheet",
        "odp" => "application/vnd.oasis.opendocument.presentation",
        "rtf" => "application/rtf",
        "txt" | "diff" => "text/plain",
        "csv" => "text/csv",
        "xml" | "xsd" | "xslt" | "wsdl" | "gml" | "kml" | "rdf" => "application/xml",
        "ics" => "text/calendar",
        "ps" | "eps" => "application/postscript",
        "chm" => "application/vnd.ms-htmlhelp",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}
