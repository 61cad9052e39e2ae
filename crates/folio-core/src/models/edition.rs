use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::attachment::Attachment;

/// The document-like entity attachments belong to.
///
/// Only the attachment collection is modelled here; everything else about an
/// edition is owned by the wider publishing platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edition {
    pub id: Uuid,
    pub title: String,
    attachments: Vec<Attachment>,
}

impl Edition {
    pub fn new(id: Uuid, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            attachments: Vec::new(),
        }
    }

    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// First attachment whose current payload has exactly this filename.
    pub fn attachment_with_filename(&self, filename: &str) -> Option<&Attachment> {
        self.attachments
            .iter()
            .find(|a| a.filename() == Some(filename))
    }

    pub fn attachment_with_filename_mut(&mut self, filename: &str) -> Option<&mut Attachment> {
        self.attachments
            .iter_mut()
            .find(|a| a.filename() == Some(filename))
    }

    pub fn attachment(&self, id: Uuid) -> Option<&Attachment> {
        self.attachments.iter().find(|a| a.id == Some(id))
    }

    pub fn attachment_mut(&mut self, id: Uuid) -> Option<&mut Attachment> {
        self.attachments.iter_mut().find(|a| a.id == Some(id))
    }

    /// Append to the end of the list, after every existing position.
    pub fn append_attachment(&mut self, mut attachment: Attachment) {
        attachment.ordering = self.next_ordering();
        self.attachments.push(attachment);
    }

    pub fn next_ordering(&self) -> i32 {
        self.attachments
            .iter()
            .map(|a| a.ordering + 1)
            .max()
            .unwrap_or(0)
    }
}
