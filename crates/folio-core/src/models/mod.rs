pub mod attachment;
pub mod edition;

pub use attachment::{
    content_type_for_extension, flatten_validation_errors, Attachment, AttachmentData,
    AttachmentParams, FieldErrors,
};
pub use edition::Edition;
