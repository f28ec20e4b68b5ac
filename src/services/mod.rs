//! Service layer for Palaver.
//!
//! Business logic over the two stores:
//! - Attachments (upload/retrieve/delete, files store + companion message row)
//! - Messages (post/list/delete, text store)
//! - Retention (age-based cleanup in both stores)
//! - Deletion (cross-store cascades: from-message-onward, conversation, all)

mod attachments;
mod deletion;
mod messages;
mod retention;

pub use attachments::{AttachmentService, UploadedAttachment, MAX_UPLOAD_BYTES};
pub use deletion::DeletionService;
pub use messages::{MessageService, DEFAULT_LIST_LIMIT, MAX_CONTENT_CHARS, MAX_LIST_LIMIT};
pub use retention::{
    CleanupReport, RetentionService, FILE_RETENTION_DAYS, MESSAGE_RETENTION_DAYS,
};
