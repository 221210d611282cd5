//! Attachment slots on patterns and the coordinator that keeps them in sync
//! with the object store.

mod coordinator;
mod slot;

pub use coordinator::{
    AttachmentCoordinator, IncomingFile, IncomingFiles, ReleaseError, ReleaseFailure,
    StagedUploads, UploadError, UploadOutcome,
};
pub use slot::{AttachmentSlot, SlotMap};
