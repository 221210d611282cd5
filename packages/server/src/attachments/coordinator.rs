use std::collections::BTreeMap;
use std::sync::Arc;

use common::storage::{ObjectStore, StorageError, generate_key};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::slot::{AttachmentSlot, SlotMap};

/// A file received for one slot.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub original_name: String,
    pub bytes: Vec<u8>,
}

impl IncomingFile {
    pub fn new(original_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            original_name: original_name.into(),
            bytes,
        }
    }

    /// A part with no file name and no content carries no change.
    pub fn is_empty(&self) -> bool {
        self.original_name.trim().is_empty() && self.bytes.is_empty()
    }
}

/// New files keyed by slot. Slots without an entry keep their current key.
#[derive(Debug, Default)]
pub struct IncomingFiles(BTreeMap<AttachmentSlot, IncomingFile>);

impl IncomingFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file for `slot`. Empty parts are ignored. Returns the file that
    /// was previously queued for the same slot, if any.
    pub fn insert(&mut self, slot: AttachmentSlot, file: IncomingFile) -> Option<IncomingFile> {
        if file.is_empty() {
            return None;
        }
        self.0.insert(slot, file)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn slots(&self) -> impl Iterator<Item = AttachmentSlot> + '_ {
        self.0.keys().copied()
    }
}

/// New objects written for a record, not yet referenced by committed state.
///
/// Must be resolved with [`AttachmentCoordinator::finalize`] once the new slot
/// values are durable, or [`AttachmentCoordinator::abort`] if persisting them
/// failed.
#[derive(Debug)]
#[must_use = "staged uploads must be finalized or aborted"]
pub struct StagedUploads {
    record_id: Uuid,
    slots: SlotMap,
    added: Vec<(AttachmentSlot, String)>,
    superseded: Vec<(AttachmentSlot, String)>,
}

impl StagedUploads {
    pub fn record_id(&self) -> Uuid {
        self.record_id
    }

    /// Slot values to persist on the record.
    pub fn slots(&self) -> &SlotMap {
        &self.slots
    }

    pub fn added_keys(&self) -> impl Iterator<Item = &str> {
        self.added.iter().map(|(_, key)| key.as_str())
    }

    pub fn superseded_keys(&self) -> impl Iterator<Item = &str> {
        self.superseded.iter().map(|(_, key)| key.as_str())
    }
}

/// Result of a completed upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub slots: SlotMap,
    /// Superseded keys that are gone from the store.
    pub replaced: Vec<String>,
    /// Superseded keys whose deletion failed. Nothing references them.
    pub orphaned: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
#[error("failed to store {slot} for pattern {record_id}: {source}")]
pub struct UploadError {
    pub record_id: Uuid,
    pub slot: AttachmentSlot,
    pub source: StorageError,
    /// Keys written earlier in the same upload and removed again.
    pub rolled_back: Vec<String>,
    /// Keys written earlier in the same upload that could not be removed.
    pub orphaned: Vec<String>,
}

#[derive(Debug)]
pub struct ReleaseFailure {
    pub slot: AttachmentSlot,
    pub key: String,
    pub reason: StorageError,
}

#[derive(Debug, thiserror::Error)]
#[error("failed to release {} attachment(s) of pattern {record_id}", failures.len())]
pub struct ReleaseError {
    pub record_id: Uuid,
    /// Slots whose objects are gone.
    pub released: Vec<AttachmentSlot>,
    pub failures: Vec<ReleaseFailure>,
}

impl ReleaseError {
    pub fn failed_keys(&self) -> Vec<String> {
        self.failures.iter().map(|f| f.key.clone()).collect()
    }

    /// Slot state after the attempt: only the slots that failed keep a key.
    pub fn remaining(&self) -> SlotMap {
        let mut slots = SlotMap::new();
        for failure in &self.failures {
            slots.set(failure.slot, Some(failure.key.clone()));
        }
        slots
    }
}

/// Keeps the object store consistent with the slot keys recorded on patterns.
///
/// New objects are always written before superseded ones are deleted, so a
/// failure at any point leaves every committed key resolvable. Callers hold
/// the record's row lock across stage, persist and finalize.
#[derive(Clone)]
pub struct AttachmentCoordinator {
    store: Arc<dyn ObjectStore>,
}

impl AttachmentCoordinator {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Write every incoming file under a fresh key.
    ///
    /// Nothing is deleted here. If a write fails, the objects this call
    /// already wrote are removed again and the record's current keys are
    /// untouched.
    #[instrument(skip(self, current, incoming), fields(files = incoming.len()))]
    pub async fn stage_uploads(
        &self,
        record_id: Uuid,
        current: &SlotMap,
        incoming: IncomingFiles,
    ) -> Result<StagedUploads, UploadError> {
        let mut slots = current.clone();
        let mut added = Vec::with_capacity(incoming.len());
        let mut superseded = Vec::new();

        for (slot, file) in incoming.0 {
            let key = generate_key(&file.original_name);
            if let Err(source) = self.store.put(&key, &file.bytes).await {
                warn!(%record_id, %slot, key = %key, error = %source, "Attachment upload failed");
                let (rolled_back, orphaned) = self.remove_keys(record_id, added).await;
                return Err(UploadError {
                    record_id,
                    slot,
                    source,
                    rolled_back,
                    orphaned,
                });
            }
            debug!(%record_id, %slot, key = %key, size = file.bytes.len(), "Stored attachment");

            if let Some(previous) = slots.set(slot, Some(key.clone())) {
                superseded.push((slot, previous));
            }
            added.push((slot, key));
        }

        Ok(StagedUploads {
            record_id,
            slots,
            added,
            superseded,
        })
    }

    /// Delete the objects superseded by a staged upload whose slot values
    /// have been persisted. A missing object counts as deleted; any other
    /// failure leaves an orphan, which is logged and reported.
    #[instrument(skip(self, staged), fields(record_id = %staged.record_id))]
    pub async fn finalize(&self, staged: StagedUploads) -> UploadOutcome {
        let StagedUploads {
            record_id,
            slots,
            superseded,
            ..
        } = staged;

        let mut replaced = Vec::with_capacity(superseded.len());
        let mut orphaned = Vec::new();
        for (slot, key) in superseded {
            match self.store.delete(&key).await {
                Ok(()) => replaced.push(key),
                Err(e) if e.is_not_found() => {
                    debug!(%record_id, %slot, key = %key, "Superseded attachment already gone");
                    replaced.push(key);
                }
                Err(e) => {
                    warn!(%record_id, %slot, key = %key, error = %e, "Superseded attachment left orphaned");
                    orphaned.push(key);
                }
            }
        }

        UploadOutcome {
            slots,
            replaced,
            orphaned,
        }
    }

    /// Undo a staged upload whose slot values could not be persisted.
    /// Returns the keys that could not be removed.
    #[instrument(skip(self, staged), fields(record_id = %staged.record_id))]
    pub async fn abort(&self, staged: StagedUploads) -> Vec<String> {
        let (_, orphaned) = self.remove_keys(staged.record_id, staged.added).await;
        orphaned
    }

    /// Store new files and delete the objects they replace.
    ///
    /// Equivalent to [`stage_uploads`](Self::stage_uploads) followed by
    /// [`finalize`](Self::finalize); use the split form when the new slot
    /// values have to be committed in between.
    pub async fn apply_uploads(
        &self,
        record_id: Uuid,
        current: &SlotMap,
        incoming: IncomingFiles,
    ) -> Result<UploadOutcome, UploadError> {
        let staged = self.stage_uploads(record_id, current, incoming).await?;
        Ok(self.finalize(staged).await)
    }

    /// Delete every object referenced by `slots`.
    ///
    /// All slots are attempted even after a failure. Objects that are
    /// already missing count as released. Returns the number of released
    /// slots.
    #[instrument(skip(self, slots), fields(occupied = slots.occupied_count()))]
    pub async fn release_all_attachments(
        &self,
        record_id: Uuid,
        slots: &SlotMap,
    ) -> Result<usize, ReleaseError> {
        let mut released = Vec::new();
        let mut failures = Vec::new();

        for (slot, key) in slots.occupied() {
            match self.store.delete(key).await {
                Ok(()) => released.push(slot),
                Err(e) if e.is_not_found() => {
                    debug!(%record_id, %slot, key, "Attachment already gone");
                    released.push(slot);
                }
                Err(reason) => {
                    warn!(%record_id, %slot, key, error = %reason, "Failed to release attachment");
                    failures.push(ReleaseFailure {
                        slot,
                        key: key.to_string(),
                        reason,
                    });
                }
            }
        }

        if failures.is_empty() {
            Ok(released.len())
        } else {
            Err(ReleaseError {
                record_id,
                released,
                failures,
            })
        }
    }

    /// Best-effort removal of keys written by an unfinished upload.
    /// Returns `(removed, left_behind)`.
    async fn remove_keys(
        &self,
        record_id: Uuid,
        keys: Vec<(AttachmentSlot, String)>,
    ) -> (Vec<String>, Vec<String>) {
        let mut removed = Vec::with_capacity(keys.len());
        let mut left = Vec::new();
        for (slot, key) in keys {
            match self.store.delete(&key).await {
                Ok(()) => removed.push(key),
                Err(e) if e.is_not_found() => removed.push(key),
                Err(e) => {
                    warn!(%record_id, %slot, key = %key, error = %e, "Rollback left attachment orphaned");
                    left.push(key);
                }
            }
        }
        (removed, left)
    }
}
