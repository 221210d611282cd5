use std::fmt;

use sea_orm::Set;
use serde::Serialize;

use crate::entity::pattern;

/// One of the eight named attachment slots on a pattern.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentSlot {
    PatternA0,
    PatternA0Sa,
    PatternA0SaProjector,
    PatternA0Projector,
    PatternA4,
    PatternA4Sa,
    PatternInstructables,
    Icon,
}

impl AttachmentSlot {
    pub const ALL: [AttachmentSlot; 8] = [
        AttachmentSlot::PatternA0,
        AttachmentSlot::PatternA0Sa,
        AttachmentSlot::PatternA0SaProjector,
        AttachmentSlot::PatternA0Projector,
        AttachmentSlot::PatternA4,
        AttachmentSlot::PatternA4Sa,
        AttachmentSlot::PatternInstructables,
        AttachmentSlot::Icon,
    ];

    /// Column on the `pattern` table holding this slot's object key.
    pub fn column_name(self) -> &'static str {
        match self {
            Self::PatternA0 => "pattern_a0_file_id",
            Self::PatternA0Sa => "pattern_a0_sa_file_id",
            Self::PatternA0SaProjector => "pattern_a0_sa_projector_file_id",
            Self::PatternA0Projector => "pattern_a0_projector_file_id",
            Self::PatternA4 => "pattern_a4_file_id",
            Self::PatternA4Sa => "pattern_a4_sa_file_id",
            Self::PatternInstructables => "pattern_instructables_file_id",
            Self::Icon => "icon",
        }
    }

    /// Multipart part name carrying a new file for this slot.
    pub fn form_field(self) -> &'static str {
        match self {
            Self::PatternA0 => "pattern_a0_file",
            Self::PatternA0Sa => "pattern_a0_sa_file",
            Self::PatternA0SaProjector => "pattern_a0_sa_projector_file",
            Self::PatternA0Projector => "pattern_a0_projector_file",
            Self::PatternA4 => "pattern_a4_file",
            Self::PatternA4Sa => "pattern_a4_sa_file",
            Self::PatternInstructables => "pattern_instructables_file",
            Self::Icon => "icon",
        }
    }

    pub fn from_form_field(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|slot| slot.form_field() == name)
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for AttachmentSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

/// The object key held by each slot of one pattern, `None` when empty.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SlotMap([Option<String>; 8]);

impl SlotMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, slot: AttachmentSlot) -> Option<&str> {
        self.0[slot.index()].as_deref()
    }

    /// Assign a slot, returning the key it held before.
    pub fn set(&mut self, slot: AttachmentSlot, key: Option<String>) -> Option<String> {
        std::mem::replace(&mut self.0[slot.index()], key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (AttachmentSlot, Option<&str>)> + '_ {
        AttachmentSlot::ALL
            .into_iter()
            .map(move |slot| (slot, self.get(slot)))
    }

    /// Non-empty slots with their keys.
    pub fn occupied(&self) -> impl Iterator<Item = (AttachmentSlot, &str)> + '_ {
        self.iter().filter_map(|(slot, key)| key.map(|k| (slot, k)))
    }

    pub fn occupied_count(&self) -> usize {
        self.occupied().count()
    }

    pub fn from_model(model: &pattern::Model) -> Self {
        Self([
            model.pattern_a0_file_id.clone(),
            model.pattern_a0_sa_file_id.clone(),
            model.pattern_a0_sa_projector_file_id.clone(),
            model.pattern_a0_projector_file_id.clone(),
            model.pattern_a4_file_id.clone(),
            model.pattern_a4_sa_file_id.clone(),
            model.pattern_instructables_file_id.clone(),
            model.icon.clone(),
        ])
    }

    /// Write every slot into the active model.
    pub fn apply_to(&self, active: &mut pattern::ActiveModel) {
        let [a0, a0_sa, a0_sa_projector, a0_projector, a4, a4_sa, instructables, icon] =
            self.0.clone();
        active.pattern_a0_file_id = Set(a0);
        active.pattern_a0_sa_file_id = Set(a0_sa);
        active.pattern_a0_sa_projector_file_id = Set(a0_sa_projector);
        active.pattern_a0_projector_file_id = Set(a0_projector);
        active.pattern_a4_file_id = Set(a4);
        active.pattern_a4_sa_file_id = Set(a4_sa);
        active.pattern_instructables_file_id = Set(instructables);
        active.icon = Set(icon);
    }
}
