//! Data models for MyNote.
//!
//! This module defines the core entities: Note, List, and ListItem, plus the
//! input field structs the store accepts for create/update calls.
//! All IDs are UUID7, assigned by the store and immutable afterwards.
//! All timestamps are accurate to the second.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{MyNoteError, MyNoteResult};

/// Priority level for notes and lists.
///
/// Sort order for "by priority" queries is High > Medium > Low.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Default for Priority {
    fn default() -> Self {
        Self::Low
    }
}

impl Priority {
    /// Stable string form stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }

    /// Parse the stored string form back into a priority.
    pub fn parse(value: &str) -> MyNoteResult<Self> {
        match value {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(MyNoteError::validation(
                "priority",
                format!("unknown priority '{}'", other),
            )),
        }
    }
}

/// Represents a note in the system.
///
/// Notes carry free text plus tagging metadata (priority, color), an optional
/// armed reminder, and the soft-delete lifecycle timestamps. `completed` is
/// pure domain completion; reminder bookkeeping lives in `reminder_resolved`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Unique identifier for the note (UUID7)
    pub id: Uuid,
    /// Note title (never blank)
    pub title: String,
    /// The note text content
    pub body: String,
    /// Priority tag
    pub priority: Priority,
    /// Opaque color label, not interpreted by the core
    pub color: Option<String>,
    /// When the note was created (never NULL, immutable)
    pub created_at: DateTime<Utc>,
    /// Domain completion flag ("task finished")
    pub completed: bool,
    /// When the note was moved to the trash (None if active, soft delete)
    pub deleted_at: Option<DateTime<Utc>>,
    /// When the armed reminder fires (None if no reminder)
    pub reminder_at: Option<DateTime<Utc>>,
    /// Whether the armed reminder has already been dispatched
    pub reminder_resolved: bool,
}

impl Note {
    /// Check if the note is in the trash
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Check if the note carries a reminder that has not fired yet
    pub fn is_reminder_armed(&self) -> bool {
        self.reminder_at.is_some() && !self.reminder_resolved
    }
}

/// Fields accepted by `create_note` / `update_note`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoteFields {
    pub title: String,
    pub body: String,
    pub priority: Priority,
    pub color: Option<String>,
    /// Arm (Some) or clear (None) the note's reminder
    pub reminder_at: Option<DateTime<Utc>>,
    pub completed: bool,
}

impl NoteFields {
    /// Convenience constructor for the common title+body case
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            ..Default::default()
        }
    }
}

/// Represents a checklist-style list.
///
/// A list owns its items outright: items are created, replaced, and deleted
/// only as part of list saves, never addressed independently from outside
/// (completion toggling aside).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct List {
    /// Unique identifier for the list (UUID7)
    pub id: Uuid,
    /// List title (never blank)
    pub title: String,
    /// Free-text description
    pub description: String,
    /// Priority tag
    pub priority: Priority,
    /// Opaque color label, not interpreted by the core
    pub color: Option<String>,
    /// When the list was created (never NULL, immutable)
    pub created_at: DateTime<Utc>,
    /// Domain completion flag
    pub completed: bool,
    /// When the list was moved to the trash (None if active, soft delete)
    pub deleted_at: Option<DateTime<Utc>>,
    /// Owned checklist items, in position order
    pub items: Vec<ListItem>,
}

impl List {
    /// Check if the list is in the trash
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Fields accepted by `create_list` / `update_list`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListFields {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub color: Option<String>,
    pub completed: bool,
}

impl ListFields {
    /// Convenience constructor for the common title+description case
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            ..Default::default()
        }
    }
}

/// A single checklist entry owned by a [`List`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListItem {
    /// Unique identifier for the item (UUID7, stable across list saves only
    /// if the caller preserves it; replace-all saves assign fresh ids)
    pub id: Uuid,
    /// Owning list id (cascade-deleted with the list)
    pub list_id: Uuid,
    /// Item text
    pub text: String,
    /// Completion checkbox state
    pub is_completed: bool,
    /// Ordering within the list
    pub position: i64,
}

/// Item payload accepted by `create_list` / `update_list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListItemFields {
    pub text: String,
    pub is_completed: bool,
}

impl ListItemFields {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_completed: false,
        }
    }
}

/// Store-wide statistics for the overview screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreCounts {
    /// Active (non-trashed) notes
    pub active_notes: u64,
    /// Notes currently in the trash
    pub trashed_notes: u64,
    /// Active notes with an armed, unresolved reminder
    pub armed_reminders: u64,
    /// Active (non-trashed) lists
    pub active_lists: u64,
}
