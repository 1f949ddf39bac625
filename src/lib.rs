//! MyNote Core - the data and scheduling core of the MyNote task manager.
//!
//! This library provides the non-presentation half of MyNote:
//! - Data models (Note, List, ListItem)
//! - Persistent storage with a soft-delete trash lifecycle (SQLite)
//! - Filtered/sorted queries over notes and lists
//! - A background scheduler that dispatches due reminders
//! - Configuration management
//!
//! The UI layer consumes [`ItemStore`] synchronously and drives
//! [`ReminderScheduler`] start/stop; notification delivery is injected
//! through the [`NotificationSink`] trait.

pub mod config;
pub mod error;
pub mod models;
pub mod scheduler;
pub mod search;
pub mod store;
pub mod validation;

// Re-export commonly used types
pub use config::Config;
pub use error::{MyNoteError, MyNoteResult};
pub use models::{
    List, ListFields, ListItem, ListItemFields, Note, NoteFields, Priority, StoreCounts,
};
pub use scheduler::{DispatchError, NotificationSink, ReminderScheduler};
pub use search::{ItemFilter, SortOrder};
pub use store::{ItemStore, SharedStore};
