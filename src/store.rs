//! Storage engine for MyNote.
//!
//! This module provides all data access functionality using SQLite: CRUD over
//! notes and lists (with their owned items), the soft-delete/trash lifecycle,
//! retention-based purge, and the due-reminder reads the scheduler runs on.
//!
//! UUIDs are stored as BLOB (16 bytes); timestamps are Unix seconds (INTEGER).
//! Every mutating call is atomic: multi-row writes run inside a transaction,
//! and a caller never observes a partially applied write.

use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, Row, ToSql};
use uuid::Uuid;

use crate::error::{MyNoteError, MyNoteResult};
use crate::models::{
    List, ListFields, ListItem, ListItemFields, Note, NoteFields, Priority, StoreCounts,
};
use crate::search::{order_by_clause, push_filter_clauses, ItemFilter, SortOrder};
use crate::validation::{validate_body, validate_color, validate_item_text, validate_title};

/// How many days trashed rows are kept before `sweep_expired_trash` may purge
/// them.
pub const TRASH_RETENTION_DAYS: i64 = 7;

/// The default retention window as a [`Duration`]
pub fn default_retention() -> Duration {
    Duration::days(TRASH_RETENTION_DAYS)
}

/// Store handle shared between the UI path and the reminder worker.
///
/// The mutex is the single-writer discipline: whichever side holds it owns the
/// connection for the duration of one logical transaction.
pub type SharedStore = Arc<Mutex<ItemStore>>;

const NOTE_COLUMNS: &str =
    "id, title, body, priority, color, created_at, completed, deleted_at, reminder_at, reminder_resolved";

const LIST_COLUMNS: &str =
    "id, title, description, priority, color, created_at, completed, deleted_at";

pub struct ItemStore {
    conn: Connection,
}

impl ItemStore {
    /// Open (or create) the store at the given path.
    pub fn new<P: AsRef<Path>>(db_path: P) -> MyNoteResult<Self> {
        let conn = Connection::open(db_path)?;

        // WAL for better concurrent access, foreign keys for the
        // list_items cascade
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        let mut store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing)
    pub fn new_in_memory() -> MyNoteResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        let mut store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Initialize the schema
    fn init_schema(&mut self) -> MyNoteResult<()> {
        self.conn.execute_batch(
            r#"
            -- Notes with UUID7 BLOB primary key.
            -- All timestamps are Unix seconds (INTEGER) for timezone safety.
            -- completed is domain completion; reminder bookkeeping is the
            -- separate reminder_resolved flag.
            CREATE TABLE IF NOT EXISTS notes (
                id BLOB PRIMARY KEY,
                title TEXT NOT NULL,
                body TEXT NOT NULL,
                priority TEXT NOT NULL,
                color TEXT,
                created_at INTEGER NOT NULL,
                completed INTEGER NOT NULL DEFAULT 0,
                deleted_at INTEGER,
                reminder_at INTEGER,
                reminder_resolved INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS lists (
                id BLOB PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                priority TEXT NOT NULL,
                color TEXT,
                created_at INTEGER NOT NULL,
                completed INTEGER NOT NULL DEFAULT 0,
                deleted_at INTEGER
            );

            -- Items live and die with their list
            CREATE TABLE IF NOT EXISTS list_items (
                id BLOB PRIMARY KEY,
                list_id BLOB NOT NULL,
                text TEXT NOT NULL,
                is_completed INTEGER NOT NULL DEFAULT 0,
                position INTEGER NOT NULL,
                FOREIGN KEY (list_id) REFERENCES lists (id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_notes_created_at ON notes(created_at);
            CREATE INDEX IF NOT EXISTS idx_notes_deleted_at ON notes(deleted_at);
            CREATE INDEX IF NOT EXISTS idx_notes_reminder_at ON notes(reminder_at);
            CREATE INDEX IF NOT EXISTS idx_lists_created_at ON lists(created_at);
            CREATE INDEX IF NOT EXISTS idx_lists_deleted_at ON lists(deleted_at);
            CREATE INDEX IF NOT EXISTS idx_list_items_list_id ON list_items(list_id, position);
            "#,
        )?;
        Ok(())
    }

    /// Get direct access to the underlying connection
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    // =========================================================================
    // Notes
    // =========================================================================

    /// Create a new note, returning its store-assigned id
    pub fn create_note(&self, fields: &NoteFields) -> MyNoteResult<Uuid> {
        validate_note_fields(fields)?;

        let id = Uuid::now_v7();
        self.conn.execute(
            r#"
            INSERT INTO notes (id, title, body, priority, color, created_at, completed, reminder_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                id.as_bytes().to_vec(),
                fields.title,
                fields.body,
                fields.priority.as_str(),
                fields.color,
                Utc::now().timestamp(),
                fields.completed,
                fields.reminder_at.map(|t| t.timestamp()),
            ],
        )?;
        Ok(id)
    }

    /// Get an active note by id. Trashed notes are not returned.
    pub fn get_note(&self, id: Uuid) -> MyNoteResult<Option<Note>> {
        let sql = format!(
            "SELECT {} FROM notes WHERE id = ? AND deleted_at IS NULL",
            NOTE_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query_map([id.as_bytes().to_vec()], row_to_note)?;
        match rows.next() {
            Some(Ok(note)) => Ok(Some(note)),
            Some(Err(e)) => Err(MyNoteError::Database(e)),
            None => Ok(None),
        }
    }

    /// Update an active note's fields. `created_at` is immutable and the id
    /// never changes.
    ///
    /// The reminder is re-armed only when `reminder_at` actually changes:
    /// saving a note with the same reminder timestamp leaves an already
    /// dispatched reminder resolved.
    pub fn update_note(&self, id: Uuid, fields: &NoteFields) -> MyNoteResult<()> {
        validate_note_fields(fields)?;

        let updated = self.conn.execute(
            r#"
            UPDATE notes
            SET title = ?1,
                body = ?2,
                priority = ?3,
                color = ?4,
                completed = ?5,
                reminder_resolved = CASE WHEN reminder_at IS ?6 THEN reminder_resolved ELSE 0 END,
                reminder_at = ?6
            WHERE id = ?7 AND deleted_at IS NULL
            "#,
            params![
                fields.title,
                fields.body,
                fields.priority.as_str(),
                fields.color,
                fields.completed,
                fields.reminder_at.map(|t| t.timestamp()),
                id.as_bytes().to_vec(),
            ],
        )?;
        if updated == 0 {
            return Err(MyNoteError::not_found(format!("active note {}", id)));
        }
        Ok(())
    }

    /// Move a note to the trash
    pub fn soft_delete_note(&self, id: Uuid) -> MyNoteResult<()> {
        let deleted = self.conn.execute(
            "UPDATE notes SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL",
            params![Utc::now().timestamp(), id.as_bytes().to_vec()],
        )?;
        if deleted == 0 {
            return Err(MyNoteError::not_found(format!("active note {}", id)));
        }
        Ok(())
    }

    /// Bring a note back from the trash.
    ///
    /// Restoring a note that is already active is a no-op. Restoring a note
    /// whose row is gone (purged, possibly by a concurrent trash sweep) fails
    /// with `Conflict` so the caller can tell the two races apart.
    pub fn restore_note(&self, id: Uuid) -> MyNoteResult<()> {
        let restored = self.conn.execute(
            "UPDATE notes SET deleted_at = NULL WHERE id = ? AND deleted_at IS NOT NULL",
            params![id.as_bytes().to_vec()],
        )?;
        if restored == 0 {
            let exists: bool = self.conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM notes WHERE id = ?)",
                params![id.as_bytes().to_vec()],
                |row| row.get(0),
            )?;
            if !exists {
                return Err(MyNoteError::conflict(format!(
                    "note {} was already purged",
                    id
                )));
            }
        }
        Ok(())
    }

    /// Permanently delete a note, trashed or not. Irreversible; callers are
    /// expected to have confirmed retention eligibility or explicit intent.
    pub fn purge_note(&self, id: Uuid) -> MyNoteResult<()> {
        let purged = self.conn.execute(
            "DELETE FROM notes WHERE id = ?",
            params![id.as_bytes().to_vec()],
        )?;
        if purged == 0 {
            return Err(MyNoteError::not_found(format!("note {}", id)));
        }
        Ok(())
    }

    /// Query notes by filter and sort order
    pub fn query_notes(&self, filter: &ItemFilter, sort: SortOrder) -> MyNoteResult<Vec<Note>> {
        let mut sql = format!("SELECT {} FROM notes WHERE 1=1", NOTE_COLUMNS);
        let mut params: Vec<Box<dyn ToSql>> = Vec::new();
        push_filter_clauses(&mut sql, &mut params, filter, &["title", "body"]);
        sql.push_str(order_by_clause(sort));

        let mut stmt = self.conn.prepare(&sql)?;
        let params_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let notes = stmt
            .query_map(params_refs.as_slice(), row_to_note)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(notes)
    }

    // =========================================================================
    // Lists
    // =========================================================================

    /// Create a new list with its items, returning the list's id.
    /// The list row and every item commit together.
    pub fn create_list(
        &mut self,
        fields: &ListFields,
        items: &[ListItemFields],
    ) -> MyNoteResult<Uuid> {
        validate_list_fields(fields, items)?;

        let id = Uuid::now_v7();
        let tx = self.conn.transaction()?;
        tx.execute(
            r#"
            INSERT INTO lists (id, title, description, priority, color, created_at, completed)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                id.as_bytes().to_vec(),
                fields.title,
                fields.description,
                fields.priority.as_str(),
                fields.color,
                Utc::now().timestamp(),
                fields.completed,
            ],
        )?;
        insert_items(&tx, id, items)?;
        tx.commit()?;
        Ok(id)
    }

    /// Get an active list by id, items in position order. Trashed lists are
    /// not returned.
    pub fn get_list(&self, id: Uuid) -> MyNoteResult<Option<List>> {
        let sql = format!(
            "SELECT {} FROM lists WHERE id = ? AND deleted_at IS NULL",
            LIST_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query_map([id.as_bytes().to_vec()], row_to_list)?;
        let list = match rows.next() {
            Some(Ok(list)) => list,
            Some(Err(e)) => return Err(MyNoteError::Database(e)),
            None => return Ok(None),
        };
        drop(rows);
        drop(stmt);
        Ok(Some(self.attach_items(list)?))
    }

    /// Update an active list and replace its entire item set.
    ///
    /// The replace is delete-all-then-reinsert inside one transaction: the
    /// result is equivalent to never having had the intermediate item state,
    /// and a failure partway through leaves the previous item set untouched.
    pub fn update_list(
        &mut self,
        id: Uuid,
        fields: &ListFields,
        items: &[ListItemFields],
    ) -> MyNoteResult<()> {
        validate_list_fields(fields, items)?;

        let tx = self.conn.transaction()?;
        let updated = tx.execute(
            r#"
            UPDATE lists
            SET title = ?, description = ?, priority = ?, color = ?, completed = ?
            WHERE id = ? AND deleted_at IS NULL
            "#,
            params![
                fields.title,
                fields.description,
                fields.priority.as_str(),
                fields.color,
                fields.completed,
                id.as_bytes().to_vec(),
            ],
        )?;
        if updated == 0 {
            return Err(MyNoteError::not_found(format!("active list {}", id)));
        }
        tx.execute(
            "DELETE FROM list_items WHERE list_id = ?",
            params![id.as_bytes().to_vec()],
        )?;
        insert_items(&tx, id, items)?;
        tx.commit()?;
        Ok(())
    }

    /// Move a list (and, implicitly, its items) to the trash
    pub fn soft_delete_list(&self, id: Uuid) -> MyNoteResult<()> {
        let deleted = self.conn.execute(
            "UPDATE lists SET deleted_at = ? WHERE id = ? AND deleted_at IS NULL",
            params![Utc::now().timestamp(), id.as_bytes().to_vec()],
        )?;
        if deleted == 0 {
            return Err(MyNoteError::not_found(format!("active list {}", id)));
        }
        Ok(())
    }

    /// Bring a list back from the trash. Same race semantics as
    /// [`restore_note`](Self::restore_note).
    pub fn restore_list(&self, id: Uuid) -> MyNoteResult<()> {
        let restored = self.conn.execute(
            "UPDATE lists SET deleted_at = NULL WHERE id = ? AND deleted_at IS NOT NULL",
            params![id.as_bytes().to_vec()],
        )?;
        if restored == 0 {
            let exists: bool = self.conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM lists WHERE id = ?)",
                params![id.as_bytes().to_vec()],
                |row| row.get(0),
            )?;
            if !exists {
                return Err(MyNoteError::conflict(format!(
                    "list {} was already purged",
                    id
                )));
            }
        }
        Ok(())
    }

    /// Permanently delete a list and its items. Irreversible.
    pub fn purge_list(&self, id: Uuid) -> MyNoteResult<()> {
        let purged = self.conn.execute(
            "DELETE FROM lists WHERE id = ?",
            params![id.as_bytes().to_vec()],
        )?;
        if purged == 0 {
            return Err(MyNoteError::not_found(format!("list {}", id)));
        }
        Ok(())
    }

    /// Query lists by filter and sort order, items attached in position order
    pub fn query_lists(&self, filter: &ItemFilter, sort: SortOrder) -> MyNoteResult<Vec<List>> {
        let mut sql = format!("SELECT {} FROM lists WHERE 1=1", LIST_COLUMNS);
        let mut params: Vec<Box<dyn ToSql>> = Vec::new();
        push_filter_clauses(&mut sql, &mut params, filter, &["title", "description"]);
        sql.push_str(order_by_clause(sort));

        let mut stmt = self.conn.prepare(&sql)?;
        let params_refs: Vec<&dyn ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let lists = stmt
            .query_map(params_refs.as_slice(), row_to_list)?
            .collect::<Result<Vec<_>, _>>()?;
        drop(stmt);

        lists
            .into_iter()
            .map(|list| self.attach_items(list))
            .collect()
    }

    /// Toggle one checklist item's completion checkbox by its id
    pub fn set_list_item_completion(&self, item_id: Uuid, value: bool) -> MyNoteResult<()> {
        let updated = self.conn.execute(
            "UPDATE list_items SET is_completed = ? WHERE id = ?",
            params![value, item_id.as_bytes().to_vec()],
        )?;
        if updated == 0 {
            return Err(MyNoteError::not_found(format!("list item {}", item_id)));
        }
        Ok(())
    }

    /// Compatibility shim: toggle a checklist item addressed by (list, text).
    ///
    /// When several items in the list share the same text, the first one in
    /// position order is the target. Prefer the id-addressed
    /// [`set_list_item_completion`](Self::set_list_item_completion).
    pub fn set_list_item_completion_by_text(
        &self,
        list_id: Uuid,
        text: &str,
        value: bool,
    ) -> MyNoteResult<()> {
        let updated = self.conn.execute(
            r#"
            UPDATE list_items SET is_completed = ?1
            WHERE id = (
                SELECT id FROM list_items
                WHERE list_id = ?2 AND text = ?3
                ORDER BY position
                LIMIT 1
            )
            "#,
            params![value, list_id.as_bytes().to_vec(), text],
        )?;
        if updated == 0 {
            return Err(MyNoteError::not_found(format!(
                "item '{}' in list {}",
                text, list_id
            )));
        }
        Ok(())
    }

    fn attach_items(&self, mut list: List) -> MyNoteResult<List> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, list_id, text, is_completed, position
            FROM list_items
            WHERE list_id = ?
            ORDER BY position
            "#,
        )?;
        list.items = stmt
            .query_map([list.id.as_bytes().to_vec()], row_to_item)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(list)
    }

    // =========================================================================
    // Trash retention
    // =========================================================================

    /// Permanently delete every trashed note and list whose `deleted_at` is
    /// older than `retention`. Returns the number of rows purged (items
    /// removed by the cascade are not counted).
    ///
    /// Safe to call repeatedly: it only ever touches rows already excluded
    /// from active queries.
    pub fn sweep_expired_trash(&mut self, retention: Duration) -> MyNoteResult<u64> {
        let cutoff = (Utc::now() - retention).timestamp();

        let tx = self.conn.transaction()?;
        let notes = tx.execute(
            "DELETE FROM notes WHERE deleted_at IS NOT NULL AND deleted_at < ?",
            params![cutoff],
        )?;
        let lists = tx.execute(
            "DELETE FROM lists WHERE deleted_at IS NOT NULL AND deleted_at < ?",
            params![cutoff],
        )?;
        tx.commit()?;

        Ok((notes + lists) as u64)
    }

    // =========================================================================
    // Reminders
    // =========================================================================

    /// All notes whose reminder is due at `now`: armed, unresolved, not
    /// completed, not in the trash. Oldest reminder first.
    pub fn due_reminders(&self, now: DateTime<Utc>) -> MyNoteResult<Vec<Note>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM notes
            WHERE reminder_at IS NOT NULL
              AND reminder_at <= ?
              AND reminder_resolved = 0
              AND completed = 0
              AND deleted_at IS NULL
            ORDER BY reminder_at
            "#,
            NOTE_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let notes = stmt
            .query_map(params![now.timestamp()], row_to_note)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(notes)
    }

    /// Record that a note's reminder has been dispatched
    pub fn mark_reminder_resolved(&self, id: Uuid) -> MyNoteResult<()> {
        let updated = self.conn.execute(
            "UPDATE notes SET reminder_resolved = 1 WHERE id = ?",
            params![id.as_bytes().to_vec()],
        )?;
        if updated == 0 {
            return Err(MyNoteError::not_found(format!("note {}", id)));
        }
        Ok(())
    }

    // =========================================================================
    // Statistics
    // =========================================================================

    /// Store-wide counts for the overview screen
    pub fn counts(&self) -> MyNoteResult<StoreCounts> {
        let scalar = |sql: &str| -> MyNoteResult<u64> {
            let n: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
            Ok(n as u64)
        };
        Ok(StoreCounts {
            active_notes: scalar("SELECT COUNT(*) FROM notes WHERE deleted_at IS NULL")?,
            trashed_notes: scalar("SELECT COUNT(*) FROM notes WHERE deleted_at IS NOT NULL")?,
            armed_reminders: scalar(
                "SELECT COUNT(*) FROM notes \
                 WHERE deleted_at IS NULL AND reminder_at IS NOT NULL AND reminder_resolved = 0",
            )?,
            active_lists: scalar("SELECT COUNT(*) FROM lists WHERE deleted_at IS NULL")?,
        })
    }
}

fn validate_note_fields(fields: &NoteFields) -> MyNoteResult<()> {
    validate_title(&fields.title)?;
    validate_body(&fields.body, "body")?;
    validate_color(fields.color.as_deref())?;
    Ok(())
}

fn validate_list_fields(fields: &ListFields, items: &[ListItemFields]) -> MyNoteResult<()> {
    validate_title(&fields.title)?;
    validate_body(&fields.description, "description")?;
    validate_color(fields.color.as_deref())?;
    for item in items {
        validate_item_text(&item.text)?;
    }
    Ok(())
}

fn insert_items(
    tx: &rusqlite::Transaction<'_>,
    list_id: Uuid,
    items: &[ListItemFields],
) -> MyNoteResult<()> {
    let mut stmt = tx.prepare(
        "INSERT INTO list_items (id, list_id, text, is_completed, position) VALUES (?, ?, ?, ?, ?)",
    )?;
    for (position, item) in items.iter().enumerate() {
        stmt.execute(params![
            Uuid::now_v7().as_bytes().to_vec(),
            list_id.as_bytes().to_vec(),
            item.text,
            item.is_completed,
            position as i64,
        ])?;
    }
    Ok(())
}

fn row_to_uuid(row: &Row, idx: usize) -> rusqlite::Result<Uuid> {
    let bytes: Vec<u8> = row.get(idx)?;
    Uuid::from_slice(&bytes).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Blob, Box::new(e))
    })
}

fn ts_to_datetime(ts: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(ts, 0).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

fn row_to_note(row: &Row) -> rusqlite::Result<Note> {
    let priority_text: String = row.get(3)?;
    let priority = Priority::parse(&priority_text).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(Note {
        id: row_to_uuid(row, 0)?,
        title: row.get(1)?,
        body: row.get(2)?,
        priority,
        color: row.get(4)?,
        created_at: ts_to_datetime(row.get(5)?),
        completed: row.get(6)?,
        deleted_at: row.get::<_, Option<i64>>(7)?.map(ts_to_datetime),
        reminder_at: row.get::<_, Option<i64>>(8)?.map(ts_to_datetime),
        reminder_resolved: row.get(9)?,
    })
}

fn row_to_list(row: &Row) -> rusqlite::Result<List> {
    let priority_text: String = row.get(3)?;
    let priority = Priority::parse(&priority_text).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(List {
        id: row_to_uuid(row, 0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        priority,
        color: row.get(4)?,
        created_at: ts_to_datetime(row.get(5)?),
        completed: row.get(6)?,
        deleted_at: row.get::<_, Option<i64>>(7)?.map(ts_to_datetime),
        items: Vec::new(),
    })
}

fn row_to_item(row: &Row) -> rusqlite::Result<ListItem> {
    Ok(ListItem {
        id: row_to_uuid(row, 0)?,
        list_id: row_to_uuid(row, 1)?,
        text: row.get(2)?,
        is_completed: row.get(3)?,
        position: row.get(4)?,
    })
}
