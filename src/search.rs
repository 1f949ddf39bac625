//! Query composition for MyNote.
//!
//! This module builds the dynamic WHERE/ORDER BY clauses used by the store's
//! query path. Filters compose with AND logic; the same filter shape serves
//! both notes (title/body) and lists (title/description), the caller supplies
//! the text columns to match against.

use rusqlite::ToSql;
use serde::{Deserialize, Serialize};

use crate::models::Priority;

/// Filter criteria for note/list queries.
///
/// All criteria are optional and combine with AND. `trashed` selects between
/// the active view (default) and the trash view; trashed rows never leak into
/// active results.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemFilter {
    /// Case-insensitive substring match over the entity's text columns.
    ///
    /// The value is interpolated into a SQL LIKE pattern, so `%` and `_`
    /// act as wildcards (any run of characters / any single character).
    pub text: Option<String>,
    /// Exact priority match
    pub priority: Option<Priority>,
    /// Exact color label match
    pub color: Option<String>,
    /// Select trashed rows instead of active ones
    pub trashed: bool,
}

impl ItemFilter {
    /// Filter matching every active row
    pub fn active() -> Self {
        Self::default()
    }

    /// Filter matching every trashed row
    pub fn trashed_only() -> Self {
        Self {
            trashed: true,
            ..Self::default()
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

/// Sort order for query results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Newest first (the default view)
    CreatedDesc,
    /// Alphabetical by title
    TitleAsc,
    /// High > Medium > Low, newest first within a level
    PriorityDesc,
}

impl Default for SortOrder {
    fn default() -> Self {
        Self::CreatedDesc
    }
}

/// Append the WHERE clauses for `filter` to `sql`, pushing bound parameters
/// onto `params`. `text_columns` are the columns the free-text criterion
/// matches against (e.g. `["title", "body"]`).
///
/// The caller's base query must already end in a WHERE-compatible position;
/// every clause appended here starts with ` AND`.
pub fn push_filter_clauses(
    sql: &mut String,
    params: &mut Vec<Box<dyn ToSql>>,
    filter: &ItemFilter,
    text_columns: &[&str],
) {
    if filter.trashed {
        sql.push_str(" AND deleted_at IS NOT NULL");
    } else {
        sql.push_str(" AND deleted_at IS NULL");
    }

    if let Some(text) = filter.text.as_deref() {
        if !text.trim().is_empty() {
            let alternatives: Vec<String> = text_columns
                .iter()
                .map(|col| format!("LOWER({}) LIKE LOWER(?)", col))
                .collect();
            sql.push_str(&format!(" AND ({})", alternatives.join(" OR ")));
            let pattern = format!("%{}%", text);
            for _ in text_columns {
                params.push(Box::new(pattern.clone()));
            }
        }
    }

    if let Some(priority) = filter.priority {
        sql.push_str(" AND priority = ?");
        params.push(Box::new(priority.as_str().to_string()));
    }

    if let Some(color) = filter.color.as_deref() {
        sql.push_str(" AND color = ?");
        params.push(Box::new(color.to_string()));
    }
}

/// ORDER BY clause for `sort`, including the leading keyword.
pub fn order_by_clause(sort: SortOrder) -> &'static str {
    match sort {
        SortOrder::CreatedDesc => " ORDER BY created_at DESC",
        SortOrder::TitleAsc => " ORDER BY title COLLATE NOCASE ASC",
        SortOrder::PriorityDesc => {
            " ORDER BY CASE priority WHEN 'high' THEN 1 WHEN 'medium' THEN 2 ELSE 3 END, created_at DESC"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(filter: &ItemFilter) -> (String, usize) {
        let mut sql = String::new();
        let mut params: Vec<Box<dyn ToSql>> = Vec::new();
        push_filter_clauses(&mut sql, &mut params, filter, &["title", "body"]);
        (sql, params.len())
    }

    #[test]
    fn test_active_filter_excludes_trash() {
        let (sql, n) = render(&ItemFilter::active());
        assert_eq!(sql, " AND deleted_at IS NULL");
        assert_eq!(n, 0);
    }

    #[test]
    fn test_trashed_filter_selects_trash() {
        let (sql, n) = render(&ItemFilter::trashed_only());
        assert_eq!(sql, " AND deleted_at IS NOT NULL");
        assert_eq!(n, 0);
    }

    #[test]
    fn test_text_matches_every_column() {
        let (sql, n) = render(&ItemFilter::active().with_text("bills"));
        assert!(sql.contains("LOWER(title) LIKE LOWER(?)"));
        assert!(sql.contains("LOWER(body) LIKE LOWER(?)"));
        assert!(sql.contains(" OR "));
        assert_eq!(n, 2);
    }

    #[test]
    fn test_blank_text_ignored() {
        let (sql, n) = render(&ItemFilter::active().with_text("   "));
        assert!(!sql.contains("LIKE"));
        assert_eq!(n, 0);
    }

    #[test]
    fn test_priority_and_color_params() {
        let filter = ItemFilter::active()
            .with_priority(Priority::High)
            .with_color("amber");
        let (sql, n) = render(&filter);
        assert!(sql.contains("priority = ?"));
        assert!(sql.contains("color = ?"));
        assert_eq!(n, 2);
    }

    #[test]
    fn test_order_clauses() {
        assert_eq!(order_by_clause(SortOrder::CreatedDesc), " ORDER BY created_at DESC");
        assert!(order_by_clause(SortOrder::TitleAsc).contains("title"));
        let by_priority = order_by_clause(SortOrder::PriorityDesc);
        assert!(by_priority.contains("WHEN 'high' THEN 1"));
        assert!(by_priority.contains("WHEN 'medium' THEN 2"));
    }
}
