use chrono::{DateTime, Utc};

use crate::database::DatabaseError;
use crate::models::{BulkPatch, Tag, Todo};
use crate::query::{Page, PageRequest, TodoFilter};

/// Storage operations the todo service relies on
pub trait TodoRepository {
    /// Insert a new todo and return it with its assigned id
    fn insert_todo(&self, todo: &Todo) -> Result<Todo, DatabaseError>;

    /// Overwrite every column of an existing todo
    fn update_todo(&self, todo: &Todo) -> Result<(), DatabaseError>;

    fn find_todo(&self, id: i64) -> Result<Option<Todo>, DatabaseError>;

    fn todo_exists(&self, id: i64) -> Result<bool, DatabaseError>;

    /// Rows for the given ids, in no particular order; missing ids are skipped
    fn find_todos_by_ids(&self, ids: &[i64]) -> Result<Vec<Todo>, DatabaseError>;

    fn find_with_filters(
        &self,
        filter: &TodoFilter,
        request: &PageRequest,
    ) -> Result<Page<Todo>, DatabaseError>;

    /// Returns whether a row was removed
    fn delete_todo(&self, id: i64) -> Result<bool, DatabaseError>;

    /// Batch delete; returns the number of rows removed
    fn delete_by_ids(&self, ids: &[i64]) -> Result<usize, DatabaseError>;

    /// Overwrite the fields set in `patch` on every listed row and return the
    /// rows as they read after the update, in one transaction. `updated_at`
    /// becomes `now`, or just past the newest stamp among the rows if the
    /// clock has not moved beyond it.
    fn update_by_ids(
        &self,
        ids: &[i64],
        patch: BulkPatch,
        now: DateTime<Utc>,
    ) -> Result<Vec<Todo>, DatabaseError>;
}

pub trait TagRepository {
    fn insert_tag(&self, tag: &Tag) -> Result<Tag, DatabaseError>;

    fn find_tag(&self, id: i64) -> Result<Option<Tag>, DatabaseError>;

    fn find_all_tags(&self) -> Result<Vec<Tag>, DatabaseError>;

    fn delete_tag(&self, id: i64) -> Result<bool, DatabaseError>;
}
