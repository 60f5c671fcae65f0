use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{Connection, OptionalExtension};
use std::path::PathBuf;
use thiserror::Error;

use crate::models::{BulkPatch, Priority, Tag, Todo};
use crate::query::{Page, PageRequest, TodoFilter};
use crate::repository::{TagRepository, TodoRepository};
use crate::utils;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),
    #[error("Failed to create database directory: {0}")]
    DirectoryError(String),
    #[error("Cannot update a {0} that was never inserted")]
    NotPersisted(&'static str),
}

const TODO_COLUMNS: &str = "id, title, description, completed, priority, created_at, updated_at";

/// Ids bound per `IN (...)` statement, well under SQLite's 32766 variable limit
const IDS_PER_STATEMENT: usize = 10_000;

impl ToSql for Priority {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Priority {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

pub struct Database {
    conn: Connection,
}

impl Database {
    /// Create a new database connection and initialize the schema
    pub fn new(path: &str) -> Result<Self, DatabaseError> {
        let db_path = PathBuf::from(path);

        // Create parent directory if it doesn't exist
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| DatabaseError::DirectoryError(e.to_string()))?;
            }
        }

        Self::from_connection(Connection::open(&db_path)?)
    }

    /// Private in-memory database, used by tests and throwaway runs
    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, DatabaseError> {
        conn.pragma_update(None, "foreign_keys", true)?;
        let db = Database { conn };
        db.initialize_schema()?;
        Ok(db)
    }

    /// Initialize the database schema (tables and indexes)
    fn initialize_schema(&self) -> Result<(), DatabaseError> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS todos (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                title           TEXT NOT NULL,
                description     TEXT,
                completed       INTEGER NOT NULL DEFAULT 0,
                priority        TEXT NOT NULL DEFAULT 'MEDIUM',
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS tags (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                name            TEXT NOT NULL,
                created_at      TEXT NOT NULL
            )",
            [],
        )?;

        // Many-to-many link between todos and tags
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS todo_tags (
                todo_id         INTEGER NOT NULL REFERENCES todos(id) ON DELETE CASCADE,
                tag_id          INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
                PRIMARY KEY (todo_id, tag_id)
            )",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_todos_completed ON todos(completed)",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_todos_priority ON todos(priority)",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_todos_title ON todos(title)",
            [],
        )?;

        Ok(())
    }

    /// Get a reference to the underlying connection
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Helper function to map a row to a Todo
    fn row_to_todo(row: &rusqlite::Row) -> Result<Todo, rusqlite::Error> {
        Ok(Todo {
            id: Some(row.get(0)?),
            title: row.get(1)?,
            description: row.get(2)?,
            completed: row.get(3)?,
            priority: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }

    fn row_to_tag(row: &rusqlite::Row) -> Result<Tag, rusqlite::Error> {
        Ok(Tag {
            id: Some(row.get(0)?),
            name: row.get(1)?,
            created_at: row.get(2)?,
        })
    }

    /// `?1, ?2, ...` starting after `offset` already-bound parameters
    fn placeholders(count: usize, offset: usize) -> String {
        (1..=count)
            .map(|i| format!("?{}", i + offset))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn select_todos_by_ids(conn: &Connection, ids: &[i64]) -> Result<Vec<Todo>, DatabaseError> {
        let mut todos = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(IDS_PER_STATEMENT) {
            let sql = format!(
                "SELECT {TODO_COLUMNS} FROM todos WHERE id IN ({})",
                Self::placeholders(chunk.len(), 0)
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(rusqlite::params_from_iter(chunk), Self::row_to_todo)?;
            for row in rows {
                todos.push(row?);
            }
        }
        todos.sort_by_key(|todo| todo.id);
        Ok(todos)
    }
}

impl TodoRepository for Database {
    fn insert_todo(&self, todo: &Todo) -> Result<Todo, DatabaseError> {
        self.conn.execute(
            "INSERT INTO todos (title, description, completed, priority, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                todo.title,
                todo.description,
                todo.completed,
                todo.priority,
                todo.created_at,
                todo.updated_at
            ],
        )?;
        Ok(Todo {
            id: Some(self.conn.last_insert_rowid()),
            ..todo.clone()
        })
    }

    fn update_todo(&self, todo: &Todo) -> Result<(), DatabaseError> {
        let id = todo.id.ok_or(DatabaseError::NotPersisted("todo"))?;

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "UPDATE todos SET title = ?1, description = ?2, completed = ?3,
             priority = ?4, updated_at = ?5 WHERE id = ?6",
            rusqlite::params![
                todo.title,
                todo.description,
                todo.completed,
                todo.priority,
                todo.updated_at,
                id
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn find_todo(&self, id: i64) -> Result<Option<Todo>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {TODO_COLUMNS} FROM todos WHERE id = ?1"))?;
        let todo = stmt
            .query_row(rusqlite::params![id], Self::row_to_todo)
            .optional()?;
        Ok(todo)
    }

    fn todo_exists(&self, id: i64) -> Result<bool, DatabaseError> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM todos WHERE id = ?1)",
            rusqlite::params![id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    fn find_todos_by_ids(&self, ids: &[i64]) -> Result<Vec<Todo>, DatabaseError> {
        Self::select_todos_by_ids(&self.conn, ids)
    }

    fn find_with_filters(
        &self,
        filter: &TodoFilter,
        request: &PageRequest,
    ) -> Result<Page<Todo>, DatabaseError> {
        let predicate = filter.to_predicate();
        let where_clause = predicate.where_clause();

        let total: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM todos{where_clause}"),
            rusqlite::params_from_iter(predicate.params()),
            |row| row.get(0),
        )?;

        let Some(limit_clause) = request.limit_clause() else {
            return Ok(Page::new(Vec::new(), request, total as u64));
        };
        let sql = format!(
            "SELECT {TODO_COLUMNS} FROM todos{where_clause}{}{limit_clause}",
            request.sort.order_by_clause()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let todos = stmt
            .query_map(rusqlite::params_from_iter(predicate.params()), Self::row_to_todo)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page::new(todos, request, total as u64))
    }

    fn delete_todo(&self, id: i64) -> Result<bool, DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        let removed = tx.execute("DELETE FROM todos WHERE id = ?1", rusqlite::params![id])?;
        tx.commit()?;
        Ok(removed > 0)
    }

    fn delete_by_ids(&self, ids: &[i64]) -> Result<usize, DatabaseError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let tx = self.conn.unchecked_transaction()?;
        let mut removed = 0;
        for chunk in ids.chunks(IDS_PER_STATEMENT) {
            removed += tx.execute(
                &format!(
                    "DELETE FROM todos WHERE id IN ({})",
                    Self::placeholders(chunk.len(), 0)
                ),
                rusqlite::params_from_iter(chunk),
            )?;
        }
        tx.commit()?;
        Ok(removed)
    }

    fn update_by_ids(
        &self,
        ids: &[i64],
        patch: BulkPatch,
        now: DateTime<Utc>,
    ) -> Result<Vec<Todo>, DatabaseError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let tx = self.conn.unchecked_transaction()?;

        // One stamp for the batch, strictly after every row's last change
        let stamp = Self::select_todos_by_ids(&tx, ids)?
            .iter()
            .map(|todo| todo.updated_at.max(todo.created_at))
            .max()
            .map_or(now, |latest| utils::next_timestamp(latest, now));

        for chunk in ids.chunks(IDS_PER_STATEMENT) {
            let mut params: Vec<&dyn ToSql> = vec![&patch.completed, &patch.priority, &stamp];
            params.extend(chunk.iter().map(|id| id as &dyn ToSql));
            tx.execute(
                &format!(
                    "UPDATE todos SET
                        completed = COALESCE(?1, completed),
                        priority = COALESCE(?2, priority),
                        updated_at = ?3
                     WHERE id IN ({})",
                    Self::placeholders(chunk.len(), 3)
                ),
                params.as_slice(),
            )?;
        }
        let updated = Self::select_todos_by_ids(&tx, ids)?;
        tx.commit()?;
        Ok(updated)
    }
}

impl TagRepository for Database {
    fn insert_tag(&self, tag: &Tag) -> Result<Tag, DatabaseError> {
        self.conn.execute(
            "INSERT INTO tags (name, created_at) VALUES (?1, ?2)",
            rusqlite::params![tag.name, tag.created_at],
        )?;
        Ok(Tag {
            id: Some(self.conn.last_insert_rowid()),
            ..tag.clone()
        })
    }

    fn find_tag(&self, id: i64) -> Result<Option<Tag>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, created_at FROM tags WHERE id = ?1")?;
        let tag = stmt
            .query_row(rusqlite::params![id], Self::row_to_tag)
            .optional()?;
        Ok(tag)
    }

    fn find_all_tags(&self) -> Result<Vec<Tag>, DatabaseError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, created_at FROM tags ORDER BY id ASC")?;
        let tags = stmt
            .query_map([], Self::row_to_tag)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tags)
    }

    fn delete_tag(&self, id: i64) -> Result<bool, DatabaseError> {
        let tx = self.conn.unchecked_transaction()?;
        let removed = tx.execute("DELETE FROM tags WHERE id = ?1", rusqlite::params![id])?;
        tx.commit()?;
        Ok(removed > 0)
    }
}
