use std::collections::HashMap;

use crate::models::{BulkPatch, NewTodo, Todo, TodoPatch};
use crate::query::{Page, PageRequest, TodoFilter};
use crate::repository::TodoRepository;
use crate::utils;

use super::ServiceError;

const BLANK_TITLE: &str = "Title must not be empty!";
const EMPTY_IDS: &str = "Ids list must not be empty";

/// Business rules for todos on top of a [`TodoRepository`]
pub struct TodoService<'a, R: ?Sized> {
    repo: &'a R,
}

impl<'a, R: TodoRepository + ?Sized> TodoService<'a, R> {
    pub fn new(repo: &'a R) -> Self {
        Self { repo }
    }

    pub fn create_todo(&self, new_todo: NewTodo) -> Result<Todo, ServiceError> {
        if new_todo.title.trim().is_empty() {
            return Err(ServiceError::InvalidArgument(BLANK_TITLE.to_string()));
        }

        let mut todo = Todo::new(new_todo.title);
        todo.description = new_todo.description;
        todo.completed = new_todo.completed.unwrap_or(false);
        todo.priority = new_todo.priority.unwrap_or_default();

        let saved = self.repo.insert_todo(&todo)?;
        tracing::info!(todo_id = ?saved.id, priority = %saved.priority, "todo created");
        Ok(saved)
    }

    pub fn get_todo(&self, id: i64) -> Result<Todo, ServiceError> {
        tracing::debug!(todo_id = id, "fetching todo");
        self.repo
            .find_todo(id)?
            .ok_or_else(|| ServiceError::todo_not_found(id))
    }

    pub fn get_todos(
        &self,
        filter: &TodoFilter,
        request: &PageRequest,
    ) -> Result<Page<Todo>, ServiceError> {
        tracing::debug!(?filter, ?request, "listing todos");
        Ok(self.repo.find_with_filters(filter, request)?)
    }

    pub fn update_todo(&self, id: i64, patch: TodoPatch) -> Result<Todo, ServiceError> {
        if patch.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(ServiceError::InvalidArgument(BLANK_TITLE.to_string()));
        }

        let mut todo = self.get_todo(id)?;
        if patch.is_empty() {
            return Ok(todo);
        }

        patch.apply_to(&mut todo);
        todo.touch(utils::now());
        self.repo.update_todo(&todo)?;
        tracing::info!(todo_id = id, "todo updated");
        Ok(todo)
    }

    pub fn toggle_complete(&self, id: i64) -> Result<Todo, ServiceError> {
        let mut todo = self.get_todo(id)?;
        todo.completed = !todo.completed;
        todo.touch(utils::now());
        self.repo.update_todo(&todo)?;
        tracing::info!(todo_id = id, completed = todo.completed, "todo toggled");
        Ok(todo)
    }

    /// Delete one todo and hand back what it looked like
    pub fn delete_todo(&self, id: i64) -> Result<Todo, ServiceError> {
        let todo = self.get_todo(id)?;
        self.repo.delete_todo(id)?;
        tracing::info!(todo_id = id, "todo deleted");
        Ok(todo)
    }

    /// All-or-nothing batch delete. Every id must exist before anything is removed.
    pub fn bulk_delete(&self, ids: &[i64]) -> Result<usize, ServiceError> {
        let unique = self.existing_unique_ids(ids)?;
        let deleted = self.repo.delete_by_ids(&unique)?;
        tracing::info!(requested = ids.len(), deleted, "todos bulk deleted");
        Ok(deleted)
    }

    /// Apply `patch` to every listed todo. With nothing to change, the current
    /// rows are returned untouched.
    pub fn bulk_update(&self, ids: &[i64], patch: BulkPatch) -> Result<Vec<Todo>, ServiceError> {
        let unique = self.existing_unique_ids(ids)?;

        let todos = if patch.is_empty() {
            self.repo.find_todos_by_ids(&unique)?
        } else {
            let updated = self.repo.update_by_ids(&unique, patch, utils::now())?;
            tracing::info!(
                count = updated.len(),
                completed = ?patch.completed,
                priority = ?patch.priority,
                "todos bulk updated"
            );
            updated
        };

        Ok(in_request_order(&unique, todos))
    }

    /// De-duplicate `ids` and fail on the first one that is not stored
    fn existing_unique_ids(&self, ids: &[i64]) -> Result<Vec<i64>, ServiceError> {
        if ids.is_empty() {
            return Err(ServiceError::InvalidArgument(EMPTY_IDS.to_string()));
        }

        let unique = utils::dedup_ids(ids);
        for &id in &unique {
            if !self.repo.todo_exists(id)? {
                tracing::debug!(todo_id = id, "bulk operation aborted, todo missing");
                return Err(ServiceError::todo_not_found(id));
            }
        }
        Ok(unique)
    }
}

fn in_request_order(ids: &[i64], todos: Vec<Todo>) -> Vec<Todo> {
    let mut by_id: HashMap<i64, Todo> = todos
        .into_iter()
        .filter_map(|t| t.id.map(|id| (id, t)))
        .collect();
    ids.iter().filter_map(|id| by_id.remove(id)).collect()
}
