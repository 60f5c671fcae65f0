pub mod tag;
pub mod todo;

pub use tag::TagService;
pub use todo::TodoService;

use thiserror::Error;

use crate::database::DatabaseError;
use crate::query::QueryError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidArgument(String),
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

impl ServiceError {
    pub fn todo_not_found(id: i64) -> Self {
        ServiceError::NotFound(format!("Todo with id: {id} not found"))
    }

    pub fn tag_not_found(id: i64) -> Self {
        ServiceError::NotFound(format!("No tag with id {id} not found"))
    }
}

impl From<QueryError> for ServiceError {
    fn from(err: QueryError) -> Self {
        ServiceError::InvalidArgument(err.to_string())
    }
}
