use axum::Json;
use axum::extract::{FromRequest, Request};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::models::{NewTodo, Priority, Tag, Todo, TodoPatch};
use crate::query::Page;

use super::error::ApiError;

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTodoRequest {
    #[validate(
        custom(function = not_blank, message = "Title must not be empty!"),
        length(min = 1, max = 100, message = "Title size should be between 1 and 100")
    )]
    pub title: String,
    #[validate(length(max = 500, message = "Description max size should be 500"))]
    pub description: Option<String>,
    pub completed: Option<bool>,
    pub priority: Option<Priority>,
}

impl From<CreateTodoRequest> for NewTodo {
    fn from(req: CreateTodoRequest) -> Self {
        NewTodo {
            title: req.title,
            description: req.description,
            completed: req.completed,
            priority: req.priority,
        }
    }
}

/// Every field optional; blank titles are left for the service to reject
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTodoRequest {
    #[validate(length(min = 1, max = 100, message = "Title size should be between 1 and 100"))]
    pub title: Option<String>,
    #[validate(length(max = 500, message = "Description max size should be 500"))]
    pub description: Option<String>,
    pub completed: Option<bool>,
    pub priority: Option<Priority>,
}

impl From<UpdateTodoRequest> for TodoPatch {
    fn from(req: UpdateTodoRequest) -> Self {
        TodoPatch {
            title: req.title,
            description: req.description,
            completed: req.completed,
            priority: req.priority,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BulkUpdateRequest {
    #[serde(default)]
    pub ids: Vec<i64>,
    pub completed: Option<bool>,
    pub priority: Option<Priority>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTagRequest {
    #[validate(custom(function = not_blank, message = "Tag name cannot be blank"))]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoResponse {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Todo> for TodoResponse {
    fn from(todo: Todo) -> Self {
        TodoResponse {
            id: todo.id.unwrap_or_default(),
            title: todo.title,
            description: todo.description,
            completed: todo.completed,
            priority: todo.priority,
            created_at: todo.created_at,
            updated_at: todo.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagResponse {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl From<Tag> for TagResponse {
    fn from(tag: Tag) -> Self {
        TagResponse {
            id: tag.id.unwrap_or_default(),
            name: tag.name,
            created_at: tag.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
    pub content: Vec<T>,
    pub number: u64,
    pub size: u64,
    pub total_elements: u64,
    pub total_pages: u64,
    pub number_of_elements: usize,
    pub first: bool,
    pub last: bool,
    pub empty: bool,
}

impl<T> From<Page<T>> for PageResponse<T> {
    fn from(page: Page<T>) -> Self {
        PageResponse {
            number: page.number(),
            size: page.size(),
            total_elements: page.total_elements(),
            total_pages: page.total_pages(),
            number_of_elements: page.number_of_elements(),
            first: page.is_first(),
            last: page.is_last(),
            empty: page.is_empty(),
            content: page.into_content(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkDeleteResponse {
    pub deleted: usize,
}

/// JSON body that has passed its `validator` rules.
/// Any body that fails to parse is a [`ApiError::MalformedBody`].
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| {
                ApiError::MalformedBody(format!("Malformed JSON request: {}", rejection.body_text()))
            })?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(title: &str, description: Option<String>) -> CreateTodoRequest {
        CreateTodoRequest {
            title: title.to_string(),
            description,
            completed: None,
            priority: None,
        }
    }

    #[test]
    fn create_request_title_rules() {
        assert!(create("ok", None).validate().is_ok());

        let message = ApiError::from(create("", None).validate().unwrap_err()).to_string();
        assert!(message.contains("title: Title must not be empty!"));
        assert!(message.contains("title: Title size should be between 1 and 100"));

        let message = ApiError::from(create("   ", None).validate().unwrap_err()).to_string();
        assert_eq!(message, "title: Title must not be empty!");

        let long = "x".repeat(101);
        let message = ApiError::from(create(&long, None).validate().unwrap_err()).to_string();
        assert_eq!(message, "title: Title size should be between 1 and 100");
    }

    #[test]
    fn description_limit_counts_characters() {
        assert!(create("ok", Some("é".repeat(500))).validate().is_ok());
        let message =
            ApiError::from(create("ok", Some("x".repeat(501))).validate().unwrap_err()).to_string();
        assert_eq!(message, "description: Description max size should be 500");
    }

    #[test]
    fn update_request_allows_blank_but_not_empty_title() {
        let blank = UpdateTodoRequest {
            title: Some(" ".to_string()),
            ..Default::default()
        };
        assert!(blank.validate().is_ok());

        let empty = UpdateTodoRequest {
            title: Some(String::new()),
            ..Default::default()
        };
        let message = ApiError::from(empty.validate().unwrap_err()).to_string();
        assert_eq!(message, "title: Title size should be between 1 and 100");

        assert!(UpdateTodoRequest::default().validate().is_ok());
    }

    #[test]
    fn violations_on_several_fields_are_all_reported() {
        let request = UpdateTodoRequest {
            title: Some("t".repeat(101)),
            description: Some("d".repeat(501)),
            ..Default::default()
        };
        let message = ApiError::from(request.validate().unwrap_err()).to_string();
        assert_eq!(
            message,
            "description: Description max size should be 500; title: Title size should be between 1 and 100"
        );
    }

    #[test]
    fn unpaged_page_response_is_single_page() {
        use crate::query::PageRequest;
        let page = Page::new(vec![1, 2], &PageRequest::unpaged(), 2);
        let response = PageResponse::from(page);
        assert_eq!(response.total_pages, 1);
        assert!(response.first && response.last && !response.empty);
        assert_eq!(response.size, 2);
    }
}
