use crate::config::PaginationConfig;
use crate::models::Priority;
use crate::query::{PageRequest, Sort, TodoFilter};

use super::error::ApiError;

/// Decoded `key=value` pairs, keeping repeated keys in order
fn query_pairs(raw: Option<&str>) -> Result<Vec<(String, String)>, ApiError> {
    serde_urlencoded::from_str(raw.unwrap_or(""))
        .map_err(|e| ApiError::BadRequest(format!("Malformed query string: {e}")))
}

fn invalid(name: &str, value: &str) -> ApiError {
    ApiError::BadRequest(format!("Invalid value '{value}' for parameter '{name}'"))
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ApiError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(invalid(name, value)),
    }
}

fn parse_int(name: &str, value: &str) -> Result<i64, ApiError> {
    value.trim().parse().map_err(|_| invalid(name, value))
}

/// Filter and page settings of `GET /api/todos`
#[derive(Debug, Clone, PartialEq)]
pub struct ListTodosQuery {
    pub filter: TodoFilter,
    pub request: PageRequest,
}

impl ListTodosQuery {
    pub fn parse(raw: Option<&str>, pagination: &PaginationConfig) -> Result<Self, ApiError> {
        let mut filter = TodoFilter::default();
        let mut page: i64 = 0;
        let mut size: Option<i64> = None;
        let mut sort_params = Vec::new();

        for (key, value) in query_pairs(raw)? {
            // An empty value is the same as leaving the parameter out
            if value.is_empty() && key != "subtitle" {
                continue;
            }
            match key.as_str() {
                "completed" => filter.completed = Some(parse_bool(&key, &value)?),
                "subtitle" => filter.subtitle = Some(value),
                "priority" => {
                    filter.priority = Some(
                        value
                            .parse::<Priority>()
                            .map_err(|_| invalid(&key, &value))?,
                    )
                }
                "page" => page = parse_int(&key, &value)?,
                "size" => size = Some(parse_int(&key, &value)?),
                "sort" => sort_params.push(value),
                _ => {}
            }
        }

        let size = match size {
            Some(s) if s >= 1 => (s as u64).min(pagination.max_page_size),
            _ => pagination.default_page_size,
        };
        let sort = Sort::parse_params(sort_params.iter().map(String::as_str))
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;

        Ok(Self {
            filter,
            request: PageRequest::of(page.max(0) as u64, size).with_sort(sort),
        })
    }
}

/// The `ids` of a bulk request, comma separated and/or repeated
pub fn parse_ids(raw: Option<&str>) -> Result<Vec<i64>, ApiError> {
    let values: Vec<String> = query_pairs(raw)?
        .into_iter()
        .filter(|(key, _)| key == "ids")
        .map(|(_, value)| value)
        .collect();

    if values.is_empty() {
        return Err(ApiError::BadRequest(
            "Required parameter 'ids' is not present".to_string(),
        ));
    }

    values
        .iter()
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| parse_int("ids", s))
        .collect()
}
