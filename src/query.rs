//! Filtering, sorting and paging for todo listings.
//!
//! A [`TodoFilter`] folds into a conjunctive SQL [`Predicate`], carrying one
//! clause per filter that is actually set. [`PageRequest`] and [`Sort`] become
//! the `ORDER BY` / `LIMIT` tail of the same statement, and the result comes
//! back as a [`Page`].

use rusqlite::types::Value;
use std::str::FromStr;
use thiserror::Error;

use crate::models::Priority;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("No property '{0}' found for type 'Todo'")]
    UnknownSortProperty(String),
}

/// Optional listing filters; `None` means "no constraint"
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoFilter {
    pub completed: Option<bool>,
    pub subtitle: Option<String>,
    pub priority: Option<Priority>,
}

impl TodoFilter {
    pub fn to_predicate(&self) -> Predicate {
        let mut predicate = Predicate::default();

        if let Some(completed) = self.completed {
            predicate.push(
                |n| format!("completed = ?{n}"),
                Value::Integer(i64::from(completed)),
            );
        }

        // An empty subtitle is the same as no subtitle
        if let Some(subtitle) = self.subtitle.as_deref().filter(|s| !s.is_empty()) {
            predicate.push(
                |n| format!("instr(lower(title), lower(?{n})) > 0"),
                Value::Text(subtitle.to_string()),
            );
        }

        if let Some(priority) = self.priority {
            predicate.push(
                |n| format!("priority = ?{n}"),
                Value::Text(priority.as_str().to_string()),
            );
        }

        predicate
    }
}

/// Conjunction of SQL conditions plus the values bound to their placeholders
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    clauses: Vec<String>,
    params: Vec<Value>,
}

impl Predicate {
    /// Add a clause; `clause` receives the 1-based index of its placeholder
    fn push(&mut self, clause: impl FnOnce(usize) -> String, value: Value) {
        self.params.push(value);
        self.clauses.push(clause(self.params.len()));
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// `" WHERE a AND b"`, or an empty string when unconstrained
    pub fn where_clause(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortProperty {
    Id,
    Title,
    Description,
    Completed,
    Priority,
    CreatedAt,
    UpdatedAt,
}

impl SortProperty {
    pub fn column(self) -> &'static str {
        match self {
            SortProperty::Id => "id",
            SortProperty::Title => "title",
            SortProperty::Description => "description",
            SortProperty::Completed => "completed",
            SortProperty::Priority => "priority",
            SortProperty::CreatedAt => "created_at",
            SortProperty::UpdatedAt => "updated_at",
        }
    }
}

impl FromStr for SortProperty {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(SortProperty::Id),
            "title" => Ok(SortProperty::Title),
            "description" => Ok(SortProperty::Description),
            "completed" => Ok(SortProperty::Completed),
            "priority" => Ok(SortProperty::Priority),
            "createdAt" | "created_at" => Ok(SortProperty::CreatedAt),
            "updatedAt" | "updated_at" => Ok(SortProperty::UpdatedAt),
            other => Err(QueryError::UnknownSortProperty(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    fn parse(token: &str) -> Option<Self> {
        if token.eq_ignore_ascii_case("asc") {
            Some(Direction::Asc)
        } else if token.eq_ignore_ascii_case("desc") {
            Some(Direction::Desc)
        } else {
            None
        }
    }

    fn keyword(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Order {
    pub property: SortProperty,
    pub direction: Direction,
}

impl Order {
    pub fn asc(property: SortProperty) -> Self {
        Self {
            property,
            direction: Direction::Asc,
        }
    }

    pub fn desc(property: SortProperty) -> Self {
        Self {
            property,
            direction: Direction::Desc,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sort {
    orders: Vec<Order>,
}

impl Sort {
    pub fn unsorted() -> Self {
        Self::default()
    }

    pub fn by(orders: Vec<Order>) -> Self {
        Self { orders }
    }

    /// Parse repeated `sort` parameters of the form `prop[,prop...][,asc|desc]`.
    /// A trailing direction applies to every property in the same parameter.
    pub fn parse_params<'a, I>(params: I) -> Result<Self, QueryError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut orders = Vec::new();
        for param in params {
            let mut tokens: Vec<&str> = param
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .collect();

            let direction = match tokens.last().and_then(|t| Direction::parse(t)) {
                Some(direction) => {
                    tokens.pop();
                    direction
                }
                None => Direction::Asc,
            };

            for token in tokens {
                orders.push(Order {
                    property: token.parse()?,
                    direction,
                });
            }
        }
        Ok(Self { orders })
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn is_sorted(&self) -> bool {
        !self.orders.is_empty()
    }

    pub fn direction_for(&self, property: SortProperty) -> Option<Direction> {
        self.orders
            .iter()
            .find(|o| o.property == property)
            .map(|o| o.direction)
    }

    /// `" ORDER BY ..."` ending with `id ASC` unless id is already a key,
    /// so pages never overlap when the requested keys tie.
    pub fn order_by_clause(&self) -> String {
        let mut keys: Vec<String> = self
            .orders
            .iter()
            .map(|o| format!("{} {}", o.property.column(), o.direction.keyword()))
            .collect();
        if self.direction_for(SortProperty::Id).is_none() {
            keys.push("id ASC".to_string());
        }
        format!(" ORDER BY {}", keys.join(", "))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pagination {
    Unpaged,
    Paged { page: u64, size: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub pagination: Pagination,
    pub sort: Sort,
}

impl PageRequest {
    pub fn unpaged() -> Self {
        Self {
            pagination: Pagination::Unpaged,
            sort: Sort::unsorted(),
        }
    }

    /// A zero `size` is raised to one
    pub fn of(page: u64, size: u64) -> Self {
        Self {
            pagination: Pagination::Paged {
                page,
                size: size.max(1),
            },
            sort: Sort::unsorted(),
        }
    }

    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    /// `" LIMIT n OFFSET m"` for paged requests, empty when unpaged.
    /// `None` when the offset does not fit in SQLite's 64-bit integer,
    /// so no row can be on the page.
    pub fn limit_clause(&self) -> Option<String> {
        match self.pagination {
            Pagination::Unpaged => Some(String::new()),
            Pagination::Paged { page, size } => {
                let limit = i64::try_from(size).unwrap_or(i64::MAX);
                let offset = i64::try_from(page).ok()?.checked_mul(limit)?;
                Some(format!(" LIMIT {limit} OFFSET {offset}"))
            }
        }
    }
}

/// A slice of results plus what is needed to navigate the rest
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    content: Vec<T>,
    number: u64,
    size: u64,
    total_elements: u64,
    paged: bool,
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, request: &PageRequest, total_elements: u64) -> Self {
        match request.pagination {
            Pagination::Paged { page, size } => Self {
                content,
                number: page,
                size,
                total_elements,
                paged: true,
            },
            Pagination::Unpaged => Self {
                size: content.len() as u64,
                content,
                number: 0,
                total_elements,
                paged: false,
            },
        }
    }

    pub fn content(&self) -> &[T] {
        &self.content
    }

    pub fn into_content(self) -> Vec<T> {
        self.content
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn total_elements(&self) -> u64 {
        self.total_elements
    }

    pub fn number_of_elements(&self) -> usize {
        self.content.len()
    }

    pub fn total_pages(&self) -> u64 {
        if !self.paged || self.size == 0 {
            1
        } else {
            self.total_elements.div_ceil(self.size)
        }
    }

    pub fn is_first(&self) -> bool {
        self.number == 0
    }

    pub fn is_last(&self) -> bool {
        self.number.saturating_add(1) >= self.total_pages()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            number: self.number,
            size: self.size,
            total_elements: self.total_elements,
            paged: self.paged,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_has_no_where_clause() {
        let predicate = TodoFilter::default().to_predicate();
        assert!(predicate.is_empty());
        assert_eq!(predicate.where_clause(), "");
        assert!(predicate.params().is_empty());
    }

    #[test]
    fn empty_subtitle_is_ignored() {
        let filter = TodoFilter {
            subtitle: Some(String::new()),
            ..Default::default()
        };
        assert!(filter.to_predicate().is_empty());
    }

    #[test]
    fn all_filters_are_joined_with_and() {
        let filter = TodoFilter {
            completed: Some(false),
            subtitle: Some("Work".to_string()),
            priority: Some(Priority::High),
        };
        let predicate = filter.to_predicate();
        assert_eq!(
            predicate.where_clause(),
            " WHERE completed = ?1 AND instr(lower(title), lower(?2)) > 0 AND priority = ?3"
        );
        assert_eq!(
            predicate.params(),
            &[
                Value::Integer(0),
                Value::Text("Work".to_string()),
                Value::Text("HIGH".to_string()),
            ]
        );
    }

    #[test]
    fn placeholders_are_numbered_by_present_filters_only() {
        let filter = TodoFilter {
            priority: Some(Priority::Low),
            ..Default::default()
        };
        assert_eq!(filter.to_predicate().where_clause(), " WHERE priority = ?1");
    }

    #[test]
    fn sort_params_follow_prop_direction_convention() {
        let sort = Sort::parse_params(["priority,desc", "title,asc", "createdAt"]).unwrap();
        assert_eq!(
            sort.orders(),
            &[
                Order::desc(SortProperty::Priority),
                Order::asc(SortProperty::Title),
                Order::asc(SortProperty::CreatedAt),
            ]
        );
        assert_eq!(sort.direction_for(SortProperty::Priority), Some(Direction::Desc));
    }

    #[test]
    fn trailing_direction_applies_to_all_properties() {
        let sort = Sort::parse_params(["title,completed,DESC"]).unwrap();
        assert_eq!(
            sort.orders(),
            &[
                Order::desc(SortProperty::Title),
                Order::desc(SortProperty::Completed),
            ]
        );
    }

    #[test]
    fn unknown_sort_property_is_rejected() {
        let err = Sort::parse_params(["owner,asc"]).unwrap_err();
        assert_eq!(err, QueryError::UnknownSortProperty("owner".to_string()));
    }

    #[test]
    fn order_by_appends_id_tiebreaker() {
        assert_eq!(Sort::unsorted().order_by_clause(), " ORDER BY id ASC");
        let sort = Sort::by(vec![Order::desc(SortProperty::UpdatedAt)]);
        assert_eq!(sort.order_by_clause(), " ORDER BY updated_at DESC, id ASC");
        let sort = Sort::by(vec![Order::desc(SortProperty::Id)]);
        assert_eq!(sort.order_by_clause(), " ORDER BY id DESC");
    }

    #[test]
    fn last_page_metadata() {
        let request = PageRequest::of(2, 2);
        assert_eq!(request.limit_clause().as_deref(), Some(" LIMIT 2 OFFSET 4"));
        let page = Page::new(vec!["Task 5"], &request, 5);
        assert_eq!(page.total_pages(), 3);
        assert!(page.is_last());
        assert!(!page.is_first());
        assert_eq!(page.number_of_elements(), 1);
    }

    #[test]
    fn page_past_the_end_is_empty_and_last() {
        let page: Page<i32> = Page::new(vec![], &PageRequest::of(10, 2), 5);
        assert!(page.is_empty());
        assert!(page.is_last());
        assert_eq!(page.total_elements(), 5);
    }

    #[test]
    fn offset_past_i64_has_no_limit_clause() {
        let request = PageRequest::of(i64::MAX as u64, 20);
        assert_eq!(request.limit_clause(), None);
        assert_eq!(PageRequest::of(u64::MAX, 1).limit_clause(), None);

        let largest = PageRequest::of(i64::MAX as u64, 1);
        assert_eq!(
            largest.limit_clause(),
            Some(format!(" LIMIT 1 OFFSET {}", i64::MAX))
        );

        let page: Page<i32> = Page::new(vec![], &PageRequest::of(u64::MAX, 1), 3);
        assert!(page.is_last());
    }

    #[test]
    fn unpaged_is_a_single_page() {
        let request = PageRequest::unpaged();
        assert_eq!(request.limit_clause().as_deref(), Some(""));
        let page = Page::new(vec![1, 2, 3], &request, 3);
        assert_eq!(page.size(), 3);
        assert_eq!(page.total_pages(), 1);
        assert!(page.is_first() && page.is_last());
    }

    #[test]
    fn zero_size_is_raised_to_one() {
        assert_eq!(
            PageRequest::of(0, 0).pagination,
            Pagination::Paged { page: 0, size: 1 }
        );
    }
}
