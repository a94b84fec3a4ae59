//! Raw list parameters

use std::collections::HashMap;

use super::page::PageRequest;
use super::QueryError;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_ITEMS_PER_PAGE: i64 = 10;
pub const DEFAULT_SORT_BY: &str = "id";
pub const DEFAULT_SORT_TYPE: &str = "asc";

/// List parameters before entity-specific validation.
///
/// Every key that is not one of the reserved names ends up in `filters`;
/// each entity picks out the ones it declares and ignores the rest.
/// `page` and `items_per_page` stay raw until [`ListParams::page_request`]
/// so a bad sort parameter is reported first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListParams {
    pub page: Option<String>,
    pub items_per_page: Option<String>,
    pub sort_by: String,
    pub sort_type: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub filters: HashMap<String, String>,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            page: None,
            items_per_page: None,
            sort_by: DEFAULT_SORT_BY.to_string(),
            sort_type: DEFAULT_SORT_TYPE.to_string(),
            start_date: None,
            end_date: None,
            filters: HashMap::new(),
        }
    }
}

impl ListParams {
    /// Builds parameters from a decoded query string, applying defaults.
    pub fn from_query(mut query: HashMap<String, String>) -> Self {
        let defaults = Self::default();

        Self {
            page: query.remove("page"),
            items_per_page: query.remove("items_per_page"),
            sort_by: query.remove("sort_by").unwrap_or(defaults.sort_by),
            sort_type: query.remove("sort_type").unwrap_or(defaults.sort_type),
            start_date: query.remove("start_date"),
            end_date: query.remove("end_date"),
            filters: query,
        }
    }

    /// Parses and validates the page request, defaulting missing values.
    ///
    /// # Errors
    ///
    /// `InvalidPageRequest` when either value is not an integer or is below 1.
    pub fn page_request(&self) -> Result<PageRequest, QueryError> {
        let page = parse_int("page", self.page.as_deref(), DEFAULT_PAGE)?;
        let items_per_page = parse_int(
            "items_per_page",
            self.items_per_page.as_deref(),
            DEFAULT_ITEMS_PER_PAGE,
        )?;
        PageRequest::new(page, items_per_page)
    }

    pub fn page(mut self, page: i64, items_per_page: i64) -> Self {
        self.page = Some(page.to_string());
        self.items_per_page = Some(items_per_page.to_string());
        self
    }

    pub fn sort(mut self, sort_by: &str, sort_type: &str) -> Self {
        self.sort_by = sort_by.to_string();
        self.sort_type = sort_type.to_string();
        self
    }

    pub fn created_between(mut self, start_date: &str, end_date: &str) -> Self {
        self.start_date = Some(start_date.to_string());
        self.end_date = Some(end_date.to_string());
        self
    }

    pub fn filter(mut self, param: &str, value: &str) -> Self {
        self.filters.insert(param.to_string(), value.to_string());
        self
    }
}

fn parse_int(param: &str, raw: Option<&str>, default: i64) -> Result<i64, QueryError> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    raw.trim()
        .parse()
        .map_err(|_| QueryError::InvalidPageRequest(format!("{} must be an integer", param)))
}
