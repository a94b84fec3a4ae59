/// Paged list queries
///
/// Turns raw list parameters (page, sort, filters) into a validated
/// [`ListQuery`] for one entity type, and runs it against a repository with
/// [`PagedQueryEngine`].
///
/// # Flow
///
/// ```text
/// query string ──► ListParams ──► ListQuery<E> ──► PagedQueryEngine ──► Page<E>
///                 (defaults)     (validated)       (count + fetch)     (items + meta)
/// ```
///
/// # Example
///
/// ```
/// use agnes_shared::models::Category;
/// use agnes_shared::query::{ListParams, ListQuery};
///
/// let params = ListParams::default().page(2, 5).sort("name", "desc");
/// let query = ListQuery::<Category>::from_params(&params).unwrap();
/// assert_eq!(query.page().offset(), 5);
///
/// let bad = ListParams::default().sort("password", "asc");
/// assert!(ListQuery::<Category>::from_params(&bad).is_err());
/// ```

pub mod engine;
pub mod filter;
pub mod page;
pub mod params;
pub mod sort;

pub use engine::{ListQuery, PagedQueryEngine};
pub use filter::{DateRange, Filter};
pub use page::{Page, PageMeta, PageRequest};
pub use params::ListParams;
pub use sort::{SortDirection, SortKey};

/// Rejected list parameters
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    #[error("Invalid sort field '{0}'")]
    InvalidSortField(String),

    #[error("Invalid sort type '{0}', expected 'asc' or 'desc'")]
    InvalidSortType(String),

    #[error("{0}")]
    InvalidPageRequest(String),

    #[error("Invalid value '{value}' for filter '{param}'")]
    InvalidFilter { param: String, value: String },
}
