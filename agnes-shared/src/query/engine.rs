//! Paged query engine

use std::marker::PhantomData;

use tracing::debug;

use super::filter::{DateRange, Filter};
use super::page::{Page, PageMeta, PageRequest};
use super::params::ListParams;
use super::sort::SortKey;
use super::QueryError;
use crate::entity::Entity;
use crate::store::{Repository, StoreError};

/// A list request validated against one entity's descriptor.
#[derive(Debug, Clone)]
pub struct ListQuery<E> {
    sort: SortKey,
    page: PageRequest,
    filters: Vec<Filter>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> ListQuery<E> {
    /// Validates raw parameters.
    ///
    /// Checks run in a fixed order: `sort_by`, `sort_type`, the page
    /// request, then filters. Filters come out in declaration order with the
    /// date range first.
    pub fn from_params(params: &ListParams) -> Result<Self, QueryError> {
        let sort = SortKey::resolve::<E>(&params.sort_by, &params.sort_type)?;
        let page = params.page_request()?;

        let mut filters = Vec::new();
        if let Some(range) =
            DateRange::from_params(params.start_date.as_deref(), params.end_date.as_deref())?
        {
            filters.push(Filter::CreatedBetween(range));
        }
        for spec in E::FILTERS {
            if let Some(raw) = params.filters.get(spec.param) {
                if let Some(filter) = Filter::from_spec(spec, raw)? {
                    filters.push(filter);
                }
            }
        }

        Ok(Self {
            sort,
            page,
            filters,
            _entity: PhantomData,
        })
    }

    pub fn sort(&self) -> SortKey {
        self.sort
    }

    pub fn page(&self) -> PageRequest {
        self.page
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Whether `record` passes every filter
    pub fn matches(&self, record: &E) -> bool {
        self.filters.iter().all(|filter| filter.matches(record))
    }
}

/// Runs a [`ListQuery`] against a repository: count the filtered set, fetch
/// the requested slice, and compute [`PageMeta`].
///
/// The engine is read-only and holds nothing but a borrowed repository, so
/// callers build one per request.
pub struct PagedQueryEngine<'a, E: Entity> {
    repo: &'a dyn Repository<E>,
}

impl<'a, E: Entity> PagedQueryEngine<'a, E> {
    pub fn new(repo: &'a dyn Repository<E>) -> Self {
        Self { repo }
    }

    pub async fn run(&self, query: &ListQuery<E>) -> Result<Page<E>, StoreError> {
        let total = self.repo.count(query).await?;
        if total == 0 {
            debug!(entity = E::NAME, "No records match list query");
            return Ok(Page::empty(query.page()));
        }

        let meta = PageMeta::compute(query.page(), total);
        let items = if meta.first_item > total {
            Vec::new()
        } else {
            self.repo.fetch(query).await?
        };

        debug!(
            entity = E::NAME,
            total,
            page = meta.current_page,
            returned = items.len(),
            "Ran list query"
        );

        Ok(Page { items, meta })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, CreateReading, Reading, User};
    use crate::store::MemoryStore;
    use chrono::{TimeZone, Utc};

    fn reading(id: i32, user_id: i32, device_id: i32, day: u32) -> Reading {
        let created_at = Utc.with_ymd_and_hms(2024, 4, day, 12, 0, 0).single().unwrap();
        Reading::build(
            id,
            &CreateReading {
                user_id,
                device_id,
                unit: "C".to_string(),
                value: format!("{}.5", id),
            },
            created_at,
        )
    }

    fn store() -> MemoryStore<Reading> {
        MemoryStore::with_records((1..=10).map(|id| reading(id, id % 3, id, id as u32)))
    }

    async fn run(store: &MemoryStore<Reading>, params: ListParams) -> Page<Reading> {
        let query = ListQuery::<Reading>::from_params(&params).unwrap();
        PagedQueryEngine::<Reading>::new(store).run(&query).await.unwrap()
    }

    #[test]
    fn test_validation_order() {
        let both_bad = ListParams::default().sort("unit", "sideways").page(0, 0);
        assert_eq!(
            ListQuery::<Reading>::from_params(&both_bad).unwrap_err(),
            QueryError::InvalidSortField("unit".to_string())
        );

        let bad_type = ListParams::default().sort("id", "sideways").page(0, 0);
        assert_eq!(
            ListQuery::<Reading>::from_params(&bad_type).unwrap_err(),
            QueryError::InvalidSortType("sideways".to_string())
        );

        let bad_page = ListParams::default().page(0, 10).filter("user_id", "x");
        assert!(matches!(
            ListQuery::<Reading>::from_params(&bad_page).unwrap_err(),
            QueryError::InvalidPageRequest(_)
        ));
    }

    #[test]
    fn test_sort_errors_win_over_unparsable_page() {
        let raw = |pairs: &[(&str, &str)]| {
            ListParams::from_query(
                pairs
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            )
        };

        let params = raw(&[("page", "abc"), ("sort_by", "bogus")]);
        assert_eq!(
            ListQuery::<User>::from_params(&params).unwrap_err(),
            QueryError::InvalidSortField("bogus".to_string())
        );

        let params = raw(&[("items_per_page", "x"), ("sort_type", "up")]);
        assert_eq!(
            ListQuery::<User>::from_params(&params).unwrap_err(),
            QueryError::InvalidSortType("up".to_string())
        );

        let params = raw(&[("page", "abc")]);
        assert!(matches!(
            ListQuery::<User>::from_params(&params).unwrap_err(),
            QueryError::InvalidPageRequest(_)
        ));
    }

    #[test]
    fn test_undeclared_parameters_are_ignored() {
        let params = ListParams::default().filter("unit", "C").filter("name", "x");
        let query = ListQuery::<Reading>::from_params(&params).unwrap();
        assert!(query.filters().is_empty());

        let query = ListQuery::<Category>::from_params(&params).unwrap();
        assert_eq!(query.filters().len(), 1);
    }

    #[tokio::test]
    async fn test_two_pages_of_five() {
        let store = store();

        let first = run(&store, ListParams::default().page(1, 5)).await;
        assert_eq!(first.items.len(), 5);
        assert_eq!(first.meta.total, 10);
        assert_eq!(first.meta.last_page, 2);
        assert_eq!(first.meta.first_item, 1);
        assert_eq!(first.meta.last_item, 5);

        let second = run(&store, ListParams::default().page(2, 5)).await;
        assert_eq!(second.items.len(), 5);
        assert_eq!(second.meta.first_item, 6);
        assert_eq!(second.meta.last_item, 10);

        let ids: Vec<i32> = first
            .items
            .iter()
            .chain(second.items.iter())
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, (1..=10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_empty_result_reports_last_page_zero() {
        let store = MemoryStore::<Reading>::new();
        let page = run(&store, ListParams::default()).await;
        assert!(page.items.is_empty());
        assert_eq!(page.meta.total, 0);
        assert_eq!(page.meta.last_page, 0);
    }

    #[tokio::test]
    async fn test_page_past_the_end_is_empty() {
        let page = run(&store(), ListParams::default().page(4, 5)).await;
        assert!(page.items.is_empty());
        assert_eq!(page.meta.total, 10);
        assert_eq!(page.meta.first_item, 16);
        assert_eq!(page.meta.last_item, 10);
    }

    #[tokio::test]
    async fn test_descending_sort() {
        let page = run(&store(), ListParams::default().sort("device_id", "desc").page(1, 3)).await;
        let ids: Vec<i32> = page.items.iter().map(|r| r.device_id).collect();
        assert_eq!(ids, vec![10, 9, 8]);
    }

    #[tokio::test]
    async fn test_ties_break_on_id() {
        let page = run(&store(), ListParams::default().sort("user_id", "desc")).await;
        let pairs: Vec<(i32, i32)> = page.items.iter().map(|r| (r.user_id, r.id)).collect();
        assert_eq!(&pairs[..4], &[(2, 2), (2, 5), (2, 8), (1, 1)]);
    }

    #[tokio::test]
    async fn test_filters_are_conjunctive() {
        let store = store();
        let by_user = run(&store, ListParams::default().filter("user_id", "1")).await;
        let by_range = run(
            &store,
            ListParams::default().created_between("2024-04-03", "2024-04-08"),
        )
        .await;
        let both = run(
            &store,
            ListParams::default()
                .filter("user_id", "1")
                .created_between("2024-04-03", "2024-04-08"),
        )
        .await;

        let expected: Vec<i32> = by_user
            .items
            .iter()
            .filter(|r| by_range.items.iter().any(|o| o.id == r.id))
            .map(|r| r.id)
            .collect();
        let actual: Vec<i32> = both.items.iter().map(|r| r.id).collect();
        assert_eq!(actual, expected);
        assert_eq!(actual, vec![4, 7]);
        assert_eq!(both.meta.total, 2);
    }

    #[tokio::test]
    async fn test_half_open_date_range_is_ignored() {
        let page = run(&store(), ListParams {
            start_date: Some("2024-04-09".to_string()),
            ..ListParams::default()
        })
        .await;
        assert_eq!(page.meta.total, 10);
    }

    #[tokio::test]
    async fn test_contains_filter_on_users() {
        let store = MemoryStore::<User>::with_records(
            ["alice", "bob", "alicia", "Alina"].iter().enumerate().map(|(i, name)| User {
                id: i as i32 + 1,
                username: name.to_string(),
                email: format!("{}@example.com", name),
                password: "hash".to_string(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            }),
        );
        let query =
            ListQuery::<User>::from_params(&ListParams::default().filter("username", "ali"))
                .unwrap();
        let page = PagedQueryEngine::<User>::new(&store).run(&query).await.unwrap();
        let names: Vec<&str> = page.items.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["alice", "alicia"]);
    }
}
