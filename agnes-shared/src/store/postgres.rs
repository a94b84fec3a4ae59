/// PostgreSQL repository
///
/// One generic implementation serves every entity. Statements are assembled
/// with [`sqlx::QueryBuilder`] from the entity descriptor: identifiers come
/// from the descriptor's static column lists and are always quoted, and
/// every value is bound.
///
/// # Filters
///
/// | Filter | SQL |
/// |--------|-----|
/// | date range | `"created_at" BETWEEN $a AND $b` |
/// | contains | `strpos("col", $n) > 0` (case-sensitive) |
/// | equals | `"col" = $n` |
///
/// # Example
///
/// ```no_run
/// use agnes_shared::models::Device;
/// use agnes_shared::query::{ListParams, ListQuery, PagedQueryEngine};
/// use agnes_shared::store::PgStore;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let store = PgStore::<Device>::new(pool);
/// let query = ListQuery::<Device>::from_params(&ListParams::default().filter("name", "sensor"))?;
/// let page = PagedQueryEngine::<Device>::new(&store).run(&query).await?;
/// println!("{} devices", page.meta.total);
/// # Ok(())
/// # }
/// ```

use std::marker::PhantomData;

use async_trait::async_trait;
use sqlx::{postgres::PgPool, Postgres, QueryBuilder};
use tracing::{debug, warn};

use super::{Repository, StoreError};
use crate::entity::{Entity, FieldValue};
use crate::query::{Filter, ListQuery};

/// SQLSTATE for unique_violation
const UNIQUE_VIOLATION: &str = "23505";

pub struct PgStore<E> {
    pool: PgPool,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for PgStore<E> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> PgStore<E> {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            _entity: PhantomData,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn quoted(ident: &str) -> String {
    format!("\"{}\"", ident)
}

/// `"id", <columns>, "created_at", "updated_at"`
fn select_list<E: Entity>() -> String {
    std::iter::once("id")
        .chain(E::COLUMNS.iter().copied())
        .chain(["created_at", "updated_at"])
        .map(quoted)
        .collect::<Vec<_>>()
        .join(", ")
}

fn push_value(qb: &mut QueryBuilder<'_, Postgres>, value: &FieldValue) {
    match value {
        FieldValue::Int(v) => qb.push_bind(*v),
        FieldValue::Text(v) => qb.push_bind(v.clone()),
        FieldValue::Timestamp(v) => qb.push_bind(*v),
    };
}

fn push_where(qb: &mut QueryBuilder<'_, Postgres>, filters: &[Filter]) {
    for (i, filter) in filters.iter().enumerate() {
        qb.push(if i == 0 { " WHERE " } else { " AND " });
        match filter {
            Filter::CreatedBetween(range) => {
                qb.push("\"created_at\" BETWEEN ");
                qb.push_bind(range.start());
                qb.push(" AND ");
                qb.push_bind(range.end());
            }
            Filter::Contains { column, needle } => {
                qb.push("strpos(");
                qb.push(quoted(column));
                qb.push(", ");
                qb.push_bind(needle.clone());
                qb.push(") > 0");
            }
            Filter::Equals { column, value } => {
                qb.push(quoted(column));
                qb.push(" = ");
                qb.push_bind(*value);
            }
        }
    }
}

fn map_db_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
            let constraint = db_err.constraint().unwrap_or("unique").to_string();
            warn!(constraint = %constraint, "Unique constraint violated");
            return StoreError::UniqueViolation { constraint };
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl<E: Entity> Repository<E> for PgStore<E> {
    async fn count(&self, query: &ListQuery<E>) -> Result<i64, StoreError> {
        let mut qb = QueryBuilder::new(format!("SELECT COUNT(*) FROM {}", quoted(E::TABLE)));
        push_where(&mut qb, query.filters());

        let total = qb
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;
        Ok(total)
    }

    async fn fetch(&self, query: &ListQuery<E>) -> Result<Vec<E>, StoreError> {
        let mut qb = QueryBuilder::new(format!(
            "SELECT {} FROM {}",
            select_list::<E>(),
            quoted(E::TABLE)
        ));
        push_where(&mut qb, query.filters());

        let sort = query.sort();
        qb.push(format!(
            " ORDER BY {} {}",
            quoted(sort.column()),
            sort.direction().as_sql()
        ));
        if sort.column() != "id" {
            qb.push(", \"id\" ASC");
        }

        let page = query.page();
        qb.push(" LIMIT ");
        qb.push_bind(page.limit());
        qb.push(" OFFSET ");
        qb.push_bind(page.offset());

        debug!(table = E::TABLE, sql = qb.sql(), "Fetching page");

        qb.build_query_as::<E>()
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn find(&self, id: i32) -> Result<Option<E>, StoreError> {
        let mut qb = QueryBuilder::new(format!(
            "SELECT {} FROM {} WHERE \"id\" = ",
            select_list::<E>(),
            quoted(E::TABLE)
        ));
        qb.push_bind(id);

        qb.build_query_as::<E>()
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn find_many(&self, ids: &[i32]) -> Result<Vec<E>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::new(format!(
            "SELECT {} FROM {} WHERE \"id\" = ANY(",
            select_list::<E>(),
            quoted(E::TABLE)
        ));
        qb.push_bind(ids.to_vec());
        qb.push(")");

        qb.build_query_as::<E>()
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn find_by(
        &self,
        column: &'static str,
        value: &FieldValue,
    ) -> Result<Option<E>, StoreError> {
        let mut qb = QueryBuilder::new(format!(
            "SELECT {} FROM {} WHERE {} = ",
            select_list::<E>(),
            quoted(E::TABLE),
            quoted(column)
        ));
        push_value(&mut qb, value);
        qb.push(" LIMIT 1");

        qb.build_query_as::<E>()
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn insert(&self, data: &E::Create) -> Result<E, StoreError> {
        let values = E::create_values(data);

        let mut qb = QueryBuilder::new(format!("INSERT INTO {} (", quoted(E::TABLE)));
        let columns: Vec<String> = values.iter().map(|(column, _)| quoted(column)).collect();
        qb.push(columns.join(", "));
        qb.push(") VALUES (");
        for (i, (_, value)) in values.iter().enumerate() {
            if i > 0 {
                qb.push(", ");
            }
            push_value(&mut qb, value);
        }
        qb.push(format!(") RETURNING {}", select_list::<E>()));

        qb.build_query_as::<E>()
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn update(&self, id: i32, data: &E::Update) -> Result<Option<E>, StoreError> {
        let mut qb = QueryBuilder::new(format!(
            "UPDATE {} SET \"updated_at\" = NOW()",
            quoted(E::TABLE)
        ));
        for (column, value) in E::update_values(data) {
            qb.push(", ");
            qb.push(quoted(column));
            qb.push(" = ");
            push_value(&mut qb, &value);
        }
        qb.push(" WHERE \"id\" = ");
        qb.push_bind(id);
        qb.push(format!(" RETURNING {}", select_list::<E>()));

        qb.build_query_as::<E>()
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn delete(&self, id: i32) -> Result<Option<E>, StoreError> {
        let mut qb = QueryBuilder::new(format!(
            "DELETE FROM {} WHERE \"id\" = ",
            quoted(E::TABLE)
        ));
        qb.push_bind(id);
        qb.push(format!(" RETURNING {}", select_list::<E>()));

        qb.build_query_as::<E>()
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_error)
    }

    async fn delete_many(&self, ids: &[i32]) -> Result<Vec<E>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut qb = QueryBuilder::new(format!(
            "DELETE FROM {} WHERE \"id\" = ANY(",
            quoted(E::TABLE)
        ));
        qb.push_bind(ids.to_vec());
        qb.push(format!(") RETURNING {}", select_list::<E>()));

        qb.build_query_as::<E>()
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)
    }
}
