//! Sort keys

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use super::QueryError;
use crate::entity::Entity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

impl FromStr for SortDirection {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(QueryError::InvalidSortType(other.to_string())),
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "asc"),
            SortDirection::Desc => write!(f, "desc"),
        }
    }
}

/// A sortable column of some entity plus a direction.
///
/// The column always comes from the entity's `SORTABLE` list, so it is safe
/// to interpolate into SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    column: &'static str,
    direction: SortDirection,
}

impl SortKey {
    /// Resolves `sort_by` against `E::SORTABLE`, then parses `sort_type`.
    pub fn resolve<E: Entity>(sort_by: &str, sort_type: &str) -> Result<Self, QueryError> {
        let column = E::SORTABLE
            .iter()
            .copied()
            .find(|column| *column == sort_by)
            .ok_or_else(|| QueryError::InvalidSortField(sort_by.to_string()))?;
        let direction = sort_type.parse()?;

        Ok(Self { column, direction })
    }

    pub fn column(&self) -> &'static str {
        self.column
    }

    pub fn direction(&self) -> SortDirection {
        self.direction
    }

    /// Orders two records by this key, breaking ties by ascending id.
    pub fn compare<E: Entity>(&self, a: &E, b: &E) -> Ordering {
        let primary = a
            .field(self.column)
            .partial_cmp(&b.field(self.column))
            .unwrap_or(Ordering::Equal);
        let primary = match self.direction {
            SortDirection::Asc => primary,
            SortDirection::Desc => primary.reverse(),
        };
        primary.then_with(|| a.id().cmp(&b.id()))
    }
}
