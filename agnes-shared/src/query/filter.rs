//! List filters
//!
//! All filters are optional and combine conjunctively. An absent or empty
//! parameter means "no constraint".

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use super::QueryError;
use crate::entity::{Entity, FilterKind, FilterSpec};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Inclusive `created_at` window from `start 00:00:00` to `end 23:59:59` UTC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        let end_of_day = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
        Self {
            start: start.and_time(NaiveTime::MIN).and_utc(),
            end: end.and_time(end_of_day).and_utc(),
        }
    }

    /// Builds a range only when both bounds are supplied.
    ///
    /// A lone `start_date` or `end_date` is ignored rather than treated as a
    /// half-open range.
    pub fn from_params(
        start: Option<&str>,
        end: Option<&str>,
    ) -> Result<Option<Self>, QueryError> {
        let start = start.filter(|s| !s.is_empty());
        let end = end.filter(|s| !s.is_empty());

        match (start, end) {
            (Some(start), Some(end)) => Ok(Some(Self::new(
                parse_date("start_date", start)?,
                parse_date("end_date", end)?,
            ))),
            _ => Ok(None),
        }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }
}

fn parse_date(param: &str, value: &str) -> Result<NaiveDate, QueryError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| QueryError::InvalidFilter {
        param: param.to_string(),
        value: value.to_string(),
    })
}

/// One predicate over records of an entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    CreatedBetween(DateRange),
    Contains { column: &'static str, needle: String },
    Equals { column: &'static str, value: i32 },
}

impl Filter {
    /// Builds the filter declared by `spec` from a raw parameter value.
    /// Empty values produce no filter.
    pub fn from_spec(spec: &FilterSpec, raw: &str) -> Result<Option<Self>, QueryError> {
        if raw.is_empty() {
            return Ok(None);
        }

        let filter = match spec.kind {
            FilterKind::Contains => Filter::Contains {
                column: spec.column,
                needle: raw.to_string(),
            },
            FilterKind::Equals => Filter::Equals {
                column: spec.column,
                value: raw.trim().parse().map_err(|_| QueryError::InvalidFilter {
                    param: spec.param.to_string(),
                    value: raw.to_string(),
                })?,
            },
        };
        Ok(Some(filter))
    }

    pub fn matches<E: Entity>(&self, record: &E) -> bool {
        match self {
            Filter::CreatedBetween(range) => range.contains(record.created_at()),
            Filter::Contains { column, needle } => record
                .field(column)
                .as_ref()
                .and_then(|value| value.as_text())
                .is_some_and(|text| text.contains(needle.as_str())),
            Filter::Equals { column, value } => record
                .field(column)
                .and_then(|field| field.as_int())
                .is_some_and(|field| field == *value),
        }
    }
}
