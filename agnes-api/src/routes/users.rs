//! User-only routes

use agnes_shared::models::User;
use axum::extract::{rejection::PathRejection, Path, State};

use crate::app::AppState;
use crate::error::{ApiError, ApiResult};
use crate::response::Single;

/// Parses `"1,2,3"`. Every segment must be an integer.
pub fn parse_ids(raw: &str) -> Result<Vec<i32>, ApiError> {
    raw.split(',')
        .map(str::trim)
        .map(|segment| {
            segment
                .parse::<i32>()
                .map_err(|_| ApiError::BadRequest(format!("Invalid user id '{}'", segment)))
        })
        .collect()
}

/// `DELETE /api/users/:ids/bulk`
///
/// Deletes every listed user that exists and returns their snapshots.
/// Unknown ids are skipped.
pub async fn bulk_delete(
    State(state): State<AppState>,
    ids: Result<Path<String>, PathRejection>,
) -> ApiResult<Single<Vec<User>>> {
    let Path(raw) = ids?;
    let ids = parse_ids(&raw)?;

    let removed = state.service::<User>().bulk_delete(&ids).await?;
    Ok(Single::ok(removed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ids() {
        assert_eq!(parse_ids("4").unwrap(), vec![4]);
        assert_eq!(parse_ids("1, 2,3").unwrap(), vec![1, 2, 3]);
        assert!(parse_ids("1,abc").is_err());
        assert!(parse_ids("1,,2").is_err());
    }
}
