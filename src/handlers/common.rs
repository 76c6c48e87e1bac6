use crate::{ApiResponse, PaginatedResponse};
use axum::{http::StatusCode, Json};

/// Standard created response
pub fn created_response<T>(data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, Json(ApiResponse::success(data)))
}

/// 1-based page number from an optional query value.
pub fn page_number(page: Option<u64>) -> u64 {
    page.unwrap_or(1).max(1)
}

/// Wraps one page of results in the standard envelope.
pub fn paginated<T>(items: Vec<T>, total: u64, page: u64, limit: u64) -> PaginatedResponse<T> {
    let total_pages = if total == 0 || limit == 0 {
        0
    } else {
        (total + limit - 1) / limit
    };
    PaginatedResponse {
        items,
        total,
        page,
        limit,
        total_pages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(paginated(vec![1, 2], 41, 1, 20).total_pages, 3);
        assert_eq!(paginated::<u8>(vec![], 0, 1, 20).total_pages, 0);
        assert_eq!(paginated(vec![1], 20, 1, 20).total_pages, 1);
    }

    #[test]
    fn page_defaults_to_first() {
        assert_eq!(page_number(None), 1);
        assert_eq!(page_number(Some(0)), 1);
        assert_eq!(page_number(Some(4)), 4);
    }
}
