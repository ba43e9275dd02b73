// SPDX-License-Identifier: Apache-2.0

use crate::errors::ApiError;
use std::collections::HashMap;

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;
pub const MIN_SEARCH_QUERY_LEN: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListPostsParams {
    /// `None` means no trash filter was requested (admin default: all).
    pub deleted: Option<bool>,
    pub category: Option<String>,
    pub limit: usize,
    pub offset: usize,
}

pub fn parse_list_posts_params(
    query: &HashMap<String, String>,
) -> Result<ListPostsParams, ApiError> {
    let deleted = match query.get("deleted").map(String::as_str) {
        None => None,
        Some("true") => Some(true),
        Some("false") => Some(false),
        Some(_) => {
            return Err(ApiError::invalid_param(
                "deleted",
                "must be 'true' or 'false'",
            ))
        }
    };
    let category = query.get("category").cloned().filter(|c| !c.is_empty());
    let limit = parse_bounded(query, "limit", DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE)?;
    let offset = match query.get("offset") {
        None => 0,
        Some(raw) => raw
            .parse::<usize>()
            .map_err(|_| ApiError::invalid_param("offset", "must be a non-negative integer"))?,
    };
    Ok(ListPostsParams {
        deleted,
        category,
        limit,
        offset,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchParams {
    pub query: String,
    pub page: usize,
    pub page_size: usize,
}

pub fn parse_search_params(query: &HashMap<String, String>) -> Result<SearchParams, ApiError> {
    let q = query.get("q").map(|v| v.trim().to_string()).unwrap_or_default();
    if q.len() < MIN_SEARCH_QUERY_LEN {
        return Err(ApiError::invalid_param(
            "q",
            "query must be at least 2 characters",
        ));
    }
    let page = match query.get("page") {
        None => 1,
        Some(raw) => raw
            .parse::<usize>()
            .ok()
            .filter(|p| *p >= 1)
            .ok_or_else(|| ApiError::invalid_param("page", "must be a positive integer"))?,
    };
    let page_size = parse_bounded(query, "page_size", 10, 50)?;
    Ok(SearchParams {
        query: q,
        page,
        page_size,
    })
}

fn parse_bounded(
    query: &HashMap<String, String>,
    name: &str,
    default: usize,
    max: usize,
) -> Result<usize, ApiError> {
    match query.get(name) {
        None => Ok(default),
        Some(raw) => raw
            .parse::<usize>()
            .ok()
            .filter(|v| *v >= 1)
            .map(|v| v.min(max))
            .ok_or_else(|| ApiError::invalid_param(name, "must be a positive integer")),
    }
}
