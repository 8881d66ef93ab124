//! Listing query extraction.
//!
//! `filter`, `sort`, `page` and `size` are all validated before any storage
//! call; every failing parameter is reported in a single 422.

use accounts_api::ApiError;
use accounts_query::{
    AccountFilterProperty, AccountSortProperty, Filters, PageParams, ParamError, QueryBuilder,
    QueryError, SortCriteria,
};
use accounts_storage::active_accounts;
use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use serde::Deserialize;

use crate::server::AppState;

pub type AccountFilters = Filters<AccountFilterProperty>;
pub type AccountSort = SortCriteria<AccountSortProperty>;

#[derive(Debug, Default, Deserialize)]
struct RawListQuery {
    filter: Option<String>,
    sort: Option<String>,
    page: Option<String>,
    size: Option<String>,
}

/// Validated listing parameters.
#[derive(Debug, Clone)]
pub struct ListQuery {
    pub filters: AccountFilters,
    pub sort: AccountSort,
    pub page: PageParams,
}

impl ListQuery {
    /// Non-archived accounts restricted by the filters, in sort order.
    pub fn to_query(&self) -> QueryBuilder {
        self.sort.apply(self.filters.apply(active_accounts()))
    }
}

fn parse_number(param: &'static str, raw: Option<&str>, default: u32) -> Result<u32, ParamError> {
    match raw {
        None => Ok(default),
        Some(raw) => raw.trim().parse::<u32>().map_err(|_| {
            QueryError::malformed(format!("{param} must be a positive integer, got '{raw}'"))
                .for_param(param)
        }),
    }
}

impl FromRequestParts<AppState> for ListQuery {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Query(raw) = Query::<RawListQuery>::try_from_uri(&parts.uri).map_err(|e| {
            ApiError::invalid_input(["query", "params"], e.body_text(), "value_error.malformed")
        })?;

        let mut errors: Vec<ParamError> = Vec::new();

        let filters = AccountFilters::parse(raw.filter.as_deref())
            .map_err(|e| errors.push(e))
            .ok();
        let sort = AccountSort::parse(raw.sort.as_deref())
            .map_err(|e| errors.push(e))
            .ok();
        let page = parse_number("page", raw.page.as_deref(), 1).map_err(|e| errors.push(e));
        let size = parse_number("size", raw.size.as_deref(), state.pagination.default_size)
            .map_err(|e| errors.push(e));
        let page_params = match (page, size) {
            (Ok(page), Ok(size)) => PageParams::new(page, size, state.pagination.max_size)
                .map_err(|e| errors.push(e))
                .ok(),
            _ => None,
        };

        match (filters, sort, page_params) {
            (Some(filters), Some(sort), Some(page)) if errors.is_empty() => Ok(Self {
                filters,
                sort,
                page,
            }),
            _ => {
                for err in &errors {
                    crate::metrics::record_query_rejection(err.param);
                }
                tracing::debug!(count = errors.len(), "rejected listing query");
                Err(ApiError::from_param_errors(&errors))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use accounts_db_memory::InMemoryAccountStorage;
    use accounts_query::MAX_FILTER_NODES;
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;

    fn state() -> AppState {
        AppState::new(Arc::new(InMemoryAccountStorage::new()), &AppConfig::default())
    }

    async fn extract(uri: &str) -> Result<ListQuery, ApiError> {
        let (mut parts, _) = Request::builder().uri(uri).body(()).unwrap().into_parts();
        ListQuery::from_request_parts(&mut parts, &state()).await
    }

    fn detail_params(err: ApiError) -> Vec<String> {
        match err {
            ApiError::UnprocessableEntity { detail } => {
                detail.into_iter().map(|d| d.loc[1].clone()).collect()
            }
            other => panic!("expected 422, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn defaults_when_absent() {
        let q = extract("/v1/accounts").await.unwrap();
        assert!(q.filters.is_empty());
        assert_eq!(q.page, PageParams::default());
        assert!(q.to_query().build().unwrap().sql.contains("ORDER BY a.modified DESC"));
    }

    #[tokio::test]
    async fn parses_encoded_filter_and_paging() {
        let filter = urlencoding::encode(r#"{"property":"currency","operator":"=","value":"978"}"#);
        let q = extract(&format!("/v1/accounts?filter={filter}&page=2&size=10"))
            .await
            .unwrap();
        assert_eq!(q.filters.criteria().len(), 1);
        assert_eq!(q.page.page(), 2);
        assert_eq!(q.page.size(), 10);
    }

    #[tokio::test]
    async fn aggregates_all_failures() {
        let err = extract("/v1/accounts?filter=nope&sort=nope&page=0&size=5000")
            .await
            .unwrap_err();
        assert_eq!(detail_params(err), vec!["filter", "sort", "page"]);

        let err = extract("/v1/accounts?page=x&size=y").await.unwrap_err();
        assert_eq!(detail_params(err), vec!["page", "size"]);
    }

    #[tokio::test]
    async fn oversized_filter_is_a_filter_error() {
        let leaf = serde_json::json!({"property": "currency", "operator": "=", "value": "978"});
        let filter = serde_json::json!({"or": vec![leaf; MAX_FILTER_NODES]}).to_string();
        let err = extract(&format!("/v1/accounts?filter={}", urlencoding::encode(&filter)))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(detail_params(err), vec!["filter"]);
    }

    #[tokio::test]
    async fn repeated_param_is_a_validation_error() {
        let err = extract("/v1/accounts?filter=a&filter=b").await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        let ApiError::UnprocessableEntity { detail } = err else {
            panic!("expected 422");
        };
        assert_eq!(detail.len(), 1);
        assert_eq!(detail[0].loc, vec!["query", "params"]);
        assert_eq!(detail[0].kind, "value_error.malformed");
        assert!(detail[0].msg.contains("filter"), "{}", detail[0].msg);
    }
}
