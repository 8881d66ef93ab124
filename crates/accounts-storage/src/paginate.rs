use accounts_core::Account;
use accounts_query::{Page, PageOverflow, PageParams, QueryBuilder};

use crate::error::StorageError;
use crate::traits::AccountStorage;

/// Execute `query` for one page and map each row with `mapper`.
///
/// `total` counts every row the query matches. A page past the end yields
/// no items, or [`StorageError::PageNotFound`] under [`PageOverflow::Reject`].
#[tracing::instrument(
    level = "debug",
    skip_all,
    fields(backend = storage.backend_name(), page = params.page(), size = params.size())
)]
pub async fn paginate<T, F>(
    storage: &dyn AccountStorage,
    query: &QueryBuilder,
    params: PageParams,
    overflow: PageOverflow,
    mapper: F,
) -> Result<Page<T>, StorageError>
where
    F: FnMut(Account) -> T,
{
    let slice = storage.fetch_page(query, params.to_pagination()).await?;

    if overflow == PageOverflow::Reject && params.is_past_end(slice.total) {
        return Err(StorageError::page_not_found(
            params.page(),
            params.pages_for(slice.total),
        ));
    }

    tracing::debug!(total = slice.total, returned = slice.items.len(), "page fetched");
    Ok(Page::new(slice.items, slice.total, params).map(mapper))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::PageSlice;
    use accounts_core::{AccountType, Timestamp};
    use accounts_query::{MAX_PAGE_SIZE, Pagination};
    use async_trait::async_trait;
    use time::OffsetDateTime;
    use uuid::Uuid;

    /// Ignores predicates and ordering; only windows a fixed row set.
    struct FixedRows(Vec<Account>);

    fn account(n: usize) -> Account {
        Account {
            id: Uuid::new_v4(),
            account_type: AccountType::Type2,
            currency: "978".parse().unwrap(),
            account: format!("ACCOUNT{n:04}").parse().unwrap(),
            company_id: Uuid::new_v4(),
            company_name: format!("Company {n}"),
            additional_info: None,
            archived: false,
            created: Timestamp(OffsetDateTime::UNIX_EPOCH),
            modified: Timestamp(OffsetDateTime::UNIX_EPOCH),
        }
    }

    #[async_trait]
    impl AccountStorage for FixedRows {
        fn backend_name(&self) -> &'static str {
            "fixed"
        }

        async fn count(&self, _query: &QueryBuilder) -> Result<u64, StorageError> {
            Ok(self.0.len() as u64)
        }

        async fn fetch(&self, query: &QueryBuilder) -> Result<Vec<Account>, StorageError> {
            let p = query.pagination();
            let rows = self.0.iter().skip(p.offset as usize).cloned();
            Ok(match p.limit {
                Some(limit) => rows.take(limit as usize).collect(),
                None => rows.collect(),
            })
        }

        async fn fetch_page(
            &self,
            query: &QueryBuilder,
            pagination: Pagination,
        ) -> Result<PageSlice, StorageError> {
            Ok(PageSlice {
                total: self.count(query).await?,
                items: self.fetch(&query.with_pagination(pagination)).await?,
            })
        }
    }

    fn storage(rows: usize) -> FixedRows {
        FixedRows((0..rows).map(account).collect())
    }

    #[tokio::test]
    async fn test_second_page_of_fifteen() {
        let storage = storage(15);
        let params = PageParams::new(2, 10, MAX_PAGE_SIZE).unwrap();

        let page = paginate(&storage, &QueryBuilder::new(), params, PageOverflow::Empty, |a| a.company_name)
            .await
            .unwrap();

        assert_eq!(page.total, 15);
        assert_eq!(page.pages, 2);
        assert_eq!(page.items.len(), 5);
        assert_eq!(page.items[0], "Company 10");
    }

    #[tokio::test]
    async fn test_past_end_is_empty_by_default() {
        let storage = storage(3);
        let params = PageParams::new(4, 10, MAX_PAGE_SIZE).unwrap();

        let page = paginate(&storage, &QueryBuilder::new(), params, PageOverflow::Empty, |a| a)
            .await
            .unwrap();

        assert!(page.items.is_empty());
        assert_eq!(page.total, 3);
    }

    #[tokio::test]
    async fn test_past_end_rejected_under_reject_policy() {
        let storage = storage(3);
        let params = PageParams::new(4, 10, MAX_PAGE_SIZE).unwrap();

        let err = paginate(&storage, &QueryBuilder::new(), params, PageOverflow::Reject, |a| a)
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::PageNotFound { page: 4, pages: 1 }));
    }

    #[tokio::test]
    async fn test_first_page_of_empty_result_is_valid() {
        let storage = storage(0);
        let page = paginate(
            &storage,
            &QueryBuilder::new(),
            PageParams::default(),
            PageOverflow::Reject,
            |a| a,
        )
        .await
        .unwrap();

        assert_eq!(page.total, 0);
        assert_eq!(page.pages, 0);
        assert!(page.items.is_empty());
    }

    #[tokio::test]
    async fn test_default_lookups_use_fetch() {
        let storage = storage(2);
        // The fixed backend ignores predicates, so the first row comes back.
        let found = storage.find_by_number("ACCOUNT0000").await.unwrap();
        assert!(found.is_some());
    }
}
