use crate::eval::{compare_rows, matches};
use accounts_core::Account;
use accounts_query::{Pagination, QueryBuilder};
use accounts_storage::{AccountStorage, PageSlice, StorageError};
use async_trait::async_trait;
use papaya::HashMap as PapayaHashMap;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// In-memory account storage backed by a papaya lock-free HashMap.
///
/// Rows carry their company name, so no join is needed. A query is answered
/// from a single pass over the map; the count and the page window of
/// [`AccountStorage::fetch_page`] come from that same pass.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAccountStorage {
    data: Arc<PapayaHashMap<Uuid, Account>>,
}

impl InMemoryAccountStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an account.
    pub fn insert(&self, account: Account) {
        self.data.pin().insert(account.id, account);
    }

    pub fn extend(&self, accounts: impl IntoIterator<Item = Account>) {
        let guard = self.data.pin();
        for account in accounts {
            guard.insert(account.id, account);
        }
    }

    pub fn len(&self) -> usize {
        self.data.pin().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Load accounts from a JSON file holding an array of account objects.
    pub fn load_json_file(&self, path: &Path) -> Result<usize, StorageError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            StorageError::internal(format!("failed to read {}: {e}", path.display()))
        })?;
        let accounts: Vec<Account> = serde_json::from_str(&raw).map_err(|e| {
            StorageError::internal(format!("invalid account data in {}: {e}", path.display()))
        })?;
        let loaded = accounts.len();
        self.extend(accounts);
        tracing::info!(path = %path.display(), loaded, "loaded accounts into memory storage");
        Ok(loaded)
    }

    /// Matching rows in query order, before windowing.
    fn select(&self, query: &QueryBuilder) -> Vec<Account> {
        let predicate = query.predicate();
        let mut rows: Vec<Account> = self
            .data
            .pin()
            .iter()
            .filter(|(_, account)| matches(&predicate, account))
            .map(|(_, account)| account.clone())
            .collect();
        // Stable, so ties stay in ascending id order like the SQL tiebreaker.
        rows.sort_by_key(|a| a.id);
        rows.sort_by(|a, b| compare_rows(a, b, query.sort_specs()));
        rows
    }
}

fn window(rows: Vec<Account>, pagination: Pagination) -> Vec<Account> {
    let offset = usize::try_from(pagination.offset).unwrap_or(usize::MAX);
    let rows = rows.into_iter().skip(offset);
    match pagination.limit {
        Some(limit) => rows
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .collect(),
        None => rows.collect(),
    }
}

#[async_trait]
impl AccountStorage for InMemoryAccountStorage {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn count(&self, query: &QueryBuilder) -> Result<u64, StorageError> {
        Ok(self.select(query).len() as u64)
    }

    async fn fetch(&self, query: &QueryBuilder) -> Result<Vec<Account>, StorageError> {
        Ok(window(self.select(query), query.pagination()))
    }

    async fn fetch_page(
        &self,
        query: &QueryBuilder,
        pagination: Pagination,
    ) -> Result<PageSlice, StorageError> {
        let rows = self.select(query);
        let total = rows.len() as u64;
        Ok(PageSlice {
            total,
            items: window(rows, pagination),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use accounts_core::{AccountType, Timestamp};
    use accounts_query::{
        AccountFilterProperty, AccountSortProperty, Field, Filters, MAX_PAGE_SIZE, PageOverflow,
        PageParams, SortCriteria, SortSpec,
    };
    use accounts_storage::{active_accounts, paginate};
    use std::io::Write;
    use time::{Duration, OffsetDateTime};

    fn account(n: i64, account_type: AccountType, currency: &str, company: &str) -> Account {
        let base = OffsetDateTime::UNIX_EPOCH + Duration::days(19_000);
        Account {
            id: Uuid::new_v4(),
            account_type,
            currency: currency.parse().unwrap(),
            account: format!("ACC{n:08}").parse().unwrap(),
            company_id: Uuid::new_v4(),
            company_name: company.to_string(),
            additional_info: None,
            archived: false,
            created: Timestamp(base + Duration::hours(n)),
            modified: Timestamp(base + Duration::days(n)),
        }
    }

    fn seeded() -> InMemoryAccountStorage {
        let storage = InMemoryAccountStorage::new();
        storage.extend([
            account(1, AccountType::Type1, "978", "Acme Corp"),
            account(2, AccountType::Type2, "978", "Globex"),
            account(3, AccountType::Type3, "840", "ACME Labs"),
            account(4, AccountType::Type1, "840", "Initech"),
        ]);
        storage
    }

    fn filtered(raw: &str) -> QueryBuilder {
        Filters::<AccountFilterProperty>::parse(Some(raw))
            .unwrap()
            .apply(active_accounts())
    }

    #[tokio::test]
    async fn test_insert_and_find_by_id() {
        let storage = InMemoryAccountStorage::new();
        let acc = account(1, AccountType::Type1, "978", "Acme");
        storage.insert(acc.clone());

        assert_eq!(storage.len(), 1);
        assert_eq!(storage.find_by_id(acc.id).await.unwrap(), Some(acc.clone()));
        assert_eq!(storage.find_by_id(Uuid::new_v4()).await.unwrap(), None);

        storage.insert(acc.clone());
        assert_eq!(storage.len(), 1);
    }

    #[tokio::test]
    async fn test_archived_accounts_are_hidden() {
        let storage = InMemoryAccountStorage::new();
        let mut acc = account(1, AccountType::Type1, "978", "Acme");
        acc.archived = true;
        storage.insert(acc.clone());

        assert_eq!(storage.find_by_id(acc.id).await.unwrap(), None);
        assert_eq!(storage.find_by_number(acc.account.as_str()).await.unwrap(), None);
        assert!(storage.list_by_company(acc.company_id).await.unwrap().is_empty());
        assert_eq!(storage.count(&active_accounts()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_find_by_number_and_company() {
        let storage = InMemoryAccountStorage::new();
        let a = account(1, AccountType::Type1, "978", "Acme");
        let mut b = account(2, AccountType::Type3, "840", "Acme");
        b.company_id = a.company_id;
        storage.extend([a.clone(), b.clone()]);

        let found = storage.find_by_number("ACC00000002").await.unwrap();
        assert_eq!(found.map(|x| x.id), Some(b.id));

        let listed = storage.list_by_company(a.company_id).await.unwrap();
        assert_eq!(listed.iter().map(|x| x.id).collect::<Vec<_>>(), vec![b.id, a.id]);
    }

    #[tokio::test]
    async fn test_equality_filter_returns_exact_matches() {
        let storage = seeded();
        let rows = storage
            .fetch(&filtered(r#"{"property": "currency", "operator": "=", "value": "978"}"#))
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|a| a.currency.as_str() == "978"));
    }

    #[tokio::test]
    async fn test_in_and_not_in_partition_rows() {
        let storage = seeded();
        let total = storage.count(&active_accounts()).await.unwrap();
        let inside = storage
            .count(&filtered(r#"{"property": "currency", "operator": "in", "value": ["840"]}"#))
            .await
            .unwrap();
        let outside = storage
            .count(&filtered(r#"{"property": "currency", "operator": "not_in", "value": ["840"]}"#))
            .await
            .unwrap();
        assert_eq!(inside + outside, total);
    }

    #[tokio::test]
    async fn test_empty_filter_returns_everything() {
        let storage = seeded();
        let none = Filters::<AccountFilterProperty>::parse(None).unwrap();
        let rows = storage.fetch(&none.apply(active_accounts())).await.unwrap();
        assert_eq!(rows.len(), 4);
    }

    #[tokio::test]
    async fn test_ilike_on_company_name() {
        let storage = seeded();
        let rows = storage
            .fetch(&filtered(r#"{"property": "client", "operator": "ilike", "value": "%acme%"}"#))
            .await
            .unwrap();
        let mut names: Vec<_> = rows.into_iter().map(|a| a.company_name).collect();
        names.sort();
        assert_eq!(names, vec!["ACME Labs", "Acme Corp"]);
    }

    #[tokio::test]
    async fn test_currency_and_type_combination() {
        let storage = seeded();
        let rows = storage
            .fetch(&filtered(
                r#"[{"property": "currency", "operator": "=", "value": "840"},
                    {"property": "type", "operator": "in", "value": ["account-type-1", "account-type-3"]}]"#,
            ))
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|a| a.currency.as_str() == "840"));
    }

    #[tokio::test]
    async fn test_default_sort_is_modified_desc() {
        let storage = seeded();
        let query = SortCriteria::<AccountSortProperty>::parse(None)
            .unwrap()
            .apply(active_accounts());
        let rows = storage.fetch(&query).await.unwrap();
        assert!(rows.windows(2).all(|w| w[0].modified >= w[1].modified));
    }

    #[tokio::test]
    async fn test_ties_break_on_ascending_id() {
        let storage = InMemoryAccountStorage::new();
        storage.extend((0..6).map(|n| account(n, AccountType::Type1, "978", "Acme")));

        let query = active_accounts().sort_by(SortSpec::asc(Field::Type));
        let rows = storage.fetch(&query).await.unwrap();
        assert_eq!(rows.len(), 6);
        assert!(rows.windows(2).all(|w| w[0].id < w[1].id));

        let first = storage.fetch(&query.clone().paginate(3, 0)).await.unwrap();
        let second = storage.fetch(&query.paginate(3, 3)).await.unwrap();
        let paged: Vec<_> = first.into_iter().chain(second).map(|a| a.id).collect();
        assert_eq!(paged, rows.iter().map(|a| a.id).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_paginate_fifteen_rows() {
        let storage = InMemoryAccountStorage::new();
        storage.extend((0..15).map(|n| account(n, AccountType::Type2, "978", "Acme")));

        let query = SortCriteria::<AccountSortProperty>::parse(Some(
            r#"{"property": "created", "direction": "asc"}"#,
        ))
        .unwrap()
        .apply(active_accounts());
        let params = PageParams::new(2, 10, MAX_PAGE_SIZE).unwrap();
        let page = paginate(&storage, &query, params, PageOverflow::Empty, |a| a)
            .await
            .unwrap();

        assert_eq!(page.total, 15);
        assert_eq!(page.items.len(), 5);
        assert_eq!(page.items[0].account.as_str(), "ACC00000010");
    }

    #[tokio::test]
    async fn test_load_json_file() {
        let accounts = vec![account(1, AccountType::Type4, "978", "Acme")];
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(&accounts).unwrap().as_bytes())
            .unwrap();

        let storage = InMemoryAccountStorage::new();
        assert_eq!(storage.load_json_file(file.path()).unwrap(), 1);
        assert_eq!(storage.len(), 1);

        let missing = storage.load_json_file(Path::new("/nonexistent/accounts.json"));
        assert!(missing.is_err());
    }
}
