//! The query execution boundary.

use accounts_core::Account;
use accounts_query::{Condition, Field, Operator, Pagination, QueryBuilder, SortSpec, SqlValue};
use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StorageError;

/// Rows of one page together with the unpaginated match count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageSlice {
    pub total: u64,
    pub items: Vec<Account>,
}

/// Base query for every account read: archived accounts are never visible.
pub fn active_accounts() -> QueryBuilder {
    QueryBuilder::new().where_condition(Condition::simple(
        Field::Archived,
        Operator::Eq,
        SqlValue::Boolean(false),
    ))
}

/// Storage backend for account reads.
///
/// Implementations evaluate the builder's predicate and ordering; they must
/// be thread-safe (`Send + Sync`).
#[async_trait]
pub trait AccountStorage: Send + Sync {
    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;

    /// Number of rows matching the query. Ordering and pagination are ignored.
    async fn count(&self, query: &QueryBuilder) -> Result<u64, StorageError>;

    /// Rows matching the query, ordered and windowed as the builder says.
    async fn fetch(&self, query: &QueryBuilder) -> Result<Vec<Account>, StorageError>;

    /// Total count plus one window of rows, both read from the same snapshot.
    async fn fetch_page(
        &self,
        query: &QueryBuilder,
        pagination: Pagination,
    ) -> Result<PageSlice, StorageError>;

    /// Looks up a non-archived account by id.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StorageError> {
        let query = active_accounts()
            .where_condition(Condition::simple(Field::Id, Operator::Eq, SqlValue::Uuid(id)))
            .paginate(1, 0);
        Ok(self.fetch(&query).await?.into_iter().next())
    }

    /// Looks up a non-archived account by its bank account number.
    async fn find_by_number(&self, number: &str) -> Result<Option<Account>, StorageError> {
        let query = active_accounts()
            .where_condition(Condition::simple(
                Field::Account,
                Operator::Eq,
                SqlValue::Text(number.to_string()),
            ))
            .paginate(1, 0);
        Ok(self.fetch(&query).await?.into_iter().next())
    }

    /// All non-archived accounts of a company, most recently modified first.
    async fn list_by_company(&self, company_id: Uuid) -> Result<Vec<Account>, StorageError> {
        let query = active_accounts()
            .where_condition(Condition::simple(
                Field::CompanyId,
                Operator::Eq,
                SqlValue::Text(company_id.hyphenated().to_string()),
            ))
            .sort_by(SortSpec::desc(Field::Modified));
        self.fetch(&query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_accounts_excludes_archived() {
        let query = active_accounts().build().unwrap();
        assert!(query.sql.contains("WHERE (a.archived = $1)"));
        assert_eq!(query.params, vec![SqlValue::Boolean(false)]);
    }
}
