//! [`AccountStorage`] over PostgreSQL.

use accounts_core::{Account, BankAccountInfo, CoreError, Timestamp};
use accounts_query::{BuiltQuery, Pagination, QueryBuilder, SqlValue};
use accounts_storage::{AccountStorage, PageSlice, StorageError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx_core::error::Error as SqlxError;
use sqlx_core::query_as::{QueryAs, query_as};
use sqlx_core::query_scalar::{QueryScalar, query_scalar};
use sqlx_postgres::{PgArguments, PgPool, Postgres};
use time::OffsetDateTime;
use tracing::{debug, info, instrument, warn};

use crate::config::PostgresConfig;
use crate::error::{PostgresError, Result};
use crate::{migrations, pool};

/// Column tuple produced by [`QueryBuilder::build`].
type AccountRow = (
    uuid::Uuid,
    String,
    String,
    String,
    uuid::Uuid,
    String,
    Option<Value>,
    bool,
    DateTime<Utc>,
    DateTime<Utc>,
);

/// Converts a chrono `DateTime<Utc>` to a time `OffsetDateTime`.
fn chrono_to_time(dt: DateTime<Utc>) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp(dt.timestamp()).unwrap_or(OffsetDateTime::UNIX_EPOCH)
        + time::Duration::nanoseconds(i64::from(dt.timestamp_subsec_nanos()))
}

fn time_to_chrono(ts: &Timestamp) -> DateTime<Utc> {
    let dt = ts.inner();
    DateTime::from_timestamp(dt.unix_timestamp(), dt.nanosecond()).unwrap_or(DateTime::UNIX_EPOCH)
}

/// Helper trait to bind builder parameters in `$N` order.
trait BindAllParams<'q> {
    fn bind_all_params(self, params: &'q [SqlValue]) -> Self;
}

impl<'q> BindAllParams<'q> for QueryAs<'q, Postgres, AccountRow, PgArguments> {
    fn bind_all_params(mut self, params: &'q [SqlValue]) -> Self {
        for param in params {
            self = match param {
                SqlValue::Text(s) => self.bind(s.as_str()),
                SqlValue::Uuid(id) => self.bind(*id),
                SqlValue::Boolean(b) => self.bind(*b),
                SqlValue::Timestamp(ts) => self.bind(time_to_chrono(ts)),
                SqlValue::Null => self.bind(None::<String>),
            };
        }
        self
    }
}

impl<'q> BindAllParams<'q> for QueryScalar<'q, Postgres, i64, PgArguments> {
    fn bind_all_params(mut self, params: &'q [SqlValue]) -> Self {
        for param in params {
            self = match param {
                SqlValue::Text(s) => self.bind(s.as_str()),
                SqlValue::Uuid(id) => self.bind(*id),
                SqlValue::Boolean(b) => self.bind(*b),
                SqlValue::Timestamp(ts) => self.bind(time_to_chrono(ts)),
                SqlValue::Null => self.bind(None::<String>),
            };
        }
        self
    }
}

fn row_to_account(row: AccountRow) -> Result<Account> {
    let (
        id,
        account_type,
        currency,
        account,
        company_id,
        company_name,
        additional_info,
        archived,
        created,
        modified,
    ) = row;
    let invalid = |e: CoreError| PostgresError::invalid_row(format!("account {id}: {e}"));

    let additional_info = match additional_info {
        None | Some(Value::Null) => None,
        Some(value) => Some(serde_json::from_value::<BankAccountInfo>(value).map_err(|e| {
            PostgresError::invalid_row(format!("account {id}: additional_info: {e}"))
        })?),
    };

    Ok(Account {
        id,
        account_type: account_type.parse().map_err(invalid)?,
        currency: currency.parse().map_err(invalid)?,
        account: account.parse().map_err(invalid)?,
        company_id,
        company_name,
        additional_info,
        archived,
        created: Timestamp(chrono_to_time(created)),
        modified: Timestamp(chrono_to_time(modified)),
    })
}

fn db_error(err: SqlxError) -> StorageError {
    warn!(error = %err, "account query failed");
    PostgresError::from(err).into()
}

/// PostgreSQL-backed account storage.
///
/// Every statement is rendered by [`QueryBuilder`] against the configured
/// schema; values are always bound, never interpolated.
#[derive(Debug, Clone)]
pub struct PostgresAccountStorage {
    pool: PgPool,
    schema: String,
    echo_sql: bool,
}

impl PostgresAccountStorage {
    /// Connects, optionally migrates, and returns a ready storage.
    pub async fn new(config: &PostgresConfig) -> Result<Self> {
        let pool = pool::connect(config).await?;
        if config.run_migrations {
            migrations::run(&pool).await?;
        }

        Ok(Self {
            pool,
            schema: config.schema.clone(),
            echo_sql: config.echo_sql,
        })
    }

    /// Wraps an existing pool, reading from the `public` schema.
    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            pool,
            schema: "public".into(),
            echo_sql: false,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn scoped(&self, query: &QueryBuilder) -> QueryBuilder {
        query.clone().with_schema(self.schema.clone())
    }

    fn trace(&self, built: &BuiltQuery) {
        if self.echo_sql {
            info!(statement = %built, "executing statement");
        } else {
            debug!(sql = %built.sql, params = built.params.len(), "executing statement");
        }
    }
}

#[async_trait]
impl AccountStorage for PostgresAccountStorage {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    #[instrument(skip_all)]
    async fn count(&self, query: &QueryBuilder) -> std::result::Result<u64, StorageError> {
        let built = self.scoped(query).build_count()?;
        self.trace(&built);
        let total: i64 = query_scalar::<Postgres, i64>(&built.sql)
            .bind_all_params(&built.params)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(u64::try_from(total).unwrap_or_default())
    }

    #[instrument(skip_all)]
    async fn fetch(&self, query: &QueryBuilder) -> std::result::Result<Vec<Account>, StorageError> {
        let built = self.scoped(query).build()?;
        self.trace(&built);
        let rows: Vec<AccountRow> = query_as::<Postgres, AccountRow>(&built.sql)
            .bind_all_params(&built.params)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;
        rows.into_iter()
            .map(|row| row_to_account(row).map_err(StorageError::from))
            .collect()
    }

    /// Count and window run in one read-only repeatable-read transaction so
    /// both see the same snapshot.
    #[instrument(skip_all, fields(limit = ?pagination.limit, offset = pagination.offset))]
    async fn fetch_page(
        &self,
        query: &QueryBuilder,
        pagination: Pagination,
    ) -> std::result::Result<PageSlice, StorageError> {
        let scoped = self.scoped(query);
        let count = scoped.build_count()?;
        let page = scoped.with_pagination(pagination).build()?;
        self.trace(&count);
        self.trace(&page);

        let mut tx = self.pool.begin().await.map_err(db_error)?;
        sqlx_core::query::query::<Postgres>("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        let total: i64 = query_scalar::<Postgres, i64>(&count.sql)
            .bind_all_params(&count.params)
            .fetch_one(&mut *tx)
            .await
            .map_err(db_error)?;
        let rows: Vec<AccountRow> = query_as::<Postgres, AccountRow>(&page.sql)
            .bind_all_params(&page.params)
            .fetch_all(&mut *tx)
            .await
            .map_err(db_error)?;
        tx.commit().await.map_err(db_error)?;

        let items = rows
            .into_iter()
            .map(|row| row_to_account(row).map_err(StorageError::from))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(PageSlice {
            total: u64::try_from(total).unwrap_or_default(),
            items,
        })
    }
}
