//! Pool construction for the accounts schema.
//!
//! Every pooled connection gets its `search_path` pinned to the configured
//! schema, so the embedded migrations create their tables and the
//! `account_type` enum in the same schema the rendered queries qualify.

use std::time::Duration;

use accounts_query::escape_identifier;
use sqlx_core::executor::Executor;
use sqlx_core::pool::PoolOptions;
use sqlx_postgres::{PgPool, Postgres};
use tracing::{info, instrument};

use crate::config::{PostgresConfig, mask_password};
use crate::error::{PostgresError, Result};

/// Statement run on every new connection.
pub fn search_path_statement(schema: &str) -> Result<String> {
    let quoted = escape_identifier(schema).map_err(|e| PostgresError::config(e.to_string()))?;
    Ok(format!("SET search_path TO {quoted}, public"))
}

/// Pool options for `config`, without connecting.
pub fn pool_options(config: &PostgresConfig) -> Result<PoolOptions<Postgres>> {
    let search_path = search_path_statement(&config.schema)?;

    let options = PoolOptions::<Postgres>::new()
        .max_connections(config.pool_size.max(1))
        .acquire_timeout(Duration::from_millis(config.connect_timeout_ms))
        .idle_timeout(config.idle_timeout_ms.map(Duration::from_millis))
        .after_connect(move |conn, _meta| {
            let statement = search_path.clone();
            Box::pin(async move {
                conn.execute(statement.as_str()).await?;
                Ok(())
            })
        });

    Ok(options)
}

/// Opens the pool. `connect` establishes one connection up front, so a bad
/// URL or an unknown schema fails here rather than on the first request.
#[instrument(skip(config), fields(url = %mask_password(&config.url), schema = %config.schema))]
pub async fn connect(config: &PostgresConfig) -> Result<PgPool> {
    let pool = pool_options(config)?.connect(&config.url).await?;
    info!(
        pool_size = config.pool_size,
        echo_sql = config.echo_sql,
        "PostgreSQL pool ready"
    );
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_path_quotes_schema() {
        assert_eq!(
            search_path_statement("banking").unwrap(),
            r#"SET search_path TO "banking", public"#
        );
    }

    #[test]
    fn test_search_path_rejects_bad_schema() {
        let err = search_path_statement("banking; DROP TABLE accounts").unwrap_err();
        assert!(matches!(err, PostgresError::Config { .. }));
    }

    #[test]
    fn test_pool_options_follow_config() {
        let config = PostgresConfig::new("postgres://localhost/accounts")
            .with_pool_size(7)
            .with_connect_timeout_ms(1500)
            .with_idle_timeout_ms(None);
        let options = pool_options(&config).unwrap();

        assert_eq!(options.get_max_connections(), 7);
        assert_eq!(options.get_acquire_timeout(), Duration::from_millis(1500));
        assert_eq!(options.get_idle_timeout(), None);
    }

    #[test]
    fn test_pool_options_reject_bad_schema() {
        let config = PostgresConfig::default().with_schema("");
        assert!(pool_options(&config).is_err());
    }
}
