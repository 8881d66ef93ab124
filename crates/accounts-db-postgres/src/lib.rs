//! # accounts-db-postgres
//!
//! PostgreSQL backend for the accounts service.
//!
//! Queries are rendered by [`accounts_query::QueryBuilder`] and executed
//! through `sqlx`. The schema ships as embedded migrations applied on
//! startup when [`PostgresConfig::run_migrations`] is set.
//!
//! ```ignore
//! use accounts_db_postgres::{PostgresAccountStorage, PostgresConfig};
//!
//! let storage = PostgresAccountStorage::new(&PostgresConfig::new(url)).await?;
//! ```

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
mod storage;

pub use config::{PostgresConfig, mask_password};
pub use error::{PostgresError, Result};
pub use pool::connect;
pub use storage::PostgresAccountStorage;
