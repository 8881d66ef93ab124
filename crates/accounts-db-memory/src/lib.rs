//! In-memory account storage backend.
//!
//! Evaluates the compiled [`Condition`](accounts_query::Condition) tree
//! directly against stored rows, following SQL semantics (three-valued
//! logic, `LIKE` patterns, `NULLS LAST` ordering). Used by tests and for
//! local runs without a database.
//!
//! # Example
//!
//! ```ignore
//! use accounts_db_memory::InMemoryAccountStorage;
//! use accounts_storage::AccountStorage;
//!
//! let storage = InMemoryAccountStorage::new();
//! storage.insert(account);
//! let found = storage.find_by_id(account_id).await?;
//! ```

pub mod eval;
pub mod storage;

pub use eval::{like_match, matches};
pub use storage::InMemoryAccountStorage;
