//! # accounts-storage
//!
//! Query execution boundary for the accounts service.
//!
//! Backends implement [`AccountStorage`]: they receive a
//! [`QueryBuilder`](accounts_query::QueryBuilder) carrying the compiled
//! predicate and ordering and return matching [`Account`](accounts_core::Account)
//! rows. [`paginate`] turns that into a [`Page`](accounts_query::Page).
//!
//! ```ignore
//! use accounts_storage::{AccountStorage, active_accounts, paginate};
//!
//! async fn first_page(storage: &dyn AccountStorage) -> Result<Page<Account>, StorageError> {
//!     paginate(storage, &active_accounts(), PageParams::default(), PageOverflow::Empty, |a| a).await
//! }
//! ```

mod error;
mod paginate;
mod traits;

pub use error::{ErrorCategory, StorageError};
pub use paginate::paginate;
pub use traits::{AccountStorage, PageSlice, active_accounts};

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Type alias for a shared storage trait object.
pub type DynAccountStorage = std::sync::Arc<dyn AccountStorage>;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{ErrorCategory, StorageError};
    pub use crate::paginate::paginate;
    pub use crate::traits::{AccountStorage, PageSlice, active_accounts};
    pub use crate::{DynAccountStorage, StorageResult};
}
