//! Query building for account listings.
//!
//! Raw `filter` and `sort` query parameters are parsed into typed criteria,
//! validated eagerly, and compiled into a [`Condition`] tree plus ordering
//! clauses on a [`QueryBuilder`]. Storage backends either render that
//! builder to parameterized SQL or evaluate the tree directly.
//!
//! ```
//! use accounts_query::{AccountFilterProperty, AccountSortProperty, Filters, QueryBuilder, SortCriteria};
//!
//! let filters = Filters::<AccountFilterProperty>::parse(Some(
//!     r#"{"property": "currency", "operator": "=", "value": "978"}"#,
//! ))
//! .unwrap();
//! let sort = SortCriteria::<AccountSortProperty>::parse(None).unwrap();
//!
//! let query = sort.apply(filters.apply(QueryBuilder::new())).build().unwrap();
//! assert!(query.sql.contains("ORDER BY a.modified DESC"));
//! assert_eq!(query.params.len(), 1);
//! ```

pub mod error;
pub mod filter;
pub mod operator;
pub mod pagination;
pub mod params;
pub mod property;
pub mod sort;
pub mod sql_builder;

pub use error::{ParamError, QueryError};
pub use filter::{
    BooleanGroup, BooleanOperator, CriteriaNode, FilterExpression, Filters, MAX_FILTER_NODES,
};
pub use operator::{Arity, FilterOperator, Operand};
pub use pagination::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, Page, PageOverflow, PageParams};
pub use property::{AccountFilterProperty, AccountSortProperty, FieldSet, FilterProperty, SortProperty};
pub use sort::{SortCriteria, SortDirection, SortExpression};
pub use sql_builder::{
    BuiltQuery, Condition, Field, Operator, Pagination, QueryBuilder, SortOrder, SortSpec,
    MAX_CONDITION_NODES, SqlBuilderError, SqlValue, escape_identifier,
};
