//! Property registries.
//!
//! A property is the user-facing name a filter or sort expression refers
//! to. Each resolves to a non-empty, ordered [`FieldSet`]; a filter on a
//! property with several fields matches when any of them matches.

use crate::error::QueryError;
use crate::sort::SortDirection;
use crate::sql_builder::{Field, SqlValue};
use accounts_core::{AccountType, CurrencyNumericCode, Timestamp};
use std::fmt::Debug;
use uuid::Uuid;

/// A non-empty list of backing fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSet {
    first: Field,
    rest: &'static [Field],
}

impl FieldSet {
    pub const fn one(field: Field) -> Self {
        Self {
            first: field,
            rest: &[],
        }
    }

    pub const fn many(first: Field, rest: &'static [Field]) -> Self {
        Self { first, rest }
    }

    pub fn first(&self) -> Field {
        self.first
    }

    pub fn len(&self) -> usize {
        1 + self.rest.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = Field> + '_ {
        std::iter::once(self.first).chain(self.rest.iter().copied())
    }
}

fn resolve_by_name<P: Copy>(
    all: &'static [P],
    name_of: impl Fn(P) -> &'static str,
    raw: &str,
) -> Result<P, QueryError> {
    let lowered = raw.to_lowercase();
    all.iter()
        .copied()
        .find(|p| name_of(*p) == lowered)
        .ok_or_else(|| QueryError::InvalidProperty(raw.to_string()))
}

/// Properties a filter expression may reference.
pub trait FilterProperty: Copy + Debug + PartialEq + Send + Sync + 'static {
    const ALL: &'static [Self];

    fn name(self) -> &'static str;

    fn fields(self) -> FieldSet;

    /// Validate and convert one raw value to the property's semantic type.
    fn coerce(self, raw: &str) -> Result<SqlValue, QueryError>;

    /// Look up a property by name, ignoring case.
    fn resolve(raw: &str) -> Result<Self, QueryError> {
        resolve_by_name(Self::ALL, Self::name, raw)
    }
}

/// Properties a sort expression may reference.
pub trait SortProperty: Copy + Debug + PartialEq + Send + Sync + 'static {
    const ALL: &'static [Self];

    /// Ordering used when the client sends no sort parameter.
    const DEFAULT: (Self, SortDirection);

    fn name(self) -> &'static str;

    fn fields(self) -> FieldSet;

    fn resolve(raw: &str) -> Result<Self, QueryError> {
        resolve_by_name(Self::ALL, Self::name, raw)
    }
}

/// Filterable account properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountFilterProperty {
    Type,
    /// Name of the owning company.
    Client,
    /// Identifier of the owning company.
    ClientId,
    Currency,
    Modified,
}

impl FilterProperty for AccountFilterProperty {
    const ALL: &'static [Self] = &[
        Self::Type,
        Self::Client,
        Self::ClientId,
        Self::Currency,
        Self::Modified,
    ];

    fn name(self) -> &'static str {
        match self {
            Self::Type => "type",
            Self::Client => "client",
            Self::ClientId => "client_id",
            Self::Currency => "currency",
            Self::Modified => "modified",
        }
    }

    fn fields(self) -> FieldSet {
        match self {
            Self::Type => FieldSet::one(Field::Type),
            Self::Client => FieldSet::one(Field::CompanyName),
            Self::ClientId => FieldSet::one(Field::CompanyId),
            Self::Currency => FieldSet::one(Field::Currency),
            Self::Modified => FieldSet::one(Field::Modified),
        }
    }

    fn coerce(self, raw: &str) -> Result<SqlValue, QueryError> {
        let invalid = |e: &dyn std::fmt::Display| QueryError::invalid_value(self.name(), e.to_string());
        match self {
            Self::Type => raw
                .parse::<AccountType>()
                .map(|t| SqlValue::Text(t.as_str().to_string()))
                .map_err(|e| invalid(&e)),
            Self::Client => Ok(SqlValue::Text(raw.to_string())),
            // Compared as canonical text, see `Field::accessor`.
            Self::ClientId => raw
                .parse::<Uuid>()
                .map(|id| SqlValue::Text(id.hyphenated().to_string()))
                .map_err(|e| invalid(&e)),
            Self::Currency => raw
                .parse::<CurrencyNumericCode>()
                .map(|code| SqlValue::Text(code.as_str().to_string()))
                .map_err(|e| invalid(&e)),
            Self::Modified => raw
                .parse::<Timestamp>()
                .map(SqlValue::Timestamp)
                .map_err(|e| invalid(&e)),
        }
    }
}

/// Sortable account properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountSortProperty {
    Created,
    Modified,
}

impl SortProperty for AccountSortProperty {
    const ALL: &'static [Self] = &[Self::Created, Self::Modified];

    const DEFAULT: (Self, SortDirection) = (Self::Modified, SortDirection::Desc);

    fn name(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Modified => "modified",
        }
    }

    fn fields(self) -> FieldSet {
        match self {
            Self::Created => FieldSet::one(Field::Created),
            Self::Modified => FieldSet::one(Field::Modified),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_field_set() {
        let set = FieldSet::many(Field::CompanyName, &[Field::Account]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.first(), Field::CompanyName);
        assert_eq!(
            set.iter().collect::<Vec<_>>(),
            vec![Field::CompanyName, Field::Account]
        );
        assert_eq!(FieldSet::one(Field::Type).len(), 1);
    }

    #[test]
    fn test_resolve_filter_property_case_insensitive() {
        assert_eq!(
            AccountFilterProperty::resolve("CURRENCY").unwrap(),
            AccountFilterProperty::Currency
        );
        assert_eq!(
            AccountFilterProperty::resolve("Client_Id").unwrap(),
            AccountFilterProperty::ClientId
        );
    }

    #[test]
    fn test_resolve_unknown_property() {
        let err = AccountFilterProperty::resolve("balance").unwrap_err();
        assert_eq!(err, QueryError::InvalidProperty("balance".into()));

        // Sortable and filterable sets differ.
        assert!(AccountSortProperty::resolve("currency").is_err());
        assert!(AccountFilterProperty::resolve("created").is_err());
    }

    #[test]
    fn test_every_property_has_fields() {
        for p in AccountFilterProperty::ALL {
            assert!(p.fields().len() >= 1, "{p:?}");
        }
        for p in AccountSortProperty::ALL {
            assert!(p.fields().len() >= 1, "{p:?}");
        }
    }

    #[test]
    fn test_coerce_type() {
        assert_eq!(
            AccountFilterProperty::Type.coerce("account-type-2").unwrap(),
            SqlValue::Text("account-type-2".into())
        );
        let err = AccountFilterProperty::Type.coerce("gold").unwrap_err();
        assert!(matches!(err, QueryError::InvalidFilterValue { ref property, .. } if property == "type"));
    }

    #[test]
    fn test_coerce_currency() {
        assert!(AccountFilterProperty::Currency.coerce("978").is_ok());
        assert!(AccountFilterProperty::Currency.coerce("EUR").is_err());
    }

    #[test]
    fn test_coerce_modified() {
        assert_eq!(
            AccountFilterProperty::Modified.coerce("2024-05-01").unwrap(),
            SqlValue::Timestamp(Timestamp(datetime!(2024-05-01 0:00 UTC)))
        );
        assert!(AccountFilterProperty::Modified.coerce("yesterday").is_err());
    }

    #[test]
    fn test_coerce_client_id_canonicalizes() {
        assert_eq!(
            AccountFilterProperty::ClientId
                .coerce("0FADCA55-5645-49A4-9782-44B849930BB7")
                .unwrap(),
            SqlValue::Text("0fadca55-5645-49a4-9782-44b849930bb7".into())
        );
        assert!(AccountFilterProperty::ClientId.coerce("acme").is_err());
    }

    #[test]
    fn test_coerce_client_is_untyped() {
        assert_eq!(
            AccountFilterProperty::Client.coerce("%Acme%").unwrap(),
            SqlValue::Text("%Acme%".into())
        );
    }

    #[test]
    fn test_default_sort() {
        assert_eq!(
            AccountSortProperty::DEFAULT,
            (AccountSortProperty::Modified, SortDirection::Desc)
        );
    }
}
