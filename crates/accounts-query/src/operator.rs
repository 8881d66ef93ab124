//! Filter operator registry.
//!
//! Each operator has a static arity and compiles a (field, operand) pair
//! into a [`Condition`].

use crate::error::QueryError;
use crate::sql_builder::{Condition, Field, Operator, SqlValue};
use std::fmt;
use std::str::FromStr;

/// Number of arguments an operator takes, counting the property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Property only.
    Unary,
    /// Property and value.
    Binary,
}

/// A coerced filter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// No value, or JSON `null`.
    Absent,
    Scalar(SqlValue),
    List(Vec<SqlValue>),
}

/// Operators accepted in filter expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    IsNull,
    IsNotNull,
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    /// Case-sensitive pattern match
    Like,
    /// Case-insensitive pattern match
    ILike,
    NotILike,
    In,
    NotIn,
}

impl FilterOperator {
    pub const ALL: [FilterOperator; 13] = [
        Self::IsNull,
        Self::IsNotNull,
        Self::Eq,
        Self::Ne,
        Self::Gt,
        Self::Lt,
        Self::Ge,
        Self::Le,
        Self::Like,
        Self::ILike,
        Self::NotILike,
        Self::In,
        Self::NotIn,
    ];

    /// Name used in filter JSON.
    pub fn name(self) -> &'static str {
        match self {
            Self::IsNull => "is_null",
            Self::IsNotNull => "is_not_null",
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Ge => ">=",
            Self::Le => "<=",
            Self::Like => "like",
            Self::ILike => "ilike",
            Self::NotILike => "not_ilike",
            Self::In => "in",
            Self::NotIn => "not_in",
        }
    }

    pub const fn arity(self) -> Arity {
        match self {
            Self::IsNull | Self::IsNotNull => Arity::Unary,
            _ => Arity::Binary,
        }
    }

    /// Look up an operator by name, ignoring ASCII case.
    pub fn resolve(name: &str) -> Result<Self, QueryError> {
        let lowered = name.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|op| op.name() == lowered)
            .ok_or_else(|| QueryError::InvalidOperator(name.to_string()))
    }

    /// Check that `operand` has the shape this operator consumes.
    ///
    /// Unary operators ignore any value. `=` and `!=` accept a missing value
    /// and then test for NULL; membership operators need a list; the rest
    /// need a single value.
    pub fn validate_operand(self, property: &str, operand: &Operand) -> Result<(), QueryError> {
        match (self.arity(), self, operand) {
            (Arity::Unary, _, _) => Ok(()),
            (_, Self::Eq | Self::Ne, Operand::Absent) => Ok(()),
            (_, Self::In | Self::NotIn, Operand::List(_)) => Ok(()),
            (_, Self::In | Self::NotIn, _) => Err(QueryError::invalid_value(
                property,
                format!("operator '{}' expects an array value", self.name()),
            )),
            (_, _, Operand::Scalar(_)) => Ok(()),
            (_, _, Operand::Absent) => Err(QueryError::invalid_value(
                property,
                format!("operator '{}' requires a value", self.name()),
            )),
            (_, _, Operand::List(_)) => Err(QueryError::invalid_value(
                property,
                format!("operator '{}' expects a single value", self.name()),
            )),
        }
    }

    /// Compile this operator against one field.
    ///
    /// The operand must have passed [`FilterOperator::validate_operand`];
    /// shapes it rejects compile to `FALSE`.
    pub fn apply(self, field: Field, operand: &Operand) -> Condition {
        match (self, operand) {
            (Self::IsNull, _) => Condition::is_null(field),
            (Self::IsNotNull, _) => Condition::is_not_null(field),
            (Self::Eq, Operand::Absent) => Condition::is_null(field),
            (Self::Ne, Operand::Absent) => Condition::is_not_null(field),
            (Self::In, Operand::List(values)) => Condition::in_list(field, values.clone()),
            (Self::NotIn, Operand::List(values)) => {
                Condition::negate(Condition::in_list(field, values.clone()))
            }
            (Self::NotILike, Operand::Scalar(value)) => {
                Condition::negate(Condition::simple(field, Operator::ILike, value.clone()))
            }
            (op, Operand::Scalar(value)) => match op.comparison() {
                Some(sql_op) => Condition::simple(field, sql_op, value.clone()),
                None => Condition::False,
            },
            _ => Condition::False,
        }
    }

    fn comparison(self) -> Option<Operator> {
        match self {
            Self::Eq => Some(Operator::Eq),
            Self::Ne => Some(Operator::Ne),
            Self::Gt => Some(Operator::Gt),
            Self::Lt => Some(Operator::Lt),
            Self::Ge => Some(Operator::Ge),
            Self::Le => Some(Operator::Le),
            Self::Like => Some(Operator::Like),
            Self::ILike => Some(Operator::ILike),
            _ => None,
        }
    }
}

impl FromStr for FilterOperator {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::resolve(s)
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> SqlValue {
        SqlValue::Text(s.to_string())
    }

    #[test]
    fn test_resolve_every_registered_name() {
        for op in FilterOperator::ALL {
            assert_eq!(FilterOperator::resolve(op.name()).unwrap(), op);
        }
    }

    #[test]
    fn test_resolve_is_case_insensitive() {
        assert_eq!(FilterOperator::resolve("ILIKE").unwrap(), FilterOperator::ILike);
        assert_eq!(FilterOperator::resolve("Is_Null").unwrap(), FilterOperator::IsNull);
    }

    #[test]
    fn test_resolve_unknown() {
        let err = FilterOperator::resolve("between").unwrap_err();
        assert_eq!(err, QueryError::InvalidOperator("between".into()));
        assert!("~ilike".parse::<FilterOperator>().is_err());
    }

    #[test]
    fn test_arity() {
        assert_eq!(FilterOperator::IsNull.arity(), Arity::Unary);
        assert_eq!(FilterOperator::IsNotNull.arity(), Arity::Unary);
        for op in FilterOperator::ALL.into_iter().skip(2) {
            assert_eq!(op.arity(), Arity::Binary, "{op}");
        }
    }

    #[test]
    fn test_validate_operand_shapes() {
        use FilterOperator::*;
        let scalar = Operand::Scalar(text("x"));
        let list = Operand::List(vec![text("x")]);

        assert!(IsNull.validate_operand("p", &Operand::Absent).is_ok());
        assert!(IsNull.validate_operand("p", &scalar).is_ok());
        assert!(Eq.validate_operand("p", &Operand::Absent).is_ok());
        assert!(Gt.validate_operand("p", &Operand::Absent).is_err());
        assert!(Like.validate_operand("p", &list).is_err());
        assert!(In.validate_operand("p", &list).is_ok());
        assert!(In.validate_operand("p", &scalar).is_err());
        assert!(NotIn.validate_operand("p", &Operand::Absent).is_err());
    }

    #[test]
    fn test_apply_comparisons() {
        let cond = FilterOperator::Ge.apply(Field::Currency, &Operand::Scalar(text("100")));
        assert_eq!(cond, Condition::simple(Field::Currency, Operator::Ge, text("100")));

        let cond = FilterOperator::Like.apply(Field::CompanyName, &Operand::Scalar(text("A%")));
        assert_eq!(cond, Condition::simple(Field::CompanyName, Operator::Like, text("A%")));
    }

    #[test]
    fn test_apply_negated_operators() {
        let cond = FilterOperator::NotILike.apply(Field::CompanyName, &Operand::Scalar(text("%x%")));
        assert!(matches!(cond, Condition::Not(inner)
            if *inner == Condition::simple(Field::CompanyName, Operator::ILike, text("%x%"))));

        let cond = FilterOperator::NotIn.apply(Field::Currency, &Operand::List(vec![text("978")]));
        assert!(matches!(cond, Condition::Not(inner) if matches!(*inner, Condition::In { .. })));
    }

    #[test]
    fn test_apply_null_checks() {
        assert_eq!(
            FilterOperator::IsNull.apply(Field::Currency, &Operand::Absent),
            Condition::is_null(Field::Currency)
        );
        assert_eq!(
            FilterOperator::Eq.apply(Field::Currency, &Operand::Absent),
            Condition::is_null(Field::Currency)
        );
        assert_eq!(
            FilterOperator::Ne.apply(Field::Currency, &Operand::Absent),
            Condition::is_not_null(Field::Currency)
        );
    }

    #[test]
    fn test_apply_empty_membership() {
        let empty = Operand::List(vec![]);
        assert_eq!(FilterOperator::In.apply(Field::Type, &empty), Condition::False);
        assert_eq!(
            FilterOperator::NotIn.apply(Field::Type, &empty),
            Condition::negate(Condition::False)
        );
    }
}
