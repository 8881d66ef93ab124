//! Filter parameter parsing and compilation.
//!
//! # Syntax
//!
//! ```text
//! filter := node | [filter, ...]
//! node   := {"or": filter} | {"and": filter} | {"not": filter}
//!         | {"property": name, "operator": op, "value"?: value}
//! value  := string | [string, ...] | null
//! ```
//!
//! Arrays flatten into their parent. Top-level nodes are AND-ed. When an
//! object carries more than one of `or`, `and`, `not`, the first in that
//! order wins. `not` negates the conjunction of its children.
//!
//! # Examples
//!
//! ```text
//! {"property": "currency", "operator": "=", "value": "978"}
//! [{"property": "type", "operator": "in", "value": ["account-type-1", "account-type-3"]},
//!  {"not": {"property": "client", "operator": "ilike", "value": "%test%"}}]
//! {"or": [{"property": "modified", "operator": ">=", "value": "2024-01-01"},
//!         {"property": "client_id", "operator": "is_null"}]}
//! ```

use crate::error::{ParamError, QueryError};
use crate::operator::{FilterOperator, Operand};
use crate::params::decode_json_param;
use crate::property::FilterProperty;
use crate::sql_builder::{Condition, MAX_CONDITION_NODES, QueryBuilder, SqlValue};
use serde_json::{Map, Value};

pub const FILTER_PARAM: &str = "filter";

/// Logical combinators, in the order they are looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BooleanOperator {
    Or,
    And,
    Not,
}

impl BooleanOperator {
    pub const LOOKUP_ORDER: [BooleanOperator; 3] = [Self::Or, Self::And, Self::Not];

    pub fn key(self) -> &'static str {
        match self {
            Self::Or => "or",
            Self::And => "and",
            Self::Not => "not",
        }
    }
}

/// A validated `(property, operator, value)` leaf.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterExpression<P> {
    property: P,
    operator: FilterOperator,
    operand: Operand,
}

impl<P: FilterProperty> FilterExpression<P> {
    /// Build a leaf from an already-resolved property and operator.
    ///
    /// String values (and every element of an array value) are coerced to
    /// the property's type; any other JSON value is rejected.
    pub fn new(
        property: P,
        operator: FilterOperator,
        value: Option<&Value>,
    ) -> Result<Self, QueryError> {
        let operand = coerce_operand(property, value)?;
        operator.validate_operand(property.name(), &operand)?;
        Ok(Self {
            property,
            operator,
            operand,
        })
    }

    fn from_object(obj: &Map<String, Value>) -> Result<Self, QueryError> {
        let property = P::resolve(required_str(obj, "property")?)?;
        let operator = FilterOperator::resolve(required_str(obj, "operator")?)?;
        Self::new(property, operator, obj.get("value"))
    }

    pub fn property(&self) -> P {
        self.property
    }

    pub fn operator(&self) -> FilterOperator {
        self.operator
    }

    pub fn operand(&self) -> &Operand {
        &self.operand
    }

    /// Apply the operator to every backing field and OR the results.
    pub fn compile(&self) -> Condition {
        let conditions = self
            .property
            .fields()
            .iter()
            .map(|field| self.operator.apply(field, &self.operand))
            .collect();
        Condition::or(conditions)
    }
}

fn required_str<'a>(obj: &'a Map<String, Value>, key: &str) -> Result<&'a str, QueryError> {
    match obj.get(key) {
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(QueryError::malformed(format!("'{key}' must be a string"))),
        None => Err(QueryError::malformed(format!(
            "filter expression requires '{key}'"
        ))),
    }
}

fn coerce_operand<P: FilterProperty>(
    property: P,
    value: Option<&Value>,
) -> Result<Operand, QueryError> {
    match value {
        None | Some(Value::Null) => Ok(Operand::Absent),
        Some(Value::String(s)) => property.coerce(s).map(Operand::Scalar),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => property.coerce(s),
                other => Err(non_string(property, other)),
            })
            .collect::<Result<Vec<SqlValue>, _>>()
            .map(Operand::List),
        Some(other) => Err(non_string(property, other)),
    }
}

fn non_string<P: FilterProperty>(property: P, value: &Value) -> QueryError {
    QueryError::invalid_value(property.name(), format!("expected a string, got {value}"))
}

/// A combinator over child nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct BooleanGroup<P> {
    pub operator: BooleanOperator,
    pub filters: Vec<CriteriaNode<P>>,
}

impl<P: FilterProperty> BooleanGroup<P> {
    pub fn compile(&self) -> Condition {
        let children: Vec<Condition> = self.filters.iter().map(CriteriaNode::compile).collect();
        match self.operator {
            BooleanOperator::Or => Condition::or(children),
            BooleanOperator::And => Condition::and(children),
            BooleanOperator::Not => Condition::negate(Condition::and(children)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CriteriaNode<P> {
    Expression(FilterExpression<P>),
    Group(BooleanGroup<P>),
}

impl<P: FilterProperty> CriteriaNode<P> {
    pub fn compile(&self) -> Condition {
        match self {
            Self::Expression(expr) => expr.compile(),
            Self::Group(group) => group.compile(),
        }
    }
}

/// Largest compiled filter accepted. The rest of [`MAX_CONDITION_NODES`] is
/// left for the conditions storage adds, such as the archived flag.
pub const MAX_FILTER_NODES: usize = MAX_CONDITION_NODES - 16;

/// A parsed criteria forest. Roots are implicitly AND-ed.
#[derive(Debug, Clone, PartialEq)]
pub struct Filters<P> {
    criteria: Vec<CriteriaNode<P>>,
}

impl<P> Default for Filters<P> {
    fn default() -> Self {
        Self {
            criteria: Vec::new(),
        }
    }
}

impl<P: FilterProperty> Filters<P> {
    /// Parse the raw `filter` parameter. A missing parameter is no
    /// restriction.
    pub fn parse(raw: Option<&str>) -> Result<Self, ParamError> {
        let Some(raw) = raw else {
            return Ok(Self::default());
        };
        decode_json_param(raw)
            .and_then(|value| Self::from_value(&value))
            .map_err(|e| {
                tracing::debug!(error = %e, "rejected filter parameter");
                e.for_param(FILTER_PARAM)
            })
    }

    pub fn from_value(value: &Value) -> Result<Self, QueryError> {
        let filters = Self {
            criteria: parse_nodes(value)?,
        };
        let nodes = filters.compile().node_count();
        if nodes > MAX_FILTER_NODES {
            return Err(QueryError::OutOfRange(format!(
                "filter has {nodes} conditions (max {MAX_FILTER_NODES})"
            )));
        }
        Ok(filters)
    }

    pub fn criteria(&self) -> &[CriteriaNode<P>] {
        &self.criteria
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    /// The conjunction of all roots; `TRUE` for an empty forest.
    pub fn compile(&self) -> Condition {
        Condition::and(self.criteria.iter().map(CriteriaNode::compile).collect())
    }

    /// Restrict `builder` by the compiled predicate.
    pub fn apply(&self, builder: QueryBuilder) -> QueryBuilder {
        if self.is_empty() {
            builder
        } else {
            builder.where_condition(self.compile())
        }
    }
}

fn parse_nodes<P: FilterProperty>(value: &Value) -> Result<Vec<CriteriaNode<P>>, QueryError> {
    match value {
        Value::Array(items) => {
            let mut nodes = Vec::new();
            for item in items {
                nodes.extend(parse_nodes(item)?);
            }
            Ok(nodes)
        }
        Value::Object(obj) => {
            for operator in BooleanOperator::LOOKUP_ORDER {
                if let Some(children) = obj.get(operator.key()) {
                    return Ok(vec![CriteriaNode::Group(BooleanGroup {
                        operator,
                        filters: parse_nodes(children)?,
                    })]);
                }
            }
            Ok(vec![CriteriaNode::Expression(FilterExpression::from_object(
                obj,
            )?)])
        }
        other => Err(QueryError::malformed(format!(
            "filter must be an object or an array, got {other}"
        ))),
    }
}
