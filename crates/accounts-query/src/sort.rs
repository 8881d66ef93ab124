//! Sort parameter parsing and compilation.
//!
//! ```text
//! sort := expr | [sort, ...]
//! expr := {"property"?: name, "direction"?: "asc" | "desc"}
//! ```
//!
//! A missing `property` falls back to the property's default; a missing
//! `direction` means `desc`.

use crate::error::{ParamError, QueryError};
use crate::params::decode_json_param;
use crate::property::SortProperty;
use crate::sql_builder::{QueryBuilder, SortOrder, SortSpec};
use serde_json::{Map, Value};
use std::str::FromStr;

pub const SORT_PARAM: &str = "sort";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    pub fn order(self) -> SortOrder {
        match self {
            Self::Asc => SortOrder::Asc,
            Self::Desc => SortOrder::Desc,
        }
    }
}

impl FromStr for SortDirection {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(QueryError::malformed(format!(
                "sort direction must be 'asc' or 'desc', got '{s}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SortExpression<P> {
    pub property: P,
    pub direction: SortDirection,
}

impl<P: SortProperty> SortExpression<P> {
    pub fn new(property: P, direction: SortDirection) -> Self {
        Self {
            property,
            direction,
        }
    }

    fn from_object(obj: &Map<String, Value>) -> Result<Self, QueryError> {
        let property = match obj.get("property") {
            Some(Value::String(name)) => P::resolve(name)?,
            None | Some(Value::Null) => P::DEFAULT.0,
            Some(_) => return Err(QueryError::malformed("sort 'property' must be a string")),
        };
        let direction = match obj.get("direction") {
            Some(Value::String(dir)) => dir.parse()?,
            None | Some(Value::Null) => SortDirection::default(),
            Some(_) => return Err(QueryError::malformed("sort 'direction' must be a string")),
        };
        Ok(Self::new(property, direction))
    }

    /// One ordering clause per backing field.
    pub fn compile(&self) -> Vec<SortSpec> {
        let order = self.direction.order();
        self.property
            .fields()
            .iter()
            .map(|field| SortSpec::new(field, order))
            .collect()
    }
}

impl<P: SortProperty> Default for SortExpression<P> {
    fn default() -> Self {
        let (property, direction) = P::DEFAULT;
        Self::new(property, direction)
    }
}

/// Ordered sort expressions; the first has the highest precedence.
#[derive(Debug, Clone, PartialEq)]
pub struct SortCriteria<P> {
    expressions: Vec<SortExpression<P>>,
}

impl<P: SortProperty> SortCriteria<P> {
    /// Parse the raw `sort` parameter. A missing parameter yields the
    /// property's default ordering.
    pub fn parse(raw: Option<&str>) -> Result<Self, ParamError> {
        let Some(raw) = raw else {
            return Ok(Self::default());
        };
        decode_json_param(raw)
            .and_then(|value| Self::from_value(&value))
            .map_err(|e| {
                tracing::debug!(error = %e, "rejected sort parameter");
                e.for_param(SORT_PARAM)
            })
    }

    pub fn from_value(value: &Value) -> Result<Self, QueryError> {
        let mut expressions = Vec::new();
        collect_expressions(value, &mut expressions)?;
        Ok(Self { expressions })
    }

    pub fn expressions(&self) -> &[SortExpression<P>] {
        &self.expressions
    }

    pub fn compile(&self) -> Vec<SortSpec> {
        self.expressions
            .iter()
            .flat_map(SortExpression::compile)
            .collect()
    }

    /// Append the compiled ordering clauses to `builder`.
    pub fn apply(&self, builder: QueryBuilder) -> QueryBuilder {
        self.compile()
            .into_iter()
            .fold(builder, |b, spec| b.sort_by(spec))
    }
}

impl<P: SortProperty> Default for SortCriteria<P> {
    fn default() -> Self {
        Self {
            expressions: vec![SortExpression::default()],
        }
    }
}

fn collect_expressions<P: SortProperty>(
    value: &Value,
    out: &mut Vec<SortExpression<P>>,
) -> Result<(), QueryError> {
    match value {
        Value::Array(items) => items.iter().try_for_each(|item| collect_expressions(item, out)),
        Value::Object(obj) => {
            out.push(SortExpression::from_object(obj)?);
            Ok(())
        }
        other => Err(QueryError::malformed(format!(
            "sort must be an object or an array, got {other}"
        ))),
    }
}
